//! Window activation and input injection.
//!
//! Every call reports success as a plain `bool`; the sorter decides what a
//! failed click or key press means at the call site.

/// Drives the game window.
pub trait Controller {
	/// Bring the game window to the foreground.
	fn activate_window(&self) -> bool;
	fn send_key(&self, key: char) -> bool;
	/// Left click at absolute screen coordinates.
	fn click(&self, x: u32, y: u32) -> bool;
	/// Mouse wheel at the current cursor position; negative scrolls down.
	fn scroll(&self, amount: i32) -> bool;
}

impl<C: Controller + ?Sized> Controller for &C {
	fn activate_window(&self) -> bool {
		(**self).activate_window()
	}

	fn send_key(&self, key: char) -> bool {
		(**self).send_key(key)
	}

	fn click(&self, x: u32, y: u32) -> bool {
		(**self).click(x, y)
	}

	fn scroll(&self, amount: i32) -> bool {
		(**self).scroll(amount)
	}
}

impl<C: Controller + ?Sized> Controller for Box<C> {
	fn activate_window(&self) -> bool {
		(**self).activate_window()
	}

	fn send_key(&self, key: char) -> bool {
		(**self).send_key(key)
	}

	fn click(&self, x: u32, y: u32) -> bool {
		(**self).click(x, y)
	}

	fn scroll(&self, amount: i32) -> bool {
		(**self).scroll(amount)
	}
}

/// Logs every action and performs none of them.
pub struct DryRun;

impl Controller for DryRun {
	fn activate_window(&self) -> bool {
		tracing::info!("dry run: activate window");
		true
	}

	fn send_key(&self, key: char) -> bool {
		tracing::info!(%key, "dry run: key press");
		true
	}

	fn click(&self, x: u32, y: u32) -> bool {
		tracing::info!(x, y, "dry run: click");
		true
	}

	fn scroll(&self, amount: i32) -> bool {
		tracing::info!(amount, "dry run: scroll");
		true
	}
}

/// The input backend for this platform.
pub fn platform(window_title: &str) -> Box<dyn Controller> {
	#[cfg(windows)]
	{
		Box::new(win::WindowsController::new(window_title))
	}
	#[cfg(not(windows))]
	{
		tracing::warn!(window_title, "input injection is only supported on Windows");
		Box::new(Unsupported)
	}
}

/// Every action fails.
#[cfg(not(windows))]
pub struct Unsupported;

#[cfg(not(windows))]
impl Controller for Unsupported {
	fn activate_window(&self) -> bool {
		false
	}

	fn send_key(&self, _key: char) -> bool {
		false
	}

	fn click(&self, _x: u32, _y: u32) -> bool {
		false
	}

	fn scroll(&self, _amount: i32) -> bool {
		false
	}
}

#[cfg(windows)]
mod win {
	use std::mem::size_of;

	use windows::Win32::{
		Foundation::HWND,
		UI::{
			Input::KeyboardAndMouse::{
				INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBD_EVENT_FLAGS, KEYBDINPUT, KEYEVENTF_KEYUP,
				MOUSE_EVENT_FLAGS, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP, MOUSEEVENTF_WHEEL, MOUSEINPUT, SendInput,
				VIRTUAL_KEY, VkKeyScanW,
			},
			WindowsAndMessaging::{IsIconic, SW_RESTORE, SetCursorPos, SetForegroundWindow, ShowWindow},
		},
	};

	use super::Controller;

	/// Win32 `SendInput` against the window whose title starts with a prefix.
	pub struct WindowsController {
		title: String,
	}

	impl WindowsController {
		pub fn new(title: &str) -> Self {
			Self { title: title.to_owned() }
		}

		fn send(inputs: &[INPUT]) -> bool {
			// SAFETY: `inputs` is a valid slice of fully initialized INPUT structs.
			let sent = unsafe { SendInput(inputs, size_of::<INPUT>() as i32) };
			sent as usize == inputs.len()
		}
	}

	fn key_input(vk: VIRTUAL_KEY, up: bool) -> INPUT {
		INPUT {
			r#type: INPUT_KEYBOARD,
			Anonymous: INPUT_0 {
				ki: KEYBDINPUT {
					wVk: vk,
					wScan: 0,
					dwFlags: if up { KEYEVENTF_KEYUP } else { KEYBD_EVENT_FLAGS(0) },
					time: 0,
					dwExtraInfo: 0,
				},
			},
		}
	}

	fn mouse_input(flags: MOUSE_EVENT_FLAGS, data: i32) -> INPUT {
		INPUT {
			r#type: INPUT_MOUSE,
			Anonymous: INPUT_0 {
				mi: MOUSEINPUT {
					dx: 0,
					dy: 0,
					mouseData: data as u32,
					dwFlags: flags,
					time: 0,
					dwExtraInfo: 0,
				},
			},
		}
	}

	impl Controller for WindowsController {
		fn activate_window(&self) -> bool {
			let Some(window) = crate::capture::find_window(&self.title) else {
				tracing::warn!(title = %self.title, "game window not found");
				return false;
			};
			let Ok(id) = window.id() else {
				return false;
			};
			let hwnd = HWND(id as usize as *mut core::ffi::c_void);
			// SAFETY: plain Win32 calls on a window handle that was just enumerated.
			unsafe {
				if IsIconic(hwnd).as_bool() {
					let _ = ShowWindow(hwnd, SW_RESTORE);
				}
				SetForegroundWindow(hwnd).as_bool()
			}
		}

		fn send_key(&self, key: char) -> bool {
			let mut units = [0u16; 2];
			let [unit] = key.encode_utf16(&mut units) else {
				return false;
			};
			// SAFETY: VkKeyScanW has no preconditions.
			let scan = unsafe { VkKeyScanW(*unit) };
			if scan == -1 {
				tracing::warn!(%key, "no virtual key for character");
				return false;
			}
			let vk = VIRTUAL_KEY((scan as u16) & 0xff);
			Self::send(&[key_input(vk, false), key_input(vk, true)])
		}

		fn click(&self, x: u32, y: u32) -> bool {
			// SAFETY: SetCursorPos has no preconditions.
			if unsafe { SetCursorPos(x as i32, y as i32) }.is_err() {
				return false;
			}
			Self::send(&[mouse_input(MOUSEEVENTF_LEFTDOWN, 0), mouse_input(MOUSEEVENTF_LEFTUP, 0)])
		}

		fn scroll(&self, amount: i32) -> bool {
			Self::send(&[mouse_input(MOUSEEVENTF_WHEEL, amount)])
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn dry_run_accepts_everything() {
		let c = DryRun;
		assert!(c.activate_window());
		assert!(c.send_key('c'));
		assert!(c.click(375, 275));
		assert!(c.scroll(-933));
	}

	#[cfg(not(windows))]
	#[test]
	fn unsupported_platform_refuses() {
		let c = platform("Wuthering Waves");
		assert!(!c.activate_window());
		assert!(!c.send_key('c'));
		assert!(!c.click(0, 0));
		assert!(!c.scroll(-1));
	}
}

//! echosort: walks the echo inventory of the running game and locks or
//! discards each echo by its main attribute.

mod action;
mod assets;
mod batch;
mod capture;
mod classify;
mod cli;
mod config;
mod input;
mod prepare;
mod vision;

use std::{path::Path, process::ExitCode};

use anyhow::{Context, Result, bail};
use clap::Parser;
use data::{Data, RuleSet};
use ie::{FrameScreen, Ie, SetIcons, Templates};
use tracing_subscriber::EnvFilter;

use crate::{
	batch::{BatchConfig, BatchController, CancelToken, LogStatus, Terminal},
	cli::{Cli, Command},
	config::Config,
	input::{Controller, DryRun},
	prepare::Preparer,
	vision::ScreenVision,
};

fn main() -> ExitCode {
	let cli = Cli::parse();

	// `RUST_LOG` wins over `--verbose`.
	let default = if cli.verbose { "debug" } else { "info" };
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
		.init();

	match dispatch(cli) {
		Ok(code) => code,
		Err(err) => {
			tracing::error!("{err:#}");
			ExitCode::FAILURE
		}
	}
}

fn dispatch(cli: Cli) -> Result<ExitCode> {
	let config_path = cli.config.as_deref();
	match cli.command {
		Command::Run {
			max_items,
			rules,
			dry_run,
			skip_prepare,
		} => {
			let mut config = Config::load_or_default(config_path);
			if let Some(max_items) = max_items {
				config.max_items = max_items;
			}
			run(&config, rules.as_deref(), dry_run, skip_prepare)
		}
		Command::Inspect { screenshot, rules } => {
			inspect(&Config::load_or_default(config_path), &screenshot, rules.as_deref())?;
			Ok(ExitCode::SUCCESS)
		}
		Command::CheckRules { rules } => {
			let config = Config::load_or_default(config_path);
			let data = Data::load(&config.data_dir)?;
			let rules = load_rules(&data, rules.as_deref())?;
			println!("{} rule entries are valid", rules.iter().count());
			Ok(ExitCode::SUCCESS)
		}
		Command::InitConfig { force } => {
			let path = match config_path {
				Some(path) => path.to_path_buf(),
				None => Config::path()?,
			};
			if path.exists() && !force {
				bail!("{} already exists; pass --force to overwrite", path.display());
			}
			Config::default().save(&path)?;
			println!("wrote {}", path.display());
			Ok(ExitCode::SUCCESS)
		}
	}
}

/// The rule file at `path`, or the data directory's default rules.
fn load_rules(data: &Data, path: Option<&Path>) -> Result<RuleSet> {
	let Some(path) = path else {
		return Ok(data.default_rules.clone());
	};
	let rules = data::load_rules(path)?;
	rules
		.validate(&data.catalog)
		.with_context(|| format!("Validate {}", path.display()))?;
	Ok(rules)
}

fn load_ie(config: &Config) -> Result<Ie> {
	let templates = Templates::load(&config.assets_dir)?;
	let set_icons = SetIcons::load(config.set_icon_dir())?;
	if set_icons.is_empty() {
		tracing::warn!(dir = %config.set_icon_dir().display(), "no set icons; every echo will be an unknown set");
	}
	let ocr = assets::resolve_ocr_assets(&config.ocr_lang, &config.assets_dir)?;
	Ie::try_new(
		&ocr.detection,
		&ocr.recognition,
		&ocr.charset,
		templates,
		set_icons,
		config.layout.clone(),
	)
	.context("Load OCR models")
}

fn run(config: &Config, rules: Option<&Path>, dry_run: bool, skip_prepare: bool) -> Result<ExitCode> {
	let data = Data::load(&config.data_dir)?;
	let rules = load_rules(&data, rules)?;
	let ie = load_ie(config)?;
	let screen = capture::MonitorScreen::primary()?;
	let vision = ScreenVision::new(&ie, screen, &data.catalog, config.anchor_path());
	let controller: Box<dyn Controller> = if dry_run {
		Box::new(DryRun)
	} else {
		input::platform(&config.window_title)
	};

	let cancel = CancelToken::default();
	cancel_on_interrupt(cancel.clone())?;

	if skip_prepare {
		tracing::info!("skipping inventory preparation");
	} else {
		Preparer::new(&controller, &vision, config.keys, config.pacing, config.attempts.prepare)
			.run()
			.context("Prepare inventory")?;
	}

	let batch = BatchConfig {
		max_items: config.max_items,
		keys: config.keys,
		pacing: config.pacing,
		attempts: config.attempts,
		layout: config.layout.clone(),
	};
	let outcome = BatchController::new(
		&controller,
		&vision,
		&data.catalog,
		&rules,
		batch,
		&LogStatus,
		cancel,
	)
	.run();

	println!("{}", serde_json::to_string_pretty(&outcome.report)?);
	match outcome.terminal {
		Terminal::Success => Ok(ExitCode::SUCCESS),
		Terminal::Aborted(err) => {
			tracing::error!(state = ?outcome.state, "aborted: {err}");
			Ok(ExitCode::FAILURE)
		}
	}
}

/// Cancel `token` on the first Ctrl-C so the run stops between steps and
/// still reports; a second Ctrl-C exits at once.
fn cancel_on_interrupt(token: CancelToken) -> Result<()> {
	let runtime = tokio::runtime::Builder::new_current_thread()
		.enable_all()
		.build()
		.context("Start signal runtime")?;
	std::thread::Builder::new()
		.name("interrupt".to_owned())
		.spawn(move || {
			runtime.block_on(async {
				if let Err(err) = tokio::signal::ctrl_c().await {
					tracing::warn!(error = %err, "cannot listen for Ctrl-C");
					return;
				}
				tracing::warn!("interrupted; stopping after the current step (Ctrl-C again to quit now)");
				token.cancel();
				if tokio::signal::ctrl_c().await.is_ok() {
					std::process::exit(130);
				}
			})
		})
		.context("Spawn interrupt listener")?;
	Ok(())
}

fn inspect(config: &Config, screenshot: &Path, rules: Option<&Path>) -> Result<()> {
	let data = Data::load(&config.data_dir)?;
	let rules = load_rules(&data, rules)?;
	let ie = load_ie(config)?;
	let screen = FrameScreen::open(screenshot)?;

	let item = ie
		.inventory_read_echo(&screen, &data.catalog)
		.with_context(|| format!("Read echo from {}", screenshot.display()))?;
	let outcome = classify::classify(&item, &rules, &data.catalog);
	println!("{}", serde_json::to_string_pretty(&item)?);
	println!("outcome: {outcome}");
	Ok(())
}

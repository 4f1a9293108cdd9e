use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "echosort", version)]
#[command(about = "Locks and discards echoes in the inventory by their main attribute", long_about = None)]
pub struct Cli {
	#[command(subcommand)]
	pub command: Command,

	/// Log at debug level unless RUST_LOG says otherwise
	#[arg(short, long, global = true)]
	pub verbose: bool,

	/// Config file (default: echosort.json in the user config directory)
	#[arg(long, global = true)]
	pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Sort the inventory of the running game
	Run {
		/// Stop after this many echoes (overrides the config)
		#[arg(long)]
		max_items: Option<u32>,

		/// Rule file to use instead of the bundled default rules
		#[arg(long)]
		rules: Option<PathBuf>,

		/// Log clicks and key presses instead of sending them
		#[arg(long)]
		dry_run: bool,

		/// Assume the inventory is already open on the echo tab, sorted by time
		#[arg(long)]
		skip_prepare: bool,
	},

	/// Recognize and classify the echo shown in a screenshot
	Inspect {
		screenshot: PathBuf,

		#[arg(long)]
		rules: Option<PathBuf>,
	},

	/// Validate a rule file against the catalog
	CheckRules {
		#[arg(long)]
		rules: Option<PathBuf>,
	},

	/// Write the default config file
	InitConfig {
		/// Replace an existing file
		#[arg(long)]
		force: bool,
	},
}

#[cfg(test)]
mod tests {
	use clap::CommandFactory;

	use super::*;

	#[test]
	fn definition_is_consistent() {
		Cli::command().debug_assert();
	}

	#[test]
	fn run_flags() {
		let cli = Cli::parse_from(["echosort", "run", "--max-items", "20", "--dry-run", "-v"]);
		assert!(cli.verbose);
		match cli.command {
			Command::Run {
				max_items,
				rules,
				dry_run,
				skip_prepare,
			} => {
				assert_eq!(max_items, Some(20));
				assert!(rules.is_none());
				assert!(dry_run);
				assert!(!skip_prepare);
			}
			other => panic!("unexpected {other:?}"),
		}
	}

	#[test]
	fn global_config_after_subcommand() {
		let cli = Cli::parse_from(["echosort", "check-rules", "--config", "cfg.json", "--rules", "mine.json"]);
		assert_eq!(cli.config, Some(PathBuf::from("cfg.json")));
		assert!(matches!(cli.command, Command::CheckRules { rules: Some(p) } if p == PathBuf::from("mine.json")));
	}
}

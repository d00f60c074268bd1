use crate::policy::DEFAULT_POLICY;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "bpm",
    about = "Battery Policy Manager - save and re-apply power settings per Mac",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Directory holding device_policies.json and config.toml
    /// [default: $BPM_CONFIG_DIR or ~/.config/battery-optimizer]
    #[arg(long, global = true, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Output as JSON instead of formatted text
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Save current settings as a policy
    Save {
        /// Policy name
        #[arg(default_value = DEFAULT_POLICY)]
        name: String,
    },

    /// Apply a saved policy
    Apply {
        /// Policy name
        #[arg(default_value = DEFAULT_POLICY)]
        name: String,

        /// Show the pmset commands without running them
        #[arg(long)]
        dry_run: bool,
    },

    /// List policies for this device
    List,

    /// Delete a policy
    Delete {
        /// Policy name
        name: String,
    },

    /// List all devices with policies
    Devices,

    /// Show current power settings
    Current,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (auto-detected if omitted)
        shell: Option<Shell>,
    },
}

/// Print top-level help to stdout.
pub fn print_help() {
    let _ = Cli::command().print_help();
    println!();
}

/// Print shell completions to stdout.
pub fn print_completions(shell: Option<Shell>) {
    let shell = shell.or_else(Shell::from_env).unwrap_or_else(|| {
        eprintln!(
            "Could not detect shell. Specify one: bpm completions bash|zsh|fish|elvish|powershell"
        );
        std::process::exit(1);
    });
    clap_complete::generate(shell, &mut Cli::command(), "bpm", &mut std::io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_save_and_apply_default_name() {
        let cli = Cli::try_parse_from(["bpm", "save"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Save { ref name }) if name == "default"));

        let cli = Cli::try_parse_from(["bpm", "apply", "--dry-run"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Apply { ref name, dry_run: true }) if name == "default"
        ));
    }

    #[test]
    fn test_delete_requires_name() {
        assert!(Cli::try_parse_from(["bpm", "delete"]).is_err());
        let cli = Cli::try_parse_from(["bpm", "delete", "travel"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Delete { ref name }) if name == "travel"));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["bpm", "list", "--json", "--config-dir", "/tmp/x"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/x")));
    }

    #[test]
    fn test_no_command_parses_to_none() {
        let cli = Cli::try_parse_from(["bpm"]).unwrap();
        assert!(cli.command.is_none());
    }
}

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "mail-watcher")]
#[command(about = "Incremental IMAP mailbox monitor that archives new attachments", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Poll the mailbox on a fixed interval and save each new message's attachment
    Monitor {
        /// Poll interval in seconds (overrides POLL_INTERVAL)
        #[arg(long)]
        interval: Option<u64>,

        /// Run as a background daemon
        #[arg(long, default_value = "false")]
        daemon: bool,

        /// Stop the running monitor process
        #[arg(long, default_value = "false")]
        stop: bool,

        /// Check if the monitor process is running
        #[arg(long, default_value = "false")]
        status: bool,
    },
    /// Connect once, save the newest attachment found anywhere in the mailbox, and exit
    Pull,
    /// Move the checkpoint to the newest mailbox message without saving anything
    Reset,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_monitor_mode() {
        let cli = Cli::try_parse_from(["mail-watcher", "monitor", "--interval", "10"]);
        assert!(cli.is_ok());
        if let Commands::Monitor { interval, daemon, .. } = cli.unwrap().command {
            assert_eq!(interval, Some(10));
            assert!(!daemon);
        } else {
            panic!("Expected Monitor command");
        }
    }

    #[test]
    fn test_cli_monitor_defaults() {
        let cli = Cli::try_parse_from(["mail-watcher", "monitor"]);
        assert!(cli.is_ok());
        if let Commands::Monitor {
            interval,
            daemon,
            stop,
            status,
        } = cli.unwrap().command
        {
            assert_eq!(interval, None);
            assert!(!daemon);
            assert!(!stop);
            assert!(!status);
        } else {
            panic!("Expected Monitor command");
        }
    }

    #[test]
    fn test_cli_pull_mode() {
        let cli = Cli::try_parse_from(["mail-watcher", "pull"]);
        assert!(cli.is_ok());
        assert!(matches!(cli.unwrap().command, Commands::Pull));
    }

    #[test]
    fn test_cli_without_command_should_fail() {
        let cli = Cli::try_parse_from(["mail-watcher"]);
        assert!(cli.is_err());
    }
}

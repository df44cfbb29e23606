//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

/// Linkgate - short link resolution service
#[derive(Parser, Debug)]
#[command(name = "linkgate")]
#[command(version)]
#[command(about = "Short link resolution service with tiered caching", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML); LG__* environment variables override it
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve,

    /// Delete expired links once and exit
    Reap,

    /// Write a sample configuration file
    GenerateConfig {
        /// Output path
        #[arg(default_value = "config.toml")]
        output: String,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Load the configuration and report problems
    CheckConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_serve() {
        let cli = Cli::parse_from(["linkgate"]);
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::parse_from(["linkgate", "reap", "--config", "/etc/linkgate.toml"]);
        assert_eq!(cli.command, Some(Commands::Reap));
        assert_eq!(cli.config.as_deref(), Some("/etc/linkgate.toml"));
    }

    #[test]
    fn test_generate_config_defaults() {
        let cli = Cli::parse_from(["linkgate", "generate-config"]);
        assert_eq!(
            cli.command,
            Some(Commands::GenerateConfig {
                output: "config.toml".into(),
                force: false
            })
        );
    }
}

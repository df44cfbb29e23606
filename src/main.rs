use std::path::Path;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use tracing::warn;

use linkgate::cli::{Cli, Commands};
use linkgate::config::{StaticConfig, get_config, init_config};
use linkgate::runtime::modes;
use linkgate::system::logging::init_logging;

fn generate_config(output: &str, force: bool) -> Result<()> {
    if Path::new(output).exists() && !force {
        anyhow::bail!("{} already exists, pass --force to overwrite", output);
    }
    StaticConfig::default()
        .save_to_file(output)
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", output, e))?;
    println!("{} sample configuration written to {}", "✓".green().bold(), output.cyan());
    Ok(())
}

fn check_config(config: &StaticConfig) -> Result<()> {
    let problems = config.validate();
    if problems.is_empty() {
        println!("{} configuration is valid", "✓".green().bold());
        return Ok(());
    }
    for problem in &problems {
        eprintln!("{} {}", "✗".red().bold(), problem);
    }
    anyhow::bail!("{} configuration problem(s) found", problems.len())
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Some(Commands::GenerateConfig { output, force }) = &cli.command {
        return generate_config(output, *force);
    }

    init_config(cli.config.as_deref());
    let config = get_config();

    if cli.command == Some(Commands::CheckConfig) {
        return check_config(&config);
    }

    let _guard = init_logging(&config.logging)?;
    for problem in config.validate() {
        warn!("Configuration: {}", problem);
    }

    match cli.command {
        Some(Commands::Reap) => modes::run_reap(&config).await,
        _ => modes::run_server(&config).await,
    }
}

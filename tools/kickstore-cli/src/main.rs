//! Kickstore CLI - Command line tool for the Kickstore checkout core.
//!
//! Commands:
//! - `kickstore quote` - Price a checkout under every payment method
//! - `kickstore demo` - Run a storefront scenario from anonymous cart to paid order
//! - `kickstore config` - Manage configuration

mod commands;
mod context;
mod logging;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{ConfigArgs, DemoArgs, QuoteArgs};

/// Kickstore CLI - Price and exercise the sneaker storefront checkout
#[derive(Parser)]
#[command(name = "kickstore")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Log format for diagnostics on stderr
    #[arg(long, global = true, value_enum, default_value_t = logging::LogFormat::Text)]
    log_format: logging::LogFormat,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Price a checkout under PIX, Boleto and card
    Quote(QuoteArgs),

    /// Run a storefront scenario end to end
    Demo(DemoArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(cli.log_format, cli.verbose)?;

    let output = output::Output::new(cli.verbose, cli.json);

    let config_path = cli.config.as_deref();
    let ctx = context::Context::load(config_path, output)?;

    let result = match cli.command {
        Commands::Quote(args) => commands::quote::run(args, &ctx).await,
        Commands::Demo(args) => commands::demo::run(args, &ctx).await,
        Commands::Config(args) => commands::config::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

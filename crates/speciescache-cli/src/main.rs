//! speciescache - keeps an offline mirror of the species bundle.
//!
//! ```text
//! speciescache sync [--force] [--json]
//! speciescache status [--json]
//! speciescache precache
//! speciescache config [--save]
//! ```

mod commands;

use std::io;

use anyhow::{bail, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use speciescache_core::Config;

const USAGE: &str =
    "usage: speciescache <sync [--force] [--json] | status [--json] | precache | config [--save]>";

fn init_tracing() {
    // RUST_LOG overrides, e.g. RUST_LOG=speciescache_core=debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{}", USAGE);
        return Ok(());
    };
    let flags = &args[1..];
    let has_flag = |name: &str| flags.iter().any(|f| f == name);
    if let Some(unknown) = flags
        .iter()
        .find(|f| !matches!(f.as_str(), "--force" | "--json" | "--save"))
    {
        bail!("unknown option '{}'\n{}", unknown, USAGE);
    }

    let mut config = Config::load()?;
    config.apply_env();
    info!(base_url = %config.base_url, "speciescache starting");

    match command.as_str() {
        "sync" => commands::sync(&config, has_flag("--force"), has_flag("--json")).await,
        "status" => commands::status(&config, has_flag("--json")).await,
        "precache" => commands::precache(&config).await,
        "config" => commands::config(&config, has_flag("--save")),
        "-h" | "--help" | "help" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => bail!("unknown command '{}'\n{}", other, USAGE),
    }
}

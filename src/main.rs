//! jolokia-exporter - JMX metrics over Jolokia in Prometheus format
//!
//! Loads the rules, then either reports on them (`--validate`, `--dry-run`)
//! or serves the metrics endpoint.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use jolokia_exporter::{
    cli::{render_dry_run, render_validation, Cli},
    config::Config,
    server,
    transformer::RuleSet,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    jolokia_exporter::init_logging(&cli.log_level.to_string(), cli.log_format)?;

    let mut config = Config::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    cli.apply_to(&mut config);
    config.validate()?;

    let rules = RuleSet::from_config(&config.rules).context("Failed to build rules")?;
    for rule in &rules {
        debug!(
            pattern = %rule.pattern(),
            mbean = %rule.mbean(),
            attribute = ?rule.access_path(),
            name = %rule.name(),
            "Loaded rule"
        );
    }

    if cli.validate {
        let output = render_validation(&rules, cli.output_format)?;
        println!("{}", output.trim_end());
        return Ok(());
    }

    if cli.dry_run {
        let output = render_dry_run(&rules, cli.output_format)?;
        println!("{}", output.trim_end());
        return Ok(());
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        app_version = %cli.app_version,
        rules = rules.len(),
        "Starting jolokia-exporter"
    );

    server::run(config, rules, cli.app_version).await
}

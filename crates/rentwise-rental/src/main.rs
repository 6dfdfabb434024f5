use anyhow::Result;
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use rentwise_common::logging::init_logging;
use rentwise_common::ConfigLoader;
use rentwise_rental::storage::Database;
use rentwise_rental::{RentalConfig, RentalDesk};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "rentwise")]
#[command(about = "Rentwise maintenance - database migrations and pricing seed")]
struct Args {
    #[arg(short, long, help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, help = "Generate sample configuration file")]
    gen_config: bool,

    #[arg(long, help = "Dry run mode (validate config without touching the database)")]
    dry_run: bool,

    #[command(flatten)]
    verbosity: Verbosity<InfoLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.verbosity, "rentwise_rental=info,rentwise=info")?;

    if args.gen_config {
        println!("{}", RentalConfig::generate_example()?);
        return Ok(());
    }

    let config = RentalConfig::load(args.config)?;
    config.validate()?;

    info!("Database: {}", config.database.url);
    info!(
        "{} holidays configured, {} default pricing rules",
        config.pricing.holidays.len(),
        config.pricing.defaults.len()
    );

    if args.dry_run {
        info!("Configuration validated successfully (dry-run mode)");
        return Ok(());
    }

    let db = Database::connect(&config.database).await?;
    info!("Running database migrations");
    db.migrate().await?;

    let desk = RentalDesk::new(&db, &config);
    let seeded = desk.seed_default_pricing(&config.pricing.defaults).await?;
    info!("Seeded {} pricing rules", seeded.len());

    db.pool().close().await;
    Ok(())
}

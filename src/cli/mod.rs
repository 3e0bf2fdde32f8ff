use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::level_filters::LevelFilter;

use crate::{
    config::get_config,
    dashboard::client::DashboardClient,
    storage::dataset::DatasetStore,
    sync::run_sync,
    utils::{clock::DefaultClock, logging::enable_logging, time::REPORTING_ZONE},
};

const DATA_DIR: &str = "data";

#[derive(Parser, Debug)]
#[command(name = "Shelftime", version)]
#[command(about = "Sync kids' reading activity from the Kindle parent dashboard", long_about = None)]
struct Args {
    #[arg(
        long,
        help = "Print captured API responses and keep extra diagnostics in the run log"
    )]
    debug: bool,
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let store = DatasetStore::new(PathBuf::from(DATA_DIR))?;

    let logging_level = if args.debug {
        Some(LevelFilter::DEBUG)
    } else {
        None
    };
    enable_logging(store.data_dir(), logging_level, args.debug)?;

    let config = get_config()?;
    let mut source = DashboardClient::new(&config, REPORTING_ZONE, Box::new(DefaultClock));
    run_sync(&mut source, &store, &DefaultClock, REPORTING_ZONE, args.debug).await
}

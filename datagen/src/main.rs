mod args;

use std::error::Error;
use std::fs;

use args::Args;
use chrono::Local;
use clap::Parser;
use datagen::book::Book;
use datagen::engine::ProcessFactory;
use datagen::estimate::estimate;
use datagen::filter::ExternalFilter;
use datagen::pipeline::Pipeline;
use datagen::pool::Cancellation;
use datagen::settings::Settings;
use log::LevelFilter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use simplelog::{Config, SimpleLogger};

fn main() -> Result<(), Box<dyn Error>> {
    let args = init()?;

    let (settings, book) = load(&args)?;
    fs::create_dir_all(&args.output_dir)?;

    // Set up SIGINT handler
    let cancellation = Cancellation::new();
    let cancellation_handler = cancellation.clone();
    ctrlc::set_handler(move || {
        log::info!("Received SIGINT, stopping after current jobs...");
        cancellation_handler.cancel();
    })?;

    let seed = args
        .seed
        .or(settings.seed)
        .unwrap_or_else(|| rand::thread_rng().gen());
    log::info!("Seed: {}", seed);

    let estimate = estimate(&settings);
    let finish = chrono::Duration::from_std(estimate.duration)
        .ok()
        .and_then(|duration| Local::now().checked_add_signed(duration));
    match finish {
        Some(finish) => log::info!(
            "Estimated time: {:.2} seconds (done around {})",
            estimate.duration.as_secs_f64(),
            finish.format("%Y-%m-%d %H:%M")
        ),
        None => log::info!("Estimated time: {:.2} seconds", estimate.duration.as_secs_f64()),
    }
    log::info!("Estimated positions: {}", estimate.positions);

    let factory = ProcessFactory;
    let filter = ExternalFilter::new(&settings.filter_binary);
    let pipeline = Pipeline::new(
        &settings,
        &book,
        &factory,
        &filter,
        &args.output_dir,
        cancellation,
    )
    .show_progress(!args.no_progress);

    let mut rng = StdRng::seed_from_u64(seed);
    match pipeline.run(&mut rng) {
        Ok(summary) => {
            log::info!(
                "Done: {} batches, {} games ({} dropped), {} positions, {} labeled ({} skipped, {} dropped)",
                summary.batches,
                summary.games.completed,
                summary.games.failed,
                summary.positions,
                summary.records,
                summary.labels.skipped,
                summary.labels.failed
            );
            Ok(())
        }
        Err(e) => {
            log::error!("Run failed: {}", e);
            Err(e.into())
        }
    }
}

fn load(args: &Args) -> Result<(Settings, Book), datagen::Error> {
    let settings = Settings::load(&args.config)?;
    let book = Book::load(&settings.opening_book)?;
    Ok((settings, book))
}

fn init() -> Result<Args, Box<dyn Error>> {
    let args = Args::parse();

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    SimpleLogger::init(level, Config::default())?;

    Ok(args)
}

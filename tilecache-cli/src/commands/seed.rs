//! Seed command - download a region for offline use.
//!
//! Progress comes from the engine's event stream, so the bar reflects exactly
//! what the seed driver reports. Ctrl-C cancels between tiles.

use std::path::Path;
use std::sync::Arc;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tilecache::coord::BoundingBox;
use tilecache::events::{ChannelEventSink, TileCacheEvent};
use tilecache::SeedReport;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::CliError;
use crate::runner::CliRunner;

const BAR_TEMPLATE: &str = "{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} {msg}";

/// Run the seed command.
pub async fn run(
    config_path: Option<&Path>,
    bbox: BoundingBox,
    min_zoom: u8,
    max_zoom: u8,
) -> Result<(), CliError> {
    let runner = CliRunner::new(config_path)?;
    runner.log_startup("seed");

    let (sink, events) = ChannelEventSink::new();
    let app = runner.start(runner.app_config(), vec![Arc::new(sink)])?;

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("Received Ctrl-C, stopping after the current tile...");
        handler_token.cancel();
    })
    .map_err(|e| CliError::Signal(e.to_string()))?;

    println!("Seeding {} at zoom {}-{}", bbox, min_zoom, max_zoom);
    println!("Source: {}", app.config().source.url);
    println!();

    let bar = ProgressBar::new(0).with_style(bar_style());
    let progress = tokio::spawn(drive_progress(events, bar));

    let result = app.engine().seed(bbox, min_zoom, max_zoom, &cancel).await;

    // Closes the event channel so the progress task drains and exits
    drop(app);
    join_progress(progress).await;

    match result? {
        None => println!("Nothing to seed (empty zoom range or caching disabled)."),
        Some(report) => print_report(&report),
    }
    Ok(())
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(BAR_TEMPLATE)
        .map(|s| s.progress_chars("=> "))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

async fn drive_progress(mut events: UnboundedReceiver<TileCacheEvent>, bar: ProgressBar) {
    while let Some(event) = events.recv().await {
        match event {
            TileCacheEvent::SeedStart { info } => {
                bar.set_length(info.queue_length as u64);
                bar.set_position(0);
                bar.set_message(format!("z{}-{}", info.min_zoom, info.max_zoom));
            }
            TileCacheEvent::SeedProgress {
                info,
                remaining_length,
            } => {
                bar.set_position(completed(info.queue_length, remaining_length));
            }
            TileCacheEvent::SeedEnd { cancelled, .. } => {
                if cancelled {
                    bar.abandon_with_message("cancelled");
                } else {
                    bar.finish_with_message("done");
                }
            }
            TileCacheEvent::CacheError { key, error } => {
                bar.println(format!("{} {}: {}", style("error").red(), key, error));
            }
            TileCacheEvent::CacheHit { .. } | TileCacheEvent::CacheMiss { .. } => {}
        }
    }
}

/// Waits for the progress task. A panic there is logged and never masks the
/// seed result.
async fn join_progress(progress: JoinHandle<()>) -> bool {
    match progress.await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Progress display task failed");
            false
        }
    }
}

fn completed(queue_length: usize, remaining: usize) -> u64 {
    queue_length.saturating_sub(remaining) as u64
}

fn print_report(report: &SeedReport) {
    println!();
    println!("Seed Summary");
    println!("────────────");
    println!("  Tiles queued:  {}", report.queue_length);
    println!("  Downloaded:    {}", style(report.fetched).green());
    println!("  Already saved: {}", report.skipped);
    if report.failed > 0 {
        println!("  Failed:        {}", style(report.failed).red());
    } else {
        println!("  Failed:        0");
    }
    if report.cancelled {
        println!();
        println!(
            "{} after {} of {} tiles; run the same command again to resume.",
            style("Cancelled").yellow(),
            report.processed(),
            report.queue_length
        );
    }
}

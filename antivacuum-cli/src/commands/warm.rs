//! Warm command - warm one region of the simulated world.
//!
//! The warm is started through the event gate as a privileged command, so
//! the feedback printed here is exactly what an in-world actor would see.

use std::sync::Arc;

use antivacuum::gate::{ActorPosition, EventGate, SharedSession, Trigger};
use antivacuum::scheduler::{WarmMode, WarmProgress, WarmScheduler};
use antivacuum::RegionAddress;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::common::{
    install_interrupt_handler, print_summary, FeedbackOutput, SourceOptions, INTERRUPT_GRACE,
};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Buffered progress events; extra events are dropped rather than slowing the warm.
const PROGRESS_CHANNEL_CAPACITY: usize = 64;

/// Arguments for the warm command.
pub struct WarmArgs {
    pub region: RegionAddress,
    pub mode: WarmMode,
    pub quiet: bool,
    pub source: SourceOptions,
}

/// Run the warm command.
pub fn run(args: WarmArgs, runner: &CliRunner) -> Result<(), CliError> {
    runner.log_startup("warm");
    let config = runner.config();

    let scheduler_config = config.scheduler_config();
    let source = Arc::new(args.source.build(scheduler_config.extent));
    let (progress_tx, progress_rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
    let scheduler = WarmScheduler::new(source.clone(), scheduler_config).with_progress(progress_tx);

    // The actor stands in the middle of the target region.
    let session = Arc::new(SharedSession::active_at(ActorPosition::new(
        f64::from(args.region.start_x()) + 8.0,
        0.0,
        f64::from(args.region.start_z()) + 8.0,
    )));
    session.set_privileged(true);

    let output = FeedbackOutput::new(args.quiet, &runner.handle());
    let mut gate = EventGate::new(
        Arc::new(scheduler),
        session,
        output.sink(),
        config.gate_config(),
        runner.handle(),
    );

    let progress = runner.handle().spawn(log_progress(progress_rx));

    let handle = gate
        .trigger(Trigger::command(args.mode, Some(args.region)))
        .ok_or_else(|| CliError::NotStarted("the gate rejected the trigger".to_string()))?;

    let interrupt = CancellationToken::new();
    install_interrupt_handler(interrupt.clone(), "Received interrupt, cancelling warm...")?;

    println!("Press Ctrl+C to cancel");

    let result = runner.block_on(handle.join_until(&interrupt, INTERRUPT_GRACE));
    drop(gate);
    runner.block_on(async {
        output.finish().await;
        let _ = progress.await;
    });

    match result {
        Some(result) => {
            print_summary(&result);
            println!("  Regions materialized: {}", source.materialized_regions());
            info!(
                region = %result.region(),
                outcome = ?result.outcome(),
                processed = result.processed(),
                "Warm command finished"
            );
        }
        None => {
            println!();
            println!(
                "Warm of region {} abandoned after {} cell reads",
                args.region,
                source.reads()
            );
            warn!(region = %args.region, reads = source.reads(), "Warm abandoned");
        }
    }
    Ok(())
}

async fn log_progress(mut rx: mpsc::Receiver<WarmProgress>) {
    while let Some(event) = rx.recv().await {
        match event {
            WarmProgress::PassStarted {
                region,
                pattern,
                pass,
                expected_probes,
            } => info!(region = %region, pattern = %pattern, pass, expected_probes, "Pass started"),
            WarmProgress::PassCompleted {
                region,
                pattern,
                pass,
                processed,
                failed,
            } => info!(region = %region, pattern = %pattern, pass, processed, failed, "Pass completed"),
            WarmProgress::Settling { region, delay } => {
                debug!(region = %region, delay_ms = delay.as_millis() as u64, "Settling")
            }
        }
    }
}

//! Argument parsing and output helpers shared across CLI commands.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use antivacuum::coord::WorldExtent;
use antivacuum::gate::{ActorPosition, ChannelFeedback, FeedbackMessage, FeedbackSink, LogFeedback};
use antivacuum::scheduler::WarmResult;
use antivacuum::source::SimulatedSource;
use antivacuum::RegionAddress;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::CliError;

/// How long a cancelled warm may keep running before it is abandoned.
pub const INTERRUPT_GRACE: Duration = Duration::from_secs(1);

/// Exit code used when a second interrupt arrives.
const INTERRUPT_EXIT_CODE: i32 = 130;

/// Parse a region address written as `RX,RZ`.
pub fn parse_region(s: &str) -> Result<RegionAddress, String> {
    let (rx, rz) = s
        .split_once(',')
        .ok_or_else(|| format!("expected RX,RZ but got '{}'", s))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<i32>()
            .map_err(|e| format!("invalid region component '{}': {}", v.trim(), e))
    };
    Ok(RegionAddress::new(parse(rx)?, parse(rz)?))
}

/// Parse an actor position written as `X,Y,Z`.
pub fn parse_position(s: &str) -> Result<ActorPosition, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [x, y, z] = parts.as_slice() else {
        return Err(format!("expected X,Y,Z but got '{}'", s));
    };
    let parse = |v: &str| {
        v.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("invalid coordinate '{}'", v))
    };
    Ok(ActorPosition::new(parse(*x)?, parse(*y)?, parse(*z)?))
}

/// Simulated source options common to the commands that warm.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceOptions {
    pub latency_ms: u64,
    pub fail_every: u64,
}

impl SourceOptions {
    pub fn build(&self, extent: WorldExtent) -> SimulatedSource {
        let source = SimulatedSource::new(extent).with_fail_every(self.fail_every);
        if self.latency_ms > 0 {
            source.with_latency(Duration::from_millis(self.latency_ms))
        } else {
            source
        }
    }
}

/// Install the Ctrl-C handler.
///
/// The first interrupt cancels `interrupt`; a second one exits immediately.
pub fn install_interrupt_handler(
    interrupt: CancellationToken,
    message: &'static str,
) -> Result<(), CliError> {
    let presses = AtomicUsize::new(0);
    ctrlc::set_handler(move || {
        if presses.fetch_add(1, Ordering::SeqCst) > 0 {
            eprintln!("Interrupted again, exiting");
            std::process::exit(INTERRUPT_EXIT_CODE);
        }
        eprintln!();
        eprintln!("{}", message);
        interrupt.cancel();
    })?;
    Ok(())
}

/// Destination of the gate's feedback: printed to stdout, or logged.
pub struct FeedbackOutput {
    sink: Arc<dyn FeedbackSink>,
    printer: Option<JoinHandle<()>>,
}

impl FeedbackOutput {
    /// Print feedback on `runtime`, or send it to the log when `quiet`.
    pub fn new(quiet: bool, runtime: &Handle) -> Self {
        if quiet {
            return Self {
                sink: Arc::new(LogFeedback),
                printer: None,
            };
        }
        let (feedback, rx) = ChannelFeedback::channel();
        Self {
            sink: Arc::new(feedback),
            printer: Some(runtime.spawn(print_feedback(rx))),
        }
    }

    pub fn sink(&self) -> Arc<dyn FeedbackSink> {
        Arc::clone(&self.sink)
    }

    /// Wait until every delivered line is printed.
    ///
    /// Returns once all other holders of the sink (the gate and its warms)
    /// are gone.
    pub async fn finish(self) {
        let FeedbackOutput { sink, printer } = self;
        drop(sink);
        if let Some(printer) = printer {
            let _ = printer.await;
        }
    }
}

/// Print feedback lines until every sender is gone.
pub async fn print_feedback(mut rx: UnboundedReceiver<FeedbackMessage>) {
    while let Some(message) = rx.recv().await {
        println!("{}", message);
    }
}

/// Print a short summary of a finished warm.
pub fn print_summary(result: &WarmResult) {
    let counts = result.counts();
    println!();
    println!("Warm Summary");
    println!("────────────");
    println!("  Region:     {} ({})", result.region(), result.mode());
    println!("  Processed:  {} cells ({} failed)", counts.processed, counts.failed);
    println!("  Ancillary:  {} probes", counts.ancillary_probes);
    println!(
        "  Passes:     {} over {} regions",
        counts.passes_run, counts.regions_warmed
    );
    println!("  Elapsed:    {:.2?}", result.elapsed());
}

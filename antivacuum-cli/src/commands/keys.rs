//! Keys command - drive the event gate from a script of ticks on stdin.
//!
//! Each input line is one tick:
//!
//! ```text
//! F8              F8 held this tick
//! F8 F9           both held
//!                 (empty line) nothing held
//! /warm aggressive 3,4    command trigger, optional region
//! /leave          end the session, cancelling its warms
//! /join           start a new session where the actor stands
//! ```
//!
//! The actor walks one cell along +X per tick. Command lines and session
//! lines count as ticks with no keys held.

use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use antivacuum::gate::{
    ActorPosition, EventGate, SessionAccessor, SharedSession, Trigger, WarmHandle,
};
use antivacuum::scheduler::{WarmMode, WarmResult, WarmScheduler};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::common::{
    install_interrupt_handler, parse_region, FeedbackOutput, SourceOptions, INTERRUPT_GRACE,
};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the keys command.
pub struct KeysArgs {
    pub start: ActorPosition,
    pub privileged: bool,
    pub tick_ms: u64,
    pub quiet: bool,
    pub source: SourceOptions,
}

/// One parsed input line.
#[derive(Debug, Clone, PartialEq)]
enum TickInput {
    Keys(Vec<String>),
    Command(Trigger),
    Leave,
    Join,
}

fn parse_line(line: &str) -> Result<TickInput, String> {
    let line = line.trim();
    let Some(command) = line.strip_prefix('/') else {
        return Ok(TickInput::Keys(
            line.split_whitespace().map(str::to_string).collect(),
        ));
    };

    let mut words = command.split_whitespace();
    match words.next() {
        Some("leave") => Ok(TickInput::Leave),
        Some("join") => Ok(TickInput::Join),
        Some("warm") => {
            let mode = match words.next() {
                Some(mode) => mode.parse::<WarmMode>().map_err(|e| e.to_string())?,
                None => WarmMode::Standard,
            };
            let region = words.next().map(parse_region).transpose()?;
            Ok(TickInput::Command(Trigger::command(mode, region)))
        }
        Some(other) => Err(format!("unknown command '/{}'", other)),
        None => Err("empty command".to_string()),
    }
}

/// Run the keys command.
pub fn run(args: KeysArgs, runner: &CliRunner) -> Result<(), CliError> {
    runner.log_startup("keys");
    let config = runner.config();

    let scheduler_config = config.scheduler_config();
    let source = Arc::new(args.source.build(scheduler_config.extent));
    let scheduler = WarmScheduler::new(source.clone(), scheduler_config);

    let session = Arc::new(SharedSession::active_at(args.start));
    session.set_privileged(args.privileged);

    let output = FeedbackOutput::new(args.quiet, &runner.handle());
    let mut gate = EventGate::new(
        Arc::new(scheduler),
        session.clone(),
        output.sink(),
        config.gate_config(),
        runner.handle(),
    );
    let keys: Vec<String> = gate.bindings().map(|b| b.key.clone()).collect();

    let interrupt = CancellationToken::new();
    install_interrupt_handler(interrupt.clone(), "Received interrupt, cancelling warms...")?;

    let lines = spawn_stdin_reader();
    let handles = runner.block_on(drive(
        &mut gate,
        &session,
        &keys,
        lines,
        &interrupt,
        Duration::from_millis(args.tick_ms),
    ))?;

    let started = handles.len();
    let results = runner.block_on(wait_for_warms(&gate, handles, &interrupt, INTERRUPT_GRACE));
    drop(gate);
    runner.block_on(output.finish());

    let abandoned = results.iter().filter(|r| r.is_none()).count();
    if abandoned > 0 {
        eprintln!("{} warm(s) abandoned before they could report", abandoned);
    }
    info!(
        warms_started = started,
        warms_abandoned = abandoned,
        regions_materialized = source.materialized_regions(),
        "Keys command finished"
    );
    Ok(())
}

/// Wait for every warm to report.
///
/// When `interrupt` fires the session is ended, cancelling every warm. A warm
/// that has not stopped within `grace` is abandoned and yields `None`.
async fn wait_for_warms(
    gate: &EventGate,
    handles: Vec<WarmHandle>,
    interrupt: &CancellationToken,
    grace: Duration,
) -> Vec<Option<WarmResult>> {
    let join_all = async {
        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(handle.join_until(interrupt, grace).await);
        }
        results
    };
    tokio::pin!(join_all);

    tokio::select! {
        results = &mut join_all => results,
        _ = interrupt.cancelled() => {
            gate.end_session();
            join_all.await
        }
    }
}

/// Feed ticks to the gate until input ends or an interrupt arrives.
async fn drive(
    gate: &mut EventGate,
    session: &SharedSession,
    keys: &[String],
    mut lines: mpsc::UnboundedReceiver<std::io::Result<String>>,
    interrupt: &CancellationToken,
    tick: Duration,
) -> Result<Vec<WarmHandle>, CliError> {
    let mut handles = Vec::new();
    // Last known position, so a re-join puts the actor back where it left.
    let mut position = session.actor_position();

    loop {
        let line = tokio::select! {
            biased;
            _ = interrupt.cancelled() => break,
            line = lines.recv() => match line {
                Some(line) => line.map_err(CliError::Input)?,
                None => break,
            },
        };

        let input = match parse_line(&line) {
            Ok(input) => input,
            Err(e) => {
                eprintln!("Ignoring line '{}': {}", line.trim(), e);
                TickInput::Keys(Vec::new())
            }
        };

        let held: &[String] = match &input {
            TickInput::Keys(held) => held,
            _ => &[],
        };
        for key in keys {
            let pressed = held.iter().any(|h| h.eq_ignore_ascii_case(key));
            handles.extend(gate.update_key(key, pressed));
        }

        match input {
            TickInput::Keys(_) => {}
            TickInput::Command(trigger) => handles.extend(gate.trigger(trigger)),
            TickInput::Leave => {
                session.leave();
                gate.end_session();
            }
            TickInput::Join => match position {
                Some(at) => session.join(at),
                None => warn!("No previous position to join at"),
            },
        }

        // Walk one cell along +X.
        if let Some(at) = session.actor_position() {
            let next = ActorPosition::new(at.x + 1.0, at.y, at.z);
            session.move_to(next);
            position = Some(next);
        }

        gate.tick();
        debug!(tick = gate.current_tick(), warms = handles.len(), "Tick");
        if !tick.is_zero() {
            tokio::time::sleep(tick).await;
        }
    }

    Ok(handles)
}

/// Read stdin lines on a dedicated thread.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<std::io::Result<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let failed = line.is_err();
            if tx.send(line).is_err() || failed {
                break;
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use antivacuum::coord::WorldExtent;
    use antivacuum::gate::{ChannelFeedback, FeedbackKind, FeedbackMessage, GateConfig};
    use antivacuum::scheduler::{SchedulerConfig, WarmOutcome};
    use antivacuum::source::SimulatedSource;
    use antivacuum::RegionAddress;
    use tokio::runtime::Handle;

    struct World {
        gate: EventGate,
        session: Arc<SharedSession>,
        keys: Vec<String>,
        feedback: mpsc::UnboundedReceiver<FeedbackMessage>,
    }

    fn world(source: SimulatedSource, settle_delay: Duration) -> World {
        let config = SchedulerConfig::default()
            .with_extent(WorldExtent::new(0, 16).unwrap())
            .with_settle_delay(settle_delay);
        let scheduler = WarmScheduler::new(Arc::new(source), config);
        let session = Arc::new(SharedSession::active_at(ActorPosition::new(14.0, 64.0, 0.0)));
        let (feedback, rx) = ChannelFeedback::channel();
        let gate = EventGate::new(
            Arc::new(scheduler),
            session.clone(),
            Arc::new(feedback),
            GateConfig::default(),
            Handle::current(),
        );
        let keys = gate.bindings().map(|b| b.key.clone()).collect();
        World {
            gate,
            session,
            keys,
            feedback: rx,
        }
    }

    fn script(lines: &[&str]) -> mpsc::UnboundedReceiver<std::io::Result<String>> {
        let (tx, rx) = mpsc::unbounded_channel();
        for line in lines {
            tx.send(Ok(line.to_string())).unwrap();
        }
        rx
    }

    fn small_source() -> SimulatedSource {
        SimulatedSource::new(WorldExtent::new(0, 16).unwrap())
    }

    #[test]
    fn test_parse_key_lines() {
        assert_eq!(parse_line("").unwrap(), TickInput::Keys(vec![]));
        assert_eq!(
            parse_line(" F8  f9 ").unwrap(),
            TickInput::Keys(vec!["F8".to_string(), "f9".to_string()])
        );
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse_line("/warm").unwrap(),
            TickInput::Command(Trigger::command(WarmMode::Standard, None))
        );
        assert_eq!(
            parse_line("/warm aggressive -2,5").unwrap(),
            TickInput::Command(Trigger::command(
                WarmMode::Aggressive,
                Some(RegionAddress::new(-2, 5))
            ))
        );
        assert_eq!(parse_line("/leave").unwrap(), TickInput::Leave);
        assert_eq!(parse_line("/join").unwrap(), TickInput::Join);
        assert!(parse_line("/warm sideways").is_err());
        assert!(parse_line("/fly").is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_drive_script() {
        let mut w = world(small_source(), Duration::from_secs(60));
        let interrupt = CancellationToken::new();
        let lines = script(&[
            "F8",     // press: standard warm at x = 14, region 0, 0
            "F8",     // still held: nothing
            "",       // release
            "f8",     // press again at x = 17, region 1, 0
            "F9",     // aggressive warm at x = 18
            "/leave", // cancels the aggressive warm
            "F8",     // no session: ignored
            "/join",  // back at x = 19
            "F8",     // standard warm at x = 20
        ]);

        let handles = drive(
            &mut w.gate,
            &w.session,
            &w.keys,
            lines,
            &interrupt,
            Duration::ZERO,
        )
        .await
        .unwrap();

        let started: Vec<_> = handles.iter().map(|h| (h.region(), h.mode())).collect();
        assert_eq!(
            started,
            vec![
                (RegionAddress::new(0, 0), WarmMode::Standard),
                (RegionAddress::new(1, 0), WarmMode::Standard),
                (RegionAddress::new(1, 0), WarmMode::Aggressive),
                (RegionAddress::new(1, 0), WarmMode::Standard),
            ]
        );
        let aggressive_id = handles[2].id();
        let rejoined_id = handles[3].id();

        // The actor kept walking after re-joining.
        let position = w.session.actor_position().unwrap();
        assert_eq!(position.x, 21.0);

        let results = wait_for_warms(&w.gate, handles, &interrupt, INTERRUPT_GRACE).await;
        let results: Vec<WarmResult> = results.into_iter().map(Option::unwrap).collect();
        assert_eq!(results[2].outcome(), WarmOutcome::Cancelled);
        assert_eq!(results[3].outcome(), WarmOutcome::Completed);
        assert_eq!(results[3].processed(), 16 * 16 * 16);

        drop(w.gate);
        let mut terminal = Vec::new();
        while let Some(message) = w.feedback.recv().await {
            if message.is_terminal() {
                terminal.push(message);
            }
        }
        assert_eq!(terminal.len(), 4);
        let aggressive = terminal.iter().find(|m| m.invocation == aggressive_id).unwrap();
        assert!(matches!(aggressive.kind, FeedbackKind::Cancelled { .. }));
        let rejoined = terminal.iter().find(|m| m.invocation == rejoined_id).unwrap();
        assert_eq!(rejoined.kind, FeedbackKind::Completed { processed: 4096 });
    }

    #[tokio::test]
    async fn test_drive_stops_on_interrupt() {
        let mut w = world(small_source(), Duration::from_millis(1));
        let interrupt = CancellationToken::new();
        interrupt.cancel();

        // The sender stays open, so only the interrupt can end the loop.
        let (_tx, lines) = mpsc::unbounded_channel();
        let handles = tokio::time::timeout(
            Duration::from_secs(5),
            drive(&mut w.gate, &w.session, &w.keys, lines, &interrupt, Duration::ZERO),
        )
        .await
        .expect("interrupt should end the tick loop")
        .unwrap();
        assert!(handles.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_interrupt_while_waiting_ends_session() {
        let mut w = world(small_source(), Duration::from_secs(60));
        let interrupt = CancellationToken::new();

        let handles = drive(
            &mut w.gate,
            &w.session,
            &w.keys,
            script(&["F9"]),
            &interrupt,
            Duration::ZERO,
        )
        .await
        .unwrap();
        assert_eq!(handles.len(), 1);

        let trigger = interrupt.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let results = tokio::time::timeout(
            Duration::from_secs(5),
            wait_for_warms(&w.gate, handles, &interrupt, INTERRUPT_GRACE),
        )
        .await
        .expect("interrupt should stop the wait");
        let result = results[0].as_ref().unwrap();
        assert!(result.is_cancelled());
        assert_eq!(result.counts().passes_run, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_interrupt_abandons_warm_stuck_in_pass() {
        let slow = small_source().with_latency(Duration::from_secs(1));
        let mut w = world(slow, Duration::from_millis(1));
        let interrupt = CancellationToken::new();

        let handles = drive(
            &mut w.gate,
            &w.session,
            &w.keys,
            script(&["F8"]),
            &interrupt,
            Duration::ZERO,
        )
        .await
        .unwrap();

        interrupt.cancel();
        let results = tokio::time::timeout(
            Duration::from_secs(5),
            wait_for_warms(&w.gate, handles, &interrupt, Duration::from_millis(50)),
        )
        .await
        .expect("a dense pass must not hold up the interrupt");
        assert_eq!(results.len(), 1);
        assert!(results[0].is_none());
    }
}

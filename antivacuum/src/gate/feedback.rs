//! Fire-and-forget feedback to the triggering actor.

use std::fmt;

use tokio::sync::mpsc;
use tracing::info;

use crate::coord::RegionAddress;
use crate::scheduler::{WarmMode, WarmOutcome, WarmResult};

/// Prefix of every feedback line.
pub const MESSAGE_PREFIX: &str = "[anti-vacuum]";

/// What a feedback message reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackKind {
    Started { mode: WarmMode },
    Completed { processed: u64 },
    Cancelled { processed: u64 },
    Error { reason: String },
}

/// One notification, tagged with the invocation it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackMessage {
    /// Id of the originating warm invocation (0 when no warm was started).
    pub invocation: u64,
    pub region: Option<RegionAddress>,
    pub kind: FeedbackKind,
}

impl FeedbackMessage {
    pub fn started(invocation: u64, region: RegionAddress, mode: WarmMode) -> Self {
        Self {
            invocation,
            region: Some(region),
            kind: FeedbackKind::Started { mode },
        }
    }

    pub fn error(invocation: u64, region: Option<RegionAddress>, reason: impl Into<String>) -> Self {
        Self {
            invocation,
            region,
            kind: FeedbackKind::Error {
                reason: reason.into(),
            },
        }
    }

    /// The single terminal message for a finished warm.
    pub fn finished(invocation: u64, result: &WarmResult) -> Self {
        let region = result.region();
        let kind = match result.outcome() {
            WarmOutcome::Completed => FeedbackKind::Completed {
                processed: result.processed(),
            },
            WarmOutcome::Cancelled => FeedbackKind::Cancelled {
                processed: result.processed(),
            },
            WarmOutcome::RegionUnavailable => FeedbackKind::Error {
                reason: format!("region {} unavailable", region),
            },
        };
        Self {
            invocation,
            region: Some(region),
            kind,
        }
    }

    /// Whether this message ends its invocation.
    pub fn is_terminal(&self) -> bool {
        !matches!(self.kind, FeedbackKind::Started { .. })
    }
}

impl fmt::Display for FeedbackMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let region = self
            .region
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string());
        match &self.kind {
            FeedbackKind::Started { mode } => {
                write!(f, "{} started: {} warm of region {}", MESSAGE_PREFIX, mode, region)
            }
            FeedbackKind::Completed { processed } => {
                write!(f, "{} completed: {} cells in region {}", MESSAGE_PREFIX, processed, region)
            }
            FeedbackKind::Cancelled { processed } => {
                write!(f, "{} cancelled: {} cells in region {}", MESSAGE_PREFIX, processed, region)
            }
            FeedbackKind::Error { reason } => write!(f, "{} error: {}", MESSAGE_PREFIX, reason),
        }
    }
}

/// One-way message sink visible to the actor.
pub trait FeedbackSink: Send + Sync {
    /// Deliver a message. Must not block.
    fn deliver(&self, message: FeedbackMessage);
}

/// Feedback sink backed by an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelFeedback {
    tx: mpsc::UnboundedSender<FeedbackMessage>,
}

impl ChannelFeedback {
    /// Create a sink and the receiver its messages arrive on.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<FeedbackMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl FeedbackSink for ChannelFeedback {
    fn deliver(&self, message: FeedbackMessage) {
        // Receiver gone means nobody is listening any more.
        let _ = self.tx.send(message);
    }
}

/// Feedback sink that writes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFeedback;

impl FeedbackSink for LogFeedback {
    fn deliver(&self, message: FeedbackMessage) {
        info!(invocation = message.invocation, "{}", message);
    }
}

//! Out-of-band event channel
//!
//! Engine errors (open, upgrade, transaction, request, mid-session) and
//! schema lifecycle notices are delivered here rather than through an
//! operation's own outcome.

use futures::channel::mpsc;
use tracing::{error, info};

use crate::error::DbError;
use crate::logging::prefix::DB;
use crate::outcome::Outcome;

/// Receiver of engine errors and lifecycle notices.
pub trait EventSink {
    /// An engine-level error occurred.
    fn error(&self, error: &DbError);

    /// A lifecycle notice, such as the store being created.
    fn notice(&self, _outcome: &Outcome) {}
}

/// Default sink: logs through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn error(&self, err: &DbError) {
        error!("{} {}", DB, err);
    }

    fn notice(&self, outcome: &Outcome) {
        info!("{} {}", DB, outcome);
    }
}

/// Event forwarded by a [`ChannelSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Error(DbError),
    Notice(Outcome),
}

/// Sink that forwards every event to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SinkEvent>,
}

impl ChannelSink {
    /// Create the sink together with the receiving end of its stream.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SinkEvent>) {
        let (tx, rx) = mpsc::unbounded();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn error(&self, err: &DbError) {
        // Receiver gone means nobody is listening any more
        let _ = self.tx.unbounded_send(SinkEvent::Error(err.clone()));
    }

    fn notice(&self, outcome: &Outcome) {
        let _ = self.tx.unbounded_send(SinkEvent::Notice(outcome.clone()));
    }
}

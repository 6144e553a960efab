//! Collaborators a simulator node hands its output to.
//!
//! Hosts plug in whatever transport they have; bounded and unbounded tokio
//! mpsc senders work out of the box. All sinks are synchronous: the
//! emission cycle never awaits its consumers.

use devsim_core::{DebugMessage, NodeStatus, OutboundMessage};
use tokio::sync::mpsc;

/// Why a sink refused a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error("sink is full")]
    Full,
    #[error("sink is closed")]
    Closed,
}

impl<T> From<mpsc::error::TrySendError<T>> for SinkError {
    fn from(err: mpsc::error::TrySendError<T>) -> Self {
        match err {
            mpsc::error::TrySendError::Full(_) => Self::Full,
            mpsc::error::TrySendError::Closed(_) => Self::Closed,
        }
    }
}

/// Downstream consumer of emitted messages.
pub trait EmitSink: Send + Sync {
    /// Hands one message downstream.
    ///
    /// # Errors
    ///
    /// Returns a [`SinkError`] when the message could not be delivered.
    fn emit(&self, message: OutboundMessage) -> Result<(), SinkError>;
}

/// Receiver of status updates. Delivery is best effort.
pub trait StatusSink: Send + Sync {
    /// Publishes one status update.
    fn report(&self, status: NodeStatus);
}

/// Side channel that mirrors emissions while debug mode is active.
/// Delivery is best effort.
pub trait DebugSink: Send + Sync {
    /// Publishes one mirrored emission.
    fn publish(&self, message: DebugMessage);
}

impl EmitSink for mpsc::Sender<OutboundMessage> {
    fn emit(&self, message: OutboundMessage) -> Result<(), SinkError> {
        self.try_send(message).map_err(SinkError::from)
    }
}

impl EmitSink for mpsc::UnboundedSender<OutboundMessage> {
    fn emit(&self, message: OutboundMessage) -> Result<(), SinkError> {
        self.send(message).map_err(|_| SinkError::Closed)
    }
}

impl StatusSink for mpsc::Sender<NodeStatus> {
    fn report(&self, status: NodeStatus) {
        let _ = self.try_send(status);
    }
}

impl StatusSink for mpsc::UnboundedSender<NodeStatus> {
    fn report(&self, status: NodeStatus) {
        let _ = self.send(status);
    }
}

impl DebugSink for mpsc::Sender<DebugMessage> {
    fn publish(&self, message: DebugMessage) {
        let _ = self.try_send(message);
    }
}

impl DebugSink for mpsc::UnboundedSender<DebugMessage> {
    fn publish(&self, message: DebugMessage) {
        let _ = self.send(message);
    }
}

/// Status sink that discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStatusSink;

impl StatusSink for NoopStatusSink {
    fn report(&self, _status: NodeStatus) {}
}

/// Debug sink for hosts without a debug channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDebugSink;

impl DebugSink for NoopDebugSink {
    fn publish(&self, _message: DebugMessage) {}
}

#[cfg(test)]
mod tests {
    use devsim_core::Payload;

    use super::*;

    fn message() -> OutboundMessage {
        OutboundMessage {
            topic: "t".to_string(),
            payload: Payload::default(),
        }
    }

    #[test]
    fn bounded_sender_reports_full_and_closed() {
        let (tx, rx) = mpsc::channel::<OutboundMessage>(1);
        assert_eq!(tx.emit(message()), Ok(()));
        assert_eq!(tx.emit(message()), Err(SinkError::Full));
        drop(rx);
        assert_eq!(tx.emit(message()), Err(SinkError::Closed));
    }

    #[test]
    fn unbounded_sender_reports_closed() {
        let (tx, mut rx) = mpsc::unbounded_channel::<OutboundMessage>();
        assert_eq!(tx.emit(message()), Ok(()));
        assert_eq!(rx.try_recv().unwrap(), message());
        drop(rx);
        assert_eq!(tx.emit(message()), Err(SinkError::Closed));
    }

    #[test]
    fn status_sink_ignores_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel::<NodeStatus>();
        drop(rx);
        tx.report(NodeStatus::Starting);
    }
}

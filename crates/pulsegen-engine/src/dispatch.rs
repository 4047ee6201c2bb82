//! Event dispatch bridge: forwards fired edges to subscribers.

use crossbeam::channel::{self, Receiver, Sender};

/// Which edge of a pulse fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// The rising/trigger instant of a pulse.
    Active,
    /// The falling/gate-release instant paired with an active edge.
    Passive,
}

/// A fired edge together with the sequence id of its pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseEvent {
    pub edge: EdgeKind,
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("event dispatch failed: {reason}")]
pub struct DispatchError {
    pub reason: String,
}

/// Consumer of fired edges.
///
/// The engine fires and forgets: no acknowledgement is awaited. An
/// `Err` aborts the run and surfaces to the caller of `run`; the engine
/// never retries on its own.
pub trait EventSink {
    fn fire(&mut self, edge: EdgeKind, id: u64) -> Result<(), DispatchError>;
}

impl<F> EventSink for F
where
    F: FnMut(EdgeKind, u64) -> Result<(), DispatchError>,
{
    fn fire(&mut self, edge: EdgeKind, id: u64) -> Result<(), DispatchError> {
        self(edge, id)
    }
}

/// Channel-backed sink for subscriber fan-out.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<PulseEvent>,
}

impl ChannelSink {
    /// An unbounded sink plus the receiving end subscribers read from.
    pub fn unbounded() -> (Self, Receiver<PulseEvent>) {
        let (tx, rx) = channel::unbounded();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn fire(&mut self, edge: EdgeKind, id: u64) -> Result<(), DispatchError> {
        self.tx
            .send(PulseEvent { edge, id })
            .map_err(|_| DispatchError {
                reason: "all subscribers disconnected".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sink_delivers_in_order() {
        let (mut sink, rx) = ChannelSink::unbounded();
        sink.fire(EdgeKind::Active, 0).unwrap();
        sink.fire(EdgeKind::Passive, 0).unwrap();
        assert_eq!(
            rx.try_recv().unwrap(),
            PulseEvent {
                edge: EdgeKind::Active,
                id: 0
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            PulseEvent {
                edge: EdgeKind::Passive,
                id: 0
            }
        );
    }

    #[test]
    fn test_channel_sink_fails_without_subscribers() {
        let (mut sink, rx) = ChannelSink::unbounded();
        drop(rx);
        assert!(sink.fire(EdgeKind::Active, 0).is_err());
    }
}

/// Generation telemetry hook.
///
/// Observers are invoked after the history lock is released and must
/// return promptly; anything slow belongs on the far side of a
/// [`ChannelObserver`].
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};

/// What the engine reports after each completed generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationTelemetry {
    pub sequence: u64,
    pub score: f64,
    pub recommendations: Vec<String>,
    /// Level the next selection will run with.
    pub randomization_level: f64,
}

pub trait GenerationObserver: Send + Sync {
    fn observe(&self, telemetry: &GenerationTelemetry);
}

/// Logs each generation through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl GenerationObserver for TracingObserver {
    fn observe(&self, telemetry: &GenerationTelemetry) {
        tracing::info!(
            sequence = telemetry.sequence,
            score = telemetry.score,
            level = telemetry.randomization_level,
            "blueprint generated"
        );
        for recommendation in &telemetry.recommendations {
            tracing::warn!(sequence = telemetry.sequence, "{}", recommendation);
        }
    }
}

/// Forwards telemetry into a bounded channel without ever blocking.
/// Events are dropped while the channel is full or the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: SyncSender<GenerationTelemetry>,
}

impl ChannelObserver {
    pub fn bounded(capacity: usize) -> (ChannelObserver, Receiver<GenerationTelemetry>) {
        let (sender, receiver) = mpsc::sync_channel(capacity);
        (ChannelObserver { sender }, receiver)
    }
}

impl GenerationObserver for ChannelObserver {
    fn observe(&self, telemetry: &GenerationTelemetry) {
        match self.sender.try_send(telemetry.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::debug!(sequence = telemetry.sequence, "telemetry channel full; dropped")
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn telemetry(sequence: u64) -> GenerationTelemetry {
        GenerationTelemetry {
            sequence,
            score: 0.7,
            recommendations: vec!["rotate tones".to_string()],
            randomization_level: 0.8,
        }
    }

    #[test]
    fn channel_delivers_until_full() {
        let (observer, receiver) = ChannelObserver::bounded(2);
        for seq in 0..5 {
            observer.observe(&telemetry(seq));
        }
        let received: Vec<u64> = receiver.try_iter().map(|t| t.sequence).collect();
        assert_eq!(received, vec![0, 1]);
    }

    #[test]
    fn disconnected_receiver_is_ignored() {
        let (observer, receiver) = ChannelObserver::bounded(1);
        drop(receiver);
        observer.observe(&telemetry(0));
    }

    #[test]
    fn tracing_observer_does_not_panic() {
        TracingObserver.observe(&telemetry(3));
    }
}

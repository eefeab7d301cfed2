//! Effect Dispatcher
//!
//! Drains the [`OutputEvent`] channel and delivers each event to the
//! collaborator responsible for it.
//!
//! ```text
//!   OutputConductor ──mpsc──▶ EffectDispatcher ──▶ OutputTransport
//!                                              ├──▶ ActionTrigger
//!                                              ├──▶ AudioFader
//!                                              └──▶ UsageSink
//! ```
//!
//! Delivery is in channel order. A failing collaborator is logged and the
//! dispatcher moves on; nothing is retried and nothing flows back into the
//! output state.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::collaborators::{
    ActionTrigger, AudioFader, LoggingCollaborators, OutputTransport, UsageSink,
};
use crate::events::{FadeDirection, OutputEvent};

/// The collaborators events are delivered to
#[derive(Clone)]
pub struct Collaborators {
    /// Renderer transport
    pub transport: Arc<dyn OutputTransport>,
    /// Automation engine
    pub actions: Arc<dyn ActionTrigger>,
    /// Audio mixer
    pub audio: Arc<dyn AudioFader>,
    /// Usage log
    pub usage: Arc<dyn UsageSink>,
}

impl Collaborators {
    /// Bundle collaborators
    pub fn new(
        transport: Arc<dyn OutputTransport>,
        actions: Arc<dyn ActionTrigger>,
        audio: Arc<dyn AudioFader>,
        usage: Arc<dyn UsageSink>,
    ) -> Self {
        Self {
            transport,
            actions,
            audio,
            usage,
        }
    }

    /// Collaborators that only log
    #[must_use]
    pub fn logging() -> Self {
        let logging = Arc::new(LoggingCollaborators);
        Self::new(logging.clone(), logging.clone(), logging.clone(), logging)
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Delivery counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Events delivered successfully
    pub delivered: u64,
    /// Events whose collaborator failed
    pub failed: u64,
}

/// Delivers output events to collaborators
#[derive(Debug, Clone)]
pub struct EffectDispatcher {
    collaborators: Collaborators,
}

impl EffectDispatcher {
    /// Create a dispatcher
    #[must_use]
    pub fn new(collaborators: Collaborators) -> Self {
        Self { collaborators }
    }

    /// Deliver a single event
    ///
    /// # Errors
    ///
    /// Returns the collaborator's error.
    pub async fn dispatch(&self, event: OutputEvent) -> anyhow::Result<()> {
        if let Some(message) = event.transport_message() {
            return self
                .collaborators
                .transport
                .send(message.channel, message.path, message.payload)
                .await;
        }

        match event {
            OutputEvent::RunAction { action_id } => {
                self.collaborators.actions.run_action(&action_id).await
            }
            OutputEvent::Activate { trigger } => self.collaborators.actions.activate(trigger).await,
            OutputEvent::FadeAudio { direction } => match direction {
                FadeDirection::Out => self.collaborators.audio.fade_out().await,
                FadeDirection::In => self.collaborators.audio.fade_in().await,
            },
            OutputEvent::UsageLogged { entry } => self.collaborators.usage.log_usage(&entry).await,
            other => {
                tracing::debug!(event = other.name(), "Event has no collaborator");
                Ok(())
            }
        }
    }

    /// Deliver events until the channel closes
    pub async fn run(self, mut rx: mpsc::UnboundedReceiver<OutputEvent>) -> DispatchStats {
        let mut stats = DispatchStats::default();
        tracing::debug!("Effect dispatcher started");

        while let Some(event) = rx.recv().await {
            let name = event.name();
            match self.dispatch(event).await {
                Ok(()) => stats.delivered += 1,
                Err(e) => {
                    stats.failed += 1;
                    tracing::warn!(event = name, error = %e, "Collaborator failed");
                }
            }
        }

        tracing::debug!(
            delivered = stats.delivered,
            failed = stats.failed,
            "Effect dispatcher stopped"
        );
        stats
    }

    /// Run the dispatcher on a background task
    #[must_use]
    pub fn spawn(self, rx: mpsc::UnboundedReceiver<OutputEvent>) -> JoinHandle<DispatchStats> {
        tokio::spawn(self.run(rx))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::events::{CustomTrigger, OutputChannel, UsageEntry};
    use crate::ids::{ActionId, OutputId};
    use crate::model::OutLayers;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        fail_transport: bool,
    }

    #[async_trait]
    impl OutputTransport for Recorder {
        async fn send(
            &self,
            channel: OutputChannel,
            path: &str,
            _payload: serde_json::Value,
        ) -> anyhow::Result<()> {
            self.calls.lock().push(format!("send {channel} {path}"));
            if self.fail_transport {
                anyhow::bail!("renderer gone");
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ActionTrigger for Recorder {
        async fn run_action(&self, action_id: &ActionId) -> anyhow::Result<()> {
            self.calls.lock().push(format!("action {action_id}"));
            Ok(())
        }

        async fn activate(&self, trigger: CustomTrigger) -> anyhow::Result<()> {
            self.calls.lock().push(format!("activate {trigger:?}"));
            Ok(())
        }
    }

    #[async_trait]
    impl AudioFader for Recorder {
        async fn fade_out(&self) -> anyhow::Result<()> {
            self.calls.lock().push("fade out".into());
            Ok(())
        }

        async fn fade_in(&self) -> anyhow::Result<()> {
            self.calls.lock().push("fade in".into());
            Ok(())
        }
    }

    #[async_trait]
    impl UsageSink for Recorder {
        async fn log_usage(&self, entry: &UsageEntry) -> anyhow::Result<()> {
            self.calls.lock().push(format!("usage {}", entry.name));
            Ok(())
        }
    }

    fn dispatcher(recorder: &Arc<Recorder>) -> EffectDispatcher {
        EffectDispatcher::new(Collaborators::new(
            recorder.clone(),
            recorder.clone(),
            recorder.clone(),
            recorder.clone(),
        ))
    }

    #[tokio::test]
    async fn test_events_routed_in_order() {
        let recorder = Arc::new(Recorder::default());
        let (tx, rx) = mpsc::unbounded_channel();

        tx.send(OutputEvent::StopPresentation).unwrap();
        tx.send(OutputEvent::State {
            output_id: OutputId::new("a"),
            layers: OutLayers::default(),
        })
        .unwrap();
        tx.send(OutputEvent::FadeAudio {
            direction: FadeDirection::Out,
        })
        .unwrap();
        tx.send(OutputEvent::Activate {
            trigger: CustomTrigger::VideoStart,
        })
        .unwrap();
        tx.send(OutputEvent::RunAction {
            action_id: ActionId::new("lights"),
        })
        .unwrap();
        tx.send(OutputEvent::UsageLogged {
            entry: UsageEntry {
                name: "Song".into(),
                time: chrono::Utc::now(),
                metadata: Vec::new(),
            },
        })
        .unwrap();
        drop(tx);

        let stats = dispatcher(&recorder).spawn(rx).await.unwrap();
        assert_eq!(stats, DispatchStats { delivered: 6, failed: 0 });
        assert_eq!(
            *recorder.calls.lock(),
            vec![
                "send MAIN PRESENTATION_CONTROL",
                "send OUTPUT OUTPUTS",
                "fade out",
                "activate VideoStart",
                "action lights",
                "usage Song",
            ]
        );
    }

    #[tokio::test]
    async fn test_failures_are_counted_not_fatal() {
        let recorder = Arc::new(Recorder {
            fail_transport: true,
            ..Recorder::default()
        });
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(OutputEvent::Removed {
            output_id: OutputId::new("a"),
        })
        .unwrap();
        tx.send(OutputEvent::FadeAudio {
            direction: FadeDirection::In,
        })
        .unwrap();
        drop(tx);

        let stats = dispatcher(&recorder).run(rx).await;
        assert_eq!(stats, DispatchStats { delivered: 1, failed: 1 });
    }
}

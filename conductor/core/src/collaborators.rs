//! Collaborator Traits
//!
//! Interfaces to the systems the output core drives but does not own:
//! the renderer transport, the automation engine, the audio mixer, the usage
//! log and the read-only show/template store.
//!
//! # Design Philosophy
//!
//! The async collaborators are fire-and-forget from the core's point of
//! view. They are only ever called by the effect dispatcher, never from the
//! mutation path, and their failures are logged rather than propagated.
//!
//! [`ShowStore`] is the exception: it is a synchronous lookup the mutation
//! path consults while it holds the state lock, so implementations must
//! answer from memory and must not block.

use async_trait::async_trait;

use crate::events::{CustomTrigger, OutputChannel, UsageEntry};
use crate::ids::{ActionId, CategoryId, LayoutId, OverlayId, ShowId, StyleId, TemplateId};
use crate::model::Overlay;
use crate::show::{Category, Show, SlideRef, Template};
use crate::style::Style;

/// Push computed output state to renderers
#[async_trait]
pub trait OutputTransport: Send + Sync {
    /// Send a payload on a channel path
    async fn send(
        &self,
        channel: OutputChannel,
        path: &str,
        payload: serde_json::Value,
    ) -> anyhow::Result<()>;
}

/// Automation hooks
#[async_trait]
pub trait ActionTrigger: Send + Sync {
    /// Run a stored action
    async fn run_action(&self, action_id: &ActionId) -> anyhow::Result<()>;

    /// Raise a custom trigger (video start/end)
    async fn activate(&self, trigger: CustomTrigger) -> anyhow::Result<()>;
}

/// Audio mixer fades
#[async_trait]
pub trait AudioFader: Send + Sync {
    /// Fade other playing audio out
    async fn fade_out(&self) -> anyhow::Result<()>;

    /// Fade other playing audio back in
    async fn fade_in(&self) -> anyhow::Result<()>;
}

/// Append-only usage log
#[async_trait]
pub trait UsageSink: Send + Sync {
    /// Record that a show went live
    async fn log_usage(&self, entry: &UsageEntry) -> anyhow::Result<()>;
}

/// Read-only lookups into the show/template store
///
/// Every method returns an owned copy; the core never holds references into
/// the store.
pub trait ShowStore: Send + Sync {
    /// Look up a show
    fn show(&self, id: &ShowId) -> Option<Show>;

    /// Displayable slide references of a show layout
    fn layout_ref(&self, show_id: &ShowId, layout_id: &LayoutId) -> Vec<SlideRef> {
        self.show(show_id)
            .map(|show| show.layout_ref(layout_id))
            .unwrap_or_default()
    }

    /// Look up an overlay
    fn overlay(&self, id: &OverlayId) -> Option<Overlay>;

    /// Look up an output style
    fn style(&self, id: &StyleId) -> Option<Style>;

    /// Look up a template
    fn template(&self, id: &TemplateId) -> Option<Template>;

    /// Look up a show category
    fn category(&self, id: &CategoryId) -> Option<Category>;
}

/// Collaborators that only log what they are asked to do
///
/// Useful as a default sink when no renderer or automation engine is
/// attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingCollaborators;

#[async_trait]
impl OutputTransport for LoggingCollaborators {
    async fn send(
        &self,
        channel: OutputChannel,
        path: &str,
        payload: serde_json::Value,
    ) -> anyhow::Result<()> {
        tracing::info!(%channel, path, %payload, "Transport send");
        Ok(())
    }
}

#[async_trait]
impl ActionTrigger for LoggingCollaborators {
    async fn run_action(&self, action_id: &ActionId) -> anyhow::Result<()> {
        tracing::info!(action_id = %action_id, "Run action");
        Ok(())
    }

    async fn activate(&self, trigger: CustomTrigger) -> anyhow::Result<()> {
        tracing::info!(?trigger, "Custom trigger");
        Ok(())
    }
}

#[async_trait]
impl AudioFader for LoggingCollaborators {
    async fn fade_out(&self) -> anyhow::Result<()> {
        tracing::info!("Fade audio out");
        Ok(())
    }

    async fn fade_in(&self) -> anyhow::Result<()> {
        tracing::info!("Fade audio in");
        Ok(())
    }
}

#[async_trait]
impl UsageSink for LoggingCollaborators {
    async fn log_usage(&self, entry: &UsageEntry) -> anyhow::Result<()> {
        tracing::info!(show = %entry.name, time = %entry.time, "Usage logged");
        Ok(())
    }
}

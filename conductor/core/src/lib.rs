//! Output Core - Headless Live-Output State for Presentation Displays
//!
//! This crate holds the state of every output (projector, stage screen,
//! stream) of a presentation tool and decides what each one shows. It does
//! not render anything: computed state is pushed to renderers through an
//! event channel, and everything outside the core (windows, audio mixer,
//! automation, usage log, show storage) is reached through traits.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │            Callers (UI, remote control, automation)              │
//! └───────────────────────────────┬──────────────────────────────────┘
//!                                 │ set_output / add_output / ...
//! ┌───────────────────────────────┼──────────────────────────────────┐
//! │                         OUTPUT CORE                              │
//! │  ┌────────────────────────────┴───────────────────────────────┐  │
//! │  │                     OutputConductor                         │  │
//! │  │  ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌────────────┐  │  │
//! │  │  │ Registry │  │ Resolver │  │ Mutator  │  │  Overlay   │  │  │
//! │  │  │          │  │          │  │          │  │  Timers    │  │  │
//! │  │  └──────────┘  └──────────┘  └──────────┘  └────────────┘  │  │
//! │  └────────────────────────────┬───────────────────────────────┘  │
//! │   compose · metadata · resolution (pure helpers)                 │
//! └───────────────────────────────┼──────────────────────────────────┘
//!                                 │ OutputEvent (mpsc)
//!                        ┌────────┴────────┐
//!                        │ EffectDispatcher │
//!                        └────────┬────────┘
//!        OutputTransport · ActionTrigger · AudioFader · UsageSink
//! ```
//!
//! # Key Types
//!
//! - [`OutputConductor`]: Handle to the output state, all mutations go here
//! - [`OutputUpdate`]: A change to one layer (slide, background, overlays,
//!   transition)
//! - [`OutputEvent`]: Effects the core asks the outside world to perform
//! - [`EffectDispatcher`]: Delivers events to the collaborator traits
//! - [`ShowStore`]: Read-only show, template and style lookups
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use output_core::{
//!     Background, Collaborators, EffectDispatcher, InMemoryShowStore, OutputConductor,
//!     OutputConfig, OutputUpdate,
//! };
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (tx, rx) = mpsc::unbounded_channel();
//!     let store = Arc::new(InMemoryShowStore::default());
//!     let conductor = OutputConductor::new(OutputConfig::default(), store, tx);
//!
//!     let dispatcher = EffectDispatcher::new(Collaborators::logging()).spawn(rx);
//!
//!     conductor.set_output(
//!         OutputUpdate::Background(Some(Background::media("/media/loop.mp4"))),
//!         None,
//!     );
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`conductor`]: The conductor handle, registry operations, queries
//! - [`registry`]: Configured outputs in declaration order
//! - [`resolver`]: Which outputs an update targets
//! - [`timers`]: Overlay expiry timers
//! - [`compose`]: Merging slide items with templates
//! - [`metadata`]: Metadata overlay content and dynamic placeholders
//! - [`resolution`]: Aspect ratios, canonical frame sizes, style positions
//! - [`layers`]: Transition selection and layer queries
//! - [`events`]: Outbound events
//! - [`collaborators`]: Traits for everything outside the core
//! - [`dispatch`]: Event delivery to collaborators
//! - [`store`]: In-memory show store
//! - [`config`]: TOML configuration

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod collaborators;
pub mod compose;
pub mod conductor;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod ids;
pub mod items;
pub mod layers;
pub mod metadata;
pub mod model;
mod mutator;
pub mod registry;
pub mod resolution;
pub mod resolver;
pub mod show;
pub mod store;
pub mod style;
pub mod timers;

// Re-exports for convenience
pub use collaborators::{
    ActionTrigger, AudioFader, LoggingCollaborators, OutputTransport, ShowStore, UsageSink,
};
pub use compose::{merge_with_template, MergeOptions};
pub use conductor::{OutputConductor, OutputUpdate, OverlayChange, OverlayMode};
pub use dispatch::{Collaborators, DispatchStats, EffectDispatcher};
pub use error::{OutputError, Result};
pub use events::{CustomTrigger, FadeDirection, OutputChannel, OutputEvent, UsageEntry};
pub use ids::{
    ActionId, CategoryId, LayoutId, OutputId, OverlayId, ShowId, SlideId, StyleId, TemplateId,
};
pub use items::{Item, Line, TextRun};
pub use layers::{output_lines, output_transitions, LayerKey, OutputTransitions};
pub use metadata::{compute_metadata, OutputMetadata};
pub use model::{Background, Bounds, OutLayers, OutSlide, Output, Overlay, SlideKind, Transition};
pub use registry::{OutputRegistry, RegistrySummary, StageOutputOptions};
pub use resolution::{compute_resolution, compute_scaled_resolution, Resolution};
pub use resolver::{resolve, ResolveOptions};
pub use store::{InMemoryShowStore, ShowLibrary};
pub use timers::{OverlayTimers, TimerKey};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, OutputConfig,
};

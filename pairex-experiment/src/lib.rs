//! The experiment engine: participant assignment, timeline expansion, and the
//! per-trial response state machines.
//!
//! The engine never renders. An external runner presents each
//! [`pairex_core::TrialSpec`] and feeds [`session::TrialEvent`]s back; the
//! [`session::Session`] routes them to the current trial's controller and
//! emits one immutable result per completed trial to a
//! [`pairex_sink::ResultSink`].

pub mod assign;
pub mod collector;
pub mod config;
pub mod form;
pub mod session;
pub mod timeline;

pub use assign::assign;
pub use collector::{CollectorState, SequentialCollector};
pub use config::{ConfigError, ExperimentConfig, RankingConfig};
pub use form::{FormError, FormPayload, RankingForm};
pub use session::{Session, SessionStatus, TrialEvent};
pub use timeline::{AssetResolver, StimulusFiles, TimelineBuilder};

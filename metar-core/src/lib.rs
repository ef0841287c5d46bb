//! Core library for the METAR relay.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Primary (CheckWX) and fallback (aviationweather.gov) METAR sources
//! - Schema detection, normalization and formatting of observations
//! - The fallback orchestrator and chat reply composition
//!
//! It is used by `metar-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod detect;
pub mod format;
pub mod model;
pub mod normalize;
pub mod notify;
pub mod provider;
pub mod reply;
pub mod service;

pub use config::{Config, Endpoints, ProviderConfig, TwilioConfig};
pub use model::{CanonicalReport, CloudLayer, RawObservation, SchemaKind, Station};
pub use notify::{Notifier, StdoutNotifier, TwilioNotifier};
pub use provider::{MetarSource, ProviderId, SourceError};
pub use service::{MetarService, PipelineError};

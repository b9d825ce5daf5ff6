//! callroute - per-call route decision engine
//!
//! This library ranks candidate transport routes for a call from live
//! telemetry, prices the best of them, checks system behaviour against
//! statistical baselines and decides whether the call proceeds or is
//! aborted. It is invoked by a host process; identity verification,
//! analytics storage and session encryption are supplied through the
//! traits in [`collaborator`].

pub mod anomaly;
pub mod collaborator;
pub mod config;
pub mod logging;
pub mod orchestrator;
pub mod routing;

pub use config::EngineConfig;
pub use orchestrator::{CallDecision, Collaborators, RouteDecisionOrchestrator};

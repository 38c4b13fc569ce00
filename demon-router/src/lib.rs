//! Pipeline routing for the Demon Engine.
//!
//! A [`Router`] resolves `(intent, tier, client)` against a [`Registry`] of
//! pipelines. Lookups try the exact key and then the client wildcard. Pro-only
//! pipelines are refused to pro-tier callers without a plan and downgraded to an
//! upsell stub for free-tier callers. Operators can disable exact keys through the
//! [`KillSwitchSet`].

#![warn(missing_docs, clippy::pedantic)]

pub mod decision;
pub mod error;
pub mod killswitch;
pub mod registry;
pub mod router;

pub use decision::{PRO_ONLY_CONTRACT, PRO_UPSELL_TEMPLATE, RouteDecision};
pub use error::{RegistryError, RegistryResult, RouteError, RouteResult};
pub use killswitch::KillSwitchSet;
pub use registry::{DEFAULT_INTENT, PipelineEntry, Registry, RouteKey, WILDCARD_CLIENT};
pub use router::Router;

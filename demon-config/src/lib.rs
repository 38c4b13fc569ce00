//! Configuration for the Demon Engine.
//!
//! [`Compendium`] is the validated technique catalog with its scoring weights and
//! per-tier budgets. [`EngineSettings`] carries runtime limits loaded from JSON
//! with `DEMON_*` environment overrides.

#![warn(missing_docs, clippy::pedantic)]

pub mod compendium;
pub mod error;
pub mod scoring;
pub mod settings;
pub mod technique;

pub use compendium::{Compendium, CompendiumBuilder};
pub use error::{CompendiumError, CompendiumResult, SettingsError, SettingsResult};
pub use scoring::{Penalty, ScoringWeights, Signal};
pub use settings::{EngineSettings, MAX_TECHNIQUES_LIMIT};
pub use technique::{TechniqueCore, normalize_directive};

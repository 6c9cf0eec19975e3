//! Sparkdown Engine: deterministic runtime for compiled narrative scripts.
//!
//! Walks a compiled block graph one host tick at a time: evaluating
//! conditions, jumping between sections, waiting, showing text and
//! choices, and spawning entities through host-provided collaborators.
//! Random values are derived from the session seed and per-command
//! execution counts, so a run is reproducible from its inputs.

pub mod core;
pub mod schema;

pub use crate::core::config::EngineConfig;
pub use crate::core::engine::{Engine, EngineBuilder, EngineError};
pub use crate::core::events::EngineEvent;
pub use crate::schema::program::Program;
pub use crate::schema::value::Value;

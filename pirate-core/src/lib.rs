//! pirate-core: shared config, error taxonomy and dynamic-dispatch registry
//! for the Pantry Pirate Radio job pipeline.
//!
//! Every other crate in the workspace (queue, HSDS schema/validator, content
//! store, LLM worker, reconciler, recorder, publisher, orchestrator) depends
//! on this crate for its config surface and its error kinds so that failures
//! compose into one coherent taxonomy as they cross queue/process boundaries.

pub mod config;
pub mod errors;
pub mod geo;
pub mod registry;

pub use config::PirateConfig;
pub use errors::{ErrorKind, PirateError, PirateResult};
pub use registry::NamedRegistry;

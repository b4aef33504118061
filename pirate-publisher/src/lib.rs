//! Syncs recorder output and a database snapshot into the public dataset
//! repository on a fixed interval. Never rebases or force-pushes; pushing
//! itself is gated behind `PUBLISHER_PUSH_ENABLED` so a fresh deployment
//! stays read-only until an operator opts in.

pub mod config;
pub mod git;
pub mod publisher;
pub mod ratchet;
pub mod sql_dump;
pub mod sync;
pub mod watermark;

pub use config::PublisherConfig;
pub use publisher::{Publisher, TickReport};
pub use ratchet::{Ratchet, RatchetConfig};
pub use watermark::PublisherState;

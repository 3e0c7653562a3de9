//! Core library components.
//!
//! This module contains the snapshot store, the keyed TTL cache, the
//! refresh orchestrator and the secret source abstraction.

pub mod clock;
pub mod config;
pub mod constants;
pub mod keyed;
pub mod orchestrator;
pub mod service;
pub mod snapshot;
pub mod source;
pub mod store;
pub mod types;

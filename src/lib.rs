//! vaultcache - A local, integrity-checked cache for remotely held secrets.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/                # Administrative command-line interface
//! │   ├── status          # Cache statistics
//! │   ├── refresh         # Forced refresh
//! │   ├── secrets         # get / list
//! │   ├── clear           # Drop the cached snapshot
//! │   └── completions     # Shell completions
//! └── core/               # Core library components
//!     ├── config          # .vaultcache.toml management
//!     ├── snapshot        # Snapshot type and content digest
//!     ├── store/          # Durable snapshot store
//!     │   ├── file        # Atomic cache file
//!     │   └── mirror      # Shared-memory mirror
//!     ├── keyed           # Per-key TTL cache
//!     ├── source/         # Secret sources and credential providers
//!     ├── orchestrator/   # Authentication, refresh and fallback
//!     └── service         # Application-scoped owner of the above
//! ```
//!
//! # Features
//!
//! - SHA-256 verified snapshots, persisted with atomic replace
//! - Stale-but-valid serving while the secret source is unreachable
//! - Single-flight refresh on a fixed interval with a fetch timeout
//! - Case-insensitive keyed cache with background expiry sweep

pub mod cli;
pub mod core;
pub mod error;

pub use crate::core::orchestrator::{Notification, OrchestratorState, RefreshOrchestrator};
pub use crate::core::service::SecretCache;
pub use crate::core::store::CacheStore;
pub use crate::error::{Error, Result};

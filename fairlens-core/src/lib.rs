// fairlens-core/src/lib.rs

// 1. Documentation is encouraged but not enforced yet
#![allow(missing_docs)]
// 2. Memory safety
#![deny(unsafe_code)]
// 3. Robustness
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
// 4. Performance
#![warn(clippy::perf)]

// --- HEXAGONAL MODULES ---

// 1. Ports (Interfaces / Traits)
// Contract with the remote analysis backend.
pub mod ports;

// 2. Domain (business core)
// Rule catalog, stage registry/tracker, aggregation.
// Depends on nothing else (no infra, no app).
pub mod domain;

// 3. Infrastructure (Adapters)
// HTTP + fixture backends, config files, filesystem.
pub mod infrastructure;

// 4. Application (Use Cases)
// Pipeline orchestration.
pub mod application;

// --- GLOBAL ERROR HANDLING ---
pub mod error;

// --- RE-EXPORTS (FACADE) ---
pub use error::FairlensError;

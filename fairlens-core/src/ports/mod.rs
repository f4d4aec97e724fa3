// fairlens-core/src/ports/mod.rs

pub mod backend;

pub use backend::{AnalysisBackend, BackendError};

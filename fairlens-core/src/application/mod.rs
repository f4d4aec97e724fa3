// fairlens-core/src/application/mod.rs

pub mod pipeline;

// --- RE-EXPORTS (FACADE PATTERN) ---
// Lets the CLI do `use fairlens_core::application::PipelineOrchestrator;`
// without knowing the file layout.

pub use pipeline::{CANCELLED_MESSAGE, PipelineOrchestrator, SharedCatalog};

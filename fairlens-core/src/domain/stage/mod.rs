// fairlens-core/src/domain/stage/mod.rs

pub mod registry;
pub mod tracker;

pub use registry::{FeatureGate, Stage, StageId, StageRegistry};
pub use tracker::{StageRun, StageStatus, StageTracker};

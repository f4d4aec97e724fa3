// fairlens-core/src/infrastructure/adapters/mod.rs

pub mod fixture;
pub mod http;

pub use fixture::FixtureBackend;
pub use http::HttpAnalysisBackend;

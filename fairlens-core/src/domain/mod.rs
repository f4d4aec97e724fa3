pub mod bias;
pub mod detail;
pub mod error;
pub mod stage;

// Handy re-exports to keep imports short elsewhere
pub use detail::Detail;
pub use error::DomainError;

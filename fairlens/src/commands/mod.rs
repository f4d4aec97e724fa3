// fairlens/src/commands/mod.rs

pub mod rules;
pub mod run;
pub mod stages;

pub mod runner;

pub use runner::{RunArtifacts, Runner, RunnerOptions};

#[cfg(feature = "backend")]
pub mod backends;
pub mod constants;
pub mod deployment;
pub mod models;

pub use deployment::{classify, decide, Decision, NotifyAction, Observation, TrackedState};

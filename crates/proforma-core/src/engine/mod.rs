pub mod indicators;
pub mod orchestrator;

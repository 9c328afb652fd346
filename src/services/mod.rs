pub mod orchestrator;
pub mod pipeline;
pub mod queue;
pub mod steps;

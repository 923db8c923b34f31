pub mod ordering;
pub mod queue;
pub mod selection;
pub mod telemetry;
pub mod tree;

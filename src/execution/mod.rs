// Position lifecycle and scan scheduling
pub mod position_tracker;
pub mod scanner;

pub use position_tracker::{exit_reason, PositionTracker};
pub use scanner::{shutdown_listener, CycleReport, Scanner};

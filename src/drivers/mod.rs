//! Worker plumbing and hardware adapters.

pub mod task_pin;
pub mod ticker;
pub mod uart;

//! Example local tools. These are demonstration material, not load-bearing
//! parts of the orchestrator: any caller can register its own
//! [`crate::tool::ToolDescriptor`]s instead.

pub mod calculator;
pub mod weather;

pub use calculator::calculator_descriptor;
pub use weather::weather_descriptor;

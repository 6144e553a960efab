//! Device simulator core: payload variation, change gating, and interval policy.
//!
//! Everything here is synchronous and free of I/O. The async scheduling loop
//! that drives these pieces lives in `devsim-node`.

pub mod builder;
pub mod clock;
pub mod config;
pub mod gate;
pub mod interval;
pub mod numeric;
pub mod random;
pub mod status;
pub mod types;

pub use builder::build;
pub use clock::{ClockSource, FixedClock, SystemClock};
pub use config::{ConfigError, SimulatorConfig, SimulatorSettings};
pub use gate::should_emit;
pub use interval::IntervalPolicy;
pub use random::{sample, ConstantRandom, RandomSource, SeededRandom, ThreadRandom};
pub use status::{NodeStatus, StatusFill, StatusIndicator, StatusShape, TriggerSource};
pub use types::{DebugMessage, FieldRule, OutboundMessage, Payload, Template};

//! Device simulator node: the tokio emission scheduler, its sinks, and the
//! admin registry for inject / toggle-debug operations.

pub mod admin;
pub mod config;
pub mod cycle;
pub mod error;
pub mod scheduler;
pub mod telemetry;
pub mod traits;

pub use admin::{NodeRegistry, Principal, WRITE_PERMISSION};
pub use config::NodeConfig;
pub use cycle::{CycleOutcome, EmissionCycle, Sinks, DEFAULT_NODE_NAME};
pub use error::{AdminError, NodeError};
pub use scheduler::{SchedulerState, SimulatorHandle, SimulatorNode};
pub use telemetry::{init_tracing, LogFormat};
pub use traits::{DebugSink, EmitSink, NoopDebugSink, NoopStatusSink, SinkError, StatusSink};

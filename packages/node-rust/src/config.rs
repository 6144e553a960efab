/// Runtime configuration of one simulator node instance.
///
/// Separate from [`devsim_core::SimulatorSettings`], which describes *what*
/// the node emits; this describes how the instance itself is hosted.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Unique identifier used for registry lookup, logs and debug mirrors.
    pub node_id: String,
    /// Capacity of the command channel feeding the scheduler task.
    pub command_channel_capacity: usize,
    /// Seed for a reproducible random sequence. `None` uses the thread RNG.
    pub seed: Option<u64>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: uuid::Uuid::new_v4().to_string(),
            command_channel_capacity: 64,
            seed: None,
        }
    }
}

impl NodeConfig {
    /// Default configuration with an explicit node id.
    #[must_use]
    pub fn with_id(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            ..Self::default()
        }
    }
}

//! Administrative operations on running simulator nodes.
//!
//! A host exposes these behind its own transport (HTTP routes, RPC, ...):
//! forcing one emission cycle and toggling debug mirroring. Both require the
//! write permission and answer not-found for ids that are unknown or whose
//! node has stopped.

use dashmap::DashMap;
use devsim_core::TriggerSource;
use tracing::error;

use crate::cycle::CycleOutcome;
use crate::error::{AdminError, NodeError};
use crate::scheduler::SimulatorHandle;

/// Permission required by every administrative operation.
pub const WRITE_PERMISSION: &str = "device-simulator.write";

/// Authenticated caller of an administrative operation.
#[derive(Debug, Clone, Default)]
pub struct Principal {
    /// Identifier of the caller, used in logs.
    pub id: String,
    /// Permissions granted to the caller.
    pub permissions: Vec<String>,
}

impl Principal {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            permissions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    #[must_use]
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

/// Registry of running simulator nodes, keyed by node id.
pub struct NodeRegistry {
    nodes: DashMap<String, SimulatorHandle>,
}

impl NodeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: DashMap::new(),
        }
    }

    /// Registers a node under its id, replacing any previous entry.
    pub fn register(&self, handle: SimulatorHandle) {
        self.nodes.insert(handle.id().to_string(), handle);
    }

    /// Removes a node, returning its handle if it was registered.
    pub fn remove(&self, id: &str) -> Option<SimulatorHandle> {
        self.nodes.remove(id).map(|(_, handle)| handle)
    }

    /// Returns the handle of a registered node that is still running.
    pub fn get(&self, id: &str) -> Option<SimulatorHandle> {
        self.nodes
            .get(id)
            .map(|entry| entry.value().clone())
            .filter(SimulatorHandle::is_running)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Forces one emission cycle on the node `id`.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::Forbidden`] without the write permission,
    /// [`AdminError::NotFound`] for unknown or stopped nodes, and
    /// [`AdminError::TriggerFailed`] when the cycle itself failed. A failed
    /// cycle does not affect the node's schedule.
    pub async fn inject(&self, caller: &Principal, id: &str) -> Result<CycleOutcome, AdminError> {
        authorize(caller)?;
        let handle = self.lookup(id)?;
        match handle.trigger(TriggerSource::Manual).await {
            Ok(outcome) => Ok(outcome),
            Err(NodeError::Stopped) => Err(self.not_found(id)),
            Err(err) => {
                error!(node_id = id, caller = %caller.id, error = %err, "manual trigger failed");
                Err(AdminError::TriggerFailed(err))
            }
        }
    }

    /// Flips debug mirroring on the node `id`, returning the new state.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::Forbidden`] without the write permission and
    /// [`AdminError::NotFound`] for unknown or stopped nodes.
    pub async fn toggle_debug(&self, caller: &Principal, id: &str) -> Result<bool, AdminError> {
        authorize(caller)?;
        let handle = self.lookup(id)?;
        handle.toggle_debug().await.map_err(|_| self.not_found(id))
    }

    fn lookup(&self, id: &str) -> Result<SimulatorHandle, AdminError> {
        self.get(id).ok_or_else(|| self.not_found(id))
    }

    /// Drops a stale entry and builds the not-found error for it.
    fn not_found(&self, id: &str) -> AdminError {
        self.nodes.remove_if(id, |_, handle| !handle.is_running());
        AdminError::NotFound { id: id.to_string() }
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn authorize(caller: &Principal) -> Result<(), AdminError> {
    if caller.has_permission(WRITE_PERMISSION) {
        Ok(())
    } else {
        Err(AdminError::Forbidden {
            permission: WRITE_PERMISSION,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use devsim_core::{
        FixedClock, IntervalPolicy, NodeStatus, OutboundMessage, SeededRandom, SimulatorConfig,
        Template,
    };
    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;
    use crate::config::NodeConfig;
    use crate::cycle::Sinks;
    use crate::scheduler::SimulatorNode;
    use crate::traits::{EmitSink, SinkError, StatusSink};

    /// Emit sink that records messages and can be switched to refuse them.
    #[derive(Default)]
    struct RecordingSink {
        messages: Mutex<Vec<OutboundMessage>>,
        refuse: Mutex<bool>,
    }

    impl EmitSink for RecordingSink {
        fn emit(&self, message: OutboundMessage) -> Result<(), SinkError> {
            if *self.refuse.lock() {
                return Err(SinkError::Closed);
            }
            self.messages.lock().push(message);
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingStatus(Mutex<Vec<NodeStatus>>);

    impl StatusSink for RecordingStatus {
        fn report(&self, status: NodeStatus) {
            self.0.lock().push(status);
        }
    }

    fn writer() -> Principal {
        Principal::new("ops").with_permission(WRITE_PERMISSION)
    }

    fn start_node(id: &str, emit: Arc<RecordingSink>) -> SimulatorNode {
        start_node_with_status(id, emit, Arc::new(RecordingStatus::default()))
    }

    fn start_node_with_status(
        id: &str,
        emit: Arc<RecordingSink>,
        status: Arc<RecordingStatus>,
    ) -> SimulatorNode {
        let template: Template = serde_json::from_value(json!({ "temp": 20 })).unwrap();
        let mut config = SimulatorConfig::new(template, Vec::new());
        config.interval = IntervalPolicy::Fixed {
            interval_ms: 60_000,
        };
        SimulatorNode::start_with(
            NodeConfig::with_id(id),
            config,
            Sinks::new(emit, status),
            Box::new(SeededRandom::new(1)),
            Arc::new(FixedClock(0)),
        )
    }

    #[tokio::test]
    async fn inject_runs_one_cycle() {
        let emit = Arc::new(RecordingSink::default());
        let mut node = start_node("sim-a", Arc::clone(&emit));
        let registry = NodeRegistry::new();
        registry.register(node.handle());

        let outcome = registry.inject(&writer(), "sim-a").await.unwrap();
        assert_eq!(outcome, CycleOutcome::Sent);
        assert_eq!(emit.messages.lock().len(), 1);

        node.stop().await;
    }

    #[tokio::test]
    async fn inject_status_reads_as_input() {
        let emit = Arc::new(RecordingSink::default());
        let status = Arc::new(RecordingStatus::default());
        let mut node = start_node_with_status("sim-g", emit, Arc::clone(&status));
        let registry = NodeRegistry::new();
        registry.register(node.handle());

        registry.inject(&writer(), "sim-g").await.unwrap();
        let sent = status
            .0
            .lock()
            .iter()
            .find(|s| matches!(s, NodeStatus::Sent { .. }))
            .cloned()
            .unwrap();
        assert_eq!(
            sent,
            NodeStatus::Sent {
                source: TriggerSource::Manual,
                at_ms: 0
            }
        );
        assert_eq!(sent.to_string(), "input 00:00:00");

        node.stop().await;
    }

    #[tokio::test]
    async fn operations_require_write_permission() {
        let emit = Arc::new(RecordingSink::default());
        let mut node = start_node("sim-b", Arc::clone(&emit));
        let registry = NodeRegistry::new();
        registry.register(node.handle());

        let reader = Principal::new("viewer").with_permission("device-simulator.read");
        assert!(matches!(
            registry.inject(&reader, "sim-b").await,
            Err(AdminError::Forbidden { .. })
        ));
        assert!(matches!(
            registry.toggle_debug(&reader, "sim-b").await,
            Err(AdminError::Forbidden { .. })
        ));
        assert!(emit.messages.lock().is_empty());

        node.stop().await;
    }

    #[tokio::test]
    async fn unknown_node_is_not_found() {
        let registry = NodeRegistry::new();
        assert!(matches!(
            registry.inject(&writer(), "missing").await,
            Err(AdminError::NotFound { id }) if id == "missing"
        ));
        assert!(matches!(
            registry.toggle_debug(&writer(), "missing").await,
            Err(AdminError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn stopped_node_is_not_found_and_pruned() {
        let emit = Arc::new(RecordingSink::default());
        let mut node = start_node("sim-c", emit);
        let registry = NodeRegistry::new();
        registry.register(node.handle());
        node.stop().await;

        assert!(matches!(
            registry.inject(&writer(), "sim-c").await,
            Err(AdminError::NotFound { .. })
        ));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn toggle_debug_flips_state() {
        let emit = Arc::new(RecordingSink::default());
        let mut node = start_node("sim-d", emit);
        let registry = NodeRegistry::new();
        registry.register(node.handle());

        assert!(registry.toggle_debug(&writer(), "sim-d").await.unwrap());
        assert!(!registry.toggle_debug(&writer(), "sim-d").await.unwrap());

        node.stop().await;
    }

    #[tokio::test]
    async fn failed_inject_reports_error_and_node_keeps_running() {
        let emit = Arc::new(RecordingSink::default());
        let mut node = start_node("sim-e", Arc::clone(&emit));
        let registry = NodeRegistry::new();
        registry.register(node.handle());

        *emit.refuse.lock() = true;
        assert!(matches!(
            registry.inject(&writer(), "sim-e").await,
            Err(AdminError::TriggerFailed(NodeError::Emit(SinkError::Closed)))
        ));

        *emit.refuse.lock() = false;
        assert_eq!(
            registry.inject(&writer(), "sim-e").await.unwrap(),
            CycleOutcome::Sent
        );
        assert_eq!(registry.len(), 1);

        node.stop().await;
    }

    #[tokio::test]
    async fn remove_forgets_node() {
        let emit = Arc::new(RecordingSink::default());
        let mut node = start_node("sim-f", emit);
        let registry = NodeRegistry::new();
        registry.register(node.handle());

        assert!(registry.remove("sim-f").is_some());
        assert!(registry.get("sim-f").is_none());
        assert!(registry.remove("sim-f").is_none());

        node.stop().await;
    }
}

//! One build -> gate -> emit step, shared by scheduled ticks and triggers.

use std::sync::Arc;
use std::time::Duration;

use devsim_core::{
    build, should_emit, ClockSource, DebugMessage, NodeStatus, OutboundMessage, Payload,
    RandomSource, SimulatorConfig, TriggerSource,
};
use serde::Serialize;
use tracing::debug;

use crate::traits::{DebugSink, EmitSink, NoopDebugSink, SinkError, StatusSink};

/// Name used in debug mirrors when the node has none.
pub const DEFAULT_NODE_NAME: &str = "device simulator";

/// Result of one emission cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    /// The payload was handed to the emit sink.
    Sent,
    /// No trigger field changed; nothing was emitted.
    NoChange,
}

/// The collaborators a node reports to.
#[derive(Clone)]
pub struct Sinks {
    pub emit: Arc<dyn EmitSink>,
    pub status: Arc<dyn StatusSink>,
    pub debug: Arc<dyn DebugSink>,
}

impl Sinks {
    /// Sinks without a debug channel.
    #[must_use]
    pub fn new(emit: Arc<dyn EmitSink>, status: Arc<dyn StatusSink>) -> Self {
        Self {
            emit,
            status,
            debug: Arc::new(NoopDebugSink),
        }
    }

    /// Replaces the debug sink.
    #[must_use]
    pub fn with_debug(mut self, debug: Arc<dyn DebugSink>) -> Self {
        self.debug = debug;
        self
    }
}

/// Mutable emission state owned by exactly one scheduler task.
pub struct EmissionCycle {
    node_id: String,
    config: Arc<SimulatorConfig>,
    last_emitted: Payload,
    debug_active: bool,
    rng: Box<dyn RandomSource>,
    clock: Arc<dyn ClockSource>,
    sinks: Sinks,
}

impl EmissionCycle {
    /// Creates the cycle state. The last emitted payload starts as a copy of the template.
    #[must_use]
    pub fn new(
        node_id: String,
        config: Arc<SimulatorConfig>,
        sinks: Sinks,
        rng: Box<dyn RandomSource>,
        clock: Arc<dyn ClockSource>,
    ) -> Self {
        Self {
            node_id,
            last_emitted: config.template.to_payload(),
            debug_active: config.debug_active,
            config,
            rng,
            clock,
            sinks,
        }
    }

    /// Builds a payload and emits it unless the change gate suppresses it.
    ///
    /// The last emitted payload only advances when the emit sink accepts the
    /// message. A sink failure leaves status untouched.
    ///
    /// # Errors
    ///
    /// Returns the [`SinkError`] raised by the emit sink.
    pub fn run(&mut self, source: TriggerSource) -> Result<CycleOutcome, SinkError> {
        let payload = build(&self.config.template, &self.config.rules, self.rng.as_mut());
        let at_ms = self.clock.now();

        if !should_emit(&payload, &self.last_emitted, &self.config.rules) {
            debug!(node_id = %self.node_id, ?source, "no trigger field changed, suppressing");
            self.sinks.status.report(NodeStatus::NoChange { at_ms });
            return Ok(CycleOutcome::NoChange);
        }

        let message = OutboundMessage {
            topic: self.config.topic.clone(),
            payload: payload.clone(),
        };
        let mirror = self.debug_active.then(|| self.debug_message(&message));

        self.sinks.emit.emit(message)?;
        self.last_emitted = payload;
        if let Some(mirror) = mirror {
            self.sinks.debug.publish(mirror);
        }

        debug!(node_id = %self.node_id, ?source, "payload emitted");
        self.sinks.status.report(NodeStatus::Sent { source, at_ms });
        Ok(CycleOutcome::Sent)
    }

    /// Delay until the next scheduled tick.
    pub fn next_interval(&mut self) -> Duration {
        self.config.interval.next_interval(self.rng.as_mut())
    }

    /// Flips debug mirroring and returns the new state.
    pub fn toggle_debug(&mut self) -> bool {
        self.debug_active = !self.debug_active;
        self.debug_active
    }

    #[must_use]
    pub fn debug_active(&self) -> bool {
        self.debug_active
    }

    #[must_use]
    pub fn last_emitted(&self) -> &Payload {
        &self.last_emitted
    }

    #[must_use]
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    fn debug_message(&self, message: &OutboundMessage) -> DebugMessage {
        let name = if self.config.name.is_empty() {
            DEFAULT_NODE_NAME.to_string()
        } else {
            self.config.name.clone()
        };
        DebugMessage {
            id: self.node_id.clone(),
            name,
            topic: self.config.topic.clone(),
            msg: message.clone(),
        }
    }
}

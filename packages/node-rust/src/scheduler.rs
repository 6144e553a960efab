//! Emission scheduler: a single-owner tokio task driving a simulator node.
//!
//! The task owns the [`EmissionCycle`] and the pending deadline. Scheduled
//! ticks and out-of-band commands are selected one at a time, so no two
//! cycles ever overlap and no locking is needed around the cycle state.
//!
//! State machine: Idle -> `StartupDelay` (optional) -> Running -> Stopped

use std::sync::Arc;

use arc_swap::ArcSwap;
use devsim_core::{
    ClockSource, NodeStatus, RandomSource, SeededRandom, SimulatorConfig, SimulatorSettings,
    SystemClock, ThreadRandom, TriggerSource,
};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, info_span, warn, Instrument};

use crate::config::NodeConfig;
use crate::cycle::{CycleOutcome, EmissionCycle, Sinks};
use crate::error::NodeError;
use crate::traits::StatusSink;

/// Lifecycle state of a simulator node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Not started.
    Idle,
    /// Waiting out the one-shot startup delay.
    StartupDelay,
    /// Ticking on the configured interval.
    Running,
    /// Timers cancelled; no further emissions.
    Stopped,
}

impl SchedulerState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::StartupDelay => "startup_delay",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }
}

/// Requests served by the scheduler task between ticks.
enum Command {
    Trigger {
        source: TriggerSource,
        reply: oneshot::Sender<Result<CycleOutcome, NodeError>>,
    },
    ToggleDebug {
        reply: oneshot::Sender<bool>,
    },
}

/// Cheap, cloneable handle for triggering a running node.
#[derive(Clone)]
pub struct SimulatorHandle {
    node_id: Arc<str>,
    commands: mpsc::Sender<Command>,
    state: Arc<ArcSwap<SchedulerState>>,
}

impl SimulatorHandle {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.node_id
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SchedulerState {
        **self.state.load()
    }

    /// True while the scheduler task accepts commands.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Runs one immediate emission cycle. The pending tick is not moved.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Stopped`] when the node no longer runs, or
    /// [`NodeError::Emit`] when the emit sink refused the message.
    pub async fn trigger(&self, source: TriggerSource) -> Result<CycleOutcome, NodeError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Trigger { source, reply })
            .await
            .map_err(|_| NodeError::Stopped)?;
        rx.await.map_err(|_| NodeError::Stopped)?
    }

    /// Handles an inbound message. Its content is ignored; it only forces a cycle.
    ///
    /// # Errors
    ///
    /// See [`SimulatorHandle::trigger`].
    pub async fn input(&self, _message: &Value) -> Result<CycleOutcome, NodeError> {
        self.trigger(TriggerSource::Input).await
    }

    /// Flips debug mirroring and returns the new state.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Stopped`] when the node no longer runs.
    pub async fn toggle_debug(&self) -> Result<bool, NodeError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::ToggleDebug { reply })
            .await
            .map_err(|_| NodeError::Stopped)?;
        rx.await.map_err(|_| NodeError::Stopped)
    }
}

/// Owns a running simulator node.
///
/// Dropping the node aborts its task; [`SimulatorNode::stop`] shuts down
/// gracefully and reports a cleared status.
pub struct SimulatorNode {
    handle: SimulatorHandle,
    status: Arc<dyn StatusSink>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SimulatorNode {
    /// Parses `settings` and starts the node.
    ///
    /// On a configuration error nothing is spawned: the error is logged,
    /// reported as [`NodeStatus::ConfigError`] and returned.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Config`] when the settings do not validate.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn start(
        node: NodeConfig,
        settings: &SimulatorSettings,
        sinks: Sinks,
    ) -> Result<Self, NodeError> {
        let config = match SimulatorConfig::from_settings(settings) {
            Ok(config) => config,
            Err(err) => {
                error!(node_id = %node.node_id, error = %err, "invalid simulator configuration");
                sinks.status.report(NodeStatus::ConfigError {
                    message: err.to_string(),
                });
                return Err(err.into());
            }
        };
        let rng: Box<dyn RandomSource> = match node.seed {
            Some(seed) => Box::new(SeededRandom::new(seed)),
            None => Box::new(ThreadRandom),
        };
        Ok(Self::start_with(node, config, sinks, rng, Arc::new(SystemClock)))
    }

    /// Starts the node from an already validated configuration with explicit
    /// random and clock sources.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn start_with(
        node: NodeConfig,
        config: SimulatorConfig,
        sinks: Sinks,
        rng: Box<dyn RandomSource>,
        clock: Arc<dyn ClockSource>,
    ) -> Self {
        let (commands, rx) = mpsc::channel(node.command_channel_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let state = Arc::new(ArcSwap::from_pointee(SchedulerState::Idle));
        let status = Arc::clone(&sinks.status);
        let startup_delay = config.startup_delay;

        let mut cycle = EmissionCycle::new(node.node_id.clone(), Arc::new(config), sinks, rng, clock);

        status.report(NodeStatus::Starting);
        let now = Instant::now();
        let (phase, deadline) = if startup_delay.is_zero() {
            (SchedulerState::Running, now + cycle.next_interval())
        } else {
            (SchedulerState::StartupDelay, now + startup_delay)
        };
        state.store(Arc::new(phase));
        info!(node_id = %node.node_id, state = phase.as_str(), "simulator node started");

        let span = info_span!("simulator", node_id = %node.node_id);
        let task = tokio::spawn(
            run_scheduler(cycle, phase, deadline, rx, shutdown_rx, Arc::clone(&state))
                .instrument(span),
        );

        Self {
            handle: SimulatorHandle {
                node_id: Arc::from(node.node_id),
                commands,
                state,
            },
            status,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }

    /// Returns a cloneable handle for triggers and state queries.
    #[must_use]
    pub fn handle(&self) -> SimulatorHandle {
        self.handle.clone()
    }

    #[must_use]
    pub fn id(&self) -> &str {
        self.handle.id()
    }

    #[must_use]
    pub fn state(&self) -> SchedulerState {
        self.handle.state()
    }

    /// Cancels pending timers and waits for the scheduler task to finish.
    ///
    /// Once this returns no further emission can happen. Calling it again is a no-op.
    pub async fn stop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = task.await;

        self.handle.state.store(Arc::new(SchedulerState::Stopped));
        self.status.report(NodeStatus::Cleared);
        info!(node_id = %self.handle.node_id, "simulator node stopped");
    }
}

impl Drop for SimulatorNode {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            self.handle.state.store(Arc::new(SchedulerState::Stopped));
        }
    }
}

async fn run_scheduler(
    mut cycle: EmissionCycle,
    mut phase: SchedulerState,
    mut deadline: Instant,
    mut commands: mpsc::Receiver<Command>,
    mut shutdown_rx: oneshot::Receiver<()>,
    state: Arc<ArcSwap<SchedulerState>>,
) {
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown_rx => break,
            command = commands.recv() => match command {
                Some(command) => handle_command(&mut cycle, command),
                None => break,
            },
            () = tokio::time::sleep_until(deadline) => {
                if phase == SchedulerState::StartupDelay {
                    phase = SchedulerState::Running;
                    state.store(Arc::new(phase));
                } else if let Err(err) = cycle.run(TriggerSource::Timer) {
                    warn!(error = %err, "scheduled emission failed");
                }
                deadline = Instant::now() + cycle.next_interval();
            }
        }
    }
}

fn handle_command(cycle: &mut EmissionCycle, command: Command) {
    match command {
        Command::Trigger { source, reply } => {
            let result = cycle.run(source).map_err(NodeError::from);
            if let Err(err) = &result {
                warn!(?source, error = %err, "triggered emission failed");
            }
            let _ = reply.send(result);
        }
        Command::ToggleDebug { reply } => {
            let active = cycle.toggle_debug();
            info!(debug_active = active, "debug mirroring toggled");
            let _ = reply.send(active);
        }
    }
}

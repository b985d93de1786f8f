//! Lifecycle management: start/stop/restart and the periodic health probe
//!
//! The [`LifecycleManager`] gates an agent behind a running flag and runs a
//! health probe task while the agent is up. The `stop`/`done` channel pair
//! is created and closed under the same lock that flips the running flag, so
//! a concurrent `stop` can never double-close: whoever takes the stop sender
//! out of the slot owns the close.
//!
//! The probe fires immediately on start, then on the configured interval
//! (default 30 s). Each probe reads the agent's state and derives
//! `healthy = state in {ready, running}` into the stored [`HealthStatus`].

use crate::agent::Agent;
use crate::error::{AgentError, Result};
use chrono::{DateTime, Utc};
use keel_core::AgentState;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex, RwLock};

/// How long `stop` waits for the probe task before proceeding with teardown
pub const TEARDOWN_WAIT: Duration = Duration::from_secs(5);

/// Pause between stop and start during a restart
const RESTART_DELAY: Duration = Duration::from_millis(100);

/// Result of the most recent health probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Whether the agent is in a workable state
    pub healthy: bool,

    /// Agent state observed by the probe
    pub state: AgentState,

    /// When the probe ran
    pub last_check: DateTime<Utc>,

    /// Explanation when unhealthy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

struct Channels {
    stop: oneshot::Sender<()>,
    done: oneshot::Receiver<()>,
}

struct Inner {
    running: bool,
    channels: Option<Channels>,
}

/// Start/stop/restart discipline and health loop for one agent
pub struct LifecycleManager {
    agent: Arc<Agent>,
    inner: Mutex<Inner>,
    interval: Duration,
    health: Arc<RwLock<HealthStatus>>,
}

impl LifecycleManager {
    /// Create a manager for the given agent, using the agent's configured
    /// health probe interval.
    pub fn new(agent: Arc<Agent>) -> Self {
        let interval = agent.config().health_check_interval;
        let health = HealthStatus {
            healthy: false,
            state: agent.state(),
            last_check: Utc::now(),
            message: Some("not started".to_string()),
        };
        Self {
            agent,
            inner: Mutex::new(Inner {
                running: false,
                channels: None,
            }),
            interval,
            health: Arc::new(RwLock::new(health)),
        }
    }

    /// Override the health probe interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Whether the agent is currently running.
    pub async fn is_running(&self) -> bool {
        self.inner.lock().await.running
    }

    /// The most recent health status.
    pub async fn health(&self) -> HealthStatus {
        self.health.read().await.clone()
    }

    /// Initialize the agent and start the health probe.
    ///
    /// Rejects with [`AgentError::AlreadyRunning`] when already started; an
    /// init failure leaves the manager stopped.
    pub async fn start(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.running {
            return Err(AgentError::AlreadyRunning);
        }

        self.agent.init().await?;
        inner.running = true;

        let (stop_tx, stop_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();
        inner.channels = Some(Channels {
            stop: stop_tx,
            done: done_rx,
        });

        let agent = Arc::clone(&self.agent);
        let health = Arc::clone(&self.health);
        let interval = self.interval;
        tokio::spawn(async move {
            Self::health_loop(agent, health, interval, stop_rx).await;
            let _ = done_tx.send(());
        });

        tracing::info!(agent_id = %self.agent.id(), "lifecycle started");
        Ok(())
    }

    async fn health_loop(
        agent: Arc<Agent>,
        health: Arc<RwLock<HealthStatus>>,
        interval: Duration,
        mut stop_rx: oneshot::Receiver<()>,
    ) {
        // The first tick completes immediately: probe once right away,
        // then on the interval.
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = &mut stop_rx => break,
                _ = ticker.tick() => Self::probe(&agent, &health).await,
            }
        }
    }

    async fn probe(agent: &Agent, health: &RwLock<HealthStatus>) {
        let state = agent.state();
        let healthy = matches!(state, AgentState::Ready | AgentState::Running);
        let status = HealthStatus {
            healthy,
            state,
            last_check: Utc::now(),
            message: (!healthy).then(|| format!("agent in state {state}")),
        };
        *health.write().await = status;
    }

    /// Stop the health probe and tear the agent down.
    ///
    /// Rejects with [`AgentError::NotRunning`] when not started. Waits up to
    /// [`TEARDOWN_WAIT`] for the probe to exit, then proceeds with teardown
    /// either way.
    pub async fn stop(&self) -> Result<()> {
        let done = {
            let mut inner = self.inner.lock().await;
            if !inner.running {
                return Err(AgentError::NotRunning);
            }
            inner.running = false;
            inner.channels.take().map(|channels| {
                let _ = channels.stop.send(());
                channels.done
            })
        };

        if let Some(done) = done {
            if tokio::time::timeout(TEARDOWN_WAIT, done).await.is_err() {
                tracing::warn!(
                    agent_id = %self.agent.id(),
                    "health probe did not exit within {TEARDOWN_WAIT:?}, proceeding with teardown"
                );
            }
        }

        self.agent.teardown().await?;
        tracing::info!(agent_id = %self.agent.id(), "lifecycle stopped");
        Ok(())
    }

    /// Stop, pause briefly, and start again with fresh channels.
    pub async fn restart(&self) -> Result<()> {
        self.stop().await?;
        tokio::time::sleep(RESTART_DELAY).await;
        self.start().await
    }
}

use super::bridge::BridgeChannel;
use super::registry::{AttemptId, AttemptRegistry};
use crate::config::BridgeConfig;
use crate::domain::ports::{MessageChannelBox, PaymentHooks, ProcessHostBox};
use crate::domain::protocol::Outcome;
use crate::domain::request::OutboundPayload;
use crate::error::Result;
use tracing::{debug, info, warn};

/// Runs payment attempts against embedded processes started by a host.
///
/// For each attempt the bridge starts a process, sends the payload once through
/// `initialise`, waits for the first terminal outcome and hands it to the caller's
/// hooks. Processes are tracked in an [`AttemptRegistry`] while they run.
pub struct PaymentBridge {
    host: ProcessHostBox,
    registry: AttemptRegistry,
    config: BridgeConfig,
}

impl PaymentBridge {
    /// Creates a new `PaymentBridge` instance.
    ///
    /// # Arguments
    ///
    /// * `host` - Starts embedded processes and opens their channels.
    /// * `config` - Channel name and outcome timeout.
    pub fn new(host: ProcessHostBox, config: BridgeConfig) -> Self {
        Self {
            host,
            registry: AttemptRegistry::new(),
            config,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn registry(&self) -> &AttemptRegistry {
        &self.registry
    }

    /// Runs one attempt to completion and reports its outcome through `hooks`.
    ///
    /// At most one hook fires. On timeout, a closed channel or a transport error no
    /// hook fires and the error is returned instead. The embedded process is shut
    /// down whichever way the attempt ends, including when this future is dropped
    /// before it resolves.
    pub async fn run<H>(&self, payload: OutboundPayload, hooks: &H) -> Result<Outcome>
    where
        H: PaymentHooks + ?Sized,
    {
        let id = AttemptId::new();
        let process = self.host.start(&self.config.channel_name).await?;
        let guard = ReleaseOnDrop::new(self.registry.clone(), id);
        self.registry.register(id, process.handle).await;

        let result = self.exchange(id, process.channel, payload).await;
        guard.disarm();
        if let Err(e) = self.registry.release(id).await {
            warn!(attempt = %id, error = %e, "failed to shut down embedded process");
        }

        let outcome = result?;
        dispatch_outcome(outcome, hooks);
        Ok(outcome)
    }

    async fn exchange(
        &self,
        id: AttemptId,
        channel: MessageChannelBox,
        payload: OutboundPayload,
    ) -> Result<Outcome> {
        let mut bridge = BridgeChannel::new(self.config.channel_name.clone());
        bridge.open(channel)?;
        let pending = bridge.initialise(payload).await?;
        info!(attempt = %id, channel = %self.config.channel_name, "payment attempt initialised");

        pending.wait(self.config.outcome_timeout).await
    }

    /// Shuts down every embedded process still running.
    pub async fn shutdown(&self) -> Result<()> {
        self.registry.shutdown().await
    }
}

/// Releases an attempt from a spawned task if `run` is dropped mid-flight.
struct ReleaseOnDrop {
    registry: AttemptRegistry,
    id: AttemptId,
    armed: bool,
}

impl ReleaseOnDrop {
    fn new(registry: AttemptRegistry, id: AttemptId) -> Self {
        Self {
            registry,
            id,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ReleaseOnDrop {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(attempt = %self.id, "no runtime to release abandoned attempt");
            return;
        };

        let registry = self.registry.clone();
        let id = self.id;
        debug!(attempt = %id, "payment attempt abandoned, releasing");
        runtime.spawn(async move {
            if let Err(e) = registry.release(id).await {
                warn!(attempt = %id, error = %e, "failed to shut down embedded process");
            }
        });
    }
}

/// Routes a terminal outcome to the matching lifecycle hook.
pub fn dispatch_outcome<H>(outcome: Outcome, hooks: &H)
where
    H: PaymentHooks + ?Sized,
{
    match outcome {
        Outcome::Completed => hooks.on_payment_completed(),
        Outcome::Cancelled => hooks.on_payment_cancelled(),
    }
}

use crate::domain::ports::MessageChannelBox;
use crate::domain::protocol::{METHOD_INITIALISE, MethodCall, Outcome};
use crate::domain::request::OutboundPayload;
use crate::error::{BridgeError, Result};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Lifecycle of one bridge channel, from opening to a terminal outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Uninitialized,
    AwaitingInit,
    AwaitingOutcome,
    Completed,
    Cancelled,
}

impl BridgeState {
    pub fn name(&self) -> &'static str {
        match self {
            BridgeState::Uninitialized => "uninitialized",
            BridgeState::AwaitingInit => "awaiting-init",
            BridgeState::AwaitingOutcome => "awaiting-outcome",
            BridgeState::Completed => "completed",
            BridgeState::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BridgeState::Completed | BridgeState::Cancelled)
    }
}

impl From<Outcome> for BridgeState {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Completed => BridgeState::Completed,
            Outcome::Cancelled => BridgeState::Cancelled,
        }
    }
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Host end of the named channel to an embedded payment process.
///
/// Carries exactly one `initialise` message out. Inbound calls are consumed by a
/// receiver task that stops at the first terminal method, so a second outcome can
/// never be observed for the same attempt.
pub struct BridgeChannel {
    channel_name: String,
    channel: Option<MessageChannelBox>,
    state_tx: Option<watch::Sender<BridgeState>>,
    state_rx: watch::Receiver<BridgeState>,
}

impl BridgeChannel {
    pub fn new(channel_name: impl Into<String>) -> Self {
        let (state_tx, state_rx) = watch::channel(BridgeState::Uninitialized);
        Self {
            channel_name: channel_name.into(),
            channel: None,
            state_tx: Some(state_tx),
            state_rx,
        }
    }

    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    pub fn state(&self) -> BridgeState {
        *self.state_rx.borrow()
    }

    /// Watches state transitions, including the terminal one made by the receiver task.
    pub fn subscribe(&self) -> watch::Receiver<BridgeState> {
        self.state_rx.clone()
    }

    /// Attaches the transport once the host has started the embedded process.
    pub fn open(&mut self, channel: MessageChannelBox) -> Result<()> {
        self.expect_state(BridgeState::Uninitialized)?;
        self.channel = Some(channel);
        self.transition(BridgeState::AwaitingInit);
        Ok(())
    }

    /// Sends the payload as JSON text and starts listening for the outcome.
    ///
    /// Only valid once per channel. A failed send leaves the channel in
    /// `AwaitingInit` so the caller may retry.
    pub async fn initialise(&mut self, payload: OutboundPayload) -> Result<PendingOutcome> {
        self.expect_state(BridgeState::AwaitingInit)?;
        let call = MethodCall::with_arguments(METHOD_INITIALISE, Value::String(payload.to_json()?));
        let (Some(mut channel), Some(state_tx)) = (self.channel.take(), self.state_tx.take())
        else {
            return Err(self.invalid_state(BridgeState::AwaitingInit));
        };

        if let Err(e) = channel.send(call).await {
            self.channel = Some(channel);
            self.state_tx = Some(state_tx);
            return Err(e);
        }

        debug!(channel = %self.channel_name, "initialise sent");
        state_tx.send_replace(BridgeState::AwaitingOutcome);

        let (outcome_tx, outcome_rx) = oneshot::channel();
        let task = tokio::spawn(receive_outcome(
            self.channel_name.clone(),
            channel,
            state_tx,
            outcome_tx,
        ));

        Ok(PendingOutcome {
            receiver: outcome_rx,
            task,
        })
    }

    fn transition(&self, next: BridgeState) {
        if let Some(state_tx) = &self.state_tx {
            debug!(channel = %self.channel_name, from = %self.state(), to = %next, "bridge state change");
            state_tx.send_replace(next);
        }
    }

    fn expect_state(&self, expected: BridgeState) -> Result<()> {
        if self.state() == expected {
            Ok(())
        } else {
            Err(self.invalid_state(expected))
        }
    }

    fn invalid_state(&self, expected: BridgeState) -> BridgeError {
        BridgeError::InvalidState {
            expected: expected.name(),
            actual: self.state().name(),
        }
    }
}

async fn receive_outcome(
    channel_name: String,
    mut channel: MessageChannelBox,
    state_tx: watch::Sender<BridgeState>,
    outcome_tx: oneshot::Sender<Result<Outcome>>,
) {
    let result = loop {
        match channel.recv().await {
            Ok(Some(call)) => match call.outcome() {
                Some(outcome) => break Ok(outcome),
                None => warn!(channel = %channel_name, method = %call.method, "ignoring unrecognised method"),
            },
            Ok(None) => break Err(BridgeError::ChannelClosed),
            Err(e) => break Err(e),
        }
    };

    if let Ok(outcome) = &result {
        info!(channel = %channel_name, %outcome, "payment outcome received");
        state_tx.send_replace(BridgeState::from(*outcome));
    }

    // Dropping the channel here unsubscribes from any later messages.
    drop(channel);
    if outcome_tx.send(result).is_err() {
        debug!(channel = %channel_name, "outcome dropped, nobody is waiting");
    }
}

/// The single outcome of an initialised bridge, delivered at most once.
pub struct PendingOutcome {
    receiver: oneshot::Receiver<Result<Outcome>>,
    task: JoinHandle<()>,
}

impl PendingOutcome {
    /// Waits for the terminal outcome, giving up after `timeout` if one is set.
    pub async fn wait(mut self, timeout: Option<Duration>) -> Result<Outcome> {
        let received = match timeout {
            Some(limit) => tokio::time::timeout(limit, &mut self.receiver)
                .await
                .map_err(|_| BridgeError::Timeout(limit))?,
            None => (&mut self.receiver).await,
        };
        received.map_err(|_| BridgeError::ChannelClosed)?
    }
}

impl Drop for PendingOutcome {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::request::PaymentRequest;
    use crate::infrastructure::in_memory::channel_pair;
    use serde_json::json;

    fn payload() -> OutboundPayload {
        PaymentRequest::with_payment_data(json!({ "data": { "amount": "100.00" } }))
            .unwrap()
            .with_options(&json!({ "payButtonText": "Pay Now" }))
            .unwrap()
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let (host, mut embedded) = channel_pair();
        let mut bridge = BridgeChannel::new("test/channel");
        assert_eq!(bridge.state(), BridgeState::Uninitialized);

        bridge.open(Box::new(host)).unwrap();
        assert_eq!(bridge.state(), BridgeState::AwaitingInit);

        let pending = bridge.initialise(payload()).await.unwrap();
        assert_eq!(bridge.state(), BridgeState::AwaitingOutcome);

        embedded.expect_initialise().await.unwrap();
        embedded.invoke("onPaymentCompleted").await.unwrap();

        assert_eq!(pending.wait(None).await.unwrap(), Outcome::Completed);
        assert_eq!(bridge.state(), BridgeState::Completed);
        assert!(bridge.state().is_terminal());
    }

    #[tokio::test]
    async fn test_initialise_before_open_is_rejected() {
        let mut bridge = BridgeChannel::new("test/channel");
        let err = bridge.initialise(payload()).await.err().unwrap();
        assert!(matches!(
            err,
            BridgeError::InvalidState {
                expected: "awaiting-init",
                actual: "uninitialized"
            }
        ));
    }

    #[tokio::test]
    async fn test_initialise_is_one_shot() {
        let (host, _embedded) = channel_pair();
        let mut bridge = BridgeChannel::new("test/channel");
        bridge.open(Box::new(host)).unwrap();

        let _pending = bridge.initialise(payload()).await.unwrap();
        let err = bridge.initialise(payload()).await.err().unwrap();
        assert!(matches!(err, BridgeError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_open_twice_is_rejected() {
        let (first, _a) = channel_pair();
        let (second, _b) = channel_pair();
        let mut bridge = BridgeChannel::new("test/channel");
        bridge.open(Box::new(first)).unwrap();
        assert!(bridge.open(Box::new(second)).is_err());
    }

    #[tokio::test]
    async fn test_initialise_payload_is_json_text() {
        let (host, mut embedded) = channel_pair();
        let mut bridge = BridgeChannel::new("test/channel");
        bridge.open(Box::new(host)).unwrap();
        let _pending = bridge.initialise(payload()).await.unwrap();

        let call = embedded.next_call().await.unwrap();
        assert_eq!(call.method, "initialise");
        let text = call.arguments.unwrap();
        let decoded: Value = serde_json::from_str(text.as_str().unwrap()).unwrap();
        assert_eq!(
            decoded,
            json!({ "data": { "amount": "100.00" }, "payButtonText": "Pay Now" })
        );
    }

    #[tokio::test]
    async fn test_timeout_without_outcome() {
        let (host, _embedded) = channel_pair();
        let mut bridge = BridgeChannel::new("test/channel");
        bridge.open(Box::new(host)).unwrap();
        let pending = bridge.initialise(payload()).await.unwrap();

        let err = pending
            .wait(Some(Duration::from_millis(20)))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Timeout(_)));
        assert_eq!(bridge.state(), BridgeState::AwaitingOutcome);
    }
}

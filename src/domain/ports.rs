use super::protocol::MethodCall;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// The two lifecycle hooks a host application implements for a payment attempt.
///
/// Each attempt invokes at most one of them, at most once.
pub trait PaymentHooks: Send + Sync {
    fn on_payment_completed(&self);
    fn on_payment_cancelled(&self);
}

/// Host side of the duplex channel to an embedded payment process.
#[async_trait]
pub trait MessageChannel: Send {
    /// Fire-and-forget send. Returns once the call is handed to the transport.
    async fn send(&mut self, call: MethodCall) -> Result<()>;

    /// Next inbound call, or `None` once the embedded side has hung up.
    async fn recv(&mut self) -> Result<Option<MethodCall>>;
}

/// A started embedded process, reachable through its channel.
pub struct EmbeddedProcess {
    pub channel: MessageChannelBox,
    pub handle: ProcessHandleRef,
}

/// Lifetime control over a running embedded process.
#[async_trait]
pub trait ProcessHandle: Send + Sync {
    async fn shutdown(&self) -> Result<()>;
}

/// Starts embedded payment processes and opens their channels.
///
/// Implementations must only return once the channel is open, so `initialise`
/// can be sent right away.
#[async_trait]
pub trait ProcessHost: Send + Sync {
    async fn start(&self, channel_name: &str) -> Result<EmbeddedProcess>;
}

pub type MessageChannelBox = Box<dyn MessageChannel>;
pub type ProcessHandleRef = Arc<dyn ProcessHandle>;
pub type ProcessHostBox = Box<dyn ProcessHost>;
pub type PaymentHooksBox = Box<dyn PaymentHooks>;

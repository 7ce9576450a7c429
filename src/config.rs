use crate::domain::protocol::CHANNEL_NAME;
use std::time::Duration;

/// Default time to wait for the embedded process to report an outcome.
pub const DEFAULT_OUTCOME_TIMEOUT: Duration = Duration::from_secs(300);

/// Settings shared by every payment attempt run through a bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Name of the channel opened to the embedded process.
    pub channel_name: String,
    /// How long to wait for `onPaymentCompleted`/`onPaymentCancelled`. `None` waits forever.
    pub outcome_timeout: Option<Duration>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            channel_name: CHANNEL_NAME.to_string(),
            outcome_timeout: Some(DEFAULT_OUTCOME_TIMEOUT),
        }
    }
}

impl BridgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel_name(mut self, channel_name: impl Into<String>) -> Self {
        self.channel_name = channel_name.into();
        self
    }

    pub fn with_outcome_timeout(mut self, timeout: Duration) -> Self {
        self.outcome_timeout = Some(timeout);
        self
    }

    pub fn without_timeout(mut self) -> Self {
        self.outcome_timeout = None;
        self
    }

    /// Interprets a timeout given in whole seconds, where `0` disables it.
    pub fn with_timeout_secs(self, secs: u64) -> Self {
        if secs == 0 {
            self.without_timeout()
        } else {
            self.with_outcome_timeout(Duration::from_secs(secs))
        }
    }
}

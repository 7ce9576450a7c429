use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the duplex channel shared with the embedded payment process.
pub const CHANNEL_NAME: &str = "com.xdev.payfast/payment";

/// Host → embedded. Carries the serialized outbound payload.
pub const METHOD_INITIALISE: &str = "initialise";
/// Embedded → host. Terminal success.
pub const METHOD_PAYMENT_COMPLETED: &str = "onPaymentCompleted";
/// Embedded → host. Terminal cancellation.
pub const METHOD_PAYMENT_CANCELLED: &str = "onPaymentCancelled";

/// A single named invocation travelling over the bridge channel, in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<serde_json::Value>,
}

impl MethodCall {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            arguments: None,
        }
    }

    pub fn with_arguments(method: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            method: method.into(),
            arguments: Some(arguments),
        }
    }

    /// Maps an inbound call onto a terminal outcome.
    ///
    /// Unknown method names yield `None` and are expected to be ignored by the caller.
    pub fn outcome(&self) -> Option<Outcome> {
        Outcome::from_method(&self.method)
    }
}

/// Terminal result of a payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Completed,
    Cancelled,
}

impl Outcome {
    pub fn from_method(method: &str) -> Option<Self> {
        match method {
            METHOD_PAYMENT_COMPLETED => Some(Outcome::Completed),
            METHOD_PAYMENT_CANCELLED => Some(Outcome::Cancelled),
            _ => None,
        }
    }

    pub fn method_name(&self) -> &'static str {
        match self {
            Outcome::Completed => METHOD_PAYMENT_COMPLETED,
            Outcome::Cancelled => METHOD_PAYMENT_CANCELLED,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Completed => f.write_str("completed"),
            Outcome::Cancelled => f.write_str("cancelled"),
        }
    }
}

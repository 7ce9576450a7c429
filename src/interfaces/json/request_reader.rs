use crate::domain::request::PaymentRequest;
use crate::error::Result;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::io::Read;

/// Reads a JSON document from any `Read` source (e.g. File, Stdin).
pub struct DocumentReader<R: Read> {
    source: R,
}

impl<R: Read> DocumentReader<R> {
    pub fn new(source: R) -> Self {
        Self { source }
    }

    pub fn read_value(self) -> Result<Value> {
        Ok(serde_json::from_reader(self.source)?)
    }

    pub fn read<T: DeserializeOwned>(self) -> Result<T> {
        Ok(serde_json::from_reader(self.source)?)
    }

    /// Parses and validates a payment request document.
    pub fn read_request(self) -> Result<PaymentRequest> {
        PaymentRequest::with_payment_data(self.read_value()?)
    }

    /// Parses presentation overrides.
    ///
    /// The document is returned as-is: keys are not filtered and values are not
    /// type-checked, so a malformed colour never blocks a payment.
    pub fn read_options(self) -> Result<Value> {
        self.read_value()
    }
}

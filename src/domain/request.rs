use crate::error::{BridgeError, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Key under which the validated payment fields travel.
pub const DATA_KEY: &str = "data";

/// The closed set of keys accepted inside `data`. Matching is exact and case-sensitive.
pub const ALLOWED_KEYS: [&str; 8] = [
    "merchant_id",
    "merchant_key",
    "name_first",
    "name_last",
    "email_address",
    "m_payment_id",
    "amount",
    "item_name",
];

/// Checks every key of a payment `data` object against [`ALLOWED_KEYS`].
///
/// Only the presence of disallowed keys is rejected; missing fields are left to the
/// embedded process to complain about.
pub fn validate_payment_fields(data: &Map<String, Value>) -> Result<()> {
    match data.keys().find(|key| !ALLOWED_KEYS.contains(&key.as_str())) {
        Some(key) => Err(BridgeError::Validation { key: key.clone() }),
        None => Ok(()),
    }
}

/// A payment request whose `data` object has passed validation.
///
/// This is the first phase of building an outbound payload. The only way to obtain
/// one is [`PaymentRequest::with_payment_data`], so presentation options can never be
/// merged onto an unvalidated request.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    data: Map<String, Value>,
    extra: Map<String, Value>,
}

impl PaymentRequest {
    /// Validates `raw.data` and, on success, keeps the whole `raw` object.
    ///
    /// Nothing is stored on failure: the error names the first offending key.
    pub fn with_payment_data(raw: Value) -> Result<Self> {
        let Value::Object(mut extra) = raw else {
            return Err(BridgeError::MissingData);
        };
        let Some(Value::Object(data)) = extra.remove(DATA_KEY) else {
            return Err(BridgeError::MissingData);
        };

        validate_payment_fields(&data)?;
        debug!(fields = data.len(), "payment data validated");

        Ok(Self { data, extra })
    }

    /// The validated payment fields.
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// The request exactly as it was supplied, `data` included.
    pub fn to_value(&self) -> Value {
        Value::Object(self.clone().into_payload().fields)
    }

    /// Second phase: shallow-merges presentation overrides without re-validating.
    pub fn with_options<T: Serialize + ?Sized>(self, overrides: &T) -> Result<OutboundPayload> {
        self.into_payload().with_options(overrides)
    }

    /// Finishes the request with no presentation overrides.
    pub fn into_payload(self) -> OutboundPayload {
        let mut fields = self.extra;
        fields.insert(DATA_KEY.to_string(), Value::Object(self.data));
        OutboundPayload { fields }
    }
}

/// The envelope transmitted with `initialise`: `{ data, ...overrides }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct OutboundPayload {
    fields: Map<String, Value>,
}

impl OutboundPayload {
    /// Writes every top-level key of `overrides` onto the payload, last write wins.
    ///
    /// Keys are not filtered and values are not type-checked. Fails only when
    /// `overrides` cannot be represented as a JSON object.
    pub fn with_options<T: Serialize + ?Sized>(mut self, overrides: &T) -> Result<Self> {
        let value = serde_json::to_value(overrides).map_err(|e| BridgeError::Merge(e.to_string()))?;
        let entries = match value {
            Value::Object(entries) => entries,
            Value::Null => return Ok(self),
            other => {
                return Err(BridgeError::Merge(format!(
                    "options must encode to a JSON object, got {}",
                    json_kind(&other)
                )));
            }
        };

        for (key, value) in entries {
            if key == DATA_KEY {
                warn!("presentation options replace the validated `data` object");
            }
            self.fields.insert(key, value);
        }
        Ok(self)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn data(&self) -> Option<&Map<String, Value>> {
        self.fields.get(DATA_KEY).and_then(Value::as_object)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// JSON text as sent over the wire.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.fields)?)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#![allow(dead_code)]

use payfast_bridge::domain::ports::PaymentHooks;
use payfast_bridge::domain::request::{OutboundPayload, PaymentRequest};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn sample_request() -> Value {
    json!({
        "data": {
            "merchant_id": "10000100",
            "merchant_key": "46f0cd694581a",
            "name_first": "Thandi",
            "name_last": "Nkosi",
            "email_address": "thandi@example.com",
            "m_payment_id": "order-1001",
            "amount": "100.00",
            "item_name": "Test"
        }
    })
}

pub fn sample_payload() -> OutboundPayload {
    PaymentRequest::with_payment_data(sample_request())
        .unwrap()
        .with_options(&json!({ "payButtonText": "Pay Now" }))
        .unwrap()
}

/// Hooks that count how often each outcome was reported.
#[derive(Default)]
pub struct RecordingHooks {
    completed: AtomicUsize,
    cancelled: AtomicUsize,
}

impl RecordingHooks {
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.completed() + self.cancelled()
    }
}

impl PaymentHooks for RecordingHooks {
    fn on_payment_completed(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    fn on_payment_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::SeqCst);
    }
}

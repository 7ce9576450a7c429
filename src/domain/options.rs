use serde::{Deserialize, Serialize};

/// Presentation overrides understood by the embedded payment screen.
///
/// Every field is optional and unset fields are left out of the merge, so the
/// embedded side falls back to its own defaults. Colours are hex strings such as
/// `"#0A3D62"`; they are passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresentationOptions {
    #[serde(rename = "appBar.show", skip_serializing_if = "Option::is_none")]
    pub app_bar_show: Option<bool>,
    #[serde(rename = "appBar.title", skip_serializing_if = "Option::is_none")]
    pub app_bar_title: Option<String>,
    #[serde(rename = "appBar.backgroundColor", skip_serializing_if = "Option::is_none")]
    pub app_bar_background_color: Option<String>,
    #[serde(rename = "payButtonText", skip_serializing_if = "Option::is_none")]
    pub pay_button_text: Option<String>,
    #[serde(rename = "onPaymentCancelledText", skip_serializing_if = "Option::is_none")]
    pub on_payment_cancelled_text: Option<String>,
    #[serde(rename = "onPaymentCompletedText", skip_serializing_if = "Option::is_none")]
    pub on_payment_completed_text: Option<String>,
    #[serde(rename = "paymentSummaryTitle", skip_serializing_if = "Option::is_none")]
    pub payment_summary_title: Option<String>,
    #[serde(rename = "paymentSummaryAmountColor", skip_serializing_if = "Option::is_none")]
    pub payment_summary_amount_color: Option<String>,
}

impl PresentationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show_app_bar(mut self, show: bool) -> Self {
        self.app_bar_show = Some(show);
        self
    }

    pub fn app_bar_title(mut self, title: impl Into<String>) -> Self {
        self.app_bar_title = Some(title.into());
        self
    }

    pub fn app_bar_background_color(mut self, color: impl Into<String>) -> Self {
        self.app_bar_background_color = Some(color.into());
        self
    }

    pub fn pay_button_text(mut self, text: impl Into<String>) -> Self {
        self.pay_button_text = Some(text.into());
        self
    }

    pub fn on_payment_cancelled_text(mut self, text: impl Into<String>) -> Self {
        self.on_payment_cancelled_text = Some(text.into());
        self
    }

    pub fn on_payment_completed_text(mut self, text: impl Into<String>) -> Self {
        self.on_payment_completed_text = Some(text.into());
        self
    }

    pub fn payment_summary_title(mut self, title: impl Into<String>) -> Self {
        self.payment_summary_title = Some(title.into());
        self
    }

    pub fn payment_summary_amount_color(mut self, color: impl Into<String>) -> Self {
        self.payment_summary_amount_color = Some(color.into());
        self
    }
}

//! Domain layer: payment request validation, presentation overrides, the bridge
//! wire vocabulary and the traits that sit between this crate and its host.

pub mod options;
pub mod ports;
pub mod protocol;
pub mod request;

//! Error conversions between infrastructure and domain types.

pub mod conversions;

pub use conversions::IntoHttpClientError;

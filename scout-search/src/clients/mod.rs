//! Network implementations of the collaborator traits.

pub mod http;
pub mod http_api;

pub use http_api::{ApiConfig, HttpApiClient};

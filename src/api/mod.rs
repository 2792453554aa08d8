//! HTTP access to the posts REST API.

mod client;
mod error;

pub use client::ApiClient;
pub use error::ApiError;

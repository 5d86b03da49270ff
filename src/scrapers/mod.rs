//! Outbound fetch layer: HTTP client, proxy rotation, request pacing.

mod http_client;
pub mod proxy;
pub mod rate;

pub use http_client::{random_user_agent, FetchError, HeaderProfile, HttpClient, RetryPolicy};
pub use proxy::ProxyRotator;
pub use rate::{Pacing, RateGate};

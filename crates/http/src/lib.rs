//! Haven HTTP client
//!
//! Typed access to the Haven REST backend: token issuance, the
//! authenticated request pipeline with one-shot token refresh, and the
//! journaling, meditation, cognitive-exercise and problem-solving resources.

pub mod client;
pub mod models;
pub mod types;

pub use client::error::ClientError;
pub use client::request::ApiRequest;
pub use client::resources::{Resource, Resources, Validate, search};
pub use client::{AuthenticatedClient, ClientBuilder, PublicClient, TokenRefresher};

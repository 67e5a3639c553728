//! Haven core types and utilities

pub mod config;
pub mod credentials;
pub mod error;
pub mod navigation;

pub use config::{ApiConfig, HavenConfig, SessionConfig};
pub use credentials::{
    CredentialPair, CredentialStore, Credentials, FileCredentialStore, MemoryCredentialStore,
    TokenKey,
};
pub use error::{CoreError, CoreResult};
pub use navigation::{LogNavigator, Navigator};

//! Secret handling for collaborator API keys.

pub mod credentials;

pub use credentials::{SecretString, ServiceCredentials};

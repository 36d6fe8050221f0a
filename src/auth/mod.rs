//! Credential resolution
//!
//! Produces a usable bearer token from the cheapest source available: the
//! durable token cache, the Cloud SDK's token database, or a refresh-token
//! exchange against the OAuth2 endpoint.

pub mod refresh;
pub mod resolver;
pub mod scrape;
pub mod sdk_store;
pub mod token;
pub mod token_cache;

pub use refresh::RefreshExchange;
pub use resolver::{CredentialResolver, CredentialSource};
pub use sdk_store::{SdkCredentialStore, SdkTokenStore};
pub use token::{AccessToken, CredentialRecord};
pub use token_cache::TokenCache;

//! fastgcs - cached reads from Google Cloud Storage
//!
//! Reuses locally cached credentials and object bytes, revalidating remote
//! state with a conditional GET instead of downloading every time.
//!
//! ```no_run
//! # async fn demo() -> fastgcs::Result<()> {
//! let fg = fastgcs::FastGcs::from_env()?;
//! let bytes = fg.read("gs://shopify-dev/zodiac.constellations.json").await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod gcs;

pub use auth::{AccessToken, CredentialResolver, CredentialSource};
pub use cache::{EvictionPolicy, ObjectCache};
pub use client::FastGcs;
pub use config::Config;
pub use error::{FastGcsError, Result};
pub use fetch::{ConditionalFetcher, FetchStatsSnapshot};
pub use gcs::ObjectReference;

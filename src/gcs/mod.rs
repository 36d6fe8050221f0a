//! Google Cloud Storage access

pub mod client;
pub mod reference;

pub use client::{ObjectResponse, StorageClient};
pub use reference::ObjectReference;

//! In-memory storage backend for `idp-auth`.
//!
//! This crate provides [`InMemoryStore`], a single store implementing every
//! repository trait of `idp-auth` on top of `DashMap`. It is meant for tests
//! and single-node deployments; nothing is persisted.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use idp_auth::{AuthConfig, CibaGrantService, CibaRequestService};
//! use idp_auth_memory::InMemoryStore;
//!
//! let store = Arc::new(InMemoryStore::new());
//! store.add_server(server);
//! store.add_client(&tenant, client);
//!
//! let requests = CibaRequestService::new(
//!     store.clone(), store.clone(), store.clone(), store.clone(), store.clone(),
//!     Arc::new(AuthConfig::default()),
//! );
//! let grants = CibaGrantService::new(store.clone(), store.clone());
//!
//! // periodically
//! grants.cleanup_expired(OffsetDateTime::now_utc()).await?;
//! ```

pub mod store;

pub use store::{InMemoryStore, StoreKey};

/// Type alias for a shareable in-memory store.
pub type SharedStore = std::sync::Arc<InMemoryStore>;

/// Creates a new empty shareable store.
pub fn create_store() -> SharedStore {
    std::sync::Arc::new(InMemoryStore::new())
}

//! Conclave chat engine.
//!
//! Groups own channels; users reach channels through memberships that move
//! between Invited and Active. From those records the engine derives, per
//! request, what each user may subscribe to, publish on and read history of.

pub mod capabilities;
pub mod error;
pub mod groups;
pub mod membership;
pub mod naming;
pub mod notify;
pub mod store;
pub mod views;

use chrono::{DateTime, SubsecRound, Utc};

pub use error::{ChatError, ChatResult};
pub use store::{ChatStore, GroupFilter, StoreError};

/// Entry point for every chat operation. Stateless between calls apart
/// from the store it wraps.
pub struct ChatService<S> {
    store: S,
    public_url: String,
}

impl<S: ChatStore> ChatService<S> {
    /// `public_url` is the base of invitation accept links.
    pub fn new(store: S, public_url: impl Into<String>) -> Self {
        Self {
            store,
            public_url: public_url.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

/// Record timestamps are kept at second precision, matching the store.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

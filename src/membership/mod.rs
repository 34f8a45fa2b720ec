//! Membership categories and sequential member ID allocation
//!
//! Each category maps to a short prefix. IDs are the prefix followed by a
//! per-prefix counter zero-padded to seven digits (`YM0000100`). Counters live
//! in the key-value store and are written back before an ID is handed out, so
//! an ID is never issued twice by a single writer, even across restarts.
//!
//! There is no cross-process locking: two processes allocating for the same
//! prefix at the same moment can read the same counter.

pub mod form;

use thiserror::Error;
use tracing::{debug, error, info};

use crate::constants::membership;
use crate::persistence::{KeyValueStore, StoreError};

pub use form::{ApplicantDetails, MembershipForm, MembershipRecord};

/// A membership category offered by the registration form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    /// Form value, e.g. `annual`
    pub key: &'static str,
    /// ID prefix, e.g. `YM`
    pub prefix: &'static str,
    pub label: &'static str,
}

/// Categories recognized by the allocator
pub const CATEGORIES: &[Category] = &[
    Category {
        key: "annual",
        prefix: "YM",
        label: "Annual Membership",
    },
    Category {
        key: "long_term",
        prefix: "LTM",
        label: "Long-Term Membership",
    },
];

#[derive(Debug, Error)]
pub enum MembershipError {
    #[error("Unknown membership category '{category}'")]
    InvalidCategory { category: String },

    #[error("Membership counter storage is unavailable (key '{key}')")]
    PersistenceUnavailable {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("Stored membership counter '{key}' is unusable: '{value}'")]
    CorruptCounter { key: String, value: String },

    #[error("No membership ID has been generated yet")]
    MissingId,
}

impl MembershipError {
    /// Whether the failure came from the counter store rather than the caller
    pub fn is_persistence_failure(&self) -> bool {
        matches!(self, Self::PersistenceUnavailable { .. } | Self::CorruptCounter { .. })
    }
}

fn counter_key(prefix: &str) -> String {
    format!("{}{}", membership::COUNTER_KEY_PREFIX, prefix)
}

/// Render an ID from its prefix and sequence number
pub fn format_member_id(prefix: &str, sequence: u64) -> String {
    format!("{prefix}{sequence:0width$}", width = membership::ID_DIGITS)
}

/// Issues member IDs backed by counters in a `KeyValueStore`
#[derive(Debug, Clone, Copy)]
pub struct IdAllocator {
    categories: &'static [Category],
    start: u64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self {
            categories: CATEGORIES,
            start: membership::DEFAULT_COUNTER,
        }
    }
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    fn category(&self, key: &str) -> Result<&'static Category, MembershipError> {
        self.categories
            .iter()
            .find(|c| c.key == key)
            .ok_or_else(|| MembershipError::InvalidCategory {
                category: key.to_string(),
            })
    }

    fn read_counter(&self, store: &impl KeyValueStore, key: &str) -> Result<u64, MembershipError> {
        let stored = store.get(key).map_err(|source| MembershipError::PersistenceUnavailable {
            key: key.to_string(),
            source,
        })?;
        match stored {
            None => Ok(self.start),
            Some(value) => value.trim().parse::<u64>().map_err(|_| {
                error!(key = %key, value = %value, "Stored counter is not a number");
                MembershipError::CorruptCounter {
                    key: key.to_string(),
                    value,
                }
            }),
        }
    }

    /// Sequence number the next `generate_id` for `category` would use
    pub fn peek_next(&self, store: &impl KeyValueStore, category: &str) -> Result<u64, MembershipError> {
        let category = self.category(category)?;
        self.read_counter(store, &counter_key(category.prefix))
    }

    /// Allocate the next ID for `category`. The incremented counter is
    /// persisted before the ID is returned.
    pub fn generate_id(&self, store: &mut impl KeyValueStore, category: &str) -> Result<String, MembershipError> {
        let category = self.category(category)?;
        let key = counter_key(category.prefix);
        let sequence = self.read_counter(&*store, &key)?;

        let next = sequence.checked_add(1).ok_or_else(|| MembershipError::CorruptCounter {
            key: key.clone(),
            value: sequence.to_string(),
        })?;
        store
            .set(&key, &next.to_string())
            .map_err(|source| MembershipError::PersistenceUnavailable {
                key: key.clone(),
                source,
            })?;
        debug!(key = %key, next = next, "Reserved membership sequence number");

        let id = format_member_id(category.prefix, sequence);
        info!(category = %category.key, label = %category.label, id = %id, "Allocated membership ID");
        Ok(id)
    }
}

//! Registration form state: category selection, ID request and submission
//!
//! Submission is gated on an allocated ID. Allocation errors are kept on the
//! form so the caller can show them; they are never swallowed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::{IdAllocator, MembershipError};
use crate::persistence::KeyValueStore;

/// Fields typed by the applicant
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicantDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub payment_reference: String,
}

/// Completed registration handed to the success display (not persisted)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MembershipRecord {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub category: String,
    pub payment_reference: String,
    pub member_id: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct MembershipForm {
    category: Option<String>,
    member_id: Option<String>,
    last_error: Option<String>,
}

impl MembershipForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a category and allocate an ID for it. Re-selecting the category
    /// that already holds an ID keeps that ID.
    pub fn select_category(
        &mut self,
        category: &str,
        allocator: &IdAllocator,
        store: &mut impl KeyValueStore,
    ) -> Result<&str, MembershipError> {
        if self.category.as_deref() == Some(category) && self.member_id.is_some() {
            return self.member_id.as_deref().ok_or(MembershipError::MissingId);
        }

        self.category = Some(category.to_string());
        self.member_id = None;

        match allocator.generate_id(store, category) {
            Ok(id) => {
                self.last_error = None;
                Ok(self.member_id.insert(id).as_str())
            }
            Err(e) => {
                warn!(category = %category, error = %e, "Membership ID unavailable, submission blocked");
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    #[cfg(test)]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    #[cfg(test)]
    pub fn member_id(&self) -> Option<&str> {
        self.member_id.as_deref()
    }

    /// Error message from the last failed allocation, for display
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_ready_to_submit(&self) -> bool {
        self.member_id.is_some()
    }

    /// Assemble the record and reset the form
    pub fn submit(&mut self, details: ApplicantDetails) -> Result<MembershipRecord, MembershipError> {
        let Some(member_id) = self.member_id.take() else {
            return Err(MembershipError::MissingId);
        };
        let category = self.category.take().unwrap_or_default();
        self.last_error = None;

        let record = MembershipRecord {
            name: details.name,
            email: details.email,
            phone: details.phone,
            category,
            payment_reference: details.payment_reference,
            member_id,
            submitted_at: Utc::now(),
        };
        info!(member_id = %record.member_id, category = %record.category, "Membership submitted");
        Ok(record)
    }
}

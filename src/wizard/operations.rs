//! Loading flags, double-trigger guard and late-response detection.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::services::ServiceError;

/// Asynchronous operations the wizard runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Address search.
    SearchAddress,
    /// Building lookup.
    LoadBuilding,
    /// Equipment catalog fetch.
    LoadCatalog,
    /// Contract creation.
    CreateContract,
    /// Sending a signature code.
    InitiateSignature,
    /// Submitting a signature code.
    VerifySignature,
    /// Report generation.
    DownloadReport,
    /// Contract PDF link.
    DownloadContract,
}

impl Operation {
    /// Returns `true` if repeating the call has no side effects.
    #[must_use]
    pub const fn is_idempotent(self) -> bool {
        matches!(
            self,
            Self::SearchAddress
                | Self::LoadBuilding
                | Self::LoadCatalog
                | Self::DownloadReport
                | Self::DownloadContract
        )
    }

    /// Machine name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SearchAddress => "search_address",
            Self::LoadBuilding => "load_building",
            Self::LoadCatalog => "load_catalog",
            Self::CreateContract => "create_contract",
            Self::InitiateSignature => "initiate_signature",
            Self::VerifySignature => "verify_signature",
            Self::DownloadReport => "download_report",
            Self::DownloadContract => "download_contract",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A failed operation as shown to the user. Entered data is never cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionError {
    /// Operation that failed.
    pub operation: Operation,
    /// Message for display.
    pub message: String,
    /// Whether a retry action should be offered.
    pub retryable: bool,
}

impl SessionError {
    /// Builds the session error for a service failure.
    ///
    /// Idempotent operations are always retryable. Side-effecting ones are
    /// retryable only when the failure is transient, so a rejected contract
    /// is not blindly resubmitted.
    #[must_use]
    pub fn from_service(operation: Operation, error: &ServiceError) -> Self {
        Self {
            operation,
            message: error.to_string(),
            retryable: operation.is_idempotent() || error.is_transient(),
        }
    }
}

/// Proof that an operation was started; hand it back to [`OperationTracker::finish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "an unfinished ticket leaves the operation marked as loading"]
pub struct OperationTicket {
    operation: Operation,
    generation: u64,
}

impl OperationTicket {
    /// Operation this ticket belongs to.
    pub const fn operation(&self) -> Operation {
        self.operation
    }
}

/// Tracks in-flight operations and the session generation.
#[derive(Debug, Clone, Default)]
pub struct OperationTracker {
    in_flight: HashSet<Operation>,
    generation: u64,
}

impl OperationTracker {
    /// Creates an idle tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `operation` as loading.
    ///
    /// Returns `None` if it is already in flight, so a double trigger is
    /// ignored.
    pub fn begin(&mut self, operation: Operation) -> Option<OperationTicket> {
        if !self.in_flight.insert(operation) {
            tracing::debug!(%operation, "Ignoring duplicate trigger");
            return None;
        }
        Some(OperationTicket {
            operation,
            generation: self.generation,
        })
    }

    /// Clears the loading flag and reports whether the result may be applied.
    ///
    /// A ticket from before the last [`invalidate`](Self::invalidate) is
    /// stale: its result belongs to a session that no longer exists.
    pub fn finish(&mut self, ticket: OperationTicket) -> bool {
        if ticket.generation != self.generation {
            tracing::debug!(operation = %ticket.operation, "Dropping late response");
            return false;
        }
        self.in_flight.remove(&ticket.operation);
        true
    }

    /// Returns `true` while `operation` is in flight.
    #[must_use]
    pub fn is_loading(&self, operation: Operation) -> bool {
        self.in_flight.contains(&operation)
    }

    /// Returns `true` if anything is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Current generation.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Starts a new generation and forgets all in-flight operations.
    pub fn invalidate(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.in_flight.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_trigger_is_ignored() {
        let mut tracker = OperationTracker::new();
        let ticket = tracker.begin(Operation::SearchAddress).unwrap();
        assert!(tracker.is_loading(Operation::SearchAddress));
        assert!(tracker.begin(Operation::SearchAddress).is_none());
        assert!(tracker.begin(Operation::LoadCatalog).is_some());
        assert!(tracker.finish(ticket));
        assert!(!tracker.is_loading(Operation::SearchAddress));
    }

    #[test]
    fn late_response_after_invalidate_is_dropped() {
        let mut tracker = OperationTracker::new();
        let ticket = tracker.begin(Operation::LoadBuilding).unwrap();
        tracker.invalidate();
        assert!(!tracker.is_busy());
        assert!(!tracker.finish(ticket));
        // A fresh start is possible right away
        let fresh = tracker.begin(Operation::LoadBuilding).unwrap();
        assert!(tracker.finish(fresh));
    }

    #[test]
    fn retry_policy() {
        let rejected = ServiceError::rejected("phone number unknown");
        let outage = ServiceError::Timeout;

        let e = SessionError::from_service(Operation::LoadCatalog, &rejected);
        assert!(e.retryable);

        let e = SessionError::from_service(Operation::CreateContract, &rejected);
        assert!(!e.retryable);

        let e = SessionError::from_service(Operation::InitiateSignature, &outage);
        assert!(e.retryable);
        assert_eq!(e.message, "request timed out");
    }
}

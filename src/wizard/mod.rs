//! Wizard state and step orchestration.
//!
//! A quote is collected over a fixed sequence of steps. Two journeys exist
//! (contract and report); they are two [`FlowConfig`]s of the same machine.
//!
//! - [`WizardSession`] holds everything the user entered and everything
//!   derived from it. Its methods are synchronous: navigation, validation
//!   and the layout recomputation that keeps the panel count within the
//!   current maximum.
//! - [`QuoteFlow`] owns a session and a service backend and runs the
//!   asynchronous work attached to entering a step.
//!
//! # Modules
//!
//! - [`flow`] - Steps, entry effects and flow configurations
//! - [`validation`] - Field errors and contact field checks
//! - [`drawing`] - Polygon drawing state machine
//! - [`otp`] - Signature code expiry and resend cooldown
//! - [`operations`] - Loading flags, double-trigger guard, liveness
//! - [`session`] - Session data, navigation and layout bookkeeping
//! - [`orchestrator`] - Async step effects over the service traits

pub mod drawing;
pub mod flow;
pub mod operations;
pub mod orchestrator;
pub mod otp;
pub mod session;
pub mod validation;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::estimate::EstimateError;
use crate::geometry::GeometryError;
use crate::services::ServiceError;

pub use drawing::{DrawingError, DrawingState, DrawingTarget, PointOutcome};
pub use flow::{EntryEffect, FlowConfig, FlowKind, Step};
pub use operations::{Operation, OperationTicket, OperationTracker, SessionError};
pub use orchestrator::QuoteFlow;
pub use otp::{OtpChallenge, OtpError};
pub use session::{SessionSettings, WizardSession};
pub use validation::FieldErrors;

bitflags! {
    /// Consents given on the consents step.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Consents: u8 {
        /// General terms and conditions.
        const TERMS = 1 << 0;
        /// Privacy policy.
        const PRIVACY = 1 << 1;
        /// Optional marketing contact.
        const MARKETING = 1 << 2;
    }
}

impl Consents {
    /// Consents without which no contract can be created.
    pub const REQUIRED: Self = Self::TERMS.union(Self::PRIVACY);
}

bitflags! {
    /// Acknowledgments sent with the signature request.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Acknowledgments: u8 {
        /// The customer read the contract.
        const CONTRACT_READ = 1 << 0;
        /// The customer was informed of the withdrawal right.
        const WITHDRAWAL_RIGHT = 1 << 1;
        /// The customer accepts electronic signing.
        const ELECTRONIC_SIGNATURE = 1 << 2;
    }
}

/// Customer contact details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// E-mail address.
    pub email: String,
    /// Mobile number for the signature code.
    pub phone: String,
    /// Street and number.
    pub street: String,
    /// Postal code.
    pub postal_code: String,
    /// City.
    pub city: String,
}

impl PersonalInfo {
    /// Checks required fields and formats.
    #[must_use]
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        errors.require("firstName", &self.first_name, "First name is required");
        errors.require("lastName", &self.last_name, "Last name is required");
        errors.require("email", &self.email, "E-mail is required");
        if !self.email.trim().is_empty() && !validation::is_valid_email(&self.email) {
            errors.add("email", "E-mail address is not valid");
        }
        errors.require("phone", &self.phone, "Phone number is required");
        if !self.phone.trim().is_empty() && !validation::is_valid_phone(&self.phone) {
            errors.add("phone", "Phone number is not valid");
        }
        errors.require("street", &self.street, "Street is required");
        if !validation::is_valid_postal_code(&self.postal_code) {
            errors.add("postalCode", "Postal code is not valid");
        }
        errors.require("city", &self.city, "City is required");
        errors
    }
}

/// Errors from wizard actions.
#[derive(Debug, Error)]
pub enum WizardError {
    /// The current step has invalid or missing fields.
    #[error("step '{step}' has {} invalid field(s)", .errors.len())]
    Validation {
        /// Step that failed.
        step: Step,
        /// Field messages.
        errors: FieldErrors,
    },

    /// `next` was called on the terminal step.
    #[error("already at the final step")]
    AtTerminalStep,

    /// `go_to_step` was given an index outside the flow.
    #[error("step {index} is out of range (flow has {len} steps)")]
    StepOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of steps.
        len: usize,
    },

    /// The same operation is already running.
    #[error("operation '{0}' is already in progress")]
    Busy(Operation),

    /// The session was reset while the operation was running.
    #[error("operation '{0}' finished after the session was reset")]
    Stale(Operation),

    /// Required earlier input is missing.
    #[error("{0}")]
    Precondition(String),

    /// A roof segment id is not part of the loaded building.
    #[error("unknown roof segment: {0}")]
    UnknownSegment(String),

    /// The signature code was not accepted.
    #[error("signature code was rejected")]
    CodeRejected,

    /// Invalid drawing action.
    #[error(transparent)]
    Drawing(#[from] DrawingError),

    /// Invalid geometry input.
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// Signature code check failed.
    #[error(transparent)]
    Otp(#[from] OtpError),

    /// Export failed.
    #[error(transparent)]
    Export(#[from] EstimateError),

    /// A service call failed.
    #[error("{operation} failed: {source}")]
    Service {
        /// Operation that failed.
        operation: Operation,
        /// Underlying error.
        #[source]
        source: ServiceError,
    },
}

impl WizardError {
    /// Creates a precondition error.
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }
}

// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Error types for the audit protocol.
//!
//! Errors come in two flavors. A [`CallerError`] means the calling application
//! handed the protocol something malformed (bad bytes, too many transactions,
//! mismatched vectors). Every other [`InternalError`] variant means a step of
//! the epoch lifecycle is missing, e.g. verifying before the
//! [`Committee`](crate::committee::Committee) finished initializing the
//! epoch. Such errors are fatal for the epoch: re-run epoch initialization.

use thiserror::Error;

/// The default Result type used in this crate.
pub type Result<T> = std::result::Result<T, InternalError>;

/// Represents an error raised while running the protocol.
#[derive(Clone, Eq, PartialEq, Error, Debug)]
pub enum InternalError {
    /// The calling application made a mistake.
    #[error("Calling application made a mistake: {0}")]
    CallingApplicationMistake(#[from] CallerError),
    /// No epoch secret key was delegated for the given organization hash.
    #[error("No epoch secret key for organization {0}")]
    KeyNotFound(String),
    /// No pair randomness exists for the given organization pair.
    #[error("No epoch randomness for organization pair ({0}, {1})")]
    RandomnessNotFound(String, String),
    /// No epoch pseudonym was set for the given participant.
    #[error("No epoch pseudonym for participant {0}")]
    PseudonymNotFound(String),
    /// A summary was requested for a counterparty with nothing accumulated.
    #[error("No transactions accumulated with counterparty {0}")]
    NoTransactions(String),
    /// The ledger rejected a record after every allowed attempt.
    #[error("Ledger write of record {key} failed after {attempts} attempts")]
    LedgerWriteFailed {
        /// Key of the record that could not be written.
        key: String,
        /// Number of attempts made.
        attempts: usize,
    },
    /// A record could not be serialized.
    #[error("Serialization Error")]
    Serialization,
    /// Represents some code assumption that was checked at runtime but failed
    /// to be true.
    #[error("Internal invariant failed")]
    InternalInvariantFailed,
}

/// Errors that are caused by incorrect behavior by the calling application.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum CallerError {
    /// Malformed point, scalar, ciphertext, or hex bytes.
    #[error("Invalid point, scalar or ciphertext encoding")]
    InvalidEncoding,
    /// The payload does not fit into a single group element.
    #[error("Payload of {len} bytes exceeds the embeddable length of {max} bytes")]
    PayloadTooLarge {
        /// Length of the rejected payload.
        len: usize,
        /// Largest payload that can be embedded.
        max: usize,
    },
    /// An operation that needs at least one transaction received none.
    #[error("Empty transaction list")]
    EmptyList,
    /// More transactions than an epoch allows for one organization pair.
    #[error("Too many transactions in the epoch: {count} (at most {max})")]
    TooManyTransactions {
        /// Number of transactions received.
        count: usize,
        /// Per-pair maximum for the epoch.
        max: usize,
    },
    /// Two vectors that must be index-aligned have different lengths.
    #[error("Length mismatch: {left} != {right}")]
    LengthMismatch {
        /// Length of the first vector.
        left: usize,
        /// Length of the second vector.
        right: usize,
    },
    /// The auditor is not managed by this committee.
    #[error("Unknown auditor {0}")]
    UnknownAuditor(String),
    /// The organization is not managed by this committee.
    #[error("Unknown organization {0}")]
    UnknownOrganization(String),
    /// Input that is well-formed but semantically invalid.
    #[error("Bad input")]
    BadInput,
    /// A bounded sampling loop ran out of attempts.
    #[error("Retry limit exceeded")]
    RetryFailed,
}

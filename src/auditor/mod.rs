//! The auditor side of an audit epoch.
//!
//! An [`Auditor`] never sees transaction amounts. From an organization's
//! hidden transactions with one counterparty it computes
//!
//! - `res = Σ r_k · c_k`, each commitment scaled by the pair randomness slot
//!   the committee drew for it,
//! - `A = summary − SHA256(org pseudonym)·G`, the organization's own claim,
//! - `B = (−Σ blinding_k · r_k)·H`, which strips the blinding from `res`,
//! - `C = A − res` and `D = −(A + B)`,
//!
//! and publishes them encrypted under the organization's epoch key as an
//! [`AuditorReport`](crate::transaction::AuditorReport). The committee
//! checks the reports of both sides of a pair against each other without
//! learning any amount.
// Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

mod participant;
mod randomness;

pub use participant::{Auditor, Examination};
pub use randomness::PairRandomness;

// Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Epoch-based, privacy-preserving consistency audits of transactions
//! between organizations.
//!
//! Organizations that trade with each other each keep a local ledger of
//! their transactions, but only publish Pedersen commitments to the amounts.
//! Auditors, each delegated a subset of organizations, check that every
//! organization's published summary matches its hidden transactions and
//! that both sides of every organization pair booked matching amounts. A
//! committee sets up each epoch and verifies the auditors' encrypted
//! reports. Nobody except the organizations themselves learns an amount.
//!
//! # Participants
//!
//! - [`committee::Committee`]: draws the per-epoch secrets (pair randomness,
//!   pseudonyms, ElGamal key pairs), forwards them, and checks the reports.
//! - [`organization::Organization`]: commits to its transactions and
//!   publishes one summary per counterparty.
//! - [`auditor::Auditor`]: recomputes the accumulated commitments under the
//!   committee's randomness and publishes an encrypted
//!   [`transaction::AuditorReport`].
//!
//! All arithmetic is generic over [`curve::CurveTrait`]; secp256k1 and
//! secp256r1 are provided. Every randomized call takes its RNG explicitly.
//!
//! # Example
//!
//! ```
//! use epoch_audit::{
//!     auditor::Auditor,
//!     committee::Committee,
//!     config::ProtocolConfig,
//!     curve::TestCurve,
//!     group::GroupContext,
//!     identity::{AuditorId, OrgId},
//!     organization::Organization,
//!     transaction::PlainTransaction,
//! };
//!
//! # fn main() -> epoch_audit::errors::Result<()> {
//! let rng = &mut rand::thread_rng();
//! let ctx = GroupContext::<TestCurve>::new()?;
//! let config = ProtocolConfig {
//!     max_num_tx_in_epoch: 16,
//!     ..Default::default()
//! };
//! let (alice, bob) = (OrgId::new("alice"), OrgId::new("bob"));
//!
//! let mut auditors = vec![
//!     Auditor::new(ctx, &config, AuditorId::new("aud-a"), &[alice.clone()])?,
//!     Auditor::new(ctx, &config, AuditorId::new("aud-b"), &[bob.clone()])?,
//! ];
//! let mut orgs = vec![
//!     Organization::new(ctx, &config, alice.clone())?,
//!     Organization::new(ctx, &config, bob.clone())?,
//! ];
//! let mut committee = Committee::new(ctx, config, "committee", &auditors)?;
//! let public_keys = committee.initialize_epoch(rng, &mut auditors, &mut orgs)?;
//!
//! // alice pays bob 42.50
//! let (sent, received) = PlainTransaction::new_pair(&alice, &bob, 42.5, 0)?;
//! let sent = orgs[0].record_transaction(rng, &sent)?;
//! let received = orgs[1].record_transaction(rng, &received)?;
//!
//! let summary_a = orgs[0].compose_org_summary(&bob)?;
//! let summary_b = orgs[1].compose_org_summary(&alice)?;
//! let exam_a = auditors[0].consistency_examination(
//!     rng,
//!     &alice,
//!     &bob,
//!     &summary_a,
//!     &[sent],
//!     orgs[0].blinding_factors(&bob),
//!     &public_keys,
//! )?;
//! let exam_b = auditors[1].consistency_examination(
//!     rng,
//!     &bob,
//!     &alice,
//!     &summary_b,
//!     &[received],
//!     orgs[1].blinding_factors(&alice),
//!     &public_keys,
//! )?;
//!
//! assert!(committee.verify_org_and_aud_result(
//!     &alice,
//!     auditors[0].id(),
//!     &summary_a,
//!     &exam_a.report
//! )?);
//! assert!(committee.verify_audit_pair_result(
//!     &alice,
//!     &bob,
//!     auditors[0].id(),
//!     auditors[1].id(),
//!     &exam_a.report,
//!     &exam_b.report,
//! )?);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod auditor;
pub mod commitment;
pub mod committee;
pub mod config;
pub mod curve;
pub mod elgamal;
pub mod errors;
pub mod group;
pub mod identity;
pub mod k256;
pub mod ledger;
pub mod organization;
pub mod p256;
pub mod parallel;
pub mod transaction;
mod utils;

pub use auditor::{Auditor, Examination, PairRandomness};
pub use committee::{Committee, VerificationJob};
pub use config::{LedgerConfig, ProtocolConfig};
pub use errors::{CallerError, InternalError, Result};
pub use group::GroupContext;
pub use identity::{AuditorId, EpochPseudonym, OrgId};
pub use organization::Organization;

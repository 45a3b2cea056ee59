//! The organization side of an audit epoch.
//!
//! An [`Organization`] records its transactions on its local chain as
//! Pedersen commitments and keeps, per counterparty, the homomorphic sum of
//! those commitments. At the end of a reporting period it publishes, for
//! each counterparty, an [`OrgSummary`](crate::transaction::OrgSummary): the
//! accumulator plus the hash point of its epoch pseudonym.
//!
//! # Epoch lifecycle
//! - The [`Committee`](crate::committee::Committee) pushes a fresh pseudonym
//!   with [`Organization::set_epoch_id`]. This also discards every
//!   accumulator and blinding factor of the previous epoch.
//! - [`Organization::record_transaction`] hides a transaction, adds it to the
//!   counterparty accumulator and keeps the blinding scalar, which the
//!   organization's auditor needs for `ComputeB`.
//! - [`Organization::compose_org_summary`] produces the org-chain record.
// Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

mod participant;

pub use participant::Organization;

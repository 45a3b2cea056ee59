//! The audit committee.
//!
//! The [`Committee`] is the only party that sees every epoch secret. At the
//! start of an epoch it draws, for every unordered pair of managed
//! organizations, one random scalar per transaction slot; one pseudonym per
//! organization and auditor; and one ElGamal key pair per organization. Each
//! auditor receives the slice of those secrets its delegation covers.
//!
//! After the auditors publish their reports the committee decrypts them and
//! checks two identities:
//!
//! | Check | Identity |
//! |-------|----------|
//! | [`Committee::verify_org_and_aud_result`] | `summary + B + D' = P(org) + P(auditor)` |
//! | [`Committee::verify_audit_pair_result`] | `D1' + C1 + D2' + C2 = P(auditor1) + P(auditor2)` |
//!
//! where `P(x)` is the hash point of pseudonym `x` and `D'` is the decrypted
//! `D` field, which the auditor offset by its own pseudonym point.
// Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

mod participant;
mod verify;

pub use participant::Committee;
pub use verify::VerificationJob;

//! Transaction records exchanged through the ledgers.
//!
//! Each ledger has a typed record, used by the protocol code, and an
//! on-chain form with hex-encoded byte fields that is what actually gets
//! stored:
//!
//! | Ledger | Typed record | On-chain record |
//! |---|---|---|
//! | local chain | [`HiddenTransaction`] | [`LocalOnChain`] |
//! | org chain | [`OrgSummary`] | [`OrgOnChain`] |
//! | aud chain | [`AuditorReport`] | [`AudOnChain`] |
//!
//! Conversions from the on-chain form validate every field and fail with
//! [`CallerError::InvalidEncoding`](crate::errors::CallerError::InvalidEncoding).
// Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

mod aud_chain;
mod local_chain;
mod org_chain;

pub use aud_chain::{AudOnChain, AuditorReport};
pub use local_chain::{
    generate_pair_batch, hide_batch, HiddenTransaction, HiddenWithOpening, LocalOnChain,
    PlainTransaction, AMOUNT_AMPLIFIER,
};
pub use org_chain::{OrgOnChain, OrgSummary};

use crate::{
    errors::{InternalError, Result},
    utils::sha256,
};
use serde::Serialize;
use tracing::error;

/// A record that can be written to a ledger.
pub trait OnChainRecord: Serialize {
    /// The ledger key of this record.
    fn key(&self, json: &[u8]) -> String;

    /// The ledger key and the JSON value to store under it.
    fn key_value(&self) -> Result<(String, Vec<u8>)> {
        let json = serde_json::to_vec(self).map_err(|e| {
            error!("Failed to serialize on-chain record: {e}");
            InternalError::Serialization
        })?;
        Ok((self.key(&json), json))
    }
}

/// Key of content-addressed records: `hex(SHA256(json))`.
pub(crate) fn content_key(json: &[u8]) -> String {
    hex::encode(sha256(&[json]))
}

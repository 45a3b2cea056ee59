// Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Participant identities.
//!
//! Long-lived identities ([`OrgId`], [`AuditorId`]) are opaque strings. All
//! per-epoch state is keyed by their SHA-256 digest ([`IdHash`]), and the
//! randomness shared by two organizations is keyed by the unordered pair of
//! their digests ([`PairKey`]). Per-epoch pseudonyms ([`EpochPseudonym`])
//! are fresh random byte strings that enter the verification identities
//! through [`GroupContext::hash_to_point`].

use crate::{curve::CurveTrait, group::GroupContext, utils::sha256};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// SHA-256 digest of a participant identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdHash([u8; 32]);

impl IdHash {
    /// Hash an identity string.
    pub fn of(id: &str) -> Self {
        Self(sha256(&[id.as_bytes()]))
    }

    /// Wrap raw digest bytes, e.g. a counterparty hash parsed from the ledger.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Display for IdHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl Debug for IdHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "IdHash({self})")
    }
}

macro_rules! participant_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Create an identity from its string form.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The identity string.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// SHA-256 digest of the identity string.
            pub fn hash(&self) -> IdHash {
                IdHash::of(&self.0)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }
    };
}

participant_id!(
    /// Stable identity of an organization.
    OrgId
);
participant_id!(
    /// Stable identity of an auditor.
    AuditorId
);

/// Order-independent key for state shared by two organizations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey(IdHash, IdHash);

impl PairKey {
    /// The smaller of the two hashes.
    pub fn low(&self) -> IdHash {
        self.0
    }

    /// The larger of the two hashes.
    pub fn high(&self) -> IdHash {
        self.1
    }

    /// True if `id` is one side of the pair.
    pub fn contains(&self, id: &IdHash) -> bool {
        self.0 == *id || self.1 == *id
    }
}

impl Display for PairKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.0, self.1)
    }
}

/// Canonical pair key: `pair_key(a, b) == pair_key(b, a)`.
///
/// Every insertion into and lookup of pair-scoped state must go through this
/// function.
pub fn pair_key(a: IdHash, b: IdHash) -> PairKey {
    if a <= b {
        PairKey(a, b)
    } else {
        PairKey(b, a)
    }
}

/// A per-epoch random identifier of an organization or auditor.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct EpochPseudonym(Vec<u8>);

impl Debug for EpochPseudonym {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("EpochPseudonym([redacted])")
    }
}

impl EpochPseudonym {
    /// Draw `len` fresh random bytes.
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R, len: usize) -> Self {
        let mut bytes = vec![0u8; len];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Wrap existing pseudonym bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The raw pseudonym bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// `SHA256(pseudonym)·G`, the term a pseudonym contributes to the
    /// verification identities.
    pub fn hash_point<C: CurveTrait>(&self, ctx: &GroupContext<C>) -> C {
        ctx.hash_to_point(&self.0)
    }
}

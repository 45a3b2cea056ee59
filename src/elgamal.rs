// Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! ElGamal encryption of group elements.
//!
//! The committee generates one [`KeyPair`] per organization and epoch. The
//! public half is published; auditors encrypt their audit values (curve
//! points) under it, and the secret half is held by the committee and by the
//! organization's auditor only.
//!
//! Besides points, the scheme can carry short byte strings (and hence
//! amounts) by embedding them into the x-coordinate of a curve point, see
//! [`embed_payload`].

use crate::{
    curve::{CurveTrait, ScalarTrait},
    errors::{CallerError, Result},
    group::GroupContext,
    utils::{ParseBytes, CRYPTOGRAPHIC_RETRY_MAX},
};
use rand::{CryptoRng, RngCore};
use std::fmt::Debug;
use tracing::error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Number of random filler bytes kept in every embedded x-coordinate, so a
/// payload has many candidate points to land on.
const EMBED_FILLER_LEN: usize = 2;

/// Compressed SEC1 prefix used for embedded points.
const EMBED_PREFIX: u8 = 0x02;

/// The largest payload, in bytes, that fits into one point of `C`.
pub fn embed_len<C: CurveTrait>() -> usize {
    // prefix byte, length byte and filler are not available to the payload
    C::COMPRESSED_LEN - 2 - EMBED_FILLER_LEN
}

/// Secret decryption key for one organization and epoch.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey<C: CurveTrait> {
    x: C::Scalar,
}

impl<C: CurveTrait> Debug for SecretKey<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey([redacted])")
    }
}

impl<C: CurveTrait> SecretKey<C> {
    /// Sample a secret key uniformly at random.
    pub(crate) fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self {
            x: C::Scalar::random(rng),
        }
    }

    /// Computes the public key `x·G` for this secret key.
    pub fn public_key(&self, ctx: &GroupContext<C>) -> PublicKey<C> {
        PublicKey(ctx.g().multiply_by_scalar(&self.x))
    }

    /// Recover the point encrypted in `ciphertext`: `c2 - x·c1`.
    pub fn decrypt_point(&self, ciphertext: &Ciphertext<C>) -> C {
        ciphertext.c2 - ciphertext.c1.multiply_by_scalar(&self.x)
    }

    /// Decrypt an amount produced by [`PublicKey::encrypt_amount`].
    pub fn decrypt_amount(&self, ciphertext: &Ciphertext<C>) -> Result<i64> {
        let payload = extract_payload(&self.decrypt_point(ciphertext))?;
        let bytes: [u8; 8] = payload.as_slice().try_into().map_err(|_| {
            error!("Decrypted payload is {} bytes, expected 8", payload.len());
            CallerError::InvalidEncoding
        })?;
        Ok(i64::from_be_bytes(bytes))
    }
}

/// Public encryption key for one organization and epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKey<C>(C);

impl<C: CurveTrait> PublicKey<C> {
    /// Wrap a curve point as a public key.
    pub fn from_point(point: C) -> Self {
        Self(point)
    }

    /// Encrypt `message` with fresh randomness `k`: `(k·G, message + k·pk)`.
    pub fn encrypt_point<R: RngCore + CryptoRng>(
        &self,
        ctx: &GroupContext<C>,
        rng: &mut R,
        message: &C,
    ) -> Ciphertext<C> {
        let mut k = C::Scalar::random(rng);
        let c1 = ctx.g().multiply_by_scalar(&k);
        let c2 = *message + self.0.multiply_by_scalar(&k);
        k.zeroize();
        Ciphertext { c1, c2 }
    }

    /// Embed `amount` into a point and encrypt it.
    pub fn encrypt_amount<R: RngCore + CryptoRng>(
        &self,
        ctx: &GroupContext<C>,
        rng: &mut R,
        amount: i64,
    ) -> Result<Ciphertext<C>> {
        let point = embed_payload::<C, R>(rng, &amount.to_be_bytes())?;
        Ok(self.encrypt_point(ctx, rng, &point))
    }
}

impl<C> AsRef<C> for PublicKey<C> {
    /// Get the public curve point.
    fn as_ref(&self) -> &C {
        &self.0
    }
}

/// A secret/public key pair.
#[derive(Debug, Clone)]
pub struct KeyPair<C: CurveTrait> {
    secret: SecretKey<C>,
    public: PublicKey<C>,
}

impl<C: CurveTrait> KeyPair<C> {
    /// Generate a fresh key pair: a uniformly random secret scalar and its
    /// multiple of `G`.
    pub fn generate<R: RngCore + CryptoRng>(ctx: &GroupContext<C>, rng: &mut R) -> Self {
        let secret = SecretKey::random(rng);
        let public = secret.public_key(ctx);
        Self { secret, public }
    }

    /// The secret half.
    pub fn secret_key(&self) -> &SecretKey<C> {
        &self.secret
    }

    /// The public half.
    pub fn public_key(&self) -> PublicKey<C> {
        self.public
    }
}

/// An ElGamal ciphertext of a single curve point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ciphertext<C> {
    c1: C,
    c2: C,
}

impl<C: CurveTrait> Ciphertext<C> {
    /// Serialize as `c1 ‖ c2`, both compressed.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.c1.to_bytes();
        bytes.extend(self.c2.to_bytes());
        bytes
    }

    /// Parse the encoding produced by [`Ciphertext::to_bytes`].
    pub fn try_from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut parser = ParseBytes::new(bytes.to_vec());
        let c1 = C::try_from_bytes(parser.take_bytes(C::COMPRESSED_LEN)?)?;
        let c2 = C::try_from_bytes(parser.take_bytes(C::COMPRESSED_LEN)?)?;
        parser.finish()?;
        Ok(Self { c1, c2 })
    }
}

/// Map `payload` to a curve point whose x-coordinate is
/// `len ‖ payload ‖ random filler`.
///
/// Fails with [`CallerError::PayloadTooLarge`] when the payload is longer
/// than [`embed_len`].
pub fn embed_payload<C: CurveTrait, R: RngCore + CryptoRng>(
    rng: &mut R,
    payload: &[u8],
) -> Result<C> {
    let max = embed_len::<C>();
    if payload.len() > max {
        error!(
            "Cannot embed {} bytes into a point, at most {} fit",
            payload.len(),
            max
        );
        Err(CallerError::PayloadTooLarge {
            len: payload.len(),
            max,
        })?
    }

    let mut candidate = vec![0u8; C::COMPRESSED_LEN];
    candidate[0] = EMBED_PREFIX;
    candidate[1] = payload.len() as u8;
    candidate[2..2 + payload.len()].copy_from_slice(payload);
    for _ in 0..CRYPTOGRAPHIC_RETRY_MAX {
        rng.fill_bytes(&mut candidate[2 + payload.len()..]);
        if let Some(point) = C::decompress(&candidate) {
            return Ok(point);
        }
    }
    error!("Failed to find a curve point embedding the payload");
    Err(CallerError::RetryFailed)?
}

/// Inverse of [`embed_payload`].
pub fn extract_payload<C: CurveTrait>(point: &C) -> Result<Vec<u8>> {
    let bytes = point.to_bytes();
    let len = usize::from(bytes[1]);
    if bytes[0] != EMBED_PREFIX || len > embed_len::<C>() {
        error!("Point does not carry an embedded payload");
        Err(CallerError::InvalidEncoding)?
    }
    Ok(bytes[2..2 + len].to_vec())
}

//! The group parameters shared by every participant of an audit.
//!
//! A [`GroupContext`] fixes the curve and the two independent generators
//! `G` and `H` used by Pedersen commitments. It is an ordinary value: each
//! [`Organization`](crate::organization::Organization),
//! [`Auditor`](crate::auditor::Auditor) and
//! [`Committee`](crate::committee::Committee) holds a copy, and all the
//! primitives take one by reference. Participants of the same audit must use
//! contexts built from the same seed.

use crate::{
    curve::{CurveTrait, ScalarTrait},
    errors::{CallerError, Result},
    utils::{sha256, CRYPTOGRAPHIC_RETRY_MAX},
};
use merlin::Transcript;
use tracing::error;

/// Seed used by [`GroupContext::new`] to derive the second generator.
pub const DEFAULT_GENERATOR_SEED: &[u8] = b"epoch-audit pedersen generator H v1";

/// Compressed SEC1 prefix for a point with even y-coordinate.
const EVEN_Y_PREFIX: u8 = 0x02;

/// Curve generators and hash-to-group helpers for one audit deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupContext<C> {
    g: C,
    h: C,
}

impl<C: CurveTrait> GroupContext<C> {
    /// Build the context with the default generator seed.
    pub fn new() -> Result<Self> {
        Self::with_seed(DEFAULT_GENERATOR_SEED)
    }

    /// Build a context whose `H` is derived from `seed`.
    ///
    /// `H` is found by try-and-increment: candidate x-coordinates are drawn
    /// from a transcript bound to the seed until one lies on the curve. Nobody
    /// learns the discrete log of `H` with respect to `G`.
    pub fn with_seed(seed: &[u8]) -> Result<Self> {
        let mut transcript = Transcript::new(b"GroupContext generator H");
        transcript.append_message(b"seed", seed);

        let mut candidate = vec![0u8; C::COMPRESSED_LEN];
        candidate[0] = EVEN_Y_PREFIX;
        for _ in 0..CRYPTOGRAPHIC_RETRY_MAX {
            transcript.challenge_bytes(b"candidate x-coordinate", &mut candidate[1..]);
            if let Some(h) = C::decompress(&candidate) {
                if !h.is_identity() && h != C::GENERATOR {
                    return Ok(Self { g: C::GENERATOR, h });
                }
            }
        }
        error!("Failed to derive a second generator from the seed");
        Err(CallerError::RetryFailed)?
    }

    /// The base generator `G`.
    pub fn g(&self) -> C {
        self.g
    }

    /// The second generator `H`.
    pub fn h(&self) -> C {
        self.h
    }

    /// `SHA256(bytes)` reduced modulo the group order.
    pub fn hash_to_scalar(&self, bytes: &[u8]) -> C::Scalar {
        C::Scalar::from_digest(&sha256(&[bytes]))
    }

    /// `hash_to_scalar(bytes)·G`.
    pub fn hash_to_point(&self, bytes: &[u8]) -> C {
        self.g.multiply_by_scalar(&self.hash_to_scalar(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{Secp256r1, TestCurve};

    #[test]
    fn generator_derivation_is_deterministic() {
        let a = GroupContext::<TestCurve>::new().unwrap();
        let b = GroupContext::<TestCurve>::new().unwrap();
        assert_eq!(a, b);
        assert_ne!(a.g(), a.h());
    }

    #[test]
    fn seeds_produce_isolated_contexts() {
        let a = GroupContext::<TestCurve>::with_seed(b"first deployment").unwrap();
        let b = GroupContext::<TestCurve>::with_seed(b"second deployment").unwrap();
        assert_eq!(a.g(), b.g());
        assert_ne!(a.h(), b.h());

        let r = GroupContext::<Secp256r1>::with_seed(b"first deployment").unwrap();
        assert!(!r.h().is_identity());
    }

    #[test]
    fn hash_to_point_depends_on_input() {
        let ctx = GroupContext::<TestCurve>::new().unwrap();
        assert_eq!(ctx.hash_to_point(b"epoch"), ctx.hash_to_point(b"epoch"));
        assert_ne!(ctx.hash_to_point(b"epoch"), ctx.hash_to_point(b"epocH"));
    }
}

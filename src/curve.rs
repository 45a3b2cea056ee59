//! Elliptic Curve abstraction
use crate::{errors::Result, k256::K256, p256::P256};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::{
    fmt::Debug,
    ops::{Add, Mul, Neg, Sub},
};
use zeroize::Zeroize;

/// Generic elliptic curve point.
///
/// Every protocol type in this crate is generic over an implementation of
/// this trait, so the same committee, auditor and organization code runs over
/// any prime-order group with a compressed SEC1 encoding.
pub trait CurveTrait:
    'static
    + Clone
    + Copy
    + Debug
    + Send
    + Sync
    + Eq
    + PartialEq
    + Serialize
    + for<'de> Deserialize<'de>
    + Add<Output = Self>
    + Sub<Output = Self>
    + Neg<Output = Self>
    + Zeroize
    + AsRef<Self>
{
    /// A generator point.
    const GENERATOR: Self;

    /// The identity point, used to initialize accumulators.
    const IDENTITY: Self;

    /// Length in bytes of a compressed point encoding.
    const COMPRESSED_LEN: usize;

    /// The type of scalars.
    type Scalar: ScalarTrait;

    /// Multiply `self` by a [`Self::Scalar`].
    fn multiply_by_scalar(&self, scalar: &Self::Scalar) -> Self;

    /// Multiply the generator by a [`Self::Scalar`].
    fn scale_generator(scalar: &Self::Scalar) -> Self {
        Self::GENERATOR.multiply_by_scalar(scalar)
    }

    /// Serialize the point as a compressed affine-encoded byte array.
    fn to_bytes(self) -> Vec<u8>;

    /// Deserialize a point from a compressed affine-encoded byte array.
    fn try_from_bytes(bytes: &[u8]) -> Result<Self>;

    /// Like [`CurveTrait::try_from_bytes`], but silent on failure. Used by
    /// sampling loops where most candidates are expected to be rejected.
    fn decompress(bytes: &[u8]) -> Option<Self>;

    /// Random point.
    fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self;

    /// True if and only if this is the identity point.
    fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

/// Scalar trait.
pub trait ScalarTrait:
    'static
    + Sync
    + Send
    + Clone
    + Copy
    + Debug
    + PartialEq
    + Eq
    + Zeroize
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Neg<Output = Self>
{
    /// Return the zero scalar.
    fn zero() -> Self;

    /// Return the one scalar.
    fn one() -> Self;

    /// Convert a u64 to a scalar.
    fn convert_from_u64(x: u64) -> Self;

    /// Random scalar, uniform over the field.
    fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self;

    /// Reduce a 32-byte big-endian digest modulo the group order.
    fn from_digest(digest: &[u8; 32]) -> Self;

    /// Convert to the canonical 32-byte big-endian encoding.
    fn to_bytes(&self) -> Vec<u8>;

    /// Convert from the canonical 32-byte big-endian encoding. Non-canonical
    /// or wrongly sized input is rejected.
    fn try_from_bytes(bytes: &[u8]) -> Result<Self>;
}

/// Default curve type.
pub type TestCurve = K256;
//pub type TestCurve = P256;

/// Default scalar type.
pub type TestScalar = k256::Scalar;
//pub type TestScalar = p256::Scalar;

/// K256 curve type.
pub type Secp256k1 = K256;

/// P256 curve type.
pub type Secp256r1 = P256;

#[cfg(test)]
mod tests {
    use crate::{
        curve::{CurveTrait, ScalarTrait, Secp256r1, TestCurve},
        utils::testing::init_testing,
    };

    #[test]
    fn negated_scalar_sums_to_zero() {
        let rng = &mut init_testing();
        let x = <TestCurve as CurveTrait>::Scalar::random(rng);
        assert_eq!(x + (-x), <TestCurve as CurveTrait>::Scalar::zero());
    }

    #[test]
    fn generator_arithmetic_is_consistent_across_curves() {
        fn check<C: CurveTrait>() {
            let two = C::Scalar::convert_from_u64(2);
            let doubled = C::GENERATOR + C::GENERATOR;
            assert_eq!(C::scale_generator(&two), doubled);
            assert!((doubled - C::GENERATOR - C::GENERATOR).is_identity());
        }
        check::<TestCurve>();
        check::<Secp256r1>();
    }
}

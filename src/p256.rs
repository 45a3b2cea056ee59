//! P256 functions

use crate::{
    curve::{CurveTrait, ScalarTrait},
    errors::{CallerError, Result},
};
use generic_array::GenericArray;
use p256::{
    elliptic_curve::{
        group::GroupEncoding, ops::Reduce, AffinePoint, Field, Group, PrimeField,
    },
    ProjectivePoint, Scalar as P256_Scalar, U256,
};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::Debug;
use tracing::error;
use zeroize::Zeroize;

/// Wrapper around p256::ProjectivePoint so that we can define our own
/// serialization/deserialization for it
///
/// Note that this type derives [`Debug`]; if a [`P256`] is used in a
/// private type, `Debug` should be manually implemented with the field of this
/// type explicitly redacted!
#[derive(Eq, PartialEq, Debug, Clone, Copy, Zeroize)]
pub struct P256(pub p256::ProjectivePoint);

impl AsRef<P256> for P256 {
    fn as_ref(&self) -> &P256 {
        self
    }
}

impl P256 {
    pub(crate) const GENERATOR: Self = P256(p256::ProjectivePoint::GENERATOR);
    /// The identity point, used to initialize accumulators.
    pub const IDENTITY: Self = P256(p256::ProjectivePoint::IDENTITY);

    pub(crate) fn multiply_by_scalar(&self, scalar: &P256_Scalar) -> Self {
        Self(self.0 * scalar)
    }

    /// Serialize the `CurvePoint` as an affine-encoded secp256r1 byte array.
    pub(crate) fn to_bytes(self) -> Vec<u8> {
        let mut generic_array = AffinePoint::<p256::NistP256>::from(self.0).to_bytes();
        let bytes = generic_array.to_vec();
        generic_array.zeroize();
        bytes
    }

    fn decompress(bytes: &[u8]) -> Option<Self> {
        let mut fixed_len_bytes: [u8; 33] = bytes.try_into().ok()?;
        let point: Option<AffinePoint<p256::NistP256>> =
            AffinePoint::<p256::NistP256>::from_bytes(&fixed_len_bytes.into()).into();
        fixed_len_bytes.zeroize();
        // SEC1 also admits a 33-byte compact form (tag 0x05); only the
        // canonical compressed encoding names a point on the wire
        let point = Self(point?.into());
        (point.to_bytes() == bytes).then_some(point)
    }

    pub(crate) fn try_from_bytes(bytes: &[u8]) -> Result<Self> {
        match Self::decompress(bytes) {
            Some(point) => Ok(point),
            None => {
                error!("Failed to encode bytes as a curve point");
                Err(CallerError::InvalidEncoding)?
            }
        }
    }
}

impl std::ops::Add for P256 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl std::ops::Sub for P256 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl std::ops::Neg for P256 {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl From<p256::ProjectivePoint> for P256 {
    fn from(p: p256::ProjectivePoint) -> Self {
        Self(p)
    }
}

impl Serialize for P256 {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let afp = AffinePoint::<p256::NistP256>::from(self.0);
        afp.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for P256 {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let p = AffinePoint::<p256::NistP256>::deserialize(deserializer)?;
        Ok(Self(p.into()))
    }
}

impl CurveTrait for P256 {
    const GENERATOR: Self = P256::GENERATOR;
    const IDENTITY: Self = P256::IDENTITY;
    const COMPRESSED_LEN: usize = 33;
    type Scalar = P256_Scalar;

    fn multiply_by_scalar(&self, scalar: &Self::Scalar) -> Self {
        P256::multiply_by_scalar(self, scalar)
    }

    fn to_bytes(self) -> Vec<u8> {
        P256::to_bytes(self)
    }

    fn try_from_bytes(bytes: &[u8]) -> Result<Self> {
        P256::try_from_bytes(bytes)
    }

    fn decompress(bytes: &[u8]) -> Option<Self> {
        P256::decompress(bytes)
    }

    fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        P256(ProjectivePoint::random(rng))
    }
}

impl ScalarTrait for P256_Scalar {
    fn zero() -> Self {
        P256_Scalar::ZERO
    }

    fn one() -> Self {
        P256_Scalar::ONE
    }

    fn convert_from_u64(x: u64) -> Self {
        P256_Scalar::from(x)
    }

    fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        <P256_Scalar as Field>::random(rng)
    }

    fn from_digest(digest: &[u8; 32]) -> Self {
        <P256_Scalar as Reduce<U256>>::reduce_bytes(GenericArray::from_slice(digest))
    }

    fn to_bytes(&self) -> Vec<u8> {
        P256_Scalar::to_bytes(self).to_vec()
    }

    fn try_from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 32 {
            error!("Scalar encoding must be 32 bytes, got {}", bytes.len());
            Err(CallerError::InvalidEncoding)?
        }
        let repr = GenericArray::clone_from_slice(bytes);
        Option::from(<P256_Scalar as PrimeField>::from_repr(repr)).ok_or_else(|| {
            error!("Failed to decode a canonical p256::Scalar");
            CallerError::InvalidEncoding.into()
        })
    }
}

#[cfg(test)]
mod curve_point_tests {
    use crate::{
        curve::{CurveTrait, ScalarTrait},
        p256::P256,
        utils::testing::init_testing,
    };

    #[test]
    fn curve_point_byte_conversion_works() {
        let rng = &mut init_testing();
        let point = <P256 as CurveTrait>::random(rng);
        let bytes = point.to_bytes();
        let reconstructed = P256::try_from_bytes(&bytes).unwrap();
        assert_eq!(point, reconstructed);
    }

    #[test]
    fn only_compressed_encodings_decode() {
        let mut compact = P256::GENERATOR.to_bytes();
        compact[0] = 0x05;
        assert!(P256::try_from_bytes(&compact).is_err());
        assert!(P256::try_from_bytes(&[0x05; 33]).is_err());

        let identity = vec![0u8; 33];
        assert_eq!(P256::IDENTITY.to_bytes(), identity);
        assert_eq!(P256::try_from_bytes(&identity).unwrap(), P256::IDENTITY);
    }

    #[test]
    fn digest_reduction_is_deterministic() {
        let digest = [0xabu8; 32];
        let a = <p256::Scalar as ScalarTrait>::from_digest(&digest);
        let b = <p256::Scalar as ScalarTrait>::from_digest(&digest);
        assert_eq!(a, b);
        assert_ne!(a, <p256::Scalar as ScalarTrait>::zero());
    }
}

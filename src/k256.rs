//! K256 functions

use crate::{
    curve::{CurveTrait, ScalarTrait},
    errors::{CallerError, Result},
};
use generic_array::GenericArray;
use k256::{
    elliptic_curve::{
        group::GroupEncoding, ops::Reduce, AffinePoint, Field, Group, PrimeField,
    },
    ProjectivePoint, Scalar as K256_Scalar, U256,
};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::Debug;
use tracing::error;
use zeroize::Zeroize;

/// Wrapper around k256::ProjectivePoint so that we can define our own
/// serialization/deserialization for it
///
/// Note that this type derives [`Debug`]; if a [`K256`] is used in a
/// private type, `Debug` should be manually implemented with the field of this
/// type explicitly redacted!
#[derive(Eq, PartialEq, Debug, Clone, Copy, Zeroize)]
pub struct K256(pub k256::ProjectivePoint);

impl AsRef<K256> for K256 {
    fn as_ref(&self) -> &K256 {
        self
    }
}

impl K256 {
    pub(crate) const GENERATOR: Self = K256(k256::ProjectivePoint::GENERATOR);
    /// The identity point, used to initialize accumulators.
    pub const IDENTITY: Self = K256(k256::ProjectivePoint::IDENTITY);

    pub(crate) fn multiply_by_scalar(&self, scalar: &K256_Scalar) -> Self {
        Self(self.0 * scalar)
    }

    /// Serialize the `CurvePoint` as an affine-encoded secp256k1 byte array.
    pub(crate) fn to_bytes(self) -> Vec<u8> {
        let mut generic_array = AffinePoint::<k256::Secp256k1>::from(self.0).to_bytes();
        let bytes = generic_array.to_vec();
        generic_array.zeroize();
        bytes
    }

    fn decompress(bytes: &[u8]) -> Option<Self> {
        let mut fixed_len_bytes: [u8; 33] = bytes.try_into().ok()?;
        let point: Option<AffinePoint<k256::Secp256k1>> =
            AffinePoint::<k256::Secp256k1>::from_bytes(&fixed_len_bytes.into()).into();
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

impl std::ops::Add for K256 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl std::ops::Sub for K256 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl std::ops::Neg for K256 {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl From<k256::ProjectivePoint> for K256 {
    fn from(p: k256::ProjectivePoint) -> Self {
        Self(p)
    }
}

impl Serialize for K256 {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let afp = AffinePoint::<k256::Secp256k1>::from(self.0);
        afp.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for K256 {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let p = AffinePoint::<k256::Secp256k1>::deserialize(deserializer)?;
        Ok(Self(p.into()))
    }
}

impl CurveTrait for K256 {
    const GENERATOR: Self = K256::GENERATOR;
    const IDENTITY: Self = K256::IDENTITY;
    const COMPRESSED_LEN: usize = 33;
    type Scalar = K256_Scalar;

    fn multiply_by_scalar(&self, scalar: &Self::Scalar) -> Self {
        K256::multiply_by_scalar(self, scalar)
    }

    fn to_bytes(self) -> Vec<u8> {
        K256::to_bytes(self)
    }

    fn try_from_bytes(bytes: &[u8]) -> Result<Self> {
        K256::try_from_bytes(bytes)
    }

    fn decompress(bytes: &[u8]) -> Option<Self> {
        K256::decompress(bytes)
    }

    fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        K256(ProjectivePoint::random(rng))
    }
}

impl ScalarTrait for K256_Scalar {
    fn zero() -> Self {
        K256_Scalar::ZERO
    }

    fn one() -> Self {
        K256_Scalar::ONE
    }

    fn convert_from_u64(x: u64) -> Self {
        K256_Scalar::from(x)
    }

    fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        <K256_Scalar as Field>::random(rng)
    }

    fn from_digest(digest: &[u8; 32]) -> Self {
        <K256_Scalar as Reduce<U256>>::reduce_bytes(GenericArray::from_slice(digest))
    }

    fn to_bytes(&self) -> Vec<u8> {
        K256_Scalar::to_bytes(self).to_vec()
    }

    fn try_from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 32 {
            error!("Scalar encoding must be 32 bytes, got {}", bytes.len());
            Err(CallerError::InvalidEncoding)?
        }
        let repr = GenericArray::clone_from_slice(bytes);
        Option::from(<K256_Scalar as PrimeField>::from_repr(repr)).ok_or_else(|| {
            error!("Failed to decode a canonical k256::Scalar");
            CallerError::InvalidEncoding.into()
        })
    }
}

#[cfg(test)]
mod curve_point_tests {
    use crate::{
        curve::{CurveTrait, ScalarTrait},
        errors::{CallerError, InternalError},
        k256::K256,
        utils::testing::init_testing,
    };
    use k256::elliptic_curve::Group;

    #[test]
    fn curve_point_byte_conversion_works() {
        let rng = &mut init_testing();
        let point = K256(k256::ProjectivePoint::random(rng));
        let bytes = point.to_bytes();
        let reconstructed = K256::try_from_bytes(&bytes).unwrap();
        assert_eq!(point, reconstructed);
    }

    #[test]
    fn identity_round_trips_as_zero_bytes() {
        let bytes = K256::IDENTITY.to_bytes();
        assert_eq!(bytes, vec![0u8; 33]);
        assert_eq!(K256::try_from_bytes(&bytes).unwrap(), K256::IDENTITY);
    }

    #[test]
    fn malformed_points_are_rejected() {
        let short = [2u8; 12];
        assert_eq!(
            K256::try_from_bytes(&short).unwrap_err(),
            InternalError::CallingApplicationMistake(CallerError::InvalidEncoding)
        );
        let mut bad_prefix = K256::GENERATOR.to_bytes();
        bad_prefix[0] = 0x07;
        assert!(K256::try_from_bytes(&bad_prefix).is_err());
        // same x-coordinate under the SEC1 compact tag
        bad_prefix[0] = 0x05;
        assert!(K256::try_from_bytes(&bad_prefix).is_err());
    }

    #[test]
    fn scalar_byte_conversion_works() {
        let rng = &mut init_testing();
        let scalar = <k256::Scalar as ScalarTrait>::random(rng);
        let bytes = ScalarTrait::to_bytes(&scalar);
        assert_eq!(
            <k256::Scalar as ScalarTrait>::try_from_bytes(&bytes).unwrap(),
            scalar
        );
        // The group order itself is not a canonical encoding.
        let order = [0xffu8; 32];
        assert!(<k256::Scalar as ScalarTrait>::try_from_bytes(&order).is_err());
    }
}

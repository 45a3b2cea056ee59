use super::OnChainRecord;
use crate::{
    curve::CurveTrait,
    elgamal::Ciphertext,
    errors::{CallerError, InternalError, Result},
    utils::decode_hex,
};
use serde::{Deserialize, Serialize};
use tracing::error;

/// An auditor's encrypted audit values for one organization and one
/// counterparty.
///
/// `cipher_res`, `cipher_b` and `cipher_c` encrypt the points `res`, `B` and
/// `C`. `cipher_d` encrypts `D` plus the hash point of the auditor's epoch
/// pseudonym.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditorReport<C> {
    id: [u8; 32],
    cipher_res: Ciphertext<C>,
    cipher_b: Ciphertext<C>,
    cipher_c: Ciphertext<C>,
    cipher_d: Ciphertext<C>,
}

impl<C: CurveTrait> AuditorReport<C> {
    pub(crate) fn new(
        id: [u8; 32],
        cipher_res: Ciphertext<C>,
        cipher_b: Ciphertext<C>,
        cipher_c: Ciphertext<C>,
        cipher_d: Ciphertext<C>,
    ) -> Self {
        Self {
            id,
            cipher_res,
            cipher_b,
            cipher_c,
            cipher_d,
        }
    }

    /// Deterministic report identifier.
    pub fn id(&self) -> &[u8; 32] {
        &self.id
    }

    /// Encryption of `res`.
    pub fn cipher_res(&self) -> &Ciphertext<C> {
        &self.cipher_res
    }

    /// Encryption of `B`.
    pub fn cipher_b(&self) -> &Ciphertext<C> {
        &self.cipher_b
    }

    /// Encryption of `C`.
    pub fn cipher_c(&self) -> &Ciphertext<C> {
        &self.cipher_c
    }

    /// Encryption of `D` bound to the auditor pseudonym.
    pub fn cipher_d(&self) -> &Ciphertext<C> {
        &self.cipher_d
    }
}

/// On-chain form of an [`AuditorReport`]. Every field is hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudOnChain {
    /// Report id.
    pub id: String,
    /// Ciphertext of `res` as `c1 ‖ c2`.
    pub cipher_res: String,
    /// Ciphertext of `B`.
    pub cipher_b: String,
    /// Ciphertext of `C`.
    pub cipher_c: String,
    /// Ciphertext of `D`.
    pub cipher_d: String,
}

impl OnChainRecord for AudOnChain {
    /// Auditor reports are stored under their own id.
    fn key(&self, _json: &[u8]) -> String {
        self.id.clone()
    }
}

impl<C: CurveTrait> From<&AuditorReport<C>> for AudOnChain {
    fn from(report: &AuditorReport<C>) -> Self {
        Self {
            id: hex::encode(report.id),
            cipher_res: hex::encode(report.cipher_res.to_bytes()),
            cipher_b: hex::encode(report.cipher_b.to_bytes()),
            cipher_c: hex::encode(report.cipher_c.to_bytes()),
            cipher_d: hex::encode(report.cipher_d.to_bytes()),
        }
    }
}

impl<C: CurveTrait> TryFrom<&AudOnChain> for AuditorReport<C> {
    type Error = InternalError;

    fn try_from(record: &AudOnChain) -> Result<Self> {
        let id: [u8; 32] = decode_hex("id", &record.id)?.try_into().map_err(|_| {
            error!("Report id must be 32 bytes");
            CallerError::InvalidEncoding
        })?;
        let cipher = |field: &str, value: &str| -> Result<Ciphertext<C>> {
            Ciphertext::try_from_bytes(&decode_hex(field, value)?)
        };
        Ok(Self {
            id,
            cipher_res: cipher("cipher_res", &record.cipher_res)?,
            cipher_b: cipher("cipher_b", &record.cipher_b)?,
            cipher_c: cipher("cipher_c", &record.cipher_c)?,
            cipher_d: cipher("cipher_d", &record.cipher_d)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        curve::TestCurve, elgamal::KeyPair, group::GroupContext, utils::testing::init_testing,
    };

    fn random_report() -> AuditorReport<TestCurve> {
        let rng = &mut init_testing();
        let ctx = GroupContext::<TestCurve>::new().unwrap();
        let pk = KeyPair::generate(&ctx, rng).public_key();
        let mut encrypt = || {
            let message = TestCurve::random(rng);
            pk.encrypt_point(&ctx, rng, &message)
        };
        AuditorReport::new([9u8; 32], encrypt(), encrypt(), encrypt(), encrypt())
    }

    #[test]
    fn reports_round_trip_through_the_aud_chain() {
        let report = random_report();
        let record = AudOnChain::from(&report);
        assert_eq!(AuditorReport::try_from(&record).unwrap(), report);

        let (key, json) = record.key_value().unwrap();
        assert_eq!(key, hex::encode([9u8; 32]));
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
        for field in ["id", "cipher_res", "cipher_b", "cipher_c", "cipher_d"] {
            assert!(value.get(field).is_some(), "missing field {field}");
        }
    }

    #[test]
    fn truncated_ciphertexts_are_rejected() {
        let mut record = AudOnChain::from(&random_report());
        record.cipher_c.truncate(record.cipher_c.len() - 2);
        assert_eq!(
            AuditorReport::<TestCurve>::try_from(&record).unwrap_err(),
            InternalError::CallingApplicationMistake(CallerError::InvalidEncoding)
        );
    }
}

use super::{content_key, OnChainRecord};
use crate::{
    curve::CurveTrait,
    errors::{InternalError, Result},
    utils::decode_hex,
};
use serde::{Deserialize, Serialize};

/// An organization's periodic report for one counterparty:
/// `Σ commitments + SHA256(org pseudonym)·G`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrgSummary<C> {
    accumulator: C,
}

impl<C: CurveTrait> OrgSummary<C> {
    pub(crate) fn new(accumulator: C) -> Self {
        Self { accumulator }
    }

    /// The published accumulator point.
    pub fn accumulator(&self) -> C {
        self.accumulator
    }
}

/// On-chain form of an [`OrgSummary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgOnChain {
    /// Hex compressed accumulator point.
    pub accumulator: String,
}

impl OnChainRecord for OrgOnChain {
    fn key(&self, json: &[u8]) -> String {
        content_key(json)
    }
}

impl<C: CurveTrait> From<&OrgSummary<C>> for OrgOnChain {
    fn from(summary: &OrgSummary<C>) -> Self {
        Self {
            accumulator: hex::encode(summary.accumulator.to_bytes()),
        }
    }
}

impl<C: CurveTrait> TryFrom<&OrgOnChain> for OrgSummary<C> {
    type Error = InternalError;

    fn try_from(record: &OrgOnChain) -> Result<Self> {
        let bytes = decode_hex("accumulator", &record.accumulator)?;
        Ok(Self::new(C::try_from_bytes(&bytes)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{Secp256r1, TestCurve};

    #[test]
    fn summaries_round_trip_through_the_org_chain() {
        let summary = OrgSummary::new(TestCurve::GENERATOR + TestCurve::GENERATOR);
        let record = OrgOnChain::from(&summary);
        assert_eq!(record.accumulator.len(), 66);
        assert_eq!(OrgSummary::<TestCurve>::try_from(&record).unwrap(), summary);

        let (key, json) = record.key_value().unwrap();
        assert_eq!(key.len(), 64);
        assert_eq!(
            String::from_utf8(json).unwrap(),
            format!(r#"{{"accumulator":"{}"}}"#, record.accumulator)
        );
    }

    #[test]
    fn accumulator_must_be_a_point_of_the_curve() {
        let record = OrgOnChain {
            accumulator: "05".repeat(33),
        };
        assert!(OrgSummary::<Secp256r1>::try_from(&record).is_err());
        let record = OrgOnChain {
            accumulator: "not hex".into(),
        };
        assert!(OrgSummary::<TestCurve>::try_from(&record).is_err());
    }
}

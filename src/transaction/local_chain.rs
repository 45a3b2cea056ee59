// Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use super::{content_key, OnChainRecord};
use crate::{
    commitment::pedersen_commit,
    curve::CurveTrait,
    errors::{CallerError, Result},
    group::GroupContext,
    identity::{IdHash, OrgId},
    parallel::parallel_map,
    utils::decode_hex,
};
use rand::{CryptoRng, Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{error, instrument};

/// Decimal amounts are recorded in hundredths.
pub const AMOUNT_AMPLIFIER: i64 = 100;

/// A transaction as an organization sees it before hiding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainTransaction {
    counterparty: OrgId,
    amount: i64,
    timestamp: i64,
}

impl PlainTransaction {
    /// A transaction of `amount` (already in hundredths) with `counterparty`
    /// at `timestamp` nanoseconds.
    pub fn new(counterparty: OrgId, amount: i64, timestamp: i64) -> Self {
        Self {
            counterparty,
            amount,
            timestamp,
        }
    }

    /// A transaction of a decimal `amount`, scaled by [`AMOUNT_AMPLIFIER`]
    /// and truncated toward zero.
    pub fn from_decimal(counterparty: OrgId, amount: f64, timestamp: i64) -> Result<Self> {
        Ok(Self::new(counterparty, amplify(amount)?, timestamp))
    }

    /// The two sides of one transfer of `amount` from `from` to `to`.
    ///
    /// The first record belongs to `from` and names `to` as counterparty with
    /// `+amount`; the second belongs to `to` and names `from` with `-amount`.
    pub fn new_pair(from: &OrgId, to: &OrgId, amount: f64, timestamp: i64) -> Result<(Self, Self)> {
        let amount = amplify(amount)?;
        let Some(negated) = amount.checked_neg() else {
            error!("Amount {amount} has no opposite");
            return Err(CallerError::BadInput.into());
        };
        Ok((
            Self::new(to.clone(), amount, timestamp),
            Self::new(from.clone(), negated, timestamp),
        ))
    }

    /// The counterparty of this transaction.
    pub fn counterparty(&self) -> &OrgId {
        &self.counterparty
    }

    /// The signed amount in hundredths.
    pub fn amount(&self) -> i64 {
        self.amount
    }

    /// Timestamp in nanoseconds.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Commit to the amount. Returns the hidden record together with the
    /// commitment and its blinding scalar.
    pub fn hide<C: CurveTrait, R: RngCore + CryptoRng>(
        &self,
        ctx: &GroupContext<C>,
        rng: &mut R,
    ) -> (HiddenTransaction<C>, C, C::Scalar) {
        let (commitment, blinding) = pedersen_commit(ctx, rng, self.amount);
        let hidden = HiddenTransaction {
            counterparty: self.counterparty.hash(),
            commitment,
            timestamp: self.timestamp,
        };
        (hidden, commitment, blinding)
    }
}

fn amplify(amount: f64) -> Result<i64> {
    let scaled = (amount * AMOUNT_AMPLIFIER as f64).trunc();
    // the range is symmetric so both sides of a pair stay representable;
    // i64::MAX as f64 rounds up to 2^63, which is already out of range
    if !scaled.is_finite() || scaled >= i64::MAX as f64 || scaled <= i64::MIN as f64 {
        error!("Amount {amount} cannot be represented in hundredths");
        Err(CallerError::BadInput)?
    }
    Ok(scaled as i64)
}

/// A committed transaction as stored on an organization's local chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HiddenTransaction<C> {
    counterparty: IdHash,
    commitment: C,
    timestamp: i64,
}

impl<C: CurveTrait> HiddenTransaction<C> {
    /// Hash of the counterparty identity.
    pub fn counterparty(&self) -> IdHash {
        self.counterparty
    }

    /// Pedersen commitment to the amount.
    pub fn commitment(&self) -> C {
        self.commitment
    }

    /// Timestamp in nanoseconds.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// On-chain form of a [`HiddenTransaction`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalOnChain {
    /// Hex counterparty hash.
    pub counter_party: String,
    /// Hex compressed commitment point.
    pub commitment: String,
    /// Decimal nanosecond timestamp.
    pub timestamp: String,
}

impl OnChainRecord for LocalOnChain {
    fn key(&self, json: &[u8]) -> String {
        content_key(json)
    }
}

impl<C: CurveTrait> From<&HiddenTransaction<C>> for LocalOnChain {
    fn from(tx: &HiddenTransaction<C>) -> Self {
        Self {
            counter_party: tx.counterparty.to_string(),
            commitment: hex::encode(tx.commitment.to_bytes()),
            timestamp: tx.timestamp.to_string(),
        }
    }
}

impl<C: CurveTrait> TryFrom<&LocalOnChain> for HiddenTransaction<C> {
    type Error = crate::errors::InternalError;

    fn try_from(record: &LocalOnChain) -> Result<Self> {
        let counterparty: [u8; 32] = decode_hex("counter_party", &record.counter_party)?
            .try_into()
            .map_err(|_| {
                error!("Counterparty hash must be 32 bytes");
                CallerError::InvalidEncoding
            })?;
        let commitment = C::try_from_bytes(&decode_hex("commitment", &record.commitment)?)?;
        let timestamp = record.timestamp.parse::<i64>().map_err(|e| {
            error!("Invalid timestamp `{}`: {e}", record.timestamp);
            CallerError::InvalidEncoding
        })?;
        Ok(Self {
            counterparty: IdHash::from_bytes(counterparty),
            commitment,
            timestamp,
        })
    }
}

/// A hidden transaction together with the commitment opening kept by its
/// owner.
pub type HiddenWithOpening<C> = (HiddenTransaction<C>, C, <C as CurveTrait>::Scalar);

/// Hide `txs` on `workers` threads. Output `i` is the hiding of `txs[i]`.
#[instrument(skip_all, fields(len = txs.len()))]
pub fn hide_batch<C: CurveTrait>(
    ctx: &GroupContext<C>,
    txs: &[PlainTransaction],
    workers: usize,
) -> Result<Vec<HiddenWithOpening<C>>> {
    parallel_map(txs.len(), workers, |i| {
        Ok(txs[i].hide(ctx, &mut rand::thread_rng()))
    })
}

/// Generate `count` matched transfer pairs from `from` to `to` with random
/// amounts of up to `max_amount`, one nanosecond apart starting at
/// `start_timestamp`.
#[instrument(skip_all, fields(count = count))]
pub fn generate_pair_batch(
    from: &OrgId,
    to: &OrgId,
    count: usize,
    max_amount: f64,
    start_timestamp: i64,
    workers: usize,
) -> Result<Vec<(PlainTransaction, PlainTransaction)>> {
    if !(max_amount.is_finite() && max_amount > 0.0) {
        error!("Maximum amount must be positive, got {max_amount}");
        Err(CallerError::BadInput)?
    }
    let last_offset = i64::try_from(count.saturating_sub(1)).ok();
    if last_offset
        .and_then(|offset| start_timestamp.checked_add(offset))
        .is_none()
    {
        error!("{count} timestamps starting at {start_timestamp} overflow i64");
        Err(CallerError::BadInput)?
    }
    parallel_map(count, workers, |i| {
        let amount = rand::thread_rng().gen_range(0.0..max_amount);
        let timestamp = i64::try_from(i)
            .ok()
            .and_then(|offset| start_timestamp.checked_add(offset))
            .ok_or(CallerError::BadInput)?;
        PlainTransaction::new_pair(from, to, amount, timestamp)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        commitment::commit_with_blinding, curve::TestCurve, errors::InternalError,
        utils::testing::init_testing,
    };

    #[test]
    fn decimal_amounts_are_amplified() {
        let alice = OrgId::new("alice");
        let tx = PlainTransaction::from_decimal(alice.clone(), 12.25, 7).unwrap();
        assert_eq!(tx.amount(), 1225);
        assert_eq!(tx.counterparty(), &alice);
        assert!(PlainTransaction::from_decimal(alice.clone(), f64::NAN, 7).is_err());
        assert_eq!(
            PlainTransaction::from_decimal(alice, 1e300, 7).unwrap_err(),
            InternalError::CallingApplicationMistake(CallerError::BadInput)
        );
    }

    #[test]
    fn pair_sides_name_each_other_with_opposite_amounts() {
        let from = OrgId::new("from");
        let to = OrgId::new("to");
        let (sent, received) = PlainTransaction::new_pair(&from, &to, 5.5, 42).unwrap();
        assert_eq!(sent.counterparty(), &to);
        assert_eq!(received.counterparty(), &from);
        assert_eq!(sent.amount(), 550);
        assert_eq!(received.amount(), -550);
        assert_eq!(sent.timestamp(), received.timestamp());
    }

    #[test]
    fn amounts_without_an_opposite_are_rejected() {
        let from = OrgId::new("from");
        let to = OrgId::new("to");
        let bad_input = InternalError::CallingApplicationMistake(CallerError::BadInput);
        let lowest = i64::MIN as f64 / AMOUNT_AMPLIFIER as f64;
        assert_eq!(
            PlainTransaction::from_decimal(to.clone(), lowest, 0).unwrap_err(),
            bad_input
        );
        assert_eq!(
            PlainTransaction::new_pair(&from, &to, lowest, 0).unwrap_err(),
            bad_input
        );

        let (sent, received) = PlainTransaction::new_pair(&from, &to, -1e16, 0).unwrap();
        assert_eq!(sent.amount(), -received.amount());
    }

    #[test]
    fn hidden_transaction_survives_the_local_chain() {
        let rng = &mut init_testing();
        let ctx = GroupContext::<TestCurve>::new().unwrap();
        let plain = PlainTransaction::new(OrgId::new("bob"), -300, 1_700_000_000_000_000_000);
        let (hidden, commitment, blinding) = plain.hide(&ctx, rng);
        assert_eq!(commitment, commit_with_blinding(&ctx, -300, &blinding));

        let record = LocalOnChain::from(&hidden);
        assert_eq!(record.timestamp, "1700000000000000000");
        let parsed = HiddenTransaction::<TestCurve>::try_from(&record).unwrap();
        assert_eq!(parsed, hidden);

        let (key, json) = record.key_value().unwrap();
        assert_eq!(key, content_key(&json));
        let reread: LocalOnChain = serde_json::from_slice(&json).unwrap();
        assert_eq!(reread, record);
    }

    #[test]
    fn malformed_local_records_are_rejected() {
        let rng = &mut init_testing();
        let ctx = GroupContext::<TestCurve>::new().unwrap();
        let (hidden, _, _) = PlainTransaction::new(OrgId::new("bob"), 1, 1).hide(&ctx, rng);
        let good = LocalOnChain::from(&hidden);

        let mut short_hash = good.clone();
        short_hash.counter_party.truncate(62);
        let mut bad_point = good.clone();
        bad_point.commitment = "zz".into();
        let mut bad_time = good;
        bad_time.timestamp = "yesterday".into();

        for record in [short_hash, bad_point, bad_time] {
            assert_eq!(
                HiddenTransaction::<TestCurve>::try_from(&record).unwrap_err(),
                InternalError::CallingApplicationMistake(CallerError::InvalidEncoding)
            );
        }
    }

    #[test]
    fn batches_keep_input_order() {
        let ctx = GroupContext::<TestCurve>::new().unwrap();
        let from = OrgId::new("from");
        let to = OrgId::new("to");
        let pairs = generate_pair_batch(&from, &to, 50, 100.0, 1000, 4).unwrap();
        assert_eq!(pairs.len(), 50);
        for (i, (sent, received)) in pairs.iter().enumerate() {
            assert_eq!(sent.timestamp(), 1000 + i as i64);
            assert_eq!(sent.amount(), -received.amount());
        }

        let sent: Vec<_> = pairs.into_iter().map(|(sent, _)| sent).collect();
        let hidden = hide_batch(&ctx, &sent, 3).unwrap();
        for (plain, (tx, commitment, blinding)) in sent.iter().zip(&hidden) {
            assert_eq!(tx.timestamp(), plain.timestamp());
            assert_eq!(
                *commitment,
                commit_with_blinding(&ctx, plain.amount(), blinding)
            );
        }
        assert!(generate_pair_batch(&from, &to, 1, 0.0, 0, 1).is_err());
    }

    #[test]
    fn batch_timestamps_must_fit_in_i64() {
        let from = OrgId::new("from");
        let to = OrgId::new("to");
        let last = generate_pair_batch(&from, &to, 2, 10.0, i64::MAX - 1, 2).unwrap();
        assert_eq!(last[1].0.timestamp(), i64::MAX);
        assert_eq!(
            generate_pair_batch(&from, &to, 3, 10.0, i64::MAX - 1, 2).unwrap_err(),
            InternalError::CallingApplicationMistake(CallerError::BadInput)
        );
    }
}

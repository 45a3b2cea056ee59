// Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::{
    config::ProtocolConfig,
    curve::CurveTrait,
    errors::{CallerError, InternalError, Result},
    group::GroupContext,
    identity::{EpochPseudonym, IdHash, OrgId},
    transaction::{HiddenTransaction, OrgSummary, PlainTransaction},
};
use rand::{CryptoRng, RngCore};
use std::{
    collections::{HashMap, HashSet},
    fmt::Debug,
};
use tracing::{debug, error, info, instrument};
use zeroize::Zeroize;

/// An organization taking part in audit epochs.
pub struct Organization<C: CurveTrait> {
    id: OrgId,
    id_hash: IdHash,
    ctx: GroupContext<C>,
    max_num_tx_in_epoch: usize,
    epoch_id: Option<EpochPseudonym>,
    /// Running sum of commitments, keyed by counterparty hash.
    accumulators: HashMap<IdHash, C>,
    /// Blinding scalars of recorded transactions in slot order, keyed by
    /// counterparty hash.
    blinding_factors: HashMap<IdHash, Vec<C::Scalar>>,
    /// Counterparties whose accumulator is fed through [`Self::accumulate`];
    /// the caller holds their openings.
    external_openings: HashSet<IdHash>,
}

impl<C: CurveTrait> Debug for Organization<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Organization")
            .field("id", &self.id)
            .field("epoch_id", &self.epoch_id)
            .field("counterparties", &self.accumulators.len())
            .field("blinding_factors", &"[redacted]")
            .finish()
    }
}

impl<C: CurveTrait> Drop for Organization<C> {
    fn drop(&mut self) {
        self.clear_epoch();
    }
}

impl<C: CurveTrait> Organization<C> {
    /// Create an organization with no epoch state.
    ///
    /// Fails with [`CallerError::BadInput`] if `config` does not validate.
    pub fn new(ctx: GroupContext<C>, config: &ProtocolConfig, id: OrgId) -> Result<Self> {
        config.validate()?;
        let id_hash = id.hash();
        Ok(Self {
            id,
            id_hash,
            ctx,
            max_num_tx_in_epoch: config.max_num_tx_in_epoch,
            epoch_id: None,
            accumulators: HashMap::new(),
            blinding_factors: HashMap::new(),
            external_openings: HashSet::new(),
        })
    }

    /// The organization's identity.
    pub fn id(&self) -> &OrgId {
        &self.id
    }

    /// SHA-256 of the identity.
    pub fn id_hash(&self) -> IdHash {
        self.id_hash
    }

    /// The current epoch pseudonym, if the committee has set one.
    pub fn epoch_id(&self) -> Option<&EpochPseudonym> {
        self.epoch_id.as_ref()
    }

    /// Install the pseudonym of a new epoch. State accumulated under the
    /// previous pseudonym is discarded.
    pub fn set_epoch_id(&mut self, epoch_id: EpochPseudonym) {
        info!("Organization {} entering a new epoch.", self.id);
        self.clear_epoch();
        self.epoch_id = Some(epoch_id);
    }

    /// Forget all accumulators and blinding factors.
    pub fn clear_epoch(&mut self) {
        self.accumulators.clear();
        self.external_openings.clear();
        for (_, mut factors) in self.blinding_factors.drain() {
            factors.zeroize();
        }
    }

    /// Commit to a transaction without recording it.
    pub fn hide<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        tx: &PlainTransaction,
    ) -> (HiddenTransaction<C>, C, C::Scalar) {
        tx.hide(&self.ctx, rng)
    }

    /// Add `commitment` to the accumulator of `counterparty` without
    /// recording its blinding scalar or using up a transaction slot.
    ///
    /// The caller keeps the openings, e.g. from
    /// [`hide_batch`](crate::transaction::hide_batch). A counterparty is fed
    /// either this way or through [`Self::record_transaction`] within an
    /// epoch; mixing the two fails with [`CallerError::BadInput`], as
    /// [`Self::blinding_factors`] would no longer open the accumulator.
    pub fn accumulate(&mut self, counterparty: &OrgId, commitment: C) -> Result<()> {
        let counterparty = counterparty.hash();
        if self.blinding_factors.contains_key(&counterparty) {
            error!(
                "Organization {} already records transactions with {}",
                self.id, counterparty
            );
            Err(CallerError::BadInput)?
        }
        self.external_openings.insert(counterparty);
        self.accumulate_by_hash(counterparty, commitment);
        Ok(())
    }

    fn accumulate_by_hash(&mut self, counterparty: IdHash, commitment: C) {
        self.accumulators
            .entry(counterparty)
            .and_modify(|acc| *acc = *acc + commitment)
            .or_insert(commitment);
    }

    /// Hide `tx`, accumulate its commitment and keep its blinding scalar.
    ///
    /// Returns the record to submit to the local chain. Fails with
    /// [`CallerError::TooManyTransactions`] once the counterparty has used up
    /// its randomness slots for the epoch.
    #[instrument(skip_all, err(Debug))]
    pub fn record_transaction<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
        tx: &PlainTransaction,
    ) -> Result<HiddenTransaction<C>> {
        let counterparty = tx.counterparty().hash();
        if self.external_openings.contains(&counterparty) {
            error!(
                "Organization {} accumulates {} with external openings",
                self.id, counterparty
            );
            Err(CallerError::BadInput)?
        }
        let recorded = self
            .blinding_factors
            .get(&counterparty)
            .map_or(0, Vec::len);
        if recorded >= self.max_num_tx_in_epoch {
            error!(
                "Organization {} already recorded {} transactions with {}",
                self.id, recorded, counterparty
            );
            Err(CallerError::TooManyTransactions {
                count: recorded + 1,
                max: self.max_num_tx_in_epoch,
            })?
        }

        let (hidden, commitment, blinding) = self.hide(rng, tx);
        self.accumulate_by_hash(counterparty, commitment);
        self.blinding_factors
            .entry(counterparty)
            .or_default()
            .push(blinding);
        debug!("Recorded transaction slot {} with {}", recorded, counterparty);
        Ok(hidden)
    }

    /// Blinding scalars of the transactions recorded with `counterparty`, in
    /// the order they were recorded.
    pub fn blinding_factors(&self, counterparty: &OrgId) -> &[C::Scalar] {
        self.blinding_factors
            .get(&counterparty.hash())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The org-chain summary for `counterparty`: its accumulator plus the
    /// hash point of the epoch pseudonym.
    #[instrument(skip_all, err(Debug))]
    pub fn compose_org_summary(&self, counterparty: &OrgId) -> Result<OrgSummary<C>> {
        let Some(epoch_id) = &self.epoch_id else {
            error!("Organization {} has no epoch pseudonym", self.id);
            return Err(InternalError::PseudonymNotFound(self.id.to_string()));
        };
        let Some(accumulator) = self.accumulators.get(&counterparty.hash()) else {
            error!("No transactions from {} to {}", self.id, counterparty);
            return Err(InternalError::NoTransactions(counterparty.to_string()));
        };
        Ok(OrgSummary::new(*accumulator + epoch_id.hash_point(&self.ctx)))
    }
}

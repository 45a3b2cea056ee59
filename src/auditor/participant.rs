// Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use super::PairRandomness;
use crate::{
    config::ProtocolConfig,
    curve::{CurveTrait, ScalarTrait},
    elgamal::{PublicKey, SecretKey},
    errors::{CallerError, InternalError, Result},
    group::GroupContext,
    identity::{pair_key, AuditorId, EpochPseudonym, IdHash, OrgId, PairKey},
    transaction::{AuditorReport, HiddenTransaction, OrgSummary},
    utils::sha256,
};
use rand::{CryptoRng, RngCore};
use std::{collections::HashMap, fmt::Debug};
use tracing::{debug, error, info, instrument};

/// The values an auditor computes for one organization and counterparty.
///
/// `res` and `b` are kept by the auditor to cross-check the report of the
/// counterparty's auditor later on.
#[derive(Debug, Clone, Copy)]
pub struct Examination<C> {
    /// The encrypted report to publish on the aud chain.
    pub report: AuditorReport<C>,
    /// `Σ r_k · c_k` over the organization's hidden transactions.
    pub res: C,
    /// `(−Σ blinding_k · r_k)·H`.
    pub b: C,
}

/// An auditor, responsible for a fixed set of organizations.
///
/// Each epoch the [`Committee`](crate::committee::Committee) delegates to it
/// the pair randomness touching its organizations, their secret keys, their
/// epoch pseudonyms and a pseudonym of its own.
pub struct Auditor<C: CurveTrait> {
    id: AuditorId,
    ctx: GroupContext<C>,
    max_num_tx_in_epoch: usize,
    audited_org_ids: Vec<OrgId>,
    epoch_tx_randomness: HashMap<PairKey, PairRandomness<C>>,
    epoch_secret_keys: HashMap<IdHash, SecretKey<C>>,
    epoch_id: Option<EpochPseudonym>,
    epoch_org_ids: HashMap<OrgId, EpochPseudonym>,
}

impl<C: CurveTrait> Debug for Auditor<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auditor")
            .field("id", &self.id)
            .field("audited_org_ids", &self.audited_org_ids)
            .field("epoch_tx_randomness", &"[redacted]")
            .field("epoch_secret_keys", &"[redacted]")
            .field("epoch_id", &self.epoch_id)
            .finish()
    }
}

impl<C: CurveTrait> Auditor<C> {
    /// Create an auditor of `audited_org_ids` with no epoch state.
    ///
    /// Fails with [`CallerError::BadInput`] if `config` does not validate.
    pub fn new(
        ctx: GroupContext<C>,
        config: &ProtocolConfig,
        id: AuditorId,
        audited_org_ids: &[OrgId],
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            id,
            ctx,
            max_num_tx_in_epoch: config.max_num_tx_in_epoch,
            audited_org_ids: audited_org_ids.to_vec(),
            epoch_tx_randomness: HashMap::new(),
            epoch_secret_keys: HashMap::new(),
            epoch_id: None,
            epoch_org_ids: HashMap::new(),
        })
    }

    /// The auditor's identity.
    pub fn id(&self) -> &AuditorId {
        &self.id
    }

    /// The organizations this auditor is responsible for.
    pub fn audited_org_ids(&self) -> &[OrgId] {
        &self.audited_org_ids
    }

    /// The auditor's own epoch pseudonym.
    pub fn epoch_id(&self) -> Option<&EpochPseudonym> {
        self.epoch_id.as_ref()
    }

    /// Install the pair randomness delegated for this epoch.
    pub fn set_epoch_tx_randomness(&mut self, randomness: HashMap<PairKey, PairRandomness<C>>) {
        self.epoch_tx_randomness = randomness;
    }

    /// Install the secret keys of the audited organizations.
    pub fn set_epoch_secret_keys(&mut self, keys: HashMap<IdHash, SecretKey<C>>) {
        self.epoch_secret_keys = keys;
    }

    /// Install this auditor's epoch pseudonym.
    pub fn set_epoch_id(&mut self, epoch_id: EpochPseudonym) {
        info!("Auditor {} entering a new epoch.", self.id);
        self.epoch_id = Some(epoch_id);
    }

    /// Install the epoch pseudonyms of the audited organizations.
    pub fn set_epoch_org_id_map(&mut self, epoch_org_ids: HashMap<OrgId, EpochPseudonym>) {
        self.epoch_org_ids = epoch_org_ids;
    }

    /// The pair randomness shared by `org1` and `org2`, in either order.
    pub fn epoch_tx_randomness(&self, org1: &OrgId, org2: &OrgId) -> Option<&PairRandomness<C>> {
        self.epoch_tx_randomness
            .get(&pair_key(org1.hash(), org2.hash()))
    }

    fn randomness_for(&self, org: IdHash, counterparty: IdHash) -> Result<&PairRandomness<C>> {
        self.epoch_tx_randomness
            .get(&pair_key(org, counterparty))
            .ok_or_else(|| {
                error!("No epoch randomness for pair ({org}, {counterparty})");
                InternalError::RandomnessNotFound(org.to_string(), counterparty.to_string())
            })
    }

    fn org_epoch_id(&self, org_id: &OrgId) -> Result<&EpochPseudonym> {
        self.epoch_org_ids.get(org_id).ok_or_else(|| {
            error!("No epoch pseudonym delegated for organization {org_id}");
            InternalError::PseudonymNotFound(org_id.to_string())
        })
    }

    /// `res = Σ r_k · c_k`, the hidden transactions of `org_id` with a single
    /// counterparty scaled by the pair randomness slot by slot.
    #[instrument(skip_all, err(Debug))]
    pub fn accumulate_commitments(
        &self,
        org_id: &OrgId,
        txs: &[HiddenTransaction<C>],
    ) -> Result<C> {
        let Some(first) = txs.first() else {
            error!("Cannot accumulate an empty transaction list");
            return Err(CallerError::EmptyList.into());
        };
        if txs.len() > self.max_num_tx_in_epoch {
            error!(
                "Too many transactions in the epoch: {} (at most {})",
                txs.len(),
                self.max_num_tx_in_epoch
            );
            Err(CallerError::TooManyTransactions {
                count: txs.len(),
                max: self.max_num_tx_in_epoch,
            })?
        }
        let counterparty = first.counterparty();
        if txs.iter().any(|tx| tx.counterparty() != counterparty) {
            error!("Hidden transactions name more than one counterparty");
            Err(CallerError::BadInput)?
        }

        let slots = self
            .randomness_for(org_id.hash(), counterparty)?
            .slots(txs.len())?;
        debug!("Accumulating {} commitments with {}", txs.len(), counterparty);
        Ok(txs
            .iter()
            .zip(slots)
            .fold(C::IDENTITY, |acc, (tx, r)| {
                acc + tx.commitment().multiply_by_scalar(r)
            }))
    }

    /// `A = summary − SHA256(org pseudonym)·G`, the plain sum of the
    /// organization's commitments.
    pub fn compute_a(&self, org_epoch_id: &EpochPseudonym, summary: &OrgSummary<C>) -> C {
        summary.accumulator() - org_epoch_id.hash_point(&self.ctx)
    }

    /// `B = (−Σ org_rand[i] · shared_rand[i])·H`.
    pub fn compute_b(&self, org_rand: &[C::Scalar], shared_rand: &[C::Scalar]) -> Result<C> {
        if org_rand.len() != shared_rand.len() {
            error!(
                "Blinding factors and pair randomness differ in length: {} != {}",
                org_rand.len(),
                shared_rand.len()
            );
            Err(CallerError::LengthMismatch {
                left: org_rand.len(),
                right: shared_rand.len(),
            })?
        }
        let scalar = org_rand
            .iter()
            .zip(shared_rand)
            .fold(C::Scalar::zero(), |acc, (o, s)| acc - *o * *s);
        Ok(self.ctx.h().multiply_by_scalar(&scalar))
    }

    /// `C = A − res`.
    pub fn compute_c(&self, res: C, a: C) -> C {
        a - res
    }

    /// `D = −(A + B)`.
    pub fn compute_d(&self, a: C, b: C) -> C {
        -(a + b)
    }

    /// The report id for `org_id` and `counterparty`:
    /// `SHA256(org pseudonym ‖ Σ pair randomness)`.
    pub fn compute_ce_transaction_id(
        &self,
        org_id: &OrgId,
        counterparty: IdHash,
    ) -> Result<[u8; 32]> {
        let randomness = self.randomness_for(org_id.hash(), counterparty)?;
        let epoch_id = self.org_epoch_id(org_id)?;
        let summed = randomness.sum().to_bytes();
        Ok(sha256(&[epoch_id.as_bytes(), summed.as_slice()]))
    }

    /// Encrypt `res`, `B` and `C` as they are, and `D` shifted by the hash
    /// point of this auditor's pseudonym, under the organization's key.
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip_all, err(Debug))]
    pub fn encrypt_consistency_exam_result<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        org_id: &OrgId,
        counterparty: IdHash,
        res: C,
        b: C,
        c: C,
        d: C,
        public_key: &PublicKey<C>,
    ) -> Result<AuditorReport<C>> {
        let id = self.compute_ce_transaction_id(org_id, counterparty)?;
        let Some(epoch_id) = &self.epoch_id else {
            error!("Auditor {} has no epoch pseudonym", self.id);
            return Err(InternalError::PseudonymNotFound(self.id.to_string()));
        };
        let bound_d = epoch_id.hash_point(&self.ctx) + d;
        Ok(AuditorReport::new(
            id,
            public_key.encrypt_point(&self.ctx, rng, &res),
            public_key.encrypt_point(&self.ctx, rng, &b),
            public_key.encrypt_point(&self.ctx, rng, &c),
            public_key.encrypt_point(&self.ctx, rng, &bound_d),
        ))
    }

    /// Audit `org_id`'s dealings with `counterparty_id`: accumulate the
    /// hidden transactions, derive `A`, `B`, `C` and `D` and encrypt them for
    /// the organization.
    ///
    /// `org_rand` holds the organization's blinding factors for the same
    /// transactions, in the same order as `txs`.
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip_all, err(Debug))]
    pub fn consistency_examination<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        org_id: &OrgId,
        counterparty_id: &OrgId,
        summary: &OrgSummary<C>,
        txs: &[HiddenTransaction<C>],
        org_rand: &[C::Scalar],
        public_keys: &HashMap<IdHash, PublicKey<C>>,
    ) -> Result<Examination<C>> {
        info!("Auditor {} examining {} against {}", self.id, org_id, counterparty_id);
        let counterparty = counterparty_id.hash();
        if txs.iter().any(|tx| tx.counterparty() != counterparty) {
            error!("Hidden transactions do not all name {}", counterparty_id);
            Err(CallerError::BadInput)?
        }

        let res = self.accumulate_commitments(org_id, txs)?;
        let a = self.compute_a(self.org_epoch_id(org_id)?, summary);
        let shared_rand = self
            .randomness_for(org_id.hash(), counterparty)?
            .slots(txs.len())?;
        let b = self.compute_b(org_rand, shared_rand)?;
        let c = self.compute_c(res, a);
        let d = self.compute_d(a, b);

        let org_hash = org_id.hash();
        let public_key = public_keys.get(&org_hash).ok_or_else(|| {
            error!("No public key for organization {org_hash}");
            InternalError::KeyNotFound(org_hash.to_string())
        })?;
        let report =
            self.encrypt_consistency_exam_result(rng, org_id, counterparty, res, b, c, d, public_key)?;
        Ok(Examination { report, res, b })
    }

    /// Decrypt `res` and `B` from a report about the organization hashing to
    /// `org_hash`.
    pub fn decrypt_res_and_b(&self, org_hash: IdHash, report: &AuditorReport<C>) -> Result<(C, C)> {
        let secret_key = self.epoch_secret_keys.get(&org_hash).ok_or_else(|| {
            error!("No secret key delegated for organization {org_hash}");
            InternalError::KeyNotFound(org_hash.to_string())
        })?;
        Ok((
            secret_key.decrypt_point(report.cipher_res()),
            secret_key.decrypt_point(report.cipher_b()),
        ))
    }

    /// True iff `res + B + res2 + B2` is the identity.
    ///
    /// For the two sides of a matched set of transactions the blinding terms
    /// cancel inside each `res + B`, and the amount terms cancel across the
    /// two sides.
    pub fn check_result_consistency(&self, res: C, b: C, res2: C, b2: C) -> bool {
        (res + b + res2 + b2).is_identity()
    }

    /// Decrypt the counterpart's report about `counterpart_id` and check it
    /// against this auditor's own `res` and `B`.
    #[instrument(skip_all, err(Debug))]
    pub fn examine_counterpart_report(
        &self,
        counterpart_id: &OrgId,
        report: &AuditorReport<C>,
        res: C,
        b: C,
    ) -> Result<bool> {
        let (res2, b2) = self.decrypt_res_and_b(counterpart_id.hash(), report)?;
        Ok(self.check_result_consistency(res, b, res2, b2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        curve::TestCurve, elgamal::KeyPair, transaction::PlainTransaction,
        utils::testing::init_testing,
    };
    use rand::rngs::StdRng;

    struct Fixture {
        ctx: GroupContext<TestCurve>,
        auditor: Auditor<TestCurve>,
        alice: OrgId,
        bob: OrgId,
    }

    fn fixture(rng: &mut StdRng, max: usize) -> Fixture {
        let ctx = GroupContext::<TestCurve>::new().unwrap();
        let config = ProtocolConfig {
            max_num_tx_in_epoch: max,
            ..Default::default()
        };
        let alice = OrgId::new("alice");
        let bob = OrgId::new("bob");
        let mut auditor =
            Auditor::new(ctx, &config, AuditorId::new("aud"), &[alice.clone()]).unwrap();
        auditor.set_epoch_tx_randomness(HashMap::from([(
            pair_key(alice.hash(), bob.hash()),
            PairRandomness::generate(rng, max),
        )]));
        auditor.set_epoch_id(EpochPseudonym::random(rng, 32));
        auditor.set_epoch_org_id_map(HashMap::from([(
            alice.clone(),
            EpochPseudonym::random(rng, 32),
        )]));
        Fixture {
            ctx,
            auditor,
            alice,
            bob,
        }
    }

    fn hidden(
        rng: &mut StdRng,
        ctx: &GroupContext<TestCurve>,
        counterparty: &OrgId,
        count: usize,
    ) -> Vec<HiddenTransaction<TestCurve>> {
        (0..count)
            .map(|i| {
                PlainTransaction::new(counterparty.clone(), i as i64, i as i64)
                    .hide(ctx, rng)
                    .0
            })
            .collect()
    }

    #[test]
    fn accumulation_enforces_list_bounds() {
        let rng = &mut init_testing();
        let f = fixture(rng, 16);
        let max = hidden(rng, &f.ctx, &f.bob, 16);
        assert!(f.auditor.accumulate_commitments(&f.alice, &max).is_ok());

        let too_many = hidden(rng, &f.ctx, &f.bob, 17);
        assert_eq!(
            f.auditor.accumulate_commitments(&f.alice, &too_many).unwrap_err(),
            InternalError::CallingApplicationMistake(CallerError::TooManyTransactions {
                count: 17,
                max: 16
            })
        );
        assert_eq!(
            f.auditor.accumulate_commitments(&f.alice, &[]).unwrap_err(),
            InternalError::CallingApplicationMistake(CallerError::EmptyList)
        );
    }

    #[test]
    fn accumulation_rejects_mixed_or_unknown_counterparties() {
        let rng = &mut init_testing();
        let f = fixture(rng, 16);
        let mut txs = hidden(rng, &f.ctx, &f.bob, 2);
        txs.extend(hidden(rng, &f.ctx, &OrgId::new("carol"), 1));
        assert_eq!(
            f.auditor.accumulate_commitments(&f.alice, &txs).unwrap_err(),
            InternalError::CallingApplicationMistake(CallerError::BadInput)
        );

        let carol_only = hidden(rng, &f.ctx, &OrgId::new("carol"), 1);
        assert!(matches!(
            f.auditor.accumulate_commitments(&f.alice, &carol_only),
            Err(InternalError::RandomnessNotFound(_, _))
        ));
    }

    #[test]
    fn accumulation_scales_each_slot() {
        let rng = &mut init_testing();
        let f = fixture(rng, 4);
        let txs = hidden(rng, &f.ctx, &f.bob, 3);
        let slots = f
            .auditor
            .epoch_tx_randomness(&f.bob, &f.alice)
            .unwrap()
            .slots(3)
            .unwrap();
        let expected = txs[0].commitment().multiply_by_scalar(&slots[0])
            + txs[1].commitment().multiply_by_scalar(&slots[1])
            + txs[2].commitment().multiply_by_scalar(&slots[2]);
        assert_eq!(
            f.auditor.accumulate_commitments(&f.alice, &txs).unwrap(),
            expected
        );
    }

    #[test]
    fn audit_value_formulas() {
        let rng = &mut init_testing();
        let f = fixture(rng, 4);
        let res = TestCurve::random(rng);
        let a = TestCurve::random(rng);
        let b = TestCurve::random(rng);
        assert_eq!(f.auditor.compute_c(res, a) + res, a);
        assert!((f.auditor.compute_d(a, b) + a + b).is_identity());

        let one = <TestCurve as CurveTrait>::Scalar::one();
        let two = <TestCurve as CurveTrait>::Scalar::convert_from_u64(2);
        let three = <TestCurve as CurveTrait>::Scalar::convert_from_u64(3);
        // −(1·2 + 3·1) = −5
        let b = f.auditor.compute_b(&[one, three], &[two, one]).unwrap();
        let five = <TestCurve as CurveTrait>::Scalar::convert_from_u64(5);
        assert_eq!(b, -f.ctx.h().multiply_by_scalar(&five));
        assert_eq!(
            f.auditor.compute_b(&[one], &[one, two]).unwrap_err(),
            InternalError::CallingApplicationMistake(CallerError::LengthMismatch {
                left: 1,
                right: 2
            })
        );
    }

    #[test]
    fn report_id_is_deterministic_per_pair() {
        let rng = &mut init_testing();
        let f = fixture(rng, 4);
        let first = f
            .auditor
            .compute_ce_transaction_id(&f.alice, f.bob.hash())
            .unwrap();
        let second = f
            .auditor
            .compute_ce_transaction_id(&f.alice, f.bob.hash())
            .unwrap();
        assert_eq!(first, second);
        assert!(matches!(
            f.auditor.compute_ce_transaction_id(&f.bob, f.alice.hash()),
            Err(InternalError::PseudonymNotFound(_))
        ));
    }

    #[test]
    fn encrypted_d_carries_the_auditor_pseudonym() {
        let rng = &mut init_testing();
        let mut f = fixture(rng, 4);
        let keys = KeyPair::generate(&f.ctx, rng);
        f.auditor.set_epoch_secret_keys(HashMap::from([(
            f.alice.hash(),
            keys.secret_key().clone(),
        )]));
        let [res, b, c, d] = [(); 4].map(|_| TestCurve::random(rng));
        let report = f
            .auditor
            .encrypt_consistency_exam_result(
                rng,
                &f.alice,
                f.bob.hash(),
                res,
                b,
                c,
                d,
                &keys.public_key(),
            )
            .unwrap();
        let sk = keys.secret_key();
        assert_eq!(sk.decrypt_point(report.cipher_c()), c);
        let pseudonym_point = f.auditor.epoch_id().unwrap().hash_point(&f.ctx);
        assert_eq!(sk.decrypt_point(report.cipher_d()), pseudonym_point + d);
        assert_eq!(
            f.auditor.decrypt_res_and_b(f.alice.hash(), &report).unwrap(),
            (res, b)
        );
        assert!(matches!(
            f.auditor.decrypt_res_and_b(f.bob.hash(), &report),
            Err(InternalError::KeyNotFound(_))
        ));
    }

    #[test]
    fn result_consistency_is_a_sum_to_identity() {
        let rng = &mut init_testing();
        let f = fixture(rng, 4);
        let res = TestCurve::random(rng);
        let b = TestCurve::random(rng);
        let res2 = TestCurve::random(rng);
        assert!(f.auditor.check_result_consistency(res, b, res2, -(res + b + res2)));
        assert!(!f.auditor.check_result_consistency(res, b, res2, res2));
    }
}

// Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::{
    auditor::{Auditor, PairRandomness},
    config::ProtocolConfig,
    curve::CurveTrait,
    elgamal::{KeyPair, PublicKey, SecretKey},
    errors::{CallerError, InternalError, Result},
    group::GroupContext,
    identity::{pair_key, AuditorId, EpochPseudonym, IdHash, OrgId, PairKey},
    organization::Organization,
};
use rand::{CryptoRng, RngCore};
use std::{
    collections::{BTreeMap, HashMap},
    fmt::Debug,
};
use tracing::{debug, error, info, instrument};

/// The committee coordinating audit epochs for a fixed set of auditors and
/// the organizations they audit.
///
/// # 🔒 Storage requirements
/// The committee retains every secret of the current epoch (pair randomness,
/// secret keys, pseudonyms) and must be stored securely.
pub struct Committee<C: CurveTrait> {
    id: String,
    pub(super) ctx: GroupContext<C>,
    config: ProtocolConfig,
    managed_entities: BTreeMap<AuditorId, Vec<OrgId>>,
    managed_auditor_ids: Vec<AuditorId>,
    managed_org_ids: Vec<OrgId>,
    epoch_tx_randomness: HashMap<PairKey, PairRandomness<C>>,
    pub(super) epoch_secret_keys: HashMap<IdHash, SecretKey<C>>,
    epoch_public_keys: HashMap<IdHash, PublicKey<C>>,
    pub(super) epoch_org_ids: HashMap<OrgId, EpochPseudonym>,
    pub(super) epoch_auditor_ids: HashMap<AuditorId, EpochPseudonym>,
}

impl<C: CurveTrait> Debug for Committee<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Committee")
            .field("id", &self.id)
            .field("managed_entities", &self.managed_entities)
            .field("epoch_secrets", &"[redacted]")
            .finish()
    }
}

impl<C: CurveTrait> Committee<C> {
    /// Create a committee managing `auditors` and every organization they
    /// audit.
    ///
    /// Fails with [`CallerError::BadInput`] if `config` does not validate.
    pub fn new(
        ctx: GroupContext<C>,
        config: ProtocolConfig,
        id: impl Into<String>,
        auditors: &[Auditor<C>],
    ) -> Result<Self> {
        config.validate()?;
        let mut managed_entities = BTreeMap::new();
        let mut managed_auditor_ids = Vec::with_capacity(auditors.len());
        let mut managed_org_ids: Vec<OrgId> = Vec::new();
        for auditor in auditors {
            managed_entities.insert(auditor.id().clone(), auditor.audited_org_ids().to_vec());
            managed_auditor_ids.push(auditor.id().clone());
            for org_id in auditor.audited_org_ids() {
                if !managed_org_ids.contains(org_id) {
                    managed_org_ids.push(org_id.clone());
                }
            }
        }
        Ok(Self {
            id: id.into(),
            ctx,
            config,
            managed_entities,
            managed_auditor_ids,
            managed_org_ids,
            epoch_tx_randomness: HashMap::new(),
            epoch_secret_keys: HashMap::new(),
            epoch_public_keys: HashMap::new(),
            epoch_org_ids: HashMap::new(),
            epoch_auditor_ids: HashMap::new(),
        })
    }

    /// The committee's identity.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The protocol parameters of this deployment.
    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Every organization audited by a managed auditor.
    pub fn managed_org_ids(&self) -> &[OrgId] {
        &self.managed_org_ids
    }

    /// Every managed auditor.
    pub fn managed_auditor_ids(&self) -> &[AuditorId] {
        &self.managed_auditor_ids
    }

    fn reinitialize_epoch_state(&mut self) {
        self.epoch_tx_randomness.clear();
        self.epoch_secret_keys.clear();
        self.epoch_public_keys.clear();
        self.epoch_org_ids.clear();
        self.epoch_auditor_ids.clear();
    }

    /// Start a new epoch.
    ///
    /// Discards every secret of the previous epoch, draws fresh pair
    /// randomness, pseudonyms and key pairs, and pushes each participant its
    /// share. Returns the published public keys, keyed by organization hash.
    #[instrument(skip_all, err(Debug))]
    pub fn initialize_epoch<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
        auditors: &mut [Auditor<C>],
        organizations: &mut [Organization<C>],
    ) -> Result<HashMap<IdHash, PublicKey<C>>> {
        info!(
            "Committee {} initializing an epoch for {} auditors and {} organizations.",
            self.id,
            self.managed_auditor_ids.len(),
            self.managed_org_ids.len()
        );
        self.reinitialize_epoch_state();
        self.generate_epoch_tx_randomness(rng);
        self.generate_epoch_pseudonyms(rng);
        self.generate_epoch_key_pairs(rng);

        for auditor in auditors.iter_mut() {
            self.forward_epoch_auditor_parameters(auditor)?;
        }
        for organization in organizations.iter_mut() {
            self.forward_epoch_org_parameters(organization)?;
        }
        Ok(self.publish_public_keys())
    }

    /// Draw `max_num_tx_in_epoch` scalars for every unordered pair of managed
    /// organizations. Each pair is drawn once.
    fn generate_epoch_tx_randomness<R: RngCore + CryptoRng>(&mut self, rng: &mut R) {
        for (i, org1) in self.managed_org_ids.iter().enumerate() {
            for org2 in &self.managed_org_ids[i + 1..] {
                let key = pair_key(org1.hash(), org2.hash());
                if self.epoch_tx_randomness.contains_key(&key) {
                    continue;
                }
                debug!("Drawing pair randomness for {key}");
                self.epoch_tx_randomness.insert(
                    key,
                    PairRandomness::generate(rng, self.config.max_num_tx_in_epoch),
                );
            }
        }
    }

    fn generate_epoch_pseudonyms<R: RngCore + CryptoRng>(&mut self, rng: &mut R) {
        let len = self.config.pseudonym_len;
        for org_id in &self.managed_org_ids {
            self.epoch_org_ids
                .insert(org_id.clone(), EpochPseudonym::random(rng, len));
        }
        for auditor_id in &self.managed_auditor_ids {
            self.epoch_auditor_ids
                .insert(auditor_id.clone(), EpochPseudonym::random(rng, len));
        }
    }

    fn generate_epoch_key_pairs<R: RngCore + CryptoRng>(&mut self, rng: &mut R) {
        for org_id in &self.managed_org_ids {
            let key_pair = KeyPair::generate(&self.ctx, rng);
            let id_hash = org_id.hash();
            self.epoch_public_keys.insert(id_hash, key_pair.public_key());
            self.epoch_secret_keys
                .insert(id_hash, key_pair.secret_key().clone());
        }
    }

    /// The public keys of the current epoch, keyed by organization hash.
    pub fn publish_public_keys(&self) -> HashMap<IdHash, PublicKey<C>> {
        self.epoch_public_keys.clone()
    }

    /// Hand `auditor` its delegation for the current epoch: the randomness
    /// of every pair between an audited organization and any other managed
    /// organization, the audited organizations' secret keys and pseudonyms,
    /// and its own pseudonym.
    #[instrument(skip_all, err(Debug))]
    pub fn forward_epoch_auditor_parameters(&self, auditor: &mut Auditor<C>) -> Result<()> {
        let Some(audited_org_ids) = self.managed_entities.get(auditor.id()) else {
            error!("Auditor {} is not managed by committee {}", auditor.id(), self.id);
            return Err(CallerError::UnknownAuditor(auditor.id().to_string()).into());
        };

        let mut randomness = HashMap::new();
        for audited in audited_org_ids {
            let audited_hash = audited.hash();
            for managed in &self.managed_org_ids {
                let managed_hash = managed.hash();
                if audited_hash == managed_hash {
                    continue;
                }
                let key = pair_key(audited_hash, managed_hash);
                let pair = self.epoch_tx_randomness.get(&key).ok_or_else(|| {
                    error!("No epoch randomness for pair {key}");
                    InternalError::RandomnessNotFound(
                        key.low().to_string(),
                        key.high().to_string(),
                    )
                })?;
                randomness.insert(key, pair.clone());
            }
        }

        let mut secret_keys = HashMap::new();
        let mut org_epoch_ids = HashMap::new();
        for audited in audited_org_ids {
            let audited_hash = audited.hash();
            let secret_key = self.epoch_secret_keys.get(&audited_hash).ok_or_else(|| {
                error!("No epoch secret key for organization {audited}");
                InternalError::KeyNotFound(audited_hash.to_string())
            })?;
            secret_keys.insert(audited_hash, secret_key.clone());
            org_epoch_ids.insert(audited.clone(), self.org_epoch_id(audited)?.clone());
        }

        let auditor_epoch_id = self.auditor_epoch_id(auditor.id())?.clone();
        debug!(
            "Forwarding {} pair randomness entries to auditor {}",
            randomness.len(),
            auditor.id()
        );
        auditor.set_epoch_tx_randomness(randomness);
        auditor.set_epoch_secret_keys(secret_keys);
        auditor.set_epoch_id(auditor_epoch_id);
        auditor.set_epoch_org_id_map(org_epoch_ids);
        Ok(())
    }

    /// Hand `organization` its pseudonym for the current epoch.
    #[instrument(skip_all, err(Debug))]
    pub fn forward_epoch_org_parameters(&self, organization: &mut Organization<C>) -> Result<()> {
        let Some(epoch_id) = self.epoch_org_ids.get(organization.id()) else {
            error!(
                "Organization {} is not managed by committee {}",
                organization.id(),
                self.id
            );
            return Err(CallerError::UnknownOrganization(organization.id().to_string()).into());
        };
        organization.set_epoch_id(epoch_id.clone());
        Ok(())
    }

    /// The pair randomness of `org1` and `org2` for the current epoch.
    pub fn epoch_tx_randomness(&self, org1: &OrgId, org2: &OrgId) -> Option<&PairRandomness<C>> {
        self.epoch_tx_randomness
            .get(&pair_key(org1.hash(), org2.hash()))
    }

    pub(super) fn org_epoch_id(&self, org_id: &OrgId) -> Result<&EpochPseudonym> {
        self.epoch_org_ids.get(org_id).ok_or_else(|| {
            error!("No epoch pseudonym for organization {org_id}");
            InternalError::PseudonymNotFound(org_id.to_string())
        })
    }

    pub(super) fn auditor_epoch_id(&self, auditor_id: &AuditorId) -> Result<&EpochPseudonym> {
        self.epoch_auditor_ids.get(auditor_id).ok_or_else(|| {
            error!("No epoch pseudonym for auditor {auditor_id}");
            InternalError::PseudonymNotFound(auditor_id.to_string())
        })
    }

    pub(super) fn org_secret_key(&self, org_id: &OrgId) -> Result<&SecretKey<C>> {
        let org_hash = org_id.hash();
        self.epoch_secret_keys.get(&org_hash).ok_or_else(|| {
            error!("No epoch secret key for organization {org_id}");
            InternalError::KeyNotFound(org_hash.to_string())
        })
    }
}

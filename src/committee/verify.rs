// Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use super::Committee;
use crate::{
    curve::CurveTrait,
    errors::Result,
    identity::{AuditorId, OrgId},
    parallel::parallel_map,
    transaction::{AuditorReport, OrgSummary},
};
use tracing::{info, instrument, warn};

/// One organization/auditor check for [`Committee::verify_batch`].
#[derive(Debug, Clone)]
pub struct VerificationJob<C> {
    /// The audited organization.
    pub org_id: OrgId,
    /// Its auditor.
    pub auditor_id: AuditorId,
    /// The organization's published summary.
    pub summary: OrgSummary<C>,
    /// The auditor's published report.
    pub report: AuditorReport<C>,
}

impl<C: CurveTrait> Committee<C> {
    /// Decrypt `(B, C, D')` from a report about `org_id`, where `D'` is `D`
    /// plus the hash point of the reporting auditor's pseudonym.
    pub fn decrypt_aud_report(&self, org_id: &OrgId, report: &AuditorReport<C>) -> Result<(C, C, C)> {
        let secret_key = self.org_secret_key(org_id)?;
        Ok((
            secret_key.decrypt_point(report.cipher_b()),
            secret_key.decrypt_point(report.cipher_c()),
            secret_key.decrypt_point(report.cipher_d()),
        ))
    }

    /// Check an organization's summary against its auditor's report:
    /// `summary + B + D' == P(org pseudonym) + P(auditor pseudonym)`.
    #[instrument(skip_all, err(Debug))]
    pub fn verify_org_and_aud_result(
        &self,
        org_id: &OrgId,
        auditor_id: &AuditorId,
        summary: &OrgSummary<C>,
        report: &AuditorReport<C>,
    ) -> Result<bool> {
        let (b, _, d) = self.decrypt_aud_report(org_id, report)?;
        self.check_org_and_aud_pair(org_id, auditor_id, summary, b, d)
    }

    /// The identity of [`Committee::verify_org_and_aud_result`] on already
    /// decrypted `B` and `D'`.
    pub fn check_org_and_aud_pair(
        &self,
        org_id: &OrgId,
        auditor_id: &AuditorId,
        summary: &OrgSummary<C>,
        b: C,
        d: C,
    ) -> Result<bool> {
        let left = summary.accumulator() + b + d;
        let right = self.org_epoch_id(org_id)?.hash_point(&self.ctx)
            + self.auditor_epoch_id(auditor_id)?.hash_point(&self.ctx);
        let consistent = left == right;
        if !consistent {
            warn!("Summary of {org_id} disagrees with the report of {auditor_id}");
        }
        Ok(consistent)
    }

    /// Check the reports of the two auditors of a counterparty pair against
    /// each other: `D1' + C1 + D2' + C2 == P(auditor1) + P(auditor2)`.
    #[instrument(skip_all, err(Debug))]
    pub fn verify_audit_pair_result(
        &self,
        org_id1: &OrgId,
        org_id2: &OrgId,
        auditor_id1: &AuditorId,
        auditor_id2: &AuditorId,
        report1: &AuditorReport<C>,
        report2: &AuditorReport<C>,
    ) -> Result<bool> {
        let (_, c1, d1) = self.decrypt_aud_report(org_id1, report1)?;
        let (_, c2, d2) = self.decrypt_aud_report(org_id2, report2)?;
        self.check_audit_pair(auditor_id1, auditor_id2, c1, c2, d1, d2)
    }

    /// The identity of [`Committee::verify_audit_pair_result`] on already
    /// decrypted points.
    pub fn check_audit_pair(
        &self,
        auditor_id1: &AuditorId,
        auditor_id2: &AuditorId,
        c1: C,
        c2: C,
        d1: C,
        d2: C,
    ) -> Result<bool> {
        let left = d1 + c1 + d2 + c2;
        let right = self.auditor_epoch_id(auditor_id1)?.hash_point(&self.ctx)
            + self.auditor_epoch_id(auditor_id2)?.hash_point(&self.ctx);
        let consistent = left == right;
        if !consistent {
            warn!("Reports of {auditor_id1} and {auditor_id2} disagree");
        }
        Ok(consistent)
    }

    /// Run [`Committee::verify_org_and_aud_result`] for every job on
    /// `workers` threads. Result `i` belongs to `jobs[i]`; the first error
    /// aborts the batch.
    #[instrument(skip_all, err(Debug))]
    pub fn verify_batch(&self, jobs: &[VerificationJob<C>], workers: usize) -> Result<Vec<bool>> {
        info!("Verifying {} organization/auditor pairs", jobs.len());
        parallel_map(jobs.len(), workers, |i| {
            let job = &jobs[i];
            self.verify_org_and_aud_result(&job.org_id, &job.auditor_id, &job.summary, &job.report)
        })
    }
}

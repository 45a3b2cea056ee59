//! ## Example usage of the [`epoch_audit`] crate.
//!
//! Runs one audit epoch over `--pairs` pairs of trading organizations. Each
//! organization has its own auditor; every pair exchanges
//! `--transactions` transfers.
//!
//! The run mirrors a deployment:
//! 1. the committee initializes the epoch and publishes the public keys,
//! 2. transfers are generated and hidden in bulk on worker threads, and the
//!    hidden records go to a local-chain ledger,
//! 3. each organization publishes its summary to the org-chain ledger,
//! 4. each auditor publishes its encrypted report to the aud-chain ledger,
//! 5. the committee verifies every organization/auditor pair in one batch
//!    and then every auditor pair.
//!
//! Set `RUST_LOG=epoch_audit=debug` to follow the protocol.
//!
//! # Warning
//! Every participant lives in this one process and the committee's secrets
//! are handed over by plain function calls. A deployment needs
//! authenticated, confidential channels between the committee and the other
//! participants.

use anyhow::{anyhow, bail};
use clap::{command, Parser};
use epoch_audit::{
    auditor::{Auditor, Examination},
    committee::{Committee, VerificationJob},
    config::{LedgerConfig, ProtocolConfig},
    curve::TestCurve,
    group::GroupContext,
    identity::{AuditorId, OrgId},
    ledger::{submit_with_retry, Ledger, MemoryLedger},
    organization::Organization,
    parallel::{default_worker_count, parallel_map},
    transaction::{
        generate_pair_batch, hide_batch, AudOnChain, AuditorReport, HiddenTransaction,
        LocalOnChain, OrgOnChain, OrgSummary, PlainTransaction,
    },
};
use rand::thread_rng;
use std::{collections::HashMap, time::Instant};
use tracing::{info, span, Level};
use tracing_subscriber::{self, EnvFilter};

type Curve = TestCurve;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Number of trading organization pairs.
    #[arg(short, long, default_value_t = 4)]
    pairs: usize,
    /// Transfers per pair in the epoch.
    #[arg(short, long, default_value_t = 64)]
    transactions: usize,
    /// Largest transfer amount.
    #[arg(short, long, default_value_t = 1000.0)]
    max_amount: f64,
    /// Worker threads for bulk work. Defaults to available parallelism.
    #[arg(short, long)]
    workers: Option<usize>,
}

/// Everything one organization keeps about its dealings with its
/// counterparty during the epoch.
struct Books {
    hidden: Vec<HiddenTransaction<Curve>>,
    blinding: Vec<<Curve as epoch_audit::curve::CurveTrait>::Scalar>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let filter = EnvFilter::from_default_env();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .compact()
        .init();
    let span = span!(Level::INFO, "main");
    let _enter = span.entered();

    if cli.pairs == 0 || cli.transactions == 0 {
        bail!("Need at least one pair and one transaction per pair");
    }
    let config = ProtocolConfig {
        max_num_tx_in_epoch: cli.transactions,
        worker_count: cli.workers.unwrap_or_else(default_worker_count),
        ..Default::default()
    };
    config.validate()?;
    let ledger_config = LedgerConfig {
        retry_delay_ms: 10,
        ..Default::default()
    };
    let workers = config.worker_count;
    let ctx = GroupContext::<Curve>::new()?;
    let started = Instant::now();

    // org 2i trades with org 2i+1; auditor i audits org i
    let org_ids: Vec<OrgId> = (0..2 * cli.pairs)
        .map(|i| OrgId::new(format!("org-{i}")))
        .collect();
    let counterparty = |i: usize| &org_ids[i ^ 1];
    let mut auditors: Vec<Auditor<Curve>> = org_ids
        .iter()
        .enumerate()
        .map(|(i, org)| {
            Auditor::new(
                ctx,
                &config,
                AuditorId::new(format!("aud-{i}")),
                std::slice::from_ref(org),
            )
        })
        .collect::<Result<_, _>>()?;
    let mut organizations: Vec<Organization<Curve>> = org_ids
        .iter()
        .map(|id| Organization::new(ctx, &config, id.clone()))
        .collect::<Result<_, _>>()?;
    let mut committee = Committee::new(ctx, config.clone(), "committee", &auditors)?;

    let rng = &mut thread_rng();
    let public_keys = committee.initialize_epoch(rng, &mut auditors, &mut organizations)?;
    info!("Epoch initialized with {} public keys", public_keys.len());

    let mut local_chain = MemoryLedger::new();
    let mut books = Vec::with_capacity(org_ids.len());
    for pair in 0..cli.pairs {
        let (from, to) = (&org_ids[2 * pair], &org_ids[2 * pair + 1]);
        let transfers = generate_pair_batch(from, to, cli.transactions, cli.max_amount, 0, workers)?;
        let (sent, received): (Vec<PlainTransaction>, Vec<PlainTransaction>) =
            transfers.into_iter().unzip();
        for (index, side) in [(2 * pair, sent), (2 * pair + 1, received)] {
            let hidden = hide_batch(&ctx, &side, workers)?;
            let mut entry = Books {
                hidden: Vec::with_capacity(hidden.len()),
                blinding: Vec::with_capacity(hidden.len()),
            };
            for (tx, commitment, blinding) in hidden {
                organizations[index].accumulate(counterparty(index), commitment)?;
                entry.hidden.push(tx);
                entry.blinding.push(blinding);
            }
            let records: Vec<LocalOnChain> = entry.hidden.iter().map(LocalOnChain::from).collect();
            submit_with_retry(&mut local_chain, &records, &ledger_config)?;
            books.push(entry);
        }
    }
    info!(
        "Hid {} transactions into {} local-chain records",
        2 * cli.pairs * cli.transactions,
        local_chain.len()
    );

    let summaries = organizations
        .iter()
        .enumerate()
        .map(|(i, org)| org.compose_org_summary(counterparty(i)))
        .collect::<Result<Vec<_>, _>>()?;
    let mut org_chain = MemoryLedger::new();
    let org_records: Vec<OrgOnChain> = summaries.iter().map(OrgOnChain::from).collect();
    let summary_keys = submit_with_retry(&mut org_chain, &org_records, &ledger_config)?;

    let exams: Vec<Examination<Curve>> = parallel_map(org_ids.len(), workers, |i| {
        auditors[i].consistency_examination(
            &mut thread_rng(),
            &org_ids[i],
            counterparty(i),
            &summaries[i],
            &books[i].hidden,
            &books[i].blinding,
            &public_keys,
        )
    })?;
    let mut aud_chain = MemoryLedger::new();
    let aud_records: Vec<AudOnChain> = exams.iter().map(|e| AudOnChain::from(&e.report)).collect();
    submit_with_retry(&mut aud_chain, &aud_records, &ledger_config)?;
    info!(
        "Published {} summaries and {} reports",
        org_chain.len(),
        aud_chain.len()
    );

    // the committee works from what it reads back off the ledgers
    let mut jobs = Vec::with_capacity(org_ids.len());
    let mut reports = HashMap::new();
    for (i, key) in summary_keys.iter().enumerate() {
        let stored = org_chain
            .get_state(key)?
            .ok_or_else(|| anyhow!("summary {key} missing from the org chain"))?;
        let summary: OrgSummary<Curve> = (&serde_json::from_slice::<OrgOnChain>(&stored)?).try_into()?;
        let stored = aud_chain
            .get_state(&aud_records[i].id)?
            .ok_or_else(|| anyhow!("report {} missing from the aud chain", aud_records[i].id))?;
        let report: AuditorReport<Curve> = (&serde_json::from_slice::<AudOnChain>(&stored)?).try_into()?;
        reports.insert(i, report);
        jobs.push(VerificationJob {
            org_id: org_ids[i].clone(),
            auditor_id: auditors[i].id().clone(),
            summary,
            report,
        });
    }

    let results = committee.verify_batch(&jobs, workers)?;
    let failed_orgs = results.iter().filter(|ok| !**ok).count();
    let mut failed_pairs = 0;
    for pair in 0..cli.pairs {
        let (i, j) = (2 * pair, 2 * pair + 1);
        let consistent = committee.verify_audit_pair_result(
            &org_ids[i],
            &org_ids[j],
            auditors[i].id(),
            auditors[j].id(),
            &reports[&i],
            &reports[&j],
        )?;
        if !consistent {
            failed_pairs += 1;
        }
    }

    info!(
        "Verified {} organizations and {} pairs in {:?}",
        results.len(),
        cli.pairs,
        started.elapsed()
    );
    if failed_orgs > 0 || failed_pairs > 0 {
        bail!("{failed_orgs} organization checks and {failed_pairs} pair checks failed");
    }
    println!(
        "Epoch verified: {} organizations, {} transfers",
        org_ids.len(),
        cli.pairs * cli.transactions
    );
    Ok(())
}

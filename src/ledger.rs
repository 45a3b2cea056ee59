// Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! The durable storage the protocol records are written to.
//!
//! The protocol only needs key/value writes, point reads and a paged scan.
//! [`MemoryLedger`] provides them in process; a deployment plugs its
//! blockchain client in behind [`Ledger`]. Writes are the only place the
//! crate retries: see [`submit_with_retry`].

use crate::{
    config::LedgerConfig,
    errors::{CallerError, InternalError, Result},
    transaction::OnChainRecord,
};
use std::{collections::BTreeMap, ops::Bound, thread};
use tracing::{debug, error, info, instrument, warn};

/// One page of a [`Ledger::range`] scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    /// Key/value pairs in key order.
    pub records: Vec<(String, Vec<u8>)>,
    /// Pass back to [`Ledger::range`] to fetch the next page; `None` once the
    /// scan is complete.
    pub bookmark: Option<String>,
}

/// Append-mostly key/value storage with paged iteration.
pub trait Ledger {
    /// Store `value` under `key`, replacing any previous value.
    fn put_state(&mut self, key: &str, value: &[u8]) -> Result<()>;

    /// The value stored under `key`, if any.
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Up to `page_size` records with keys strictly after `bookmark`.
    fn range(&self, bookmark: Option<&str>, page_size: usize) -> Result<Page>;
}

/// A [`Ledger`] backed by an ordered map.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    state: BTreeMap<String, Vec<u8>>,
}

impl MemoryLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.state.len()
    }

    /// True if nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }
}

impl Ledger for MemoryLedger {
    fn put_state(&mut self, key: &str, value: &[u8]) -> Result<()> {
        if key.is_empty() {
            error!("Refusing to store a record under an empty key");
            Err(CallerError::BadInput)?
        }
        self.state.insert(key.to_owned(), value.to_vec());
        Ok(())
    }

    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.state.get(key).cloned())
    }

    fn range(&self, bookmark: Option<&str>, page_size: usize) -> Result<Page> {
        if page_size == 0 {
            error!("Range queries need a positive page size");
            Err(CallerError::BadInput)?
        }
        let start = match bookmark {
            Some(key) => Bound::Excluded(key),
            None => Bound::Unbounded,
        };
        let mut scan = self
            .state
            .range::<str, _>((start, Bound::Unbounded))
            .map(|(k, v)| (k.clone(), v.clone()));
        let records: Vec<_> = scan.by_ref().take(page_size).collect();
        let bookmark = match scan.next() {
            Some(_) => records.last().map(|(k, _)| k.clone()),
            None => None,
        };
        Ok(Page { records, bookmark })
    }
}

/// Write every record to `ledger`, in order.
///
/// Each write is attempted up to `config.max_retries` times with a fixed
/// `config.retry_delay()` pause in between. The first record that still
/// fails aborts the submission with [`InternalError::LedgerWriteFailed`];
/// records before it stay written. Returns the keys written.
#[instrument(skip_all, err(Debug))]
pub fn submit_with_retry<L: Ledger, R: OnChainRecord>(
    ledger: &mut L,
    records: &[R],
    config: &LedgerConfig,
) -> Result<Vec<String>> {
    config.validate()?;
    info!("Submitting {} records", records.len());
    let mut keys = Vec::with_capacity(records.len());
    for record in records {
        let (key, value) = record.key_value()?;
        let mut attempt = 1;
        loop {
            match ledger.put_state(&key, &value) {
                Ok(()) => break,
                Err(e) if attempt < config.max_retries => {
                    warn!("Write of {key} failed on attempt {attempt}: {e}");
                    attempt += 1;
                    thread::sleep(config.retry_delay());
                }
                Err(e) => {
                    error!("Giving up on {key} after {attempt} attempts: {e}");
                    return Err(InternalError::LedgerWriteFailed {
                        key,
                        attempts: attempt,
                    });
                }
            }
        }
        debug!("Wrote {key}");
        keys.push(key);
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        curve::TestCurve,
        group::GroupContext,
        identity::OrgId,
        transaction::{LocalOnChain, PlainTransaction},
        utils::testing::init_testing,
    };

    /// Fails the first `failures` writes, then delegates.
    struct FlakyLedger {
        inner: MemoryLedger,
        failures: usize,
        calls: usize,
    }

    impl Ledger for FlakyLedger {
        fn put_state(&mut self, key: &str, value: &[u8]) -> Result<()> {
            self.calls += 1;
            if self.calls <= self.failures {
                return Err(InternalError::InternalInvariantFailed);
            }
            self.inner.put_state(key, value)
        }

        fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>> {
            self.inner.get_state(key)
        }

        fn range(&self, bookmark: Option<&str>, page_size: usize) -> Result<Page> {
            self.inner.range(bookmark, page_size)
        }
    }

    fn local_records(count: usize) -> Vec<LocalOnChain> {
        let rng = &mut init_testing();
        let ctx = GroupContext::<TestCurve>::new().unwrap();
        (0..count)
            .map(|i| {
                let tx = PlainTransaction::new(OrgId::new("org-2"), i as i64 + 1, i as i64);
                LocalOnChain::from(&tx.hide(&ctx, rng).0)
            })
            .collect()
    }

    fn no_delay(max_retries: usize) -> LedgerConfig {
        LedgerConfig {
            max_retries,
            retry_delay_ms: 0,
        }
    }

    #[test]
    fn range_pages_through_every_record() {
        let mut ledger = MemoryLedger::new();
        for key in ["e", "a", "d", "c", "b"] {
            ledger.put_state(key, key.as_bytes()).unwrap();
        }
        assert_eq!(ledger.get_state("c").unwrap(), Some(b"c".to_vec()));
        assert_eq!(ledger.get_state("z").unwrap(), None);

        let mut seen = Vec::new();
        let mut bookmark: Option<String> = None;
        loop {
            let page = ledger.range(bookmark.as_deref(), 2).unwrap();
            assert!(page.records.len() <= 2);
            seen.extend(page.records.into_iter().map(|(k, _)| k));
            match page.bookmark {
                Some(next) => bookmark = Some(next),
                None => break,
            }
        }
        assert_eq!(seen, vec!["a", "b", "c", "d", "e"]);
        assert!(ledger.range(None, 0).is_err());
    }

    #[test]
    fn submission_survives_transient_failures() {
        let records = local_records(3);
        let mut ledger = FlakyLedger {
            inner: MemoryLedger::new(),
            failures: 2,
            calls: 0,
        };
        let keys = submit_with_retry(&mut ledger, &records, &no_delay(3)).unwrap();
        assert_eq!(keys.len(), 3);
        assert_eq!(ledger.inner.len(), 3);
        assert_eq!(ledger.calls, 5);

        let stored = ledger.get_state(&keys[0]).unwrap().unwrap();
        let parsed: LocalOnChain = serde_json::from_slice(&stored).unwrap();
        assert_eq!(parsed, records[0]);
    }

    #[test]
    fn submission_gives_up_after_max_retries() {
        let records = local_records(2);
        let mut ledger = FlakyLedger {
            inner: MemoryLedger::new(),
            failures: usize::MAX,
            calls: 0,
        };
        let (key, _) = records[0].key_value().unwrap();
        assert_eq!(
            submit_with_retry(&mut ledger, &records, &no_delay(4)).unwrap_err(),
            InternalError::LedgerWriteFailed { key, attempts: 4 }
        );
        assert_eq!(ledger.calls, 4);
        assert!(ledger.inner.is_empty());
    }
}

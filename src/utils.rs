// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::errors::{CallerError, Result};
use sha2::{Digest, Sha256};
use tracing::error;
use zeroize::Zeroize;

pub(crate) const CRYPTOGRAPHIC_RETRY_MAX: usize = 500usize;

/// Helper type for parsing byte array into slices.
///
/// This type implements [`Zeroize`]. When parsing secret types, you should
/// manually call `zeroize()` after parsing is complete.
#[derive(Zeroize)]
pub(crate) struct ParseBytes {
    bytes: Vec<u8>,
    offset: usize,
}

impl ParseBytes {
    /// Consume bytes for parsing.
    pub(crate) fn new(bytes: Vec<u8>) -> ParseBytes {
        ParseBytes { bytes, offset: 0 }
    }

    /// Take next `n` bytes from array.
    pub(crate) fn take_bytes(&mut self, n: usize) -> Result<&[u8]> {
        let slice = self
            .bytes
            .get(self.offset..self.offset + n)
            .ok_or(CallerError::InvalidEncoding)?;
        self.offset += n;
        Ok(slice)
    }

    /// Fail unless every byte has been consumed.
    pub(crate) fn finish(&self) -> Result<()> {
        if self.offset != self.bytes.len() {
            error!(
                "Found {} trailing bytes after parsing",
                self.bytes.len() - self.offset
            );
            Err(CallerError::InvalidEncoding)?
        }
        Ok(())
    }
}

/// SHA-256 of the concatenation of `parts`.
pub(crate) fn sha256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Decode a hex string, mapping failures to [`CallerError::InvalidEncoding`].
pub(crate) fn decode_hex(field: &str, value: &str) -> Result<Vec<u8>> {
    hex::decode(value).map_err(|e| {
        error!("Field `{field}` is not valid hex: {e}");
        CallerError::InvalidEncoding.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bytes_rejects_overruns_and_trailing_data() {
        let mut parser = ParseBytes::new(vec![1, 2, 3, 4]);
        assert_eq!(parser.take_bytes(3).unwrap(), &[1, 2, 3]);
        assert!(parser.finish().is_err());
        assert!(parser.take_bytes(2).is_err());
        assert_eq!(parser.take_bytes(1).unwrap(), &[4]);
        assert!(parser.finish().is_ok());
    }

    #[test]
    fn sha256_of_parts_matches_concatenation() {
        assert_eq!(sha256(&[b"ab", b"cd"]), sha256(&[b"abcd"]));
        assert_ne!(sha256(&[b"ab"]), sha256(&[b"ba"]));
    }
}

////////////////////////////
// Test Utility Functions //
////////////////////////////

/// Returns an rng to be used for testing. This will print the rng seed
/// to stderr so that if a test fails, the failing seed can be recovered
/// and used for debugging.
#[cfg(test)]
pub(crate) mod testing {
    use rand::{
        rngs::{OsRng, StdRng},
        Rng, SeedableRng,
    };
    use tracing_subscriber::{
        filter::Targets, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
    };

    /// Initialize any fields necessary for our tests. This should be called at
    /// the top of all our tests. This function is idempotent.
    ///
    /// This will print the rng seed to stderr so that if a test fails, the
    /// failing seed can be recovered and used for debugging.
    pub(crate) fn init_testing() -> StdRng {
        let mut seeder = OsRng;
        let seed = seeder.gen();
        eprintln!(
            "To re-run test with the same randomness, use init_testing_with_seed() with the following seed:"
        );
        eprintln!("\t{seed:?}");
        StdRng::from_seed(seed)
    }

    /// A seeded version of [`init_testing`]. This function can be used when a
    /// test fails unexpectedly, and you want to reproduce the run using a
    /// specific RNG seed.
    ///
    /// **Additionally, turns on logging by default.**
    ///
    /// This function should only be called when debugging. Avoid calling as
    /// part of a normal unit test execution: several tests purposely feed bad
    /// input (tampered reports, oversized transaction lists) and the resulting
    /// `ERROR` events would make a passing run look broken.
    #[allow(unused)]
    pub(crate) fn init_testing_with_seed(seed: [u8; 32]) -> StdRng {
        let logging_level = EnvFilter::from_default_env()
            .max_level_hint()
            .unwrap()
            .into_level()
            .unwrap();

        // Only capture logging events from epoch_audit crate.
        let targets = Targets::new().with_target("epoch_audit", logging_level);
        let stdout_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_filter(targets);

        // It's okay if this fails. It just means logging has already been set up for
        // this thread.
        let _ = tracing_subscriber::registry().with(stdout_layer).try_init();

        // Return RNG
        StdRng::from_seed(seed)
    }
}

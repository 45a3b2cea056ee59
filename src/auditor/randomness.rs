use crate::{
    curve::{CurveTrait, ScalarTrait},
    errors::{CallerError, Result},
};
use rand::{CryptoRng, RngCore};
use std::fmt::Debug;
use tracing::error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// The per-slot random scalars `r_{A,B,k}` the committee draws for one
/// unordered organization pair and one epoch.
///
/// Slot `k` scales the `k`-th transaction between the two organizations, on
/// both sides of the pair.
///
/// # 🔒 Storage requirements
/// Known only to the committee and to the auditors of either organization.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct PairRandomness<C: CurveTrait> {
    slots: Vec<C::Scalar>,
}

impl<C: CurveTrait> Debug for PairRandomness<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairRandomness")
            .field("len", &self.slots.len())
            .field("slots", &"[redacted]")
            .finish()
    }
}

impl<C: CurveTrait> PairRandomness<C> {
    /// Draw `len` independent uniform scalars.
    pub(crate) fn generate<R: RngCore + CryptoRng>(rng: &mut R, len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| C::Scalar::random(rng)).collect(),
        }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True if there are no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The first `n` slots, or [`CallerError::TooManyTransactions`] if there
    /// are fewer.
    pub fn slots(&self, n: usize) -> Result<&[C::Scalar]> {
        self.slots.get(..n).ok_or_else(|| {
            error!(
                "Requested {} randomness slots, but only {} exist",
                n,
                self.slots.len()
            );
            CallerError::TooManyTransactions {
                count: n,
                max: self.slots.len(),
            }
            .into()
        })
    }

    /// Sum of all slots.
    pub fn sum(&self) -> C::Scalar {
        self.slots
            .iter()
            .fold(C::Scalar::zero(), |acc, slot| acc + *slot)
    }
}

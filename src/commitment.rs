//! Pedersen commitments to signed transaction amounts.

use crate::{
    curve::{CurveTrait, ScalarTrait},
    group::GroupContext,
};
use rand::{CryptoRng, RngCore};

/// Map a signed amount into the scalar field.
///
/// Negative amounts map to the additive inverse of their magnitude, so
/// `amount_to_scalar(a) + amount_to_scalar(-a) == 0` for every `a`.
pub fn amount_to_scalar<C: CurveTrait>(amount: i64) -> C::Scalar {
    let magnitude = C::Scalar::convert_from_u64(amount.unsigned_abs());
    if amount < 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Commit to `amount` as `amount·G + blinding·H` with a fresh blinding
/// scalar. Returns the commitment and the blinding scalar.
pub fn pedersen_commit<C: CurveTrait, R: RngCore + CryptoRng>(
    ctx: &GroupContext<C>,
    rng: &mut R,
    amount: i64,
) -> (C, C::Scalar) {
    let blinding = C::Scalar::random(rng);
    (commit_with_blinding(ctx, amount, &blinding), blinding)
}

/// Commit to `amount` with a caller-chosen blinding scalar.
pub fn commit_with_blinding<C: CurveTrait>(
    ctx: &GroupContext<C>,
    amount: i64,
    blinding: &C::Scalar,
) -> C {
    let amount_point = ctx.g().multiply_by_scalar(&amount_to_scalar::<C>(amount));
    amount_point + ctx.h().multiply_by_scalar(blinding)
}

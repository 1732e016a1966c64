//! Arithmetic over permutation counts and indices.
//!
//! A subtree's index space is the product of its local choices and every visible
//! child's own index space. Global indices are 1-based and decomposed in mixed
//! radix: the local choice is the least significant digit, followed by the
//! children in list order.

use crate::token::{PERMUTATIONS_SATURATED, Token, TokenError};

/// Product of `counts`, saturating at [`PERMUTATIONS_SATURATED`].
pub fn product(counts: impl IntoIterator<Item = u64>) -> u64 {
    counts
        .into_iter()
        .fold(1u64, |acc, count| acc.saturating_mul(count))
}

/// `base^exp`, saturating at [`PERMUTATIONS_SATURATED`].
pub fn saturating_pow(base: u64, exp: u64) -> u64 {
    match (base, u32::try_from(exp)) {
        (0 | 1, _) if exp > 0 => base,
        (_, _) if exp == 0 => 1,
        (_, Ok(exp)) => base.saturating_pow(exp),
        (_, Err(_)) => PERMUTATIONS_SATURATED,
    }
}

/// Fails with [`TokenError::PermutationOutOfBounds`] unless `1 <= i <= permutations`.
pub fn check_index(i: u64, permutations: u64) -> Result<(), TokenError> {
    if i < 1 || i > permutations {
        return Err(TokenError::PermutationOutOfBounds {
            index: i,
            permutations,
        });
    }
    Ok(())
}

/// Local choices of `token` times every visible child's `permutations_all`.
pub fn permutations_all_of(token: &dyn Token) -> u64 {
    let local = token.permutations();
    match token.as_list() {
        Some(list) => product(
            std::iter::once(local).chain(
                (0..list.len())
                    .filter_map(|i| list.get(i).ok())
                    .map(|child| child.permutations_all()),
            ),
        ),
        None => local,
    }
}

/// Selects the `i`-th combination of `token` and its visible children.
///
/// The index is validated against `permutations_all` before anything changes, so
/// a rejected index leaves the whole subtree untouched.
pub fn apply_product(token: &mut dyn Token, i: u64) -> Result<(), TokenError> {
    check_index(i, token.permutations_all())?;

    let mut rest = i - 1;
    let local = token.permutations().max(1);
    token.permutation(rest % local + 1)?;
    rest /= local;

    if let Some(list) = token.as_list_mut() {
        for k in 0..list.len() {
            let child = list.get_mut(k)?;
            let radix = child.permutations_all().max(1);
            child.permutation_all(rest % radix + 1)?;
            rest /= radix;
        }
    }
    Ok(())
}

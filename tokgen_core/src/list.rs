use crate::token::{BoxedToken, Token, TokenId};
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListError {
    #[error("list index {index} is out of bounds for length {len}")]
    OutOfBounds { index: usize, len: usize },
}

/// Ordered children that generation, rendering and parsing walk.
pub trait List {
    fn get(&self, i: usize) -> Result<&dyn Token, ListError>;

    fn get_mut(&mut self, i: usize) -> Result<&mut dyn Token, ListError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What a parent wants done with itself after one of its internal children was
/// logically removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalRemoval {
    /// The parent is still valid and stays in the tree unchanged.
    Keep,
    /// The parent cannot exist without the removed child and must be dropped by
    /// its own parent.
    Remove,
}

/// Ordered structural children that rewriting passes may replace or remove.
///
/// The internal view can differ from the visible [`List`] view: a repetition
/// list exposes its template internally and its materialized copies visibly.
pub trait InternalList {
    fn internal_get(&self, i: usize) -> Result<&dyn Token, ListError>;

    fn internal_get_mut(&mut self, i: usize) -> Result<&mut dyn Token, ListError>;

    fn internal_len(&self) -> usize;

    /// Index of the direct internal child with the given id.
    fn internal_position(&self, id: TokenId) -> Option<usize> {
        (0..self.internal_len())
            .find(|&i| self.internal_get(i).is_ok_and(|token| token.id() == id))
    }

    /// Logically removes the direct internal child `id`.
    fn internal_logical_remove(&mut self, id: TokenId) -> LogicalRemoval;

    /// Replaces the direct internal child `old` with `new` and returns the displaced
    /// child, or `None` if `old` is not a direct internal child.
    ///
    /// Implementations must bring every derived child back in line with the
    /// replacement before returning.
    fn internal_replace(&mut self, old: TokenId, new: BoxedToken) -> Option<BoxedToken>;

    /// Rebuilds derived state after an internal child was rewritten in place.
    fn internal_refresh(&mut self) {}
}

/// A token that can currently be toggled between absent and present once.
pub trait OptionalToken {
    /// Whether the token is optional in its current state.
    fn is_optional(&self) -> bool;

    fn activate(&mut self);

    fn deactivate(&mut self);
}

/// Bounds-checked access into a slice of owned tokens.
pub(crate) fn slice_get(tokens: &[BoxedToken], i: usize) -> Result<&dyn Token, ListError> {
    tokens
        .get(i)
        .map(|token| &**token)
        .ok_or(ListError::OutOfBounds {
            index: i,
            len: tokens.len(),
        })
}

pub(crate) fn slice_get_mut(
    tokens: &mut [BoxedToken],
    i: usize,
) -> Result<&mut dyn Token, ListError> {
    let len = tokens.len();
    match tokens.get_mut(i) {
        Some(token) => Ok(&mut **token),
        None => Err(ListError::OutOfBounds { index: i, len }),
    }
}

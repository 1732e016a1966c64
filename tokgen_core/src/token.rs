use crate::list::{InternalList, List, ListError, OptionalToken};
use crate::parser::{ParseErrors, ParserInput};
use rand_core::RngCore;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Value reported by permutation counts whose real size does not fit in a `u64`.
pub const PERMUTATIONS_SATURATED: u64 = u64::MAX;

static NEXT_TOKEN_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a token.
///
/// Every constructed token and every clone of a token receives a fresh id, so an id
/// names exactly one node of exactly one tree. Structural rewriting passes address
/// the node they want to replace or remove by its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(u64);

impl TokenId {
    /// Allocates the next unused id.
    pub fn next() -> Self {
        TokenId(NEXT_TOKEN_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors produced by token operations.
///
/// Permutation, list and parse errors are recoverable: the token that reported them
/// is left in the state it had before the call. `NotImplemented` and `Internal` are
/// fatal and must be propagated instead of being handled locally, see [`TokenError::is_fatal`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// A permutation index outside of `1..=permutations`.
    #[error("permutation index {index} is out of bounds 1..={permutations}")]
    PermutationOutOfBounds { index: u64, permutations: u64 },

    /// A list index outside of the visible or internal child view.
    #[error(transparent)]
    List(#[from] ListError),

    /// The input did not match the token.
    #[error(transparent)]
    Parse(#[from] ParseErrors),

    /// A token was constructed with arguments it cannot represent.
    #[error("invalid token definition: {0}")]
    InvalidDefinition(String),

    /// No token with this id is reachable through the internal child view.
    #[error("token {0} is not an internal descendant of this tree")]
    UnknownToken(TokenId),

    /// The operation is declared for this token kind but has no implementation.
    #[error("{operation} is not implemented for {token} tokens")]
    NotImplemented {
        token: &'static str,
        operation: &'static str,
    },

    /// A token invariant was broken, e.g. an arithmetic operand rendered non-numeric text.
    #[error("internal consistency violation: {0}")]
    Internal(String),
}

impl TokenError {
    /// Returns `true` for conditions that cannot be recovered from within a tree.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TokenError::NotImplemented { .. } | TokenError::Internal(_)
        )
    }
}

/// Owned, type-erased token. Trees are built out of these.
pub type BoxedToken = Box<dyn Token>;

/// The contract every node of a generation tree implements.
///
/// A token can be randomly instantiated (`fuzz`), deterministically enumerated
/// (`permutation`), rendered to text (`render`) and matched against existing text
/// (`parse`). Child access is optional and goes through the capability accessors:
/// [`List`] is the view generation and parsing walk, [`InternalList`] the view
/// rewriting passes act on, [`OptionalToken`] the present/absent toggle.
pub trait Token: fmt::Debug + Send {
    fn id(&self) -> TokenId;

    /// Short, static name of the token kind for diagnostics.
    fn kind(&self) -> &'static str;

    /// Deep copy of this token and all of its children. The copy shares no state
    /// with the original and every node in it has a fresh [`TokenId`].
    fn clone_token(&self) -> BoxedToken;

    /// Picks one of this token's own permutations. Does not touch children.
    fn fuzz(&mut self, rng: &mut dyn RngCore);

    /// Fuzzes this token and then every current child, in child order.
    fn fuzz_all(&mut self, rng: &mut dyn RngCore);

    /// Tries to match the token at `cur` and returns the cursor after the match.
    ///
    /// On failure the token keeps its previous value and the caller's cursor stays
    /// where it was.
    fn parse(&mut self, input: &ParserInput<'_>, cur: usize) -> Result<usize, TokenError>;

    /// Selects the `i`-th local choice, `i` being 1-based.
    fn permutation(&mut self, i: u64) -> Result<(), TokenError>;

    /// Number of local choices, independent of children. Always at least 1.
    fn permutations(&self) -> u64;

    /// Number of choices of the whole subtree, saturating at [`PERMUTATIONS_SATURATED`].
    fn permutations_all(&self) -> u64;

    /// Selects the `i`-th (1-based) combination of the whole subtree.
    fn permutation_all(&mut self, i: u64) -> Result<(), TokenError>;

    /// The current textual value. Has no side effects.
    fn render(&self) -> Result<String, TokenError>;

    /// `false` for fuzz-only tokens whose values are not covered by enumeration.
    fn is_enumerable(&self) -> bool {
        true
    }

    fn as_list(&self) -> Option<&dyn List> {
        None
    }

    fn as_list_mut(&mut self) -> Option<&mut dyn List> {
        None
    }

    fn as_internal_list(&self) -> Option<&dyn InternalList> {
        None
    }

    fn as_internal_list_mut(&mut self) -> Option<&mut dyn InternalList> {
        None
    }

    fn as_optional(&self) -> Option<&dyn OptionalToken> {
        None
    }

    fn as_optional_mut(&mut self) -> Option<&mut dyn OptionalToken> {
        None
    }
}

impl Clone for BoxedToken {
    fn clone(&self) -> Self {
        self.clone_token()
    }
}

/// Returns `true` if `token` and every visible descendant can be enumerated.
pub fn is_enumerable_all(token: &dyn Token) -> bool {
    if !token.is_enumerable() {
        return false;
    }
    match token.as_list() {
        Some(list) => (0..list.len())
            .filter_map(|i| list.get(i).ok())
            .all(is_enumerable_all),
        None => true,
    }
}

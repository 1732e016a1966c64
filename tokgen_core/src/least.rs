use crate::config::ListSettings;
use crate::list::{
    InternalList, List, ListError, LogicalRemoval, OptionalToken, slice_get, slice_get_mut,
};
use crate::parser::ParserInput;
use crate::permutation::{check_index, saturating_pow};
use crate::token::{BoxedToken, PERMUTATIONS_SATURATED, Token, TokenError, TokenId};
use rand::Rng;
use rand_core::RngCore;

/// Default number of copies a [`Least`] may hold beyond its minimum.
///
/// Fuzzing and enumeration choose list lengths in `n..=n + max_extra`, which keeps
/// a single fuzz of a repetition bounded in time and memory.
pub const DEFAULT_MAX_EXTRA_REPEATS: usize = 16;

/// Largest ceiling configuration may set for copies beyond the minimum.
pub const MAX_EXTRA_REPEATS_LIMIT: usize = 4096;

/// A list holding at least `n` copies of a template token.
///
/// The template is only a pattern: it is never rendered. Every element of the list
/// is an independent deep clone of it. Replacing the template regenerates all
/// elements, so the list never holds copies of a stale template.
#[derive(Debug)]
pub struct Least {
    id: TokenId,
    n: usize,
    max_extra: usize,
    template: BoxedToken,
    value: Vec<BoxedToken>,
}

impl Least {
    /// A list of at least `n` copies of `template`, initially holding exactly `n`.
    pub fn new(template: BoxedToken, n: usize) -> Self {
        Self::with_max_extra(template, n, DEFAULT_MAX_EXTRA_REPEATS)
    }

    /// Like [`Least::new`] with an explicit ceiling on copies beyond `n`.
    pub fn with_max_extra(template: BoxedToken, n: usize, max_extra: usize) -> Self {
        let value = (0..n).map(|_| template.clone_token()).collect();

        Self {
            id: TokenId::next(),
            n,
            max_extra,
            template,
            value,
        }
    }

    /// Like [`Least::new`] taking the ceiling from configuration.
    pub fn from_settings(template: BoxedToken, n: usize, settings: &ListSettings) -> Self {
        Self::with_max_extra(template, n, settings.max_extra_repeats)
    }

    pub fn minimum(&self) -> usize {
        self.n
    }

    pub fn max_extra(&self) -> usize {
        self.max_extra
    }

    pub fn template(&self) -> &dyn Token {
        &*self.template
    }

    /// Replaces the elements with `len` fresh clones of the template.
    fn regenerate(&mut self, len: usize) {
        tracing::trace!(token = %self.id, len, "regenerating list elements");
        self.value = (0..len).map(|_| self.template.clone_token()).collect();
    }

    /// Number of lengths the list can take.
    fn lengths(&self) -> u64 {
        u64::try_from(self.max_extra)
            .map_or(PERMUTATIONS_SATURATED, |extra| extra.saturating_add(1))
    }

    /// Length selected by the 1-based local permutation `i`.
    fn length_of(&self, i: u64) -> Result<usize, TokenError> {
        usize::try_from(i - 1)
            .ok()
            .and_then(|extra| self.n.checked_add(extra))
            .ok_or_else(|| {
                TokenError::Internal(format!("list {} cannot hold {} extra copies", self.id, i - 1))
            })
    }
}

impl Clone for Least {
    fn clone(&self) -> Self {
        Self {
            id: TokenId::next(),
            n: self.n,
            max_extra: self.max_extra,
            template: self.template.clone_token(),
            value: self.value.iter().map(|token| token.clone_token()).collect(),
        }
    }
}

impl Token for Least {
    fn id(&self) -> TokenId {
        self.id
    }

    fn kind(&self) -> &'static str {
        "repetition"
    }

    fn clone_token(&self) -> BoxedToken {
        Box::new(self.clone())
    }

    fn fuzz(&mut self, rng: &mut dyn RngCore) {
        let extra = rng.random_range(0..=self.max_extra);
        self.regenerate(self.n.saturating_add(extra));
    }

    fn fuzz_all(&mut self, rng: &mut dyn RngCore) {
        self.fuzz(rng);

        for token in self.value.iter_mut() {
            token.fuzz_all(rng);
        }
    }

    /// Greedily matches fresh template copies until one fails or consumes nothing.
    ///
    /// Succeeds once at least `n` copies matched. Otherwise the failure of the first
    /// missing copy is reported and the list keeps its previous elements.
    fn parse(&mut self, input: &ParserInput<'_>, cur: usize) -> Result<usize, TokenError> {
        let mut parsed = Vec::new();
        let mut next = cur;

        loop {
            let mut token = self.template.clone_token();
            match token.parse(input, next) {
                Ok(end) if end > next => {
                    parsed.push(token);
                    next = end;
                }
                Ok(end) => {
                    // A zero-width match would repeat forever.
                    if parsed.len() < self.n {
                        parsed.push(token);
                        next = end;
                        continue;
                    }
                    break;
                }
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    if parsed.len() < self.n {
                        tracing::trace!(
                            token = %self.id,
                            matched = parsed.len(),
                            required = self.n,
                            "repetition matched too few copies"
                        );
                        return Err(err);
                    }
                    break;
                }
            }
        }

        self.value = parsed;
        Ok(next)
    }

    fn permutation(&mut self, i: u64) -> Result<(), TokenError> {
        check_index(i, self.permutations())?;
        let len = self.length_of(i)?;
        self.regenerate(len);
        Ok(())
    }

    /// One permutation per possible length.
    fn permutations(&self) -> u64 {
        self.lengths()
    }

    /// Sum over every possible length `k` of `t^k`, `t` being the template's
    /// `permutations_all`.
    fn permutations_all(&self) -> u64 {
        let t = self.template.permutations_all().max(1);
        if t == 1 {
            return self.lengths();
        }
        let n = u64::try_from(self.n).unwrap_or(u64::MAX);

        (0..self.lengths())
            .map(|extra| saturating_pow(t, n.saturating_add(extra)))
            .try_fold(0u64, |acc, block| acc.checked_add(block))
            .unwrap_or(PERMUTATIONS_SATURATED)
    }

    /// Decomposes `i` into a length block first and then one index per element.
    fn permutation_all(&mut self, i: u64) -> Result<(), TokenError> {
        check_index(i, self.permutations_all())?;

        let t = self.template.permutations_all().max(1);
        if t == 1 {
            self.permutation(i)?;
            for token in self.value.iter_mut() {
                token.permutation_all(1)?;
            }
            return Ok(());
        }

        let n = u64::try_from(self.n).unwrap_or(u64::MAX);
        let mut rest = i - 1;

        for local in 1..=self.lengths() {
            let block = saturating_pow(t, n.saturating_add(local - 1));
            if rest >= block {
                rest -= block;
                continue;
            }

            self.permutation(local)?;
            for token in self.value.iter_mut() {
                token.permutation_all(rest % t + 1)?;
                rest /= t;
            }
            return Ok(());
        }

        Err(TokenError::Internal(format!(
            "list {} has no length block for permutation {i}",
            self.id
        )))
    }

    fn render(&self) -> Result<String, TokenError> {
        let mut buffer = String::new();
        for token in &self.value {
            buffer.push_str(&token.render()?);
        }
        Ok(buffer)
    }

    fn is_enumerable(&self) -> bool {
        self.template.is_enumerable()
    }

    fn as_list(&self) -> Option<&dyn List> {
        Some(self)
    }

    fn as_list_mut(&mut self) -> Option<&mut dyn List> {
        Some(self)
    }

    fn as_internal_list(&self) -> Option<&dyn InternalList> {
        Some(self)
    }

    fn as_internal_list_mut(&mut self) -> Option<&mut dyn InternalList> {
        Some(self)
    }

    fn as_optional(&self) -> Option<&dyn OptionalToken> {
        Some(self)
    }

    fn as_optional_mut(&mut self) -> Option<&mut dyn OptionalToken> {
        Some(self)
    }
}

impl List for Least {
    fn get(&self, i: usize) -> Result<&dyn Token, ListError> {
        slice_get(&self.value, i)
    }

    fn get_mut(&mut self, i: usize) -> Result<&mut dyn Token, ListError> {
        slice_get_mut(&mut self.value, i)
    }

    fn len(&self) -> usize {
        self.value.len()
    }
}

impl InternalList for Least {
    fn internal_get(&self, i: usize) -> Result<&dyn Token, ListError> {
        if i != 0 {
            return Err(ListError::OutOfBounds { index: i, len: 1 });
        }
        Ok(&*self.template)
    }

    fn internal_get_mut(&mut self, i: usize) -> Result<&mut dyn Token, ListError> {
        if i != 0 {
            return Err(ListError::OutOfBounds { index: i, len: 1 });
        }
        Ok(&mut *self.template)
    }

    fn internal_len(&self) -> usize {
        1
    }

    fn internal_logical_remove(&mut self, id: TokenId) -> LogicalRemoval {
        if id == self.template.id() {
            return LogicalRemoval::Remove;
        }
        LogicalRemoval::Keep
    }

    fn internal_replace(&mut self, old: TokenId, new: BoxedToken) -> Option<BoxedToken> {
        if old != self.template.id() {
            return None;
        }

        let displaced = std::mem::replace(&mut self.template, new);
        self.regenerate(self.value.len());
        Some(displaced)
    }

    fn internal_refresh(&mut self) {
        self.regenerate(self.value.len());
    }
}

impl OptionalToken for Least {
    fn is_optional(&self) -> bool {
        self.n == 0
    }

    fn activate(&mut self) {
        if self.n > 0 {
            return;
        }
        self.regenerate(1);
    }

    fn deactivate(&mut self) {
        if self.n > 0 {
            return;
        }
        self.value.clear();
    }
}

use crate::parser::{ParseError, ParserInput};
use crate::permutation::{apply_product, check_index};
use crate::token::{BoxedToken, PERMUTATIONS_SATURATED, Token, TokenError, TokenId};
use rand::Rng;
use rand_core::RngCore;

/// An integer token holding one fixed value.
#[derive(Debug)]
pub struct ConstantInt {
    id: TokenId,
    value: i64,
}

impl ConstantInt {
    pub fn new(value: i64) -> Self {
        Self {
            id: TokenId::next(),
            value,
        }
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn set_value(&mut self, value: i64) {
        self.value = value;
    }
}

impl Clone for ConstantInt {
    fn clone(&self) -> Self {
        Self::new(self.value)
    }
}

impl Token for ConstantInt {
    fn id(&self) -> TokenId {
        self.id
    }

    fn kind(&self) -> &'static str {
        "constant integer"
    }

    fn clone_token(&self) -> BoxedToken {
        Box::new(self.clone())
    }

    fn fuzz(&mut self, _rng: &mut dyn RngCore) {}

    fn fuzz_all(&mut self, rng: &mut dyn RngCore) {
        self.fuzz(rng);
    }

    fn parse(&mut self, input: &ParserInput<'_>, cur: usize) -> Result<usize, TokenError> {
        let expected = self.value.to_string();
        let next = cur + expected.len();

        match input.slice(cur, next) {
            None => Err(ParseError::unexpected_eof(
                cur,
                format!("{expected:?}"),
                input.excerpt(cur, next),
            )
            .into()),
            Some(found) if found != expected.as_bytes() => Err(ParseError::unexpected_data(
                cur,
                format!("{expected:?}"),
                input.excerpt(cur, next),
            )
            .into()),
            Some(_) => Ok(next),
        }
    }

    fn permutation(&mut self, i: u64) -> Result<(), TokenError> {
        check_index(i, self.permutations())
    }

    fn permutations(&self) -> u64 {
        1
    }

    fn permutations_all(&self) -> u64 {
        self.permutations()
    }

    fn permutation_all(&mut self, i: u64) -> Result<(), TokenError> {
        apply_product(self, i)
    }

    fn render(&self) -> Result<String, TokenError> {
        Ok(self.value.to_string())
    }
}

/// An integer token drawing a fresh random value on every fuzz.
///
/// Random integers are fuzz-only: enumeration offers a single placeholder value
/// of 0 and [`Token::is_enumerable`] reports `false`.
#[derive(Debug)]
pub struct RandomInt {
    id: TokenId,
    value: i64,
}

impl RandomInt {
    pub fn new() -> Self {
        Self {
            id: TokenId::next(),
            value: 0,
        }
    }

    pub fn value(&self) -> i64 {
        self.value
    }
}

impl Default for RandomInt {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for RandomInt {
    fn clone(&self) -> Self {
        Self {
            id: TokenId::next(),
            value: self.value,
        }
    }
}

impl Token for RandomInt {
    fn id(&self) -> TokenId {
        self.id
    }

    fn kind(&self) -> &'static str {
        "random integer"
    }

    fn clone_token(&self) -> BoxedToken {
        Box::new(self.clone())
    }

    fn fuzz(&mut self, rng: &mut dyn RngCore) {
        self.value = rng.random_range(0..=i64::MAX);
    }

    fn fuzz_all(&mut self, rng: &mut dyn RngCore) {
        self.fuzz(rng);
    }

    /// Accepts the longest run of decimal digits that still fits the fuzz domain
    /// `0..=i64::MAX`.
    fn parse(&mut self, input: &ParserInput<'_>, cur: usize) -> Result<usize, TokenError> {
        const EXPECTED: &str = "non-negative integer";

        if cur >= input.len() {
            return Err(ParseError::unexpected_eof(cur, EXPECTED, "").into());
        }

        let (end, value) = scan_digits(input.data(), cur, i128::from(i64::MAX));
        match value.and_then(|v| i64::try_from(v).ok()) {
            Some(value) => {
                self.value = value;
                Ok(end)
            }
            None => {
                let found = input.excerpt(cur, cur + 1);
                Err(ParseError::unexpected_data(cur, EXPECTED, found).into())
            }
        }
    }

    fn permutation(&mut self, i: u64) -> Result<(), TokenError> {
        check_index(i, self.permutations())?;
        self.value = 0;
        Ok(())
    }

    fn permutations(&self) -> u64 {
        1
    }

    fn permutations_all(&self) -> u64 {
        self.permutations()
    }

    fn permutation_all(&mut self, i: u64) -> Result<(), TokenError> {
        apply_product(self, i)
    }

    fn render(&self) -> Result<String, TokenError> {
        Ok(self.value.to_string())
    }

    fn is_enumerable(&self) -> bool {
        false
    }
}

/// An integer token holding one value of `from..=to` reachable from `from` in steps of `step`.
///
/// For example the range 1 to 10 with step 2 holds 1, 3, 5, 7 and 9.
#[derive(Debug)]
pub struct RangeInt {
    id: TokenId,
    from: i64,
    to: i64,
    step: i64,

    value: i64,
}

impl RangeInt {
    /// A range with step 1.
    pub fn new(from: i64, to: i64) -> Result<Self, TokenError> {
        Self::with_step(from, to, 1)
    }

    pub fn with_step(from: i64, to: i64, step: i64) -> Result<Self, TokenError> {
        if from > to {
            return Err(TokenError::InvalidDefinition(format!(
                "range start {from} is greater than range end {to}"
            )));
        }
        if step < 1 {
            return Err(TokenError::InvalidDefinition(format!(
                "range step must be positive but is {step}"
            )));
        }

        Ok(Self {
            id: TokenId::next(),
            from,
            to,
            step,
            value: from,
        })
    }

    pub fn from(&self) -> i64 {
        self.from
    }

    pub fn to(&self) -> i64 {
        self.to
    }

    pub fn step(&self) -> i64 {
        self.step
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    fn expected(&self) -> String {
        format!(
            "integer in range {}-{} with step {}",
            self.from, self.to, self.step
        )
    }

    /// Sets the value to the `i`-th (0-based) element of the range.
    fn select(&mut self, i: u64) {
        let value = i128::from(self.from) + i128::from(i) * i128::from(self.step);
        // `i` is always below `permutations()`, so the value lies within `from..=to`.
        self.value = i64::try_from(value).unwrap_or(self.to);
    }
}

impl Clone for RangeInt {
    fn clone(&self) -> Self {
        Self {
            id: TokenId::next(),
            from: self.from,
            to: self.to,
            step: self.step,
            value: self.value,
        }
    }
}

impl Token for RangeInt {
    fn id(&self) -> TokenId {
        self.id
    }

    fn kind(&self) -> &'static str {
        "range integer"
    }

    fn clone_token(&self) -> BoxedToken {
        Box::new(self.clone())
    }

    fn fuzz(&mut self, rng: &mut dyn RngCore) {
        let i = rng.random_range(0..self.permutations());
        self.select(i);
    }

    fn fuzz_all(&mut self, rng: &mut dyn RngCore) {
        self.fuzz(rng);
    }

    /// Greedy digit scan that backs off digits pushing the magnitude past the bound.
    /// A leading `-` is accepted only when the range reaches below zero.
    fn parse(&mut self, input: &ParserInput<'_>, cur: usize) -> Result<usize, TokenError> {
        if cur >= input.len() {
            return Err(ParseError::unexpected_eof(cur, self.expected(), "").into());
        }

        let data = input.data();
        let (end, candidate) = if self.from < 0 && data.get(cur) == Some(&b'-') {
            let (end, magnitude) = scan_digits(data, cur + 1, -i128::from(self.from));
            (end, magnitude.map(|m| -m))
        } else {
            scan_digits(data, cur, i128::from(self.to))
        };

        let (from, to) = (i128::from(self.from), i128::from(self.to));
        let valid = candidate
            .filter(|&v| v >= from && v <= to && (v - from) % i128::from(self.step) == 0)
            .and_then(|v| i64::try_from(v).ok());

        match valid {
            Some(value) => {
                self.value = value;
                Ok(end)
            }
            None => {
                tracing::trace!(token = %self.id, cur, "range integer did not match");
                Err(ParseError::unexpected_data(
                    cur,
                    self.expected(),
                    input.excerpt(cur, end.max(cur + 1)),
                )
                .into())
            }
        }
    }

    fn permutation(&mut self, i: u64) -> Result<(), TokenError> {
        check_index(i, self.permutations())?;
        self.select(i - 1);
        Ok(())
    }

    fn permutations(&self) -> u64 {
        let span = (i128::from(self.to) - i128::from(self.from)) / i128::from(self.step) + 1;
        u64::try_from(span).unwrap_or(PERMUTATIONS_SATURATED)
    }

    fn permutations_all(&self) -> u64 {
        self.permutations()
    }

    fn permutation_all(&mut self, i: u64) -> Result<(), TokenError> {
        apply_product(self, i)
    }

    fn render(&self) -> Result<String, TokenError> {
        Ok(self.value.to_string())
    }
}

/// Scans consecutive decimal digits starting at `cur` and stops before the digit
/// that would push the value above `max`.
///
/// Returns the end of the accepted run and its value, `None` if no digit was accepted.
fn scan_digits(data: &[u8], cur: usize, max: i128) -> (usize, Option<i128>) {
    let mut end = cur;
    let mut value: Option<i128> = None;

    while let Some(&c) = data.get(end) {
        if !c.is_ascii_digit() {
            break;
        }
        let next = value.unwrap_or(0) * 10 + i128::from(c - b'0');
        if next > max {
            break;
        }
        value = Some(next);
        end += 1;
    }

    (end, value)
}

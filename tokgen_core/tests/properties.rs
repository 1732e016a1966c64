//! Property-based tests for token trees.
//!
//! Uses proptest to generate token parameters and verify invariants hold.

use proptest::prelude::*;
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;
use std::collections::HashSet;
use tokgen_core::{
    Arithmetic, BoxedToken, ConstantInt, InternalList, Least, List, ParseErrorKind, ParserInput,
    RangeInt, Token, TokenError, parse_complete,
};

/// Strategy for generating valid ranges as (from, to, step)
fn range_params() -> impl Strategy<Value = (i64, i64, i64)> {
    (-1_000i64..1_000, 0i64..500, 1i64..20).prop_map(|(from, span, step)| (from, from + span, step))
}

/// Strategy for generating repetition bounds as (minimum, max extra)
fn repetition_params() -> impl Strategy<Value = (usize, usize)> {
    (0usize..4, 0usize..6)
}

fn range_tree(from: i64, to: i64) -> BoxedToken {
    Box::new(RangeInt::new(from, to).expect("valid range"))
}

proptest! {
    /// Every permutation of a range lies within bounds, on the step grid, ascending
    #[test]
    fn range_permutations_stay_on_grid((from, to, step) in range_params()) {
        let mut token = RangeInt::with_step(from, to, step).unwrap();
        let permutations = token.permutations();
        prop_assert_eq!(permutations, u64::try_from((to - from) / step + 1).unwrap());

        let mut previous = None;
        for i in 1..=permutations {
            token.permutation(i).unwrap();
            let value = token.value();
            prop_assert!(value >= from && value <= to);
            prop_assert_eq!((value - from) % step, 0);
            if let Some(previous) = previous {
                prop_assert!(value > previous);
            }
            previous = Some(value);
        }
    }

    /// Out-of-range permutation indices fail and leave the value unchanged
    #[test]
    fn range_rejects_out_of_range_indices(
        (from, to, step) in range_params(),
        pick in any::<u64>(),
    ) {
        let mut token = RangeInt::with_step(from, to, step).unwrap();
        let permutations = token.permutations();
        token.permutation(pick % permutations + 1).unwrap();
        let before = token.value();

        let out_of_bounds = matches!(
            token.permutation(0),
            Err(TokenError::PermutationOutOfBounds { .. })
        );
        prop_assert!(out_of_bounds);
        prop_assert!(token.permutation(permutations + 1).is_err());
        prop_assert_eq!(token.value(), before);
    }

    /// Every value of a range, negative ones included, parses back from its rendering
    #[test]
    fn range_parse_roundtrip((from, to, step) in range_params(), pick in any::<u64>()) {
        let mut token = RangeInt::with_step(from, to, step).unwrap();
        token.permutation(pick % token.permutations() + 1).unwrap();
        let value = token.value();
        let text = token.render().unwrap();

        let mut parsed = RangeInt::with_step(from, to, step).unwrap();
        prop_assert_eq!(parsed.parse(&ParserInput::new(&text), 0).unwrap(), text.len());
        prop_assert_eq!(parsed.value(), value);
    }

    /// Fuzzing a clone never changes the original
    #[test]
    fn clones_are_independent(seed in any::<u64>(), (n, extra) in repetition_params()) {
        let original = Least::with_max_extra(
            Box::new(Arithmetic::add(range_tree(0, 1_000), range_tree(0, 1_000))),
            n,
            extra,
        );
        let before = original.render().unwrap();

        let mut copy = original.clone_token();
        prop_assert_ne!(copy.id(), original.id());
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        copy.fuzz_all(&mut rng);

        prop_assert_eq!(original.render().unwrap(), before);
        prop_assert_eq!(original.len(), n);
    }

    /// A constant parses exactly its own rendering
    #[test]
    fn constant_parse_roundtrip(value in any::<i64>()) {
        let mut token = ConstantInt::new(value);
        let text = token.render().unwrap();
        let input = ParserInput::new(&text);
        prop_assert_eq!(token.parse(&input, 0).unwrap(), text.len());
        prop_assert!(parse_complete(&mut token, &text).is_ok());
    }

    /// A truncated rendering fails with unexpected EOF
    #[test]
    fn constant_parse_truncated_is_eof(value in any::<i64>(), cut in any::<prop::sample::Index>()) {
        let mut token = ConstantInt::new(value);
        let text = token.render().unwrap();
        let prefix = &text[..cut.index(text.len())];

        match token.parse(&ParserInput::new(prefix), 0) {
            Err(TokenError::Parse(errors)) => {
                prop_assert_eq!(errors.first().kind, ParseErrorKind::UnexpectedEof);
            }
            other => prop_assert!(false, "expected EOF, got {:?}", other),
        }
    }

    /// A rendering with a different last digit fails with unexpected data
    #[test]
    fn constant_parse_mismatch_is_data_error(value in any::<i64>()) {
        let mut token = ConstantInt::new(value);
        let mut text = token.render().unwrap();
        let last = text.pop().and_then(|c| c.to_digit(10)).unwrap();
        text.push(char::from_digit((last + 1) % 10, 10).unwrap());

        match token.parse(&ParserInput::new(&text), 0) {
            Err(TokenError::Parse(errors)) => {
                prop_assert_eq!(errors.first().kind, ParseErrorKind::UnexpectedData);
                prop_assert_eq!(errors.first().position, 0);
            }
            other => prop_assert!(false, "expected data mismatch, got {:?}", other),
        }
    }

    /// Operators render the integer result and offer a single permutation
    #[test]
    fn arithmetic_renders_result(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
        let constant = |v: i64| -> BoxedToken { Box::new(ConstantInt::new(v)) };

        let sum = Arithmetic::add(constant(a), constant(b));
        prop_assert_eq!(sum.render().unwrap(), (a + b).to_string());
        prop_assert_eq!(sum.permutations(), 1);
        prop_assert_eq!(
            Arithmetic::sub(constant(a), constant(b)).render().unwrap(),
            (a - b).to_string()
        );
        prop_assert_eq!(
            Arithmetic::mul(constant(a), constant(b)).render().unwrap(),
            (a * b).to_string()
        );
        if b != 0 {
            prop_assert_eq!(
                Arithmetic::div(constant(a), constant(b)).render().unwrap(),
                (a / b).to_string()
            );
        }
    }

    /// Arithmetic over ranges enumerates the product of its operands
    #[test]
    fn arithmetic_permutations_multiply(x in 1i64..20, y in 1i64..20) {
        let token = Arithmetic::mul(range_tree(1, x), range_tree(1, y));
        prop_assert_eq!(token.permutations_all(), u64::try_from(x * y).unwrap());
    }

    /// A repetition never drops below its minimum and rebuilds on template replacement
    #[test]
    fn least_length_and_template_replacement(seed in any::<u64>(), value in any::<i64>()) {
        let mut list = Least::new(range_tree(0, 9), 2);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        list.fuzz(&mut rng);
        let len = list.len();
        prop_assert!(len >= 2);

        let template = list.internal_get(0).unwrap().id();
        list.internal_replace(template, Box::new(ConstantInt::new(value))).unwrap();
        prop_assert_eq!(list.len(), len);
        prop_assert_eq!(list.render().unwrap(), value.to_string().repeat(len));
    }

    /// Every global permutation of a repetition renders differently
    #[test]
    fn least_enumeration_is_exhaustive(t in 1i64..4, (n, extra) in repetition_params()) {
        let mut list = Least::with_max_extra(range_tree(0, t - 1), n, extra);
        let total = list.permutations_all();
        let expected: u64 = (n..=n + extra)
            .map(|k| u64::try_from(t).unwrap().pow(u32::try_from(k).unwrap()))
            .sum();
        prop_assert_eq!(total, expected);

        let mut seen = HashSet::new();
        for i in 1..=total {
            list.permutation_all(i).unwrap();
            let text = list.render().unwrap();
            prop_assert!(text.len() >= n && text.len() <= n + extra);
            prop_assert!(seen.insert(text));
        }
    }
}

pub mod arithmetic;
pub mod config;
pub mod generator;
pub mod least;
pub mod list;
pub mod mutation;
pub mod parser;
pub mod permutation;
pub mod primitives;
pub mod token;

pub use arithmetic::{Arithmetic, Operator};
pub use config::{GeneratorSettings, ListSettings, Strategy, TokgenConfig};
pub use generator::{Artifact, Generator};
pub use least::{DEFAULT_MAX_EXTRA_REPEATS, Least, MAX_EXTRA_REPEATS_LIMIT};
pub use list::{InternalList, List, ListError, LogicalRemoval, OptionalToken};
pub use parser::{ParseError, ParseErrorKind, ParseErrors, ParserInput, parse, parse_complete};
pub use primitives::{ConstantInt, RandomInt, RangeInt};
pub use token::{BoxedToken, PERMUTATIONS_SATURATED, Token, TokenError, TokenId, is_enumerable_all};

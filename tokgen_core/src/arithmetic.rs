use crate::list::{InternalList, List, ListError, LogicalRemoval};
use crate::parser::ParserInput;
use crate::permutation::{apply_product, check_index, permutations_all_of};
use crate::token::{BoxedToken, Token, TokenError, TokenId};
use rand_core::RngCore;
use std::fmt;

/// Binary integer operator of an [`Arithmetic`] token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    /// Integer division truncating toward zero.
    Div,
}

impl Operator {
    pub fn symbol(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Sub => '-',
            Operator::Mul => '*',
            Operator::Div => '/',
        }
    }

    /// Applies the operator with two's complement wrapping, `None` on division by zero.
    pub fn apply(self, a: i64, b: i64) -> Option<i64> {
        match self {
            Operator::Add => Some(a.wrapping_add(b)),
            Operator::Sub => Some(a.wrapping_sub(b)),
            Operator::Mul => Some(a.wrapping_mul(b)),
            Operator::Div if b == 0 => None,
            Operator::Div => Some(a.wrapping_div(b)),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A token rendering the result of an operator applied to two integer operands.
///
/// The operands' rendered text is parsed as `i64` at render time and combined with
/// wrapping arithmetic. Operands that do not render integers break the token's
/// contract, and so does division by zero: render then fails with
/// [`TokenError::Internal`].
#[derive(Debug)]
pub struct Arithmetic {
    id: TokenId,
    op: Operator,
    a: BoxedToken,
    b: BoxedToken,
}

impl Arithmetic {
    pub fn new(op: Operator, a: BoxedToken, b: BoxedToken) -> Self {
        Self {
            id: TokenId::next(),
            op,
            a,
            b,
        }
    }

    pub fn add(a: BoxedToken, b: BoxedToken) -> Self {
        Self::new(Operator::Add, a, b)
    }

    pub fn sub(a: BoxedToken, b: BoxedToken) -> Self {
        Self::new(Operator::Sub, a, b)
    }

    pub fn mul(a: BoxedToken, b: BoxedToken) -> Self {
        Self::new(Operator::Mul, a, b)
    }

    pub fn div(a: BoxedToken, b: BoxedToken) -> Self {
        Self::new(Operator::Div, a, b)
    }

    pub fn operator(&self) -> Operator {
        self.op
    }

    /// The integer value of the expression for the operands' current values.
    pub fn evaluate(&self) -> Result<i64, TokenError> {
        let a = operand_value(&*self.a)?;
        let b = operand_value(&*self.b)?;

        self.op.apply(a, b).ok_or_else(|| {
            TokenError::Internal(format!(
                "arithmetic {} cannot compute {a} {} {b}",
                self.id, self.op
            ))
        })
    }
}

fn operand_value(operand: &dyn Token) -> Result<i64, TokenError> {
    let text = operand.render()?;
    text.parse::<i64>().map_err(|e| {
        TokenError::Internal(format!(
            "operand {} ({}) rendered {text:?} which is not an integer: {e}",
            operand.id(),
            operand.kind()
        ))
    })
}

impl Clone for Arithmetic {
    fn clone(&self) -> Self {
        Self::new(self.op, self.a.clone_token(), self.b.clone_token())
    }
}

impl Token for Arithmetic {
    fn id(&self) -> TokenId {
        self.id
    }

    fn kind(&self) -> &'static str {
        "arithmetic"
    }

    fn clone_token(&self) -> BoxedToken {
        Box::new(self.clone())
    }

    fn fuzz(&mut self, _rng: &mut dyn RngCore) {}

    fn fuzz_all(&mut self, rng: &mut dyn RngCore) {
        self.fuzz(rng);

        self.a.fuzz_all(rng);
        self.b.fuzz_all(rng);
    }

    fn parse(&mut self, _input: &ParserInput<'_>, _cur: usize) -> Result<usize, TokenError> {
        Err(TokenError::NotImplemented {
            token: self.kind(),
            operation: "parse",
        })
    }

    fn permutation(&mut self, i: u64) -> Result<(), TokenError> {
        check_index(i, self.permutations())
    }

    fn permutations(&self) -> u64 {
        1
    }

    fn permutations_all(&self) -> u64 {
        permutations_all_of(self)
    }

    fn permutation_all(&mut self, i: u64) -> Result<(), TokenError> {
        apply_product(self, i)
    }

    fn render(&self) -> Result<String, TokenError> {
        Ok(self.evaluate()?.to_string())
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
}

impl List for Arithmetic {
    fn get(&self, i: usize) -> Result<&dyn Token, ListError> {
        match i {
            0 => Ok(&*self.a),
            1 => Ok(&*self.b),
            _ => Err(ListError::OutOfBounds { index: i, len: 2 }),
        }
    }

    fn get_mut(&mut self, i: usize) -> Result<&mut dyn Token, ListError> {
        match i {
            0 => Ok(&mut *self.a),
            1 => Ok(&mut *self.b),
            _ => Err(ListError::OutOfBounds { index: i, len: 2 }),
        }
    }

    fn len(&self) -> usize {
        2
    }
}

impl InternalList for Arithmetic {
    fn internal_get(&self, i: usize) -> Result<&dyn Token, ListError> {
        self.get(i)
    }

    fn internal_get_mut(&mut self, i: usize) -> Result<&mut dyn Token, ListError> {
        self.get_mut(i)
    }

    fn internal_len(&self) -> usize {
        self.len()
    }

    /// An expression without one of its operands is meaningless, so removing an
    /// operand removes the whole expression.
    fn internal_logical_remove(&mut self, id: TokenId) -> LogicalRemoval {
        if id == self.a.id() || id == self.b.id() {
            return LogicalRemoval::Remove;
        }
        LogicalRemoval::Keep
    }

    fn internal_replace(&mut self, old: TokenId, new: BoxedToken) -> Option<BoxedToken> {
        if old == self.a.id() {
            return Some(std::mem::replace(&mut self.a, new));
        }
        if old == self.b.id() {
            return Some(std::mem::replace(&mut self.b, new));
        }
        None
    }
}

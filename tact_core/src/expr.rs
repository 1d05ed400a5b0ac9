//! Elaborated expression trees attached to the document model.
//!
//! The front end lowers concrete syntax into these trees before handing
//! them over; the document stores them opaquely on guards, invariants,
//! labels, initializers and priorities. The only structural knowledge the
//! document itself needs is *symbol occurrence*, for function dependency
//! sets and for the restricted-argument check of partial instantiation.

use crate::scope::{Frame, Symbol};
use ordered_float::OrderedFloat;

/// Constant values occurring in expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Val {
    /// Boolean constant.
    Bool(bool),
    /// Integer constant.
    Int(i32),
    /// Double constant (exponential rates, probability weights).
    Double(OrderedFloat<f64>),
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnOp {
    /// Logical negation.
    Not,
    /// Arithmetic negation.
    Neg,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum BinOp {
    And,
    Or,
    Imply,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Assign,
}

/// An elaborated expression over already-resolved symbols.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    /// A constant value.
    Const(Val),
    /// A symbol occurrence (variable, parameter, channel, process).
    Var(Symbol),
    /// A unary operation.
    Unary(UnOp, Box<Expr>),
    /// A binary operation.
    Binary(BinOp, Box<(Expr, Expr)>),
    /// A call of an already-resolved function symbol.
    Call(Symbol, Vec<Expr>),
    /// An array subscript.
    Index(Box<(Expr, Expr)>),
}

impl Expr {
    /// Calls `f` for every symbol occurring in the expression.
    pub fn for_each_symbol(&self, f: &mut dyn FnMut(Symbol)) {
        match self {
            Expr::Const(_) => {}
            Expr::Var(symbol) => f(*symbol),
            Expr::Unary(_, expr) => expr.for_each_symbol(f),
            Expr::Binary(_, operands) | Expr::Index(operands) => {
                operands.0.for_each_symbol(f);
                operands.1.for_each_symbol(f);
            }
            Expr::Call(callee, arguments) => {
                f(*callee);
                for argument in arguments {
                    argument.for_each_symbol(f);
                }
            }
        }
    }

    /// True if any symbol satisfying `is_free` occurs in the expression.
    pub fn depends_on(&self, is_free: &dyn Fn(Symbol) -> bool) -> bool {
        match self {
            Expr::Const(_) => false,
            Expr::Var(symbol) => is_free(*symbol),
            Expr::Unary(_, expr) => expr.depends_on(is_free),
            Expr::Binary(_, operands) | Expr::Index(operands) => {
                operands.0.depends_on(is_free) || operands.1.depends_on(is_free)
            }
            Expr::Call(callee, arguments) => {
                is_free(*callee) || arguments.iter().any(|a| a.depends_on(is_free))
            }
        }
    }
}

impl From<bool> for Expr {
    fn from(value: bool) -> Self {
        Expr::Const(Val::Bool(value))
    }
}

impl From<i32> for Expr {
    fn from(value: i32) -> Self {
        Expr::Const(Val::Int(value))
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::Const(Val::Double(OrderedFloat(value)))
    }
}

/// One statement of a function body.
///
/// The statement language proper belongs to the front end; the document
/// keeps the elaborated skeleton it is handed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// Expression statement, including assignments.
    Expr(Expr),
    /// Nested block with its own frame of locals.
    Block(BlockStatement),
    /// Return statement.
    Return(Option<Expr>),
}

/// A block of statements with its frame of local symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockStatement {
    /// Frame of the block's local symbols.
    pub frame: Frame,
    /// Statements in source order.
    pub statements: Vec<Statement>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;
    use crate::scope::{SymbolTable, TypeRef};

    #[test]
    fn symbol_occurrence() {
        let mut table = SymbolTable::new();
        let frame = table.new_frame(None);
        let x = table.new_symbol(frame, "x", TypeRef::UNTYPED, Position::default());
        let y = table.new_symbol(frame, "y", TypeRef::UNTYPED, Position::default());
        let expr = Expr::Binary(
            BinOp::Lt,
            Box::new((Expr::Var(x), Expr::Binary(BinOp::Add, Box::new((Expr::Var(y), Expr::from(1)))))),
        );
        let mut seen = Vec::new();
        expr.for_each_symbol(&mut |s| seen.push(s));
        assert_eq!(seen, vec![x, y]);
        assert!(expr.depends_on(&|s| s == y));
        assert!(!Expr::from(3).depends_on(&|_| true));
    }
}

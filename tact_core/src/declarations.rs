//! Declaration blocks attached to scopes: variables, functions, progress
//! measures, I/O declarations and Gantt charts.
//!
//! A [`Declarations`] block hangs off the global scope, off each template,
//! and (for locals) off each function body. Blocks are bags: entries keep
//! their registration order and are only ever appended, so references into
//! them stay valid.

use crate::expr::{BlockStatement, Expr};
use crate::position::Position;
use crate::scope::{Frame, Symbol};
use std::collections::HashSet;

/// A variable declaration: its symbol and optional initializer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    /// The symbol of the variable.
    pub uid: Symbol,
    /// The initializer, when the declaration carries one.
    pub init: Option<Expr>,
}

/// A function declaration.
///
/// `changes` and `depends` are filled in by the type checker for
/// dependency analysis; the document only stores them.
#[derive(Debug, Clone)]
pub struct Function {
    /// The symbol of the function.
    pub uid: Symbol,
    /// Variables changed by this function.
    pub changes: HashSet<Symbol>,
    /// Variables the function depends on.
    pub depends: HashSet<Symbol>,
    /// Local variables, in declaration order.
    pub variables: Vec<Variable>,
    /// The function body, once the front end has elaborated it.
    pub body: Option<BlockStatement>,
    /// Source position of the body.
    pub body_position: Position,
}

/// A progress measure: an optional guard and the measured expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    /// Guard under which the measure applies.
    pub guard: Option<Expr>,
    /// The measured expression.
    pub measure: Expr,
}

/// An I/O declaration for an instance: its parameters plus input, output
/// and CSP event lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IoDecl {
    /// Name of the instance the declaration belongs to.
    pub instance_name: String,
    /// Parameter expressions.
    pub param: Vec<Expr>,
    /// Input channel expressions.
    pub inputs: Vec<Expr>,
    /// Output channel expressions.
    pub outputs: Vec<Expr>,
    /// CSP event expressions.
    pub csp: Vec<Expr>,
}

/// One expandable bool-to-int mapping of a Gantt chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GanttMap {
    /// Select parameters the mapping ranges over.
    pub parameters: Frame,
    /// The predicate selecting when the mapping applies.
    pub predicate: Expr,
    /// The mapped integer expression.
    pub mapping: Expr,
}

/// A Gantt chart declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gantt {
    /// The chart name.
    pub name: String,
    /// The select parameters.
    pub parameters: Frame,
    /// The chart's mappings, in declaration order.
    pub mapping: Vec<GanttMap>,
}

impl Gantt {
    /// Creates an empty chart.
    pub fn new(name: impl Into<String>, parameters: Frame) -> Self {
        Gantt {
            name: name.into(),
            parameters,
            mapping: Vec::new(),
        }
    }
}

/// Declarations attached to one scope: the global scope, a template, or a
/// function body.
#[derive(Debug, Clone)]
pub struct Declarations {
    /// The scope's frame.
    pub frame: Frame,
    /// Variables, in declaration order.
    pub variables: Vec<Variable>,
    /// Functions, in declaration order.
    pub functions: Vec<Function>,
    /// Progress measures.
    pub progress: Vec<Progress>,
    /// I/O declarations.
    pub io_decls: Vec<IoDecl>,
    /// Gantt chart declarations.
    pub gantt_charts: Vec<Gantt>,
    /// Type declarations registered in this scope.
    pub typedefs: Vec<Symbol>,
}

impl Declarations {
    pub(crate) fn new(frame: Frame) -> Self {
        Declarations {
            frame,
            variables: Vec::new(),
            functions: Vec::new(),
            progress: Vec::new(),
            io_decls: Vec::new(),
            gantt_charts: Vec::new(),
            typedefs: Vec::new(),
        }
    }

    /// Looks up a declared variable by its symbol.
    pub fn variable(&self, uid: Symbol) -> Option<&Variable> {
        self.variables.iter().find(|v| v.uid == uid)
    }

    /// Looks up a declared function by its symbol.
    pub fn function(&self, uid: Symbol) -> Option<&Function> {
        self.functions.iter().find(|f| f.uid == uid)
    }

    /// Mutable lookup of a declared function by its symbol.
    pub fn function_mut(&mut self, uid: Symbol) -> Option<&mut Function> {
        self.functions.iter_mut().find(|f| f.uid == uid)
    }
}

//! Parameterized template instantiation.
//!
//! A template may be specialized step by step: each step binds argument
//! expressions to some of the still-unbound parameters and may introduce
//! new formal parameters of its own. Partial instances are not represented
//! hierarchically: every step merges the whole parameter history into one
//! flat [`Instance`], so downstream consumers never chase specialization
//! chains. A template is the trivial instance of itself (zero arguments,
//! all parameters unbound), which lets specialization recurse uniformly
//! over templates and already-partial instances.

use crate::automaton::TemplateId;
use crate::document::ModelError;
use crate::expr::Expr;
use crate::scope::{Frame, Symbol, SymbolTable};
use std::collections::{HashMap, HashSet};

/// An indexing object for ordinary (process-building) instances of a
/// document.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct InstanceId(pub(crate) u32);

impl InstanceId {
    /// Position in the document's instance list.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// An indexing object for LSC scenario instances of a document. Scenario
/// instances live in their own collection and are never conflated with
/// ordinary processes.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct LscInstanceId(pub(crate) u32);

impl LscInstanceId {
    /// Position in the document's LSC instance list.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A (possibly partial) instance of a template.
///
/// `parameters` holds both bound and unbound symbols, unbound ones first:
/// the leading `unbound` symbols are the instance's own free parameters,
/// everything after them has an entry in `mapping`. `arguments` counts how
/// many bindings this specialization step supplied itself; the first
/// `arguments` symbols of the bound section are exactly those.
///
/// `restricted` collects the symbols used, directly or transitively, in
/// array-size computations. Arguments substituted for restricted
/// parameters must not depend on free process parameters; the bookkeeping
/// lives here, the full semantic check with the type checker.
#[derive(Debug, Clone)]
pub struct Instance {
    /// The symbol naming the instance.
    pub uid: Symbol,
    /// The merged parameter frame, unbound parameters first.
    pub parameters: Frame,
    /// Bindings of bound parameters to argument expressions.
    pub mapping: HashMap<Symbol, Expr>,
    /// Number of parameters bound by this specialization step.
    pub arguments: usize,
    /// Number of unbound parameters.
    pub unbound: usize,
    /// The template this instance originates from.
    pub template: Option<TemplateId>,
    /// Restricted symbols (array-size dependencies).
    pub restricted: HashSet<Symbol>,
}

impl Instance {
    /// The trivial, fully-unbound self-instance of a template.
    pub(crate) fn trivial(
        uid: Symbol,
        parameters: Frame,
        parameter_count: usize,
        template: Option<TemplateId>,
    ) -> Self {
        Instance {
            uid,
            parameters,
            mapping: HashMap::new(),
            arguments: 0,
            unbound: parameter_count,
            template,
            restricted: HashSet::new(),
        }
    }

    /// True if every parameter is bound.
    pub fn is_complete(&self) -> bool {
        self.unbound == 0
    }

    /// Specializes `base` by binding `arguments` to its leading unbound
    /// parameters and introducing the formals of `new_params`.
    ///
    /// The merged parameter frame is laid out as: base's still-unbound
    /// parameters in their original order, then the newly introduced
    /// formals (both sections unbound), then the freshly bound parameters,
    /// then the bound parameters inherited from `base`.
    pub(crate) fn specialize(
        table: &mut SymbolTable,
        uid: Symbol,
        base: &Instance,
        new_params: Frame,
        arguments: &[Expr],
    ) -> Result<Instance, ModelError> {
        let supplied = arguments.len();
        if supplied > base.unbound {
            return Err(ModelError::ArityMismatch {
                supplied,
                unbound: base.unbound,
            });
        }
        let base_params = table.symbols(base.parameters).to_vec();
        let new_formals = table.symbols(new_params).to_vec();

        // Free parameters of the resulting instance; restricted arguments
        // must be closed over everything else.
        let mut free: HashSet<Symbol> = base_params[supplied..base.unbound].iter().copied().collect();
        free.extend(new_formals.iter().copied());

        let mut mapping = base.mapping.clone();
        let mut restricted = base.restricted.clone();
        for (i, argument) in arguments.iter().enumerate() {
            let parameter = base_params[i];
            if base.restricted.contains(&parameter) {
                if argument.depends_on(&|s| free.contains(&s)) {
                    return Err(ModelError::RestrictedArgument {
                        parameter: table.name(parameter).to_string(),
                    });
                }
                argument.for_each_symbol(&mut |s| {
                    restricted.insert(s);
                });
            }
            mapping.insert(parameter, argument.clone());
        }

        let parent = table.parent(base.parameters);
        let frame = table.new_frame(parent);
        for &symbol in base_params[supplied..base.unbound]
            .iter()
            .chain(new_formals.iter())
            .chain(base_params[..supplied].iter())
            .chain(base_params[base.unbound..].iter())
        {
            table.push(frame, symbol);
        }

        Ok(Instance {
            uid,
            parameters: frame,
            mapping,
            arguments: supplied,
            unbound: base.unbound - supplied + new_formals.len(),
            template: base.template,
            restricted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;
    use crate::scope::TypeRef;

    fn frame_of(table: &mut SymbolTable, names: &[&str]) -> Frame {
        let frame = table.new_frame(None);
        for name in names {
            table.new_symbol(frame, name, TypeRef::UNTYPED, Position::default());
        }
        frame
    }

    #[test]
    fn unbound_prefix_is_preserved() -> Result<(), ModelError> {
        let mut table = SymbolTable::new();
        let global = table.new_frame(None);
        let params = frame_of(&mut table, &["a", "b", "c"]);
        let uid = table.new_symbol(global, "P", TypeRef::UNTYPED, Position::default());
        let base = Instance::trivial(uid, params, 3, None);

        let fresh = frame_of(&mut table, &["d"]);
        let spec = Instance::specialize(&mut table, uid, &base, fresh, &[Expr::from(1)])?;

        assert_eq!(spec.arguments, 1);
        assert_eq!(spec.unbound, 3);
        let merged = table.symbols(spec.parameters).to_vec();
        let names: Vec<&str> = merged.iter().map(|&s| table.name(s)).collect();
        // Still-unbound (b, c), new formal (d), then the bound a.
        assert_eq!(names, vec!["b", "c", "d", "a"]);
        Ok(())
    }

    #[test]
    fn overapplication_is_rejected() {
        let mut table = SymbolTable::new();
        let global = table.new_frame(None);
        let params = frame_of(&mut table, &["a"]);
        let uid = table.new_symbol(global, "P", TypeRef::UNTYPED, Position::default());
        let base = Instance::trivial(uid, params, 1, None);
        let empty = table.new_frame(None);
        let result = Instance::specialize(
            &mut table,
            uid,
            &base,
            empty,
            &[Expr::from(1), Expr::from(2)],
        );
        assert!(matches!(
            result,
            Err(ModelError::ArityMismatch {
                supplied: 2,
                unbound: 1
            })
        ));
    }
}

//! Templates and their timed-automaton structure.
//!
//! A template's automaton is a directed multigraph of [`Location`]s and
//! [`Branchpoint`]s connected by [`Edge`]s. The graph is append-only
//! during construction: elements are handed out as ordinal index handles
//! ([`LocationId`], [`BranchpointId`], [`EdgeId`]) that stay valid for the
//! document's lifetime, and no element is ever removed. Edge endpoints are
//! resolved from symbols through the entity binding recorded in the symbol
//! table, so an edge always refers to exactly one location or branchpoint
//! per side.
//!
//! LSC templates reuse the same structure but populate the scenario
//! collections (instance lines, messages, conditions, updates) instead of
//! the automaton graph; the scenario operations live in [`crate::lsc`].

use crate::declarations::Declarations;
use crate::document::ModelError;
use crate::expr::Expr;
use crate::instance::Instance;
use crate::lsc::{Condition, InstanceLine, Message, Update};
use crate::position::Position;
use crate::scope::{Frame, Symbol, SymbolData, SymbolTable, TypeRef};
use smallvec::SmallVec;

/// An indexing object for templates of a document.
///
/// These cannot be directly created or manipulated,
/// but have to be generated and/or provided by a
/// [`Document`](crate::document::Document).
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct TemplateId(pub(crate) u32);

impl TemplateId {
    /// Position in the document's template list.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// An indexing object for locations within one template, equal to the
/// location's ordinal.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct LocationId(pub(crate) u32);

impl LocationId {
    /// Position in the owning template's location list.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// An indexing object for branchpoints within one template. Branchpoints
/// have their own index space, separate from locations.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct BranchpointId(pub(crate) u32);

impl BranchpointId {
    /// Position in the owning template's branchpoint list.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// An indexing object for edges within one template, equal to the edge's
/// source-order ordinal.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct EdgeId(pub(crate) u32);

impl EdgeId {
    /// Position in the owning template's edge list.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A control location of a timed automaton.
#[derive(Debug, Clone)]
pub struct Location {
    /// The symbol of the location.
    pub uid: Symbol,
    /// The location name with its position, when the input carried one.
    pub name: Option<Expr>,
    /// The invariant.
    pub invariant: Option<Expr>,
    /// Exponential rate controlling the speed of leaving the location.
    pub exp_rate: Option<Expr>,
    /// Cost rate/derivative expression.
    pub cost_rate: Option<Expr>,
    /// Ordinal in the owning template.
    pub nr: u32,
}

/// A location-like routing point with no invariant.
///
/// Branchpoints allow several edges to share a source, guard and
/// synchronisation; they are flattened into plain edges by later passes
/// and are not part of a compiled model.
#[derive(Debug, Clone)]
pub struct Branchpoint {
    /// The symbol of the branchpoint.
    pub uid: Symbol,
    /// Ordinal in the owning template.
    pub nr: u32,
}

/// An edge endpoint: a location or a branchpoint of the same template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// The endpoint is a location.
    Location(LocationId),
    /// The endpoint is a branchpoint.
    Branchpoint(BranchpointId),
}

/// An edge of the automaton graph.
#[derive(Debug, Clone)]
pub struct Edge {
    /// Placement in the input file.
    pub nr: u32,
    /// Controllable (`true`) or uncontrollable (`false`).
    pub control: bool,
    /// Optional action name.
    pub action_name: Option<String>,
    /// Source endpoint.
    pub src: Endpoint,
    /// Destination endpoint.
    pub dst: Endpoint,
    /// Frame of the non-deterministic select parameters.
    pub select: Option<Frame>,
    /// The guard.
    pub guard: Option<Expr>,
    /// The assignment.
    pub assign: Option<Expr>,
    /// The synchronisation.
    pub sync: Option<Expr>,
    /// Probability weight for probabilistic edges.
    pub prob: Option<Expr>,
    /// The concrete select values, once expanded.
    pub select_values: SmallVec<[i32; 4]>,
}

/// A template definition: a trivial self-instance plus declarations plus
/// its automaton graph, or, for LSC templates, its scenario structures.
#[derive(Debug, Clone)]
pub struct Template {
    /// The template as the trivial instance of itself: zero arguments, all
    /// parameters unbound.
    pub instance: Instance,
    /// The template's declarations.
    pub declarations: Declarations,
    /// The initial location symbol.
    pub init: Option<Symbol>,
    /// Locations, ordinal order.
    pub locations: Vec<Location>,
    /// Branchpoints, ordinal order.
    pub branchpoints: Vec<Branchpoint>,
    /// Edges, source order.
    pub edges: Vec<Edge>,
    /// Expressions evaluated on dynamic (spawn-time) instantiation.
    pub dynamic_evals: Vec<Expr>,
    /// True for timed-automaton templates, false for LSC templates.
    pub is_ta: bool,
    /// True once the template is used by some process.
    pub is_instantiated: bool,
    /// True once the template body has been seen.
    pub is_defined: bool,
    /// LSC instance lines, ordinal order.
    pub instance_lines: Vec<InstanceLine>,
    /// LSC messages, input order.
    pub messages: Vec<Message>,
    /// LSC conditions, input order.
    pub conditions: Vec<Condition>,
    /// LSC updates, input order.
    pub updates: Vec<Update>,
    /// LSC chart classification from the input ("invariant", "existential", ...).
    pub lsc_type: String,
    /// LSC chart mode from the input.
    pub mode: String,
    /// True if the chart has a prechart section.
    pub has_prechart: bool,
    /// True for runtime-instantiated (spawnable) templates.
    pub dynamic: bool,
    /// Position in the document's dynamic-template order.
    pub dyn_index: usize,
}

impl Template {
    pub(crate) fn new(
        instance: Instance,
        declarations: Declarations,
        is_ta: bool,
        lsc_type: &str,
        mode: &str,
    ) -> Self {
        Template {
            instance,
            declarations,
            init: None,
            locations: Vec::new(),
            branchpoints: Vec::new(),
            edges: Vec::new(),
            dynamic_evals: Vec::new(),
            is_ta,
            is_instantiated: false,
            is_defined: false,
            instance_lines: Vec::new(),
            messages: Vec::new(),
            conditions: Vec::new(),
            updates: Vec::new(),
            lsc_type: lsc_type.to_string(),
            mode: mode.to_string(),
            has_prechart: false,
            dynamic: false,
            dyn_index: 0,
        }
    }

    /// The symbol naming the template.
    pub fn uid(&self) -> Symbol {
        self.instance.uid
    }

    pub(crate) fn add_location(
        &mut self,
        table: &mut SymbolTable,
        name: &str,
        invariant: Option<Expr>,
        exp_rate: Option<Expr>,
        position: Position,
    ) -> Result<LocationId, ModelError> {
        if table.contains(self.declarations.frame, name) {
            return Err(ModelError::DuplicateDefinition {
                name: name.to_string(),
            });
        }
        let nr = self.locations.len() as u32;
        let uid = table.new_symbol(self.declarations.frame, name, TypeRef::UNTYPED, position);
        table.set_data(uid, SymbolData::Location(nr));
        self.locations.push(Location {
            uid,
            name: None,
            invariant,
            exp_rate,
            cost_rate: None,
            nr,
        });
        Ok(LocationId(nr))
    }

    pub(crate) fn add_branchpoint(
        &mut self,
        table: &mut SymbolTable,
        name: &str,
        position: Position,
    ) -> Result<BranchpointId, ModelError> {
        if table.contains(self.declarations.frame, name) {
            return Err(ModelError::DuplicateDefinition {
                name: name.to_string(),
            });
        }
        let nr = self.branchpoints.len() as u32;
        let uid = table.new_symbol(self.declarations.frame, name, TypeRef::UNTYPED, position);
        table.set_data(uid, SymbolData::Branchpoint(nr));
        self.branchpoints.push(Branchpoint { uid, nr });
        Ok(BranchpointId(nr))
    }

    pub(crate) fn resolve_endpoint(
        &self,
        table: &SymbolTable,
        symbol: Symbol,
    ) -> Result<Endpoint, ModelError> {
        match table.data(symbol) {
            SymbolData::Location(nr) if (nr as usize) < self.locations.len() => {
                Ok(Endpoint::Location(LocationId(nr)))
            }
            SymbolData::Branchpoint(nr) if (nr as usize) < self.branchpoints.len() => {
                Ok(Endpoint::Branchpoint(BranchpointId(nr)))
            }
            _ => Err(ModelError::UnknownEndpoint {
                name: table.name(symbol).to_string(),
            }),
        }
    }

    pub(crate) fn push_edge(
        &mut self,
        src: Endpoint,
        dst: Endpoint,
        control: bool,
        action_name: Option<String>,
    ) -> EdgeId {
        let nr = self.edges.len() as u32;
        self.edges.push(Edge {
            nr,
            control,
            action_name,
            src,
            dst,
            select: None,
            guard: None,
            assign: None,
            sync: None,
            prob: None,
            select_values: SmallVec::new(),
        });
        EdgeId(nr)
    }

    /// The location behind a handle.
    pub fn location(&self, id: LocationId) -> &Location {
        &self.locations[id.index()]
    }

    /// The branchpoint behind a handle.
    pub fn branchpoint(&self, id: BranchpointId) -> &Branchpoint {
        &self.branchpoints[id.index()]
    }

    /// The edge behind a handle.
    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.index()]
    }

    /// Mutable access to an edge, for the front end to attach guard,
    /// assignment, synchronisation and select data.
    pub fn edge_mut(&mut self, id: EdgeId) -> &mut Edge {
        &mut self.edges[id.index()]
    }

    /// Registers an expression evaluated on dynamic instantiation and
    /// returns its index.
    pub fn add_dynamic_eval(&mut self, expr: Expr) -> usize {
        self.dynamic_evals.push(expr);
        self.dynamic_evals.len() - 1
    }

    /// True for LSC templates whose chart is a universal invariant.
    pub fn is_invariant(&self) -> bool {
        self.lsc_type == "invariant"
    }
}

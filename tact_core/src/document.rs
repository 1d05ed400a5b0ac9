//! The document: owner of every entity of the model.
//!
//! Entities are created exclusively through [`Document`] operations, never
//! constructed by callers, so storage stability, frame linkage and ordinal
//! assignment are enforced in one place. The front end drives construction
//! with ordered mutation calls; once it is done, the type checker walks
//! the document through [`Document::accept`] and later consumers read the
//! finished graph.
//!
//! Construction errors degrade gracefully: a failing operation records a
//! diagnostic on the document *and* returns the error, so a single pass
//! over a malformed input can surface many independent problems. The
//! diagnostics themselves never abort anything.
//!
//! ```
//! # use tact_core::document::Document;
//! # use tact_core::Position;
//! let mut doc = Document::new();
//!
//! // The front end supplies the parameter frame, empty here
//! let params = doc.symbols_mut().new_frame(None);
//! let tpl = doc
//!     .add_template("Train", params, Position::default(), true, "", "")
//!     .expect("the name is fresh");
//!
//! // Grow the automaton graph through document operations
//! let gate = doc
//!     .add_location(tpl, "Gate", None, None, Position::default())
//!     .expect("the name is fresh");
//! let gate_uid = doc.template(tpl).location(gate).uid;
//! doc.add_edge(tpl, gate_uid, gate_uid, true, None)
//!     .expect("both endpoints resolve");
//!
//! assert_eq!(doc.template(tpl).edges.len(), 1);
//! assert!(!doc.has_errors());
//! ```

use crate::automaton::{Edge, EdgeId, LocationId, BranchpointId, Template, TemplateId};
use crate::declarations::{Declarations, Function, Gantt, IoDecl, Progress, Variable};
use crate::expr::{BlockStatement, Expr};
use crate::instance::{Instance, InstanceId, LscInstanceId};
use crate::lsc::{Condition, InstanceLineId, Message, Update};
use crate::position::{Diagnostic, Diagnostics, Position, PositionIndex, SourceLine};
use crate::query::{ModelOption, Query};
use crate::scope::{Frame, Symbol, SymbolData, SymbolTable, TypeRef};
use hashbrown::HashMap;
use log::debug;
use serde::Serialize;
use smallvec::SmallVec;
use std::cell::Ref;
use std::sync::Arc;
use thiserror::Error;

/// The analysis methods applicable to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SupportedMethods {
    /// Symbolic (zone-based) analysis applies.
    pub symbolic: bool,
    /// Stochastic (statistical) analysis applies.
    pub stochastic: bool,
    /// Concrete-state analysis applies.
    pub concrete: bool,
}

impl Default for SupportedMethods {
    fn default() -> Self {
        SupportedMethods {
            symbolic: true,
            stochastic: true,
            concrete: true,
        }
    }
}

/// Separator between channel expressions of a priority declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChanSeparator {
    /// The next expression has the same priority.
    Comma,
    /// The next expression has strictly higher priority.
    Chevron,
}

/// One channel-priority declaration: a head expression followed by
/// separator/expression pairs, ordering synchronizations including the
/// default (tau) priority.
#[derive(Debug, Clone)]
pub struct ChanPriority {
    /// First expression of the declaration.
    pub head: Expr,
    /// Remaining expressions with their separators, in declaration order.
    pub tail: Vec<(ChanSeparator, Expr)>,
}

/// A registered dynamic library. Loading is the host's concern; the
/// document only keeps the registration order.
#[derive(Debug, Clone)]
pub struct Library {
    path: String,
}

impl Library {
    /// Registers a library by path.
    pub fn new(path: impl Into<String>) -> Self {
        Library { path: path.into() }
    }

    /// The library path.
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Facts recorded about the document while it is being built.
///
/// Recording is monotonic: a fact summarizes something discovered anywhere
/// in the model and is never unrecorded during a construction pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentFacts {
    /// Some channel or process priority is declared.
    pub has_priorities: bool,
    /// Some invariant uses a strict bound.
    pub has_strict_invariants: bool,
    /// Some clock is stopped.
    pub stops_clock: bool,
    /// Some controllable edge carries a guard with a strict lower bound.
    pub has_strict_lower_bound_on_controllable: bool,
    /// Some broadcast receiver carries a clock guard.
    pub has_guard_on_broadcast_receive: bool,
    /// Some transition is urgent.
    pub has_urgent_transitions: bool,
    /// Synchronization usage counter, maintained by the type checker.
    pub sync_used: i32,
}

/// The error type for document construction operations.
///
/// Every failing operation also records a [`Diagnostic`] on the document,
/// so the front end can keep building a best-effort document and report
/// all problems at the end.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelError {
    /// An edge endpoint symbol names neither a location nor a branchpoint
    /// of the template.
    #[error("`{name}` does not name a location or branchpoint")]
    UnknownEndpoint {
        /// Name of the offending symbol.
        name: String,
    },
    /// An LSC event anchor does not name an instance line of the template.
    #[error("`{name}` does not name an instance line")]
    UnknownInstanceLine {
        /// Name of the offending symbol.
        name: String,
    },
    /// More arguments were supplied than the base instance has unbound
    /// parameters.
    #[error("{supplied} arguments supplied but only {unbound} parameters are unbound")]
    ArityMismatch {
        /// Number of supplied arguments.
        supplied: usize,
        /// Number of unbound parameters of the base instance.
        unbound: usize,
    },
    /// An argument for a restricted parameter depends on a parameter that
    /// is still free after the specialization.
    #[error("argument for restricted parameter `{parameter}` depends on a free parameter")]
    RestrictedArgument {
        /// Name of the restricted parameter.
        parameter: String,
    },
    /// A name is already declared in the targeted frame.
    #[error("duplicate definition of `{name}`")]
    DuplicateDefinition {
        /// The redeclared name.
        name: String,
    },
    /// A symbol does not name a declared function.
    #[error("`{name}` does not name a function")]
    UnknownFunction {
        /// Name of the offending symbol.
        name: String,
    },
    /// No process with the given name exists.
    #[error("no process named `{name}`")]
    UnknownProcess {
        /// The unknown name.
        name: String,
    },
    /// A channel-priority entry was added before any group was begun.
    #[error("channel priority entry without a preceding group")]
    MissingPriorityGroup,
}

/// Reference to the instance a specialization starts from: a template (as
/// its own trivial instance), an ordinary instance, or an LSC instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceRef {
    /// A template's trivial self-instance.
    Template(TemplateId),
    /// An ordinary (process-building) instance.
    Instance(InstanceId),
    /// An LSC scenario instance.
    LscInstance(LscInstanceId),
}

/// The declaration block an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclScope {
    /// The document's global declarations.
    Global,
    /// A template's declarations.
    Template(TemplateId),
}

/// The document model: fully-elaborated templates, instances, processes,
/// LSC scenarios, priorities, queries, diagnostics and the source-position
/// index.
///
/// Construction is single-threaded; after the last mutation the document
/// may be traversed concurrently by read-only consumers, provided none of
/// them records diagnostics.
#[derive(Debug)]
pub struct Document {
    pub(crate) symbols: SymbolTable,
    pub(crate) global: Declarations,
    pub(crate) templates: Vec<Template>,
    pub(crate) dynamic_order: Vec<TemplateId>,
    pub(crate) dynamic_by_name: HashMap<String, TemplateId>,
    pub(crate) instances: Vec<Instance>,
    pub(crate) lsc_instances: Vec<Instance>,
    pub(crate) processes: Vec<Instance>,
    pub(crate) chan_priorities: Vec<ChanPriority>,
    pub(crate) default_chan_priority: i32,
    pub(crate) proc_priority: HashMap<String, i32>,
    pub(crate) facts: DocumentFacts,
    pub(crate) before_update: Option<Expr>,
    pub(crate) after_update: Option<Expr>,
    pub(crate) options: Vec<ModelOption>,
    pub(crate) queries: Vec<Query>,
    pub(crate) libraries: Vec<Library>,
    pub(crate) strings: Vec<String>,
    pub(crate) supported_methods: SupportedMethods,
    pub(crate) positions: PositionIndex,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) modified: bool,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates an empty document with its global scope.
    pub fn new() -> Self {
        let mut symbols = SymbolTable::new();
        let global_frame = symbols.new_frame(None);
        Document {
            global: Declarations::new(global_frame),
            symbols,
            templates: Vec::new(),
            dynamic_order: Vec::new(),
            dynamic_by_name: HashMap::new(),
            instances: Vec::new(),
            lsc_instances: Vec::new(),
            processes: Vec::new(),
            chan_priorities: Vec::new(),
            default_chan_priority: 0,
            proc_priority: HashMap::new(),
            facts: DocumentFacts::default(),
            before_update: None,
            after_update: None,
            options: Vec::new(),
            queries: Vec::new(),
            libraries: Vec::new(),
            strings: Vec::new(),
            supported_methods: SupportedMethods::default(),
            positions: PositionIndex::default(),
            diagnostics: Diagnostics::default(),
            modified: false,
        }
    }

    /// Records `error` as a diagnostic and passes it through.
    fn record(&self, position: Position, error: ModelError) -> ModelError {
        self.diagnostics.error(position, error.to_string(), "");
        error
    }

    // ----------------
    // Scope and frames
    // ----------------

    /// The document's symbol table.
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Mutable access to the symbol table, for the front end to create
    /// parameter frames and annotate types.
    pub fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    /// The global frame.
    pub fn global_frame(&self) -> Frame {
        self.global.frame
    }

    /// The global declarations.
    pub fn globals(&self) -> &Declarations {
        &self.global
    }

    /// Mutable access to the global declarations.
    pub fn globals_mut(&mut self) -> &mut Declarations {
        &mut self.global
    }

    fn scope(&self, scope: DeclScope) -> &Declarations {
        match scope {
            DeclScope::Global => &self.global,
            DeclScope::Template(id) => &self.templates[id.index()].declarations,
        }
    }

    fn scope_mut(&mut self, scope: DeclScope) -> &mut Declarations {
        match scope {
            DeclScope::Global => &mut self.global,
            DeclScope::Template(id) => &mut self.templates[id.index()].declarations,
        }
    }

    // ------------
    // Declarations
    // ------------

    /// Declares a variable in the given scope.
    pub fn add_variable(
        &mut self,
        scope: DeclScope,
        ty: TypeRef,
        name: &str,
        init: Option<Expr>,
        position: Position,
    ) -> Result<Symbol, ModelError> {
        let frame = self.scope(scope).frame;
        if self.symbols.contains(frame, name) {
            return Err(self.record(
                position,
                ModelError::DuplicateDefinition {
                    name: name.to_string(),
                },
            ));
        }
        let uid = self.symbols.new_symbol(frame, name, ty, position);
        self.symbols.set_data(uid, SymbolData::Variable);
        self.scope_mut(scope).variables.push(Variable { uid, init });
        Ok(uid)
    }

    /// Declares a function in the given scope. The body is attached later
    /// with [`Document::set_function_body`].
    pub fn add_function(
        &mut self,
        scope: DeclScope,
        ty: TypeRef,
        name: &str,
        position: Position,
    ) -> Result<Symbol, ModelError> {
        let frame = self.scope(scope).frame;
        if self.symbols.contains(frame, name) {
            return Err(self.record(
                position,
                ModelError::DuplicateDefinition {
                    name: name.to_string(),
                },
            ));
        }
        let uid = self.symbols.new_symbol(frame, name, ty, position);
        self.symbols.set_data(uid, SymbolData::Function);
        self.scope_mut(scope).functions.push(Function {
            uid,
            changes: Default::default(),
            depends: Default::default(),
            variables: Vec::new(),
            body: None,
            body_position: Position::default(),
        });
        Ok(uid)
    }

    /// Declares a local variable of a function, in the block frame the
    /// front end supplies.
    pub fn add_variable_to_function(
        &mut self,
        scope: DeclScope,
        function: Symbol,
        frame: Frame,
        ty: TypeRef,
        name: &str,
        init: Option<Expr>,
        position: Position,
    ) -> Result<Symbol, ModelError> {
        if self.symbols.contains(frame, name) {
            return Err(self.record(
                position,
                ModelError::DuplicateDefinition {
                    name: name.to_string(),
                },
            ));
        }
        if self.scope(scope).function(function).is_none() {
            let name = self.symbols.name(function).to_string();
            return Err(self.record(position, ModelError::UnknownFunction { name }));
        }
        let uid = self.symbols.new_symbol(frame, name, ty, position);
        self.symbols.set_data(uid, SymbolData::Variable);
        self.scope_mut(scope)
            .function_mut(function)
            .expect("presence checked above")
            .variables
            .push(Variable { uid, init });
        Ok(uid)
    }

    /// Attaches the elaborated body of a function.
    pub fn set_function_body(
        &mut self,
        scope: DeclScope,
        function: Symbol,
        body: BlockStatement,
        position: Position,
    ) -> Result<(), ModelError> {
        if self.scope(scope).function(function).is_none() {
            let name = self.symbols.name(function).to_string();
            return Err(self.record(position, ModelError::UnknownFunction { name }));
        }
        let target = self
            .scope_mut(scope)
            .function_mut(function)
            .expect("presence checked above");
        target.body = Some(body);
        target.body_position = position;
        Ok(())
    }

    /// Adds a progress measure to the given scope.
    pub fn add_progress_measure(&mut self, scope: DeclScope, guard: Option<Expr>, measure: Expr) {
        self.scope_mut(scope)
            .progress
            .push(Progress { guard, measure });
    }

    /// Adds an empty I/O declaration to the given scope and returns it for
    /// the front end to fill.
    pub fn add_io_decl(&mut self, scope: DeclScope) -> &mut IoDecl {
        let io_decls = &mut self.scope_mut(scope).io_decls;
        io_decls.push(IoDecl::default());
        io_decls.last_mut().expect("just pushed")
    }

    /// Adds a Gantt chart declaration to the given scope.
    pub fn add_gantt(&mut self, scope: DeclScope, gantt: Gantt) {
        self.scope_mut(scope).gantt_charts.push(gantt);
    }

    /// Records a type declaration in the given scope.
    pub fn add_type_def(&mut self, scope: DeclScope, symbol: Symbol) {
        self.scope_mut(scope).typedefs.push(symbol);
    }

    // ---------
    // Templates
    // ---------

    /// Adds a template. `parameters` is the frame of its formal
    /// parameters; the template's declaration frame is created as a child
    /// of the global frame with the parameters shared into it.
    pub fn add_template(
        &mut self,
        name: &str,
        parameters: Frame,
        position: Position,
        is_ta: bool,
        lsc_type: &str,
        mode: &str,
    ) -> Result<TemplateId, ModelError> {
        if self.symbols.contains(self.global.frame, name) {
            return Err(self.record(
                position,
                ModelError::DuplicateDefinition {
                    name: name.to_string(),
                },
            ));
        }
        let id = TemplateId(self.templates.len() as u32);
        let uid = self
            .symbols
            .new_symbol(self.global.frame, name, TypeRef::UNTYPED, position);
        self.symbols.set_data(uid, SymbolData::Template);
        let params: Vec<Symbol> = self.symbols.symbols(parameters).to_vec();
        for &parameter in &params {
            self.symbols.set_data(parameter, SymbolData::Parameter);
        }
        let frame = self.symbols.new_frame(Some(self.global.frame));
        for &parameter in &params {
            self.symbols.push(frame, parameter);
        }
        let instance = Instance::trivial(uid, parameters, params.len(), Some(id));
        debug!("template `{name}` with {} parameters", params.len());
        self.templates.push(Template::new(
            instance,
            Declarations::new(frame),
            is_ta,
            lsc_type,
            mode,
        ));
        Ok(id)
    }

    /// Adds a dynamic (runtime-instantiated) template, additionally
    /// indexing it by name and by spawn order.
    pub fn add_dynamic_template(
        &mut self,
        name: &str,
        parameters: Frame,
        position: Position,
    ) -> Result<TemplateId, ModelError> {
        let id = self.add_template(name, parameters, position, true, "", "")?;
        let template = &mut self.templates[id.index()];
        template.dynamic = true;
        template.dyn_index = self.dynamic_order.len();
        self.dynamic_order.push(id);
        self.dynamic_by_name.insert(name.to_string(), id);
        Ok(id)
    }

    /// All templates, in declaration order (dynamic ones included).
    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    /// The template behind a handle.
    pub fn template(&self, id: TemplateId) -> &Template {
        &self.templates[id.index()]
    }

    /// Mutable access to a template, for front-end and type-checker
    /// annotations.
    pub fn template_mut(&mut self, id: TemplateId) -> &mut Template {
        &mut self.templates[id.index()]
    }

    /// Finds a template by name.
    pub fn find_template(&self, name: &str) -> Option<TemplateId> {
        self.templates
            .iter()
            .position(|t| self.symbols.name(t.uid()) == name)
            .map(|i| TemplateId(i as u32))
    }

    /// Dynamic templates, in spawn order.
    pub fn dynamic_templates(&self) -> &[TemplateId] {
        &self.dynamic_order
    }

    /// Finds a dynamic template by name.
    pub fn find_dynamic_template(&self, name: &str) -> Option<TemplateId> {
        self.dynamic_by_name.get(name).copied()
    }

    /// True if any dynamic template is declared.
    pub fn has_dynamic_templates(&self) -> bool {
        !self.dynamic_order.is_empty()
    }

    // -------------------
    // Automaton structure
    // -------------------

    /// Appends a location to a template.
    pub fn add_location(
        &mut self,
        template: TemplateId,
        name: &str,
        invariant: Option<Expr>,
        exp_rate: Option<Expr>,
        position: Position,
    ) -> Result<LocationId, ModelError> {
        match self.templates[template.index()].add_location(
            &mut self.symbols,
            name,
            invariant,
            exp_rate,
            position,
        ) {
            Ok(id) => Ok(id),
            Err(error) => Err(self.record(position, error)),
        }
    }

    /// Appends a branchpoint to a template.
    pub fn add_branchpoint(
        &mut self,
        template: TemplateId,
        name: &str,
        position: Position,
    ) -> Result<BranchpointId, ModelError> {
        match self.templates[template.index()].add_branchpoint(&mut self.symbols, name, position) {
            Ok(id) => Ok(id),
            Err(error) => Err(self.record(position, error)),
        }
    }

    /// Appends an edge to a template, resolving its endpoint symbols
    /// against the template's locations and branchpoints. On failure no
    /// edge is added.
    pub fn add_edge(
        &mut self,
        template: TemplateId,
        src: Symbol,
        dst: Symbol,
        control: bool,
        action_name: Option<String>,
    ) -> Result<EdgeId, ModelError> {
        let index = template.index();
        let src_endpoint = match self.templates[index].resolve_endpoint(&self.symbols, src) {
            Ok(endpoint) => endpoint,
            Err(error) => {
                let position = self.symbols.position_of(src);
                return Err(self.record(position, error));
            }
        };
        let dst_endpoint = match self.templates[index].resolve_endpoint(&self.symbols, dst) {
            Ok(endpoint) => endpoint,
            Err(error) => {
                let position = self.symbols.position_of(dst);
                return Err(self.record(position, error));
            }
        };
        Ok(self.templates[index].push_edge(src_endpoint, dst_endpoint, control, action_name))
    }

    /// Mutable access to an edge of a template.
    pub fn edge_mut(&mut self, template: TemplateId, edge: EdgeId) -> &mut Edge {
        self.templates[template.index()].edge_mut(edge)
    }

    // ---------
    // Instances
    // ---------

    fn base_instance(&self, base: InstanceRef) -> &Instance {
        match base {
            InstanceRef::Template(id) => &self.templates[id.index()].instance,
            InstanceRef::Instance(id) => &self.instances[id.index()],
            InstanceRef::LscInstance(id) => &self.lsc_instances[id.index()],
        }
    }

    fn specialize(
        &mut self,
        name: &str,
        base: InstanceRef,
        parameters: Frame,
        arguments: &[Expr],
        position: Position,
    ) -> Result<Instance, ModelError> {
        if self.symbols.contains(self.global.frame, name) {
            return Err(self.record(
                position,
                ModelError::DuplicateDefinition {
                    name: name.to_string(),
                },
            ));
        }
        let uid = self
            .symbols
            .new_symbol(self.global.frame, name, TypeRef::UNTYPED, position);
        self.symbols.set_data(uid, SymbolData::Instance);
        let base = self.base_instance(base).clone();
        match Instance::specialize(&mut self.symbols, uid, &base, parameters, arguments) {
            Ok(instance) => {
                debug!(
                    "instance `{name}`: {} arguments bound, {} parameters unbound",
                    instance.arguments, instance.unbound
                );
                Ok(instance)
            }
            Err(error) => Err(self.record(position, error)),
        }
    }

    /// Builds an instance by specializing `base`: the arguments are bound,
    /// in order, to the leading unbound parameters of the base, and the
    /// formals of `parameters` become the new instance's own parameters.
    pub fn add_instance(
        &mut self,
        name: &str,
        base: InstanceRef,
        parameters: Frame,
        arguments: &[Expr],
        position: Position,
    ) -> Result<InstanceId, ModelError> {
        let instance = self.specialize(name, base, parameters, arguments, position)?;
        let id = InstanceId(self.instances.len() as u32);
        self.instances.push(instance);
        Ok(id)
    }

    /// Same as [`Document::add_instance`], but the result is stored with
    /// the LSC scenario instances so scenario instances and ordinary
    /// processes are never conflated.
    pub fn add_lsc_instance(
        &mut self,
        name: &str,
        base: InstanceRef,
        parameters: Frame,
        arguments: &[Expr],
        position: Position,
    ) -> Result<LscInstanceId, ModelError> {
        let instance = self.specialize(name, base, parameters, arguments, position)?;
        let id = LscInstanceId(self.lsc_instances.len() as u32);
        self.lsc_instances.push(instance);
        Ok(id)
    }

    /// The ordinary instances, in creation order.
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// The instance behind a handle.
    pub fn instance(&self, id: InstanceId) -> &Instance {
        &self.instances[id.index()]
    }

    /// The LSC scenario instances, in creation order.
    pub fn lsc_instances(&self) -> &[Instance] {
        &self.lsc_instances
    }

    /// The LSC instance behind a handle.
    pub fn lsc_instance(&self, id: LscInstanceId) -> &Instance {
        &self.lsc_instances[id.index()]
    }

    // ---------
    // Processes
    // ---------

    /// Elaborates an instance into a top-level process and marks its
    /// template as instantiated.
    pub fn add_process(&mut self, instance: InstanceId) {
        let process = self.instances[instance.index()].clone();
        if let Some(template) = process.template {
            self.templates[template.index()].is_instantiated = true;
        }
        self.processes.push(process);
    }

    /// Removes a process by name, severing its priority-table entry and
    /// any channel-priority expression referencing it. Used by LSC tooling
    /// only; callers must ensure no scenario instance line still projects
    /// the process.
    pub fn remove_process(&mut self, name: &str) -> Result<(), ModelError> {
        let Some(index) = self
            .processes
            .iter()
            .position(|p| self.symbols.name(p.uid) == name)
        else {
            return Err(self.record(
                Position::default(),
                ModelError::UnknownProcess {
                    name: name.to_string(),
                },
            ));
        };
        let uid = self.processes[index].uid;
        self.processes.remove(index);
        self.proc_priority.remove(name);
        let mentions = |expr: &Expr| expr.depends_on(&|s| s == uid);
        for group in &mut self.chan_priorities {
            group.tail.retain(|(_, chan)| !mentions(chan));
        }
        self.chan_priorities.retain(|group| !mentions(&group.head));
        Ok(())
    }

    /// The elaborated processes, in creation order.
    pub fn processes(&self) -> &[Instance] {
        &self.processes
    }

    // -------------
    // LSC scenarios
    // -------------

    /// Appends an instance line to an LSC template. The projected instance
    /// is bound afterwards with [`Document::bind_instance_line`].
    pub fn add_instance_line(
        &mut self,
        template: TemplateId,
        name: &str,
        position: Position,
    ) -> Result<InstanceLineId, ModelError> {
        match self.templates[template.index()].add_instance_line(&mut self.symbols, name, position)
        {
            Ok(id) => Ok(id),
            Err(error) => Err(self.record(position, error)),
        }
    }

    /// Binds the instance projected by an instance line, merging
    /// parameters exactly as [`Document::add_instance`] does.
    pub fn bind_instance_line(
        &mut self,
        template: TemplateId,
        line: InstanceLineId,
        base: InstanceRef,
        parameters: Frame,
        arguments: &[Expr],
    ) -> Result<(), ModelError> {
        let uid = self.templates[template.index()].instance_lines[line.index()]
            .instance
            .uid;
        let base = self.base_instance(base).clone();
        match Instance::specialize(&mut self.symbols, uid, &base, parameters, arguments) {
            Ok(instance) => {
                self.templates[template.index()].instance_lines[line.index()].instance = instance;
                Ok(())
            }
            Err(error) => {
                let position = self.symbols.position_of(uid);
                Err(self.record(position, error))
            }
        }
    }

    /// Appends a message to an LSC template, resolving source and
    /// destination symbols to instance lines.
    pub fn add_message(
        &mut self,
        template: TemplateId,
        src: Symbol,
        dst: Symbol,
        location: i32,
        in_prechart: bool,
    ) -> Result<&mut Message, ModelError> {
        let index = template.index();
        let src_line = match self.templates[index].resolve_instance_line(&self.symbols, src) {
            Ok(line) => line,
            Err(error) => {
                let position = self.symbols.position_of(src);
                return Err(self.record(position, error));
            }
        };
        let dst_line = match self.templates[index].resolve_instance_line(&self.symbols, dst) {
            Ok(line) => line,
            Err(error) => {
                let position = self.symbols.position_of(dst);
                return Err(self.record(position, error));
            }
        };
        Ok(self.templates[index].push_message(src_line, dst_line, location, in_prechart))
    }

    /// Appends a condition to an LSC template, resolving the anchor
    /// symbols to instance lines.
    pub fn add_condition(
        &mut self,
        template: TemplateId,
        anchors: &[Symbol],
        location: i32,
        in_prechart: bool,
        is_hot: bool,
    ) -> Result<&mut Condition, ModelError> {
        let index = template.index();
        let mut lines: SmallVec<[InstanceLineId; 2]> = SmallVec::new();
        for &anchor in anchors {
            match self.templates[index].resolve_instance_line(&self.symbols, anchor) {
                Ok(line) => lines.push(line),
                Err(error) => {
                    let position = self.symbols.position_of(anchor);
                    return Err(self.record(position, error));
                }
            }
        }
        Ok(self.templates[index].push_condition(lines, location, in_prechart, is_hot))
    }

    /// Appends an update to an LSC template, resolving the anchor symbol
    /// to an instance line.
    pub fn add_update(
        &mut self,
        template: TemplateId,
        anchor: Symbol,
        location: i32,
        in_prechart: bool,
    ) -> Result<&mut Update, ModelError> {
        let index = template.index();
        let line = match self.templates[index].resolve_instance_line(&self.symbols, anchor) {
            Ok(line) => line,
            Err(error) => {
                let position = self.symbols.position_of(anchor);
                return Err(self.record(position, error));
            }
        };
        Ok(self.templates[index].push_update(line, location, in_prechart))
    }

    /// Clones a template's variable declarations into another template.
    /// Duplication is by value: the target gets its own storage.
    pub fn copy_variables_from_to(&mut self, from: TemplateId, to: TemplateId) {
        if from == to {
            return;
        }
        let variables = self.templates[from.index()].declarations.variables.clone();
        self.templates[to.index()]
            .declarations
            .variables
            .extend(variables);
    }

    /// Clones a template's function declarations into another template.
    pub fn copy_functions_from_to(&mut self, from: TemplateId, to: TemplateId) {
        if from == to {
            return;
        }
        let functions = self.templates[from.index()].declarations.functions.clone();
        self.templates[to.index()]
            .declarations
            .functions
            .extend(functions);
    }

    // ----------
    // Priorities
    // ----------

    /// Begins a new channel-priority declaration with its head expression.
    /// The default priority for channels also covers tau transitions.
    pub fn begin_chan_priority(&mut self, chan: Expr) {
        self.facts.has_priorities = true;
        self.chan_priorities.push(ChanPriority {
            head: chan,
            tail: Vec::new(),
        });
    }

    /// Appends a separator/expression pair to the current channel-priority
    /// declaration.
    pub fn add_chan_priority(
        &mut self,
        separator: ChanSeparator,
        chan: Expr,
    ) -> Result<(), ModelError> {
        match self.chan_priorities.last_mut() {
            Some(group) => {
                group.tail.push((separator, chan));
                Ok(())
            }
            None => Err(self.record(Position::default(), ModelError::MissingPriorityGroup)),
        }
    }

    /// The channel-priority declarations, in declaration order.
    pub fn chan_priorities(&self) -> &[ChanPriority] {
        &self.chan_priorities
    }

    /// The default channel priority.
    pub fn default_chan_priority(&self) -> i32 {
        self.default_chan_priority
    }

    /// Sets the default channel priority.
    pub fn set_default_chan_priority(&mut self, priority: i32) {
        self.default_chan_priority = priority;
    }

    /// Sets the priority of the process named `name`.
    pub fn set_proc_priority(&mut self, name: &str, priority: i32) {
        self.facts.has_priorities = true;
        self.proc_priority.insert(name.to_string(), priority);
    }

    /// The priority of the process named `name`, if declared.
    pub fn proc_priority(&self, name: &str) -> Option<i32> {
        self.proc_priority.get(name).copied()
    }

    // --------------
    // Document facts
    // --------------

    /// The facts recorded so far.
    pub fn facts(&self) -> &DocumentFacts {
        &self.facts
    }

    /// Records that some invariant uses a strict bound.
    pub fn record_strict_invariant(&mut self) {
        self.facts.has_strict_invariants = true;
    }

    /// Records that some clock is stopped.
    pub fn record_stop_watch(&mut self) {
        self.facts.stops_clock = true;
    }

    /// Records a guard with a strict lower bound on a controllable edge.
    pub fn record_strict_lower_bound_on_controllable(&mut self) {
        self.facts.has_strict_lower_bound_on_controllable = true;
    }

    /// Records a clock guard on a broadcast receiver.
    pub fn record_guard_on_broadcast_receive(&mut self) {
        self.facts.has_guard_on_broadcast_receive = true;
    }

    /// Records an urgent transition.
    pub fn record_urgent_transition(&mut self) {
        self.facts.has_urgent_transitions = true;
    }

    /// Sets the synchronization usage counter.
    pub fn set_sync_used(&mut self, sync_used: i32) {
        self.facts.sync_used = sync_used;
    }

    // -----------------------------
    // Updates, options, queries etc.
    // -----------------------------

    /// Sets the global update evaluated before each transition.
    pub fn set_before_update(&mut self, expr: Expr) {
        self.before_update = Some(expr);
    }

    /// The global update evaluated before each transition.
    pub fn before_update(&self) -> Option<&Expr> {
        self.before_update.as_ref()
    }

    /// Sets the global update evaluated after each transition.
    pub fn set_after_update(&mut self, expr: Expr) {
        self.after_update = Some(expr);
    }

    /// The global update evaluated after each transition.
    pub fn after_update(&self) -> Option<&Expr> {
        self.after_update.as_ref()
    }

    /// Replaces the model options.
    pub fn set_options(&mut self, options: Vec<ModelOption>) {
        self.options = options;
    }

    /// The model options.
    pub fn options(&self) -> &[ModelOption] {
        &self.options
    }

    /// Appends a query.
    pub fn add_query(&mut self, query: Query) {
        self.queries.push(query);
    }

    /// The queries enclosed in the model.
    pub fn queries(&self) -> &[Query] {
        &self.queries
    }

    /// True if no query is enclosed in the model.
    pub fn queries_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Registers a dynamic library.
    pub fn add_library(&mut self, library: Library) {
        self.libraries.push(library);
    }

    /// The registered libraries, in registration order.
    pub fn libraries(&self) -> &[Library] {
        &self.libraries
    }

    /// The most recently registered library.
    ///
    /// # Panics
    ///
    /// Panics if no library has been registered; calling this without a
    /// prior successful registration is a caller protocol violation, not a
    /// malformed input.
    pub fn last_library(&mut self) -> &mut Library {
        self.libraries
            .last_mut()
            .expect("no library has been registered")
    }

    /// Sets the supported-methods descriptor.
    pub fn set_supported_methods(&mut self, supported_methods: SupportedMethods) {
        self.supported_methods = supported_methods;
    }

    /// The supported-methods descriptor.
    pub fn supported_methods(&self) -> &SupportedMethods {
        &self.supported_methods
    }

    /// True if the document was modified since the flag was last cleared.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Sets the modified flag.
    pub fn set_modified(&mut self, modified: bool) {
        self.modified = modified;
    }

    // -------------
    // String table
    // -------------

    /// Appends a string to the interned table unconditionally.
    pub fn add_string(&mut self, string: impl Into<String>) {
        self.strings.push(string.into());
    }

    /// Interns a string: returns the existing index on a duplicate, else
    /// appends and returns the new index. Lookup is linear; the table
    /// holds identifiers and library paths and stays small.
    pub fn add_string_if_new(&mut self, string: &str) -> usize {
        match self.strings.iter().position(|s| s == string) {
            Some(index) => index,
            None => {
                self.strings.push(string.to_string());
                self.strings.len() - 1
            }
        }
    }

    /// The interned strings, in insertion order.
    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    // ------------------------
    // Positions and diagnostics
    // ------------------------

    /// Registers a position-index entry.
    pub fn add_position(&mut self, start: u32, offset: u32, line: u32, path: Arc<str>) {
        self.positions.add(start, offset, line, path);
    }

    /// The most specific position-index entry covering `position`.
    pub fn find_position(&self, position: u32) -> Option<&SourceLine> {
        self.positions.find(position)
    }

    /// The earliest-registered position-index entry covering `position`.
    pub fn find_first_position(&self, position: u32) -> Option<&SourceLine> {
        self.positions.find_first(position)
    }

    /// The whole position index.
    pub fn positions(&self) -> &PositionIndex {
        &self.positions
    }

    /// Records an error diagnostic.
    pub fn add_error(
        &self,
        position: Position,
        message: impl Into<String>,
        context: impl Into<String>,
    ) {
        self.diagnostics.error(position, message, context);
    }

    /// Records a warning diagnostic.
    pub fn add_warning(
        &self,
        position: Position,
        message: impl Into<String>,
        context: impl Into<String>,
    ) {
        self.diagnostics.warning(position, message, context);
    }

    /// True if any error has been recorded.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    /// True if any warning has been recorded.
    pub fn has_warnings(&self) -> bool {
        self.diagnostics.has_warnings()
    }

    /// The recorded errors, in recording order.
    pub fn errors(&self) -> Ref<'_, [Diagnostic]> {
        self.diagnostics.errors()
    }

    /// The recorded warnings, in recording order.
    pub fn warnings(&self) -> Ref<'_, [Diagnostic]> {
        self.diagnostics.warnings()
    }

    /// Discards all recorded errors.
    pub fn clear_errors(&self) {
        self.diagnostics.clear_errors();
    }

    /// Discards all recorded warnings.
    pub fn clear_warnings(&self) {
        self.diagnostics.clear_warnings();
    }
}

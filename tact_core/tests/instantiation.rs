use tact_core::automaton::Endpoint;
use tact_core::document::{DeclScope, Document, InstanceRef, ModelError};
use tact_core::{BinOp, DocumentVisitor, Expr, Frame, Position, TypeRef};

fn new_params(doc: &mut Document, names: &[&str]) -> Frame {
    let global = doc.global_frame();
    let frame = doc.symbols_mut().new_frame(Some(global));
    for name in names {
        doc.symbols_mut()
            .new_symbol(frame, name, TypeRef::UNTYPED, Position::default());
    }
    frame
}

#[test]
fn a_template_is_its_own_trivial_instance() -> Result<(), ModelError> {
    let mut doc = Document::new();
    let params = new_params(&mut doc, &["n", "m"]);
    let tpl = doc.add_template("Worker", params, Position::default(), true, "", "")?;
    let instance = &doc.template(tpl).instance;
    assert_eq!(instance.arguments, 0);
    assert_eq!(
        instance.unbound,
        doc.symbols().symbols(instance.parameters).len()
    );
    assert!(instance.mapping.is_empty());
    assert_eq!(instance.template, Some(tpl));
    Ok(())
}

#[test]
fn specialization_chain_merges_bindings() -> Result<(), ModelError> {
    let mut doc = Document::new();
    let params = new_params(&mut doc, &["a", "b", "c"]);
    let a = doc.symbols().symbols(params)[0];
    let tpl = doc.add_template("Base", params, Position::default(), true, "", "")?;

    let none = new_params(&mut doc, &[]);
    let first = doc.add_instance(
        "First",
        InstanceRef::Template(tpl),
        none,
        &[Expr::from(1)],
        Position::default(),
    )?;
    {
        let instance = doc.instance(first);
        assert_eq!(instance.arguments, 1);
        assert_eq!(instance.unbound, 2);
        assert_eq!(instance.mapping.get(&a), Some(&Expr::from(1)));
    }

    let none = new_params(&mut doc, &[]);
    let second = doc.add_instance(
        "Second",
        InstanceRef::Instance(first),
        none,
        &[Expr::from(2), Expr::from(3)],
        Position::default(),
    )?;
    let instance = doc.instance(second);
    assert_eq!(instance.arguments, 2);
    assert_eq!(instance.unbound, 0);
    assert!(instance.is_complete());
    // Every prior binding survives, plus exactly the two new ones.
    assert_eq!(instance.mapping.len(), 3);
    assert_eq!(instance.mapping.get(&a), Some(&Expr::from(1)));
    Ok(())
}

#[test]
fn overapplication_is_reported_and_adds_no_instance() -> Result<(), ModelError> {
    let mut doc = Document::new();
    let params = new_params(&mut doc, &["n"]);
    let tpl = doc.add_template("Narrow", params, Position::default(), true, "", "")?;
    let none = new_params(&mut doc, &[]);
    let result = doc.add_instance(
        "TooWide",
        InstanceRef::Template(tpl),
        none,
        &[Expr::from(1), Expr::from(2)],
        Position::default(),
    );
    assert!(matches!(
        result,
        Err(ModelError::ArityMismatch {
            supplied: 2,
            unbound: 1
        })
    ));
    assert!(doc.instances().is_empty());
    assert_eq!(doc.errors().len(), 1);
    Ok(())
}

#[test]
fn restricted_parameters_constrain_their_arguments() -> Result<(), ModelError> {
    let mut doc = Document::new();
    let params = new_params(&mut doc, &["n", "m"]);
    let n = doc.symbols().symbols(params)[0];
    let tpl = doc.add_template("Array", params, Position::default(), true, "", "")?;
    doc.template_mut(tpl).instance.restricted.insert(n);

    // An argument that depends on a still-free parameter is rejected.
    let fresh = new_params(&mut doc, &["k"]);
    let k = doc.symbols().symbols(fresh)[0];
    let result = doc.add_instance(
        "Open",
        InstanceRef::Template(tpl),
        fresh,
        &[Expr::Var(k)],
        Position::default(),
    );
    assert!(matches!(result, Err(ModelError::RestrictedArgument { .. })));
    assert_eq!(doc.errors().len(), 1);

    // A closed argument is accepted, and its symbols become restricted.
    let size = doc.add_variable(
        DeclScope::Global,
        TypeRef::UNTYPED,
        "size",
        Some(Expr::from(4)),
        Position::default(),
    )?;
    let none = new_params(&mut doc, &[]);
    let closed = doc.add_instance(
        "Closed",
        InstanceRef::Template(tpl),
        none,
        &[Expr::Var(size)],
        Position::default(),
    )?;
    assert!(doc.instance(closed).restricted.contains(&size));
    assert!(doc.instance(closed).restricted.contains(&n));
    Ok(())
}

#[test]
fn self_loop_process_shares_the_template_graph() -> Result<(), ModelError> {
    let mut doc = Document::new();
    let params = new_params(&mut doc, &[]);
    let tpl = doc.add_template("Loop", params, Position::default(), true, "", "")?;
    let x = doc.add_variable(
        DeclScope::Template(tpl),
        TypeRef::UNTYPED,
        "x",
        None,
        Position::default(),
    )?;
    let l0 = doc.add_location(tpl, "L0", None, None, Position::default())?;
    let l0_uid = doc.template(tpl).location(l0).uid;
    doc.template_mut(tpl).init = Some(l0_uid);

    let edge = doc.add_edge(tpl, l0_uid, l0_uid, true, None)?;
    {
        let edge = doc.edge_mut(tpl, edge);
        edge.guard = Some(Expr::Binary(
            BinOp::Gt,
            Box::new((Expr::Var(x), Expr::from(0))),
        ));
        edge.assign = Some(Expr::Binary(
            BinOp::Assign,
            Box::new((Expr::Var(x), Expr::from(0))),
        ));
    }

    let none = new_params(&mut doc, &[]);
    let inst = doc.add_instance(
        "looper",
        InstanceRef::Template(tpl),
        none,
        &[],
        Position::default(),
    )?;
    doc.add_process(inst);

    let process = &doc.processes()[0];
    assert!(process.mapping.is_empty());
    assert_eq!(process.template, Some(tpl));
    // The process refers back to the very same graph, not a copy.
    let template = doc.template(process.template.expect("set above"));
    assert!(template.is_instantiated);
    assert_eq!(template.edges.len(), 1);
    assert_eq!(template.edges[0].src, Endpoint::Location(l0));
    assert_eq!(template.edges[0].dst, Endpoint::Location(l0));
    assert!(!doc.has_errors());
    Ok(())
}

#[test]
fn unknown_edge_endpoint_is_reported_exactly_once() -> Result<(), ModelError> {
    let mut doc = Document::new();
    let params = new_params(&mut doc, &[]);
    let tpl = doc.add_template("Broken", params, Position::default(), true, "", "")?;
    let l0 = doc.add_location(tpl, "L0", None, None, Position::default())?;
    let l0_uid = doc.template(tpl).location(l0).uid;
    let frame = doc.template(tpl).declarations.frame;
    let ghost = doc
        .symbols_mut()
        .new_symbol(frame, "ghost", TypeRef::UNTYPED, Position::new(10, 15));

    let result = doc.add_edge(tpl, l0_uid, ghost, false, None);
    assert!(matches!(
        result,
        Err(ModelError::UnknownEndpoint { ref name }) if name == "ghost"
    ));
    assert!(doc.template(tpl).edges.is_empty());
    assert_eq!(doc.errors().len(), 1);
    assert_eq!(doc.errors()[0].position, Position::new(10, 15));
    Ok(())
}

#[test]
fn duplicate_definitions_are_construction_errors() -> Result<(), ModelError> {
    let mut doc = Document::new();
    let params = new_params(&mut doc, &[]);
    doc.add_template("Twice", params, Position::default(), true, "", "")?;
    let params = new_params(&mut doc, &[]);
    assert!(matches!(
        doc.add_template("Twice", params, Position::default(), true, "", ""),
        Err(ModelError::DuplicateDefinition { .. })
    ));

    doc.add_variable(
        DeclScope::Global,
        TypeRef::UNTYPED,
        "x",
        None,
        Position::default(),
    )?;
    assert!(matches!(
        doc.add_variable(
            DeclScope::Global,
            TypeRef::UNTYPED,
            "x",
            None,
            Position::default(),
        ),
        Err(ModelError::DuplicateDefinition { .. })
    ));
    assert_eq!(doc.errors().len(), 2);
    Ok(())
}

#[derive(Default)]
struct Tracer {
    events: Vec<String>,
}

impl Tracer {
    fn tag(&mut self, tag: &str) {
        self.events.push(tag.to_string());
    }
}

impl DocumentVisitor for Tracer {
    fn visit_doc_before(&mut self, _document: &Document) {
        self.tag("doc-before");
    }
    fn visit_doc_after(&mut self, _document: &Document) {
        self.tag("doc-after");
    }
    fn visit_variable(&mut self, _variable: &tact_core::declarations::Variable) {
        self.tag("variable");
    }
    fn visit_template_before(&mut self, _template: &tact_core::automaton::Template) -> bool {
        self.tag("template-before");
        true
    }
    fn visit_template_after(&mut self, _template: &tact_core::automaton::Template) {
        self.tag("template-after");
    }
    fn visit_location(&mut self, _location: &tact_core::automaton::Location) {
        self.tag("location");
    }
    fn visit_edge(&mut self, _edge: &tact_core::automaton::Edge) {
        self.tag("edge");
    }
    fn visit_process(&mut self, _process: &tact_core::instance::Instance) {
        self.tag("process");
    }
}

#[test]
fn traversal_visits_globals_first_and_processes_last() -> Result<(), ModelError> {
    let mut doc = Document::new();
    doc.add_variable(
        DeclScope::Global,
        TypeRef::UNTYPED,
        "g",
        None,
        Position::default(),
    )?;
    let params = new_params(&mut doc, &[]);
    let tpl = doc.add_template("Only", params, Position::default(), true, "", "")?;
    let l0 = doc.add_location(tpl, "L0", None, None, Position::default())?;
    let l0_uid = doc.template(tpl).location(l0).uid;
    doc.add_edge(tpl, l0_uid, l0_uid, false, None)?;
    let none = new_params(&mut doc, &[]);
    let inst = doc.add_instance(
        "only",
        InstanceRef::Template(tpl),
        none,
        &[],
        Position::default(),
    )?;
    doc.add_process(inst);

    let mut tracer = Tracer::default();
    doc.accept(&mut tracer);
    assert_eq!(
        tracer.events,
        vec![
            "doc-before",
            "variable",
            "template-before",
            "location",
            "edge",
            "template-after",
            "process",
            "doc-after",
        ]
    );
    Ok(())
}

struct Skipper {
    entered: usize,
    finished: usize,
}

impl DocumentVisitor for Skipper {
    fn visit_template_before(&mut self, _template: &tact_core::automaton::Template) -> bool {
        self.entered += 1;
        false
    }
    fn visit_template_after(&mut self, _template: &tact_core::automaton::Template) {
        self.finished += 1;
    }
    fn visit_location(&mut self, _location: &tact_core::automaton::Location) {
        panic!("children of a skipped template must not be visited");
    }
}

#[test]
fn template_subtrees_can_be_skipped() -> Result<(), ModelError> {
    let mut doc = Document::new();
    let params = new_params(&mut doc, &[]);
    let tpl = doc.add_template("Skipped", params, Position::default(), true, "", "")?;
    doc.add_location(tpl, "L0", None, None, Position::default())?;

    let mut skipper = Skipper {
        entered: 0,
        finished: 0,
    };
    doc.accept(&mut skipper);
    assert_eq!(skipper.entered, 1);
    assert_eq!(skipper.finished, 0);
    Ok(())
}

//! Traversal of a finished document.
//!
//! Consumers implement [`DocumentVisitor`] with just the hooks they care
//! about; every hook defaults to a no-op. The traversal order is fixed:
//! global declarations first, then each template in declaration order with
//! its own declarations, locations, edges and LSC elements in construction
//! order, then instances, then top-level processes.

use crate::automaton::{Edge, Location, Template};
use crate::declarations::{Declarations, Function, Gantt, IoDecl, Progress, Variable};
use crate::document::Document;
use crate::instance::Instance;
use crate::lsc::{Condition, InstanceLine, Message, Update};
use crate::scope::Symbol;

/// Callbacks invoked by [`Document::accept`].
///
/// `visit_template_before` may return `false` to skip the template's
/// children; `visit_template_after` is only called for templates that were
/// entered.
#[allow(unused_variables)]
pub trait DocumentVisitor {
    /// Called before anything else.
    fn visit_doc_before(&mut self, document: &Document) {}
    /// Called after everything else.
    fn visit_doc_after(&mut self, document: &Document) {}
    /// Called for every variable declaration.
    fn visit_variable(&mut self, variable: &Variable) {}
    /// Called before a template's children; return `false` to skip them.
    fn visit_template_before(&mut self, template: &Template) -> bool {
        true
    }
    /// Called after a template's children.
    fn visit_template_after(&mut self, template: &Template) {}
    /// Called for every location.
    fn visit_location(&mut self, location: &Location) {}
    /// Called for every edge.
    fn visit_edge(&mut self, edge: &Edge) {}
    /// Called for every instance (ordinary and LSC).
    fn visit_instance(&mut self, instance: &Instance) {}
    /// Called for every top-level process.
    fn visit_process(&mut self, process: &Instance) {}
    /// Called for every function declaration.
    fn visit_function(&mut self, function: &Function) {}
    /// Called for every type declaration.
    fn visit_type_def(&mut self, symbol: Symbol) {}
    /// Called for every I/O declaration.
    fn visit_io_decl(&mut self, io_decl: &IoDecl) {}
    /// Called for every progress measure.
    fn visit_progress_measure(&mut self, progress: &Progress) {}
    /// Called for every Gantt chart declaration.
    fn visit_gantt_chart(&mut self, gantt: &Gantt) {}
    /// Called for every LSC instance line.
    fn visit_instance_line(&mut self, instance_line: &InstanceLine) {}
    /// Called for every LSC message.
    fn visit_message(&mut self, message: &Message) {}
    /// Called for every LSC condition.
    fn visit_condition(&mut self, condition: &Condition) {}
    /// Called for every LSC update.
    fn visit_update(&mut self, update: &Update) {}
}

fn visit_declarations<V: DocumentVisitor + ?Sized>(visitor: &mut V, declarations: &Declarations) {
    for variable in &declarations.variables {
        visitor.visit_variable(variable);
    }
    for &typedef in &declarations.typedefs {
        visitor.visit_type_def(typedef);
    }
    for function in &declarations.functions {
        visitor.visit_function(function);
    }
    for io_decl in &declarations.io_decls {
        visitor.visit_io_decl(io_decl);
    }
    for progress in &declarations.progress {
        visitor.visit_progress_measure(progress);
    }
    for gantt in &declarations.gantt_charts {
        visitor.visit_gantt_chart(gantt);
    }
}

impl Document {
    /// Walks the whole document in the fixed traversal order, dispatching
    /// to the visitor's hooks.
    pub fn accept<V: DocumentVisitor + ?Sized>(&self, visitor: &mut V) {
        visitor.visit_doc_before(self);
        visit_declarations(visitor, &self.global);
        for template in &self.templates {
            if visitor.visit_template_before(template) {
                visit_declarations(visitor, &template.declarations);
                for location in &template.locations {
                    visitor.visit_location(location);
                }
                for edge in &template.edges {
                    visitor.visit_edge(edge);
                }
                for instance_line in &template.instance_lines {
                    visitor.visit_instance_line(instance_line);
                }
                for message in &template.messages {
                    visitor.visit_message(message);
                }
                for condition in &template.conditions {
                    visitor.visit_condition(condition);
                }
                for update in &template.updates {
                    visitor.visit_update(update);
                }
                visitor.visit_template_after(template);
            }
        }
        for instance in &self.instances {
            visitor.visit_instance(instance);
        }
        for instance in &self.lsc_instances {
            visitor.visit_instance(instance);
        }
        for process in &self.processes {
            visitor.visit_process(process);
        }
        visitor.visit_doc_after(self);
    }
}

use tact_core::automaton::TemplateId;
use tact_core::document::{Document, InstanceRef, ModelError};
use tact_core::lsc::{Cut, InstanceLineId};
use tact_core::{Expr, Position, Symbol, TypeRef};

struct Chart {
    tpl: TemplateId,
    lines: [InstanceLineId; 2],
    uids: [Symbol; 2],
}

fn chart(doc: &mut Document) -> Result<Chart, ModelError> {
    let params = doc.symbols_mut().new_frame(None);
    let tpl = doc.add_template("Chart", params, Position::default(), false, "invariant", "")?;
    let a = doc.add_instance_line(tpl, "a", Position::default())?;
    let b = doc.add_instance_line(tpl, "b", Position::default())?;
    let a_uid = doc.template(tpl).instance_line(a).instance.uid;
    let b_uid = doc.template(tpl).instance_line(b).instance.uid;
    Ok(Chart {
        tpl,
        lines: [a, b],
        uids: [a_uid, b_uid],
    })
}

#[test]
fn events_merge_into_vertical_slots() -> Result<(), ModelError> {
    let mut doc = Document::new();
    let Chart { tpl, uids: [a, b], .. } = chart(&mut doc)?;
    // Authored out of vertical order on purpose.
    doc.add_message(tpl, a, b, 2, false)?;
    doc.add_update(tpl, a, 1, false)?;
    doc.add_message(tpl, b, a, 0, true)?;
    doc.add_condition(tpl, &[a, b], 2, false, true)?;

    let template = doc.template(tpl);
    assert!(template.is_invariant());
    let simregions = template.simregions();
    assert_eq!(simregions.len(), 3);
    assert_eq!(
        simregions.iter().map(|s| s.location()).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );

    assert!(simregions[0].has_message());
    assert!(!simregions[0].has_condition() && !simregions[0].has_update());
    assert!(simregions[0].is_in_prechart());

    assert!(simregions[1].has_update() && !simregions[1].has_message());

    assert!(simregions[2].has_message() && simregions[2].has_condition());
    assert!(simregions[2]
        .condition
        .as_ref()
        .is_some_and(|c| c.is_hot && c.anchors.len() == 2));
    Ok(())
}

#[test]
fn identical_messages_collapse_into_one_slot() -> Result<(), ModelError> {
    let mut doc = Document::new();
    let Chart { tpl, uids: [a, b], .. } = chart(&mut doc)?;
    doc.add_message(tpl, a, b, 0, false)?;
    doc.add_message(tpl, a, b, 0, false)?;

    let simregions = doc.template(tpl).simregions();
    assert_eq!(simregions.len(), 1);
    assert!(simregions[0].has_message());
    assert!(simregions[0].condition.is_none());
    assert!(simregions[0].update.is_none());
    Ok(())
}

#[test]
fn instance_lines_filter_their_own_simregions() -> Result<(), ModelError> {
    let mut doc = Document::new();
    let Chart {
        tpl,
        lines: [_, b_line],
        uids: [a, b],
    } = chart(&mut doc)?;
    let c_line = doc.add_instance_line(tpl, "c", Position::default())?;
    let c = doc.template(tpl).instance_line(c_line).instance.uid;

    doc.add_message(tpl, a, b, 0, false)?;
    doc.add_update(tpl, c, 1, false)?;
    doc.add_condition(tpl, &[b], 2, false, false)?;

    let template = doc.template(tpl);
    let all = template.simregions();
    assert_eq!(all.len(), 3);

    let on_b = template.instance_line(b_line).simregions(&all);
    let on_c = template.instance_line(c_line).simregions(&all);
    assert_eq!(
        on_b.iter().map(|s| s.location()).collect::<Vec<_>>(),
        vec![0, 2]
    );
    assert_eq!(
        on_c.iter().map(|s| s.location()).collect::<Vec<_>>(),
        vec![1]
    );
    Ok(())
}

#[test]
fn condition_and_update_lookups() -> Result<(), ModelError> {
    let mut doc = Document::new();
    let Chart {
        tpl,
        lines: [a_line, b_line],
        uids: [a, b],
    } = chart(&mut doc)?;
    doc.add_condition(tpl, &[a], 2, false, true)?;
    doc.add_update(tpl, b, 2, false)?;

    let template = doc.template(tpl);
    assert!(template
        .condition_at(a_line, 2)
        .is_some_and(|c| c.is_hot));
    assert!(template.condition_at(b_line, 2).is_none());
    assert!(template.condition_at(a_line, 0).is_none());

    assert!(template.update_at(b_line, 2).is_some());
    assert!(template.update_at(a_line, 2).is_none());
    assert!(template.update_on_any(&[a_line, b_line], 2).is_some());
    assert!(template.update_on_any(&[a_line], 2).is_none());
    Ok(())
}

#[test]
fn malformed_conditions_contribute_no_event() -> Result<(), ModelError> {
    let mut doc = Document::new();
    let Chart { tpl, uids: [a, _], .. } = chart(&mut doc)?;
    doc.add_condition(tpl, &[], 5, false, false)?;
    doc.add_update(tpl, a, 0, false)?;

    let simregions = doc.template(tpl).simregions();
    assert_eq!(simregions.len(), 1);
    assert_eq!(simregions[0].location(), 0);
    Ok(())
}

#[test]
fn unknown_anchors_are_reported() -> Result<(), ModelError> {
    let mut doc = Document::new();
    let Chart { tpl, uids: [a, _], .. } = chart(&mut doc)?;
    let frame = doc.template(tpl).declarations.frame;
    let ghost = doc
        .symbols_mut()
        .new_symbol(frame, "ghost", TypeRef::UNTYPED, Position::default());

    assert!(matches!(
        doc.add_message(tpl, a, ghost, 0, false),
        Err(ModelError::UnknownInstanceLine { ref name }) if name == "ghost"
    ));
    assert!(doc.template(tpl).messages.is_empty());
    assert_eq!(doc.errors().len(), 1);
    Ok(())
}

#[test]
fn cuts_compare_as_unordered_sets() -> Result<(), ModelError> {
    let mut doc = Document::new();
    let Chart { tpl, uids: [a, b], .. } = chart(&mut doc)?;
    doc.add_message(tpl, a, b, 0, true)?;
    doc.add_message(tpl, b, a, 1, true)?;
    doc.add_message(tpl, a, b, 2, false)?;
    let simregions = doc.template(tpl).simregions();

    let mut forward = Cut::new(0);
    let mut backward = Cut::new(1);
    for s in &simregions {
        forward.add(s.clone());
    }
    for s in simregions.iter().rev() {
        backward.add(s.clone());
    }
    assert_eq!(forward, backward);

    backward.remove(&simregions[2]);
    assert_ne!(forward, backward);
    Ok(())
}

#[test]
fn prechart_membership_is_monotonic_along_the_order() -> Result<(), ModelError> {
    let mut doc = Document::new();
    let Chart { tpl, uids: [a, b], .. } = chart(&mut doc)?;
    doc.add_message(tpl, a, b, 0, true)?;
    doc.add_message(tpl, b, a, 1, true)?;
    doc.add_message(tpl, a, b, 2, false)?;
    doc.template_mut(tpl).has_prechart = true;

    let simregions = doc.template(tpl).simregions();
    let mut cut = Cut::new(0);
    cut.add(simregions[0].clone());
    // Inside the prechart.
    assert!(cut.is_in_prechart());
    assert!(cut.is_in_prechart_before(&simregions[1]));
    // On the boundary: only prechart members, but the follower is outside.
    let mut boundary = Cut::new(1);
    boundary.add(simregions[1].clone());
    assert!(boundary.is_in_prechart());
    assert!(!boundary.is_in_prechart_before(&simregions[2]));
    // Past the boundary, membership never comes back.
    let mut past = Cut::new(2);
    past.add(simregions[2].clone());
    assert!(!past.is_in_prechart());
    assert!(!past.is_in_prechart_before(&simregions[1]));
    Ok(())
}

#[test]
fn instance_lines_bind_like_instances() -> Result<(), ModelError> {
    let mut doc = Document::new();
    let global = doc.global_frame();
    let params = doc.symbols_mut().new_frame(Some(global));
    doc.symbols_mut()
        .new_symbol(params, "id", TypeRef::UNTYPED, Position::default());
    let process_tpl = doc.add_template("Proc", params, Position::default(), true, "", "")?;

    let frame = doc.symbols_mut().new_frame(None);
    let chart_tpl =
        doc.add_template("Scenario", frame, Position::default(), false, "existential", "")?;
    let line = doc.add_instance_line(chart_tpl, "p", Position::default())?;
    let none = doc.symbols_mut().new_frame(None);
    doc.bind_instance_line(
        chart_tpl,
        line,
        InstanceRef::Template(process_tpl),
        none,
        &[Expr::from(7)],
    )?;

    let bound = &doc.template(chart_tpl).instance_line(line).instance;
    assert!(bound.is_complete());
    assert_eq!(bound.arguments, 1);
    assert_eq!(bound.template, Some(process_tpl));
    assert!(!doc.template(chart_tpl).is_invariant());
    Ok(())
}

#[test]
fn lsc_instances_live_in_their_own_collection() -> Result<(), ModelError> {
    let mut doc = Document::new();
    let params = doc.symbols_mut().new_frame(None);
    let tpl = doc.add_template("Proc", params, Position::default(), true, "", "")?;
    let none = doc.symbols_mut().new_frame(None);
    doc.add_lsc_instance(
        "observer",
        InstanceRef::Template(tpl),
        none,
        &[],
        Position::default(),
    )?;
    assert_eq!(doc.lsc_instances().len(), 1);
    assert!(doc.instances().is_empty());
    Ok(())
}

#[test]
fn dynamic_templates_are_indexed_by_name_and_order() -> Result<(), ModelError> {
    let mut doc = Document::new();
    let params = doc.symbols_mut().new_frame(None);
    let first = doc.add_dynamic_template("Spawned", params, Position::default())?;
    let params = doc.symbols_mut().new_frame(None);
    let second = doc.add_dynamic_template("Other", params, Position::default())?;

    assert!(doc.has_dynamic_templates());
    assert_eq!(doc.dynamic_templates(), &[first, second]);
    assert_eq!(doc.find_dynamic_template("Other"), Some(second));
    assert_eq!(doc.find_dynamic_template("Missing"), None);
    assert_eq!(doc.template(second).dyn_index, 1);
    assert!(doc.template(first).dynamic);
    Ok(())
}

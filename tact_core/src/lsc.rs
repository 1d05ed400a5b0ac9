//! Live Sequence Chart scenarios: instance lines, events, and the derived
//! simregion/cut partial order.
//!
//! An LSC template anchors its events (messages, conditions and updates)
//! on vertical [`InstanceLine`]s. Every event carries a vertical
//! coordinate; all events at the same coordinate form one [`Simregion`],
//! the unit of the scenario's partial order. A [`Cut`] is an antichain of
//! simregions: one consistent cross-section of the order, used by scenario
//! rendering and simulation to track progress through the chart.
//!
//! The chart splits into a *prechart* (the condition part that must be
//! observed before the chart's obligation becomes active) and a mainchart.
//! By construction of the partial order, once any event lies outside the
//! prechart everything causally after it does too, which is what the cut
//! predicates below rely on.

use crate::automaton::Template;
use crate::document::ModelError;
use crate::expr::Expr;
use crate::instance::Instance;
use crate::position::Position;
use crate::scope::{Symbol, SymbolData, SymbolTable, TypeRef};
use smallvec::SmallVec;

/// An indexing object for instance lines within one template, equal to the
/// line's ordinal.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct InstanceLineId(pub(crate) u32);

impl InstanceLineId {
    /// Position in the owning template's instance-line list.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The LSC-side projection of a process instance: anchors a vertical
/// sequence of events.
#[derive(Debug, Clone)]
pub struct InstanceLine {
    /// The projected instance; bound by the front end after creation.
    pub instance: Instance,
    /// Ordinal in the owning template.
    pub nr: u32,
}

impl InstanceLine {
    /// Filters `all` down to the simregions anchored on this line,
    /// preserving their vertical order.
    pub fn simregions(&self, all: &[Simregion]) -> Vec<Simregion> {
        let id = InstanceLineId(self.nr);
        all.iter()
            .filter(|s| s.is_anchored_on(id))
            .cloned()
            .collect()
    }
}

/// A message between two instance lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Placement in the input file.
    pub nr: u32,
    /// Vertical coordinate on the owning instance lines.
    pub location: i32,
    /// True if the message belongs to the prechart.
    pub in_prechart: bool,
    /// Source instance line.
    pub src: InstanceLineId,
    /// Destination instance line.
    pub dst: InstanceLineId,
    /// The label.
    pub label: Option<Expr>,
}

/// A condition anchored on one or more instance lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    /// Placement in the input file.
    pub nr: u32,
    /// Vertical coordinate on the anchor lines.
    pub location: i32,
    /// True if the condition belongs to the prechart.
    pub in_prechart: bool,
    /// Anchor instance lines.
    pub anchors: SmallVec<[InstanceLineId; 2]>,
    /// The label.
    pub label: Option<Expr>,
    /// Hot conditions must hold; cold ones may fail, aborting the chart.
    pub is_hot: bool,
}

/// An update anchored on a single instance line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    /// Placement in the input file.
    pub nr: u32,
    /// Vertical coordinate on the anchor line.
    pub location: i32,
    /// True if the update belongs to the prechart.
    pub in_prechart: bool,
    /// Anchor instance line.
    pub anchor: InstanceLineId,
    /// The label.
    pub label: Option<Expr>,
}

/// One vertical slot of a scenario: the message, condition and update (if
/// any) occurring at the same relative vertical position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Simregion {
    /// Ordinal in the derived vertical order.
    pub nr: u32,
    /// The message at this slot, if any.
    pub message: Option<Message>,
    /// The condition at this slot, if any.
    pub condition: Option<Condition>,
    /// The update at this slot, if any.
    pub update: Option<Update>,
}

impl Simregion {
    /// True if the slot carries a message.
    pub fn has_message(&self) -> bool {
        self.message.is_some()
    }

    /// True if the slot carries a condition.
    pub fn has_condition(&self) -> bool {
        self.condition.is_some()
    }

    /// True if the slot carries an update.
    pub fn has_update(&self) -> bool {
        self.update.is_some()
    }

    /// The vertical coordinate of the slot: the message's if present, else
    /// the condition's, else the update's, `-1` for an empty slot.
    pub fn location(&self) -> i32 {
        if let Some(message) = &self.message {
            message.location
        } else if let Some(condition) = &self.condition {
            condition.location
        } else if let Some(update) = &self.update {
            update.location
        } else {
            -1
        }
    }

    /// Prechart membership of the slot. All member events share the flag
    /// by construction, so the first present event decides.
    pub fn is_in_prechart(&self) -> bool {
        if let Some(message) = &self.message {
            message.in_prechart
        } else if let Some(condition) = &self.condition {
            condition.in_prechart
        } else if let Some(update) = &self.update {
            update.in_prechart
        } else {
            false
        }
    }

    pub(crate) fn is_anchored_on(&self, line: InstanceLineId) -> bool {
        self.message
            .as_ref()
            .is_some_and(|m| m.src == line || m.dst == line)
            || self
                .condition
                .as_ref()
                .is_some_and(|c| c.anchors.contains(&line))
            || self.update.as_ref().is_some_and(|u| u.anchor == line)
    }
}

/// An unordered collection of simregions forming one antichain of the
/// scenario's partial order.
#[derive(Debug, Clone, Default)]
pub struct Cut {
    /// Number assigned by the cut generator.
    pub nr: u32,
    simregions: Vec<Simregion>,
}

impl Cut {
    /// Creates an empty cut.
    pub fn new(nr: u32) -> Self {
        Cut {
            nr,
            simregions: Vec::new(),
        }
    }

    /// Adds a simregion to the cut.
    pub fn add(&mut self, simregion: Simregion) {
        self.simregions.push(simregion);
    }

    /// Removes a simregion from the cut, comparing by value.
    pub fn remove(&mut self, simregion: &Simregion) {
        self.simregions.retain(|s| s != simregion);
    }

    /// True if the cut contains an equal simregion.
    pub fn contains(&self, simregion: &Simregion) -> bool {
        self.simregions.iter().any(|s| s == simregion)
    }

    /// The simregions of the cut, in insertion order.
    pub fn simregions(&self) -> &[Simregion] {
        &self.simregions
    }

    /// True if the cut is empty.
    pub fn is_empty(&self) -> bool {
        self.simregions.is_empty()
    }

    /// True if every simregion of the cut is in the prechart.
    pub fn is_in_prechart(&self) -> bool {
        self.simregions.iter().all(Simregion::is_in_prechart)
    }

    /// True if the cut lies in the prechart, given one of the simregions
    /// immediately following it in the partial order.
    ///
    /// If a following simregion is outside the prechart then everything
    /// causally after it is too, and the cut is not in the prechart. It
    /// may still contain only prechart simregions when it sits exactly on
    /// the prechart/mainchart boundary.
    pub fn is_in_prechart_before(&self, following: &Simregion) -> bool {
        following.is_in_prechart() && self.is_in_prechart()
    }
}

/// Cuts compare as unordered sets of simregions: the same antichain
/// reached through different traversal paths must deduplicate.
impl PartialEq for Cut {
    fn eq(&self, other: &Self) -> bool {
        self.simregions.len() == other.simregions.len()
            && self.simregions.iter().all(|s| other.contains(s))
    }
}

impl Eq for Cut {}

impl Template {
    pub(crate) fn add_instance_line(
        &mut self,
        table: &mut SymbolTable,
        name: &str,
        position: Position,
    ) -> Result<InstanceLineId, ModelError> {
        if table.contains(self.declarations.frame, name) {
            return Err(ModelError::DuplicateDefinition {
                name: name.to_string(),
            });
        }
        let nr = self.instance_lines.len() as u32;
        let uid = table.new_symbol(self.declarations.frame, name, TypeRef::UNTYPED, position);
        table.set_data(uid, SymbolData::InstanceLine(nr));
        let parameters = table.new_frame(Some(self.declarations.frame));
        self.instance_lines.push(InstanceLine {
            instance: Instance::trivial(uid, parameters, 0, self.instance.template),
            nr,
        });
        Ok(InstanceLineId(nr))
    }

    pub(crate) fn resolve_instance_line(
        &self,
        table: &SymbolTable,
        symbol: Symbol,
    ) -> Result<InstanceLineId, ModelError> {
        match table.data(symbol) {
            SymbolData::InstanceLine(nr) if (nr as usize) < self.instance_lines.len() => {
                Ok(InstanceLineId(nr))
            }
            _ => Err(ModelError::UnknownInstanceLine {
                name: table.name(symbol).to_string(),
            }),
        }
    }

    pub(crate) fn push_message(
        &mut self,
        src: InstanceLineId,
        dst: InstanceLineId,
        location: i32,
        in_prechart: bool,
    ) -> &mut Message {
        let nr = self.messages.len() as u32;
        self.messages.push(Message {
            nr,
            location,
            in_prechart,
            src,
            dst,
            label: None,
        });
        self.messages.last_mut().expect("just pushed")
    }

    pub(crate) fn push_condition(
        &mut self,
        anchors: SmallVec<[InstanceLineId; 2]>,
        location: i32,
        in_prechart: bool,
        is_hot: bool,
    ) -> &mut Condition {
        let nr = self.conditions.len() as u32;
        self.conditions.push(Condition {
            nr,
            location,
            in_prechart,
            anchors,
            label: None,
            is_hot,
        });
        self.conditions.last_mut().expect("just pushed")
    }

    pub(crate) fn push_update(
        &mut self,
        anchor: InstanceLineId,
        location: i32,
        in_prechart: bool,
    ) -> &mut Update {
        let nr = self.updates.len() as u32;
        self.updates.push(Update {
            nr,
            location,
            in_prechart,
            anchor,
            label: None,
        });
        self.updates.last_mut().expect("just pushed")
    }

    /// The instance line behind a handle.
    pub fn instance_line(&self, id: InstanceLineId) -> &InstanceLine {
        &self.instance_lines[id.index()]
    }

    /// Derives the ordered simregion sequence of the scenario.
    ///
    /// Events from all instance lines are merged into one sequence keyed
    /// by vertical coordinate, one simregion per distinct coordinate. At
    /// each slot the first message, condition and update found in input
    /// order occupy their member; conditions anchored on no instance line
    /// are malformed and contribute no event (the type checker reports
    /// them).
    pub fn simregions(&self) -> Vec<Simregion> {
        let mut coordinates: Vec<i32> = self
            .messages
            .iter()
            .map(|m| m.location)
            .chain(
                self.conditions
                    .iter()
                    .filter(|c| !c.anchors.is_empty())
                    .map(|c| c.location),
            )
            .chain(self.updates.iter().map(|u| u.location))
            .collect();
        coordinates.sort_unstable();
        coordinates.dedup();
        coordinates
            .into_iter()
            .enumerate()
            .map(|(nr, location)| Simregion {
                nr: nr as u32,
                message: self
                    .messages
                    .iter()
                    .find(|m| m.location == location)
                    .cloned(),
                condition: self
                    .conditions
                    .iter()
                    .find(|c| c.location == location && !c.anchors.is_empty())
                    .cloned(),
                update: self.updates.iter().find(|u| u.location == location).cloned(),
            })
            .collect()
    }

    /// The condition anchored on `line` at vertical coordinate `y`.
    pub fn condition_at(&self, line: InstanceLineId, y: i32) -> Option<&Condition> {
        self.conditions
            .iter()
            .find(|c| c.location == y && c.anchors.contains(&line))
    }

    /// The update anchored on `line` at vertical coordinate `y`.
    pub fn update_at(&self, line: InstanceLineId, y: i32) -> Option<&Update> {
        self.updates
            .iter()
            .find(|u| u.location == y && u.anchor == line)
    }

    /// The first update anchored on any of `lines` at vertical
    /// coordinate `y`.
    pub fn update_on_any(&self, lines: &[InstanceLineId], y: i32) -> Option<&Update> {
        self.updates
            .iter()
            .find(|u| u.location == y && lines.contains(&u.anchor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(nr: u32, location: i32, in_prechart: bool) -> Message {
        Message {
            nr,
            location,
            in_prechart,
            src: InstanceLineId(0),
            dst: InstanceLineId(1),
            label: None,
        }
    }

    fn slot(nr: u32, location: i32, in_prechart: bool) -> Simregion {
        Simregion {
            nr,
            message: Some(message(nr, location, in_prechart)),
            condition: None,
            update: None,
        }
    }

    #[test]
    fn slot_location_prefers_message() {
        let mut simregion = slot(0, 3, true);
        simregion.update = Some(Update {
            nr: 0,
            location: 3,
            in_prechart: true,
            anchor: InstanceLineId(0),
            label: None,
        });
        assert_eq!(simregion.location(), 3);
        assert!(simregion.is_in_prechart());
        assert_eq!(Simregion::default().location(), -1);
    }

    #[test]
    fn cut_equality_ignores_insertion_order() {
        let (a, b, c) = (slot(0, 0, true), slot(1, 1, true), slot(2, 2, false));
        let mut forward = Cut::new(0);
        forward.add(a.clone());
        forward.add(b.clone());
        forward.add(c.clone());
        let mut backward = Cut::new(1);
        backward.add(c.clone());
        backward.add(a.clone());
        backward.add(b.clone());
        assert_eq!(forward, backward);
        backward.remove(&c);
        assert_ne!(forward, backward);
        assert!(forward.contains(&c));
    }

    #[test]
    fn prechart_membership_follows_the_boundary() {
        let prechart_slot = slot(0, 0, true);
        let boundary_follower = slot(1, 1, false);

        let mut cut = Cut::new(0);
        cut.add(prechart_slot.clone());
        assert!(cut.is_in_prechart());
        // On the boundary: all members are prechart, the follower is not.
        assert!(!cut.is_in_prechart_before(&boundary_follower));
        assert!(cut.is_in_prechart_before(&prechart_slot));

        let mut past = Cut::new(1);
        past.add(boundary_follower);
        assert!(!past.is_in_prechart());
        assert!(!past.is_in_prechart_before(&slot(2, 2, true)));
    }
}

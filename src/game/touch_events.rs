use std::collections::HashSet;

use super::backend::ObjectId;

/// Enter/exit lifecycle of a trigger volume for one tick.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TouchTransitions {
    pub entered: Vec<ObjectId>,
    pub exited: Vec<ObjectId>,
}

/// Compute enter/exit transitions from current and previous overlap sets.
/// Both lists are sorted so callers see a stable order.
pub fn compute_touch_transitions(
    current: &HashSet<ObjectId>,
    previous: &HashSet<ObjectId>,
) -> TouchTransitions {
    let mut entered: Vec<_> = current.difference(previous).copied().collect();
    let mut exited: Vec<_> = previous.difference(current).copied().collect();
    entered.sort_unstable();
    exited.sort_unstable();
    TouchTransitions { entered, exited }
}

/// Remembers what was inside a sensor on the previous tick.
#[derive(Debug, Default, Clone)]
pub struct TriggerVolume {
    inside: HashSet<ObjectId>,
}

impl TriggerVolume {
    pub fn update(&mut self, current: HashSet<ObjectId>) -> TouchTransitions {
        let transitions = compute_touch_transitions(&current, &self.inside);
        self.inside = current;
        transitions
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.inside.contains(&id)
    }
}

//! Objects the gauntlet may pick up.
//!
//! A pickable knows nothing about actions. It carries a grabbed-state toggle
//! (which also shows its ground marker) and queues signals for whoever holds
//! it: collision-stay contacts while grabbed, and release requests raised by
//! the level (e.g. a respawn area).

use std::collections::HashMap;

use nalgebra::{Point3, Vector3};

use super::backend::{ObjectId, PhysicsBackend};
use super::constants::pickable as consts;
use super::layers::LayerMask;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickableSignal {
    /// Still touching geometry this physics step
    CollisionStay,
    /// The object asks to be let go
    InvokeRelease,
}

#[derive(Debug, Clone, Default)]
pub struct PickableObject {
    grabbed: bool,
    /// Ground point under the object, shown while grabbed
    marker: Option<Point3<f32>>,
    signals: Vec<PickableSignal>,
}

impl PickableObject {
    pub fn is_grabbed(&self) -> bool {
        self.grabbed
    }

    pub fn marker(&self) -> Option<Point3<f32>> {
        self.marker
    }
}

#[derive(Debug, Clone)]
pub struct PickableRegistry {
    objects: HashMap<ObjectId, PickableObject>,
    marker_ray_distance: f32,
    marker_ignore_layers: LayerMask,
}

impl Default for PickableRegistry {
    fn default() -> Self {
        Self::new(consts::MARKER_RAY_DISTANCE, LayerMask::NONE)
    }
}

impl PickableRegistry {
    pub fn new(marker_ray_distance: f32, marker_ignore_layers: LayerMask) -> Self {
        Self {
            objects: HashMap::new(),
            marker_ray_distance,
            marker_ignore_layers,
        }
    }

    pub fn register(&mut self, id: ObjectId) {
        self.objects.entry(id).or_default();
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<PickableObject> {
        self.objects.remove(&id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&PickableObject> {
        self.objects.get(&id)
    }

    pub fn is_pickable(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn is_grabbed(&self, id: ObjectId) -> bool {
        self.objects.get(&id).is_some_and(|o| o.grabbed)
    }

    pub fn set_grabbed(&mut self, id: ObjectId, grabbed: bool) {
        if let Some(object) = self.objects.get_mut(&id) {
            object.grabbed = grabbed;
            if !grabbed {
                object.marker = None;
            }
        }
    }

    /// Collision-stay notification from the physics step. Ignored unless
    /// the object is in grabbed state.
    pub fn notify_collision_stay(&mut self, id: ObjectId) {
        if let Some(object) = self.objects.get_mut(&id) {
            if object.grabbed && !object.signals.contains(&PickableSignal::CollisionStay) {
                object.signals.push(PickableSignal::CollisionStay);
            }
        }
    }

    pub fn invoke_release(&mut self, id: ObjectId) {
        if let Some(object) = self.objects.get_mut(&id) {
            object.signals.push(PickableSignal::InvokeRelease);
        }
    }

    pub fn take_signals(&mut self, id: ObjectId) -> Vec<PickableSignal> {
        self.objects
            .get_mut(&id)
            .map(|o| std::mem::take(&mut o.signals))
            .unwrap_or_default()
    }

    /// Drops every queued signal. Signals nobody listens to do not carry over.
    pub fn clear_signals(&mut self) {
        for object in self.objects.values_mut() {
            object.signals.clear();
        }
    }

    pub fn marker(&self, id: ObjectId) -> Option<Point3<f32>> {
        self.objects.get(&id).and_then(|o| o.marker)
    }

    /// Drops each grabbed object's marker onto the ground below it.
    pub fn update_markers(&mut self, physics: &dyn PhysicsBackend) {
        let mask = self.marker_ignore_layers.inverted();
        for (&id, object) in self.objects.iter_mut() {
            if !object.grabbed {
                continue;
            }
            let Some(position) = physics.position(id) else {
                continue;
            };
            if let Some(hit) =
                physics.raycast(&position, &-Vector3::y(), self.marker_ray_distance, mask)
            {
                object.marker = Some(hit.point);
            }
        }
    }
}

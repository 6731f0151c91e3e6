//! Obstacle World
//!
//! Arena of circular bodies indexed by [`BodyHandle`]. Each body carries a
//! user-data name tag, and [`ObstacleWorld::step`] reports begin/end
//! contacts. Cross-references elsewhere in the crate are handles, never
//! owning pointers.
//!
//! Handles are allocated sequentially, so two peers that build the same map
//! in the same order agree on every handle. Ownership snapshots rely on that.

use std::collections::{BTreeMap, BTreeSet};
use serde::{Serialize, Deserialize};

use crate::core::fixed::{Fixed, fixed_mul, fixed_clamp, FIELD_HALF_WIDTH, FIELD_HALF_HEIGHT};
use crate::core::vec2::FixedVec2;

/// Index of a body in the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

/// Whether a body moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyKind {
    /// Never integrated.
    Static,
    /// Integrated from its velocity.
    Dynamic,
}

/// Parameters for [`ObstacleWorld::create_body`].
#[derive(Clone, Debug)]
pub struct BodyDef {
    /// User-data tag ("farmer", "carrot", "wheat", ...).
    pub name: String,
    /// Static or dynamic.
    pub kind: BodyKind,
    /// Initial position.
    pub position: FixedVec2,
    /// Initial linear velocity.
    pub linear_velocity: FixedVec2,
    /// Collision radius.
    pub radius: Fixed,
    /// Sensors report contacts but are never pushed apart.
    pub sensor: bool,
}

impl BodyDef {
    /// A solid dynamic body.
    pub fn dynamic(name: &str, position: FixedVec2, radius: Fixed) -> Self {
        Self {
            name: name.to_string(),
            kind: BodyKind::Dynamic,
            position,
            linear_velocity: FixedVec2::ZERO,
            radius,
            sensor: false,
        }
    }

    /// A static sensor (trigger area).
    pub fn sensor(name: &str, position: FixedVec2, radius: Fixed) -> Self {
        Self {
            name: name.to_string(),
            kind: BodyKind::Static,
            position,
            linear_velocity: FixedVec2::ZERO,
            radius,
            sensor: true,
        }
    }

    /// A solid static body.
    pub fn fixed(name: &str, position: FixedVec2, radius: Fixed) -> Self {
        Self {
            sensor: false,
            ..Self::sensor(name, position, radius)
        }
    }

    /// Builder: initial velocity.
    pub fn with_velocity(mut self, velocity: FixedVec2) -> Self {
        self.linear_velocity = velocity;
        self
    }
}

/// A body in the world.
#[derive(Clone, Debug)]
pub struct Body {
    /// Own handle.
    pub handle: BodyHandle,
    /// User-data tag.
    pub name: String,
    /// Static or dynamic.
    pub kind: BodyKind,
    /// Position.
    pub position: FixedVec2,
    /// Rotation in fixed-point radians.
    pub angle: Fixed,
    /// Linear velocity (units/sec).
    pub linear_velocity: FixedVec2,
    /// Angular velocity (radians/sec).
    pub angular_velocity: Fixed,
    /// Collision radius.
    pub radius: Fixed,
    /// Sensor flag.
    pub sensor: bool,
    /// Marked for removal at the next garbage collection.
    pub removed: bool,
}

/// An unordered pair of touching bodies, stored with `a < b`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Contact {
    /// Lower handle.
    pub a: BodyHandle,
    /// Higher handle.
    pub b: BodyHandle,
}

impl Contact {
    fn new(x: BodyHandle, y: BodyHandle) -> Self {
        if x < y { Self { a: x, b: y } } else { Self { a: y, b: x } }
    }

    /// The other body of the pair, if `handle` is in it.
    pub fn other(&self, handle: BodyHandle) -> Option<BodyHandle> {
        if self.a == handle {
            Some(self.b)
        } else if self.b == handle {
            Some(self.a)
        } else {
            None
        }
    }
}

/// Contacts that started and stopped during a step.
#[derive(Debug, Default)]
pub struct StepReport {
    /// New contacts.
    pub began: Vec<Contact>,
    /// Contacts that ended.
    pub ended: Vec<Contact>,
    /// Bodies integrated this step.
    pub integrated: usize,
}

/// The obstacle arena.
#[derive(Debug)]
pub struct ObstacleWorld {
    bodies: BTreeMap<BodyHandle, Body>,
    next_handle: u32,
    touching: BTreeSet<Contact>,
}

impl Default for ObstacleWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl ObstacleWorld {
    /// Empty world.
    pub fn new() -> Self {
        Self {
            bodies: BTreeMap::new(),
            next_handle: 0,
            touching: BTreeSet::new(),
        }
    }

    /// Add a body and return its handle.
    pub fn create_body(&mut self, def: BodyDef) -> BodyHandle {
        let handle = BodyHandle(self.next_handle);
        self.next_handle += 1;
        self.bodies.insert(handle, Body {
            handle,
            name: def.name,
            kind: def.kind,
            position: def.position,
            angle: 0,
            linear_velocity: def.linear_velocity,
            angular_velocity: 0,
            radius: def.radius,
            sensor: def.sensor,
            removed: false,
        });
        handle
    }

    /// Mark a body for removal. It leaves the world at [`Self::garbage_collect`].
    pub fn remove_body(&mut self, handle: BodyHandle) -> bool {
        match self.bodies.get_mut(&handle) {
            Some(body) if !body.removed => {
                body.removed = true;
                true
            }
            _ => false,
        }
    }

    /// Drop bodies marked for removal and forget their contacts.
    pub fn garbage_collect(&mut self) -> Vec<BodyHandle> {
        let dead: Vec<BodyHandle> = self.bodies.values()
            .filter(|b| b.removed)
            .map(|b| b.handle)
            .collect();
        for handle in &dead {
            self.bodies.remove(handle);
        }
        if !dead.is_empty() {
            self.touching.retain(|c| !dead.contains(&c.a) && !dead.contains(&c.b));
        }
        dead
    }

    /// Look up a live body.
    pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.get(&handle).filter(|b| !b.removed)
    }

    /// Look up a live body mutably.
    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.bodies.get_mut(&handle).filter(|b| !b.removed)
    }

    /// Position of a live body.
    pub fn position(&self, handle: BodyHandle) -> Option<FixedVec2> {
        self.body(handle).map(|b| b.position)
    }

    /// Teleport a body and zero its velocity.
    pub fn place(&mut self, handle: BodyHandle, position: FixedVec2) -> bool {
        match self.body_mut(handle) {
            Some(body) => {
                body.position = position;
                body.linear_velocity = FixedVec2::ZERO;
                body.angular_velocity = 0;
                true
            }
            None => false,
        }
    }

    /// Set a body's linear velocity.
    pub fn set_velocity(&mut self, handle: BodyHandle, velocity: FixedVec2) -> bool {
        match self.body_mut(handle) {
            Some(body) => {
                body.linear_velocity = velocity;
                true
            }
            None => false,
        }
    }

    /// Switch a body between static and dynamic.
    pub fn set_kind(&mut self, handle: BodyHandle, kind: BodyKind) -> bool {
        match self.body_mut(handle) {
            Some(body) => {
                body.kind = kind;
                if kind == BodyKind::Static {
                    body.linear_velocity = FixedVec2::ZERO;
                    body.angular_velocity = 0;
                }
                true
            }
            None => false,
        }
    }

    /// Live bodies in handle order.
    pub fn bodies(&self) -> impl Iterator<Item = &Body> {
        self.bodies.values().filter(|b| !b.removed)
    }

    /// Number of live bodies.
    pub fn len(&self) -> usize {
        self.bodies().count()
    }

    /// Whether the world has no live bodies.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether two bodies are currently in contact.
    pub fn is_touching(&self, x: BodyHandle, y: BodyHandle) -> bool {
        self.touching.contains(&Contact::new(x, y))
    }

    /// Sensors of the given tag whose area contains `point`.
    pub fn sensors_containing(&self, name: &str, point: FixedVec2) -> Vec<BodyHandle> {
        self.bodies()
            .filter(|b| b.sensor && b.name == name && b.position.within(point, b.radius))
            .map(|b| b.handle)
            .collect()
    }

    /// Advance by `dt` seconds.
    ///
    /// Only dynamic bodies for which `integrates` returns true are moved;
    /// the rest keep whatever transform they were last given. Contacts are
    /// then recomputed for every live pair.
    pub fn step<F>(&mut self, dt: Fixed, integrates: F) -> StepReport
    where
        F: Fn(BodyHandle) -> bool,
    {
        let mut report = StepReport::default();

        for body in self.bodies.values_mut() {
            if body.removed || body.kind != BodyKind::Dynamic || !integrates(body.handle) {
                continue;
            }
            let delta = body.linear_velocity.scale(dt);
            let next = body.position + delta;
            let clamped = FixedVec2::new(
                fixed_clamp(next.x, -FIELD_HALF_WIDTH + body.radius, FIELD_HALF_WIDTH - body.radius),
                fixed_clamp(next.y, -FIELD_HALF_HEIGHT + body.radius, FIELD_HALF_HEIGHT - body.radius),
            );
            // Bounce off the field edge.
            if clamped.x != next.x {
                body.linear_velocity.x = body.linear_velocity.x.wrapping_neg();
            }
            if clamped.y != next.y {
                body.linear_velocity.y = body.linear_velocity.y.wrapping_neg();
            }
            body.position = clamped;
            body.angle = body.angle.wrapping_add(fixed_mul(body.angular_velocity, dt));
            report.integrated += 1;
        }

        let live: Vec<&Body> = self.bodies.values().filter(|b| !b.removed).collect();
        let mut now = BTreeSet::new();
        for (i, x) in live.iter().enumerate() {
            for y in &live[i + 1..] {
                if x.sensor && y.sensor {
                    continue;
                }
                if x.position.within(y.position, x.radius.wrapping_add(y.radius)) {
                    now.insert(Contact::new(x.handle, y.handle));
                }
            }
        }

        report.began = now.difference(&self.touching).copied().collect();
        report.ended = self.touching.difference(&now).copied().collect();
        self.touching = now;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::{to_fixed, FIXED_ONE};

    #[test]
    fn test_handles_are_sequential() {
        let mut world = ObstacleWorld::new();
        let a = world.create_body(BodyDef::fixed("boundary", FixedVec2::ZERO, FIXED_ONE));
        let b = world.create_body(BodyDef::fixed("boundary", FixedVec2::ZERO, FIXED_ONE));
        assert_eq!(a, BodyHandle(0));
        assert_eq!(b, BodyHandle(1));
    }

    #[test]
    fn test_step_integrates_only_filtered_bodies() {
        let mut world = ObstacleWorld::new();
        let vel = FixedVec2::from_ints(1, 0);
        let mine = world.create_body(
            BodyDef::dynamic("carrot", FixedVec2::from_ints(-5, 0), to_fixed(0.1)).with_velocity(vel),
        );
        let theirs = world.create_body(
            BodyDef::dynamic("carrot", FixedVec2::from_ints(5, 0), to_fixed(0.1)).with_velocity(vel),
        );

        let report = world.step(FIXED_ONE, |h| h == mine);
        assert_eq!(report.integrated, 1);
        assert_eq!(world.position(mine), Some(FixedVec2::from_ints(-4, 0)));
        assert_eq!(world.position(theirs), Some(FixedVec2::from_ints(5, 0)));
    }

    #[test]
    fn test_static_bodies_never_move() {
        let mut world = ObstacleWorld::new();
        let post = world.create_body(
            BodyDef::fixed("boundary", FixedVec2::ZERO, FIXED_ONE).with_velocity(FixedVec2::from_ints(1, 1)),
        );
        world.step(FIXED_ONE, |_| true);
        assert_eq!(world.position(post), Some(FixedVec2::ZERO));
    }

    #[test]
    fn test_begin_and_end_contacts() {
        let mut world = ObstacleWorld::new();
        let spot = world.create_body(BodyDef::sensor("planting_spot", FixedVec2::ZERO, FIXED_ONE));
        let carrot = world.create_body(BodyDef::dynamic("carrot", FixedVec2::from_ints(3, 0), to_fixed(0.5)));

        let report = world.step(FIXED_ONE, |_| true);
        assert!(report.began.is_empty());

        world.place(carrot, FixedVec2::new(FIXED_ONE, 0));
        let report = world.step(FIXED_ONE, |_| true);
        assert_eq!(report.began, vec![Contact::new(spot, carrot)]);
        assert!(world.is_touching(carrot, spot));

        // Contact persists without being reported again.
        let report = world.step(FIXED_ONE, |_| true);
        assert!(report.began.is_empty());

        world.place(carrot, FixedVec2::from_ints(5, 0));
        let report = world.step(FIXED_ONE, |_| true);
        assert_eq!(report.ended, vec![Contact::new(spot, carrot)]);
    }

    #[test]
    fn test_removal_is_deferred_to_garbage_collect() {
        let mut world = ObstacleWorld::new();
        let baby = world.create_body(BodyDef::dynamic("baby", FixedVec2::ZERO, FIXED_ONE));
        assert!(world.remove_body(baby));
        assert!(!world.remove_body(baby));
        assert!(world.body(baby).is_none());
        assert_eq!(world.garbage_collect(), vec![baby]);
        assert!(world.garbage_collect().is_empty());
        assert!(world.is_empty());
    }

    #[test]
    fn test_sensor_containment() {
        let mut world = ObstacleWorld::new();
        let wheat = world.create_body(BodyDef::sensor("wheat", FixedVec2::ZERO, 2 * FIXED_ONE));
        assert_eq!(world.sensors_containing("wheat", FixedVec2::from_ints(1, 1)), vec![wheat]);
        assert!(world.sensors_containing("wheat", FixedVec2::from_ints(3, 0)).is_empty());
        assert!(world.sensors_containing("planting_spot", FixedVec2::ZERO).is_empty());
    }

    #[test]
    fn test_field_edge_bounce() {
        let mut world = ObstacleWorld::new();
        let rock = world.create_body(
            BodyDef::dynamic("rock", FixedVec2::new(FIELD_HALF_WIDTH - FIXED_ONE, 0), 0)
                .with_velocity(FixedVec2::from_ints(5, 0)),
        );
        world.step(FIXED_ONE, |_| true);
        let body = world.body(rock).unwrap();
        assert_eq!(body.position.x, FIELD_HALF_WIDTH);
        assert!(body.linear_velocity.x < 0);
    }
}

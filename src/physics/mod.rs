pub mod systems;

use bevy::prelude::*;
use crossbeam::channel::{unbounded, Receiver};
use rapier2d::na::UnitComplex;
use rapier2d::prelude::*;
use std::collections::{HashMap, HashSet};
use std::ops::BitOr;
use thiserror::Error;

pub use systems::PhysicsPlugin;

/// Physics units per world unit (one cell)
pub const SCALE: f32 = 32.0;

/// Nominal step rate gameplay velocities are expressed against
pub const STEP_RATE: f32 = 60.0;

/// Longest step the simulation takes in one go
pub const MAX_STEP: f32 = 1.0 / 20.0;

/// Single-bit collision categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollisionCategory(pub u32);

impl CollisionCategory {
    pub const NONE: Self = Self(0);
    pub const PLAYER: Self = Self(0x0001);
    pub const MONSTER: Self = Self(0x0002);
    pub const WALL: Self = Self(0x0008);
    pub const ALL: Self = Self(u32::MAX);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    fn group(self) -> Group {
        Group::from_bits_truncate(self.0)
    }
}

impl BitOr for CollisionCategory {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[derive(Debug, Error)]
pub enum PhysicsError {
    #[error("unsure what kind of body to make for `{name}`: it has neither width/height nor radius")]
    MissingExtent { name: String },
}

/// Collision shape in world units
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BodyShape {
    Cuboid { width: f32, height: f32 },
    Ball { radius: f32 },
}

/// Anything that can be given a physics body
///
/// Implementors report either a rectangular or a circular extent.
pub trait PhysicalBody {
    fn body_name(&self) -> &str;

    fn width(&self) -> Option<f32> {
        None
    }

    fn height(&self) -> Option<f32> {
        None
    }

    fn radius(&self) -> Option<f32> {
        None
    }

    fn shape(&self) -> Result<BodyShape, PhysicsError> {
        match (self.width(), self.height(), self.radius()) {
            (Some(width), Some(height), _) if width > 0.0 && height > 0.0 => {
                Ok(BodyShape::Cuboid { width, height })
            }
            (_, _, Some(radius)) if radius > 0.0 => Ok(BodyShape::Ball { radius }),
            _ => Err(PhysicsError::MissingExtent {
                name: self.body_name().to_string(),
            }),
        }
    }
}

/// How a body is created
#[derive(Debug, Clone, Copy)]
pub struct BodyOptions {
    pub is_static: bool,
    pub is_sensor: bool,
    pub category: CollisionCategory,
    pub mask: CollisionCategory,
    pub mass: Option<f32>,
    /// Per-second linear damping
    pub damping: f32,
    pub friction: f32,
    /// Rotation is driven by gameplay code only
    pub lock_rotation: bool,
}

impl Default for BodyOptions {
    fn default() -> Self {
        Self {
            is_static: false,
            is_sensor: false,
            category: CollisionCategory::ALL,
            mask: CollisionCategory::ALL,
            mass: None,
            damping: 0.0,
            friction: 0.0,
            lock_rotation: false,
        }
    }
}

impl BodyOptions {
    pub fn wall() -> Self {
        Self {
            is_static: true,
            category: CollisionCategory::WALL,
            ..default()
        }
    }

    /// Static sensor reporting overlaps with the given categories
    pub fn sensor(mask: CollisionCategory) -> Self {
        Self {
            is_static: true,
            is_sensor: true,
            mask,
            ..default()
        }
    }
}

/// Links an entity to the body that drives its position
#[derive(Component, Debug, Clone, Copy)]
pub struct PhysicsBody(pub RigidBodyHandle);

/// A body's pose for writing back onto its owner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncedPose {
    pub owner: Entity,
    /// World units on the x/z plane
    pub position: Vec2,
}

/// The 2D rigid-body simulation behind every wall, player, monster and trigger
#[derive(Resource)]
pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    gravity: Vector<f32>,
    integration_parameters: IntegrationParameters,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    /// Body → owning entity
    owners: HashMap<RigidBodyHandle, Entity>,
    /// Collider pairs currently touching or overlapping, stored in both orders
    active_pairs: HashSet<(ColliderHandle, ColliderHandle)>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            // Gravity is applied per entity, never globally
            gravity: vector![0.0, 0.0],
            // Tolerances are tuned for unit-sized objects; ours are SCALE units wide
            integration_parameters: IntegrationParameters {
                length_unit: SCALE,
                ..IntegrationParameters::default()
            },
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            owners: HashMap::new(),
            active_pairs: HashSet::new(),
        }
    }
}

impl PhysicsWorld {
    /// Create a body for `entity` at `position` (world units), owned by `owner`
    pub fn add_entity(
        &mut self,
        owner: Entity,
        entity: &impl PhysicalBody,
        position: Vec2,
        options: BodyOptions,
    ) -> Result<RigidBodyHandle, PhysicsError> {
        let shape = entity.shape()?;
        let handle = self.insert(position, shape, options);
        self.owners.insert(handle, owner);
        Ok(handle)
    }

    /// Static unit box for a solid cell, centred at `center` (world units)
    pub fn add_static_box(&mut self, center: Vec2) -> RigidBodyHandle {
        self.insert(
            center,
            BodyShape::Cuboid {
                width: 1.0,
                height: 1.0,
            },
            BodyOptions::wall(),
        )
    }

    fn insert(&mut self, position: Vec2, shape: BodyShape, options: BodyOptions) -> RigidBodyHandle {
        let position = position * SCALE;
        let mut body = if options.is_static {
            RigidBodyBuilder::fixed()
        } else {
            RigidBodyBuilder::dynamic()
        }
        .translation(vector![position.x, position.y])
        .linear_damping(options.damping);
        if options.lock_rotation {
            body = body.lock_rotations();
        }
        let handle = self.bodies.insert(body.build());

        let mut collider = match shape {
            BodyShape::Cuboid { width, height } => {
                ColliderBuilder::cuboid(width * SCALE / 2.0, height * SCALE / 2.0)
            }
            BodyShape::Ball { radius } => ColliderBuilder::ball(radius * SCALE),
        };

        // Sensors belong to every group so only their own mask decides what they report
        let groups = if options.is_sensor {
            InteractionGroups::new(CollisionCategory::ALL.group(), options.mask.group())
        } else {
            InteractionGroups::new(options.category.group(), options.mask.group())
        };
        collider = collider
            .sensor(options.is_sensor)
            .friction(options.friction)
            .collision_groups(groups)
            .active_events(ActiveEvents::COLLISION_EVENTS);
        if let Some(mass) = options.mass {
            collider = collider.mass(mass);
        }

        self.colliders
            .insert_with_parent(collider.build(), handle, &mut self.bodies);
        handle
    }

    /// Advance the simulation by `delta` seconds and record which colliders started or
    /// stopped touching
    pub fn step(&mut self, delta: f32) {
        if delta <= 0.0 {
            return;
        }
        self.integration_parameters.dt = delta.min(MAX_STEP);

        let (collision_send, collision_recv) = unbounded();
        let (contact_force_send, _contact_force_recv) = unbounded();
        let collector = ChannelEventCollector::new(collision_send, contact_force_send);

        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &collector,
        );

        self.apply_collision_events(&collision_recv);
    }

    fn apply_collision_events(&mut self, events: &Receiver<CollisionEvent>) {
        while let Ok(event) = events.try_recv() {
            match event {
                CollisionEvent::Started(a, b, _) => {
                    self.active_pairs.insert((a, b));
                    self.active_pairs.insert((b, a));
                }
                CollisionEvent::Stopped(a, b, _) => {
                    self.active_pairs.remove(&(a, b));
                    self.active_pairs.remove(&(b, a));
                }
            }
        }
    }

    /// Owners of every body currently overlapping `handle`'s colliders
    pub fn overlapping(&self, handle: RigidBodyHandle) -> Vec<Entity> {
        let Some(body) = self.bodies.get(handle) else {
            return Vec::new();
        };

        let mut owners = Vec::new();
        for collider in body.colliders() {
            for (_, other) in self.active_pairs.iter().filter(|(a, _)| a == collider) {
                let owner = self
                    .colliders
                    .get(*other)
                    .and_then(|c| c.parent())
                    .and_then(|parent| self.owners.get(&parent));
                if let Some(&owner) = owner {
                    if !owners.contains(&owner) {
                        owners.push(owner);
                    }
                }
            }
        }
        owners
    }

    /// Pose of every owned body in world units
    pub fn synced_positions(&self) -> impl Iterator<Item = SyncedPose> + '_ {
        self.owners.iter().filter_map(|(handle, &owner)| {
            let body = self.bodies.get(*handle)?;
            let translation = body.translation();
            Some(SyncedPose {
                owner,
                position: Vec2::new(translation.x, translation.y) / SCALE,
            })
        })
    }

    /// Velocity in physics units per nominal step
    pub fn linvel(&self, handle: RigidBodyHandle) -> Vec2 {
        self.bodies
            .get(handle)
            .map(|body| Vec2::new(body.linvel().x, body.linvel().y) / STEP_RATE)
            .unwrap_or(Vec2::ZERO)
    }

    pub fn set_linvel(&mut self, handle: RigidBodyHandle, velocity: Vec2) {
        if let Some(body) = self.bodies.get_mut(handle) {
            let velocity = velocity * STEP_RATE;
            body.set_linvel(vector![velocity.x, velocity.y], true);
        }
    }

    pub fn angle(&self, handle: RigidBodyHandle) -> f32 {
        self.bodies
            .get(handle)
            .map(|body| body.rotation().angle())
            .unwrap_or(0.0)
    }

    pub fn set_angle(&mut self, handle: RigidBodyHandle, angle: f32) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_rotation(UnitComplex::new(angle), true);
        }
    }

    /// Position of a body in world units
    pub fn position(&self, handle: RigidBodyHandle) -> Option<Vec2> {
        let translation = self.bodies.get(handle)?.translation();
        Some(Vec2::new(translation.x, translation.y) / SCALE)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Centres of every static body in world units
    #[cfg(test)]
    pub(crate) fn fixed_positions(&self) -> Vec<Vec2> {
        self.bodies
            .iter()
            .filter(|(_, body)| body.is_fixed())
            .map(|(_, body)| Vec2::new(body.translation().x, body.translation().y) / SCALE)
            .collect()
    }

    /// Drop every body, collider and overlap
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ball(f32);

    impl PhysicalBody for Ball {
        fn body_name(&self) -> &str {
            "ball"
        }

        fn radius(&self) -> Option<f32> {
            Some(self.0)
        }
    }

    struct Zone(f32, f32);

    impl PhysicalBody for Zone {
        fn body_name(&self) -> &str {
            "zone"
        }

        fn width(&self) -> Option<f32> {
            Some(self.0)
        }

        fn height(&self) -> Option<f32> {
            Some(self.1)
        }
    }

    struct Shapeless;

    impl PhysicalBody for Shapeless {
        fn body_name(&self) -> &str {
            "ghost"
        }
    }

    fn entity(world: &mut World) -> Entity {
        world.spawn_empty().id()
    }

    #[test]
    fn test_shape_selection() {
        assert_eq!(Ball(0.2).shape().unwrap(), BodyShape::Ball { radius: 0.2 });
        assert_eq!(
            Zone(2.0, 1.0).shape().unwrap(),
            BodyShape::Cuboid {
                width: 2.0,
                height: 1.0
            }
        );

        let err = Shapeless.shape().unwrap_err();
        assert!(matches!(err, PhysicsError::MissingExtent { ref name } if name == "ghost"));
    }

    #[test]
    fn test_missing_extent_creates_nothing() {
        let mut ecs = World::new();
        let owner = entity(&mut ecs);
        let mut physics = PhysicsWorld::default();

        assert!(physics
            .add_entity(owner, &Shapeless, Vec2::ZERO, BodyOptions::default())
            .is_err());
        assert_eq!(physics.body_count(), 0);
    }

    #[test]
    fn test_positions_are_scaled() {
        let mut ecs = World::new();
        let owner = entity(&mut ecs);
        let mut physics = PhysicsWorld::default();
        let handle = physics
            .add_entity(owner, &Ball(0.2), Vec2::new(3.5, 2.5), BodyOptions::default())
            .unwrap();

        let body = physics.bodies.get(handle).unwrap();
        assert_eq!(body.translation().x, 3.5 * SCALE);
        assert_eq!(physics.position(handle), Some(Vec2::new(3.5, 2.5)));

        let pose = physics.synced_positions().next().unwrap();
        assert_eq!(pose.owner, owner);
        assert_eq!(pose.position, Vec2::new(3.5, 2.5));
    }

    #[test]
    fn test_velocity_moves_body_without_gravity() {
        let mut ecs = World::new();
        let owner = entity(&mut ecs);
        let mut physics = PhysicsWorld::default();
        let handle = physics
            .add_entity(owner, &Ball(0.2), Vec2::new(1.5, 1.5), BodyOptions::default())
            .unwrap();

        physics.set_linvel(handle, Vec2::new(1.0, 0.0));
        assert!(physics.linvel(handle).abs_diff_eq(Vec2::new(1.0, 0.0), 1e-5));

        for _ in 0..30 {
            physics.step(1.0 / 60.0);
        }

        let position = physics.position(handle).unwrap();
        assert!(position.x > 1.5);
        // Zero gravity: nothing pulls the body sideways
        assert!((position.y - 1.5).abs() < 1e-4);
    }

    #[test]
    fn test_walls_stop_bodies() {
        let mut ecs = World::new();
        let owner = entity(&mut ecs);
        let mut physics = PhysicsWorld::default();
        physics.add_static_box(Vec2::new(3.5, 1.5));
        let handle = physics
            .add_entity(owner, &Ball(0.2), Vec2::new(1.5, 1.5), BodyOptions::default())
            .unwrap();

        for _ in 0..240 {
            physics.set_linvel(handle, Vec2::new(1.0, 0.0));
            physics.step(1.0 / 60.0);
        }

        // The ball's edge cannot pass the wall's face at x = 3
        let position = physics.position(handle).unwrap();
        assert!(position.x < 3.0 - 0.2 + 0.05);
    }

    #[test]
    fn test_sensor_reports_masked_overlaps() {
        let mut ecs = World::new();
        let trigger = entity(&mut ecs);
        let player = entity(&mut ecs);
        let monster = entity(&mut ecs);
        let mut physics = PhysicsWorld::default();

        let zone = physics
            .add_entity(
                trigger,
                &Zone(2.0, 2.0),
                Vec2::new(2.0, 2.0),
                BodyOptions::sensor(CollisionCategory::PLAYER),
            )
            .unwrap();
        physics
            .add_entity(
                player,
                &Ball(0.2),
                Vec2::new(2.0, 2.0),
                BodyOptions {
                    category: CollisionCategory::PLAYER,
                    ..default()
                },
            )
            .unwrap();
        physics
            .add_entity(
                monster,
                &Ball(0.4),
                Vec2::new(2.5, 2.5),
                BodyOptions {
                    category: CollisionCategory::MONSTER,
                    ..default()
                },
            )
            .unwrap();

        physics.step(1.0 / 60.0);
        physics.step(1.0 / 60.0);

        assert_eq!(physics.overlapping(zone), vec![player]);
    }

    #[test]
    fn test_overlap_ends_when_body_leaves() {
        let mut ecs = World::new();
        let trigger = entity(&mut ecs);
        let player = entity(&mut ecs);
        let mut physics = PhysicsWorld::default();

        let zone = physics
            .add_entity(
                trigger,
                &Zone(1.0, 1.0),
                Vec2::new(1.5, 1.5),
                BodyOptions::sensor(CollisionCategory::PLAYER),
            )
            .unwrap();
        let body = physics
            .add_entity(
                player,
                &Ball(0.2),
                Vec2::new(1.5, 1.5),
                BodyOptions {
                    category: CollisionCategory::PLAYER,
                    ..default()
                },
            )
            .unwrap();

        physics.step(1.0 / 60.0);
        assert_eq!(physics.overlapping(zone), vec![player]);

        for _ in 0..60 {
            physics.set_linvel(body, Vec2::new(1.0, 0.0));
            physics.step(1.0 / 60.0);
        }
        assert!(physics.overlapping(zone).is_empty());
    }

    #[test]
    fn test_world_has_no_gravity() {
        let physics = PhysicsWorld::default();
        let gravity: Vector<f32> = physics.gravity;
        assert_eq!(gravity, vector![0.0, 0.0]);
        assert_eq!(physics.body_count(), 0);
    }

    #[test]
    fn test_categories_combine() {
        let mask = CollisionCategory::PLAYER | CollisionCategory::MONSTER;
        assert_eq!(mask.bits(), 0x3);
        assert!(mask.contains(CollisionCategory::MONSTER));
        assert!(!mask.contains(CollisionCategory::WALL));
    }
}

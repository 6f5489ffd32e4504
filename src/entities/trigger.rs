use super::spawning::DeferredSpawns;
use crate::level::{LevelRuntime, Properties};
use crate::physics::{CollisionCategory, PhysicalBody, PhysicsBody, PhysicsWorld};
use bevy::prelude::*;
use serde::Deserialize;
use serde_json::Value;

/// One entry of a trigger's `spawn` list
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpawnEntry {
    pub name: String,
    /// Milliseconds between firing and the spawn
    #[serde(default)]
    pub delay: f32,
}

impl SpawnEntry {
    /// Parse a `spawn` property: a JSON string (as Tiled stores it) or an inline array
    pub fn parse_list(value: &Value) -> Result<Vec<SpawnEntry>, serde_json::Error> {
        match value {
            Value::String(text) if text.trim().is_empty() => Ok(Vec::new()),
            Value::String(text) => serde_json::from_str(text),
            other => serde_json::from_value(other.clone()),
        }
    }

    pub fn delay_secs(&self) -> f32 {
        self.delay.max(0.0) / 1000.0
    }
}

/// A sensor zone that schedules monsters when something it watches walks in
#[derive(Component, Debug, Clone)]
pub struct Trigger {
    pub name: String,
    pub width: f32,
    pub height: f32,
    pub cooldown_remaining: f32,
    /// Seconds before the trigger re-arms; `None` fires once
    pub repeat: Option<f32>,
    pub spawns: Vec<SpawnEntry>,
}

impl Trigger {
    pub fn new(name: impl Into<String>, width: f32, height: f32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            cooldown_remaining: 0.0,
            repeat: None,
            spawns: Vec::new(),
        }
    }

    /// Build from an object's properties. A malformed spawn list is reported and
    /// treated as empty.
    pub fn from_properties(
        name: impl Into<String>,
        width: f32,
        height: f32,
        properties: &Properties,
    ) -> Self {
        let mut trigger = Self::new(name, width, height);
        trigger.repeat = properties.number("repeat").filter(|repeat| *repeat > 0.0);

        if let Some(value) = properties.get("spawn") {
            match SpawnEntry::parse_list(value) {
                Ok(spawns) => trigger.spawns = spawns,
                Err(e) => warn!("Trigger {} has a malformed spawn list: {}", trigger.name, e),
            }
        }
        trigger
    }

    pub fn is_armed(&self) -> bool {
        self.cooldown_remaining <= 0.0
    }

    /// Fire if armed, starting the cooldown. Returns whether it fired.
    pub fn try_fire(&mut self) -> bool {
        if !self.is_armed() {
            return false;
        }
        self.cooldown_remaining = self.repeat.unwrap_or(f32::INFINITY);
        true
    }

    pub fn tick(&mut self, delta: f32) {
        self.cooldown_remaining = (self.cooldown_remaining - delta).max(0.0);
    }
}

impl PhysicalBody for Trigger {
    fn body_name(&self) -> &str {
        &self.name
    }

    fn width(&self) -> Option<f32> {
        Some(self.width)
    }

    fn height(&self) -> Option<f32> {
        Some(self.height)
    }
}

/// Categories a trigger reacts to, from its `monsterTrigger` / `playerTrigger` flags
pub fn trigger_mask(properties: &Properties) -> CollisionCategory {
    let mut mask = CollisionCategory::NONE;
    if properties.flag("monsterTrigger") {
        mask = mask | CollisionCategory::MONSTER;
    }
    if properties.flag("playerTrigger") {
        mask = mask | CollisionCategory::PLAYER;
    }
    mask
}

/// Fires armed triggers with something inside them and schedules their spawns
pub fn fire_triggers(
    physics: Res<PhysicsWorld>,
    level: Res<LevelRuntime>,
    mut deferred: ResMut<DeferredSpawns>,
    mut triggers: Query<(&PhysicsBody, &mut Trigger)>,
) {
    for (body, mut trigger) in &mut triggers {
        if !trigger.is_armed() || physics.overlapping(body.0).is_empty() {
            continue;
        }
        if !trigger.try_fire() {
            continue;
        }
        info!("Trigger {} fired", trigger.name);

        for entry in &trigger.spawns {
            let mut matched = false;
            for object in level.objects().iter().filter(|o| o.name == entry.name) {
                deferred.schedule(entry.delay_secs(), object.clone(), level.spawn_token());
                matched = true;
            }
            if !matched {
                warn!(
                    "Trigger {} wants to spawn {}, which is not on the entities layer",
                    trigger.name, entry.name
                );
            }
        }
    }
}

/// Counts cooling triggers down towards re-arming
pub fn cool_triggers(time: Res<Time>, mut triggers: Query<&mut Trigger>) {
    let delta = time.delta_secs();
    for mut trigger in &mut triggers {
        if !trigger.is_armed() {
            trigger.tick(delta);
        }
    }
}

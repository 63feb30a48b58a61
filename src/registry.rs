//! Gravity field registry.
//!
//! The registry is the single source of truth for "which field governs this
//! point". It holds a per-step snapshot of every active field, answers
//! nearest-field queries, and remembers the last field each tracked entity
//! was resolved to so that reference-frame transitions can be detected.

use bevy::platform::collections::HashMap;
use bevy::prelude::*;

use crate::field::GravityField;
use crate::orientation::GravityOrientation;

/// A registered field together with its position snapshot for this step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldEntry {
    /// Entity that owns the field.
    pub id: Entity,
    /// World position of the field, captured at the last sync.
    pub position: Vec3,
    /// Field parameters.
    pub field: GravityField,
}

impl FieldEntry {
    #[inline]
    pub fn in_range(&self, point: Vec3) -> bool {
        self.field.in_range(self.position, point)
    }

    #[inline]
    pub fn gravity_at(&self, point: Vec3) -> Vec3 {
        self.field.gravity_at(self.position, point)
    }

    #[inline]
    pub fn direction_at(&self, point: Vec3) -> Vec3 {
        self.field.direction_at(self.position, point)
    }
}

/// Result of a field-change check for one tracked entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldChange {
    /// Field the entity was resolved to before this check.
    pub previous: Option<Entity>,
    /// Field the entity is resolved to now. `None` when it left every field.
    pub current: Option<Entity>,
    /// Unit gravity direction of the new field at the entity, or zero.
    pub gravity_direction: Vec3,
}

/// Event raised whenever a tracked entity's governing field changes.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct GravityFieldChanged {
    /// The tracked entity.
    pub entity: Entity,
    /// Previously governing field.
    pub previous: Option<Entity>,
    /// Newly governing field.
    pub current: Option<Entity>,
    /// Unit gravity direction at the entity under the new field, or zero.
    pub gravity_direction: Vec3,
}

/// Registry of all active gravity fields.
///
/// Inserted by the plugin and kept in sync with `GravityField` entities at
/// the start of every fixed step, which replaces anything registered by hand.
/// Used on its own it is driven through [`register`](Self::register) and
/// [`unregister`](Self::unregister).
///
/// # Tie-breaking
///
/// When two in-range fields are exactly equidistant from a query point, the
/// one registered first wins. Fields discovered in the same sync pass are
/// registered in ascending `Entity` order, so the outcome is stable across
/// runs of the same scene.
#[derive(Resource, Debug, Default, Clone)]
pub struct GravityFieldRegistry {
    entries: Vec<FieldEntry>,
    last_resolved: HashMap<Entity, Option<Entity>>,
    /// Entities whose resolved field was unregistered, with the lost field.
    lost: HashMap<Entity, Entity>,
}

impl GravityFieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a field, or update it in place if already registered.
    ///
    /// Returns `true` when the field is new.
    pub fn register(&mut self, id: Entity, position: Vec3, field: GravityField) -> bool {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) {
            entry.position = position;
            entry.field = field;
            return false;
        }
        debug!("registering gravity field {id} at {position}");
        self.entries.push(FieldEntry {
            id,
            position,
            field,
        });
        true
    }

    /// Remove a field.
    ///
    /// Entities resolved to it are reset to no field at once. The loss is
    /// kept aside so their next check still reports a change away from it.
    pub fn unregister(&mut self, id: Entity) -> Option<FieldEntry> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        let entry = self.entries.remove(index);
        for (entity, last) in self.last_resolved.iter_mut() {
            if *last == Some(id) {
                *last = None;
                self.lost.insert(*entity, id);
            }
        }
        debug!("unregistered gravity field {id}");
        Some(entry)
    }

    /// Move a registered field. Returns `false` if it is unknown.
    pub fn set_position(&mut self, id: Entity, position: Vec3) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.position = position;
                true
            }
            None => false,
        }
    }

    /// Drop the change-detection memory for a tracked entity.
    pub fn forget(&mut self, entity: Entity) {
        self.last_resolved.remove(&entity);
        self.lost.remove(&entity);
    }

    /// Replace the snapshot with the given set of fields.
    ///
    /// Existing fields keep their registration order, vanished fields are
    /// unregistered and new ones are appended in ascending `Entity` order.
    pub fn sync(&mut self, fields: impl IntoIterator<Item = (Entity, Vec3, GravityField)>) {
        let mut current: HashMap<Entity, (Vec3, GravityField)> = fields
            .into_iter()
            .map(|(id, position, field)| (id, (position, field)))
            .collect();

        let vanished: Vec<Entity> = self
            .entries
            .iter()
            .filter(|e| !current.contains_key(&e.id))
            .map(|e| e.id)
            .collect();
        for id in vanished {
            self.unregister(id);
        }

        for entry in &mut self.entries {
            if let Some((position, field)) = current.remove(&entry.id) {
                entry.position = position;
                entry.field = field;
            }
        }

        let mut added: Vec<(Entity, (Vec3, GravityField))> = current.into_iter().collect();
        added.sort_by_key(|(id, _)| *id);
        for (id, (position, field)) in added {
            self.register(id, position, field);
        }
    }

    /// Keep change-detection memory only for entities accepted by `keep`.
    pub fn retain_tracked(&mut self, mut keep: impl FnMut(Entity) -> bool) {
        self.last_resolved.retain(|entity, _| keep(*entity));
        self.lost.retain(|entity, _| keep(*entity));
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered fields in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldEntry> {
        self.entries.iter()
    }

    pub fn get(&self, id: Entity) -> Option<&FieldEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// The field `entity` was resolved to at its last check.
    ///
    /// Always a registered field or `None`.
    pub fn last_resolved(&self, entity: Entity) -> Option<Entity> {
        self.last_resolved.get(&entity).copied().flatten()
    }

    /// Field that was unregistered while governing `entity`, until its next
    /// check reports the loss.
    pub fn lost_field(&self, entity: Entity) -> Option<Entity> {
        self.lost.get(&entity).copied()
    }

    /// Nearest in-range field to `point`, if any.
    pub fn closest_field(&self, point: Vec3) -> Option<&FieldEntry> {
        let mut best: Option<(&FieldEntry, f32)> = None;
        for entry in &self.entries {
            if !entry.in_range(point) {
                continue;
            }
            let dist = entry.position.distance_squared(point);
            // Strict comparison keeps the earliest-registered field on ties.
            if best.is_none_or(|(_, best_dist)| dist < best_dist) {
                best = Some((entry, dist));
            }
        }
        best.map(|(entry, _)| entry)
    }

    /// Gravity acceleration at `point`, zero outside every field.
    pub fn gravity_at(&self, point: Vec3) -> Vec3 {
        self.closest_field(point)
            .map(|entry| entry.gravity_at(point))
            .unwrap_or(Vec3::ZERO)
    }

    /// Unit gravity direction at `point`, zero outside every field or where
    /// the direction is undefined.
    pub fn gravity_direction_at(&self, point: Vec3) -> Vec3 {
        self.closest_field(point)
            .map(|entry| entry.direction_at(point))
            .unwrap_or(Vec3::ZERO)
    }

    /// Check whether the field governing `entity` at `point` differs from
    /// the one seen at its previous check, recording the new one.
    ///
    /// Run this once per step per tracked entity, before any other gravity
    /// query for that entity in the same step.
    pub fn detect_field_change(&mut self, entity: Entity, point: Vec3) -> Option<FieldChange> {
        let (current, gravity_direction) = match self.closest_field(point) {
            Some(entry) => (Some(entry.id), entry.direction_at(point)),
            None => (None, Vec3::ZERO),
        };
        let remembered = self.last_resolved.insert(entity, current).flatten();
        let previous = self.lost.remove(&entity).or(remembered);
        if previous == current {
            return None;
        }
        debug!("entity {entity} changed gravity field: {previous:?} -> {current:?}");
        Some(FieldChange {
            previous,
            current,
            gravity_direction,
        })
    }
}

/// Snapshot every `GravityField` entity into the registry.
///
/// Runs first in the fixed step so that all gravity queries within one step
/// see the same field positions. Positions are world space: a field parented
/// under a moving root (a moon on an orbit pivot) is placed through its
/// ancestors' current transforms.
pub fn sync_gravity_fields(
    mut registry: ResMut<GravityFieldRegistry>,
    q_fields: Query<(Entity, &GravityField, Option<&GlobalTransform>)>,
    q_hierarchy: Query<(&Transform, Option<&ChildOf>)>,
    q_tracked: Query<(), With<GravityOrientation>>,
) {
    registry.sync(q_fields.iter().map(|(entity, field, global)| {
        let position = world_translation(entity, &q_hierarchy)
            .or_else(|| global.map(|g| g.translation()))
            .unwrap_or(Vec3::ZERO);
        (entity, position, *field)
    }));
    registry.retain_tracked(|entity| q_tracked.contains(entity));
}

/// World translation of `entity` composed from its own and its ancestors'
/// local transforms. `None` without a `Transform`.
fn world_translation(
    entity: Entity,
    q_hierarchy: &Query<(&Transform, Option<&ChildOf>)>,
) -> Option<Vec3> {
    let (transform, child_of) = q_hierarchy.get(entity).ok()?;
    let mut point = transform.translation;
    let mut parent = child_of.map(ChildOf::parent);
    while let Some(ancestor) = parent {
        let Ok((transform, child_of)) = q_hierarchy.get(ancestor) else {
            break;
        };
        point = transform.transform_point(point);
        parent = child_of.map(ChildOf::parent);
    }
    Some(point)
}

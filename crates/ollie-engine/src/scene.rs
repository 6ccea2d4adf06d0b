//! The live object list.
//!
//! Objects are kept in insertion order. An object whose hook is running is
//! checked out of its slot and invisible to every query until it returns.
//! Destroying a checked-out object only marks its slot; the game disposes it
//! when the hook hands the object back.

use std::collections::{BTreeMap, HashMap};

use crate::object::{GameObject, ObjectId};

struct Slot {
    id: ObjectId,
    /// `None` while checked out.
    object: Option<Box<GameObject>>,
    doomed: bool,
}

/// Insertion-ordered object storage owned by the game.
#[derive(Default)]
pub struct Scene {
    slots: BTreeMap<u64, Slot>,
    seq_of: HashMap<ObjectId, u64>,
    next_seq: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ObjectId) -> Option<&GameObject> {
        self.slot(id)?.object.as_deref()
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut GameObject> {
        let seq = *self.seq_of.get(&id)?;
        self.slots.get_mut(&seq)?.object.as_deref_mut()
    }

    /// Whether `id` is live and not checked out.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.get(id).is_some()
    }

    /// Visible objects in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &GameObject> + '_ {
        self.slots.values().filter_map(|s| s.object.as_deref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut GameObject> + '_ {
        self.slots.values_mut().filter_map(|s| s.object.as_deref_mut())
    }

    /// Snapshot of visible object ids in insertion order.
    pub fn ids(&self) -> Vec<ObjectId> {
        self.iter().map(GameObject::id).collect()
    }

    pub fn find_by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a GameObject> + 'a {
        self.iter().filter(move |o| o.has_tag(tag))
    }

    /// First object named `name`.
    pub fn find_by_name(&self, name: &str) -> Option<&GameObject> {
        self.iter().find(|o| o.name == name)
    }

    pub fn query<'a, P>(&'a self, predicate: P) -> impl Iterator<Item = &'a GameObject> + 'a
    where
        P: Fn(&GameObject) -> bool + 'a,
    {
        self.iter().filter(move |o| predicate(o))
    }

    /// Every live id, including checked-out objects.
    pub(crate) fn all_ids(&self) -> Vec<ObjectId> {
        self.slots.values().map(|s| s.id).collect()
    }

    /// Number of visible objects.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Visible ids grouped by ascending layer, insertion order within a
    /// layer.
    pub fn render_order(&self) -> Vec<ObjectId> {
        let mut layers: BTreeMap<i32, Vec<ObjectId>> = BTreeMap::new();
        for object in self.iter() {
            layers.entry(object.layer).or_default().push(object.id());
        }
        layers.into_values().flatten().collect()
    }

    // -- crate-internal slot management -------------------------------------

    pub(crate) fn insert(&mut self, object: Box<GameObject>) {
        let id = object.id();
        let seq = self.next_seq;
        self.next_seq += 1;
        self.seq_of.insert(id, seq);
        self.slots.insert(
            seq,
            Slot {
                id,
                object: Some(object),
                doomed: false,
            },
        );
    }

    pub(crate) fn take(&mut self, id: ObjectId) -> Option<Box<GameObject>> {
        let seq = *self.seq_of.get(&id)?;
        let slot = self.slots.get_mut(&seq)?;
        if slot.doomed {
            return None;
        }
        slot.object.take()
    }

    /// Hand a checked-out object back. Returns it if it was destroyed while
    /// checked out; the slot is gone in that case.
    pub(crate) fn restore(&mut self, id: ObjectId, object: Box<GameObject>) -> Option<Box<GameObject>> {
        let Some(&seq) = self.seq_of.get(&id) else {
            return Some(object);
        };
        match self.slots.get_mut(&seq) {
            Some(slot) if !slot.doomed => {
                slot.object = Some(object);
                None
            }
            _ => {
                self.drop_slot(id);
                Some(object)
            }
        }
    }

    pub(crate) fn is_checked_out(&self, id: ObjectId) -> bool {
        self.slot(id).is_some_and(|s| s.object.is_none())
    }

    /// Mark a checked-out object for disposal. Returns `false` if it is not
    /// checked out or already marked.
    pub(crate) fn mark_doomed(&mut self, id: ObjectId) -> bool {
        let Some(&seq) = self.seq_of.get(&id) else {
            return false;
        };
        match self.slots.get_mut(&seq) {
            Some(slot) if slot.object.is_none() && !slot.doomed => {
                slot.doomed = true;
                true
            }
            _ => false,
        }
    }

    /// Drop the slot of an object that will never be handed back. Returns
    /// `false` if `id` is not checked out.
    pub(crate) fn forget_checked_out(&mut self, id: ObjectId) -> bool {
        if !self.is_checked_out(id) {
            return false;
        }
        self.drop_slot(id);
        true
    }

    pub fn is_doomed(&self, id: ObjectId) -> bool {
        self.slot(id).is_some_and(|s| s.doomed)
    }

    /// Remove a visible object from the scene.
    pub(crate) fn remove(&mut self, id: ObjectId) -> Option<Box<GameObject>> {
        if !self.contains(id) {
            return None;
        }
        self.drop_slot(id)
    }

    fn drop_slot(&mut self, id: ObjectId) -> Option<Box<GameObject>> {
        let seq = self.seq_of.remove(&id)?;
        let slot = self.slots.remove(&seq)?;
        debug_assert_eq!(slot.id, id);
        slot.object
    }

    fn slot(&self, id: ObjectId) -> Option<&Slot> {
        self.slots.get(self.seq_of.get(&id)?)
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("objects", &self.slots.len())
            .field("visible", &self.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::PlainObject;

    fn object(raw: u64, layer: i32) -> Box<GameObject> {
        let mut object = GameObject::new(ObjectId::from_raw(raw), Box::new(PlainObject));
        object.layer = layer;
        Box::new(object)
    }

    #[test]
    fn render_order_groups_layers_stably() {
        let mut scene = Scene::new();
        scene.insert(object(1, 5));
        scene.insert(object(2, -100));
        scene.insert(object(3, 5));
        scene.insert(object(4, 0));
        let order: Vec<u64> = scene.render_order().into_iter().map(ObjectId::to_raw).collect();
        assert_eq!(order, vec![2, 4, 1, 3]);
    }

    #[test]
    fn checked_out_objects_are_invisible() {
        let mut scene = Scene::new();
        let id = ObjectId::from_raw(7);
        scene.insert(object(7, 0));

        let taken = scene.take(id).unwrap();
        assert!(scene.get(id).is_none());
        assert_eq!(scene.len(), 0);
        assert!(scene.is_checked_out(id));
        assert!(scene.remove(id).is_none());

        assert!(scene.restore(id, taken).is_none());
        assert!(scene.contains(id));
    }

    #[test]
    fn doomed_object_is_returned_on_restore() {
        let mut scene = Scene::new();
        let id = ObjectId::from_raw(9);
        scene.insert(object(9, 0));

        let taken = scene.take(id).unwrap();
        assert!(scene.mark_doomed(id));
        assert!(!scene.mark_doomed(id));
        assert!(scene.is_doomed(id));

        let back = scene.restore(id, taken);
        assert!(back.is_some());
        assert!(!scene.contains(id));
        assert!(!scene.is_doomed(id));
    }
}

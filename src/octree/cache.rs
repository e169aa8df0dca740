//! Octrees kept across frames for meshes whose transform does not change.
//!
//! A cached tree is only valid for the MVP it was built under. The cache
//! remembers that matrix, and a lookup with a different one reports the entry
//! as stale instead of handing back a tree that no longer matches the mesh.

use log::trace;

use super::Octree;
use crate::math::Mat4;

/// Result of [`OctreeCache::lookup`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheLookup {
    Hit,
    /// An octree exists for the slot but was built under another MVP.
    Stale,
    Miss,
}

#[derive(Clone, Debug)]
struct Entry {
    octree: Octree,
    mvp: Mat4,
}

/// Octrees indexed by caller-chosen slot.
#[derive(Clone, Debug, Default)]
pub struct OctreeCache {
    slots: Vec<Option<Entry>>,
}

impl OctreeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, slot: usize, mvp: &Mat4) -> CacheLookup {
        match self.slots.get(slot) {
            Some(Some(entry)) if entry.mvp == *mvp => CacheLookup::Hit,
            Some(Some(_)) => CacheLookup::Stale,
            _ => CacheLookup::Miss,
        }
    }

    /// The octree in `slot`, regardless of the MVP it was built under.
    pub fn get(&self, slot: usize) -> Option<&Octree> {
        self.slots.get(slot)?.as_ref().map(|e| &e.octree)
    }

    /// The MVP the octree in `slot` was built under.
    pub fn mvp(&self, slot: usize) -> Option<&Mat4> {
        self.slots.get(slot)?.as_ref().map(|e| &e.mvp)
    }

    /// Store `octree` for `slot`, replacing any previous entry.
    pub fn insert(&mut self, slot: usize, mvp: Mat4, octree: Octree) -> &Octree {
        if slot >= self.slots.len() {
            trace!("growing octree cache to {} slots", slot + 1);
            self.slots.resize_with(slot + 1, || None);
        }
        &self.slots[slot].insert(Entry { octree, mvp }).octree
    }

    /// Take the octree out of `slot` so its storage can be rebuilt in place.
    pub fn take(&mut self, slot: usize) -> Option<Octree> {
        self.slots.get_mut(slot)?.take().map(|e| e.octree)
    }

    pub fn remove(&mut self, slot: usize) {
        self.take(slot);
    }

    /// Number of populated slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

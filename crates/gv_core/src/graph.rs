//! The mutable object graph: registry, handle table, identity allocator.

use std::error::Error;
use std::fmt;

use ahash::RandomState;
use hashbrown::HashMap;

use crate::object::{Handle, ObjectId, TrackedObject};
use crate::oracle::ReachableSet;

/// Identity allocator owned by the model.
///
/// Deliberately not a global counter: each model gets its own,
/// so test runs are deterministic and independent.
#[derive(Debug, Default)]
pub struct IdAlloc {
    next: usize,
}

impl IdAlloc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> ObjectId {
        let id = ObjectId(self.next);
        self.next += 1;
        id
    }
}

/// Validation failure in a graph mutation. Carries the offending
/// values; the interpreter attaches the script line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    HandleInUse {
        handle: Handle,
    },
    UndefinedHandle {
        handle: Handle,
    },
    SlotOutOfBounds {
        handle: Handle,
        index: usize,
        slot_count: usize,
    },
    RootUnderflow {
        handle: Handle,
    },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::HandleInUse { handle } => {
                write!(f, "object {handle} is already defined")
            }
            ModelError::UndefinedHandle { handle } => {
                write!(f, "invalid object index: {handle}")
            }
            ModelError::SlotOutOfBounds {
                handle,
                index,
                slot_count,
            } => write!(
                f,
                "invalid reference index {index} on object {handle} with {slot_count} slots"
            ),
            ModelError::RootUnderflow { handle } => write!(
                f,
                "trying to decrease zero root reference count on object {handle}"
            ),
        }
    }
}

impl Error for ModelError {}

type HandleMap = HashMap<Handle, ObjectId, RandomState>;

/// In-memory model of the object graph the collector under test will
/// see: every object ever allocated (identity-indexed, append-only)
/// plus the table of currently-live script handles.
#[derive(Debug, Default)]
pub struct GraphModel {
    ids: IdAlloc,
    objects: Vec<TrackedObject>,
    handles: HandleMap,
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new object under `handle`. The handle must not be
    /// live; the object's identity is the next unused one.
    pub fn create(&mut self, handle: Handle, slot_count: usize) -> Result<ObjectId, ModelError> {
        if self.handles.contains_key(&handle) {
            return Err(ModelError::HandleInUse { handle });
        }
        let id = self.ids.next_id();
        debug_assert_eq!(id.0, self.objects.len());
        self.objects.push(TrackedObject::new(id, handle, slot_count));
        self.handles.insert(handle, id);
        Ok(id)
    }

    /// Resolve a live handle to its object identity.
    pub fn resolve(&self, handle: Handle) -> Result<ObjectId, ModelError> {
        self.handles
            .get(&handle)
            .copied()
            .ok_or(ModelError::UndefinedHandle { handle })
    }

    pub fn is_live(&self, handle: Handle) -> bool {
        self.handles.contains_key(&handle)
    }

    /// Point `obj`'s slot `index` at `target`, or clear it.
    pub fn set_ref(
        &mut self,
        obj: Handle,
        index: usize,
        target: Option<Handle>,
    ) -> Result<(), ModelError> {
        let target_id = match target {
            Some(t) => Some(self.resolve(t)?),
            None => None,
        };
        let id = self.resolve(obj)?;
        self.objects[id.0].set_slot(index, target_id)
    }

    pub fn add_root(&mut self, handle: Handle) -> Result<(), ModelError> {
        let id = self.resolve(handle)?;
        self.objects[id.0].add_root();
        Ok(())
    }

    pub fn remove_root(&mut self, handle: Handle) -> Result<(), ModelError> {
        let id = self.resolve(handle)?;
        self.objects[id.0].remove_root()
    }

    /// Remove `handle` from the table. Does not require the object's
    /// root count to be zero, and does not clear root status.
    pub fn drop_handle(&mut self, handle: Handle) -> Result<ObjectId, ModelError> {
        self.handles
            .remove(&handle)
            .ok_or(ModelError::UndefinedHandle { handle })
    }

    /// Prune handle-table entries whose object did not survive the
    /// last reachability pass. Oracle bookkeeping only: identities
    /// stay in the registry forever.
    pub fn retain_reachable(&mut self, reachable: &ReachableSet) {
        self.handles.retain(|_, id| reachable.contains(*id));
    }

    /// Number of objects ever allocated.
    pub fn total_allocated(&self) -> usize {
        self.objects.len()
    }

    pub fn live_handles(&self) -> usize {
        self.handles.len()
    }

    pub fn object(&self, id: ObjectId) -> &TrackedObject {
        &self.objects[id.0]
    }

    /// Every object ever created, in identity order.
    pub fn objects(&self) -> impl Iterator<Item = &TrackedObject> {
        self.objects.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identities_are_monotonic() {
        let mut model = GraphModel::new();
        let a = model.create(Handle(0), 1).unwrap();
        let b = model.create(Handle(1), 0).unwrap();
        assert!(a < b);
        assert_eq!(model.total_allocated(), 2);
    }

    #[test]
    fn redefining_live_handle_fails() {
        let mut model = GraphModel::new();
        model.create(Handle(3), 0).unwrap();
        assert_eq!(
            model.create(Handle(3), 1),
            Err(ModelError::HandleInUse { handle: Handle(3) })
        );
    }

    #[test]
    fn handle_reuse_after_drop() {
        let mut model = GraphModel::new();
        let first = model.create(Handle(3), 0).unwrap();
        model.drop_handle(Handle(3)).unwrap();
        let second = model.create(Handle(3), 0).unwrap();
        assert_ne!(first, second);
        assert_eq!(model.resolve(Handle(3)), Ok(second));
    }

    #[test]
    fn set_ref_requires_live_handles() {
        let mut model = GraphModel::new();
        model.create(Handle(0), 2).unwrap();
        assert_eq!(
            model.set_ref(Handle(0), 0, Some(Handle(9))),
            Err(ModelError::UndefinedHandle { handle: Handle(9) })
        );
        assert_eq!(
            model.set_ref(Handle(9), 0, None),
            Err(ModelError::UndefinedHandle { handle: Handle(9) })
        );
    }

    #[test]
    fn drop_handle_keeps_root_status() {
        let mut model = GraphModel::new();
        let id = model.create(Handle(0), 0).unwrap();
        model.add_root(Handle(0)).unwrap();
        model.drop_handle(Handle(0)).unwrap();
        assert!(model.object(id).is_root());
    }
}

//! Tracked objects and their names.

use std::fmt;

use crate::graph::ModelError;

/// Process-unique identity of a tracked object.
///
/// Assigned monotonically at creation and never reused, so identities
/// double as creation order. This is the key the generated code uses
/// to talk about "the same" object as the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(pub usize);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Script-local name for an object.
///
/// Distinct from `ObjectId`: a handle may be reused after the entry
/// holding it has been explicitly removed from the handle table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(pub u32);

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One allocated graph node.
///
/// Slots are a fixed-length vector with an explicit `None` tombstone
/// per slot, so "no reference" is distinguishable from "out of
/// bounds": the latter is a hard error, never a clamp.
#[derive(Debug, Clone)]
pub struct TrackedObject {
    id: ObjectId,
    handle: Handle,
    slots: Vec<Option<ObjectId>>,
    root_count: u32,
}

impl TrackedObject {
    pub(crate) fn new(id: ObjectId, handle: Handle, slot_count: usize) -> Self {
        Self {
            id,
            handle,
            slots: vec![None; slot_count],
            root_count: 0,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// The handle this object was created under. Stable even after
    /// the handle-table entry is dropped; used for diagnostics.
    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, index: usize) -> Option<ObjectId> {
        self.slots.get(index).copied().flatten()
    }

    /// Write or clear a reference slot. Bounds violations report the
    /// handle, the offending index and the declared slot count.
    pub fn set_slot(&mut self, index: usize, target: Option<ObjectId>) -> Result<(), ModelError> {
        let slot_count = self.slots.len();
        match self.slots.get_mut(index) {
            Some(slot) => {
                *slot = target;
                Ok(())
            }
            None => Err(ModelError::SlotOutOfBounds {
                handle: self.handle,
                index,
                slot_count,
            }),
        }
    }

    /// Iterate the populated slots.
    pub fn refs(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.slots.iter().flatten().copied()
    }

    pub fn root_count(&self) -> u32 {
        self.root_count
    }

    /// Roots are counted, not flagged, so multiple independent
    /// holders can pin the same object.
    pub fn is_root(&self) -> bool {
        self.root_count > 0
    }

    pub fn add_root(&mut self) {
        self.root_count += 1;
    }

    /// Fails without touching the count when it is already zero.
    pub fn remove_root(&mut self) -> Result<(), ModelError> {
        if self.root_count == 0 {
            return Err(ModelError::RootUnderflow {
                handle: self.handle,
            });
        }
        self.root_count -= 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_write_and_clear() {
        let mut obj = TrackedObject::new(ObjectId(0), Handle(7), 2);
        obj.set_slot(1, Some(ObjectId(3))).unwrap();
        assert_eq!(obj.slot(1), Some(ObjectId(3)));
        obj.set_slot(1, None).unwrap();
        assert_eq!(obj.slot(1), None);
        assert_eq!(obj.refs().count(), 0);
    }

    #[test]
    fn slot_out_of_bounds_reports_values() {
        let mut obj = TrackedObject::new(ObjectId(0), Handle(7), 2);
        let err = obj.set_slot(2, Some(ObjectId(1))).unwrap_err();
        match err {
            ModelError::SlotOutOfBounds {
                handle,
                index,
                slot_count,
            } => {
                assert_eq!(handle, Handle(7));
                assert_eq!(index, 2);
                assert_eq!(slot_count, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn root_underflow_does_not_mutate() {
        let mut obj = TrackedObject::new(ObjectId(0), Handle(1), 0);
        obj.add_root();
        obj.remove_root().unwrap();
        assert!(obj.remove_root().is_err());
        assert_eq!(obj.root_count(), 0);
    }
}

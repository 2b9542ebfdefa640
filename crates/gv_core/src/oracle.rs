//! Exact mark-and-sweep reachability over the graph model.
//!
//! This is the oracle half of the differential test: the set it
//! returns is, by definition, what a correct collector must keep.

use crate::graph::GraphModel;
use crate::object::ObjectId;

/// Set of identities expected to survive a collection.
///
/// Backed by a word/bit mark vector; identities are dense and
/// monotone so this stays compact even for multi-million object runs.
#[derive(Debug, Clone, Default)]
pub struct ReachableSet {
    words: Vec<u64>,
    len: usize,
}

/// Semantic equality: same marked bits, regardless of how much
/// trailing zeroed capacity each side carries.
impl PartialEq for ReachableSet {
    fn eq(&self, other: &Self) -> bool {
        if self.len != other.len {
            return false;
        }
        let (short, long) = if self.words.len() <= other.words.len() {
            (&self.words, &other.words)
        } else {
            (&other.words, &self.words)
        };
        short[..] == long[..short.len()] && long[short.len()..].iter().all(|w| *w == 0)
    }
}

impl Eq for ReachableSet {}

impl ReachableSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(ids: usize) -> Self {
        Self {
            words: vec![0; ids.div_ceil(64)],
            len: 0,
        }
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        let word = id.0 >> 6;
        let bit = id.0 & 63;
        self.words.get(word).is_some_and(|w| (w & (1 << bit)) != 0)
    }

    /// Mark `id`; returns false if it was already marked.
    pub fn insert(&mut self, id: ObjectId) -> bool {
        let word = id.0 >> 6;
        let bit = id.0 & 63;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        let w = &mut self.words[word];
        let mask = 1 << bit;
        if (*w & mask) != 0 {
            return false;
        }
        *w |= mask;
        self.len += 1;
        true
    }

    /// Number of marked identities.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Compute the exact survivor set: everything transitively reachable
/// from objects with a positive root count.
///
/// Roots are scanned over all objects ever created, not just live
/// handles - dropping a script handle does not clear root status.
/// Each identity enters the worklist at most once, so cycles
/// terminate and the cost is O(objects + references).
pub fn mark_reachable(model: &GraphModel) -> ReachableSet {
    let mut marked = ReachableSet::with_capacity(model.total_allocated());
    let mut grey: Vec<ObjectId> = Vec::new();

    for obj in model.objects() {
        if obj.is_root() && marked.insert(obj.id()) {
            grey.push(obj.id());
        }
    }

    while let Some(id) = grey.pop() {
        for target in model.object(id).refs() {
            if marked.insert(target) {
                grey.push(target);
            }
        }
    }

    marked
}

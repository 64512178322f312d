use std::collections::BTreeSet;
use std::ops::Range;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::id::ObjectId;

/// Default value of the first id handed out by a fresh allocator.
pub const FIRST_OBJECT_ID: u64 = 1;

/// Hands out [`ObjectId`]s and recycles the ids of deleted objects.
///
/// Recycled ids are reissued smallest first, before fresh ids. Ids claimed
/// explicitly through [`IdAllocator::reserve`] are never handed out until
/// they are released again.
#[derive(Clone)]
pub struct IdAllocator {
    inner: Arc<Mutex<AllocatorState>>,
}

struct AllocatorState {
    next: u64,
    recycled: BTreeSet<u64>,
    reserved: BTreeSet<u64>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::starting_at(FIRST_OBJECT_ID)
    }

    pub fn starting_at(first: u64) -> Self {
        IdAllocator {
            inner: Arc::new(Mutex::new(AllocatorState {
                next: first,
                recycled: BTreeSet::new(),
                reserved: BTreeSet::new(),
            })),
        }
    }

    /// Returns a free id, preferring recycled ones.
    pub fn allocate(&self) -> ObjectId {
        let mut state = self.inner.lock();
        if let Some(value) = state.recycled.pop_first() {
            return ObjectId::new(value);
        }
        state.take_fresh()
    }

    pub fn allocate_many(&self, count: usize) -> Vec<ObjectId> {
        (0..count).map(|_| self.allocate()).collect()
    }

    /// Returns `count` contiguous fresh ids; recycled ids are not used.
    pub fn allocate_range(&self, count: usize) -> Range<u64> {
        let mut state = self.inner.lock();
        let mut start = state.next;
        // the block must not overlap explicitly reserved ids
        while let Some(conflict) = state
            .reserved
            .range(start..start.saturating_add(count as u64))
            .next_back()
            .copied()
        {
            start = conflict + 1;
        }
        for skipped in state.next..start {
            if !state.reserved.contains(&skipped) {
                state.recycled.insert(skipped);
            }
        }
        let end = start + count as u64;
        state.next = end;
        let stale: Vec<u64> = state.reserved.range(..end).copied().collect();
        for value in stale {
            state.reserved.remove(&value);
        }
        start..end
    }

    /// Claims a caller supplied id. Returns `false` when the id is in use.
    pub fn reserve(&self, id: ObjectId) -> bool {
        let mut state = self.inner.lock();
        let value = id.value();
        if state.recycled.remove(&value) {
            return true;
        }
        if value >= state.next {
            return state.reserved.insert(value);
        }
        false
    }

    /// Gives an id back for reuse.
    pub fn deallocate(&self, id: ObjectId) {
        let mut state = self.inner.lock();
        let value = id.value();
        if value >= state.next {
            state.reserved.remove(&value);
        } else {
            state.recycled.insert(value);
        }
    }
}

impl AllocatorState {
    fn take_fresh(&mut self) -> ObjectId {
        while self.reserved.remove(&self.next) {
            self.next += 1;
        }
        let id = ObjectId::new(self.next);
        self.next += 1;
        id
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

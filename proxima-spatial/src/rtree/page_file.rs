//! In-memory page file holding the nodes of one tree.
//!
//! Pages are addressed by [`PageId`]. Freed pages are recycled before new
//! ids are handed out. Reads and writes are counted for statistics.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::rtree::rtree_types::{PageId, SpatialError, SpatialResult};

pub struct PageFile<N> {
    pages: HashMap<PageId, N>,
    free_pages: Vec<PageId>,
    next_page_id: PageId,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl<N> Default for PageFile<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> PageFile<N> {
    pub fn new() -> Self {
        PageFile {
            pages: HashMap::new(),
            free_pages: Vec::new(),
            next_page_id: 1,
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    /// Returns a page id that is not in use, reusing freed ids first.
    pub fn allocate(&mut self) -> PageId {
        if let Some(page_id) = self.free_pages.pop() {
            return page_id;
        }
        let page_id = self.next_page_id;
        self.next_page_id += 1;
        page_id
    }

    pub fn free(&mut self, page_id: PageId) {
        if self.pages.remove(&page_id).is_some() {
            self.free_pages.push(page_id);
        }
    }

    pub fn read(&self, page_id: PageId) -> SpatialResult<&N> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.pages
            .get(&page_id)
            .ok_or(SpatialError::MissingPage(page_id))
    }

    /// Mutable access to a page; counts as one write.
    pub fn write(&mut self, page_id: PageId) -> SpatialResult<&mut N> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.pages
            .get_mut(&page_id)
            .ok_or(SpatialError::MissingPage(page_id))
    }

    pub fn put(&mut self, page_id: PageId, node: N) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.pages.insert(page_id, node);
    }

    pub fn contains(&self, page_id: PageId) -> bool {
        self.pages.contains_key(&page_id)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> impl Iterator<Item = &N> {
        self.pages.values()
    }

    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn clear(&mut self) {
        self.pages.clear();
        self.free_pages.clear();
        self.next_page_id = 1;
    }
}

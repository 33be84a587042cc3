//! Work nodes (fibers) and the arena that owns them.
//!
//! Fibers form a first-child / next-sibling tree with parent back links, so a
//! full depth-first walk is a loop over indices with the cursor held outside
//! the loop. That is what lets the work loop stop between any two units and
//! pick up again later.

use crate::description::Description;
use std::ops::{Index, IndexMut};

/// Index of a fiber inside a [`FiberArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FiberId(usize);

impl FiberId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Pending host action of a work node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditTag {
    /// Create a host node and insert it.
    Place,
    /// Reuse the previous host node and patch its properties.
    Update,
    /// Remove the previous host node. Descriptive only: pending deletions
    /// live in the engine's deletion list and no fiber carries this tag.
    Delete,
}

/// One unit of reconciliation work.
#[derive(Debug, Clone)]
pub struct Fiber<H> {
    pub description: Description,
    pub host: Option<H>,
    pub parent: Option<FiberId>,
    pub child: Option<FiberId>,
    pub sibling: Option<FiberId>,
    /// Committed fiber at the same position in the previous tree.
    pub alternate: Option<FiberId>,
    pub tag: Option<EditTag>,
}

impl<H> Fiber<H> {
    /// Untagged fiber for a host container.
    pub fn root(description: Description, container: H, alternate: Option<FiberId>) -> Self {
        Self {
            description,
            host: Some(container),
            parent: None,
            child: None,
            sibling: None,
            alternate,
            tag: None,
        }
    }

    pub fn new(description: Description, parent: FiberId, tag: EditTag) -> Self {
        Self {
            description,
            host: None,
            parent: Some(parent),
            child: None,
            sibling: None,
            alternate: None,
            tag: Some(tag),
        }
    }
}

/// Slot storage for fibers with a free list for slot reuse.
#[derive(Debug)]
pub struct FiberArena<H> {
    slots: Vec<Option<Fiber<H>>>,
    free: Vec<usize>,
}

impl<H> Default for FiberArena<H> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }
}

impl<H> FiberArena<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, fiber: Fiber<H>) -> FiberId {
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(fiber);
                FiberId(index)
            }
            None => {
                self.slots.push(Some(fiber));
                FiberId(self.slots.len() - 1)
            }
        }
    }

    pub fn release(&mut self, id: FiberId) -> Option<Fiber<H>> {
        let fiber = self.slots.get_mut(id.0)?.take()?;
        self.free.push(id.0);
        Some(fiber)
    }

    pub fn get(&self, id: FiberId) -> Option<&Fiber<H>> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: FiberId) -> Option<&mut Fiber<H>> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Live fibers.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Children of `id` in sibling order.
    pub fn children(&self, id: FiberId) -> Children<'_, H> {
        Children {
            arena: self,
            next: self.get(id).and_then(|f| f.child),
        }
    }

    /// Next fiber after `id` in depth-first, children-before-siblings order,
    /// never leaving the subtree rooted at `root`.
    pub fn next_in_order(&self, root: FiberId, id: FiberId) -> Option<FiberId> {
        if let Some(child) = self[id].child {
            return Some(child);
        }
        let mut cursor = id;
        while cursor != root {
            let fiber = &self[cursor];
            if let Some(sibling) = fiber.sibling {
                return Some(sibling);
            }
            cursor = fiber.parent?;
        }
        None
    }

    /// Every fiber of the subtree at `root`, `root` first, in walk order.
    pub fn subtree(&self, root: FiberId) -> Vec<FiberId> {
        let mut ids = vec![root];
        let mut cursor = root;
        while let Some(next) = self.next_in_order(root, cursor) {
            ids.push(next);
            cursor = next;
        }
        ids
    }

    /// Release the subtree at `root`. Returns how many slots were freed.
    pub fn release_subtree(&mut self, root: FiberId) -> usize {
        self.subtree(root)
            .into_iter()
            .filter_map(|id| self.release(id))
            .count()
    }

    /// Nearest ancestor of `id` that owns a host handle.
    pub fn host_parent(&self, id: FiberId) -> Option<&H> {
        let mut cursor = self[id].parent;
        while let Some(parent) = cursor {
            let fiber = &self[parent];
            if let Some(host) = fiber.host.as_ref() {
                return Some(host);
            }
            cursor = fiber.parent;
        }
        None
    }
}

impl<H> Index<FiberId> for FiberArena<H> {
    type Output = Fiber<H>;

    fn index(&self, id: FiberId) -> &Fiber<H> {
        match self.get(id) {
            Some(fiber) => fiber,
            None => panic!("dangling fiber id {}", id.0),
        }
    }
}

impl<H> IndexMut<FiberId> for FiberArena<H> {
    fn index_mut(&mut self, id: FiberId) -> &mut Fiber<H> {
        match self.get_mut(id) {
            Some(fiber) => fiber,
            None => panic!("dangling fiber id {}", id.0),
        }
    }
}

/// Iterator over a fiber's child chain.
pub struct Children<'a, H> {
    arena: &'a FiberArena<H>,
    next: Option<FiberId>,
}

impl<H> Iterator for Children<'_, H> {
    type Item = FiberId;

    fn next(&mut self) -> Option<FiberId> {
        let id = self.next?;
        self.next = self.arena.get(id).and_then(|f| f.sibling);
        Some(id)
    }
}

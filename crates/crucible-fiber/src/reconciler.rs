//! Positional child reconciliation.
//!
//! Previous children and new descriptions are compared by index only. Same
//! kind at the same index keeps the host node; anything else is a
//! placement, plus a deletion when a previous node occupied the slot. This
//! is exact for appends and trailing removals. Reordering or inserting in the
//! middle turns every shifted position into a delete/place pair.

use crate::description::Description;
use crate::fiber::{EditTag, Fiber, FiberArena, FiberId};
use tracing::trace;

/// Tags emitted for one parent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChildEdits {
    pub placed: usize,
    pub updated: usize,
    pub deleted: usize,
}

/// Build `parent`'s child chain for `elements`, diffing against the children
/// of `parent`'s alternate. Displaced previous children are pushed onto
/// `deletions`; they are never linked into the new chain.
pub fn reconcile_children<H: Clone>(
    arena: &mut FiberArena<H>,
    parent: FiberId,
    elements: &[Description],
    deletions: &mut Vec<FiberId>,
) -> ChildEdits {
    let mut edits = ChildEdits::default();
    let mut old = arena[parent].alternate.and_then(|alt| arena[alt].child);
    let mut previous_new: Option<FiberId> = None;
    let mut index = 0;

    arena[parent].child = None;

    while index < elements.len() || old.is_some() {
        let element = elements.get(index);
        let same_kind = match (old, element) {
            (Some(old), Some(element)) => arena[old].description.kind() == element.kind(),
            _ => false,
        };

        let new_fiber = match (old, element) {
            (Some(old), Some(element)) if same_kind => {
                let mut fiber = Fiber::new(element.clone(), parent, EditTag::Update);
                fiber.host = arena[old].host.clone();
                fiber.alternate = Some(old);
                edits.updated += 1;
                Some(arena.alloc(fiber))
            }
            (_, Some(element)) => {
                edits.placed += 1;
                Some(arena.alloc(Fiber::new(element.clone(), parent, EditTag::Place)))
            }
            (_, None) => None,
        };

        if let Some(old) = old.filter(|_| !same_kind) {
            trace!(
                "position {} of {:?}: deleting {}",
                index,
                parent,
                arena[old].description.kind()
            );
            deletions.push(old);
            edits.deleted += 1;
        }

        if let Some(new_fiber) = new_fiber {
            match previous_new {
                None => arena[parent].child = Some(new_fiber),
                Some(previous) => arena[previous].sibling = Some(new_fiber),
            }
            previous_new = Some(new_fiber);
        }

        old = old.and_then(|old| arena[old].sibling);
        index += 1;
    }

    edits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{make_node, node, Child};

    fn items(kinds: &[&str]) -> Vec<Description> {
        kinds
            .iter()
            .map(|k| make_node(*k, None, Vec::<Child>::new()))
            .collect()
    }

    /// Committed parent with `kinds` children; returns (arena, new wip parent).
    fn committed(kinds: &[&str]) -> (FiberArena<u32>, FiberId) {
        let mut arena = FiberArena::new();
        let old_root = arena.alloc(Fiber::root(node!("root"), 0, None));
        let mut deletions = Vec::new();
        reconcile_children(&mut arena, old_root, &items(kinds), &mut deletions);
        for (n, id) in arena.children(old_root).collect::<Vec<_>>().into_iter().enumerate() {
            arena[id].host = Some(n as u32 + 1);
        }
        let wip = arena.alloc(Fiber::root(node!("root"), 0, Some(old_root)));
        (arena, wip)
    }

    fn tags(arena: &FiberArena<u32>, parent: FiberId) -> Vec<(String, EditTag)> {
        arena
            .children(parent)
            .map(|id| {
                let fiber = &arena[id];
                (fiber.description.kind().to_string(), fiber.tag.unwrap())
            })
            .collect()
    }

    #[test]
    fn first_render_places_everything() {
        let mut arena = FiberArena::<u32>::new();
        let root = arena.alloc(Fiber::root(node!("root"), 0, None));
        let mut deletions = Vec::new();

        let edits = reconcile_children(&mut arena, root, &items(&["a", "b"]), &mut deletions);

        assert_eq!(edits, ChildEdits { placed: 2, updated: 0, deleted: 0 });
        assert_eq!(
            tags(&arena, root),
            [("a".into(), EditTag::Place), ("b".into(), EditTag::Place)]
        );
        assert!(deletions.is_empty());
    }

    #[test]
    fn append_updates_prefix_and_places_tail() {
        let (mut arena, wip) = committed(&["li", "li"]);
        let mut deletions = Vec::new();

        let elements = items(&["li", "li", "li"]);
        let edits = reconcile_children(&mut arena, wip, &elements, &mut deletions);

        assert_eq!(edits, ChildEdits { placed: 1, updated: 2, deleted: 0 });
        let hosts: Vec<_> = arena.children(wip).map(|id| arena[id].host).collect();
        assert_eq!(hosts, [Some(1), Some(2), None]);
    }

    #[test]
    fn trailing_shrink_deletes_tail() {
        let (mut arena, wip) = committed(&["li", "li", "li"]);
        let mut deletions = Vec::new();

        let edits = reconcile_children(&mut arena, wip, &items(&["li", "li"]), &mut deletions);

        assert_eq!(edits, ChildEdits { placed: 0, updated: 2, deleted: 1 });
        assert_eq!(deletions.len(), 1);
        assert_eq!(arena[deletions[0]].host, Some(3));
        assert!(!arena.children(wip).any(|id| id == deletions[0]));
    }

    #[test]
    fn kind_change_places_and_deletes_at_same_position() {
        let (mut arena, wip) = committed(&["a", "b", "c"]);
        let mut deletions = Vec::new();

        let edits = reconcile_children(&mut arena, wip, &items(&["a", "x", "c"]), &mut deletions);

        assert_eq!(edits, ChildEdits { placed: 1, updated: 2, deleted: 1 });
        assert_eq!(
            tags(&arena, wip),
            [
                ("a".into(), EditTag::Update),
                ("x".into(), EditTag::Place),
                ("c".into(), EditTag::Update)
            ]
        );
        assert_eq!(arena[deletions[0]].description.kind(), "b");
    }

    #[test]
    fn front_insertion_shifts_every_position() {
        let (mut arena, wip) = committed(&["a", "b"]);
        let mut deletions = Vec::new();

        let edits = reconcile_children(&mut arena, wip, &items(&["z", "a", "b"]), &mut deletions);

        assert_eq!(edits, ChildEdits { placed: 3, updated: 0, deleted: 2 });
    }

    #[test]
    fn empty_children_delete_all() {
        let (mut arena, wip) = committed(&["a", "b"]);
        let mut deletions = Vec::new();

        let edits = reconcile_children(&mut arena, wip, &[], &mut deletions);

        assert_eq!(edits.deleted, 2);
        assert!(arena[wip].child.is_none());
    }

    #[test]
    fn update_links_alternate_and_parent() {
        let (mut arena, wip) = committed(&["a"]);
        let old_child = arena[arena[wip].alternate.unwrap()].child.unwrap();
        let mut deletions = Vec::new();

        reconcile_children(&mut arena, wip, &items(&["a"]), &mut deletions);

        let new_child = arena[wip].child.unwrap();
        assert_ne!(new_child, old_child);
        assert_eq!(arena[new_child].alternate, Some(old_child));
        assert_eq!(arena[new_child].parent, Some(wip));
    }
}

//! Commit phase: turn a finished work tree into host mutations, apply them,
//! then promote the tree to current.
//!
//! Planning only reads the arena. Nothing reaches the host until the plan is
//! complete, and with transactional commits enabled nothing reaches it unless
//! every mutation validated.

use crate::error::{Error, Result};
use crate::fiber::{EditTag, FiberArena, FiberId};
use crate::host::{HostAdapter, HostMutation};
use crate::props::{diff_props, PropChange};
use crate::scheduler::IdleScheduler;
use crate::work_loop::Engine;
use tracing::{debug, error, info, warn};

/// What one commit did to the host tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub placed: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Property and event writes on updated nodes.
    pub property_writes: usize,
}

/// Ordered host mutations for one commit.
#[derive(Debug)]
pub struct CommitPlan<H> {
    pub mutations: Vec<HostMutation<H>>,
    pub summary: CommitSummary,
}

/// Plan the commit of the tree at `root`.
///
/// Deletions come first, removing only the topmost host node of each deleted
/// subtree. Then the new tree is walked depth-first: placements are inserted
/// before the next sibling that is already attached (or appended), updates
/// get their property diff.
pub fn plan_commit<H: Clone>(
    arena: &FiberArena<H>,
    root: FiberId,
    deletions: &[FiberId],
) -> CommitPlan<H> {
    let mut mutations = Vec::new();
    let mut summary = CommitSummary {
        deleted: deletions.len(),
        ..Default::default()
    };

    for &deleted in deletions {
        match arena.host_parent(deleted) {
            Some(parent) => plan_deletion(arena, deleted, parent, &mut mutations),
            None => warn!("deleted fiber {:?} has no host ancestor", deleted),
        }
    }

    for id in arena.subtree(root).into_iter().skip(1) {
        let fiber = &arena[id];
        match fiber.tag {
            Some(EditTag::Place) => {
                summary.placed += 1;
                let (Some(child), Some(parent)) = (fiber.host.clone(), arena.host_parent(id))
                else {
                    warn!("placed fiber {:?} is missing a host handle", id);
                    continue;
                };
                mutations.push(HostMutation::Insert {
                    parent: parent.clone(),
                    child,
                    before: attached_successor(arena, id),
                });
            }
            Some(EditTag::Update) => {
                summary.updated += 1;
                let (Some(node), Some(alternate)) = (fiber.host.as_ref(), fiber.alternate) else {
                    continue;
                };
                let changes = diff_props(
                    arena[alternate].description.props(),
                    fiber.description.props(),
                );
                summary.property_writes += changes.len();
                mutations.extend(changes.into_iter().map(|change| to_mutation(node, change)));
            }
            Some(EditTag::Delete) | None => {}
        }
    }

    CommitPlan { mutations, summary }
}

fn plan_deletion<H: Clone>(
    arena: &FiberArena<H>,
    id: FiberId,
    parent: &H,
    mutations: &mut Vec<HostMutation<H>>,
) {
    match arena[id].host.clone() {
        Some(child) => mutations.push(HostMutation::Remove {
            parent: parent.clone(),
            child,
        }),
        None => {
            for child in arena.children(id) {
                plan_deletion(arena, child, parent, mutations);
            }
        }
    }
}

/// Host node of the first later sibling that is already in the host tree.
fn attached_successor<H: Clone>(arena: &FiberArena<H>, id: FiberId) -> Option<H> {
    let mut cursor = arena[id].sibling;
    while let Some(sibling) = cursor {
        let fiber = &arena[sibling];
        if fiber.tag == Some(EditTag::Update) {
            if let Some(host) = fiber.host.clone() {
                return Some(host);
            }
        }
        cursor = fiber.sibling;
    }
    None
}

pub(crate) fn to_mutation<H: Clone>(node: &H, change: PropChange) -> HostMutation<H> {
    let node = node.clone();
    match change {
        PropChange::Unbind { event, handler } => HostMutation::UnbindEvent {
            node,
            event,
            handler,
        },
        PropChange::Clear { name } => HostMutation::ClearProperty { node, name },
        PropChange::Set { name, value } => HostMutation::SetProperty { node, name, value },
        PropChange::Bind { event, handler } => HostMutation::BindEvent {
            node,
            event,
            handler,
        },
    }
}

/// Apply a plan. With `transactional` every mutation is validated first and
/// the batch is refused as a whole on the first rejection.
pub fn apply_plan<A: HostAdapter + ?Sized>(
    host: &mut A,
    mutations: &[HostMutation<A::Handle>],
    transactional: bool,
) -> Result<()> {
    if transactional {
        for (index, mutation) in mutations.iter().enumerate() {
            host.validate(mutation)
                .map_err(|source| Error::CommitAborted {
                    index,
                    applied: 0,
                    source,
                })?;
        }
    }

    for (index, mutation) in mutations.iter().enumerate() {
        mutation.apply(host).map_err(|source| Error::CommitAborted {
            index,
            applied: index,
            source,
        })?;
    }
    Ok(())
}

impl<H: HostAdapter, S: IdleScheduler> Engine<H, S> {
    /// Commit the finished work-in-progress tree and make it current.
    ///
    /// On failure the work-in-progress tree is dropped and current is kept.
    pub(crate) fn commit_root(&mut self) -> Result<CommitSummary> {
        let Some(wip_root) = self.wip_root.take() else {
            return Ok(CommitSummary::default());
        };
        self.next_unit = None;

        let plan = plan_commit(&self.arena, wip_root, &self.deletions);
        debug!(
            "commit plan: {} mutations for {} fibers",
            plan.mutations.len(),
            self.arena.subtree(wip_root).len()
        );

        if let Err(err) = apply_plan(
            &mut self.host,
            &plan.mutations,
            self.config.transactional_commit,
        ) {
            error!("commit aborted, keeping previous tree: {}", err);
            self.deletions.clear();
            // Placed nodes may already be attached once anything was applied.
            let untouched = matches!(err, Error::CommitAborted { applied: 0, .. });
            self.discard_tree(wip_root, untouched);
            return Err(err);
        }

        // Promote. The superseded tree holds every deleted fiber too.
        let previous = self.current_root.replace(wip_root);
        for id in self.arena.subtree(wip_root) {
            self.arena[id].alternate = None;
        }
        if let Some(previous) = previous {
            self.arena.release_subtree(previous);
        }
        self.deletions.clear();

        let summary = plan.summary;
        info!(
            "committed: {} placed, {} updated, {} deleted, {} property writes",
            summary.placed, summary.updated, summary.deleted, summary.property_writes
        );
        self.stats.commits += 1;
        self.last_commit = Some(summary);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::description::Description;
    use crate::fiber::Fiber;
    use crate::host::HostError;
    use crate::memory_host::{HostOp, MemoryHost, NodeId};
    use crate::reconciler::reconcile_children;
    use crate::{node, Props};

    /// Current tree built by hand: container(0) -> parent -> children.
    struct Fixture {
        arena: FiberArena<NodeId>,
        wip: FiberId,
        deletions: Vec<FiberId>,
    }

    fn fixture(host: &mut MemoryHost, old: &[Description], new: &[Description]) -> Fixture {
        let container = host.container();
        let mut arena = FiberArena::new();
        let old_root = arena.alloc(Fiber::root(node!("root"), container, None));
        let mut deletions = Vec::new();
        reconcile_children(&mut arena, old_root, old, &mut deletions);
        for id in arena.children(old_root).collect::<Vec<_>>() {
            let handle = host.create_node(arena[id].description.kind()).unwrap();
            host.append_child(&container, &handle).unwrap();
            arena[id].host = Some(handle);
        }

        let wip = arena.alloc(Fiber::root(node!("root"), container, Some(old_root)));
        reconcile_children(&mut arena, wip, new, &mut deletions);
        for id in arena.children(wip).collect::<Vec<_>>() {
            if arena[id].host.is_none() {
                let handle = host.create_node(arena[id].description.kind()).unwrap();
                arena[id].host = Some(handle);
            }
        }
        host.clear_log();
        Fixture {
            arena,
            wip,
            deletions,
        }
    }

    fn kinds(host: &MemoryHost) -> Vec<String> {
        host.children(host.container())
            .iter()
            .map(|id| host.kind(*id).unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn placement_mid_list_keeps_sibling_order() {
        let mut host = MemoryHost::new();
        let f = fixture(
            &mut host,
            &[node!("a"), node!("b"), node!("c")],
            &[node!("a"), node!("x"), node!("c")],
        );

        let plan = plan_commit(&f.arena, f.wip, &f.deletions);
        apply_plan(&mut host, &plan.mutations, true).unwrap();

        assert_eq!(kinds(&host), ["a", "x", "c"]);
        assert_eq!(
            plan.summary,
            CommitSummary {
                placed: 1,
                updated: 2,
                deleted: 1,
                property_writes: 0
            }
        );
    }

    #[test]
    fn deletions_are_planned_before_placements() {
        let mut host = MemoryHost::new();
        let f = fixture(&mut host, &[node!("a")], &[node!("b")]);

        let plan = plan_commit(&f.arena, f.wip, &f.deletions);

        assert!(matches!(plan.mutations[0], HostMutation::Remove { .. }));
        assert!(matches!(
            plan.mutations[1],
            HostMutation::Insert { before: None, .. }
        ));
    }

    #[test]
    fn update_emits_property_diff_only() {
        let mut host = MemoryHost::new();
        let old = crate::make_node(
            "div",
            Some(Props::new().with("a", 1).with("b", 2)),
            Vec::<crate::Child>::new(),
        );
        let new = crate::make_node(
            "div",
            Some(Props::new().with("b", 3).with("c", 4)),
            Vec::<crate::Child>::new(),
        );
        let f = fixture(&mut host, &[old], &[new]);

        let plan = plan_commit(&f.arena, f.wip, &f.deletions);
        apply_plan(&mut host, &plan.mutations, true).unwrap();

        let node = host.children(host.container())[0];
        assert_eq!(
            host.log(),
            [
                HostOp::ClearProperty {
                    node,
                    name: "a".into()
                },
                HostOp::SetProperty {
                    node,
                    name: "b".into(),
                    value: "3".into()
                },
                HostOp::SetProperty {
                    node,
                    name: "c".into(),
                    value: "4".into()
                },
            ]
        );
        assert_eq!(plan.summary.property_writes, 3);
    }

    #[test]
    fn transactional_apply_touches_nothing_on_rejection() {
        let mut host = MemoryHost::new();
        let f = fixture(&mut host, &[node!("a"), node!("b")], &[node!("x"), node!("y")]);
        host.fail_on("append_child");

        let plan = plan_commit(&f.arena, f.wip, &f.deletions);
        let err = apply_plan(&mut host, &plan.mutations, true).unwrap_err();

        assert!(matches!(
            err,
            Error::CommitAborted {
                applied: 0,
                source: HostError::Rejected { .. },
                ..
            }
        ));
        assert!(host.log().is_empty());
        assert_eq!(kinds(&host), ["a", "b"]);
    }

    #[test]
    fn best_effort_apply_reports_partial_progress() {
        let mut host = MemoryHost::new();
        let f = fixture(&mut host, &[node!("a")], &[node!("x")]);
        host.fail_on("append_child");

        let plan = plan_commit(&f.arena, f.wip, &f.deletions);
        let err = apply_plan(&mut host, &plan.mutations, false).unwrap_err();

        assert!(matches!(err, Error::CommitAborted { applied: 1, .. }));
        assert!(kinds(&host).is_empty());
    }
}

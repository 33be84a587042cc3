//! The engine: render entry point and the resumable work loop.
//!
//! ```text
//! render() -> wip root ----+
//!                          v
//!   run_slice(deadline): perform_unit -> reconcile_children -> next unit
//!          ^      |                                              |
//!          |      +-- deadline hit: request_slice(), return      |
//!          +--------------- idle service ------------------------+
//!                                                                 |
//!                         next unit empty: commit_root() <--------+
//! ```

use crate::commit::{to_mutation, CommitSummary};
use crate::config::{EngineConfig, OverlapPolicy};
use crate::description::Description;
use crate::error::{Error, Result};
use crate::fiber::{EditTag, Fiber, FiberArena, FiberId};
use crate::host::HostAdapter;
use crate::props::{diff_props, Props};
use crate::reconciler::reconcile_children;
use crate::scheduler::{Deadline, IdleScheduler};
use tracing::{debug, trace, warn};

/// Outcome of one granted slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceOutcome {
    /// Nothing was scheduled.
    Idle,
    /// The deadline hit mid-traversal; another slice was requested.
    Yielded { units: usize },
    /// The traversal finished and the tree was committed.
    Committed {
        units: usize,
        summary: CommitSummary,
    },
}

/// Counters across the engine's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub renders: usize,
    pub slices: usize,
    pub units: usize,
    pub commits: usize,
    pub aborted: usize,
}

struct RenderRequest<H> {
    description: Description,
    container: H,
}

/// Reconciliation context for a single host container.
///
/// Owns the current tree, the work-in-progress tree and the pending
/// deletions. Only [`commit_root`](Engine::commit_root) replaces the current
/// root, and only after the host accepted every mutation.
pub struct Engine<H: HostAdapter, S: IdleScheduler> {
    pub(crate) host: H,
    pub(crate) idle: S,
    pub(crate) config: EngineConfig,
    pub(crate) arena: FiberArena<H::Handle>,
    pub(crate) current_root: Option<FiberId>,
    pub(crate) wip_root: Option<FiberId>,
    pub(crate) next_unit: Option<FiberId>,
    pub(crate) deletions: Vec<FiberId>,
    pub(crate) stats: EngineStats,
    pub(crate) last_commit: Option<CommitSummary>,
    queued: Option<RenderRequest<H::Handle>>,
    units_in_render: usize,
}

impl<H: HostAdapter, S: IdleScheduler> Engine<H, S> {
    pub fn new(host: H, idle: S) -> Self {
        Self::with_config(host, idle, EngineConfig::default())
    }

    pub fn with_config(host: H, idle: S, config: EngineConfig) -> Self {
        Self {
            host,
            idle,
            config,
            arena: FiberArena::new(),
            current_root: None,
            wip_root: None,
            next_unit: None,
            deletions: Vec::new(),
            stats: EngineStats::default(),
            last_commit: None,
            queued: None,
            units_in_render: 0,
        }
    }

    /// Schedule reconciliation of `description` into `container`.
    ///
    /// Returns immediately. A request that arrives before the pending render
    /// has run any unit replaces it; one arriving mid-traversal follows
    /// [`EngineConfig::overlap`].
    pub fn render(&mut self, description: Description, container: H::Handle) -> Result<()> {
        if let Some(bound) = self.current_root.or(self.wip_root) {
            if self.arena[bound].host.as_ref() != Some(&container) {
                warn!("render into {:?} rejected: engine is bound elsewhere", container);
                return Err(Error::ContainerMismatch);
            }
        }

        if let Some(wip) = self.wip_root {
            if self.units_in_render > 0 {
                return match self.config.overlap {
                    OverlapPolicy::Reject => {
                        warn!(
                            "render rejected: {} units into the previous render",
                            self.units_in_render
                        );
                        Err(Error::RenderInFlight {
                            units: self.units_in_render,
                        })
                    }
                    OverlapPolicy::Queue => {
                        debug!("render queued behind in-flight traversal");
                        self.queued = Some(RenderRequest {
                            description,
                            container,
                        });
                        Ok(())
                    }
                };
            }
            debug!("replacing render request that has not started");
            self.arena.release(wip);
        }

        self.start_render(RenderRequest {
            description,
            container,
        });
        Ok(())
    }

    fn start_render(&mut self, request: RenderRequest<H::Handle>) {
        let root = Fiber::root(
            Description::container(request.description),
            request.container,
            self.current_root,
        );
        let root = self.arena.alloc(root);
        self.wip_root = Some(root);
        self.next_unit = Some(root);
        self.units_in_render = 0;
        self.deletions.clear();
        self.stats.renders += 1;
        debug!("render scheduled (root {:?})", root);
        self.idle.request_slice();
    }

    /// Work for one slice granted by the idle service.
    ///
    /// Performs at least one unit, then keeps going until the deadline drops
    /// below the yield threshold or the unit cap is reached. Commits in the
    /// same slice once the traversal is complete.
    pub fn run_slice(&mut self, deadline: &dyn Deadline) -> Result<SliceOutcome> {
        if self.wip_root.is_none() {
            return Ok(SliceOutcome::Idle);
        }
        self.stats.slices += 1;

        let threshold = self.config.yield_threshold();
        let mut units = 0;
        while let Some(unit) = self.next_unit {
            match self.perform_unit(unit) {
                Ok(next) => self.next_unit = next,
                Err(err) => {
                    warn!("render abandoned after {} units: {}", self.units_in_render, err);
                    self.abandon_render();
                    self.start_queued();
                    return Err(err);
                }
            }
            units += 1;
            self.units_in_render += 1;
            self.stats.units += 1;

            let capped = self
                .config
                .max_units_per_slice
                .is_some_and(|cap| units >= cap);
            if self.next_unit.is_some() && (capped || deadline.time_remaining() < threshold) {
                debug!(
                    "yielding after {} units ({} this render)",
                    units, self.units_in_render
                );
                self.idle.request_slice();
                return Ok(SliceOutcome::Yielded { units });
            }
        }

        let committed = self.commit_root();
        if committed.is_err() {
            self.stats.aborted += 1;
        }
        self.start_queued();
        committed.map(|summary| SliceOutcome::Committed { units, summary })
    }

    /// Process one fiber and return the next one to visit.
    fn perform_unit(&mut self, id: FiberId) -> Result<Option<FiberId>> {
        let description = self.arena[id].description.clone();
        trace!("unit {:?} ({})", id, description.kind());

        if self.arena[id].host.is_none() {
            let handle = self.create_host_node(&description)?;
            self.arena[id].host = Some(handle);
        }

        reconcile_children(&mut self.arena, id, description.children(), &mut self.deletions);

        let root = self.wip_root.unwrap_or(id);
        Ok(self.arena.next_in_order(root, id))
    }

    /// Create a detached host node with its initial properties.
    fn create_host_node(&mut self, description: &Description) -> Result<H::Handle> {
        if description.is_text() {
            let value = description.text_value().unwrap_or_default();
            return Ok(self.host.create_text_node(&value)?);
        }
        let handle = self.host.create_node(description.kind())?;
        for change in diff_props(&Props::new(), description.props()) {
            if let Err(err) = to_mutation(&handle, change).apply(&mut self.host) {
                self.host.discard_node(&handle);
                return Err(err.into());
            }
        }
        Ok(handle)
    }

    fn abandon_render(&mut self) {
        self.stats.aborted += 1;
        self.deletions.clear();
        self.next_unit = None;
        if let Some(wip) = self.wip_root.take() {
            self.discard_tree(wip, true);
        }
    }

    /// Release a work-in-progress tree without touching current.
    ///
    /// With `discard_hosts`, host nodes created for its placements are handed
    /// back through [`HostAdapter::discard_node`]. They must still be detached.
    pub(crate) fn discard_tree(&mut self, root: FiberId, discard_hosts: bool) {
        self.next_unit = None;
        self.units_in_render = 0;
        if discard_hosts {
            let placed: Vec<H::Handle> = self
                .arena
                .subtree(root)
                .into_iter()
                .filter(|&id| self.arena[id].tag == Some(EditTag::Place))
                .filter_map(|id| self.arena[id].host.clone())
                .collect();
            debug!("discarding {} detached host nodes", placed.len());
            for node in &placed {
                self.host.discard_node(node);
            }
        }
        self.arena.release_subtree(root);
    }

    fn start_queued(&mut self) {
        if let Some(request) = self.queued.take() {
            debug!("starting queued render");
            self.start_render(request);
        }
    }

    /// Whether a render is scheduled or in progress.
    pub fn has_pending_work(&self) -> bool {
        self.wip_root.is_some()
    }

    /// Whether the pending render has already processed units.
    pub fn is_mid_traversal(&self) -> bool {
        self.wip_root.is_some() && self.units_in_render > 0
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn idle(&self) -> &S {
        &self.idle
    }

    pub fn idle_mut(&mut self) -> &mut S {
        &mut self.idle
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn last_commit(&self) -> Option<CommitSummary> {
        self.last_commit
    }

    /// Description last committed, if any.
    pub fn current(&self) -> Option<&Description> {
        let root = self.current_root?;
        self.arena[root].description.children().first()
    }

    /// Live fibers, current and work-in-progress together.
    pub fn fiber_count(&self) -> usize {
        self.arena.len()
    }
}

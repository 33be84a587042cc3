//! # Crucible Fiber
//!
//! Incremental reconciliation of a declarative node tree onto a mutable host
//! tree, split into an interruptible render phase and an atomic commit phase.
//!
//! ## Architecture
//!
//! ```text
//! make_node()/node! -> Description --render()--> Engine
//!                                                  |
//!        idle service --run_slice(deadline)------->|  work loop, one fiber per unit
//!                                                  |  reconcile_children() per parent
//!                                                  v
//!                                        commit: plan -> validate -> apply
//!                                                  |
//!                                                  v
//!                                      HostAdapter (host tree)
//! ```
//!
//! - **Render phase** walks the fiber tree depth-first through explicit
//!   child/sibling/parent links, so it can stop after any unit and resume in
//!   the next slice. It never mutates attached host nodes.
//! - **Commit phase** runs in one go once the tree is complete, and swaps the
//!   current tree only after every host mutation succeeded.
//! - Children are matched **by position**. Keys are not consulted.
//!
//! ## Quick Start
//!
//! ```
//! use crucible_fiber::{driver, node, Engine, ManualIdle, MemoryHost};
//!
//! let mut engine = Engine::new(MemoryHost::new(), ManualIdle::new());
//! let container = engine.host().container();
//!
//! engine.render(node!("ul", None, node!("li", None, "1"), node!("li", None, "2")), container)?;
//! driver::run_to_completion(&mut engine)?;
//!
//! assert_eq!(engine.host().render_tree(container), "#container\n  ul\n    li\n      \"1\"\n    li\n      \"2\"");
//! # Ok::<(), crucible_fiber::Error>(())
//! ```

#![deny(unsafe_code)]
#![warn(clippy::all)]

pub mod commit;
pub mod config;
pub mod description;
pub mod driver;
pub mod error;
pub mod fiber;
pub mod host;
pub mod memory_host;
pub mod props;
pub mod reconciler;
pub mod scheduler;
mod work_loop;

pub use commit::{CommitPlan, CommitSummary};
pub use config::{EngineConfig, OverlapPolicy};
pub use description::{make_node, text_node, Child, Description, TEXT_KIND, TEXT_VALUE};
pub use error::{Error, Result};
pub use fiber::{EditTag, Fiber, FiberArena, FiberId};
pub use host::{HostAdapter, HostError, HostMutation};
pub use memory_host::{HostOp, MemoryHost, NodeId};
pub use props::{EventHandler, HostEvent, PropValue, Props};
pub use reconciler::{reconcile_children, ChildEdits};
pub use scheduler::{
    CountdownDeadline, Deadline, ExpiredDeadline, IdleScheduler, InstantDeadline, ManualIdle,
    UnboundedDeadline,
};
pub use work_loop::{Engine, EngineStats, SliceOutcome};

//! Boundary to the platform-owned host tree.
//!
//! The engine never touches the host tree except through [`HostAdapter`],
//! and only the committer calls the mutating primitives on attached nodes.

use crate::props::{EventHandler, PropValue};
use std::fmt::Debug;
use thiserror::Error;

/// Failure reported by a host adapter primitive.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The handle does not name a live host node.
    #[error("Unknown host node: {0}")]
    UnknownNode(String),

    /// `child` is not attached under `parent`.
    #[error("Node {child} is not a child of {parent}")]
    NotAChild {
        /// Expected parent.
        parent: String,
        /// Detached child.
        child: String,
    },

    /// The host refused to create a node.
    #[error("Cannot create host node '{0}'")]
    CreateFailed(String),

    /// The host rejected a mutation.
    #[error("Host rejected {op}: {reason}")]
    Rejected {
        /// Mutation name.
        op: &'static str,
        /// Adapter supplied reason.
        reason: String,
    },
}

/// Primitive operations of the host platform.
///
/// Event names passed to [`bind_event`](HostAdapter::bind_event) are already
/// normalized (`onClick` arrives as `click`). Property values are passed
/// through untouched.
pub trait HostAdapter {
    /// Handle to a host node, owned by the host.
    type Handle: Clone + PartialEq + Debug;

    fn create_node(&mut self, kind: &str) -> Result<Self::Handle, HostError>;

    fn create_text_node(&mut self, value: &str) -> Result<Self::Handle, HostError>;

    fn set_property(
        &mut self,
        node: &Self::Handle,
        name: &str,
        value: &PropValue,
    ) -> Result<(), HostError>;

    fn clear_property(&mut self, node: &Self::Handle, name: &str) -> Result<(), HostError>;

    fn bind_event(
        &mut self,
        node: &Self::Handle,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError>;

    fn unbind_event(
        &mut self,
        node: &Self::Handle,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError>;

    fn append_child(&mut self, parent: &Self::Handle, child: &Self::Handle)
        -> Result<(), HostError>;

    /// Insert `child` under `parent` directly before the attached `before`.
    fn insert_before(
        &mut self,
        parent: &Self::Handle,
        child: &Self::Handle,
        before: &Self::Handle,
    ) -> Result<(), HostError>;

    fn remove_child(&mut self, parent: &Self::Handle, child: &Self::Handle)
        -> Result<(), HostError>;

    /// Drop a detached node created for a render that never committed.
    /// Hosts that reclaim unattached nodes on their own can ignore this.
    fn discard_node(&mut self, _node: &Self::Handle) {}

    /// Check a mutation without applying it. Called for every mutation of a
    /// commit before any is applied when transactional commits are enabled.
    fn validate(&self, _mutation: &HostMutation<Self::Handle>) -> Result<(), HostError> {
        Ok(())
    }
}

/// A host tree mutation planned by the committer.
#[derive(Debug, Clone, PartialEq)]
pub enum HostMutation<H> {
    Remove {
        parent: H,
        child: H,
    },
    Insert {
        parent: H,
        child: H,
        before: Option<H>,
    },
    SetProperty {
        node: H,
        name: String,
        value: PropValue,
    },
    ClearProperty {
        node: H,
        name: String,
    },
    BindEvent {
        node: H,
        event: String,
        handler: EventHandler,
    },
    UnbindEvent {
        node: H,
        event: String,
        handler: EventHandler,
    },
}

impl<H> HostMutation<H> {
    pub fn name(&self) -> &'static str {
        match self {
            HostMutation::Remove { .. } => "remove_child",
            HostMutation::Insert { before: None, .. } => "append_child",
            HostMutation::Insert { .. } => "insert_before",
            HostMutation::SetProperty { .. } => "set_property",
            HostMutation::ClearProperty { .. } => "clear_property",
            HostMutation::BindEvent { .. } => "bind_event",
            HostMutation::UnbindEvent { .. } => "unbind_event",
        }
    }

    pub fn is_property_write(&self) -> bool {
        !matches!(
            self,
            HostMutation::Remove { .. } | HostMutation::Insert { .. }
        )
    }
}

impl<H: Clone + PartialEq + Debug> HostMutation<H> {
    /// Dispatch to the matching adapter primitive.
    pub fn apply<A>(&self, host: &mut A) -> Result<(), HostError>
    where
        A: HostAdapter<Handle = H> + ?Sized,
    {
        match self {
            HostMutation::Remove { parent, child } => host.remove_child(parent, child),
            HostMutation::Insert {
                parent,
                child,
                before: None,
            } => host.append_child(parent, child),
            HostMutation::Insert {
                parent,
                child,
                before: Some(before),
            } => host.insert_before(parent, child, before),
            HostMutation::SetProperty { node, name, value } => host.set_property(node, name, value),
            HostMutation::ClearProperty { node, name } => host.clear_property(node, name),
            HostMutation::BindEvent {
                node,
                event,
                handler,
            } => host.bind_event(node, event, handler),
            HostMutation::UnbindEvent {
                node,
                event,
                handler,
            } => host.unbind_event(node, event, handler),
        }
    }
}

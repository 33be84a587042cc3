//! In-memory host tree.
//!
//! Reference [`HostAdapter`] used by the tests and the demo binary. Every
//! applied primitive is appended to an operation log, and individual
//! primitives can be made to fail to exercise commit aborts.

use crate::description::TEXT_KIND;
use crate::host::{HostAdapter, HostError, HostMutation};
use crate::props::{EventHandler, HostEvent, PropValue};
use std::collections::{BTreeMap, HashSet};
use std::fmt::{self, Write};

/// Handle of a node in a [`MemoryHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One applied host primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOp {
    CreateNode { node: NodeId, kind: String },
    CreateText { node: NodeId, value: String },
    SetProperty { node: NodeId, name: String, value: String },
    ClearProperty { node: NodeId, name: String },
    BindEvent { node: NodeId, event: String },
    UnbindEvent { node: NodeId, event: String },
    AppendChild { parent: NodeId, child: NodeId },
    InsertBefore { parent: NodeId, child: NodeId, before: NodeId },
    RemoveChild { parent: NodeId, child: NodeId },
    DiscardNode { node: NodeId },
}

impl HostOp {
    /// Whether the op changed a property or an event binding.
    pub fn is_property_write(&self) -> bool {
        matches!(
            self,
            HostOp::SetProperty { .. }
                | HostOp::ClearProperty { .. }
                | HostOp::BindEvent { .. }
                | HostOp::UnbindEvent { .. }
        )
    }
}

#[derive(Debug)]
struct MemoryNode {
    kind: String,
    text: Option<String>,
    attrs: BTreeMap<String, String>,
    events: BTreeMap<String, Vec<EventHandler>>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    discarded: bool,
}

impl MemoryNode {
    fn new(kind: &str, text: Option<String>) -> Self {
        Self {
            kind: kind.to_string(),
            text,
            attrs: BTreeMap::new(),
            events: BTreeMap::new(),
            parent: None,
            children: Vec::new(),
            discarded: false,
        }
    }
}

/// Host tree kept in memory.
#[derive(Debug)]
pub struct MemoryHost {
    nodes: Vec<MemoryNode>,
    log: Vec<HostOp>,
    failing: HashSet<&'static str>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    /// Host with an empty container node.
    pub fn new() -> Self {
        Self {
            nodes: vec![MemoryNode::new("#container", None)],
            log: Vec::new(),
            failing: HashSet::new(),
        }
    }

    pub fn container(&self) -> NodeId {
        NodeId(0)
    }

    /// Make every later call of the named primitive fail, e.g. `"append_child"`.
    pub fn fail_on(&mut self, op: &'static str) {
        self.failing.insert(op);
    }

    pub fn clear_failures(&mut self) {
        self.failing.clear();
    }

    pub fn log(&self) -> &[HostOp] {
        &self.log
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Take the log accumulated so far.
    pub fn drain_log(&mut self) -> Vec<HostOp> {
        std::mem::take(&mut self.log)
    }

    pub fn kind(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id.0).map(|n| n.kind.as_str())
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id.0).and_then(|n| n.text.as_deref())
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes
            .get(id.0)
            .and_then(|n| n.attrs.get(name))
            .map(String::as_str)
    }

    pub fn attrs(&self, id: NodeId) -> Vec<(String, String)> {
        self.nodes
            .get(id.0)
            .map(|n| n.attrs.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    pub fn is_discarded(&self, id: NodeId) -> bool {
        self.nodes.get(id.0).is_some_and(|n| n.discarded)
    }

    /// Live nodes outside the container tree, excluding their descendants.
    pub fn detached(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, n)| n.parent.is_none() && !n.discarded)
            .map(|(index, _)| NodeId(index))
            .collect()
    }

    /// Number of handlers bound for `event` on `id`.
    pub fn listeners(&self, id: NodeId, event: &str) -> usize {
        self.nodes
            .get(id.0)
            .and_then(|n| n.events.get(event))
            .map_or(0, Vec::len)
    }

    /// Deliver an event to the handlers bound on `id`. Returns how many ran.
    pub fn dispatch(&self, id: NodeId, event: &str) -> usize {
        let handlers = match self.nodes.get(id.0).and_then(|n| n.events.get(event)) {
            Some(handlers) => handlers.clone(),
            None => return 0,
        };
        let payload = HostEvent::new(event);
        for handler in &handlers {
            handler.call(&payload);
        }
        handlers.len()
    }

    /// Indented dump of the subtree at `id`.
    pub fn render_tree(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, 0, &mut out);
        out.truncate(out.trim_end().len());
        out
    }

    fn write_node(&self, id: NodeId, depth: usize, out: &mut String) {
        let Some(node) = self.nodes.get(id.0) else {
            return;
        };
        let indent = "  ".repeat(depth);
        match &node.text {
            Some(text) => {
                let _ = writeln!(out, "{}{:?}", indent, text);
            }
            None => {
                let _ = write!(out, "{}{}", indent, node.kind);
                for (name, value) in &node.attrs {
                    let _ = write!(out, " {}={:?}", name, value);
                }
                for (event, handlers) in &node.events {
                    if !handlers.is_empty() {
                        let _ = write!(out, " [{}]", event);
                    }
                }
                out.push('\n');
            }
        }
        for child in &node.children {
            self.write_node(*child, depth + 1, out);
        }
    }

    fn check(&self, op: &'static str) -> Result<(), HostError> {
        if self.failing.contains(op) {
            return Err(HostError::Rejected {
                op,
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn node(&self, id: NodeId) -> Result<&MemoryNode, HostError> {
        self.nodes
            .get(id.0)
            .filter(|n| !n.discarded)
            .ok_or_else(|| HostError::UnknownNode(id.to_string()))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut MemoryNode, HostError> {
        self.nodes
            .get_mut(id.0)
            .filter(|n| !n.discarded)
            .ok_or_else(|| HostError::UnknownNode(id.to_string()))
    }

    fn position(&self, parent: NodeId, child: NodeId) -> Result<usize, HostError> {
        self.node(parent)?
            .children
            .iter()
            .position(|c| *c == child)
            .ok_or_else(|| HostError::NotAChild {
                parent: parent.to_string(),
                child: child.to_string(),
            })
    }

    fn alloc(&mut self, node: MemoryNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    fn detach(&mut self, child: NodeId) -> Result<(), HostError> {
        if let Some(parent) = self.node(child)?.parent {
            let index = self.position(parent, child)?;
            self.node_mut(parent)?.children.remove(index);
            self.node_mut(child)?.parent = None;
        }
        Ok(())
    }
}

impl HostAdapter for MemoryHost {
    type Handle = NodeId;

    fn create_node(&mut self, kind: &str) -> Result<NodeId, HostError> {
        self.check("create_node")
            .map_err(|_| HostError::CreateFailed(kind.to_string()))?;
        let node = self.alloc(MemoryNode::new(kind, None));
        self.log.push(HostOp::CreateNode {
            node,
            kind: kind.to_string(),
        });
        Ok(node)
    }

    fn create_text_node(&mut self, value: &str) -> Result<NodeId, HostError> {
        self.check("create_text_node")
            .map_err(|_| HostError::CreateFailed(TEXT_KIND.to_string()))?;
        let node = self.alloc(MemoryNode::new(TEXT_KIND, Some(value.to_string())));
        self.log.push(HostOp::CreateText {
            node,
            value: value.to_string(),
        });
        Ok(node)
    }

    fn set_property(
        &mut self,
        node: &NodeId,
        name: &str,
        value: &PropValue,
    ) -> Result<(), HostError> {
        self.check("set_property")?;
        let target = self.node_mut(*node)?;
        let value = value.to_string();
        if target.text.is_some() && name == crate::description::TEXT_VALUE {
            target.text = Some(value.clone());
        } else {
            target.attrs.insert(name.to_string(), value.clone());
        }
        self.log.push(HostOp::SetProperty {
            node: *node,
            name: name.to_string(),
            value,
        });
        Ok(())
    }

    fn clear_property(&mut self, node: &NodeId, name: &str) -> Result<(), HostError> {
        self.check("clear_property")?;
        self.node_mut(*node)?.attrs.remove(name);
        self.log.push(HostOp::ClearProperty {
            node: *node,
            name: name.to_string(),
        });
        Ok(())
    }

    fn bind_event(
        &mut self,
        node: &NodeId,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError> {
        self.check("bind_event")?;
        self.node_mut(*node)?
            .events
            .entry(event.to_string())
            .or_default()
            .push(handler.clone());
        self.log.push(HostOp::BindEvent {
            node: *node,
            event: event.to_string(),
        });
        Ok(())
    }

    fn unbind_event(
        &mut self,
        node: &NodeId,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError> {
        self.check("unbind_event")?;
        if let Some(handlers) = self.node_mut(*node)?.events.get_mut(event) {
            handlers.retain(|h| h != handler);
        }
        self.log.push(HostOp::UnbindEvent {
            node: *node,
            event: event.to_string(),
        });
        Ok(())
    }

    fn append_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), HostError> {
        self.check("append_child")?;
        self.node(*parent)?;
        self.detach(*child)?;
        self.node_mut(*parent)?.children.push(*child);
        self.node_mut(*child)?.parent = Some(*parent);
        self.log.push(HostOp::AppendChild {
            parent: *parent,
            child: *child,
        });
        Ok(())
    }

    fn insert_before(
        &mut self,
        parent: &NodeId,
        child: &NodeId,
        before: &NodeId,
    ) -> Result<(), HostError> {
        self.check("insert_before")?;
        self.position(*parent, *before)?;
        self.detach(*child)?;
        let index = self.position(*parent, *before)?;
        self.node_mut(*parent)?.children.insert(index, *child);
        self.node_mut(*child)?.parent = Some(*parent);
        self.log.push(HostOp::InsertBefore {
            parent: *parent,
            child: *child,
            before: *before,
        });
        Ok(())
    }

    fn remove_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), HostError> {
        self.check("remove_child")?;
        let index = self.position(*parent, *child)?;
        self.node_mut(*parent)?.children.remove(index);
        self.node_mut(*child)?.parent = None;
        self.log.push(HostOp::RemoveChild {
            parent: *parent,
            child: *child,
        });
        Ok(())
    }

    fn discard_node(&mut self, node: &NodeId) {
        if let Ok(target) = self.node_mut(*node) {
            target.discarded = true;
            target.events.clear();
            self.log.push(HostOp::DiscardNode { node: *node });
        }
    }

    fn validate(&self, mutation: &HostMutation<NodeId>) -> Result<(), HostError> {
        self.check(mutation.name())?;
        match mutation {
            HostMutation::Remove { parent, child } => self.position(*parent, *child).map(|_| ()),
            HostMutation::Insert {
                parent,
                child,
                before,
            } => {
                self.node(*child)?;
                match before {
                    Some(before) => self.position(*parent, *before).map(|_| ()),
                    None => self.node(*parent).map(|_| ()),
                }
            }
            HostMutation::SetProperty { node, .. }
            | HostMutation::ClearProperty { node, .. }
            | HostMutation::BindEvent { node, .. }
            | HostMutation::UnbindEvent { node, .. } => self.node(*node).map(|_| ()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_insert_before_order_children() {
        let mut host = MemoryHost::new();
        let root = host.container();
        let a = host.create_node("a").unwrap();
        let b = host.create_node("b").unwrap();
        let c = host.create_node("c").unwrap();

        host.append_child(&root, &a).unwrap();
        host.append_child(&root, &c).unwrap();
        host.insert_before(&root, &b, &c).unwrap();

        assert_eq!(host.children(root), [a, b, c]);
        assert_eq!(host.parent(b), Some(root));
    }

    #[test]
    fn remove_child_requires_attachment() {
        let mut host = MemoryHost::new();
        let root = host.container();
        let a = host.create_node("a").unwrap();

        assert!(matches!(
            host.remove_child(&root, &a),
            Err(HostError::NotAChild { .. })
        ));
    }

    #[test]
    fn text_value_property_rewrites_text() {
        let mut host = MemoryHost::new();
        let t = host.create_text_node("old").unwrap();

        host.set_property(&t, "value", &PropValue::from("new"))
            .unwrap();

        assert_eq!(host.text(t), Some("new"));
        assert!(host.attrs(t).is_empty());
    }

    #[test]
    fn events_bind_dispatch_unbind() {
        use std::cell::Cell;
        use std::rc::Rc;

        let mut host = MemoryHost::new();
        let button = host.create_node("button").unwrap();
        let clicks = Rc::new(Cell::new(0));
        let counter = clicks.clone();
        let handler = EventHandler::new(move |_| counter.set(counter.get() + 1));

        host.bind_event(&button, "click", &handler).unwrap();
        assert_eq!(host.dispatch(button, "click"), 1);
        assert_eq!(clicks.get(), 1);

        host.unbind_event(&button, "click", &handler).unwrap();
        assert_eq!(host.dispatch(button, "click"), 0);
        assert_eq!(host.listeners(button, "click"), 0);
    }

    #[test]
    fn injected_failures_reject_without_logging() {
        let mut host = MemoryHost::new();
        host.fail_on("create_node");

        assert!(matches!(
            host.create_node("div"),
            Err(HostError::CreateFailed(kind)) if kind == "div"
        ));
        assert!(host.log().is_empty());

        host.clear_failures();
        assert!(host.create_node("div").is_ok());
    }

    #[test]
    fn discarded_nodes_are_no_longer_addressable() {
        let mut host = MemoryHost::new();
        let root = host.container();
        let a = host.create_node("a").unwrap();
        assert_eq!(host.detached(), [a]);

        host.discard_node(&a);

        assert!(host.is_discarded(a));
        assert!(host.detached().is_empty());
        assert!(matches!(
            host.append_child(&root, &a),
            Err(HostError::UnknownNode(_))
        ));
        assert_eq!(host.log().last(), Some(&HostOp::DiscardNode { node: a }));
    }

    #[test]
    fn validate_checks_before_reference() {
        let mut host = MemoryHost::new();
        let root = host.container();
        let a = host.create_node("a").unwrap();
        let detached = host.create_node("b").unwrap();

        let mutation = HostMutation::Insert {
            parent: root,
            child: a,
            before: Some(detached),
        };
        assert!(host.validate(&mutation).is_err());
    }

    #[test]
    fn render_tree_shows_attrs_and_events() {
        let mut host = MemoryHost::new();
        let root = host.container();
        let div = host.create_node("div").unwrap();
        let text = host.create_text_node("hi").unwrap();
        host.set_property(&div, "id", &PropValue::from("main"))
            .unwrap();
        host.bind_event(&div, "click", &EventHandler::new(|_| {}))
            .unwrap();
        host.append_child(&root, &div).unwrap();
        host.append_child(&div, &text).unwrap();

        insta::assert_snapshot!(host.render_tree(root), @r###"
        #container
          div id="main" [click]
            "hi"
        "###);
    }
}

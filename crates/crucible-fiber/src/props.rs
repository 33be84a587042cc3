//! Property values and the property diff applied to host nodes.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Names that describe the tree itself and never reach the host.
pub const RESERVED_PROPS: &[&str] = &["children", "key"];

/// Prefix that marks a property as an event binding (`onClick` -> `click`).
pub const EVENT_PREFIX: &str = "on";

/// Payload delivered to an event handler by the host.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HostEvent {
    pub name: String,
    pub detail: Option<String>,
}

impl HostEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            detail: None,
        }
    }
}

/// Shared event callback. Two handlers are equal only if they are the same
/// allocation, so re-creating a closure each render counts as a change.
#[derive(Clone)]
pub struct EventHandler(Rc<dyn Fn(&HostEvent)>);

impl EventHandler {
    pub fn new(f: impl Fn(&HostEvent) + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, event: &HostEvent) {
        (self.0)(event)
    }
}

impl PartialEq for EventHandler {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventHandler({:p})", Rc::as_ptr(&self.0))
    }
}

/// A single property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Str(String),
    Number(f64),
    Bool(bool),
    Handler(EventHandler),
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Str(s) => f.write_str(s),
            PropValue::Number(n) => write!(f, "{}", n),
            PropValue::Bool(b) => write!(f, "{}", b),
            PropValue::Handler(h) => write!(f, "{:?}", h),
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Number(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Number(f64::from(value))
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<EventHandler> for PropValue {
    fn from(value: EventHandler) -> Self {
        PropValue::Handler(value)
    }
}

/// Ordered property map of a description node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Props(BTreeMap<String, PropValue>);

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Builder-style event binding: `on("click", h)` stores `onClick`.
    pub fn on(self, event: &str, handler: EventHandler) -> Self {
        let mut name = String::from(EVENT_PREFIX);
        let mut chars = event.chars();
        if let Some(first) = chars.next() {
            name.extend(first.to_uppercase());
            name.push_str(chars.as_str());
        }
        self.with(name, handler)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<PropValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<PropValue>> FromIterator<(K, V)> for Props {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Event name for a property, if it is an event binding.
///
/// `onClick` -> `click`. A bare `on` is a plain attribute.
pub fn event_name(prop: &str) -> Option<String> {
    prop.strip_prefix(EVENT_PREFIX)
        .filter(|rest| !rest.is_empty())
        .map(str::to_lowercase)
}

pub fn is_reserved(prop: &str) -> bool {
    RESERVED_PROPS.contains(&prop)
}

/// Whether `value` under `prop` is bound as an event handler rather than set.
fn is_binding(prop: &str, value: &PropValue) -> bool {
    matches!(value, PropValue::Handler(_)) && event_name(prop).is_some()
}

/// One host-level change produced by [`diff_props`].
#[derive(Debug, Clone, PartialEq)]
pub enum PropChange {
    Unbind { event: String, handler: EventHandler },
    Clear { name: String },
    Set { name: String, value: PropValue },
    Bind { event: String, handler: EventHandler },
}

/// Diff two property maps.
///
/// Changes come out grouped as unbinds, clears, sets, binds. Keys equal in
/// both maps produce nothing, so diffing a map against itself is empty.
pub fn diff_props(old: &Props, new: &Props) -> Vec<PropChange> {
    let mut unbinds = Vec::new();
    let mut clears = Vec::new();
    let mut sets = Vec::new();
    let mut binds = Vec::new();

    for (name, old_value) in old.iter().filter(|(name, _)| !is_reserved(name)) {
        let next = new.get(name);
        if next == Some(old_value) {
            continue;
        }
        match (event_name(name), old_value) {
            (Some(event), PropValue::Handler(handler)) => unbinds.push(PropChange::Unbind {
                event,
                handler: handler.clone(),
            }),
            // Attribute that is gone, or replaced by a binding under the same name.
            _ if next.map_or(true, |value| is_binding(name, value)) => {
                clears.push(PropChange::Clear {
                    name: name.to_string(),
                })
            }
            // Changed attribute: the set below overwrites it.
            _ => {}
        }
    }

    for (name, value) in new.iter().filter(|(name, _)| !is_reserved(name)) {
        if old.get(name) == Some(value) {
            continue;
        }
        match (event_name(name), value) {
            (Some(event), PropValue::Handler(handler)) => binds.push(PropChange::Bind {
                event,
                handler: handler.clone(),
            }),
            _ => sets.push(PropChange::Set {
                name: name.to_string(),
                value: value.clone(),
            }),
        }
    }

    unbinds
        .into_iter()
        .chain(clears)
        .chain(sets)
        .chain(binds)
        .collect()
}

//! Immutable description of what the host tree should look like.

use crate::props::{PropValue, Props};
use std::fmt;
use std::rc::Rc;

/// Kind reserved for raw text content.
pub const TEXT_KIND: &str = "TEXT";

/// Property carrying the content of a [`TEXT_KIND`] node.
pub const TEXT_VALUE: &str = "value";

#[derive(Debug, PartialEq)]
struct DescriptionData {
    kind: String,
    props: Props,
    children: Vec<Description>,
}

/// A node of the description tree. Cloning is cheap and the value never
/// changes after construction.
#[derive(Clone, PartialEq)]
pub struct Description(Rc<DescriptionData>);

impl Description {
    pub fn kind(&self) -> &str {
        &self.0.kind
    }

    pub fn props(&self) -> &Props {
        &self.0.props
    }

    pub fn children(&self) -> &[Description] {
        &self.0.children
    }

    pub fn is_text(&self) -> bool {
        self.0.kind == TEXT_KIND
    }

    /// Content of a text node.
    pub fn text_value(&self) -> Option<String> {
        if !self.is_text() {
            return None;
        }
        self.0.props.get(TEXT_VALUE).map(ToString::to_string)
    }

    /// Synthetic root wrapping the rendered tree under a host container.
    pub(crate) fn container(root: Description) -> Self {
        Self(Rc::new(DescriptionData {
            kind: String::new(),
            props: Props::new(),
            children: vec![root],
        }))
    }

    /// Number of nodes in this subtree, itself included.
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(Self::node_count).sum::<usize>()
    }
}

impl fmt::Debug for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(value) = self.text_value() {
            return write!(f, "{:?}", value);
        }
        let mut tuple = f.debug_tuple(self.kind());
        if !self.props().is_empty() {
            tuple.field(self.props());
        }
        for child in self.children() {
            tuple.field(child);
        }
        tuple.finish()
    }
}

/// Anything accepted as a child by [`make_node`].
#[derive(Debug, Clone)]
pub enum Child {
    Node(Description),
    Text(String),
}

impl Child {
    fn into_description(self) -> Description {
        match self {
            Child::Node(node) => node,
            Child::Text(text) => text_node(text),
        }
    }
}

impl From<Description> for Child {
    fn from(node: Description) -> Self {
        Child::Node(node)
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Child::Text(text.to_string())
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Child::Text(text)
    }
}

macro_rules! child_from_display {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Child {
            fn from(value: $ty) -> Self {
                Child::Text(value.to_string())
            }
        })*
    };
}

child_from_display!(char, bool, i32, i64, u32, u64, usize, f64);

/// Build a description node. Children that are not descriptions become
/// [`TEXT_KIND`] nodes.
pub fn make_node<C>(
    kind: impl Into<String>,
    props: Option<Props>,
    children: impl IntoIterator<Item = C>,
) -> Description
where
    C: Into<Child>,
{
    Description(Rc::new(DescriptionData {
        kind: kind.into(),
        props: props.unwrap_or_default(),
        children: children
            .into_iter()
            .map(|c| c.into().into_description())
            .collect(),
    }))
}

/// A [`TEXT_KIND`] node carrying `value`.
pub fn text_node(value: impl Into<String>) -> Description {
    Description(Rc::new(DescriptionData {
        kind: TEXT_KIND.to_string(),
        props: Props::new().with(TEXT_VALUE, PropValue::Str(value.into())),
        children: Vec::new(),
    }))
}

/// Variadic form of [`make_node`].
///
/// ```
/// use crucible_fiber::node;
///
/// let list = node!("ul", None, node!("li", None, "1"), node!("li", None, 2));
/// assert_eq!(list.children().len(), 2);
/// assert_eq!(list.children()[1].children()[0].text_value().as_deref(), Some("2"));
/// ```
#[macro_export]
macro_rules! node {
    ($kind:expr) => {
        $crate::make_node($kind, None, ::std::vec::Vec::<$crate::Child>::new())
    };
    ($kind:expr, $props:expr $(, $child:expr)* $(,)?) => {{
        let children: ::std::vec::Vec<$crate::Child> =
            ::std::vec![$($crate::Child::from($child)),*];
        $crate::make_node($kind, $props, children)
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_become_text_nodes() {
        let node = make_node("p", None, ["hello"]);
        let child = &node.children()[0];

        assert_eq!(child.kind(), TEXT_KIND);
        assert_eq!(child.text_value().as_deref(), Some("hello"));
        assert!(child.children().is_empty());
    }

    #[test]
    fn numbers_are_coerced_through_display() {
        let node = crate::node!("span", None, 42, 1.5, true);
        let values: Vec<_> = node
            .children()
            .iter()
            .filter_map(Description::text_value)
            .collect();

        assert_eq!(values, ["42", "1.5", "true"]);
    }

    #[test]
    fn descriptions_pass_through_untouched() {
        let inner = make_node("b", None, ["x"]);
        let outer = make_node("p", None, [Child::from(inner.clone())]);

        assert_eq!(outer.children()[0], inner);
    }

    #[test]
    fn missing_props_default_to_empty() {
        let node = crate::node!("div");
        assert!(node.props().is_empty());
        assert!(node.children().is_empty());
    }

    #[test]
    fn props_are_kept() {
        let node = make_node(
            "a",
            Some(Props::new().with("href", "/")),
            Vec::<Child>::new(),
        );
        assert_eq!(node.props().get("href"), Some(&PropValue::from("/")));
    }

    #[test]
    fn node_count_includes_text() {
        let tree = crate::node!(
            "ul",
            None,
            crate::node!("li", None, "1"),
            crate::node!("li", None, "2")
        );
        assert_eq!(tree.node_count(), 5);
    }

    #[test]
    fn debug_output_is_compact() {
        let tree = crate::node!("ul", None, crate::node!("li", None, "1"));
        assert_eq!(format!("{:?}", tree), r#"ul(li("1"))"#);
    }
}

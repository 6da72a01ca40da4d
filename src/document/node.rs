//! Profile document tree
//!
//! A document is an ordered tree of [`Node`]s under a single root. Nodes are
//! either elements holding child nodes or leaves holding scalar text. Sibling
//! groups sharing a tag represent multi-valued fields.

use std::borrow::Cow;

/// Markup attribute, preserved verbatim through parse and serialize
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A node of the profile tree
#[derive(Debug, Clone, Eq)]
pub enum Node {
    /// Structural node with ordered children
    Element {
        tag: String,
        attributes: Vec<Attribute>,
        children: Vec<Node>,
    },
    /// Scalar node
    Leaf {
        tag: String,
        attributes: Vec<Attribute>,
        text: String,
    },
}

/// Returned by [`Node::children_mut`] when the node is a leaf with text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextLeaf;

impl Node {
    /// Create an element with no children
    pub fn element(tag: impl Into<String>) -> Self {
        Node::Element {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Create a leaf carrying `text`
    pub fn leaf(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Node::Leaf {
            tag: tag.into(),
            attributes: Vec::new(),
            text: text.into(),
        }
    }

    /// Builder helper: append a child, promoting an empty leaf if needed.
    ///
    /// Panics if called on a leaf with text; intended for constructing
    /// fixtures, not for engine writes.
    pub fn with_child(mut self, child: Node) -> Self {
        match self.children_mut() {
            Ok(children) => children.push(child),
            Err(TextLeaf) => panic!("cannot add child to text leaf '{}'", self.tag()),
        }
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes_mut().push(Attribute::new(name, value));
        self
    }

    pub fn tag(&self) -> &str {
        match self {
            Node::Element { tag, .. } | Node::Leaf { tag, .. } => tag,
        }
    }

    pub fn attributes(&self) -> &[Attribute] {
        match self {
            Node::Element { attributes, .. } | Node::Leaf { attributes, .. } => attributes,
        }
    }

    fn attributes_mut(&mut self) -> &mut Vec<Attribute> {
        match self {
            Node::Element { attributes, .. } | Node::Leaf { attributes, .. } => attributes,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Child nodes; always empty for a leaf
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element { children, .. } => children,
            Node::Leaf { .. } => &[],
        }
    }

    /// Mutable child list.
    ///
    /// A leaf with empty or whitespace-only text is promoted to an element
    /// in place, dropping the whitespace. A leaf carrying text cannot take
    /// children.
    pub fn children_mut(&mut self) -> Result<&mut Vec<Node>, TextLeaf> {
        if let Node::Leaf {
            tag,
            attributes,
            text,
        } = self
        {
            if !text.trim().is_empty() {
                return Err(TextLeaf);
            }
            *self = Node::Element {
                tag: std::mem::take(tag),
                attributes: std::mem::take(attributes),
                children: Vec::new(),
            };
        }
        match self {
            Node::Element { children, .. } => Ok(children),
            Node::Leaf { .. } => Err(TextLeaf),
        }
    }

    /// Text content: the leaf text, or the concatenated text of all
    /// descendants in document order.
    pub fn text_content(&self) -> Cow<'_, str> {
        match self {
            Node::Leaf { text, .. } => Cow::Borrowed(text),
            Node::Element { children, .. } => {
                let mut out = String::new();
                for child in children {
                    out.push_str(&child.text_content());
                }
                Cow::Owned(out)
            }
        }
    }

    /// Replace the content of this node with `text`, keeping tag and
    /// attributes. An element becomes a leaf.
    pub fn set_text(&mut self, value: impl Into<String>) {
        match self {
            Node::Leaf { text, .. } => *text = value.into(),
            Node::Element {
                tag, attributes, ..
            } => {
                *self = Node::Leaf {
                    tag: std::mem::take(tag),
                    attributes: std::mem::take(attributes),
                    text: value.into(),
                };
            }
        }
    }

    /// Index of the first child with `tag`
    pub fn position_of(&self, tag: &str) -> Option<usize> {
        self.children().iter().position(|c| c.tag() == tag)
    }

    /// All children with `tag`, in document order
    pub fn children_tagged<'a, 't>(&'a self, tag: &'t str) -> impl Iterator<Item = &'a Node> + 't
    where
        'a: 't,
    {
        self.children().iter().filter(move |c| c.tag() == tag)
    }

    /// Number of nodes in this subtree, including self
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(Node::node_count).sum::<usize>()
    }

    fn has_empty_content(&self) -> bool {
        match self {
            Node::Element { children, .. } => children.is_empty(),
            Node::Leaf { text, .. } => text.is_empty(),
        }
    }
}

/// Structural equality. An element without children and a leaf with empty
/// text are the same content: both serialize to `<tag/>`.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        if self.tag() != other.tag() || self.attributes() != other.attributes() {
            return false;
        }
        match (self, other) {
            (Node::Leaf { text: a, .. }, Node::Leaf { text: b, .. }) => a == b,
            (Node::Element { children: a, .. }, Node::Element { children: b, .. }) => a == b,
            _ => self.has_empty_content() && other.has_empty_content(),
        }
    }
}

/// Location of a node as the child-index trail from the root.
///
/// An empty trail addresses the root itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeAddress(Vec<usize>);

impl NodeAddress {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, index: usize) {
        self.0.push(index);
    }

    /// Address of the `index`-th child of this node
    pub fn child(&self, index: usize) -> Self {
        let mut next = self.clone();
        next.push(index);
        next
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }
}

/// A parsed profile document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: Node,
}

impl Document {
    /// Create an empty document for the family rooted at `root_tag`
    pub fn new(root_tag: impl Into<String>) -> Self {
        Self {
            root: Node::element(root_tag),
        }
    }

    pub fn from_root(root: Node) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Node {
        &mut self.root
    }

    pub fn node_at(&self, address: &NodeAddress) -> Option<&Node> {
        let mut node = &self.root;
        for &index in address.indices() {
            node = node.children().get(index)?;
        }
        Some(node)
    }

    pub fn node_at_mut(&mut self, address: &NodeAddress) -> Option<&mut Node> {
        let mut node = &mut self.root;
        for &index in address.indices() {
            node = match node {
                Node::Element { children, .. } => children.get_mut(index)?,
                Node::Leaf { .. } => return None,
            };
        }
        Some(node)
    }

    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }
}

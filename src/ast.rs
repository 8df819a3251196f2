//! Stylesheet tree types for the csspx compiler

use std::fmt;

/// Marker comment appended to every synthesized declaration.
pub const ALTERNATE_MARKER: &str = "/* @alternate */";

/// Position of a node in its source file (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// A `/* ... */` comment, text includes the delimiters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment(pub String);

impl Comment {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn alternate_marker() -> Self {
        Self(ALTERNATE_MARKER.to_string())
    }

    pub fn text(&self) -> &str {
        &self.0
    }
}

/// Root of a parsed stylesheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Stylesheet {
    pub items: Vec<Node>,
}

/// Ordered children of a `{ ... }` block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub items: Vec<Node>,
}

impl Block {
    pub fn new(items: Vec<Node>) -> Self {
        Self { items }
    }

    pub fn declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.items.iter().filter_map(Node::as_declaration)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Declaration(Declaration),
    Ruleset(Ruleset),
    /// `@defmixin name(PARAMS) { ... }`
    MixinDefinition(MixinDefinition),
    /// Any other at-rule, with or without a block.
    AtRule(AtRule),
    /// A comment standing on its own between rules.
    Comment(Comment),
}

impl Node {
    pub fn as_declaration(&self) -> Option<&Declaration> {
        match self {
            Node::Declaration(declaration) => Some(declaration),
            _ => None,
        }
    }

    pub fn is_declaration(&self) -> bool {
        matches!(self, Node::Declaration(_))
    }
}

impl From<Declaration> for Node {
    fn from(declaration: Declaration) -> Self {
        Node::Declaration(declaration)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ruleset {
    pub selectors: Vec<String>,
    pub block: Block,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MixinDefinition {
    pub name: String,
    pub parameters: String,
    pub block: Block,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AtRule {
    /// Name without the leading `@`.
    pub name: String,
    pub prelude: String,
    pub block: Option<Block>,
    pub location: SourceLocation,
}

/// Where a declaration came from.
///
/// Only the expansion pass creates the two expanded variants; the parser
/// always produces `Original`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Provenance {
    #[default]
    Original,
    /// A sibling synthesized under an alternate property name, e.g.
    /// `-webkit-transform` from `transform`.
    ExpandedFromProperty { property: String },
    /// A sibling synthesized by substituting a value or a function name.
    /// `property` is the property the matching rule was bound to, and is
    /// `None` for rules matching a function anywhere (`calc`, gradients).
    ExpandedFromValue {
        value: String,
        property: Option<String>,
    },
}

impl Provenance {
    pub fn is_auto_expanded(&self) -> bool {
        !matches!(self, Provenance::Original)
    }

    pub fn expanded_from_property(&self) -> Option<&str> {
        match self {
            Provenance::ExpandedFromProperty { property } => Some(property),
            _ => None,
        }
    }

    pub fn expanded_from_value(&self) -> Option<&str> {
        match self {
            Provenance::ExpandedFromValue { value, .. } => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub property: String,
    pub value: PropertyValue,
    pub comments: Vec<Comment>,
    pub location: SourceLocation,
    pub provenance: Provenance,
}

impl Declaration {
    pub fn new(property: impl Into<String>, value: PropertyValue, location: SourceLocation) -> Self {
        Self {
            property: property.into(),
            value,
            comments: Vec::new(),
            location,
            provenance: Provenance::Original,
        }
    }

    pub fn with_comments(mut self, comments: Vec<Comment>) -> Self {
        self.comments = comments;
        self
    }

    pub fn append_comment(&mut self, comment: Comment) {
        self.comments.push(comment);
    }

    pub fn is_auto_expanded(&self) -> bool {
        self.provenance.is_auto_expanded()
    }

    /// Normalized value text, used for all textual value comparisons.
    pub fn value_text(&self) -> String {
        self.value.to_string()
    }
}

/// Ordered sequence of value nodes of a declaration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PropertyValue {
    pub nodes: Vec<ValueNode>,
}

impl PropertyValue {
    pub fn new(nodes: Vec<ValueNode>) -> Self {
        Self { nodes }
    }

    pub fn literal(text: impl Into<String>) -> Self {
        Self::new(vec![ValueNode::Literal(text.into())])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn first(&self) -> Option<&ValueNode> {
        self.nodes.first()
    }

    /// The trailing `!important` marker, if any.
    pub fn priority(&self) -> Option<&ValueNode> {
        self.nodes.last().filter(|node| node.is_priority())
    }

    /// Nodes before the priority marker.
    pub fn without_priority(&self) -> &[ValueNode] {
        match self.priority() {
            Some(_) => &self.nodes[..self.nodes.len() - 1],
            None => &self.nodes,
        }
    }

    pub fn push(&mut self, node: ValueNode) {
        self.nodes.push(node);
    }

    /// Normalized text without the `!important` marker.
    pub fn text_without_priority(&self) -> String {
        PropertyValue::new(self.without_priority().to_vec()).to_string()
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 && !matches!(node, ValueNode::Literal(text) if text == ",") {
                write!(f, " ")?;
            }
            write!(f, "{}", node)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueNode {
    /// Keyword, number, dimension, color, string or separator.
    Literal(String),
    /// A function call; `arguments` is the verbatim text between the parens.
    Function { name: String, arguments: String },
    /// `!important`
    Priority(String),
}

impl ValueNode {
    pub fn function(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        ValueNode::Function {
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    pub fn is_priority(&self) -> bool {
        matches!(self, ValueNode::Priority(_))
    }

    pub fn function_name(&self) -> Option<&str> {
        match self {
            ValueNode::Function { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Same function with a different name, arguments carried across.
    pub fn renamed(&self, new_name: &str) -> Option<ValueNode> {
        match self {
            ValueNode::Function { arguments, .. } => Some(ValueNode::Function {
                name: new_name.to_string(),
                arguments: arguments.clone(),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for ValueNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueNode::Literal(text) => write!(f, "{}", text),
            ValueNode::Function { name, arguments } => write!(f, "{}({})", name, arguments),
            ValueNode::Priority(text) => write!(f, "{}", text),
        }
    }
}

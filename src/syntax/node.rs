//! Syntax node definitions
//!
//! A [`SyntaxNode`] is a kind tag plus an ordered list of `(name, Field)` pairs. The generic
//! field layout lets the matcher walk any two trees in lock-step without knowing the kinds
//! involved, while the typed accessors below keep the renderer readable.

use super::kind::NodeKind;
use super::operator::Operator;
use serde::Serialize;
use std::fmt;
use std::ops::Range;

/// Leaf values stored directly in a field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Scalar {
    /// An identifier: variable, function, attribute or parameter name
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    None,
    Ellipsis,
    Op(Operator),
    /// The operator sequence of a chained comparison
    Ops(Vec<Operator>),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Ident(name) => f.write_str(name),
            Scalar::Int(value) => write!(f, "{}", value),
            Scalar::Float(value) => f.write_str(&format_float(*value)),
            Scalar::Str(value) => write!(f, "{:?}", value),
            Scalar::Bool(true) => f.write_str("True"),
            Scalar::Bool(false) => f.write_str("False"),
            Scalar::None => f.write_str("None"),
            Scalar::Ellipsis => f.write_str("..."),
            Scalar::Op(op) => write!(f, "{}", op),
            Scalar::Ops(ops) => {
                let symbols: Vec<&str> = ops.iter().map(|op| op.symbol()).collect();
                write!(f, "[{}]", symbols.join(", "))
            }
        }
    }
}

/// Format a float the way the reference language prints it (`1.0`, not `1`)
pub fn format_float(value: f64) -> String {
    if value.is_infinite() {
        if value > 0.0 {
            "inf".to_string()
        } else {
            "-inf".to_string()
        }
    } else if value.is_nan() {
        "nan".to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// Content of one named field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Field {
    Scalar(Scalar),
    Node(Box<SyntaxNode>),
    List(Vec<SyntaxNode>),
    Absent,
}

impl From<Option<SyntaxNode>> for Field {
    fn from(node: Option<SyntaxNode>) -> Self {
        match node {
            Some(node) => Field::Node(Box::new(node)),
            None => Field::Absent,
        }
    }
}

/// One node of the syntax tree
///
/// Equality is structural: kinds and fields are compared, source spans are not.
#[derive(Debug, Clone, Serialize)]
pub struct SyntaxNode {
    kind: NodeKind,
    fields: Vec<(&'static str, Field)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    span: Option<Range<usize>>,
}

impl PartialEq for SyntaxNode {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.fields == other.fields
    }
}

impl SyntaxNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            fields: Vec::new(),
            span: None,
        }
    }

    // ------------------------------------------------------------------
    // Builders
    // ------------------------------------------------------------------

    pub fn with(mut self, name: &'static str, field: Field) -> Self {
        self.fields.push((name, field));
        self
    }

    pub fn with_node(self, name: &'static str, node: SyntaxNode) -> Self {
        self.with(name, Field::Node(Box::new(node)))
    }

    pub fn with_optional(self, name: &'static str, node: Option<SyntaxNode>) -> Self {
        self.with(name, Field::from(node))
    }

    pub fn with_list(self, name: &'static str, nodes: Vec<SyntaxNode>) -> Self {
        self.with(name, Field::List(nodes))
    }

    pub fn with_scalar(self, name: &'static str, scalar: Scalar) -> Self {
        self.with(name, Field::Scalar(scalar))
    }

    pub fn with_span(mut self, span: Range<usize>) -> Self {
        self.span = Some(span);
        self
    }

    /// A bare identifier reference
    pub fn name(id: impl Into<String>) -> Self {
        SyntaxNode::new(NodeKind::Name).with_scalar("id", Scalar::Ident(id.into()))
    }

    pub fn constant(value: Scalar) -> Self {
        SyntaxNode::new(NodeKind::Constant).with_scalar("value", value)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn span(&self) -> Option<Range<usize>> {
        self.span.clone()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &Field)> {
        self.fields.iter().map(|(name, field)| (*name, field))
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|(field_name, _)| *field_name == name)
            .map(|(_, field)| field)
    }

    /// The sub-node stored under `name`, if the field holds one
    pub fn node(&self, name: &str) -> Option<&SyntaxNode> {
        match self.field(name) {
            Some(Field::Node(node)) => Some(node),
            _ => None,
        }
    }

    /// The node list stored under `name`; absent lists read as empty
    pub fn list(&self, name: &str) -> &[SyntaxNode] {
        match self.field(name) {
            Some(Field::List(nodes)) => nodes,
            _ => &[],
        }
    }

    pub fn scalar(&self, name: &str) -> Option<&Scalar> {
        match self.field(name) {
            Some(Field::Scalar(scalar)) => Some(scalar),
            _ => None,
        }
    }

    /// The identifier stored under `name`
    pub fn ident(&self, name: &str) -> Option<&str> {
        match self.scalar(name) {
            Some(Scalar::Ident(id)) => Some(id),
            _ => None,
        }
    }

    pub fn op(&self, name: &str) -> Option<Operator> {
        match self.scalar(name) {
            Some(Scalar::Op(op)) => Some(*op),
            _ => None,
        }
    }

    /// The identifier of a `Name` node
    pub fn name_id(&self) -> Option<&str> {
        if self.kind == NodeKind::Name {
            self.ident("id")
        } else {
            None
        }
    }

    /// Whether this is a `Name` node referring to `id`
    pub fn is_name(&self, id: &str) -> bool {
        self.name_id() == Some(id)
    }

    /// The string value of a string constant
    pub fn str_value(&self) -> Option<&str> {
        if self.kind != NodeKind::Constant {
            return None;
        }
        match self.scalar("value") {
            Some(Scalar::Str(value)) => Some(value),
            _ => None,
        }
    }

    /// The literal source text this node was parsed from
    pub fn source_text<'s>(&self, source: &'s str) -> Option<&'s str> {
        self.span.clone().and_then(|span| source.get(span))
    }

    /// Direct children in field order
    pub fn children(&self) -> impl Iterator<Item = &SyntaxNode> {
        self.fields.iter().flat_map(|(_, field)| {
            let children: &[SyntaxNode] = match field {
                Field::Node(node) => std::slice::from_ref(node.as_ref()),
                Field::List(nodes) => nodes.as_slice(),
                Field::Scalar(_) | Field::Absent => &[],
            };
            children
        })
    }
}

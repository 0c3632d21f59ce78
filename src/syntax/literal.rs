//! Constant folding of literal sub-trees
//!
//! [`fold`] reduces a sub-tree to a [`Literal`] when it is built only from constants, unary
//! `+`/`-` applied to numbers, and list/tuple/set/dict displays of such values. Binary
//! arithmetic is deliberately left alone: `2 + 2` is an expression, not the literal `4`.
//!
//! Folded values compare with the reference language's value equality, so `1`, `1.0` and
//! `True` are all equal and a set equals any reordering of itself.

use super::kind::NodeKind;
use super::node::{Scalar, SyntaxNode};
use super::operator::Operator;

#[derive(Debug, Clone)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    None,
    Ellipsis,
    List(Vec<Literal>),
    Tuple(Vec<Literal>),
    Set(Vec<Literal>),
    Dict(Vec<(Literal, Literal)>),
}

impl Literal {
    fn from_scalar(scalar: &Scalar) -> Option<Literal> {
        match scalar {
            Scalar::Int(value) => Some(Literal::Int(*value)),
            Scalar::Float(value) => Some(Literal::Float(*value)),
            Scalar::Bool(value) => Some(Literal::Bool(*value)),
            Scalar::Str(value) => Some(Literal::Str(value.clone())),
            Scalar::None => Some(Literal::None),
            Scalar::Ellipsis => Some(Literal::Ellipsis),
            Scalar::Ident(_) | Scalar::Op(_) | Scalar::Ops(_) => None,
        }
    }

    fn integer(&self) -> Option<i64> {
        match self {
            Literal::Int(value) => Some(*value),
            Literal::Bool(value) => Some(i64::from(*value)),
            _ => None,
        }
    }

    fn number(&self) -> Option<f64> {
        match self {
            Literal::Float(value) => Some(*value),
            other => other.integer().map(|value| value as f64),
        }
    }

    fn negate(self) -> Option<Literal> {
        match self {
            Literal::Float(value) => Some(Literal::Float(-value)),
            other => other
                .integer()
                .and_then(i64::checked_neg)
                .map(Literal::Int),
        }
    }

    /// Whether this is a number below zero
    pub fn is_negative(&self) -> bool {
        self.number().map_or(false, |value| value < 0.0)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Str(value) => Some(value),
            _ => None,
        }
    }

    /// Elements of a list or tuple
    pub fn as_sequence(&self) -> Option<&[Literal]> {
        match self {
            Literal::List(items) | Literal::Tuple(items) => Some(items),
            _ => None,
        }
    }
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Literal::Str(a), Literal::Str(b)) => a == b,
            (Literal::None, Literal::None) => true,
            (Literal::Ellipsis, Literal::Ellipsis) => true,
            (Literal::List(a), Literal::List(b)) => a == b,
            (Literal::Tuple(a), Literal::Tuple(b)) => a == b,
            (Literal::Set(a), Literal::Set(b)) => {
                a.iter().all(|item| b.contains(item)) && b.iter().all(|item| a.contains(item))
            }
            (Literal::Dict(a), Literal::Dict(b)) => {
                let same_entries = |keys: &[(Literal, Literal)]| {
                    keys.iter()
                        .all(|(key, _)| dict_lookup(a, key) == dict_lookup(b, key))
                };
                same_entries(a.as_slice()) && same_entries(b.as_slice())
            }
            (a, b) => match (a.integer(), b.integer()) {
                (Some(x), Some(y)) => x == y,
                _ => match (a.number(), b.number()) {
                    (Some(x), Some(y)) => x == y,
                    _ => false,
                },
            },
        }
    }
}

/// The value stored for `key`; later entries win like in a dict display
fn dict_lookup<'a>(entries: &'a [(Literal, Literal)], key: &Literal) -> Option<&'a Literal> {
    entries
        .iter()
        .rev()
        .find(|(candidate, _)| candidate == key)
        .map(|(_, value)| value)
}

/// Reduce `node` to a constant value, if it is a literal
pub fn fold(node: &SyntaxNode) -> Option<Literal> {
    match node.kind() {
        NodeKind::Constant => node.scalar("value").and_then(Literal::from_scalar),
        NodeKind::UnaryOp => {
            let operand = fold(node.node("operand")?)?;
            operand.number()?;
            match node.op("op")? {
                Operator::UAdd => match operand {
                    Literal::Bool(value) => Some(Literal::Int(i64::from(value))),
                    number => Some(number),
                },
                Operator::USub => operand.negate(),
                _ => None,
            }
        }
        NodeKind::List => fold_all(node.list("elts")).map(Literal::List),
        NodeKind::Tuple => fold_all(node.list("elts")).map(Literal::Tuple),
        NodeKind::Set => fold_all(node.list("elts")).map(Literal::Set),
        NodeKind::Dict => {
            let keys = node.list("keys");
            let values = node.list("values");
            if keys.len() != values.len() {
                return None;
            }
            keys.iter()
                .zip(values)
                .map(|(key, value)| Some((fold(key)?, fold(value)?)))
                .collect::<Option<Vec<_>>>()
                .map(Literal::Dict)
        }
        _ => None,
    }
}

fn fold_all(nodes: &[SyntaxNode]) -> Option<Vec<Literal>> {
    nodes.iter().map(fold).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(value: i64) -> SyntaxNode {
        SyntaxNode::constant(Scalar::Int(value))
    }

    fn negated(node: SyntaxNode) -> SyntaxNode {
        SyntaxNode::new(NodeKind::UnaryOp)
            .with_scalar("op", Scalar::Op(Operator::USub))
            .with_node("operand", node)
    }

    #[test]
    fn test_fold_constants_and_signs() {
        assert_eq!(fold(&int(42)), Some(Literal::Int(42)));
        assert_eq!(fold(&negated(int(1))), Some(Literal::Int(-1)));
        assert_eq!(fold(&negated(negated(int(42)))), Some(Literal::Int(42)));
        assert_eq!(fold(&SyntaxNode::name("x")), None);
    }

    #[test]
    fn test_binary_arithmetic_is_not_folded() {
        let sum = SyntaxNode::new(NodeKind::BinOp)
            .with_node("left", int(2))
            .with_scalar("op", Scalar::Op(Operator::Add))
            .with_node("right", int(2));
        assert_eq!(fold(&sum), None);
    }

    #[test]
    fn test_numeric_tower_equality() {
        assert_eq!(Literal::Int(1), Literal::Float(1.0));
        assert_eq!(Literal::Int(1), Literal::Bool(true));
        assert_ne!(Literal::Int(1), Literal::Str("1".into()));
    }

    #[test]
    fn test_container_equality() {
        let list = Literal::List(vec![Literal::Int(1), Literal::Int(2)]);
        let tuple = Literal::Tuple(vec![Literal::Int(1), Literal::Int(2)]);
        assert_ne!(list, tuple);

        let a = Literal::Set(vec![Literal::Int(1), Literal::Int(2)]);
        let b = Literal::Set(vec![Literal::Int(2), Literal::Int(1), Literal::Int(1)]);
        assert_eq!(a, b);

        let d1 = Literal::Dict(vec![(Literal::Str("a".into()), Literal::Int(1))]);
        let d2 = Literal::Dict(vec![(Literal::Str("a".into()), Literal::Float(1.0))]);
        assert_eq!(d1, d2);
    }
}

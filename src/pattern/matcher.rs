//! Structural matcher and unifier
//!
//! The matcher walks a pattern tree and a target tree in lock-step. It runs in one of two
//! modes:
//!
//! - **unify**: pattern names that are not globals are variables, `*name` list elements
//!   splat, and bare-variable bodies capture whole blocks
//! - **equality**: plain structural comparison, used to check a repeated variable against
//!   its first binding and to compare globals
//!
//! Both modes fold constant sub-trees before looking at their shape. Source spans never take
//! part in a comparison.

use crate::syntax::{fold, Field, NodeKind, SyntaxNode};
use std::collections::{BTreeSet, HashMap};

/// What a variable is bound to: a single sub-tree or a contiguous run of list elements
#[derive(Debug, Clone, Copy)]
pub enum Binding<'t> {
    Node(&'t SyntaxNode),
    List(&'t [SyntaxNode]),
}

impl<'t> Binding<'t> {
    pub fn as_node(&self) -> Option<&'t SyntaxNode> {
        match self {
            Binding::Node(node) => Some(node),
            Binding::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&'t [SyntaxNode]> {
        match self {
            Binding::List(nodes) => Some(nodes),
            Binding::Node(_) => None,
        }
    }
}

/// Variable bindings of one successful match
pub type Bindings<'t> = HashMap<String, Binding<'t>>;

/// Match `pattern` against `target`, treating names in `globals` as literals
pub fn match_pattern<'t>(
    pattern: &SyntaxNode,
    target: &'t SyntaxNode,
    globals: &BTreeSet<String>,
) -> Option<Bindings<'t>> {
    let mut unifier = Unifier {
        globals,
        bindings: HashMap::new(),
    };
    if unifier.node(pattern, target) {
        Some(unifier.bindings)
    } else {
        None
    }
}

/// Structural equality with constant folding
pub fn node_eq(a: &SyntaxNode, b: &SyntaxNode) -> bool {
    if let (Some(left), Some(right)) = (fold(a), fold(b)) {
        return left == right;
    }
    a.kind() == b.kind()
        && a.fields().count() == b.fields().count()
        && a
            .fields()
            .zip(b.fields())
            .all(|((name_a, x), (name_b, y))| name_a == name_b && field_eq(x, y))
}

fn field_eq(a: &Field, b: &Field) -> bool {
    match (a, b) {
        (Field::Scalar(x), Field::Scalar(y)) => x == y,
        (Field::Node(x), Field::Node(y)) => node_eq(x, y),
        (Field::List(x), Field::List(y)) => list_eq(x, y),
        (Field::Absent, Field::Absent) => true,
        _ => false,
    }
}

fn list_eq(a: &[SyntaxNode], b: &[SyntaxNode]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| node_eq(x, y))
}

fn binding_eq(a: Binding<'_>, b: Binding<'_>) -> bool {
    match (a, b) {
        (Binding::Node(x), Binding::Node(y)) => node_eq(x, y),
        (Binding::List(x), Binding::List(y)) => list_eq(x, y),
        _ => false,
    }
}

/// Fields holding statement blocks that a bare variable can capture whole
pub(crate) fn is_block_field(kind: NodeKind, field: &str) -> bool {
    matches!(kind, NodeKind::For | NodeKind::While | NodeKind::If)
        && matches!(field, "body" | "orelse")
}

/// Fields whose element lists accept one `*name` wildcard
pub(crate) fn is_splat_field(kind: NodeKind, field: &str) -> bool {
    matches!(
        (kind, field),
        (NodeKind::List, "elts") | (NodeKind::Tuple, "elts") | (NodeKind::Call, "args")
    )
}

/// The variable name of a `*name` wildcard element
pub(crate) fn wildcard_name(node: &SyntaxNode) -> Option<&SyntaxNode> {
    if node.kind() != NodeKind::Starred {
        return None;
    }
    node.node("value").filter(|value| value.kind() == NodeKind::Name)
}

struct Unifier<'g, 't> {
    globals: &'g BTreeSet<String>,
    bindings: Bindings<'t>,
}

impl<'g, 't> Unifier<'g, 't> {
    fn node(&mut self, pattern: &SyntaxNode, target: &'t SyntaxNode) -> bool {
        if pattern.kind() == NodeKind::Name {
            return self.unify(pattern, Binding::Node(target));
        }

        if let (Some(left), Some(right)) = (fold(pattern), fold(target)) {
            return left == right;
        }

        if pattern.kind() != target.kind() || pattern.fields().count() != target.fields().count() {
            return false;
        }

        let kind = pattern.kind();
        pattern
            .fields()
            .zip(target.fields())
            .all(|((name, x), (target_name, y))| {
                name == target_name && self.field(kind, name, x, y)
            })
    }

    fn field(&mut self, kind: NodeKind, name: &str, pattern: &Field, target: &'t Field) -> bool {
        match (pattern, target) {
            (Field::Scalar(x), Field::Scalar(y)) => x == y,
            (Field::Node(x), Field::Node(y)) => self.node(x, y),
            (Field::List(x), Field::List(y)) if is_block_field(kind, name) => self.block(x, y),
            (Field::List(x), Field::List(y)) if is_splat_field(kind, name) => self.splat(x, y),
            (Field::List(x), Field::List(y)) => self.list(x, y),
            (Field::Absent, Field::Absent) => true,
            _ => false,
        }
    }

    fn list(&mut self, pattern: &[SyntaxNode], target: &'t [SyntaxNode]) -> bool {
        pattern.len() == target.len()
            && pattern
                .iter()
                .zip(target)
                .all(|(x, y)| self.node(x, y))
    }

    /// A body whose first statement is a bare variable binds the entire target block
    fn block(&mut self, pattern: &[SyntaxNode], target: &'t [SyntaxNode]) -> bool {
        let captured = pattern
            .first()
            .filter(|first| first.kind() == NodeKind::Expr)
            .and_then(|first| first.node("value"))
            .filter(|value| value.kind() == NodeKind::Name);

        match captured {
            Some(variable) if !target.is_empty() => self.unify(variable, Binding::List(target)),
            _ => self.list(pattern, target),
        }
    }

    /// Prefix and suffix match positionally, the wildcard takes the middle
    fn splat(&mut self, pattern: &[SyntaxNode], target: &'t [SyntaxNode]) -> bool {
        let Some(index) = pattern.iter().position(|node| wildcard_name(node).is_some()) else {
            return self.list(pattern, target);
        };
        let fixed = pattern.len() - 1;
        if fixed > target.len() {
            return false;
        }
        let width = target.len() - fixed;
        let variable = match wildcard_name(&pattern[index]) {
            Some(variable) => variable,
            None => return false,
        };

        self.list(&pattern[..index], &target[..index])
            && self.unify(variable, Binding::List(&target[index..index + width]))
            && self.list(&pattern[index + 1..], &target[index + width..])
    }

    fn unify(&mut self, name: &SyntaxNode, value: Binding<'t>) -> bool {
        let Some(id) = name.name_id() else {
            return false;
        };
        if self.globals.contains(id) {
            return binding_eq(Binding::Node(name), value);
        }
        match self.bindings.get(id) {
            Some(prior) => binding_eq(*prior, value),
            None => {
                self.bindings.insert(id.to_string(), value);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_module;

    fn expression(source: &str) -> SyntaxNode {
        let module = parse_module(source).unwrap();
        module.list("body")[0].node("value").unwrap().clone()
    }

    fn globals(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_variable_binds_subtree() {
        let pattern = expression("x / 2");
        let target = expression("(2 + 4) / 2");
        let bindings = match_pattern(&pattern, &target, &BTreeSet::new()).unwrap();
        assert_eq!(bindings["x"].as_node().unwrap().kind(), NodeKind::BinOp);
    }

    #[test]
    fn test_globals_match_literally() {
        let pattern = expression("len(a)");
        let with_len = globals(&["len"]);
        assert!(match_pattern(&pattern, &expression("len([1, 2, 3])"), &with_len).is_some());
        assert!(match_pattern(&pattern, &expression("size(x)"), &with_len).is_none());
        assert!(match_pattern(&pattern, &expression("size(x)"), &BTreeSet::new()).is_some());
    }

    #[test]
    fn test_chained_comparison_length_must_agree() {
        let pattern = expression("i < j");
        assert!(match_pattern(&pattern, &expression("1 < 2 < 3"), &BTreeSet::new()).is_none());
    }

    #[test]
    fn test_repeated_variable_unifies() {
        let pattern = expression("a == a == a");
        let none = BTreeSet::new();
        assert!(match_pattern(&pattern, &expression("a == a == a"), &none).is_some());
        assert!(match_pattern(&pattern, &expression("f(x) == f(x) == f(x)"), &none).is_some());
        assert!(match_pattern(&pattern, &expression("a == b == a"), &none).is_none());
    }

    #[test]
    fn test_node_eq_folds_constants() {
        assert!(node_eq(&expression("i + 1"), &expression("i + 1")));
        assert!(node_eq(&expression("1"), &expression("1.0")));
        assert!(!node_eq(&expression("i + 1"), &expression("i + 2")));
    }

    #[test]
    fn test_splat_binds_middle() {
        let none = BTreeSet::new();
        let target = expression("[1, 2]");

        let bindings = match_pattern(&expression("[x, *c, y]"), &target, &none).unwrap();
        assert_eq!(bindings["c"].as_list().unwrap().len(), 0);

        assert!(match_pattern(&expression("[x, y, *c, z]"), &target, &none).is_none());
    }

    #[test]
    fn test_block_capture_needs_a_bare_variable() {
        let none = BTreeSet::new();
        let module = parse_module("while c: b\nwhile c: b + 1\n").unwrap();
        let target = parse_module("while n:\n    n = n - 1\n    m = m + 1\n").unwrap();
        let target = &target.list("body")[0];

        let captured = &module.list("body")[0];
        let bindings = match_pattern(captured, target, &none).unwrap();
        assert_eq!(bindings["b"].as_list().unwrap().len(), 2);

        let not_captured = &module.list("body")[1];
        assert!(match_pattern(not_captured, target, &none).is_none());
    }
}

//! Node kinds
//!
//! The kind set mirrors the statement and expression forms the parser understands. Field names
//! follow the reference language's own AST so that rule authors can reason about patterns in
//! familiar terms:
//!
//! | kind           | fields                                        |
//! |----------------|-----------------------------------------------|
//! | `Module`       | `body`                                        |
//! | `FunctionDef`  | `name`, `args`, `body`, `decorators`, `returns` |
//! | `ClassDef`     | `name`, `bases`, `body`                       |
//! | `Return`       | `value`                                       |
//! | `Assign`       | `targets`, `value`                            |
//! | `AugAssign`    | `target`, `op`, `value`                       |
//! | `If`/`While`   | `test`, `body`, `orelse`                      |
//! | `For`          | `target`, `iter`, `body`, `orelse`            |
//! | `Try`          | `body`, `handlers`, `orelse`, `finalbody`     |
//! | `ExceptHandler`| `type`, `name`, `body`                        |
//! | `With`         | `items`, `body`                               |
//! | `WithItem`     | `context_expr`, `optional_vars`               |
//! | `Expr`         | `value`                                       |
//! | `Assert`       | `test`, `msg`                                 |
//! | `Compare`      | `left`, `ops`, `comparators`                  |
//! | `Call`         | `func`, `args`, `keywords`                    |
//! | `Subscript`    | `value`, `slice`                              |
//! | `Attribute`    | `value`, `attr`                               |

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum NodeKind {
    // Statements
    Module,
    FunctionDef,
    ClassDef,
    Return,
    Assign,
    AugAssign,
    If,
    While,
    For,
    Expr,
    Assert,
    Pass,
    Break,
    Continue,
    Delete,
    Global,
    Nonlocal,
    Import,
    ImportFrom,
    Raise,
    Try,
    With,

    // Expressions
    Name,
    Constant,
    Call,
    Keyword,
    BinOp,
    UnaryOp,
    BoolOp,
    Compare,
    Subscript,
    Slice,
    List,
    Tuple,
    Set,
    Dict,
    Attribute,
    Starred,
    Lambda,
    IfExp,
    ListComp,
    SetComp,
    DictComp,
    GeneratorExp,
    Yield,
    YieldFrom,

    // Auxiliary
    Comprehension,
    Arg,
    Alias,
    ExceptHandler,
    WithItem,
}

impl NodeKind {
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Module => "Module",
            NodeKind::FunctionDef => "FunctionDef",
            NodeKind::ClassDef => "ClassDef",
            NodeKind::Return => "Return",
            NodeKind::Assign => "Assign",
            NodeKind::AugAssign => "AugAssign",
            NodeKind::If => "If",
            NodeKind::While => "While",
            NodeKind::For => "For",
            NodeKind::Expr => "Expr",
            NodeKind::Assert => "Assert",
            NodeKind::Pass => "Pass",
            NodeKind::Break => "Break",
            NodeKind::Continue => "Continue",
            NodeKind::Delete => "Delete",
            NodeKind::Global => "Global",
            NodeKind::Nonlocal => "Nonlocal",
            NodeKind::Import => "Import",
            NodeKind::ImportFrom => "ImportFrom",
            NodeKind::Raise => "Raise",
            NodeKind::Try => "Try",
            NodeKind::With => "With",
            NodeKind::Name => "Name",
            NodeKind::Constant => "Constant",
            NodeKind::Call => "Call",
            NodeKind::Keyword => "Keyword",
            NodeKind::BinOp => "BinOp",
            NodeKind::UnaryOp => "UnaryOp",
            NodeKind::BoolOp => "BoolOp",
            NodeKind::Compare => "Compare",
            NodeKind::Subscript => "Subscript",
            NodeKind::Slice => "Slice",
            NodeKind::List => "List",
            NodeKind::Tuple => "Tuple",
            NodeKind::Set => "Set",
            NodeKind::Dict => "Dict",
            NodeKind::Attribute => "Attribute",
            NodeKind::Starred => "Starred",
            NodeKind::Lambda => "Lambda",
            NodeKind::IfExp => "IfExp",
            NodeKind::ListComp => "ListComp",
            NodeKind::SetComp => "SetComp",
            NodeKind::DictComp => "DictComp",
            NodeKind::GeneratorExp => "GeneratorExp",
            NodeKind::Yield => "Yield",
            NodeKind::YieldFrom => "YieldFrom",
            NodeKind::Comprehension => "Comprehension",
            NodeKind::Arg => "Arg",
            NodeKind::Alias => "Alias",
            NodeKind::ExceptHandler => "ExceptHandler",
            NodeKind::WithItem => "WithItem",
        }
    }

    /// Whether nodes of this kind appear in statement position
    pub fn is_statement(self) -> bool {
        matches!(
            self,
            NodeKind::Module
                | NodeKind::FunctionDef
                | NodeKind::ClassDef
                | NodeKind::Return
                | NodeKind::Assign
                | NodeKind::AugAssign
                | NodeKind::If
                | NodeKind::While
                | NodeKind::For
                | NodeKind::Expr
                | NodeKind::Assert
                | NodeKind::Pass
                | NodeKind::Break
                | NodeKind::Continue
                | NodeKind::Delete
                | NodeKind::Global
                | NodeKind::Nonlocal
                | NodeKind::Import
                | NodeKind::ImportFrom
                | NodeKind::Raise
                | NodeKind::Try
                | NodeKind::With
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

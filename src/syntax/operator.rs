//! Operators
//!
//! Operators are carried in the tree as scalars rather than as nodes, so two operator fields
//! match exactly when they are the same variant.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Operator {
    // Binary arithmetic
    Add,
    Sub,
    Mult,
    MatMult,
    Div,
    FloorDiv,
    Mod,
    Pow,
    LShift,
    RShift,
    BitOr,
    BitXor,
    BitAnd,

    // Unary
    UAdd,
    USub,
    Not,
    Invert,

    // Boolean
    And,
    Or,

    // Comparison
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
    IsNot,
    In,
    NotIn,
}

impl Operator {
    /// The operator as written in source code
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Add | Operator::UAdd => "+",
            Operator::Sub | Operator::USub => "-",
            Operator::Mult => "*",
            Operator::MatMult => "@",
            Operator::Div => "/",
            Operator::FloorDiv => "//",
            Operator::Mod => "%",
            Operator::Pow => "**",
            Operator::LShift => "<<",
            Operator::RShift => ">>",
            Operator::BitOr => "|",
            Operator::BitXor => "^",
            Operator::BitAnd => "&",
            Operator::Not => "not",
            Operator::Invert => "~",
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Eq => "==",
            Operator::NotEq => "!=",
            Operator::Lt => "<",
            Operator::LtE => "<=",
            Operator::Gt => ">",
            Operator::GtE => ">=",
            Operator::Is => "is",
            Operator::IsNot => "is not",
            Operator::In => "in",
            Operator::NotIn => "not in",
        }
    }

    /// Map an augmented assignment token (`+=`, `//=`, ...) to its binary operator
    pub fn from_augmented(symbol: &str) -> Option<Operator> {
        let op = match symbol.strip_suffix('=')? {
            "+" => Operator::Add,
            "-" => Operator::Sub,
            "*" => Operator::Mult,
            "@" => Operator::MatMult,
            "/" => Operator::Div,
            "//" => Operator::FloorDiv,
            "%" => Operator::Mod,
            "**" => Operator::Pow,
            "<<" => Operator::LShift,
            ">>" => Operator::RShift,
            "|" => Operator::BitOr,
            "^" => Operator::BitXor,
            "&" => Operator::BitAnd,
            _ => return None,
        };
        Some(op)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

//! Operator glyphs

use crate::error::RenderError;
use crate::syntax::Operator;

/// The math-mode rendering of `op`
///
/// Operators with no agreed pseudocode notation (`**`, bit shifts, identity tests, ...) are
/// refused rather than guessed at.
pub fn tex_operator(op: Operator) -> Result<&'static str, RenderError> {
    let glyph = match op {
        Operator::Mult => "*",
        Operator::Add => "+",
        Operator::UAdd => "{+}",
        Operator::Sub => "-",
        Operator::Div => "/",
        Operator::FloorDiv => "//",
        Operator::Mod => r"\bmod",
        Operator::USub => "{-}",
        Operator::NotEq => r"\ne",
        Operator::Eq => r"\eq",
        Operator::Lt => "<",
        Operator::Gt => ">",
        Operator::LtE => r"\leq",
        Operator::GtE => r"\geq",
        Operator::And => r"\land",
        Operator::Or => r"\lor",
        Operator::Not => r"\text{not }",
        Operator::In => r"\in",
        Operator::NotIn => r"\not\in",
        Operator::BitOr => r"\cup",
        Operator::MatMult
        | Operator::Pow
        | Operator::LShift
        | Operator::RShift
        | Operator::BitXor
        | Operator::BitAnd
        | Operator::Invert
        | Operator::Is
        | Operator::IsNot => return Err(RenderError::OperatorNotSupported(op)),
    };
    Ok(glyph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_operators() {
        assert_eq!(tex_operator(Operator::Mod), Ok(r"\bmod"));
        assert_eq!(tex_operator(Operator::BitOr), Ok(r"\cup"));
        assert_eq!(tex_operator(Operator::USub), Ok("{-}"));
    }

    #[test]
    fn test_unsupported_operator() {
        assert_eq!(
            tex_operator(Operator::Pow),
            Err(RenderError::OperatorNotSupported(Operator::Pow))
        );
    }
}

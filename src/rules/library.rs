//! Built-in rule library

use super::RuleSet;
use crate::error::{Diagnostic, RenderError, RuleError};
use crate::pattern::{Binding, Bindings, Outcome, Template};
use crate::syntax::{fold, NodeKind, Operator, SyntaxNode};
use std::sync::Arc;

/// Names that built-in patterns match literally
pub const DEFAULT_GLOBALS: &str = "len min max float print set range";

/// Text rules, highest priority first
pub const DEFAULT_PATTERNS: &[(&str, &str)] = &[
    ("float('inf')", r"\infty"),
    ("None", r"\textsc{nil}"),
    ("a // b", r"\lfloor #a / #b \rfloor "),
    ("len(a)", r"|#a|"),
    ("min(a, b)", r"\min\{#a, #b\}"),
    ("max(a, b)", r"\max\{#a, #b\}"),
    ("a.append(b)", r"\text{insert $#b$ at the end of $#a$}"),
    ("print(v)", r"\text{output $#v$}"),
    ("{}", r"\text{empty dictionary}"),
    ("assert v", r"\STATE $\{#v\}$"),
    ("return v", r"\RETURN $#v$"),
    ("continue", r"\STATE \textbf{continue}"),
    ("break", r"\STATE \textbf{break}"),
    ("for x in range(n + 1): b", "\\FOR{$#x = 0$ \\TO $#n$}\n#b\\ENDFOR"),
    ("for x in range(n): b", "\\FOR{$#x = 0$ \\TO $#n - 1$}\n#b\\ENDFOR"),
    ("for x in range(m, n + 1): b", "\\FOR{$#x = #m$ \\TO $#n$}\n#b\\ENDFOR"),
    ("for x in range(m, n): b", "\\FOR{$#x = #m$ \\TO $#n - 1$}\n#b\\ENDFOR"),
    ("for x in range(m, n - 1, -1): b", "\\FOR{$#x = #m$ \\DOWNTO $#n$}\n#b\\ENDFOR"),
    ("for x in range(m, n, -1): b", "\\FOR{$#x = #m$ \\DOWNTO $#n + 1$}\n#b\\ENDFOR"),
    (
        "for x in range(m, n + 1, s): b",
        "\\FOR{$#x = #m$ \\TO $#n$ skipping $#s$}\n#b\\ENDFOR",
    ),
    (
        "for x in range(m, n, s): b",
        "\\FOR{$#x = #m$ \\TO $#n - 1$ skipping $#s$}\n#b\\ENDFOR",
    ),
    ("for x in y: b", "\\FOR{$#x \\in #y$}\n#b\\ENDFOR"),
    ("while True: body", "\\LOOP\n#body\\ENDLOOP"),
    ("while cond: body", "\\WHILE{$#cond$}\n#body\\ENDWHILE"),
];

/// The last `-1` step rule; the descending-step rules slot in right after it
const LAST_UNIT_STEP: &str = "for x in range(m, n, -1): b";

const DESCENDING_INCLUSIVE: &str = "for x in range(m, n - 1, s): b";
const DESCENDING_EXCLUSIVE: &str = "for x in range(m, n, s): b";

pub(super) fn build() -> Result<Arc<RuleSet>, RuleError> {
    let mut table: Vec<(&str, Template)> = DEFAULT_PATTERNS
        .iter()
        .map(|(pattern, template)| (*pattern, Template::text(template)))
        .collect();
    let descending_at = table
        .iter()
        .position(|(pattern, _)| *pattern == LAST_UNIT_STEP)
        .map_or(table.len(), |index| index + 1);
    table.splice(
        descending_at..descending_at,
        [
            (DESCENDING_INCLUSIVE, descending(DESCENDING_INCLUSIVE, "")),
            (DESCENDING_EXCLUSIVE, descending(DESCENDING_EXCLUSIVE, " + 1")),
        ],
    );

    let mut rules = RuleSet::empty();
    rules.extend_globals(DEFAULT_GLOBALS.split_whitespace());
    rules.extend(table)?;
    Ok(Arc::new(rules))
}

/// `for` over a range with a negative literal step other than `-1`
///
/// Declines unless the step is a negated number, so positive steps reach the "skipping"
/// rules below it.
fn descending(rule: &'static str, last_offset: &'static str) -> Template {
    Template::callback(move |bindings, out| {
        let step = bound(rule, bindings, "s")?;
        let Some(magnitude) = step.as_node().and_then(negated_number) else {
            return Ok(Outcome::Declined);
        };

        out.emit(r"\FOR{$");
        out.render_binding(bound(rule, bindings, "x")?)?;
        out.emit(" = ");
        out.render_binding(bound(rule, bindings, "m")?)?;
        out.emit(r"$ \DOWNTO $");
        out.render_binding(bound(rule, bindings, "n")?)?;
        out.emit(last_offset);
        out.emit("$ skipping $");
        out.render(magnitude)?;
        out.emit("$}\n");
        out.render_binding(bound(rule, bindings, "b")?)?;
        out.emit("\\ENDFOR\n");
        Ok(Outcome::Handled)
    })
}

/// The operand of `-k` when `-k` folds to a negative number
fn negated_number(node: &SyntaxNode) -> Option<&SyntaxNode> {
    if node.kind() != NodeKind::UnaryOp || node.op("op") != Some(Operator::USub) {
        return None;
    }
    if !fold(node)?.is_negative() {
        return None;
    }
    node.node("operand")
}

fn bound<'t>(rule: &str, bindings: &Bindings<'t>, name: &str) -> Result<Binding<'t>, Diagnostic> {
    bindings.get(name).copied().ok_or_else(|| {
        RenderError::UnboundPlaceholder {
            rule: rule.to_string(),
            template: "<callback>".to_string(),
            name: name.to_string(),
        }
        .into()
    })
}

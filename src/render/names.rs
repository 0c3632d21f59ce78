//! Identifier beautification
//!
//! - `x` stays `x`
//! - a trailing digit run or a `_c` suffix becomes a subscript: `x1` → `x_{1}`, `x_i` → `x_i`
//! - a `_prime` suffix becomes a prime mark
//! - Greek letter names become their glyph
//! - other names with underscores become small-caps function names
//! - anything else is set in italics

use once_cell::sync::Lazy;
use regex::Regex;

static SUBSCRIPT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.*?)(?:_(.)|(\d+))$").unwrap());

const GREEK: &[(&str, &str)] = &[
    ("alpha", r"\alpha "),
    ("beta", r"\beta "),
    ("gamma", r"\gamma "),
    ("Gamma", r"\Gamma "),
    ("delta", r"\delta "),
    ("Delta", r"\Delta "),
    ("epsilon", r"\epsilon "),
    ("zeta", r"\zeta "),
    ("eta", r"\eta "),
    ("theta", r"\theta "),
    ("Theta", r"\Theta "),
    ("iota", r"\iota "),
    ("kappa", r"\kappa "),
    ("Lambda", r"\Lambda "),
    ("mu", r"\mu "),
    ("nu", r"\nu "),
    ("xi", r"\xi "),
    ("Xi", r"\Xi "),
    ("pi", r"\pi "),
    ("Pi", r"\Pi "),
    ("rho", r"\rho "),
    ("sigma", r"\sigma "),
    ("Sigma", r"\Sigma "),
    ("tau", r"\tau "),
    ("upsilon", r"\upsilon "),
    ("Upsilon", r"\Upsilon "),
    ("phi", r"\phi "),
    ("Phi", r"\Phi "),
    ("chi", r"\chi "),
    ("psi", r"\psi "),
    ("Psi", r"\Psi "),
    ("omega", r"\omega "),
    ("Omega", r"\Omega "),
];

/// Render an identifier as a math-mode variable
pub fn tex_variable(name: &str) -> String {
    if let Some(captures) = SUBSCRIPT.captures(name) {
        let stem = tex_variable(captures.get(1).map_or("", |m| m.as_str()));
        return match (captures.get(2), captures.get(3)) {
            (Some(letter), _) => format!("{}_{}", stem, letter.as_str()),
            (None, Some(digits)) => format!("{}_{{{}}}", stem, digits.as_str()),
            (None, None) => stem,
        };
    }
    if let Some(stem) = name.strip_suffix("_prime") {
        return format!("{}'", tex_variable(stem));
    }
    if name.chars().count() == 1 {
        return name.to_string();
    }
    if name.contains('_') {
        return tex_function_name(name);
    }
    match GREEK.iter().find(|(greek, _)| *greek == name) {
        Some((_, glyph)) => glyph.to_string(),
        None => format!(r"\textit{{{}}}", name),
    }
}

/// Render an identifier as a small-caps procedure name: `find_max` → `\textsc{Find-Max}`
pub fn tex_function_name(name: &str) -> String {
    let words = title_case(&name.replace('_', " ")).replace(' ', "-");
    format!(r"\textsc{{{}}}", words)
}

/// Upper-case every letter that follows a non-letter, lower-case the rest
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_cased = false;
    for ch in text.chars() {
        if previous_cased {
            out.extend(ch.to_lowercase());
        } else {
            out.extend(ch.to_uppercase());
        }
        previous_cased = ch.is_alphabetic();
    }
    out
}

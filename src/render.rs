//! Pseudocode rendering
//!
//! Turns a syntax tree into LaTeX `algorithmic` markup. The [`Renderer`] consults the
//! [`RuleSet`](crate::rules::RuleSet) for every node before falling back to its own per-kind
//! rendering.
//!
//! ## Modules
//!
//! - `renderer` - The recursive-descent [`Renderer`]
//! - `names` - Identifier beautification (subscripts, primes, Greek letters, small caps)
//! - `operators` - The operator glyph table

pub mod names;
pub mod operators;
pub mod renderer;

pub use names::{tex_function_name, tex_variable};
pub use operators::tex_operator;
pub use renderer::Renderer;

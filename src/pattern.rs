//! Pattern engine
//!
//! Rules recognize syntactic shapes with patterns written in the input language itself. A
//! pattern such as `len(a)` is parsed into a tree; every name in it that is not a declared
//! global is a variable that binds to whatever sub-tree sits at the same position in the
//! target. The bound sub-trees are then substituted into a template.
//!
//! ## Modules
//!
//! - `matcher` - Structural matching with unification, splat and block capture
//! - `compiler` - Compiling snippets into [`Pattern`]s
//! - `template` - Text and callback templates, and the [`Emit`] hooks they write through
//!
//! ## Matching rules in brief
//!
//! - A variable binds on first sight; later occurrences must be structurally equal to it
//! - Sub-trees that both fold to constants compare by value (`42` matches `-(-42)`)
//! - `*rest` in a list display or call argument list absorbs the unmatched middle
//! - A loop or conditional body consisting of a bare variable binds the whole block
//!
//! A failed match is `None`, never an error.

pub mod compiler;
pub mod matcher;
pub mod template;

pub use compiler::{Mode, Pattern};
pub use matcher::{match_pattern, node_eq, Binding, Bindings};
pub use template::{Callback, Emit, Mark, Outcome, Template};

//! Syntax tree model for the reference language
//!
//! Every construct of the input is a [`SyntaxNode`]: a kind tag plus an ordered list of named
//! fields. A field holds a scalar, a single sub-node, an ordered list of sub-nodes, or nothing.
//! Trees are built once by the parser and never mutated afterwards; the matcher and the renderer
//! only borrow them.
//!
//! ## Modules
//!
//! - `kind` - The closed set of node kinds
//! - `node` - [`SyntaxNode`], [`Field`] and [`Scalar`]
//! - `operator` - Operator tokens carried as scalars
//! - `literal` - Constant folding of literal sub-trees
//! - `position` - Byte offset to line/column conversion for diagnostics

pub mod kind;
pub mod literal;
pub mod node;
pub mod operator;
pub mod position;

pub use kind::NodeKind;
pub use literal::{fold, Literal};
pub use node::{Field, Scalar, SyntaxNode};
pub use operator::Operator;
pub use position::{Position, SourceLocation};

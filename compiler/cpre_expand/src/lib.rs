//! Macro expansion, directive execution, and conditional compilation.
//!
//! [`Preprocessor`] is the crate's entry point: it layers the directive
//! and expansion machinery over a [`BufferStack`] of lexed inputs and
//! yields the fully preprocessed token stream. The supporting pieces
//! (macro table, conditional stack, `#if` expression evaluator) are
//! exported for tools that want to drive them directly.

mod buffer;
mod cond;
mod config;
mod driver;
mod expr;
mod macro_table;

pub use buffer::{BufferId, BufferStack};
pub use cpre_lexer::{format_token, format_token_verbose, PpToken};
pub use cond::{CondFrame, CondStack, FrameState};
pub use config::PpConfig;
pub use driver::Preprocessor;
pub use expr::{eval_controlling_expr, ExprError};
pub use macro_table::{MacroDef, MacroTable, VA_ARGS};

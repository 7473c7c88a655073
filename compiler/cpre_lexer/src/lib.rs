//! Raw preprocessing-token scanner.
//!
//! Turns one buffer's character stream into generic preprocessing tokens
//! (identifier / number / string / punctuator / other), tracking
//! whitespace and line-start flags. No macro semantics and no literal
//! typing happen here; numbers are captured greedily and validated later
//! by `cpre_lit`, and string/char literal bodies are decoded to code
//! points but not yet re-encoded to their element width.

mod cursor;
mod fmt;
mod scanner;
mod token;

pub use cursor::Cursor;
pub use fmt::{format_token, format_token_verbose};
pub use scanner::{ScanIssue, ScanIssueKind, Scanner};
pub use token::{PpToken, PpTokenKind, Punct, StrKind, TokenFlags, KEYWORDS, MULTI_PUNCTS};

//! The buffer stack: the ordered set of active scan sources.
//!
//! Each entry is either a file buffer (an owned scanner over the
//! file's canonicalized text) or a token buffer (a macro replacement
//! list or other pre-built token sequence). Peeking walks the stack
//! top-down and transparently falls through to the buffer beneath when
//! the top is exhausted, so nested `#include` and macro rescanning need
//! no separate return bookkeeping: once a pushed buffer runs out,
//! scanning resumes exactly where it left off below.
//!
//! Buffers live in an index-addressed pool with a free-list, so slot
//! lifetime is explicit across push/pop and ids never dangle.

use std::collections::VecDeque;
use std::rc::Rc;

use cpre_lexer::{PpToken, ScanIssue, Scanner};
use cpre_source::{FileId, LocId, LocTable};

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct BufferId(u32);

#[derive(Debug)]
enum BufferKind {
    File {
        file: FileId,
        /// `#include` site, threaded into every token's location chain.
        include_site: Option<LocId>,
    },
    /// A macro replacement list; the name is reported back when the
    /// buffer finishes so the driver can clear the expansion paint.
    Macro { name: String },
    /// Pre-built tokens with no completion bookkeeping.
    Tokens,
}

struct Buffer {
    kind: BufferKind,
    scanner: Option<Scanner>,
    /// Tokens scanned or inserted but not yet consumed, front first.
    pending: VecDeque<PpToken>,
    /// File buffers only: the scanner has produced its end-of-input.
    exhausted: bool,
}

/// Pool-backed stack of scan buffers.
pub struct BufferStack {
    slots: Vec<Option<Buffer>>,
    free: Vec<u32>,
    /// Bottom-to-top order; the top is the last element.
    stack: Vec<BufferId>,
    /// Macro buffers popped since the last drain.
    finished_macros: Vec<String>,
    /// Lexical problems encountered while scanning file buffers.
    issues: Vec<(FileId, ScanIssue)>,
    eof: PpToken,
}

impl Default for BufferStack {
    fn default() -> Self {
        BufferStack {
            slots: Vec::new(),
            free: Vec::new(),
            stack: Vec::new(),
            finished_macros: Vec::new(),
            issues: Vec::new(),
            eof: PpToken::eof(),
        }
    }
}

impl BufferStack {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, buffer: Buffer) -> BufferId {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot as usize] = Some(buffer);
                BufferId(slot)
            }
            None => {
                let slot = self.slots.len() as u32;
                self.slots.push(Some(buffer));
                BufferId(slot)
            }
        }
    }

    fn release(&mut self, id: BufferId) {
        if let Some(buffer) = self.slots[id.0 as usize].take() {
            if let BufferKind::Macro { name } = buffer.kind {
                self.finished_macros.push(name);
            }
            self.free.push(id.0);
        }
    }

    fn buffer(&self, id: BufferId) -> &Buffer {
        match &self.slots[id.0 as usize] {
            Some(buffer) => buffer,
            None => unreachable!("stale buffer id"),
        }
    }

    fn buffer_mut(&mut self, id: BufferId) -> &mut Buffer {
        match &mut self.slots[id.0 as usize] {
            Some(buffer) => buffer,
            None => unreachable!("stale buffer id"),
        }
    }

    /// Push a file buffer scanning `text`.
    pub fn push_file(
        &mut self,
        file: FileId,
        text: Rc<str>,
        include_site: Option<LocId>,
    ) -> BufferId {
        let id = self.alloc(Buffer {
            kind: BufferKind::File { file, include_site },
            scanner: Some(Scanner::new(text)),
            pending: VecDeque::new(),
            exhausted: false,
        });
        self.stack.push(id);
        id
    }

    /// Push a macro replacement buffer. `name` comes back out of
    /// [`BufferStack::take_finished_macros`] once the buffer empties.
    pub fn push_macro(&mut self, name: String, tokens: Vec<PpToken>) -> BufferId {
        let id = self.alloc(Buffer {
            kind: BufferKind::Macro { name },
            scanner: None,
            pending: tokens.into(),
            exhausted: true,
        });
        self.stack.push(id);
        id
    }

    /// Push plain pre-built tokens (no completion bookkeeping).
    pub fn push_tokens(&mut self, tokens: Vec<PpToken>) -> BufferId {
        let id = self.alloc(Buffer {
            kind: BufferKind::Tokens,
            scanner: None,
            pending: tokens.into(),
            exhausted: true,
        });
        self.stack.push(id);
        id
    }

    /// The file the top-most file buffer is scanning; includes resolve
    /// relative to this file even when macro buffers sit above it.
    pub fn current_file(&self) -> Option<FileId> {
        self.stack.iter().rev().find_map(|&id| match self.buffer(id).kind {
            BufferKind::File { file, .. } => Some(file),
            _ => None,
        })
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Scan one more token out of a file buffer into its pending queue.
    /// Returns false when the scanner is at end of input.
    fn scan_one(&mut self, id: BufferId, locs: &mut LocTable) -> bool {
        let (file, include_site) = match self.buffer(id).kind {
            BufferKind::File { file, include_site } => (file, include_site),
            _ => return false,
        };
        let buffer = match &mut self.slots[id.0 as usize] {
            Some(buffer) => buffer,
            None => return false,
        };
        let Some(scanner) = buffer.scanner.as_mut() else {
            return false;
        };
        let mut tok = scanner.next_token();
        let issues = scanner.take_issues();
        self.issues.extend(issues.into_iter().map(|issue| (file, issue)));
        let buffer = match &mut self.slots[id.0 as usize] {
            Some(buffer) => buffer,
            None => return false,
        };
        if tok.is_eof() {
            buffer.exhausted = true;
            return false;
        }
        tok.loc = Some(locs.file_loc(file, tok.line, tok.col, include_site));
        buffer.pending.push_back(tok);
        true
    }

    /// Materialize tokens until `n + 1` are pending across the stack or
    /// true end of input is reached.
    fn fill(&mut self, n: usize, locs: &mut LocTable) {
        // A finished top buffer is released here, not only in eat, so
        // completion bookkeeping (the macro expansion paint) is current
        // by the time the caller acts on the peeked token.
        while let Some(&top) = self.stack.last() {
            let buffer = self.buffer(top);
            if !(buffer.exhausted && buffer.pending.is_empty()) {
                break;
            }
            self.stack.pop();
            self.release(top);
        }
        let mut needed = n + 1;
        let mut level = self.stack.len();
        while level > 0 && needed > 0 {
            level -= 1;
            let id = self.stack[level];
            loop {
                let buffer = self.buffer(id);
                if buffer.pending.len() >= needed {
                    return;
                }
                if buffer.exhausted || buffer.scanner.is_none() {
                    needed -= buffer.pending.len();
                    break;
                }
                if !self.scan_one(id, locs) {
                    // Hit end of this file; fall through to the buffer
                    // beneath on the next outer iteration.
                    continue;
                }
            }
        }
    }

    /// The `n`-th not-yet-consumed token. `peek_forward(0)` is the next
    /// token; repeated calls without an intervening eat are idempotent.
    /// Returns the end-of-input token when the stack runs out.
    pub fn peek_forward(&mut self, n: usize, locs: &mut LocTable) -> &PpToken {
        self.fill(n, locs);
        let mut skip = n;
        for &id in self.stack.iter().rev() {
            let buffer = self.buffer(id);
            if skip < buffer.pending.len() {
                return &self.buffer(id).pending[skip];
            }
            skip -= buffer.pending.len();
        }
        &self.eof
    }

    pub fn peek(&mut self, locs: &mut LocTable) -> &PpToken {
        self.peek_forward(0, locs)
    }

    /// Consume and return the next token, releasing any buffers that
    /// finished in the process. Returns the end-of-input token when the
    /// stack is empty.
    pub fn eat(&mut self, locs: &mut LocTable) -> PpToken {
        self.fill(0, locs);
        while let Some(&top) = self.stack.last() {
            // fill() materialized the front token into the top-most
            // buffer that can still produce one, so an empty top here
            // is finished and can be released.
            let buffer = self.buffer_mut(top);
            if let Some(tok) = buffer.pending.pop_front() {
                return tok;
            }
            self.stack.pop();
            self.release(top);
        }
        self.eof.clone()
    }

    pub fn eat_multiple(&mut self, n: usize, locs: &mut LocTable) {
        for _ in 0..n {
            self.eat(locs);
        }
    }

    /// Names of macro buffers fully consumed since the last call.
    pub fn take_finished_macros(&mut self) -> Vec<String> {
        std::mem::take(&mut self.finished_macros)
    }

    /// Lexical issues recorded by file-buffer scanners since the last
    /// call, paired with the file they occurred in.
    pub fn take_issues(&mut self) -> Vec<(FileId, ScanIssue)> {
        std::mem::take(&mut self.issues)
    }
}

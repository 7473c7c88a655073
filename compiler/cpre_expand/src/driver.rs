//! The preprocessor driver: pulls raw tokens out of the buffer stack,
//! executes directives, expands macros, and hands fully preprocessed
//! tokens to the caller.
//!
//! The driver owns every piece of shared state (file registry, location
//! table, diagnostics, macro table, conditional stack, buffer stack) and
//! threads them through free helper functions so that expansion can run
//! both over the main stack and over a scratch stack for `#if` lines.

use std::collections::VecDeque;

use cpre_diagnostic::Diagnostics;
use cpre_lexer::{format_token, PpToken, PpTokenKind, Punct, StrKind, TokenFlags};
use cpre_source::{FileRegistry, LocId, LocTable, SourceLoc};
use smallvec::SmallVec;

use crate::buffer::BufferStack;
use crate::cond::{CondStack, FrameState};
use crate::config::PpConfig;
use crate::expr::eval_controlling_expr;
use crate::macro_table::{MacroDef, MacroTable, VA_ARGS};

/// Token-stream front end over a set of source files. Construct one,
/// push a main file, then drive it with [`peek`](Self::peek) and
/// [`eat`](Self::eat) until end of input.
pub struct Preprocessor {
    registry: FileRegistry,
    locs: LocTable,
    diags: Diagnostics,
    macros: MacroTable,
    conds: CondStack,
    buffers: BufferStack,
    /// Fully preprocessed tokens not yet consumed; filled on demand so
    /// that `peek_forward` can look past directives and expansions.
    ready: VecDeque<PpToken>,
    eof: PpToken,
    reported_unbalanced: bool,
}

impl Preprocessor {
    pub fn new(config: PpConfig) -> Self {
        Preprocessor {
            registry: FileRegistry::new(config.include_paths),
            locs: LocTable::new(),
            diags: Diagnostics::new(),
            macros: MacroTable::with_capacity(config.macro_capacity),
            conds: CondStack::default(),
            buffers: BufferStack::new(),
            ready: VecDeque::new(),
            eof: PpToken::eof(),
            reported_unbalanced: false,
        }
    }

    /// Loads `path` from disk and makes it the initial input.
    pub fn push_main_file(&mut self, path: &str) -> Result<(), cpre_source::SourceError> {
        let id = self.registry.resolve_and_load(path, None)?;
        let text = self.registry.file(id).contents();
        self.buffers.push_file(id, text, None);
        Ok(())
    }

    /// Registers `text` under `name` without touching the filesystem and
    /// makes it the initial input.
    pub fn push_main_text(&mut self, name: &str, text: &str) {
        let id = self.registry.load_virtual(name, text);
        let contents = self.registry.file(id).contents();
        self.buffers.push_file(id, contents, None);
    }

    pub fn registry(&self) -> &FileRegistry {
        &self.registry
    }

    pub fn locs(&self) -> &LocTable {
        &self.locs
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diags
    }

    pub fn macros(&self) -> &MacroTable {
        &self.macros
    }

    /// Defines an object-like macro from the command line or the host,
    /// as if by `#define name body`.
    pub fn define_text(&mut self, name: &str, body: &str) {
        let mut scanner = cpre_lexer::Scanner::new(std::rc::Rc::from(body));
        let mut tokens = Vec::new();
        loop {
            let mut tok = scanner.next_token();
            if tok.is_eof() {
                break;
            }
            tok.flags.remove(TokenFlags::LINE_START);
            tokens.push(tok);
        }
        self.macros.define(MacroDef {
            name: name.to_owned(),
            function_like: false,
            variadic: false,
            params: SmallVec::new(),
            body: tokens,
            loc: None,
            expanding: false,
        });
    }

    pub fn undef(&mut self, name: &str) -> bool {
        self.macros.undef(name)
    }

    pub fn get(&self, name: &str) -> Option<&MacroDef> {
        self.macros.get(name)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.macros.is_defined(name)
    }

    /// Next preprocessed token without consuming it.
    pub fn peek(&mut self) -> &PpToken {
        self.peek_forward(0)
    }

    /// The `n`th upcoming preprocessed token (`0` is the next one).
    pub fn peek_forward(&mut self, n: usize) -> &PpToken {
        while self.ready.len() <= n {
            let tok = self.pull();
            let done = tok.is_eof();
            self.ready.push_back(tok);
            if done {
                break;
            }
        }
        self.ready.get(n).unwrap_or(&self.eof)
    }

    /// Consumes and returns the next preprocessed token.
    pub fn eat(&mut self) -> PpToken {
        self.peek_forward(0);
        match self.ready.pop_front() {
            Some(tok) if !tok.is_eof() => tok,
            Some(tok) => {
                // Keep the stream sticky at end of input.
                self.ready.push_front(tok.clone());
                tok
            }
            None => PpToken::eof(),
        }
    }

    pub fn eat_multiple(&mut self, n: usize) {
        for _ in 0..n {
            self.eat();
        }
    }

    /// Produces the next preprocessed token: executes any directives and
    /// macro expansions standing between the raw stream and it.
    fn pull(&mut self) -> PpToken {
        loop {
            // Peek first: it releases any drained macro buffer, and the
            // paint must come off before the expansion decision below.
            let tok = self.buffers.peek(&mut self.locs).clone();
            unpaint(&mut self.buffers, &mut self.macros);
            drain_issues(&mut self.buffers, &mut self.locs, &mut self.diags);
            if tok.is_eof() {
                if !self.conds.is_empty() && !self.reported_unbalanced {
                    self.reported_unbalanced = true;
                    self.diags
                        .error(None, "unterminated conditional directive at end of input");
                }
                return PpToken::eof();
            }
            if tok.is_punct_byte(b'#') && tok.at_line_start() {
                self.buffers.eat(&mut self.locs);
                self.process_directive();
                continue;
            }
            if try_expand(
                &mut self.buffers,
                &mut self.macros,
                &mut self.locs,
                &mut self.diags,
                &tok,
            ) {
                continue;
            }
            return self.buffers.eat(&mut self.locs);
        }
    }

    /// Handles one directive, the `#` already consumed. Loops because
    /// `skip_group` stops on the `#` of a same-depth `#elif`/`#else`/
    /// `#endif` and leaves its name pending for re-dispatch here.
    fn process_directive(&mut self) {
        loop {
            let tok = self.buffers.peek(&mut self.locs).clone();
            if tok.is_eof() || tok.at_line_start() {
                // Null directive: a lone `#`.
                return;
            }
            let Some(name) = tok.ident().map(str::to_owned) else {
                self.diags.error(tok.loc, "expected a directive name after '#'");
                self.discard_line();
                return;
            };
            self.buffers.eat(&mut self.locs);
            match name.as_str() {
                "define" => {
                    self.directive_define();
                    return;
                }
                "undef" => {
                    self.directive_undef();
                    return;
                }
                "include" => {
                    self.directive_include(tok.loc);
                    return;
                }
                "if" => {
                    let taken = self.directive_expr_value() != 0;
                    self.conds.push(taken);
                    if taken {
                        return;
                    }
                    if !self.skip_group() {
                        return;
                    }
                }
                "ifdef" | "ifndef" => {
                    let defined = self.directive_defined_operand(&name, tok.loc);
                    let taken = if name == "ifdef" { defined } else { !defined };
                    self.conds.push(taken);
                    if taken {
                        return;
                    }
                    if !self.skip_group() {
                        return;
                    }
                }
                "elif" => {
                    let Some(frame) = self.conds.top().copied() else {
                        self.diags.error(tok.loc, "#elif without matching #if");
                        self.discard_line();
                        return;
                    };
                    if frame.seen_else {
                        self.diags.error(tok.loc, "#elif after #else");
                    }
                    match frame.state {
                        FrameState::Seeking => {
                            let taken = self.directive_expr_value() != 0;
                            if taken {
                                if let Some(f) = self.conds.top_mut() {
                                    f.state = FrameState::Active;
                                }
                                return;
                            }
                        }
                        FrameState::Active | FrameState::Handled => {
                            if let Some(f) = self.conds.top_mut() {
                                f.state = FrameState::Handled;
                            }
                            // The expression is never evaluated in a
                            // group that cannot be taken.
                            self.discard_line();
                        }
                    }
                    if !self.skip_group() {
                        return;
                    }
                }
                "else" => {
                    let Some(frame) = self.conds.top_mut() else {
                        self.diags.error(tok.loc, "#else without matching #if");
                        self.discard_line();
                        return;
                    };
                    if frame.seen_else {
                        self.diags.error(tok.loc, "#else after #else");
                    }
                    frame.seen_else = true;
                    let take = frame.state == FrameState::Seeking;
                    frame.state = if take {
                        FrameState::Active
                    } else {
                        FrameState::Handled
                    };
                    self.discard_line();
                    if take {
                        return;
                    }
                    if !self.skip_group() {
                        return;
                    }
                }
                "endif" => {
                    if self.conds.pop().is_none() {
                        self.diags.error(tok.loc, "#endif without matching #if");
                    }
                    self.discard_line();
                    return;
                }
                // `#line` is accepted and ignored: reported locations
                // always reflect physical positions.
                "line" => {
                    self.discard_line();
                    return;
                }
                "pragma" => {
                    self.discard_line();
                    return;
                }
                "error" => {
                    let line = self.collect_line();
                    let mut message = String::from("#error");
                    for t in &line {
                        message.push(' ');
                        message.push_str(&format_token(t));
                    }
                    self.diags.error(tok.loc, message);
                    return;
                }
                other => {
                    self.diags
                        .error(tok.loc, format!("unknown preprocessing directive '#{other}'"));
                    self.discard_line();
                    return;
                }
            }
        }
    }

    fn directive_define(&mut self) {
        let name_tok = self.buffers.peek(&mut self.locs).clone();
        if name_tok.is_eof() || name_tok.at_line_start() {
            self.diags.error(None, "expected a macro name after #define");
            return;
        }
        let Some(name) = name_tok.ident().map(str::to_owned) else {
            self.diags
                .error(name_tok.loc, "expected a macro name after #define");
            self.discard_line();
            return;
        };
        self.buffers.eat(&mut self.locs);
        let mut def = MacroDef {
            name,
            function_like: false,
            variadic: false,
            params: SmallVec::new(),
            body: Vec::new(),
            loc: name_tok.loc,
            expanding: false,
        };
        let next = self.buffers.peek(&mut self.locs).clone();
        // A '(' immediately after the name (no whitespace) opens a
        // parameter list; with whitespace it is part of the body.
        if next.is_punct_byte(b'(') && !next.has_ws_before() && !next.at_line_start() {
            self.buffers.eat(&mut self.locs);
            def.function_like = true;
            self.parse_macro_params(&mut def);
        }
        let mut body = self.collect_line();
        for t in &mut body {
            t.flags.remove(TokenFlags::LINE_START);
        }
        def.body = body;
        // Redefinition silently replaces the previous definition.
        self.macros.define(def);
    }

    fn parse_macro_params(&mut self, def: &mut MacroDef) {
        loop {
            let tok = self.buffers.peek(&mut self.locs).clone();
            if tok.is_eof() || tok.at_line_start() {
                self.diags
                    .error(def.loc, "unterminated macro parameter list");
                return;
            }
            if tok.is_punct_byte(b')') {
                self.buffers.eat(&mut self.locs);
                return;
            }
            if tok.is_punct(Punct::Ellipsis) {
                self.buffers.eat(&mut self.locs);
                def.variadic = true;
                def.params.push(VA_ARGS.to_owned());
                let close = self.buffers.peek(&mut self.locs).clone();
                if close.is_punct_byte(b')') {
                    self.buffers.eat(&mut self.locs);
                } else {
                    self.diags.error(close.loc, "expected ')' after '...'");
                    self.discard_line();
                }
                return;
            }
            if let Some(param) = tok.ident() {
                def.params.push(param.to_owned());
                self.buffers.eat(&mut self.locs);
                let sep = self.buffers.peek(&mut self.locs).clone();
                if sep.is_punct_byte(b',') {
                    self.buffers.eat(&mut self.locs);
                    continue;
                }
                if sep.is_punct_byte(b')') {
                    self.buffers.eat(&mut self.locs);
                    return;
                }
                self.diags
                    .error(sep.loc, "expected ',' or ')' in macro parameter list");
                self.discard_line();
                return;
            }
            self.diags
                .error(tok.loc, "expected a parameter name in macro parameter list");
            self.buffers.eat(&mut self.locs);
        }
    }

    fn directive_undef(&mut self) {
        let tok = self.buffers.peek(&mut self.locs).clone();
        let name = match tok.ident() {
            Some(name) if !tok.at_line_start() => name.to_owned(),
            _ => {
                self.diags
                    .error(tok.loc, "expected a macro name after #undef");
                self.discard_line();
                return;
            }
        };
        self.buffers.eat(&mut self.locs);
        // Undefining an unknown name is legal and does nothing.
        self.macros.undef(&name);
        self.discard_line();
    }

    fn directive_include(&mut self, directive_loc: Option<LocId>) {
        let tok = self.buffers.peek(&mut self.locs).clone();
        if tok.is_eof() || tok.at_line_start() {
            self.diags
                .error(directive_loc, "expected a file name after #include");
            return;
        }
        let include_site = tok.loc.or(directive_loc);
        let name = if let PpTokenKind::Str { kind: StrKind::Str, body } = &tok.kind {
            self.buffers.eat(&mut self.locs);
            body.iter().filter_map(|&cp| char::from_u32(cp)).collect()
        } else if tok.is_punct_byte(b'<') {
            self.buffers.eat(&mut self.locs);
            let mut name = String::new();
            loop {
                let part = self.buffers.peek(&mut self.locs).clone();
                if part.is_eof() || part.at_line_start() {
                    self.diags
                        .error(include_site, "unterminated include file name");
                    return;
                }
                self.buffers.eat(&mut self.locs);
                if part.is_punct_byte(b'>') {
                    break;
                }
                name.push_str(&format_token(&part));
            }
            name
        } else {
            self.diags.error(
                include_site,
                "expected \"file\" or <file> after #include",
            );
            self.discard_line();
            return;
        };
        self.discard_line();
        let requesting = self.buffers.current_file();
        match self.registry.resolve_and_load(&name, requesting) {
            Ok(id) => {
                let text = self.registry.file(id).contents();
                self.buffers.push_file(id, text, include_site);
            }
            Err(err) => self.diags.error(include_site, err.to_string()),
        }
    }

    /// `#ifdef`/`#ifndef` operand: the macro name on the rest of the line.
    fn directive_defined_operand(&mut self, directive: &str, loc: Option<LocId>) -> bool {
        let line = self.collect_line();
        let Some(name) = line.first().and_then(|t| t.ident()) else {
            self.diags
                .error(loc, format!("expected a macro name after #{directive}"));
            return false;
        };
        if line.len() > 1 {
            self.diags.warning(
                line[1].loc,
                format!("extra tokens after #{directive} operand"),
            );
        }
        self.macros.is_defined(name)
    }

    /// `#if`/`#elif` controlling expression: rewrite `defined`, macro
    /// expand, evaluate. Errors are reported and yield zero so the group
    /// is simply not taken.
    fn directive_expr_value(&mut self) -> i64 {
        let line = self.collect_line();
        let line_loc = line.first().and_then(|t| t.loc);
        let line = self.rewrite_defined(line);
        let line = self.expand_token_list(line);
        match eval_controlling_expr(&line) {
            Ok(value) => value,
            Err(err) => {
                self.diags.error(err.loc.or(line_loc), err.message);
                0
            }
        }
    }

    /// Replaces `defined NAME` and `defined(NAME)` with `1`/`0` before
    /// any macro expansion, so that the operand name is never expanded.
    fn rewrite_defined(&mut self, toks: Vec<PpToken>) -> Vec<PpToken> {
        let mut out = Vec::with_capacity(toks.len());
        let mut i = 0;
        while i < toks.len() {
            let tok = &toks[i];
            if tok.is_ident("defined") {
                if let Some(name) = toks.get(i + 1).and_then(|t| t.ident()) {
                    out.push(defined_token(self.macros.is_defined(name), tok));
                    i += 2;
                    continue;
                }
                let paren = toks.get(i + 1).is_some_and(|t| t.is_punct_byte(b'('));
                let name = toks.get(i + 2).and_then(|t| t.ident());
                let closed = toks.get(i + 3).is_some_and(|t| t.is_punct_byte(b')'));
                if let (true, Some(name), true) = (paren, name, closed) {
                    out.push(defined_token(self.macros.is_defined(name), tok));
                    i += 4;
                    continue;
                }
                self.diags
                    .error(tok.loc, "expected a macro name after 'defined'");
                out.push(defined_token(false, tok));
                i += 1;
                continue;
            }
            out.push(toks[i].clone());
            i += 1;
        }
        out
    }

    /// Macro-expands a detached token list by running it through a
    /// scratch buffer stack with the driver's macro table.
    fn expand_token_list(&mut self, toks: Vec<PpToken>) -> Vec<PpToken> {
        let mut scratch = BufferStack::new();
        scratch.push_tokens(toks);
        let mut out = Vec::new();
        loop {
            // Same ordering as pull: the peek releases drained macro
            // buffers, then the paint comes off.
            let tok = scratch.peek(&mut self.locs).clone();
            unpaint(&mut scratch, &mut self.macros);
            if tok.is_eof() {
                break;
            }
            if try_expand(
                &mut scratch,
                &mut self.macros,
                &mut self.locs,
                &mut self.diags,
                &tok,
            ) {
                continue;
            }
            out.push(scratch.eat(&mut self.locs));
        }
        out
    }

    /// Skips tokens inside an untaken conditional group until the `#` of
    /// the next same-depth `#elif`/`#else`/`#endif`, leaving that
    /// directive's name pending. Nested conditionals are passed over
    /// whole. Returns false when end of input is hit first.
    fn skip_group(&mut self) -> bool {
        let mut depth = 0u32;
        loop {
            let tok = self.buffers.eat(&mut self.locs);
            if tok.is_eof() {
                if !self.reported_unbalanced {
                    self.reported_unbalanced = true;
                    self.diags
                        .error(None, "unterminated conditional directive at end of input");
                }
                return false;
            }
            if !(tok.is_punct_byte(b'#') && tok.at_line_start()) {
                continue;
            }
            let next = self.buffers.peek(&mut self.locs).clone();
            if next.at_line_start() || next.is_eof() {
                continue;
            }
            let Some(name) = next.ident() else {
                continue;
            };
            match name {
                "if" | "ifdef" | "ifndef" => {
                    depth += 1;
                    self.buffers.eat(&mut self.locs);
                }
                "elif" | "else" if depth == 0 => return true,
                "endif" => {
                    if depth == 0 {
                        return true;
                    }
                    depth -= 1;
                    self.buffers.eat(&mut self.locs);
                }
                _ => {}
            }
        }
    }

    /// Remaining tokens of the current directive line.
    fn collect_line(&mut self) -> Vec<PpToken> {
        let mut out = Vec::new();
        loop {
            let stop = {
                let tok = self.buffers.peek(&mut self.locs);
                tok.is_eof() || tok.at_line_start()
            };
            if stop {
                break;
            }
            out.push(self.buffers.eat(&mut self.locs));
        }
        out
    }

    fn discard_line(&mut self) {
        let _ = self.collect_line();
    }
}

/// Clears the expansion mark of every macro whose replacement buffer has
/// been fully consumed.
fn unpaint(buffers: &mut BufferStack, macros: &mut MacroTable) {
    for name in buffers.take_finished_macros() {
        macros.set_expanding(&name, false);
    }
}

/// Forwards lexical problems accumulated by the buffer stack's scanners
/// into the diagnostics sink.
fn drain_issues(buffers: &mut BufferStack, locs: &mut LocTable, diags: &mut Diagnostics) {
    for (file, issue) in buffers.take_issues() {
        let loc = locs.file_loc(file, issue.line, issue.col, None);
        diags.error(Some(loc), issue.kind.message());
    }
}

/// A synthesized `1`/`0` replacing a `defined` operator use.
fn defined_token(defined: bool, template: &PpToken) -> PpToken {
    PpToken {
        kind: PpTokenKind::Number(if defined { "1" } else { "0" }.to_owned()),
        flags: template.flags,
        line: template.line,
        col: template.col,
        loc: template.loc,
    }
}

/// Expands `tok` (the current head of `buffers`) if it names an
/// expandable macro; returns whether an expansion buffer was pushed.
/// A macro already being expanded is left alone, which is what
/// terminates mutual and self recursion: its name token survives as a
/// plain identifier.
fn try_expand(
    buffers: &mut BufferStack,
    macros: &mut MacroTable,
    locs: &mut LocTable,
    diags: &mut Diagnostics,
    tok: &PpToken,
) -> bool {
    let Some(name) = tok.ident() else {
        return false;
    };
    let Some(def) = macros.get(name) else {
        return false;
    };
    if def.expanding {
        return false;
    }
    if def.function_like && !buffers.peek_forward(1, locs).is_punct_byte(b'(') {
        return false;
    }
    let def = def.clone();
    let name_tok = buffers.eat(locs);
    let body = if def.function_like {
        buffers.eat(locs); // the '('
        let args = collect_args(buffers, locs, diags, &def, name_tok.loc);
        substituted_body(locs, &def, &args, &name_tok)
    } else {
        expansion_body(locs, &def, &name_tok)
    };
    macros.set_expanding(&def.name, true);
    buffers.push_macro(def.name.clone(), body);
    true
}

/// Collects the comma-separated argument lists of a function-like macro
/// invocation, the name and opening parenthesis already consumed. Only
/// commas at parenthesis depth one separate arguments; once a variadic
/// macro's fixed parameters are filled, commas join the trailing
/// `__VA_ARGS__` argument instead.
fn collect_args(
    buffers: &mut BufferStack,
    locs: &mut LocTable,
    diags: &mut Diagnostics,
    def: &MacroDef,
    invocation: Option<LocId>,
) -> Vec<Vec<PpToken>> {
    let mut args: Vec<Vec<PpToken>> = Vec::new();
    let mut current: Vec<PpToken> = Vec::new();
    let mut depth = 1u32;
    loop {
        let tok = buffers.eat(locs);
        if tok.is_eof() {
            diags.error(
                invocation,
                format!("unterminated invocation of macro '{}'", def.name),
            );
            break;
        }
        if tok.is_punct_byte(b'(') {
            depth += 1;
        } else if tok.is_punct_byte(b')') {
            depth -= 1;
            if depth == 0 {
                break;
            }
        } else if tok.is_punct_byte(b',') && depth == 1 {
            let absorbing = def.variadic && args.len() + 1 >= def.params.len();
            if !absorbing {
                args.push(std::mem::take(&mut current));
                continue;
            }
        }
        current.push(tok);
    }
    // `F()` passes zero arguments to a zero-parameter macro, but one
    // empty argument to a one-parameter macro.
    if !(current.is_empty() && args.is_empty() && def.params.is_empty()) {
        args.push(current);
    }
    if args.len() > def.params.len() {
        diags.error(
            invocation,
            format!("too many arguments for macro '{}'", def.name),
        );
        args.truncate(def.params.len());
    }
    if args.len() < def.params.len() {
        let missing_only_va_args = def.variadic && args.len() + 1 == def.params.len();
        if !missing_only_va_args {
            diags.error(
                invocation,
                format!("too few arguments for macro '{}'", def.name),
            );
        }
        args.resize(def.params.len(), Vec::new());
    }
    args
}

/// The replacement list of an object-like macro, relocated to the
/// invocation site.
fn expansion_body(locs: &mut LocTable, def: &MacroDef, name_tok: &PpToken) -> Vec<PpToken> {
    let mut body = def.body.clone();
    for tok in &mut body {
        relocate(locs, tok, def.loc, name_tok.loc);
    }
    carry_leading_ws(&mut body, name_tok);
    body
}

/// The replacement list of a function-like macro with each parameter
/// replaced by its collected argument tokens.
fn substituted_body(
    locs: &mut LocTable,
    def: &MacroDef,
    args: &[Vec<PpToken>],
    name_tok: &PpToken,
) -> Vec<PpToken> {
    let mut out = Vec::with_capacity(def.body.len());
    for body_tok in &def.body {
        let param = body_tok
            .ident()
            .and_then(|name| def.params.iter().position(|p| p == name));
        let Some(index) = param else {
            let mut tok = body_tok.clone();
            relocate(locs, &mut tok, def.loc, name_tok.loc);
            out.push(tok);
            continue;
        };
        let mut first = true;
        for arg_tok in &args[index] {
            let mut tok = arg_tok.clone();
            tok.flags.remove(TokenFlags::LINE_START);
            if first {
                // The spliced tokens take the parameter's spacing.
                tok.flags.set(TokenFlags::WS_BEFORE, body_tok.has_ws_before());
                first = false;
            }
            tok.loc = match tok.loc {
                Some(arg_loc) => Some(locs.intern(SourceLoc::MacroArg {
                    arg_loc,
                    col: tok.col,
                    parent: name_tok.loc,
                })),
                None => name_tok.loc,
            };
            out.push(tok);
        }
    }
    carry_leading_ws(&mut out, name_tok);
    out
}

fn relocate(locs: &mut LocTable, tok: &mut PpToken, macro_loc: Option<LocId>, parent: Option<LocId>) {
    tok.flags.remove(TokenFlags::LINE_START);
    tok.loc = match macro_loc {
        Some(macro_loc) => Some(locs.intern(SourceLoc::Expansion {
            macro_loc,
            col: tok.col,
            parent,
        })),
        None => parent,
    };
}

/// Whatever spacing preceded the macro name precedes its expansion.
fn carry_leading_ws(body: &mut [PpToken], name_tok: &PpToken) {
    if let Some(first) = body.first_mut() {
        first
            .flags
            .set(TokenFlags::WS_BEFORE, name_tok.has_ws_before());
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn pp(text: &str) -> Preprocessor {
        let mut pp = Preprocessor::new(PpConfig::default());
        pp.push_main_text("<test>", text);
        pp
    }

    /// All preprocessed token spellings, space separated.
    fn render(text: &str) -> String {
        let mut pp = pp(text);
        let mut parts = Vec::new();
        loop {
            let tok = pp.eat();
            if tok.is_eof() {
                break;
            }
            parts.push(format_token(&tok));
        }
        parts.join(" ")
    }

    #[test]
    fn object_macro_expands() {
        assert_eq!(render("#define N 42\nint x = N;"), "int x = 42 ;");
    }

    #[test]
    fn function_macro_expands_with_arguments() {
        assert_eq!(
            render("#define ADD(a, b) ((a) + (b))\nx = ADD(1, 2);"),
            "x = ( ( 1 ) + ( 2 ) ) ;"
        );
    }

    #[test]
    fn arguments_split_only_at_depth_one() {
        assert_eq!(
            render("#define FIRST(a, b) a\ny = FIRST(f(1, 2), 3);"),
            "y = f ( 1 , 2 ) ;"
        );
    }

    #[test]
    fn function_macro_without_parens_is_plain() {
        assert_eq!(render("#define F(x) x\nint F = 1;"), "int F = 1 ;");
    }

    #[test]
    fn nested_expansion() {
        assert_eq!(
            render("#define A B\n#define B 7\nA"),
            "7"
        );
    }

    #[test]
    fn self_reference_terminates() {
        assert_eq!(render("#define X X + 1\nX"), "X + 1");
    }

    #[test]
    fn mutual_recursion_terminates() {
        assert_eq!(render("#define A B\n#define B A\nA"), "A");
    }

    #[test]
    fn painted_name_can_expand_again_later() {
        assert_eq!(render("#define X X\nX X"), "X X");
    }

    #[test]
    fn consecutive_uses_each_expand() {
        assert_eq!(render("#define N 1\nN N"), "1 1");
    }

    #[test]
    fn use_after_nested_expansion_expands() {
        assert_eq!(render("#define A B\n#define B y\nA B"), "y y");
    }

    #[test]
    fn macro_expands_after_controlling_expression_uses_it() {
        assert_eq!(
            render("#define FLAG 1\n#if FLAG\nok\n#endif\nFLAG"),
            "ok 1"
        );
    }

    #[test]
    fn variadic_macro_absorbs_trailing_commas() {
        assert_eq!(
            render("#define V(head, ...) head [__VA_ARGS__]\nV(1, 2, 3)"),
            "1 [ 2 , 3 ]"
        );
    }

    #[test]
    fn variadic_macro_with_empty_tail() {
        let mut p = pp("#define V(head, ...) head __VA_ARGS__\nV(1)");
        let mut parts = Vec::new();
        loop {
            let tok = p.eat();
            if tok.is_eof() {
                break;
            }
            parts.push(format_token(&tok));
        }
        assert_eq!(parts.join(" "), "1");
        assert!(!p.diagnostics().has_errors());
    }

    #[test]
    fn empty_argument_is_accepted() {
        assert_eq!(render("#define WRAP(x) <x>\nWRAP()"), "< >");
    }

    #[test]
    fn arity_mismatch_reports_error() {
        let mut p = pp("#define PAIR(a, b) a b\nPAIR(1)");
        while !p.eat().is_eof() {}
        assert!(p.diagnostics().has_errors());
        assert!(p
            .diagnostics()
            .last_message()
            .is_some_and(|m| m.contains("too few arguments")));
    }

    #[test]
    fn undef_removes_definition() {
        assert_eq!(render("#define N 1\n#undef N\nN"), "N");
    }

    #[test]
    fn redefinition_replaces() {
        assert_eq!(render("#define N 1\n#define N 2\nN"), "2");
    }

    #[test]
    fn ifdef_and_ifndef() {
        assert_eq!(
            render("#define YES 1\n#ifdef YES\na\n#endif\n#ifndef YES\nb\n#endif"),
            "a"
        );
    }

    #[test]
    fn if_elif_else_chain_picks_first_true() {
        let src = "#if 0\na\n#elif 1\nb\n#elif 1\nc\n#else\nd\n#endif";
        assert_eq!(render(src), "b");
    }

    #[test]
    fn else_taken_when_all_fail() {
        assert_eq!(render("#if 0\na\n#elif 0\nb\n#else\nc\n#endif"), "c");
    }

    #[test]
    fn nested_conditionals_skip_whole() {
        let src = "#if 0\n#if 1\nhidden\n#endif\nstill hidden\n#else\nseen\n#endif";
        assert_eq!(render(src), "seen");
    }

    #[test]
    fn defined_operator_both_forms() {
        let src = "#define M 1\n#if defined M && defined(M)\nyes\n#endif";
        assert_eq!(render(src), "yes");
    }

    #[test]
    fn defined_survives_macro_named_defined_operand() {
        // The operand of `defined` is not macro expanded.
        let src = "#define M OTHER\n#if defined(M)\nyes\n#endif";
        assert_eq!(render(src), "yes");
    }

    #[test]
    fn if_expression_is_macro_expanded() {
        let src = "#define LIMIT 10\n#if LIMIT > 5\nbig\n#endif";
        assert_eq!(render(src), "big");
    }

    #[test]
    fn unknown_identifier_in_if_is_zero() {
        assert_eq!(render("#if MYSTERY\na\n#else\nb\n#endif"), "b");
    }

    #[test]
    fn skipped_elif_expression_is_not_evaluated() {
        // 1/0 in the untaken branch must not produce a diagnostic.
        let mut p = pp("#if 1\na\n#elif 1/0\nb\n#endif");
        while !p.eat().is_eof() {}
        assert!(!p.diagnostics().has_errors());
    }

    #[test]
    fn unterminated_conditional_reported_once() {
        let mut p = pp("#if 1\na");
        while !p.eat().is_eof() {}
        p.eat();
        assert_eq!(p.diagnostics().error_count(), 1);
    }

    #[test]
    fn stray_endif_reported() {
        let mut p = pp("#endif\na");
        while !p.eat().is_eof() {}
        assert!(p.diagnostics().has_errors());
    }

    #[test]
    fn error_directive_reports_its_line() {
        let mut p = pp("#error bad config\nafter");
        let first = p.eat();
        assert_eq!(first.ident(), Some("after"));
        assert!(p
            .diagnostics()
            .last_message()
            .is_some_and(|m| m.contains("bad config")));
    }

    #[test]
    fn line_and_pragma_are_ignored() {
        assert_eq!(render("#line 100 \"other\"\n#pragma once\nx"), "x");
    }

    #[test]
    fn null_directive_is_ignored() {
        assert_eq!(render("#\nx"), "x");
    }

    #[test]
    fn unknown_directive_reported_and_skipped() {
        let mut p = pp("#frobnicate 1 2\nx");
        let tok = p.eat();
        assert_eq!(tok.ident(), Some("x"));
        assert!(p
            .diagnostics()
            .last_message()
            .is_some_and(|m| m.contains("frobnicate")));
    }

    #[test]
    fn hash_not_at_line_start_is_a_token() {
        assert_eq!(render("a # define b"), "a # define b");
    }

    #[test]
    fn expanded_hash_does_not_open_a_directive() {
        assert_eq!(render("#define H #\nH define N 1"), "# define N 1");
    }

    #[test]
    fn peek_forward_is_stable() {
        let mut p = pp("#define N 3\na N b");
        let second = p.peek_forward(1).clone();
        assert_eq!(format_token(&second), "3");
        assert_eq!(format_token(p.peek()), "a");
        assert_eq!(format_token(&p.eat()), "a");
        assert_eq!(p.eat(), second);
    }

    #[test]
    fn eat_is_sticky_at_eof() {
        let mut p = pp("x");
        p.eat();
        assert!(p.eat().is_eof());
        assert!(p.eat().is_eof());
    }

    #[test]
    fn host_defined_macro() {
        let mut p = Preprocessor::new(PpConfig::default());
        p.define_text("VERSION", "3");
        p.push_main_text("<test>", "#if VERSION == 3\nok\n#endif");
        assert_eq!(p.eat().ident(), Some("ok"));
    }

    #[test]
    fn expansion_tokens_carry_locations() {
        let mut p = pp("#define N 5\nN");
        let tok = p.eat();
        let loc = tok.loc.map(|id| p.locs().get(id));
        assert!(matches!(loc, Some(SourceLoc::Expansion { .. })));
    }

    proptest::proptest! {
        /// An `#if`/`#elif`/`#else` chain takes exactly the first true
        /// branch regardless of length, nesting depth, or which
        /// branches are true.
        #[test]
        fn chain_takes_first_true_branch(
            flags in proptest::collection::vec(proptest::bool::ANY, 1..6),
            depth in 0usize..3,
        ) {
            let mut src = String::new();
            for _ in 0..depth {
                src.push_str("#if 1\n");
            }
            for (i, &flag) in flags.iter().enumerate() {
                let kw = if i == 0 { "if" } else { "elif" };
                src.push_str(&format!("#{kw} {}\nv{i}\n", i32::from(flag)));
            }
            src.push_str("#else\nfallback\n#endif\n");
            for _ in 0..depth {
                src.push_str("#endif\n");
            }
            let expected = match flags.iter().position(|&f| f) {
                Some(i) => format!("v{i}"),
                None => "fallback".to_owned(),
            };
            proptest::prop_assert_eq!(render(&src), expected);
        }
    }

    #[test]
    fn argument_tokens_carry_argument_locations() {
        let mut p = pp("#define ID(x) x\nID(q)");
        let tok = p.eat();
        assert_eq!(tok.ident(), Some("q"));
        let loc = tok.loc.map(|id| p.locs().get(id));
        assert!(matches!(loc, Some(SourceLoc::MacroArg { .. })));
    }
}

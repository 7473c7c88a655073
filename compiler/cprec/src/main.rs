//! Standalone preprocessor CLI.
//!
//! Reads one source file, runs the full preprocessing pipeline, and
//! prints the resulting token stream to stdout. Diagnostics go to
//! stderr with source excerpts and carets.

use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;

use cpre_diagnostic::TerminalEmitter;
use cpre_expand::{PpConfig, Preprocessor};
use cpre_lexer::{format_token, format_token_verbose, PpToken};

struct Options {
    input: String,
    config: PpConfig,
    /// `-D NAME[=VALUE]` definitions in order.
    defines: Vec<(String, String)>,
    /// `-U NAME` removals, applied after the defines.
    undefs: Vec<String>,
    /// Dump one annotated token per line instead of reflowed output.
    verbose: bool,
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let options = match parse_args(&args) {
        Some(options) => options,
        None => {
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    let mut pp = Preprocessor::new(options.config);
    for (name, body) in &options.defines {
        pp.define_text(name, body);
    }
    for name in &options.undefs {
        pp.undef(name);
    }
    if let Err(err) = pp.push_main_file(&options.input) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }

    let mut tokens = Vec::new();
    loop {
        let tok = pp.eat();
        if tok.is_eof() {
            break;
        }
        tokens.push(tok);
    }

    let stdout = io::stdout();
    let result = if options.verbose {
        dump_tokens(stdout.lock(), &tokens)
    } else {
        reflow_tokens(stdout.lock(), &tokens)
    };
    if result.is_err() {
        // Broken pipe; nothing sensible left to do.
        return ExitCode::FAILURE;
    }

    let stderr = io::stderr();
    let colors = stderr.is_terminal();
    let mut emitter = TerminalEmitter::new(stderr.lock(), colors);
    if emitter
        .emit_all(pp.diagnostics(), pp.locs(), pp.registry())
        .is_err()
    {
        return ExitCode::FAILURE;
    }

    if pp.diagnostics().has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn parse_args(args: &[String]) -> Option<Options> {
    let mut config = PpConfig::default();
    let mut defines = Vec::new();
    let mut undefs = Vec::new();
    let mut verbose = false;
    let mut input = None;

    let mut i = 1;
    while i < args.len() {
        let arg = &args[i];
        if arg == "-I" && i + 1 < args.len() {
            config.include_paths.push(args[i + 1].as_str().into());
            i += 2;
        } else if let Some(dir) = arg.strip_prefix("-I") {
            config.include_paths.push(dir.into());
            i += 1;
        } else if arg == "-D" && i + 1 < args.len() {
            defines.push(split_define(&args[i + 1]));
            i += 2;
        } else if let Some(def) = arg.strip_prefix("-D") {
            defines.push(split_define(def));
            i += 1;
        } else if arg == "-U" && i + 1 < args.len() {
            undefs.push(args[i + 1].clone());
            i += 2;
        } else if let Some(name) = arg.strip_prefix("-U") {
            undefs.push(name.to_owned());
            i += 1;
        } else if arg == "--verbose" || arg == "-v" {
            verbose = true;
            i += 1;
        } else if !arg.starts_with('-') && input.is_none() {
            input = Some(arg.clone());
            i += 1;
        } else {
            eprintln!("error: unrecognized argument '{arg}'");
            return None;
        }
    }

    Some(Options {
        input: input?,
        config,
        defines,
        undefs,
        verbose,
    })
}

/// `NAME=VALUE` or bare `NAME` (which defines it as `1`, matching the
/// usual compiler-driver convention).
fn split_define(spec: &str) -> (String, String) {
    match spec.split_once('=') {
        Some((name, value)) => (name.to_owned(), value.to_owned()),
        None => (spec.to_owned(), "1".to_owned()),
    }
}

/// Prints the token stream as source text, separating lines on
/// line-start tokens and words on whitespace flags.
fn reflow_tokens(mut out: impl Write, tokens: &[PpToken]) -> io::Result<()> {
    let mut first = true;
    for tok in tokens {
        if tok.at_line_start() && !first {
            writeln!(out)?;
        } else if tok.has_ws_before() && !first {
            write!(out, " ")?;
        }
        write!(out, "{}", format_token(tok))?;
        first = false;
    }
    if !first {
        writeln!(out)?;
    }
    Ok(())
}

fn dump_tokens(mut out: impl Write, tokens: &[PpToken]) -> io::Result<()> {
    for tok in tokens {
        writeln!(out, "{}", format_token_verbose(tok))?;
    }
    Ok(())
}

fn print_usage() {
    eprintln!("Usage: cprec [options] <file>");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -I <dir>           Add an include search directory");
    eprintln!("  -D <name[=value]>  Predefine an object-like macro");
    eprintln!("  -U <name>          Undefine a predefined macro");
    eprintln!("  -v, --verbose      Dump one annotated token per line");
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn opts(args: &[&str]) -> Option<Options> {
        let mut full = vec!["cprec".to_owned()];
        full.extend(args.iter().map(|s| (*s).to_owned()));
        parse_args(&full)
    }

    #[test]
    fn parses_separated_and_joined_flags() {
        let options = opts(&["-I", "inc", "-Iother", "-DA=2", "-D", "B", "main.c"]).unwrap();
        assert_eq!(options.input, "main.c");
        assert_eq!(options.config.include_paths.len(), 2);
        assert_eq!(
            options.defines,
            vec![
                ("A".to_owned(), "2".to_owned()),
                ("B".to_owned(), "1".to_owned())
            ]
        );
    }

    #[test]
    fn missing_input_is_rejected() {
        assert!(opts(&["-I", "inc"]).is_none());
    }

    #[test]
    fn unknown_flag_is_rejected() {
        assert!(opts(&["--frob", "main.c"]).is_none());
    }

    #[test]
    fn reflow_separates_lines_and_words() {
        use cpre_lexer::{PpTokenKind, TokenFlags};
        let tok = |text: &str, flags: TokenFlags| PpToken {
            kind: PpTokenKind::Ident(text.to_owned()),
            flags,
            line: 1,
            col: 1,
            loc: None,
        };
        let tokens = vec![
            tok("a", TokenFlags::LINE_START),
            tok("b", TokenFlags::WS_BEFORE),
            tok("c", TokenFlags::LINE_START),
        ];
        let mut out = Vec::new();
        reflow_tokens(&mut out, &tokens).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a b\nc\n");
    }
}

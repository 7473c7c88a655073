#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test code — panics provide clear failure messages"
)]

//! End-to-end preprocessing tests over real files.
//!
//! The inline unit tests in `cpre_expand` work on virtual buffers; these
//! exercise the file-backed path: `#include` resolution order, nested
//! inclusion, and macro state flowing across file boundaries.

use std::fs;
use std::path::Path;

use cpre_expand::{PpConfig, Preprocessor};
use cpre_lexer::format_token;
use pretty_assertions::assert_eq;

fn write(dir: &Path, name: &str, text: &str) {
    fs::write(dir.join(name), text).unwrap();
}

fn render(pp: &mut Preprocessor) -> String {
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
fn include_relative_to_requesting_file() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "main.c", "#include \"def.h\"\nint x = N;\n");
    write(dir.path(), "def.h", "#define N 7\n");

    let mut pp = Preprocessor::new(PpConfig::default());
    pp.push_main_file(dir.path().join("main.c").to_str().unwrap())
        .unwrap();
    assert_eq!(render(&mut pp), "int x = 7 ;");
    assert!(!pp.diagnostics().has_errors());
}

#[test]
fn requesting_directory_wins_over_include_path() {
    let main_dir = tempfile::tempdir().unwrap();
    let other_dir = tempfile::tempdir().unwrap();
    write(main_dir.path(), "main.c", "#include \"which.h\"\nWHERE");
    write(main_dir.path(), "which.h", "#define WHERE local\n");
    write(other_dir.path(), "which.h", "#define WHERE searched\n");

    let mut pp = Preprocessor::new(PpConfig {
        include_paths: vec![other_dir.path().to_path_buf()],
        ..PpConfig::default()
    });
    pp.push_main_file(main_dir.path().join("main.c").to_str().unwrap())
        .unwrap();
    assert_eq!(render(&mut pp), "local");
}

#[test]
fn angled_include_searches_include_paths() {
    let main_dir = tempfile::tempdir().unwrap();
    let sys_dir = tempfile::tempdir().unwrap();
    write(main_dir.path(), "main.c", "#include <sys.h>\nTAG");
    write(sys_dir.path(), "sys.h", "#define TAG system\n");

    let mut pp = Preprocessor::new(PpConfig {
        include_paths: vec![sys_dir.path().to_path_buf()],
        ..PpConfig::default()
    });
    pp.push_main_file(main_dir.path().join("main.c").to_str().unwrap())
        .unwrap();
    assert_eq!(render(&mut pp), "system");
}

#[test]
fn nested_includes_resume_in_order() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "main.c", "start\n#include \"a.h\"\nend\n");
    write(dir.path(), "a.h", "a1\n#include \"b.h\"\na2\n");
    write(dir.path(), "b.h", "b\n");

    let mut pp = Preprocessor::new(PpConfig::default());
    pp.push_main_file(dir.path().join("main.c").to_str().unwrap())
        .unwrap();
    assert_eq!(render(&mut pp), "start a1 b a2 end");
}

#[test]
fn missing_include_is_reported_and_skipped() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "main.c", "#include \"no_such.h\"\nafter\n");

    let mut pp = Preprocessor::new(PpConfig::default());
    pp.push_main_file(dir.path().join("main.c").to_str().unwrap())
        .unwrap();
    assert_eq!(render(&mut pp), "after");
    assert!(pp.diagnostics().has_errors());
    assert!(pp
        .diagnostics()
        .last_message()
        .is_some_and(|m| m.contains("no_such.h")));
}

#[test]
fn include_guard_pattern() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "main.c",
        "#include \"guarded.h\"\n#include \"guarded.h\"\n",
    );
    write(
        dir.path(),
        "guarded.h",
        "#ifndef GUARD_H\n#define GUARD_H\nonce\n#endif\n",
    );

    let mut pp = Preprocessor::new(PpConfig::default());
    pp.push_main_file(dir.path().join("main.c").to_str().unwrap())
        .unwrap();
    assert_eq!(render(&mut pp), "once");
    assert!(!pp.diagnostics().has_errors());
}

#[test]
fn macros_defined_in_header_expand_in_main_file() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "main.c",
        "#include \"ops.h\"\nx = ADD(1, 2);\n",
    );
    write(dir.path(), "ops.h", "#define ADD(a, b) ((a) + (b))\n");

    let mut pp = Preprocessor::new(PpConfig::default());
    pp.push_main_file(dir.path().join("main.c").to_str().unwrap())
        .unwrap();
    assert_eq!(render(&mut pp), "x = ( ( 1 ) + ( 2 ) ) ;");
}

#[test]
fn conditional_selects_per_configuration() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "main.c",
        "#include \"cfg.h\"\n#if MODE == 2\ntwo\n#elif MODE == 1\none\n#else\nnone\n#endif\n",
    );
    write(dir.path(), "cfg.h", "#define MODE 1\n");

    let mut pp = Preprocessor::new(PpConfig::default());
    pp.push_main_file(dir.path().join("main.c").to_str().unwrap())
        .unwrap();
    assert_eq!(render(&mut pp), "one");
}

#[test]
fn missing_main_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut pp = Preprocessor::new(PpConfig::default());
    let err = pp
        .push_main_file(dir.path().join("absent.c").to_str().unwrap())
        .unwrap_err();
    assert!(err.to_string().contains("absent.c"));
}

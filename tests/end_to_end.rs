// End-to-end scenarios exercising the full lexer -> parser -> type checker ->
// codegen pipeline through `zscript_compiler::Compiler`, mirroring the
// concrete scenarios a reimplementation of this pipeline is expected to
// satisfy: identity-function lowering, array indexing, circular imports,
// lambda dispatch via a function table, and `await` lowering to a host call.

use std::fs;
use std::path::PathBuf;

use zscript_compiler::errors::CompileError;
use zscript_compiler::Compiler;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("zscript_e2e_{}", name));
    let _ = fs::create_dir_all(&dir);
    dir
}

#[test]
fn identity_function_lowers_to_add_and_export() {
    let dir = scratch_dir("identity");
    let path = dir.join("main.zs");
    fs::write(&path, "export fn add(a: i32, b: i32) -> i32 { return a + b; }").unwrap();

    let mut compiler = Compiler::new();
    let wat = compiler.compile_file(&path).unwrap();

    assert!(wat.starts_with("(module\n"));
    assert!(wat.contains("(func $add"));
    assert!(wat.contains("(param $a i32)"));
    assert!(wat.contains("(param $b i32)"));
    assert!(wat.contains("(result i32)"));
    assert!(wat.contains("local.get $a"));
    assert!(wat.contains("local.get $b"));
    assert!(wat.contains("i32.add"));
    assert!(wat.contains("(export \"add\" (func $add))"));
    assert_balanced_parens(&wat);
}

#[test]
fn array_literal_and_index_lower_to_heap_load() {
    let dir = scratch_dir("array_index");
    let path = dir.join("main.zs");
    fs::write(
        &path,
        "export fn first_of_three() -> i32 { let xs = [10, 20, 30]; return xs[1]; }",
    )
    .unwrap();

    let mut compiler = Compiler::new();
    let wat = compiler.compile_file(&path).unwrap();

    assert!(wat.contains("i32.const 10"));
    assert!(wat.contains("i32.const 20"));
    assert!(wat.contains("i32.const 30"));
    // header is [len, capacity] = [3, 6]; elements sit 8 bytes past the base.
    assert!(wat.contains("i32.const 3"));
    assert!(wat.contains("i32.const 6"));
    assert!(wat.contains("i32.const 8"));
    assert!(wat.contains("i32.store"));
    assert!(wat.contains("i32.mul"));
    assert!(wat.contains("i32.load"));
    assert_balanced_parens(&wat);
}

#[test]
fn circular_import_is_rejected_without_partial_cache_entries() {
    let dir = scratch_dir("cycle");
    let a = dir.join("a.zs");
    let b = dir.join("b.zs");
    fs::write(&a, "import { y } from \"b\";\nfn x() {}\n").unwrap();
    fs::write(&b, "import { x } from \"a\";\nfn y() {}\n").unwrap();

    let mut compiler = Compiler::new();
    let err = compiler.compile_file(&a).unwrap_err();
    assert!(matches!(err, CompileError::CircularDependency { .. }));
}

#[test]
fn lambda_is_lowered_to_table_entry_and_invoked_via_call_indirect() {
    let dir = scratch_dir("lambda");
    let path = dir.join("main.zs");
    fs::write(
        &path,
        "export fn run() -> i32 { let f = fn(x: i32) => x * 2; return f(21); }",
    )
    .unwrap();

    let mut compiler = Compiler::new();
    let wat = compiler.compile_file(&path).unwrap();

    assert!(wat.contains("(type $lambda_type_1 (func (param i32) (result i32)))"));
    assert!(wat.contains("(func $lambda_0"));
    assert!(wat.contains("i32.mul"));
    assert!(wat.contains("call_indirect (type $lambda_type_1)"));
    assert!(wat.contains("(table $lambda_table"));
    assert!(wat.contains("(elem (i32.const 0)"));
    assert_balanced_parens(&wat);
}

#[test]
fn await_lowers_to_promise_host_call() {
    let dir = scratch_dir("await");
    let path = dir.join("main.zs");
    fs::write(
        &path,
        "async fn fetch(u: string) -> string { return u; }\n\
         export fn run(u: string) -> string { let r = await fetch(u); return r; }",
    )
    .unwrap();

    let mut compiler = Compiler::new();
    let wat = compiler.compile_file(&path).unwrap();

    assert!(wat.contains("(import \"std\" \"promise_await\""));
    assert!(wat.contains("call $std_promise_await"));
    assert_balanced_parens(&wat);
}

#[test]
fn break_and_continue_target_their_own_loop_labels() {
    let dir = scratch_dir("break_continue");
    let path = dir.join("main.zs");
    fs::write(
        &path,
        "export fn run(n: i32) -> i32 {\n\
         \x20\x20let total = 0;\n\
         \x20\x20let i = 0;\n\
         \x20\x20while i < n {\n\
         \x20\x20\x20\x20i = i + 1;\n\
         \x20\x20\x20\x20if i == 2 { continue; }\n\
         \x20\x20\x20\x20if i == 5 { break; }\n\
         \x20\x20\x20\x20total = total + i;\n\
         \x20\x20}\n\
         \x20\x20return total;\n\
         }",
    )
    .unwrap();

    let mut compiler = Compiler::new();
    let wat = compiler.compile_file(&path).unwrap();

    // every `br` target must be a label this function actually declared
    // via `(block ...)`/`(loop ...)`, never a fixed `$while_block`/`$while_loop`.
    let declared: std::collections::HashSet<&str> = wat
        .lines()
        .filter_map(|l| {
            let l = l.trim_start();
            if let Some(rest) = l.strip_prefix("(block ") {
                Some(rest.trim_end_matches(['\n']))
            } else {
                l.strip_prefix("(loop ")
            }
        })
        .map(|s| s.split_whitespace().next().unwrap())
        .collect();
    for line in wat.lines() {
        let l = line.trim_start();
        if let Some(rest) = l.strip_prefix("br_if ").or_else(|| l.strip_prefix("br ")) {
            let label = rest.trim();
            assert!(
                declared.contains(label),
                "branch to undeclared label {label} in:\n{wat}"
            );
        }
    }
    assert_balanced_parens(&wat);
}

#[test]
fn missing_import_target_reports_module_not_found() {
    let dir = scratch_dir("missing_import");
    let path = dir.join("main.zs");
    fs::write(&path, "import { helper } from \"nowhere\";\n").unwrap();

    let mut compiler = Compiler::new();
    let err = compiler.compile_file(&path).unwrap_err();
    assert!(matches!(err, CompileError::ModuleNotFound { .. }));
}

fn assert_balanced_parens(wat: &str) {
    let mut depth = 0i32;
    for c in wat.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
        assert!(depth >= 0, "unbalanced parens: negative depth in {wat}");
    }
    assert_eq!(depth, 0, "unbalanced parens in generated WAT");
}

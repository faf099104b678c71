//! IR-shape checks for the ahead-of-time path: `--emit-llvm` must produce a
//! well-formed module with the expected declares, defines, and runtime calls.
//! Linking the result is the native toolchain's job and is not exercised
//! here.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

fn culebra() -> Command {
    Command::cargo_bin("culebra").expect("binary builds")
}

fn emit(path: &str) -> String {
    let output = culebra()
        .arg(path)
        .arg("--emit-llvm")
        .output()
        .expect("driver runs");

    assert!(
        output.status.success(),
        "emission failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("IR is UTF-8")
}

fn emit_source(source: &str) -> String {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(source.as_bytes()).expect("write source");

    let output = culebra()
        .arg(file.path())
        .arg("--emit-llvm")
        .output()
        .expect("driver runs");

    assert!(output.status.success());
    String::from_utf8(output.stdout).expect("IR is UTF-8")
}

#[test]
fn emit_module_skeleton() {
    let ir = emit("demos/hello.cb");

    assert!(ir.contains("%array = type { i64, i8* }"));
    assert!(ir.contains("declare void @culebra_print_int(i64)"));
    assert!(ir.contains("declare i8* @culebra_str_concat(i8*, i8*)"));
    assert!(ir.contains("define i32 @main()"));
}

#[test]
fn emit_fib_function() {
    let ir = emit("demos/fib.cb");

    assert!(ir.contains("define i64 @fib(i64 %n)"));
    assert!(ir.contains("icmp slt i64"));
    assert!(ir.contains("call i64 @fib"));
    assert!(ir.contains("call void @culebra_print_int"));
}

#[test]
fn emit_loop_and_array() {
    let ir = emit("demos/sum.cb");

    assert!(ir.contains("call %array* @culebra_create_array(i64 5, i64 8)"));
    assert!(ir.contains("call i64 @culebra_len_array"));
    assert!(ir.contains("for.cond.0:"));
    assert!(ir.contains("for.step.0:"));
}

#[test]
fn emit_short_circuit_diamond() {
    let ir = emit_source("a = true\nb = true\nc = a and b\nif c:\n    print(1)\n");

    assert!(ir.contains("phi i1 [ false,"));
    assert!(ir.contains("and.rhs.0:"));
}

#[test]
fn emit_division_promotes() {
    let ir = emit_source("print(7 / 2)\n");

    assert!(ir.contains("sitofp i64 7 to double"));
    assert!(ir.contains("fdiv double"));
    assert!(ir.contains("call void @culebra_print_float"));
}

#[test]
fn emit_to_output_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let out = dir.path().join("hello.ll");

    culebra()
        .arg("demos/hello.cb")
        .arg("--emit-llvm")
        .arg("-o")
        .arg(&out)
        .assert()
        .success();

    let ir = std::fs::read_to_string(&out).expect("IR file written");
    assert!(ir.contains("define i32 @main()"));
}

#[test]
fn dynamic_program_is_compile_error() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(b"m = Map()\nm.set(\"a\", 1)\n")
        .expect("write source");

    culebra()
        .arg(file.path())
        .arg("--emit-llvm")
        .assert()
        .failure()
        .stderr(predicate::str::contains("CompileError"));
}

#[test]
fn nested_def_is_compile_error() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(b"def outer():\n    def inner():\n        return 1\n    return 2\nouter()\n")
        .expect("write source");

    culebra()
        .arg(file.path())
        .arg("--emit-llvm")
        .assert()
        .failure()
        .stderr(predicate::str::contains("CompileError"));
}

#[test]
fn float_parameter_pinning_conflict() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(b"def f(x):\n    return x\nf(1)\nf(1.5)\n")
        .expect("write source");

    culebra()
        .arg(file.path())
        .arg("--emit-llvm")
        .assert()
        .failure()
        .stderr(predicate::str::contains("CompileError"));
}

#[test]
fn interpreter_still_runs_compilable_programs() {
    // property: on the statically-typed subset both backends accept the
    // program; the interpreter's output is the reference
    culebra()
        .arg("demos/fib.cb")
        .assert()
        .success()
        .stdout("55\n");

    let ir = emit("demos/fib.cb");
    assert!(ir.contains("define i32 @main()"));
}

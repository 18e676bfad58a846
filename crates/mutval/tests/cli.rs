use mutval_ir::{save_module, Function, Instruction, Module, Opcode, Register, ReturnType};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn validator(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mutator-validator"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("validator binary should run")
}

fn write_module(dir: &Path) -> PathBuf {
    let mut sub = Function::new("sub", 2, ReturnType::Int).with_locals(1);
    sub.blocks[0].instructions = vec![
        Instruction::arithmetic(Opcode::Sub, Register(2), Register(0), Register(1)),
        Instruction::return_value(Register(2)),
    ];
    let module = Module::with_functions("sub", vec![sub]);
    let path = dir.join("sub.json");
    save_module(&module, &path).expect("module should be written");
    path
}

#[test]
fn reports_and_validates_mutants() {
    let dir = TempDir::new().unwrap();
    let module = write_module(dir.path());

    let output = validator(&["cxx_arithmetic", module.to_str().unwrap()]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "Found 1 mutants\n");
}

#[test]
fn unknown_group_fails_before_discovery() {
    let dir = TempDir::new().unwrap();
    let module = write_module(dir.path());

    let output = validator(&["cxx_does_not_exist", module.to_str().unwrap()]);

    assert!(!output.status.success());
    assert!(!String::from_utf8_lossy(&output.stdout).contains("Found"));
    assert!(String::from_utf8_lossy(&output.stderr).contains("mutator resolution"));
}

#[test]
fn wrong_argument_count_is_a_usage_error() {
    let output = validator(&["cxx_arithmetic"]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn unreadable_module_fails_to_load() {
    let dir = TempDir::new().unwrap();
    let garbage = dir.path().join("garbage.bc");
    std::fs::write(&garbage, b"definitely not a module").unwrap();

    let output = validator(&["cxx_arithmetic", garbage.to_str().unwrap()]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("load stage failed"));
}

#[test]
fn json_config_is_honoured() {
    let dir = TempDir::new().unwrap();
    let module = write_module(dir.path());
    let config = dir.path().join("config.json");
    std::fs::write(&config, r#"{ "filter": { "exclude_functions": ["sub"] } }"#).unwrap();

    let output = validator(&[
        "--config",
        config.to_str().unwrap(),
        "cxx_arithmetic",
        module.to_str().unwrap(),
    ]);

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "Found 0 mutants\n");
}

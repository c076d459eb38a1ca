use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::tempdir;

fn lume_binary() -> &'static str {
    env!("CARGO_BIN_EXE_lume")
}

fn verificar(dir: &Path, args: &[&str]) -> Output {
    Command::new(lume_binary())
        .current_dir(dir)
        .env_remove("LUME_STDLIB")
        .env_remove("LUME_PATH")
        .env_remove("LUME_LOG")
        .arg("verificar")
        .args(args)
        .output()
        .expect("run lume verificar")
}

#[test]
fn accepts_valid_program() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    fs::write(tmp.path().join("util.lume"), "func dobro(n: int): int\n  retorna n * 2\nfim\n")?;
    fs::write(
        tmp.path().join("main.lume"),
        "usa \"util\"\nvar quatro: int = util.dobro(2)\nescreva(quatro)\n",
    )?;

    let output = verificar(tmp.path(), &["main.lume"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ok: main.lume"), "unexpected output: {stdout}");
    assert!(stdout.contains("1 módulo(s)"), "unexpected output: {stdout}");
    Ok(())
}

#[test]
fn renders_error_with_source_line_and_caret() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    fs::write(
        tmp.path().join("main.lume"),
        "func soma(a: int, b: int): int\n  retorna a + b\nfim\nvar r = soma(1, \"x\")\n",
    )?;

    let output = verificar(tmp.path(), &["main.lume"]);
    assert!(!output.status.success(), "expected non-zero exit");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("erro semântico"), "{stderr}");
    assert!(stderr.contains("--> main.lume:4:"), "{stderr}");
    assert!(stderr.contains("var r = soma(1, \"x\")"), "{stderr}");
    assert!(stderr.contains('^'), "{stderr}");
    Ok(())
}

#[test]
fn json_output_describes_the_error() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    fs::write(tmp.path().join("main.lume"), "var x = 1\nvar x = 2\n")?;

    let output = verificar(tmp.path(), &["main.lume", "--json"]);
    assert!(!output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(value["ok"], false);
    assert_eq!(value["erro"]["kind"], "Semantic");
    assert_eq!(value["erro"]["line"], 2);
    assert_eq!(value["erro"]["path"], "main.lume");
    Ok(())
}

#[test]
fn include_directories_extend_module_search() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let lib = tmp.path().join("lib");
    fs::create_dir(&lib)?;
    fs::write(lib.join("eco.lume"), "func eco(t: texto): texto\n  retorna t\nfim\n")?;
    let app = tmp.path().join("app");
    fs::create_dir(&app)?;
    fs::write(app.join("main.lume"), "usa (eco) de \"eco\"\nvar s = eco(\"a\")\n")?;

    let missing = verificar(&app, &["main.lume"]);
    assert!(!missing.status.success());
    assert!(String::from_utf8_lossy(&missing.stderr).contains("'eco' não encontrado"));

    let found = verificar(&app, &["main.lume", "-I", "../lib"]);
    assert!(found.status.success(), "{}", String::from_utf8_lossy(&found.stderr));
    Ok(())
}

#[test]
fn prelude_can_be_disabled() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let stdlib = tmp.path().join("std");
    fs::create_dir(&stdlib)?;
    fs::write(stdlib.join("preludio.lume"), "var versao = 1\n")?;
    fs::write(tmp.path().join("main.lume"), "var v: int = versao\n")?;

    let with = verificar(tmp.path(), &["main.lume", "--stdlib", "std"]);
    assert!(with.status.success(), "{}", String::from_utf8_lossy(&with.stderr));

    let without = verificar(tmp.path(), &["main.lume", "--stdlib", "std", "--sem-preludio"]);
    assert!(!without.status.success());
    assert!(String::from_utf8_lossy(&without.stderr).contains("'versao' não declarado"));
    Ok(())
}

#[test]
fn unreadable_input_is_reported() {
    let tmp = tempdir().expect("tempdir");
    let output = verificar(tmp.path(), &["nao_existe.lume"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("falha ao ler"));
}

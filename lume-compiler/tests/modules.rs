use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::Result;
use lume_compiler::{
    normalize_path, Compilation, CompileError, CompileOptions, Compiler, SourceFile, SourceId,
};
use tempfile::tempdir;

fn compile_file(path: &Path, options: CompileOptions) -> Result<Result<Compilation, CompileError>> {
    let contents = fs::read_to_string(path)?;
    let source = SourceFile::new(SourceId(0), path.to_path_buf(), contents);
    Ok(Compiler::new(options).compile(&source))
}

fn without_prelude() -> CompileOptions {
    CompileOptions {
        prelude: false,
        ..CompileOptions::default()
    }
}

#[test]
fn cyclic_import_names_the_module_being_loaded() -> Result<()> {
    let dir = tempdir()?;
    let a = dir.path().join("a.lume");
    let b = dir.path().join("b.lume");
    fs::write(&a, "usa \"b\"\nvar x = 1\n")?;
    fs::write(&b, "usa \"a\"\nvar y = 2\n")?;

    let err = compile_file(&a, without_prelude())?.expect_err("cycle must be rejected");
    assert_eq!(err.path, normalize_path(&b));
    assert_eq!(err.line, 1);
    assert!(err.message.contains("importação cíclica"), "{}", err.message);
    assert!(
        err.message.contains(&normalize_path(&a).display().to_string()),
        "{}",
        err.message
    );
    Ok(())
}

#[test]
fn alias_and_item_imports() -> Result<()> {
    let dir = tempdir()?;
    fs::write(
        dir.path().join("geo.lume"),
        r#"
registo Ponto
  x: real
  y: real
fim

func origem(): Ponto
  retorna Ponto(x: 0.0, y: 0.0)
fim
"#,
    )?;
    let main = dir.path().join("main.lume");
    fs::write(
        &main,
        r#"
usa "geo"
usa (origem) de "geo"
usa "geo" como g
var p: geo.Ponto = geo.origem()
var q: g.Ponto = origem()
var x: real = p.x + q.y
"#,
    )?;

    let compilation = compile_file(&main, without_prelude())?.expect("imports resolve");
    let paths: Vec<_> = compilation.module_paths().collect();
    assert_eq!(paths, vec![normalize_path(&dir.path().join("geo.lume")).as_path()]);
    Ok(())
}

#[test]
fn importing_missing_item_is_an_error() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("util.lume"), "var um = 1\n")?;
    let main = dir.path().join("main.lume");
    fs::write(&main, "usa (dois) de \"util\"\n")?;

    let err = compile_file(&main, without_prelude())?.expect_err("missing item");
    assert!(err.message.contains("não exporta 'dois'"), "{}", err.message);
    Ok(())
}

#[test]
fn merged_names_collide_with_local_declarations() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("util.lume"), "var um = 1\n")?;
    let main = dir.path().join("main.lume");
    fs::write(&main, "usa * de \"util\"\nvar um = 2\n")?;

    let err = compile_file(&main, without_prelude())?.expect_err("collision");
    assert_eq!(err.line, 2);
    assert!(err.message.contains("'um' já declarado"), "{}", err.message);
    Ok(())
}

#[test]
fn missing_module_is_reported_at_the_import() -> Result<()> {
    let dir = tempdir()?;
    let main = dir.path().join("main.lume");
    fs::write(&main, "\nusa \"nada\"\n")?;

    let err = compile_file(&main, without_prelude())?.expect_err("missing module");
    assert_eq!(err.line, 2);
    assert!(err.message.contains("'nada' não encontrado"), "{}", err.message);
    Ok(())
}

#[test]
fn module_overrides_replace_files() -> Result<()> {
    let dir = tempdir()?;
    let main = dir.path().join("main.lume");
    let mut overrides = HashMap::new();
    overrides.insert(
        dir.path().join("util.lume"),
        "func dobro(n: int): int\n  retorna n * 2\nfim\n".to_string(),
    );
    let options = CompileOptions {
        prelude: false,
        module_overrides: overrides,
        ..CompileOptions::default()
    };

    let source = SourceFile::new(
        SourceId(0),
        main,
        "usa \"util\"\nvar quatro: int = util.dobro(2)\n".to_string(),
    );
    Compiler::new(options)
        .compile(&source)
        .expect("override is used instead of the file system");
    Ok(())
}

#[test]
fn prelude_is_visible_and_can_be_shadowed() -> Result<()> {
    let stdlib = tempdir()?;
    fs::write(
        stdlib.path().join("preludio.lume"),
        "func dobro(n: int): int\n  retorna n * 2\nfim\n",
    )?;
    let project = tempdir()?;
    let main = project.path().join("main.lume");
    fs::write(&main, "var quatro: int = dobro(2)\n")?;

    let options = CompileOptions {
        stdlib_dir: Some(stdlib.path().to_path_buf()),
        ..CompileOptions::default()
    };
    compile_file(&main, options.clone())?.expect("prelude names are in scope");

    fs::write(&main, "func dobro(t: texto): texto\n  retorna t + t\nfim\nvar s = dobro(\"a\")\n")?;
    compile_file(&main, options.clone())?.expect("module names shadow the prelude");

    fs::write(&main, "var quatro: int = dobro(2)\n")?;
    let without = CompileOptions {
        prelude: false,
        ..options
    };
    let err = compile_file(&main, without)?.expect_err("prelude disabled");
    assert!(err.message.contains("'dobro' não declarado"), "{}", err.message);
    Ok(())
}

#[test]
fn search_paths_are_used_after_the_importer_directory() -> Result<()> {
    let lib = tempdir()?;
    fs::write(lib.path().join("texto_util.lume"), "func eco(t: texto): texto\n  retorna t\nfim\n")?;
    let project = tempdir()?;
    let main = project.path().join("main.lume");
    fs::write(&main, "usa (eco) de \"texto_util\"\nvar s = eco(\"x\")\n")?;

    let options = CompileOptions {
        prelude: false,
        search_paths: vec![lib.path().to_path_buf()],
        ..CompileOptions::default()
    };
    compile_file(&main, options)?.expect("found through the search path");
    Ok(())
}

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use lume_compiler::{CompileError, CompileOptions, Compiler, SourceFile, SourceId};
use pathdiff::diff_paths;
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "lume",
    version,
    about = "Verifica programas lume.",
    long_about = "Analisa um ficheiro lume e os módulos que ele importa, reportando o primeiro erro encontrado."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analisa um ficheiro e todas as suas importações.
    Verificar(CheckArgs),
}

#[derive(clap::Args)]
struct CheckArgs {
    /// Ficheiro lume a verificar.
    ficheiro: PathBuf,

    /// Diretório adicional onde procurar módulos (pode repetir-se).
    #[arg(short = 'I', long = "incluir", value_name = "DIR")]
    include: Vec<PathBuf>,

    /// Diretório da biblioteca padrão (por omissão, `LUME_STDLIB`).
    #[arg(long, value_name = "DIR")]
    stdlib: Option<PathBuf>,

    /// Não carregar o prelúdio.
    #[arg(long = "sem-preludio")]
    no_prelude: bool,

    /// Escrever o resultado em JSON.
    #[arg(long)]
    json: bool,

    /// Imprimir a árvore anotada do ficheiro.
    #[arg(long)]
    arvore: bool,
}

fn main() -> Result<()> {
    if let Ok(filter) = EnvFilter::try_from_env("LUME_LOG") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let cli = Cli::parse();
    match cli.command {
        Command::Verificar(args) => check(args),
    }
}

fn check(args: CheckArgs) -> Result<()> {
    let contents = fs::read_to_string(&args.ficheiro)
        .with_context(|| format!("falha ao ler {:?}", args.ficheiro))?;
    let source = SourceFile::new(SourceId(0), args.ficheiro.clone(), contents);

    let mut options = CompileOptions::from_env();
    if let Some(stdlib) = args.stdlib.clone() {
        options.stdlib_dir = Some(stdlib);
    }
    options.search_paths.extend(args.include.iter().cloned());
    options.prelude = !args.no_prelude;
    tracing::debug!(?options, "compile options");

    let mut compiler = Compiler::new(options);
    let compilation = match compiler.compile(&source) {
        Ok(compilation) => compilation,
        Err(err) => {
            let err = relative_to_cwd(err);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&json!({ "ok": false, "erro": err }))?);
            } else {
                let line = source_line(&source, &err);
                eprint!("{}", err.render(line.as_deref()));
            }
            return Err(anyhow!("a verificação de {} falhou", display_path(&args.ficheiro)));
        }
    };

    if args.arvore {
        println!("{:#?}", compilation.module);
    }

    let modules: Vec<String> = compilation.module_paths().map(display_path).collect();
    if args.json {
        let summary = json!({
            "ok": true,
            "ficheiro": display_path(&args.ficheiro),
            "modulos": modules,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "ok: {} ({} módulo(s) importado(s))",
            display_path(&args.ficheiro),
            modules.len()
        );
    }
    Ok(())
}

/// Line of the file the error points into, read again when it is not the
/// entry file.
fn source_line(source: &SourceFile, err: &CompileError) -> Option<String> {
    let same_file = lume_compiler::normalize_path(&source.path)
        == lume_compiler::normalize_path(&err.path);
    if same_file {
        return source.line(err.line).map(str::to_string);
    }
    let contents = fs::read_to_string(&err.path).ok()?;
    let other = SourceFile::new(SourceId(0), err.path.clone(), contents);
    other.line(err.line).map(str::to_string)
}

fn relative_to_cwd(mut err: CompileError) -> CompileError {
    err.path = PathBuf::from(display_path(&err.path));
    err
}

fn display_path(path: &Path) -> String {
    let absolute = lume_compiler::normalize_path(path);
    env::current_dir()
        .ok()
        .and_then(|cwd| diff_paths(&absolute, cwd))
        .filter(|relative| !relative.as_os_str().is_empty())
        .unwrap_or(absolute)
        .display()
        .to_string()
}

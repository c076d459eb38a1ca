mod analyzer;
mod ast;
mod builtins;
mod compiler;
mod diagnostics;
mod lexer;
mod modules;
mod parser;
mod patterns;
mod scope;
mod source;
mod symbols;
mod types;

pub use crate::analyzer::{Analyzer, Checker};
pub use crate::ast::*;
pub use crate::builtins::{BuiltinEnvironment, BuiltinFunction};
pub use crate::compiler::{
    Compilation, CompileOptions, Compiler, DEFAULT_EXTENSION, DEFAULT_PRELUDE,
};
pub use crate::diagnostics::{CompileError, CompileResult, ErrorKind};
pub use crate::lexer::{Keyword, Lexer, Token, TokenKind};
pub use crate::modules::{normalize_path, LoadedModule, ModuleLoader, ModuleState};
pub use crate::parser::{parse_source, Parser};
pub use crate::patterns::{
    lower_pattern, Body, Case, Column, Constructor, Decision, Match, MatchCompiler, Pat, Row,
    Variable,
};
pub use crate::scope::Scope;
pub use crate::source::{SourceFile, SourceId};
pub use crate::symbols::{
    FunctionSymbol, MethodSymbol, ModuleSymbol, Symbol, VariableSymbol, BUILTIN_ANNOTATION,
};
pub use crate::types::{
    binop, unaryop, BindError, Primitive, RecordType, Type, TypeBindings, UnionType,
    VariantType, OPTION_TYPE_NAME,
};

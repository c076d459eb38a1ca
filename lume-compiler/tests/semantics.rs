use std::path::PathBuf;

use lume_compiler::{
    Compilation, CompileError, CompileOptions, Compiler, ErrorKind, SourceFile, SourceId,
    Statement,
};

fn compile(contents: &str) -> Result<Compilation, CompileError> {
    let source = SourceFile::new(SourceId(0), PathBuf::from("main.lume"), contents.to_string());
    let options = CompileOptions {
        prelude: false,
        ..CompileOptions::default()
    };
    Compiler::new(options).compile(&source)
}

fn compile_err(contents: &str) -> CompileError {
    match compile(contents) {
        Ok(_) => panic!("expected a compile error for:\n{}", contents),
        Err(err) => err,
    }
}

#[test]
fn inner_scopes_shadow_outer_names() {
    let source = r#"
var x = 1
func f(): int
  var x = "texto"
  se verdadeiro
    var x = 2.5
    var y: real = x
  fim
  var z: texto = x
  retorna 1
fim
"#;
    let compilation = compile(source).expect("shadowing is allowed");
    let Statement::Var(var) = &compilation.module.statements[0] else {
        panic!("expected a var statement");
    };
    let symbol = var.symbol.as_ref().expect("module variable resolved");
    assert_eq!(symbol.out_name, "x");
}

#[test]
fn sibling_scopes_do_not_conflict() {
    let source = r#"
se verdadeiro
  var a = 1
senao
  var a = "um"
fim
"#;
    compile(source).expect("siblings may reuse names");
}

#[test]
fn redeclaration_in_same_scope_is_rejected() {
    let err = compile_err("var x = 1\nvar x = 2\n");
    assert_eq!(err.kind, ErrorKind::Semantic);
    assert_eq!(err.line, 2);
    assert!(
        err.message.contains("identificador 'x' já declarado"),
        "{}",
        err.message
    );
}

#[test]
fn undeclared_identifier_is_reported() {
    let err = compile_err("var a = b + 1\n");
    assert!(err.message.contains("'b' não declarado"), "{}", err.message);
}

#[test]
fn missing_union_variant_is_named() {
    let source = r#"
uniao Forma
  Circulo(real)
  Quadrado(real)
fim

func area(f: Forma): real
  iguala f
  caso Circulo(r)
    retorna r * r
  fim
fim
"#;
    let err = compile_err(source);
    assert!(err.message.contains("não é exaustivo"), "{}", err.message);
    assert!(err.message.contains("Quadrado(_)"), "{}", err.message);
}

#[test]
fn exhaustive_union_match_is_accepted() {
    let source = r#"
uniao Forma
  Circulo(real)
  Quadrado(real)
  Vazio
fim

func area(f: Forma): real
  iguala f
  caso Circulo(r)
    retorna 3.14 * r * r
  caso Quadrado(l)
    retorna l * l
  caso Vazio
    retorna 0.0
  fim
fim
"#;
    let compilation = compile(source).expect("every variant is covered");
    let Statement::Function(function) = &compilation.module.statements[1] else {
        panic!("expected a function");
    };
    let body = function.body.as_ref().expect("function body");
    let Statement::Match(stmt) = &body.statements[0] else {
        panic!("expected iguala");
    };
    assert!(stmt.decision.is_some());
    assert_eq!(stmt.reachable_arms, vec![0, 1, 2]);
    assert_eq!(stmt.arms[0].bindings[0].name, "r");
}

#[test]
fn integer_match_needs_a_catch_all() {
    let without = r#"
func nome(n: int): texto
  iguala n
  caso 1
    retorna "um"
  caso 2..9
    retorna "alguns"
  fim
fim
"#;
    let err = compile_err(without);
    assert!(err.message.contains("padrões em falta: _"), "{}", err.message);

    let with = r#"
func nome(n: int): texto
  iguala n
  caso 1
    retorna "um"
  caso _
    retorna "muitos"
  fim
fim
"#;
    compile(with).expect("catch-all covers the rest");
}

#[test]
fn argument_mismatch_names_parameter_and_types() {
    let source = r#"
func soma(a: int, b: int): int
  retorna a + b
fim
var r = soma(1, "x")
"#;
    let err = compile_err(source);
    assert_eq!(err.line, 5);
    assert!(err.message.contains("parâmetro 2"), "{}", err.message);
    assert!(err.message.contains("'int'"), "{}", err.message);
    assert!(err.message.contains("'texto'"), "{}", err.message);
}

#[test]
fn arity_mismatch_is_reported() {
    let source = r#"
func soma(a: int, b: int): int
  retorna a + b
fim
var r = soma(1)
"#;
    let err = compile_err(source);
    assert!(
        err.message.contains("'soma' espera 2 argumento(s), recebeu 1"),
        "{}",
        err.message
    );
}

#[test]
fn record_construction_requires_every_field_once() {
    let record = "registo Ponto\n  x: int\n  y: int\nfim\n";

    let err = compile_err(&format!("{}var p = Ponto(x: 1)\n", record));
    assert!(
        err.message.contains("falta inicializar o campo 'y' de 'Ponto'"),
        "{}",
        err.message
    );

    let err = compile_err(&format!("{}var p = Ponto(x: 1, x: 2, y: 3)\n", record));
    assert!(
        err.message.contains("o campo 'x' foi inicializado mais de uma vez"),
        "{}",
        err.message
    );

    compile(&format!("{}var p = Ponto(y: 2, x: 1)\nvar s: int = p.x + p.y\n", record))
        .expect("complete construction");
}

#[test]
fn methods_see_their_receiver() {
    let source = r#"
registo Contador
  valor: int
  func proximo(): int
    retorna alvo.valor + 1
  fim
fim
var c = Contador(valor: 1)
var n: int = c.proximo()
"#;
    compile(source).expect("methods resolve through the record");

    let err = compile_err("func f(): int\n  retorna alvo\nfim\n");
    assert!(err.message.contains("'alvo'"), "{}", err.message);
}

#[test]
fn option_values_compare_with_null() {
    let source = r#"
var o: Opcao[int] = nulo
var sem_valor: bool = o == nulo
var alguma = Alguma(3)
var tambem: Opcao[int] = 5
var nada: Opcao[texto] = Nenhuma
"#;
    compile(source).expect("optional values");

    let err = compile_err("var nada = Nenhuma\n");
    assert!(err.message.contains("Nenhuma"), "{}", err.message);
}

#[test]
fn generic_functions_infer_type_arguments() {
    let source = r#"
func primeiro[T](v: [T]): T
  retorna v[0]
fim
var n: int = primeiro([1, 2])
var t: texto = primeiro[texto](["a"])
"#;
    compile(source).expect("generic inference");

    let err = compile_err(&format!(
        "{}var errado: texto = primeiro([1])\n",
        "func primeiro[T](v: [T]): T\n  retorna v[0]\nfim\n"
    ));
    assert!(err.message.contains("'texto'"), "{}", err.message);
}

#[test]
fn functions_must_return_on_every_path() {
    let source = r#"
func sinal(n: int): int
  se n > 0
    retorna 1
  fim
fim
"#;
    let err = compile_err(source);
    assert!(err.message.contains("nem sempre retorna"), "{}", err.message);
}

#[test]
fn break_outside_loop_is_rejected() {
    let err = compile_err("quebra\n");
    assert!(err.message.contains("'quebra' fora de um ciclo"), "{}", err.message);

    compile("para i de 0 ate 10\n  se i == 5\n    quebra\n  fim\nfim\n").expect("inside a loop");
}

#[test]
fn continue_outside_loop_is_rejected() {
    let err = compile_err("func f()\n  continua\nfim\n");
    assert!(err.message.contains("'continua' fora de um ciclo"), "{}", err.message);
    assert_eq!(err.line, 2);

    compile("var i = 0\nenquanto i < 3\n  i = i + 1\n  continua\nfim\n").expect("inside a loop");
}

#[test]
fn loops_delegate_return_paths_to_their_body() {
    let source = r#"
func primeiro(v: [int]): int
  para x em v
    retorna x
  fim
fim

func sempre(): int
  enquanto verdadeiro
    retorna 1
  fim
fim
"#;
    compile(source).expect("a loop whose body returns counts as returning");

    let err = compile_err("func f(): int\n  enquanto verdadeiro\n    escreva(1)\n  fim\nfim\n");
    assert!(err.message.contains("nem sempre retorna"), "{}", err.message);
}

#[test]
fn conditions_must_be_boolean() {
    compile("var n = 2\nse n > 1\n  escreva(n)\nsenaose n == 0\n  escreva(0)\nfim\n")
        .expect("boolean conditions");

    let err = compile_err("se 1\n  escreva(1)\nfim\n");
    assert!(err.message.contains("condição de 'se'"), "{}", err.message);
    assert!(err.message.contains("'int'"), "{}", err.message);

    let err = compile_err("enquanto \"sim\"\n  quebra\nfim\n");
    assert!(err.message.contains("condição de 'enquanto'"), "{}", err.message);
    assert!(err.message.contains("'texto'"), "{}", err.message);
}

#[test]
fn for_each_iterates_vectors_and_text() {
    compile("var total = 0\npara x em [1, 2, 3]\n  total = total + x\nfim\n")
        .expect("vector iteration yields the element type");
    compile("var s: texto = \"\"\npara c em \"abc\"\n  s = s + c\nfim\n")
        .expect("text iteration yields texto");

    let err = compile_err("para x em 3\n  escreva(x)\nfim\n");
    assert!(err.message.contains("não é possível iterar sobre 'int'"), "{}", err.message);
}

#[test]
fn switch_accepts_int_and_text_scrutinees() {
    let source = r#"
var n = 2
escolha n
caso 1, 2
  escreva("pequeno")
caso 3
  escreva("tres")
padrao
  escreva("outro")
fim

var nome = "ana"
escolha nome
caso "ana"
  escreva(1)
fim
"#;
    compile(source).expect("int and texto switches");

    let err = compile_err("escolha 2.5\ncaso 1\n  escreva(1)\nfim\n");
    assert!(err.message.contains("só aceita 'int' ou 'texto'"), "{}", err.message);
    assert!(err.message.contains("'real'"), "{}", err.message);
}

#[test]
fn switch_cases_must_agree_and_not_repeat() {
    let err = compile_err("var n = 1\nescolha n\ncaso \"um\"\n  escreva(1)\nfim\n");
    assert!(err.message.contains("valor de 'caso' incompatível"), "{}", err.message);
    assert_eq!(err.line, 3);

    let err = compile_err("var n = 1\nescolha n\ncaso 1, 2\n  escreva(1)\ncaso 2\n  escreva(2)\nfim\n");
    assert!(err.message.contains("valor de 'caso' repetido: 2"), "{}", err.message);
    assert_eq!(err.line, 5);
}

#[test]
fn builtin_calls_are_checked() {
    let source = r#"
var v: [int] = vetor(3)
anexa(v, 4)
var n = tamanho(v)
var ultimo: int = remove(v, 0)
escreva(n)
"#;
    compile(source).expect("builtins");

    let err = compile_err("var v = vetor(3)\n");
    assert!(err.message.contains("vetor[T](n)"), "{}", err.message);
}

#[test]
fn builtin_declarations_have_no_body() {
    let source = r#"
@embutido
func relogio(): int
var agora: int = relogio()
"#;
    let compilation = compile(source).expect("builtins need no return path");
    let Statement::Function(function) = &compilation.module.statements[0] else {
        panic!("expected a function");
    };
    let symbol = function.symbol.as_ref().expect("function resolved");
    assert!(symbol.has_annotation("embutido"));

    let err = compile_err("@rapido\nfunc f()\nfim\n");
    assert!(err.message.contains("anotação desconhecida '@rapido'"), "{}", err.message);
}

#[test]
fn casts_between_primitives() {
    compile("var r = real(1)\nvar t = texto(2.5)\n").expect("primitive casts");
    let err = compile_err("registo P\n  x: int\nfim\nvar i = int(P(x: 1))\n");
    assert!(err.message.contains("não é possível converter"), "{}", err.message);
}

#[test]
fn casts_into_options() {
    compile("var a = Opcao[int](3)\nvar b: Opcao[texto] = Opcao[texto](nulo)\nvar c: bool = a == nulo\n")
        .expect("value and null convert to an option");

    let err = compile_err("var a = Opcao[int](2.5)\n");
    assert!(
        err.message.contains("não é possível converter 'real' em 'Opcao[int]'"),
        "{}",
        err.message
    );

    let err = compile_err("var a = Opcao(3)\n");
    assert!(err.message.contains("argumento(s) de tipo"), "{}", err.message);
}

#[test]
fn syntax_errors_carry_position() {
    let err = compile_err("var = 1\n");
    assert_eq!(err.kind, ErrorKind::Syntax);
    assert_eq!(err.line, 1);
}

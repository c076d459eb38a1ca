use std::path::Path;

use crate::diagnostics::{CompileError, CompileResult};
use crate::source::SourceFile;

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    fn new(kind: TokenKind, lexeme: String, line: usize, column: usize) -> Self {
        Self {
            kind,
            lexeme,
            line,
            column,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Identifier,
    IntegerLiteral(i64),
    FloatLiteral(f64),
    StringLiteral(String),
    BooleanLiteral(bool),
    Keyword(Keyword),
    Newline,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    DotDot,
    Colon,
    Semicolon,
    At,
    Equal,
    DoubleEqual,
    BangEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Var,
    Func,
    Registo,
    Uniao,
    Se,
    SenaoSe,
    Senao,
    Fim,
    Enquanto,
    Para,
    De,
    Ate,
    Em,
    Escolha,
    Caso,
    Padrao,
    Iguala,
    Retorna,
    Quebra,
    Continua,
    Usa,
    Como,
    E,
    Ou,
    Nao,
    Alvo,
    Nulo,
}

pub struct Lexer<'a> {
    input: &'a str,
    path: &'a Path,
    position: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a SourceFile) -> Self {
        Self {
            input: &source.contents,
            path: &source.path,
            position: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn tokenize(&mut self) -> CompileResult<Vec<Token>> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek_char() {
            match ch {
                ' ' | '\t' => {
                    self.advance_char();
                }
                '\r' | '\n' => {
                    self.advance_char();
                    tokens.push(self.make_newline_token());
                }
                '#' => self.skip_comment(),
                '"' => tokens.push(self.lex_string()?),
                '0'..='9' => tokens.push(self.lex_number()?),
                c if c.is_alphabetic() || c == '_' => tokens.push(self.lex_identifier_or_keyword()),
                '(' => tokens.push(self.simple_token(TokenKind::LParen)),
                ')' => tokens.push(self.simple_token(TokenKind::RParen)),
                '[' => tokens.push(self.simple_token(TokenKind::LBracket)),
                ']' => tokens.push(self.simple_token(TokenKind::RBracket)),
                ',' => tokens.push(self.simple_token(TokenKind::Comma)),
                ';' => tokens.push(self.simple_token(TokenKind::Semicolon)),
                ':' => tokens.push(self.simple_token(TokenKind::Colon)),
                '@' => tokens.push(self.simple_token(TokenKind::At)),
                '+' => tokens.push(self.simple_token(TokenKind::Plus)),
                '-' => tokens.push(self.simple_token(TokenKind::Minus)),
                '*' => tokens.push(self.simple_token(TokenKind::Star)),
                '/' => tokens.push(self.simple_token(TokenKind::Slash)),
                '%' => tokens.push(self.simple_token(TokenKind::Percent)),
                '.' => tokens.push(self.lex_pair('.', TokenKind::Dot, TokenKind::DotDot)),
                '=' => tokens.push(self.lex_pair('=', TokenKind::Equal, TokenKind::DoubleEqual)),
                '>' => tokens.push(self.lex_pair('=', TokenKind::Greater, TokenKind::GreaterEqual)),
                '<' => tokens.push(self.lex_pair('=', TokenKind::Less, TokenKind::LessEqual)),
                '!' => {
                    if self.peek_next_char() == Some('=') {
                        tokens.push(self.lex_pair('=', TokenKind::BangEqual, TokenKind::BangEqual));
                    } else {
                        return Err(self.error("'!' isolado; use 'nao' para negação"));
                    }
                }
                other => {
                    return Err(self.error(format!("carácter inesperado '{}'", other)));
                }
            }
        }

        tokens.push(Token::new(
            TokenKind::Eof,
            String::new(),
            self.line,
            self.column,
        ));

        Ok(tokens)
    }

    fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::syntax(self.path, self.line, self.column, message)
    }

    fn make_newline_token(&self) -> Token {
        Token::new(
            TokenKind::Newline,
            "\n".to_string(),
            self.line.saturating_sub(1),
            1,
        )
    }

    fn skip_comment(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == '\n' || ch == '\r' {
                break;
            }
            self.advance_char();
        }
    }

    fn lex_string(&mut self) -> CompileResult<Token> {
        let start = self.position;
        let start_line = self.line;
        let start_column = self.column;
        self.advance_char(); // consume opening quote

        let mut value = String::new();
        while let Some(ch) = self.peek_char() {
            match ch {
                '"' => {
                    self.advance_char(); // consume closing quote
                    let lexeme = self.slice(start, self.position);
                    return Ok(Token::new(
                        TokenKind::StringLiteral(value),
                        lexeme.to_string(),
                        start_line,
                        start_column,
                    ));
                }
                '\\' => {
                    self.advance_char();
                    let escaped = self
                        .peek_char()
                        .ok_or_else(|| self.error("sequência de escape incompleta"))?;
                    let escaped_char = match escaped {
                        '"' => '"',
                        '\\' => '\\',
                        'n' => '\n',
                        'r' => '\r',
                        't' => '\t',
                        other => other,
                    };
                    value.push(escaped_char);
                    self.advance_char();
                }
                '\n' => break,
                _ => {
                    value.push(ch);
                    self.advance_char();
                }
            }
        }

        Err(CompileError::syntax(
            self.path,
            start_line,
            start_column,
            "texto literal não terminado",
        ))
    }

    fn lex_number(&mut self) -> CompileResult<Token> {
        let start = self.position;
        let start_line = self.line;
        let start_column = self.column;
        let mut is_float = false;

        self.advance_char(); // consume first digit

        while let Some(ch) = self.peek_char() {
            match ch {
                '0'..='9' | '_' => {
                    self.advance_char();
                }
                '.' => {
                    // `1..5` is a range, not a float
                    if is_float || !matches!(self.peek_next_char(), Some('0'..='9')) {
                        break;
                    }
                    is_float = true;
                    self.advance_char();
                }
                _ => break,
            }
        }

        let raw = self.slice(start, self.position).to_string();
        let digits = raw.replace('_', "");
        let kind = if is_float {
            digits.parse::<f64>().map(TokenKind::FloatLiteral).ok()
        } else {
            digits.parse::<i64>().map(TokenKind::IntegerLiteral).ok()
        };
        match kind {
            Some(kind) => Ok(Token::new(kind, raw, start_line, start_column)),
            None => Err(CompileError::syntax(
                self.path,
                start_line,
                start_column,
                format!("literal numérico inválido '{}'", raw),
            )),
        }
    }

    fn lex_identifier_or_keyword(&mut self) -> Token {
        let start = self.position;
        let start_line = self.line;
        let start_column = self.column;
        self.advance_char();

        while let Some(ch) = self.peek_char() {
            if ch.is_alphanumeric() || ch == '_' {
                self.advance_char();
            } else {
                break;
            }
        }

        let lexeme = self.slice(start, self.position).to_string();
        let kind = if let Some(keyword) = keyword_from_lexeme(&lexeme) {
            TokenKind::Keyword(keyword)
        } else if lexeme == "verdadeiro" {
            TokenKind::BooleanLiteral(true)
        } else if lexeme == "falso" {
            TokenKind::BooleanLiteral(false)
        } else {
            TokenKind::Identifier
        };
        Token::new(kind, lexeme, start_line, start_column)
    }

    /// Lexes a one-character token, or a two-character one when the next
    /// character is `second`.
    fn lex_pair(&mut self, second: char, single: TokenKind, double: TokenKind) -> Token {
        let start_line = self.line;
        let start_column = self.column;
        let start = self.position;
        self.advance_char();

        let kind = if self.peek_char() == Some(second) {
            self.advance_char();
            double
        } else {
            single
        };
        Token::new(
            kind,
            self.slice(start, self.position).to_string(),
            start_line,
            start_column,
        )
    }

    fn simple_token(&mut self, kind: TokenKind) -> Token {
        let start_line = self.line;
        let start_column = self.column;
        let start = self.position;
        self.advance_char();
        Token::new(
            kind,
            self.slice(start, self.position).to_string(),
            start_line,
            start_column,
        )
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn peek_next_char(&self) -> Option<char> {
        let mut iter = self.input[self.position..].chars();
        iter.next()?;
        iter.next()
    }

    fn advance_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.position += ch.len_utf8();
        if ch == '\r' || ch == '\n' {
            if ch == '\r' && self.peek_char() == Some('\n') {
                self.position += 1;
            }
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn slice(&self, start: usize, end: usize) -> &str {
        &self.input[start..end]
    }
}

fn keyword_from_lexeme(lexeme: &str) -> Option<Keyword> {
    match lexeme {
        "var" => Some(Keyword::Var),
        "func" => Some(Keyword::Func),
        "registo" => Some(Keyword::Registo),
        "uniao" | "união" => Some(Keyword::Uniao),
        "se" => Some(Keyword::Se),
        "senaose" | "senãose" => Some(Keyword::SenaoSe),
        "senao" | "senão" => Some(Keyword::Senao),
        "fim" => Some(Keyword::Fim),
        "enquanto" => Some(Keyword::Enquanto),
        "para" => Some(Keyword::Para),
        "de" => Some(Keyword::De),
        "ate" | "até" => Some(Keyword::Ate),
        "em" => Some(Keyword::Em),
        "escolha" => Some(Keyword::Escolha),
        "caso" => Some(Keyword::Caso),
        "padrao" | "padrão" => Some(Keyword::Padrao),
        "iguala" => Some(Keyword::Iguala),
        "retorna" => Some(Keyword::Retorna),
        "quebra" => Some(Keyword::Quebra),
        "continua" => Some(Keyword::Continua),
        "usa" => Some(Keyword::Usa),
        "como" => Some(Keyword::Como),
        "e" => Some(Keyword::E),
        "ou" => Some(Keyword::Ou),
        "nao" | "não" => Some(Keyword::Nao),
        "alvo" => Some(Keyword::Alvo),
        "nulo" => Some(Keyword::Nulo),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::source::SourceId;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let file = SourceFile::new(SourceId(0), PathBuf::from("t.lume"), source.to_string());
        Lexer::new(&file)
            .tokenize()
            .expect("tokenize")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn lexes_keywords_and_accented_forms() {
        assert_eq!(
            kinds("senão não"),
            vec![
                TokenKind::Keyword(Keyword::Senao),
                TokenKind::Keyword(Keyword::Nao),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn range_is_not_a_float() {
        assert_eq!(
            kinds("1..5 2.5"),
            vec![
                TokenKind::IntegerLiteral(1),
                TokenKind::DotDot,
                TokenKind::IntegerLiteral(5),
                TokenKind::FloatLiteral(2.5),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn reports_unterminated_string_with_position() {
        let file = SourceFile::new(SourceId(0), PathBuf::from("t.lume"), "\nvar x = \"abc".into());
        let error = Lexer::new(&file).tokenize().unwrap_err();
        assert_eq!(error.line, 2);
        assert_eq!(error.column, 9);
        assert!(error.message.contains("não terminado"));
    }
}

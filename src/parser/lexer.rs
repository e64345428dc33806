//! Lexer (tokenizer) for JavaScript source code
//!
//! Converts raw source text into a flat [`Token`] stream consumed by the parser.
//! Template literals are accepted as plain strings; `${}` substitution is
//! rejected, matching the interpreter's no-interpolation policy.

use super::ast::SourceLocation;
use std::fmt;

/// All token variants produced by the lexer.
///
/// Every variant carries a [`SourceLocation`] so that parse errors can report
/// an accurate line and column without a separate token→location table. The
/// location is also what drives automatic semicolon insertion in the parser.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Number(f64, SourceLocation),
    Str(String, SourceLocation),

    // Identifiers (includes contextual keywords like `of` and `undefined`)
    Ident(String, SourceLocation),

    // Keywords
    Let(SourceLocation),
    Const(SourceLocation),
    Var(SourceLocation),
    Function(SourceLocation),
    Return(SourceLocation),
    If(SourceLocation),
    Else(SourceLocation),
    While(SourceLocation),
    Do(SourceLocation),
    For(SourceLocation),
    Break(SourceLocation),
    Continue(SourceLocation),
    True(SourceLocation),
    False(SourceLocation),
    Null(SourceLocation),
    Typeof(SourceLocation),
    New(SourceLocation),
    This(SourceLocation),

    // Arithmetic
    Plus(SourceLocation),     // +
    Minus(SourceLocation),    // -
    Star(SourceLocation),     // *
    Slash(SourceLocation),    // /
    Percent(SourceLocation),  // %
    StarStar(SourceLocation), // **

    // Comparison
    EqEq(SourceLocation),    // ==
    EqEqEq(SourceLocation),  // ===
    NotEq(SourceLocation),   // !=
    NotEqEq(SourceLocation), // !==
    Lt(SourceLocation),      // <
    Le(SourceLocation),      // <=
    Gt(SourceLocation),      // >
    Ge(SourceLocation),      // >=

    // Logical
    AndAnd(SourceLocation),           // &&
    OrOr(SourceLocation),             // ||
    QuestionQuestion(SourceLocation), // ??
    Bang(SourceLocation),             // !

    // Assignment
    Eq(SourceLocation),        // =
    PlusEq(SourceLocation),    // +=
    MinusEq(SourceLocation),   // -=
    StarEq(SourceLocation),    // *=
    SlashEq(SourceLocation),   // /=
    PercentEq(SourceLocation), // %=

    // Increment/Decrement
    PlusPlus(SourceLocation),   // ++
    MinusMinus(SourceLocation), // --

    // Arrow
    Arrow(SourceLocation), // =>

    // Punctuation
    Dot(SourceLocation),       // .
    Comma(SourceLocation),     // ,
    Semicolon(SourceLocation), // ;
    Colon(SourceLocation),     // :
    Question(SourceLocation),  // ?
    LParen(SourceLocation),    // (
    RParen(SourceLocation),    // )
    LBrace(SourceLocation),    // {
    RBrace(SourceLocation),    // }
    LBracket(SourceLocation),  // [
    RBracket(SourceLocation),  // ]

    // End of file
    Eof(SourceLocation),
}

impl Token {
    /// Returns the source location where this token appears.
    pub fn location(&self) -> SourceLocation {
        match self {
            Token::Number(_, loc)
            | Token::Str(_, loc)
            | Token::Ident(_, loc)
            | Token::Let(loc)
            | Token::Const(loc)
            | Token::Var(loc)
            | Token::Function(loc)
            | Token::Return(loc)
            | Token::If(loc)
            | Token::Else(loc)
            | Token::While(loc)
            | Token::Do(loc)
            | Token::For(loc)
            | Token::Break(loc)
            | Token::Continue(loc)
            | Token::True(loc)
            | Token::False(loc)
            | Token::Null(loc)
            | Token::Typeof(loc)
            | Token::New(loc)
            | Token::This(loc)
            | Token::Plus(loc)
            | Token::Minus(loc)
            | Token::Star(loc)
            | Token::Slash(loc)
            | Token::Percent(loc)
            | Token::StarStar(loc)
            | Token::EqEq(loc)
            | Token::EqEqEq(loc)
            | Token::NotEq(loc)
            | Token::NotEqEq(loc)
            | Token::Lt(loc)
            | Token::Le(loc)
            | Token::Gt(loc)
            | Token::Ge(loc)
            | Token::AndAnd(loc)
            | Token::OrOr(loc)
            | Token::QuestionQuestion(loc)
            | Token::Bang(loc)
            | Token::Eq(loc)
            | Token::PlusEq(loc)
            | Token::MinusEq(loc)
            | Token::StarEq(loc)
            | Token::SlashEq(loc)
            | Token::PercentEq(loc)
            | Token::PlusPlus(loc)
            | Token::MinusMinus(loc)
            | Token::Arrow(loc)
            | Token::Dot(loc)
            | Token::Comma(loc)
            | Token::Semicolon(loc)
            | Token::Colon(loc)
            | Token::Question(loc)
            | Token::LParen(loc)
            | Token::RParen(loc)
            | Token::LBrace(loc)
            | Token::RBrace(loc)
            | Token::LBracket(loc)
            | Token::RBracket(loc)
            | Token::Eof(loc) => *loc,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n, _) => write!(f, "number {}", n),
            Token::Str(s, _) => write!(f, "string '{}'", s),
            Token::Ident(s, _) => write!(f, "identifier '{}'", s),
            Token::Let(_) => write!(f, "'let'"),
            Token::Const(_) => write!(f, "'const'"),
            Token::Var(_) => write!(f, "'var'"),
            Token::Function(_) => write!(f, "'function'"),
            Token::Return(_) => write!(f, "'return'"),
            Token::If(_) => write!(f, "'if'"),
            Token::Else(_) => write!(f, "'else'"),
            Token::While(_) => write!(f, "'while'"),
            Token::Do(_) => write!(f, "'do'"),
            Token::For(_) => write!(f, "'for'"),
            Token::Break(_) => write!(f, "'break'"),
            Token::Continue(_) => write!(f, "'continue'"),
            Token::True(_) => write!(f, "'true'"),
            Token::False(_) => write!(f, "'false'"),
            Token::Null(_) => write!(f, "'null'"),
            Token::Typeof(_) => write!(f, "'typeof'"),
            Token::New(_) => write!(f, "'new'"),
            Token::This(_) => write!(f, "'this'"),
            Token::Plus(_) => write!(f, "'+'"),
            Token::Minus(_) => write!(f, "'-'"),
            Token::Star(_) => write!(f, "'*'"),
            Token::Slash(_) => write!(f, "'/'"),
            Token::Percent(_) => write!(f, "'%'"),
            Token::StarStar(_) => write!(f, "'**'"),
            Token::EqEq(_) => write!(f, "'=='"),
            Token::EqEqEq(_) => write!(f, "'==='"),
            Token::NotEq(_) => write!(f, "'!='"),
            Token::NotEqEq(_) => write!(f, "'!=='"),
            Token::Lt(_) => write!(f, "'<'"),
            Token::Le(_) => write!(f, "'<='"),
            Token::Gt(_) => write!(f, "'>'"),
            Token::Ge(_) => write!(f, "'>='"),
            Token::AndAnd(_) => write!(f, "'&&'"),
            Token::OrOr(_) => write!(f, "'||'"),
            Token::QuestionQuestion(_) => write!(f, "'??'"),
            Token::Bang(_) => write!(f, "'!'"),
            Token::Eq(_) => write!(f, "'='"),
            Token::PlusEq(_) => write!(f, "'+='"),
            Token::MinusEq(_) => write!(f, "'-='"),
            Token::StarEq(_) => write!(f, "'*='"),
            Token::SlashEq(_) => write!(f, "'/='"),
            Token::PercentEq(_) => write!(f, "'%='"),
            Token::PlusPlus(_) => write!(f, "'++'"),
            Token::MinusMinus(_) => write!(f, "'--'"),
            Token::Arrow(_) => write!(f, "'=>'"),
            Token::Dot(_) => write!(f, "'.'"),
            Token::Comma(_) => write!(f, "','"),
            Token::Semicolon(_) => write!(f, "';'"),
            Token::Colon(_) => write!(f, "':'"),
            Token::Question(_) => write!(f, "'?'"),
            Token::LParen(_) => write!(f, "'('"),
            Token::RParen(_) => write!(f, "')'"),
            Token::LBrace(_) => write!(f, "'{{'"),
            Token::RBrace(_) => write!(f, "'}}'"),
            Token::LBracket(_) => write!(f, "'['"),
            Token::RBracket(_) => write!(f, "']'"),
            Token::Eof(_) => write!(f, "end of input"),
        }
    }
}

/// Lexing error with location
#[derive(Debug, Clone)]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

/// Hand-written lexer over a character buffer
pub struct Lexer {
    chars: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            chars: source.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the entire source, appending a final [`Token::Eof`]
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace_and_comments()?;
            let loc = self.location();
            let c = match self.peek() {
                Some(c) => c,
                None => {
                    tokens.push(Token::Eof(loc));
                    return Ok(tokens);
                }
            };

            let token = if c.is_ascii_digit() {
                self.lex_number(loc)?
            } else if c == '"' || c == '\'' || c == '`' {
                self.lex_string(loc)?
            } else if c.is_alphabetic() || c == '_' || c == '$' {
                self.lex_ident_or_keyword(loc)
            } else {
                self.lex_operator(loc)?
            };
            tokens.push(token);
        }
    }

    fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.position + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    let loc = self.location();
                    self.advance();
                    self.advance();
                    loop {
                        match self.peek() {
                            Some('*') if self.peek_at(1) == Some('/') => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            Some(_) => {
                                self.advance();
                            }
                            None => {
                                return Err(LexError {
                                    message: "Unterminated block comment".to_string(),
                                    location: loc,
                                });
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn lex_number(&mut self, loc: SourceLocation) -> Result<Token, LexError> {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            text.push('.');
            self.advance();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    text.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let mut lookahead = 1;
            if matches!(self.peek_at(1), Some('+') | Some('-')) {
                lookahead = 2;
            }
            if self.peek_at(lookahead).is_some_and(|c| c.is_ascii_digit()) {
                for _ in 0..lookahead {
                    if let Some(c) = self.advance() {
                        text.push(c);
                    }
                }
                while let Some(c) = self.peek() {
                    if c.is_ascii_digit() {
                        text.push(c);
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
        }

        let value: f64 = text.parse().map_err(|_| LexError {
            message: format!("Invalid number literal '{}'", text),
            location: loc,
        })?;
        Ok(Token::Number(value, loc))
    }

    fn lex_string(&mut self, loc: SourceLocation) -> Result<Token, LexError> {
        let quote = self.advance().unwrap_or('"');
        let mut text = String::new();

        loop {
            match self.peek() {
                None => {
                    return Err(LexError {
                        message: "Unterminated string literal".to_string(),
                        location: loc,
                    });
                }
                Some(c) if c == quote => {
                    self.advance();
                    return Ok(Token::Str(text, loc));
                }
                Some('$') if quote == '`' && self.peek_at(1) == Some('{') => {
                    return Err(LexError {
                        message: "Template literal substitution (${…}) is not supported"
                            .to_string(),
                        location: self.location(),
                    });
                }
                Some('\n') if quote != '`' => {
                    return Err(LexError {
                        message: "Unterminated string literal".to_string(),
                        location: loc,
                    });
                }
                Some('\\') => {
                    self.advance();
                    let escaped = self.advance().ok_or_else(|| LexError {
                        message: "Unterminated string literal".to_string(),
                        location: loc,
                    })?;
                    match escaped {
                        'n' => text.push('\n'),
                        't' => text.push('\t'),
                        'r' => text.push('\r'),
                        '0' => text.push('\0'),
                        other => text.push(other),
                    }
                }
                Some(c) => {
                    text.push(c);
                    self.advance();
                }
            }
        }
    }

    fn lex_ident_or_keyword(&mut self, loc: SourceLocation) -> Token {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }

        match name.as_str() {
            "let" => Token::Let(loc),
            "const" => Token::Const(loc),
            "var" => Token::Var(loc),
            "function" => Token::Function(loc),
            "return" => Token::Return(loc),
            "if" => Token::If(loc),
            "else" => Token::Else(loc),
            "while" => Token::While(loc),
            "do" => Token::Do(loc),
            "for" => Token::For(loc),
            "break" => Token::Break(loc),
            "continue" => Token::Continue(loc),
            "true" => Token::True(loc),
            "false" => Token::False(loc),
            "null" => Token::Null(loc),
            "typeof" => Token::Typeof(loc),
            "new" => Token::New(loc),
            "this" => Token::This(loc),
            _ => Token::Ident(name, loc),
        }
    }

    fn lex_operator(&mut self, loc: SourceLocation) -> Result<Token, LexError> {
        let c = self.advance().ok_or_else(|| LexError {
            message: "Unexpected end of input".to_string(),
            location: loc,
        })?;

        let token = match c {
            '+' => match self.peek() {
                Some('+') => {
                    self.advance();
                    Token::PlusPlus(loc)
                }
                Some('=') => {
                    self.advance();
                    Token::PlusEq(loc)
                }
                _ => Token::Plus(loc),
            },
            '-' => match self.peek() {
                Some('-') => {
                    self.advance();
                    Token::MinusMinus(loc)
                }
                Some('=') => {
                    self.advance();
                    Token::MinusEq(loc)
                }
                _ => Token::Minus(loc),
            },
            '*' => match self.peek() {
                Some('*') => {
                    self.advance();
                    Token::StarStar(loc)
                }
                Some('=') => {
                    self.advance();
                    Token::StarEq(loc)
                }
                _ => Token::Star(loc),
            },
            '/' => match self.peek() {
                Some('=') => {
                    self.advance();
                    Token::SlashEq(loc)
                }
                _ => Token::Slash(loc),
            },
            '%' => match self.peek() {
                Some('=') => {
                    self.advance();
                    Token::PercentEq(loc)
                }
                _ => Token::Percent(loc),
            },
            '=' => match self.peek() {
                Some('>') => {
                    self.advance();
                    Token::Arrow(loc)
                }
                Some('=') => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        Token::EqEqEq(loc)
                    } else {
                        Token::EqEq(loc)
                    }
                }
                _ => Token::Eq(loc),
            },
            '!' => match self.peek() {
                Some('=') => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        Token::NotEqEq(loc)
                    } else {
                        Token::NotEq(loc)
                    }
                }
                _ => Token::Bang(loc),
            },
            '<' => match self.peek() {
                Some('=') => {
                    self.advance();
                    Token::Le(loc)
                }
                _ => Token::Lt(loc),
            },
            '>' => match self.peek() {
                Some('=') => {
                    self.advance();
                    Token::Ge(loc)
                }
                _ => Token::Gt(loc),
            },
            '&' => match self.peek() {
                Some('&') => {
                    self.advance();
                    Token::AndAnd(loc)
                }
                _ => {
                    return Err(LexError {
                        message: "Bitwise '&' is not supported".to_string(),
                        location: loc,
                    });
                }
            },
            '|' => match self.peek() {
                Some('|') => {
                    self.advance();
                    Token::OrOr(loc)
                }
                _ => {
                    return Err(LexError {
                        message: "Bitwise '|' is not supported".to_string(),
                        location: loc,
                    });
                }
            },
            '?' => match self.peek() {
                Some('?') => {
                    self.advance();
                    Token::QuestionQuestion(loc)
                }
                _ => Token::Question(loc),
            },
            '.' => Token::Dot(loc),
            ',' => Token::Comma(loc),
            ';' => Token::Semicolon(loc),
            ':' => Token::Colon(loc),
            '(' => Token::LParen(loc),
            ')' => Token::RParen(loc),
            '{' => Token::LBrace(loc),
            '}' => Token::RBrace(loc),
            '[' => Token::LBracket(loc),
            ']' => Token::RBracket(loc),
            other => {
                return Err(LexError {
                    message: format!("Unexpected character '{}'", other),
                    location: loc,
                });
            }
        };
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        Lexer::new(source).tokenize().expect("lex failed")
    }

    #[test]
    fn test_lex_numbers() {
        let tokens = kinds("1 2.5 1e3");
        assert!(matches!(tokens[0], Token::Number(n, _) if n == 1.0));
        assert!(matches!(tokens[1], Token::Number(n, _) if n == 2.5));
        assert!(matches!(tokens[2], Token::Number(n, _) if n == 1000.0));
    }

    #[test]
    fn test_lex_strings_and_escapes() {
        let tokens = kinds(r#"'a' "b\n" `c`"#);
        assert!(matches!(&tokens[0], Token::Str(s, _) if s == "a"));
        assert!(matches!(&tokens[1], Token::Str(s, _) if s == "b\n"));
        assert!(matches!(&tokens[2], Token::Str(s, _) if s == "c"));
    }

    #[test]
    fn test_lex_arrow_and_equality() {
        let tokens = kinds("=> === == = !==");
        assert!(matches!(tokens[0], Token::Arrow(_)));
        assert!(matches!(tokens[1], Token::EqEqEq(_)));
        assert!(matches!(tokens[2], Token::EqEq(_)));
        assert!(matches!(tokens[3], Token::Eq(_)));
        assert!(matches!(tokens[4], Token::NotEqEq(_)));
    }

    #[test]
    fn test_lex_comments_skipped() {
        let tokens = kinds("1 // line\n/* block */ 2");
        assert!(matches!(tokens[0], Token::Number(n, _) if n == 1.0));
        assert!(matches!(tokens[1], Token::Number(n, _) if n == 2.0));
        assert!(matches!(tokens[2], Token::Eof(_)));
    }

    #[test]
    fn test_lex_unterminated_string() {
        let result = Lexer::new("'abc").tokenize();
        assert!(result.is_err());
    }

    #[test]
    fn test_lex_template_substitution_rejected() {
        let result = Lexer::new("`a${b}`").tokenize();
        assert!(result.is_err());
    }

    #[test]
    fn test_lex_locations() {
        let tokens = kinds("a\n  b");
        assert_eq!(tokens[0].location(), SourceLocation::new(1, 1));
        assert_eq!(tokens[1].location(), SourceLocation::new(2, 3));
    }
}

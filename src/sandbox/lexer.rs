//! Tokenizer for the builder-script dialect.
//!
//! The dialect is the small JavaScript subset the code-generation prompt
//! instructs the model to emit: literals, identifiers, arithmetic and
//! comparison operators, and template strings. Template substitutions are
//! captured as raw source and parsed later.

use std::fmt;

/// A token with the 1-based source line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub tok: Tok,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Num(f64),
    Str(String),
    Template(Vec<TplPart>),
    Ident(String),

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semi,
    Dot,
    Colon,
    Question,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,

    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,

    EqEq,
    NotEq,
    Lt,
    Gt,
    Le,
    Ge,

    AndAnd,
    OrOr,
    Not,
}

/// One segment of a template string: literal text or a raw `${...}`
/// substitution source.
#[derive(Debug, Clone, PartialEq)]
pub enum TplPart {
    Lit(String),
    Expr(String),
}

impl fmt::Display for Tok {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tok::Num(n) => write!(f, "{n}"),
            Tok::Str(_) => write!(f, "string"),
            Tok::Template(_) => write!(f, "template string"),
            Tok::Ident(name) => write!(f, "{name}"),
            Tok::LParen => write!(f, "("),
            Tok::RParen => write!(f, ")"),
            Tok::LBrace => write!(f, "{{"),
            Tok::RBrace => write!(f, "}}"),
            Tok::LBracket => write!(f, "["),
            Tok::RBracket => write!(f, "]"),
            Tok::Comma => write!(f, ","),
            Tok::Semi => write!(f, ";"),
            Tok::Dot => write!(f, "."),
            Tok::Colon => write!(f, ":"),
            Tok::Question => write!(f, "?"),
            Tok::Plus => write!(f, "+"),
            Tok::Minus => write!(f, "-"),
            Tok::Star => write!(f, "*"),
            Tok::Slash => write!(f, "/"),
            Tok::Percent => write!(f, "%"),
            Tok::PlusPlus => write!(f, "++"),
            Tok::MinusMinus => write!(f, "--"),
            Tok::Assign => write!(f, "="),
            Tok::PlusAssign => write!(f, "+="),
            Tok::MinusAssign => write!(f, "-="),
            Tok::StarAssign => write!(f, "*="),
            Tok::SlashAssign => write!(f, "/="),
            Tok::EqEq => write!(f, "=="),
            Tok::NotEq => write!(f, "!="),
            Tok::Lt => write!(f, "<"),
            Tok::Gt => write!(f, ">"),
            Tok::Le => write!(f, "<="),
            Tok::Ge => write!(f, ">="),
            Tok::AndAnd => write!(f, "&&"),
            Tok::OrOr => write!(f, "||"),
            Tok::Not => write!(f, "!"),
        }
    }
}

pub fn lex(source: &str) -> Result<Vec<Token>, String> {
    Lexer::new(source).run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(c) = c {
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
            }
        }
        c
    }

    fn err(&self, msg: impl Into<String>) -> String {
        format!("line {}: {}", self.line, msg.into())
    }

    fn run(mut self) -> Result<Vec<Token>, String> {
        let mut tokens = Vec::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
                continue;
            }
            // Comments
            if c == '/' && self.peek2() == Some('/') {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
                continue;
            }
            if c == '/' && self.peek2() == Some('*') {
                self.bump();
                self.bump();
                loop {
                    match self.bump() {
                        Some('*') if self.peek() == Some('/') => {
                            self.bump();
                            break;
                        }
                        Some(_) => {}
                        None => return Err(self.err("unterminated block comment")),
                    }
                }
                continue;
            }

            let line = self.line;
            let tok = if c.is_ascii_digit() {
                self.number()?
            } else if c == '"' || c == '\'' {
                self.string(c)?
            } else if c == '`' {
                self.template()?
            } else if c == '_' || c == '$' || c.is_alphabetic() {
                self.ident()
            } else {
                self.punct()?
            };
            tokens.push(Token { tok, line });
        }
        Ok(tokens)
    }

    fn number(&mut self) -> Result<Tok, String> {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '.' {
                text.push(c);
                self.bump();
            } else if (c == 'e' || c == 'E')
                && text
                    .chars()
                    .last()
                    .is_some_and(|p| p.is_ascii_digit())
            {
                text.push(c);
                self.bump();
                if matches!(self.peek(), Some('+') | Some('-')) {
                    text.push(self.bump().unwrap());
                }
            } else {
                break;
            }
        }
        text.parse::<f64>()
            .map(Tok::Num)
            .map_err(|_| self.err(format!("invalid number literal '{text}'")))
    }

    fn string(&mut self, quote: char) -> Result<Tok, String> {
        self.bump(); // opening quote
        let mut text = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(Tok::Str(text)),
                Some('\\') => match self.bump() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some('r') => text.push('\r'),
                    Some(c) => text.push(c),
                    None => return Err(self.err("unterminated string")),
                },
                Some('\n') => return Err(self.err("unterminated string")),
                Some(c) => text.push(c),
                None => return Err(self.err("unterminated string")),
            }
        }
    }

    /// Backtick template string. `${...}` substitutions are captured as
    /// raw source text; the parser lexes and parses them recursively.
    fn template(&mut self) -> Result<Tok, String> {
        self.bump(); // opening backtick
        let mut parts = Vec::new();
        let mut lit = String::new();
        loop {
            match self.bump() {
                Some('`') => {
                    if !lit.is_empty() {
                        parts.push(TplPart::Lit(lit));
                    }
                    return Ok(Tok::Template(parts));
                }
                Some('\\') => match self.bump() {
                    Some('n') => lit.push('\n'),
                    Some('t') => lit.push('\t'),
                    Some(c) => lit.push(c),
                    None => return Err(self.err("unterminated template string")),
                },
                Some('$') if self.peek() == Some('{') => {
                    self.bump(); // '{'
                    if !lit.is_empty() {
                        parts.push(TplPart::Lit(std::mem::take(&mut lit)));
                    }
                    let mut depth = 1usize;
                    let mut expr = String::new();
                    loop {
                        match self.bump() {
                            Some('{') => {
                                depth += 1;
                                expr.push('{');
                            }
                            Some('}') => {
                                depth -= 1;
                                if depth == 0 {
                                    break;
                                }
                                expr.push('}');
                            }
                            Some(c) => expr.push(c),
                            None => {
                                return Err(self.err("unterminated template substitution"))
                            }
                        }
                    }
                    parts.push(TplPart::Expr(expr));
                }
                Some(c) => lit.push(c),
                None => return Err(self.err("unterminated template string")),
            }
        }
    }

    fn ident(&mut self) -> Tok {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c == '_' || c == '$' || c.is_alphanumeric() {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        Tok::Ident(text)
    }

    fn punct(&mut self) -> Result<Tok, String> {
        let c = self.bump().unwrap();
        let tok = match c {
            '(' => Tok::LParen,
            ')' => Tok::RParen,
            '{' => Tok::LBrace,
            '}' => Tok::RBrace,
            '[' => Tok::LBracket,
            ']' => Tok::RBracket,
            ',' => Tok::Comma,
            ';' => Tok::Semi,
            '.' => Tok::Dot,
            ':' => Tok::Colon,
            '?' => Tok::Question,
            '%' => Tok::Percent,
            '+' => match self.peek() {
                Some('+') => {
                    self.bump();
                    Tok::PlusPlus
                }
                Some('=') => {
                    self.bump();
                    Tok::PlusAssign
                }
                _ => Tok::Plus,
            },
            '-' => match self.peek() {
                Some('-') => {
                    self.bump();
                    Tok::MinusMinus
                }
                Some('=') => {
                    self.bump();
                    Tok::MinusAssign
                }
                _ => Tok::Minus,
            },
            '*' => match self.peek() {
                Some('=') => {
                    self.bump();
                    Tok::StarAssign
                }
                _ => Tok::Star,
            },
            '/' => match self.peek() {
                Some('=') => {
                    self.bump();
                    Tok::SlashAssign
                }
                _ => Tok::Slash,
            },
            '=' => match self.peek() {
                Some('=') => {
                    self.bump();
                    // `===` and `==` behave identically in this dialect
                    if self.peek() == Some('=') {
                        self.bump();
                    }
                    Tok::EqEq
                }
                _ => Tok::Assign,
            },
            '!' => match self.peek() {
                Some('=') => {
                    self.bump();
                    if self.peek() == Some('=') {
                        self.bump();
                    }
                    Tok::NotEq
                }
                _ => Tok::Not,
            },
            '<' => match self.peek() {
                Some('=') => {
                    self.bump();
                    Tok::Le
                }
                _ => Tok::Lt,
            },
            '>' => match self.peek() {
                Some('=') => {
                    self.bump();
                    Tok::Ge
                }
                _ => Tok::Gt,
            },
            '&' => match self.peek() {
                Some('&') => {
                    self.bump();
                    Tok::AndAnd
                }
                _ => return Err(self.err("unexpected character '&'")),
            },
            '|' => match self.peek() {
                Some('|') => {
                    self.bump();
                    Tok::OrOr
                }
                _ => return Err(self.err("unexpected character '|'")),
            },
            other => return Err(self.err(format!("unexpected character '{other}'"))),
        };
        Ok(tok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(src: &str) -> Vec<Tok> {
        lex(src).unwrap().into_iter().map(|t| t.tok).collect()
    }

    #[test]
    fn test_builder_call_line() {
        let t = toks("builder.addPart('3001', 4, 0, -8, 0);");
        assert_eq!(t[0], Tok::Ident("builder".into()));
        assert_eq!(t[1], Tok::Dot);
        assert_eq!(t[2], Tok::Ident("addPart".into()));
        assert_eq!(t[3], Tok::LParen);
        assert_eq!(t[4], Tok::Str("3001".into()));
        assert!(t.contains(&Tok::Minus));
        assert_eq!(*t.last().unwrap(), Tok::Semi);
    }

    #[test]
    fn test_comments_skipped() {
        let t = toks("1 // comment\n/* block\ncomment */ 2");
        assert_eq!(t, vec![Tok::Num(1.0), Tok::Num(2.0)]);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(toks("1.5"), vec![Tok::Num(1.5)]);
        assert_eq!(toks("2e3"), vec![Tok::Num(2000.0)]);
        // Negative numbers are unary minus + literal
        assert_eq!(toks("-8"), vec![Tok::Minus, Tok::Num(8.0)]);
    }

    #[test]
    fn test_strict_equality_collapses() {
        assert_eq!(toks("a === b"), toks("a == b"));
        assert_eq!(toks("a !== b"), toks("a != b"));
    }

    #[test]
    fn test_increment_and_compound_assign() {
        assert_eq!(
            toks("i++; i += 20"),
            vec![
                Tok::Ident("i".into()),
                Tok::PlusPlus,
                Tok::Semi,
                Tok::Ident("i".into()),
                Tok::PlusAssign,
                Tok::Num(20.0),
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(toks(r#""a\nb""#), vec![Tok::Str("a\nb".into())]);
        assert_eq!(toks(r#"'it\'s'"#), vec![Tok::Str("it's".into())]);
    }

    #[test]
    fn test_template_parts() {
        let t = toks("`x = ${x + 1}!`");
        assert_eq!(
            t,
            vec![Tok::Template(vec![
                TplPart::Lit("x = ".into()),
                TplPart::Expr("x + 1".into()),
                TplPart::Lit("!".into()),
            ])]
        );
    }

    #[test]
    fn test_template_nested_braces() {
        let t = toks("`${ {a: 1}.a }`");
        assert_eq!(
            t,
            vec![Tok::Template(vec![TplPart::Expr(" {a: 1}.a ".into())])]
        );
    }

    #[test]
    fn test_line_numbers() {
        let tokens = lex("a\nb\nc").unwrap();
        let lines: Vec<u32> = tokens.iter().map(|t| t.line).collect();
        assert_eq!(lines, vec![1, 2, 3]);
    }

    #[test]
    fn test_unterminated_string_errors() {
        assert!(lex("'abc").is_err());
        assert!(lex("`abc").is_err());
        assert!(lex("\"abc\ndef\"").is_err());
    }

    #[test]
    fn test_unexpected_character_errors() {
        let err = lex("a # b").unwrap_err();
        assert!(err.contains("unexpected character"));
    }
}

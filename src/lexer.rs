//! Lexical analysis for stylesheet source code

use crate::error::{CompilerError, Result};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenType {
    // Punctuation
    LeftBrace,  // {
    RightBrace, // }
    Colon,      // :
    Semicolon,  // ;
    Comma,      // ,

    /// `@name`, stored without the `@`
    AtKeyword(String),
    /// `name(...)` with the verbatim argument text
    Function { name: String, arguments: String },
    /// `(...)` not preceded by a name, e.g. media features
    Parenthesized(String),
    /// `!important`
    Important,
    /// Identifiers, numbers, dimensions, colors, strings, combinators
    Word(String),
    /// `/* ... */` including delimiters
    Comment(String),

    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub line: usize,
    pub column: usize,
    /// Whitespace or a comment separated this token from the previous one.
    pub preceded_by_space: bool,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::LeftBrace => write!(f, "{{"),
            TokenType::RightBrace => write!(f, "}}"),
            TokenType::Colon => write!(f, ":"),
            TokenType::Semicolon => write!(f, ";"),
            TokenType::Comma => write!(f, ","),
            TokenType::AtKeyword(name) => write!(f, "@{}", name),
            TokenType::Function { name, arguments } => write!(f, "{}({})", name, arguments),
            TokenType::Parenthesized(inner) => write!(f, "({})", inner),
            TokenType::Important => write!(f, "!important"),
            TokenType::Word(word) => write!(f, "{}", word),
            TokenType::Comment(text) => write!(f, "{}", text),
            TokenType::Eof => write!(f, "EOF"),
        }
    }
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    filename: String,
}

impl Lexer {
    pub fn new(input: &str, filename: impl Into<String>) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            filename: filename.into(),
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        let mut after_comment = false;
        loop {
            let preceded_by_space = self.skip_whitespace() || after_comment;
            if self.is_at_end() {
                break;
            }
            let token = self.next_token(preceded_by_space)?;
            after_comment = matches!(token.token_type, TokenType::Comment(_));
            tokens.push(token);
        }

        tokens.push(Token {
            token_type: TokenType::Eof,
            line: self.line,
            column: self.column,
            preceded_by_space: true,
        });

        log::trace!("Tokenized {} tokens from {}", tokens.len(), self.filename);
        Ok(tokens)
    }

    fn next_token(&mut self, preceded_by_space: bool) -> Result<Token> {
        let start_line = self.line;
        let start_column = self.column;
        let ch = self.advance();

        let token_type = match ch {
            '{' => TokenType::LeftBrace,
            '}' => TokenType::RightBrace,
            ':' => TokenType::Colon,
            ';' => TokenType::Semicolon,
            ',' => TokenType::Comma,
            '/' if self.peek() == Some('*') => {
                self.advance();
                TokenType::Comment(self.read_comment()?)
            }
            '(' => TokenType::Parenthesized(self.read_balanced(')')?),
            '!' => self.read_important()?,
            '@' => {
                let name = self.read_word_chars(String::new());
                if name.is_empty() {
                    return Err(self.error("Expected at-rule name after '@'"));
                }
                TokenType::AtKeyword(name)
            }
            '"' | '\'' => TokenType::Word(self.read_string(ch)?),
            '[' => {
                let inner = self.read_balanced(']')?;
                TokenType::Word(format!("[{}]", inner))
            }
            _ => {
                let word = self.read_word_chars(ch.to_string());
                if self.peek() == Some('(') {
                    self.advance();
                    let arguments = self.read_balanced(')')?;
                    TokenType::Function {
                        name: word,
                        arguments: arguments.trim().to_string(),
                    }
                } else {
                    TokenType::Word(word)
                }
            }
        };

        Ok(Token {
            token_type,
            line: start_line,
            column: start_column,
            preceded_by_space,
        })
    }

    /// Returns true if anything was skipped.
    fn skip_whitespace(&mut self) -> bool {
        let mut skipped = false;
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
                skipped = true;
            } else {
                break;
            }
        }
        skipped
    }

    fn advance(&mut self) -> char {
        if self.position < self.input.len() {
            let ch = self.input[self.position];
            self.position += 1;
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            ch
        } else {
            '\0'
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn error(&self, message: impl Into<String>) -> CompilerError {
        CompilerError::parse(self.filename.clone(), self.line, self.column, message)
    }

    fn is_word_char(ch: char) -> bool {
        !ch.is_whitespace() && !matches!(ch, '{' | '}' | ':' | ';' | ',' | '(' | ')' | '"' | '\'' | '!' | '[')
    }

    fn read_word_chars(&mut self, mut word: String) -> String {
        while let Some(ch) = self.peek() {
            if ch == '/' && self.peek_next() == Some('*') {
                break;
            }
            if !Self::is_word_char(ch) {
                break;
            }
            word.push(ch);
            self.advance();
        }
        word
    }

    fn read_comment(&mut self) -> Result<String> {
        let mut text = String::from("/*");
        while !self.is_at_end() {
            let ch = self.advance();
            text.push(ch);
            if ch == '*' && self.peek() == Some('/') {
                self.advance();
                text.push('/');
                return Ok(text);
            }
        }
        Err(self.error("Unterminated comment"))
    }

    /// Reads up to the matching `close`, which is consumed but not returned.
    fn read_balanced(&mut self, close: char) -> Result<String> {
        let open = if close == ')' { '(' } else { '[' };
        let mut depth = 0usize;
        let mut text = String::new();

        while !self.is_at_end() {
            let ch = self.advance();
            match ch {
                '"' | '\'' => {
                    let quoted = self.read_string(ch)?;
                    text.push_str(&quoted);
                    continue;
                }
                c if c == open => depth += 1,
                c if c == close => {
                    if depth == 0 {
                        return Ok(text);
                    }
                    depth -= 1;
                }
                _ => {}
            }
            text.push(ch);
        }

        Err(self.error(format!("Expected '{}' before end of input", close)))
    }

    /// Reads a quoted string, returning it with its quotes.
    fn read_string(&mut self, quote: char) -> Result<String> {
        let mut value = String::new();
        value.push(quote);

        while !self.is_at_end() {
            let ch = self.advance();
            value.push(ch);
            if ch == '\\' {
                if !self.is_at_end() {
                    value.push(self.advance());
                }
            } else if ch == quote {
                return Ok(value);
            } else if ch == '\n' {
                break;
            }
        }

        Err(self.error("Unterminated string literal"))
    }

    fn read_important(&mut self) -> Result<TokenType> {
        self.skip_whitespace();
        let word = self.read_word_chars(String::new());
        if word.eq_ignore_ascii_case("important") {
            Ok(TokenType::Important)
        } else {
            Err(self.error(format!("Expected 'important' after '!', found '{}'", word)))
        }
    }
}

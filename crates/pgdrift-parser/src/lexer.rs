//! DDL lexer
//!
//! A single forward pass over the source producing tokens on demand.
//! Whitespace, `-- ...` line comments, and `/* ... */` block comments are
//! skipped. An unterminated quoted identifier or string literal yields an
//! error token with a message and sets the error flag, but lexing
//! continues so the parser can keep collecting diagnostics.
//!
//! The lexer also exposes raw-capture helpers the parser uses for
//! expression text: defaults, check predicates, and generated expressions
//! are carried verbatim, so they are sliced straight out of the source
//! with a parenthesis-depth counter instead of being tokenized.

use crate::keyword::{Keyword, lookup_keyword};

/// Token kinds produced by the lexer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Unquoted identifier that is not a keyword
    Identifier,
    /// `"..."` quoted identifier, quotes and escapes removed
    QuotedIdentifier,
    /// `'...'` string literal, quotes and escapes removed
    StringLiteral,
    Number,
    Keyword(Keyword),
    LParen,
    RParen,
    Comma,
    Semicolon,
    Dot,
    Equals,
    LBracket,
    RBracket,
    /// `::` cast marker
    DoubleColon,
    Eof,
    /// Lexical error, the token text carries the message
    Error,
}

/// A token with its decoded text and source position
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    /// Decoded text: identifier name, string content, number lexeme, or
    /// the keyword as written
    pub text: String,
    /// Byte offset of the first character in the source
    pub start: usize,
    /// 1-based line of the first character
    pub line: usize,
    /// 1-based column of the first character
    pub column: usize,
}

impl Token {
    /// True when this token is the given keyword
    pub fn is_keyword(&self, kw: Keyword) -> bool {
        self.kind == TokenKind::Keyword(kw)
    }
}

/// Hand-written tokenizer over a DDL source string
pub struct Lexer<'a> {
    source: &'a str,
    position: usize,
    line: usize,
    column: usize,
    had_error: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            position: 0,
            line: 1,
            column: 1,
            had_error: false,
        }
    }

    /// True once any lexical error has been produced
    pub fn had_error(&self) -> bool {
        self.had_error
    }

    /// The full source this lexer reads from
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Produces the next token
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        let start = self.position;
        let line = self.line;
        let column = self.column;

        if self.is_eof() {
            return self.token(TokenKind::Eof, String::new(), start, line, column);
        }

        let ch = self.current_char();
        match ch {
            '(' => self.punct(TokenKind::LParen, start, line, column),
            ')' => self.punct(TokenKind::RParen, start, line, column),
            ',' => self.punct(TokenKind::Comma, start, line, column),
            ';' => self.punct(TokenKind::Semicolon, start, line, column),
            '.' => self.punct(TokenKind::Dot, start, line, column),
            '=' => self.punct(TokenKind::Equals, start, line, column),
            '[' => self.punct(TokenKind::LBracket, start, line, column),
            ']' => self.punct(TokenKind::RBracket, start, line, column),
            ':' => {
                self.advance();
                if self.current_char() == ':' {
                    self.advance();
                    self.token(TokenKind::DoubleColon, "::".to_string(), start, line, column)
                } else {
                    self.error_token("unexpected character ':'", start, line, column)
                }
            }
            '"' => self.read_quoted_identifier(start, line, column),
            '\'' => self.read_string_literal(start, line, column),
            c if c.is_ascii_digit() => self.read_number(start, line, column),
            c if c.is_ascii_alphabetic() || c == '_' => self.read_word(start, line, column),
            c => {
                self.advance();
                self.error_token(&format!("unexpected character '{c}'"), start, line, column)
            }
        }
    }

    /// Moves the lexer back to the position a token was read from, so the
    /// parser can re-read source text rawly from there
    pub fn rewind_to(&mut self, token: &Token) {
        self.position = token.start;
        self.line = token.line;
        self.column = token.column;
    }

    /// Captures the verbatim text between a balanced pair of parentheses.
    ///
    /// Expects the next non-trivia character to be `(`. Consumes through
    /// the matching `)` and returns the interior, trimmed. Quoted strings
    /// and identifiers inside the expression are honored so parentheses
    /// and commas inside them do not count.
    pub fn capture_parenthesized(&mut self) -> Option<String> {
        self.skip_whitespace_and_comments();
        if self.current_char() != '(' {
            return None;
        }
        self.advance();
        let start = self.position;
        let mut depth = 1usize;
        while !self.is_eof() {
            match self.current_char() {
                '(' => {
                    depth += 1;
                    self.advance();
                }
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        let text = self.source[start..self.position].trim().to_string();
                        self.advance();
                        return Some(text);
                    }
                    self.advance();
                }
                '\'' => self.skip_quoted_raw('\''),
                '"' => self.skip_quoted_raw('"'),
                _ => self.advance(),
            }
        }
        None
    }

    /// Captures a default-style expression: raw text up to an unnested
    /// `,`, `)`, or `;`, or a bare word from `stop_words`. The first word
    /// is always taken, so `DEFAULT NULL` captures `NULL` even though
    /// `null` terminates a later position.
    pub fn capture_expression(&mut self, stop_words: &[&str]) -> String {
        self.skip_whitespace_and_comments();
        let start = self.position;
        let mut depth = 0usize;
        let mut consumed_any = false;
        while !self.is_eof() {
            let ch = self.current_char();
            match ch {
                '(' | '[' => {
                    depth += 1;
                    self.advance();
                }
                ')' if depth == 0 => break,
                ')' | ']' => {
                    depth = depth.saturating_sub(1);
                    self.advance();
                }
                ',' | ';' if depth == 0 => break,
                '\'' => self.skip_quoted_raw('\''),
                '"' => self.skip_quoted_raw('"'),
                c if (c.is_ascii_alphabetic() || c == '_') && depth == 0 => {
                    let word_start = self.position;
                    let word_column = self.column;
                    while !self.is_eof() {
                        let w = self.current_char();
                        if w.is_ascii_alphanumeric() || w == '_' {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                    let word = self.source[word_start..self.position].to_lowercase();
                    if consumed_any && stop_words.contains(&word.as_str()) {
                        self.position = word_start;
                        self.column = word_column;
                        break;
                    }
                }
                _ => self.advance(),
            }
            consumed_any = true;
        }
        self.source[start..self.position].trim().to_string()
    }

    /// Skips one bare word, used to step over a keyword before a raw
    /// capture begins
    pub fn skip_word(&mut self) {
        self.skip_whitespace_and_comments();
        while !self.is_eof() {
            let ch = self.current_char();
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn token(
        &self,
        kind: TokenKind,
        text: String,
        start: usize,
        line: usize,
        column: usize,
    ) -> Token {
        Token {
            kind,
            text,
            start,
            line,
            column,
        }
    }

    fn punct(&mut self, kind: TokenKind, start: usize, line: usize, column: usize) -> Token {
        let ch = self.current_char();
        self.advance();
        self.token(kind, ch.to_string(), start, line, column)
    }

    fn error_token(&mut self, message: &str, start: usize, line: usize, column: usize) -> Token {
        self.had_error = true;
        self.token(TokenKind::Error, message.to_string(), start, line, column)
    }

    fn read_word(&mut self, start: usize, line: usize, column: usize) -> Token {
        while !self.is_eof() {
            let ch = self.current_char();
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        let lexeme = &self.source[start..self.position];
        match lookup_keyword(&lexeme.to_lowercase()) {
            Some(kw) => self.token(TokenKind::Keyword(kw), lexeme.to_string(), start, line, column),
            None => self.token(TokenKind::Identifier, lexeme.to_string(), start, line, column),
        }
    }

    fn read_number(&mut self, start: usize, line: usize, column: usize) -> Token {
        while self.current_char().is_ascii_digit() {
            self.advance();
        }
        if self.current_char() == '.' && self.peek_char(1).is_ascii_digit() {
            self.advance();
            while self.current_char().is_ascii_digit() {
                self.advance();
            }
        }
        if matches!(self.current_char(), 'e' | 'E') {
            let mut offset = 1;
            if matches!(self.peek_char(1), '+' | '-') {
                offset = 2;
            }
            if self.peek_char(offset).is_ascii_digit() {
                for _ in 0..offset {
                    self.advance();
                }
                while self.current_char().is_ascii_digit() {
                    self.advance();
                }
            }
        }
        let lexeme = self.source[start..self.position].to_string();
        self.token(TokenKind::Number, lexeme, start, line, column)
    }

    fn read_quoted_identifier(&mut self, start: usize, line: usize, column: usize) -> Token {
        self.advance(); // opening quote
        let mut content = String::new();
        while !self.is_eof() {
            let ch = self.current_char();
            if ch == '"' {
                if self.peek_char(1) == '"' {
                    content.push('"');
                    self.advance();
                    self.advance();
                } else {
                    self.advance();
                    return self.token(
                        TokenKind::QuotedIdentifier,
                        content,
                        start,
                        line,
                        column,
                    );
                }
            } else {
                // newlines are legal inside quoted identifiers
                content.push(ch);
                self.advance();
            }
        }
        self.error_token("unterminated quoted identifier", start, line, column)
    }

    fn read_string_literal(&mut self, start: usize, line: usize, column: usize) -> Token {
        self.advance(); // opening quote
        let mut content = String::new();
        while !self.is_eof() {
            let ch = self.current_char();
            if ch == '\'' {
                if self.peek_char(1) == '\'' {
                    content.push('\'');
                    self.advance();
                    self.advance();
                } else {
                    self.advance();
                    return self.token(TokenKind::StringLiteral, content, start, line, column);
                }
            } else if ch == '\\' {
                self.advance();
                if self.is_eof() {
                    break;
                }
                content.push(self.current_char());
                self.advance();
            } else {
                content.push(ch);
                self.advance();
            }
        }
        self.error_token("unterminated string literal", start, line, column)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            let ch = self.current_char();
            if ch.is_whitespace() && ch != '\0' {
                self.advance();
            } else if ch == '-' && self.peek_char(1) == '-' {
                while !self.is_eof() && self.current_char() != '\n' {
                    self.advance();
                }
            } else if ch == '/' && self.peek_char(1) == '*' {
                self.advance();
                self.advance();
                while !self.is_eof() {
                    if self.current_char() == '*' && self.peek_char(1) == '/' {
                        self.advance();
                        self.advance();
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    /// Skips a raw quoted region during expression capture, honoring the
    /// doubled-quote escape and backslash escapes in string literals
    fn skip_quoted_raw(&mut self, quote: char) {
        self.advance(); // opening quote
        while !self.is_eof() {
            let ch = self.current_char();
            if ch == quote {
                if self.peek_char(1) == quote {
                    self.advance();
                    self.advance();
                } else {
                    self.advance();
                    return;
                }
            } else if ch == '\\' && quote == '\'' {
                self.advance();
                if !self.is_eof() {
                    self.advance();
                }
            } else {
                self.advance();
            }
        }
    }

    fn current_char(&self) -> char {
        self.source[self.position..].chars().next().unwrap_or('\0')
    }

    fn peek_char(&self, offset: usize) -> char {
        self.source[self.position..]
            .chars()
            .nth(offset)
            .unwrap_or('\0')
    }

    fn advance(&mut self) {
        if let Some(ch) = self.source[self.position..].chars().next() {
            self.position += ch.len_utf8();
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    fn is_eof(&self) -> bool {
        self.position >= self.source.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_tokens(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    #[test]
    fn test_simple_create_table() {
        let tokens = all_tokens("CREATE TABLE users (id integer);");
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Keyword(Keyword::Create),
                TokenKind::Keyword(Keyword::Table),
                TokenKind::Identifier,
                TokenKind::LParen,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::RParen,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        let tokens = all_tokens("Create TaBlE");
        assert!(tokens[0].is_keyword(Keyword::Create));
        assert!(tokens[1].is_keyword(Keyword::Table));
        assert_eq!(tokens[0].text, "Create");
    }

    #[test]
    fn test_quoted_identifier_escapes() {
        let tokens = all_tokens(r#""weird ""name""""#);
        assert_eq!(tokens[0].kind, TokenKind::QuotedIdentifier);
        assert_eq!(tokens[0].text, r#"weird "name""#);
    }

    #[test]
    fn test_string_literal_escapes() {
        let tokens = all_tokens(r"'it''s' 'a\'b'");
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].text, "it's");
        assert_eq!(tokens[1].text, "a'b");
    }

    #[test]
    fn test_numbers() {
        let tokens = all_tokens("42 3.14 1e6 2.5E-3");
        let texts: Vec<&str> = tokens[..4].iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["42", "3.14", "1e6", "2.5E-3"]);
        assert!(tokens[..4].iter().all(|t| t.kind == TokenKind::Number));
    }

    #[test]
    fn test_double_colon() {
        let tokens = all_tokens("'x'::text");
        assert_eq!(tokens[1].kind, TokenKind::DoubleColon);
        assert_eq!(tokens[2].kind, TokenKind::Identifier);
    }

    #[test]
    fn test_comments_are_skipped() {
        let tokens = all_tokens("a -- line comment\n /* block\ncomment */ b");
        assert_eq!(tokens[0].text, "a");
        assert_eq!(tokens[1].text, "b");
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn test_line_and_column_tracking() {
        let tokens = all_tokens("a\n  b");
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (2, 3));
    }

    #[test]
    fn test_unterminated_string_sets_error_flag() {
        let mut lexer = Lexer::new("'oops");
        let token = lexer.next_token();
        assert_eq!(token.kind, TokenKind::Error);
        assert!(token.text.contains("unterminated string"));
        assert!(lexer.had_error());
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
    }

    #[test]
    fn test_unexpected_character_continues() {
        let tokens = all_tokens("a ? b");
        assert_eq!(tokens[0].text, "a");
        assert_eq!(tokens[1].kind, TokenKind::Error);
        assert_eq!(tokens[2].text, "b");
    }

    #[test]
    fn test_max_length_identifier() {
        let name = "a".repeat(63);
        let tokens = all_tokens(&name);
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].text.len(), 63);
    }

    #[test]
    fn test_capture_parenthesized() {
        let mut lexer = Lexer::new("(price > 0 AND (qty, n) <> (0, ','))");
        let captured = lexer.capture_parenthesized().unwrap();
        assert_eq!(captured, "price > 0 AND (qty, n) <> (0, ',')");
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
    }

    #[test]
    fn test_capture_expression_stops_at_constraint_word() {
        let mut lexer = Lexer::new("0 NOT NULL");
        let expr = lexer.capture_expression(&["not", "null"]);
        assert_eq!(expr, "0");
        assert!(lexer.next_token().is_keyword(Keyword::Not));
    }

    #[test]
    fn test_capture_expression_takes_first_word() {
        let mut lexer = Lexer::new("NULL, next");
        let expr = lexer.capture_expression(&["not", "null"]);
        assert_eq!(expr, "NULL");
        assert_eq!(lexer.next_token().kind, TokenKind::Comma);
    }

    #[test]
    fn test_capture_expression_keeps_casts_and_calls() {
        let mut lexer = Lexer::new("'DRAFT'::review_status, other");
        let expr = lexer.capture_expression(&["not", "null"]);
        assert_eq!(expr, "'DRAFT'::review_status");

        let mut lexer = Lexer::new("now() NOT NULL");
        let expr = lexer.capture_expression(&["not", "null"]);
        assert_eq!(expr, "now()");
    }
}

// MIT License
//
// Copyright (c) 2024 The CM Programming Language
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

use crate::error::{CompileError, CompileResult};

use super::token::{TextSpan, Token, TokenKind};

#[derive(Clone, Debug)]
pub struct Lexer {
    input: Vec<u8>,
    position: usize,
    read_position: usize,
    ch: u8,
    line: usize,
    token_count: usize,
    reached_eof: bool,
}

impl Lexer {
    pub fn new(input: String) -> Lexer {
        let mut lex = Lexer {
            input: input.into_bytes(),
            position: 0,
            read_position: 0,
            ch: 0,
            line: 1,
            token_count: 0,
            reached_eof: false,
        };

        lex.read_char();

        lex
    }

    /// Returns the next meaningful token, the single terminal Eof token at
    /// end of input, and `None` on every call after that.
    pub fn next_token(&mut self) -> CompileResult<Option<Token>> {
        if self.reached_eof {
            return Ok(None);
        }

        self.skip_whitespace();

        if self.ch == 0 {
            self.reached_eof = true;
            let eof = self.make_token(TokenKind::Eof, self.position, String::new(), 0);
            return Ok(Some(eof));
        }

        let start = self.position;
        let tok = match self.ch {
            b'0'..=b'9' => {
                let num = self.read_number();
                let text = self.lexeme(start);
                self.make_token(TokenKind::NumberLiteral, start, text, num)
            }

            c if c.is_ascii_alphabetic() => {
                let text = self.read_ident();
                let kind = TokenKind::keyword(&text).unwrap_or(TokenKind::Identifier);
                self.make_token(kind, start, text, 0)
            }

            b'"' => return self.read_string().map(Some),
            b'\'' => return self.read_char_literal().map(Some),

            _ => {
                let kind = match self.ch {
                    b';' => TokenKind::Semicolon,
                    b':' => TokenKind::Colon,
                    b',' => TokenKind::Comma,
                    b'=' => TokenKind::Assign,
                    b'(' => TokenKind::Lparen,
                    b')' => TokenKind::Rparen,
                    b'{' => TokenKind::LSquirly,
                    b'}' => TokenKind::RSquirly,
                    b'[' => TokenKind::LBrack,
                    b']' => TokenKind::RBrack,
                    b'<' => TokenKind::LessThan,
                    b'>' => TokenKind::GreaterThan,
                    b'+' => TokenKind::Plus,
                    b'-' => TokenKind::Minus,
                    b'*' => TokenKind::Asterisk,
                    b'/' => TokenKind::ForwardSlash,
                    b'!' => TokenKind::Bang,
                    _ => TokenKind::None,
                };

                self.read_char();
                let text = self.lexeme(start);
                self.make_token(kind, start, text, 0)
            }
        };

        Ok(Some(tok))
    }

    fn make_token(&mut self, kind: TokenKind, pos: usize, text: String, num: i64) -> Token {
        self.token_count += 1;
        Token {
            kind,
            span: TextSpan {
                line: self.line,
                cur: self.token_count,
                text,
                pos,
            },
            num,
        }
    }

    fn lexeme(&self, start: usize) -> String {
        String::from_utf8_lossy(&self.input[start..self.position]).to_string()
    }

    fn read_char(&mut self) {
        if self.read_position >= self.input.len() {
            self.ch = 0;
        } else {
            self.ch = self.input[self.read_position];
        }

        self.position = self.read_position;
        self.read_position += 1;
    }

    fn skip_whitespace(&mut self) {
        while self.ch.is_ascii_whitespace() {
            if self.ch == b'\n' {
                self.line += 1;
            }
            self.read_char();
        }
    }

    fn read_number(&mut self) -> i64 {
        let mut num: i64 = 0;
        while self.ch.is_ascii_digit() {
            num = num * 10 + i64::from(self.ch - b'0');
            self.read_char();
        }
        num
    }

    fn read_ident(&mut self) -> String {
        let start = self.position;
        // Continuation bytes include digits so `i32` and `i64` stay whole.
        while self.ch.is_ascii_alphanumeric() {
            self.read_char();
        }
        self.lexeme(start)
    }

    /// The lexeme of a string literal excludes the enclosing quotes.
    fn read_string(&mut self) -> CompileResult<Token> {
        self.read_char();
        let start = self.position;

        while self.ch != b'"' {
            if self.ch == 0 {
                return Err(CompileError::new(
                    self.line,
                    self.token_count + 1,
                    "unterminated string literal",
                ));
            }
            if self.ch == b'\n' {
                self.line += 1;
            }
            self.read_char();
        }

        let text = self.lexeme(start);
        self.read_char();

        Ok(self.make_token(TokenKind::StringLiteral, start, text, 0))
    }

    fn read_char_literal(&mut self) -> CompileResult<Token> {
        self.read_char();
        let start = self.position;
        let byte = self.ch;

        if byte == 0 {
            return Err(CompileError::new(
                self.line,
                self.token_count + 1,
                "unterminated character literal",
            ));
        }

        self.read_char();
        if self.ch != b'\'' {
            return Err(CompileError::new(
                self.line,
                self.token_count + 1,
                "unterminated character literal",
            ));
        }

        let text = self.lexeme(start);
        self.read_char();

        Ok(self.make_token(TokenKind::CharacterLiteral, start, text, i64::from(byte)))
    }
}

#[cfg(test)]
mod test {
    use super::{Lexer, TokenKind};

    fn lex_all(input: &str) -> Vec<super::Token> {
        let mut lexer = Lexer::new(input.to_string());
        let mut tokens = vec![];
        while let Some(tok) = lexer.next_token().unwrap() {
            tokens.push(tok);
        }
        tokens
    }

    #[test]
    fn get_next_token() {
        let input = "=+(){},;";
        let kinds: Vec<TokenKind> = lex_all(input).into_iter().map(|t| t.kind).collect();

        assert_eq!(
            kinds,
            vec![
                TokenKind::Assign,
                TokenKind::Plus,
                TokenKind::Lparen,
                TokenKind::Rparen,
                TokenKind::LSquirly,
                TokenKind::RSquirly,
                TokenKind::Comma,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn get_next_complete() {
        let input = "fn main() {\n    let x: i64 = 42;\n}";
        let tokens = lex_all(input);
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();

        assert_eq!(
            kinds,
            vec![
                TokenKind::Function,
                TokenKind::Identifier,
                TokenKind::Lparen,
                TokenKind::Rparen,
                TokenKind::LSquirly,
                TokenKind::Let,
                TokenKind::Identifier,
                TokenKind::Colon,
                TokenKind::I64,
                TokenKind::Assign,
                TokenKind::NumberLiteral,
                TokenKind::Semicolon,
                TokenKind::RSquirly,
                TokenKind::Eof,
            ]
        );

        assert_eq!(tokens[1].span.text, "main");
        assert_eq!(tokens[6].span.text, "x");
        assert_eq!(tokens[6].span.line, 2);
        assert_eq!(tokens[10].num, 42);
        assert_eq!(tokens[12].span.line, 3);
    }

    #[test]
    fn spans_match_source() {
        let input = "fn f() { let abc: i32 = 7; }";
        for tok in lex_all(input) {
            if tok.kind == TokenKind::Eof {
                continue;
            }
            let len = tok.span.text.len();
            assert_eq!(&input[tok.span.pos..tok.span.pos + len], tok.span.text);
        }
    }

    #[test]
    fn token_ordinals_are_sequential() {
        let tokens = lex_all("let a: i64 = 1;");
        for (i, tok) in tokens.iter().enumerate() {
            assert_eq!(tok.span.cur, i + 1);
        }
    }

    #[test]
    fn exactly_one_eof() {
        let mut lexer = Lexer::new("1 2".to_string());
        let mut eofs = 0;
        while let Some(tok) = lexer.next_token().unwrap() {
            if tok.kind == TokenKind::Eof {
                eofs += 1;
            }
        }
        assert_eq!(eofs, 1);
        assert!(lexer.next_token().unwrap().is_none());
        assert!(lexer.next_token().unwrap().is_none());
    }

    #[test]
    fn string_literal_excludes_quotes() {
        let tokens = lex_all("\"hello world\"");
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].span.text, "hello world");
    }

    #[test]
    fn character_literal_payload() {
        let tokens = lex_all("'a'");
        assert_eq!(tokens[0].kind, TokenKind::CharacterLiteral);
        assert_eq!(tokens[0].span.text, "a");
        assert_eq!(tokens[0].num, i64::from(b'a'));
    }

    #[test]
    fn unterminated_string() {
        let mut lexer = Lexer::new("\"abc".to_string());
        let err = lexer.next_token().unwrap_err();
        assert_eq!(err.message, "unterminated string literal");
        assert!(err.to_string().starts_with("Compile Error @ line (1,"));
    }

    #[test]
    fn unterminated_character() {
        let mut lexer = Lexer::new("'ab'".to_string());
        let err = lexer.next_token().unwrap_err();
        assert_eq!(err.message, "unterminated character literal");
    }

    #[test]
    fn unrecognised_byte_becomes_none_token() {
        let tokens = lex_all("@");
        assert_eq!(tokens[0].kind, TokenKind::None);
        assert_eq!(tokens[0].span.text, "@");
        assert!(!tokens[0].is_valid());
    }

    #[test]
    fn predicates() {
        let tokens = lex_all("; while x");
        assert!(tokens[0].is_operator());
        assert!(tokens[1].is_keyword());
        assert!(!tokens[2].is_keyword());
        assert!(tokens[2].is_valid());
    }
}

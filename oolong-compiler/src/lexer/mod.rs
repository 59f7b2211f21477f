use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Identifier,
    IntLiteral(i32),
    LongLiteral(i64),
    FloatLiteral(f32),
    DoubleLiteral(f64),
    StringLiteral(String),
    CharLiteral(char),
    BoolLiteral(bool),
    Null,
    New,
    Slot(u32),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqualEqual,
    BangEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    AmpAmp,
    PipePipe,
    Bang,
    Question,
    QuestionQuestion,
    QuestionDot,
    Colon,
    FatArrow,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    Comma,
    Eof,
}

impl TokenKind {
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Identifier => "identifier".to_string(),
            TokenKind::IntLiteral(_)
            | TokenKind::LongLiteral(_)
            | TokenKind::FloatLiteral(_)
            | TokenKind::DoubleLiteral(_) => "numeric literal".to_string(),
            TokenKind::StringLiteral(_) => "string literal".to_string(),
            TokenKind::CharLiteral(_) => "character literal".to_string(),
            TokenKind::BoolLiteral(value) => value.to_string(),
            TokenKind::Null => "null".to_string(),
            TokenKind::New => "new".to_string(),
            TokenKind::Slot(index) => format!("${index}"),
            TokenKind::Plus => "+".to_string(),
            TokenKind::Minus => "-".to_string(),
            TokenKind::Star => "*".to_string(),
            TokenKind::Slash => "/".to_string(),
            TokenKind::Percent => "%".to_string(),
            TokenKind::EqualEqual => "==".to_string(),
            TokenKind::BangEqual => "!=".to_string(),
            TokenKind::Less => "<".to_string(),
            TokenKind::LessEqual => "<=".to_string(),
            TokenKind::Greater => ">".to_string(),
            TokenKind::GreaterEqual => ">=".to_string(),
            TokenKind::AmpAmp => "&&".to_string(),
            TokenKind::PipePipe => "||".to_string(),
            TokenKind::Bang => "!".to_string(),
            TokenKind::Question => "?".to_string(),
            TokenKind::QuestionQuestion => "??".to_string(),
            TokenKind::QuestionDot => "?.".to_string(),
            TokenKind::Colon => ":".to_string(),
            TokenKind::FatArrow => "=>".to_string(),
            TokenKind::LParen => "(".to_string(),
            TokenKind::RParen => ")".to_string(),
            TokenKind::LBracket => "[".to_string(),
            TokenKind::RBracket => "]".to_string(),
            TokenKind::Dot => ".".to_string(),
            TokenKind::Comma => ",".to_string(),
            TokenKind::Eof => "end of input".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub offset: usize,
}

impl Token {
    fn new(kind: TokenKind, lexeme: String, offset: usize) -> Self {
        Self {
            kind,
            lexeme,
            offset,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("position {offset} near: unexpected character '{ch}'")]
    UnexpectedChar { ch: char, offset: usize },
    #[error("position {offset} near: unterminated string literal")]
    UnterminatedString { offset: usize },
    #[error("position {offset} near: unterminated character literal")]
    UnterminatedChar { offset: usize },
    #[error("position {offset} near: malformed numeric literal '{lexeme}'")]
    MalformedNumber { lexeme: String, offset: usize },
    #[error("position {offset} near: expected digits after '$'")]
    MissingSlotDigits { offset: usize },
}

impl LexError {
    pub fn offset(&self) -> usize {
        match self {
            LexError::UnexpectedChar { offset, .. }
            | LexError::UnterminatedString { offset }
            | LexError::UnterminatedChar { offset }
            | LexError::MalformedNumber { offset, .. }
            | LexError::MissingSlotDigits { offset } => *offset,
        }
    }
}

pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, position: 0 }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek_char() {
            match ch {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance_char();
                }
                '"' => {
                    tokens.push(self.lex_string()?);
                }
                '\'' => {
                    tokens.push(self.lex_char()?);
                }
                '0'..='9' => {
                    tokens.push(self.lex_number()?);
                }
                'a'..='z' | 'A'..='Z' | '_' => {
                    tokens.push(self.lex_identifier_or_word());
                }
                '$' => {
                    tokens.push(self.lex_slot()?);
                }
                '(' => tokens.push(self.simple_token(TokenKind::LParen)),
                ')' => tokens.push(self.simple_token(TokenKind::RParen)),
                '[' => tokens.push(self.simple_token(TokenKind::LBracket)),
                ']' => tokens.push(self.simple_token(TokenKind::RBracket)),
                ',' => tokens.push(self.simple_token(TokenKind::Comma)),
                ':' => tokens.push(self.simple_token(TokenKind::Colon)),
                '+' => tokens.push(self.simple_token(TokenKind::Plus)),
                '-' => tokens.push(self.simple_token(TokenKind::Minus)),
                '*' => tokens.push(self.simple_token(TokenKind::Star)),
                '/' => tokens.push(self.simple_token(TokenKind::Slash)),
                '%' => tokens.push(self.simple_token(TokenKind::Percent)),
                '.' => tokens.push(self.simple_token(TokenKind::Dot)),
                '=' => tokens.push(self.lex_equals_variants()?),
                '!' => tokens.push(self.lex_bang_variants()),
                '<' => tokens.push(self.lex_less_variants()),
                '>' => tokens.push(self.lex_greater_variants()),
                '&' => tokens.push(self.lex_ampersand()?),
                '|' => tokens.push(self.lex_pipe()?),
                '?' => tokens.push(self.lex_question_variants()),
                other => {
                    return Err(LexError::UnexpectedChar {
                        ch: other,
                        offset: self.position,
                    });
                }
            }
        }

        tokens.push(Token::new(TokenKind::Eof, String::new(), self.position));
        Ok(tokens)
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn peek_next_char(&self) -> Option<char> {
        let mut chars = self.input[self.position..].chars();
        chars.next();
        chars.next()
    }

    fn advance_char(&mut self) {
        if let Some(ch) = self.peek_char() {
            self.position += ch.len_utf8();
        }
    }

    fn slice(&self, start: usize, end: usize) -> &str {
        &self.input[start..end]
    }

    fn simple_token(&mut self, kind: TokenKind) -> Token {
        let start = self.position;
        self.advance_char();
        Token::new(kind, self.slice(start, self.position).to_string(), start)
    }

    fn lex_string(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        self.advance_char(); // consume opening quote

        let mut value = String::new();
        while let Some(ch) = self.peek_char() {
            match ch {
                '"' => {
                    self.advance_char(); // consume closing quote
                    return Ok(Token::new(
                        TokenKind::StringLiteral(value),
                        self.slice(start, self.position).to_string(),
                        start,
                    ));
                }
                '\\' => {
                    self.advance_char();
                    let escaped = self
                        .peek_char()
                        .ok_or(LexError::UnterminatedString { offset: start })?;
                    value.push(unescape(escaped));
                    self.advance_char();
                }
                _ => {
                    value.push(ch);
                    self.advance_char();
                }
            }
        }

        Err(LexError::UnterminatedString { offset: start })
    }

    fn lex_char(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        self.advance_char(); // consume opening quote

        let ch = match self.peek_char() {
            Some('\\') => {
                self.advance_char();
                let escaped = self
                    .peek_char()
                    .ok_or(LexError::UnterminatedChar { offset: start })?;
                self.advance_char();
                unescape(escaped)
            }
            Some('\'') | None => {
                return Err(LexError::UnterminatedChar { offset: start });
            }
            Some(ch) => {
                self.advance_char();
                ch
            }
        };

        if self.peek_char() != Some('\'') {
            return Err(LexError::UnterminatedChar { offset: start });
        }
        self.advance_char(); // consume closing quote

        Ok(Token::new(
            TokenKind::CharLiteral(ch),
            self.slice(start, self.position).to_string(),
            start,
        ))
    }

    fn lex_number(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        let mut is_float = false;

        while let Some(ch) = self.peek_char() {
            match ch {
                '0'..='9' | '_' => self.advance_char(),
                '.' => {
                    if is_float || !matches!(self.peek_next_char(), Some('0'..='9')) {
                        break;
                    }
                    is_float = true;
                    self.advance_char();
                }
                'e' | 'E' => {
                    if !matches!(self.peek_next_char(), Some('0'..='9' | '+' | '-')) {
                        break;
                    }
                    is_float = true;
                    self.advance_char(); // consume 'e'
                    if matches!(self.peek_char(), Some('+' | '-')) {
                        self.advance_char();
                    }
                    if !matches!(self.peek_char(), Some('0'..='9')) {
                        return Err(LexError::MalformedNumber {
                            lexeme: self.slice(start, self.position).to_string(),
                            offset: start,
                        });
                    }
                }
                _ => break,
            }
        }

        let digits_end = self.position;
        let suffix = match self.peek_char() {
            Some(ch @ ('l' | 'L' | 'f' | 'F' | 'd' | 'D')) => {
                self.advance_char();
                Some(ch.to_ascii_lowercase())
            }
            _ => None,
        };

        let digits = self.slice(start, digits_end).replace('_', "");
        let lexeme = self.slice(start, self.position).to_string();
        let malformed = |offset| LexError::MalformedNumber {
            lexeme: lexeme.clone(),
            offset,
        };

        let kind = match (is_float, suffix) {
            (false, None) => {
                let value = digits.parse::<i64>().map_err(|_| malformed(start))?;
                match i32::try_from(value) {
                    Ok(value) => TokenKind::IntLiteral(value),
                    Err(_) => TokenKind::LongLiteral(value),
                }
            }
            (false, Some('l')) => {
                TokenKind::LongLiteral(digits.parse::<i64>().map_err(|_| malformed(start))?)
            }
            (true, Some('l')) => return Err(malformed(start)),
            (_, Some('f')) => {
                TokenKind::FloatLiteral(digits.parse::<f32>().map_err(|_| malformed(start))?)
            }
            (_, Some('d')) | (true, None) => {
                TokenKind::DoubleLiteral(digits.parse::<f64>().map_err(|_| malformed(start))?)
            }
            (false, Some(_)) | (true, Some(_)) => return Err(malformed(start)),
        };

        Ok(Token::new(kind, lexeme, start))
    }

    fn lex_identifier_or_word(&mut self) -> Token {
        let start = self.position;
        self.advance_char();

        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance_char();
            } else {
                break;
            }
        }

        let lexeme = self.slice(start, self.position).to_string();
        let kind = match lexeme.as_str() {
            "true" => TokenKind::BoolLiteral(true),
            "false" => TokenKind::BoolLiteral(false),
            "null" => TokenKind::Null,
            "new" => TokenKind::New,
            _ => TokenKind::Identifier,
        };
        Token::new(kind, lexeme, start)
    }

    fn lex_slot(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        self.advance_char(); // consume '$'

        let digits_start = self.position;
        while matches!(self.peek_char(), Some('0'..='9')) {
            self.advance_char();
        }
        if self.position == digits_start {
            return Err(LexError::MissingSlotDigits { offset: start });
        }

        let lexeme = self.slice(start, self.position).to_string();
        let index = self
            .slice(digits_start, self.position)
            .parse::<u32>()
            .map_err(|_| LexError::MalformedNumber {
                lexeme: lexeme.clone(),
                offset: start,
            })?;
        Ok(Token::new(TokenKind::Slot(index), lexeme, start))
    }

    fn lex_equals_variants(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        self.advance_char(); // consume '='
        match self.peek_char() {
            Some('=') => {
                self.advance_char();
                Ok(Token::new(TokenKind::EqualEqual, "==".to_string(), start))
            }
            Some('>') => {
                self.advance_char();
                Ok(Token::new(TokenKind::FatArrow, "=>".to_string(), start))
            }
            _ => Err(LexError::UnexpectedChar {
                ch: '=',
                offset: start,
            }),
        }
    }

    fn lex_bang_variants(&mut self) -> Token {
        let start = self.position;
        self.advance_char(); // consume '!'
        if self.peek_char() == Some('=') {
            self.advance_char();
            Token::new(TokenKind::BangEqual, "!=".to_string(), start)
        } else {
            Token::new(TokenKind::Bang, "!".to_string(), start)
        }
    }

    fn lex_less_variants(&mut self) -> Token {
        let start = self.position;
        self.advance_char();
        if self.peek_char() == Some('=') {
            self.advance_char();
            Token::new(TokenKind::LessEqual, "<=".to_string(), start)
        } else {
            Token::new(TokenKind::Less, "<".to_string(), start)
        }
    }

    fn lex_greater_variants(&mut self) -> Token {
        let start = self.position;
        self.advance_char();
        if self.peek_char() == Some('=') {
            self.advance_char();
            Token::new(TokenKind::GreaterEqual, ">=".to_string(), start)
        } else {
            Token::new(TokenKind::Greater, ">".to_string(), start)
        }
    }

    fn lex_ampersand(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        self.advance_char();
        if self.peek_char() == Some('&') {
            self.advance_char();
            Ok(Token::new(TokenKind::AmpAmp, "&&".to_string(), start))
        } else {
            Err(LexError::UnexpectedChar {
                ch: '&',
                offset: start,
            })
        }
    }

    fn lex_pipe(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        self.advance_char();
        if self.peek_char() == Some('|') {
            self.advance_char();
            Ok(Token::new(TokenKind::PipePipe, "||".to_string(), start))
        } else {
            Err(LexError::UnexpectedChar {
                ch: '|',
                offset: start,
            })
        }
    }

    fn lex_question_variants(&mut self) -> Token {
        let start = self.position;
        self.advance_char(); // consume '?'
        match self.peek_char() {
            Some('?') => {
                self.advance_char();
                Token::new(TokenKind::QuestionQuestion, "??".to_string(), start)
            }
            Some('.') => {
                self.advance_char();
                Token::new(TokenKind::QuestionDot, "?.".to_string(), start)
            }
            _ => Token::new(TokenKind::Question, "?".to_string(), start),
        }
    }
}

fn unescape(escaped: char) -> char {
    match escaped {
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        '0' => '\0',
        other => other,
    }
}

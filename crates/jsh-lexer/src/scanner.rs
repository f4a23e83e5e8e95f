use crate::mode::{Mode, ModeStack};
use crate::token::{is_name_part, is_name_start, Span, Token, TokenKind};
use crate::LexerError;

/// JSH source scanner.
///
/// Tokenizes JSH source into a flat token stream. Host-language tokens are
/// read as usual; the mode stack decides when `<`, `>`, `@` and name-like
/// runs are template tokens instead.
///
/// - `Vec<char>` source for index-based navigation
/// - Stack of delimiter frames (`ModeStack`)
/// - Position tracking on every token
pub struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
    modes: ModeStack,
    newline_pending: bool,
    /// Whether the most recent `}` closed an object literal.
    object_closed: bool,
    token_start: (usize, usize, usize),
}

impl Scanner {
    /// Create a new scanner for the given source.
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
            modes: ModeStack::new(),
            newline_pending: false,
            object_closed: false,
            token_start: (0, 1, 1),
        }
    }

    /// Tokenize the entire source into a vector of tokens ending with `Eof`.
    pub fn tokenize(source: &str) -> Result<Vec<Token>, LexerError> {
        let mut scanner = Scanner::new(source);
        scanner.scan_tokens()?;
        Ok(scanner.tokens)
    }

    /// Scan all tokens from the source.
    fn scan_tokens(&mut self) -> Result<(), LexerError> {
        loop {
            self.skip_trivia()?;
            if self.is_at_end() {
                break;
            }
            self.scan_token()?;
        }

        self.begin_token();
        self.push(TokenKind::Eof);
        Ok(())
    }

    /// Scan the next token.
    fn scan_token(&mut self) -> Result<(), LexerError> {
        self.begin_token();
        let ch = self.peek();

        if self.modes.in_tag() {
            if is_name_start(ch) {
                return self.scan_name();
            }
            if ch == '>' {
                self.advance();
                self.modes.pop('>');
                self.push(TokenKind::TagEnd);
                return Ok(());
            }
        } else {
            match ch {
                '<' if self.lt_starts_tag() => {
                    self.advance();
                    self.push(TokenKind::TagStart);
                    self.modes.push(Mode::OpenTag);
                    return Ok(());
                }
                '@' => {
                    self.advance();
                    self.push(TokenKind::Decorator);
                    return Ok(());
                }
                _ => {}
            }
        }

        self.scan_host_token(ch)
    }

    /// Whether a `<` at the cursor opens a tag.
    ///
    /// Only at statement level, and not when it directly continues an
    /// expression on the same line (`a < b`). `</` always closes a tag, and
    /// a number, boolean or null that directly follows a tag is text.
    fn lt_starts_tag(&self) -> bool {
        if self.modes.current() != Mode::Block {
            return false;
        }
        if self.newline_pending || self.closing_tag_ahead() {
            return true;
        }

        let mut recent = self.tokens.iter().rev();
        let Some(prev) = recent.next() else {
            return true;
        };
        match prev.kind {
            TokenKind::RBrace => !self.object_closed,
            TokenKind::Number(_) | TokenKind::Boolean(_) | TokenKind::Null => recent
                .next()
                .is_some_and(|t| t.kind == TokenKind::TagEnd),
            ref kind => !kind.ends_expression(),
        }
    }

    /// `</` that is not the start of a comment.
    fn closing_tag_ahead(&self) -> bool {
        self.peek_next() == '/' && !matches!(self.peek_at(2), '/' | '*')
    }

    /// Which frame a `{` at the cursor opens.
    fn brace_mode(&self) -> Mode {
        let Some(prev) = self.tokens.last() else {
            return Mode::Block;
        };
        if prev.kind.expects_operand() {
            return Mode::ExprBrace;
        }
        match prev.kind {
            TokenKind::RParen
            | TokenKind::Arrow
            | TokenKind::Else
            | TokenKind::Semicolon
            | TokenKind::LBrace
            | TokenKind::RBrace
            | TokenKind::TagEnd => Mode::Block,
            _ if self.modes.current().is_expression() => Mode::ExprBrace,
            _ => Mode::Block,
        }
    }

    // --- Trivia ---

    /// Skip whitespace, line terminators and comments.
    fn skip_trivia(&mut self) -> Result<(), LexerError> {
        while !self.is_at_end() {
            match self.peek() {
                '\n' | '\u{2028}' | '\u{2029}' => {
                    self.advance();
                    self.new_line();
                }
                '\r' => {
                    self.advance();
                    // Handle \r\n as single newline
                    if self.peek() == '\n' {
                        self.advance();
                    }
                    self.new_line();
                }
                c if c.is_whitespace() || c == '\u{feff}' => self.advance(),
                '/' if self.peek_next() == '/' => {
                    while !self.is_at_end() && !matches!(self.peek(), '\n' | '\r') {
                        self.advance();
                    }
                }
                '/' if self.peek_next() == '*' => self.skip_block_comment()?,
                _ => break,
            }
        }
        Ok(())
    }

    fn skip_block_comment(&mut self) -> Result<(), LexerError> {
        let (line, column) = (self.line, self.column);
        self.advance_n(2);

        while !self.is_at_end() {
            match self.peek() {
                '*' if self.peek_next() == '/' => {
                    self.advance_n(2);
                    return Ok(());
                }
                '\n' => {
                    self.advance();
                    self.new_line();
                }
                _ => self.advance(),
            }
        }

        Err(LexerError {
            message: "Unterminated comment".into(),
            line,
            column,
        })
    }

    // --- Scanners ---

    /// Scan a tag or attribute name: `div`, `h1`, `[prop]`, `(click)`, `$cmpt`.
    fn scan_name(&mut self) -> Result<(), LexerError> {
        let mut name = String::new();
        name.push(self.peek());
        self.advance();

        while !self.is_at_end() && is_name_part(self.peek()) {
            name.push(self.peek());
            self.advance();
        }

        self.push(TokenKind::Name(name));
        Ok(())
    }

    /// Scan a host-language token.
    fn scan_host_token(&mut self, ch: char) -> Result<(), LexerError> {
        match ch {
            '"' | '\'' => self.scan_string(),
            '0'..='9' => self.scan_number(),
            '.' if self.peek_next().is_ascii_digit() => self.scan_number(),
            c if is_identifier_start(c) => self.scan_identifier(),

            '(' => self.open(Mode::Paren, TokenKind::LParen),
            '[' => self.open(Mode::Bracket, TokenKind::LBracket),
            '{' => {
                let mode = self.brace_mode();
                self.open(mode, TokenKind::LBrace)
            }
            ')' => self.close(')', TokenKind::RParen),
            ']' => self.close(']', TokenKind::RBracket),
            '}' => self.close('}', TokenKind::RBrace),

            _ => self.scan_operator(ch),
        }
    }

    fn open(&mut self, mode: Mode, kind: TokenKind) -> Result<(), LexerError> {
        self.advance();
        self.push(kind);
        self.modes.push(mode);
        Ok(())
    }

    fn close(&mut self, closer: char, kind: TokenKind) -> Result<(), LexerError> {
        let Some(mode) = self.modes.pop(closer) else {
            return Err(self.error(format!("Unbalanced '{closer}'")));
        };
        if closer == '}' {
            self.object_closed = mode == Mode::ExprBrace;
        }
        self.advance();
        self.push(kind);
        Ok(())
    }

    /// Scan an operator or punctuator, longest match first.
    fn scan_operator(&mut self, ch: char) -> Result<(), LexerError> {
        let next = self.peek_next();
        let (kind, len) = match (ch, next) {
            ('=', '=') if self.peek_at(2) == '=' => (TokenKind::StrictEq, 3),
            ('=', '=') => (TokenKind::EqEq, 2),
            ('=', '>') => (TokenKind::Arrow, 2),
            ('=', _) => (TokenKind::Eq, 1),
            ('!', '=') if self.peek_at(2) == '=' => (TokenKind::StrictNotEq, 3),
            ('!', '=') => (TokenKind::NotEq, 2),
            ('!', _) => (TokenKind::Not, 1),
            ('<', '=') => (TokenKind::Lte, 2),
            ('<', _) => (TokenKind::Lt, 1),
            ('>', '=') => (TokenKind::Gte, 2),
            ('>', _) => (TokenKind::Gt, 1),
            ('&', '&') => (TokenKind::And, 2),
            ('|', '|') => (TokenKind::Or, 2),
            ('?', '?') => (TokenKind::QuestionQuestion, 2),
            ('?', '.') if !self.peek_at(2).is_ascii_digit() => (TokenKind::OptionalChain, 2),
            ('?', _) => (TokenKind::Question, 1),
            ('+', '+') => (TokenKind::PlusPlus, 2),
            ('+', '=') => (TokenKind::PlusEq, 2),
            ('+', _) => (TokenKind::Plus, 1),
            ('-', '-') => (TokenKind::MinusMinus, 2),
            ('-', '=') => (TokenKind::MinusEq, 2),
            ('-', _) => (TokenKind::Minus, 1),
            ('*', '=') => (TokenKind::StarEq, 2),
            ('*', _) => (TokenKind::Star, 1),
            ('/', '=') => (TokenKind::SlashEq, 2),
            ('/', _) => (TokenKind::Slash, 1),
            ('%', _) => (TokenKind::Percent, 1),
            (',', _) => (TokenKind::Comma, 1),
            (';', _) => (TokenKind::Semicolon, 1),
            (':', _) => (TokenKind::Colon, 1),
            ('.', _) => (TokenKind::Dot, 1),
            _ => return Err(self.error(format!("Unexpected character: '{ch}'"))),
        };

        self.advance_n(len);
        self.push(kind);
        Ok(())
    }

    /// Scan a string literal, resolving escape sequences.
    fn scan_string(&mut self) -> Result<(), LexerError> {
        let quote = self.peek();
        let (start_line, start_col) = (self.line, self.column);
        self.advance(); // consume opening quote

        let mut value = String::new();

        while !self.is_at_end() && self.peek() != quote {
            match self.peek() {
                '\n' | '\r' => break,
                '\\' => {
                    self.advance(); // consume backslash
                    if self.is_at_end() {
                        break;
                    }
                    let escaped = self.peek();
                    self.advance();
                    match escaped {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        'b' => value.push('\u{8}'),
                        'f' => value.push('\u{c}'),
                        'v' => value.push('\u{b}'),
                        '0' => value.push('\0'),
                        'u' => value.push(self.scan_unicode_escape()?),
                        // Line continuation
                        '\n' => {
                            self.line += 1;
                            self.column = 1;
                        }
                        c => value.push(c),
                    }
                }
                c => {
                    value.push(c);
                    self.advance();
                }
            }
        }

        if self.peek() != quote {
            return Err(LexerError {
                message: "Unterminated string".into(),
                line: start_line,
                column: start_col,
            });
        }

        self.advance(); // consume closing quote
        self.push(TokenKind::String(value));
        Ok(())
    }

    /// `\uXXXX` or `\u{X...}`, after the `u`.
    fn scan_unicode_escape(&mut self) -> Result<char, LexerError> {
        let braced = self.peek() == '{';
        if braced {
            self.advance();
        }

        let mut digits = String::new();
        while self.peek().is_ascii_hexdigit() && (braced || digits.len() < 4) {
            digits.push(self.peek());
            self.advance();
        }

        if braced {
            if self.peek() != '}' {
                return Err(self.error("Invalid unicode escape".into()));
            }
            self.advance();
        }

        u32::from_str_radix(&digits, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.error(format!("Invalid unicode escape: '\\u{digits}'")))
    }

    /// Scan a number literal: integer, fraction, exponent.
    fn scan_number(&mut self) -> Result<(), LexerError> {
        let start = self.pos;

        while self.peek().is_ascii_digit() {
            self.advance();
        }
        if self.peek() == '.' && self.peek_next() != '.' {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }
        if matches!(self.peek(), 'e' | 'E') {
            self.advance();
            if matches!(self.peek(), '+' | '-') {
                self.advance();
            }
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text: String = self.chars[start..self.pos].iter().collect();
        let value: f64 = text
            .parse()
            .map_err(|_| self.error(format!("Invalid number: '{text}'")))?;

        self.push(TokenKind::Number(value));
        Ok(())
    }

    /// Scan an identifier or keyword.
    fn scan_identifier(&mut self) -> Result<(), LexerError> {
        let mut ident = String::new();
        ident.push(self.peek());
        self.advance();

        while !self.is_at_end() && is_identifier_part(self.peek()) {
            ident.push(self.peek());
            self.advance();
        }

        self.push(Self::keyword_or_ident(ident));
        Ok(())
    }

    // --- Keyword detection ---

    /// Determine if an identifier is a keyword or remains an identifier.
    fn keyword_or_ident(ident: String) -> TokenKind {
        match ident.as_str() {
            "let" => TokenKind::Let,
            "const" => TokenKind::Const,
            "var" => TokenKind::Var,
            "function" => TokenKind::Function,
            "return" => TokenKind::Return,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "import" => TokenKind::Import,
            "export" => TokenKind::Export,
            "new" => TokenKind::New,
            "typeof" => TokenKind::Typeof,
            "this" => TokenKind::This,
            "true" => TokenKind::Boolean(true),
            "false" => TokenKind::Boolean(false),
            "null" => TokenKind::Null,
            _ => TokenKind::Identifier(ident),
        }
    }

    // --- Helpers ---

    fn begin_token(&mut self) {
        self.token_start = (self.pos, self.line, self.column);
    }

    /// Push a token spanning from the last `begin_token` to the cursor.
    fn push(&mut self, kind: TokenKind) {
        // `<` immediately followed by `/` starts a closing tag.
        if kind == TokenKind::Slash
            && self
                .tokens
                .last()
                .is_some_and(|t| t.kind == TokenKind::TagStart)
        {
            self.modes.close_tag();
        }

        let (start, line, column) = self.token_start;
        let mut token = Token::new(kind, Span::new(start, self.pos, line, column));
        token.newline_before = std::mem::take(&mut self.newline_pending);
        self.tokens.push(token);
    }

    fn new_line(&mut self) {
        self.line += 1;
        self.column = 1;
        self.newline_pending = true;
    }

    fn peek(&self) -> char {
        self.peek_at(0)
    }

    fn peek_next(&self) -> char {
        self.peek_at(1)
    }

    fn peek_at(&self, offset: usize) -> char {
        self.chars.get(self.pos + offset).copied().unwrap_or('\0')
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.pos += 1;
            self.column += 1;
        }
    }

    fn advance_n(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn error(&self, message: String) -> LexerError {
        LexerError {
            message,
            line: self.line,
            column: self.column,
        }
    }
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

fn is_identifier_part(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

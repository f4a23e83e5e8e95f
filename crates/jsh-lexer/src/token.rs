use serde::Serialize;

/// A position in source text, tracking line and column for error reporting.
///
/// `start` and `end` are character offsets into the source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }
}

/// Token classification for JSH source.
///
/// Host-language tokens come first, followed by the four template tokens
/// (`TagStart`, `TagEnd`, `Name`, `Decorator`). Data-carrying variants embed
/// their value directly.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals (carry data)
    Identifier(String),
    String(String),
    Number(f64),
    Boolean(bool),
    Null,

    // Keywords
    Let,
    Const,
    Var,
    Function,
    Return,
    If,
    Else,
    While,
    For,
    Break,
    Continue,
    Import,
    Export,
    New,
    Typeof,
    This,

    // Delimiters
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,

    // Punctuation
    Comma,
    Semicolon,
    Colon,
    Dot,
    Question,
    OptionalChain,
    Arrow,

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,

    // Comparison and logic
    EqEq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Gt,
    Lte,
    Gte,
    And,
    Or,
    Not,
    QuestionQuestion,

    // Assignment
    Eq,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,

    // Template
    TagStart,     // <tag
    TagEnd,       // >
    Name(String), // tag or attribute name, only inside a tag
    Decorator,    // @

    // End of input
    Eof,
}

impl TokenKind {
    /// The source spelling of a keyword or identifier.
    ///
    /// Used where the host language accepts any word, e.g. property names
    /// after `.` and object literal keys.
    pub fn as_word(&self) -> Option<&str> {
        let word = match self {
            TokenKind::Identifier(name) => name.as_str(),
            TokenKind::Boolean(true) => "true",
            TokenKind::Boolean(false) => "false",
            TokenKind::Null => "null",
            TokenKind::Let => "let",
            TokenKind::Const => "const",
            TokenKind::Var => "var",
            TokenKind::Function => "function",
            TokenKind::Return => "return",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::While => "while",
            TokenKind::For => "for",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::Import => "import",
            TokenKind::Export => "export",
            TokenKind::New => "new",
            TokenKind::Typeof => "typeof",
            TokenKind::This => "this",
            _ => return None,
        };
        Some(word)
    }

    /// Whether this token can be the last token of an expression.
    ///
    /// A `<` directly after such a token (on the same line) is a comparison,
    /// not the start of a tag.
    pub fn ends_expression(&self) -> bool {
        matches!(
            self,
            TokenKind::Identifier(_)
                | TokenKind::Number(_)
                | TokenKind::Boolean(_)
                | TokenKind::Null
                | TokenKind::This
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::PlusPlus
                | TokenKind::MinusMinus
        )
    }

    /// Whether an operand must follow this token, so a `{` after it opens
    /// an object literal rather than a block.
    pub fn expects_operand(&self) -> bool {
        matches!(
            self,
            TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::Comma
                | TokenKind::Colon
                | TokenKind::Question
                | TokenKind::Return
                | TokenKind::New
                | TokenKind::Typeof
                | TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Star
                | TokenKind::Slash
                | TokenKind::Percent
                | TokenKind::EqEq
                | TokenKind::NotEq
                | TokenKind::StrictEq
                | TokenKind::StrictNotEq
                | TokenKind::Lt
                | TokenKind::Gt
                | TokenKind::Lte
                | TokenKind::Gte
                | TokenKind::And
                | TokenKind::Or
                | TokenKind::Not
                | TokenKind::QuestionQuestion
                | TokenKind::Eq
                | TokenKind::PlusEq
                | TokenKind::MinusEq
                | TokenKind::StarEq
                | TokenKind::SlashEq
        )
    }
}

impl std::fmt::Display for TokenKind {
    /// Human-readable token description for error messages.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(word) = self.as_word() {
            return match self {
                TokenKind::Identifier(_) => write!(f, "identifier '{word}'"),
                _ => write!(f, "'{word}'"),
            };
        }
        let text = match self {
            TokenKind::String(value) => return write!(f, "string {value:?}"),
            TokenKind::Number(value) => return write!(f, "number {value}"),
            TokenKind::Name(name) => return write!(f, "name '{name}'"),
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::Comma => ",",
            TokenKind::Semicolon => ";",
            TokenKind::Colon => ":",
            TokenKind::Dot => ".",
            TokenKind::Question => "?",
            TokenKind::OptionalChain => "?.",
            TokenKind::Arrow => "=>",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::PlusPlus => "++",
            TokenKind::MinusMinus => "--",
            TokenKind::EqEq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::StrictEq => "===",
            TokenKind::StrictNotEq => "!==",
            TokenKind::Lt => "<",
            TokenKind::Gt => ">",
            TokenKind::Lte => "<=",
            TokenKind::Gte => ">=",
            TokenKind::And => "&&",
            TokenKind::Or => "||",
            TokenKind::Not => "!",
            TokenKind::QuestionQuestion => "??",
            TokenKind::Eq => "=",
            TokenKind::PlusEq => "+=",
            TokenKind::MinusEq => "-=",
            TokenKind::StarEq => "*=",
            TokenKind::SlashEq => "/=",
            TokenKind::TagStart => "<",
            TokenKind::TagEnd => ">",
            TokenKind::Decorator => "@",
            TokenKind::Eof => return write!(f, "end of input"),
            _ => return write!(f, "{self:?}"),
        };
        write!(f, "'{text}'")
    }
}

/// A token produced by the JSH scanner.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// A line terminator appeared between the previous token and this one.
    pub newline_before: bool,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self {
            kind,
            span,
            newline_before: false,
        }
    }
}

/// ASCII letter, `[`, `(` or `$`: may begin a tag or attribute name.
pub fn is_name_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || matches!(ch, '[' | '(' | '$')
}

/// ASCII letter, digit, `]` or `)`: may continue a tag or attribute name.
pub fn is_name_part(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, ']' | ')')
}

//! Statement parser for JSH.
//!
//! Parses the token stream from `jsh-lexer` into a `Program`. Every statement
//! position first checks for template syntax (`<` tags and `@` decorators)
//! and otherwise parses a host-language statement. Inline expressions are
//! delegated to `expr_parser`.
//!
//! Uses recursive descent with automatic statement termination.

use crate::ast::{
    Attribute, AttributeValue, Decorator, Element, ElementEnd, ElementStart, ExprKind,
    FunctionDeclaration, ImportDeclaration, ImportSpecifier, Program, Statement,
    VariableDeclaration, VariableDeclarator, VariableKind,
};
use crate::ParseError;
use jsh_lexer::{Span, Token, TokenKind};

/// JSH parser.
///
/// Converts the flat token stream into a `Program`, tracking open elements
/// so that every closing tag has an opener to pair with.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Names of open elements, innermost last. Fresh for every function body.
    open_elements: Vec<String>,
}

impl Parser {
    /// Create a new parser for the given tokens.
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            open_elements: Vec::new(),
        }
    }

    /// Parse source code into a program AST.
    pub fn parse(source: &str) -> Result<Program, ParseError> {
        let tokens = jsh_lexer::Scanner::tokenize(source)?;
        let mut parser = Parser::new(tokens);
        parser.parse_program()
    }

    /// Parse a full program.
    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut body = Vec::new();
        while !self.is_at_end() {
            body.push(self.parse_statement()?);
        }
        Ok(Program { body })
    }

    /// Parse one statement, template or host.
    pub fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        match &self.peek().kind {
            TokenKind::TagStart => self.parse_element_or_tags(),
            TokenKind::Decorator => self.parse_decorator(),
            TokenKind::LBrace => Ok(Statement::Block {
                body: self.parse_block()?,
            }),
            TokenKind::Let | TokenKind::Const | TokenKind::Var => {
                let declaration = self.parse_variable_declaration()?;
                self.consume_semicolon()?;
                Ok(Statement::VariableDeclaration(declaration))
            }
            TokenKind::Function => self.parse_function_declaration(),
            TokenKind::Return => self.parse_return(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Break => {
                self.advance();
                self.consume_semicolon()?;
                Ok(Statement::Break)
            }
            TokenKind::Continue => {
                self.advance();
                self.consume_semicolon()?;
                Ok(Statement::Continue)
            }
            TokenKind::Import => self.parse_import(),
            TokenKind::Export => self.parse_export(),
            TokenKind::Semicolon => {
                self.advance();
                Ok(Statement::Empty)
            }
            _ => {
                let expression = self.parse_expression()?;
                self.consume_semicolon()?;
                Ok(Statement::Expression { expression })
            }
        }
    }

    // =========================================================================
    // Template syntax
    // =========================================================================

    /// Parse a tag:
    /// ```text
    /// <name attr="x" other={expr}>    ElementStart
    /// <name attr/>                    Element
    /// </name>                         ElementEnd
    /// ```
    fn parse_element_or_tags(&mut self) -> Result<Statement, ParseError> {
        let start = self.peek().span;
        self.expect(&TokenKind::TagStart)?;

        match &self.peek().kind {
            TokenKind::Name(name) => {
                let name = name.clone();
                self.advance();

                let mut attributes = Vec::new();
                while !matches!(self.peek().kind, TokenKind::TagEnd | TokenKind::Slash) {
                    attributes.push(self.parse_attribute()?);
                }

                if self.eat(&TokenKind::Slash) {
                    self.expect(&TokenKind::TagEnd)?;
                    return Ok(Statement::Element(Element {
                        name,
                        attributes,
                        span: self.span_from(start),
                    }));
                }

                self.expect(&TokenKind::TagEnd)?;
                self.open_elements.push(name.clone());
                Ok(Statement::ElementStart(ElementStart {
                    name,
                    attributes,
                    span: self.span_from(start),
                }))
            }
            TokenKind::Slash => {
                self.advance();
                let name = self.expect_name("tag name")?;
                self.expect(&TokenKind::TagEnd)?;

                // Pairing is positional: the closing name is not compared.
                if self.open_elements.pop().is_none() {
                    return Err(Self::error_at(
                        start,
                        format!("Closing tag </{name}> has no matching opening tag"),
                    ));
                }
                Ok(Statement::ElementEnd(ElementEnd {
                    name,
                    span: self.span_from(start),
                }))
            }
            other => Err(self.error(format!("Expected tag name or '/', got {other}"))),
        }
    }

    /// Parse one attribute: `name`, `name="literal"`, `name='literal'` or
    /// `name={expression}`.
    fn parse_attribute(&mut self) -> Result<Attribute, ParseError> {
        let name = self.expect_name("attribute name")?;

        if !self.eat(&TokenKind::Eq) {
            return Ok(Attribute { name, value: None });
        }

        let value = match &self.peek().kind {
            TokenKind::String(literal) => {
                let literal = literal.clone();
                self.advance();
                AttributeValue::Literal(literal)
            }
            TokenKind::LBrace => {
                self.advance();
                let expression = self.parse_expression()?;
                self.expect(&TokenKind::RBrace)?;
                AttributeValue::Expression(expression)
            }
            other => {
                return Err(self.error(format!(
                    "Value of attribute '{name}' must be a quoted string or a braced expression, got {other}"
                )))
            }
        };

        Ok(Attribute {
            name,
            value: Some(value),
        })
    }

    /// Parse a decorator: `@Name` or `@Name(args)`.
    fn parse_decorator(&mut self) -> Result<Statement, ParseError> {
        let start = self.peek().span;
        self.expect(&TokenKind::Decorator)?;

        let expression = self.parse_expression()?;
        let (name, arguments) = match expression.kind {
            ExprKind::Call { callee, arguments } => match callee.kind {
                ExprKind::Identifier(name) => (name, arguments),
                _ => return Err(Self::decorator_error(start)),
            },
            ExprKind::Identifier(name) => (name, Vec::new()),
            _ => return Err(Self::decorator_error(start)),
        };
        self.eat(&TokenKind::Semicolon);

        Ok(Statement::Decorator(Decorator {
            name,
            arguments,
            span: self.span_from(start),
        }))
    }

    fn decorator_error(start: Span) -> ParseError {
        Self::error_at(start, "Decorator must be a call or identifier".into())
    }

    // =========================================================================
    // Host statements
    // =========================================================================

    /// Parse `{ statements }`.
    pub(crate) fn parse_block(&mut self) -> Result<Vec<Statement>, ParseError> {
        self.expect(&TokenKind::LBrace)?;
        let mut body = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            body.push(self.parse_statement()?);
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(body)
    }

    /// Parse a function body with its own element stack.
    pub(crate) fn parse_function_body(&mut self) -> Result<Vec<Statement>, ParseError> {
        let outer = std::mem::take(&mut self.open_elements);
        let body = self.parse_block();
        self.open_elements = outer;
        body
    }

    /// Parse `(a, b, c)`.
    pub(crate) fn parse_params(&mut self) -> Result<Vec<String>, ParseError> {
        self.expect(&TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.check(&TokenKind::RParen) {
            params.push(self.expect_identifier()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(params)
    }

    fn parse_variable_declaration(&mut self) -> Result<VariableDeclaration, ParseError> {
        let kind = match self.peek().kind {
            TokenKind::Let => VariableKind::Let,
            TokenKind::Const => VariableKind::Const,
            _ => VariableKind::Var,
        };
        self.advance();

        let mut declarations = Vec::new();
        loop {
            let name = self.expect_identifier()?;
            let init = if self.eat(&TokenKind::Eq) {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            declarations.push(VariableDeclarator { name, init });

            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        Ok(VariableDeclaration { kind, declarations })
    }

    fn parse_function_declaration(&mut self) -> Result<Statement, ParseError> {
        self.expect(&TokenKind::Function)?;
        let name = self.expect_identifier()?;
        let params = self.parse_params()?;
        let body = self.parse_function_body()?;

        Ok(Statement::FunctionDeclaration(FunctionDeclaration {
            name,
            params,
            body,
            decorator: None,
        }))
    }

    fn parse_return(&mut self) -> Result<Statement, ParseError> {
        self.advance(); // consume `return`
        let argument = if self.check(&TokenKind::Semicolon) || self.can_insert_semicolon() {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume_semicolon()?;
        Ok(Statement::Return { argument })
    }

    fn parse_if(&mut self) -> Result<Statement, ParseError> {
        self.advance(); // consume `if`
        let test = self.parse_paren_expression()?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.eat(&TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Statement::If {
            test,
            consequent,
            alternate,
        })
    }

    fn parse_while(&mut self) -> Result<Statement, ParseError> {
        self.advance(); // consume `while`
        let test = self.parse_paren_expression()?;
        let body = Box::new(self.parse_statement()?);
        Ok(Statement::While { test, body })
    }

    fn parse_for(&mut self) -> Result<Statement, ParseError> {
        self.advance(); // consume `for`
        self.expect(&TokenKind::LParen)?;

        let init = match self.peek().kind {
            TokenKind::Semicolon => None,
            TokenKind::Let | TokenKind::Const | TokenKind::Var => Some(Box::new(
                Statement::VariableDeclaration(self.parse_variable_declaration()?),
            )),
            _ => Some(Box::new(Statement::Expression {
                expression: self.parse_expression()?,
            })),
        };
        self.expect(&TokenKind::Semicolon)?;

        let test = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::Semicolon)?;

        let update = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::RParen)?;

        let body = Box::new(self.parse_statement()?);
        Ok(Statement::For {
            init,
            test,
            update,
            body,
        })
    }

    /// Parse an import:
    /// ```text
    /// import "module";
    /// import d from "module";
    /// import { a, b as c } from "module";
    /// import d, { a } from "module";
    /// ```
    fn parse_import(&mut self) -> Result<Statement, ParseError> {
        self.advance(); // consume `import`

        if let TokenKind::String(source) = &self.peek().kind {
            let source = source.clone();
            self.advance();
            self.consume_semicolon()?;
            return Ok(Statement::Import(ImportDeclaration {
                default: None,
                specifiers: Vec::new(),
                source,
            }));
        }

        let mut default = None;
        if let TokenKind::Identifier(name) = &self.peek().kind {
            default = Some(name.clone());
            self.advance();
        }

        let mut specifiers = Vec::new();
        if default.is_none() || self.eat(&TokenKind::Comma) {
            self.expect(&TokenKind::LBrace)?;
            while !self.check(&TokenKind::RBrace) {
                let imported = self.expect_word()?;
                let local = if self.eat_contextual("as") {
                    self.expect_identifier()?
                } else {
                    imported.clone()
                };
                specifiers.push(ImportSpecifier { imported, local });

                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::RBrace)?;
        }

        if !self.eat_contextual("from") {
            return Err(self.error(format!("Expected 'from', got {}", self.peek().kind)));
        }
        let source = match &self.peek().kind {
            TokenKind::String(source) => source.clone(),
            other => return Err(self.error(format!("Expected module name, got {other}"))),
        };
        self.advance();
        self.consume_semicolon()?;

        Ok(Statement::Import(ImportDeclaration {
            default,
            specifiers,
            source,
        }))
    }

    fn parse_export(&mut self) -> Result<Statement, ParseError> {
        self.advance(); // consume `export`
        match self.peek().kind {
            TokenKind::Function | TokenKind::Let | TokenKind::Const | TokenKind::Var => {
                Ok(Statement::Export {
                    declaration: Box::new(self.parse_statement()?),
                })
            }
            _ => Err(self.error(format!(
                "Expected declaration after 'export', got {}",
                self.peek().kind
            ))),
        }
    }

    /// Parse `( expression )`.
    fn parse_paren_expression(&mut self) -> Result<crate::ast::Expression, ParseError> {
        self.expect(&TokenKind::LParen)?;
        let expression = self.parse_expression()?;
        self.expect(&TokenKind::RParen)?;
        Ok(expression)
    }

    /// Accept an explicit `;` or an automatic statement boundary.
    fn consume_semicolon(&mut self) -> Result<(), ParseError> {
        if self.eat(&TokenKind::Semicolon) || self.can_insert_semicolon() {
            return Ok(());
        }
        Err(self.error(format!("Expected ';', got {}", self.peek().kind)))
    }

    /// A statement may end before `}`, before a tag, after a line break, or
    /// at the end of input.
    fn can_insert_semicolon(&self) -> bool {
        let token = self.peek();
        token.newline_before
            || matches!(
                token.kind,
                TokenKind::Eof | TokenKind::RBrace | TokenKind::TagStart
            )
    }

    // =========================================================================
    // Token navigation helpers
    // =========================================================================

    pub(crate) fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    pub(crate) fn peek_at(&self, offset: usize) -> &Token {
        static EOF: std::sync::LazyLock<Token> =
            std::sync::LazyLock::new(|| Token::new(TokenKind::Eof, Span::default()));
        self.tokens.get(self.pos + offset).unwrap_or(&EOF)
    }

    pub(crate) fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    pub(crate) fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        self.peek().kind == *kind
    }

    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, kind: &TokenKind) -> Result<(), ParseError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.error(format!("Expected {kind}, got {}", self.peek().kind)))
        }
    }

    pub(crate) fn expect_identifier(&mut self) -> Result<String, ParseError> {
        if let TokenKind::Identifier(name) = &self.peek().kind {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.error(format!("Expected identifier, got {}", self.peek().kind)))
        }
    }

    /// Identifier or keyword, e.g. a property name.
    pub(crate) fn expect_word(&mut self) -> Result<String, ParseError> {
        match self.peek().kind.as_word() {
            Some(word) => {
                let word = word.to_string();
                self.advance();
                Ok(word)
            }
            None => Err(self.error(format!("Expected name, got {}", self.peek().kind))),
        }
    }

    fn expect_name(&mut self, what: &str) -> Result<String, ParseError> {
        if let TokenKind::Name(name) = &self.peek().kind {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.error(format!("Expected {what}, got {}", self.peek().kind)))
        }
    }

    /// Consume a contextual keyword such as `from` or `as`.
    fn eat_contextual(&mut self, word: &str) -> bool {
        let matches = matches!(&self.peek().kind, TokenKind::Identifier(name) if name == word);
        if matches {
            self.advance();
        }
        matches
    }

    /// Span from `start` to the end of the last consumed token.
    pub(crate) fn span_from(&self, start: Span) -> Span {
        let end = self
            .pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(start.end, |t| t.span.end);
        Span::new(start.start, end, start.line, start.column)
    }

    pub(crate) fn error(&self, message: String) -> ParseError {
        Self::error_at(self.peek().span, message)
    }

    fn error_at(span: Span, message: String) -> ParseError {
        ParseError::Syntax {
            message,
            line: span.line,
            column: span.column,
        }
    }
}

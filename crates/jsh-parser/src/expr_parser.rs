//! Expression parser for JSH.
//!
//! Parses host-language expressions straight from the shared token stream,
//! so expressions inside `{...}` attribute values, decorator arguments and
//! statements all go through the same code. Binary operators use precedence
//! climbing; everything else is recursive descent.

use crate::ast::{
    ArrowBody, AssignOp, BinaryOp, ExprKind, Expression, ObjectProperty, UnaryOp, UpdateOp,
};
use crate::parser::Parser;
use crate::ParseError;
use jsh_lexer::TokenKind;

impl Parser {
    /// Parse a complete expression.
    pub fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        self.parse_assignment()
    }

    /// Assignment, arrow function, or anything of higher precedence.
    pub(crate) fn parse_assignment(&mut self) -> Result<Expression, ParseError> {
        if self.is_arrow_ahead() {
            return self.parse_arrow();
        }

        let start = self.peek().span;
        let target = self.parse_conditional()?;
        let Some(op) = assign_op(&self.peek().kind) else {
            return Ok(target);
        };

        if !matches!(target.kind, ExprKind::Identifier(_) | ExprKind::Member { .. }) {
            return Err(self.error("Invalid assignment target".into()));
        }
        self.advance();
        let value = self.parse_assignment()?;

        Ok(Expression::new(
            ExprKind::Assignment {
                target: Box::new(target),
                op,
                value: Box::new(value),
            },
            self.span_from(start),
        ))
    }

    /// `x =>` or a parenthesized list whose `)` is followed by `=>`.
    fn is_arrow_ahead(&self) -> bool {
        match self.peek().kind {
            TokenKind::Identifier(_) => self.peek_at(1).kind == TokenKind::Arrow,
            TokenKind::LParen => {
                let mut depth = 0usize;
                let mut offset = 0;
                loop {
                    match self.peek_at(offset).kind {
                        TokenKind::LParen => depth += 1,
                        TokenKind::RParen => {
                            depth -= 1;
                            if depth == 0 {
                                return self.peek_at(offset + 1).kind == TokenKind::Arrow;
                            }
                        }
                        TokenKind::Eof => return false,
                        _ => {}
                    }
                    offset += 1;
                }
            }
            _ => false,
        }
    }

    fn parse_arrow(&mut self) -> Result<Expression, ParseError> {
        let start = self.peek().span;
        let params = if self.check(&TokenKind::LParen) {
            self.parse_params()?
        } else {
            vec![self.expect_identifier()?]
        };
        self.expect(&TokenKind::Arrow)?;

        let body = if self.check(&TokenKind::LBrace) {
            ArrowBody::Block(self.parse_function_body()?)
        } else {
            ArrowBody::Expression(Box::new(self.parse_assignment()?))
        };

        Ok(Expression::new(
            ExprKind::Arrow { params, body },
            self.span_from(start),
        ))
    }

    /// `condition ? consequent : alternate`
    fn parse_conditional(&mut self) -> Result<Expression, ParseError> {
        let start = self.peek().span;
        let condition = self.parse_binary(0)?;
        if !self.eat(&TokenKind::Question) {
            return Ok(condition);
        }

        let consequent = self.parse_assignment()?;
        self.expect(&TokenKind::Colon)?;
        let alternate = self.parse_assignment()?;

        Ok(Expression::new(
            ExprKind::Ternary {
                condition: Box::new(condition),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            self.span_from(start),
        ))
    }

    /// Left-associative binary operators binding tighter than `min_precedence`.
    fn parse_binary(&mut self, min_precedence: u8) -> Result<Expression, ParseError> {
        let start = self.peek().span;
        let mut left = self.parse_unary()?;

        while let Some(op) = binary_op(&self.peek().kind) {
            let precedence = op.precedence();
            if precedence <= min_precedence {
                break;
            }
            self.advance();
            let right = self.parse_binary(precedence)?;
            left = Expression::new(
                ExprKind::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                self.span_from(start),
            );
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        let start = self.peek().span;

        let unary = match self.peek().kind {
            TokenKind::Not => Some(UnaryOp::Not),
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Typeof => Some(UnaryOp::Typeof),
            _ => None,
        };
        if let Some(op) = unary {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expression::new(
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                self.span_from(start),
            ));
        }

        let update = match self.peek().kind {
            TokenKind::PlusPlus => Some(UpdateOp::Increment),
            TokenKind::MinusMinus => Some(UpdateOp::Decrement),
            _ => None,
        };
        if let Some(op) = update {
            self.advance();
            let operand = self.parse_unary()?;
            self.check_update_target(&operand)?;
            return Ok(Expression::new(
                ExprKind::Update {
                    op,
                    prefix: true,
                    operand: Box::new(operand),
                },
                self.span_from(start),
            ));
        }

        self.parse_postfix()
    }

    /// `i++` / `i--`, only without a line break before the operator.
    fn parse_postfix(&mut self) -> Result<Expression, ParseError> {
        let start = self.peek().span;
        let operand = self.parse_call_member()?;

        let token = self.peek();
        if token.newline_before {
            return Ok(operand);
        }
        let op = match token.kind {
            TokenKind::PlusPlus => UpdateOp::Increment,
            TokenKind::MinusMinus => UpdateOp::Decrement,
            _ => return Ok(operand),
        };
        self.check_update_target(&operand)?;
        self.advance();

        Ok(Expression::new(
            ExprKind::Update {
                op,
                prefix: false,
                operand: Box::new(operand),
            },
            self.span_from(start),
        ))
    }

    fn check_update_target(&self, operand: &Expression) -> Result<(), ParseError> {
        if matches!(operand.kind, ExprKind::Identifier(_) | ExprKind::Member { .. }) {
            Ok(())
        } else {
            Err(self.error("Invalid increment/decrement target".into()))
        }
    }

    /// Member access and calls: `a.b`, `a?.b`, `a[0]`, `f(x)`.
    fn parse_call_member(&mut self) -> Result<Expression, ParseError> {
        let start = self.peek().span;
        let mut expr = if self.check(&TokenKind::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };

        loop {
            match self.peek().kind {
                TokenKind::Dot | TokenKind::OptionalChain => {
                    let optional = self.check(&TokenKind::OptionalChain);
                    self.advance();
                    let property = self.parse_property_name()?;
                    expr = Expression::new(
                        ExprKind::Member {
                            object: Box::new(expr),
                            property: Box::new(property),
                            computed: false,
                            optional,
                        },
                        self.span_from(start),
                    );
                }
                TokenKind::LBracket => {
                    self.advance();
                    let property = self.parse_expression()?;
                    self.expect(&TokenKind::RBracket)?;
                    expr = Expression::new(
                        ExprKind::Member {
                            object: Box::new(expr),
                            property: Box::new(property),
                            computed: true,
                            optional: false,
                        },
                        self.span_from(start),
                    );
                }
                TokenKind::LParen => {
                    let arguments = self.parse_arguments()?;
                    expr = Expression::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            arguments,
                        },
                        self.span_from(start),
                    );
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    /// `new Foo.Bar(args)`; the argument list is optional.
    fn parse_new(&mut self) -> Result<Expression, ParseError> {
        let start = self.peek().span;
        self.advance(); // consume `new`

        let mut callee = self.parse_primary()?;
        while self.eat(&TokenKind::Dot) {
            let property = self.parse_property_name()?;
            callee = Expression::new(
                ExprKind::Member {
                    object: Box::new(callee),
                    property: Box::new(property),
                    computed: false,
                    optional: false,
                },
                self.span_from(start),
            );
        }

        let arguments = if self.check(&TokenKind::LParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };

        Ok(Expression::new(
            ExprKind::New {
                callee: Box::new(callee),
                arguments,
            },
            self.span_from(start),
        ))
    }

    /// Any word after `.`, keywords included.
    fn parse_property_name(&mut self) -> Result<Expression, ParseError> {
        let span = self.peek().span;
        let name = self
            .expect_word()
            .map_err(|_| self.error(format!("Expected property name, got {}", self.peek().kind)))?;
        Ok(Expression::new(ExprKind::Identifier(name), span))
    }

    /// `( a, b, c )`
    pub(crate) fn parse_arguments(&mut self) -> Result<Vec<Expression>, ParseError> {
        self.expect(&TokenKind::LParen)?;
        let mut arguments = Vec::new();
        while !self.check(&TokenKind::RParen) {
            arguments.push(self.parse_assignment()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(arguments)
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        let token = self.peek().clone();
        let kind = match token.kind {
            TokenKind::Number(value) => ExprKind::Number(value),
            TokenKind::String(value) => ExprKind::String(value),
            TokenKind::Boolean(value) => ExprKind::Boolean(value),
            TokenKind::Null => ExprKind::Null,
            TokenKind::This => ExprKind::This,
            TokenKind::Identifier(name) => ExprKind::Identifier(name),
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(&TokenKind::RParen)?;
                return Ok(inner);
            }
            TokenKind::LBracket => return self.parse_array(),
            TokenKind::LBrace => return self.parse_object(),
            other => return Err(self.error(format!("Unexpected {other} in expression"))),
        };
        self.advance();
        Ok(Expression::new(kind, token.span))
    }

    /// `[a, b, c]`
    fn parse_array(&mut self) -> Result<Expression, ParseError> {
        let start = self.peek().span;
        self.expect(&TokenKind::LBracket)?;

        let mut elements = Vec::new();
        while !self.check(&TokenKind::RBracket) {
            elements.push(self.parse_assignment()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBracket)?;

        Ok(Expression::new(
            ExprKind::Array(elements),
            self.span_from(start),
        ))
    }

    /// `{ key: value, "quoted": value, shorthand }`
    fn parse_object(&mut self) -> Result<Expression, ParseError> {
        let start = self.peek().span;
        self.expect(&TokenKind::LBrace)?;

        let mut properties = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let key_token = self.peek().clone();
            let key = match &key_token.kind {
                TokenKind::String(value) => value.clone(),
                TokenKind::Number(value) => value.to_string(),
                other => match other.as_word() {
                    Some(word) => word.to_string(),
                    None => return Err(self.error(format!("Expected property key, got {other}"))),
                },
            };
            self.advance();

            let property = if self.eat(&TokenKind::Colon) {
                ObjectProperty {
                    key,
                    value: self.parse_assignment()?,
                    shorthand: false,
                }
            } else if matches!(key_token.kind, TokenKind::Identifier(_)) {
                ObjectProperty {
                    value: Expression::new(ExprKind::Identifier(key.clone()), key_token.span),
                    key,
                    shorthand: true,
                }
            } else {
                return Err(self.error(format!("Expected ':', got {}", self.peek().kind)));
            };
            properties.push(property);

            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace)?;

        Ok(Expression::new(
            ExprKind::Object(properties),
            self.span_from(start),
        ))
    }
}

fn binary_op(kind: &TokenKind) -> Option<BinaryOp> {
    let op = match kind {
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Mod,
        TokenKind::EqEq => BinaryOp::Eq,
        TokenKind::NotEq => BinaryOp::Neq,
        TokenKind::StrictEq => BinaryOp::StrictEq,
        TokenKind::StrictNotEq => BinaryOp::StrictNeq,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::Lte => BinaryOp::Lte,
        TokenKind::Gte => BinaryOp::Gte,
        TokenKind::And => BinaryOp::And,
        TokenKind::Or => BinaryOp::Or,
        TokenKind::QuestionQuestion => BinaryOp::NullishCoalescing,
        _ => return None,
    };
    Some(op)
}

fn assign_op(kind: &TokenKind) -> Option<AssignOp> {
    let op = match kind {
        TokenKind::Eq => AssignOp::Assign,
        TokenKind::PlusEq => AssignOp::AddAssign,
        TokenKind::MinusEq => AssignOp::SubAssign,
        TokenKind::StarEq => AssignOp::MulAssign,
        TokenKind::SlashEq => AssignOp::DivAssign,
        _ => return None,
    };
    Some(op)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn expr(source: &str) -> Expression {
        let tokens = jsh_lexer::Scanner::tokenize(source).unwrap();
        let mut parser = Parser::new(tokens);
        parser.parse_expression().unwrap()
    }

    fn expr_err(source: &str) -> ParseError {
        let tokens = jsh_lexer::Scanner::tokenize(source).unwrap();
        let mut parser = Parser::new(tokens);
        parser.parse_expression().unwrap_err()
    }

    fn ident(name: &str) -> ExprKind {
        ExprKind::Identifier(name.into())
    }

    /// Compact prefix rendering for shape assertions.
    fn sexp(e: &Expression) -> String {
        match &e.kind {
            ExprKind::Number(n) => n.to_string(),
            ExprKind::String(s) => format!("{s:?}"),
            ExprKind::Boolean(b) => b.to_string(),
            ExprKind::Null => "null".into(),
            ExprKind::This => "this".into(),
            ExprKind::Identifier(name) => name.clone(),
            ExprKind::Binary { left, op, right } => {
                format!("({} {} {})", op.as_str(), sexp(left), sexp(right))
            }
            ExprKind::Unary { op, operand } => format!("({} {})", op.as_str(), sexp(operand)),
            ExprKind::Update {
                op,
                prefix,
                operand,
            } => {
                if *prefix {
                    format!("({}pre {})", op.as_str(), sexp(operand))
                } else {
                    format!("({}post {})", op.as_str(), sexp(operand))
                }
            }
            ExprKind::Member {
                object,
                property,
                computed,
                optional,
            } => {
                let op = match (computed, optional) {
                    (true, _) => "[]",
                    (false, true) => "?.",
                    (false, false) => ".",
                };
                format!("({op} {} {})", sexp(object), sexp(property))
            }
            ExprKind::Call { callee, arguments } => {
                let args: Vec<String> = arguments.iter().map(sexp).collect();
                format!("(call {} [{}])", sexp(callee), args.join(" "))
            }
            ExprKind::New { callee, arguments } => {
                let args: Vec<String> = arguments.iter().map(sexp).collect();
                format!("(new {} [{}])", sexp(callee), args.join(" "))
            }
            ExprKind::Ternary {
                condition,
                consequent,
                alternate,
            } => format!(
                "(? {} {} {})",
                sexp(condition),
                sexp(consequent),
                sexp(alternate)
            ),
            ExprKind::Object(props) => {
                let props: Vec<String> = props
                    .iter()
                    .map(|p| format!("{}:{}", p.key, sexp(&p.value)))
                    .collect();
                format!("{{{}}}", props.join(" "))
            }
            ExprKind::Array(items) => {
                let items: Vec<String> = items.iter().map(sexp).collect();
                format!("[{}]", items.join(" "))
            }
            ExprKind::Arrow { params, body } => match body {
                ArrowBody::Expression(body) => {
                    format!("(=> [{}] {})", params.join(" "), sexp(body))
                }
                ArrowBody::Block(body) => {
                    format!("(=> [{}] {{{} stmts}})", params.join(" "), body.len())
                }
            },
            ExprKind::Assignment { target, op, value } => {
                format!("({} {} {})", op.as_str(), sexp(target), sexp(value))
            }
        }
    }

    fn shape(source: &str) -> String {
        sexp(&expr(source))
    }

    // =========================================================================
    // Literals
    // =========================================================================

    #[test]
    fn test_literals() {
        assert_eq!(expr("42").kind, ExprKind::Number(42.0));
        assert_eq!(expr("'hi'").kind, ExprKind::String("hi".into()));
        assert_eq!(expr("true").kind, ExprKind::Boolean(true));
        assert_eq!(expr("null").kind, ExprKind::Null);
        assert_eq!(expr("this").kind, ExprKind::This);
        assert_eq!(expr("$renderContext").kind, ident("$renderContext"));
    }

    #[test]
    fn test_array_and_object() {
        assert_eq!(shape("[1, 'a', x]"), r#"[1 "a" x]"#);
        assert_eq!(shape("({tag: 'div', count, 'q': 1})"), r#"{tag:"div" count:count q:1}"#);
        assert_eq!(shape("[]"), "[]");
    }

    #[test]
    fn test_object_shorthand_flag() {
        match expr("({count})").kind {
            ExprKind::Object(props) => assert!(props[0].shorthand),
            other => panic!("Expected Object, got {other:?}"),
        }
    }

    // =========================================================================
    // Operators
    // =========================================================================

    #[test]
    fn test_precedence() {
        assert_eq!(shape("1 + 2 * 3"), "(+ 1 (* 2 3))");
        assert_eq!(shape("(1 + 2) * 3"), "(* (+ 1 2) 3)");
        assert_eq!(shape("a || b && c"), "(|| a (&& b c))");
        assert_eq!(shape("a < b == c > d"), "(== (< a b) (> c d))");
        assert_eq!(shape("a ?? b || c"), "(?? a (|| b c))");
    }

    #[test]
    fn test_left_associativity() {
        assert_eq!(shape("a - b - c"), "(- (- a b) c)");
    }

    #[test]
    fn test_unary_and_update() {
        assert_eq!(shape("!a"), "(! a)");
        assert_eq!(shape("-a * b"), "(* (- a) b)");
        assert_eq!(shape("typeof x === 'string'"), r#"(=== (typeof x) "string")"#);
        assert_eq!(shape("i++"), "(++post i)");
        assert_eq!(shape("--i"), "(--pre i)");
    }

    #[test]
    fn test_ternary() {
        assert_eq!(shape("a ? b : c ? d : e"), "(? a b (? c d e))");
    }

    #[test]
    fn test_assignment_is_right_associative() {
        assert_eq!(shape("a = b += 1"), "(= a (+= b 1))");
    }

    #[test]
    fn test_invalid_assignment_target() {
        let err = expr_err("1 = a");
        assert!(err.message().contains("Invalid assignment target"));
    }

    #[test]
    fn test_invalid_update_target() {
        let err = expr_err("1++");
        assert!(err.message().contains("Invalid increment/decrement target"));
    }

    // =========================================================================
    // Member access and calls
    // =========================================================================

    #[test]
    fn test_member_and_call_chain() {
        assert_eq!(shape("a.b[0](x, y)"), "(call ([] (. a b) 0) [x y])");
        assert_eq!(shape("a?.b"), "(?. a b)");
        assert_eq!(shape("el.class"), "(. el class)");
    }

    #[test]
    fn test_new() {
        assert_eq!(shape("new Date()"), "(new Date [])");
        assert_eq!(shape("new a.B(1)"), "(new (. a B) [1])");
        assert_eq!(shape("new Foo"), "(new Foo [])");
    }

    // =========================================================================
    // Arrow functions
    // =========================================================================

    #[test]
    fn test_arrow_functions() {
        assert_eq!(shape("x => x + 1"), "(=> [x] (+ x 1))");
        assert_eq!(shape("(a, b) => a"), "(=> [a b] a)");
        assert_eq!(shape("() => { return 1 }"), "(=> [] {1 stmts})");
    }

    #[test]
    fn test_parenthesized_expression_is_not_arrow() {
        assert_eq!(shape("(a) + (b)"), "(+ a b)");
    }

    #[test]
    fn test_arrow_as_argument() {
        assert_eq!(shape("items.map((i) => i * 2)"), "(call (. items map) [(=> [i] (* i 2))])");
    }

    // =========================================================================
    // Errors and spans
    // =========================================================================

    #[test]
    fn test_unexpected_token() {
        let err = expr_err("a + ;");
        assert!(err.message().contains("Unexpected ';'"));
        assert_eq!(err.column(), 5);
    }

    #[test]
    fn test_binary_span() {
        let e = expr("count > 10");
        assert_eq!((e.span.start, e.span.end), (0, 10));
    }
}

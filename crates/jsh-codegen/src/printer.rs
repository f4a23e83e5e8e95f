//! JavaScript printer.
//!
//! Renders a `Program` back to source text: four-space indentation, one
//! statement per line, double-quoted strings and only the parentheses that
//! operator precedence requires. Template nodes that were not lowered are
//! printed back as markup, so any parsed program can be printed.

use jsh_parser::ast::{
    ArrowBody, Attribute, AttributeValue, BinaryOp, Decorator, ExprKind, Expression,
    FunctionDeclaration, ImportDeclaration, ObjectProperty, Program, Statement,
    VariableDeclaration,
};

/// Print a program as JavaScript source.
pub fn print_program(program: &Program) -> String {
    let mut printer = Printer::new(0);
    for statement in &program.body {
        printer.statement(statement);
    }
    printer.out
}

// Expression precedence levels, loosest first.
const ASSIGNMENT: u8 = 1;
const CONDITIONAL: u8 = 2;
const BINARY_BASE: u8 = 2; // + BinaryOp::precedence(), i.e. 3..=9
const UNARY: u8 = 10;
const POSTFIX: u8 = 11;
const CALL: u8 = 12;
const PRIMARY: u8 = 13;

struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    fn new(indent: usize) -> Self {
        Self {
            out: String::new(),
            indent,
        }
    }

    fn line_start(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn statement(&mut self, statement: &Statement) {
        self.line_start();
        self.statement_inline(statement);
        self.out.push('\n');
    }

    /// Print a statement at the cursor, without leading indentation or the
    /// trailing newline.
    fn statement_inline(&mut self, statement: &Statement) {
        match statement {
            Statement::Expression { expression } => {
                let text = expression_text(expression, 0, self.indent);
                if text.starts_with('{') {
                    self.out.push_str(&format!("({text});"));
                } else {
                    self.out.push_str(&text);
                    self.out.push(';');
                }
            }
            Statement::VariableDeclaration(declaration) => {
                let text = self.variable_declaration(declaration);
                self.out.push_str(&text);
                self.out.push(';');
            }
            Statement::FunctionDeclaration(function) => self.function(function),
            Statement::Return { argument } => match argument {
                Some(argument) => {
                    let text = expression_text(argument, 0, self.indent);
                    self.out.push_str(&format!("return {text};"));
                }
                None => self.out.push_str("return;"),
            },
            Statement::If {
                test,
                consequent,
                alternate,
            } => {
                let test = expression_text(test, 0, self.indent);
                self.out.push_str(&format!("if ({test})"));
                self.clause(consequent);
                if let Some(alternate) = alternate {
                    if matches!(consequent.as_ref(), Statement::Block { .. }) {
                        self.out.push(' ');
                    } else {
                        self.out.push('\n');
                        self.line_start();
                    }
                    self.out.push_str("else");
                    if matches!(alternate.as_ref(), Statement::If { .. }) {
                        self.out.push(' ');
                        self.statement_inline(alternate);
                    } else {
                        self.clause(alternate);
                    }
                }
            }
            Statement::While { test, body } => {
                let test = expression_text(test, 0, self.indent);
                self.out.push_str(&format!("while ({test})"));
                self.clause(body);
            }
            Statement::For {
                init,
                test,
                update,
                body,
            } => {
                let init = match init.as_deref() {
                    Some(Statement::VariableDeclaration(declaration)) => {
                        self.variable_declaration(declaration)
                    }
                    Some(Statement::Expression { expression }) => {
                        expression_text(expression, 0, self.indent)
                    }
                    _ => String::new(),
                };
                let test = test
                    .as_ref()
                    .map(|e| format!(" {}", expression_text(e, 0, self.indent)))
                    .unwrap_or_default();
                let update = update
                    .as_ref()
                    .map(|e| format!(" {}", expression_text(e, 0, self.indent)))
                    .unwrap_or_default();
                self.out.push_str(&format!("for ({init};{test};{update})"));
                self.clause(body);
            }
            Statement::Block { body } => self.block(body),
            Statement::Break => self.out.push_str("break;"),
            Statement::Continue => self.out.push_str("continue;"),
            Statement::Import(import) => self.import(import),
            Statement::Export { declaration } => {
                self.out.push_str("export ");
                self.statement_inline(declaration);
            }
            Statement::Empty => self.out.push(';'),

            Statement::ElementStart(element) => {
                let attributes = self.attributes(&element.attributes);
                self.out.push_str(&format!("<{}{attributes}>", element.name));
            }
            Statement::ElementEnd(element) => {
                self.out.push_str(&format!("</{}>", element.name));
            }
            Statement::Element(element) => {
                let attributes = self.attributes(&element.attributes);
                self.out.push_str(&format!("<{}{attributes}/>", element.name));
            }
            Statement::Decorator(decorator) => {
                let text = self.decorator(decorator);
                self.out.push_str(&text);
            }
        }
    }

    /// Body of `if`/`while`/`for`: a block on the same line, anything else
    /// indented on the next line.
    fn clause(&mut self, body: &Statement) {
        if let Statement::Block { body } = body {
            self.out.push(' ');
            self.block(body);
        } else {
            self.out.push('\n');
            self.indent += 1;
            self.line_start();
            self.statement_inline(body);
            self.indent -= 1;
        }
    }

    fn block(&mut self, body: &[Statement]) {
        if body.is_empty() {
            self.out.push_str("{}");
            return;
        }
        self.out.push_str("{\n");
        self.indent += 1;
        for statement in body {
            self.statement(statement);
        }
        self.indent -= 1;
        self.line_start();
        self.out.push('}');
    }

    fn function(&mut self, function: &FunctionDeclaration) {
        if let Some(decorator) = &function.decorator {
            let text = self.decorator(decorator);
            self.out.push_str(&text);
            self.out.push('\n');
            self.line_start();
        }
        self.out.push_str(&format!(
            "function {}({}) ",
            function.name,
            function.params.join(", ")
        ));
        self.block(&function.body);
    }

    fn variable_declaration(&self, declaration: &VariableDeclaration) -> String {
        let declarators: Vec<String> = declaration
            .declarations
            .iter()
            .map(|d| match &d.init {
                Some(init) => format!(
                    "{} = {}",
                    d.name,
                    expression_text(init, ASSIGNMENT, self.indent)
                ),
                None => d.name.clone(),
            })
            .collect();
        format!("{} {}", declaration.kind.as_str(), declarators.join(", "))
    }

    fn import(&mut self, import: &ImportDeclaration) {
        let source = quote(&import.source);
        let mut clauses = Vec::new();
        if let Some(default) = &import.default {
            clauses.push(default.clone());
        }
        if !import.specifiers.is_empty() || import.default.is_none() {
            let specifiers: Vec<String> = import
                .specifiers
                .iter()
                .map(|s| {
                    if s.imported == s.local {
                        s.local.clone()
                    } else {
                        format!("{} as {}", s.imported, s.local)
                    }
                })
                .collect();
            if !specifiers.is_empty() {
                clauses.push(format!("{{ {} }}", specifiers.join(", ")));
            }
        }

        if clauses.is_empty() {
            self.out.push_str(&format!("import {source};"));
        } else {
            self.out
                .push_str(&format!("import {} from {source};", clauses.join(", ")));
        }
    }

    fn attributes(&self, attributes: &[Attribute]) -> String {
        attributes
            .iter()
            .map(|attribute| match &attribute.value {
                None => format!(" {}", attribute.name),
                Some(AttributeValue::Literal(value)) => {
                    format!(" {}={}", attribute.name, quote(value))
                }
                Some(AttributeValue::Expression(expression)) => format!(
                    " {}={{{}}}",
                    attribute.name,
                    expression_text(expression, 0, self.indent)
                ),
            })
            .collect()
    }

    fn decorator(&self, decorator: &Decorator) -> String {
        format!(
            "@{}({})",
            decorator.name,
            self.arguments(&decorator.arguments)
        )
    }

    fn arguments(&self, arguments: &[Expression]) -> String {
        arguments
            .iter()
            .map(|a| expression_text(a, ASSIGNMENT, self.indent))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// =========================================================================
// Expressions
// =========================================================================

/// Print `expression`, parenthesized when it binds looser than `min`.
fn expression_text(expression: &Expression, min: u8, indent: usize) -> String {
    let text = Printer::new(indent).expression(expression);
    if precedence(expression) < min {
        format!("({text})")
    } else {
        text
    }
}

fn precedence(expression: &Expression) -> u8 {
    match &expression.kind {
        ExprKind::Assignment { .. } | ExprKind::Arrow { .. } => ASSIGNMENT,
        ExprKind::Ternary { .. } => CONDITIONAL,
        ExprKind::Binary { op, .. } => BINARY_BASE + op.precedence(),
        ExprKind::Unary { .. } => UNARY,
        ExprKind::Update { prefix: true, .. } => UNARY,
        ExprKind::Update { prefix: false, .. } => POSTFIX,
        ExprKind::Member { .. } | ExprKind::Call { .. } | ExprKind::New { .. } => CALL,
        _ => PRIMARY,
    }
}

impl Printer {
    fn expression(&self, expression: &Expression) -> String {
        let indent = self.indent;
        match &expression.kind {
            ExprKind::Number(value) => format_number(*value),
            ExprKind::String(value) => quote(value),
            ExprKind::Boolean(value) => value.to_string(),
            ExprKind::Null => "null".into(),
            ExprKind::This => "this".into(),
            ExprKind::Identifier(name) => name.clone(),

            ExprKind::Binary { left, op, right } => {
                let level = BINARY_BASE + op.precedence();
                let mut left_text = expression_text(left, level, indent);
                let mut right_text = expression_text(right, level + 1, indent);
                // `??` may not be mixed with `&&`/`||` without parentheses.
                if *op == BinaryOp::NullishCoalescing {
                    if is_logical(left) {
                        left_text = format!("({left_text})");
                    }
                    if is_logical(right) {
                        right_text = format!("({right_text})");
                    }
                }
                format!("{left_text} {} {right_text}", op.as_str())
            }
            ExprKind::Unary { op, operand } => {
                let operand_text = expression_text(operand, UNARY, indent);
                let op = op.as_str();
                let needs_space = op.chars().all(char::is_alphabetic)
                    || operand_text.starts_with(op.chars().last().unwrap_or(' '));
                if needs_space {
                    format!("{op} {operand_text}")
                } else {
                    format!("{op}{operand_text}")
                }
            }
            ExprKind::Update {
                op,
                prefix,
                operand,
            } => {
                if *prefix {
                    format!("{}{}", op.as_str(), expression_text(operand, UNARY, indent))
                } else {
                    format!("{}{}", expression_text(operand, CALL, indent), op.as_str())
                }
            }
            ExprKind::Member {
                object,
                property,
                computed,
                optional,
            } => {
                let mut object_text = expression_text(object, CALL, indent);
                if matches!(object.kind, ExprKind::Number(_)) {
                    object_text = format!("({object_text})");
                }
                let property_text = expression_text(property, 0, indent);
                match (computed, optional) {
                    (true, true) => format!("{object_text}?.[{property_text}]"),
                    (true, false) => format!("{object_text}[{property_text}]"),
                    (false, true) => format!("{object_text}?.{property_text}"),
                    (false, false) => format!("{object_text}.{property_text}"),
                }
            }
            ExprKind::Call { callee, arguments } => {
                let callee_text = expression_text(callee, CALL, indent);
                format!("{callee_text}({})", self.arguments(arguments))
            }
            ExprKind::New { callee, arguments } => {
                let mut callee_text = expression_text(callee, CALL, indent);
                if matches!(callee.kind, ExprKind::Call { .. }) {
                    callee_text = format!("({callee_text})");
                }
                format!("new {callee_text}({})", self.arguments(arguments))
            }
            ExprKind::Ternary {
                condition,
                consequent,
                alternate,
            } => format!(
                "{} ? {} : {}",
                expression_text(condition, CONDITIONAL + 1, indent),
                expression_text(consequent, ASSIGNMENT, indent),
                expression_text(alternate, ASSIGNMENT, indent),
            ),
            ExprKind::Object(properties) => {
                if properties.is_empty() {
                    return "{}".into();
                }
                let properties: Vec<String> =
                    properties.iter().map(|p| self.property(p)).collect();
                format!("{{ {} }}", properties.join(", "))
            }
            ExprKind::Array(items) => format!("[{}]", self.arguments(items)),
            ExprKind::Arrow { params, body } => {
                let params = params.join(", ");
                match body {
                    ArrowBody::Expression(body) => {
                        let body_text = expression_text(body, ASSIGNMENT, indent);
                        if body_text.starts_with('{') {
                            format!("({params}) => ({body_text})")
                        } else {
                            format!("({params}) => {body_text}")
                        }
                    }
                    ArrowBody::Block(body) => {
                        let mut printer = Printer::new(indent);
                        printer.block(body);
                        format!("({params}) => {}", printer.out)
                    }
                }
            }
            ExprKind::Assignment { target, op, value } => format!(
                "{} {} {}",
                expression_text(target, CALL, indent),
                op.as_str(),
                expression_text(value, ASSIGNMENT, indent),
            ),
        }
    }

    fn property(&self, property: &ObjectProperty) -> String {
        if property.shorthand {
            return property.key.clone();
        }
        let key = if is_identifier_name(&property.key) {
            property.key.clone()
        } else {
            quote(&property.key)
        };
        format!(
            "{key}: {}",
            expression_text(&property.value, ASSIGNMENT, self.indent)
        )
    }
}

fn is_logical(expression: &Expression) -> bool {
    matches!(
        expression.kind,
        ExprKind::Binary {
            op: BinaryOp::And | BinaryOp::Or,
            ..
        }
    )
}

fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Format a number, removing `.0` for integers.
pub fn format_number(n: f64) -> String {
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.into();
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Double-quoted string literal with escapes.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{b}' => out.push_str("\\v"),
            '\u{c}' => out.push_str("\\f"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

//! Abstract Syntax Tree for JSH.
//!
//! One tree holds both host-language statements and the four template
//! statements (element start, element end, self-closing element,
//! decorator). Every node kind is a closed enum variant so passes match
//! exhaustively.

use jsh_lexer::Span;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Program and statements
// ---------------------------------------------------------------------------

/// A complete compilation unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Program {
    pub body: Vec<Statement>,
}

/// A statement: host-language or template.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Statement {
    /// `expr;`
    Expression { expression: Expression },

    /// `let a = 1, b;`
    VariableDeclaration(VariableDeclaration),

    /// `function name(params) { body }`
    FunctionDeclaration(FunctionDeclaration),

    /// `return expr;`
    Return { argument: Option<Expression> },

    /// `if (test) consequent else alternate`
    If {
        test: Expression,
        consequent: Box<Statement>,
        alternate: Option<Box<Statement>>,
    },

    /// `while (test) body`
    While { test: Expression, body: Box<Statement> },

    /// `for (init; test; update) body`
    For {
        init: Option<Box<Statement>>,
        test: Option<Expression>,
        update: Option<Expression>,
        body: Box<Statement>,
    },

    /// `{ ... }`
    Block { body: Vec<Statement> },

    Break,
    Continue,

    /// `import ... from "source";`
    Import(ImportDeclaration),

    /// `export <declaration>`
    Export { declaration: Box<Statement> },

    /// `;`
    Empty,

    /// `<name attrs>`
    ElementStart(ElementStart),

    /// `</name>`
    ElementEnd(ElementEnd),

    /// `<name attrs/>`
    Element(Element),

    /// `@Name(args)`
    Decorator(Decorator),
}

impl Statement {
    /// Rebuild the arrow function block bodies found in this statement's own
    /// expressions with `f`. Statements nested in this one (blocks, branches,
    /// loop and function bodies) are not visited.
    pub fn try_map_arrow_blocks<E, F>(self, f: &mut F) -> Result<Statement, E>
    where
        F: FnMut(Vec<Statement>) -> Result<Vec<Statement>, E>,
    {
        Ok(match self {
            Statement::Expression { expression } => Statement::Expression {
                expression: expression.try_map_arrow_blocks(f)?,
            },
            Statement::VariableDeclaration(VariableDeclaration { kind, declarations }) => {
                let declarations = declarations
                    .into_iter()
                    .map(|d| -> Result<VariableDeclarator, E> {
                        Ok(VariableDeclarator {
                            name: d.name,
                            init: d.init.map(|init| init.try_map_arrow_blocks(f)).transpose()?,
                        })
                    })
                    .collect::<Result<Vec<_>, E>>()?;
                Statement::VariableDeclaration(VariableDeclaration { kind, declarations })
            }
            Statement::Return { argument } => Statement::Return {
                argument: argument.map(|a| a.try_map_arrow_blocks(f)).transpose()?,
            },
            Statement::If {
                test,
                consequent,
                alternate,
            } => Statement::If {
                test: test.try_map_arrow_blocks(f)?,
                consequent,
                alternate,
            },
            Statement::While { test, body } => Statement::While {
                test: test.try_map_arrow_blocks(f)?,
                body,
            },
            Statement::For {
                init,
                test,
                update,
                body,
            } => Statement::For {
                init: match init {
                    Some(init) => Some(Box::new((*init).try_map_arrow_blocks(f)?)),
                    None => None,
                },
                test: test.map(|t| t.try_map_arrow_blocks(f)).transpose()?,
                update: update.map(|u| u.try_map_arrow_blocks(f)).transpose()?,
                body,
            },
            Statement::ElementStart(ElementStart {
                name,
                attributes,
                span,
            }) => Statement::ElementStart(ElementStart {
                name,
                attributes: map_attributes(attributes, f)?,
                span,
            }),
            Statement::Element(Element {
                name,
                attributes,
                span,
            }) => Statement::Element(Element {
                name,
                attributes: map_attributes(attributes, f)?,
                span,
            }),
            Statement::Decorator(Decorator {
                name,
                arguments,
                span,
            }) => Statement::Decorator(Decorator {
                name,
                arguments: map_all(arguments, f)?,
                span,
            }),
            other => other,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableKind {
    Let,
    Const,
    Var,
}

impl VariableKind {
    pub fn as_str(self) -> &'static str {
        match self {
            VariableKind::Let => "let",
            VariableKind::Const => "const",
            VariableKind::Var => "var",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableDeclaration {
    pub kind: VariableKind,
    pub declarations: Vec<VariableDeclarator>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableDeclarator {
    pub name: String,
    pub init: Option<Expression>,
}

/// A function declaration. `decorator` is filled in by decorator attachment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Statement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decorator: Option<Decorator>,
}

/// `import d, { a, b as c } from "source";`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportDeclaration {
    pub default: Option<String>,
    pub specifiers: Vec<ImportSpecifier>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSpecifier {
    pub imported: String,
    pub local: String,
}

impl ImportSpecifier {
    /// `{ name }`: imported and local names are the same.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            imported: name.clone(),
            local: name,
        }
    }
}

// ---------------------------------------------------------------------------
// Template nodes
// ---------------------------------------------------------------------------

/// An opening tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementStart {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub span: Span,
}

/// A closing tag. The name is recorded but never checked against the
/// opener: pairing is by nesting position only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementEnd {
    pub name: String,
    pub span: Span,
}

/// A self-closing tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub span: Span,
}

/// A tag attribute: `checked`, `href="x"`, `[value]={expr}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<AttributeValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Quoted string content.
    Literal(String),
    /// `{ expr }`
    Expression(Expression),
}

/// `@Name` or `@Name(args)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decorator {
    pub name: String,
    pub arguments: Vec<Expression>,
    pub span: Span,
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// A complete expression node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expression {
    #[serde(flatten)]
    pub kind: ExprKind,
    pub span: Span,
}

impl Expression {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// String, number, boolean or null literal.
    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Number(_) | ExprKind::String(_) | ExprKind::Boolean(_) | ExprKind::Null
        )
    }

    /// Rebuild the arrow function block bodies inside this expression with
    /// `f`, outermost first. Arrows nested in a block body are left to `f`.
    pub fn try_map_arrow_blocks<E, F>(self, f: &mut F) -> Result<Expression, E>
    where
        F: FnMut(Vec<Statement>) -> Result<Vec<Statement>, E>,
    {
        let Expression { kind, span } = self;
        let kind = match kind {
            ExprKind::Binary { left, op, right } => ExprKind::Binary {
                left: map_boxed(left, f)?,
                op,
                right: map_boxed(right, f)?,
            },
            ExprKind::Unary { op, operand } => ExprKind::Unary {
                op,
                operand: map_boxed(operand, f)?,
            },
            ExprKind::Update {
                op,
                prefix,
                operand,
            } => ExprKind::Update {
                op,
                prefix,
                operand: map_boxed(operand, f)?,
            },
            ExprKind::Member {
                object,
                property,
                computed,
                optional,
            } => ExprKind::Member {
                object: map_boxed(object, f)?,
                property: map_boxed(property, f)?,
                computed,
                optional,
            },
            ExprKind::Call { callee, arguments } => ExprKind::Call {
                callee: map_boxed(callee, f)?,
                arguments: map_all(arguments, f)?,
            },
            ExprKind::New { callee, arguments } => ExprKind::New {
                callee: map_boxed(callee, f)?,
                arguments: map_all(arguments, f)?,
            },
            ExprKind::Ternary {
                condition,
                consequent,
                alternate,
            } => ExprKind::Ternary {
                condition: map_boxed(condition, f)?,
                consequent: map_boxed(consequent, f)?,
                alternate: map_boxed(alternate, f)?,
            },
            ExprKind::Object(properties) => ExprKind::Object(
                properties
                    .into_iter()
                    .map(|p| -> Result<ObjectProperty, E> {
                        Ok(ObjectProperty {
                            key: p.key,
                            value: p.value.try_map_arrow_blocks(f)?,
                            shorthand: p.shorthand,
                        })
                    })
                    .collect::<Result<Vec<_>, E>>()?,
            ),
            ExprKind::Array(items) => ExprKind::Array(map_all(items, f)?),
            ExprKind::Arrow { params, body } => ExprKind::Arrow {
                params,
                body: match body {
                    ArrowBody::Expression(body) => ArrowBody::Expression(map_boxed(body, f)?),
                    ArrowBody::Block(body) => ArrowBody::Block(f(body)?),
                },
            },
            ExprKind::Assignment { target, op, value } => ExprKind::Assignment {
                target: map_boxed(target, f)?,
                op,
                value: map_boxed(value, f)?,
            },
            leaf => leaf,
        };
        Ok(Expression { kind, span })
    }
}

fn map_boxed<E, F>(expression: Box<Expression>, f: &mut F) -> Result<Box<Expression>, E>
where
    F: FnMut(Vec<Statement>) -> Result<Vec<Statement>, E>,
{
    Ok(Box::new((*expression).try_map_arrow_blocks(f)?))
}

fn map_all<E, F>(expressions: Vec<Expression>, f: &mut F) -> Result<Vec<Expression>, E>
where
    F: FnMut(Vec<Statement>) -> Result<Vec<Statement>, E>,
{
    expressions
        .into_iter()
        .map(|e| e.try_map_arrow_blocks(f))
        .collect()
}

fn map_attributes<E, F>(attributes: Vec<Attribute>, f: &mut F) -> Result<Vec<Attribute>, E>
where
    F: FnMut(Vec<Statement>) -> Result<Vec<Statement>, E>,
{
    attributes
        .into_iter()
        .map(|attribute| -> Result<Attribute, E> {
            let value = match attribute.value {
                Some(AttributeValue::Expression(e)) => {
                    Some(AttributeValue::Expression(e.try_map_arrow_blocks(f)?))
                }
                other => other,
            };
            Ok(Attribute {
                name: attribute.name,
                value,
            })
        })
        .collect()
}

/// Expression variants.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum ExprKind {
    /// Numeric literal: `42`, `3.14`
    Number(f64),

    /// String literal: `"hello"`, `'world'`
    String(String),

    /// Boolean literal: `true`, `false`
    Boolean(bool),

    /// `null`
    Null,

    /// `this`
    This,

    /// Identifier: `count`, `$renderContext`
    Identifier(String),

    /// Binary operation: `a + b`, `count > 0`, `a && b`
    Binary {
        left: Box<Expression>,
        op: BinaryOp,
        right: Box<Expression>,
    },

    /// Unary operation: `!active`, `-count`, `typeof x`
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },

    /// Increment/decrement: `++i`, `count--`
    Update {
        op: UpdateOp,
        prefix: bool,
        operand: Box<Expression>,
    },

    /// Member access: `user.name`, `items[0]`, `a?.b`
    Member {
        object: Box<Expression>,
        property: Box<Expression>,
        computed: bool,
        optional: bool,
    },

    /// Function call: `save()`, `items.push(item)`
    Call {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
    },

    /// `new Foo(args)`
    New {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
    },

    /// Ternary: `count > 0 ? 'yes' : 'no'`
    Ternary {
        condition: Box<Expression>,
        consequent: Box<Expression>,
        alternate: Box<Expression>,
    },

    /// Object literal: `{ count: 0, name }`
    Object(Vec<ObjectProperty>),

    /// Array literal: `[1, 2, 3]`
    Array(Vec<Expression>),

    /// Arrow function: `(x) => x + 1`, `() => { ... }`
    Arrow { params: Vec<String>, body: ArrowBody },

    /// Assignment: `count = 5`, `count += 1`
    Assignment {
        target: Box<Expression>,
        op: AssignOp,
        value: Box<Expression>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ArrowBody {
    Expression(Box<Expression>),
    Block(Vec<Statement>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectProperty {
    pub key: String,
    pub value: Expression,
    pub shorthand: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Neq,
    StrictEq,
    StrictNeq,
    Lt,
    Gt,
    Lte,
    Gte,
    And,
    Or,
    NullishCoalescing,
}

impl BinaryOp {
    /// Binding power; higher binds tighter. All binary operators are
    /// left-associative.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::NullishCoalescing => 1,
            BinaryOp::Or => 2,
            BinaryOp::And => 3,
            BinaryOp::Eq | BinaryOp::Neq | BinaryOp::StrictEq | BinaryOp::StrictNeq => 4,
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Lte | BinaryOp::Gte => 5,
            BinaryOp::Add | BinaryOp::Sub => 6,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 7,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Neq => "!=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNeq => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Lte => "<=",
            BinaryOp::Gte => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::NullishCoalescing => "??",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    Typeof,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Typeof => "typeof",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

impl UpdateOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateOp::Increment => "++",
            UpdateOp::Decrement => "--",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
}

impl AssignOp {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubAssign => "-=",
            AssignOp::MulAssign => "*=",
            AssignOp::DivAssign => "/=",
        }
    }
}

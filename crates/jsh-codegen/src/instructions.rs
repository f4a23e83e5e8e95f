//! Instruction lowering.
//!
//! Rewrites every decorated function into a template function: the render
//! context becomes its first parameter and its markup becomes a flat
//! sequence of instruction calls, each addressed by an index that counts
//! from 0 in document order within the function.
//!
//! ```text
//! <h1>"Hi"</h1>   →   ΘelementStart($renderContext, 0, "h1");
//!                     Θtext($renderContext, 1, "Hi");
//!                     ΘelementEnd($renderContext, 0);
//! ```
//!
//! The instructions used anywhere in the program are imported once, sorted,
//! from the runtime module. Markup in undecorated functions, in arrow
//! function bodies and at top level is left as it is, but decorated
//! functions nested anywhere inside them are still lowered.

use std::collections::BTreeSet;

use jsh_lexer::Span;
use jsh_parser::ast::{
    Attribute, AttributeValue, ExprKind, Expression, FunctionDeclaration, ImportDeclaration,
    ImportSpecifier, Program, Statement,
};

use crate::{CodegenError, CompileOptions};

pub const TEXT: &str = "Θtext";
pub const ELEMENT_START: &str = "ΘelementStart";
pub const ELEMENT_END: &str = "ΘelementEnd";
pub const ELEMENT: &str = "Θelement";

/// Lower the template functions of `program` to instruction calls.
pub fn lower_instructions(
    program: Program,
    options: &CompileOptions,
) -> Result<Program, CodegenError> {
    let mut ctx = LoweringContext::new(options);
    let mut body = ctx.lower_list(program.body)?;

    if !ctx.imports.is_empty() {
        body.insert(0, ctx.import_declaration());
    }
    Ok(Program { body })
}

/// Traversal state for one program.
struct LoweringContext<'a> {
    options: &'a CompileOptions,
    /// Instruction names used so far, kept sorted.
    imports: BTreeSet<String>,
    template: TemplateScope,
}

/// State of the innermost decorated function.
#[derive(Default)]
struct TemplateScope {
    active: bool,
    next_index: usize,
    /// Indices of open `ElementStart`s, innermost last.
    open_elements: Vec<usize>,
    function: String,
}

impl<'a> LoweringContext<'a> {
    fn new(options: &'a CompileOptions) -> Self {
        Self {
            options,
            imports: BTreeSet::new(),
            template: TemplateScope::default(),
        }
    }

    fn lower_list(&mut self, statements: Vec<Statement>) -> Result<Vec<Statement>, CodegenError> {
        statements
            .into_iter()
            .map(|statement| self.lower(statement))
            .collect()
    }

    fn lower_boxed(&mut self, statement: Box<Statement>) -> Result<Box<Statement>, CodegenError> {
        Ok(Box::new(self.lower(*statement)?))
    }

    fn lower(&mut self, statement: Statement) -> Result<Statement, CodegenError> {
        let statement = statement.try_map_arrow_blocks(&mut |body| self.lower_plain_body(body))?;

        match statement {
            Statement::FunctionDeclaration(function) if function.decorator.is_some() => {
                self.lower_template_function(function)
            }
            Statement::FunctionDeclaration(mut function) => {
                function.body = self.lower_plain_body(function.body)?;
                Ok(Statement::FunctionDeclaration(function))
            }
            Statement::Export { declaration } => Ok(Statement::Export {
                declaration: self.lower_boxed(declaration)?,
            }),
            Statement::Block { body } => Ok(Statement::Block {
                body: self.lower_list(body)?,
            }),
            Statement::If {
                test,
                consequent,
                alternate,
            } => Ok(Statement::If {
                test,
                consequent: self.lower_boxed(consequent)?,
                alternate: alternate.map(|s| self.lower_boxed(s)).transpose()?,
            }),
            Statement::While { test, body } => Ok(Statement::While {
                test,
                body: self.lower_boxed(body)?,
            }),
            Statement::For {
                init,
                test,
                update,
                body,
            } => Ok(Statement::For {
                init,
                test,
                update,
                body: self.lower_boxed(body)?,
            }),
            statement if !self.template.active => Ok(statement),

            Statement::ElementStart(element) => {
                let index = self.next_index();
                self.template.open_elements.push(index);
                Ok(self.element_call(ELEMENT_START, index, element.name, element.attributes, element.span))
            }
            Statement::ElementEnd(element) => {
                let Some(index) = self.template.open_elements.pop() else {
                    return Err(CodegenError {
                        message: format!(
                            "Closing tag </{}> at line {}, column {} has no matching opening tag in template function '{}'",
                            element.name, element.span.line, element.span.column, self.template.function
                        ),
                    });
                };
                Ok(self.call(ELEMENT_END, index, Vec::new(), element.span))
            }
            Statement::Element(element) => {
                let index = self.next_index();
                Ok(self.element_call(ELEMENT, index, element.name, element.attributes, element.span))
            }
            Statement::Expression { expression } if expression.is_literal() => {
                let index = self.next_index();
                let span = expression.span;
                Ok(self.call(TEXT, index, vec![expression], span))
            }
            other => Ok(other),
        }
    }

    /// Lower a decorated function with a fresh template scope.
    fn lower_template_function(
        &mut self,
        function: FunctionDeclaration,
    ) -> Result<Statement, CodegenError> {
        let scope = TemplateScope {
            active: true,
            function: function.name.clone(),
            ..TemplateScope::default()
        };
        let outer = std::mem::replace(&mut self.template, scope);
        let body = self.lower_list(function.body);
        self.template = outer;

        let mut params = Vec::with_capacity(function.params.len() + 1);
        params.push(self.options.render_context.clone());
        params.extend(function.params);

        Ok(Statement::FunctionDeclaration(FunctionDeclaration {
            name: function.name,
            params,
            body: body?,
            decorator: None,
        }))
    }

    /// Lower a body that is not itself a template.
    fn lower_plain_body(&mut self, body: Vec<Statement>) -> Result<Vec<Statement>, CodegenError> {
        let outer = std::mem::take(&mut self.template);
        let body = self.lower_list(body);
        self.template = outer;
        body
    }

    fn next_index(&mut self) -> usize {
        let index = self.template.next_index;
        self.template.next_index += 1;
        index
    }

    /// `Θinstruction(ctx, index, "name"[, [attrs]])`
    fn element_call(
        &mut self,
        instruction: &str,
        index: usize,
        name: String,
        attributes: Vec<Attribute>,
        span: Span,
    ) -> Statement {
        let mut arguments = vec![string(name, span)];
        arguments.extend(attribute_array(attributes, span));
        self.call(instruction, index, arguments, span)
    }

    /// `Θinstruction(ctx, index, ...arguments)`, recording the import.
    fn call(
        &mut self,
        instruction: &str,
        index: usize,
        arguments: Vec<Expression>,
        span: Span,
    ) -> Statement {
        self.imports.insert(instruction.to_string());

        let mut all = Vec::with_capacity(arguments.len() + 2);
        all.push(identifier(&self.options.render_context, span));
        all.push(Expression::new(ExprKind::Number(index as f64), span));
        all.extend(arguments);

        Statement::Expression {
            expression: Expression::new(
                ExprKind::Call {
                    callee: Box::new(identifier(instruction, span)),
                    arguments: all,
                },
                span,
            ),
        }
    }

    fn import_declaration(&self) -> Statement {
        Statement::Import(ImportDeclaration {
            default: None,
            specifiers: self.imports.iter().map(ImportSpecifier::named).collect(),
            source: self.options.runtime_module.clone(),
        })
    }
}

/// `["name", value, ...]` for a non-empty attribute list.
///
/// Literal values become strings, expression values are passed through and
/// a name-only attribute gets `""`.
fn attribute_array(attributes: Vec<Attribute>, span: Span) -> Option<Expression> {
    if attributes.is_empty() {
        return None;
    }

    let mut items = Vec::with_capacity(attributes.len() * 2);
    for attribute in attributes {
        items.push(string(attribute.name, span));
        items.push(match attribute.value {
            None => string(String::new(), span),
            Some(AttributeValue::Literal(value)) => string(value, span),
            Some(AttributeValue::Expression(expression)) => expression,
        });
    }
    Some(Expression::new(ExprKind::Array(items), span))
}

fn identifier(name: &str, span: Span) -> Expression {
    Expression::new(ExprKind::Identifier(name.to_string()), span)
}

fn string(value: String, span: Span) -> Expression {
    Expression::new(ExprKind::String(value), span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attach_decorators;
    use jsh_parser::ast::Decorator;
    use jsh_parser::Parser;
    use pretty_assertions::assert_eq;

    fn lower(source: &str) -> Program {
        let attached = attach_decorators(Parser::parse(source).unwrap()).program;
        lower_instructions(attached, &CompileOptions::default()).unwrap()
    }

    /// `name(arg, ...)` for every instruction call in a function body,
    /// descending into nested blocks.
    fn calls(body: &[Statement]) -> Vec<String> {
        let mut out = Vec::new();
        for statement in body {
            match statement {
                Statement::Expression {
                    expression:
                        Expression {
                            kind: ExprKind::Call { callee, arguments },
                            ..
                        },
                } => {
                    let args: Vec<String> = arguments.iter().map(render).collect();
                    out.push(format!("{}({})", render(callee), args.join(",")));
                }
                Statement::Block { body } => out.extend(calls(body)),
                Statement::If {
                    consequent,
                    alternate,
                    ..
                } => {
                    out.extend(calls(std::slice::from_ref(consequent.as_ref())));
                    if let Some(alternate) = alternate {
                        out.extend(calls(std::slice::from_ref(alternate.as_ref())));
                    }
                }
                _ => {}
            }
        }
        out
    }

    fn render(expr: &Expression) -> String {
        match &expr.kind {
            ExprKind::Identifier(name) => name.clone(),
            ExprKind::Number(n) => n.to_string(),
            ExprKind::String(s) => format!("{s:?}"),
            ExprKind::Boolean(b) => b.to_string(),
            ExprKind::Array(items) => {
                let items: Vec<String> = items.iter().map(render).collect();
                format!("[{}]", items.join(","))
            }
            other => format!("{other:?}"),
        }
    }

    fn function_at(program: &Program, i: usize) -> &FunctionDeclaration {
        match &program.body[i] {
            Statement::FunctionDeclaration(f) => f,
            other => panic!("Expected FunctionDeclaration, got {other:?}"),
        }
    }

    fn imports(program: &Program) -> Vec<String> {
        match &program.body[0] {
            Statement::Import(import) => {
                assert_eq!(import.source, "fw-x");
                import.specifiers.iter().map(|s| s.local.clone()).collect()
            }
            other => panic!("Expected Import, got {other:?}"),
        }
    }

    // =========================================================================
    // Instructions
    // =========================================================================

    #[test]
    fn test_text_literal() {
        let program = lower(r#"@Template() function f() { "Hi" }"#);
        let f = function_at(&program, 1);
        assert_eq!(f.params, vec!["$renderContext"]);
        assert_eq!(calls(&f.body), vec![r#"Θtext($renderContext,0,"Hi")"#]);
        assert_eq!(imports(&program), vec!["Θtext"]);
    }

    #[test]
    fn test_element_pair_with_text() {
        let program = lower(r#"@Template() function f() { <h1>"Hi"</h1> }"#);
        assert_eq!(
            calls(&function_at(&program, 1).body),
            vec![
                r#"ΘelementStart($renderContext,0,"h1")"#,
                r#"Θtext($renderContext,1,"Hi")"#,
                "ΘelementEnd($renderContext,0)",
            ]
        );
        assert_eq!(imports(&program), vec!["ΘelementEnd", "ΘelementStart", "Θtext"]);
    }

    #[test]
    fn test_self_closing() {
        let program = lower("@Template() function f() { <br/> }");
        assert_eq!(
            calls(&function_at(&program, 1).body),
            vec![r#"Θelement($renderContext,0,"br")"#]
        );
        assert_eq!(imports(&program), vec!["Θelement"]);
    }

    #[test]
    fn test_nested_indices_pair_by_position() {
        let program = lower("@T() function f() { <a><b></c></a> }");
        assert_eq!(
            calls(&function_at(&program, 1).body),
            vec![
                r#"ΘelementStart($renderContext,0,"a")"#,
                r#"ΘelementStart($renderContext,1,"b")"#,
                "ΘelementEnd($renderContext,1)",
                "ΘelementEnd($renderContext,0)",
            ]
        );
    }

    #[test]
    fn test_literal_kinds_become_text() {
        let program = lower("@T() function f() { 1; true; null; x; }");
        assert_eq!(
            calls(&function_at(&program, 1).body),
            vec![
                "Θtext($renderContext,0,1)",
                "Θtext($renderContext,1,true)",
                "Θtext($renderContext,2,Null)",
            ]
        );
    }

    #[test]
    fn test_literal_text_between_tags() {
        let program = lower("@T() function f() { <b>42</b><i>true</i><u>null</u> }");
        assert_eq!(
            calls(&function_at(&program, 1).body),
            vec![
                r#"ΘelementStart($renderContext,0,"b")"#,
                "Θtext($renderContext,1,42)",
                "ΘelementEnd($renderContext,0)",
                r#"ΘelementStart($renderContext,2,"i")"#,
                "Θtext($renderContext,3,true)",
                "ΘelementEnd($renderContext,2)",
                r#"ΘelementStart($renderContext,4,"u")"#,
                "Θtext($renderContext,5,Null)",
                "ΘelementEnd($renderContext,4)",
            ]
        );
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    #[test]
    fn test_attribute_flattening() {
        let program = lower(r#"@T() function f() { <input type="text" checked [value]={v}/> }"#);
        assert_eq!(
            calls(&function_at(&program, 1).body),
            vec![r#"Θelement($renderContext,0,"input",["type","text","checked","","[value]",v])"#]
        );
    }

    #[test]
    fn test_event_handler_string() {
        let program = lower(r#"@T() function f() { <button (click)='doSth()'></button> }"#);
        assert_eq!(
            calls(&function_at(&program, 1).body)[0],
            r#"ΘelementStart($renderContext,0,"button",["(click)","doSth()"])"#
        );
    }

    // =========================================================================
    // Scope
    // =========================================================================

    #[test]
    fn test_nested_blocks_share_counter() {
        let program = lower("@T() function f(x) { <ul>\nif (x) { <li/> } else { \"none\" }\n</ul> }");
        let f = function_at(&program, 1);
        assert_eq!(f.params, vec!["$renderContext", "x"]);
        assert_eq!(
            calls(&f.body),
            vec![
                r#"ΘelementStart($renderContext,0,"ul")"#,
                r#"Θelement($renderContext,1,"li")"#,
                r#"Θtext($renderContext,2,"none")"#,
                "ΘelementEnd($renderContext,0)",
            ]
        );
    }

    #[test]
    fn test_counter_resets_and_outer_scope_restored() {
        let program = lower("@T() function f() { <a>\n@T() function g() { <b/> }\n\"x\"\n</a> }");
        let f = function_at(&program, 1);
        assert_eq!(
            calls(&f.body),
            vec![
                r#"ΘelementStart($renderContext,0,"a")"#,
                r#"Θtext($renderContext,1,"x")"#,
                "ΘelementEnd($renderContext,0)",
            ]
        );
        match &f.body[1] {
            Statement::FunctionDeclaration(g) => {
                assert_eq!(calls(&g.body), vec![r#"Θelement($renderContext,0,"b")"#]);
            }
            other => panic!("Expected FunctionDeclaration, got {other:?}"),
        }
    }

    #[test]
    fn test_undecorated_nested_function_untouched() {
        let program = lower("@T() function f() { function g() { <b/> \"t\" } }");
        // Nothing was lowered, so nothing is imported.
        let f = function_at(&program, 0);
        assert_eq!(f.params, vec!["$renderContext"]);
        match &f.body[0] {
            Statement::FunctionDeclaration(g) => {
                assert!(g.params.is_empty());
                assert!(matches!(g.body[0], Statement::Element(_)));
                assert!(matches!(g.body[1], Statement::Expression { .. }));
                assert!(calls(&g.body).is_empty());
            }
            other => panic!("Expected FunctionDeclaration, got {other:?}"),
        }
    }

    #[test]
    fn test_decorated_function_inside_undecorated_one() {
        let program = lower("function outer() {\n<p/>\n@Template() function inner() { <br/> }\n}");
        assert_eq!(imports(&program), vec!["Θelement"]);
        let outer = function_at(&program, 1);
        assert!(outer.params.is_empty());
        // The outer function's own markup stays as it is.
        assert!(matches!(outer.body[0], Statement::Element(_)));
        match &outer.body[1] {
            Statement::FunctionDeclaration(inner) => {
                assert!(inner.decorator.is_none());
                assert_eq!(inner.params, vec!["$renderContext"]);
                assert_eq!(calls(&inner.body), vec![r#"Θelement($renderContext,0,"br")"#]);
            }
            other => panic!("Expected FunctionDeclaration, got {other:?}"),
        }
    }

    #[test]
    fn test_decorated_function_inside_arrow_block() {
        use jsh_parser::ast::ArrowBody;

        let program = lower("const r = () => {\n<p/>\n@T() function g() { \"x\" }\n}");
        assert_eq!(imports(&program), vec!["Θtext"]);
        let Statement::VariableDeclaration(declaration) = &program.body[1] else {
            panic!("Expected VariableDeclaration, got {:?}", program.body[1]);
        };
        let init = declaration.declarations[0].init.as_ref().unwrap();
        let ExprKind::Arrow {
            body: ArrowBody::Block(body),
            ..
        } = &init.kind
        else {
            panic!("Expected block arrow, got {:?}", init.kind);
        };
        assert!(matches!(body[0], Statement::Element(_)));
        match &body[1] {
            Statement::FunctionDeclaration(g) => {
                assert_eq!(g.params, vec!["$renderContext"]);
                assert_eq!(calls(&g.body), vec![r#"Θtext($renderContext,0,"x")"#]);
            }
            other => panic!("Expected FunctionDeclaration, got {other:?}"),
        }
    }

    #[test]
    fn test_arrow_inside_template_keeps_its_markup() {
        let program = lower("@T() function f() { <a/>\nlet h = () => { <b/> }\n<c/> }");
        let f = function_at(&program, 1);
        assert_eq!(
            calls(&f.body),
            vec![
                r#"Θelement($renderContext,0,"a")"#,
                r#"Θelement($renderContext,1,"c")"#,
            ]
        );
    }

    #[test]
    fn test_no_template_functions_is_identity() {
        let source = "import {x} from \"y\";\nfunction g(a) { <b/> }\n<a>\"t\"</a>";
        let program = Parser::parse(source).unwrap();
        let lowered = lower_instructions(program.clone(), &CompileOptions::default()).unwrap();
        assert_eq!(lowered, program);
    }

    #[test]
    fn test_decorator_is_consumed() {
        let program = lower("@T() function f() {}");
        assert!(function_at(&program, 0).decorator.is_none());
        // No instruction used, so no import either.
        assert_eq!(program.body.len(), 1);
    }

    #[test]
    fn test_unmatched_end_in_hand_built_tree() {
        let span = Span::new(0, 4, 1, 1);
        let program = Program {
            body: vec![Statement::FunctionDeclaration(FunctionDeclaration {
                name: "f".into(),
                params: Vec::new(),
                body: vec![Statement::ElementEnd(jsh_parser::ast::ElementEnd {
                    name: "a".into(),
                    span,
                })],
                decorator: Some(Decorator {
                    name: "T".into(),
                    arguments: Vec::new(),
                    span,
                }),
            })],
        };
        let err = lower_instructions(program, &CompileOptions::default()).unwrap_err();
        assert!(err.message.contains("</a>"));
        assert!(err.message.contains("'f'"));
    }
}

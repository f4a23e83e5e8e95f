//! Decorator attachment.
//!
//! Moves every `@Name(args)` statement onto the function declaration that
//! follows it in document order. The pending decorator survives across
//! nested statement lists, so `@T() if (x) { function f() {} }` decorates
//! `f`, and so do function bodies and arrow function block bodies. A
//! decorator that is replaced by a newer one, or that is still pending at
//! the end of the program, is reported as dropped.

use std::convert::Infallible;

use jsh_parser::ast::{Decorator, Program, Statement};

/// Result of [`attach_decorators`].
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub program: Program,
    /// Decorators that never reached a function, in source order.
    pub dropped: Vec<Decorator>,
}

/// Attach decorators to the function declarations they precede.
///
/// Idempotent: the output holds no decorator statements, so a second run
/// returns the same tree and drops nothing.
pub fn attach_decorators(program: Program) -> Attachment {
    let mut ctx = AttachContext::default();
    let body = ctx.attach_list(program.body);
    ctx.dropped.extend(ctx.pending.take());

    Attachment {
        program: Program { body },
        dropped: ctx.dropped,
    }
}

#[derive(Default)]
struct AttachContext {
    pending: Option<Decorator>,
    dropped: Vec<Decorator>,
}

impl AttachContext {
    fn attach_list(&mut self, statements: Vec<Statement>) -> Vec<Statement> {
        let mut out = Vec::with_capacity(statements.len());
        for statement in statements {
            match statement {
                Statement::Decorator(decorator) => self.hold(decorator),
                other => out.push(self.attach(other)),
            }
        }
        out
    }

    fn hold(&mut self, decorator: Decorator) {
        if let Some(replaced) = self.pending.replace(decorator) {
            self.dropped.push(replaced);
        }
    }

    /// A statement in single-statement position (`if (x) @T()`).
    fn attach_boxed(&mut self, statement: Box<Statement>) -> Box<Statement> {
        match *statement {
            Statement::Decorator(decorator) => {
                self.hold(decorator);
                Box::new(Statement::Empty)
            }
            other => Box::new(self.attach(other)),
        }
    }

    fn attach(&mut self, statement: Statement) -> Statement {
        let attached: Result<Statement, Infallible> =
            statement.try_map_arrow_blocks(&mut |body| Ok(self.attach_list(body)));
        let statement = match attached {
            Ok(statement) => statement,
            Err(never) => match never {},
        };

        match statement {
            Statement::FunctionDeclaration(mut function) => {
                if let Some(decorator) = self.pending.take() {
                    function.decorator = Some(decorator);
                }
                function.body = self.attach_list(function.body);
                Statement::FunctionDeclaration(function)
            }
            Statement::Export { declaration } => Statement::Export {
                declaration: self.attach_boxed(declaration),
            },
            Statement::Block { body } => Statement::Block {
                body: self.attach_list(body),
            },
            Statement::If {
                test,
                consequent,
                alternate,
            } => Statement::If {
                test,
                consequent: self.attach_boxed(consequent),
                alternate: alternate.map(|alternate| self.attach_boxed(alternate)),
            },
            Statement::While { test, body } => Statement::While {
                test,
                body: self.attach_boxed(body),
            },
            Statement::For {
                init,
                test,
                update,
                body,
            } => Statement::For {
                init,
                test,
                update,
                body: self.attach_boxed(body),
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsh_parser::ast::FunctionDeclaration;
    use jsh_parser::Parser;
    use pretty_assertions::assert_eq;

    fn attach(source: &str) -> Attachment {
        attach_decorators(Parser::parse(source).unwrap())
    }

    fn function(stmt: &Statement) -> &FunctionDeclaration {
        match stmt {
            Statement::FunctionDeclaration(f) => f,
            Statement::Export { declaration } => function(declaration),
            other => panic!("Expected FunctionDeclaration, got {other:?}"),
        }
    }

    fn decorator_name(stmt: &Statement) -> Option<&str> {
        function(stmt).decorator.as_ref().map(|d| d.name.as_str())
    }

    #[test]
    fn test_decorator_attaches_to_next_function() {
        let result = attach("@Template()\nfunction f() {}");
        assert_eq!(result.program.body.len(), 1);
        assert_eq!(decorator_name(&result.program.body[0]), Some("Template"));
        assert!(result.dropped.is_empty());
    }

    #[test]
    fn test_decorator_keeps_arguments() {
        let result = attach(r#"@Component({tag: "div"}) function f() {}"#);
        let decorator = function(&result.program.body[0]).decorator.as_ref().unwrap();
        assert_eq!(decorator.name, "Component");
        assert_eq!(decorator.arguments.len(), 1);
    }

    #[test]
    fn test_decorator_skips_non_function_statements() {
        let result = attach("@T()\nlet a = 1;\nfunction f() {}");
        assert_eq!(result.program.body.len(), 2);
        assert_eq!(decorator_name(&result.program.body[1]), Some("T"));
    }

    #[test]
    fn test_only_next_function_is_decorated() {
        let result = attach("@T() function f() {}\nfunction g() {}");
        assert_eq!(decorator_name(&result.program.body[0]), Some("T"));
        assert_eq!(decorator_name(&result.program.body[1]), None);
    }

    #[test]
    fn test_exported_function() {
        let result = attach("@T()\nexport function f() {}");
        assert!(matches!(result.program.body[0], Statement::Export { .. }));
        assert_eq!(decorator_name(&result.program.body[0]), Some("T"));
    }

    #[test]
    fn test_newer_decorator_replaces_pending() {
        let result = attach("@A()\n@B()\nfunction f() {}");
        assert_eq!(decorator_name(&result.program.body[0]), Some("B"));
        let dropped: Vec<&str> = result.dropped.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(dropped, vec!["A"]);
    }

    #[test]
    fn test_trailing_decorator_is_dropped() {
        let result = attach("function f() {}\n@Orphan");
        assert_eq!(decorator_name(&result.program.body[0]), None);
        assert_eq!(result.program.body.len(), 1);
        assert_eq!(result.dropped[0].name, "Orphan");
    }

    #[test]
    fn test_nested_lists_in_document_order() {
        let result = attach("function outer() { @T() function inner() {} }");
        let outer = function(&result.program.body[0]);
        assert!(outer.decorator.is_none());
        assert_eq!(decorator_name(&outer.body[0]), Some("T"));
    }

    #[test]
    fn test_pending_decorator_crosses_into_block() {
        let result = attach("@T()\nif (x) { function f() {} }");
        match &result.program.body[0] {
            Statement::If { consequent, .. } => match consequent.as_ref() {
                Statement::Block { body } => assert_eq!(decorator_name(&body[0]), Some("T")),
                other => panic!("Expected Block, got {other:?}"),
            },
            other => panic!("Expected If, got {other:?}"),
        }
    }

    #[test]
    fn test_decorator_inside_arrow_block() {
        use jsh_parser::ast::{ArrowBody, ExprKind};

        let result = attach("const r = () => {\n@T() function g() { \"x\" }\n}");
        assert!(result.dropped.is_empty());
        let Statement::VariableDeclaration(declaration) = &result.program.body[0] else {
            panic!("Expected VariableDeclaration, got {:?}", result.program.body[0]);
        };
        let init = declaration.declarations[0].init.as_ref().unwrap();
        match &init.kind {
            ExprKind::Arrow {
                body: ArrowBody::Block(body),
                ..
            } => {
                assert_eq!(body.len(), 1);
                assert_eq!(decorator_name(&body[0]), Some("T"));
            }
            other => panic!("Expected block arrow, got {other:?}"),
        }
    }

    #[test]
    fn test_trailing_decorator_in_call_argument_is_dropped() {
        let result = attach("run(() => { @Orphan })");
        assert_eq!(result.dropped.len(), 1);
        assert_eq!(result.dropped[0].name, "Orphan");
    }

    #[test]
    fn test_idempotent() {
        let once = attach("@A() function f() { @B() function g() {} }\n@C()");
        let twice = attach_decorators(once.program.clone());
        assert_eq!(twice.program, once.program);
        assert!(twice.dropped.is_empty());
    }

    #[test]
    fn test_no_decorators_is_identity() {
        let program = Parser::parse("let a = 1;\n<a></a>\nfunction f(x) { return x }").unwrap();
        let result = attach_decorators(program.clone());
        assert_eq!(result.program, program);
        assert!(result.dropped.is_empty());
    }
}

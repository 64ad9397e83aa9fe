//! Constant folding: collapses literal-only subexpressions ahead of
//! resolution. The rest of the pipeline behaves identically on folded and
//! unfolded trees, so this pass is free to be conservative: anything it
//! cannot fold safely it rebuilds unchanged, and expressions whose
//! evaluation would be a type error are left for the runtime to report.

use crate::ast::{Expr, Stmt};
use crate::token::{Literal, TokenType};

pub fn fold(statements: Vec<Stmt>) -> Vec<Stmt> {
    statements.into_iter().map(fold_stmt).collect()
}

fn fold_stmt(stmt: Stmt) -> Stmt {
    match stmt {
        Stmt::Block { statements } => Stmt::Block {
            statements: fold(statements),
        },
        Stmt::Class {
            name,
            superclass,
            methods,
        } => Stmt::Class {
            name,
            superclass,
            methods: fold(methods),
        },
        Stmt::Expression { expression } => Stmt::Expression {
            expression: fold_expr(expression),
        },
        Stmt::Function { name, params, body } => Stmt::Function {
            name,
            params,
            body: fold(body),
        },
        Stmt::If {
            condition,
            then_branch,
            else_branch,
        } => Stmt::If {
            condition: fold_expr(condition),
            then_branch: Box::new(fold_stmt(*then_branch)),
            else_branch: else_branch.map(|branch| Box::new(fold_stmt(*branch))),
        },
        Stmt::Print { expression } => Stmt::Print {
            expression: fold_expr(expression),
        },
        Stmt::Return { keyword, value } => Stmt::Return {
            keyword,
            value: value.map(fold_expr),
        },
        Stmt::Var { name, initializer } => Stmt::Var {
            name,
            initializer: initializer.map(fold_expr),
        },
        Stmt::While { condition, body } => Stmt::While {
            condition: fold_expr(condition),
            body: Box::new(fold_stmt(*body)),
        },
    }
}

fn fold_expr(expr: Expr) -> Expr {
    match expr {
        Expr::Assign { name, value } => Expr::Assign {
            name,
            value: Box::new(fold_expr(*value)),
        },
        Expr::Binary {
            left,
            operator,
            right,
        } => {
            let left = fold_expr(*left);
            let right = fold_expr(*right);
            if let (Expr::Literal { value: a }, Expr::Literal { value: b }) = (&left, &right)
                && let Some(folded) = fold_binary(operator.token_type, a, b)
            {
                return Expr::Literal { value: folded };
            }
            Expr::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            }
        }
        Expr::Call {
            callee,
            paren,
            arguments,
        } => Expr::Call {
            callee: Box::new(fold_expr(*callee)),
            paren,
            arguments: arguments.into_iter().map(fold_expr).collect(),
        },
        Expr::Get { object, name } => Expr::Get {
            object: Box::new(fold_expr(*object)),
            name,
        },
        Expr::Grouping { expression } => {
            let inner = fold_expr(*expression);
            if matches!(inner, Expr::Literal { .. }) {
                return inner;
            }
            Expr::Grouping {
                expression: Box::new(inner),
            }
        }
        Expr::Literal { .. } | Expr::Super { .. } | Expr::This { .. } | Expr::Variable { .. } => {
            expr
        }
        Expr::Logical {
            left,
            operator,
            right,
        } => Expr::Logical {
            left: Box::new(fold_expr(*left)),
            operator,
            right: Box::new(fold_expr(*right)),
        },
        Expr::Set {
            object,
            name,
            value,
        } => Expr::Set {
            object: Box::new(fold_expr(*object)),
            name,
            value: Box::new(fold_expr(*value)),
        },
        Expr::Unary { operator, right } => {
            let right = fold_expr(*right);
            if operator.token_type == TokenType::Minus
                && let Expr::Literal {
                    value: Literal::Number(n),
                } = &right
            {
                return Expr::Literal {
                    value: Literal::Number(-*n),
                };
            }
            Expr::Unary {
                operator,
                right: Box::new(right),
            }
        }
    }
}

fn fold_binary(operator: TokenType, left: &Literal, right: &Literal) -> Option<Literal> {
    match (operator, left, right) {
        (TokenType::Plus, Literal::Number(a), Literal::Number(b)) => Some(Literal::Number(a + b)),
        (TokenType::Plus, Literal::String(a), Literal::String(b)) => {
            Some(Literal::String(format!("{}{}", a, b)))
        }
        (TokenType::Minus, Literal::Number(a), Literal::Number(b)) => Some(Literal::Number(a - b)),
        (TokenType::Star, Literal::Number(a), Literal::Number(b)) => Some(Literal::Number(a * b)),
        // IEEE semantics make folding x/0 transparent: inf either way
        (TokenType::Slash, Literal::Number(a), Literal::Number(b)) => Some(Literal::Number(a / b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::scanner::Scanner;
    use crate::token::Token;

    fn parse(source: &str) -> Vec<Stmt> {
        let tokens: Vec<Token> = Scanner::new(source)
            .collect::<Result<Vec<_>, _>>()
            .expect("scan should succeed");
        let mut parser = Parser::new(tokens);
        let statements = parser.parse();
        assert!(parser.take_errors().is_empty(), "unexpected parse errors");
        statements
    }

    fn fold_expression(source: &str) -> Expr {
        match fold(parse(source)).remove(0) {
            Stmt::Expression { expression } => expression,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn folds_numeric_arithmetic() {
        let expr = fold_expression("1 + 2 * 3;");
        assert_eq!(
            expr,
            Expr::Literal {
                value: Literal::Number(7.0)
            }
        );
    }

    #[test]
    fn folds_string_concatenation() {
        let expr = fold_expression("\"foo\" + \"bar\";");
        assert_eq!(
            expr,
            Expr::Literal {
                value: Literal::String("foobar".to_string())
            }
        );
    }

    #[test]
    fn folds_unary_minus_on_number() {
        let expr = fold_expression("-(2 + 3);");
        assert_eq!(
            expr,
            Expr::Literal {
                value: Literal::Number(-5.0)
            }
        );
    }

    #[test]
    fn collapses_grouping_around_literal() {
        let expr = fold_expression("(42);");
        assert_eq!(
            expr,
            Expr::Literal {
                value: Literal::Number(42.0)
            }
        );
    }

    #[test]
    fn keeps_grouping_around_non_literal() {
        let expr = fold_expression("(x);");
        assert!(matches!(expr, Expr::Grouping { .. }));
    }

    #[test]
    fn does_not_fold_mixed_operand_types() {
        // Left for the runtime to report as a type error
        let expr = fold_expression("\"age: \" + 42;");
        assert!(matches!(expr, Expr::Binary { .. }));
    }

    #[test]
    fn does_not_fold_comparisons() {
        let expr = fold_expression("1 < 2;");
        assert!(matches!(expr, Expr::Binary { .. }));
    }

    #[test]
    fn does_not_fold_variables() {
        let expr = fold_expression("x + 1;");
        assert!(matches!(expr, Expr::Binary { .. }));
    }

    #[test]
    fn folds_inside_partially_constant_trees() {
        // Only the literal half collapses
        let expr = fold_expression("x + (1 + 2);");
        let Expr::Binary { right, .. } = expr else {
            panic!("expected binary");
        };
        assert_eq!(
            *right,
            Expr::Literal {
                value: Literal::Number(3.0)
            }
        );
    }

    #[test]
    fn folds_division_by_zero_to_infinity() {
        let expr = fold_expression("1 / 0;");
        let Expr::Literal {
            value: Literal::Number(n),
        } = expr
        else {
            panic!("expected literal");
        };
        assert!(n.is_infinite());
    }

    #[test]
    fn folds_inside_statement_bodies() {
        let statements = fold(parse("fun f() { return 1 + 2; } while (x) print 2 * 2;"));
        let Stmt::Function { body, .. } = &statements[0] else {
            panic!("expected function");
        };
        assert!(matches!(
            &body[0],
            Stmt::Return {
                value: Some(Expr::Literal {
                    value: Literal::Number(n)
                }),
                ..
            } if *n == 3.0
        ));
        let Stmt::While { body, .. } = &statements[1] else {
            panic!("expected while");
        };
        assert!(matches!(
            &**body,
            Stmt::Print {
                expression: Expr::Literal {
                    value: Literal::Number(n)
                }
            } if *n == 4.0
        ));
    }

    #[test]
    fn folded_and_unfolded_trees_evaluate_identically() {
        use crate::Loxide;

        let source = "print -123 * (45.67); print \"a\" + \"b\"; print (1 + 2) * 3;";

        let mut plain = Vec::new();
        let mut interpreter = crate::interpreter::Interpreter::new();
        interpreter.interpret(&parse(source), &mut plain).unwrap();

        let mut folded = Vec::new();
        let outcome = Loxide::new().run(source, &mut folded);
        assert!(outcome.errors.is_empty());

        assert_eq!(plain, folded);
    }

    #[test]
    fn variable_spans_survive_folding_for_resolution() {
        use crate::resolver::Resolver;

        let statements = fold(parse("{ var speed = 1 + 2; print speed * 2; }"));
        let bindings = Resolver::new().resolve(&statements).unwrap();
        // Both the read and the declaration-scope distance survive.
        assert_eq!(bindings.resolutions.len(), 1);
        assert!(bindings.warnings.is_empty());
    }
}

use std::collections::HashMap;

use crate::INITIALIZER_NAME;
use crate::ast::{Expr, Stmt};
use crate::error::LoxideError;
use crate::token::{Span, Token};

/// Maps the span of each resolved variable occurrence to its scope
/// distance: how many environments to walk up at runtime. Spans are unique
/// per occurrence, so the map is keyed by node identity, never by name;
/// two occurrences of the same identifier can land at different distances.
pub type Resolutions = HashMap<Span, usize>;

/// A diagnostic that never blocks execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub message: String,
    pub span: Span,
}

/// Successful output of the resolver pass.
#[derive(Debug, Default)]
pub struct Bindings {
    pub resolutions: Resolutions,
    pub warnings: Vec<Warning>,
}

/// Tracks function context for validating `return` statements
#[derive(Clone, Copy, PartialEq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

/// Tracks class context for validating `this` and `super`
#[derive(Clone, Copy, PartialEq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// Info tracked for each variable in a scope
struct VarInfo {
    defined: bool,
    used: bool,
    span: Span,
}

pub struct Resolver {
    /// Stack of scopes, innermost last. Mirrors every environment the
    /// interpreter will create, so recorded distances line up exactly.
    scopes: Vec<HashMap<String, VarInfo>>,
    resolutions: Resolutions,
    current_function: FunctionType,
    current_class: ClassType,
    errors: Vec<LoxideError>,
    warnings: Vec<Warning>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    pub fn new() -> Self {
        Self {
            scopes: Vec::new(),
            resolutions: HashMap::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Main entry point - resolve a whole program. Errors do not stop the
    /// walk; every static error in the program is collected in one pass.
    pub fn resolve(mut self, statements: &[Stmt]) -> Result<Bindings, Vec<LoxideError>> {
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
        if self.errors.is_empty() {
            Ok(Bindings {
                resolutions: self.resolutions,
                warnings: self.warnings,
            })
        } else {
            Err(self.errors)
        }
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        if let Some(scope) = self.scopes.pop() {
            for (name, info) in scope {
                // Names starting with _ are intentionally unused
                if !info.used && !name.starts_with('_') {
                    self.warnings.push(Warning {
                        message: format!(
                            "Variable '{}' is never used. Name it '_{}' if that is intentional.",
                            name, name
                        ),
                        span: info.span,
                    });
                }
            }
        }
    }

    fn declare(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(&name.lexeme) {
                self.errors.push(LoxideError::Resolution {
                    message: "Variable with this name already declared in this scope.".to_string(),
                    span: name.span.clone(),
                });
            }
            scope.insert(
                name.lexeme.clone(),
                VarInfo {
                    defined: false,
                    used: false,
                    span: name.span.clone(),
                },
            );
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut()
            && let Some(info) = scope.get_mut(&name.lexeme)
        {
            info.defined = true;
        }
    }

    /// Bind `this` or `super` in a synthetic scope; pre-marked used so the
    /// unused-variable check never fires for them.
    fn declare_synthetic(&mut self, name: &str, span: &Span) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(
                name.to_string(),
                VarInfo {
                    defined: true,
                    used: true,
                    span: span.clone(),
                },
            );
        }
    }

    fn resolve_local(&mut self, name: &Token) {
        for (depth, scope) in self.scopes.iter_mut().rev().enumerate() {
            if let Some(info) = scope.get_mut(&name.lexeme) {
                info.used = true;
                self.resolutions.insert(name.span.clone(), depth);
                return;
            }
        }
        // Not found in any scope: a global, looked up dynamically at runtime.
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block { statements } => {
                self.begin_scope();
                for s in statements {
                    self.resolve_stmt(s);
                }
                self.end_scope();
            }
            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                self.declare(name);
                self.define(name);

                let enclosing_class = self.current_class;

                if let Some(superclass_expr) = superclass {
                    if let Expr::Variable {
                        name: superclass_name,
                    } = superclass_expr
                        && superclass_name.lexeme == name.lexeme
                    {
                        self.errors.push(LoxideError::Resolution {
                            message: "A class cannot inherit from itself.".to_string(),
                            span: superclass_name.span.clone(),
                        });
                    }
                    self.resolve_expr(superclass_expr);

                    self.current_class = ClassType::Subclass;
                    self.begin_scope();
                    self.declare_synthetic("super", &name.span);
                } else {
                    self.current_class = ClassType::Class;
                }

                self.begin_scope();
                self.declare_synthetic("this", &name.span);

                for method in methods {
                    if let Stmt::Function {
                        name: method_name,
                        params,
                        body,
                    } = method
                    {
                        let fn_type = if method_name.lexeme == INITIALIZER_NAME {
                            FunctionType::Initializer
                        } else {
                            FunctionType::Method
                        };
                        self.resolve_function(params, body, fn_type);
                    }
                }

                self.end_scope(); // this
                if superclass.is_some() {
                    self.end_scope(); // super
                }

                self.current_class = enclosing_class;
            }
            Stmt::Expression { expression } | Stmt::Print { expression } => {
                self.resolve_expr(expression);
            }
            Stmt::Function { name, params, body } => {
                // The function's own name is usable inside its body
                self.declare(name);
                self.define(name);
                self.resolve_function(params, body, FunctionType::Function);
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.errors.push(LoxideError::Resolution {
                        message: "Cannot return from top-level code.".to_string(),
                        span: keyword.span.clone(),
                    });
                }
                if let Some(value) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.errors.push(LoxideError::Resolution {
                            message: "Cannot return a value from an initializer.".to_string(),
                            span: keyword.span.clone(),
                        });
                    }
                    self.resolve_expr(value);
                }
            }
            Stmt::Var { name, initializer } => {
                self.declare(name);
                if let Some(initializer) = initializer {
                    self.resolve_expr(initializer);
                }
                self.define(name);
            }
            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }
        }
    }

    fn resolve_function(&mut self, params: &[Token], body: &[Stmt], fn_type: FunctionType) {
        let enclosing_function = self.current_function;
        self.current_function = fn_type;

        self.begin_scope();
        for param in params {
            self.declare(param);
            self.define(param);
        }
        for stmt in body {
            self.resolve_stmt(stmt);
        }
        self.end_scope();

        self.current_function = enclosing_function;
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Assign { name, value } => {
                self.resolve_expr(value);
                self.resolve_local(name);
            }
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for argument in arguments {
                    self.resolve_expr(argument);
                }
            }
            Expr::Get { object, .. } => {
                self.resolve_expr(object);
            }
            Expr::Grouping { expression } => {
                self.resolve_expr(expression);
            }
            Expr::Literal { .. } => {}
            Expr::Set { object, value, .. } => {
                self.resolve_expr(object);
                self.resolve_expr(value);
            }
            Expr::Super { keyword, .. } => {
                match self.current_class {
                    ClassType::None => {
                        self.errors.push(LoxideError::Resolution {
                            message: "Cannot use 'super' outside of a class.".to_string(),
                            span: keyword.span.clone(),
                        });
                    }
                    ClassType::Class => {
                        self.errors.push(LoxideError::Resolution {
                            message: "Cannot use 'super' in a class with no superclass."
                                .to_string(),
                            span: keyword.span.clone(),
                        });
                    }
                    ClassType::Subclass => {}
                }
                self.resolve_local(keyword);
            }
            Expr::This { keyword } => {
                if self.current_class == ClassType::None {
                    self.errors.push(LoxideError::Resolution {
                        message: "Cannot use 'this' outside of a class.".to_string(),
                        span: keyword.span.clone(),
                    });
                    return;
                }
                self.resolve_local(keyword);
            }
            Expr::Unary { right, .. } => {
                self.resolve_expr(right);
            }
            Expr::Variable { name } => {
                // Reading a variable whose own declaration is still open
                if let Some(scope) = self.scopes.last()
                    && scope
                        .get(&name.lexeme)
                        .is_some_and(|info| !info.defined)
                {
                    self.errors.push(LoxideError::Resolution {
                        message: "Cannot read local variable in its own initializer.".to_string(),
                        span: name.span.clone(),
                    });
                }
                self.resolve_local(name);
            }
        }
    }
}

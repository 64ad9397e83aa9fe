use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::INITIALIZER_NAME;
use crate::ast::{Expr, Stmt};
use crate::environment::Environment;
use crate::error::LoxideError;
use crate::resolver::Resolutions;
use crate::token::{Literal, Token, TokenType};
use crate::value::{Class, Instance, LoxFunction, NativeFunction, Value};

pub struct Interpreter {
    /// The global scope, where natives live and unresolved names are
    /// looked up.
    globals: Rc<RefCell<Environment>>,
    /// Current environment; between top-level statements this is `globals`.
    environment: Rc<RefCell<Environment>>,
    resolutions: Resolutions,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        let globals = Rc::new(RefCell::new(Environment::new()));

        globals.borrow_mut().define(
            "clock".to_string(),
            Value::Native(Rc::new(NativeFunction {
                name: "clock".to_string(),
                arity: 0,
                func: |_args| {
                    let seconds = SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .map_err(|e| LoxideError::Runtime {
                            message: format!("Clock error: {}.", e),
                            span: 0..0,
                        })?
                        .as_secs_f64();
                    Ok(Value::Literal(Literal::Number(seconds)))
                },
            })),
        );

        Self {
            environment: Rc::clone(&globals),
            globals,
            resolutions: HashMap::new(),
        }
    }

    /// Merge a resolver's table. Extending rather than replacing keeps
    /// closures from earlier REPL submissions resolvable.
    pub fn add_resolutions(&mut self, resolutions: Resolutions) {
        self.resolutions.extend(resolutions);
    }

    /// Run a whole program. The first runtime error aborts the remaining
    /// top-level statements.
    pub fn interpret(&mut self, statements: &[Stmt], output: &mut dyn Write) -> Result<(), LoxideError> {
        for stmt in statements {
            self.execute(stmt, output)?;
        }
        Ok(())
    }

    pub fn execute(&mut self, stmt: &Stmt, output: &mut dyn Write) -> Result<(), LoxideError> {
        match stmt {
            Stmt::Block { statements } => {
                let environment = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
                    &self.environment,
                ))));
                self.execute_block(statements, environment, output)
            }
            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods, output),
            Stmt::Expression { expression } => {
                self.evaluate(expression, output)?;
                Ok(())
            }
            Stmt::Function { name, params, body } => {
                let function = LoxFunction {
                    name: name.clone(),
                    params: params.clone(),
                    body: body.clone(),
                    closure: Rc::clone(&self.environment),
                    is_initializer: false,
                };
                // Defining under its own name makes recursion work
                self.environment
                    .borrow_mut()
                    .define(name.lexeme.clone(), Value::Function(Rc::new(function)));
                Ok(())
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition_value = self.evaluate(condition, output)?;
                if self.is_truthy(&condition_value) {
                    self.execute(then_branch, output)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch, output)
                } else {
                    Ok(())
                }
            }
            Stmt::Print { expression } => {
                let value = self.evaluate(expression, output)?;
                writeln!(output, "{}", value)?;
                Ok(())
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expression) => self.evaluate(expression, output)?,
                    None => Value::Literal(Literal::Nil),
                };
                // Non-local exit; only a call site intercepts this
                Err(LoxideError::Return(value))
            }
            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expression) => self.evaluate(expression, output)?,
                    None => Value::Literal(Literal::Nil),
                };
                self.environment
                    .borrow_mut()
                    .define(name.lexeme.clone(), value);
                Ok(())
            }
            Stmt::While { condition, body } => {
                loop {
                    let condition_value = self.evaluate(condition, output)?;
                    if !self.is_truthy(&condition_value) {
                        break;
                    }
                    self.execute(body, output)?;
                }
                Ok(())
            }
        }
    }

    /// Run statements with `environment` as current, restoring the previous
    /// environment on every exit path, including returns and errors.
    fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
        output: &mut dyn Write,
    ) -> Result<(), LoxideError> {
        let previous = Rc::clone(&self.environment);
        self.environment = environment;

        let result = statements
            .iter()
            .try_for_each(|stmt| self.execute(stmt, output));

        self.environment = previous;
        result
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Stmt],
        output: &mut dyn Write,
    ) -> Result<(), LoxideError> {
        // Reserve the name first so methods can refer to the class
        self.environment
            .borrow_mut()
            .define(name.lexeme.clone(), Value::Literal(Literal::Nil));

        let superclass_value = match superclass {
            Some(expression) => {
                let value = self.evaluate(expression, output)?;
                match value {
                    Value::Class(class) => Some(class),
                    _ => {
                        let span = match expression {
                            Expr::Variable { name } => name.span.clone(),
                            _ => name.span.clone(),
                        };
                        return Err(LoxideError::Runtime {
                            message: "Superclass must be a class.".to_string(),
                            span,
                        });
                    }
                }
            }
            None => None,
        };

        // Methods close over the current environment, augmented with a
        // `super` binding when there is a superclass; that environment is
        // popped again before the class value is stored.
        let previous = Rc::clone(&self.environment);
        if let Some(class) = &superclass_value {
            let mut environment = Environment::with_enclosing(Rc::clone(&self.environment));
            environment.define("super".to_string(), Value::Class(Rc::clone(class)));
            self.environment = Rc::new(RefCell::new(environment));
        }

        let mut method_table = HashMap::new();
        for method in methods {
            if let Stmt::Function {
                name: method_name,
                params,
                body,
            } = method
            {
                let function = LoxFunction {
                    name: method_name.clone(),
                    params: params.clone(),
                    body: body.clone(),
                    closure: Rc::clone(&self.environment),
                    is_initializer: method_name.lexeme == INITIALIZER_NAME,
                };
                method_table.insert(method_name.lexeme.clone(), Rc::new(function));
            }
        }

        let class = Class {
            name: name.lexeme.clone(),
            superclass: superclass_value,
            methods: method_table,
        };

        self.environment = previous;
        self.environment.borrow_mut().assign(
            &name.lexeme,
            Value::Class(Rc::new(class)),
            name.span.clone(),
        )?;
        Ok(())
    }

    pub fn evaluate(&mut self, expr: &Expr, output: &mut dyn Write) -> Result<Value, LoxideError> {
        match expr {
            Expr::Assign { name, value } => {
                let value = self.evaluate(value, output)?;
                if let Some(distance) = self.resolutions.get(&name.span) {
                    self.environment
                        .borrow_mut()
                        .assign_at(*distance, &name.lexeme, value.clone());
                } else {
                    // Unresolved references are globals; never search the
                    // chain, or a later shadowing binding could capture them
                    self.globals.borrow_mut().assign(
                        &name.lexeme,
                        value.clone(),
                        name.span.clone(),
                    )?;
                }
                Ok(value)
            }
            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left_value = self.evaluate(left, output)?;
                let right_value = self.evaluate(right, output)?;
                self.binary_op(&left_value, operator, &right_value)
            }
            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee_value = self.evaluate(callee, output)?;
                let mut argument_values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    argument_values.push(self.evaluate(argument, output)?);
                }
                self.call_value(&callee_value, argument_values, paren, output)
            }
            Expr::Get { object, name } => {
                let object_value = self.evaluate(object, output)?;
                match object_value {
                    Value::Instance(instance) => Instance::get(&instance, name),
                    _ => Err(LoxideError::Runtime {
                        message: "Only instances have properties.".to_string(),
                        span: name.span.clone(),
                    }),
                }
            }
            Expr::Grouping { expression } => self.evaluate(expression, output),
            Expr::Literal { value } => Ok(Value::Literal(value.clone())),
            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left_value = self.evaluate(left, output)?;

                if operator.token_type == TokenType::Or {
                    if self.is_truthy(&left_value) {
                        return Ok(left_value);
                    }
                } else if !self.is_truthy(&left_value) {
                    return Ok(left_value);
                }

                self.evaluate(right, output)
            }
            Expr::Set {
                object,
                name,
                value,
            } => {
                let object_value = self.evaluate(object, output)?;
                let Value::Instance(instance) = object_value else {
                    return Err(LoxideError::Runtime {
                        message: "Only instances have fields.".to_string(),
                        span: name.span.clone(),
                    });
                };
                let value = self.evaluate(value, output)?;
                instance.set(name, value.clone());
                Ok(value)
            }
            Expr::Super { keyword, method } => self.evaluate_super(keyword, method),
            Expr::This { keyword } => self.look_up_variable(keyword),
            Expr::Unary { operator, right } => {
                let right_value = self.evaluate(right, output)?;
                match operator.token_type {
                    TokenType::Minus => match right_value {
                        Value::Literal(Literal::Number(n)) => {
                            Ok(Value::Literal(Literal::Number(-n)))
                        }
                        _ => Err(LoxideError::Runtime {
                            message: "Operand must be a number.".to_string(),
                            span: operator.span.clone(),
                        }),
                    },
                    TokenType::Bang => Ok(Value::Literal(Literal::Bool(
                        !self.is_truthy(&right_value),
                    ))),
                    _ => Err(LoxideError::Runtime {
                        message: "Invalid unary operator.".to_string(),
                        span: operator.span.clone(),
                    }),
                }
            }
            Expr::Variable { name } => self.look_up_variable(name),
        }
    }

    fn binary_op(
        &self,
        left: &Value,
        operator: &Token,
        right: &Value,
    ) -> Result<Value, LoxideError> {
        match operator.token_type {
            TokenType::Plus => match (left, right) {
                (Value::Literal(Literal::Number(a)), Value::Literal(Literal::Number(b))) => {
                    Ok(Value::Literal(Literal::Number(a + b)))
                }
                (Value::Literal(Literal::String(a)), Value::Literal(Literal::String(b))) => {
                    Ok(Value::Literal(Literal::String(format!("{}{}", a, b))))
                }
                _ => Err(LoxideError::Runtime {
                    message: "Operands must be two numbers or two strings.".to_string(),
                    span: operator.span.clone(),
                }),
            },
            TokenType::Minus | TokenType::Star | TokenType::Slash => {
                let (a, b) = self.require_numbers(left, right, operator)?;
                let result = match operator.token_type {
                    TokenType::Minus => a - b,
                    TokenType::Star => a * b,
                    // Division by zero follows IEEE-754: inf or nan
                    _ => a / b,
                };
                Ok(Value::Literal(Literal::Number(result)))
            }
            TokenType::Greater
            | TokenType::GreaterEqual
            | TokenType::Less
            | TokenType::LessEqual => {
                let a = self.comparison_operand(left, operator)?;
                let b = self.comparison_operand(right, operator)?;
                let result = match operator.token_type {
                    TokenType::Greater => a > b,
                    TokenType::GreaterEqual => a >= b,
                    TokenType::Less => a < b,
                    _ => a <= b,
                };
                Ok(Value::Literal(Literal::Bool(result)))
            }
            TokenType::EqualEqual => Ok(Value::Literal(Literal::Bool(self.is_equal(left, right)))),
            TokenType::BangEqual => Ok(Value::Literal(Literal::Bool(!self.is_equal(left, right)))),
            _ => Err(LoxideError::Runtime {
                message: "Invalid binary operator.".to_string(),
                span: operator.span.clone(),
            }),
        }
    }

    fn evaluate_super(&mut self, keyword: &Token, method: &Token) -> Result<Value, LoxideError> {
        let distance =
            self.resolutions
                .get(&keyword.span)
                .copied()
                .ok_or_else(|| LoxideError::Runtime {
                    message: "Undefined variable 'super'.".to_string(),
                    span: keyword.span.clone(),
                })?;

        let superclass = self.environment.borrow().get_at(distance, "super");
        let Some(Value::Class(superclass)) = superclass else {
            return Err(LoxideError::Runtime {
                message: "Undefined variable 'super'.".to_string(),
                span: keyword.span.clone(),
            });
        };

        // `this` lives one scope below the `super` binding
        let object = self.environment.borrow().get_at(distance - 1, "this");
        let Some(Value::Instance(object)) = object else {
            return Err(LoxideError::Runtime {
                message: "Undefined variable 'this'.".to_string(),
                span: keyword.span.clone(),
            });
        };

        // Lookup starts at the superclass, but the method binds to the
        // current instance
        let found = superclass
            .find_method(&method.lexeme)
            .ok_or_else(|| LoxideError::Runtime {
                message: format!("Undefined property '{}'.", method.lexeme),
                span: method.span.clone(),
            })?;

        Ok(Value::Function(Rc::new(found.bind(object))))
    }

    fn call_value(
        &mut self,
        callee: &Value,
        arguments: Vec<Value>,
        paren: &Token,
        output: &mut dyn Write,
    ) -> Result<Value, LoxideError> {
        match callee {
            Value::Native(native) => {
                self.check_arity(native.arity, arguments.len(), paren)?;
                (native.func)(&arguments)
            }
            Value::Function(function) => {
                self.check_arity(function.params.len(), arguments.len(), paren)?;
                self.call_function(function, arguments, output)
            }
            Value::Class(class) => {
                let initializer = class.find_method(INITIALIZER_NAME);
                let arity = initializer
                    .as_ref()
                    .map(|init| init.params.len())
                    .unwrap_or(0);
                self.check_arity(arity, arguments.len(), paren)?;

                let instance = Rc::new(Instance::new(Rc::clone(class)));
                if let Some(initializer) = initializer {
                    let bound = initializer.bind(Rc::clone(&instance));
                    self.call_function(&bound, arguments, output)?;
                }
                Ok(Value::Instance(instance))
            }
            _ => Err(LoxideError::Runtime {
                message: "Can only call functions and classes.".to_string(),
                span: paren.span.clone(),
            }),
        }
    }

    fn check_arity(
        &self,
        expected: usize,
        actual: usize,
        paren: &Token,
    ) -> Result<(), LoxideError> {
        if actual != expected {
            return Err(LoxideError::Runtime {
                message: format!("Expected {} arguments but got {}.", expected, actual),
                span: paren.span.clone(),
            });
        }
        Ok(())
    }

    fn call_function(
        &mut self,
        function: &LoxFunction,
        arguments: Vec<Value>,
        output: &mut dyn Write,
    ) -> Result<Value, LoxideError> {
        let mut environment = Environment::with_enclosing(Rc::clone(&function.closure));
        for (param, argument) in function.params.iter().zip(arguments) {
            environment.define(param.lexeme.clone(), argument);
        }

        let result = self.execute_block(
            &function.body,
            Rc::new(RefCell::new(environment)),
            output,
        );

        match result {
            Ok(()) => {
                if function.is_initializer {
                    self.bound_instance(function)
                } else {
                    Ok(Value::Literal(Literal::Nil))
                }
            }
            Err(LoxideError::Return(value)) => {
                if function.is_initializer {
                    // `return;` in an initializer still yields the instance
                    self.bound_instance(function)
                } else {
                    Ok(value)
                }
            }
            Err(e) => Err(e),
        }
    }

    /// An initializer's result is forced to the instance its closure holds.
    fn bound_instance(&self, function: &LoxFunction) -> Result<Value, LoxideError> {
        function
            .closure
            .borrow()
            .get_at(0, "this")
            .ok_or_else(|| LoxideError::Runtime {
                message: "Initializer called without an instance.".to_string(),
                span: function.name.span.clone(),
            })
    }

    fn look_up_variable(&self, name: &Token) -> Result<Value, LoxideError> {
        if let Some(distance) = self.resolutions.get(&name.span) {
            self.environment
                .borrow()
                .get_at(*distance, &name.lexeme)
                .ok_or_else(|| LoxideError::Runtime {
                    message: format!("Undefined variable '{}'.", name.lexeme),
                    span: name.span.clone(),
                })
        } else {
            // Unresolved: a global, looked up dynamically
            self.globals.borrow().get(&name.lexeme, name.span.clone())
        }
    }

    fn is_truthy(&self, value: &Value) -> bool {
        match value {
            Value::Literal(Literal::Nil) => false,
            Value::Literal(Literal::Bool(b)) => *b,
            _ => true,
        }
    }

    fn is_equal(&self, a: &Value, b: &Value) -> bool {
        a == b
    }

    fn require_numbers(
        &self,
        left: &Value,
        right: &Value,
        operator: &Token,
    ) -> Result<(f64, f64), LoxideError> {
        match (left, right) {
            (Value::Literal(Literal::Number(a)), Value::Literal(Literal::Number(b))) => {
                Ok((*a, *b))
            }
            _ => Err(LoxideError::Runtime {
                message: "Operands must be numbers.".to_string(),
                span: operator.span.clone(),
            }),
        }
    }

    /// Comparison operands coerce to numbers: nil is 0, booleans are 0/1,
    /// strings contribute their leading numeric prefix (or 0).
    fn comparison_operand(&self, value: &Value, operator: &Token) -> Result<f64, LoxideError> {
        match value {
            Value::Literal(Literal::Number(n)) => Ok(*n),
            Value::Literal(Literal::Bool(b)) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Literal(Literal::Nil) => Ok(0.0),
            Value::Literal(Literal::String(s)) => Ok(numeric_prefix(s)),
            _ => Err(LoxideError::Runtime {
                message: "Operands must be comparable as numbers.".to_string(),
                span: operator.span.clone(),
            }),
        }
    }
}

fn numeric_prefix(s: &str) -> f64 {
    let trimmed = s.trim_start();
    let mut end = 0;
    let bytes = trimmed.as_bytes();
    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        let mut fraction = end + 1;
        while fraction < bytes.len() && bytes[fraction].is_ascii_digit() {
            fraction += 1;
        }
        if fraction > end + 1 {
            end = fraction;
        }
    }
    trimmed[..end].parse().unwrap_or(0.0)
}

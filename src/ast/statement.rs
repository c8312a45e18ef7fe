//! Analyzed statement nodes.
use super::{ClassId, Expr, FunctionId, TypeSpec};

/// A complete compilation unit.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub body: Block,
}
impl Program {
    pub fn new(body: Block) -> Self {
        Self { body }
    }
}

/// A brace-delimited block. Class and function declarations have already been collected
/// out of the statement list so that they can be hoisted.
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub classes: Vec<Class>,
    pub functions: Vec<Function>,
    pub statements: Vec<Statement>,
}
impl Block {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self {
            classes: vec![],
            functions: vec![],
            statements,
        }
    }

    pub fn with_class(mut self, class: Class) -> Self {
        self.classes.push(class);
        self
    }

    pub fn with_function(mut self, function: Function) -> Self {
        self.functions.push(function);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Class {
    pub id: ClassId,
    pub name: String,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub ty: TypeSpec,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub id: FunctionId,
    pub name: String,
    pub return_type: TypeSpec,
    pub arguments: Vec<Argument>,
    pub body: Block,
}
impl Function {
    /// The type of an expression referencing this function.
    pub fn type_spec(&self) -> TypeSpec {
        TypeSpec::function(
            self.return_type.clone(),
            self.arguments.iter().map(|a| a.ty.clone()).collect(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct Argument {
    pub name: String,
    pub ty: TypeSpec,
}

#[derive(Debug, Clone)]
pub enum Statement {
    Block(Block),
    /// Leave the innermost loop, or the loop with the given label.
    Break(Option<String>),
    /// Re-test the condition of the innermost loop, or the loop with the given label.
    Continue(Option<String>),
    /// Declare one or more variables of an explicit type.
    Define(TypeSpec, Vec<Clause>),
    /// Declare one or more variables whose types are taken from their initializers.
    Let(Vec<Clause>),
    DoWhile(Loop),
    While(Loop),
    Expression(Expr),
    If(If),
    Return(Option<Expr>),
}

#[derive(Debug, Clone)]
pub struct Clause {
    pub name: String,
    pub value: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct Loop {
    pub label: Option<String>,
    pub condition: Expr,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct If {
    pub condition: Expr,
    pub first: Option<Block>,
    pub second: Option<Block>,
}

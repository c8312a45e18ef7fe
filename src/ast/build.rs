//! Shorthand constructors for analyzed nodes. Analysis produces trees of this shape; the
//! helpers keep hand-written trees (bundled demos, tests) readable.
use super::*;

pub fn literal(lit: Literal, ty: TypeSpec) -> Expr {
    Expr::new(ExprKind::Literal(lit), ty)
}

pub fn u8_lit(value: u8) -> Expr {
    literal(Literal::U8(value), TypeSpec::U8)
}

pub fn bool_lit(value: bool) -> Expr {
    literal(Literal::Bool(value), TypeSpec::Bool)
}

pub fn symbol<S: Into<String>>(name: S, ty: TypeSpec) -> Expr {
    Expr::new(ExprKind::Symbol(name.into()), ty)
}

pub fn function_ref(function: &Function) -> Expr {
    Expr::new(ExprKind::Function(function.id), function.type_spec())
}

pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
    let ty = operand.ty.clone();
    Expr::new(ExprKind::Unary(op, Box::new(operand)), ty)
}

pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr, ty: TypeSpec) -> Expr {
    Expr::new(ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)), ty)
}

pub fn numeric(op: NumericOp, lhs: Expr, rhs: Expr) -> Expr {
    let ty = lhs.ty.clone();
    binary(BinaryOp::Numeric(op), lhs, rhs, ty)
}

pub fn compare(op: CompareOp, lhs: Expr, rhs: Expr) -> Expr {
    binary(BinaryOp::Compare(op), lhs, rhs, TypeSpec::Bool)
}

pub fn get_field(object: Expr, field: usize, ty: TypeSpec) -> Expr {
    Expr::new(ExprKind::GetField(Box::new(object), field), ty)
}

pub fn get_index(array: Expr, index: Expr) -> Expr {
    let ty = match &array.ty {
        TypeSpec::Array(inner) => (**inner).clone(),
        other => other.clone(),
    };
    binary(BinaryOp::GetIndex, array, index, ty)
}

pub fn assign(target: Expr, value: Expr) -> Expr {
    let ty = target.ty.clone();
    Expr::new(ExprKind::Assign(Box::new(target), Box::new(value)), ty)
}

pub fn compound(op: CompoundOp, target: Expr, value: Expr) -> Expr {
    let ty = target.ty.clone();
    Expr::new(
        ExprKind::CompoundAssign(op, Box::new(target), Box::new(value)),
        ty,
    )
}

pub fn postfix(op: PostfixOp, target: Expr) -> Expr {
    let ty = target.ty.clone();
    Expr::new(ExprKind::Postfix(op, Box::new(target)), ty)
}

pub fn ternary(condition: Expr, first: Expr, second: Expr) -> Expr {
    let ty = first.ty.clone();
    Expr::new(
        ExprKind::Ternary(Box::new(condition), Box::new(first), Box::new(second)),
        ty,
    )
}

pub fn call(callee: Expr, arguments: Vec<Expr>) -> Expr {
    let ty = match &callee.ty {
        TypeSpec::Function(ret, _) => (**ret).clone(),
        other => other.clone(),
    };
    Expr::new(ExprKind::Call(Box::new(callee), arguments), ty)
}

pub fn new_object(class: &Class, arguments: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::New(class.id, arguments), TypeSpec::Object(class.id))
}

pub fn native<S: Into<String>>(name: S, arguments: Vec<Expr>, ty: TypeSpec) -> Expr {
    Expr::new(ExprKind::Native(name.into(), arguments), ty)
}

pub fn expr(value: Expr) -> Statement {
    Statement::Expression(value)
}

pub fn define<S: Into<String>>(ty: TypeSpec, name: S, value: Option<Expr>) -> Statement {
    Statement::Define(
        ty,
        vec![Clause {
            name: name.into(),
            value,
        }],
    )
}

pub fn let_<S: Into<String>>(name: S, value: Expr) -> Statement {
    Statement::Let(vec![Clause {
        name: name.into(),
        value: Some(value),
    }])
}

pub fn if_(condition: Expr, first: Option<Block>, second: Option<Block>) -> Statement {
    Statement::If(If {
        condition,
        first,
        second,
    })
}

pub fn while_(condition: Expr, body: Vec<Statement>) -> Statement {
    Statement::While(Loop {
        label: None,
        condition,
        body: Block::new(body),
    })
}

pub fn do_while(body: Vec<Statement>, condition: Expr) -> Statement {
    Statement::DoWhile(Loop {
        label: None,
        condition,
        body: Block::new(body),
    })
}

pub fn labeled<S: Into<String>>(label: S, statement: Statement) -> Statement {
    match statement {
        Statement::While(mut l) => {
            l.label = Some(label.into());
            Statement::While(l)
        }
        Statement::DoWhile(mut l) => {
            l.label = Some(label.into());
            Statement::DoWhile(l)
        }
        other => other,
    }
}

pub fn ret(value: Option<Expr>) -> Statement {
    Statement::Return(value)
}

pub fn function<S: Into<String>>(
    id: usize,
    name: S,
    return_type: TypeSpec,
    arguments: Vec<(&str, TypeSpec)>,
    body: Vec<Statement>,
) -> Function {
    Function {
        id: FunctionId(id),
        name: name.into(),
        return_type,
        arguments: arguments
            .into_iter()
            .map(|(name, ty)| Argument {
                name: name.to_string(),
                ty,
            })
            .collect(),
        body: Block::new(body),
    }
}

pub fn class<S: Into<String>>(id: usize, name: S, fields: Vec<(&str, TypeSpec)>) -> Class {
    Class {
        id: ClassId(id),
        name: name.into(),
        fields: fields
            .into_iter()
            .map(|(name, ty)| Field {
                name: name.to_string(),
                ty,
            })
            .collect(),
    }
}

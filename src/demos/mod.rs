//! Analyzed programs bundled with the compiler, so the block graph can be inspected
//! without a front end.
use std::collections::BTreeMap;

use crate::{
    ast::{
        build::*, Block, ClassId, CompareOp, CompoundOp, Expr, ExprKind, FunctionId, NumericOp,
        PostfixOp, Program, Statement, TypeSpec,
    },
    prelude::*,
};

pub struct Demo {
    pub description: &'static str,
    build: fn() -> Program,
}

fn get_demo_map() -> BTreeMap<&'static str, Demo> {
    BTreeMap::from([
        (
            "calls",
            Demo {
                description: "a call in the middle of an expression, capturing live variables",
                build: calls,
            },
        ),
        (
            "counter",
            Demo {
                description: "do-while and while loops over a counter",
                build: counter,
            },
        ),
        (
            "loops",
            Demo {
                description: "labeled loops with break and continue",
                build: loops,
            },
        ),
        (
            "objects",
            Demo {
                description: "class instances and arrays",
                build: objects,
            },
        ),
        (
            "parity",
            Demo {
                description: "mutually recursive functions returning from both branches",
                build: parity,
            },
        ),
    ])
}

/// The names and descriptions of every bundled program, in name order.
pub fn names() -> Vec<(&'static str, &'static str)> {
    get_demo_map()
        .into_iter()
        .map(|(name, demo)| (name, demo.description))
        .collect()
}

pub fn load(name: &str) -> Result<Program> {
    match get_demo_map().get(name) {
        Some(demo) => Ok((demo.build)()),
        None => bail!("Unknown demo '{name}', use `list` to see the available programs"),
    }
}

fn u8_var(name: &str) -> Expr {
    symbol(name, TypeSpec::U8)
}

fn print(value: Expr) -> Statement {
    expr(native("print", vec![value], TypeSpec::Void))
}

fn calls() -> Program {
    let square = function(
        0,
        "square",
        TypeSpec::U8,
        vec![("n", TypeSpec::U8)],
        vec![ret(Some(numeric(NumericOp::Mul, u8_var("n"), u8_var("n"))))],
    );
    let body = vec![
        define(TypeSpec::U8, "y", Some(u8_lit(3))),
        define(
            TypeSpec::U8,
            "z",
            Some(numeric(
                NumericOp::Add,
                u8_var("y"),
                call(function_ref(&square), vec![u8_var("y")]),
            )),
        ),
        print(numeric(NumericOp::Add, u8_var("z"), u8_var("y"))),
    ];
    Program::new(Block::new(body).with_function(square))
}

fn counter() -> Program {
    Program::new(Block::new(vec![
        define(TypeSpec::U8, "x", Some(u8_lit(0))),
        do_while(
            vec![expr(postfix(PostfixOp::Increment, u8_var("x")))],
            compare(CompareOp::Lt, u8_var("x"), u8_lit(10)),
        ),
        define(TypeSpec::U16, "total", None),
        expr(assign(
            symbol("total", TypeSpec::U16),
            literal(crate::ast::Literal::U16(0), TypeSpec::U16),
        )),
        while_(
            compare(CompareOp::Gt, u8_var("x"), u8_lit(0)),
            vec![
                expr(compound(
                    CompoundOp::Numeric(NumericOp::Add),
                    symbol("total", TypeSpec::U16),
                    Expr::new(
                        ExprKind::Cast(crate::ast::CastOp::ZeroExtend, Box::new(u8_var("x"))),
                        TypeSpec::U16,
                    ),
                )),
                expr(postfix(PostfixOp::Decrement, u8_var("x"))),
            ],
        ),
        print(symbol("total", TypeSpec::U16)),
    ]))
}

fn loops() -> Program {
    let bool_var = || symbol("done", TypeSpec::Bool);
    Program::new(Block::new(vec![
        define(TypeSpec::U8, "i", Some(u8_lit(0))),
        define(TypeSpec::Bool, "done", Some(bool_lit(false))),
        labeled(
            "outer",
            while_(
                bool_lit(true),
                vec![
                    expr(postfix(PostfixOp::Increment, u8_var("i"))),
                    while_(
                        compare(CompareOp::Lt, u8_var("i"), u8_lit(100)),
                        vec![
                            if_(
                                bool_var(),
                                Some(Block::new(vec![Statement::Break(Some(
                                    "outer".to_string(),
                                ))])),
                                None,
                            ),
                            expr(assign(
                                bool_var(),
                                compare(
                                    CompareOp::Eq,
                                    numeric(NumericOp::Mod, u8_var("i"), u8_lit(7)),
                                    u8_lit(0),
                                ),
                            )),
                            expr(compound(
                                CompoundOp::Numeric(NumericOp::Mul),
                                u8_var("i"),
                                u8_lit(2),
                            )),
                        ],
                    ),
                    Statement::Continue(None),
                ],
            ),
        ),
        print(ternary(bool_var(), u8_var("i"), u8_lit(0))),
    ]))
}

fn objects() -> Program {
    let point = class(0, "Point", vec![("x", TypeSpec::U8), ("y", TypeSpec::U8)]);
    let point_ty = TypeSpec::Object(ClassId(0));
    let array_ty = TypeSpec::Array(Box::new(point_ty.clone()));
    let p = || symbol("p", point_ty.clone());
    let points = || symbol("points", array_ty.clone());

    let body = vec![
        define(
            point_ty.clone(),
            "p",
            Some(new_object(&point, vec![u8_lit(1), u8_lit(2)])),
        ),
        expr(compound(
            CompoundOp::Numeric(NumericOp::Add),
            get_field(p(), 0, TypeSpec::U8),
            get_field(p(), 1, TypeSpec::U8),
        )),
        define(
            array_ty.clone(),
            "points",
            Some(Expr::new(
                ExprKind::NewArray(Box::new(u8_lit(4))),
                array_ty.clone(),
            )),
        ),
        expr(assign(get_index(points(), u8_lit(0)), p())),
        expr(postfix(
            PostfixOp::Increment,
            get_field(get_index(points(), u8_lit(0)), 1, TypeSpec::U8),
        )),
        print(get_field(p(), 1, TypeSpec::U8)),
    ];
    Program::new(Block::new(body).with_class(point))
}

fn parity() -> Program {
    let signature = TypeSpec::function(TypeSpec::Bool, vec![TypeSpec::U8]);
    let reference = |id| Expr::new(ExprKind::Function(FunctionId(id)), signature.clone());
    let step = |id: usize| {
        vec![if_(
            compare(CompareOp::Eq, u8_var("n"), u8_lit(0)),
            Some(Block::new(vec![ret(Some(bool_lit(id == 0)))])),
            Some(Block::new(vec![ret(Some(call(
                reference(1 - id),
                vec![numeric(NumericOp::Sub, u8_var("n"), u8_lit(1))],
            )))])),
        )]
    };
    let even = function(0, "even", TypeSpec::Bool, vec![("n", TypeSpec::U8)], step(0));
    let odd = function(1, "odd", TypeSpec::Bool, vec![("n", TypeSpec::U8)], step(1));

    Program::new(
        Block::new(vec![print(call(reference(0), vec![u8_lit(7)]))])
            .with_function(even)
            .with_function(odd),
    )
}

#[cfg(test)]
mod tests {
    use crate::il::{generate, optimise, verify};

    use super::*;

    #[test]
    fn every_demo_builds_and_verifies() {
        for (name, _) in names() {
            let mut generated = generate(&load(name).unwrap());
            let entries = generated.entries();
            assert_eq!(Ok(()), verify(&generated.system, &entries), "{name}");
            optimise(&mut generated.system);
            assert_eq!(Ok(()), verify(&generated.system, &entries), "{name}");
        }
    }

    #[test]
    fn demos_do_not_warn() {
        for (name, _) in names() {
            let generated = generate(&load(name).unwrap());
            assert!(generated.diagnostics.is_empty(), "{name}");
        }
    }

    #[test]
    fn unknown_demos_are_an_error() {
        let error = load("nothing").unwrap_err();
        assert!(error.to_string().contains("Unknown demo 'nothing'"));
    }
}

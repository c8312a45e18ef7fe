use crate::{
    error::{internal_error, InternalError},
    prelude::*,
};

use super::{Block, Register, System};

/// Remove mirror instructions, pointing their users at the mirrored register instead.
/// Returns the number of removed instructions.
pub fn optimise(system: &mut System) -> usize {
    let removed: usize = system.blocks.iter_mut().map(propagate_copies).sum();
    debug!("Removed {removed} mirror instruction(s)");
    removed
}

/// Copy propagation within a single block.
/// Optimises:
/// ```text
/// B1(u8 $0):
///   $1 u8 := $0
///   $2 u8 := $1 add $1
/// ```
/// To:
/// ```text
/// B1(u8 $0):
///   $1 u8 := $0 add $0
/// ```
fn propagate_copies(block: &mut Block) -> usize {
    let id = block.id;
    // Maps every original register to its replacement.
    let mut replacements: Vec<Register> = (0..block.parameters.len()).map(Register).collect();
    let replace = |replacements: &Vec<Register>, register: Register| match replacements
        .get(register.0)
    {
        Some(replacement) => *replacement,
        None => internal_error(InternalError::NoSuchRegister(id, register)),
    };

    let mut kept = Vec::with_capacity(block.instructions.len());
    for mut instr in std::mem::take(&mut block.instructions) {
        for operand in instr.operation.operands_mut() {
            *operand = replace(&replacements, *operand);
        }
        match instr.operation.as_mirror() {
            Some(source) => replacements.push(source),
            None => {
                replacements.push(Register(block.parameters.len() + kept.len()));
                kept.push(instr);
            }
        }
    }
    let removed = replacements.len() - block.parameters.len() - kept.len();
    block.instructions = kept;

    if let Some(terminator) = &mut block.terminator {
        for register in terminator.registers_mut() {
            *register = replace(&replacements, *register);
        }
    }
    block.scratch = block
        .scratch
        .map_registers(|register| replace(&replacements, register));

    if removed > 0 {
        trace!("{id}: removed {removed} mirror(s)");
    }
    removed
}

#[cfg(test)]
mod tests {
    use crate::{
        ast::{build::*, Program, TypeSpec},
        il::{generate, Operation, Terminator},
    };

    use super::*;

    macro_rules! assert_optimises {
        ($statements:expr, $expected:expr) => {{
            let program = Program::new(crate::ast::Block::new($statements));
            let mut generated = generate(&program);
            optimise(&mut generated.system);
            let lines = generated
                .system
                .block(generated.entry)
                .instructions
                .iter()
                .map(|instr| instr.operation.to_string())
                .collect::<Vec<_>>();

            assert_eq!($expected, lines)
        }};
    }

    #[test]
    fn mirrors_are_replaced_by_their_source() {
        assert_optimises!(
            vec![
                define(TypeSpec::U8, "a", Some(u8_lit(4))),
                define(
                    TypeSpec::U8,
                    "b",
                    Some(numeric(
                        crate::ast::NumericOp::Add,
                        symbol("a", TypeSpec::U8),
                        symbol("a", TypeSpec::U8),
                    )),
                ),
            ],
            vec!["4", "$0 add $0"]
        )
    }

    #[test]
    fn chains_of_mirrors_resolve_to_the_original() {
        assert_optimises!(
            vec![
                define(TypeSpec::U8, "a", Some(u8_lit(1))),
                define(TypeSpec::U8, "b", Some(symbol("a", TypeSpec::U8))),
                define(TypeSpec::U8, "c", Some(symbol("b", TypeSpec::U8))),
                expr(numeric(
                    crate::ast::NumericOp::Mul,
                    symbol("c", TypeSpec::U8),
                    u8_lit(2),
                )),
            ],
            vec!["1", "2", "$0 mul $1"]
        )
    }

    #[test]
    fn terminators_are_rewritten() {
        let program = Program::new(crate::ast::Block::new(vec![
            define(TypeSpec::Bool, "x", Some(bool_lit(true))),
            if_(symbol("x", TypeSpec::Bool), None, None),
        ]));
        let mut generated = generate(&program);
        assert_eq!(1, optimise(&mut generated.system));

        let entry = generated.system.block(generated.entry);
        match &entry.terminator {
            Some(Terminator::Branch { condition, then, .. }) => {
                assert_eq!(Register(0), *condition);
                assert_eq!(vec![Register(0)], then.arguments);
            }
            other => panic!("expected a branch, found {:?}", other),
        }
        assert!(entry
            .instructions
            .iter()
            .all(|instr| instr.operation.as_mirror().is_none()));
        assert!(matches!(
            entry.instructions[0].operation,
            Operation::Literal(_)
        ));
    }

    #[test]
    fn optimised_systems_still_verify() {
        let program = crate::demos::load("calls").unwrap();
        let mut generated = generate(&program);
        let entries = generated.entries();
        assert!(optimise(&mut generated.system) > 0);
        assert_eq!(Ok(()), crate::il::verify(&generated.system, &entries));
    }
}

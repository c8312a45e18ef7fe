//! Structural checks over a finished system.
use std::collections::BTreeSet;

use thiserror::Error;

use super::{Block, BlockId, Edge, Register, System, Terminator, Type};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("{block}: instruction {register} reads {operand}, which is not defined before it")]
    ForwardReference {
        block: BlockId,
        register: Register,
        operand: Register,
    },
    #[error("{block}: terminator reads undefined register {register}")]
    UndefinedRegister { block: BlockId, register: Register },
    #[error("{block}: jump target {register} of type '{ty}' is not a block reference")]
    NotABlockRef {
        block: BlockId,
        register: Register,
        ty: Type,
    },
    #[error("{block}: branch condition {register} is not a bool")]
    ConditionType { block: BlockId, register: Register },
    #[error("{block}: edge through {register} passes ({found}) to a block accepting ({expected})")]
    ArgumentMismatch {
        block: BlockId,
        register: Register,
        expected: String,
        found: String,
    },
    #[error("{block}: reference to missing block {target}")]
    MissingBlock { block: BlockId, target: BlockId },
    #[error("{block}: reference to {target} does not match its parameters")]
    ReferenceMismatch { block: BlockId, target: BlockId },
    #[error("{0} is reachable but never terminated")]
    Unterminated(BlockId),
}

/// Verify that every block only reads its own registers, that every edge passes
/// arguments matching the parameters of its target, and that every block reachable
/// from `entries` is either terminated or final.
pub fn verify(system: &System, entries: &[BlockId]) -> Result<(), Vec<VerifyError>> {
    let mut errors = vec![];
    for (_, block) in system.iter_blocks() {
        verify_block(system, block, &mut errors);
    }
    verify_reachable(system, entries, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn verify_block(system: &System, block: &Block, errors: &mut Vec<VerifyError>) {
    for (i, instr) in block.instructions.iter().enumerate() {
        let register = Register(block.parameters.len() + i);
        for operand in instr.operation.operands() {
            if operand >= register {
                errors.push(VerifyError::ForwardReference {
                    block: block.id,
                    register,
                    operand,
                });
            }
        }

        if let Some(target) = instr.operation.as_block_ref() {
            match system.blocks.get(target.0) {
                None => errors.push(VerifyError::MissingBlock {
                    block: block.id,
                    target,
                }),
                Some(referenced) => {
                    if Type::BlockRef(referenced.parameter_types()) != instr.ty {
                        errors.push(VerifyError::ReferenceMismatch {
                            block: block.id,
                            target,
                        });
                    }
                }
            }
        }
    }

    let terminator = match &block.terminator {
        Some(terminator) => terminator,
        None => return,
    };
    for register in terminator.registers() {
        if !block.contains(register) {
            errors.push(VerifyError::UndefinedRegister {
                block: block.id,
                register,
            });
            return;
        }
    }

    if let Terminator::Branch { condition, .. } = terminator {
        if block.type_of(*condition) != &Type::Bool {
            errors.push(VerifyError::ConditionType {
                block: block.id,
                register: *condition,
            });
        }
    }
    for edge in terminator.edges() {
        verify_edge(block, edge, errors);
    }
}

fn verify_edge(block: &Block, edge: &Edge, errors: &mut Vec<VerifyError>) {
    let expected = match block.type_of(edge.target) {
        Type::BlockRef(params) => params,
        ty => {
            errors.push(VerifyError::NotABlockRef {
                block: block.id,
                register: edge.target,
                ty: ty.clone(),
            });
            return;
        }
    };
    let found: Vec<_> = edge
        .arguments
        .iter()
        .map(|arg| block.type_of(*arg).clone())
        .collect();

    if expected != &found {
        let list = |types: &[Type]| {
            types
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        errors.push(VerifyError::ArgumentMismatch {
            block: block.id,
            register: edge.target,
            expected: list(expected.as_slice()),
            found: list(found.as_slice()),
        });
    }
}

/// Follow every block reference, whether it is jumped to or stored as a continuation.
fn verify_reachable(system: &System, entries: &[BlockId], errors: &mut Vec<VerifyError>) {
    let mut seen = BTreeSet::new();
    let mut pending = entries.to_vec();
    while let Some(id) = pending.pop() {
        if !seen.insert(id) {
            continue;
        }
        let block = match system.blocks.get(id.0) {
            Some(block) => block,
            None => continue,
        };
        if !block.is_terminated() {
            errors.push(VerifyError::Unterminated(id));
        }
        pending.extend(block.referenced_blocks());
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        ast::Literal,
        il::{Instruction, Operation, Parameter},
    };

    use super::*;

    fn block(id: usize, parameters: Vec<Type>) -> Block {
        Block::new(
            BlockId(id),
            parameters
                .into_iter()
                .map(|ty| Parameter { ty, name: None })
                .collect(),
        )
    }

    fn two_blocks(argument: Literal, ty: Type) -> System {
        let mut entry = block(0, vec![]);
        entry.instructions.push(Instruction::new(Operation::Literal(argument), ty));
        entry.instructions.push(Instruction::new(
            Operation::BlockRef(BlockId(1)),
            Type::BlockRef(vec![Type::U8]),
        ));
        entry.terminator = Some(Terminator::Goto(Edge {
            target: Register(1),
            arguments: vec![Register(0)],
        }));
        let mut exit = block(1, vec![Type::U8]);
        exit.is_final = true;

        System {
            blocks: vec![entry, exit],
            structs: vec![],
        }
    }

    #[test]
    fn well_formed_edges_verify() {
        let system = two_blocks(Literal::U8(3), Type::U8);
        assert_eq!(Ok(()), verify(&system, &[BlockId(0)]));
    }

    #[test]
    fn argument_types_must_match_parameters() {
        let system = two_blocks(Literal::Bool(true), Type::Bool);
        assert_eq!(
            Err(vec![VerifyError::ArgumentMismatch {
                block: BlockId(0),
                register: Register(1),
                expected: "u8".to_string(),
                found: "bool".to_string(),
            }]),
            verify(&system, &[BlockId(0)])
        );
    }

    #[test]
    fn reachable_blocks_must_terminate() {
        let mut system = two_blocks(Literal::U8(3), Type::U8);
        system.blocks[1].is_final = false;
        assert_eq!(
            Err(vec![VerifyError::Unterminated(BlockId(1))]),
            verify(&system, &[BlockId(0)])
        );
        // Unreachable blocks may be left open.
        assert_eq!(Ok(()), verify(&system, &[]));
    }

    #[test]
    fn forward_references_are_rejected() {
        let mut entry = block(0, vec![]);
        entry.instructions.push(Instruction::new(
            Operation::NewArray(Register(0)),
            Type::Array(Box::new(Type::U8)),
        ));
        entry.is_final = true;
        let system = System {
            blocks: vec![entry],
            structs: vec![],
        };
        assert_eq!(
            Err(vec![VerifyError::ForwardReference {
                block: BlockId(0),
                register: Register(0),
                operand: Register(0),
            }]),
            verify(&system, &[BlockId(0)])
        );
    }

    #[test]
    fn references_to_missing_blocks_are_rejected() {
        let mut system = two_blocks(Literal::U8(3), Type::U8);
        system.blocks.pop();
        let errors = verify(&system, &[BlockId(0)]).unwrap_err();
        assert!(errors.contains(&VerifyError::MissingBlock {
            block: BlockId(0),
            target: BlockId(1),
        }));
    }
}

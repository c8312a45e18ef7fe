use crate::{
    ast::{self, Clause, Expr, ExprKind, If, Literal, Loop, Statement},
    error::{internal_error, Diagnostic, InternalError},
    il::{BlockId, Edge, Instruction, Operation, Type},
    prelude::*,
};

use super::{Generator, LoopFrame, LoopTargets};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Jump {
    Break,
    Continue,
}

impl Generator {
    /// Generate a block of statements into `b`. Returns the block control falls through to,
    /// or `None` if the end of the block is unreachable.
    pub(super) fn generate_block(&mut self, b: BlockId, block: &ast::Block) -> Option<BlockId> {
        self.hoist(block);

        let mut current = b;
        for (i, statement) in block.statements.iter().enumerate() {
            match self.generate_statement(current, statement) {
                Some(next) => current = next,
                None => {
                    if i + 1 < block.statements.len() {
                        self.builder.report(Diagnostic::UnreachableCode);
                    }
                    return None;
                }
            }
        }
        Some(current)
    }

    fn generate_statement(&mut self, b: BlockId, statement: &Statement) -> Option<BlockId> {
        match statement {
            Statement::Block(inner) => {
                let child = self.builder.fork_block(b);
                let end = self.generate_block(child, inner)?;
                Some(self.builder.rejoin_block(b, end))
            }
            Statement::Break(label) => self.generate_jump(b, label.as_deref(), Jump::Break),
            Statement::Continue(label) => self.generate_jump(b, label.as_deref(), Jump::Continue),
            Statement::Define(ty, clauses) => {
                let ty = self.lower_type(ty);
                Some(self.generate_definitions(b, clauses, Some(ty)))
            }
            Statement::Let(clauses) => Some(self.generate_definitions(b, clauses, None)),
            Statement::DoWhile(l) => {
                let tested = !is_constant_true(&l.condition);
                self.generate_post_condition_loop(b, l, tested)
            }
            Statement::While(l) if is_constant_true(&l.condition) => {
                self.generate_post_condition_loop(b, l, false)
            }
            Statement::While(l) => Some(self.generate_pre_condition_loop(b, l)),
            Statement::Expression(expr) => Some(self.generate_expression(b, expr)),
            Statement::If(stmt) => self.generate_if(b, stmt),
            Statement::Return(value) => {
                self.generate_return(b, value.as_ref());
                None
            }
        }
    }

    /// Bind each clause into the live variables. Uninitialized variables are bound without
    /// a register until they are assigned.
    fn generate_definitions(
        &mut self,
        mut b: BlockId,
        clauses: &[Clause],
        explicit: Option<Type>,
    ) -> BlockId {
        for clause in clauses {
            let register = match &clause.value {
                Some(value) => {
                    b = self.generate_expression(b, value);
                    Some(self.builder.last_register(b))
                }
                None => None,
            };
            let ty = match (&explicit, &clause.value) {
                (Some(ty), _) => ty.clone(),
                (None, Some(value)) => self.lower_type(&value.ty),
                (None, None) => {
                    internal_error(InternalError::UninitializedSymbol(clause.name.clone()))
                }
            };
            trace!("Define '{}' as {ty} in {b}", clause.name);
            self.builder
                .scratch_mut(b)
                .symbols
                .define(&clause.name, ty, register);
        }
        b
    }

    fn generate_if(&mut self, b: BlockId, stmt: &If) -> Option<BlockId> {
        let b = self.generate_expression(b, &stmt.condition);
        let condition = self.builder.last_register(b);
        let (then, otherwise) = self.builder.branch_into(b, condition);

        let first = self.generate_arm(then, stmt.first.as_ref());
        let second = self.generate_arm(otherwise, stmt.second.as_ref());
        match (first, second) {
            (Some(first), Some(second)) => Some(self.builder.merge_blocks(b, first, second)),
            (Some(end), None) | (None, Some(end)) => Some(self.builder.rejoin_block(b, end)),
            (None, None) => None,
        }
    }

    fn generate_arm(&mut self, start: BlockId, arm: Option<&ast::Block>) -> Option<BlockId> {
        match arm {
            Some(block) => self.generate_block(start, block),
            None => Some(start),
        }
    }

    /// `while (c) body`: the condition is tested before every iteration.
    fn generate_pre_condition_loop(&mut self, b: BlockId, l: &Loop) -> BlockId {
        let condition = self.builder.fork_block(b);
        let test = self.generate_expression(condition, &l.condition);
        let value = self.builder.last_register(test);
        let (body, post) = self.builder.branch_into(test, value);

        self.loops.push(LoopFrame {
            label: l.label.clone(),
            targets: LoopTargets::PreCondition { condition, post },
        });
        let end = self.generate_block(body, &l.body);
        self.loops.pop();

        if let Some(end) = end {
            self.builder.join_blocks(end, condition);
        }
        post
    }

    /// `do body while (c)`, and loops whose condition is constantly true. The latter are
    /// not `tested`: every continuation jumps straight back into the body, and the loop can
    /// only be left through `break`.
    fn generate_post_condition_loop(
        &mut self,
        b: BlockId,
        l: &Loop,
        tested: bool,
    ) -> Option<BlockId> {
        let body = self.builder.fork_block(b);

        self.loops.push(LoopFrame {
            label: l.label.clone(),
            targets: LoopTargets::PostCondition {
                breaks: vec![],
                continues: vec![],
            },
        });
        let end = self.generate_block(body, &l.body);
        let (breaks, mut continues) = match self.loops.pop() {
            Some(LoopFrame {
                targets: LoopTargets::PostCondition { breaks, continues },
                ..
            }) => (breaks, continues),
            _ => internal_error(InternalError::NoEnclosingLoop),
        };
        continues.extend(end);

        if continues.is_empty() {
            if tested {
                self.builder.report(Diagnostic::UnreachableLoopCondition);
            }
            return self.exit_loop(b, &breaks);
        }

        if !tested {
            let back = self.builder.tangle_blocks(b, &continues);
            self.builder.join_blocks(back, body);
            return self.exit_loop(b, &breaks);
        }

        let condition = self.builder.tangle_blocks(b, &continues);
        let test = self.generate_expression(condition, &l.condition);
        let value = self.builder.last_register(test);
        let (again, post) = self.builder.weave_blocks(b, &breaks, test, value);
        self.builder.join_blocks(again, body);
        Some(post)
    }

    fn exit_loop(&mut self, b: BlockId, breaks: &[BlockId]) -> Option<BlockId> {
        if breaks.is_empty() {
            None
        } else {
            Some(self.builder.tangle_blocks(b, breaks))
        }
    }

    fn generate_jump(&mut self, b: BlockId, label: Option<&str>, jump: Jump) -> Option<BlockId> {
        let index = self.find_loop(label);
        let target = match &mut self.loops[index].targets {
            LoopTargets::PreCondition { condition, post } => match jump {
                Jump::Break => Some(*post),
                Jump::Continue => Some(*condition),
            },
            LoopTargets::PostCondition { breaks, continues } => {
                match jump {
                    Jump::Break => breaks.push(b),
                    Jump::Continue => continues.push(b),
                }
                None
            }
        };

        if let Some(target) = target {
            self.builder.join_blocks(b, target);
        }
        None
    }

    /// The innermost loop, or the innermost loop with the given label.
    fn find_loop(&self, label: Option<&str>) -> usize {
        let found = match label {
            None => self.loops.len().checked_sub(1),
            Some(label) => self
                .loops
                .iter()
                .rposition(|l| l.label.as_deref() == Some(label)),
        };
        match (found, label) {
            (Some(index), _) => index,
            (None, Some(label)) => internal_error(InternalError::UnknownLabel(label.to_string())),
            (None, None) => internal_error(InternalError::NoEnclosingLoop),
        }
    }

    /// Jump to the continuation stored in field 0 of the return slot, passing the return
    /// slot itself and the result, if any.
    pub(super) fn generate_return(&mut self, b: BlockId, value: Option<&Expr>) {
        let (name, result) = match self.frames.last() {
            Some(frame) => (frame.name.clone(), frame.result.clone()),
            None => internal_error(InternalError::ReturnOutsideFunction),
        };

        let (b, value) = match value {
            Some(expr) if !result.is_void() => {
                let b = self.generate_expression(b, expr);
                (b, Some(self.builder.last_register(b)))
            }
            None if result.is_void() => (b, None),
            _ => internal_error(InternalError::ReturnMismatch(result)),
        };

        let slot = match self.builder.scratch(b).return_slot {
            Some(slot) => slot,
            None => internal_error(InternalError::MissingReturnSlot(b)),
        };
        let continuation = match self.builder.type_of(b, slot) {
            Type::Object(layout) => self.builder.system.layout(layout).fields[0].clone(),
            other => internal_error(InternalError::NotAnObject(other)),
        };
        let target = self.builder.emit(
            b,
            Instruction::new(
                Operation::GetField {
                    object: slot,
                    field: 0,
                },
                continuation,
            ),
        );

        trace!("Return from '{name}' in {b}");
        let mut arguments = vec![slot];
        arguments.extend(value);
        self.builder.goto(b, Edge { target, arguments });
    }
}

fn is_constant_true(condition: &Expr) -> bool {
    matches!(condition.kind, ExprKind::Literal(Literal::Bool(true)))
}

//! Primitive operations for building the block graph.
//!
//! Every operation that creates a block derives its parameters from the live state of one
//! or more predecessors, and every operation that connects blocks computes the arguments
//! of the edge from the same rules, so that call sites never lay out parameters by hand.
use std::collections::HashMap;

use crate::{
    error::{internal_error, Diagnostic, InternalError},
    prelude::*,
};

use super::{
    Block, BlockId, Edge, Instruction, Operation, Parameter, Register, Scratch, Signature,
    StructId, System, Terminator, Type,
};

pub struct Builder {
    pub system: System,
    pub diagnostics: Vec<Diagnostic>,
    pub(super) return_structs: HashMap<Type, StructId>,
}
impl Builder {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            diagnostics: vec![],
            return_structs: HashMap::new(),
        }
    }

    /// Record a warning. Generation continues.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        warn!("{diagnostic}");
        self.diagnostics.push(diagnostic);
    }

    /// Allocate an empty block with the given parameters.
    pub fn create_block(&mut self, parameters: Vec<Parameter>) -> BlockId {
        let id = BlockId(self.system.blocks.len());
        debug!("Allocate {id} with {} parameter(s)", parameters.len());
        self.system.blocks.push(Block::new(id, parameters));
        id
    }

    /// Create a block whose parameters carry the live state of `context` into it, as
    /// supplied by `predecessors`. Names, types and the return slot come from `context`;
    /// the operand stack comes from the predecessors, which must agree on its depth.
    ///
    /// A variable only exists in the child if it holds a value on every predecessor.
    pub fn child_block(&mut self, context: BlockId, predecessors: &[BlockId]) -> BlockId {
        let first = match predecessors.first() {
            Some(first) => *first,
            None => internal_error(InternalError::ShapeMismatch(context, context)),
        };
        let depth = self.scratch(first).stack.len();
        for pred in predecessors {
            if self.scratch(*pred).stack.len() != depth {
                internal_error(InternalError::ShapeMismatch(first, *pred));
            }
        }

        let mut parameters = vec![];
        let mut signature = Signature::default();
        let mut scratch = Scratch::default();

        let ctx = self.system.block(context);
        if let Some(slot) = ctx.scratch.return_slot {
            scratch.return_slot = Some(Register(parameters.len()));
            signature.accepts_return = true;
            parameters.push(Parameter {
                ty: ctx.type_of(slot).clone(),
                name: None,
            });
        }

        let mut lost = vec![];
        for (name, symbol) in ctx.scratch.symbols.iter() {
            let holding = predecessors
                .iter()
                .filter(|pred| {
                    self.scratch(**pred)
                        .symbols
                        .get(name)
                        .map_or(false, |s| s.register.is_some())
                })
                .count();

            let register = if holding == predecessors.len() {
                let register = Register(parameters.len());
                parameters.push(Parameter {
                    ty: symbol.ty.clone(),
                    name: Some(name.clone()),
                });
                signature.variables.push(name.clone());
                Some(register)
            } else {
                if holding > 0 {
                    lost.push(name.clone());
                }
                None
            };
            scratch.symbols.define(name, symbol.ty.clone(), register);
        }

        let source = self.system.block(first);
        for slot in source.scratch.stack.iter() {
            scratch.stack.push(Register(parameters.len()));
            parameters.push(Parameter {
                ty: source.type_of(*slot).clone(),
                name: None,
            });
        }
        signature.stack_depth = depth;

        for name in lost {
            self.report(Diagnostic::LossOfValue(name));
        }

        let child = self.create_block(parameters);
        let block = self.system.block_mut(child);
        block.signature = signature;
        block.scratch = scratch;
        child
    }

    /// Terminate `predecessor` with a jump to `target`.
    pub fn join_blocks(&mut self, predecessor: BlockId, target: BlockId) {
        let edge = self.edge(predecessor, target);
        self.terminate(predecessor, Terminator::Goto(edge));
    }

    /// Enter a nested block without changing the visible state.
    pub fn fork_block(&mut self, parent: BlockId) -> BlockId {
        let child = self.child_block(parent, &[parent]);
        self.join_blocks(parent, child);
        child
    }

    /// Leave a nested block, continuing with the variables visible in `context`.
    pub fn rejoin_block(&mut self, context: BlockId, inner: BlockId) -> BlockId {
        let child = self.child_block(context, &[inner]);
        self.join_blocks(inner, child);
        child
    }

    /// Terminate `parent` with a branch on `condition`, returning the blocks taken when
    /// the condition is true and false respectively.
    pub fn branch_into(&mut self, parent: BlockId, condition: Register) -> (BlockId, BlockId) {
        let then = self.child_block(parent, &[parent]);
        let otherwise = self.child_block(parent, &[parent]);
        let then_edge = self.edge(parent, then);
        let otherwise_edge = self.edge(parent, otherwise);
        self.terminate(
            parent,
            Terminator::Branch {
                condition,
                then: then_edge,
                otherwise: otherwise_edge,
            },
        );
        (then, otherwise)
    }

    /// Merge any number of blocks into a single new block.
    pub fn tangle_blocks(&mut self, context: BlockId, predecessors: &[BlockId]) -> BlockId {
        let child = self.child_block(context, predecessors);
        for pred in predecessors {
            self.join_blocks(*pred, child);
        }
        child
    }

    /// Branch out of `condition_block` on `condition`, merging the false edge with
    /// `predecessors`. Returns the true block and the merged false block.
    pub fn weave_blocks(
        &mut self,
        context: BlockId,
        predecessors: &[BlockId],
        condition_block: BlockId,
        condition: Register,
    ) -> (BlockId, BlockId) {
        let then = self.child_block(context, &[condition_block]);

        let mut merging = vec![condition_block];
        merging.extend_from_slice(predecessors);
        let otherwise = self.child_block(context, &merging);
        for pred in predecessors {
            self.join_blocks(*pred, otherwise);
        }

        let then_edge = self.edge(condition_block, then);
        let otherwise_edge = self.edge(condition_block, otherwise);
        self.terminate(
            condition_block,
            Terminator::Branch {
                condition,
                then: then_edge,
                otherwise: otherwise_edge,
            },
        );
        (then, otherwise)
    }

    pub fn merge_blocks(&mut self, context: BlockId, first: BlockId, second: BlockId) -> BlockId {
        self.tangle_blocks(context, &[first, second])
    }

    /// Append an instruction to a block, returning the register it produces.
    pub fn emit(&mut self, block: BlockId, instruction: Instruction) -> Register {
        let target = self.system.block(block);
        if target.is_terminated() {
            internal_error(InternalError::Terminated(block));
        }
        for operand in instruction.operation.operands() {
            if !target.contains(operand) {
                internal_error(InternalError::NoSuchRegister(block, operand));
            }
        }

        let register = Register(target.register_count());
        trace!("{block}: {register} {} := {}", instruction.ty, instruction.operation);
        self.system.block_mut(block).instructions.push(instruction);
        register
    }

    /// Reference `target` from `block`, so it can be jumped to or stored.
    pub fn emit_blockref(&mut self, block: BlockId, target: BlockId) -> Register {
        let ty = Type::BlockRef(self.system.block(target).parameter_types());
        self.emit(block, Instruction::new(Operation::BlockRef(target), ty))
    }

    /// Copy a register, so that the copy is the last register of the block.
    pub fn mirror(&mut self, block: BlockId, register: Register) -> Register {
        let ty = self.system.block(block).type_of(register).clone();
        self.emit(block, Instruction::new(Operation::GetSymbol(register), ty))
    }

    pub fn last_register(&self, block: BlockId) -> Register {
        match self.system.block(block).last_register() {
            Some(register) => register,
            None => internal_error(InternalError::NoSuchRegister(block, Register(0))),
        }
    }

    pub fn type_of(&self, block: BlockId, register: Register) -> Type {
        self.system.block(block).type_of(register).clone()
    }

    pub fn push_stack(&mut self, block: BlockId, register: Register) {
        if !self.system.block(block).contains(register) {
            internal_error(InternalError::NoSuchRegister(block, register));
        }
        self.scratch_mut(block).stack.push(register);
    }

    /// Push the last register of `block` onto its operand stack.
    pub fn push_last(&mut self, block: BlockId) {
        let last = self.last_register(block);
        self.push_stack(block, last);
    }

    pub fn pop_stack(&mut self, block: BlockId) -> Register {
        match self.scratch_mut(block).stack.pop() {
            Some(register) => register,
            None => internal_error(InternalError::EmptyStack(block)),
        }
    }

    /// Pop `count` registers, returned in the order they were pushed.
    pub fn pop_many(&mut self, block: BlockId, count: usize) -> Vec<Register> {
        let mut popped: Vec<_> = (0..count).map(|_| self.pop_stack(block)).collect();
        popped.reverse();
        popped
    }

    /// The register `depth` slots below the top of the operand stack.
    pub fn peek_stack(&self, block: BlockId, depth: usize) -> Register {
        let stack = &self.scratch(block).stack;
        match stack.len().checked_sub(depth + 1) {
            Some(i) => stack[i],
            None => internal_error(InternalError::EmptyStack(block)),
        }
    }

    /// Terminate a block with a jump through an arbitrary block reference.
    pub fn goto(&mut self, block: BlockId, edge: Edge) {
        self.check_edge(block, &edge);
        self.terminate(block, Terminator::Goto(edge));
    }

    pub fn mark_final(&mut self, block: BlockId) {
        if self.system.block(block).is_terminated() {
            internal_error(InternalError::Terminated(block));
        }
        debug!("{block} is final");
        self.system.block_mut(block).is_final = true;
    }

    pub(super) fn scratch(&self, block: BlockId) -> &Scratch {
        &self.system.block(block).scratch
    }

    pub(super) fn scratch_mut(&mut self, block: BlockId) -> &mut Scratch {
        &mut self.system.block_mut(block).scratch
    }

    /// Compute the edge from `from` into the child block `to`, reading the arguments in
    /// the order the parameters of `to` were derived.
    fn edge(&mut self, from: BlockId, to: BlockId) -> Edge {
        let signature = self.system.block(to).signature.clone();
        let source = self.scratch(from);

        let mut arguments = vec![];
        if signature.accepts_return {
            match source.return_slot {
                Some(slot) => arguments.push(slot),
                None => internal_error(InternalError::MissingReturnSlot(from)),
            }
        }
        for name in signature.variables.iter() {
            match source.symbols.get(name).and_then(|s| s.register) {
                Some(register) => arguments.push(register),
                None => internal_error(InternalError::ShapeMismatch(to, from)),
            }
        }
        if source.stack.len() != signature.stack_depth {
            internal_error(InternalError::ShapeMismatch(to, from));
        }
        arguments.extend(source.stack.iter().copied());

        let target = self.emit_blockref(from, to);
        let edge = Edge { target, arguments };
        self.check_edge(from, &edge);
        edge
    }

    /// The argument types of an edge must equal the parameter types of its target.
    fn check_edge(&self, block: BlockId, edge: &Edge) {
        let source = self.system.block(block);
        let expected = match source.type_of(edge.target) {
            Type::BlockRef(params) => params.clone(),
            other => internal_error(InternalError::NotCallable(other.clone())),
        };
        let found: Vec<_> = edge
            .arguments
            .iter()
            .map(|arg| source.type_of(*arg).clone())
            .collect();

        if expected != found {
            internal_error(InternalError::EdgeMismatch {
                from: block,
                expected: type_list(&expected),
                found: type_list(&found),
            });
        }
    }

    fn terminate(&mut self, block: BlockId, terminator: Terminator) {
        let target = self.system.block_mut(block);
        if target.is_terminated() {
            internal_error(InternalError::Terminated(block));
        }
        trace!("{block}: terminated");
        target.terminator = Some(terminator);
    }
}
impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

fn type_list(types: &[Type]) -> String {
    types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use crate::ast::Literal;

    use super::*;

    /// A builder with one block holding a return slot and the given variables, each
    /// initialized to a fresh literal.
    fn with_variables(names: &[&str]) -> (Builder, BlockId) {
        let mut builder = Builder::new();
        let rs = builder.return_struct(&Type::Void);
        let block = builder.create_block(vec![Parameter {
            ty: Type::Object(rs),
            name: None,
        }]);
        builder.scratch_mut(block).return_slot = Some(Register(0));
        for (i, name) in names.iter().enumerate() {
            let reg = literal(&mut builder, block, i as u8);
            builder.scratch_mut(block).symbols.define(name, Type::U8, Some(reg));
        }
        (builder, block)
    }

    fn literal(builder: &mut Builder, block: BlockId, value: u8) -> Register {
        builder.emit(
            block,
            Instruction::new(Operation::Literal(Literal::U8(value)), Type::U8),
        )
    }

    fn goto_arguments(builder: &Builder, block: BlockId) -> Vec<Register> {
        match &builder.system.block(block).terminator {
            Some(Terminator::Goto(edge)) => edge.arguments.clone(),
            other => panic!("expected a goto, found {:?}", other),
        }
    }

    #[test]
    fn child_parameters_are_return_slot_variables_then_stack() {
        let (mut builder, parent) = with_variables(&["a", "b"]);
        let lit = literal(&mut builder, parent, 9);
        builder.push_stack(parent, lit);

        let child = builder.child_block(parent, &[parent]);
        let block = builder.system.block(child);
        let names: Vec<_> = block.parameters.iter().map(|p| p.name.clone()).collect();
        assert_eq!(
            vec![None, Some("a".to_string()), Some("b".to_string()), None],
            names
        );
        assert_eq!(Some(Register(0)), block.scratch.return_slot);
        assert_eq!(vec![Register(3)], block.scratch.stack);
    }

    #[test]
    fn fork_passes_live_state_in_parameter_order() {
        let (mut builder, parent) = with_variables(&["a", "b"]);
        builder.fork_block(parent);
        // $0 slot, $1 a, $2 b
        assert_eq!(
            vec![Register(0), Register(1), Register(2)],
            goto_arguments(&builder, parent)
        );
        assert!(builder.diagnostics.is_empty());
    }

    #[test]
    fn variable_assigned_on_some_paths_is_lost() {
        let (mut builder, parent) = with_variables(&[]);
        builder
            .scratch_mut(parent)
            .symbols
            .define("x", Type::U8, None);
        let cond = builder.emit(
            parent,
            Instruction::new(Operation::Literal(Literal::Bool(true)), Type::Bool),
        );
        let (then, otherwise) = builder.branch_into(parent, cond);
        let value = literal(&mut builder, then, 1);
        builder.scratch_mut(then).symbols.rebind("x", value);

        let merged = builder.merge_blocks(parent, then, otherwise);
        assert_eq!(
            vec![Diagnostic::LossOfValue("x".to_string())],
            builder.diagnostics
        );
        let symbol = builder.scratch(merged).symbols.get("x").cloned();
        assert_eq!(None, symbol.and_then(|s| s.register));
        assert_eq!(1, builder.system.block(merged).parameters.len());
    }

    #[test]
    fn variable_assigned_on_all_paths_survives_merge() {
        let (mut builder, parent) = with_variables(&[]);
        builder
            .scratch_mut(parent)
            .symbols
            .define("x", Type::U8, None);
        let cond = builder.emit(
            parent,
            Instruction::new(Operation::Literal(Literal::Bool(false)), Type::Bool),
        );
        let (then, otherwise) = builder.branch_into(parent, cond);
        for arm in [then, otherwise] {
            let value = literal(&mut builder, arm, 1);
            builder.scratch_mut(arm).symbols.rebind("x", value);
        }

        let merged = builder.merge_blocks(parent, then, otherwise);
        assert!(builder.diagnostics.is_empty());
        assert_eq!(2, builder.system.block(merged).parameters.len());
        assert_eq!(vec![Register(0), Register(1)], goto_arguments(&builder, then));
    }

    #[test]
    fn rejoin_drops_inner_variables() {
        let (mut builder, outer) = with_variables(&["a"]);
        let inner = builder.fork_block(outer);
        let value = literal(&mut builder, inner, 4);
        builder
            .scratch_mut(inner)
            .symbols
            .define("inner", Type::U8, Some(value));

        let after = builder.rejoin_block(outer, inner);
        assert_eq!(2, builder.system.block(after).parameters.len());
        assert!(builder.scratch(after).symbols.get("inner").is_none());
    }

    #[test]
    fn tangle_joins_every_predecessor() {
        let (mut builder, parent) = with_variables(&["a"]);
        let cond = builder.emit(
            parent,
            Instruction::new(Operation::Literal(Literal::Bool(true)), Type::Bool),
        );
        let (then, otherwise) = builder.branch_into(parent, cond);
        let merged = builder.tangle_blocks(parent, &[then, otherwise]);
        for pred in [then, otherwise] {
            let block = builder.system.block(pred);
            let target = match &block.terminator {
                Some(Terminator::Goto(edge)) => block.static_target(edge.target),
                _ => None,
            };
            assert_eq!(Some(merged), target);
        }
    }

    #[test]
    fn weave_merges_inputs_into_the_false_edge() {
        let (mut builder, parent) = with_variables(&["a"]);
        let cond = builder.emit(
            parent,
            Instruction::new(Operation::Literal(Literal::Bool(true)), Type::Bool),
        );
        let (body, exit) = builder.branch_into(parent, cond);
        let test = builder.fork_block(body);
        let test_cond = builder.emit(
            test,
            Instruction::new(Operation::Literal(Literal::Bool(false)), Type::Bool),
        );

        let (again, post) = builder.weave_blocks(parent, &[exit], test, test_cond);
        let block = builder.system.block(test);
        match &block.terminator {
            Some(Terminator::Branch {
                then, otherwise, ..
            }) => {
                assert_eq!(Some(again), block.static_target(then.target));
                assert_eq!(Some(post), block.static_target(otherwise.target));
            }
            other => panic!("expected a branch, found {:?}", other),
        }
        assert!(builder.system.block(exit).terminator.is_some());
    }

    #[test]
    fn stack_pops_return_registers_in_push_order() {
        let (mut builder, block) = with_variables(&[]);
        let a = literal(&mut builder, block, 1);
        let b = literal(&mut builder, block, 2);
        builder.push_stack(block, a);
        builder.push_stack(block, b);
        assert_eq!(a, builder.peek_stack(block, 1));
        assert_eq!(vec![a, b], builder.pop_many(block, 2));
    }

    #[test]
    #[should_panic(expected = "operand stack of B0 is empty")]
    fn popping_an_empty_stack_aborts() {
        let (mut builder, block) = with_variables(&[]);
        builder.pop_stack(block);
    }

    #[test]
    #[should_panic(expected = "does not have the same shape as")]
    fn predecessors_with_different_stack_depths_abort() {
        let (mut builder, parent) = with_variables(&[]);
        let cond = builder.emit(
            parent,
            Instruction::new(Operation::Literal(Literal::Bool(true)), Type::Bool),
        );
        let (then, otherwise) = builder.branch_into(parent, cond);
        let value = literal(&mut builder, then, 1);
        builder.push_stack(then, value);
        builder.merge_blocks(parent, then, otherwise);
    }

    #[test]
    #[should_panic(expected = "B0 is already terminated")]
    fn emitting_into_a_terminated_block_aborts() {
        let (mut builder, parent) = with_variables(&[]);
        builder.fork_block(parent);
        literal(&mut builder, parent, 0);
    }

    #[test]
    #[should_panic(expected = "B0 has no register $7")]
    fn operands_must_exist_in_the_block() {
        let (mut builder, block) = with_variables(&[]);
        builder.emit(
            block,
            Instruction::new(Operation::NewArray(Register(7)), Type::Array(Box::new(Type::U8))),
        );
    }
}

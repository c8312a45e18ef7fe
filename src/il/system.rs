//! The container of all blocks and struct layouts of a compilation unit.
use std::fmt::{self, Display, Formatter};

use crate::{
    error::{internal_error, InternalError},
    ext::ordered_hash_map::OrderedHashMap,
};

use super::{Instruction, Register, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub usize);
impl Display for BlockId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "B{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StructId(pub usize);
impl Display for StructId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

/// Owns every block and struct layout. Identities are indices, assigned in allocation
/// order and never reused.
#[derive(Debug, Clone, Default)]
pub struct System {
    pub blocks: Vec<Block>,
    pub structs: Vec<StructLayout>,
}
impl System {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block(&self, id: BlockId) -> &Block {
        self.blocks
            .get(id.0)
            .unwrap_or_else(|| internal_error(InternalError::NoSuchBlock(id)))
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut Block {
        self.blocks
            .get_mut(id.0)
            .unwrap_or_else(|| internal_error(InternalError::NoSuchBlock(id)))
    }

    pub fn layout(&self, id: StructId) -> &StructLayout {
        self.structs
            .get(id.0)
            .unwrap_or_else(|| internal_error(InternalError::NoSuchStruct(id)))
    }

    pub fn layout_mut(&mut self, id: StructId) -> &mut StructLayout {
        self.structs
            .get_mut(id.0)
            .unwrap_or_else(|| internal_error(InternalError::NoSuchStruct(id)))
    }

    pub fn iter_blocks(&self) -> impl Iterator<Item = (BlockId, &Block)> {
        self.blocks.iter().enumerate().map(|(i, b)| (BlockId(i), b))
    }
}

/// What a struct layout was created for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutOrigin {
    Class(String),
    /// Captures the live state of a caller across a call.
    Context,
    /// `{ blockref[, result] }`, shared by every function with the same result type.
    Return,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructLayout {
    pub fields: Vec<Type>,
    pub origin: LayoutOrigin,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub ty: Type,
    /// The variable this parameter carries, if any.
    pub name: Option<String>,
}

/// The transfer of control to the block referenced by `target`, binding `arguments` to
/// its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub target: Register,
    pub arguments: Vec<Register>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    Goto(Edge),
    Branch {
        condition: Register,
        then: Edge,
        otherwise: Edge,
    },
}
impl Terminator {
    pub fn edges(&self) -> Vec<&Edge> {
        match self {
            Terminator::Goto(edge) => vec![edge],
            Terminator::Branch {
                then, otherwise, ..
            } => vec![then, otherwise],
        }
    }

    /// Every register read by the terminator.
    pub fn registers(&self) -> Vec<Register> {
        let mut registers = vec![];
        if let Terminator::Branch { condition, .. } = self {
            registers.push(*condition);
        }
        for edge in self.edges() {
            registers.push(edge.target);
            registers.extend(edge.arguments.iter().copied());
        }
        registers
    }

    pub fn registers_mut(&mut self) -> Vec<&mut Register> {
        fn edge_registers(edge: &mut Edge) -> impl Iterator<Item = &mut Register> {
            std::iter::once(&mut edge.target).chain(edge.arguments.iter_mut())
        }

        match self {
            Terminator::Goto(edge) => edge_registers(edge).collect(),
            Terminator::Branch {
                condition,
                then,
                otherwise,
            } => std::iter::once(condition)
                .chain(edge_registers(then))
                .chain(edge_registers(otherwise))
                .collect(),
        }
    }
}

/// A basic block: parameters, instructions, and a single terminator, unless the block is
/// final.
#[derive(Debug, Clone)]
pub struct Block {
    pub id: BlockId,
    pub parameters: Vec<Parameter>,
    pub instructions: Vec<Instruction>,
    pub terminator: Option<Terminator>,
    pub is_final: bool,
    pub(crate) signature: Signature,
    pub(crate) scratch: Scratch,
}
impl Block {
    pub fn new(id: BlockId, parameters: Vec<Parameter>) -> Self {
        Self {
            id,
            parameters,
            instructions: vec![],
            terminator: None,
            is_final: false,
            signature: Signature::default(),
            scratch: Scratch::default(),
        }
    }

    pub fn register_count(&self) -> usize {
        self.parameters.len() + self.instructions.len()
    }

    pub fn last_register(&self) -> Option<Register> {
        self.register_count().checked_sub(1).map(Register)
    }

    pub fn contains(&self, register: Register) -> bool {
        register.0 < self.register_count()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminator.is_some() || self.is_final
    }

    pub fn parameter_types(&self) -> Vec<Type> {
        self.parameters.iter().map(|p| p.ty.clone()).collect()
    }

    /// The instruction producing `register`, or `None` for a parameter.
    pub fn instruction(&self, register: Register) -> Option<&Instruction> {
        register
            .0
            .checked_sub(self.parameters.len())
            .and_then(|i| self.instructions.get(i))
    }

    pub fn type_of(&self, register: Register) -> &Type {
        match self.parameters.get(register.0) {
            Some(param) => &param.ty,
            None => match self.instruction(register) {
                Some(instr) => &instr.ty,
                None => internal_error(InternalError::NoSuchRegister(self.id, register)),
            },
        }
    }

    /// The block `register` refers to, if it was produced by a block reference.
    pub fn static_target(&self, register: Register) -> Option<BlockId> {
        self.instruction(register)
            .and_then(|instr| instr.operation.as_block_ref())
    }

    /// Every block referenced from this block, in instruction order.
    pub fn referenced_blocks(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.instructions
            .iter()
            .filter_map(|instr| instr.operation.as_block_ref())
    }
}

/// How the parameters of a child block were derived, so that predecessors can compute
/// the arguments they pass to it.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Signature {
    pub accepts_return: bool,
    pub variables: Vec<String>,
    pub stack_depth: usize,
}

/// State used only while a block is being generated into.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Scratch {
    pub return_slot: Option<Register>,
    pub symbols: SymbolTable,
    pub stack: Vec<Register>,
}
impl Scratch {
    /// Every register holding live state: the return slot, existing variables, and the
    /// operand stack from bottom to top.
    pub fn live_registers(&self) -> Vec<Register> {
        self.return_slot
            .into_iter()
            .chain(self.symbols.iter().filter_map(|(_, s)| s.register))
            .chain(self.stack.iter().copied())
            .collect()
    }

    /// Rebuild the state with every register replaced by `f`, called in the same order
    /// as [`Scratch::live_registers`] lists them.
    pub fn map_registers(&self, mut f: impl FnMut(Register) -> Register) -> Scratch {
        let return_slot = self.return_slot.map(&mut f);
        let mut symbols = SymbolTable::default();
        for (name, symbol) in self.symbols.iter() {
            symbols.define(name, symbol.ty.clone(), symbol.register.map(&mut f));
        }
        let stack = self.stack.iter().map(|r| f(*r)).collect();
        Scratch {
            return_slot,
            symbols,
            stack,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Symbol {
    pub ty: Type,
    /// `None` while the variable does not hold a value on every path.
    pub register: Option<Register>,
}

/// The live variables of a block, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct SymbolTable {
    entries: OrderedHashMap<String, Symbol>,
}
impl SymbolTable {
    pub fn define(&mut self, name: &str, ty: Type, register: Option<Register>) {
        if self
            .entries
            .try_insert(name.to_string(), Symbol { ty, register })
            .is_err()
        {
            internal_error(InternalError::DuplicateSymbol(name.to_string()));
        }
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.entries.get(name)
    }

    /// Bind an existing variable to a new register.
    pub fn rebind(&mut self, name: &str, register: Register) {
        match self.entries.get_mut(name) {
            Some(symbol) => symbol.register = Some(register),
            None => internal_error(InternalError::UnknownSymbol(name.to_string())),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Symbol)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use crate::{ast::Literal, il::Operation};

    use super::*;

    fn sample_block() -> Block {
        let mut block = Block::new(
            BlockId(4),
            vec![Parameter {
                ty: Type::U8,
                name: Some("x".to_string()),
            }],
        );
        block.instructions.push(Instruction::new(
            Operation::BlockRef(BlockId(2)),
            Type::BlockRef(vec![]),
        ));
        block.instructions.push(Instruction::new(
            Operation::Literal(Literal::Bool(true)),
            Type::Bool,
        ));
        block
    }

    #[test]
    fn registers_index_parameters_then_instructions() {
        let block = sample_block();
        assert_eq!(3, block.register_count());
        assert_eq!(Some(Register(2)), block.last_register());
        assert_eq!(&Type::U8, block.type_of(Register(0)));
        assert_eq!(&Type::Bool, block.type_of(Register(2)));
        assert!(block.instruction(Register(0)).is_none());
    }

    #[test]
    fn static_targets_resolve_block_references() {
        let block = sample_block();
        assert_eq!(Some(BlockId(2)), block.static_target(Register(1)));
        assert_eq!(None, block.static_target(Register(2)));
        assert_eq!(vec![BlockId(2)], block.referenced_blocks().collect::<Vec<_>>());
    }

    #[test]
    #[should_panic(expected = "B4 has no register $3")]
    fn reading_a_missing_register_aborts() {
        sample_block().type_of(Register(3));
    }

    #[test]
    #[should_panic(expected = "no such struct: S3")]
    fn reading_a_missing_layout_aborts() {
        System::new().layout(StructId(3));
    }

    #[test]
    #[should_panic(expected = "symbol 'x' is already defined")]
    fn symbols_cannot_be_defined_twice() {
        let mut table = SymbolTable::default();
        table.define("x", Type::U8, None);
        table.define("x", Type::U8, Some(Register(0)));
    }

    #[test]
    fn live_registers_skip_missing_values() {
        let mut scratch = Scratch {
            return_slot: Some(Register(0)),
            ..Scratch::default()
        };
        scratch.symbols.define("a", Type::U8, Some(Register(1)));
        scratch.symbols.define("b", Type::U8, None);
        scratch.symbols.define("c", Type::U8, Some(Register(2)));
        scratch.stack.push(Register(3));
        assert_eq!(
            vec![Register(0), Register(1), Register(2), Register(3)],
            scratch.live_registers()
        );

        let shifted = scratch.map_registers(|r| Register(r.0 + 10));
        assert_eq!(
            vec![Register(10), Register(11), Register(12), Register(13)],
            shifted.live_registers()
        );
        assert_eq!(None, shifted.symbols.get("b").and_then(|s| s.register));
    }

    #[test]
    fn branch_terminators_expose_every_register() {
        let mut term = Terminator::Branch {
            condition: Register(0),
            then: Edge {
                target: Register(1),
                arguments: vec![Register(2)],
            },
            otherwise: Edge {
                target: Register(3),
                arguments: vec![],
            },
        };
        let regs: Vec<_> = term.registers_mut().into_iter().map(|r| r.0).collect();
        assert_eq!(vec![0, 1, 2, 3], regs);
        assert_eq!(2, term.edges().len());
    }
}

//! Human-readable listing of a block graph.
//!
//! ```text
//! S0 { func(S0) }
//! B0(S0 $0, u8 $1):
//!   $2 bool := $1 cmp lt $1
//!   $3 func(S0) := load $0->0
//!   goto $3(S0 $0)
//! ```

use std::fmt::{self, Display, Formatter};

use crate::il::{
    Block, BlockId, Edge, Instruction, Register, StructId, StructLayout, System, Terminator,
};

pub struct Listing<T> {
    lines: Vec<T>,
}
impl<T> Listing<T> {
    pub fn new() -> Self {
        Self { lines: vec![] }
    }

    pub fn push(&mut self, line: T) {
        self.lines.push(line);
    }

    pub fn iter_lines(&self) -> impl Iterator<Item = &T> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
impl<T> Default for Listing<T> {
    fn default() -> Self {
        Self::new()
    }
}
impl<T: Display> Display for Listing<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// A single line of a system listing.
pub enum Line<'s> {
    Struct(StructId, &'s StructLayout),
    Header(&'s Block),
    Instruction(Register, &'s Instruction),
    Terminator(&'s Block, &'s Terminator),
    Exit,
}
impl Display for Line<'_> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Line::Struct(id, layout) => {
                write!(f, "{} {{ ", id)?;
                write_list(f, layout.fields.iter())?;
                f.write_str(" }")
            }
            Line::Header(block) => {
                write!(f, "{}(", block.id)?;
                let params = block
                    .parameters
                    .iter()
                    .enumerate()
                    .map(|(i, p)| format!("{} {}", p.ty, Register(i)));
                write_list(f, params)?;
                f.write_str("):")
            }
            Line::Instruction(_, instr) if instr.ty.is_void() => {
                write!(f, "  {}", instr.operation)
            }
            Line::Instruction(register, instr) => {
                write!(f, "  {} {} := {}", register, instr.ty, instr.operation)
            }
            Line::Terminator(block, Terminator::Goto(edge)) => {
                f.write_str("  goto ")?;
                write_edge(f, block, edge)
            }
            Line::Terminator(
                block,
                Terminator::Branch {
                    condition,
                    then,
                    otherwise,
                },
            ) => {
                write!(f, "  branch {} -> T ", condition)?;
                write_edge(f, block, then)?;
                f.write_str(" F ")?;
                write_edge(f, block, otherwise)
            }
            Line::Exit => f.write_str("  exit"),
        }
    }
}

fn write_list<T: Display>(f: &mut Formatter, items: impl Iterator<Item = T>) -> fmt::Result {
    for (i, item) in items.enumerate() {
        if i != 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn write_edge(f: &mut Formatter, block: &Block, edge: &Edge) -> fmt::Result {
    write!(f, "{}(", edge.target)?;
    let arguments = edge
        .arguments
        .iter()
        .map(|arg| format!("{} {}", block.type_of(*arg), arg));
    write_list(f, arguments)?;
    f.write_str(")")
}

/// List every struct, then every block with its instructions and terminator.
pub fn list(system: &System) -> Listing<Line> {
    let mut listing = Listing::new();
    for (i, layout) in system.structs.iter().enumerate() {
        listing.push(Line::Struct(StructId(i), layout));
    }
    for (_, block) in system.iter_blocks() {
        list_block(&mut listing, block);
    }
    listing
}

/// List a single block.
pub fn list_block<'s>(listing: &mut Listing<Line<'s>>, block: &'s Block) {
    listing.push(Line::Header(block));
    for (i, instr) in block.instructions.iter().enumerate() {
        listing.push(Line::Instruction(
            Register(block.parameters.len() + i),
            instr,
        ));
    }
    match &block.terminator {
        Some(terminator) => listing.push(Line::Terminator(block, terminator)),
        None if block.is_final => listing.push(Line::Exit),
        None => (),
    }
}

impl Display for System {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        list(self).fmt(f)
    }
}

/// The listing of one block, as individual lines.
pub fn block_lines(system: &System, id: BlockId) -> Vec<String> {
    let mut listing = Listing::new();
    list_block(&mut listing, system.block(id));
    listing.iter_lines().map(ToString::to_string).collect()
}

#[cfg(test)]
mod tests {
    use crate::{
        ast::{build::*, Block, Literal, Program, TypeSpec},
        il::{generate, Instruction, Operation, Parameter, Type},
    };

    use super::*;

    #[test]
    fn structs_list_their_field_types() {
        let system = System {
            blocks: vec![],
            structs: vec![StructLayout {
                fields: vec![Type::BlockRef(vec![Type::Object(StructId(0))]), Type::Str],
                origin: crate::il::LayoutOrigin::Context,
            }],
        };
        assert_eq!("S0 { func(S0), string }\n", system.to_string());
    }

    #[test]
    fn stores_omit_their_result() {
        let mut block = crate::il::Block::new(
            BlockId(0),
            vec![
                Parameter {
                    ty: Type::Object(StructId(1)),
                    name: None,
                },
                Parameter {
                    ty: Type::U8,
                    name: Some("x".to_string()),
                },
            ],
        );
        block.instructions.push(Instruction::new(
            Operation::SetField {
                object: Register(0),
                field: 1,
                value: Register(1),
            },
            Type::Void,
        ));
        block.instructions.push(Instruction::new(
            Operation::Literal(Literal::Str("hi".to_string())),
            Type::Str,
        ));
        block.is_final = true;
        let system = System {
            blocks: vec![block],
            structs: vec![],
        };
        assert_eq!(
            vec![
                "B0(S1 $0, u8 $1):",
                "  store $0->1 = $1",
                "  $3 string := string \"hi\"",
                "  exit",
            ],
            block_lines(&system, BlockId(0))
        );
    }

    #[test]
    fn branches_list_both_edges() {
        let program = Program::new(Block::new(vec![
            define(TypeSpec::U8, "x", Some(u8_lit(7))),
            if_(bool_lit(true), None, None),
        ]));
        let generated = generate(&program);
        assert_eq!(
            vec![
                "B0():",
                "  $0 u8 := 7",
                "  $1 bool := true",
                "  $2 func(u8) := ref B1",
                "  $3 func(u8) := ref B2",
                "  branch $1 -> T $2(u8 $0) F $3(u8 $0)",
            ],
            block_lines(&generated.system, generated.entry)
        );
    }
}

//! Translation of an analyzed program into a block graph.
mod call;
mod expression;
mod statement;

use std::{collections::BTreeMap, mem};

use crate::{
    ast::{self, ClassId, FunctionId, Program, TypeSpec},
    error::{internal_error, Diagnostic, InternalError},
    prelude::*,
};

use super::{BlockId, Builder, Parameter, Register, StructId, System, Type};

/// The entry point of a function, and the return struct its callers must pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionEntry {
    pub name: String,
    pub entry: BlockId,
    pub return_struct: StructId,
}

/// The result of generating code for a program.
#[derive(Debug)]
pub struct Generated {
    pub system: System,
    /// The block the program starts in.
    pub entry: BlockId,
    pub functions: BTreeMap<FunctionId, FunctionEntry>,
    pub classes: BTreeMap<ClassId, StructId>,
    /// Warnings reported during generation.
    pub diagnostics: Vec<Diagnostic>,
}
impl Generated {
    /// The program entry, followed by the entry of every function.
    pub fn entries(&self) -> Vec<BlockId> {
        std::iter::once(self.entry)
            .chain(self.functions.values().map(|f| f.entry))
            .collect()
    }
}

/// Generate the block graph for a program.
///
/// `S0` is always the return struct of `void` functions and `B0` is always the block the
/// program starts in.
pub fn generate(program: &Program) -> Generated {
    let mut generator = Generator::new();
    generator.builder.return_struct(&Type::Void);
    let entry = generator.builder.create_block(vec![]);

    if let Some(end) = generator.generate_block(entry, &program.body) {
        generator.builder.mark_final(end);
    }

    info!(
        "Generated {} block(s) and {} struct(s)",
        generator.builder.system.blocks.len(),
        generator.builder.system.structs.len()
    );

    Generated {
        system: generator.builder.system,
        entry,
        functions: generator.functions,
        classes: generator.classes,
        diagnostics: generator.builder.diagnostics,
    }
}

/// The function currently being generated.
struct FunctionFrame {
    name: String,
    result: Type,
}

/// Where `break` and `continue` go.
enum LoopTargets {
    /// Both targets exist before the body is generated.
    PreCondition { condition: BlockId, post: BlockId },
    /// The condition is generated after the body, so jumps are queued until then.
    PostCondition {
        breaks: Vec<BlockId>,
        continues: Vec<BlockId>,
    },
}

struct LoopFrame {
    label: Option<String>,
    targets: LoopTargets,
}

struct Generator {
    builder: Builder,
    functions: BTreeMap<FunctionId, FunctionEntry>,
    classes: BTreeMap<ClassId, StructId>,
    loops: Vec<LoopFrame>,
    frames: Vec<FunctionFrame>,
}
impl Generator {
    fn new() -> Self {
        Self {
            builder: Builder::new(),
            functions: BTreeMap::new(),
            classes: BTreeMap::new(),
            loops: vec![],
            frames: vec![],
        }
    }

    fn class(&self, id: ClassId) -> StructId {
        match self.classes.get(&id) {
            Some(layout) => *layout,
            None => internal_error(InternalError::UnknownClass(id)),
        }
    }

    fn function(&self, id: FunctionId) -> &FunctionEntry {
        match self.functions.get(&id) {
            Some(entry) => entry,
            None => internal_error(InternalError::UnknownFunction(id)),
        }
    }

    fn lower_type(&mut self, spec: &TypeSpec) -> Type {
        match spec {
            TypeSpec::Void => Type::Void,
            TypeSpec::Bool => Type::Bool,
            TypeSpec::U8 => Type::U8,
            TypeSpec::U16 => Type::U16,
            TypeSpec::U32 => Type::U32,
            TypeSpec::U64 => Type::U64,
            TypeSpec::S8 => Type::S8,
            TypeSpec::S16 => Type::S16,
            TypeSpec::S32 => Type::S32,
            TypeSpec::S64 => Type::S64,
            TypeSpec::F32 => Type::F32,
            TypeSpec::F64 => Type::F64,
            TypeSpec::Str => Type::Str,
            TypeSpec::Object(class) => Type::Object(self.class(*class)),
            TypeSpec::Array(inner) => Type::Array(Box::new(self.lower_type(inner))),
            TypeSpec::Function(result, arguments) => {
                let result = self.lower_type(result);
                let mut params = vec![Type::Object(self.builder.return_struct(&result))];
                for argument in arguments {
                    params.push(self.lower_type(argument));
                }
                Type::BlockRef(params)
            }
        }
    }

    /// Make the classes and functions of a block known before any of its statements, so
    /// they can refer to each other in any order.
    fn hoist(&mut self, block: &ast::Block) {
        for class in &block.classes {
            let layout = self.builder.declare_class(&class.name);
            self.classes.insert(class.id, layout);
        }
        for function in &block.functions {
            self.declare_function(function);
        }
        for class in &block.classes {
            let fields = class
                .fields
                .iter()
                .map(|field| self.lower_type(&field.ty))
                .collect();
            let layout = self.class(class.id);
            self.builder.define_class(layout, fields);
        }
        for function in &block.functions {
            self.generate_function(function);
        }
    }

    /// Create the entry block of a function. Its first parameter is the context to return
    /// through, followed by the arguments.
    fn declare_function(&mut self, function: &ast::Function) {
        let result = self.lower_type(&function.return_type);
        let return_struct = self.builder.return_struct(&result);

        let mut parameters = vec![Parameter {
            ty: Type::Object(return_struct),
            name: None,
        }];
        for argument in &function.arguments {
            parameters.push(Parameter {
                ty: self.lower_type(&argument.ty),
                name: Some(argument.name.clone()),
            });
        }

        let entry = self.builder.create_block(parameters.clone());
        let scratch = self.builder.scratch_mut(entry);
        scratch.return_slot = Some(Register(0));
        for (i, param) in parameters.into_iter().enumerate().skip(1) {
            if let Some(name) = param.name {
                scratch.symbols.define(&name, param.ty, Some(Register(i)));
            }
        }

        debug!("Function '{}' enters at {entry}", function.name);
        self.functions.insert(
            function.id,
            FunctionEntry {
                name: function.name.clone(),
                entry,
                return_struct,
            },
        );
    }

    fn generate_function(&mut self, function: &ast::Function) {
        let entry = self.function(function.id).entry;
        let result = self.lower_type(&function.return_type);

        let enclosing_loops = mem::take(&mut self.loops);
        self.frames.push(FunctionFrame {
            name: function.name.clone(),
            result,
        });

        if let Some(end) = self.generate_block(entry, &function.body) {
            if function.return_type.is_void() {
                self.generate_return(end, None);
            } else {
                internal_error(InternalError::MissingReturn(function.name.clone()));
            }
        }

        self.frames.pop();
        self.loops = enclosing_loops;
    }
}

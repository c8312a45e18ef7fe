//! Calls are tail jumps: the live state of the caller is packed into a heap context whose
//! first field refers to the block the call resumes in.
use crate::{
    ast::{CastOp, Expr, TypeSpec},
    error::{internal_error, InternalError},
    il::{BlockId, Edge, Instruction, Operation, Parameter, Register, StructId, Type},
    prelude::*,
};

use super::Generator;

impl Generator {
    /// Returns the block the call resumes in. For a call producing a value, the result is
    /// its last register.
    pub(super) fn generate_call(
        &mut self,
        b: BlockId,
        callee: &Expr,
        arguments: &[Expr],
        result: &TypeSpec,
    ) -> BlockId {
        let b = self.generate_stacked(b, std::iter::once(callee).chain(arguments.iter()));
        let arguments = self.builder.pop_many(b, arguments.len());
        let callee = self.builder.pop_stack(b);

        let callee_ty = self.builder.type_of(b, callee);
        let return_struct = match callee_ty
            .as_block_ref()
            .and_then(|params| params.first())
            .and_then(Type::as_object)
        {
            Some(layout) => layout,
            None => internal_error(InternalError::NotCallable(callee_ty.clone())),
        };

        let result = self.lower_type(result);
        let mut parameters = vec![Parameter {
            ty: Type::Object(return_struct),
            name: None,
        }];
        if !result.is_void() {
            parameters.push(Parameter {
                ty: result.clone(),
                name: None,
            });
        }
        let resume = self.builder.create_block(parameters);

        let context = self.package_context(b, resume, return_struct);
        let mut edge_arguments = vec![context];
        edge_arguments.extend(arguments);
        self.builder.goto(
            b,
            Edge {
                target: callee,
                arguments: edge_arguments,
            },
        );

        if !result.is_void() && self.builder.last_register(resume) != Register(1) {
            self.builder.mirror(resume, Register(1));
        }
        resume
    }

    /// Build the context passed to the callee, and unpack it again in `resume`. Returns the
    /// context, typed as the return struct of the callee.
    ///
    /// Without any live state the return struct itself is the context. Otherwise a new
    /// layout holds the continuation, followed by the return slot, the existing variables
    /// and the operand stack of `b`.
    fn package_context(
        &mut self,
        b: BlockId,
        resume: BlockId,
        return_struct: StructId,
    ) -> Register {
        let live = self.builder.scratch(b).clone();
        let captured = live.live_registers();

        if captured.is_empty() {
            let object = self.builder.emit(
                b,
                Instruction::new(Operation::New(return_struct), Type::Object(return_struct)),
            );
            self.store_continuation(b, object, resume);
            *self.builder.scratch_mut(resume) = live;
            return object;
        }

        let continuation = Type::BlockRef(self.builder.system.block(resume).parameter_types());
        let mut fields = vec![continuation];
        fields.extend(captured.iter().map(|r| self.builder.type_of(b, *r)));
        let layout = self.builder.context_struct(fields.clone());
        trace!("{b} captures {} value(s) into {layout}", captured.len());

        let object = self.builder.emit(
            b,
            Instruction::new(Operation::New(layout), Type::Object(layout)),
        );
        self.store_continuation(b, object, resume);
        for (i, value) in captured.iter().enumerate() {
            self.builder.emit(
                b,
                Instruction::new(
                    Operation::SetField {
                        object,
                        field: i + 1,
                        value: *value,
                    },
                    Type::Void,
                ),
            );
        }
        let context = self.builder.emit(
            b,
            Instruction::new(
                Operation::Cast(CastOp::Upcast, object),
                Type::Object(return_struct),
            ),
        );

        let resumed = self.builder.emit(
            resume,
            Instruction::new(
                Operation::Cast(CastOp::Downcast, Register(0)),
                Type::Object(layout),
            ),
        );
        let unpacked: Vec<_> = fields
            .into_iter()
            .enumerate()
            .skip(1)
            .map(|(field, ty)| {
                self.builder.emit(
                    resume,
                    Instruction::new(
                        Operation::GetField {
                            object: resumed,
                            field,
                        },
                        ty,
                    ),
                )
            })
            .collect();

        let mut next = unpacked.into_iter();
        let scratch = live.map_registers(|captured| match next.next() {
            Some(register) => register,
            None => internal_error(InternalError::NoSuchRegister(resume, captured)),
        });
        *self.builder.scratch_mut(resume) = scratch;
        context
    }

    fn store_continuation(&mut self, b: BlockId, object: Register, resume: BlockId) {
        let continuation = self.builder.emit_blockref(b, resume);
        self.builder.emit(
            b,
            Instruction::new(
                Operation::SetField {
                    object,
                    field: 0,
                    value: continuation,
                },
                Type::Void,
            ),
        );
    }
}

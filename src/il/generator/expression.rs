use crate::{
    ast::{
        BinaryOp, CastOp, ClassId, CompoundOp, Expr, ExprKind, Literal, NumericOp, PostfixOp,
        TypeSpec,
    },
    error::{internal_error, InternalError},
    il::{BlockId, Instruction, LinearOp, Operation, Register, Type},
};

use super::Generator;

/// How an assignable location is updated.
enum Update<'e> {
    Compound(CompoundOp, &'e Expr),
    Step(PostfixOp),
}

/// An assignable location. The registers addressing fields and elements are kept on the
/// operand stack while the new value is computed.
enum Place {
    Symbol(String),
    Field(usize),
    Index,
}

impl Generator {
    /// Generate an expression into `b`. Returns the block that holds the result as its last
    /// register.
    pub(super) fn generate_expression(&mut self, b: BlockId, expr: &Expr) -> BlockId {
        match &expr.kind {
            ExprKind::Literal(lit) => {
                let ty = self.lower_type(&expr.ty);
                self.builder
                    .emit(b, Instruction::new(Operation::Literal(lit.clone()), ty));
                b
            }
            ExprKind::Symbol(name) => {
                let register = self.read_symbol(b, name);
                self.builder.mirror(b, register);
                b
            }
            ExprKind::Function(id) => {
                let entry = self.function(*id).entry;
                self.builder.emit_blockref(b, entry);
                b
            }
            ExprKind::Unary(op, operand) => {
                self.generate_linear(b, LinearOp::Unary(*op), &[operand.as_ref()], &expr.ty)
            }
            ExprKind::Binary(op, lhs, rhs) => self.generate_linear(
                b,
                LinearOp::Binary(*op),
                &[lhs.as_ref(), rhs.as_ref()],
                &expr.ty,
            ),
            ExprKind::Logic(op, ..) => internal_error(InternalError::UnloweredLogic(*op)),
            ExprKind::Cast(op, operand) => self.generate_cast(b, *op, operand, &expr.ty),
            ExprKind::GetField(object, field) => {
                let b = self.generate_expression(b, object);
                let object = self.builder.last_register(b);
                self.expect_object(b, object);
                let ty = self.lower_type(&expr.ty);
                self.builder.emit(
                    b,
                    Instruction::new(
                        Operation::GetField {
                            object,
                            field: *field,
                        },
                        ty,
                    ),
                );
                b
            }
            ExprKind::Assign(target, value) => self.generate_assign(b, target, value),
            ExprKind::CompoundAssign(op, target, value) => {
                self.generate_update(b, target, Update::Compound(*op, value), &expr.ty)
            }
            ExprKind::Postfix(op, target) => {
                self.generate_update(b, target, Update::Step(*op), &expr.ty)
            }
            ExprKind::Ternary(condition, first, second) => {
                let b = self.generate_expression(b, condition);
                let condition = self.builder.last_register(b);
                let (then, otherwise) = self.builder.branch_into(b, condition);

                let then = self.generate_expression(then, first);
                self.builder.push_last(then);
                let otherwise = self.generate_expression(otherwise, second);
                self.builder.push_last(otherwise);

                let merged = self.builder.merge_blocks(b, then, otherwise);
                let result = self.builder.pop_stack(merged);
                self.builder.mirror(merged, result);
                merged
            }
            ExprKind::Call(callee, arguments) => {
                self.generate_call(b, callee, arguments, &expr.ty)
            }
            ExprKind::New(class, arguments) => self.generate_new(b, *class, arguments),
            ExprKind::NewArray(length) => {
                let b = self.generate_expression(b, length);
                let length = self.builder.last_register(b);
                let ty = self.lower_type(&expr.ty);
                self.builder
                    .emit(b, Instruction::new(Operation::NewArray(length), ty));
                b
            }
            ExprKind::Native(name, arguments) => {
                let b = self.generate_stacked(b, arguments.iter());
                let arguments = self.builder.pop_many(b, arguments.len());
                let ty = self.lower_type(&expr.ty);
                self.builder.emit(
                    b,
                    Instruction::new(
                        Operation::Native {
                            name: name.clone(),
                            arguments,
                        },
                        ty,
                    ),
                );
                b
            }
        }
    }

    /// Generate each expression in turn, pushing every result onto the operand stack.
    pub(super) fn generate_stacked<'e>(
        &mut self,
        mut b: BlockId,
        exprs: impl Iterator<Item = &'e Expr>,
    ) -> BlockId {
        for expr in exprs {
            b = self.generate_expression(b, expr);
            self.builder.push_last(b);
        }
        b
    }

    fn generate_linear(
        &mut self,
        b: BlockId,
        op: LinearOp,
        operands: &[&Expr],
        ty: &TypeSpec,
    ) -> BlockId {
        let b = self.generate_stacked(b, operands.iter().copied());
        let registers = self.builder.pop_many(b, operands.len());
        let ty = self.lower_type(ty);
        self.builder
            .emit(b, Instruction::new(Operation::linear(op, &registers), ty));
        b
    }

    fn generate_cast(
        &mut self,
        b: BlockId,
        op: CastOp,
        operand: &Expr,
        ty: &TypeSpec,
    ) -> BlockId {
        if matches!(op, CastOp::Upcast | CastOp::Downcast) {
            internal_error(InternalError::ObjectCast(op));
        }
        let b = self.generate_expression(b, operand);
        let operand = self.builder.last_register(b);
        let ty = self.lower_type(ty);
        self.builder
            .emit(b, Instruction::new(Operation::Cast(op, operand), ty));
        b
    }

    /// The register a variable is bound to in `b`.
    fn read_symbol(&self, b: BlockId, name: &str) -> Register {
        match self.builder.scratch(b).symbols.get(name) {
            Some(symbol) => match symbol.register {
                Some(register) => register,
                None => internal_error(InternalError::UninitializedSymbol(name.to_string())),
            },
            None => internal_error(InternalError::UnknownSymbol(name.to_string())),
        }
    }

    fn expect_object(&self, b: BlockId, register: Register) {
        let ty = self.builder.type_of(b, register);
        if ty.as_object().is_none() {
            internal_error(InternalError::NotAnObject(ty));
        }
    }

    /// Assignment yields the assigned value.
    fn generate_assign(&mut self, b: BlockId, target: &Expr, value: &Expr) -> BlockId {
        match &target.kind {
            ExprKind::Symbol(name) => {
                let b = self.generate_expression(b, value);
                let register = self.builder.last_register(b);
                self.builder.scratch_mut(b).symbols.rebind(name, register);
                b
            }
            ExprKind::GetField(object, field) => {
                let b = self.generate_expression(b, object);
                self.expect_object(b, self.builder.last_register(b));
                self.builder.push_last(b);
                let b = self.generate_expression(b, value);
                let value = self.builder.last_register(b);
                let object = self.builder.pop_stack(b);
                self.emit_store(
                    b,
                    Operation::SetField {
                        object,
                        field: *field,
                        value,
                    },
                );
                self.builder.mirror(b, value);
                b
            }
            ExprKind::Binary(BinaryOp::GetIndex, array, index) => {
                let b = self.generate_stacked(b, [array.as_ref(), index.as_ref()].into_iter());
                let b = self.generate_expression(b, value);
                let value = self.builder.last_register(b);
                let addressed = self.builder.pop_many(b, 2);
                self.emit_store(
                    b,
                    Operation::SetIndex {
                        array: addressed[0],
                        index: addressed[1],
                        value,
                    },
                );
                self.builder.mirror(b, value);
                b
            }
            _ => internal_error(InternalError::InvalidAssignTarget),
        }
    }

    /// Compound assignment yields the new value, postfix steps yield the old one.
    fn generate_update(
        &mut self,
        b: BlockId,
        target: &Expr,
        update: Update,
        ty: &TypeSpec,
    ) -> BlockId {
        let ty = self.lower_type(ty);
        let (mut b, place) = self.generate_place(b, target, &ty);
        self.builder.push_last(b);

        let (op, yields_old) = match update {
            Update::Compound(op, value) => {
                b = self.generate_expression(b, value);
                (BinaryOp::from(op), false)
            }
            Update::Step(op) => {
                self.generate_one(b, &ty);
                let op = match op {
                    PostfixOp::Increment => NumericOp::Add,
                    PostfixOp::Decrement => NumericOp::Sub,
                };
                (BinaryOp::Numeric(op), true)
            }
        };
        self.builder.push_last(b);

        let operands = self.builder.pop_many(b, 2);
        let old = operands[0];
        let new = self.builder.emit(
            b,
            Instruction::new(
                Operation::linear(LinearOp::Binary(op), &operands),
                ty,
            ),
        );
        self.store(b, place, new);
        self.builder.mirror(b, if yields_old { old } else { new });
        b
    }

    /// Read the current value of an assignable location, leaving it as the last register.
    fn generate_place(&mut self, b: BlockId, target: &Expr, ty: &Type) -> (BlockId, Place) {
        match &target.kind {
            ExprKind::Symbol(name) => {
                let register = self.read_symbol(b, name);
                self.builder.mirror(b, register);
                (b, Place::Symbol(name.clone()))
            }
            ExprKind::GetField(object, field) => {
                let b = self.generate_expression(b, object);
                self.expect_object(b, self.builder.last_register(b));
                self.builder.push_last(b);
                let object = self.builder.peek_stack(b, 0);
                self.builder.emit(
                    b,
                    Instruction::new(
                        Operation::GetField {
                            object,
                            field: *field,
                        },
                        ty.clone(),
                    ),
                );
                (b, Place::Field(*field))
            }
            ExprKind::Binary(BinaryOp::GetIndex, array, index) => {
                let b = self.generate_stacked(b, [array.as_ref(), index.as_ref()].into_iter());
                let array = self.builder.peek_stack(b, 1);
                let index = self.builder.peek_stack(b, 0);
                self.builder.emit(
                    b,
                    Instruction::new(Operation::GetIndex(array, index), ty.clone()),
                );
                (b, Place::Index)
            }
            _ => internal_error(InternalError::InvalidAssignTarget),
        }
    }

    fn store(&mut self, b: BlockId, place: Place, value: Register) {
        match place {
            Place::Symbol(name) => self.builder.scratch_mut(b).symbols.rebind(&name, value),
            Place::Field(field) => {
                let object = self.builder.pop_stack(b);
                self.emit_store(
                    b,
                    Operation::SetField {
                        object,
                        field,
                        value,
                    },
                );
            }
            Place::Index => {
                let addressed = self.builder.pop_many(b, 2);
                self.emit_store(
                    b,
                    Operation::SetIndex {
                        array: addressed[0],
                        index: addressed[1],
                        value,
                    },
                );
            }
        }
    }

    fn emit_store(&mut self, b: BlockId, operation: Operation) -> Register {
        self.builder
            .emit(b, Instruction::new(operation, Type::Void))
    }

    /// The constant `1` in the type `ty`, made from a `u8` literal.
    fn generate_one(&mut self, b: BlockId, ty: &Type) {
        let one = self.builder.emit(
            b,
            Instruction::new(Operation::Literal(Literal::U8(1)), Type::U8),
        );
        let cast = match ty {
            Type::U8 => return,
            Type::U16 | Type::U32 | Type::U64 | Type::S16 | Type::S32 | Type::S64 => {
                CastOp::ZeroExtend
            }
            Type::S8 => CastOp::Reinterpret,
            Type::F32 | Type::F64 => CastOp::UnsignedToFloat,
            other => internal_error(InternalError::NotNumeric(other.clone())),
        };
        self.builder
            .emit(b, Instruction::new(Operation::Cast(cast, one), ty.clone()));
    }

    /// Allocate an object and store one argument into each of its fields.
    fn generate_new(&mut self, b: BlockId, class: ClassId, arguments: &[Expr]) -> BlockId {
        let layout = self.class(class);
        let expected = self.builder.system.layout(layout).fields.len();
        if expected != arguments.len() {
            internal_error(InternalError::ConstructorArity {
                class: layout.to_string(),
                expected,
                found: arguments.len(),
            });
        }

        let b = self.generate_stacked(b, arguments.iter());
        let values = self.builder.pop_many(b, arguments.len());
        let object = self.builder.emit(
            b,
            Instruction::new(Operation::New(layout), Type::Object(layout)),
        );
        for (field, value) in values.into_iter().enumerate() {
            self.emit_store(
                b,
                Operation::SetField {
                    object,
                    field,
                    value,
                },
            );
        }
        self.builder.mirror(b, object);
        b
    }
}

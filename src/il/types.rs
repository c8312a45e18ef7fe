//! Types of IR values.
use std::fmt::{self, Display, Formatter};

use super::StructId;

/// The type of a register or struct field.
///
/// Unlike [`crate::ast::TypeSpec`], objects refer to struct layouts and functions are
/// block references, so every type here is directly meaningful to a backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    Bool,
    U8,
    U16,
    U32,
    U64,
    S8,
    S16,
    S32,
    S64,
    F32,
    F64,
    Str,
    Object(StructId),
    Array(Box<Type>),
    /// A reference to a block accepting parameters of the given types.
    BlockRef(Vec<Type>),
}
impl Type {
    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn as_object(&self) -> Option<StructId> {
        match self {
            Type::Object(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_block_ref(&self) -> Option<&[Type]> {
        match self {
            Type::BlockRef(params) => Some(params),
            _ => None,
        }
    }
}
impl Display for Type {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Type::Void => f.write_str("void"),
            Type::Bool => f.write_str("bool"),
            Type::U8 => f.write_str("u8"),
            Type::U16 => f.write_str("u16"),
            Type::U32 => f.write_str("u32"),
            Type::U64 => f.write_str("u64"),
            Type::S8 => f.write_str("s8"),
            Type::S16 => f.write_str("s16"),
            Type::S32 => f.write_str("s32"),
            Type::S64 => f.write_str("s64"),
            Type::F32 => f.write_str("fp32"),
            Type::F64 => f.write_str("fp64"),
            Type::Str => f.write_str("string"),
            Type::Object(id) => write!(f, "{}", id),
            Type::Array(inner) => write!(f, "[{}]", inner),
            Type::BlockRef(params) => {
                f.write_str("func(")?;
                for (i, param) in params.iter().enumerate() {
                    if i != 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", param)?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_ref_types_list_their_parameters() {
        let ty = Type::BlockRef(vec![Type::Object(StructId(0)), Type::U8]);
        assert_eq!("func(S0, u8)", ty.to_string());
        assert_eq!("func()", Type::BlockRef(vec![]).to_string());
    }

    #[test]
    fn nested_arrays_are_bracketed() {
        let ty = Type::Array(Box::new(Type::Array(Box::new(Type::F64))));
        assert_eq!("[[fp64]]", ty.to_string());
    }
}

//! Resolved source-level types, as assigned by semantic analysis.
use std::fmt::{self, Display, Formatter};

/// Identifies a class declaration. Assigned by analysis; unique per compilation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub usize);

/// Identifies a function declaration. Assigned by analysis; unique per compilation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub usize);

/// A resolved type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSpec {
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
    /// An instance of a user-defined class. `null` literals also carry this type.
    Object(ClassId),
    Array(Box<TypeSpec>),
    /// A function, given by its return type and argument types.
    Function(Box<TypeSpec>, Vec<TypeSpec>),
}
impl TypeSpec {
    pub fn is_void(&self) -> bool {
        matches!(self, TypeSpec::Void)
    }

    pub fn function(return_type: TypeSpec, arguments: Vec<TypeSpec>) -> Self {
        TypeSpec::Function(Box::new(return_type), arguments)
    }
}
impl Display for TypeSpec {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            TypeSpec::Void => f.write_str("void"),
            TypeSpec::Bool => f.write_str("bool"),
            TypeSpec::U8 => f.write_str("u8"),
            TypeSpec::U16 => f.write_str("u16"),
            TypeSpec::U32 => f.write_str("u32"),
            TypeSpec::U64 => f.write_str("u64"),
            TypeSpec::S8 => f.write_str("s8"),
            TypeSpec::S16 => f.write_str("s16"),
            TypeSpec::S32 => f.write_str("s32"),
            TypeSpec::S64 => f.write_str("s64"),
            TypeSpec::F32 => f.write_str("f32"),
            TypeSpec::F64 => f.write_str("f64"),
            TypeSpec::Str => f.write_str("string"),
            TypeSpec::Object(class) => write!(f, "class#{}", class.0),
            TypeSpec::Array(inner) => write!(f, "{}[]", inner),
            TypeSpec::Function(ret, args) => {
                write!(f, "{}(", ret)?;
                for (i, arg) in args.iter().enumerate() {
                    if i != 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
        }
    }
}

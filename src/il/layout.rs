//! Registry of heap layouts: classes, call contexts and return structs.
use crate::prelude::*;

use super::{Builder, LayoutOrigin, StructId, StructLayout, Type};

impl Builder {
    /// The return struct for functions producing `result`: `{ func(S, result) }`, or
    /// `{ func(S) }` for `void`. Created once per result type.
    pub fn return_struct(&mut self, result: &Type) -> StructId {
        if let Some(id) = self.return_structs.get(result) {
            return *id;
        }

        let id = StructId(self.system.structs.len());
        let mut continuation = vec![Type::Object(id)];
        if !result.is_void() {
            continuation.push(result.clone());
        }
        self.push_layout(
            id,
            StructLayout {
                fields: vec![Type::BlockRef(continuation)],
                origin: LayoutOrigin::Return,
            },
        );
        self.return_structs.insert(result.clone(), id);
        id
    }

    /// Reserve a layout for a class, so it can be referenced before its fields are known.
    pub fn declare_class(&mut self, name: &str) -> StructId {
        let id = StructId(self.system.structs.len());
        self.push_layout(
            id,
            StructLayout {
                fields: vec![],
                origin: LayoutOrigin::Class(name.to_string()),
            },
        );
        id
    }

    pub fn define_class(&mut self, id: StructId, fields: Vec<Type>) {
        trace!("{id} has fields {fields:?}");
        self.system.layout_mut(id).fields = fields;
    }

    /// A fresh layout capturing the live state of a call site. Never shared.
    pub fn context_struct(&mut self, fields: Vec<Type>) -> StructId {
        let id = StructId(self.system.structs.len());
        self.push_layout(
            id,
            StructLayout {
                fields,
                origin: LayoutOrigin::Context,
            },
        );
        id
    }

    fn push_layout(&mut self, id: StructId, layout: StructLayout) {
        debug!("Allocate {id} for {:?}", layout.origin);
        self.system.structs.push(layout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn return_structs_are_shared_by_result_type() {
        let mut builder = Builder::new();
        let void = builder.return_struct(&Type::Void);
        let byte = builder.return_struct(&Type::U8);
        assert_eq!(byte, builder.return_struct(&Type::U8));
        assert_eq!(void, builder.return_struct(&Type::Void));
        assert_ne!(void, byte);
        assert_eq!(2, builder.system.structs.len());
    }

    #[test]
    fn return_structs_refer_to_themselves() {
        let mut builder = Builder::new();
        builder.declare_class("Point");
        let id = builder.return_struct(&Type::F64);
        assert_eq!(
            vec![Type::BlockRef(vec![Type::Object(id), Type::F64])],
            builder.system.layout(id).fields
        );
    }

    #[test]
    fn contexts_are_never_shared() {
        let mut builder = Builder::new();
        let fields = vec![Type::BlockRef(vec![]), Type::U8];
        let first = builder.context_struct(fields.clone());
        let second = builder.context_struct(fields);
        assert_ne!(first, second);
    }

    #[test]
    fn classes_can_refer_to_themselves() {
        let mut builder = Builder::new();
        let node = builder.declare_class("Node");
        builder.define_class(node, vec![Type::U32, Type::Object(node)]);
        let layout = builder.system.layout(node);
        assert_eq!(LayoutOrigin::Class("Node".to_string()), layout.origin);
        assert_eq!(vec![Type::U32, Type::Object(node)], layout.fields);
    }

    #[test]
    #[should_panic(expected = "no such struct: S1")]
    fn undeclared_classes_cannot_be_defined() {
        let mut builder = Builder::new();
        builder.declare_class("Point");
        builder.define_class(StructId(1), vec![Type::U8]);
    }
}

use crate::Kind;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeId(pub u32);

#[derive(Debug)]
pub struct TypeData {
    pub name: String,
    pub kind: TypeKind,
    pub super_type: Option<TypeId>,
    pub interfaces: Vec<TypeId>,
    pub is_loaded: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TypeKind {
    Instance,
    Interface,
    Array(Kind),
}

impl TypeData {
    pub fn is_instance_class(&self) -> bool {
        match self.kind {
            TypeKind::Instance => true,
            _ => false,
        }
    }

    pub fn is_interface(&self) -> bool {
        match self.kind {
            TypeKind::Interface => true,
            _ => false,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldId(pub u32);

#[derive(Debug)]
pub struct FieldData {
    pub name: String,
    pub holder: TypeId,
    pub kind: Kind,
    pub offset: i32,
    pub is_static: bool,
    pub is_volatile: bool,
    /// Unresolved fields are accessed through a patching slow path.
    pub is_resolved: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodId(pub u32);

#[derive(Debug)]
pub struct MethodData {
    pub name: String,
    pub holder: TypeId,
    pub params: Vec<Kind>,
    pub return_kind: Kind,
    pub is_static: bool,
    pub vtable_index: Option<u32>,
    pub is_resolved: bool,
}

/// Type, field and method view of the program being compiled.
#[derive(Debug, Default)]
pub struct Program {
    pub types: Vec<TypeData>,
    pub fields: Vec<FieldData>,
    pub methods: Vec<MethodData>,
}

impl Program {
    pub fn new() -> Program {
        Program {
            types: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn ty(&self, id: TypeId) -> &TypeData {
        &self.types[id.0 as usize]
    }

    pub fn field(&self, id: FieldId) -> &FieldData {
        &self.fields[id.0 as usize]
    }

    pub fn method(&self, id: MethodId) -> &MethodData {
        &self.methods[id.0 as usize]
    }

    pub fn add_type(&mut self, data: TypeData) -> TypeId {
        self.types.push(data);
        TypeId((self.types.len() - 1) as u32)
    }

    pub fn add_class(&mut self, name: &str, super_type: Option<TypeId>) -> TypeId {
        self.add_type(TypeData {
            name: name.into(),
            kind: TypeKind::Instance,
            super_type,
            interfaces: Vec::new(),
            is_loaded: true,
        })
    }

    pub fn add_field(&mut self, data: FieldData) -> FieldId {
        self.fields.push(data);
        FieldId((self.fields.len() - 1) as u32)
    }

    pub fn add_method(&mut self, data: MethodData) -> MethodId {
        self.methods.push(data);
        MethodId((self.methods.len() - 1) as u32)
    }

    /// Whether `sub` is `sup` or one of its subtypes.
    pub fn is_subtype_of(&self, sub: TypeId, sup: TypeId) -> bool {
        let mut worklist = vec![sub];

        while let Some(current) = worklist.pop() {
            if current == sup {
                return true;
            }

            let data = self.ty(current);
            worklist.extend(data.super_type);
            worklist.extend(data.interfaces.iter().copied());
        }

        false
    }

    /// Argument kinds of a call to `id`, receiver first for instance methods.
    pub fn signature_kinds(&self, id: MethodId) -> Vec<Kind> {
        let method = self.method(id);
        let mut kinds = Vec::with_capacity(method.params.len() + 1);

        if !method.is_static {
            kinds.push(Kind::Object);
        }

        kinds.extend(method.params.iter().map(|kind| kind.stack_kind()));
        kinds
    }

    pub fn display_method(&self, id: MethodId) -> String {
        let method = self.method(id);
        format!("{}.{}", self.ty(method.holder).name, method.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtype_through_interfaces() {
        let mut prog = Program::new();
        let object = prog.add_class("Object", None);
        let closeable = prog.add_type(TypeData {
            name: "Closeable".into(),
            kind: TypeKind::Interface,
            super_type: None,
            interfaces: Vec::new(),
            is_loaded: true,
        });
        let stream = prog.add_type(TypeData {
            name: "Stream".into(),
            kind: TypeKind::Instance,
            super_type: Some(object),
            interfaces: vec![closeable],
            is_loaded: true,
        });
        let file = prog.add_class("FileStream", Some(stream));

        assert!(prog.is_subtype_of(file, closeable));
        assert!(prog.is_subtype_of(file, object));
        assert!(prog.is_subtype_of(file, file));
        assert!(!prog.is_subtype_of(object, file));
    }

    #[test]
    fn test_signature_kinds() {
        let mut prog = Program::new();
        let holder = prog.add_class("Foo", None);
        let method = prog.add_method(MethodData {
            name: "bar".into(),
            holder,
            params: vec![Kind::Byte, Kind::Long],
            return_kind: Kind::Void,
            is_static: false,
            vtable_index: Some(3),
            is_resolved: true,
        });

        assert_eq!(
            prog.signature_kinds(method),
            vec![Kind::Object, Kind::Int, Kind::Long]
        );
        assert_eq!(prog.display_method(method), "Foo.bar");
    }
}

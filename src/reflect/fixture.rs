//! In-memory object graphs for tests.

use super::{Argument, DumpObject, DumpReflector, ObjectDump, ObjectId, ObjectKind, Value};

/// Builds an [`ObjectDump`] the way a host runtime would lay it out.
pub struct GraphBuilder {
    dump: ObjectDump,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            dump: ObjectDump {
                search_roots: vec!["/site".to_string()],
                ..ObjectDump::default()
            },
        }
    }

    fn push(&mut self, object: DumpObject) -> ObjectId {
        let id = ObjectId(self.dump.objects.len() as u32);
        self.dump.objects.push(object);
        id
    }

    fn get_mut(&mut self, id: ObjectId) -> &mut DumpObject {
        &mut self.dump.objects[id.0 as usize]
    }

    /// An importable module.
    pub fn module(&mut self, name: &str, file: &str) -> ObjectId {
        let mut object = DumpObject::new(ObjectKind::Module);
        object.name = Some(name.to_string());
        object.file = Some(file.to_string());
        object.line = Some(1);
        let id = self.push(object);
        self.dump.modules.insert(name.to_string(), id);
        id
    }

    /// A class whose source block spans `lines` lines starting at `line`.
    pub fn class(&mut self, module: &str, name: &str, file: &str, line: u32, lines: u32) -> ObjectId {
        let mut source = format!("class {name}:\n");
        for _ in 1..lines {
            source.push_str("    pass\n");
        }
        let mut object = DumpObject::new(ObjectKind::Class);
        object.name = Some(name.to_string());
        object.module = Some(module.to_string());
        object.file = Some(file.to_string());
        object.line = Some(line);
        object.source = Some(source);
        self.push(object)
    }

    pub fn function(
        &mut self,
        module: &str,
        name: &str,
        file: &str,
        line: u32,
        source: &str,
        arguments: &[&str],
    ) -> ObjectId {
        let mut object = DumpObject::new(ObjectKind::Function);
        object.name = Some(name.to_string());
        object.module = Some(module.to_string());
        object.file = Some(file.to_string());
        object.line = Some(line);
        object.source = Some(source.to_string());
        object.arguments = arguments.iter().map(|a| Argument::from(*a)).collect();
        self.push(object)
    }

    pub fn value(&mut self, value: Value) -> ObjectId {
        let mut object = DumpObject::new(ObjectKind::Value);
        object.value = Some(value);
        self.push(object)
    }

    pub fn builtin(&mut self, name: &str) -> ObjectId {
        let mut object = DumpObject::new(ObjectKind::Builtin);
        object.name = Some(name.to_string());
        self.push(object)
    }

    /// A member of the universal base object's namespace.
    pub fn object_default(&mut self, kind: ObjectKind) -> ObjectId {
        let id = self.push(DumpObject::new(kind));
        self.dump.base_object.push(id);
        id
    }

    pub fn add_member(&mut self, container: ObjectId, name: &str, member: ObjectId) {
        self.get_mut(container)
            .members
            .insert(name.to_string(), member);
    }

    pub fn set_doc(&mut self, id: ObjectId, doc: &str) {
        self.get_mut(id).doc = Some(doc.to_string());
    }

    pub fn set_wrapped(&mut self, outer: ObjectId, inner: ObjectId) {
        self.get_mut(outer).wrapped = Some(inner);
    }

    /// Set direct bases and merge their members into `class` the way
    /// member enumeration surfaces inherited members. Call after the
    /// class's own members are added.
    pub fn set_bases(&mut self, class: ObjectId, bases: &[ObjectId]) {
        for base in bases {
            let inherited = self.dump.objects[base.0 as usize].members.clone();
            let own = &mut self.get_mut(class).members;
            for (name, member) in inherited {
                own.entry(name).or_insert(member);
            }
        }
        self.get_mut(class).bases = bases.to_vec();
    }

    pub fn build(self) -> DumpReflector {
        DumpReflector::new(self.dump).expect("fixture graph is consistent")
    }
}

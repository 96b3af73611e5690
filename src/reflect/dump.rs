//! Reflector backed by a serialized object-graph dump.
//!
//! The host runtime writes its loaded object graph to JSON once; this module
//! loads that document and answers reflection queries from it. Objects live
//! in a flat array and are addressed by their index.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::{Argument, ObjectId, ObjectKind, Reflector, SourceLocation, Value};
use crate::error::{CbvError, Result};

/// Top-level dump document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectDump {
    /// Project label recorded by the host (e.g. "Django").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// Framework version recorded by the host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub search_roots: Vec<String>,
    /// Members of the universal base object's namespace.
    #[serde(default)]
    pub base_object: Vec<ObjectId>,
    /// Importable modules: dotted path -> module object.
    #[serde(default)]
    pub modules: BTreeMap<String, ObjectId>,
    #[serde(default)]
    pub objects: Vec<DumpObject>,
}

/// One object in the dump.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpObject {
    pub kind: ObjectKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Member name -> object. A BTreeMap keeps enumeration lexical.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub members: BTreeMap<String, ObjectId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bases: Vec<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrapped: Option<ObjectId>,
    /// Argument spellings; `*name` and `**name` mark the catch-alls.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<Argument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl DumpObject {
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            name: None,
            module: None,
            doc: None,
            file: None,
            line: None,
            source: None,
            members: BTreeMap::new(),
            bases: Vec::new(),
            wrapped: None,
            arguments: Vec::new(),
            value: None,
        }
    }
}

/// A [`Reflector`] over an [`ObjectDump`].
#[derive(Debug, Clone)]
pub struct DumpReflector {
    dump: ObjectDump,
}

impl DumpReflector {
    /// Wrap a dump after checking that every handle it contains resolves.
    pub fn new(dump: ObjectDump) -> Result<Self> {
        let len = dump.objects.len();
        let check = |id: ObjectId, context: &str| -> Result<()> {
            if (id.0 as usize) < len {
                Ok(())
            } else {
                Err(CbvError::InvalidDump(format!(
                    "{context} refers to missing object {id}"
                )))
            }
        };

        for id in &dump.base_object {
            check(*id, "base_object")?;
        }
        for (path, id) in &dump.modules {
            check(*id, &format!("module '{path}'"))?;
            if dump.objects[id.0 as usize].kind != ObjectKind::Module {
                return Err(CbvError::InvalidDump(format!(
                    "module '{path}' points at a non-module object {id}"
                )));
            }
        }
        for (index, object) in dump.objects.iter().enumerate() {
            let owner = format!("object #{index}");
            for member in object.members.values() {
                check(*member, &owner)?;
            }
            for base in &object.bases {
                check(*base, &owner)?;
            }
            if let Some(wrapped) = object.wrapped {
                check(wrapped, &owner)?;
            }
        }

        Ok(Self { dump })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::new(serde_json::from_str(json)?)
    }

    /// Load a dump file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CbvError::NotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Project label recorded in the dump, if any.
    pub fn project(&self) -> Option<&str> {
        self.dump.project.as_deref()
    }

    /// Framework version recorded in the dump, if any.
    pub fn version(&self) -> Option<&str> {
        self.dump.version.as_deref()
    }

    pub fn object_count(&self) -> usize {
        self.dump.objects.len()
    }

    fn object(&self, id: ObjectId) -> Option<&DumpObject> {
        self.dump.objects.get(id.0 as usize)
    }

    /// Default text representation for objects without an explicit value.
    fn default_repr(&self, id: ObjectId, object: &DumpObject) -> String {
        let name = object.name.as_deref().unwrap_or("?");
        match object.kind {
            ObjectKind::Class => match object.module.as_deref() {
                Some(module) => format!("<class '{module}.{name}'>"),
                None => format!("<class '{name}'>"),
            },
            ObjectKind::Module => format!("<module '{name}'>"),
            ObjectKind::Function | ObjectKind::Method => format!("<function {name}>"),
            ObjectKind::Builtin => format!("<built-in function {name}>"),
            ObjectKind::Value => format!("<object {id}>"),
        }
    }
}

impl Reflector for DumpReflector {
    fn load_module(&self, path: &str) -> Option<ObjectId> {
        self.dump.modules.get(path).copied()
    }

    fn kind(&self, obj: ObjectId) -> ObjectKind {
        // Unknown handles are treated as opaque built-ins, which the walker ignores.
        self.object(obj).map_or(ObjectKind::Builtin, |o| o.kind)
    }

    fn name(&self, obj: ObjectId) -> Option<&str> {
        self.object(obj)?.name.as_deref()
    }

    fn module_name(&self, obj: ObjectId) -> Option<&str> {
        self.object(obj)?.module.as_deref()
    }

    fn members(&self, container: ObjectId) -> Vec<(String, ObjectId)> {
        self.object(container)
            .map(|o| {
                o.members
                    .iter()
                    .map(|(name, id)| (name.clone(), *id))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn member(&self, container: ObjectId, name: &str) -> Option<ObjectId> {
        self.object(container)?.members.get(name).copied()
    }

    fn source_file(&self, obj: ObjectId) -> Option<&str> {
        self.object(obj)?.file.as_deref()
    }

    fn source_location(&self, obj: ObjectId) -> Option<SourceLocation> {
        let object = self.object(obj)?;
        let file = object.file.clone()?;
        let start_line = object.line?;
        let source = object.source.as_deref()?;
        Some(SourceLocation {
            file,
            start_line,
            line_count: source.lines().count() as u32,
        })
    }

    fn source_text(&self, obj: ObjectId) -> Option<&str> {
        self.object(obj)?.source.as_deref()
    }

    fn docstring(&self, obj: ObjectId) -> Option<&str> {
        self.object(obj)?.doc.as_deref()
    }

    fn bases(&self, obj: ObjectId) -> Vec<ObjectId> {
        self.object(obj).map(|o| o.bases.clone()).unwrap_or_default()
    }

    fn wrapped(&self, obj: ObjectId) -> Option<ObjectId> {
        self.object(obj)?.wrapped
    }

    fn arguments(&self, obj: ObjectId) -> Vec<Argument> {
        self.object(obj)
            .map(|o| o.arguments.clone())
            .unwrap_or_default()
    }

    fn value(&self, obj: ObjectId) -> Value {
        match self.object(obj) {
            Some(object) => match &object.value {
                Some(value) => value.clone(),
                None => Value::Repr(self.default_repr(obj, object)),
            },
            None => Value::Repr(format!("<object {obj}>")),
        }
    }

    fn base_object_members(&self) -> Vec<ObjectId> {
        self.dump.base_object.clone()
    }

    fn search_roots(&self) -> &[String] {
        &self.dump.search_roots
    }
}

//! Reflection layer: the capability interface the inspector walks.
//!
//! The inspector never touches a runtime directly. Everything it needs to
//! know about modules, classes, callables and values goes through the
//! [`Reflector`] trait, addressed by opaque [`ObjectId`] handles. Two handles
//! are the same object if and only if they compare equal.

pub mod dump;
pub mod registry;

#[cfg(test)]
pub(crate) mod fixture;

pub use dump::{DumpObject, DumpReflector, ObjectDump};
pub use registry::ModuleRegistry;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to a live object. Equality is object identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Runtime classification of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// Built-in (natively implemented) callable.
    Builtin,
    Module,
    Class,
    /// Plain function, including functions found on a class.
    Function,
    /// Bound method.
    Method,
    /// Anything else: literals, instances, descriptors.
    Value,
}

impl ObjectKind {
    pub fn is_callable(self) -> bool {
        matches!(self, ObjectKind::Function | ObjectKind::Method)
    }
}

/// How a callable argument binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgumentKind {
    Positional,
    /// `*args`
    VarArgs,
    /// `**kwargs`
    VarKwargs,
}

/// One argument of a callable. Serialized as its name, with a `*` or `**`
/// prefix for the variadic kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Argument {
    pub name: String,
    pub kind: ArgumentKind,
}

impl Argument {
    pub fn is_variadic(&self) -> bool {
        self.kind != ArgumentKind::Positional
    }
}

impl From<&str> for Argument {
    fn from(spelling: &str) -> Self {
        let (name, kind) = if let Some(name) = spelling.strip_prefix("**") {
            (name, ArgumentKind::VarKwargs)
        } else if let Some(name) = spelling.strip_prefix('*') {
            (name, ArgumentKind::VarArgs)
        } else {
            (spelling, ArgumentKind::Positional)
        };
        Self {
            name: name.to_string(),
            kind,
        }
    }
}

impl From<String> for Argument {
    fn from(spelling: String) -> Self {
        Argument::from(spelling.as_str())
    }
}

impl From<Argument> for String {
    fn from(argument: Argument) -> Self {
        match argument.kind {
            ArgumentKind::Positional => argument.name,
            ArgumentKind::VarArgs => format!("*{}", argument.name),
            ArgumentKind::VarKwargs => format!("**{}", argument.name),
        }
    }
}

/// Where an object's source lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    /// 1-indexed first line of the object's source block.
    pub start_line: u32,
    /// Number of lines in the source block.
    pub line_count: u32,
}

/// A plain literal as the runtime would print it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Literal {
    /// A string; rendered single-quoted.
    Str(String),
    /// Any other value; rendered with its default text representation.
    Repr(String),
}

/// A deferred-call proxy: a function call recorded for later evaluation,
/// e.g. a lazily translated string or a lazily reversed URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredCall {
    /// Name of the eager function the proxy will eventually call.
    pub function: String,
    #[serde(default)]
    pub args: Vec<Literal>,
    #[serde(default)]
    pub kwargs: Vec<(String, Literal)>,
}

/// The value of an attribute as reported by reflection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Value {
    Str(String),
    Repr(String),
    Deferred(DeferredCall),
}

impl From<Literal> for Value {
    fn from(lit: Literal) -> Self {
        match lit {
            Literal::Str(s) => Value::Str(s),
            Literal::Repr(s) => Value::Repr(s),
        }
    }
}

/// Read-only reflection over a loaded object graph.
///
/// The graph is assumed immutable for the lifetime of the reflector.
pub trait Reflector {
    /// Import a module by dotted path. `None` if it cannot be imported.
    fn load_module(&self, path: &str) -> Option<ObjectId>;

    fn kind(&self, obj: ObjectId) -> ObjectKind;

    /// The object's own `__name__` (fully qualified for modules).
    fn name(&self, obj: ObjectId) -> Option<&str>;

    /// Name of the module that defines a class or callable.
    fn module_name(&self, obj: ObjectId) -> Option<&str>;

    /// All members visible on `container`, sorted by name. For classes this
    /// is the MRO-merged view, inherited members included.
    fn members(&self, container: ObjectId) -> Vec<(String, ObjectId)>;

    /// Look up a single member by name.
    fn member(&self, container: ObjectId, name: &str) -> Option<ObjectId> {
        self.members(container)
            .into_iter()
            .find(|(member_name, _)| member_name == name)
            .map(|(_, id)| id)
    }

    /// Source file an object was loaded from.
    fn source_file(&self, obj: ObjectId) -> Option<&str>;

    /// Full source location. `None` for objects without source lines
    /// (built-ins, literals, natively implemented members).
    fn source_location(&self, obj: ObjectId) -> Option<SourceLocation>;

    /// Raw source text of the object's block.
    fn source_text(&self, obj: ObjectId) -> Option<&str>;

    /// Raw docstring, uncleaned.
    fn docstring(&self, obj: ObjectId) -> Option<&str>;

    /// Direct base classes, in declaration order.
    fn bases(&self, obj: ObjectId) -> Vec<ObjectId>;

    /// The callable a decorator wraps, if any.
    fn wrapped(&self, obj: ObjectId) -> Option<ObjectId>;

    /// Every argument of a callable in declaration order, including the
    /// receiver and any variadic catch-alls.
    fn arguments(&self, obj: ObjectId) -> Vec<Argument>;

    /// The object viewed as an attribute value.
    fn value(&self, obj: ObjectId) -> Value;

    /// Handles in the universal base object's own namespace.
    fn base_object_members(&self) -> Vec<ObjectId>;

    /// Import-search roots, used to relativize module filenames.
    fn search_roots(&self) -> &[String];
}

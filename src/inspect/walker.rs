//
//  walker.rs
//  cbv
//

//! Object-graph walker.
//!
//! A pull-driven, single-pass traversal of one or more root modules. Each
//! call to `next` advances the traversal until it produces one record; the
//! pending work lives on an explicit stack of member lists.

use std::collections::HashSet;
use std::rc::Rc;
use tracing::{debug, trace};

use super::classify;
use super::values::LazyFunctions;
use crate::error::Result;
use crate::reflect::{ModuleRegistry, ObjectId, ObjectKind, Reflector};
use crate::snapshot::Record;

/// Members of one container still waiting to be visited.
struct Frame {
    container: ObjectId,
    root: Rc<str>,
    members: std::vec::IntoIter<(String, ObjectId)>,
}

/// Lazily yields the records discovered under a list of root modules.
///
/// Fused: once an error has been yielded, the walker yields nothing more.
pub struct Walker<'r, R: Reflector + ?Sized> {
    registry: ModuleRegistry<'r, R>,
    lazy: LazyFunctions,
    object_defaults: HashSet<ObjectId>,
    roots: std::vec::IntoIter<String>,
    stack: Vec<Frame>,
    seen_modules: HashSet<ObjectId>,
    seen_classes: HashSet<ObjectId>,
    failed: bool,
}

impl<'r, R: Reflector + ?Sized> Walker<'r, R> {
    pub fn new(reflector: &'r R, roots: &[String], lazy: LazyFunctions) -> Self {
        Self {
            registry: ModuleRegistry::new(reflector),
            lazy,
            object_defaults: reflector.base_object_members().into_iter().collect(),
            roots: roots.to_vec().into_iter(),
            stack: Vec::new(),
            seen_modules: HashSet::new(),
            seen_classes: HashSet::new(),
            failed: false,
        }
    }

    fn push_members(&mut self, container: ObjectId, root: Rc<str>) {
        let members = self.registry.reflector().members(container);
        self.stack.push(Frame {
            container,
            root,
            members: members.into_iter(),
        });
    }

    /// Start the next root module that imports. `None` once roots run out.
    fn start_next_root(&mut self) -> Option<Result<Record>> {
        loop {
            let path = self.roots.next()?;
            let Some(module) = self.registry.import(&path) else {
                debug!(root = %path, "skipping root that failed to import");
                continue;
            };
            let reflector = self.registry.reflector();
            let root: Rc<str> = Rc::from(reflector.name(module).unwrap_or(path.as_str()));
            debug!(root = %root, "walking root module");
            if let Some(record) = self.visit(module, root, None) {
                return Some(record);
            }
        }
    }

    /// Dispatch one member by its runtime kind.
    fn visit(&mut self, member: ObjectId, root: Rc<str>, parent: Option<(ObjectId, &str)>) -> Option<Result<Record>> {
        let reflector = self.registry.reflector();
        let parent_kind = parent.map(|(id, _)| reflector.kind(id));

        match (reflector.kind(member), parent, parent_kind) {
            (ObjectKind::Builtin, _, _) => None,
            (ObjectKind::Module, _, _) => self.enter_module(member, root),
            (ObjectKind::Class, Some((container, _)), Some(ObjectKind::Module)) => {
                self.enter_class(member, container, root)
            }
            (kind, Some((container, name)), _) if kind.is_callable() => {
                classify::method_record(reflector, member, name, container)
                    .map(|method| Ok(Record::Method(method)))
            }
            (_, Some((container, name)), Some(ObjectKind::Class)) => classify::attribute_candidate(
                reflector,
                member,
                name,
                container,
                &self.object_defaults,
                &self.lazy,
            )
            .map(|candidate| candidate.map(Record::Attribute))
            .transpose(),
            _ => None,
        }
    }

    fn enter_module(&mut self, module: ObjectId, root: Rc<str>) -> Option<Result<Record>> {
        let reflector = self.registry.reflector();
        let name = reflector.name(module)?;
        // Stay inside the root package.
        if !name.starts_with(&*root) {
            return None;
        }
        if !self.seen_modules.insert(module) {
            return None;
        }

        let record = classify::module_record(reflector, module);
        trace!(module = %record.name, "module");
        self.push_members(module, root);
        Some(Ok(Record::Module(record)))
    }

    fn enter_class(&mut self, class: ObjectId, container: ObjectId, root: Rc<str>) -> Option<Result<Record>> {
        let reflector = self.registry.reflector();
        let module_name = reflector.module_name(class)?;
        if !module_name.starts_with(&*root) {
            return None;
        }
        // Imported into this module's namespace, not defined here.
        if reflector.source_file(class) != reflector.source_file(container) {
            return None;
        }
        if !self.seen_classes.insert(class) {
            return None;
        }

        let record = classify::klass_record(&mut self.registry, class);
        trace!(klass = %record.path, "class");
        self.push_members(class, root);
        Some(Ok(Record::Klass(record)))
    }
}

impl<R: Reflector + ?Sized> Iterator for Walker<'_, R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            let Some(frame) = self.stack.last_mut() else {
                let record = self.start_next_root()?;
                self.failed = record.is_err();
                return Some(record);
            };

            let container = frame.container;
            let root = Rc::clone(&frame.root);
            let Some((name, member)) = frame.members.next() else {
                self.stack.pop();
                continue;
            };

            if let Some(record) = self.visit(member, root, Some((container, &name))) {
                self.failed = record.is_err();
                return Some(record);
            }
        }
    }
}

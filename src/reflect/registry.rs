//
//  registry.rs
//  cbv
//

use std::collections::HashMap;
use tracing::debug;

use super::{ObjectId, Reflector};

/// Memoizes module imports for the duration of one inspection run.
///
/// Created fresh for every walk and dropped with it, so a run never sees
/// imports cached by an earlier one.
pub struct ModuleRegistry<'r, R: Reflector + ?Sized> {
    reflector: &'r R,
    loaded: HashMap<String, Option<ObjectId>>,
}

impl<'r, R: Reflector + ?Sized> ModuleRegistry<'r, R> {
    pub fn new(reflector: &'r R) -> Self {
        Self {
            reflector,
            loaded: HashMap::new(),
        }
    }

    pub fn reflector(&self) -> &'r R {
        self.reflector
    }

    /// Import a module, caching both hits and misses.
    pub fn import(&mut self, path: &str) -> Option<ObjectId> {
        if let Some(cached) = self.loaded.get(path) {
            return *cached;
        }
        let module = self.reflector.load_module(path);
        if module.is_none() {
            debug!(module = path, "module not importable");
        }
        self.loaded.insert(path.to_string(), module);
        module
    }

    /// Number of distinct import attempts made so far.
    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::fixture::GraphBuilder;

    #[test]
    fn test_import_caches_hits_and_misses() {
        let mut builder = GraphBuilder::new();
        let views = builder.module("app.views", "/site/app/views.py");
        let reflector = builder.build();

        let mut registry = ModuleRegistry::new(&reflector);
        assert!(registry.is_empty());
        assert_eq!(registry.import("app.views"), Some(views));
        assert_eq!(registry.import("app.views"), Some(views));
        assert_eq!(registry.import("app.missing"), None);
        assert_eq!(registry.import("app.missing"), None);
        assert_eq!(registry.len(), 2);
    }
}

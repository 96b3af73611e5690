//! Snapshots: the normalized result of one import run.
//!
//! [`Snapshot::from_records`] buffers the walker's stream, checks the
//! ordering invariants, and runs the resolution pass. The query helpers
//! below are what browsing and version comparison are built on.

pub mod types;

pub use types::*;

use chrono::Utc;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::info;

use crate::error::{CbvError, Result};
use crate::resolve::{resolve, InheritanceGraph, Resolution};

impl Snapshot {
    /// Consume a record stream and build the snapshot.
    ///
    /// Fails on the first error in the stream, so a fatal inspection error
    /// never produces a partial snapshot. Modules must precede their classes
    /// and classes must precede their members.
    pub fn from_records<I>(project: &str, version: &str, records: I) -> Result<Self>
    where
        I: IntoIterator<Item = Result<Record>>,
    {
        let mut modules = Vec::new();
        let mut klasses = Vec::new();
        let mut methods = Vec::new();
        let mut candidates = Vec::new();
        let mut module_names: HashSet<String> = HashSet::new();
        let mut klass_paths: HashSet<String> = HashSet::new();

        for record in records {
            match record? {
                Record::Module(module) => {
                    if !module_names.insert(module.name.clone()) {
                        return Err(CbvError::InvalidRecordOrder(format!(
                            "duplicate module '{}'",
                            module.name
                        )));
                    }
                    modules.push(module);
                }
                Record::Klass(klass) => {
                    if !module_names.contains(&klass.module) {
                        return Err(CbvError::InvalidRecordOrder(format!(
                            "class '{}' arrived before its module '{}'",
                            klass.path, klass.module
                        )));
                    }
                    if !klass_paths.insert(klass.path.clone()) {
                        return Err(CbvError::InvalidRecordOrder(format!(
                            "duplicate class '{}'",
                            klass.path
                        )));
                    }
                    klasses.push(klass);
                }
                Record::Method(method) => {
                    if !klass_paths.contains(&method.klass_path) {
                        return Err(CbvError::InvalidRecordOrder(format!(
                            "method '{}' arrived before its class '{}'",
                            method.name, method.klass_path
                        )));
                    }
                    methods.push(method);
                }
                Record::Attribute(candidate) => {
                    if !klass_paths.contains(&candidate.klass_path) {
                        return Err(CbvError::InvalidRecordOrder(format!(
                            "attribute '{}' arrived before its class '{}'",
                            candidate.name, candidate.klass_path
                        )));
                    }
                    candidates.push(candidate);
                }
            }
        }

        let Resolution {
            inheritance,
            attributes,
        } = resolve(&klasses, &candidates);

        let snapshot = Self {
            project: project.to_string(),
            version: version.to_string(),
            imported_at: Utc::now(),
            modules,
            klasses,
            methods,
            attributes,
            inheritance,
        };
        let stats = snapshot.stats();
        info!(
            project,
            version,
            modules = stats.modules,
            klasses = stats.klasses,
            methods = stats.methods,
            attributes = stats.attributes,
            "snapshot built"
        );
        Ok(snapshot)
    }

    pub fn stats(&self) -> SnapshotStats {
        SnapshotStats {
            modules: self.modules.len(),
            klasses: self.klasses.len(),
            methods: self.methods.len(),
            attributes: self.attributes.len(),
            inheritance: self.inheritance.len(),
        }
    }

    pub fn klass(&self, path: &str) -> Option<&KlassRecord> {
        self.klasses.iter().find(|k| k.path == path)
    }

    /// Find classes by canonical path, simple name, or `best_import_path.Name`.
    pub fn find_klasses(&self, query: &str) -> Vec<&KlassRecord> {
        self.klasses
            .iter()
            .filter(|k| {
                k.path == query
                    || k.name == query
                    || format!("{}.{}", k.best_import_path, k.name) == query
            })
            .collect()
    }

    pub fn methods_of(&self, path: &str) -> Vec<&MethodRecord> {
        self.methods.iter().filter(|m| m.klass_path == path).collect()
    }

    pub fn attributes_of(&self, path: &str) -> Vec<&KlassAttribute> {
        self.attributes
            .iter()
            .filter(|a| a.klass_path == path)
            .collect()
    }

    /// Direct parents by base order.
    pub fn parents_of(&self, path: &str) -> Vec<&str> {
        let mut parents: Vec<&Inheritance> = self
            .inheritance
            .iter()
            .filter(|edge| edge.child == path)
            .collect();
        parents.sort_by_key(|edge| edge.order);
        parents.into_iter().map(|edge| edge.parent.as_str()).collect()
    }

    pub fn children_of(&self, path: &str) -> Vec<&str> {
        self.inheritance
            .iter()
            .filter(|edge| edge.parent == path)
            .map(|edge| edge.child.as_str())
            .collect()
    }

    /// Method resolution order over the discovered lattice, starting with
    /// `path` itself. Uses C3 linearization; falls back to left-to-right
    /// depth-first order when the lattice has no consistent linearization.
    pub fn mro(&self, path: &str) -> Vec<&KlassRecord> {
        let mut edges: Vec<&Inheritance> = self.inheritance.iter().collect();
        edges.sort_by_key(|edge| edge.order);
        let mut parents: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in edges {
            parents
                .entry(edge.child.as_str())
                .or_default()
                .push(edge.parent.as_str());
        }

        let order = match Linearizer::new(&parents).linearize(path) {
            Some(order) => order,
            None => {
                let mut order = Vec::new();
                let mut seen = HashSet::new();
                depth_first(path, &parents, &mut order, &mut seen);
                order
            }
        };
        order.into_iter().filter_map(|p| self.klass(p)).collect()
    }

    /// Every class below `path` in the lattice, sorted by path.
    pub fn descendants_of(&self, path: &str) -> Vec<String> {
        let mut graph = InheritanceGraph::from_klasses(&self.klasses, &self.inheritance);
        let mut descendants: Vec<String> = graph
            .descendants(path)
            .into_iter()
            .map(str::to_string)
            .collect();
        descendants.sort();
        descendants
    }

    /// Classes and methods added or removed going from `self` to `newer`.
    pub fn diff(&self, newer: &Snapshot) -> SnapshotDiff {
        let old_klasses: BTreeSet<&str> = self.klasses.iter().map(|k| k.path.as_str()).collect();
        let new_klasses: BTreeSet<&str> = newer.klasses.iter().map(|k| k.path.as_str()).collect();
        let old_methods: BTreeSet<String> = self
            .methods
            .iter()
            .map(|m| format!("{}.{}", m.klass_path, m.name))
            .collect();
        let new_methods: BTreeSet<String> = newer
            .methods
            .iter()
            .map(|m| format!("{}.{}", m.klass_path, m.name))
            .collect();

        SnapshotDiff {
            added_klasses: new_klasses.difference(&old_klasses).map(|s| s.to_string()).collect(),
            removed_klasses: old_klasses.difference(&new_klasses).map(|s| s.to_string()).collect(),
            added_methods: new_methods.difference(&old_methods).cloned().collect(),
            removed_methods: old_methods.difference(&new_methods).cloned().collect(),
        }
    }
}

/// C3 linearization with one cached answer per class.
struct Linearizer<'a, 'p> {
    parents: &'p HashMap<&'a str, Vec<&'a str>>,
    memo: HashMap<&'a str, Option<Vec<&'a str>>>,
    visiting: HashSet<&'a str>,
}

impl<'a, 'p> Linearizer<'a, 'p> {
    fn new(parents: &'p HashMap<&'a str, Vec<&'a str>>) -> Self {
        Self {
            parents,
            memo: HashMap::new(),
            visiting: HashSet::new(),
        }
    }

    fn linearize(&mut self, path: &'a str) -> Option<Vec<&'a str>> {
        if let Some(cached) = self.memo.get(path) {
            return cached.clone();
        }
        // Reaching a class that is still being linearized means a cycle.
        if !self.visiting.insert(path) {
            return None;
        }
        let merged = self.merge(path);
        self.visiting.remove(path);
        self.memo.insert(path, merged.clone());
        merged
    }

    fn merge(&mut self, path: &'a str) -> Option<Vec<&'a str>> {
        let parents = self.parents;
        let bases: &[&'a str] = parents.get(path).map(Vec::as_slice).unwrap_or(&[]);

        let mut sequences: Vec<Vec<&'a str>> = Vec::with_capacity(bases.len() + 1);
        for &base in bases {
            sequences.push(self.linearize(base)?);
        }
        sequences.push(bases.to_vec());

        let mut result = vec![path];
        loop {
            sequences.retain(|s| !s.is_empty());
            if sequences.is_empty() {
                return Some(result);
            }
            let head = sequences
                .iter()
                .map(|s| s[0])
                .find(|candidate| !sequences.iter().any(|s| s[1..].contains(candidate)))?;
            result.push(head);
            for sequence in &mut sequences {
                if sequence[0] == head {
                    sequence.remove(0);
                }
            }
        }
    }
}

fn depth_first<'a>(
    path: &'a str,
    parents: &HashMap<&'a str, Vec<&'a str>>,
    order: &mut Vec<&'a str>,
    seen: &mut HashSet<&'a str>,
) {
    if !seen.insert(path) {
        return;
    }
    order.push(path);
    for parent in parents.get(path).into_iter().flatten() {
        depth_first(parent, parents, order, seen);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(name: &str) -> Record {
        Record::Module(ModuleRecord {
            name: name.to_string(),
            docstring: String::new(),
            filename: format!("{}.py", name.replace('.', "/")),
        })
    }

    fn klass(path: &str, bases: &[&str]) -> Record {
        let (module, name) = path.rsplit_once('.').unwrap();
        Record::Klass(KlassRecord {
            name: name.to_string(),
            module: module.to_string(),
            docstring: String::new(),
            line_number: Some(1),
            path: path.to_string(),
            best_import_path: module.to_string(),
            bases: bases.iter().map(|b| b.to_string()).collect(),
        })
    }

    fn method(klass: &str, name: &str) -> Record {
        Record::Method(MethodRecord {
            name: name.to_string(),
            klass_path: klass.to_string(),
            docstring: String::new(),
            code: format!("def {name}(self):\n    pass\n"),
            kwargs: vec![],
            line_number: 2,
        })
    }

    fn attr(klass: &str, name: &str, value: &str) -> Record {
        Record::Attribute(AttributeCandidate {
            name: name.to_string(),
            value: value.to_string(),
            klass_path: klass.to_string(),
            line_number: None,
        })
    }

    fn build(records: Vec<Record>) -> Result<Snapshot> {
        Snapshot::from_records("Django", "4.2", records.into_iter().map(Ok))
    }

    /// View <- RedirectView; ContextMixin, TemplateResponseMixin, View <- TemplateView
    fn views() -> Snapshot {
        build(vec![
            module("v"),
            klass("v.ContextMixin", &["builtins.object"]),
            attr("v.ContextMixin", "extra_context", "None"),
            klass("v.TemplateResponseMixin", &["builtins.object"]),
            attr("v.TemplateResponseMixin", "template_name", "None"),
            klass("v.View", &["builtins.object"]),
            method("v.View", "dispatch"),
            attr("v.View", "http_method_names", "['get']"),
            klass("v.TemplateView", &["v.TemplateResponseMixin", "v.ContextMixin", "v.View"]),
            method("v.TemplateView", "get"),
            attr("v.TemplateView", "extra_context", "None"),
            attr("v.TemplateView", "http_method_names", "['get']"),
            attr("v.TemplateView", "template_name", "None"),
            klass("v.RedirectView", &["v.View"]),
            attr("v.RedirectView", "http_method_names", "['get']"),
            attr("v.RedirectView", "url", "None"),
        ])
        .unwrap()
    }

    #[test]
    fn test_from_records_resolves() {
        let snapshot = views();
        let stats = snapshot.stats();
        assert_eq!(stats.modules, 1);
        assert_eq!(stats.klasses, 5);
        assert_eq!(stats.methods, 2);
        assert_eq!(stats.inheritance, 4);
        // extra_context, template_name, http_method_names on their definers, plus url.
        assert_eq!(stats.attributes, 4);
        assert_eq!(snapshot.attributes_of("v.TemplateView").len(), 0);
        assert_eq!(snapshot.attributes_of("v.RedirectView")[0].name, "url");
    }

    #[test]
    fn test_rejects_class_before_module() {
        let err = build(vec![klass("v.View", &[])]).unwrap_err();
        assert!(matches!(err, CbvError::InvalidRecordOrder(_)));
    }

    #[test]
    fn test_rejects_method_before_class() {
        let err = build(vec![module("v"), method("v.View", "get")]).unwrap_err();
        assert!(matches!(err, CbvError::InvalidRecordOrder(_)));
    }

    #[test]
    fn test_rejects_duplicates() {
        let err = build(vec![module("v"), module("v")]).unwrap_err();
        assert!(matches!(err, CbvError::InvalidRecordOrder(_)));
        let err = build(vec![module("v"), klass("v.A", &[]), klass("v.A", &[])]).unwrap_err();
        assert!(matches!(err, CbvError::InvalidRecordOrder(_)));
    }

    #[test]
    fn test_stream_error_aborts() {
        let records = vec![
            Ok(module("v")),
            Err(CbvError::UnknownLazyFunction {
                function: "mystery".into(),
            }),
        ];
        let err = Snapshot::from_records("Django", "4.2", records).unwrap_err();
        assert!(matches!(err, CbvError::UnknownLazyFunction { .. }));
    }

    #[test]
    fn test_mro() {
        let snapshot = views();
        let mro: Vec<&str> = snapshot
            .mro("v.TemplateView")
            .into_iter()
            .map(|k| k.path.as_str())
            .collect();
        assert_eq!(
            mro,
            vec!["v.TemplateView", "v.TemplateResponseMixin", "v.ContextMixin", "v.View"]
        );
        assert_eq!(snapshot.parents_of("v.RedirectView"), vec!["v.View"]);
        let mut children = snapshot.children_of("v.View");
        children.sort();
        assert_eq!(children, vec!["v.RedirectView", "v.TemplateView"]);
    }

    #[test]
    fn test_descendants_of() {
        let snapshot = views();
        assert_eq!(
            snapshot.descendants_of("v.View"),
            vec!["v.RedirectView", "v.TemplateView"]
        );
        assert!(snapshot.descendants_of("v.TemplateView").is_empty());
        assert!(snapshot.descendants_of("v.Missing").is_empty());
    }

    #[test]
    fn test_mro_deep_diamond_lattice() {
        // A_i and B_i both inherit from (A_{i-1}, B_{i-1}).
        let depth = 30;
        let mut records = vec![module("m"), klass("m.A0", &[]), klass("m.B0", &[])];
        for i in 1..=depth {
            let bases = [format!("m.A{}", i - 1), format!("m.B{}", i - 1)];
            let bases: Vec<&str> = bases.iter().map(String::as_str).collect();
            records.push(klass(&format!("m.A{i}"), &bases));
            records.push(klass(&format!("m.B{i}"), &bases));
        }
        let snapshot = build(records).unwrap();

        let mro: Vec<&str> = snapshot
            .mro(&format!("m.A{depth}"))
            .into_iter()
            .map(|k| k.name.as_str())
            .collect();
        assert_eq!(mro.len(), 2 * depth + 1);
        assert_eq!(&mro[..3], &["A30", "A29", "B29"]);
        assert_eq!(&mro[mro.len() - 2..], &["A0", "B0"]);
    }

    #[test]
    fn test_mro_cycle_falls_back_to_depth_first() {
        let snapshot = build(vec![
            module("m"),
            klass("m.A", &["m.B"]),
            klass("m.B", &["m.A"]),
        ])
        .unwrap();
        let mro: Vec<&str> = snapshot
            .mro("m.A")
            .into_iter()
            .map(|k| k.name.as_str())
            .collect();
        assert_eq!(mro, vec!["A", "B"]);
    }

    #[test]
    fn test_find_klasses() {
        let snapshot = views();
        assert_eq!(snapshot.find_klasses("View").len(), 1);
        assert_eq!(snapshot.find_klasses("v.View").len(), 1);
        assert!(snapshot.find_klasses("Nope").is_empty());
    }

    #[test]
    fn test_diff() {
        let old = views();
        let new = build(vec![
            module("v"),
            klass("v.View", &[]),
            method("v.View", "dispatch"),
            method("v.View", "setup"),
            klass("v.FormView", &["v.View"]),
        ])
        .unwrap();

        let diff = old.diff(&new);
        assert_eq!(diff.added_klasses, vec!["v.FormView"]);
        assert_eq!(
            diff.removed_klasses,
            vec!["v.ContextMixin", "v.RedirectView", "v.TemplateResponseMixin", "v.TemplateView"]
        );
        assert_eq!(diff.added_methods, vec!["v.View.setup"]);
        assert_eq!(diff.removed_methods, vec!["v.TemplateView.get"]);
        assert!(old.diff(&old).is_empty());
    }
}

//
//  classify.rs
//  cbv
//

use std::collections::HashSet;

use super::path::best_import_path;
use super::values::{
    clean_docstring, dedent_source, is_reserved_name, keyword_arguments, reify_deferred,
    relative_filename, stringify, LazyFunctions,
};
use crate::error::Result;
use crate::reflect::{ModuleRegistry, ObjectId, ObjectKind, Reflector, Value};
use crate::snapshot::{AttributeCandidate, KlassRecord, MethodRecord, ModuleRecord};

/// Canonical `module.Name` path of a class.
pub fn full_path<R: Reflector + ?Sized>(reflector: &R, class: ObjectId) -> String {
    format!(
        "{}.{}",
        reflector.module_name(class).unwrap_or_default(),
        reflector.name(class).unwrap_or_default()
    )
}

fn docstring<R: Reflector + ?Sized>(reflector: &R, obj: ObjectId) -> String {
    reflector
        .docstring(obj)
        .map(clean_docstring)
        .unwrap_or_default()
}

pub fn module_record<R: Reflector + ?Sized>(reflector: &R, module: ObjectId) -> ModuleRecord {
    let filename = reflector
        .source_file(module)
        .map(|file| relative_filename(file, reflector.search_roots()))
        .unwrap_or_default();

    ModuleRecord {
        name: reflector.name(module).unwrap_or_default().to_string(),
        docstring: docstring(reflector, module),
        filename,
    }
}

pub fn klass_record<R: Reflector + ?Sized>(
    registry: &mut ModuleRegistry<'_, R>,
    class: ObjectId,
) -> KlassRecord {
    let reflector = registry.reflector();
    let bases = reflector
        .bases(class)
        .into_iter()
        .map(|base| full_path(reflector, base))
        .collect();

    KlassRecord {
        name: reflector.name(class).unwrap_or_default().to_string(),
        module: reflector.module_name(class).unwrap_or_default().to_string(),
        docstring: docstring(reflector, class),
        line_number: reflector.source_location(class).map(|l| l.start_line),
        path: full_path(reflector, class),
        best_import_path: best_import_path(registry, class),
        bases,
    }
}

/// Follow a decorator chain down to the innermost callable.
fn unwrap_decorated<R: Reflector + ?Sized>(reflector: &R, callable: ObjectId) -> ObjectId {
    let mut seen = HashSet::from([callable]);
    let mut current = callable;
    while let Some(inner) = reflector.wrapped(current) {
        if !seen.insert(inner) {
            break;
        }
        current = inner;
    }
    current
}

/// Whether `callable` is physically defined inside `parent`'s class body.
///
/// Member enumeration on a class also surfaces inherited callables, so
/// ownership is decided by source file and line range.
pub fn owns_method<R: Reflector + ?Sized>(reflector: &R, callable: ObjectId, parent: ObjectId) -> bool {
    if reflector.source_file(callable) != reflector.source_file(parent) {
        return false;
    }
    if reflector.kind(parent) != ObjectKind::Class {
        return false;
    }
    let (Some(method), Some(class)) = (
        reflector.source_location(callable),
        reflector.source_location(parent),
    ) else {
        return false;
    };
    method.start_line >= class.start_line
        && method.start_line <= class.start_line + class.line_count
}

/// Classify a callable found on `parent`. `None` unless `parent` is a class
/// that defines it directly.
pub fn method_record<R: Reflector + ?Sized>(
    reflector: &R,
    member: ObjectId,
    name: &str,
    parent: ObjectId,
) -> Option<MethodRecord> {
    let callable = unwrap_decorated(reflector, member);
    if !owns_method(reflector, callable, parent) {
        return None;
    }
    let location = reflector.source_location(callable)?;

    Some(MethodRecord {
        name: name.to_string(),
        klass_path: full_path(reflector, parent),
        docstring: docstring(reflector, callable),
        code: reflector
            .source_text(callable)
            .map(dedent_source)
            .unwrap_or_default(),
        kwargs: keyword_arguments(&reflector.arguments(callable)),
        line_number: location.start_line,
    })
}

/// Classify a non-callable member of a class.
///
/// Deferred values are reified first, so an unknown lazy function is fatal
/// even on a member that would otherwise be filtered out.
pub fn attribute_candidate<R: Reflector + ?Sized>(
    reflector: &R,
    member: ObjectId,
    name: &str,
    parent: ObjectId,
    object_defaults: &HashSet<ObjectId>,
    lazy: &LazyFunctions,
) -> Result<Option<AttributeCandidate>> {
    let (value, line_number) = match reflector.value(member) {
        Value::Deferred(call) => (reify_deferred(&call, lazy)?, None),
        value => {
            if reflector.kind(parent) == ObjectKind::Class && object_defaults.contains(&member) {
                return Ok(None);
            }
            (
                stringify(&value, lazy)?,
                reflector.source_location(member).map(|l| l.start_line),
            )
        }
    };

    if is_reserved_name(name) {
        return Ok(None);
    }

    Ok(Some(AttributeCandidate {
        name: name.to_string(),
        value,
        klass_path: full_path(reflector, parent),
        line_number,
    }))
}

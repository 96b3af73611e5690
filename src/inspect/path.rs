//
//  path.rs
//  cbv
//

use crate::reflect::{ModuleRegistry, ObjectId, Reflector};

/// Find the shortest dotted prefix of a class's defining module from which
/// the class is still importable as the *same* object.
///
/// Walks up the package hierarchy one component at a time and stops at the
/// first level that does not re-expose the class (or cannot be imported).
/// Re-exports are assumed contiguous from the defining module outward.
pub fn best_import_path<R: Reflector + ?Sized>(
    registry: &mut ModuleRegistry<'_, R>,
    class: ObjectId,
) -> String {
    let reflector = registry.reflector();
    let module_path = reflector.module_name(class).unwrap_or_default();
    let Some(class_name) = reflector.name(class) else {
        return module_path.to_string();
    };

    let mut best = module_path;
    while let Some((prefix, _)) = best.rsplit_once('.') {
        let Some(module) = registry.import(prefix) else {
            break;
        };
        if reflector.member(module, class_name) != Some(class) {
            break;
        }
        best = prefix;
    }
    best.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::fixture::GraphBuilder;

    #[test]
    fn test_walks_up_reexports() {
        let mut b = GraphBuilder::new();
        let top = b.module("django.views", "/site/django/views/__init__.py");
        let generic = b.module("django.views.generic", "/site/django/views/generic/__init__.py");
        let base = b.module("django.views.generic.base", "/site/django/views/generic/base.py");
        let view = b.class("django.views.generic.base", "View", "/site/django/views/generic/base.py", 10, 20);
        b.add_member(base, "View", view);
        b.add_member(generic, "View", view);
        b.add_member(top, "View", view);
        let reflector = b.build();

        let mut registry = ModuleRegistry::new(&reflector);
        assert_eq!(best_import_path(&mut registry, view), "django.views");
    }

    #[test]
    fn test_stops_at_first_gap() {
        let mut b = GraphBuilder::new();
        let top = b.module("django.views", "/site/django/views/__init__.py");
        let _generic = b.module("django.views.generic", "/site/django/views/generic/__init__.py");
        let edit = b.module("django.views.generic.edit", "/site/django/views/generic/edit.py");
        let form = b.class("django.views.generic.edit", "FormView", "/site/django/views/generic/edit.py", 5, 10);
        b.add_member(edit, "FormView", form);
        // Exposed at the top but not in between: the gap ends the search.
        b.add_member(top, "FormView", form);
        let reflector = b.build();

        let mut registry = ModuleRegistry::new(&reflector);
        assert_eq!(best_import_path(&mut registry, form), "django.views.generic.edit");
    }

    #[test]
    fn test_same_name_different_object_is_not_a_match() {
        let mut b = GraphBuilder::new();
        let pkg = b.module("app", "/site/app/__init__.py");
        let mixins = b.module("app.mixins", "/site/app/mixins.py");
        let real = b.class("app.mixins", "Mixin", "/site/app/mixins.py", 1, 3);
        let shadow = b.class("app", "Mixin", "/site/app/__init__.py", 1, 3);
        b.add_member(mixins, "Mixin", real);
        b.add_member(pkg, "Mixin", shadow);
        let reflector = b.build();

        let mut registry = ModuleRegistry::new(&reflector);
        assert_eq!(best_import_path(&mut registry, real), "app.mixins");
        assert_eq!(best_import_path(&mut registry, shadow), "app");
    }

    #[test]
    fn test_unimportable_parent_stops_search() {
        let mut b = GraphBuilder::new();
        let leaf = b.module("pkg.sub", "/site/pkg/sub.py");
        let class = b.class("pkg.sub", "Thing", "/site/pkg/sub.py", 1, 2);
        b.add_member(leaf, "Thing", class);
        let reflector = b.build();

        let mut registry = ModuleRegistry::new(&reflector);
        assert_eq!(best_import_path(&mut registry, class), "pkg.sub");
    }
}

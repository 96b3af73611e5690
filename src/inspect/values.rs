//
//  values.rs
//  cbv
//

//! Value normalization helpers: attribute stringification, deferred-call
//! reification, docstring cleaning, source dedent and filename handling.

use std::collections::BTreeMap;

use crate::error::{CbvError, Result};
use crate::reflect::{Argument, DeferredCall, Literal, Value};

/// Attribute names that are runtime machinery, never class configuration.
pub const RESERVED_ATTR_NAMES: &[&str] = &[
    "__all__",
    "__builtins__",
    "__class__",
    "__dict__",
    "__doc__",
    "__file__",
    "__module__",
    "__name__",
    "__package__",
    "__path__",
    "__spec__",
    "__weakref__",
];

pub fn is_reserved_name(name: &str) -> bool {
    RESERVED_ATTR_NAMES.contains(&name)
}

/// Eager -> lazy function spellings for deferred-call proxies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LazyFunctions {
    table: BTreeMap<String, String>,
}

impl Default for LazyFunctions {
    fn default() -> Self {
        let table = [
            ("gettext", "gettext_lazy"),
            ("reverse", "reverse_lazy"),
            ("ugettext", "ugettext_lazy"),
        ]
        .into_iter()
        .map(|(eager, lazy)| (eager.to_string(), lazy.to_string()))
        .collect();
        Self { table }
    }
}

impl LazyFunctions {
    /// Defaults plus `extra` mappings; extras win on conflict.
    pub fn with_extra<'a>(extra: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        let mut functions = Self::default();
        for (eager, lazy) in extra {
            functions.table.insert(eager.clone(), lazy.clone());
        }
        functions
    }

    /// The lazy spelling for an eager function name.
    pub fn lazy_name(&self, eager: &str) -> Result<&str> {
        self.table
            .get(eager)
            .map(String::as_str)
            .ok_or_else(|| CbvError::UnknownLazyFunction {
                function: eager.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

fn render_literal(literal: &Literal) -> String {
    match literal {
        Literal::Str(s) => format!("'{s}'"),
        Literal::Repr(s) => s.clone(),
    }
}

/// Render a deferred call as the literal lazy call that produced it,
/// e.g. `reverse_lazy('home', kwargs={'pk': 1})`.
pub fn reify_deferred(call: &DeferredCall, lazy: &LazyFunctions) -> Result<String> {
    let function = lazy.lazy_name(&call.function)?;
    let arguments: Vec<String> = call
        .args
        .iter()
        .map(render_literal)
        .chain(
            call.kwargs
                .iter()
                .map(|(key, value)| format!("{key}={}", render_literal(value))),
        )
        .collect();
    Ok(format!("{function}({})", arguments.join(", ")))
}

/// Stringify an attribute value for storage.
pub fn stringify(value: &Value, lazy: &LazyFunctions) -> Result<String> {
    match value {
        Value::Str(s) => Ok(format!("'{s}'")),
        Value::Repr(s) => Ok(s.clone()),
        Value::Deferred(call) => reify_deferred(call, lazy),
    }
}

/// Leading spaces and tabs, in bytes.
fn indent_width(line: &str) -> usize {
    line.len() - line.trim_start_matches([' ', '\t']).len()
}

/// Expand tabs to the next multiple of eight columns.
fn expand_tabs(line: &str) -> String {
    let mut expanded = String::with_capacity(line.len());
    let mut column = 0;
    for c in line.chars() {
        if c == '\t' {
            let pad = 8 - column % 8;
            expanded.extend(std::iter::repeat(' ').take(pad));
            column += pad;
        } else {
            expanded.push(c);
            column += 1;
        }
    }
    expanded
}

/// Clean a docstring: drop the common indentation of all lines after the
/// first, strip the first line's indentation, and drop empty lines at
/// either end. Everything else, trailing whitespace included, is kept.
pub fn clean_docstring(doc: &str) -> String {
    let lines: Vec<String> = doc.lines().map(expand_tabs).collect();
    if lines.is_empty() {
        return String::new();
    }

    let margin = lines[1..]
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| indent_width(line))
        .min()
        .unwrap_or(0);

    let mut cleaned: Vec<&str> = Vec::with_capacity(lines.len());
    cleaned.push(lines[0].trim_start());
    for line in &lines[1..] {
        let indent = indent_width(line);
        cleaned.push(&line[indent.min(margin)..]);
    }

    while cleaned.first().is_some_and(|l| l.is_empty()) {
        cleaned.remove(0);
    }
    while cleaned.last().is_some_and(|l| l.is_empty()) {
        cleaned.pop();
    }
    cleaned.join("\n")
}

/// Remove the first line's indentation from every line of a source block.
/// Lines indented less than the first only lose their own whitespace.
pub fn dedent_source(source: &str) -> String {
    let Some(first) = source.lines().next() else {
        return String::new();
    };
    let width = indent_width(first);

    source
        .split_inclusive('\n')
        .map(|line| {
            let indent = indent_width(line);
            // Whitespace-only lines: keep just the newline.
            if line.trim().is_empty() {
                return if line.ends_with('\n') { "\n" } else { "" };
            }
            &line[indent.min(width)..]
        })
        .collect()
}

/// Make a module's file path relative to the longest import-search root
/// containing it, normalizing compiled `.pyc` paths to their `.py` source.
/// Roots only match on a path-component boundary.
pub fn relative_filename(file: &str, search_roots: &[String]) -> String {
    let root = search_roots
        .iter()
        .filter(|root| !root.is_empty())
        .filter(|root| match file.strip_prefix(root.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/') || root.ends_with('/'),
            None => false,
        })
        .max_by_key(|root| root.len());

    let relative = match root {
        Some(root) => file[root.len()..].trim_start_matches('/'),
        None => file,
    };

    match relative.strip_suffix(".pyc") {
        Some(stem) => format!("{stem}.py"),
        None => relative.to_string(),
    }
}

/// Argument names without the leading receiver and, when it is variadic,
/// the trailing catch-all.
pub fn keyword_arguments(arguments: &[Argument]) -> Vec<String> {
    let Some((_receiver, rest)) = arguments.split_first() else {
        return Vec::new();
    };
    let rest = match rest.split_last() {
        Some((last, init)) if last.is_variadic() => init,
        _ => rest,
    };
    rest.iter().map(|argument| argument.name.clone()).collect()
}

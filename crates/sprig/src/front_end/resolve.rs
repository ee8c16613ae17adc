//
// front_end/resolve.rs
//
// Type-name resolution for annotation names, scoped the way javac scopes a
// simple type name: member types of the enclosing types (innermost first) and
// top-level types of the file, single-type imports, the current package,
// on-demand imports, then java.lang.
//

use super::{DeclaredType, Import, TypeBinding};
use crate::type_index::TypeIndex;

pub struct TypeResolver<'a> {
    package: Option<&'a str>,
    imports: &'a [Import],
    declared: &'a [DeclaredType],
    index: &'a TypeIndex,
}

impl<'a> TypeResolver<'a> {
    pub fn new(
        package: Option<&'a str>,
        imports: &'a [Import],
        declared: &'a [DeclaredType],
        index: &'a TypeIndex,
    ) -> Self {
        Self {
            package,
            imports,
            declared,
            index,
        }
    }

    /// Resolve a type name as written at a use site. `scope` holds the
    /// qualified names of the types enclosing the site, outermost first.
    pub fn resolve(&self, written: &str, scope: &[String]) -> Option<TypeBinding> {
        let (head, rest) = match written.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (written, None),
        };

        let Some(rest) = rest else {
            return self.resolve_simple(head, scope);
        };

        // `Outer.Inner` where `Outer` is in scope
        if let Some(outer) = self.resolve_simple(head, scope) {
            let nested = format!("{}.{}", outer.qualified_name, rest);
            if let Some(binding) = self.declared_binding(|d| d.qualified_name == nested) {
                return Some(binding);
            }
            if let Some(binding) = self.lookup(&nested) {
                return Some(binding);
            }
        }

        self.lookup(written)
    }

    fn resolve_simple(&self, name: &str, scope: &[String]) -> Option<TypeBinding> {
        // Inherited member types are not considered
        for enclosing in scope.iter().rev() {
            if let Some(binding) = self.declared_binding(|d| {
                d.simple_name == name && d.enclosing.as_deref() == Some(enclosing.as_str())
            }) {
                return Some(binding);
            }
        }
        if let Some(binding) =
            self.declared_binding(|d| d.simple_name == name && d.enclosing.is_none())
        {
            return Some(binding);
        }

        // A matching single-type import decides the name, found or not
        if let Some(import) = self
            .imports
            .iter()
            .find(|i| !i.on_demand && !i.is_static && last_segment(&i.path) == name)
        {
            return self.lookup(&import.path);
        }

        let same_package = match self.package {
            Some(package) => format!("{}.{}", package, name),
            None => name.to_string(),
        };
        if let Some(binding) = self.lookup(&same_package) {
            return Some(binding);
        }

        for import in self.imports.iter().filter(|i| i.on_demand && !i.is_static) {
            if let Some(binding) = self.lookup(&format!("{}.{}", import.path, name)) {
                return Some(binding);
            }
        }

        self.lookup(&format!("java.lang.{}", name))
    }

    fn declared_binding(&self, matches: impl Fn(&DeclaredType) -> bool) -> Option<TypeBinding> {
        self.declared
            .iter()
            .find(|d| matches(d))
            .map(|d| TypeBinding {
                qualified_name: d.qualified_name.clone(),
                record: None,
            })
    }

    fn lookup(&self, qualified: &str) -> Option<TypeBinding> {
        self.index
            .find_source_type(qualified)
            .map(|record| TypeBinding {
                qualified_name: record.qualified_name(),
                record: Some(record),
            })
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

//! Type index for package-aware type resolution.
//!
//! Short package names are ambiguous (`pkg/hub/store` and `pkg/catalog/store`
//! are both `store`), so every lookup here takes the referencing package as
//! context instead of consulting a global short-name table.

use std::collections::HashMap;

use crate::model::{Interface, Package, RawModel, Struct};

/// A named type declaration in some package.
#[derive(Debug, Clone, Copy)]
pub enum TypeDecl<'a> {
    Struct(&'a Struct),
    Interface(&'a Interface),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Struct,
    Interface,
}

impl<'a> TypeDecl<'a> {
    pub fn kind(&self) -> DeclKind {
        match self {
            TypeDecl::Struct(_) => DeclKind::Struct,
            TypeDecl::Interface(_) => DeclKind::Interface,
        }
    }

    pub fn name(&self) -> &'a str {
        match *self {
            TypeDecl::Struct(s) => &s.name,
            TypeDecl::Interface(i) => &i.name,
        }
    }

    /// Directly declared method names.
    pub fn method_names(&self) -> impl Iterator<Item = &'a str> {
        let methods = match *self {
            TypeDecl::Struct(s) => &s.methods,
            TypeDecl::Interface(i) => &i.methods,
        };
        methods.iter().map(|m| m.name.as_str())
    }
}

/// Extra information used to break ties between same-named candidates.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveContext<'c> {
    /// Full id of the package doing the referencing.
    pub referencing_package: Option<&'c str>,
    /// Method names the resolved type is known to take part in.
    pub required_methods: &'c [String],
}

/// Index of every struct and interface in a raw model, keyed by full package id.
pub struct TypeIndex<'a> {
    model: &'a RawModel,
    packages: HashMap<&'a str, &'a Package>,
    decls: HashMap<&'a str, HashMap<&'a str, TypeDecl<'a>>>,
    /// Bare type name -> full node id of its first declaration.
    first_decl: HashMap<&'a str, String>,
    /// Short package name (and last path segment) -> package ids.
    by_short_name: HashMap<&'a str, Vec<&'a str>>,
}

/// Canonical node id: `{packageFullId}.{TypeName}`.
pub fn node_id(package_id: &str, type_name: &str) -> String {
    format!("{}.{}", package_id, type_name)
}

impl<'a> TypeIndex<'a> {
    pub fn new(model: &'a RawModel) -> Self {
        let mut packages = HashMap::new();
        let mut decls: HashMap<&'a str, HashMap<&'a str, TypeDecl<'a>>> = HashMap::new();
        let mut first_decl = HashMap::new();
        let mut by_short_name: HashMap<&'a str, Vec<&'a str>> = HashMap::new();

        for pkg in &model.packages {
            let id = pkg.id.as_str();
            packages.insert(id, pkg);

            let mut short_names = vec![pkg.name.as_str()];
            let last = id.rsplit('/').next().unwrap_or(id);
            if last != pkg.name {
                short_names.push(last);
            }
            for short in short_names {
                let ids = by_short_name.entry(short).or_default();
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }

            let types = decls.entry(id).or_default();
            for iface in &pkg.interfaces {
                types.entry(iface.name.as_str()).or_insert(TypeDecl::Interface(iface));
                first_decl
                    .entry(iface.name.as_str())
                    .or_insert_with(|| node_id(id, &iface.name));
            }
            for s in &pkg.structs {
                types.entry(s.name.as_str()).or_insert(TypeDecl::Struct(s));
                first_decl
                    .entry(s.name.as_str())
                    .or_insert_with(|| node_id(id, &s.name));
            }
        }

        TypeIndex {
            model,
            packages,
            decls,
            first_decl,
            by_short_name,
        }
    }

    pub fn model(&self) -> &'a RawModel {
        self.model
    }

    pub fn package(&self, id: &str) -> Option<&'a Package> {
        self.packages.get(id).copied()
    }

    pub fn lookup(&self, package_id: &str, type_name: &str) -> Option<TypeDecl<'a>> {
        self.decls.get(package_id)?.get(type_name).copied()
    }

    /// Declaration behind a `{package}.{Type}` node id.
    pub fn lookup_node(&self, node_id: &str) -> Option<TypeDecl<'a>> {
        let (package_id, type_name) = node_id.rsplit_once('.')?;
        self.lookup(package_id, type_name)
    }

    pub fn declares(&self, package_id: &str, type_name: &str) -> bool {
        self.lookup(package_id, type_name).is_some()
    }

    fn declares_kind(&self, package_id: &str, type_name: &str, kind: DeclKind) -> bool {
        self.lookup(package_id, type_name)
            .is_some_and(|d| d.kind() == kind)
    }

    /// Node id of `type_name` if `package_id` declares it.
    pub fn node_id_in(&self, package_id: &str, type_name: &str) -> Option<String> {
        self.declares(package_id, type_name)
            .then(|| node_id(package_id, type_name))
    }

    /// Resolve a package reference that may be a full id, a module-qualified
    /// import path or a bare short name, to the full id of the package that
    /// declares `type_name` with the given kind.
    ///
    /// Returns `None` when nothing matches or when candidates stay ambiguous.
    pub fn resolve_package(
        &self,
        reference: &str,
        type_name: &str,
        kind: DeclKind,
        ctx: ResolveContext<'_>,
    ) -> Option<&'a str> {
        if let Some((&id, _)) = self.packages.get_key_value(reference) {
            if self.declares_kind(id, type_name, kind) {
                return Some(id);
            }
        }

        if let Some(rest) = self.strip_module(reference) {
            if let Some((&id, _)) = self.packages.get_key_value(rest) {
                if self.declares_kind(id, type_name, kind) {
                    return Some(id);
                }
            }
        }

        let short = reference.rsplit('/').next().unwrap_or(reference);
        let candidates: Vec<&'a str> = self
            .by_short_name
            .get(short)
            .into_iter()
            .flatten()
            .copied()
            .filter(|id| self.declares_kind(id, type_name, kind))
            .filter(|id| {
                reference == short
                    || path_has_suffix(id, reference)
                    || path_has_suffix(reference, id)
            })
            .collect();

        match candidates.as_slice() {
            [] => None,
            [only] => Some(*only),
            _ => self.disambiguate(&candidates, type_name, ctx),
        }
    }

    fn disambiguate(
        &self,
        candidates: &[&'a str],
        type_name: &str,
        ctx: ResolveContext<'_>,
    ) -> Option<&'a str> {
        if let Some(referencing) = ctx.referencing_package {
            if let Some(&id) = candidates.iter().find(|id| **id == referencing) {
                return Some(id);
            }
        }

        if !ctx.required_methods.is_empty() {
            let covering: Vec<&'a str> = candidates
                .iter()
                .copied()
                .filter(|id| {
                    self.lookup(id, type_name)
                        .is_some_and(|decl| covers(decl, ctx.required_methods))
                })
                .collect();
            if let [only] = covering.as_slice() {
                return Some(*only);
            }
        }

        tracing::debug!(
            type_name,
            candidates = candidates.len(),
            "ambiguous package reference, skipping"
        );
        None
    }

    /// Resolve `qualifier.Name` written inside `referencing_package`.
    pub fn resolve_qualified(
        &self,
        referencing_package: &str,
        qualifier: &str,
        type_name: &str,
    ) -> Option<String> {
        if let Some(pkg) = self.package(referencing_package) {
            for import in pkg.imports.iter().filter(|i| i.local_name() == qualifier) {
                if let Some(id) = self.package_for_import(&import.path, type_name) {
                    return Some(node_id(id, type_name));
                }
            }
        }

        let candidates: Vec<&'a str> = self
            .by_short_name
            .get(qualifier)
            .into_iter()
            .flatten()
            .copied()
            .filter(|id| self.declares(id, type_name))
            .collect();

        match candidates.as_slice() {
            [] => None,
            [only] => Some(node_id(only, type_name)),
            _ => {
                let mut best: Option<&str> = None;
                let mut best_len = 0;
                let mut tied = false;
                for &id in &candidates {
                    let len = common_prefix_segments(referencing_package, id);
                    if best.is_none() || len > best_len {
                        best = Some(id);
                        best_len = len;
                        tied = false;
                    } else if len == best_len {
                        tied = true;
                    }
                }
                if tied {
                    tracing::debug!(qualifier, type_name, "ambiguous qualified type, skipping");
                    None
                } else {
                    best.map(|id| node_id(id, type_name))
                }
            }
        }
    }

    /// Resolve an unqualified type name: the referencing package first,
    /// then the first declaration anywhere in the model.
    pub fn resolve_bare(&self, referencing_package: &str, type_name: &str) -> Option<String> {
        self.node_id_in(referencing_package, type_name)
            .or_else(|| self.first_decl.get(type_name).cloned())
    }

    /// Package id for an import path that declares `type_name`.
    fn package_for_import(&self, import_path: &str, type_name: &str) -> Option<&'a str> {
        self.model
            .packages
            .iter()
            .map(|p| p.id.as_str())
            .find(|id| {
                let matches_path = *id == import_path
                    || self.strip_module(import_path) == Some(*id)
                    || path_has_suffix(import_path, id);
                matches_path && self.declares(id, type_name)
            })
    }

    fn strip_module<'r>(&self, reference: &'r str) -> Option<&'r str> {
        let module = self.model.module_name.as_str();
        if module.is_empty() {
            return None;
        }
        reference
            .strip_prefix(module)
            .and_then(|rest| rest.strip_prefix('/'))
    }
}

/// Whether a declaration is consistent with the given method names: a struct
/// must provide all of them; a non-empty interface must ask for no others.
fn covers(decl: TypeDecl<'_>, required: &[String]) -> bool {
    match decl {
        TypeDecl::Struct(_) => required
            .iter()
            .all(|r| decl.method_names().any(|m| m == r)),
        TypeDecl::Interface(_) => {
            let mut names = decl.method_names().peekable();
            names.peek().is_some() && names.all(|m| required.iter().any(|r| r == m))
        }
    }
}

fn common_prefix_segments(a: &str, b: &str) -> usize {
    a.split('/')
        .zip(b.split('/'))
        .take_while(|(x, y)| x == y)
        .count()
}

/// `path` equals `suffix` or ends with it at a `/` boundary.
fn path_has_suffix(path: &str, suffix: &str) -> bool {
    path.strip_suffix(suffix)
        .is_some_and(|rest| rest.is_empty() || rest.ends_with('/'))
}

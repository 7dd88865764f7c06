//! Structural interface matching
//!
//! Go has no `implements` keyword, so implementations are inferred by
//! comparing method sets over the full struct x interface cross-product.
//! Results always carry full package ids.

use std::collections::HashMap;

use archatlas_core::{
    ImplementationSource, InferredImplementation, Method, Package, RawModel, Struct, TypeDecl,
    TypeIndex,
};

use crate::type_ref::TypeRef;

/// Every interface method matched by name, parameter types and return types.
pub const EXACT_SIGNATURE_CONFIDENCE: f32 = 1.0;
/// Every interface method matched by name, at least one signature differs.
pub const NAME_ONLY_CONFIDENCE: f32 = 0.8;

/// Method set keyed by name, in declaration order.
struct MethodSet<'a> {
    order: Vec<&'a str>,
    by_name: HashMap<&'a str, &'a Method>,
}

impl<'a> MethodSet<'a> {
    fn new() -> Self {
        MethodSet {
            order: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// First insertion of a name wins, so own methods shadow promoted ones.
    fn insert(&mut self, method: &'a Method) {
        if !self.by_name.contains_key(method.name.as_str()) {
            self.order.push(&method.name);
            self.by_name.insert(&method.name, method);
        }
    }

    fn extend(&mut self, methods: &'a [Method]) {
        for m in methods {
            self.insert(m);
        }
    }

    fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

pub struct InterfaceMatcher<'a> {
    index: &'a TypeIndex<'a>,
}

impl<'a> InterfaceMatcher<'a> {
    pub fn new(index: &'a TypeIndex<'a>) -> Self {
        InterfaceMatcher { index }
    }

    /// Match every struct against every interface in the model.
    pub fn match_all(&self) -> Vec<InferredImplementation> {
        let model = self.index.model();

        let interfaces: Vec<(&Package, &str, MethodSet<'a>)> = model
            .packages
            .iter()
            .flat_map(|pkg| pkg.interfaces.iter().map(move |i| (pkg, i)))
            .filter_map(|(pkg, iface)| {
                let set = self.interface_method_set(pkg, &iface.methods, &iface.embedded_interfaces);
                (!set.is_empty()).then_some((pkg, iface.name.as_str(), set))
            })
            .collect();

        let mut results = Vec::new();
        for pkg in &model.packages {
            for s in &pkg.structs {
                let struct_set = self.struct_method_set(pkg, s);
                if struct_set.is_empty() {
                    continue;
                }
                for (iface_pkg, iface_name, iface_set) in &interfaces {
                    if let Some(confidence) = compare(&struct_set, iface_set) {
                        results.push(InferredImplementation {
                            struct_name: s.name.clone(),
                            struct_package_id: pkg.id.clone(),
                            interface_name: iface_name.to_string(),
                            interface_package_id: iface_pkg.id.clone(),
                            confidence,
                            matched_methods: iface_set.order.iter().map(|m| m.to_string()).collect(),
                            source: ImplementationSource::Inferred,
                        });
                    }
                }
            }
        }

        tracing::debug!(implementations = results.len(), "interface matching complete");
        results
    }

    /// Own methods plus one level of methods promoted from embedded types.
    fn struct_method_set(&self, pkg: &'a Package, s: &'a Struct) -> MethodSet<'a> {
        let mut set = MethodSet::new();
        set.extend(&s.methods);

        let embedded = s
            .embedded_types
            .iter()
            .map(String::as_str)
            .chain(s.fields.iter().filter(|f| f.embedded).map(|f| f.type_text.as_str()));
        for type_text in embedded {
            match self.resolve_decl(pkg, type_text) {
                Some(TypeDecl::Struct(inner)) => set.extend(&inner.methods),
                Some(TypeDecl::Interface(inner)) => set.extend(&inner.methods),
                None => tracing::trace!(embedded = type_text, "unresolved embedded type"),
            }
        }
        set
    }

    fn interface_method_set(
        &self,
        pkg: &'a Package,
        methods: &'a [Method],
        embedded: &'a [String],
    ) -> MethodSet<'a> {
        let mut set = MethodSet::new();
        set.extend(methods);
        for type_text in embedded {
            match self.resolve_decl(pkg, type_text) {
                Some(TypeDecl::Interface(inner)) => set.extend(&inner.methods),
                _ => tracing::trace!(embedded = %type_text, "unresolved embedded interface"),
            }
        }
        set
    }

    fn resolve_decl(&self, pkg: &Package, type_text: &str) -> Option<TypeDecl<'a>> {
        let node_id = TypeRef::parse(type_text)?.resolve(self.index, &pkg.id)?;
        self.index.lookup_node(&node_id)
    }
}

/// Run the matcher over a model.
pub fn match_implementations(model: &RawModel) -> Vec<InferredImplementation> {
    let index = TypeIndex::new(model);
    InterfaceMatcher::new(&index).match_all()
}

/// Confidence if the struct covers every interface method by name.
fn compare(struct_set: &MethodSet<'_>, iface_set: &MethodSet<'_>) -> Option<f32> {
    let mut exact = true;
    for name in &iface_set.order {
        let struct_method = struct_set.by_name.get(name)?;
        let iface_method = iface_set.by_name.get(name)?;
        if !same_signature(struct_method, iface_method) {
            exact = false;
        }
    }
    Some(if exact {
        EXACT_SIGNATURE_CONFIDENCE
    } else {
        NAME_ONLY_CONFIDENCE
    })
}

fn same_signature(a: &Method, b: &Method) -> bool {
    let params = |m: &Method| m.parameters.iter().map(|p| squash(&p.type_text)).collect::<Vec<_>>();
    let returns = |m: &Method| m.return_types.iter().map(|r| squash(r)).collect::<Vec<_>>();
    params(a) == params(b) && returns(a) == returns(b)
}

/// Type text with all whitespace removed.
fn squash(type_text: &str) -> String {
    type_text.chars().filter(|c| !c.is_whitespace()).collect()
}

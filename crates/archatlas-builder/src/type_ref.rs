//! Normalization of Go type text into resolvable type references

use archatlas_core::TypeIndex;

/// A named type reference, optionally package-qualified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeRef<'t> {
    pub qualifier: Option<&'t str>,
    pub name: &'t str,
}

impl<'t> TypeRef<'t> {
    /// Strip pointer markers and slice/array brackets, then parse `Name` or
    /// `pkg.Name`. Maps, channels, funcs, generics and inline types yield `None`.
    pub fn parse(type_text: &'t str) -> Option<Self> {
        let mut t = type_text.trim();
        loop {
            let before = t;
            t = t.trim_start_matches('*').trim_start();
            if let Some(rest) = t.strip_prefix('[') {
                let close = rest.find(']')?;
                if !rest[..close].chars().all(is_ident_char) {
                    return None;
                }
                t = rest[close + 1..].trim_start();
            }
            if t == before {
                break;
            }
        }

        let mut parts = t.split('.');
        let first = parts.next()?;
        let second = parts.next();
        if parts.next().is_some() {
            return None;
        }

        let type_ref = match second {
            Some(name) => TypeRef {
                qualifier: Some(first),
                name,
            },
            None => TypeRef {
                qualifier: None,
                name: first,
            },
        };

        let valid = is_ident(type_ref.name) && type_ref.qualifier.is_none_or(is_ident);
        if !valid || is_keyword_type(type_ref.name) {
            return None;
        }
        Some(type_ref)
    }

    /// Node id of the referenced type, resolved from `referencing_package`.
    pub fn resolve(&self, index: &TypeIndex<'_>, referencing_package: &str) -> Option<String> {
        match self.qualifier {
            Some(qualifier) => index.resolve_qualified(referencing_package, qualifier, self.name),
            None => index.resolve_bare(referencing_package, self.name),
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_ident(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_ident_char) && !s.starts_with(|c: char| c.is_ascii_digit())
}

/// Type constructors that look like identifiers after stripping.
fn is_keyword_type(name: &str) -> bool {
    matches!(name, "map" | "chan" | "func" | "interface" | "struct")
}

//! Raw Model: per-package syntax facts produced by the extraction front end.
//!
//! These types are read-only inputs. Every derived graph is built from one
//! `RawModel` snapshot and never writes back into it.

use serde::{Deserialize, Serialize};

/// Where a fact was found in source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceLocation {
    pub file: String,
    pub start_line: u32,
    pub end_line: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        SourceLocation {
            file: file.into(),
            start_line: line,
            end_line: line,
        }
    }

    /// `file:line` reference used in edge contexts.
    pub fn reference(&self) -> String {
        format!("{}:{}", self.file, self.start_line)
    }
}

/// A struct field, or a parameter of a method/function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Field {
    pub name: String,
    /// Declared type as written, e.g. `*store.Store` or `[]Handler`.
    #[serde(rename = "type")]
    pub type_text: String,
    pub tag: Option<String>,
    pub exported: bool,
    pub embedded: bool,
    pub location: SourceLocation,
}

impl Field {
    pub fn new(name: impl Into<String>, type_text: impl Into<String>) -> Self {
        let name = name.into();
        Field {
            exported: is_exported(&name),
            name,
            type_text: type_text.into(),
            ..Default::default()
        }
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = location;
        self
    }
}

/// A method on a struct or in an interface method set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Method {
    pub name: String,
    pub receiver_type: Option<String>,
    pub parameters: Vec<Field>,
    pub return_types: Vec<String>,
    pub exported: bool,
    pub location: SourceLocation,
    pub body: Option<FunctionBody>,
}

impl Method {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Method {
            exported: is_exported(&name),
            name,
            ..Default::default()
        }
    }

    /// Set parameter types; parameter names are irrelevant for matching.
    pub fn with_params(mut self, types: &[&str]) -> Self {
        self.parameters = types
            .iter()
            .enumerate()
            .map(|(i, t)| Field::new(format!("p{i}"), *t))
            .collect();
        self
    }

    pub fn with_returns(mut self, types: &[&str]) -> Self {
        self.return_types = types.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_body(mut self, body: FunctionBody) -> Self {
        self.body = Some(body);
        self
    }
}

/// Behavior facts extracted from a function or method body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FunctionBody {
    pub calls: Vec<CallExpr>,
    pub go_spawns: Vec<SpawnStmt>,
    pub channel_ops: Vec<ChannelOp>,
}

impl FunctionBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_call(mut self, call: CallExpr) -> Self {
        self.calls.push(call);
        self
    }

    pub fn with_spawn(mut self, spawn: SpawnStmt) -> Self {
        self.go_spawns.push(spawn);
        self
    }

    pub fn with_channel_op(mut self, op: ChannelOp) -> Self {
        self.channel_ops.push(op);
        self
    }
}

/// Function name used by the front end for `go func() { ... }()` spawns.
pub const ANONYMOUS_FUNCTION: &str = "<anonymous>";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CallExpr {
    pub function_name: String,
    /// Package qualifier at the call site (`fmt` in `fmt.Println`).
    pub package_name: Option<String>,
    pub receiver_type: Option<String>,
    /// Raw argument text, e.g. `["\"/users\"", "listUsers"]`.
    pub args: Vec<String>,
    pub location: SourceLocation,
}

impl CallExpr {
    pub fn new(function_name: impl Into<String>) -> Self {
        CallExpr {
            function_name: function_name.into(),
            ..Default::default()
        }
    }

    pub fn qualified(package_name: impl Into<String>, function_name: impl Into<String>) -> Self {
        CallExpr {
            function_name: function_name.into(),
            package_name: Some(package_name.into()),
            ..Default::default()
        }
    }

    pub fn with_receiver(mut self, receiver_type: impl Into<String>) -> Self {
        self.receiver_type = Some(receiver_type.into());
        self
    }

    pub fn with_args(mut self, args: &[&str]) -> Self {
        self.args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = location;
        self
    }

    pub fn is_anonymous(&self) -> bool {
        self.function_name == ANONYMOUS_FUNCTION
    }

    /// `pkg.Func` when the call is package-qualified, otherwise the bare name.
    pub fn display_target(&self) -> String {
        match &self.package_name {
            Some(pkg) if !pkg.is_empty() => format!("{}.{}", pkg, self.function_name),
            _ => self.function_name.clone(),
        }
    }
}

/// A `go` statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SpawnStmt {
    pub call: CallExpr,
    pub location: SourceLocation,
    /// Concurrency pattern recognized by the front end, e.g. `worker-pool`.
    pub pattern_hint: Option<String>,
}

impl SpawnStmt {
    pub fn new(call: CallExpr, location: SourceLocation) -> Self {
        SpawnStmt {
            call,
            location,
            pattern_hint: None,
        }
    }

    pub fn with_pattern_hint(mut self, hint: impl Into<String>) -> Self {
        self.pattern_hint = Some(hint.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOperation {
    Make,
    Send,
    Receive,
    Close,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelOp {
    pub channel_name: String,
    pub operation: ChannelOperation,
    /// Channel type text for `make` operations, e.g. `chan Job` or `<-chan int`.
    #[serde(default)]
    pub element_type: Option<String>,
    #[serde(default)]
    pub buffer_size: Option<u32>,
    #[serde(default)]
    pub location: SourceLocation,
}

impl ChannelOp {
    pub fn new(
        channel_name: impl Into<String>,
        operation: ChannelOperation,
        location: SourceLocation,
    ) -> Self {
        ChannelOp {
            channel_name: channel_name.into(),
            operation,
            element_type: None,
            buffer_size: None,
            location,
        }
    }

    pub fn with_element_type(mut self, element_type: impl Into<String>) -> Self {
        self.element_type = Some(element_type.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Struct {
    pub name: String,
    /// Short name of the owning package (`store`, not `pkg/hub/store`).
    pub package_name: String,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
    pub embedded_types: Vec<String>,
    pub exported: bool,
    pub location: SourceLocation,
}

impl Struct {
    pub fn new(name: impl Into<String>, package_name: impl Into<String>) -> Self {
        let name = name.into();
        Struct {
            exported: is_exported(&name),
            name,
            package_name: package_name.into(),
            ..Default::default()
        }
    }

    pub fn with_field(mut self, name: &str, type_text: &str) -> Self {
        self.fields.push(Field::new(name, type_text));
        self
    }

    pub fn with_located_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_embedded(mut self, type_name: &str) -> Self {
        self.embedded_types.push(type_name.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Interface {
    pub name: String,
    pub package_name: String,
    pub methods: Vec<Method>,
    pub embedded_interfaces: Vec<String>,
    pub exported: bool,
    pub location: SourceLocation,
}

impl Interface {
    pub fn new(name: impl Into<String>, package_name: impl Into<String>) -> Self {
        let name = name.into();
        Interface {
            exported: is_exported(&name),
            name,
            package_name: package_name.into(),
            ..Default::default()
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_embedded(mut self, interface_name: &str) -> Self {
        self.embedded_interfaces.push(interface_name.to_string());
        self
    }
}

/// A standalone (non-method) function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Function {
    pub name: String,
    pub package_name: String,
    pub parameters: Vec<Field>,
    pub return_types: Vec<String>,
    pub exported: bool,
    pub location: SourceLocation,
    pub body: Option<FunctionBody>,
}

impl Function {
    pub fn new(name: impl Into<String>, package_name: impl Into<String>) -> Self {
        let name = name.into();
        Function {
            exported: is_exported(&name),
            name,
            package_name: package_name.into(),
            ..Default::default()
        }
    }

    pub fn with_body(mut self, body: FunctionBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = location;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Import {
    pub path: String,
    pub alias: Option<String>,
    pub location: SourceLocation,
}

impl Import {
    pub fn new(path: impl Into<String>) -> Self {
        Import {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Name this import is referenced by inside the importing file.
    pub fn local_name(&self) -> &str {
        match self.alias.as_deref() {
            Some(alias) if !alias.is_empty() && alias != "_" && alias != "." => alias,
            _ => self.path.rsplit('/').next().unwrap_or(&self.path),
        }
    }
}

/// One package (all files of one directory).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Package {
    /// Full, module-relative package id (`pkg/hub/store`). This is the
    /// disambiguation key: several packages may share one short `name`.
    #[serde(alias = "fullName")]
    pub id: String,
    /// Short package name as declared in source (`store`).
    pub name: String,
    pub dir_path: String,
    pub source_files: Vec<String>,
    pub imports: Vec<Import>,
    pub structs: Vec<Struct>,
    pub interfaces: Vec<Interface>,
    pub functions: Vec<Function>,
}

impl Package {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let id = id.into();
        Package {
            dir_path: id.clone(),
            id,
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_struct(mut self, s: Struct) -> Self {
        self.structs.push(s);
        self
    }

    pub fn with_interface(mut self, i: Interface) -> Self {
        self.interfaces.push(i);
        self
    }

    pub fn with_function(mut self, f: Function) -> Self {
        self.functions.push(f);
        self
    }

    pub fn with_import(mut self, path: &str) -> Self {
        self.imports.push(Import::new(path));
        self
    }

    pub fn with_source_file(mut self, file: &str) -> Self {
        self.source_files.push(file.to_string());
        self
    }
}

/// Where an implementation fact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImplementationSource {
    Explicit,
    #[default]
    Inferred,
    Gopls,
}

/// "Struct X satisfies interface Y". Package ids may be short names when
/// supplied by a front end; builders resolve them against the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct InferredImplementation {
    pub struct_name: String,
    pub struct_package_id: String,
    pub interface_name: String,
    pub interface_package_id: String,
    pub confidence: f32,
    pub matched_methods: Vec<String>,
    pub source: ImplementationSource,
}

/// Front-end counters carried through to atlas metadata.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FrontEndStats {
    pub parse_time_ms: f64,
    pub memory_usage: u64,
}

/// Immutable snapshot of a whole codebase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RawModel {
    pub packages: Vec<Package>,
    pub module_name: String,
    pub module_root: String,
    /// Precomputed implementations. `None` (or empty) triggers interface matching.
    pub implementations: Option<Vec<InferredImplementation>>,
    pub stats: Option<FrontEndStats>,
}

impl RawModel {
    pub fn new(packages: Vec<Package>) -> Self {
        RawModel {
            packages,
            ..Default::default()
        }
    }

    pub fn with_module_name(mut self, module_name: impl Into<String>) -> Self {
        self.module_name = module_name.into();
        self
    }

    pub fn with_implementations(mut self, implementations: Vec<InferredImplementation>) -> Self {
        self.implementations = Some(implementations);
        self
    }

    pub fn file_count(&self) -> usize {
        self.packages.iter().map(|p| p.source_files.len()).sum()
    }

    /// Supplied implementations, if any were provided.
    pub fn supplied_implementations(&self) -> Option<&[InferredImplementation]> {
        self.implementations
            .as_deref()
            .filter(|impls| !impls.is_empty())
    }
}

/// Go export rule: identifiers starting with an upper-case letter are exported.
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_uppercase())
}

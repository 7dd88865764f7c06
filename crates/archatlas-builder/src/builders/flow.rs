//! Flow graph builder: entry points and the call chains they trigger

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::LazyLock;

use archatlas_core::{
    Call, CallChain, CallExpr, CallKind, EntryPoint, FlowGraph, FunctionBody, HttpMethod,
    NodeLocation, Package, RawModel, TypeDecl, TypeIndex,
};
use archatlas_core::HttpMethod::{Any, Delete, Get, Patch, Post, Put};
use regex::Regex;

use super::{LayerBuilder, UniqueIds};
use crate::config::{CustomFramework, FlowOptions, ManualEntryPoint};
use crate::frameworks::{MAIN, NET_HTTP};
use crate::type_ref::TypeRef;

pub const DIRECT_CALL_CONFIDENCE: f32 = 0.7;
pub const INTERFACE_CALL_CONFIDENCE: f32 = 0.6;
pub const INDIRECT_CALL_CONFIDENCE: f32 = 0.5;

/// Where the route path of a registration call comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathSource {
    Arg(usize),
    /// Service name derived from `RegisterXxxServer`.
    ServiceName,
}

/// Where the handler of a registration call comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandlerSource {
    Arg(usize),
    /// Last argument; the ones between path and handler are middleware (gin).
    LastArg,
    /// Fixed index; every later argument is middleware (echo).
    ArgThenMiddleware(usize),
}

#[derive(Debug, Clone)]
struct CallPattern {
    framework: String,
    protocol: String,
    method: Option<String>,
    method_suffix: Option<String>,
    receiver_contains: Option<String>,
    http_method: Option<HttpMethod>,
    path: PathSource,
    handler: HandlerSource,
}

impl CallPattern {
    fn matches(&self, call: &CallExpr) -> bool {
        if self.method.as_deref().is_some_and(|m| call.function_name != m) {
            return false;
        }
        if self
            .method_suffix
            .as_deref()
            .is_some_and(|s| !call.function_name.ends_with(s))
        {
            return false;
        }
        match (self.receiver_contains.as_deref(), call.receiver_type.as_deref()) {
            (Some(wanted), Some(receiver)) => receiver.contains(wanted),
            (Some(_), None) => false,
            (None, _) => true,
        }
    }
}

struct BuiltinPattern {
    method: &'static str,
    suffix: bool,
    receiver: Option<&'static str>,
    http_method: Option<HttpMethod>,
}

const fn exact(method: &'static str, http_method: Option<HttpMethod>) -> BuiltinPattern {
    BuiltinPattern {
        method,
        suffix: false,
        receiver: None,
        http_method,
    }
}

const fn on_receiver(method: &'static str, receiver: &'static str) -> BuiltinPattern {
    BuiltinPattern {
        method,
        suffix: false,
        receiver: Some(receiver),
        http_method: None,
    }
}

/// Built-in registration patterns, in precedence order. Receiver-specific
/// patterns come before the generic ones they overlap with.
const FRAMEWORK_PATTERNS: &[(&str, &str, &[BuiltinPattern])] = &[
    (
        "gorilla/mux",
        "http",
        &[on_receiver("Handle", "mux.Router"), on_receiver("HandleFunc", "mux.Router")],
    ),
    (NET_HTTP, "http", &[exact("HandleFunc", None), exact("Handle", None)]),
    (
        "gin",
        "http",
        &[
            exact("GET", Some(Get)),
            exact("POST", Some(Post)),
            exact("PUT", Some(Put)),
            exact("DELETE", Some(Delete)),
            exact("PATCH", Some(Patch)),
            exact("Any", Some(Any)),
        ],
    ),
    (
        "echo",
        "http",
        &[
            exact("GET", Some(Get)),
            exact("POST", Some(Post)),
            exact("PUT", Some(Put)),
            exact("DELETE", Some(Delete)),
            exact("PATCH", Some(Patch)),
        ],
    ),
    (
        "chi",
        "http",
        &[
            exact("Get", Some(Get)),
            exact("Post", Some(Post)),
            exact("Put", Some(Put)),
            exact("Delete", Some(Delete)),
            exact("Patch", Some(Patch)),
        ],
    ),
    ("cobra", "cli", &[exact("AddCommand", None)]),
    (
        "grpc",
        "grpc",
        &[BuiltinPattern {
            method: "Server",
            suffix: true,
            receiver: None,
            http_method: None,
        }],
    ),
    ("kafka-go", "message", &[exact("ConsumePartition", None)]),
    ("sarama", "message", &[exact("ConsumePartition", None)]),
    ("nats", "message", &[exact("Subscribe", None), exact("QueueSubscribe", None)]),
    ("cron", "scheduler", &[exact("AddFunc", None), exact("AddJob", None)]),
];

/// Active patterns for the detected frameworks followed by custom ones.
fn active_patterns(
    detected: &BTreeSet<String>,
    custom: &[CustomFramework],
) -> Vec<CallPattern> {
    let mut patterns = Vec::new();

    for (framework, protocol, builtins) in FRAMEWORK_PATTERNS {
        if !detected.contains(*framework) {
            continue;
        }
        for b in *builtins {
            let handler = match *framework {
                "gin" => HandlerSource::LastArg,
                "echo" => HandlerSource::ArgThenMiddleware(1),
                _ => HandlerSource::Arg(1),
            };
            patterns.push(CallPattern {
                framework: framework.to_string(),
                protocol: protocol.to_string(),
                method: (!b.suffix).then(|| b.method.to_string()),
                method_suffix: b.suffix.then(|| b.method.to_string()),
                receiver_contains: b.receiver.map(str::to_string),
                http_method: b.http_method,
                path: if b.suffix {
                    PathSource::ServiceName
                } else {
                    PathSource::Arg(0)
                },
                handler,
            });
        }
    }

    for framework in custom {
        for p in &framework.patterns {
            patterns.push(CallPattern {
                framework: framework.name.clone(),
                protocol: framework.protocol.clone(),
                method: p.method.clone(),
                method_suffix: p.method_suffix.clone(),
                receiver_contains: p.receiver_contains.clone(),
                http_method: None,
                path: PathSource::Arg(p.path_arg_index.unwrap_or(0)),
                handler: HandlerSource::Arg(p.handler_arg_index.unwrap_or(1)),
            });
        }
    }

    patterns
}

/// Entry point kind tag from protocol and HTTP method.
pub fn entry_kind(protocol: &str, method: Option<HttpMethod>) -> String {
    match (protocol, method) {
        ("http", Some(m)) => format!("http-{}", m.as_str().to_ascii_lowercase()),
        ("http", None) => "http-handler".to_string(),
        ("grpc", _) => "grpc-unary".to_string(),
        ("cli", _) => "cli-command".to_string(),
        ("message", _) => "message-consumer".to_string(),
        ("scheduler", _) => "scheduler-job".to_string(),
        (other, _) => other.to_string(),
    }
}

const STDLIB_PREFIXES: &[&str] = &[
    "fmt", "json", "strconv", "time", "errors", "strings", "sort", "sync", "io", "bytes", "math",
    "os", "log", "context", "net", "http", "reflect", "unicode", "filepath", "path", "regexp",
    "bufio", "runtime",
];

const BUILTINS: &[&str] = &[
    "make", "len", "append", "cap", "new", "delete", "copy", "close", "panic", "recover", "print",
    "println", "int", "int8", "int16", "int32", "int64", "uint", "uint8", "uint16", "uint32",
    "uint64", "string", "bool", "float32", "float64", "byte", "rune", "error",
];

static REQUEST_PLUMBING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^r\.(URL|Context|Body|Header|PathValue|Method|Form)").expect("static regex")
});

/// Builtins, standard library calls and request/response plumbing.
pub fn is_noisy_call(target: &str) -> bool {
    if BUILTINS.contains(&target) {
        return true;
    }
    if let Some((pkg, _)) = target.split_once('.') {
        if STDLIB_PREFIXES.contains(&pkg) {
            return true;
        }
    }
    target.starts_with("w.")
        || target.starts_with("ctx.")
        || target.starts_with("err.")
        || REQUEST_PLUMBING.is_match(target)
}

/// Options derived from config plus detected frameworks.
#[derive(Debug, Clone, Default)]
pub struct FlowBuildOptions {
    pub detected_frameworks: BTreeSet<String>,
    pub protocols: Option<Vec<String>>,
    pub custom_frameworks: Vec<CustomFramework>,
    pub entry_points: Vec<ManualEntryPoint>,
    pub max_call_depth: usize,
}

impl FlowBuildOptions {
    pub fn new(detected_frameworks: BTreeSet<String>, flow: &FlowOptions) -> Self {
        FlowBuildOptions {
            detected_frameworks,
            protocols: flow.protocols.clone(),
            custom_frameworks: flow.custom_frameworks.clone(),
            entry_points: flow.entry_points.clone(),
            max_call_depth: flow.effective_call_depth(),
        }
    }
}

pub struct FlowGraphBuilder {
    options: FlowBuildOptions,
    patterns: Vec<CallPattern>,
}

impl FlowGraphBuilder {
    pub fn new(options: FlowBuildOptions) -> Self {
        let patterns = active_patterns(&options.detected_frameworks, &options.custom_frameworks);
        FlowGraphBuilder { options, patterns }
    }

    fn detect_entry_points(&self, model: &RawModel) -> Vec<EntryPoint> {
        let mut ids = UniqueIds::default();
        let mut entries = Vec::new();

        for pkg in &model.packages {
            for body in bodies(pkg) {
                for call in &body.calls {
                    if let Some(entry) = self.match_call(call, pkg, &mut ids) {
                        entries.push(entry);
                    }
                }
            }

            if pkg.name == MAIN && self.options.detected_frameworks.contains(MAIN) {
                for func in pkg.functions.iter().filter(|f| f.name == "main") {
                    entries.push(EntryPoint {
                        id: ids.claim(format!("entry-{}-main", pkg.id)),
                        kind: entry_kind("cli", None),
                        protocol: "cli".to_string(),
                        method: None,
                        framework: MAIN.to_string(),
                        path: String::new(),
                        handler: "main.main".to_string(),
                        middleware: Vec::new(),
                        package: Some(pkg.id.clone()),
                        location: NodeLocation {
                            file: func.location.file.clone(),
                            line: func.location.start_line,
                        },
                    });
                }
            }
        }

        for manual in &self.options.entry_points {
            let sanitized: String = manual
                .function
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                .collect();
            entries.push(EntryPoint {
                id: ids.claim(format!("entry-manual-{}", sanitized)),
                kind: entry_kind(&manual.protocol, None),
                protocol: manual.protocol.clone(),
                method: None,
                framework: "manual".to_string(),
                path: String::new(),
                handler: manual.function.clone(),
                middleware: Vec::new(),
                package: None,
                location: NodeLocation {
                    file: "manual".to_string(),
                    line: 0,
                },
            });
        }

        entries
    }

    fn match_call(&self, call: &CallExpr, pkg: &Package, ids: &mut UniqueIds) -> Option<EntryPoint> {
        let pattern = self.patterns.iter().find(|p| p.matches(call))?;
        let args = &call.args;

        let (path_index, path) = match pattern.path {
            PathSource::Arg(i) => (Some(i), args.get(i).map(|a| unquote(a)).unwrap_or_default()),
            PathSource::ServiceName => (None, service_name(&call.function_name)),
        };

        let (handler, middleware): (String, Vec<String>) = match pattern.handler {
            HandlerSource::Arg(i) => (handler_text(args.get(i)), Vec::new()),
            HandlerSource::LastArg => {
                let last = args.len().checked_sub(1);
                let middleware = args
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| Some(*i) != path_index && Some(*i) != last)
                    .map(|(_, a)| a.trim().to_string())
                    .filter(|a| !is_closure(a))
                    .collect();
                let handler = match last {
                    Some(l) if Some(l) != path_index => handler_text(args.get(l)),
                    _ => String::new(),
                };
                (handler, middleware)
            }
            HandlerSource::ArgThenMiddleware(i) => (
                handler_text(args.get(i)),
                args.iter()
                    .skip(i + 1)
                    .map(|a| a.trim().to_string())
                    .filter(|a| !is_closure(a))
                    .collect(),
            ),
        };

        Some(EntryPoint {
            id: ids.claim(format!("entry-{}-{}", pkg.id, call.location.start_line)),
            kind: entry_kind(&pattern.protocol, pattern.http_method),
            protocol: pattern.protocol.clone(),
            method: pattern.http_method,
            framework: pattern.framework.clone(),
            path,
            handler,
            middleware,
            package: Some(pkg.id.clone()),
            location: NodeLocation {
                file: call.location.file.clone(),
                line: call.location.start_line,
            },
        })
    }

    /// Breadth-first trace from the handler, up to `max_call_depth` hops.
    fn trace(&self, model: &RawModel, index: &TypeIndex<'_>, entry: &EntryPoint) -> Vec<Call> {
        if entry.handler.is_empty() {
            return Vec::new();
        }

        let handler_name = last_segment(&entry.handler);
        let home = entry.package.as_deref().and_then(|id| index.package(id));
        let mut queue: VecDeque<(String, &Package, &FunctionBody, usize)> = find_named(model, home, handler_name)
            .into_iter()
            .map(|(pkg, body)| (entry.handler.clone(), pkg, body, 1))
            .collect();

        let mut visited: HashSet<(String, String)> = HashSet::new();
        let mut seen_pairs: HashSet<(String, String)> = HashSet::new();
        let mut calls = Vec::new();

        while let Some((from, pkg, body, depth)) = queue.pop_front() {
            for call in &body.calls {
                let to = call_target(call);
                if is_noisy_call(&to) {
                    continue;
                }

                let kind = if depth > 1 {
                    CallKind::Indirect
                } else if receiver_is_interface(index, pkg, call) {
                    CallKind::Interface
                } else {
                    CallKind::Direct
                };
                if seen_pairs.insert((from.clone(), to.clone())) {
                    calls.push(Call {
                        from: from.clone(),
                        to: to.clone(),
                        kind,
                        confidence: match kind {
                            CallKind::Direct => DIRECT_CALL_CONFIDENCE,
                            CallKind::Interface => INTERFACE_CALL_CONFIDENCE,
                            CallKind::Indirect => INDIRECT_CALL_CONFIDENCE,
                        },
                    });
                }

                if depth < self.options.max_call_depth {
                    for (callee_pkg, callee_body) in find_callee(model, pkg, call) {
                        let key = (callee_pkg.id.clone(), to.clone());
                        if visited.insert(key) {
                            queue.push_back((to.clone(), callee_pkg, callee_body, depth + 1));
                        }
                    }
                }
            }
        }

        calls
    }
}

impl LayerBuilder for FlowGraphBuilder {
    type Output = FlowGraph;

    fn build(&self, model: &RawModel) -> FlowGraph {
        let index = TypeIndex::new(model);
        let mut entry_points = self.detect_entry_points(model);

        if let Some(protocols) = self.options.protocols.as_ref().filter(|p| !p.is_empty()) {
            entry_points.retain(|e| protocols.contains(&e.protocol));
        }

        let call_chains: Vec<CallChain> = entry_points
            .iter()
            .map(|entry| CallChain {
                id: format!("chain-{}", entry.id),
                entry_point: entry.id.clone(),
                calls: self.trace(model, &index, entry),
            })
            .collect();

        tracing::debug!(
            entry_points = entry_points.len(),
            call_chains = call_chains.len(),
            "built flow graph"
        );

        FlowGraph {
            entry_points,
            call_chains,
        }
    }
}

/// Every function and method body in a package.
fn bodies(pkg: &Package) -> impl Iterator<Item = &FunctionBody> {
    pkg.functions
        .iter()
        .filter_map(|f| f.body.as_ref())
        .chain(
            pkg.structs
                .iter()
                .flat_map(|s| &s.methods)
                .filter_map(|m| m.body.as_ref()),
        )
}

/// Bodies of functions or methods named `name`, in `home` first, else anywhere.
fn find_named<'a>(
    model: &'a RawModel,
    home: Option<&'a Package>,
    name: &str,
) -> Vec<(&'a Package, &'a FunctionBody)> {
    let in_package = |pkg: &'a Package| -> Vec<(&'a Package, &'a FunctionBody)> {
        let funcs = pkg
            .functions
            .iter()
            .filter(|f| f.name == name)
            .filter_map(|f| f.body.as_ref());
        let methods = pkg
            .structs
            .iter()
            .flat_map(|s| &s.methods)
            .filter(|m| m.name == name)
            .filter_map(|m| m.body.as_ref());
        funcs.chain(methods).map(|b| (pkg, b)).collect()
    };

    if let Some(home) = home {
        let local = in_package(home);
        if !local.is_empty() {
            return local;
        }
    }
    model.packages.iter().flat_map(in_package).collect()
}

/// Bodies a call may land in.
fn find_callee<'a>(
    model: &'a RawModel,
    caller_pkg: &'a Package,
    call: &CallExpr,
) -> Vec<(&'a Package, &'a FunctionBody)> {
    let name = call.function_name.as_str();
    match call.package_name.as_deref().filter(|q| !q.is_empty()) {
        Some(qualifier) => model
            .packages
            .iter()
            .filter(|p| p.name == qualifier || last_segment_by(&p.id, '/') == qualifier)
            .flat_map(|p| {
                p.functions
                    .iter()
                    .filter(move |f| f.name == name)
                    .filter_map(|f| f.body.as_ref())
                    .map(move |b| (p, b))
            })
            .collect(),
        None if call.receiver_type.is_some() => find_named(model, Some(caller_pkg), name),
        None => caller_pkg
            .functions
            .iter()
            .filter(|f| f.name == name)
            .filter_map(|f| f.body.as_ref())
            .map(|b| (caller_pkg, b))
            .collect(),
    }
}

/// `pkg.Func`, `recv.Method` or bare `Func`.
fn call_target(call: &CallExpr) -> String {
    match call.receiver_type.as_deref().filter(|r| !r.is_empty()) {
        Some(receiver) if call.package_name.is_none() => {
            format!("{}.{}", receiver.trim_start_matches('*'), call.function_name)
        }
        _ => call.display_target(),
    }
}

fn receiver_is_interface(index: &TypeIndex<'_>, pkg: &Package, call: &CallExpr) -> bool {
    call.receiver_type
        .as_deref()
        .and_then(TypeRef::parse)
        .and_then(|r| r.resolve(index, &pkg.id))
        .and_then(|id| index.lookup_node(&id))
        .is_some_and(|decl| matches!(decl, TypeDecl::Interface(_)))
}

fn last_segment(qualified: &str) -> &str {
    last_segment_by(qualified, '.')
}

fn last_segment_by(s: &str, sep: char) -> &str {
    s.rsplit(sep).next().unwrap_or(s)
}

fn is_closure(arg: &str) -> bool {
    let arg = arg.trim_start();
    arg.starts_with("func(") || arg.starts_with("func (")
}

fn handler_text(arg: Option<&String>) -> String {
    match arg {
        Some(a) if !is_closure(a) => a.trim().trim_start_matches('&').to_string(),
        _ => String::new(),
    }
}

/// Strip Go string quotes from a literal argument.
fn unquote(arg: &str) -> String {
    let arg = arg.trim();
    for quote in ['"', '`'] {
        if let Some(inner) = arg.strip_prefix(quote).and_then(|a| a.strip_suffix(quote)) {
            return inner.to_string();
        }
    }
    arg.to_string()
}

/// `RegisterGreeterServer` -> `Greeter`
fn service_name(function_name: &str) -> String {
    let name = function_name.strip_prefix("Register").unwrap_or(function_name);
    name.strip_suffix("Server").unwrap_or(name).to_string()
}

//! Framework detection from go.mod requires, imports and signatures

use std::collections::BTreeSet;

use archatlas_core::{Method, RawModel};

use crate::module::{path_has_prefix, ModuleInfo};

/// Module path prefix -> framework key, for go.mod requires and imports.
const MODULE_FRAMEWORKS: &[(&str, &str)] = &[
    ("github.com/gin-gonic/gin", "gin"),
    ("github.com/labstack/echo", "echo"),
    ("github.com/go-chi/chi", "chi"),
    ("github.com/gorilla/mux", "gorilla/mux"),
    ("github.com/gofiber/fiber", "fiber"),
    ("google.golang.org/grpc", "grpc"),
    ("github.com/spf13/cobra", "cobra"),
    ("github.com/urfave/cli", "urfave/cli"),
    ("github.com/segmentio/kafka-go", "kafka-go"),
    ("github.com/Shopify/sarama", "sarama"),
    ("github.com/IBM/sarama", "sarama"),
    ("github.com/nats-io/nats.go", "nats"),
    ("github.com/robfig/cron", "cron"),
];

/// Frameworks only recognizable from import paths.
const IMPORT_ONLY_FRAMEWORKS: &[(&str, &str)] = &[
    ("github.com/beego/beego", "beego"),
    ("github.com/cloudwego/hertz", "hertz"),
    ("github.com/kataras/iris", "iris"),
    ("github.com/confluentinc/confluent-kafka-go", "confluent-kafka"),
];

pub const NET_HTTP: &str = "net/http";
pub const MAIN: &str = "main";
pub const SERVE_HTTP: &str = "serve-http";

#[derive(Debug, Clone, Copy, Default)]
pub struct FrameworkDetector;

impl FrameworkDetector {
    pub fn new() -> Self {
        FrameworkDetector
    }

    /// All detected framework keys. `net/http` is always present.
    pub fn detect(&self, module: Option<&ModuleInfo>, model: &RawModel) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        found.insert(NET_HTTP.to_string());

        if let Some(module) = module {
            for (prefix, key) in MODULE_FRAMEWORKS {
                if module.requires_module(prefix) {
                    found.insert(key.to_string());
                }
            }
        }

        for pkg in &model.packages {
            for import in &pkg.imports {
                for (prefix, key) in MODULE_FRAMEWORKS.iter().chain(IMPORT_ONLY_FRAMEWORKS) {
                    if path_has_prefix(&import.path, prefix) {
                        found.insert(key.to_string());
                    }
                }
            }

            if pkg.name == MAIN {
                found.insert(MAIN.to_string());
            }
            let serves_http = pkg
                .structs
                .iter()
                .flat_map(|s| &s.methods)
                .any(is_serve_http);
            if serves_http {
                found.insert(SERVE_HTTP.to_string());
            }
        }

        tracing::debug!(frameworks = ?found, "detected frameworks");
        found
    }
}

/// `ServeHTTP(http.ResponseWriter, *http.Request)`
fn is_serve_http(method: &Method) -> bool {
    if method.name != "ServeHTTP" || method.parameters.len() != 2 {
        return false;
    }
    let writer = method.parameters[0].type_text.trim();
    let request = method.parameters[1].type_text.trim();
    writer.ends_with("ResponseWriter") && request.ends_with("Request")
}

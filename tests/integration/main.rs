//! Integration tests for ArchAtlas
//!
//! Raw front-end JSON is built into an atlas and rendered, both through the
//! library crates and through the CLI binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use archatlas_builder::{build_atlas, AtlasConfig};
use archatlas_core::*;
use archatlas_render::{render_atlas, LayerSelection, RenderFormat, LAYER_SEPARATOR};
use tempfile::TempDir;

const RAW_MODEL: &str = r#"{
  "moduleName": "github.com/acme/shop",
  "moduleRoot": "/src/shop",
  "packages": [
    {
      "fullName": "cmd/shop",
      "name": "main",
      "dirPath": "cmd/shop",
      "sourceFiles": ["cmd/shop/main.go"],
      "imports": [
        { "path": "github.com/acme/shop/internal/orders" },
        { "path": "fmt" }
      ],
      "functions": [
        {
          "name": "main",
          "packageName": "main",
          "location": { "file": "cmd/shop/main.go", "startLine": 9, "endLine": 20 },
          "body": {
            "calls": [
              {
                "functionName": "NewService",
                "packageName": "orders",
                "location": { "file": "cmd/shop/main.go", "startLine": 10 }
              }
            ],
            "goSpawns": [
              {
                "call": { "functionName": "Run", "receiverType": "*orders.Worker" },
                "location": { "file": "cmd/shop/main.go", "startLine": 14 },
                "patternHint": "worker_pool"
              }
            ]
          }
        }
      ]
    },
    {
      "fullName": "internal/orders",
      "name": "orders",
      "dirPath": "internal/orders",
      "sourceFiles": ["internal/orders/service.go", "internal/orders/routes.go"],
      "imports": [
        { "path": "github.com/gin-gonic/gin" },
        { "path": "github.com/acme/shop/internal/store" }
      ],
      "interfaces": [
        {
          "name": "Repository",
          "packageName": "orders",
          "exported": true,
          "methods": [
            {
              "name": "Save",
              "parameters": [{ "name": "o", "type": "Order" }],
              "returnTypes": ["error"]
            }
          ]
        }
      ],
      "structs": [
        {
          "name": "Service",
          "packageName": "orders",
          "exported": true,
          "fields": [{ "name": "repo", "type": "Repository" }]
        }
      ],
      "functions": [
        {
          "name": "Routes",
          "packageName": "orders",
          "body": {
            "calls": [
              {
                "functionName": "POST",
                "receiverType": "*gin.Engine",
                "args": ["\"/orders\"", "createOrder"],
                "location": { "file": "internal/orders/routes.go", "startLine": 12 }
              }
            ]
          }
        },
        {
          "name": "createOrder",
          "packageName": "orders",
          "body": {
            "calls": [
              {
                "functionName": "Save",
                "receiverType": "Repository",
                "location": { "file": "internal/orders/routes.go", "startLine": 20 }
              },
              {
                "functionName": "Println",
                "packageName": "fmt",
                "location": { "file": "internal/orders/routes.go", "startLine": 21 }
              }
            ]
          }
        }
      ]
    },
    {
      "fullName": "internal/store",
      "name": "store",
      "dirPath": "internal/store",
      "sourceFiles": ["internal/store/sql.go"],
      "imports": [{ "path": "github.com/acme/shop/internal/orders" }],
      "structs": [
        {
          "name": "SQLStore",
          "packageName": "store",
          "exported": true,
          "methods": [
            {
              "name": "Save",
              "receiverType": "*SQLStore",
              "parameters": [{ "name": "o", "type": "orders.Order" }],
              "returnTypes": ["error"]
            }
          ]
        }
      ]
    }
  ]
}"#;

fn raw_model() -> RawModel {
    serde_json::from_str(RAW_MODEL).expect("fixture decodes")
}

fn write_fixture(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("raw.json");
    fs::write(&path, RAW_MODEL).unwrap();
    path
}

fn archatlas(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_archatlas"))
        .args(args)
        .output()
        .expect("Failed to execute archatlas")
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

// ── Library pipeline ────────────────────────────────────────

#[test]
fn test_raw_json_decodes() {
    let model = raw_model();
    assert_eq!(model.module_name, "github.com/acme/shop");
    assert_eq!(model.packages.len(), 3);
    assert_eq!(model.packages[0].id, "cmd/shop");
    assert_eq!(model.file_count(), 4);
}

#[test]
fn test_package_layer_end_to_end() {
    let atlas = build_atlas(&raw_model(), AtlasConfig::default()).unwrap();
    let package = atlas.layers.package.as_ref().unwrap();

    assert_eq!(package.nodes.len(), 3);
    assert_eq!(package.nodes[0].id, "github.com/acme/shop/cmd/shop");
    assert_eq!(package.nodes[0].kind, PackageKind::Cmd);
    assert_eq!(package.edges.len(), 3);
    assert_eq!(package.cycles.len(), 1);
    assert_eq!(package.cycles[0].severity, CycleSeverity::Warning);

    let out = render_atlas(&atlas, Layer::Package.into(), RenderFormat::Mermaid).unwrap();
    assert!(out.content.starts_with("flowchart TB\n"));
    assert!(out.content.contains("  subgraph grp_internal[\"internal\"]\n"));
    assert!(out.content.contains("github_com_acme_shop_cmd_shop[\"cmd/shop\"]:::cmd"));
    assert!(out.content.contains("  %% Cycles detected:\n"));
}

#[test]
fn test_capability_layer_end_to_end() {
    let atlas = build_atlas(&raw_model(), AtlasConfig::default()).unwrap();
    let capability = atlas.layers.capability.as_ref().unwrap();

    assert!(capability
        .edges
        .iter()
        .any(|e| e.kind == CapabilityEdgeKind::Implements && e.target.ends_with("Repository")));
    assert!(capability
        .edges
        .iter()
        .any(|e| e.kind == CapabilityEdgeKind::Uses && e.source.ends_with("Service")));

    let out = render_atlas(&atlas, Layer::Capability.into(), RenderFormat::Mermaid).unwrap();
    assert!(out.content.starts_with("flowchart LR\n"));
    assert!(out.content.contains("-.->|impl|"));
    assert!(out.content.contains("-->|uses|"));
}

#[test]
fn test_goroutine_layer_end_to_end() {
    let atlas = build_atlas(&raw_model(), AtlasConfig::default()).unwrap();
    let goroutine = atlas.layers.goroutine.as_ref().unwrap();

    assert!(goroutine.nodes.iter().any(|n| n.kind == GoroutineKind::Main));
    assert!(goroutine
        .nodes
        .iter()
        .any(|n| n.kind == GoroutineKind::Spawned && n.pattern == Some(GoroutinePattern::WorkerPool)));
    assert_eq!(goroutine.edges.len(), 1);

    let out = render_atlas(&atlas, Layer::Goroutine.into(), RenderFormat::Mermaid).unwrap();
    assert!(out.content.starts_with("flowchart TB\n"));
    assert!(out.content.contains(":::main"));
    assert!(out.content.contains("(worker-pool)"));
    assert!(out.content.contains("-->|go|"));
}

#[test]
fn test_flow_layer_end_to_end() {
    let atlas = build_atlas(&raw_model(), AtlasConfig::default()).unwrap();
    let flow = atlas.layers.flow.as_ref().unwrap();

    let post = flow.entry_point("entry-internal/orders-12").unwrap();
    assert_eq!(post.kind, "http-post");
    assert_eq!(post.framework, "gin");
    assert_eq!(post.path, "/orders");
    assert_eq!(post.handler, "createOrder");
    assert!(flow.entry_point("entry-cmd/shop-main").is_some());

    let chain = flow
        .call_chains
        .iter()
        .find(|c| c.entry_point == post.id)
        .unwrap();
    assert_eq!(chain.calls.len(), 1);
    assert_eq!(chain.calls[0].to, "Repository.Save");
    assert_eq!(chain.calls[0].kind, CallKind::Interface);

    let out = render_atlas(&atlas, Layer::Flow.into(), RenderFormat::Mermaid).unwrap();
    assert!(out.content.contains("entry_internal_orders_12[\"POST /orders\"]"));
    assert!(out.content.contains("  entry_internal_orders_12 --> createOrder\n"));
    assert!(out.content.contains("  createOrder --> Repository_Save\n"));
}

#[test]
fn test_render_all_layers() {
    let atlas = build_atlas(&raw_model(), AtlasConfig::default()).unwrap();
    let out = render_atlas(&atlas, LayerSelection::All, RenderFormat::Mermaid).unwrap();
    assert_eq!(out.content.split(LAYER_SEPARATOR).count(), 4);
}

#[test]
fn test_atlas_json_round_trips() {
    let atlas = build_atlas(&raw_model(), AtlasConfig::default()).unwrap();
    let json = serde_json::to_string_pretty(&atlas).unwrap();
    let decoded: AtlasBundle = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded.layers, atlas.layers);
    assert_eq!(decoded.metadata.generated_at, atlas.metadata.generated_at);
}

// ── CLI ─────────────────────────────────────────────────────

#[test]
fn test_cli_version() {
    let output = archatlas(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("ArchAtlas v"));
}

#[test]
fn test_cli_generate_single_layer() {
    let dir = TempDir::new().unwrap();
    let input = write_fixture(&dir);
    let out = dir.path().join("diagrams/package.mmd");

    let output = archatlas(&[
        "generate",
        "--input",
        arg(&input),
        "--layer",
        "package",
        "--output",
        arg(&out),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let content = fs::read_to_string(&out).unwrap();
    assert!(content.starts_with("flowchart TB\n"));
}

#[test]
fn test_cli_build_then_render_json() {
    let dir = TempDir::new().unwrap();
    let input = write_fixture(&dir);
    let atlas_path = dir.path().join("atlas.json");
    let flow_path = dir.path().join("flow.json");

    let build = archatlas(&["build", "--input", arg(&input), "--output", arg(&atlas_path)]);
    assert!(build.status.success(), "{}", String::from_utf8_lossy(&build.stderr));

    let render = archatlas(&[
        "render",
        "--atlas",
        arg(&atlas_path),
        "--layer",
        "flow",
        "--format",
        "json",
        "--output",
        arg(&flow_path),
    ]);
    assert!(render.status.success(), "{}", String::from_utf8_lossy(&render.stderr));

    let flow: FlowGraph = serde_json::from_str(&fs::read_to_string(&flow_path).unwrap()).unwrap();
    assert_eq!(flow.entry_points.len(), 2);
}

#[test]
fn test_cli_sequence_to_stdout() {
    let dir = TempDir::new().unwrap();
    let input = write_fixture(&dir);

    let output = archatlas(&["generate", "--input", arg(&input), "--layer", "flow", "--sequence"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("sequenceDiagram\n"));
    assert!(stdout.contains("  createOrder->>+Repository_Save: call\n"));
}

#[test]
fn test_cli_config_file_limits_layers() {
    let dir = TempDir::new().unwrap();
    let input = write_fixture(&dir);
    let config = dir.path().join("atlas.toml");
    fs::write(&config, "layers = [\"package\", \"goroutine\"]\nexclude_patterns = [\"internal/store\"]\n")
        .unwrap();

    let output = archatlas(&["generate", "--input", arg(&input), "--config", arg(&config)]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.split(LAYER_SEPARATOR).count(), 2);
    assert!(!stdout.contains("internal/store"));
}

#[test]
fn test_cli_layers_flag_overrides_config() {
    let dir = TempDir::new().unwrap();
    let input = write_fixture(&dir);
    let config = dir.path().join("atlas.yaml");
    fs::write(&config, "layers: [package]\n").unwrap();

    let output = archatlas(&[
        "generate",
        "--input",
        arg(&input),
        "--config",
        arg(&config),
        "--layers",
        "capability,flow",
        "--format",
        "json",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let layers: AtlasLayers = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(layers.present(), vec![Layer::Capability, Layer::Flow]);
}

#[test]
fn test_cli_missing_layer_fails() {
    let dir = TempDir::new().unwrap();
    let input = write_fixture(&dir);

    let output = archatlas(&[
        "generate",
        "--input",
        arg(&input),
        "--layers",
        "package",
        "--layer",
        "flow",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Flow layer not available"));
}

#[test]
fn test_cli_rejects_bad_input() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("raw.json");
    fs::write(&input, "{ not json").unwrap();

    let output = archatlas(&["build", "--input", arg(&input)]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to decode raw model"));
}

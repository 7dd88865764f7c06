//! Unit tests for archatlas-core

use crate::test_utils::{api_model, twin_store_model};
use crate::*;

#[test]
fn test_node_id_format() {
    assert_eq!(node_id("pkg/api", "Server"), "pkg/api.Server");
}

#[test]
fn test_is_exported() {
    assert!(is_exported("Server"));
    assert!(!is_exported("server"));
    assert!(!is_exported(""));
}

#[test]
fn test_import_local_name() {
    let plain = Import::new("github.com/acme/app/pkg/hub/store");
    assert_eq!(plain.local_name(), "store");

    let aliased = Import {
        alias: Some("hubstore".to_string()),
        ..Import::new("github.com/acme/app/pkg/hub/store")
    };
    assert_eq!(aliased.local_name(), "hubstore");

    let blank = Import {
        alias: Some("_".to_string()),
        ..Import::new("github.com/lib/pq")
    };
    assert_eq!(blank.local_name(), "pq");
}

#[test]
fn test_layer_parse_and_display() {
    assert_eq!("package".parse::<Layer>().unwrap(), Layer::Package);
    assert_eq!(" Flow ".parse::<Layer>().unwrap(), Layer::Flow);
    assert!("everything".parse::<Layer>().is_err());

    assert_eq!(Layer::Goroutine.display_name(), "Goroutine");
    assert_eq!(Layer::Capability.to_string(), "capability");
}

#[test]
fn test_goroutine_pattern_hint() {
    assert_eq!(
        GoroutinePattern::from_hint("worker_pool"),
        Some(GoroutinePattern::WorkerPool)
    );
    assert_eq!(GoroutinePattern::from_hint("fan-in"), Some(GoroutinePattern::FanIn));
    assert_eq!(GoroutinePattern::from_hint("mystery"), None);
}

#[test]
fn test_channel_direction_from_type_text() {
    assert_eq!(ChannelDirection::from_type_text("<-chan int"), ChannelDirection::Receive);
    assert_eq!(ChannelDirection::from_type_text("chan<- Job"), ChannelDirection::Send);
    assert_eq!(ChannelDirection::from_type_text("chan Job"), ChannelDirection::Bidirectional);
}

#[test]
fn test_package_accepts_full_name_key() {
    let json = r#"{
        "fullName": "pkg/hub/store",
        "name": "store",
        "structs": [{"name": "SQLiteStore", "packageName": "store", "exported": true}]
    }"#;
    let pkg: Package = serde_json::from_str(json).unwrap();
    assert_eq!(pkg.id, "pkg/hub/store");
    assert_eq!(pkg.structs.len(), 1);
    assert!(pkg.interfaces.is_empty());
}

#[test]
fn test_supplied_implementations_empty_is_none() {
    let model = RawModel::new(vec![]).with_implementations(vec![]);
    assert!(model.supplied_implementations().is_none());

    let model = model.with_implementations(vec![InferredImplementation::default()]);
    assert_eq!(model.supplied_implementations().map(|i| i.len()), Some(1));
}

#[test]
fn test_atlas_layers_present_order() {
    let layers = AtlasLayers {
        flow: Some(FlowGraph::default()),
        package: Some(PackageGraph::default()),
        ..Default::default()
    };
    assert_eq!(layers.present(), vec![Layer::Package, Layer::Flow]);
    assert!(!layers.contains(Layer::Capability));
}

#[test]
fn test_bundle_omits_absent_layers() {
    let bundle = AtlasBundle::new(
        AtlasLayers {
            goroutine: Some(GoroutineTopology::default()),
            ..Default::default()
        },
        AtlasMetadata::default(),
    );
    let value = serde_json::to_value(&bundle).unwrap();
    assert_eq!(value["version"], "1.0");
    let layers = value["layers"].as_object().unwrap();
    assert_eq!(layers.len(), 1);
    assert!(layers.contains_key("goroutine"));
}

#[test]
fn test_capability_edge_serialization() {
    let edge = CapabilityEdge {
        id: "uses-pkg/api.Server-Handler".to_string(),
        kind: CapabilityEdgeKind::Uses,
        source: "pkg/api.Server".to_string(),
        target: "pkg/api.Handler".to_string(),
        confidence: 0.9,
        concrete_usage: false,
        context: Some(EdgeContext {
            field_type: true,
            usage_locations: vec!["api/server.go:12".to_string()],
        }),
    };
    insta::assert_json_snapshot!(edge, @r#"
    {
      "id": "uses-pkg/api.Server-Handler",
      "kind": "uses",
      "source": "pkg/api.Server",
      "target": "pkg/api.Handler",
      "confidence": 0.9,
      "context": {
        "fieldType": true,
        "usageLocations": [
          "api/server.go:12"
        ]
      }
    }
    "#);
}

// ── TypeIndex ───────────────────────────────────────────────

#[test]
fn test_index_lookup_by_full_id() {
    let model = twin_store_model();
    let index = TypeIndex::new(&model);

    assert!(index.declares("pkg/hub/store", "SQLiteStore"));
    assert!(index.declares("pkg/catalog/store", "Store"));
    assert!(!index.declares("store", "Store"));
    assert!(matches!(
        index.lookup("pkg/hub/store", "Store"),
        Some(TypeDecl::Interface(_))
    ));
}

#[test]
fn test_resolve_package_full_and_module_qualified() {
    let model = twin_store_model();
    let index = TypeIndex::new(&model);

    assert_eq!(
        index.resolve_package("pkg/hub/store", "Store", DeclKind::Interface, ResolveContext::default()),
        Some("pkg/hub/store")
    );
    assert_eq!(
        index.resolve_package(
            "github.com/acme/app/pkg/catalog/store",
            "SQLiteStore",
            DeclKind::Struct,
            ResolveContext::default()
        ),
        Some("pkg/catalog/store")
    );
}

#[test]
fn test_resolve_short_name_is_ambiguous_without_context() {
    let model = twin_store_model();
    let index = TypeIndex::new(&model);

    assert_eq!(
        index.resolve_package("store", "SQLiteStore", DeclKind::Struct, ResolveContext::default()),
        None
    );
}

#[test]
fn test_resolve_short_name_with_context() {
    let model = twin_store_model();
    let index = TypeIndex::new(&model);

    let methods = vec!["List".to_string()];
    let by_methods = ResolveContext {
        referencing_package: None,
        required_methods: &methods,
    };
    assert_eq!(
        index.resolve_package("store", "SQLiteStore", DeclKind::Struct, by_methods),
        Some("pkg/catalog/store")
    );

    let by_package = ResolveContext {
        referencing_package: Some("pkg/hub/store"),
        required_methods: &[],
    };
    assert_eq!(
        index.resolve_package("store", "Store", DeclKind::Interface, by_package),
        Some("pkg/hub/store")
    );
}

#[test]
fn test_resolve_package_wrong_kind() {
    let model = twin_store_model();
    let index = TypeIndex::new(&model);
    assert_eq!(
        index.resolve_package("pkg/hub/store", "Store", DeclKind::Struct, ResolveContext::default()),
        None
    );
}

#[test]
fn test_resolve_bare_prefers_own_package() {
    let model = twin_store_model();
    let index = TypeIndex::new(&model);

    assert_eq!(
        index.resolve_bare("pkg/catalog/store", "Store").as_deref(),
        Some("pkg/catalog/store.Store")
    );
    assert_eq!(
        index.resolve_bare("pkg/other", "Store").as_deref(),
        Some("pkg/hub/store.Store")
    );
    assert_eq!(index.resolve_bare("pkg/other", "string"), None);
}

#[test]
fn test_resolve_qualified_through_import() {
    let mut model = twin_store_model();
    model.packages.push(
        Package::new("cmd/server", "main").with_import("github.com/acme/app/pkg/catalog/store"),
    );
    let index = TypeIndex::new(&model);

    assert_eq!(
        index.resolve_qualified("cmd/server", "store", "Store").as_deref(),
        Some("pkg/catalog/store.Store")
    );
}

#[test]
fn test_resolve_qualified_by_closest_path() {
    let mut model = twin_store_model();
    model.packages.push(Package::new("pkg/hub/api", "api"));
    let index = TypeIndex::new(&model);

    assert_eq!(
        index.resolve_qualified("pkg/hub/api", "store", "SQLiteStore").as_deref(),
        Some("pkg/hub/store.SQLiteStore")
    );
    assert_eq!(index.resolve_qualified("pkg/hub/api", "store", "Missing"), None);
}

#[test]
fn test_resolve_qualified_tie_is_skipped() {
    let mut model = twin_store_model();
    model.packages.push(Package::new("cmd/tool", "main"));
    let index = TypeIndex::new(&model);

    assert_eq!(index.resolve_qualified("cmd/tool", "store", "Store"), None);
}

#[test]
fn test_api_model_resolves_local_interface() {
    let model = api_model();
    let index = TypeIndex::new(&model);
    assert_eq!(
        index.resolve_bare("pkg/api", "Handler").as_deref(),
        Some("pkg/api.Handler")
    );
}

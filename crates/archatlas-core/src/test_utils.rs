//! Raw model fixtures shared by the core tests

use crate::model::*;

/// Two packages that share the short name `store`, each with its own
/// `Store` interface and `SQLiteStore` implementation.
pub fn twin_store_model() -> RawModel {
    let hub = Package::new("pkg/hub/store", "store")
        .with_interface(
            Interface::new("Store", "store")
                .with_method(Method::new("Get").with_params(&["string"]).with_returns(&["[]byte", "error"])),
        )
        .with_struct(
            Struct::new("SQLiteStore", "store")
                .with_method(Method::new("Get").with_params(&["string"]).with_returns(&["[]byte", "error"])),
        );

    let catalog = Package::new("pkg/catalog/store", "store")
        .with_interface(
            Interface::new("Store", "store")
                .with_method(Method::new("List").with_returns(&["[]Item"])),
        )
        .with_struct(
            Struct::new("SQLiteStore", "store")
                .with_method(Method::new("List").with_returns(&["[]Item"])),
        );

    RawModel::new(vec![hub, catalog]).with_module_name("github.com/acme/app")
}

/// `pkg/api` with `Server{handler Handler}` and a `Handler` interface.
pub fn api_model() -> RawModel {
    let api = Package::new("pkg/api", "api")
        .with_interface(Interface::new("Handler", "api").with_method(Method::new("Handle")))
        .with_struct(Struct::new("Server", "api").with_field("handler", "Handler"));
    RawModel::new(vec![api])
}

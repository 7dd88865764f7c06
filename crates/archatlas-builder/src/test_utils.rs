//! Raw model fixtures for builder tests

use archatlas_core::*;

pub const MODULE: &str = "github.com/acme/app";

fn at(file: &str, line: u32) -> SourceLocation {
    SourceLocation::new(file, line)
}

/// `pkg/hub/store` and `pkg/catalog/store`, both named `store`, each with a
/// local `Store` interface and a `SQLiteStore` implementing it.
pub fn twin_store_model() -> RawModel {
    let hub = Package::new("pkg/hub/store", "store")
        .with_interface(Interface::new("Store", "store").with_method(
            Method::new("Get")
                .with_params(&["string"])
                .with_returns(&["[]byte", "error"]),
        ))
        .with_struct(Struct::new("SQLiteStore", "store").with_method(
            Method::new("Get")
                .with_params(&["string"])
                .with_returns(&["[]byte", "error"]),
        ));

    let catalog = Package::new("pkg/catalog/store", "store")
        .with_interface(
            Interface::new("Store", "store").with_method(Method::new("List").with_returns(&["[]Item"])),
        )
        .with_struct(
            Struct::new("SQLiteStore", "store").with_method(Method::new("List").with_returns(&["[]Item"])),
        );

    RawModel::new(vec![hub, catalog]).with_module_name(MODULE)
}

/// `pkg/api` with `Server{handler Handler}` and a `Handler` interface.
pub fn api_model() -> RawModel {
    let api = Package::new("pkg/api", "api")
        .with_interface(Interface::new("Handler", "api").with_method(Method::new("Handle")))
        .with_struct(
            Struct::new("Server", "api")
                .with_located_field(Field::new("handler", "Handler").at(at("pkg/api/server.go", 8))),
        );
    RawModel::new(vec![api]).with_module_name(MODULE)
}

/// `cmd/app -> pkg/service -> pkg/repo -> pkg/service`, plus std and
/// third-party imports.
pub fn layered_model() -> RawModel {
    let app = Package::new("cmd/app", "main")
        .with_source_file("cmd/app/main.go")
        .with_import("fmt")
        .with_import("github.com/acme/app/pkg/service")
        .with_function(Function::new("main", "main"));
    let service = Package::new("pkg/service", "service")
        .with_source_file("pkg/service/service.go")
        .with_source_file("pkg/service/service_test.go")
        .with_import("github.com/acme/app/pkg/repo")
        .with_import("github.com/lib/pq")
        .with_struct(Struct::new("Service", "service"));
    let repo = Package::new("pkg/repo", "repo")
        .with_source_file("pkg/repo/repo.go")
        .with_import("github.com/acme/app/pkg/service")
        .with_interface(Interface::new("Repo", "repo").with_method(Method::new("Find")));
    let testutil = Package::new("internal/testutil", "testutil")
        .with_source_file("internal/testutil/fixtures_test.go");

    RawModel::new(vec![app, service, repo, testutil]).with_module_name(MODULE)
}

/// A main package that starts an anonymous worker, a named producer and a
/// method-based consumer around one `jobs` channel.
pub fn worker_model() -> RawModel {
    let file = "cmd/worker/main.go";
    let main = Function::new("main", "main").at(at(file, 5)).with_body(
        FunctionBody::new()
            .with_channel_op(
                ChannelOp::new("jobs", ChannelOperation::Make, at(file, 8)).with_element_type("chan Job"),
            )
            .with_spawn(
                SpawnStmt::new(CallExpr::new(ANONYMOUS_FUNCTION), at(file, 10))
                    .with_pattern_hint("worker_pool"),
            )
            .with_spawn(SpawnStmt::new(CallExpr::new("produce"), at(file, 12))),
    );
    let produce = Function::new("produce", "main").with_body(
        FunctionBody::new()
            .with_channel_op(ChannelOp::new("jobs", ChannelOperation::Send, at(file, 20)))
            .with_channel_op(ChannelOp::new("jobs", ChannelOperation::Send, at(file, 21)))
            .with_channel_op(ChannelOp::new("jobs", ChannelOperation::Close, at(file, 22))),
    );
    let pool = Struct::new("Pool", "main").with_method(
        Method::new("run").with_body(
            FunctionBody::new()
                .with_spawn(SpawnStmt::new(CallExpr::new("process").with_receiver("p"), at(file, 30)))
                .with_channel_op(ChannelOp::new("jobs", ChannelOperation::Receive, at(file, 31)))
                .with_channel_op(ChannelOp::new("results", ChannelOperation::Receive, at(file, 32))),
        ),
    );

    let pkg = Package::new("cmd/worker", "main")
        .with_source_file(file)
        .with_function(main)
        .with_function(produce)
        .with_struct(pool);
    RawModel::new(vec![pkg]).with_module_name(MODULE)
}

/// gin routes in `pkg/api`, a handler calling through a repository interface
/// and a helper, plus a `main` package.
pub fn routes_model() -> RawModel {
    let file = "pkg/api/routes.go";
    let routes = Function::new("Routes", "api").with_body(
        FunctionBody::new()
            .with_call(
                CallExpr::new("GET")
                    .with_receiver("*gin.Engine")
                    .with_args(&["\"/users\"", "authMiddleware", "listUsers"])
                    .at(at(file, 12)),
            )
            .with_call(
                CallExpr::new("POST")
                    .with_receiver("*gin.Engine")
                    .with_args(&["\"/users\"", "createUser"])
                    .at(at(file, 13)),
            ),
    );
    let list_users = Function::new("listUsers", "api").with_body(
        FunctionBody::new()
            .with_call(CallExpr::new("FindAll").with_receiver("UserRepository").at(at(file, 20)))
            .with_call(CallExpr::new("loadUsers").at(at(file, 21)))
            .with_call(CallExpr::qualified("fmt", "Println").at(at(file, 22)))
            .with_call(CallExpr::new("len").at(at(file, 23)))
            .with_call(CallExpr::new("FindAll").with_receiver("UserRepository").at(at(file, 24))),
    );
    let load_users = Function::new("loadUsers", "api").with_body(
        FunctionBody::new().with_call(CallExpr::qualified("db", "Query").at(at(file, 30))),
    );

    let api = Package::new("pkg/api", "api")
        .with_import("github.com/gin-gonic/gin")
        .with_interface(
            Interface::new("UserRepository", "api").with_method(Method::new("FindAll")),
        )
        .with_function(routes)
        .with_function(list_users)
        .with_function(load_users);

    let main = Package::new("cmd/server", "main").with_function(
        Function::new("main", "main")
            .at(at("cmd/server/main.go", 3))
            .with_body(FunctionBody::new()),
    );

    RawModel::new(vec![api, main]).with_module_name(MODULE)
}

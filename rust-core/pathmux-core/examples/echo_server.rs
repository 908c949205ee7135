//! Echo server demo
//!
//! ```text
//! cargo run -p pathmux-core --example echo_server
//! curl localhost:8000/api/echo?msg=hi,there
//! curl localhost:8000/api/user/42
//! curl -i localhost:8000/api/echo/../echo
//! ```
//!
//! Router flags can be supplied as JSON through `PATHMUX_CONFIG`.

use anyhow::Context;
use pathmux_core::{handler_fn, logging, Request, Response, Router, RouterConfig, Server};
use serde_json::json;

async fn echo(req: Request) -> Response {
    let messages = req
        .queries()
        .map(|q| q.get("msg").to_vec())
        .unwrap_or_default();
    Response::json(&json!({ "messages": messages }))
        .unwrap_or_else(|e| Response::text(e.to_string()).with_status(500))
}

async fn user(req: Request) -> Response {
    let id = req.vars().and_then(|v| v.get(":number")).unwrap_or_default();
    let route = req.current_route().map(|r| r.path.clone()).unwrap_or_default();
    Response::json(&json!({ "id": id, "route": route }))
        .unwrap_or_else(|e| Response::text(e.to_string()).with_status(500))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();

    let config = match std::env::var("PATHMUX_CONFIG") {
        Ok(raw) => RouterConfig::from_json(&raw).context("invalid PATHMUX_CONFIG")?,
        Err(_) => RouterConfig::default(),
    };
    tracing::info!(?config, "Configuration loaded");

    let mut router = Router::with_config(config);
    router.get("/api/echo", echo).name("echo");
    router.get("/api/user/:number", user).name("user");
    router
        .get("/api/#v[0-9]+/status", |_req| async {
            Response::text("ok")
        })
        .headers([("Accept", "")]);
    router.set_not_found_handler(handler_fn(|req: Request| async move {
        Response::json(&json!({ "error": "Not Found", "path": req.path() }))
            .map(|r| r.with_status(404))
            .unwrap_or_else(|_| Response::not_found())
    }));

    let addr = "127.0.0.1:8000".parse().context("invalid listen address")?;
    Server::new(router).bind(addr).serve().await?;
    Ok(())
}

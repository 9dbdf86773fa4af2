//! Demo controllers served by the `api-dispatch` binary.
//!
//! `TestEndpoint` exercises every dispatch feature: query and body echo,
//! captures from a custom route, a private member reached through the
//! controller facade, redirect and drop. `Chat` is a socket controller.

use serde_json::json;

use crate::app::App;
use crate::context::{ExecutionContext, HttpContext, SocketContext};
use crate::controller::{HttpController, SocketController};
use crate::error::DispatchResult;

pub fn test_endpoint() -> HttpController {
    HttpController::new("TestEndpoint")
        .action("ping", |_| Ok(json!("pong")))
        .action("get", |ctx: &mut HttpContext| Ok(serde_json::to_value(ctx.query())?))
        .action("post", |ctx: &mut HttpContext| Ok(ctx.data().cloned().unwrap_or_default()))
        .action("hash", |ctx: &mut HttpContext| Ok(json!(ctx.param("hash"))))
        .action("_private", |_| Ok(json!("secured content")))
        .action("exposedPrivate", |ctx: &mut HttpContext| {
            let controller = ctx.controller()?;
            Ok(controller.invoke("_private", ctx)?)
        })
        .action("testDrop", |ctx: &mut HttpContext| {
            ctx.drop_connection();
            Ok(json!(null))
        })
        .action("testRedirect", |ctx: &mut HttpContext| {
            ctx.redirect("/test-redirect")?;
            Ok(json!(null))
        })
}

pub fn test() -> HttpController {
    HttpController::new("Test")
        .action("exampleEndpoint", |_| Ok(json!("result")))
        .action("_action", |ctx: &mut HttpContext| {
            ctx.set_header("X-Test", "123")?;
            Ok(json!({
                "params": ctx.params(),
                "host": ctx.header("host"),
                "address": ctx.address(),
                "query": ctx.query(),
            }))
        })
        .action("errorTest", |_| Err("something unexpected".into()))
        .action("old", |ctx: &mut HttpContext| {
            ctx.send_pure("NotFound", Some(404))?;
            Ok(json!(null))
        })
        .value("version", 1)
}

pub fn chat() -> SocketController {
    SocketController::new("Chat")
        .action("open", |ctx: &mut SocketContext| {
            ctx.emit_text("welcome", &ctx.id().to_string());
            Ok(json!(null))
        })
        .action("ping", |_| Ok(json!("pong")))
        .action("echo", |ctx: &mut SocketContext| Ok(json!(ctx.payload())))
        .action("quit", |ctx: &mut SocketContext| {
            ctx.emit_text("bye", "");
            ctx.close();
            Ok(json!(null))
        })
}

/// Register the demo controllers and custom routes on `app`.
pub fn register(app: &App) -> DispatchResult<()> {
    app.register_http_controller(test())?;
    app.register_http_controller(test_endpoint())?;
    app.register_route("/test-custom/h{hash}.json", "TestEndpoint.hash")?;
    app.register_route("/test-details/{id}", "Test._action")?;
    app.register_socket_controller(chat());
    Ok(())
}

//! Routing behaviour against a running server.

use api_dispatch::http::NOT_FOUND_MESSAGE;
use api_dispatch::{DispatchError, Handler};
use serde_json::json;

mod common;

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let port = 28301;
    let (_app, handle) = common::start_demo(port).await;

    let (status, body) = common::get_text(port, "/random-not-found").await;
    assert_eq!(status, 404);
    assert_eq!(body, NOT_FOUND_MESSAGE);

    common::stop(handle).await;
}

#[tokio::test]
async fn test_private_action_looks_like_unknown_path() {
    let port = 28302;
    let (_app, handle) = common::start_demo(port).await;

    let unknown = common::get_text(port, "/random-not-found").await;
    let private = common::get_text(port, "/test-endpoint/_private").await;
    assert_eq!(private, unknown);

    // Lifecycle members are not routable either.
    let (status, _) = common::get_text(port, "/test/constructor").await;
    assert_eq!(status, 404);

    common::stop(handle).await;
}

#[tokio::test]
async fn test_controller_actions() {
    let port = 28303;
    let (_app, handle) = common::start_demo(port).await;

    assert_eq!(common::get_json(port, "/test-endpoint/ping").await, (200, json!("pong")));
    assert_eq!(common::get_json(port, "/test/example-endpoint").await, (200, json!("result")));

    let response = common::client()
        .get(common::url(port, "/test-endpoint/ping"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.headers()["content-type"], "application/json");
    assert!(response.headers().contains_key("x-request-id"));

    common::stop(handle).await;
}

#[tokio::test]
async fn test_custom_route_captures_hash() {
    let port = 28304;
    let (_app, handle) = common::start_demo(port).await;

    assert_eq!(
        common::get_json(port, "/test-custom/h9f3a.json").await,
        (200, json!("9f3a"))
    );
    let (status, _) = common::get_text(port, "/test-custom/9f3a.json").await;
    assert_eq!(status, 404);

    common::stop(handle).await;
}

#[tokio::test]
async fn test_private_member_through_controller_facade() {
    let port = 28305;
    let (_app, handle) = common::start_demo(port).await;

    assert_eq!(
        common::get_json(port, "/test-endpoint/exposed-private").await,
        (200, json!("secured content"))
    );

    common::stop(handle).await;
}

#[tokio::test]
async fn test_request_details_route() {
    let port = 28306;
    let (_app, handle) = common::start_demo(port).await;

    let response = common::client()
        .get(common::url(port, "/test-details/42?x=1"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["x-test"], "123");

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["params"], json!({ "id": "42" }));
    assert_eq!(body["host"], json!(format!("127.0.0.1:{port}")));
    assert_eq!(body["address"], json!({ "version": 4, "value": "127.0.0.1" }));
    assert_eq!(body["query"], json!({ "x": "1" }));

    common::stop(handle).await;
}

#[tokio::test]
async fn test_response_operations() {
    let port = 28307;
    let (_app, handle) = common::start_demo(port).await;
    let client = common::client();

    let redirect = client
        .get(common::url(port, "/test-endpoint/test-redirect"))
        .send()
        .await
        .unwrap();
    assert_eq!(redirect.status(), 302);
    assert_eq!(redirect.headers()["location"], "/test-redirect");

    assert_eq!(
        common::get_text(port, "/test/old").await,
        (404, "NotFound".to_string())
    );

    let dropped = match client
        .get(common::url(port, "/test-endpoint/test-drop"))
        .send()
        .await
    {
        Ok(response) => response.bytes().await.map(|_| ()),
        Err(e) => Err(e),
    };
    assert!(dropped.is_err());

    common::stop(handle).await;
}

#[tokio::test]
async fn test_action_failure_is_server_error() {
    let port = 28308;
    let (_app, handle) = common::start_demo(port).await;

    assert_eq!(
        common::get_text(port, "/test/error-test").await,
        (500, "something unexpected".to_string())
    );
    // The server keeps serving.
    assert_eq!(common::get_json(port, "/test-endpoint/ping").await.0, 200);

    common::stop(handle).await;
}

#[tokio::test]
async fn test_first_registered_route_wins() {
    let port = 28309;
    let (app, handle) = common::start_demo(port).await;

    app.register_route("/dup", Handler::action(|_| Ok(json!("first"))))
        .unwrap();
    app.register_route("/dup", Handler::action(|_| Ok(json!("second"))))
        .unwrap();

    assert_eq!(common::get_json(port, "/dup").await, (200, json!("first")));

    common::stop(handle).await;
}

#[tokio::test]
async fn test_dynamic_route_while_running() {
    let port = 28310;
    let (app, handle) = common::start_demo(port).await;

    app.register_route("/late/ping", "TestEndpoint.ping").unwrap();
    assert_eq!(common::get_json(port, "/late/ping").await, (200, json!("pong")));

    common::stop(handle).await;
}

#[tokio::test]
async fn test_dynamic_routes_disabled_by_config() {
    let port = 28311;
    let (app, handle) =
        common::start_configured(port, |config| config.routing.allow_dynamic_routes = false).await;

    assert_eq!(
        app.register_route("/late/ping", "TestEndpoint.ping"),
        Err(DispatchError::DynamicRoutingDisabled)
    );
    // Static routes, including ones resolved before the drop, keep working.
    assert_eq!(common::get_json(port, "/test-endpoint/ping").await, (200, json!("pong")));
    assert_eq!(
        common::get_json(port, "/test-custom/hbeef.json").await,
        (200, json!("beef"))
    );

    common::stop(handle).await;
}

use std::sync::Arc;
use std::time::Duration;

use campus::client::{ClientError, HttpResourceClient, Resource, ResourceApi};
use campus::domain::{FilterField, ListQuery};
use campus_api_types::{Blog, Tag};
use httpmock::MockServer;
use serde_json::json;

fn api(server: &MockServer, token: Option<&str>) -> ResourceApi {
    let client = HttpResourceClient::new(
        &server.url("/api"),
        token.map(str::to_string),
        Duration::from_secs(5),
    )
    .expect("client");
    ResourceApi::new(Arc::new(client))
}

#[tokio::test]
async fn list_sends_filters_and_bearer_token() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method("GET")
                .path("/api/tags")
                .query_param("page", "2")
                .query_param("per_page", "2")
                .query_param("search", "ma")
                .header("authorization", "Bearer secret");
            then.status(200).json_body(json!({
                "data": [{"id": 3, "name": "math"}, {"id": 4, "name": "marine"}],
                "meta": {"total": 5, "current_page": 2, "last_page": 3, "per_page": 2},
                "links": {"next": "/api/tags?page=3"}
            }));
        })
        .await;

    let query = ListQuery::new()
        .filter(FilterField::Search, "ma")
        .page(2)
        .per_page(2);
    let page = api(&server, Some("secret"))
        .list::<Tag>(Resource::Tags, &query)
        .await
        .expect("page");

    mock.assert_async().await;
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total_count, 5);
    assert_eq!(page.current_page, 2);
    assert_eq!(page.last_page, 3);
    assert!(page.has_next());
}

#[tokio::test]
async fn show_accepts_wrapped_and_bare_bodies() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("GET").path("/api/blogs/intro");
            then.status(200).json_body(json!({
                "data": {"id": 1, "slug": "intro", "title": "Bienvenue", "tags": [{"id": 2, "name": "news"}]}
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method("GET").path("/api/tags/2");
            then.status(200).json_body(json!({"id": 2, "name": "news"}));
        })
        .await;

    let api = api(&server, None);
    let blog: Blog = api.show(Resource::Blogs, "intro").await.expect("blog");
    assert_eq!(blog.title, "Bienvenue");
    assert_eq!(blog.tags.len(), 1);

    let tag: Tag = api.show(Resource::Tags, "2").await.expect("tag");
    assert_eq!(tag.name, "news");
}

#[tokio::test]
async fn not_found_keeps_server_message() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("GET").path("/api/blogs/missing");
            then.status(404)
                .json_body(json!({"message": "Blog introuvable"}));
        })
        .await;

    let err = api(&server, None)
        .show::<Blog>(Resource::Blogs, "missing")
        .await
        .expect_err("missing");
    assert!(err.is_not_found());
    assert_eq!(err.display_message(), "Blog introuvable");
}

#[tokio::test]
async fn create_reports_field_errors() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method("POST")
                .path("/api/tags")
                .json_body(json!({"name": ""}));
            then.status(422).json_body(json!({
                "message": "The given data was invalid.",
                "errors": {"name": ["The name field is required."]}
            }));
        })
        .await;

    let err = api(&server, Some("secret"))
        .create::<_, Tag>(Resource::Tags, &json!({"name": ""}))
        .await
        .expect_err("validation");

    mock.assert_async().await;
    let fields = err.field_errors().expect("field errors");
    assert_eq!(fields["name"], vec!["The name field is required.".to_string()]);
}

#[tokio::test]
async fn server_errors_are_generic() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("GET").path("/api/domaines");
            then.status(500).body("stack trace");
        })
        .await;

    let err = api(&server, None)
        .list::<Tag>(Resource::Domains, &ListQuery::new())
        .await
        .expect_err("server error");
    assert_eq!(err, ClientError::Server { status: 500 });
    assert!(!err.display_message().contains("stack"));
}

#[tokio::test]
async fn delete_accepts_empty_response() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method("DELETE").path("/api/writers/9");
            then.status(204);
        })
        .await;

    api(&server, Some("secret"))
        .delete(Resource::Writers, "9")
        .await
        .expect("deleted");
    mock.assert_async().await;
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("GET").path("/api/tags");
            then.status(200).json_body(json!({"data": "nope"}));
        })
        .await;

    let err = api(&server, None)
        .list::<Tag>(Resource::Tags, &ListQuery::new())
        .await
        .expect_err("decode");
    assert!(matches!(err, ClientError::Decode(_)));
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let client = HttpResourceClient::new("http://127.0.0.1:1/api", None, Duration::from_secs(2))
        .expect("client");
    let err = ResourceApi::new(Arc::new(client))
        .list::<Tag>(Resource::Tags, &ListQuery::new())
        .await
        .expect_err("transport");
    assert!(matches!(err, ClientError::Transport(_)));
    assert_eq!(err.status(), None);
}

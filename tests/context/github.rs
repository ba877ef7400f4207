use chrono::{DateTime, Utc};
use releasepost::config::{AppConfig, OutputStyle};
use releasepost::context::github::{GithubClient, GithubConfig, GithubError};
use releasepost::context::{build_context, ContextError};
use serde_json::json;
use std::path::Path;
use wiremock::matchers::{header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REPO: &str = "acme/widgets";
const TOKEN: &str = "gh-token";

fn client(server: &MockServer) -> GithubClient {
    GithubClient::new(GithubConfig {
        base_url: server.uri(),
        token: Some(TOKEN.to_string()),
        repository: REPO.to_string(),
    })
    .expect("Failed to create GitHub client")
}

fn live_config(server: &MockServer, release_tag: &str) -> AppConfig {
    AppConfig {
        github_token: Some(TOKEN.to_string()),
        release_tag: release_tag.to_string(),
        openapi_file: "does-not-exist/openapi.yaml".to_string(),
        llm_model: "gpt-4o-mini".to_string(),
        openai_api_key: Some("sk-test".to_string()),
        llm_url: None,
        output_format: OutputStyle::Markdown,
        offline: false,
        event_path: None,
        repository: Some(REPO.to_string()),
        github_api_url: server.uri(),
    }
}

async fn mount_repository(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets"))
        .and(header("authorization", format!("Bearer {TOKEN}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "full_name": REPO,
            "html_url": "https://github.com/acme/widgets"
        })))
        .mount(server)
        .await;
}

fn release_json(tag: &str) -> serde_json::Value {
    json!({
        "tag_name": tag,
        "name": format!("Widgets {tag}"),
        "body": "Release notes body",
        "created_at": "2024-03-01T00:00:00Z",
        "html_url": format!("https://github.com/acme/widgets/releases/tag/{tag}")
    })
}

#[tokio::test]
async fn keeps_only_pull_requests_merged_after_release() {
    let server = MockServer::start().await;
    mount_repository(&server).await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/releases/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(release_json("v2.0.0")))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/pulls"))
        .and(query_param("state", "closed"))
        .and(query_param("sort", "updated"))
        .and(query_param("direction", "desc"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "number": 12,
                "title": "Add comments endpoint",
                "body": "Implements POST /comments",
                "merged_at": "2024-03-05T10:00:00Z",
                "updated_at": "2024-03-06T10:00:00Z"
            },
            {
                "number": 10,
                "title": "Abandoned experiment",
                "body": "never merged",
                "merged_at": null,
                "updated_at": "2024-03-04T10:00:00Z"
            },
            {
                "number": 11,
                "title": "Fix pagination bug",
                "body": "merged before the release",
                "merged_at": "2024-02-20T10:00:00Z",
                "updated_at": "2024-03-02T10:00:00Z"
            }
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/issues/12/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"event": "referenced"},
            {"event": "closed"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let context = build_context(&live_config(&server, "latest"))
        .await
        .expect("Failed to build context");

    assert_eq!(context.repo, REPO);
    assert_eq!(context.release_tag, "v2.0.0");
    assert_eq!(context.release_notes, "Release notes body");
    assert_eq!(context.pr_titles, vec!["Add comments endpoint"]);
    assert_eq!(context.pr_descriptions, vec!["Implements POST /comments"]);
    assert_eq!(context.issue_summaries, vec!["referenced", "closed"]);
    assert_eq!(context.openapi_diff, None);
    assert_eq!(
        context.docs_urls,
        vec!["https://github.com/acme/widgets/releases/tag/v2.0.0"]
    );
}

#[tokio::test]
async fn skips_empty_pull_request_bodies() {
    let server = MockServer::start().await;
    mount_repository(&server).await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/releases/tags/v1.1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(release_json("v1.1.0")))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/pulls"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "number": 3,
                "title": "No body",
                "body": null,
                "merged_at": "2024-03-03T00:00:00Z",
                "updated_at": "2024-03-03T00:00:00Z"
            },
            {
                "number": 2,
                "title": "Empty body",
                "body": "",
                "merged_at": "2024-03-02T00:00:00Z",
                "updated_at": "2024-03-02T00:00:00Z"
            }
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/repos/acme/widgets/issues/\d+/events$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let context = build_context(&live_config(&server, "v1.1.0"))
        .await
        .expect("Failed to build context");

    assert_eq!(context.pr_titles, vec!["No body", "Empty body"]);
    assert!(context.pr_descriptions.is_empty());
    assert!(context.issue_summaries.is_empty());
}

#[tokio::test]
async fn follows_pull_request_pages() {
    let server = MockServer::start().await;

    let page_one = (0..100)
        .map(|i| {
            json!({
                "number": 1000 - i,
                "title": format!("PR {i}"),
                "body": null,
                "merged_at": "2024-04-01T00:00:00Z",
                "updated_at": "2024-04-01T00:00:00Z"
            })
        })
        .collect::<Vec<_>>();

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/pulls"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(page_one)))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/pulls"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "number": 1,
                "title": "Last one",
                "body": null,
                "merged_at": "2024-03-15T00:00:00Z",
                "updated_at": "2024-03-15T00:00:00Z"
            }
        ])))
        .mount(&server)
        .await;

    let since: DateTime<Utc> = "2024-03-01T00:00:00Z".parse().expect("valid timestamp");
    let pulls = client(&server)
        .merged_pulls_since(since)
        .await
        .expect("Failed to list pull requests");

    assert_eq!(pulls.len(), 101);
    assert_eq!(pulls[100].title, "Last one");
}

#[tokio::test]
async fn stops_listing_at_pull_requests_older_than_release() {
    let server = MockServer::start().await;

    let mut page_one = (0..99)
        .map(|i| {
            json!({
                "number": 1000 - i,
                "title": format!("PR {i}"),
                "body": null,
                "merged_at": "2024-04-01T00:00:00Z",
                "updated_at": "2024-04-01T00:00:00Z"
            })
        })
        .collect::<Vec<_>>();
    page_one.push(json!({
        "number": 1,
        "title": "Stale",
        "body": null,
        "merged_at": null,
        "updated_at": "2024-02-01T00:00:00Z"
    }));

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/pulls"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(page_one)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/pulls"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let since: DateTime<Utc> = "2024-03-01T00:00:00Z".parse().expect("valid timestamp");
    let pulls = client(&server)
        .merged_pulls_since(since)
        .await
        .expect("Failed to list pull requests");

    assert_eq!(pulls.len(), 99);
    assert!(pulls.iter().all(|pr| pr.title != "Stale"));
}

#[tokio::test]
async fn release_tag_is_encoded_as_one_path_segment() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/releases/tags/release%2F1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(release_json("release/1.0")))
        .expect(1)
        .mount(&server)
        .await;

    let release = client(&server)
        .release("release/1.0")
        .await
        .expect("Failed to fetch release");

    assert_eq!(release.tag_name, "release/1.0");
}

#[tokio::test]
async fn unknown_release_tag_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/releases/tags/v9.9.9"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
        .mount(&server)
        .await;

    let err = client(&server)
        .release("v9.9.9")
        .await
        .expect_err("Expected missing release");

    match err {
        GithubError::ReleaseNotFound(tag) => assert_eq!(tag, "v9.9.9"),
        other => panic!("Unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn rejected_token_aborts_context() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})),
        )
        .mount(&server)
        .await;

    let err = build_context(&live_config(&server, "latest"))
        .await
        .expect_err("Expected authentication failure");

    match err {
        ContextError::Github(GithubError::ApiStatus { status, body, .. }) => {
            assert_eq!(status, 401);
            assert!(body.contains("Bad credentials"));
        }
        other => panic!("Unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn live_mode_requires_repository() {
    let server = MockServer::start().await;
    let mut config = live_config(&server, "latest");
    config.repository = None;

    let err = build_context(&config)
        .await
        .expect_err("Expected configuration error");

    assert!(matches!(err, ContextError::MissingRepository));
}

#[test]
fn rejects_invalid_base_url() {
    let err = GithubClient::new(GithubConfig {
        base_url: "not a url".to_string(),
        token: None,
        repository: REPO.to_string(),
    })
    .expect_err("Expected invalid url");

    assert!(matches!(err, GithubError::InvalidUrl(_)));
}

#[tokio::test]
async fn attaches_spec_file_in_live_mode() {
    let server = MockServer::start().await;
    mount_repository(&server).await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/releases/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(release_json("v2.0.0")))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/pulls"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("Failed to create tempdir");
    let spec = dir.path().join("openapi.yaml");
    std::fs::write(&spec, "openapi: 3.0.3\n").expect("write spec");

    let context = client(&server)
        .fetch_release_context("latest", Path::new(&spec))
        .await
        .expect("Failed to build context");

    assert_eq!(context.openapi_diff.as_deref(), Some("openapi: 3.0.3\n"));
    assert!(context.pr_titles.is_empty());
}

#![allow(clippy::unwrap_used, clippy::expect_used)]

use base64::Engine;
use colloquy_archive::{ArchiveClient, ArchiveConfig, ArchiveOutcome, GitHubArchive, SkipReason};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REMOTE: &str = "/repos/someone/ai-conversation/contents/transcripts/ai_conversation_2024-05-01.txt";

fn config(server: &MockServer, token: Option<&str>) -> ArchiveConfig {
    ArchiveConfig {
        owner: "someone".into(),
        repo: "ai-conversation".into(),
        branch: Some("main".into()),
        path_prefix: Some("transcripts".into()),
        api_base_url: Some(server.uri()),
        token: token.map(str::to_string),
    }
}

fn transcript_file(tmp: &tempfile::TempDir) -> std::path::PathBuf {
    let path = tmp.path().join("ai_conversation_2024-05-01.txt");
    std::fs::write(&path, "[SpeakerA]: Hello\n[SpeakerB]: Hi\n").unwrap();
    path
}

fn encoded(text: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(text)
}

#[tokio::test]
async fn creates_file_when_absent() {
    let server = MockServer::start().await;
    let tmp = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path(REMOTE))
        .and(query_param("ref", "main"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(REMOTE))
        .and(header("Authorization", "Bearer ghp_test"))
        .and(body_partial_json(serde_json::json!({
            "message": "Daily AI conversation transcript for 2024-05-01",
            "content": encoded("[SpeakerA]: Hello\n[SpeakerB]: Hi\n"),
            "branch": "main"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let archive = GitHubArchive::new(config(&server, Some("ghp_test"))).unwrap();
    let outcome = archive
        .upload(
            &transcript_file(&tmp),
            "Daily AI conversation transcript for 2024-05-01",
        )
        .await
        .unwrap();
    assert_eq!(outcome, ArchiveOutcome::Created);
}

#[tokio::test]
async fn updates_file_with_existing_sha() {
    let server = MockServer::start().await;
    let tmp = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path(REMOTE))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"sha": "abc123", "name": "x"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(REMOTE))
        .and(body_partial_json(serde_json::json!({"sha": "abc123"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let archive = GitHubArchive::new(config(&server, Some("ghp_test"))).unwrap();
    let outcome = archive.upload(&transcript_file(&tmp), "update").await.unwrap();
    assert_eq!(outcome, ArchiveOutcome::Updated);
}

#[tokio::test]
async fn missing_token_skips_without_requests() {
    let server = MockServer::start().await;
    let tmp = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let archive = GitHubArchive::new(config(&server, None)).unwrap();
    let outcome = archive.upload(&transcript_file(&tmp), "skip").await.unwrap();
    assert_eq!(outcome, ArchiveOutcome::Skipped(SkipReason::NoCredential));
}

#[tokio::test]
async fn rejected_put_is_an_error() {
    let server = MockServer::start().await;
    let tmp = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path(REMOTE))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(REMOTE))
        .respond_with(ResponseTemplate::new(422).set_body_string("sha mismatch"))
        .mount(&server)
        .await;

    let archive = GitHubArchive::new(config(&server, Some("ghp_test"))).unwrap();
    let err = archive.upload(&transcript_file(&tmp), "msg").await.unwrap_err();
    assert!(err.to_string().contains("422"), "got: {err}");
}

#[tokio::test]
async fn missing_local_file_is_an_error() {
    let server = MockServer::start().await;
    let tmp = tempfile::tempdir().unwrap();

    let archive = GitHubArchive::new(config(&server, Some("ghp_test"))).unwrap();
    let result = archive
        .upload(&tmp.path().join("ai_conversation_2024-05-01.txt"), "msg")
        .await;
    assert!(result.is_err());
}

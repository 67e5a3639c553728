//! Account and resource endpoints against a mock backend

use chrono::{Duration, Utc};
use haven_core::{CredentialPair, CredentialStore, MemoryCredentialStore, TokenKey};
use haven_http::models::{
    JournalDraft, JournalEntry, MeditationDraft, SessionDraft, SessionUpdate,
};
use haven_http::types::{ProfileUpdate, RegisterRequest};
use haven_http::{AuthenticatedClient, ClientBuilder, ClientError, PublicClient};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("haven_http=debug")
        .with_test_writer()
        .try_init();
}

fn logged_in(server: &MockServer) -> (AuthenticatedClient, Arc<MemoryCredentialStore>) {
    let store = Arc::new(MemoryCredentialStore::with_pair(&CredentialPair::new(
        "A1", "R1",
    )));
    let client = ClientBuilder::new()
        .base_url(server.uri())
        .credential_store(store.clone())
        .build_authenticated()
        .unwrap();
    (client, store)
}

fn entry_json(id: u64, text: &str) -> serde_json::Value {
    json!({
        "id": id,
        "entry_text": text,
        "created_at": "2025-03-02T08:15:30Z",
        "user": 1
    })
}

#[tokio::test]
async fn test_login_stores_both_tokens() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/token/"))
        .and(body_json(json!({ "username": "sam", "password": "pw" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "access": "A1", "refresh": "R1" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::new());
    let client = ClientBuilder::new()
        .base_url(server.uri())
        .credential_store(store.clone())
        .build_authenticated()
        .unwrap();

    assert!(!client.is_logged_in().unwrap());
    client.login("sam", "pw").await.unwrap();
    assert!(client.is_logged_in().unwrap());
    assert_eq!(store.get(TokenKey::Access).unwrap().as_deref(), Some("A1"));
    assert_eq!(store.get(TokenKey::Refresh).unwrap().as_deref(), Some("R1"));

    client.logout().unwrap();
    assert_eq!(store.get(TokenKey::Access).unwrap(), None);
    assert_eq!(store.get(TokenKey::Refresh).unwrap(), None);
}

#[tokio::test]
async fn test_login_rejection_keeps_server_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/token/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "No active account found with the given credentials"
        })))
        .mount(&server)
        .await;

    let public = PublicClient::new(server.uri()).unwrap();
    let err = public.obtain_token("sam", "wrong").await.err().unwrap();
    assert_eq!(err.status(), Some(401));
    assert!(
        err.to_string()
            .contains("No active account found with the given credentials")
    );
}

#[tokio::test]
async fn test_blank_login_is_rejected_locally() {
    let server = MockServer::start().await;
    let public = PublicClient::new(server.uri()).unwrap();

    let result = public.obtain_token("sam", "  ").await;
    assert!(matches!(result, Err(ClientError::Validation(_))));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_register_checks_password_confirmation() {
    let server = MockServer::start().await;
    let public = PublicClient::new(server.uri()).unwrap();

    let registration = RegisterRequest {
        username: "sam".into(),
        email: "sam@example.com".into(),
        password: "hunter22".into(),
        password2: "hunter23".into(),
    };
    let result = public.register(&registration).await;
    assert!(matches!(result, Err(ClientError::Validation(m)) if m == "Passwords do not match."));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_register_creates_account() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/users/"))
        .and(body_json(json!({
            "username": "sam",
            "email": "sam@example.com",
            "password": "hunter22",
            "password2": "hunter22"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 5,
            "username": "sam",
            "email": "sam@example.com"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let public = PublicClient::new(server.uri()).unwrap();
    let profile = public
        .register(&RegisterRequest {
            username: "sam".into(),
            email: "sam@example.com".into(),
            password: "hunter22".into(),
            password2: "hunter22".into(),
        })
        .await
        .unwrap();
    assert_eq!(profile.id, 5);
}

#[tokio::test]
async fn test_password_reset_flow() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/users/password_reset/"))
        .and(body_json(json!({ "email": "sam@example.com" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "message": "Password reset email sent." })),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/users/password_reset/verify/"))
        .and(query_param("uid", "MQ"))
        .and(query_param("token", "abc-123"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "message": "Token is valid." })),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/users/password_reset/confirm/"))
        .and(body_json(json!({ "uid": "MQ", "token": "abc-123", "password": "n3w-pass" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Password has been reset successfully."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let public = PublicClient::new(server.uri()).unwrap();
    let sent = public
        .request_password_reset("sam@example.com")
        .await
        .unwrap();
    assert_eq!(sent.message, "Password reset email sent.");

    let verified = public.verify_password_reset("MQ", "abc-123").await.unwrap();
    assert_eq!(verified.message, "Token is valid.");

    public
        .confirm_password_reset("MQ", "abc-123", "n3w-pass")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_profile_round_trip() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/profile/"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 5,
            "username": "sam",
            "email": "sam@example.com",
            "date_joined": "2025-01-01T00:00:00Z"
        })))
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/users/profile/"))
        .and(body_json(json!({ "email": "new@example.com" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 5,
            "username": "sam",
            "email": "new@example.com"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = logged_in(&server);
    let profile = client.profile().await.unwrap();
    assert_eq!(profile.username, "sam");
    assert!(profile.extra.contains_key("date_joined"));

    let updated = client
        .update_profile(&ProfileUpdate {
            email: Some("new@example.com".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(updated.email, "new@example.com");
}

#[tokio::test]
async fn test_list_all_follows_next_links() {
    init_tracing();
    let server = MockServer::start().await;
    let second_page = format!("{}/journaling/?page=2", server.uri());

    Mock::given(method("GET"))
        .and(path("/journaling/"))
        .and(query_param_is_missing("page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 3,
            "next": second_page,
            "previous": null,
            "results": [entry_json(3, "third"), entry_json(2, "second")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    // An entry created between page loads shifts item 2 onto page two
    Mock::given(method("GET"))
        .and(path("/journaling/"))
        .and(query_param("page", "2"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 3,
            "next": null,
            "previous": server.uri(),
            "results": [entry_json(2, "second"), entry_json(1, "first")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = logged_in(&server);
    let entries: Vec<JournalEntry> = client.journal().list_all().await.unwrap();
    let ids: Vec<u64> = entries.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![3, 2, 1]);
}

#[tokio::test]
async fn test_list_all_stops_on_repeated_next_link() {
    let server = MockServer::start().await;
    let looping = format!("{}/journaling/meditations/?page=2", server.uri());

    Mock::given(method("GET"))
        .and(path("/journaling/meditations/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 0,
            "next": looping,
            "previous": null,
            "results": []
        })))
        .expect(2)
        .mount(&server)
        .await;

    let (client, _) = logged_in(&server);
    let meditations = client.meditations().list_all().await.unwrap();
    assert!(meditations.is_empty());
}

#[tokio::test]
async fn test_list_all_stops_on_two_page_cycle() {
    let server = MockServer::start().await;
    let first_page = format!("{}/journaling/", server.uri());
    let second_page = format!("{}/journaling/?page=2", server.uri());

    Mock::given(method("GET"))
        .and(path("/journaling/"))
        .and(query_param_is_missing("page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 2,
            "next": second_page,
            "previous": null,
            "results": [entry_json(2, "second")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/journaling/"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 2,
            "next": first_page,
            "previous": first_page,
            "results": [entry_json(1, "first")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = logged_in(&server);
    let entries = tokio::time::timeout(std::time::Duration::from_secs(5), client.journal().list_all())
        .await
        .expect("pagination must terminate")
        .unwrap();
    let ids: Vec<u64> = entries.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![2, 1]);
}

#[tokio::test]
async fn test_foreign_next_link_gets_no_credentials() {
    let server = MockServer::start().await;
    let elsewhere = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/journaling/meditations/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 2,
            "next": format!("{}/journaling/meditations/?page=2", elsewhere.uri()),
            "previous": null,
            "results": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/journaling/meditations/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 2,
            "next": null,
            "previous": null,
            "results": []
        })))
        .expect(1)
        .mount(&elsewhere)
        .await;

    let (client, _) = logged_in(&server);
    client.meditations().list_all().await.unwrap();

    let requests = elsewhere.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_exercise_note_add_list_edit() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/journaling/"))
        .and(body_json(json!({ "entry_text": "Exercise: Reframe\n\nFelt lighter" })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(entry_json(11, "Exercise: Reframe\n\nFelt lighter")),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/journaling/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 3,
            "next": null,
            "previous": null,
            "results": [
                entry_json(11, "Exercise: Reframe\n\nFelt lighter"),
                entry_json(10, "Plain day"),
                entry_json(9, "Exercise: Reframe\n\nStill anxious")
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/journaling/11/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(entry_json(11, "Exercise: Reframe\n\nFelt lighter")),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/journaling/11/"))
        .and(body_json(json!({ "entry_text": "Exercise: Reframe\n\nFelt much lighter" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(entry_json(11, "Exercise: Reframe\n\nFelt much lighter")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = logged_in(&server);
    let journal = client.journal();

    let created = journal
        .add_exercise_note("Reframe", "  Felt lighter ")
        .await
        .unwrap();
    assert_eq!(created.exercise_note().unwrap().note, "Felt lighter");

    let notes = journal.exercise_notes().await.unwrap();
    assert_eq!(notes.len(), 1);
    let ids: Vec<u64> = notes["Reframe"].iter().map(|n| n.entry_id).collect();
    assert_eq!(ids, vec![11, 9]);

    let edited = journal
        .edit_exercise_note(11, "Felt much lighter")
        .await
        .unwrap();
    let note = edited.exercise_note().unwrap();
    assert_eq!(note.exercise_title, "Reframe");
    assert_eq!(note.note, "Felt much lighter");
}

#[tokio::test]
async fn test_exercise_note_edit_rejects_plain_entry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/journaling/10/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(entry_json(10, "Plain day")))
        .mount(&server)
        .await;

    let (client, _) = logged_in(&server);
    let journal = client.journal();

    let result = journal.edit_exercise_note(10, "note").await;
    assert!(matches!(result, Err(ClientError::Validation(_))));

    let result = journal.add_exercise_note("Reframe", "   ").await;
    assert!(matches!(result, Err(ClientError::Validation(_))));

    // Only the lookup of entry 10 reached the server
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_session_edit_patches_given_fields() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/journaling/problem_solving_sessions/4/"))
        .and(body_json(json!({ "title": "Budget review", "notes_before": "Bring bank statements" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 4,
            "user": 1,
            "title": "Budget review",
            "scheduled_time": "2030-06-01T10:00:00Z",
            "notes_before": "Bring bank statements",
            "notes_after": null,
            "completed": false,
            "completed_at": null,
            "created_at": "2025-05-20T12:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = logged_in(&server);
    let sessions = client.problem_solving_sessions();

    let updated = sessions
        .edit(
            4,
            &SessionUpdate {
                title: Some("Budget review".into()),
                notes_before: Some("Bring bank statements".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.title, "Budget review");

    let result = sessions.edit(4, &SessionUpdate::default()).await;
    assert!(matches!(result, Err(ClientError::Validation(_))));
}

#[tokio::test]
async fn test_create_validates_before_sending() {
    let server = MockServer::start().await;
    let (client, _) = logged_in(&server);

    let result = client
        .journal()
        .create(&JournalDraft {
            entry_text: "   ".into(),
        })
        .await;
    assert!(matches!(result, Err(ClientError::Validation(_))));

    let result = client
        .meditations()
        .create(&MeditationDraft {
            title: "Breath".into(),
            description: String::new(),
            duration: 0,
            audio_url: None,
        })
        .await;
    assert!(matches!(result, Err(ClientError::Validation(_))));

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_journal_create_update_delete() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/journaling/"))
        .and(body_json(json!({ "entry_text": "Went for a run" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(entry_json(9, "Went for a run")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/journaling/9/"))
        .and(body_json(json!({ "entry_text": "Went for a long run" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(entry_json(9, "Went for a long run")),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/journaling/9/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = logged_in(&server);
    let journal = client.journal();

    let created = journal
        .create(&JournalDraft {
            entry_text: "Went for a run".into(),
        })
        .await
        .unwrap();
    assert_eq!(created.id, 9);

    let updated = journal
        .update(
            9,
            &JournalDraft {
                entry_text: "Went for a long run".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.entry_text, "Went for a long run");

    journal.delete(9).await.unwrap();
}

#[tokio::test]
async fn test_session_create_and_complete() {
    let server = MockServer::start().await;
    let scheduled = Utc::now() + Duration::days(1);

    let session = |completed: bool, notes_after: Option<&str>| {
        let completed_at = completed.then(|| Utc::now().to_rfc3339());
        json!({
            "id": 4,
            "user": 1,
            "title": "Sort out budget",
            "scheduled_time": scheduled.to_rfc3339(),
            "notes_before": "Gather receipts",
            "notes_after": notes_after,
            "completed": completed,
            "completed_at": completed_at,
            "created_at": "2025-05-20T12:00:00Z"
        })
    };

    Mock::given(method("POST"))
        .and(path("/journaling/problem_solving_sessions/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(session(false, None)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/journaling/problem_solving_sessions/4/"))
        .and(body_json(json!({ "completed": true, "notes_after": "Cut two subscriptions" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(session(true, Some("Cut two subscriptions"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = logged_in(&server);
    let sessions = client.problem_solving_sessions();

    let created = sessions
        .create(&SessionDraft {
            title: "Sort out budget".into(),
            scheduled_time: scheduled,
            notes_before: Some("Gather receipts".into()),
            notes_after: None,
            completed: false,
        })
        .await
        .unwrap();
    assert!(!created.completed);

    let done = sessions
        .complete(4, Some("Cut two subscriptions".into()))
        .await
        .unwrap();
    assert!(done.completed);
    assert!(done.completed_at.is_some());
}

#[tokio::test]
async fn test_resource_calls_recover_from_expired_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/journaling/cognitive_exercises/"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "A2" })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/journaling/cognitive_exercises/"))
        .and(header("authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1,
            "next": null,
            "previous": null,
            "results": [{
                "id": 1,
                "title": "Reframe",
                "prompt": "What evidence contradicts the thought?",
                "example": "I failed once, not always.",
                "created_at": "2025-02-01T00:00:00Z"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = logged_in(&server);
    let exercises = client.cognitive_exercises().list_all().await.unwrap();
    assert_eq!(exercises.len(), 1);
    assert_eq!(store.get(TokenKey::Access).unwrap().as_deref(), Some("A2"));
}

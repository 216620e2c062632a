//! Integration tests for the sync pipeline against a mock backend.


use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use tokio::runtime::Handle;

use self::backend::{MockBackend, TOKEN};
use crate::auth::{CredentialProvider, StaticCredentials};
use crate::db::{init_database, ChangeSet, Repository};
use crate::errors::{codes, SyncError};
use crate::models::{ContextQuestion, QuestionKind, RequestQuestion, Topic};
use crate::remote::RemoteClient;
use crate::sync::TopicSync;

const LEADER: &str = "leader-1";

/// Test fixture: a mock backend on a random port and an engine with a
/// fresh database.
struct TestFixture {
    backend: MockBackend,
    engine: TopicSync,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_credentials(Arc::new(StaticCredentials::new(LEADER, TOKEN))).await
    }

    async fn anonymous() -> Self {
        Self::with_credentials(Arc::new(StaticCredentials::anonymous())).await
    }

    async fn with_credentials(credentials: Arc<dyn CredentialProvider>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Repository::new(pool);

        let backend = MockBackend::new();
        let app = backend.router();

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let remote = RemoteClient::new(
            &format!("http://{}/api/", addr),
            Duration::from_secs(5),
            credentials,
        )
        .expect("Failed to build client");

        TestFixture {
            backend,
            engine: TopicSync::new(remote, repo, Handle::current()),
            _temp_dir: temp_dir,
        }
    }

    fn repo(&self) -> &Repository {
        self.engine.repository()
    }

    /// Save topics straight into the local store.
    async fn seed_local(&self, topics: &[(i64, &str)]) {
        let mut changes = ChangeSet::new();
        for (id, join_code) in topics {
            let mut topic = Topic::new(*join_code, LEADER, format!("Local {}", join_code), 1);
            topic.id = Some(*id);
            changes.upsert_topic(&topic);
        }
        self.repo().save(&changes).await.unwrap();
    }

    async fn local_join_codes(&self) -> Vec<String> {
        self.repo()
            .list_topics()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.join_code)
            .collect()
    }

    async fn link_count(&self) -> i64 {
        let context: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM topic_context_questions")
            .fetch_one(self.repo().pool())
            .await
            .unwrap();
        let request: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM topic_request_questions")
            .fetch_one(self.repo().pool())
            .await
            .unwrap();
        context + request
    }
}

/// Break the local store so the next save touching question links fails.
async fn drop_link_table(fixture: &TestFixture) {
    sqlx::query("DROP TABLE topic_context_questions")
        .execute(fixture.repo().pool())
        .await
        .unwrap();
}

fn ids(values: &[i64]) -> BTreeSet<i64> {
    values.iter().copied().collect()
}

fn context_question(id: i64) -> ContextQuestion {
    ContextQuestion {
        id,
        question: format!("Context {}", id),
        template: true,
    }
}

fn request_question(id: i64) -> RequestQuestion {
    RequestQuestion {
        id,
        question: format!("Request {}", id),
        template: false,
    }
}

// ==================== INGESTION ====================

#[tokio::test]
async fn test_get_topics_links_questions() {
    let fixture = TestFixture::new().await;
    fixture.backend.add_topic(1, "A", LEADER, &[10, 11], &[20]);
    fixture.backend.add_topic(2, "B", "leader-2", &[11], &[]);
    fixture.backend.add_context_question(10, "Why?");
    fixture.backend.add_context_question(11, "How?");
    fixture.backend.add_request_question(20, "Please?");

    let report = fixture.engine.get_topics().await.unwrap();
    assert_eq!(report.synced, vec!["A".to_string(), "B".to_string()]);
    assert!(report.failures.is_empty());
    assert!(report.removed.is_empty());

    let a = fixture.repo().get_topic_by_join_code("A").await.unwrap().unwrap();
    assert_eq!(a.id, Some(1));
    assert_eq!(a.context_questions, ids(&[10, 11]));
    assert_eq!(a.request_questions, ids(&[20]));

    let b = fixture.repo().get_topic_by_join_code("B").await.unwrap().unwrap();
    assert_eq!(b.leader_id, "leader-2");
    assert_eq!(b.context_questions, ids(&[11]));
    assert!(b.request_questions.is_empty());

    let question = fixture.repo().get_context_question(11).await.unwrap().unwrap();
    assert_eq!(question.question, "How?");
}

#[tokio::test]
async fn test_get_topics_collects_failed_children() {
    let fixture = TestFixture::new().await;
    // 11 fails with a 500, 12 does not exist
    fixture.backend.add_topic(1, "A", LEADER, &[10, 11, 12], &[20]);
    fixture.backend.add_topic(2, "B", LEADER, &[10], &[]);
    fixture.backend.add_context_question(10, "Why?");
    fixture.backend.add_context_question(11, "How?");
    fixture.backend.add_request_question(20, "Please?");
    fixture.backend.fail("contextquestion/11");
    fixture.backend.fail("topic/2/details");

    let report = fixture.engine.get_topics().await.unwrap();

    // Every topic is still saved once its stages close
    assert_eq!(report.synced, vec!["A".to_string(), "B".to_string()]);

    let mut failed: Vec<String> = report.failures.iter().map(|f| f.resource.clone()).collect();
    failed.sort();
    assert_eq!(
        failed,
        vec!["contextquestion/11", "contextquestion/12", "topic/2/details"]
    );
    assert!(report.failures.iter().all(|f| f.code == codes::STATUS));

    let a = fixture.repo().get_topic_by_join_code("A").await.unwrap().unwrap();
    assert_eq!(a.context_questions, ids(&[10]));
    assert_eq!(a.request_questions, ids(&[20]));

    let b = fixture.repo().get_topic_by_join_code("B").await.unwrap().unwrap();
    assert!(b.context_questions.is_empty());
}

#[tokio::test]
async fn test_get_topics_is_idempotent() {
    let fixture = TestFixture::new().await;
    fixture.backend.add_topic(1, "A", LEADER, &[10, 11], &[20]);
    fixture.backend.add_topic(2, "B", LEADER, &[10], &[20]);
    fixture.backend.add_context_question(10, "Why?");
    fixture.backend.add_context_question(11, "How?");
    fixture.backend.add_request_question(20, "Please?");

    fixture.engine.get_topics().await.unwrap();
    let first = fixture.repo().list_topics().await.unwrap();
    let first_links = fixture.link_count().await;

    fixture.engine.get_topics().await.unwrap();
    let second = fixture.repo().list_topics().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first_links, 5);
    assert_eq!(fixture.link_count().await, first_links);
}

#[tokio::test]
async fn test_details_are_matched_by_join_code() {
    let fixture = TestFixture::new().await;
    fixture.backend.add_topic(1, "A", LEADER, &[10], &[]);
    fixture.backend.add_topic(2, "B", LEADER, &[11], &[]);
    fixture.backend.add_topic(3, "C", LEADER, &[12], &[]);
    fixture.backend.add_context_question(10, "Why?");
    fixture.backend.add_context_question(11, "How?");
    fixture.backend.add_context_question(12, "When?");

    // Details come back in reverse order of the topic list
    fixture.backend.delay("topic/1/details", Duration::from_millis(150));
    fixture.backend.delay("topic/2/details", Duration::from_millis(75));

    fixture.engine.get_topics().await.unwrap();

    for (join_code, question) in [("A", 10), ("B", 11), ("C", 12)] {
        let topic = fixture
            .repo()
            .get_topic_by_join_code(join_code)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(topic.context_questions, ids(&[question]), "topic {}", join_code);
    }
}

#[tokio::test]
async fn test_get_topics_removes_topics_gone_from_server() {
    let fixture = TestFixture::new().await;
    fixture.seed_local(&[(1, "A"), (9, "Z")]).await;
    fixture.backend.add_topic(1, "A", LEADER, &[], &[]);

    let report = fixture.engine.get_topics().await.unwrap();
    assert_eq!(report.synced, vec!["A".to_string()]);
    assert_eq!(report.removed, vec!["Z".to_string()]);
    assert_eq!(fixture.local_join_codes().await, vec!["A".to_string()]);
}

#[tokio::test]
async fn test_get_topics_rejects_undecodable_list() {
    let fixture = TestFixture::new().await;
    fixture.seed_local(&[(1, "A")]).await;
    fixture.backend.state().topics.push(json!({ "id": 1, "topicname": "no join code" }));

    let err = fixture.engine.get_topics().await.unwrap_err();
    assert_eq!(err.error_code(), codes::DECODE);

    // Nothing local is touched
    assert_eq!(fixture.local_join_codes().await, vec!["A".to_string()]);
}

#[tokio::test]
async fn test_get_topics_reports_list_status() {
    let fixture = TestFixture::new().await;
    fixture.backend.fail("topic");

    let err = fixture.engine.get_topics().await.unwrap_err();
    assert_eq!(
        err,
        SyncError::Status {
            status: 500,
            path: "topic".to_string()
        }
    );
}

#[tokio::test]
async fn test_get_topics_follows_server_links() {
    let fixture = TestFixture::new().await;
    fixture.backend.add_topic(1, "A", LEADER, &[10, 11], &[20]);
    fixture.backend.add_context_question(10, "Why?");
    fixture.backend.add_context_question(11, "How?");
    fixture.backend.add_request_question(20, "Please?");
    fixture.backend.state().topics[0]["members"] =
        json!([{ "id": "m1" }, { "id": "m2", "firstname": "Mo" }]);

    fixture.engine.get_topics().await.unwrap();
    let a = fixture.repo().get_topic_by_join_code("A").await.unwrap().unwrap();
    assert_eq!(a.context_questions, ids(&[10, 11]));
    assert_eq!(a.members.len(), 2);

    // The server drops question 11, request 20 and member m1
    fixture.backend.set_details(1, "A", LEADER, &[10], &[]);
    fixture.backend.state().topics[0]["members"] = json!([{ "id": "m2", "firstname": "Mo" }]);

    fixture.engine.get_topics().await.unwrap();
    let a = fixture.repo().get_topic_by_join_code("A").await.unwrap().unwrap();
    assert_eq!(a.context_questions, ids(&[10]));
    assert!(a.request_questions.is_empty());
    assert_eq!(
        a.members.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(),
        vec!["m2"]
    );
}

#[tokio::test]
async fn test_get_topics_keeps_links_when_details_fail() {
    let fixture = TestFixture::new().await;
    fixture.backend.add_topic(1, "A", LEADER, &[10, 11], &[]);
    fixture.backend.add_context_question(10, "Why?");
    fixture.backend.add_context_question(11, "How?");
    fixture.engine.get_topics().await.unwrap();

    // Without details the existing links stand
    fixture.backend.set_details(1, "A", LEADER, &[10], &[]);
    fixture.backend.fail("topic/1/details");

    let report = fixture.engine.get_topics().await.unwrap();
    assert_eq!(report.failures[0].resource, "topic/1/details");
    let a = fixture.repo().get_topic_by_join_code("A").await.unwrap().unwrap();
    assert_eq!(a.context_questions, ids(&[10, 11]));

    // A listed question that fails to fetch keeps its link
    fixture.backend.set_details(1, "A", LEADER, &[10, 11], &[]);
    {
        let mut state = fixture.backend.state();
        state.failing.clear();
        state.failing.insert("contextquestion/11".to_string());
    }

    let report = fixture.engine.get_topics().await.unwrap();
    assert_eq!(report.failures[0].resource, "contextquestion/11");
    let a = fixture.repo().get_topic_by_join_code("A").await.unwrap().unwrap();
    assert_eq!(a.context_questions, ids(&[10, 11]));
}

#[tokio::test]
async fn test_get_topics_ignores_repeated_join_code() {
    let fixture = TestFixture::new().await;
    fixture.backend.add_topic(1, "A", LEADER, &[10], &[]);
    fixture.backend.add_topic(2, "A", "leader-2", &[11], &[]);
    fixture.backend.add_context_question(10, "Why?");
    fixture.backend.add_context_question(11, "How?");

    let report = fixture.engine.get_topics().await.unwrap();
    assert_eq!(report.synced, vec!["A".to_string()]);

    let a = fixture.repo().get_topic_by_join_code("A").await.unwrap().unwrap();
    assert_eq!(a.id, Some(1));
    assert_eq!(a.leader_id, LEADER);
    assert_eq!(a.context_questions, ids(&[10]));
    assert!(!fixture
        .backend
        .requests()
        .contains(&"GET topic/2/details".to_string()));
}

#[tokio::test]
async fn test_get_topics_save_failure_is_terminal() {
    let fixture = TestFixture::new().await;
    fixture.backend.add_topic(1, "A", LEADER, &[10], &[]);
    fixture.backend.add_context_question(10, "Why?");
    drop_link_table(&fixture).await;

    let err = fixture.engine.get_topics().await.unwrap_err();
    assert_eq!(err.error_code(), codes::PERSISTENCE);
}

// ==================== REFRESH BY JOIN CODE ====================

#[tokio::test]
async fn test_get_topic_keeps_only_matching_join_code() {
    let fixture = TestFixture::new().await;
    fixture.backend.add_topic(1, "A", LEADER, &[10], &[]);
    fixture.backend.add_topic(2, "B", LEADER, &[11], &[]);
    fixture.seed_local(&[(1, "A"), (3, "C")]).await;

    let topic = fixture.engine.get_topic("A").await.unwrap();
    assert_eq!(topic.id, Some(1));
    assert_eq!(topic.join_code, "A");
    assert_eq!(topic.topic_name, "Topic A");

    assert_eq!(fixture.local_join_codes().await, vec!["A".to_string()]);
    assert!(fixture.repo().get_topic_by_join_code("C").await.unwrap().is_none());

    // Only the list was fetched; topic 2 was never requested
    assert_eq!(fixture.backend.requests(), vec!["GET topic".to_string()]);
}

#[tokio::test]
async fn test_get_topic_unknown_join_code() {
    let fixture = TestFixture::new().await;
    fixture.backend.add_topic(2, "B", LEADER, &[], &[]);
    fixture.seed_local(&[(1, "A")]).await;

    let err = fixture.engine.get_topic("Z").await.unwrap_err();
    assert!(matches!(err, SyncError::NotFound(_)));

    // The local store is left as it was
    assert_eq!(fixture.local_join_codes().await, vec!["A".to_string()]);
}

// ==================== CREATION ====================

#[tokio::test]
async fn test_post_topic_patches_server_id() {
    let fixture = TestFixture::new().await;

    let join_code = fixture
        .engine
        .post_topic("Retro", 4, &[context_question(10)], &[request_question(20)])
        .await
        .unwrap();
    assert!(uuid::Uuid::parse_str(&join_code).is_ok());

    let topic = fixture
        .repo()
        .get_topic_by_join_code(&join_code)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(topic.id, Some(100));
    assert_eq!(topic.leader_id, LEADER);
    assert_eq!(topic.context_id, 4);
    assert_eq!(topic.context_questions, ids(&[10]));
    assert_eq!(topic.request_questions, ids(&[20]));

    let state = fixture.backend.state();
    assert_eq!(state.posted_topics.len(), 1);
    let posted = &state.posted_topics[0];
    assert_eq!(posted["joincode"], json!(join_code));
    assert_eq!(posted["leaderid"], json!(LEADER));
    assert_eq!(posted["topicname"], json!("Retro"));
    assert!(posted.get("id").is_none());

    let mut links = state.links.clone();
    links.sort_by_key(|l| l["questionid"].as_i64());
    assert_eq!(
        links,
        vec![
            json!({ "topicid": 100, "questionid": 10 }),
            json!({ "topicid": 100, "questionid": 20 }),
        ]
    );
}

#[tokio::test]
async fn test_post_topic_without_user_sends_nothing() {
    let fixture = TestFixture::anonymous().await;

    let err = fixture
        .engine
        .post_topic("Retro", 1, &[context_question(10)], &[])
        .await
        .unwrap_err();
    assert_eq!(err, SyncError::NotAuthenticated);

    assert!(fixture.backend.requests().is_empty());
    assert!(fixture.local_join_codes().await.is_empty());
}

#[tokio::test]
async fn test_post_topic_failure_keeps_placeholder() {
    let fixture = TestFixture::new().await;
    fixture.backend.fail("topic");

    let err = fixture
        .engine
        .post_topic("Retro", 1, &[], &[])
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(500));

    let topics = fixture.repo().list_topics().await.unwrap();
    assert_eq!(topics.len(), 1);
    assert_eq!(topics[0].id, None);
    assert!(fixture.backend.state().links.is_empty());
}

#[tokio::test]
async fn test_post_topic_rejects_reply_without_id() {
    let fixture = TestFixture::new().await;
    fixture.backend.state().malformed_create = true;

    let err = fixture
        .engine
        .post_topic("Retro", 1, &[context_question(10)], &[request_question(20)])
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Decode(_)));

    // No link was attempted and the placeholder stays local
    assert_eq!(fixture.backend.requests(), vec!["POST topic".to_string()]);
    let topics = fixture.repo().list_topics().await.unwrap();
    assert_eq!(topics.len(), 1);
    assert_eq!(topics[0].id, None);
    assert!(topics[0].context_questions.is_empty());
}

// ==================== QUESTION LINKING ====================

#[tokio::test]
async fn test_add_questions_links_locally_when_posts_fail() {
    let fixture = TestFixture::new().await;
    fixture.backend.fail("topicquestion");

    let mut topic = Topic::new("A", LEADER, "Topic A", 1);
    topic.id = Some(7);

    let report = fixture
        .engine
        .add_questions(
            &[context_question(10), context_question(11)],
            &[request_question(20)],
            &mut topic,
        )
        .await
        .unwrap();

    assert!(report.linked.is_empty());
    assert_eq!(report.failures.len(), 3);
    assert_eq!(fixture.backend.requests().len(), 3);

    assert_eq!(topic.context_questions, ids(&[10, 11]));
    let saved = fixture.repo().get_topic_by_join_code("A").await.unwrap().unwrap();
    assert_eq!(saved.context_questions, ids(&[10, 11]));
    assert_eq!(saved.request_questions, ids(&[20]));
}

#[tokio::test]
async fn test_add_questions_without_server_id() {
    let fixture = TestFixture::new().await;
    let mut topic = Topic::new("A", LEADER, "Topic A", 1);

    let report = fixture
        .engine
        .add_questions(&[context_question(10)], &[request_question(20)], &mut topic)
        .await
        .unwrap();

    assert_eq!(report.failures.len(), 2);
    assert!(report.failures.iter().all(|f| f.code == codes::BAD_REQUEST));
    assert!(fixture.backend.requests().is_empty());

    let saved = fixture.repo().get_topic_by_join_code("A").await.unwrap().unwrap();
    assert_eq!(saved.context_questions, ids(&[10]));
    assert_eq!(saved.request_questions, ids(&[20]));
}

#[tokio::test]
async fn test_add_questions_twice_does_not_duplicate() {
    let fixture = TestFixture::new().await;
    let mut topic = Topic::new("A", LEADER, "Topic A", 1);
    topic.id = Some(7);

    for _ in 0..2 {
        fixture
            .engine
            .add_questions(&[context_question(10)], &[], &mut topic)
            .await
            .unwrap();
    }

    assert_eq!(fixture.link_count().await, 1);
    assert_eq!(fixture.backend.state().links.len(), 2);
}

#[tokio::test]
async fn test_add_questions_save_failure_is_terminal() {
    let fixture = TestFixture::new().await;
    drop_link_table(&fixture).await;

    let mut topic = Topic::new("A", LEADER, "Topic A", 1);
    topic.id = Some(7);

    let err = fixture
        .engine
        .add_questions(&[context_question(10)], &[], &mut topic)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), codes::PERSISTENCE);

    // The link POST still went out before the save
    assert_eq!(fixture.backend.state().links.len(), 1);
}

// ==================== DELETION ====================

#[tokio::test]
async fn test_delete_topic_then_local() {
    let fixture = TestFixture::new().await;
    fixture.backend.add_topic(1, "A", LEADER, &[], &[]);
    fixture.engine.get_topics().await.unwrap();

    let topic = fixture.repo().get_topic_by_join_code("A").await.unwrap().unwrap();
    fixture.engine.delete_topic(&topic).await.unwrap();
    assert_eq!(fixture.backend.state().deleted, vec![1]);

    // Remote deletion leaves the local copy alone
    assert_eq!(fixture.local_join_codes().await, vec!["A".to_string()]);

    fixture.engine.delete_local_topics(&[topic]).await.unwrap();
    assert!(fixture.local_join_codes().await.is_empty());
}

#[tokio::test]
async fn test_delete_topic_requires_id_and_user() {
    let fixture = TestFixture::anonymous().await;

    let placeholder = Topic::new("A", LEADER, "Topic A", 1);
    let err = fixture.engine.delete_topic(&placeholder).await.unwrap_err();
    assert!(matches!(err, SyncError::BadRequest(_)));

    let mut topic = placeholder.clone();
    topic.id = Some(1);
    let err = fixture.engine.delete_topic(&topic).await.unwrap_err();
    assert_eq!(err, SyncError::NotAuthenticated);

    assert!(fixture.backend.requests().is_empty());
}

// ==================== CATALOG ====================

#[tokio::test]
async fn test_default_contexts_and_questions() {
    let fixture = TestFixture::new().await;
    {
        let mut state = fixture.backend.state();
        state.contexts = vec![
            json!({ "id": 1, "title": "Work" }),
            json!({ "id": 2, "title": "Home" }),
        ];
    }
    fixture.backend.add_context_question(10, "Why?");
    fixture.backend.add_context_question(11, "How?");
    fixture.backend.add_request_question(20, "Please?");

    let contexts = fixture.engine.get_default_contexts().await.unwrap();
    assert_eq!(contexts.len(), 2);
    let saved = fixture.repo().list_contexts().await.unwrap();
    assert_eq!(saved[1].title, "Home");

    let questions = fixture.engine.get_default_context_questions().await.unwrap();
    assert_eq!(questions.iter().map(|q| q.id).collect::<Vec<_>>(), vec![10, 11]);
    assert_eq!(fixture.repo().list_context_questions().await.unwrap(), questions);
}

#[tokio::test]
async fn test_list_context_responses() {
    let fixture = TestFixture::new().await;
    fixture.backend.state().response_listing = vec![json!({
        "surveyrequestid": 5,
        "contextquestionid": 10,
        "response": "Because"
    })];

    let listing = fixture.engine.list_context_responses().await.unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].survey_id, 5);
    assert_eq!(listing[0].context_question_id, 10);
}

#[tokio::test]
async fn test_responses_and_threads_are_linked() {
    let fixture = TestFixture::new().await;
    {
        let mut state = fixture.backend.state();
        state
            .responses
            .insert(50, json!({ "id": 50, "response": "Because" }));
        state
            .responses
            .insert(51, json!({ "id": 51, "response": "Why not" }));
        state
            .threads
            .insert(60, json!({ "id": 60, "message": "Agreed" }));
        state
            .threads
            .insert(61, json!({ "id": 61, "message": "Hmm" }));
    }
    fixture.backend.fail("thread/61");

    let report = fixture
        .engine
        .get_context_responses(10, &[50, 51, 52])
        .await
        .unwrap();
    assert_eq!(report.fetched, ids(&[50, 51]));
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].resource, "contextresponse/52");
    assert_eq!(
        fixture.repo().question_response_ids(10).await.unwrap(),
        ids(&[50, 51])
    );

    let report = fixture.engine.get_threads(50, &[60, 61]).await.unwrap();
    assert_eq!(report.fetched, ids(&[60]));
    assert_eq!(report.failures[0].resource, "thread/61");

    let response = fixture.repo().get_context_response(50).await.unwrap().unwrap();
    assert_eq!(response.context_question_id, Some(10));
    assert_eq!(response.threads, ids(&[60]));
    assert_eq!(
        fixture.repo().get_thread(60).await.unwrap().unwrap().message,
        "Agreed"
    );
}

#[tokio::test]
async fn test_leader_and_member_queries_after_sync() {
    let fixture = TestFixture::new().await;
    fixture.backend.add_topic(1, "A", LEADER, &[], &[]);
    fixture.backend.add_topic(2, "B", "leader-2", &[], &[]);
    fixture.backend.state().topics[1]["members"] = json!([{ "id": LEADER, "firstname": "Lee" }]);

    fixture.engine.get_topics().await.unwrap();

    let led = fixture.repo().leader_topics(LEADER, &[1, 2]).await.unwrap();
    assert_eq!(led.iter().map(|t| t.id).collect::<Vec<_>>(), vec![Some(1)]);

    let joined = fixture.repo().member_topics(LEADER, &[1, 2]).await.unwrap();
    assert_eq!(joined.len(), 1);
    assert_eq!(joined[0].join_code, "B");
    assert_eq!(joined[0].members[0].first_name.as_deref(), Some("Lee"));
}

//! Integration tests for the HTTP coaching client and the session on top
//! of it.
//!
//! Each test spins up a stub backend with Axum on a random port and talks
//! to it through `HttpCoachClient`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use diet_coach::blocks::{Block, BlockKind};
use diet_coach::client::{
    ChatRequest, CoachBackend, FollowupAnswers, HttpCoachClient, PlanRequest,
};
use diet_coach::config::CoachConfig;
use diet_coach::error::TransportError;
use diet_coach::onboarding::{BasicInfo, ChatSeed};
use diet_coach::session::{ConversationSession, ConversationStage, Sender, SubmitOutcome};
use diet_coach::session::prompts;
use diet_coach::survey::LifestyleAnswers;

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// What the stub backend answers, and every body it received.
#[derive(Clone)]
struct Stub {
    chat: (StatusCode, Value),
    plan: (StatusCode, Value),
    received: Arc<Mutex<Vec<(String, Value)>>>,
}

impl Stub {
    fn new(chat: (StatusCode, Value), plan: (StatusCode, Value)) -> Self {
        Self {
            chat,
            plan,
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn received(&self) -> Vec<(String, Value)> {
        self.received.lock().unwrap().clone()
    }
}

async fn chat_handler(State(stub): State<Stub>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    stub.received.lock().unwrap().push(("chat".into(), body));
    (stub.chat.0, Json(stub.chat.1.clone()))
}

async fn plan_handler(State(stub): State<Stub>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    stub.received.lock().unwrap().push(("plan".into(), body));
    (stub.plan.0, Json(stub.plan.1.clone()))
}

/// Start the stub backend on a random port, return a config pointing at it.
async fn start_server(stub: Stub) -> CoachConfig {
    let app = Router::new()
        .route("/agent/chat", post(chat_handler))
        .route("/agent/plan-init", post(plan_handler))
        .with_state(stub);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    tokio::time::sleep(Duration::from_millis(50)).await;

    CoachConfig {
        api_base_url: format!("http://127.0.0.1:{port}"),
        user_name: "강진희".into(),
        device_id: Some("device-42".into()),
        followup_delay: Duration::from_millis(10),
        request_timeout: Duration::from_secs(2),
        ..Default::default()
    }
}

fn ok_plan() -> (StatusCode, Value) {
    (
        StatusCode::OK,
        json!({ "status": "success", "message": "4주 플랜이 준비됐어요!", "session_id": "plan-7" }),
    )
}

fn seed() -> ChatSeed {
    ChatSeed {
        basic_info: BasicInfo {
            age: "25".into(),
            gender: "여성".into(),
            height: "162".into(),
            weight: "65".into(),
            period: "4".into(),
            target_loss: "5".into(),
        },
        lifestyle: LifestyleAnswers {
            exercise_freq: "1~2회".into(),
            meals_per_day: "1일 3식".into(),
            night_snack_freq: "자주 먹음".into(),
            eating_out_freq: "주 3~5회".into(),
            health_notes: String::new(),
        },
    }
}

// ── Client ──────────────────────────────────────────────────────────

#[tokio::test]
async fn chat_decodes_nested_blocks() {
    timeout(TEST_TIMEOUT, async {
        let body = json!({
            "blocks": [
                { "type": "markdown", "content": "점심 추천이에요" },
                { "type": "row", "gap": "12px", "children": [
                    { "type": "chart", "chartType": "bar", "title": "칼로리",
                      "data": { "labels": ["아침", "점심"], "values": [400, 650] } },
                    { "type": "air_quality", "title": "서울", "aqi": 42, "status": "good" }
                ]},
                { "type": "hologram" }
            ]
        });
        let stub = Stub::new((StatusCode::OK, body), ok_plan());
        let config = start_server(stub.clone()).await;
        let client = HttpCoachClient::new(&config).unwrap();

        let reply = client
            .chat(ChatRequest {
                message: "점심 뭐 먹지?".into(),
                device_id: config.device_id.clone(),
            })
            .await
            .unwrap();

        let kinds: Vec<BlockKind> = reply.content.blocks.iter().map(Block::kind).collect();
        assert_eq!(kinds, vec![BlockKind::Markdown, BlockKind::Row, BlockKind::Unsupported]);
        let Block::Row(ref row) = reply.content.blocks[1] else {
            panic!("expected row");
        };
        assert_eq!(row.children.len(), 2);

        let received = stub.received();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].1["message"], "점심 뭐 먹지?");
        assert_eq!(received[0].1["device_id"], "device-42");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn error_status_is_a_failure_even_with_a_body() {
    timeout(TEST_TIMEOUT, async {
        let stub = Stub::new(
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "blocks": [{ "type": "markdown", "content": "should not show" }] }),
            ),
            ok_plan(),
        );
        let config = start_server(stub).await;
        let client = HttpCoachClient::new(&config).unwrap();

        let err = client
            .chat(ChatRequest {
                message: "hi".into(),
                device_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Status { status: 500, .. }));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn malformed_chat_payload_is_an_error() {
    timeout(TEST_TIMEOUT, async {
        let stub = Stub::new((StatusCode::OK, json!({ "text": "plain" })), ok_plan());
        let config = start_server(stub).await;
        let client = HttpCoachClient::new(&config).unwrap();

        let err = client
            .chat(ChatRequest {
                message: "hi".into(),
                device_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Blocks(_)));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn plan_init_sends_everything_collected() {
    timeout(TEST_TIMEOUT, async {
        let stub = Stub::new((StatusCode::OK, json!({ "blocks": [] })), ok_plan());
        let config = start_server(stub.clone()).await;
        let client = HttpCoachClient::new(&config).unwrap();

        let seed = seed();
        let response = client
            .init_plan(PlanRequest {
                user_name: config.user_name.clone(),
                basic_info: seed.basic_info,
                lifestyle: seed.lifestyle,
                followup: FollowupAnswers {
                    q1: "야식 끊기".into(),
                    q2: "걷기".into(),
                    q3: "아침은 밥".into(),
                },
                device_id: None,
            })
            .await
            .unwrap();
        assert_eq!(response.session_id.as_deref(), Some("plan-7"));

        let received = stub.received();
        let body = &received[0].1;
        assert_eq!(received[0].0, "plan");
        assert_eq!(body["user_name"], "강진희");
        assert_eq!(body["basicInfo"]["targetLoss"], "5");
        assert_eq!(body["lifestyle"]["nightSnackFreq"], "자주 먹음");
        assert_eq!(body["followup"]["q3"], "아침은 밥");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn unreachable_backend_is_a_request_failure() {
    timeout(TEST_TIMEOUT, async {
        // Bind then drop to get a port nobody listens on.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = CoachConfig {
            api_base_url: format!("http://127.0.0.1:{port}"),
            ..Default::default()
        };
        let client = HttpCoachClient::new(&config).unwrap();

        let err = client
            .chat(ChatRequest {
                message: "hi".into(),
                device_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::RequestFailed { .. }));
    })
    .await
    .expect("test timed out");
}

// ── Session over HTTP ───────────────────────────────────────────────

#[tokio::test]
async fn session_runs_followups_plan_and_chat() {
    timeout(TEST_TIMEOUT, async {
        let stub = Stub::new(
            (
                StatusCode::OK,
                json!([{ "type": "markdown", "content": "샐러드 어때요?" }]),
            ),
            ok_plan(),
        );
        let config = start_server(stub.clone()).await;
        let backend = Arc::new(HttpCoachClient::new(&config).unwrap());
        let session = Arc::new(ConversationSession::new(seed(), backend, &config));

        session.spawn_first_question().await.unwrap();
        assert_eq!(session.status().await.stage, ConversationStage::CollectingQ1);

        session.submit("야식 끊기").await.unwrap();
        session.submit("걷기").await.unwrap();
        assert!(stub.received().is_empty());

        let outcome = session.submit("아침은 밥").await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Replied { .. }));
        assert_eq!(session.plan_session_id().await.as_deref(), Some("plan-7"));

        session.submit("점심 추천해줘").await.unwrap();

        let received = stub.received();
        let endpoints: Vec<&str> = received.iter().map(|(e, _)| e.as_str()).collect();
        assert_eq!(endpoints, vec!["plan", "chat"]);
        assert_eq!(received[0].1["followup"]["q1"], "야식 끊기");
        assert_eq!(received[0].1["device_id"], "device-42");

        let last = session.history().await.pop().unwrap();
        assert_eq!(last.sender, Sender::Bot);
        assert_eq!(last.markdown_text(), "샐러드 어때요?");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn session_shows_one_error_when_plan_init_fails() {
    timeout(TEST_TIMEOUT, async {
        let stub = Stub::new(
            (StatusCode::OK, json!({ "blocks": [] })),
            (StatusCode::BAD_GATEWAY, json!({ "detail": "down" })),
        );
        let config = start_server(stub).await;
        let backend = Arc::new(HttpCoachClient::new(&config).unwrap());
        let session = ConversationSession::new(seed(), backend, &config);

        for answer in ["a", "b"] {
            session.submit(answer).await.unwrap();
        }
        let outcome = session.submit("c").await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Failed { .. }));

        let history = session.history().await;
        let errors = history
            .iter()
            .filter(|m| m.markdown_text() == prompts::SERVER_ERROR)
            .count();
        assert_eq!(errors, 1);
        assert!(!session.is_sending());

        // Empty block list from chat falls back to a notice
        session.submit("hello").await.unwrap();
        let last = session.history().await.pop().unwrap();
        assert_eq!(last.markdown_text(), prompts::EMPTY_REPLY);
    })
    .await
    .expect("test timed out");
}

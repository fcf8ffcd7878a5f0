// tests/api_tests.rs

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use quiz_monitor::{
    config::Config, models::quiz::QuizRecord, routes, state::AppState,
    store::memory::MemoryQuizStore,
};
use serde_json::{Value, json};

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345") and the backing store.
async fn spawn_app() -> (String, Arc<MemoryQuizStore>) {
    let store = Arc::new(MemoryQuizStore::new());

    let config = Config {
        tick_interval_ms: 20,
        rust_log: "error".to_string(),
        ..Config::default()
    };

    let state = AppState::new(store.clone(), config);
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, store)
}

async fn seed_quiz(store: &MemoryQuizStore, in_progress: bool, hours_ago: i64) -> String {
    let id = format!("quiz_{}", &uuid::Uuid::new_v4().to_string()[..8]);
    store
        .upsert(QuizRecord {
            id: id.clone(),
            title: "Chemistry midterm".to_string(),
            question_count: 12,
            time_limit_minutes: Some(45),
            in_progress,
            active_users: vec!["s1".to_string()],
            last_active_timestamp: Some(Utc::now() - TimeDelta::hours(hours_ago)),
        })
        .await;
    id
}

/// Polls the monitor view until `pred` holds.
async fn poll_view(client: &reqwest::Client, url: &str, pred: impl Fn(&Value) -> bool) -> Value {
    for _ in 0..200 {
        let view: Value = client.get(url).send().await.unwrap().json().await.unwrap();
        if pred(&view) {
            return view;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("view never matched");
}

#[tokio::test]
async fn health_check_works() {
    let (address, _) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/health", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["monitored_quizzes"], 0);
}

#[tokio::test]
async fn start_unknown_quiz_returns_404() {
    let (address, _) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/monitor/does_not_exist/start", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);

    // Nothing is left behind for the missing quiz.
    let response = client
        .get(format!("{}/api/monitor/does_not_exist", address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn stale_quiz_is_healed_on_start() {
    let (address, store) = spawn_app().await;
    let client = reqwest::Client::new();
    let quiz_id = seed_quiz(&store, true, 4).await;

    let view: Value = client
        .post(format!("{}/api/monitor/{}/start", address, quiz_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(view["status"], "live");
    assert_eq!(view["in_progress"], false);
    assert!(!store.get(&quiz_id).await.unwrap().in_progress);
}

#[tokio::test]
async fn live_monitoring_flow() {
    let (address, store) = spawn_app().await;
    let client = reqwest::Client::new();
    let quiz_id = seed_quiz(&store, true, 0).await;
    let view_url = format!("{}/api/monitor/{}", address, quiz_id);
    let started = (Utc::now() - TimeDelta::minutes(10)).to_rfc3339();

    // 1. Start monitoring
    let response = client
        .post(format!("{}/start", view_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    // 2. Push a session snapshot with one flagged student
    let response = client
        .post(format!("{}/api/live/{}/sessions", address, quiz_id))
        .json(&json!({
            "activeStudents": [
                {
                    "studentId": "s1",
                    "studentName": "Ana",
                    "status": "active",
                    "questionsAnswered": 3,
                    "startedAt": started,
                    "lastActive": Utc::now().to_rfc3339()
                },
                {
                    "studentId": "s2",
                    "studentName": "Ben",
                    "status": "suspected_cheating",
                    "questionsAnswered": 6,
                    "startedAt": started,
                    "lastActive": Utc::now().to_rfc3339(),
                    "cheatingAttempts": [
                        { "type": "tab_switch", "description": "left tab", "timestamp": started },
                        { "type": "new_unseen_type", "description": "?", "timestamp": Utc::now().to_rfc3339() }
                    ]
                }
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 202);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["delivered"], true);

    // 3. Push duplicated results
    let response = client
        .post(format!("{}/api/live/{}/results", address, quiz_id))
        .json(&json!({
            "results": [
                { "userId": "A", "score": 5, "totalPoints": 10, "completed": true, "totalTimeSpent": 65 },
                { "userId": "A", "score": 8, "totalPoints": 10, "completed": true, "totalTimeSpent": 70 },
                { "userId": "B", "score": 3, "totalPoints": 10, "completed": false }
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 202);

    // 4. The view reflects both snapshots
    let view = poll_view(&client, &view_url, |v| {
        v["active_students"].as_array().is_some_and(|a| a.len() == 2)
            && v["results"].as_array().is_some_and(|r| r.len() == 2)
            && !v["last_incident"].is_null()
    })
    .await;

    assert_eq!(view["title"], "Chemistry midterm");
    assert_eq!(view["active_students"][0]["progress"], 25);
    assert_eq!(view["active_students"][1]["progress"], 50);

    let suspect = &view["suspected_cheaters"][0];
    assert_eq!(suspect["student_id"], "s2");
    assert_eq!(suspect["attempt_count"], 2);
    assert_eq!(suspect["highest_severity"], "moderate");
    assert_eq!(suspect["incidents"][0]["type"], "new_unseen_type");
    assert_eq!(suspect["incidents"][0]["severity"], "low");
    assert_eq!(view["last_incident"]["student_id"], "s2");

    assert_eq!(view["results"][0]["user_id"], "A");
    assert_eq!(view["results"][0]["score"], 8.0);
    assert_eq!(view["results"][0]["time_spent"], "01:10");
    assert_eq!(view["results"][1]["time_spent"], "N/A");
    assert_eq!(view["stats"]["students_completed"], 1);
    assert_eq!(view["stats"]["students_in_progress"], 1);
    assert_eq!(view["stats"]["suspected_cheaters"], 1);

    // 5. Stop, twice, then the quiz is no longer monitored
    for _ in 0..2 {
        let response = client
            .post(format!("{}/stop", view_url))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 204);
    }
    let response = client.get(&view_url).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 404);

    // 6. Restart: the retained snapshot is replayed into a fresh cache
    let view: Value = client
        .post(format!("{}/start", view_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(view["status"], "live");
}

#[tokio::test]
async fn invalid_snapshot_is_rejected() {
    let (address, _) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/live/q/sessions", address))
        .json(&json!({
            "activeStudents": [{
                "studentId": "",
                "status": "active",
                "startedAt": Utc::now().to_rfc3339(),
                "lastActive": Utc::now().to_rfc3339()
            }]
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
}

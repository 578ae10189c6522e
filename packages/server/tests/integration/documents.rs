use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn primitives_and_records_round_trip() {
    let app = TestApp::spawn().await;
    let values = json!([1, "judge-2", { "q": "Why?", "points": 10 }, { "value": 5 }, null]);

    let res = app.post(&routes::collection("used_judges"), &values).await;
    assert_eq!(res.status, 200, "{}", res.text);

    let res = app.get(&routes::collection("used_judges")).await;
    assert_eq!(res.body, values);
}

#[tokio::test]
async fn save_replaces_the_whole_collection() {
    let app = TestApp::spawn().await;
    app.post(&routes::collection("questions"), &json!([{ "q": "a" }, { "q": "b" }]))
        .await;

    app.post(&routes::collection("questions"), &json!([{ "q": "c" }]))
        .await;

    let res = app.get(&routes::collection("questions")).await;
    assert_eq!(res.body, json!([{ "q": "c" }]));
}

#[tokio::test]
async fn collections_are_isolated() {
    let app = TestApp::spawn().await;
    app.post(&routes::collection("used_questions"), &json!([1, 2]))
        .await;

    let res = app.get(&routes::collection("used_final_questions")).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body, json!([]));
}

#[tokio::test]
async fn unknown_collection_is_not_found() {
    let app = TestApp::spawn().await;

    let res = app.get(&routes::collection("login")).await;
    assert_eq!(res.status, 404);

    let res = app.post(&routes::collection("login"), &json!([])).await;
    assert_eq!(res.status, 404);
}

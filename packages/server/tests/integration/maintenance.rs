use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn clear_all_removes_every_row_and_blob() {
    let app = TestApp::spawn().await;
    let team_image = app.upload_photo("t1", "Red").await;
    let judge_image = app.upload_photo("j1", "Ana").await;
    // Never attached to an owner.
    app.upload_photo("t2", "Blue").await;
    app.post(
        routes::TEAMS,
        &json!([{ "team_id": "t1", "name": "Red", "image_id": team_image }]),
    )
    .await;
    app.post(
        routes::JUDGES,
        &json!([{ "id": "j1", "name": "Ana", "image_id": judge_image }]),
    )
    .await;
    app.post(&routes::collection("questions"), &json!([{ "q": "?" }, { "q": "!" }]))
        .await;
    assert_eq!(app.blob_file_count(), 3);

    let res = app.delete(routes::CLEAR_ALL).await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["success"], true);
    assert_eq!(res.body["owners"], 2);
    assert_eq!(res.body["documents"], 2);
    assert_eq!(res.body["images"], 3);
    assert_eq!(app.owner_row_count().await, 0);
    assert_eq!(app.document_row_count().await, 0);
    assert_eq!(app.image_row_count().await, 0);
    assert_eq!(app.blob_file_count(), 0);
    assert_eq!(app.get(&routes::image(&team_image)).await.status, 404);
    assert_eq!(app.get(routes::TEAMS).await.body, json!([]));
}

#[tokio::test]
async fn clear_all_on_empty_store_succeeds() {
    let app = TestApp::spawn().await;

    let res = app.delete(routes::CLEAR_ALL).await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["images"], 0);
}

use serde_json::json;

use crate::common::{TestApp, routes};

mod save_and_list {
    use super::*;

    #[tokio::test]
    async fn teams_round_trip_with_extra_fields() {
        let app = TestApp::spawn().await;
        let image_id = app.upload_photo("t1", "Red").await;

        let res = app
            .post(
                routes::TEAMS,
                &json!([
                    { "team_id": "t1", "name": "Red", "image_id": image_id, "score": 12 },
                    { "team_id": "t2", "name": "Blue", "imagePath": "images/blue.png" },
                    { "name": "No id" }
                ]),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["saved"], 2);
        assert_eq!(res.body["skipped"], 1);

        let res = app.get(routes::TEAMS).await;
        assert_eq!(res.status, 200);
        let teams = res.body.as_array().unwrap();
        assert_eq!(teams.len(), 2);
        let red = teams.iter().find(|t| t["team_id"] == "t1").unwrap();
        assert_eq!(red["score"], 12);
        assert_eq!(red["imagePath"], format!("/image/{image_id}"));
        let blue = teams.iter().find(|t| t["team_id"] == "t2").unwrap();
        assert_eq!(blue["imagePath"], "images/blue.png");
    }

    #[tokio::test]
    async fn judges_default_image_path() {
        let app = TestApp::spawn().await;

        app.post(routes::JUDGES, &json!([{ "id": "j1", "name": "Ana" }]))
            .await;

        let res = app.get(routes::JUDGES).await;
        assert_eq!(res.body[0]["id"], "j1");
        assert_eq!(res.body[0]["imagePath"], "images/default-judge.png");
    }

    #[tokio::test]
    async fn save_never_deletes_absent_owners() {
        let app = TestApp::spawn().await;
        app.post(routes::TEAMS, &json!([{ "team_id": "t1", "name": "Red" }]))
            .await;

        app.post(routes::TEAMS, &json!([{ "team_id": "t2", "name": "Blue" }]))
            .await;

        let res = app.get(routes::TEAMS).await;
        assert_eq!(res.body.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn replacing_an_image_deletes_the_old_one() {
        let app = TestApp::spawn().await;
        let first = app.upload_photo("t1", "Red").await;
        let second = app.upload_photo("t1", "Red").await;

        app.post(
            routes::TEAMS,
            &json!([{ "team_id": "t1", "name": "Red", "image_id": first }]),
        )
        .await;
        let res = app
            .post(
                routes::TEAMS,
                &json!([{ "team_id": "t1", "name": "Red", "image_id": second }]),
            )
            .await;

        assert_eq!(res.body["images_replaced"], 1);
        assert_eq!(app.get(&routes::image(&first)).await.status, 404);
        assert_eq!(app.get_raw(&routes::image(&second)).await.status(), 200);
        assert_eq!(app.image_row_count().await, 1);
        assert_eq!(app.blob_file_count(), 1);
    }

    #[tokio::test]
    async fn non_list_body_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .post(routes::TEAMS, &json!({ "team_id": "t1", "name": "Red" }))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod cascading_delete {
    use super::*;

    #[tokio::test]
    async fn deleting_a_team_removes_its_image() {
        let app = TestApp::spawn().await;
        let image_id = app.upload_photo("t1", "Red").await;
        app.post(
            routes::TEAMS,
            &json!([{ "team_id": "t1", "name": "Red", "image_id": image_id }]),
        )
        .await;
        assert_eq!(app.blob_file_count(), 1);

        let res = app.delete(&routes::team("t1")).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["success"], true);
        assert_eq!(app.image_row_count().await, 0);
        assert_eq!(app.blob_file_count(), 0);
        assert_eq!(app.get(&routes::image(&image_id)).await.status, 404);
        assert_eq!(app.get(routes::TEAMS).await.body, json!([]));
    }

    #[tokio::test]
    async fn legacy_body_form_deletes_too() {
        let app = TestApp::spawn().await;
        let image_id = app.upload_photo("t1", "Red").await;
        app.post(
            routes::TEAMS,
            &json!([{ "team_id": "t1", "name": "Red", "image_id": image_id }]),
        )
        .await;

        let res = app
            .post(routes::TEAMS_DELETE, &json!({ "team_id": "t1" }))
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(app.image_row_count().await, 0);
    }

    #[tokio::test]
    async fn deleting_a_judge_removes_its_image() {
        let app = TestApp::spawn().await;
        let image_id = app.upload_photo("j1", "Ana").await;
        app.post(
            routes::JUDGES,
            &json!([{ "id": "j1", "name": "Ana", "image_id": image_id }]),
        )
        .await;

        let res = app.delete(&routes::judge("j1")).await;

        assert_eq!(res.status, 200);
        assert_eq!(app.blob_file_count(), 0);
    }

    #[tokio::test]
    async fn owner_without_image_deletes_cleanly() {
        let app = TestApp::spawn().await;
        app.post(routes::TEAMS, &json!([{ "team_id": "t1", "name": "Red" }]))
            .await;

        let res = app.delete(&routes::team("t1")).await;

        assert_eq!(res.status, 200);
    }

    #[tokio::test]
    async fn unknown_owner_is_not_found_and_changes_nothing() {
        let app = TestApp::spawn().await;
        let image_id = app.upload_photo("t1", "Red").await;
        app.post(
            routes::TEAMS,
            &json!([{ "team_id": "t1", "name": "Red", "image_id": image_id }]),
        )
        .await;

        let res = app.delete(&routes::team("missing")).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
        assert_eq!(app.image_row_count().await, 1);
        assert_eq!(app.blob_file_count(), 1);
        assert_eq!(app.get(routes::TEAMS).await.body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn team_id_does_not_reach_judges() {
        let app = TestApp::spawn().await;
        app.post(routes::JUDGES, &json!([{ "id": "x", "name": "Ana" }]))
            .await;

        let res = app.delete(&routes::team("x")).await;

        assert_eq!(res.status, 404);
        assert_eq!(app.get(routes::JUDGES).await.body.as_array().unwrap().len(), 1);
    }
}

mod image_ownership {
    use super::*;

    #[tokio::test]
    async fn second_owner_cannot_share_an_image() {
        let app = TestApp::spawn().await;
        let image_id = app.upload_photo("t1", "Red").await;

        let res = app
            .post(
                routes::TEAMS,
                &json!([
                    { "team_id": "t1", "name": "Red", "image_id": image_id },
                    { "team_id": "t2", "name": "Blue", "image_id": image_id }
                ]),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["saved"], 2);

        let teams = app.get(routes::TEAMS).await.body;
        let blue = teams.as_array().unwrap().iter().find(|t| t["team_id"] == "t2").unwrap();
        assert!(blue.get("image_id").is_none());
        assert_eq!(blue["imagePath"], "images/default-team.png");

        app.delete(&routes::team("t1")).await;

        assert_eq!(app.get(&routes::image(&image_id)).await.status, 404);
        let teams = app.get(routes::TEAMS).await.body;
        assert_eq!(teams[0]["team_id"], "t2");
        assert!(teams[0].get("image_id").is_none());
    }

    #[tokio::test]
    async fn image_uploaded_for_another_owner_is_not_attached() {
        let app = TestApp::spawn().await;
        let image_id = app.upload_photo("t1", "Red").await;

        app.post(
            routes::TEAMS,
            &json!([{ "team_id": "t2", "name": "Blue", "image_id": image_id }]),
        )
        .await;
        let teams = app.get(routes::TEAMS).await.body;
        assert!(teams[0].get("image_id").is_none());

        app.post(
            routes::TEAMS,
            &json!([{ "team_id": "t1", "name": "Red", "image_id": image_id }]),
        )
        .await;
        let teams = app.get(routes::TEAMS).await.body;
        let red = teams.as_array().unwrap().iter().find(|t| t["team_id"] == "t1").unwrap();
        assert_eq!(red["imagePath"], format!("/image/{image_id}"));
    }

    #[tokio::test]
    async fn releasing_an_image_leaves_no_dangling_reference() {
        let app = TestApp::spawn().await;
        let first = app.upload_photo("x", "Red").await;
        let second = app.upload_photo("x", "Red").await;
        app.post(
            routes::TEAMS,
            &json!([{ "team_id": "x", "name": "Red", "image_id": first }]),
        )
        .await;
        // Same owner id, other kind: the image is already held by the team.
        app.post(
            routes::JUDGES,
            &json!([{ "id": "x", "name": "Ana", "image_id": first }]),
        )
        .await;

        let res = app
            .post(
                routes::TEAMS,
                &json!([{ "team_id": "x", "name": "Red", "image_id": second }]),
            )
            .await;

        assert_eq!(res.body["images_replaced"], 1);
        assert_eq!(app.get(&routes::image(&first)).await.status, 404);
        let judges = app.get(routes::JUDGES).await.body;
        assert!(judges[0].get("image_id").is_none());
        assert_eq!(judges[0]["imagePath"], "images/default-judge.png");
        assert_eq!(app.image_row_count().await, 1);
        assert_eq!(app.blob_file_count(), 1);
    }
}

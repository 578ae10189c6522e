use std::sync::Arc;

use reqwest::header;
use serde_json::json;

use crate::common::{OfflineBlobStore, TRANSPARENT_PIXEL, TestApp, photo_data_url, routes};

mod upload {
    use super::*;

    #[tokio::test]
    async fn transparent_pixel_is_stored_as_png() {
        let app = TestApp::spawn().await;

        let res = app
            .upload(
                &format!("data:image/png;base64,{TRANSPARENT_PIXEL}"),
                "team-1",
                "Red",
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["success"], true);
        assert_eq!(res.body["original_size"], 117);
        assert_eq!(res.body["dimensions"], json!({ "width": 1, "height": 1 }));
        let image_id = res.body["image_id"].as_str().unwrap();
        assert_eq!(res.body["imagePath"], format!("/image/{image_id}"));

        let fetched = app.get_raw(&routes::image(image_id)).await;
        assert_eq!(fetched.status(), 200);
        assert_eq!(fetched.headers()[header::CONTENT_TYPE], "image/png");
        assert_eq!(fetched.headers()["x-image-dimensions"], "1x1");
        assert_eq!(fetched.headers()["x-image-owner"], "Red");
        let bytes = fetched.bytes().await.unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(0, 0)[3], 0);
    }

    #[tokio::test]
    async fn opaque_photo_is_stored_as_jpeg() {
        let app = TestApp::spawn().await;

        let res = app.upload(&photo_data_url(300, 300), "team-2", "Blue").await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["dimensions"], json!({ "width": 300, "height": 300 }));
        let image_id = res.body["image_id"].as_str().unwrap();

        let fetched = app.get_raw(&routes::image(image_id)).await;
        assert_eq!(fetched.headers()[header::CONTENT_TYPE], "image/jpeg");
        assert_eq!(
            fetched.headers()[header::CACHE_CONTROL],
            "public, max-age=86400"
        );
        let length: usize = fetched.headers()[header::CONTENT_LENGTH]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(length as i64, res.body["optimized_size"].as_i64().unwrap());
    }

    #[tokio::test]
    async fn oversized_image_is_downscaled() {
        let app = TestApp::spawn().await;

        let res = app.upload(&photo_data_url(2400, 1200), "team-3", "Green").await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["dimensions"], json!({ "width": 1920, "height": 960 }));
    }

    #[tokio::test]
    async fn damaged_base64_is_repaired() {
        let app = TestApp::spawn().await;
        let mut payload = TRANSPARENT_PIXEL.trim_end_matches('=').to_string();
        payload.insert_str(20, "\n  ");
        payload.push_str("===");

        let res = app
            .upload(&format!("data:image/png;base64,{payload}"), "team-4", "Gold")
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["dimensions"], json!({ "width": 1, "height": 1 }));
    }

    #[tokio::test]
    async fn legacy_field_names_are_accepted() {
        let app = TestApp::spawn().await;
        let body = json!({
            "imageData": photo_data_url(32, 32),
            "teamId": "team-5",
            "teamName": "Silver",
        });

        let res = app.post(routes::UPLOAD, &body).await;

        assert_eq!(res.status, 200, "{}", res.text);
        let fetched = app
            .get_raw(&routes::image(res.body["image_id"].as_str().unwrap()))
            .await;
        assert_eq!(fetched.headers()["x-image-owner"], "Silver");
    }
}

mod rejection {
    use super::*;

    #[tokio::test]
    async fn unsupported_type_leaves_nothing_behind() {
        let app = TestApp::spawn().await;

        let res = app
            .upload("data:image/svg+xml;base64,PHN2Zz48L3N2Zz4=", "team-1", "Red")
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "UNSUPPORTED_TYPE");
        assert_eq!(res.body["success"], false);
        assert_eq!(app.image_row_count().await, 0);
        assert_eq!(app.blob_file_count(), 0);
    }

    #[tokio::test]
    async fn not_a_data_url_is_a_format_error() {
        let app = TestApp::spawn().await;

        let res = app.upload("hello world", "team-1", "Red").await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "FORMAT_ERROR");
    }

    #[tokio::test]
    async fn undecodable_bytes_are_corrupted() {
        let app = TestApp::spawn().await;
        let garbage = base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            vec![0x42u8; 512],
        );

        let res = app
            .upload(&format!("data:image/png;base64,{garbage}"), "team-1", "Red")
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "CORRUPTED_IMAGE");
        assert_eq!(app.blob_file_count(), 0);
    }

    #[tokio::test]
    async fn empty_image_data_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.upload("", "team-1", "Red").await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn failing_blob_store_records_nothing() {
        let app = TestApp::spawn_with_store(Arc::new(OfflineBlobStore)).await;

        let res = app.upload(&photo_data_url(64, 64), "team-1", "Red").await;

        assert_eq!(res.status, 503);
        assert_eq!(res.body["code"], "STORE_ERROR");
        assert_eq!(app.image_row_count().await, 0);
    }
}

mod fetch {
    use super::*;

    #[tokio::test]
    async fn unknown_or_malformed_id_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app
            .get(&routes::image("6f1c2a8e-3f4b-4c1d-9e2a-1b2c3d4e5f60"))
            .await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");

        let res = app.get(&routes::image("not-a-uuid")).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn matching_etag_is_not_modified() {
        let app = TestApp::spawn().await;
        let image_id = app.upload_photo("team-1", "Red").await;

        let first = app.get_raw(&routes::image(&image_id)).await;
        let etag = first.headers()[header::ETAG].clone();

        let second = app
            .client
            .get(format!("http://{}{}", app.addr, routes::image(&image_id)))
            .header(header::IF_NONE_MATCH, etag)
            .send()
            .await
            .unwrap();
        assert_eq!(second.status(), 304);
    }

    #[tokio::test]
    async fn also_served_under_api_prefix() {
        let app = TestApp::spawn().await;
        let image_id = app.upload_photo("team-1", "Red").await;

        let res = app.get_raw(&format!("/api/image/{image_id}")).await;
        assert_eq!(res.status(), 200);
    }
}

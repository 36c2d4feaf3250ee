use actix_web::{
    http::{header, StatusCode},
    middleware::from_fn,
    test::{self, TestRequest},
    web, App,
};
use futures_util::future::join_all;
use serde_json::Value;
use std::{collections::HashSet, path::Path, time::Duration};

use crate::{
    configs::UploadLimits,
    middlewares::{cleanup_uploads, request_id, translate_upload_errors},
    modules::upload::{category::VIDEO_TYPES, route, Intake},
};

const BOUNDARY: &str = "veo-test-boundary";

enum Part<'a> {
    File { field: &'a str, name: &'a str, mime: &'a str, data: &'a [u8] },
    Text { field: &'a str, value: &'a str },
}

fn png<'a>(field: &'a str, name: &'a str) -> Part<'a> {
    Part::File { field, name, mime: "image/png", data: b"\x89PNG\r\n\x1a\n" }
}

fn multipart(uri: &str, parts: &[Part<'_>]) -> TestRequest {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::File { field, name, mime, data } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{field}\"; filename=\"{name}\"\r\n\
                         Content-Type: {mime}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
            Part::Text { field, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}")
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    TestRequest::post()
        .uri(uri)
        .insert_header((header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}")))
        .set_payload(body)
}

fn intake(dir: &Path) -> Intake {
    Intake::new(UploadLimits::with_max_file_size_mb(1), dir)
}

fn stored(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

async fn settle() {
    actix_web::rt::time::sleep(Duration::from_millis(50)).await;
}

macro_rules! upload_app {
    ($intake:expr) => {
        test::init_service(
            App::new()
                .wrap(from_fn(translate_upload_errors))
                .wrap(from_fn(cleanup_uploads))
                .wrap(from_fn(request_id))
                .app_data(web::Data::new($intake))
                .service(web::scope("/api").configure(route::configure)),
        )
        .await
    };
}

#[actix_web::test]
async fn test_single_upload_lives_until_response_is_sent() {
    let dir = tempfile::tempdir().unwrap();
    let app = upload_app!(intake(dir.path()));

    let req = multipart("/api/uploads/single", &[png("file", "ref image.png")]);
    let res = test::call_service(&app, req.to_request()).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(stored(dir.path()), 1);

    let body: Value = test::read_body_json(res).await;
    let file = &body["data"]["files"];
    assert_eq!(body["data"]["count"], 1);
    assert_eq!(file["field"], "file");
    assert_eq!(file["originalName"], "ref image.png");
    assert_eq!(file["mimeType"], "image/png");
    assert_eq!(file["size"], 8);
    assert!(file["filename"].as_str().unwrap().ends_with("_ref_image.png"));

    settle().await;
    assert_eq!(stored(dir.path()), 0);
}

#[actix_web::test]
async fn test_category_from_query() {
    let dir = tempfile::tempdir().unwrap();
    let app = upload_app!(intake(dir.path()));

    let mp4 = Part::File { field: "file", name: "clip.mp4", mime: "video/mp4", data: b"mp4" };
    let res = test::call_service(
        &app,
        multipart("/api/uploads/single?type=video", &[mp4]).to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    test::read_body(res).await;

    let res = test::call_service(
        &app,
        multipart("/api/uploads/single?type=video", &[png("file", "a.png")]).to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["error"], "INVALID_FILE_TYPE");
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("video"));
    for mime in VIDEO_TYPES {
        assert!(message.contains(mime));
    }

    settle().await;
    assert_eq!(stored(dir.path()), 0);
}

#[actix_web::test]
async fn test_category_from_body_field() {
    let dir = tempfile::tempdir().unwrap();
    let app = upload_app!(intake(dir.path()));

    let wav = Part::File { field: "file", name: "voice.wav", mime: "audio/wav", data: b"RIFF" };
    let req = multipart(
        "/api/uploads/single",
        &[Part::Text { field: "type", value: "audio" }, wav],
    );
    let res = test::call_service(&app, req.to_request()).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["data"]["fields"]["type"], "audio");
}

#[actix_web::test]
async fn test_unknown_category_uses_image_list() {
    let dir = tempfile::tempdir().unwrap();
    let app = upload_app!(intake(dir.path()));

    let res = test::call_service(
        &app,
        multipart("/api/uploads/single?type=hologram", &[png("file", "a.png")]).to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    test::read_body(res).await;

    let mp3 = Part::File { field: "file", name: "a.mp3", mime: "audio/mpeg", data: b"ID3" };
    let res = test::call_service(
        &app,
        multipart("/api/uploads/single?type=hologram", &[mp3]).to_request(),
    )
    .await;
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["error"], "INVALID_FILE_TYPE");
    assert!(body["message"].as_str().unwrap().contains("image/webp"));
}

#[actix_web::test]
async fn test_oversized_file_is_never_left_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let limits = UploadLimits { max_file_size: 16, ..UploadLimits::with_max_file_size_mb(1) };
    let app = upload_app!(Intake::new(limits, dir.path()));

    let data = vec![7u8; 64];
    let big = Part::File { field: "file", name: "big.png", mime: "image/png", data: &data };
    let res = test::call_service(&app, multipart("/api/uploads/single", &[big]).to_request()).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(stored(dir.path()), 0);

    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["error"], "FILE_TOO_LARGE");
    assert_eq!(body["maxSize"], "1MB");
}

#[actix_web::test]
async fn test_ten_files_pass_eleven_fail() {
    let dir = tempfile::tempdir().unwrap();
    let app = upload_app!(intake(dir.path()));

    let names: Vec<String> = (0..11).map(|i| format!("frame-{i}.png")).collect();
    let ten: Vec<Part<'_>> = names.iter().take(10).map(|n| png("files", n)).collect();
    let res = test::call_service(&app, multipart("/api/uploads/multiple", &ten).to_request()).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["data"]["count"], 10);
    assert_eq!(body["data"]["files"].as_array().unwrap().len(), 10);

    let eleven: Vec<Part<'_>> = names.iter().map(|n| png("files", n)).collect();
    let res =
        test::call_service(&app, multipart("/api/uploads/multiple", &eleven).to_request()).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["error"], "TOO_MANY_FILES");
    assert_eq!(body["message"], "Too many files. Maximum is 10 files");

    settle().await;
    assert_eq!(stored(dir.path()), 0);
}

#[actix_web::test]
async fn test_unexpected_field_is_named() {
    let dir = tempfile::tempdir().unwrap();
    let app = upload_app!(intake(dir.path()));

    let res = test::call_service(
        &app,
        multipart("/api/uploads/single", &[png("avatar", "a.png")]).to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["error"], "UNEXPECTED_FIELD");
    assert!(body["message"].as_str().unwrap().contains("avatar"));
}

#[actix_web::test]
async fn test_second_file_on_single_is_unexpected() {
    let dir = tempfile::tempdir().unwrap();
    let app = upload_app!(intake(dir.path()));

    let res = test::call_service(
        &app,
        multipart("/api/uploads/single", &[png("file", "a.png"), png("file", "b.png")])
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["error"], "UNEXPECTED_FIELD");
    assert_eq!(body["message"], "Unexpected file field: file");

    settle().await;
    assert_eq!(stored(dir.path()), 0);
}

#[actix_web::test]
async fn test_named_fields() {
    let dir = tempfile::tempdir().unwrap();
    let app = upload_app!(intake(dir.path()));

    let mp4 = Part::File { field: "videoFile", name: "clip.mp4", mime: "video/mp4", data: b"mp4" };
    let req = multipart(
        "/api/uploads/fields?type=video",
        &[Part::Text { field: "prompt", value: "a fox at dawn" }, mp4],
    );
    let res = test::call_service(&app, req.to_request()).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["data"]["fields"]["prompt"], "a fox at dawn");
    assert_eq!(body["data"]["files"]["videoFile"][0]["originalName"], "clip.mp4");

    let req = multipart(
        "/api/uploads/fields",
        &[png("referenceImage", "one.png"), png("referenceImage", "two.png")],
    );
    let res = test::call_service(&app, req.to_request()).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["error"], "UNEXPECTED_FIELD");

    settle().await;
    assert_eq!(stored(dir.path()), 0);
}

#[actix_web::test]
async fn test_named_fields_allow_prompt_only() {
    let dir = tempfile::tempdir().unwrap();
    let app = upload_app!(intake(dir.path()));

    let req =
        multipart("/api/uploads/fields", &[Part::Text { field: "prompt", value: "sunset" }]);
    let res = test::call_service(&app, req.to_request()).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["data"]["count"], 0);
    assert!(body["data"]["files"].is_null());
}

#[actix_web::test]
async fn test_too_many_text_fields() {
    let dir = tempfile::tempdir().unwrap();
    let app = upload_app!(intake(dir.path()));

    let names: Vec<String> = (0..21).map(|i| format!("meta{i}")).collect();
    let parts: Vec<Part<'_>> =
        names.iter().map(|n| Part::Text { field: n, value: "x" }).collect();
    let res = test::call_service(&app, multipart("/api/uploads/fields", &parts).to_request()).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["error"], "UPLOAD_ERROR");
    assert_eq!(body["message"], "Too many fields");
}

#[actix_web::test]
async fn test_missing_file_is_a_plain_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let app = upload_app!(intake(dir.path()));

    let req = multipart("/api/uploads/single", &[Part::Text { field: "prompt", value: "hi" }]);
    let res = test::call_service(&app, req.to_request()).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body, serde_json::json!({ "message": "No file uploaded" }));
}

#[actix_web::test]
async fn test_non_multipart_body_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = upload_app!(intake(dir.path()));

    let req = TestRequest::post()
        .uri("/api/uploads/single")
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("{}");
    let res = test::call_service(&app, req.to_request()).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_concurrent_uploads_with_same_name_do_not_collide() {
    let dir = tempfile::tempdir().unwrap();
    let app = upload_app!(intake(dir.path()));

    let calls = (0..20).map(|_| {
        test::call_service(
            &app,
            multipart("/api/uploads/single", &[png("file", "same.png")]).to_request(),
        )
    });
    let responses = join_all(calls).await;

    let mut filenames = HashSet::new();
    for res in responses {
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(res).await;
        filenames.insert(body["data"]["files"]["filename"].as_str().unwrap().to_string());
    }
    assert_eq!(filenames.len(), 20);

    settle().await;
    assert_eq!(stored(dir.path()), 0);
}

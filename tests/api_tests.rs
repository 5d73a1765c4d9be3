//! End-to-end API tests running the real routing table against a temporary
//! SQLite database and upload directory.

use actix_web::body::BoxBody;
use actix_web::dev::ServiceResponse;
use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use serde_json::{json, Value};
use tempfile::TempDir;

use blogfolio_backend::config::{Config, WebConfig};
use blogfolio_backend::helper::time_helpers;
use blogfolio_backend::routes;
use blogfolio_backend::setup::db_setup;
use blogfolio_backend::{build_pool, DbPool};

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "correct horse battery staple";

struct TestCtx {
    _root: TempDir,
    config: Config,
    pool: DbPool,
}

fn ctx() -> TestCtx {
    let root = TempDir::new().expect("temp dir");
    let config = Config {
        web: WebConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        env_name: "test".to_string(),
        database_path: root.path().join("db").to_string_lossy().into_owned(),
        upload_dir: root.path().join("uploads").to_string_lossy().into_owned(),
        secret_key: "test-signing-key".to_string(),
        cors_origins: "*".to_string(),
        log_level: "warn".to_string(),
        redirect_www_to_naked: false,
        www_host: String::new(),
        naked_host: String::new(),
        timezone_offset_hours: 9,
        seed_admin_email: ADMIN_EMAIL.to_string(),
        seed_admin_password: ADMIN_PASSWORD.to_string(),
        seed_admin_name: "Admin".to_string(),
    };
    std::fs::create_dir_all(&config.database_path).expect("db dir");
    std::fs::create_dir_all(config.upload_root()).expect("upload dir");
    let pool = build_pool(&config.db_file()).expect("pool");
    db_setup::initialize(&pool, &config).expect("schema");
    TestCtx {
        _root: root,
        config,
        pool,
    }
}

impl TestCtx {
    async fn send(&self, req: test::TestRequest) -> ServiceResponse<BoxBody> {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(self.config.clone()))
                .app_data(web::Data::new(self.pool.clone()))
                .configure(routes::configure_api),
        )
        .await;
        test::call_service(&app, req.to_request()).await
    }

    async fn login(&self) -> String {
        let res = self
            .send(test::TestRequest::post().uri("/api/auth/login").set_json(json!({
                "username": ADMIN_EMAIL,
                "password": ADMIN_PASSWORD,
            })))
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["token_type"], "bearer");
        body["access_token"].as_str().expect("token").to_string()
    }

    async fn create_post(&self, token: &str, body: Value) -> Value {
        let res = self
            .send(
                test::TestRequest::post()
                    .uri("/api/posts")
                    .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
                    .set_json(body),
            )
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        test::read_body_json(res).await
    }
}

fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {token}"))
}

fn multipart_payload(filename: &str, content_type: &str, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = "------------------------abcdef0123456789";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; \
             filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (
        format!("multipart/form-data; boundary={boundary}"),
        body,
    )
}

#[actix_web::test]
async fn health_reports_ok() {
    let ctx = ctx();
    let res = ctx.send(test::TestRequest::get().uri("/api/health")).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["status"], "ok");
}

#[actix_web::test]
async fn login_rejects_bad_password() {
    let ctx = ctx();
    let res = ctx
        .send(test::TestRequest::post().uri("/api/auth/login").set_json(json!({
            "username": ADMIN_EMAIL,
            "password": "wrong",
        })))
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["detail"], "Invalid email or password.");
}

#[actix_web::test]
async fn login_then_me_returns_current_user() {
    let ctx = ctx();
    let token = ctx.login().await;
    let res = ctx
        .send(
            test::TestRequest::get()
                .uri("/api/auth/me")
                .insert_header(bearer(&token)),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["email"], ADMIN_EMAIL);
}

#[actix_web::test]
async fn mutating_endpoints_require_auth() {
    let ctx = ctx();
    let res = ctx
        .send(
            test::TestRequest::post()
                .uri("/api/posts")
                .set_json(json!({ "title": "t" })),
        )
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["detail"], "Authentication required.");
}

#[actix_web::test]
async fn draft_post_hidden_from_unauthenticated_readers() {
    let ctx = ctx();
    let token = ctx.login().await;
    let created = ctx
        .create_post(&token, json!({ "title": "Draft one", "status": "DRAFT" }))
        .await;
    let id = created["id"].as_i64().expect("id");

    let public = ctx
        .send(test::TestRequest::get().uri(&format!("/api/posts/{id}")))
        .await;
    assert_eq!(public.status(), StatusCode::NOT_FOUND);

    let admin = ctx
        .send(
            test::TestRequest::get()
                .uri(&format!("/api/posts/{id}"))
                .insert_header(bearer(&token)),
        )
        .await;
    assert_eq!(admin.status(), StatusCode::OK);
}

#[actix_web::test]
async fn future_publish_time_keeps_post_hidden() {
    let ctx = ctx();
    let token = ctx.login().await;
    let future = time_helpers::format_db_datetime(time_helpers::now_utc() + chrono::Duration::hours(2));
    let created = ctx
        .create_post(
            &token,
            json!({ "title": "Scheduled", "status": "PUBLISHED", "published_at": future }),
        )
        .await;
    let id = created["id"].as_i64().expect("id");

    let public = ctx
        .send(test::TestRequest::get().uri(&format!("/api/posts/{id}")))
        .await;
    assert_eq!(public.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn publish_time_far_in_the_past_is_rejected() {
    let ctx = ctx();
    let token = ctx.login().await;
    let stale =
        time_helpers::format_db_datetime(time_helpers::now_utc() - chrono::Duration::minutes(10));
    let res = ctx
        .send(
            test::TestRequest::post()
                .uri("/api/posts")
                .insert_header(bearer(&token))
                .set_json(json!({
                    "title": "Backdated",
                    "status": "PUBLISHED",
                    "published_at": stale,
                })),
        )
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn public_read_increments_view_and_daily_stats() {
    let ctx = ctx();
    let token = ctx.login().await;
    let now = time_helpers::now_utc_text();
    let created = ctx
        .create_post(
            &token,
            json!({ "title": "Visible", "status": "PUBLISHED", "published_at": now }),
        )
        .await;
    let id = created["id"].as_i64().expect("id");

    for _ in 0..2 {
        let res = ctx
            .send(test::TestRequest::get().uri(&format!("/api/posts/{id}")))
            .await;
        assert_eq!(res.status(), StatusCode::OK);
    }
    let res = ctx
        .send(test::TestRequest::get().uri(&format!("/api/posts/{id}")))
        .await;
    let body: Value = test::read_body_json(res).await;
    // Two prior reads, and the counter in this response reflects this read too.
    assert_eq!(body["view_count"], 3);

    let conn = ctx.pool.get().expect("conn");
    let (visits, views): (i64, i64) = conn
        .query_row("SELECT visits, views FROM daily_stats", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .expect("stats row");
    assert_eq!(visits, 3);
    assert_eq!(views, 3);

    // Authenticated reads leave the counters alone.
    let res = ctx
        .send(
            test::TestRequest::get()
                .uri(&format!("/api/posts/{id}"))
                .insert_header(bearer(&token)),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let views_after: i64 = conn
        .query_row("SELECT views FROM daily_stats", [], |row| row.get(0))
        .expect("stats row");
    assert_eq!(views_after, 3);
}

#[actix_web::test]
async fn slug_collisions_get_numeric_suffixes() {
    let ctx = ctx();
    let token = ctx.login().await;
    let first = ctx
        .create_post(&token, json!({ "title": "Hello", "slug": "hello" }))
        .await;
    assert_eq!(first["slug"], "hello");
    let second = ctx
        .create_post(&token, json!({ "title": "Hello again", "slug": "hello" }))
        .await;
    assert_eq!(second["slug"], "hello-1");
}

#[actix_web::test]
async fn neighbors_follow_publish_order() {
    let ctx = ctx();
    let token = ctx.login().await;
    let now = time_helpers::now_utc();
    let mut ids = Vec::new();
    for (title, secs_ago) in [("Oldest", 40), ("Middle", 20), ("Newest", 0)] {
        let at = time_helpers::format_db_datetime(now - chrono::Duration::seconds(secs_ago));
        let created = ctx
            .create_post(
                &token,
                json!({ "title": title, "status": "PUBLISHED", "published_at": at }),
            )
            .await;
        ids.push(created["id"].as_i64().expect("id"));
    }

    let res = ctx
        .send(test::TestRequest::get().uri(&format!("/api/posts/{}/neighbors", ids[1])))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["prev"]["id"].as_i64(), Some(ids[0]));
    assert_eq!(body["next"]["id"].as_i64(), Some(ids[2]));
}

#[actix_web::test]
async fn neighbors_of_hidden_post_is_not_found() {
    let ctx = ctx();
    let token = ctx.login().await;
    let created = ctx
        .create_post(&token, json!({ "title": "Hidden", "status": "DRAFT" }))
        .await;
    let id = created["id"].as_i64().expect("id");
    let res = ctx
        .send(test::TestRequest::get().uri(&format!("/api/posts/{id}/neighbors")))
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn category_parent_must_exist() {
    let ctx = ctx();
    let token = ctx.login().await;
    let res = ctx
        .send(
            test::TestRequest::post()
                .uri("/api/categories")
                .insert_header(bearer(&token))
                .set_json(json!({ "name": "Orphan", "parent_id": 999 })),
        )
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn category_cannot_become_its_own_parent() {
    let ctx = ctx();
    let token = ctx.login().await;
    let res = ctx
        .send(
            test::TestRequest::post()
                .uri("/api/categories")
                .insert_header(bearer(&token))
                .set_json(json!({ "name": "Root" })),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(res).await;
    let id = created["id"].as_i64().expect("id");

    let res = ctx
        .send(
            test::TestRequest::put()
                .uri(&format!("/api/categories/{id}"))
                .insert_header(bearer(&token))
                .set_json(json!({ "parent_id": id })),
        )
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn category_tree_nests_children_under_roots() {
    let ctx = ctx();
    let token = ctx.login().await;
    let res = ctx
        .send(
            test::TestRequest::post()
                .uri("/api/categories")
                .insert_header(bearer(&token))
                .set_json(json!({ "name": "Parent" })),
        )
        .await;
    let parent: Value = test::read_body_json(res).await;
    let parent_id = parent["id"].as_i64().expect("id");
    let res = ctx
        .send(
            test::TestRequest::post()
                .uri("/api/categories")
                .insert_header(bearer(&token))
                .set_json(json!({ "name": "Child", "parent_id": parent_id })),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = ctx
        .send(test::TestRequest::get().uri("/api/categories?tree=true"))
        .await;
    let body: Value = test::read_body_json(res).await;
    let roots = body.as_array().expect("array");
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0]["name"], "Parent");
    assert_eq!(roots[0]["children"][0]["name"], "Child");
}

#[actix_web::test]
async fn tag_creation_is_find_or_create() {
    let ctx = ctx();
    let token = ctx.login().await;
    let mut ids = Vec::new();
    for _ in 0..2 {
        let res = ctx
            .send(
                test::TestRequest::post()
                    .uri("/api/tags")
                    .insert_header(bearer(&token))
                    .set_json(json!({ "name": "rust" })),
            )
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = test::read_body_json(res).await;
        ids.push(body["id"].as_i64().expect("id"));
    }
    assert_eq!(ids[0], ids[1]);
}

#[actix_web::test]
async fn upload_rejects_disallowed_extension() {
    let ctx = ctx();
    let (content_type, payload) = multipart_payload("evil.exe", "image/png", b"MZ");
    let res = ctx
        .send(
            test::TestRequest::post()
                .uri("/api/assets/upload")
                .insert_header((header::CONTENT_TYPE, content_type))
                .set_payload(payload),
        )
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn upload_rejects_oversized_file() {
    let ctx = ctx();
    let big = vec![0u8; 11 * 1024 * 1024];
    let (content_type, payload) = multipart_payload("big.png", "image/png", &big);
    let res = ctx
        .send(
            test::TestRequest::post()
                .uri("/api/assets/upload")
                .insert_header((header::CONTENT_TYPE, content_type))
                .set_payload(payload),
        )
        .await;
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[actix_web::test]
async fn upload_accepts_hwp_declared_as_octet_stream() {
    let ctx = ctx();
    let (content_type, payload) =
        multipart_payload("report.hwp", "application/octet-stream", b"hwp-bytes");
    let res = ctx
        .send(
            test::TestRequest::post()
                .uri("/api/assets/upload")
                .insert_header((header::CONTENT_TYPE, content_type))
                .set_payload(payload),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["original_name"], "report.hwp");
    let url = body["url"].as_str().expect("url");
    assert!(url.starts_with("/static/uploads/documents/"));
    assert!(url.contains("/temp/"));
}

#[actix_web::test]
async fn uploaded_file_roundtrips_through_download() {
    let ctx = ctx();
    let (content_type, payload) = multipart_payload("photo.png", "image/png", b"png-bytes");
    let res = ctx
        .send(
            test::TestRequest::post()
                .uri("/api/assets/upload")
                .insert_header((header::CONTENT_TYPE, content_type))
                .set_payload(payload),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    let id = body["id"].as_i64().expect("id");

    let res = ctx
        .send(test::TestRequest::get().uri(&format!("/api/assets/{id}/download")))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let disposition = res
        .headers()
        .get("Content-Disposition")
        .and_then(|v| v.to_str().ok())
        .expect("disposition")
        .to_string();
    assert!(disposition.contains("filename=\"photo.png\""));
    let bytes = test::read_body(res).await;
    assert_eq!(&bytes[..], b"png-bytes");
}

#[actix_web::test]
async fn temp_upload_moves_under_post_on_save() {
    let ctx = ctx();
    let token = ctx.login().await;
    let (content_type, payload) = multipart_payload("inline.png", "image/png", b"img");
    let res = ctx
        .send(
            test::TestRequest::post()
                .uri("/api/assets/upload")
                .insert_header((header::CONTENT_TYPE, content_type))
                .set_payload(payload),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let upload: Value = test::read_body_json(res).await;
    let asset_id = upload["id"].as_i64().expect("id");
    let url = upload["url"].as_str().expect("url").to_string();
    assert!(url.contains("/temp/"));

    let created = ctx
        .create_post(
            &token,
            json!({
                "title": "With image",
                "content_html": format!("<img src=\"{url}\">"),
            }),
        )
        .await;
    let post_id = created["id"].as_i64().expect("id");

    let conn = ctx.pool.get().expect("conn");
    let stored_path: String = conn
        .query_row(
            "SELECT file_path FROM assets WHERE id = ?1",
            [asset_id],
            |row| row.get(0),
        )
        .expect("asset row");
    assert!(!stored_path.contains("/temp/"));
    assert!(stored_path.contains(&format!("/{post_id}/")));
    assert!(ctx.config.upload_root().join(&stored_path).is_file());

    let content: String = conn
        .query_row(
            "SELECT content_html FROM posts WHERE id = ?1",
            [post_id],
            |row| row.get(0),
        )
        .expect("post row");
    assert!(!content.contains("/temp/"));
    assert!(content.contains(&format!("/{post_id}/")));
}

#[actix_web::test]
async fn intro_text_is_trimmed_to_twenty_chars() {
    let ctx = ctx();
    let token = ctx.login().await;
    let res = ctx
        .send(
            test::TestRequest::put()
                .uri("/api/about_messages/projects-careers-intro")
                .insert_header(bearer(&token))
                .set_json(json!({ "text": "abcdefghijklmnopqrstuvwxyz" })),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["text"], "abcdefghijklmnopqrst");

    let res = ctx
        .send(test::TestRequest::get().uri("/api/about/projects-careers-intro"))
        .await;
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["text"], "abcdefghijklmnopqrst");
}

#[actix_web::test]
async fn dashboard_counts_published_and_todays_visits() {
    let ctx = ctx();
    let token = ctx.login().await;
    let now = time_helpers::now_utc_text();
    let created = ctx
        .create_post(
            &token,
            json!({ "title": "Live", "status": "PUBLISHED", "published_at": now }),
        )
        .await;
    let id = created["id"].as_i64().expect("id");
    ctx.create_post(&token, json!({ "title": "Draft", "status": "DRAFT" }))
        .await;

    let res = ctx
        .send(test::TestRequest::get().uri(&format!("/api/posts/{id}")))
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = ctx
        .send(
            test::TestRequest::get()
                .uri("/api/dashboard/stats")
                .insert_header(bearer(&token)),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["published_posts"], 1);
    assert_eq!(body["today_visits"], 1);
    assert_eq!(body["total_views"], 1);
}

#[actix_web::test]
async fn careers_require_company_role_and_start_date() {
    let ctx = ctx();
    let token = ctx.login().await;
    let res = ctx
        .send(
            test::TestRequest::post()
                .uri("/api/careers")
                .insert_header(bearer(&token))
                .set_json(json!({ "company_name": "Acme" })),
        )
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = ctx
        .send(
            test::TestRequest::post()
                .uri("/api/careers")
                .insert_header(bearer(&token))
                .set_json(json!({
                    "company_name": "Acme",
                    "role": "Engineer",
                    "start_date": "2023-04",
                })),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let conn = ctx.pool.get().expect("conn");
    let start: String = conn
        .query_row("SELECT start_date FROM careers", [], |row| row.get(0))
        .expect("career row");
    assert_eq!(start, "2023-04-01");
}

#[actix_web::test]
async fn career_links_are_capped_at_five() {
    let ctx = ctx();
    let token = ctx.login().await;
    let links: Vec<Value> = (0..8)
        .map(|i| {
            json!({
                "link_name": format!("link{i}"),
                "link_url": format!("https://x.test/{i}"),
                "sort_order": i,
            })
        })
        .collect();
    let res = ctx
        .send(
            test::TestRequest::post()
                .uri("/api/careers")
                .insert_header(bearer(&token))
                .set_json(json!({
                    "company_name": "Acme",
                    "role": "Engineer",
                    "start_date": "2023-04-01",
                    "career_links": links,
                })),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let conn = ctx.pool.get().expect("conn");
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM career_links", [], |row| row.get(0))
        .expect("count");
    assert_eq!(count, 5);
}

#[actix_web::test]
async fn reorder_assigns_list_positions() {
    let ctx = ctx();
    let token = ctx.login().await;
    let mut ids = Vec::new();
    for name in ["First", "Second"] {
        let res = ctx
            .send(
                test::TestRequest::post()
                    .uri("/api/projects")
                    .insert_header(bearer(&token))
                    .set_json(json!({ "title": name })),
            )
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = test::read_body_json(res).await;
        ids.push(body["id"].as_i64().expect("id"));
    }

    let res = ctx
        .send(
            test::TestRequest::patch()
                .uri("/api/projects/reorder")
                .insert_header(bearer(&token))
                .set_json(json!({ "id_order": [ids[1], ids[0]] })),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let conn = ctx.pool.get().expect("conn");
    let first_sort: i64 = conn
        .query_row(
            "SELECT sort_order FROM projects WHERE id = ?1",
            [ids[1]],
            |row| row.get(0),
        )
        .expect("row");
    assert_eq!(first_sort, 0);
}

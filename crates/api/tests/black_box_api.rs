use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{json, Value};

use yamdb_api::app::{build_router, services::AppServices};
use yamdb_api::config::ApiConfig;
use yamdb_auth::{JwtClaims, NewUser, Role, Username};
use yamdb_core::{CommentId, Email, UserId};
use yamdb_infra::{CommentStore, InMemoryStore, OutboxMailer, StoreError, UserFilter, UserStore};

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    store: Arc<InMemoryStore>,
    outbox: Arc<OutboxMailer>,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, over an in-memory store and a capturing mailer.
        let store = Arc::new(InMemoryStore::new());
        let outbox = Arc::new(OutboxMailer::new());
        let config = ApiConfig::new(JWT_SECRET);
        let services = AppServices::new(store.clone(), outbox.clone(), &config);
        let app = build_router(Arc::new(services));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            store,
            outbox,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1{}", self.base_url, path)
    }

    /// Create an account directly in the store and mint a token for it.
    async fn account(&self, username: &str, role: Role) -> (UserId, String) {
        let email = Email::parse(&format!("{username}@example.com")).unwrap();
        let mut new = NewUser::with_random_password(email, Username::parse(username).unwrap());
        new.role = role;
        let user = self.store.create_user(new).await.unwrap();
        (user.id, mint_jwt(user.id))
    }

    async fn send(&self, method: reqwest::Method, path: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = self.client.request(method, self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let res = req.send().await.unwrap();
        let status = res.status();
        let text = res.text().await.unwrap();
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        (status, body)
    }

    async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(reqwest::Method::GET, path, token, None).await
    }

    async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(reqwest::Method::POST, path, token, Some(body)).await
    }

    async fn patch(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(reqwest::Method::PATCH, path, token, Some(body)).await
    }

    async fn delete(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(reqwest::Method::DELETE, path, token, None).await
    }

    /// Admin-created catalog: category `movie`, genre `drama`, one title per name.
    async fn seed_catalog(&self, admin: &str, titles: &[(&str, i64)]) -> Vec<i64> {
        let (status, _) = self
            .post("/categories", Some(admin), json!({ "name": "Movie", "slug": "movie" }))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = self
            .post("/genres", Some(admin), json!({ "name": "Drama", "slug": "drama" }))
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let mut ids = Vec::new();
        for (name, year) in titles {
            let (status, body) = self
                .post(
                    "/titles",
                    Some(admin),
                    json!({ "name": name, "year": year, "category": "movie", "genre": ["drama"] }),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{body}");
            ids.push(body["id"].as_i64().unwrap());
        }
        ids
    }

    fn last_code_for(&self, email: &str) -> String {
        let message = self.outbox.last_to(email).expect("no mail sent");
        message
            .body
            .lines()
            .find_map(|line| line.strip_prefix("Your confirmation code: "))
            .expect("code line missing")
            .trim()
            .to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(user_id: UserId) -> String {
    let claims = JwtClaims::new(user_id, Utc::now(), ChronoDuration::minutes(10));

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth flow
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = srv
        .client
        .get(format!("{}/health", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn emailed_code_is_exchanged_for_a_token_once() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv.post("/auth/email", None, json!({ "email": "alice@example.com" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "email": "alice@example.com" }));

    let code = srv.last_code_for("alice@example.com");
    let (status, body) = srv
        .post(
            "/auth/token",
            None,
            json!({ "email": "alice@example.com", "confirmation_code": code }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();
    assert_eq!(body.as_object().unwrap().len(), 1);

    let (status, me) = srv.get("/users/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "alice");
    assert_eq!(me["email"], "alice@example.com");
    assert_eq!(me["role"], "user");

    // Redemption stamps the account, so the same code no longer verifies.
    let (status, body) = srv
        .post(
            "/auth/token",
            None,
            json!({ "email": "alice@example.com", "confirmation_code": code }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["confirmation_code"].is_array());
}

#[tokio::test]
async fn stale_profile_write_does_not_revive_a_spent_code() {
    let srv = TestServer::spawn().await;
    srv.post("/auth/email", None, json!({ "email": "pat@example.com" })).await;
    let code = srv.last_code_for("pat@example.com");
    let email = Email::parse("pat@example.com").unwrap();

    // Loaded before the redemption, as a concurrent profile PATCH would.
    let mut stale = srv.store.user_by_email(&email).await.unwrap().unwrap();

    let body = json!({ "email": "pat@example.com", "confirmation_code": code });
    let (status, _) = srv.post("/auth/token", None, body.clone()).await;
    assert_eq!(status, StatusCode::OK);

    stale.bio = "written late".to_string();
    srv.store.update_user(&stale).await.unwrap();

    let (status, body) = srv.post("/auth/token", None, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("token").is_none());
}

#[tokio::test]
async fn redemption_losing_the_login_race_is_rejected() {
    let srv = TestServer::spawn().await;
    srv.post("/auth/email", None, json!({ "email": "quinn@example.com" })).await;
    let code = srv.last_code_for("quinn@example.com");
    let email = Email::parse("quinn@example.com").unwrap();
    let user = srv.store.user_by_email(&email).await.unwrap().unwrap();

    // Another redemption stamps the account first.
    assert!(srv.store.record_login(user.id, None, Utc::now()).await.unwrap());

    let (status, body) = srv
        .post(
            "/auth/token",
            None,
            json!({ "email": "quinn@example.com", "confirmation_code": code }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["confirmation_code"].is_array());
}

#[tokio::test]
async fn wrong_code_or_unknown_email_is_rejected() {
    let srv = TestServer::spawn().await;
    srv.post("/auth/email", None, json!({ "email": "bob@example.com" })).await;

    let (status, body) = srv
        .post(
            "/auth/token",
            None,
            json!({ "email": "bob@example.com", "confirmation_code": "abc-0000000000" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("token").is_none());

    let (status, _) = srv
        .post(
            "/auth/token",
            None,
            json!({ "email": "nobody@example.com", "confirmation_code": "abc-0000000000" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_email_is_a_field_error() {
    let srv = TestServer::spawn().await;
    let (status, body) = srv.post("/auth/email", None, json!({ "email": "not-an-email" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert!(body["fields"]["email"].is_array());
}

#[tokio::test]
async fn repeated_code_request_reuses_the_account() {
    let srv = TestServer::spawn().await;

    for _ in 0..2 {
        let (status, _) = srv.post("/auth/email", None, json!({ "email": "carol@example.com" })).await;
        assert_eq!(status, StatusCode::OK);
    }

    let users = srv
        .store
        .list_users(&UserFilter::default(), Default::default())
        .await
        .unwrap();
    assert_eq!(users.total, 1);
    assert_eq!(srv.outbox.messages().len(), 2);
}

#[tokio::test]
async fn derived_usernames_get_a_suffix_on_collision() {
    let srv = TestServer::spawn().await;
    srv.post("/auth/email", None, json!({ "email": "dave@example.com" })).await;
    srv.post("/auth/email", None, json!({ "email": "dave@example.org" })).await;

    let second = srv
        .store
        .user_by_email(&Email::parse("dave@example.org").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.username.as_str(), "dave2");
}

#[tokio::test]
async fn invalid_bearer_token_is_401() {
    let srv = TestServer::spawn().await;
    let (status, body) = srv.get("/titles", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "not_authenticated");
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn self_patch_cannot_escalate_role() {
    let srv = TestServer::spawn().await;
    let (_, token) = srv.account("erin", Role::User).await;

    let (status, body) = srv
        .patch("/users/me", Some(&token), json!({ "role": "admin", "bio": "hello" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "user");
    assert_eq!(body["bio"], "hello");

    let (status, _) = srv.get("/users", Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn me_requires_authentication() {
    let srv = TestServer::spawn().await;
    let (status, _) = srv.get("/users/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_manages_users_by_username() {
    let srv = TestServer::spawn().await;
    let (_, admin) = srv.account("root", Role::Admin).await;

    let (status, body) = srv
        .post(
            "/users",
            Some(&admin),
            json!({ "username": "frank", "email": "frank@example.com", "role": "moderator" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["role"], "moderator");

    let (status, body) = srv
        .post("/users", Some(&admin), json!({ "username": "me", "email": "me@example.com" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["username"].is_array());

    let (status, body) = srv
        .post("/users", Some(&admin), json!({ "username": "frank2", "email": "frank@example.com" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["email"].is_array());

    let (status, body) = srv.get("/users?search=fra", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let (status, body) = srv.patch("/users/frank", Some(&admin), json!({ "role": "admin" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "admin");

    let (status, _) = srv.delete("/users/frank", Some(&admin)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = srv.get("/users/frank", Some(&admin)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─────────────────────────────────────────────────────────────────────────────
// Catalog
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn anonymous_reads_titles_but_cannot_write() {
    let srv = TestServer::spawn().await;
    let (_, user) = srv.account("gina", Role::User).await;

    let (status, body) = srv.get("/titles", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);

    let (status, _) = srv.post("/titles", None, json!({ "name": "Heat", "year": 1995 })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = srv.post("/titles", Some(&user), json!({ "name": "Heat", "year": 1995 })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn title_write_form_uses_slugs_and_read_form_nests() {
    let srv = TestServer::spawn().await;
    let (_, admin) = srv.account("root", Role::Admin).await;
    let ids = srv.seed_catalog(&admin, &[("Heat", 1995)]).await;

    let (status, body) = srv.get(&format!("/titles/{}", ids[0]), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["category"], json!({ "name": "Movie", "slug": "movie" }));
    assert_eq!(body["genre"], json!([{ "name": "Drama", "slug": "drama" }]));
    assert_eq!(body["rating"], Value::Null);

    let (status, body) = srv
        .post(
            "/titles",
            Some(&admin),
            json!({ "name": "Ghost", "year": 1990, "category": "nope", "genre": ["drama", "nada"] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["category"].is_array());
    assert!(body["fields"]["genre"].is_array());

    let (status, body) = srv
        .patch(&format!("/titles/{}", ids[0]), Some(&admin), json!({ "description": "L.A. crime saga" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["category"], "movie");
    assert_eq!(body["genre"], json!(["drama"]));
    assert_eq!(body["description"], "L.A. crime saga");
}

#[tokio::test]
async fn titles_are_filtered_and_ordered_by_name() {
    let srv = TestServer::spawn().await;
    let (_, admin) = srv.account("root", Role::Admin).await;
    srv.seed_catalog(&admin, &[("Zodiac", 2007), ("Alien", 1979)]).await;
    srv.post("/titles", Some(&admin), json!({ "name": "Amelie", "year": 2001 })).await;

    let (_, body) = srv.get("/titles", None).await;
    let names: Vec<&str> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Alien", "Amelie", "Zodiac"]);

    let (_, body) = srv.get("/titles?genre=drama", None).await;
    assert_eq!(body["count"], 2);
    let (_, body) = srv.get("/titles?category=movie&name=ZOD", None).await;
    assert_eq!(body["count"], 1);
    let (_, body) = srv.get("/titles?year=2001", None).await;
    assert_eq!(body["results"][0]["name"], "Amelie");
    let (_, body) = srv.get("/titles?limit=1&offset=1", None).await;
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
    assert_eq!(body["has_more"], true);
}

#[tokio::test]
async fn deleting_a_category_keeps_its_titles() {
    let srv = TestServer::spawn().await;
    let (_, admin) = srv.account("root", Role::Admin).await;
    let ids = srv.seed_catalog(&admin, &[("Heat", 1995)]).await;

    let (status, _) = srv.delete("/categories/movie", Some(&admin)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = srv.get(&format!("/titles/{}", ids[0]), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["category"], Value::Null);

    let (status, _) = srv.delete("/categories/movie", Some(&admin)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reference_data_is_searchable_and_slugs_are_unique() {
    let srv = TestServer::spawn().await;
    let (_, admin) = srv.account("root", Role::Admin).await;
    srv.seed_catalog(&admin, &[]).await;
    srv.post("/genres", Some(&admin), json!({ "name": "Comedy", "slug": "comedy" })).await;

    let (status, body) = srv.post("/genres", Some(&admin), json!({ "name": "Drama 2", "slug": "drama" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["slug"].is_array());

    let (_, body) = srv.get("/genres?search=med", None).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0], json!({ "name": "Comedy", "slug": "comedy" }));

    // Newest first.
    let (_, body) = srv.get("/genres", None).await;
    assert_eq!(body["results"][0]["slug"], "comedy");
}

// ─────────────────────────────────────────────────────────────────────────────
// Reviews and comments
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn review_score_bounds_and_one_review_per_title() {
    let srv = TestServer::spawn().await;
    let (_, admin) = srv.account("root", Role::Admin).await;
    let (_, user) = srv.account("hank", Role::User).await;
    let ids = srv.seed_catalog(&admin, &[("Heat", 1995)]).await;
    let path = format!("/titles/{}/reviews", ids[0]);

    for bad in [0, 11] {
        let (status, body) = srv.post(&path, Some(&user), json!({ "score": bad, "text": "x" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "score {bad}");
        assert!(body["fields"]["score"].is_array());
    }

    let (status, body) = srv.post(&path, Some(&user), json!({ "score": "ten" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["score"].is_array());

    let (status, body) = srv.post(&path, Some(&user), json!({ "score": 1, "text": "meh" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["author"], "hank");
    assert_eq!(body["score"], 1);

    let (status, body) = srv.post(&path, Some(&user), json!({ "score": 10 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["fields"]["non_field_errors"],
        json!(["You have already reviewed this title."])
    );

    // A different author may still review the same title.
    let (status, _) = srv.post(&path, Some(&admin), json!({ "score": 10 })).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn rating_is_the_average_score_or_null() {
    let srv = TestServer::spawn().await;
    let (_, admin) = srv.account("root", Role::Admin).await;
    let (_, a) = srv.account("ivy", Role::User).await;
    let (_, b) = srv.account("jack", Role::User).await;
    let ids = srv.seed_catalog(&admin, &[("Alien", 1979), ("Brazil", 1985)]).await;

    let path = format!("/titles/{}/reviews", ids[0]);
    srv.post(&path, Some(&a), json!({ "score": 8 })).await;
    srv.post(&path, Some(&b), json!({ "score": 10 })).await;

    let (_, body) = srv.get("/titles", None).await;
    assert_eq!(body["results"][0]["name"], "Alien");
    assert_eq!(body["results"][0]["rating"].as_f64(), Some(9.0));
    assert_eq!(body["results"][1]["rating"], Value::Null);
}

#[tokio::test]
async fn missing_title_is_404_before_body_validation() {
    let srv = TestServer::spawn().await;
    let (_, user) = srv.account("kate", Role::User).await;

    let (status, _) = srv.post("/titles/999/reviews", Some(&user), json!({ "score": 42 })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = srv.get("/titles/999/reviews", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn moderator_may_delete_others_reviews_but_users_may_not() {
    let srv = TestServer::spawn().await;
    let (_, admin) = srv.account("root", Role::Admin).await;
    let (_, author) = srv.account("liam", Role::User).await;
    let (_, other) = srv.account("mia", Role::User).await;
    let (_, moderator) = srv.account("mod", Role::Moderator).await;
    let ids = srv.seed_catalog(&admin, &[("Heat", 1995)]).await;

    let (_, review) = srv
        .post(&format!("/titles/{}/reviews", ids[0]), Some(&author), json!({ "score": 7 }))
        .await;
    let path = format!("/titles/{}/reviews/{}", ids[0], review["id"]);

    let (status, _) = srv.patch(&path, Some(&other), json!({ "score": 1 })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = srv.delete(&path, Some(&other)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = srv.delete(&path, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = srv.patch(&path, Some(&author), json!({ "text": "on reflection" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 7);
    assert_eq!(body["text"], "on reflection");

    let (status, _) = srv.delete(&path, Some(&moderator)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = srv.get(&path, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_a_review_removes_its_comments() {
    let srv = TestServer::spawn().await;
    let (_, admin) = srv.account("root", Role::Admin).await;
    let (_, user) = srv.account("nina", Role::User).await;
    let ids = srv.seed_catalog(&admin, &[("Heat", 1995)]).await;

    let (_, review) = srv
        .post(&format!("/titles/{}/reviews", ids[0]), Some(&user), json!({ "score": 9 }))
        .await;
    let review_path = format!("/titles/{}/reviews/{}", ids[0], review["id"]);

    let (status, comment) = srv
        .post(&format!("{review_path}/comments"), Some(&admin), json!({ "text": "agreed" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(comment["author"], "root");
    let comment_id = CommentId::new(comment["id"].as_i64().unwrap());

    let (_, listed) = srv.get(&format!("{review_path}/comments"), None).await;
    assert_eq!(listed["count"], 1);

    let (status, _) = srv.delete(&review_path, Some(&user)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = srv.get(&format!("{review_path}/comments"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(matches!(
        srv.store.update_comment(comment_id, "still here?".to_string()).await,
        Err(StoreError::NotFound)
    ));
}

#[tokio::test]
async fn comments_are_scoped_to_their_title_and_review() {
    let srv = TestServer::spawn().await;
    let (_, admin) = srv.account("root", Role::Admin).await;
    let (_, user) = srv.account("owen", Role::User).await;
    let ids = srv.seed_catalog(&admin, &[("Alien", 1979), ("Brazil", 1985)]).await;

    let (_, review) = srv
        .post(&format!("/titles/{}/reviews", ids[0]), Some(&user), json!({ "score": 6 }))
        .await;

    let wrong = format!("/titles/{}/reviews/{}/comments", ids[1], review["id"]);
    let (status, _) = srv.post(&wrong, Some(&user), json!({ "text": "lost" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let right = format!("/titles/{}/reviews/{}/comments", ids[0], review["id"]);
    let (status, body) = srv.post(&right, Some(&user), json!({ "text": "  " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["text"].is_array());
}

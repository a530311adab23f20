// Shared state and the route table

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    middleware::map_response,
    routing::{delete, get, post, put},
    Extension, Router,
};

use crate::{
    auth::{PasswordHasher, TokenService},
    config::Config,
    db::Database,
    handlers::{account, articles, cms, health_check, quizzes, route_not_found},
    middleware::{create_middleware_stack, envelope_bare_errors},
    models::QuizKind,
    scoring::ScoringClient,
    storage::ObjectStorage,
};

/// Two 5 MiB files plus the text fields of an article form.
const MAX_BODY_SIZE: usize = 12 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub tokens: Arc<TokenService>,
    pub passwords: PasswordHasher,
    pub storage: Arc<ObjectStorage>,
    pub scoring: Arc<ScoringClient>,
    pub secure_cookies: bool,
}

impl AppState {
    pub fn new(config: &Config, db: Database) -> anyhow::Result<Self> {
        let storage = ObjectStorage::new(&config.storage)
            .context("Failed to initialize object storage client")?;
        let scoring = ScoringClient::new(&config.scoring)
            .context("Failed to initialize scoring client")?;

        Ok(AppState {
            db: Arc::new(db),
            tokens: Arc::new(TokenService::new(&config.auth)),
            passwords: PasswordHasher::new(config.auth.bcrypt_cost),
            storage: Arc::new(storage),
            scoring: Arc::new(scoring),
            secure_cookies: config.environment.is_production(),
        })
    }
}

/// Create the Axum router with all endpoints and middleware
pub fn create_router(state: AppState, config: &Config) -> Router {
    let mut router = Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        // Mobile app
        .route("/register", post(account::register))
        .route("/login", post(account::login))
        .route("/user/:id", get(account::get_user))
        .route("/insertName/:id", put(account::insert_name))
        .route("/uploadImage/:id", put(account::upload_image))
        .route("/artikel/:id", get(articles::view_article))
        .route("/artikel/search/:title", get(articles::search_articles))
        // CMS
        .route("/addadmin", post(cms::add_admin))
        .route("/loginAdmin", post(cms::login_admin))
        .route("/logoutAdmin", delete(cms::logout_admin))
        .route("/home", get(cms::home))
        .route("/countUser", get(cms::count_user))
        .route("/listadmin", get(cms::list_admins))
        .route("/deleteAdmin/:id", delete(cms::delete_admin))
        .route("/listuser", get(cms::list_users))
        .route("/addUser", post(cms::add_user))
        .route("/deleteUser/:id", delete(cms::delete_user))
        .route("/listartikel", get(articles::list_articles))
        .route("/addArtikel", post(articles::add_article))
        .route("/deleteArtikel/:id", delete(articles::delete_article));

    for kind in QuizKind::ALL {
        router = router
            .nest(&format!("/{}", kind.label().to_lowercase()), quiz_routes(kind))
            .merge(cms_quiz_routes(kind));
    }

    router
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
        .layer(create_middleware_stack(&config.http))
        .layer(map_response(envelope_bare_errors))
}

/// `/level/:level` and `/:id` for one quiz kind, nested under `/spelling` or
/// `/pronunciation`.
fn quiz_routes(kind: QuizKind) -> Router<AppState> {
    Router::new()
        .route("/level/:level", get(quizzes::quizzes_by_level))
        .route("/:id", get(quizzes::quiz_by_id).post(quizzes::submit_answer))
        .layer(Extension(kind))
}

/// `/listSpelling`, `/addSpelling`, `/deleteSpelling/:id` and the
/// pronunciation counterparts.
fn cms_quiz_routes(kind: QuizKind) -> Router<AppState> {
    let label = kind.label();

    Router::new()
        .route(&format!("/list{}", label), get(quizzes::list_quizzes))
        .route(&format!("/add{}", label), post(quizzes::add_quiz))
        .route(&format!("/delete{}/:id", label), delete(quizzes::delete_quiz))
        .layer(Extension(kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Role, ADMIN_COOKIE};
    use crate::test_support;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    fn test_app() -> (Router, AppState) {
        let config = test_support::offline_config();
        let db = Database::lazy(config.database.clone()).unwrap();
        let state = AppState::new(&config, db).unwrap();
        (create_router(state.clone(), &config), state)
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_health_check() {
        let (router, _) = test_app();
        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_logout_clears_cookie() {
        let (router, _) = test_app();
        let response = router
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/logoutAdmin")
                    .header(header::COOKIE, format!("{}=old-session", ADMIN_COOKIE))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(set_cookie.starts_with("jwt="));
        assert!(set_cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_home_requires_admin_cookie() {
        let (router, _) = test_app();
        let (status, body) = send(router, Request::builder().uri("/home").body(Body::empty()).unwrap()).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], "Error");
        assert_eq!(body["msg"], "Unauthorized");
    }

    #[tokio::test]
    async fn test_home_with_admin_cookie() {
        let (router, state) = test_app();
        let token = state.tokens.issue(7, "ops@lingo.app", Role::Admin).unwrap();

        let (status, body) = send(
            router,
            Request::builder()
                .uri("/home")
                .header(header::COOKIE, format!("{}={}", ADMIN_COOKIE, token))
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "Success");
        assert_eq!(body["id"], 7);
    }

    #[tokio::test]
    async fn test_user_token_is_not_an_admin_session() {
        let (router, state) = test_app();
        let token = state.tokens.issue(7, "budi@example.com", Role::User).unwrap();

        let (status, _) = send(
            router,
            Request::builder()
                .uri("/listSpelling")
                .header(header::COOKIE, format!("{}={}", ADMIN_COOKIE, token))
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_cms_listing_requires_admin_cookie() {
        for uri in ["/listuser", "/listadmin", "/countUser", "/listartikel", "/listPronunciation"] {
            let (router, _) = test_app();
            let (status, _) = send(router, Request::builder().uri(uri).body(Body::empty()).unwrap()).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_submission_requires_bearer_token() {
        let (router, _) = test_app();
        let (status, body) = send(
            router,
            Request::builder()
                .method("POST")
                .uri("/pronunciation/1")
                .header(header::CONTENT_TYPE, "multipart/form-data; boundary=X")
                .body(Body::from("--X--\r\n"))
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["msg"], "Dont have access");
    }

    #[tokio::test]
    async fn test_admin_token_is_not_a_bearer_token() {
        let (router, state) = test_app();
        let token = state.tokens.issue(1, "ops@lingo.app", Role::Admin).unwrap();

        let (status, _) = send(
            router,
            Request::builder()
                .method("PUT")
                .uri("/insertName/1")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"name":"Budi"}"#))
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_other_users_profile_is_forbidden() {
        let (router, state) = test_app();
        let token = state.tokens.issue(1, "budi@example.com", Role::User).unwrap();

        let (status, _) = send(
            router,
            Request::builder()
                .method("PUT")
                .uri("/insertName/2")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"name":"Budi"}"#))
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_non_numeric_id_is_a_validation_error() {
        let (router, _) = test_app();
        let (status, body) = send(router, Request::builder().uri("/user/abc").body(Body::empty()).unwrap()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "Error");
    }

    #[tokio::test]
    async fn test_malformed_json_is_a_validation_error() {
        let (router, _) = test_app();
        let (status, body) = send(
            router,
            Request::builder()
                .method("POST")
                .uri("/loginAdmin")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "Error");
    }

    #[tokio::test]
    async fn test_database_outage_is_reported_without_details() {
        let (router, _) = test_app();
        let (status, body) = send(router, Request::builder().uri("/artikel/1").body(Body::empty()).unwrap()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "Error");
        assert!(!body["msg"].as_str().unwrap().contains("127.0.0.1"));
    }

    #[tokio::test]
    async fn test_unknown_route_gets_the_envelope() {
        let (router, _) = test_app();
        let (status, body) = send(router, Request::builder().uri("/nowhere").body(Body::empty()).unwrap()).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "Error");
        assert_eq!(body["msg"], "Route not found");
    }

    #[tokio::test]
    async fn test_wrong_method_gets_the_envelope() {
        let (router, _) = test_app();
        let (status, body) = send(
            router,
            Request::builder().method("DELETE").uri("/register").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["status"], "Error");
    }

    #[tokio::test]
    async fn test_oversized_json_body_is_payload_too_large() {
        let (router, _) = test_app();
        let mut oversized = vec![b' '; MAX_BODY_SIZE + 1];
        oversized[0] = b'{';

        let (status, body) = send(
            router,
            Request::builder()
                .method("POST")
                .uri("/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(oversized))
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["status"], "Error");
    }
}

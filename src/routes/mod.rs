pub mod sse;
pub mod ui;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn build_router(state: AppState) -> Router {
    let static_dir = state.config.static_dir.clone();

    Router::new()
        // Health
        .route("/healthz", get(|| async { "ok" }))
        // Dashboard UI
        .route("/ui/", get(ui::handle_dashboard))
        .route("/ui/clusters/{name}", get(ui::handle_cluster_detail))
        .route("/ui/pods", get(ui::handle_pods))
        .route("/ui/pods/expand", get(ui::handle_pod_expand))
        .route("/ui/pods/collapse", get(ui::handle_pod_collapse))
        .route(
            "/ui/pods/delete",
            get(ui::handle_pod_delete_confirm).post(ui::handle_pod_delete),
        )
        .route("/ui/pods/{namespace}/{name}", get(ui::handle_pod_detail))
        .route("/ui/nodes", get(ui::handle_nodes))
        .route("/ui/nodes/{name}", get(ui::handle_node_detail))
        .route("/ui/events", get(ui::handle_events))
        .route("/ui/monitoring", get(ui::handle_monitoring))
        // Shell
        .route("/ui/theme", post(ui::handle_toggle_theme))
        .route("/ui/theme/stream", get(sse::handle_theme_stream))
        .route("/ui/menu", post(ui::handle_toggle_menu))
        // Static files
        .nest_service("/ui/static", ServeDir::new(static_dir))
        // Root redirect
        .route(
            "/",
            get(|| async {
                axum::response::Redirect::to("/ui/")
            }),
        )
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::ApiClient;
    use crate::config::Config;
    use crate::state::session::SessionStore;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use axum::response::Response;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app_state(server: &MockServer) -> AppState {
        let config = Config {
            api_base_url: format!("{}/api", server.uri()),
            ..Config::default()
        };
        AppState {
            api: ApiClient::new(&config.api_base_url, Duration::from_secs(5)).unwrap(),
            sessions: Arc::new(SessionStore::new(
                config.default_theme,
                Duration::from_secs(config.session_idle_secs),
            )),
            config: Arc::new(config),
        }
    }

    async fn mock_json(server: &MockServer, route: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    async fn body_text(resp: Response) -> String {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut req = Request::builder().uri(uri);
        if let Some(c) = cookie {
            req = req.header(header::COOKIE, c);
        }
        req.body(Body::empty()).unwrap()
    }

    fn cookie_of(resp: &Response) -> String {
        let set = resp.headers()[header::SET_COOKIE].to_str().unwrap();
        set.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn root_redirects_to_dashboard() {
        let server = MockServer::start().await;
        let app = build_router(app_state(&server));
        let resp = app.oneshot(get("/", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[header::LOCATION], "/ui/");
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        let server = MockServer::start().await;
        let app = build_router(app_state(&server));
        let resp = app.oneshot(get("/healthz", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn dashboard_renders_cluster_cards() {
        let server = MockServer::start().await;
        mock_json(
            &server,
            "/api/clusters",
            serde_json::json!([{"name": "prod", "kubeconfig": "", "context": "prod-admin"}]),
        )
        .await;
        mock_json(
            &server,
            "/api/clusters/prod/status",
            serde_json::json!({
                "cluster": "prod",
                "nodes": {"total": 3, "ready": 3, "notReady": 0},
                "pods": {"total": 12, "running": 11, "pending": 1, "failed": 0},
                "timestamp": "2024-05-01T10:00:00Z"
            }),
        )
        .await;

        let app = build_router(app_state(&server));
        let resp = app.oneshot(get("/ui/", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(cookie_of(&resp).starts_with("klaw_session="));

        let html = body_text(resp).await;
        assert!(html.contains("prod"));
        assert!(html.contains("3/3"));
        assert!(html.contains("✅"));
    }

    #[tokio::test]
    async fn dashboard_shows_error_banner() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/clusters"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let app = build_router(app_state(&server));
        let resp = app.oneshot(get("/ui/", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("Failed to fetch cluster data"));
    }

    #[tokio::test]
    async fn pods_page_keeps_session_across_requests() {
        let server = MockServer::start().await;
        mock_json(&server, "/api/clusters", serde_json::json!([{"name": "prod"}])).await;
        mock_json(
            &server,
            "/api/clusters/prod/namespaces",
            serde_json::json!([{"metadata": {"name": "default"}}]),
        )
        .await;
        mock_json(
            &server,
            "/api/clusters/prod/namespaces/default/pods",
            serde_json::json!([
                {"metadata": {"name": "web-0", "namespace": "default"}, "status": {"phase": "Running"}},
                {"metadata": {"name": "db-0", "namespace": "default"}, "status": {"phase": "Pending"}}
            ]),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/api/clusters/prod/namespaces/default/pods/web-0/logs"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"logs": "hello from web"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let app = build_router(app_state(&server));

        let resp = app.clone().oneshot(get("/ui/pods", None)).await.unwrap();
        let cookie = cookie_of(&resp);
        let html = body_text(resp).await;
        assert!(html.contains("web-0"));
        assert!(html.contains("db-0"));

        for _ in 0..2 {
            let resp = app
                .clone()
                .oneshot(get("/ui/pods/expand?pod=web-0", Some(&cookie)))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::SEE_OTHER);
            assert!(resp.headers().get(header::SET_COOKIE).is_none());
        }

        let resp = app
            .clone()
            .oneshot(get("/ui/pods?q=web", Some(&cookie)))
            .await
            .unwrap();
        let html = body_text(resp).await;
        assert!(html.contains("hello from web"));
        assert!(!html.contains("db-0"));
    }

    #[tokio::test]
    async fn unconfirmed_delete_does_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let app = build_router(app_state(&server));
        let req = Request::builder()
            .method("POST")
            .uri("/ui/pods/delete")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("pod=web-0"))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn delete_confirmed_for_other_namespace_is_refused() {
        let server = MockServer::start().await;
        mock_json(&server, "/api/clusters", serde_json::json!([{"name": "prod"}])).await;
        mock_json(
            &server,
            "/api/clusters/prod/namespaces",
            serde_json::json!([{"metadata": {"name": "default"}}, {"metadata": {"name": "payments"}}]),
        )
        .await;
        for ns in ["default", "payments"] {
            mock_json(
                &server,
                &format!("/api/clusters/prod/namespaces/{ns}/pods"),
                serde_json::json!([
                    {"metadata": {"name": "web-0", "namespace": ns}, "status": {"phase": "Running"}}
                ]),
            )
            .await;
        }
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let app = build_router(app_state(&server));
        let resp = app.clone().oneshot(get("/ui/pods", None)).await.unwrap();
        let cookie = cookie_of(&resp);

        let resp = app
            .clone()
            .oneshot(get("/ui/pods/delete?pod=web-0", Some(&cookie)))
            .await
            .unwrap();
        let html = body_text(resp).await;
        assert!(html.contains(r#"name="namespace" value="default""#));

        app.clone()
            .oneshot(get("/ui/pods?namespace=payments", Some(&cookie)))
            .await
            .unwrap();

        let req = Request::builder()
            .method("POST")
            .uri("/ui/pods/delete")
            .header(header::COOKIE, &cookie)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("pod=web-0&cluster=prod&namespace=default&confirm=true"))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);

        let resp = app.oneshot(get("/ui/pods", Some(&cookie))).await.unwrap();
        assert!(body_text(resp).await.contains("Failed to delete pod"));
    }

    #[tokio::test]
    async fn missing_pod_renders_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/clusters/prod/namespaces/default/pods/ghost"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(serde_json::json!({"error": "pod not found"})),
            )
            .mount(&server)
            .await;

        let app = build_router(app_state(&server));
        let resp = app
            .oneshot(get("/ui/pods/default/ghost?cluster=prod", None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(body_text(resp).await.contains("Failed to fetch pods"));
    }

    #[tokio::test]
    async fn theme_toggle_redirects_back() {
        let server = MockServer::start().await;
        let state = app_state(&server);
        let sessions = state.sessions.clone();
        let app = build_router(state);

        let req = Request::builder()
            .method("POST")
            .uri("/ui/theme")
            .header(header::REFERER, "http://localhost:9090/ui/nodes?cluster=prod")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[header::LOCATION], "/ui/nodes?cluster=prod");

        let cookie = cookie_of(&resp);
        let id = cookie.trim_start_matches("klaw_session=");
        let (session, created) = sessions.get_or_create(Some(id)).await;
        assert!(!created);
        assert_eq!(session.shell.theme(), crate::state::shell::Theme::Dark);
    }
}

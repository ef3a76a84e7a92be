// ==========================================
// HTTP 接口测试
// ==========================================
// 职责: 驱动 axum Router，验证路由、响应封装与状态码
// ==========================================


#[cfg(test)]
mod http_api_test {
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use axum::Router;
    use farm_link::app::{build_router, AppState};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::test_helpers::{assert_close, create_test_db, TestRepos};

    // ==========================================
    // 测试辅助函数
    // ==========================================

    fn router(db_path: &str) -> Router {
        build_router(Arc::new(AppState::new(db_path.to_string()).unwrap()))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_request(method: Method, uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(user) = user {
            builder = builder.header("X-User-Id", user);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    // ==========================================
    // 测试用例
    // ==========================================

    #[tokio::test]
    async fn test_health() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let app = router(&db_path);

        let (status, body) = send(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "ok");
    }

    #[tokio::test]
    async fn test_auto_order_partial_fulfilment() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let repos = TestRepos::new(&db_path);
        repos.seed_stock("Alice", "Potato", 100.0);
        repos.seed_stock("Bob", "Potato", 150.0);
        let app = router(&db_path);

        let (status, body) = send(
            &app,
            json_request(
                Method::POST,
                "/orders/auto",
                Some("buyer-1"),
                json!({"crops": [{"crop": "Potato", "quantity": 30, "unit": "bags_10kg"}]}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["orders_created"], 2);
        let unfulfilled = &body["data"]["unfulfilled_requests"][0];
        assert_eq!(unfulfilled["crop"], "Potato");
        assert_eq!(unfulfilled["unit_display"], "bags_10kg");
        assert_close(unfulfilled["shortfall"].as_f64().unwrap(), 5.0);
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn test_auto_order_validation_error_envelope() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let repos = TestRepos::new(&db_path);
        repos.seed_stock("Alice", "Carrot", 60.0);
        let app = router(&db_path);

        let (status, body) = send(
            &app,
            json_request(
                Method::POST,
                "/orders/auto",
                Some("buyer-1"),
                json!({"crops": [{"crop": "Carrot", "quantity": -5, "unit": "kg"}]}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(
            body["error"]["details"]["problems"][0]["kind"],
            "NON_POSITIVE_QUANTITY"
        );
        assert!(body.get("data").is_none());
        assert_eq!(repos.order_count(), 0);
    }

    #[tokio::test]
    async fn test_auto_order_requires_user_header_and_valid_body() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let app = router(&db_path);

        let (status, body) = send(
            &app,
            json_request(
                Method::POST,
                "/orders/auto",
                None,
                json!({"crops": [{"crop": "Carrot", "quantity": 1, "unit": "kg"}]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_INPUT");

        let (status, body) = send(
            &app,
            json_request(Method::POST, "/orders/auto", Some("buyer-1"), json!({"items": []})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_order_status_and_delete_routes() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let repos = TestRepos::new(&db_path);
        let (_, _, stock_id) = repos.seed_stock("Alice", "Tomato", 80.0);
        let app = router(&db_path);

        let (_, body) = send(
            &app,
            json_request(
                Method::POST,
                "/orders/auto",
                Some("buyer-1"),
                json!({"crops": [{"crop": "Tomato", "quantity": 50, "unit": "kg"}]}),
            ),
        )
        .await;
        let order_id = body["data"]["orders"][0]["id"].as_str().unwrap().to_string();

        let (status, body) = send(&app, get(&format!("/orders/{}", order_id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "PENDING");

        // 跳级
        let (status, body) = send(
            &app,
            json_request(
                Method::PATCH,
                &format!("/orders/{}/status", order_id),
                None,
                json!({"status": "DELIVERED"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "INVALID_STATE_TRANSITION");

        // 删除待确认订单
        let request = Request::builder()
            .method(Method::DELETE)
            .uri(format!("/orders/{}", order_id))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_close(repos.available(stock_id), 80.0);

        let (status, body) = send(&app, get(&format!("/orders/{}", order_id))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_crop_routes() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let repos = TestRepos::new(&db_path);
        repos.seed_stock("Alice", "Tomato", 80.0);
        repos.seed_stock("Bob", "Tomato", 20.0);
        let app = router(&db_path);

        let (status, body) = send(&app, get("/crops/available")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["crop_name"], "Tomato");
        assert_close(body["data"][0]["total_availability_kg"].as_f64().unwrap(), 100.0);

        let (status, body) = send(&app, get("/crops/availability-details/Tomato")).await;
        assert_eq!(status, StatusCode::OK);
        assert_close(body["data"]["total_availability_kg"].as_f64().unwrap(), 100.0);

        let (status, _) = send(&app, get("/crops/availability-details/Mango")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_farmer_listing_query_string() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let repos = TestRepos::new(&db_path);
        repos.seed_stock("John Kamau", "Tomato", 10.0);
        repos.seed_stock("Mary Wanjiru", "Tomato", 10.0);
        let app = router(&db_path);

        let (status, body) = send(
            &app,
            get("/farmers?search=john&sort=name,asc&fields=id,name&page=1&limit=10"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let rows = body["data"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], "John Kamau");
        assert!(rows[0].get("email").is_none());

        let (status, body) = send(&app, get("/farmers?sort=password")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_QUERY");
    }
}

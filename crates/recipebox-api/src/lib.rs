pub mod auth;
pub(crate) mod convert;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod policy;
pub mod recipes;
pub mod router;
pub mod state;
pub mod uploads;
pub mod users;

pub use router::router;
pub use state::{AppState, AppStateInner};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::{
        Router,
        body::Body,
        http::{Method, Request, StatusCode, header},
    };
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use uuid::Uuid;

    use recipebox_db::{Database, NewUser};
    use recipebox_types::models::Role;

    use crate::auth::create_token;
    use crate::state::{AppState, AppStateInner};

    const SECRET: &str = "test-secret";

    /// The full router over an in-memory database. Users are inserted
    /// directly so tests skip password hashing.
    pub struct TestApp {
        pub state: AppState,
        router: Router,
    }

    impl TestApp {
        pub fn new() -> Self {
            let state: AppState = Arc::new(AppStateInner {
                db: Database::open_in_memory().unwrap(),
                jwt_secret: SECRET.into(),
                upload_dir: std::env::temp_dir().join(format!("recipebox-test-{}", Uuid::new_v4())),
            });
            let router = crate::router(state.clone());
            Self { state, router }
        }

        pub fn user(&self, name: &str) -> (String, Uuid) {
            self.account(name, Role::User)
        }

        pub fn admin(&self, name: &str) -> (String, Uuid) {
            self.account(name, Role::Admin)
        }

        fn account(&self, name: &str, role: Role) -> (String, Uuid) {
            let id = Uuid::new_v4();
            let email = format!("{}@example.com", name.to_lowercase());
            self.state
                .db
                .create_user(&NewUser {
                    id: &id.to_string(),
                    name,
                    email: &email,
                    password_hash: "hash",
                    role,
                    avatar: None,
                })
                .unwrap()
                .unwrap();
            (create_token(SECRET, id, role).unwrap(), id)
        }

        /// Creates a recipe through the API and returns its id.
        pub async fn recipe(&self, token: &str, title: &str, category: &str) -> String {
            let body = json!({
                "title": title,
                "description": format!("How to make {}", title.to_lowercase()),
                "ingredients": ["salt"],
                "instructions": [{ "text": "Cook" }],
                "prepTime": 10,
                "cookTime": 20,
                "category": category,
            });
            let (status, recipe) = self.call(Method::POST, "/api/recipes", Some(token), Some(body)).await;
            assert_eq!(status, StatusCode::CREATED, "{recipe}");
            recipe["id"].as_str().unwrap().to_string()
        }

        pub async fn call(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let bytes = body.map(|b| b.to_string().into_bytes()).unwrap_or_default();
            self.call_raw(method, uri, token, "application/json", bytes).await
        }

        pub async fn call_raw(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            content_type: &str,
            body: Vec<u8>,
        ) -> (StatusCode, Value) {
            let mut req = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            if !body.is_empty() {
                req = req.header(header::CONTENT_TYPE, content_type);
            }

            let res = self
                .router
                .clone()
                .oneshot(req.body(Body::from(body)).unwrap())
                .await
                .unwrap();
            let status = res.status();
            let bytes = res.into_body().collect().await.unwrap().to_bytes();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, value)
        }
    }
}

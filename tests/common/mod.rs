#![allow(dead_code)]

use std::sync::Arc;

use chrono::Duration;
use recipe_api::{
    api,
    jwt::SessionKeys,
    schema::{NewUser, Owner, User},
    MemoryStore, SharedStore, Store,
};
use serde_json::{json, Value};
use warp::http::StatusCode;

pub struct TestApp {
    pub store: SharedStore,
    pub keys: Arc<SessionKeys>,
}

pub struct TestUser {
    pub user: User,
    pub token: String,
}

impl TestUser {
    pub fn owner(&self) -> Owner {
        Owner::from(&self.user)
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    pub fn with_store(store: SharedStore) -> Self {
        Self {
            store,
            keys: Arc::new(SessionKeys::new(b"test-secret", Duration::hours(1)).unwrap()),
        }
    }

    /// Stores a user directly and issues a session for it.
    pub async fn user(&self, email: &str) -> TestUser {
        let user = self
            .store
            .create_user(NewUser {
                email: email.to_string(),
                name: String::from("Test Name"),
                password: String::from("unused"),
            })
            .await
            .unwrap();
        let token = self.keys.generate_jwt_session(&user).unwrap();

        TestUser { user, token }
    }

    pub async fn request(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let filter = api(self.store.clone(), self.keys.clone());

        let mut request = warp::test::request().method(method).path(path);
        if let Some(token) = token {
            request = request.header("authorization", format!("Bearer {token}"));
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.reply(&filter).await;
        let body = if response.body().is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(response.body()).unwrap()
        };

        TestResponse {
            status: response.status(),
            body,
        }
    }

    pub async fn get(&self, user: &TestUser, path: &str) -> TestResponse {
        self.request("GET", path, Some(&user.token), None).await
    }

    pub async fn post(&self, user: &TestUser, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(&user.token), Some(body)).await
    }

    pub async fn patch(&self, user: &TestUser, path: &str, body: Value) -> TestResponse {
        self.request("PATCH", path, Some(&user.token), Some(body)).await
    }

    pub async fn put(&self, user: &TestUser, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(&user.token), Some(body)).await
    }

    pub async fn delete(&self, user: &TestUser, path: &str) -> TestResponse {
        self.request("DELETE", path, Some(&user.token), None).await
    }

    /// Creates a recipe over HTTP with the sample defaults, overridden by `params`.
    pub async fn create_recipe(&self, user: &TestUser, params: Value) -> Value {
        let mut payload = json!({
            "title": "Sample recipe",
            "time_minutes": 10,
            "price": "5.50",
            "description": "Sample recipe description",
            "link": "http://example.com/recipe",
        });
        if let (Some(payload), Some(params)) = (payload.as_object_mut(), params.as_object()) {
            payload.extend(params.clone());
        }

        let response = self.post(user, "/recipes", payload).await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body
    }
}

pub fn names(items: &Value) -> Vec<String> {
    items
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["name"].as_str().unwrap().to_string())
        .collect()
}

pub fn ids(items: &Value) -> Vec<i64> {
    items
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_i64().unwrap())
        .collect()
}

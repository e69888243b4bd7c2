//! In-memory scripted provider
//!
//! Serves canned responses for the demo mode and drives the data layer in
//! tests. Every call is recorded so request payloads can be inspected.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

use super::AnalyticsProvider;
use crate::DataError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
enum Reply {
    Json(Value),
    Status(u16, String),
}

/// A canned response for one endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    method: Method,
    path: String,
    conditions: Vec<(String, String)>,
    reply: Reply,
    delay: Option<Duration>,
}

impl Route {
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            conditions: Vec::new(),
            reply: Reply::Json(Value::Null),
            delay: None,
        }
    }

    /// Only match requests whose body has `field` equal to `value`
    pub fn when(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    /// Respond with a JSON body
    pub fn json(mut self, body: Value) -> Self {
        self.reply = Reply::Json(body);
        self
    }

    /// Respond with a non-success status
    pub fn status(mut self, status: u16, body: impl Into<String>) -> Self {
        self.reply = Reply::Status(status, body.into());
        self
    }

    /// Wait before responding
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn matches(&self, method: Method, path: &str, body: Option<&Value>) -> bool {
        self.method == method
            && self.path == path
            && self.conditions.iter().all(|(field, expected)| {
                body.and_then(|b| b.get(field))
                    .and_then(Value::as_str)
                    .map_or(false, |actual| actual == expected)
            })
    }
}

/// A request the provider received
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

/// Provider answering from a fixed route table
#[derive(Default)]
pub struct StaticProvider {
    routes: RwLock<Vec<Route>>,
    calls: Mutex<Vec<RecordedCall>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StaticProvider {
    /// Create a new provider serving `routes`. The first matching route wins.
    pub fn new(routes: Vec<Route>) -> Self {
        Self {
            routes: RwLock::new(routes),
            ..Self::default()
        }
    }

    /// Add a route that takes precedence over the existing ones
    pub fn add_route(&self, route: Route) {
        self.routes.write().insert(0, route);
    }

    /// All calls received so far
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, path: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.path == path).count()
    }

    /// Highest number of calls that were outstanding at the same time
    pub fn max_concurrent(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn respond(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, DataError> {
        let route = self
            .routes
            .read()
            .iter()
            .find(|r| r.matches(method, path, body.as_ref()))
            .cloned();

        self.calls.lock().push(RecordedCall {
            method,
            path: path.to_string(),
            body,
        });

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = route.as_ref().and_then(|r| r.delay) {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match route.map(|r| r.reply) {
            Some(Reply::Json(value)) => Ok(value),
            Some(Reply::Status(status, body)) => Err(DataError::Fetch {
                path: path.to_string(),
                status: Some(status),
                body,
            }),
            None => {
                debug!(path, "no static route");
                Err(DataError::Fetch {
                    path: path.to_string(),
                    status: Some(404),
                    body: "not found".to_string(),
                })
            }
        }
    }
}

#[async_trait]
impl AnalyticsProvider for StaticProvider {
    async fn post_json(&self, path: &str, body: Value) -> Result<Value, DataError> {
        self.respond(Method::Post, path, Some(body)).await
    }

    async fn get_json(&self, path: &str) -> Result<Value, DataError> {
        self.respond(Method::Get, path, None).await
    }

    fn provider_name(&self) -> &str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_routes_match_on_body_fields() {
        let provider = StaticProvider::new(vec![
            Route::post("/series").when("aggregation", "daily").json(json!("daily")),
            Route::post("/series").json(json!("any")),
            Route::get("/broken").status(500, "boom"),
        ]);

        let daily = provider.post_json("/series", json!({"aggregation": "daily"})).await.unwrap();
        assert_eq!(daily, json!("daily"));
        let monthly = provider.post_json("/series", json!({"aggregation": "monthly"})).await.unwrap();
        assert_eq!(monthly, json!("any"));

        let err = provider.get_json("/broken").await.unwrap_err();
        assert_eq!(
            err,
            DataError::Fetch { path: "/broken".into(), status: Some(500), body: "boom".into() }
        );

        let err = provider.get_json("/missing").await.unwrap_err();
        assert!(matches!(err, DataError::Fetch { status: Some(404), .. }));

        assert_eq!(provider.call_count("/series"), 2);
        assert_eq!(provider.calls().len(), 4);
    }

    #[tokio::test]
    async fn test_added_route_takes_precedence() {
        let provider = StaticProvider::new(vec![Route::get("/x").json(json!(1))]);
        provider.add_route(Route::get("/x").status(503, "down"));

        assert!(provider.get_json("/x").await.is_err());
    }
}

//! REST document store client
//!
//! Talks to a hosted JSON document API:
//!
//! - `GET    {base}/v1/projects/{project}/documents/{path}` → `{"documents": [{id, data}]}`
//! - `GET    {base}/v1/projects/{project}/documents/{path}/{id}` → `{id, data}`
//! - `PUT    {base}/v1/projects/{project}/documents/{path}/{id}?merge=true|false`
//! - `DELETE {base}/v1/projects/{project}/documents/{path}/{id}`
//!
//! Requests carry the signed-in user's bearer token. Subscriptions poll.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::watch;

use crate::remote::document::{CollectionPath, Document, DocumentStore, Snapshot, Subscription};
use crate::remote::error::{RemoteError, RemoteResult};

#[derive(Debug, Clone)]
pub struct RestConfig {
    /// e.g. "https://docs.example.com"
    pub base_url: String,
    pub project_id: String,
    /// How often subscriptions re-read their collection
    pub poll_interval: Duration,
    pub request_timeout: Duration,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8088".to_string(),
            project_id: "ironlog".to_string(),
            poll_interval: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    documents: Vec<Document>,
}

#[derive(Clone)]
pub struct RestDocumentStore {
    client: Client,
    config: RestConfig,
    token: Arc<RwLock<Option<String>>>,
}

impl RestDocumentStore {
    pub fn new(config: RestConfig) -> RemoteResult<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            config,
            token: Arc::new(RwLock::new(None)),
        })
    }

    pub fn config(&self) -> &RestConfig {
        &self.config
    }

    fn url(&self, path: &CollectionPath, id: Option<&str>) -> String {
        let mut url = format!(
            "{}/v1/projects/{}/documents",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(&self.config.project_id)
        );
        for segment in path.segments().chain(id) {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self.token.read().ok().and_then(|t| t.clone());
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> RemoteResult<Response> {
        let response = self.authorized(request).send().await.map_err(|e| {
            if e.is_timeout() {
                RemoteError::Timeout
            } else if e.is_connect() {
                RemoteError::Unavailable
            } else {
                RemoteError::Request(e)
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::PermissionDenied(message),
            StatusCode::NOT_FOUND => RemoteError::NotFound(message),
            _ => RemoteError::Api {
                status: status.as_u16(),
                message,
            },
        })
    }
}

#[async_trait]
impl DocumentStore for RestDocumentStore {
    fn name(&self) -> &str {
        "rest"
    }

    fn set_token(&self, token: Option<String>) {
        if let Ok(mut slot) = self.token.write() {
            *slot = token;
        }
    }

    async fn list(&self, path: &CollectionPath) -> RemoteResult<Snapshot> {
        let request = self.client.get(self.url(path, None));
        match self.send(request).await {
            Ok(response) => Ok(response.json::<ListResponse>().await?.documents),
            // An empty collection may not exist yet
            Err(RemoteError::NotFound(_)) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    async fn get(&self, path: &CollectionPath, id: &str) -> RemoteResult<Option<Document>> {
        let request = self.client.get(self.url(path, Some(id)));
        match self.send(request).await {
            Ok(response) => Ok(Some(response.json::<Document>().await?)),
            Err(RemoteError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn set(
        &self,
        path: &CollectionPath,
        id: &str,
        data: Value,
        merge: bool,
    ) -> RemoteResult<()> {
        let request = self
            .client
            .put(self.url(path, Some(id)))
            .query(&[("merge", merge)])
            .json(&data);
        self.send(request).await?;
        Ok(())
    }

    async fn delete(&self, path: &CollectionPath, id: &str) -> RemoteResult<()> {
        let request = self.client.delete(self.url(path, Some(id)));
        match self.send(request).await {
            Ok(_) | Err(RemoteError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn subscribe(&self, path: &CollectionPath) -> RemoteResult<Subscription> {
        let (tx, rx) = watch::channel(None);
        let store = self.clone();
        let path = path.clone();

        let poller = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(store.config.poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match store.list(&path).await {
                    Ok(snapshot) => {
                        // Only wake subscribers when the collection changed
                        tx.send_if_modified(|current| {
                            if current.as_ref() == Some(&snapshot) {
                                false
                            } else {
                                *current = Some(snapshot);
                                true
                            }
                        });
                    }
                    Err(e) => {
                        tracing::warn!(path = %path, error = %e, "Polling remote collection failed");
                    }
                }
                if tx.is_closed() {
                    break;
                }
            }
        });

        Ok(Subscription::with_feeder(rx, poller))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Path, Query, State},
        http::StatusCode as HttpStatus,
        routing::get,
        Json, Router,
    };
    use serde_json::json;
    use std::collections::{BTreeMap, HashMap};
    use tokio::sync::Mutex;

    type Docs = Arc<Mutex<BTreeMap<String, Value>>>;

    /// Minimal server speaking the document protocol
    async fn spawn_server() -> String {
        async fn read(State(docs): State<Docs>, Path(path): Path<String>) -> Result<Json<Value>, HttpStatus> {
            let docs = docs.lock().await;
            if let Some(data) = docs.get(&path) {
                let id = path.rsplit('/').next().unwrap_or_default();
                return Ok(Json(json!({"id": id, "data": data})));
            }
            let prefix = format!("{}/", path);
            let documents: Vec<Value> = docs
                .iter()
                .filter_map(|(key, data)| {
                    let id = key.strip_prefix(&prefix)?;
                    (!id.contains('/')).then(|| json!({"id": id, "data": data}))
                })
                .collect();
            if documents.is_empty() {
                return Err(HttpStatus::NOT_FOUND);
            }
            Ok(Json(json!({ "documents": documents })))
        }

        async fn write(
            State(docs): State<Docs>,
            Path(path): Path<String>,
            Query(params): Query<HashMap<String, String>>,
            Json(data): Json<Value>,
        ) -> HttpStatus {
            let mut docs = docs.lock().await;
            let merge = params.get("merge").map(String::as_str) == Some("true");
            match docs.get_mut(&path) {
                Some(existing) if merge => crate::remote::document::merge_json(existing, data),
                _ => {
                    docs.insert(path, data);
                }
            }
            HttpStatus::OK
        }

        async fn remove(State(docs): State<Docs>, Path(path): Path<String>) -> HttpStatus {
            match docs.lock().await.remove(&path) {
                Some(_) => HttpStatus::NO_CONTENT,
                None => HttpStatus::NOT_FOUND,
            }
        }

        let docs: Docs = Arc::new(Mutex::new(BTreeMap::new()));
        let app = Router::new()
            .route(
                "/v1/projects/test/documents/*path",
                get(read).put(write).delete(remove),
            )
            .with_state(docs);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn store(base_url: String) -> RestDocumentStore {
        RestDocumentStore::new(RestConfig {
            base_url,
            project_id: "test".to_string(),
            poll_interval: Duration::from_millis(20),
            request_timeout: Duration::from_secs(2),
        })
        .unwrap()
    }

    #[test]
    fn test_url_encoding() {
        let store = store("http://remote/".to_string());
        let url = store.url(&CollectionPath::user("u 1", "workouts"), Some("a/b"));
        assert_eq!(url, "http://remote/v1/projects/test/documents/users/u%201/workouts/a%2Fb");
    }

    #[tokio::test]
    async fn test_round_trip_against_server() {
        let store = store(spawn_server().await);
        let path = CollectionPath::user("u1", "workouts");

        assert!(store.list(&path).await.unwrap().is_empty());
        assert!(store.get(&path, "w1").await.unwrap().is_none());

        store.set(&path, "w1", json!({"name": "Leg Day"}), false).await.unwrap();
        store.set(&path, "w1", json!({"notes": "heavy"}), true).await.unwrap();

        let doc = store.get(&path, "w1").await.unwrap().unwrap();
        assert_eq!(doc.data, json!({"name": "Leg Day", "notes": "heavy"}));
        assert_eq!(store.list(&path).await.unwrap().len(), 1);

        store.delete(&path, "w1").await.unwrap();
        store.delete(&path, "w1").await.unwrap();
        assert!(store.list(&path).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_polling_subscription() {
        let store = store(spawn_server().await);
        let path = CollectionPath::user("u1", "plans");

        let mut sub = store.subscribe(&path).await.unwrap();
        assert!(sub.next().await.unwrap().is_empty());

        store.set(&path, "p1", json!({"name": "Strength"}), true).await.unwrap();
        let snapshot = tokio::time::timeout(Duration::from_secs(2), sub.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snapshot[0].id, "p1");
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let store = store("http://127.0.0.1:1".to_string());
        let err = store
            .list(&CollectionPath::user("u1", "workouts"))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Unavailable | RemoteError::Request(_)));
    }
}

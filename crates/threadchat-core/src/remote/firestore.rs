//! Firestore REST client.
//!
//! Reads page through the `documents` list endpoint; writes use `PATCH`,
//! with an update mask for merge-updates. Firestore's streaming listen API
//! is not used: change feeds poll the collection and emit a confirmed
//! snapshot whenever its contents differ from the previous poll.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use super::firestore_value::{decode_fields, encode_fields};
use super::{Collection, DocumentMap, DocumentStore, RemoteError, Snapshot, Subscription};
use crate::constants::endpoints::FIRESTORE_API_BASE;

const PAGE_SIZE: u32 = 300;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<RestDocument>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RestDocument {
    name: String,
    #[serde(default)]
    fields: Value,
}

impl RestDocument {
    /// Document id is the last segment of the resource name
    fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

#[derive(Clone)]
pub struct FirestoreStore {
    client: reqwest::Client,
    documents_url: String,
    api_key: Option<String>,
    poll_interval: Duration,
}

impl FirestoreStore {
    pub fn new(project_id: &str, api_key: Option<String>, poll_interval: Duration) -> Self {
        Self::with_base_url(FIRESTORE_API_BASE, project_id, api_key, poll_interval)
    }

    pub fn with_base_url(
        base_url: &str,
        project_id: &str,
        api_key: Option<String>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            documents_url: format!(
                "{}/projects/{}/databases/(default)/documents",
                base_url.trim_end_matches('/'),
                project_id
            ),
            api_key,
            poll_interval,
        }
    }

    fn document_url(&self, collection: Collection, id: &str) -> String {
        format!("{}/{}/{}", self.documents_url, collection, id)
    }

    fn key_query(&self) -> Vec<(&'static str, String)> {
        self.api_key
            .iter()
            .map(|key| ("key", key.clone()))
            .collect()
    }

    async fn list(&self, collection: Collection) -> Result<DocumentMap, RemoteError> {
        let url = format!("{}/{}", self.documents_url, collection);
        let mut documents = DocumentMap::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = self.key_query();
            query.push(("pageSize", PAGE_SIZE.to_string()));
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }

            let response = self.client.get(&url).query(&query).send().await?;
            let response = check_status(response).await?;
            let page: ListDocumentsResponse = response
                .json()
                .await
                .map_err(|e| RemoteError::Decode(format!("list {}: {}", collection, e)))?;

            for document in &page.documents {
                documents.insert(document.id().to_string(), decode_fields(&document.fields)?);
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(documents)
    }

    async fn poll_loop(self, collection: Collection, tx: mpsc::UnboundedSender<Snapshot>) {
        let mut last: Option<DocumentMap> = None;
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if tx.is_closed() {
                break;
            }

            let read_at = Instant::now();
            match self.list(collection).await {
                Ok(documents) => {
                    if last.as_ref() == Some(&documents) {
                        continue;
                    }
                    let snapshot = Snapshot::confirmed(documents.clone()).with_read_at(read_at);
                    if tx.send(snapshot).is_err() {
                        break;
                    }
                    last = Some(documents);
                }
                Err(e) => tracing::warn!("polling {} failed: {}", collection, e),
            }
        }

        tracing::debug!("stopped polling {}", collection);
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(RemoteError::Status { status, body })
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn fetch_all(&self, collection: Collection) -> Result<DocumentMap, RemoteError> {
        self.list(collection).await
    }

    async fn subscribe(&self, collection: Collection) -> Result<Subscription, RemoteError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.clone().poll_loop(collection, tx));
        tracing::info!("polling {} every {:?}", collection, self.poll_interval);
        Ok(Subscription::new(rx, Some(task)))
    }

    async fn put(&self, collection: Collection, id: &str, document: Value) -> Result<(), RemoteError> {
        let body = json!({ "fields": encode_fields(&document)? });
        let response = self
            .client
            .patch(self.document_url(collection, id))
            .query(&self.key_query())
            .json(&body)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn patch(&self, collection: Collection, id: &str, fields: Value) -> Result<(), RemoteError> {
        let body = json!({ "fields": encode_fields(&fields)? });

        let mut query = self.key_query();
        query.push(("currentDocument.exists", "true".to_string()));
        if let Some(object) = fields.as_object() {
            for key in object.keys() {
                query.push(("updateMask.fieldPaths", key.clone()));
            }
        }

        let response = self
            .client
            .patch(self.document_url(collection, id))
            .query(&query)
            .json(&body)
            .send()
            .await?;

        match check_status(response).await {
            Err(RemoteError::Status { status: 404, .. }) => Err(RemoteError::NotFound {
                collection,
                id: id.to_string(),
            }),
            other => other.map(|_| ()),
        }
    }
}

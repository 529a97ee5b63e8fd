//! OpenSearch (or Elasticsearch) index client over its REST API.

use {
    crate::domain::{
        error::AuditError,
        event::{IndexDocument, SearchPage, SearchQuery},
        ports::{BoxFuture, SearchIndex},
    },
    reqwest::StatusCode,
    serde::Deserialize,
    serde_json::json,
    std::time::Duration,
};

pub const DEFAULT_INDEX: &str = "auditlog-audit-log-v1.0.0";
pub const DEFAULT_ALIAS: &str = "auditlog";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: SearchHits,
}

#[derive(Debug, Deserialize)]
struct SearchHits {
    #[serde(default)]
    total: Option<TotalHits>,
    hits: Vec<SearchHit>,
}

/// Elasticsearch 6 reports a bare count, OpenSearch and later
/// Elasticsearch an object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TotalHits {
    Count(u64),
    Object { value: u64 },
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "_source")]
    source: IndexDocument,
}

/// Decode a `_search` response body into a page of documents.
pub fn search_page(body: serde_json::Value) -> Result<SearchPage<IndexDocument>, AuditError> {
    let response: SearchResponse = serde_json::from_value(body)?;
    let hits: Vec<IndexDocument> = response.hits.hits.into_iter().map(|h| h.source).collect();
    let total = match response.hits.total {
        Some(TotalHits::Count(n) | TotalHits::Object { value: n }) => n,
        None => hits.len() as u64,
    };
    Ok(SearchPage { total, hits })
}

pub struct OpenSearchIndex {
    client: reqwest::Client,
    base_url: String,
    index: String,
    alias: String,
}

impl OpenSearchIndex {
    pub fn new(
        base_url: &str,
        index: impl Into<String>,
        alias: impl Into<String>,
    ) -> Result<Self, AuditError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            index: index.into(),
            alias: alias.into(),
        })
    }

    fn doc_url(&self, id: &str) -> String {
        format!("{}/{}/_doc/{}", self.base_url, self.index, id)
    }

    /// Create the index with its mappings and alias. An index that already
    /// exists is left alone.
    pub async fn ensure_index(&self) -> Result<(), AuditError> {
        let mut aliases = serde_json::Map::new();
        aliases.insert(self.alias.clone(), json!({}));
        let body = json!({
            "mappings": {
                "properties": {
                    "@timestamp": { "type": "date" },
                    "updated": { "type": "date" },
                    "id": { "type": "keyword" },
                    "action": { "type": "keyword" },
                    "resource_type": { "type": "keyword" },
                    "user_id": { "type": "keyword" },
                    "version": { "type": "integer" },
                    "resource": {
                        "properties": {
                            "type": { "type": "keyword" },
                            "id": { "type": "keyword" }
                        }
                    },
                    "user": {
                        "properties": {
                            "id": { "type": "keyword" },
                            "name": { "type": "keyword" },
                            "email": { "type": "keyword" }
                        }
                    },
                    "metadata": { "type": "object", "dynamic": true }
                }
            },
            "aliases": aliases
        });

        let resp = self
            .client
            .put(format!("{}/{}", self.base_url, self.index))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            tracing::info!(index = %self.index, alias = %self.alias, "search index created");
            return Ok(());
        }

        let text = resp.text().await.unwrap_or_default();
        if status == StatusCode::BAD_REQUEST && text.contains("resource_already_exists_exception") {
            tracing::debug!(index = %self.index, "search index already exists");
            return Ok(());
        }
        Err(AuditError::Index(format!(
            "creating index {} failed with {status}: {text}",
            self.index
        )))
    }

    async fn upsert_inner(&self, doc: IndexDocument) -> Result<(), AuditError> {
        let id = doc
            .id
            .clone()
            .ok_or_else(|| AuditError::Index("document has no id".into()))?;
        let resp = self.client.put(self.doc_url(&id)).json(&doc).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(AuditError::Index(format!(
                "indexing {id} failed with {status}: {text}"
            )));
        }
        Ok(())
    }

    async fn search_inner(
        &self,
        query: SearchQuery,
    ) -> Result<SearchPage<IndexDocument>, AuditError> {
        let mut filters = Vec::new();
        let terms = [
            ("action", &query.action),
            ("resource_type", &query.resource_type),
            ("resource.id", &query.resource_id),
            ("user_id", &query.user_id),
        ];
        for (field, value) in terms {
            if let Some(value) = value {
                filters.push(json!({ "term": { field: value } }));
            }
        }

        let body = json!({
            "query": { "bool": { "filter": filters } },
            "sort": [{ "@timestamp": { "order": "desc" } }],
            "from": query.offset(),
            "size": query.limit(),
            "track_total_hits": true,
        });

        let resp = self
            .client
            .post(format!("{}/{}/_search", self.base_url, self.alias))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(AuditError::Index(format!(
                "search failed with {status}: {text}"
            )));
        }

        search_page(resp.json().await?)
    }
}

impl SearchIndex for OpenSearchIndex {
    fn upsert(&self, doc: IndexDocument) -> BoxFuture<'_, Result<(), AuditError>> {
        Box::pin(async move { self.upsert_inner(doc).await })
    }

    fn search(
        &self,
        query: SearchQuery,
    ) -> BoxFuture<'_, Result<SearchPage<IndexDocument>, AuditError>> {
        Box::pin(async move { self.search_inner(query).await })
    }
}

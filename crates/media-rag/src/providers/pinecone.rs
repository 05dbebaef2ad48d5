//! Pinecone data-plane vector store

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::VectorDbConfig;
use crate::error::{Error, Result};
use crate::retrieval::MetadataFilter;
use crate::types::Metadata;

use super::vector_store::{VectorMatch, VectorRecord, VectorStoreProvider};

const CONTROL_PLANE_URL: &str = "https://api.pinecone.io";
const API_VERSION: &str = "2024-07";

/// Pinecone vector store
///
/// Index hosts are resolved through the control plane on first use unless a
/// host is configured for the default index.
pub struct PineconeStore {
    client: Client,
    control_plane_url: String,
    namespace: Option<String>,
    hosts: DashMap<String, String>,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<UpsertVector<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Serialize)]
struct UpsertVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: serde_json::Map<String, serde_json::Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    score: f32,
    #[serde(default)]
    metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Deserialize)]
struct DescribeIndexResponse {
    host: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeStatsResponse {
    #[serde(default)]
    total_vector_count: usize,
}

impl PineconeStore {
    /// Create from config; fails if no API key is configured
    pub fn from_config(config: &VectorDbConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::Config("Missing Pinecone API key (PINECONE_API_KEY)".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "Api-Key",
            HeaderValue::from_str(api_key)
                .map_err(|_| Error::Config("Invalid Pinecone API key".to_string()))?,
        );
        headers.insert("X-Pinecone-API-Version", HeaderValue::from_static(API_VERSION));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        let hosts = DashMap::new();
        if let Some(host) = &config.host {
            hosts.insert(config.index_name.clone(), normalize_host(host));
        }

        Ok(Self {
            client,
            control_plane_url: CONTROL_PLANE_URL.to_string(),
            namespace: config.namespace.clone(),
            hosts,
        })
    }

    async fn host(&self, index: &str) -> Result<String> {
        if let Some(host) = self.hosts.get(index) {
            return Ok(host.clone());
        }

        let url = format!("{}/indexes/{}", self.control_plane_url, index);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::status(
                format!("Resolving Pinecone index '{}'", index),
                status,
                body,
            ));
        }
        let described: DescribeIndexResponse = response.json().await?;
        let host = normalize_host(&described.host);
        tracing::debug!("Resolved Pinecone index {} to {}", index, host);
        self.hosts.insert(index.to_string(), host.clone());
        Ok(host)
    }

    async fn post<Req: Serialize + Sync>(
        &self,
        index: &str,
        path: &str,
        body: &Req,
    ) -> Result<reqwest::Response> {
        let url = format!("{}/{}", self.host(index).await?, path);
        let response = self.client.post(&url).json(body).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::status(
                format!("Pinecone {} on '{}'", path, index),
                status,
                text,
            ));
        }
        Ok(response)
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

#[async_trait]
impl VectorStoreProvider for PineconeStore {
    async fn upsert(&self, index: &str, records: &[VectorRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let request = UpsertRequest {
            vectors: records
                .iter()
                .map(|r| UpsertVector {
                    id: &r.id,
                    values: &r.values,
                    metadata: r.metadata.to_json_map(),
                })
                .collect(),
            namespace: self.namespace.as_deref(),
        };
        self.post(index, "vectors/upsert", &request).await?;
        Ok(())
    }

    async fn query(
        &self,
        index: &str,
        vector: &[f32],
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<VectorMatch>> {
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            include_values: false,
            filter: filter.to_json(),
            namespace: self.namespace.as_deref(),
        };
        let response: QueryResponse = self.post(index, "query", &request).await?.json().await?;

        Ok(response
            .matches
            .into_iter()
            .map(|m| VectorMatch {
                id: m.id,
                score: m.score,
                metadata: m
                    .metadata
                    .as_ref()
                    .map(Metadata::from_json_map)
                    .unwrap_or_default(),
            })
            .collect())
    }

    async fn len(&self, index: &str) -> Result<usize> {
        let stats: DescribeStatsResponse = self
            .post(index, "describe_index_stats", &serde_json::json!({}))
            .await?
            .json()
            .await?;
        Ok(stats.total_vector_count)
    }

    fn name(&self) -> &str {
        "pinecone"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_host() {
        assert_eq!(
            normalize_host("docs-abc.svc.us-east-1.pinecone.io"),
            "https://docs-abc.svc.us-east-1.pinecone.io"
        );
        assert_eq!(normalize_host("http://localhost:5080/"), "http://localhost:5080");
    }

    #[test]
    fn test_requires_api_key() {
        let config = VectorDbConfig::default();
        assert!(matches!(PineconeStore::from_config(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_query_request_shape() {
        let filter = MetadataFilter::new().eq("file_type", "pdf");
        let request = QueryRequest {
            vector: &[0.1, 0.2],
            top_k: 10,
            include_metadata: true,
            include_values: false,
            filter: filter.to_json(),
            namespace: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["topK"], 10);
        assert_eq!(json["includeMetadata"], true);
        assert_eq!(json["filter"]["file_type"], "pdf");
        assert!(json.get("namespace").is_none());
    }

    #[test]
    fn test_configured_host_skips_lookup() {
        let config = VectorDbConfig {
            api_key: Some("pc-test".to_string()),
            host: Some("docs-abc.svc.pinecone.io".to_string()),
            ..VectorDbConfig::default()
        };
        let store = PineconeStore::from_config(&config).unwrap();
        assert_eq!(
            store.hosts.get(&config.index_name).map(|h| h.clone()),
            Some("https://docs-abc.svc.pinecone.io".to_string())
        );
    }
}

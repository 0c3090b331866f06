//! Supabase (PostgREST) backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use super::{RemoteBackend, RemoteError, RemoteResult};
use crate::config::SupabaseConfig;
use crate::models::{Collection, Record};
use crate::util::{compact_text, format_timestamp};

const CLIENT_INFO: &str = concat!("epi-sync/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
struct Endpoint {
    rest_url: String,
    anon_key: String,
}

/// Remote backend backed by a Supabase project's REST API.
///
/// Built without a [`SupabaseConfig`] it stays unconfigured: the engine keeps
/// working offline and every remote call returns [`RemoteError::NotConfigured`].
#[derive(Clone)]
pub struct SupabaseBackend {
    endpoint: Option<Endpoint>,
    client: Client,
}

impl std::fmt::Debug for SupabaseBackend {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SupabaseBackend")
            .field(
                "rest_url",
                &self.endpoint.as_ref().map(|endpoint| &endpoint.rest_url),
            )
            .finish_non_exhaustive()
    }
}

impl SupabaseBackend {
    pub fn new(config: Option<SupabaseConfig>) -> RemoteResult<Self> {
        let endpoint = config.map(|config| Endpoint {
            rest_url: rest_url(&config.url),
            anon_key: config.anon_key,
        });

        Ok(Self {
            endpoint,
            client: Client::builder().build()?,
        })
    }

    fn endpoint(&self) -> RemoteResult<&Endpoint> {
        self.endpoint.as_ref().ok_or(RemoteError::NotConfigured)
    }

    fn table_request(
        &self,
        method: reqwest::Method,
        collection: Collection,
    ) -> RemoteResult<RequestBuilder> {
        let endpoint = self.endpoint()?;
        Ok(self
            .client
            .request(
                method,
                format!("{}/{}", endpoint.rest_url, collection.remote_table()),
            )
            .header("apikey", &endpoint.anon_key)
            .bearer_auth(&endpoint.anon_key)
            .header("x-client-info", CLIENT_INFO)
            .header("Accept", "application/json"))
    }

    fn select_all_request(&self, collection: Collection) -> RemoteResult<RequestBuilder> {
        Ok(self
            .table_request(reqwest::Method::GET, collection)?
            .query(&[("select", "*"), ("order", "updated_at.desc")]))
    }

    fn select_since_request(
        &self,
        collection: Collection,
        cursor: DateTime<Utc>,
    ) -> RemoteResult<RequestBuilder> {
        let filter = format!("gt.{}", format_timestamp(cursor));
        Ok(self.table_request(reqwest::Method::GET, collection)?.query(&[
            ("select", "*"),
            ("updated_at", filter.as_str()),
            ("order", "updated_at.desc"),
        ]))
    }

    fn select_by_id_request(
        &self,
        collection: Collection,
        id: &str,
    ) -> RemoteResult<RequestBuilder> {
        let filter = format!("eq.{id}");
        Ok(self.table_request(reqwest::Method::GET, collection)?.query(&[
            ("select", "*"),
            ("id", filter.as_str()),
            ("limit", "1"),
        ]))
    }

    fn upsert_request(
        &self,
        collection: Collection,
        record: &Record,
    ) -> RemoteResult<RequestBuilder> {
        Ok(self
            .table_request(reqwest::Method::POST, collection)?
            .query(&[("on_conflict", "id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&[record]))
    }

    fn delete_request(&self, collection: Collection, id: &str) -> RemoteResult<RequestBuilder> {
        let filter = format!("eq.{id}");
        Ok(self
            .table_request(reqwest::Method::DELETE, collection)?
            .query(&[("id", filter.as_str())])
            .header("Prefer", "return=minimal"))
    }

    fn health_request(&self) -> RemoteResult<RequestBuilder> {
        Ok(self
            .table_request(reqwest::Method::GET, Collection::Funcionarios)?
            .query(&[("select", "id"), ("limit", "1")]))
    }

    async fn send(request: RequestBuilder) -> RemoteResult<Response> {
        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Api(parse_api_error(status, &body)));
        }
        Ok(response)
    }

    async fn fetch_rows(request: RequestBuilder) -> RemoteResult<Vec<Record>> {
        let body = Self::send(request).await?.text().await?;
        serde_json::from_str(&body).map_err(|error| RemoteError::Payload(error.to_string()))
    }
}

#[async_trait]
impl RemoteBackend for SupabaseBackend {
    fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    async fn fetch_all(&self, collection: Collection) -> RemoteResult<Vec<Record>> {
        Self::fetch_rows(self.select_all_request(collection)?).await
    }

    async fn fetch_updated_since(
        &self,
        collection: Collection,
        cursor: DateTime<Utc>,
    ) -> RemoteResult<Vec<Record>> {
        Self::fetch_rows(self.select_since_request(collection, cursor)?).await
    }

    async fn fetch_by_id(&self, collection: Collection, id: &str) -> RemoteResult<Option<Record>> {
        let rows = Self::fetch_rows(self.select_by_id_request(collection, id)?).await?;
        Ok(rows.into_iter().next())
    }

    async fn upsert(&self, collection: Collection, record: &Record) -> RemoteResult<()> {
        Self::send(self.upsert_request(collection, record)?).await?;
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> RemoteResult<()> {
        Self::send(self.delete_request(collection, id)?).await?;
        Ok(())
    }

    async fn check_connection(&self) -> RemoteResult<()> {
        Self::send(self.health_request()?).await?;
        Ok(())
    }
}

fn rest_url(project_url: &str) -> String {
    let trimmed = project_url.trim().trim_end_matches('/');
    if trimmed.ends_with("/rest/v1") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/rest/v1")
    }
}

#[derive(Debug, Deserialize)]
struct PostgrestErrorResponse {
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
    error: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<PostgrestErrorResponse>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            let detail = payload
                .details
                .or(payload.hint)
                .map(|detail| format!(": {}", detail.trim()))
                .unwrap_or_default();
            return format!("{}{detail} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{trimmed} ({})", status.as_u16())
    }
}

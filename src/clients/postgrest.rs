//! Thin client for the hosted Postgres REST/RPC gateway.
//!
//! Filters are always passed as PostgREST query parameters and url-encoded;
//! nothing user supplied is ever spliced into SQL text.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::{
    error::{Error, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// A read/update/delete against one table.
#[derive(Debug, Clone)]
pub struct TableQuery {
    table: String,
    params: Vec<(String, String)>,
    orders: Vec<String>,
    count_exact: bool,
}

impl TableQuery {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            params: Vec::new(),
            orders: Vec::new(),
            count_exact: false,
        }
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.params.push(("select".to_string(), columns.to_string()));
        self
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.params
            .push((column.to_string(), format!("eq.{}", value.to_string())));
        self
    }

    pub fn gte(mut self, column: &str, value: impl ToString) -> Self {
        self.params
            .push((column.to_string(), format!("gte.{}", value.to_string())));
        self
    }

    /// `column=in.("a","b")`. Values are quoted so commas inside them are safe.
    pub fn in_list<S: AsRef<str>>(mut self, column: &str, values: &[S]) -> Self {
        let quoted: Vec<String> = values
            .iter()
            .map(|v| format!("\"{}\"", v.as_ref().replace('\\', "\\\\").replace('"', "\\\"")))
            .collect();
        self.params
            .push((column.to_string(), format!("in.({})", quoted.join(","))));
        self
    }

    pub fn ilike(mut self, column: &str, pattern: &str) -> Self {
        self.params
            .push((column.to_string(), format!("ilike.{pattern}")));
        self
    }

    /// Full-text match using `plainto_tsquery`.
    pub fn plfts(mut self, column: &str, text: &str) -> Self {
        self.params
            .push((column.to_string(), format!("plfts.{text}")));
        self
    }

    pub fn order(mut self, column: &str, order: Order) -> Self {
        self.orders.push(format!("{column}.{}", order.as_str()));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.params.push(("limit".to_string(), limit.to_string()));
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.params.push(("offset".to_string(), offset.to_string()));
        self
    }

    pub fn count_exact(mut self) -> Self {
        self.count_exact = true;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn query_string(&self) -> String {
        let mut pairs: Vec<String> = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        if !self.orders.is_empty() {
            pairs.push(format!("order={}", urlencoding::encode(&self.orders.join(","))));
        }
        pairs.join("&")
    }
}

/// Rows per request for full reads. Must not exceed the gateway's max-rows
/// setting (1000 on hosted projects), or a capped page ends the read early.
pub const PAGE_SIZE: usize = 1000;

pub struct PostgrestClient {
    http: Arc<dyn HttpClient>,
    base_url: String,
    api_key: String,
}

impl PostgrestClient {
    pub fn new(http: Arc<dyn HttpClient>, base_url: &str, api_key: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn table_url(&self, query: &TableQuery) -> String {
        let qs = query.query_string();
        if qs.is_empty() {
            format!("{}/rest/v1/{}", self.base_url, query.table())
        } else {
            format!("{}/rest/v1/{}?{}", self.base_url, query.table(), qs)
        }
    }

    fn authorized(&self, request: HttpRequest) -> HttpRequest {
        request
            .header("apikey", &self.api_key)
            .bearer_token(&self.api_key)
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = self.http.execute(self.authorized(request)).await?;
        if !response.is_success() {
            error!(status = response.status, body = %response.text(), "database gateway error");
            return Err(Error::DbError(format!(
                "gateway returned {}: {}",
                response.status,
                response.text()
            )));
        }
        Ok(response)
    }

    pub async fn select<T: DeserializeOwned>(&self, query: &TableQuery) -> Result<Vec<T>> {
        debug!(table = query.table(), "select");
        let response = self.send(HttpRequest::get(self.table_url(query))).await?;
        response.json()
    }

    /// Every row matching `query`, fetched `PAGE_SIZE` rows at a time until a
    /// short page. `query` must carry an order that is total, or rows can
    /// shift between pages.
    pub async fn select_all<T: DeserializeOwned>(&self, query: &TableQuery) -> Result<Vec<T>> {
        let mut rows = Vec::new();
        loop {
            let page_query = query.clone().limit(PAGE_SIZE).offset(rows.len());
            let page: Vec<T> = self.select(&page_query).await?;
            let short = page.len() < PAGE_SIZE;
            rows.extend(page);
            if short {
                return Ok(rows);
            }
        }
    }

    /// Like [`select`](Self::select) but also returns the exact row count from `Content-Range`.
    pub async fn select_with_count<T: DeserializeOwned>(
        &self,
        query: &TableQuery,
    ) -> Result<(Vec<T>, u64)> {
        debug!(table = query.table(), "select with count");
        let mut request = HttpRequest::get(self.table_url(query));
        if query.count_exact {
            request = request.header("prefer", "count=exact");
        }
        let response = self.send(request).await?;
        let total = response
            .header("content-range")
            .and_then(parse_content_range_total)
            .unwrap_or(0);
        Ok((response.json()?, total))
    }

    /// Count only, via `limit=0`.
    pub async fn count(&self, query: &TableQuery) -> Result<u64> {
        let query = query.clone().select("id").limit(0).count_exact();
        let (_rows, total) = self.select_with_count::<Value>(&query).await?;
        Ok(total)
    }

    pub async fn insert<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        body: &B,
    ) -> Result<Vec<T>> {
        debug!(table, "insert");
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        let request = HttpRequest::post(url)
            .json(body)?
            .header("prefer", "return=representation");
        self.send(request).await?.json()
    }

    /// Upsert that keeps existing rows on conflict.
    pub async fn insert_ignore_duplicates<B: Serialize + ?Sized>(
        &self,
        table: &str,
        on_conflict: &str,
        body: &B,
    ) -> Result<()> {
        debug!(table, on_conflict, "insert ignore duplicates");
        let url = format!(
            "{}/rest/v1/{}?on_conflict={}",
            self.base_url,
            table,
            urlencoding::encode(on_conflict)
        );
        let request = HttpRequest::post(url)
            .json(body)?
            .header("prefer", "resolution=ignore-duplicates,return=minimal");
        self.send(request).await?;
        Ok(())
    }

    pub async fn update<B: Serialize + ?Sized>(&self, query: &TableQuery, body: &B) -> Result<()> {
        debug!(table = query.table(), "update");
        let request = HttpRequest::new(HttpMethod::Patch, self.table_url(query))
            .json(body)?
            .header("prefer", "return=minimal");
        self.send(request).await?;
        Ok(())
    }

    pub async fn delete(&self, query: &TableQuery) -> Result<()> {
        debug!(table = query.table(), "delete");
        let request = HttpRequest::new(HttpMethod::Delete, self.table_url(query));
        self.send(request).await?;
        Ok(())
    }

    pub async fn rpc<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        function: &str,
        args: &B,
    ) -> Result<T> {
        let response = self.rpc_raw(function, args).await?;
        if !response.is_success() {
            error!(function, status = response.status, "rpc failed");
            return Err(Error::DbError(format!(
                "rpc {function} returned {}: {}",
                response.status,
                response.text()
            )));
        }
        if response.body.is_empty() {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        response.json()
    }

    /// Returns the raw response so callers can treat some statuses as domain failures.
    pub async fn rpc_raw<B: Serialize + ?Sized>(
        &self,
        function: &str,
        args: &B,
    ) -> Result<HttpResponse> {
        debug!(function, "rpc");
        let url = format!("{}/rest/v1/rpc/{}", self.base_url, function);
        let request = HttpRequest::post(url)
            .json(args)?
            .header("prefer", "return=representation");
        self.http.execute(self.authorized(request)).await
    }
}

/// `0-9/120` → 120, `*/0` → 0.
fn parse_content_range_total(value: &str) -> Option<u64> {
    value.rsplit('/').next()?.trim().parse().ok()
}

use async_trait::async_trait;

use crate::backends::SearchProvider;
use crate::error::{Result, ScribeError};
use crate::types::{SearchOrder, SourceDescriptor};

const SEARCH_API: &str = "https://api.bilibili.com/x/web-interface/search/type";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) mediascribe/0.1";

/// Keyword search against the Bilibili web API, expanding a query into
/// remote-URL descriptors before orchestration begins.
pub struct BilibiliSearch {
    client: reqwest::Client,
}

impl BilibiliSearch {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_default(),
        }
    }

    fn order_key(order: SearchOrder) -> &'static str {
        match order {
            SearchOrder::Relevance => "totalrank",
            SearchOrder::Newest => "pubdate",
            SearchOrder::MostPlayed => "click",
        }
    }
}

impl Default for BilibiliSearch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchProvider for BilibiliSearch {
    async fn search(
        &self,
        query: &str,
        count: usize,
        order: SearchOrder,
    ) -> Result<Vec<SourceDescriptor>> {
        let search_error = |reason: String| ScribeError::Search {
            query: query.to_string(),
            reason,
        };

        let response = self
            .client
            .get(SEARCH_API)
            .query(&[
                ("search_type", "video"),
                ("keyword", query),
                ("order", Self::order_key(order)),
                ("page", "1"),
            ])
            .send()
            .await
            .map_err(|e| search_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(search_error(format!("search API returned {status}")));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| search_error(format!("unreadable response: {e}")))?;
        let results = body["data"]["result"].as_array().cloned().unwrap_or_default();

        let mut descriptors = Vec::new();
        for entry in &results {
            if descriptors.len() >= count {
                break;
            }
            let Some(bvid) = entry["bvid"].as_str().filter(|s| !s.is_empty()) else {
                tracing::debug!(query, "skipping search result without bvid");
                continue;
            };
            descriptors.push(SourceDescriptor::remote(format!(
                "https://www.bilibili.com/video/{bvid}"
            )));
        }

        tracing::info!(query, found = descriptors.len(), "search expansion finished");
        Ok(descriptors)
    }
}

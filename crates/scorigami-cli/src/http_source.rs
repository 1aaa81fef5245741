//! Frame source backed by a running `scorigami-web`.

use async_trait::async_trait;
use futures::StreamExt;
use scorigami_core::error::ScorigamiError;
use scorigami_core::filter::FilterKey;
use scorigami_runtime::loader::{FrameBody, FrameSource};
use std::time::Duration;
use tracing::debug;

const STREAM_PATH: &str = "/api/v1/graph-stream";

/// Opens `/api/v1/graph-stream` and hands the response body to the decoder
/// chunk by chunk.
pub struct HttpFrameSource {
    client: reqwest::Client,
    base: String,
}

impl HttpFrameSource {
    pub fn new(base: &str, timeout: Duration) -> Result<Self, ScorigamiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScorigamiError::Io(e.to_string()))?;
        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    pub fn url_for(&self, key: &FilterKey) -> String {
        format!("{}{}?{}", self.base, STREAM_PATH, key.to_query_string())
    }
}

#[async_trait]
impl FrameSource for HttpFrameSource {
    fn name(&self) -> &str {
        &self.base
    }

    async fn open(&self, key: &FilterKey) -> Result<FrameBody, ScorigamiError> {
        let url = self.url_for(key);
        debug!(%url, "opening stream");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ScorigamiError::Io(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| v["error"].as_str().map(str::to_string))
                .unwrap_or_else(|| status.to_string());
            return Err(ScorigamiError::Io(format!("{}: {}", status, message)));
        }

        let chunks = resp.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| ScorigamiError::Io(e.to_string()))
        });
        Ok(FrameBody::Chunks(Box::pin(chunks)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scorigami_core::filter::{Sets, Sex};

    #[test]
    fn url_carries_canonical_query() {
        let source = HttpFrameSource::new("http://localhost:3000/", Duration::from_secs(5)).unwrap();
        let key = FilterKey::new(Sets::Three, Sex::Women, Some(2018), None).unwrap();
        assert_eq!(
            source.url_for(&key),
            format!("http://localhost:3000/api/v1/graph-stream?{}", key.to_query_string())
        );
    }
}

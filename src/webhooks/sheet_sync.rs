use crate::errors::ServiceError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Body posted to the spreadsheet sync endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncPayload {
    pub table: String,
    pub data: Vec<serde_json::Value>,
}

/// Pushes newly inserted rows to an external spreadsheet mirror.
///
/// Exactly one attempt is made per call; callers decide whether a failure
/// matters (the event loop only logs it).
#[derive(Clone, Debug)]
pub struct SheetSyncClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl SheetSyncClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ServiceError::InternalError(format!("failed to build sync client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[instrument(skip(self, rows), fields(endpoint = %self.endpoint, rows = rows.len()))]
    pub async fn push_rows(
        &self,
        table: &str,
        rows: Vec<serde_json::Value>,
    ) -> Result<(), ServiceError> {
        let payload = SyncPayload {
            table: table.to_string(),
            data: rows,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("sync request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            info!(table, "synced rows to spreadsheet");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            warn!(table, %status, "spreadsheet sync rejected the payload");
            Err(ServiceError::ExternalServiceError(format!(
                "sync endpoint returned {}: {}",
                status, body
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn posts_rows_with_bearer_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sync"))
            .and(header("authorization", "Bearer sheet-key"))
            .and(body_json(json!({
                "table": "flats",
                "data": [{ "flat_id": "sunshine-towers-101" }]
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = SheetSyncClient::new(format!("{}/sync", server.uri()), "sheet-key").unwrap();
        client
            .push_rows("flats", vec![json!({ "flat_id": "sunshine-towers-101" })])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let client = SheetSyncClient::new(server.uri(), "k").unwrap();
        let result = client.push_rows("flats", vec![json!({})]).await;
        assert!(matches!(result, Err(ServiceError::ExternalServiceError(_))));
    }
}

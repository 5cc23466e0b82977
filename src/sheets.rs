//! Google Sheets reporting
//!
//! Appends merged-PR rows to the team's tracking spreadsheet.

use crate::error::{Error, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const DEFAULT_API_URL: &str = "https://sheets.googleapis.com";

/// One spreadsheet row
pub type Row = Vec<String>;

/// Client for the Sheets values API
pub struct SheetsClient {
    client: Client,
    api_url: String,
    token: String,
}

impl SheetsClient {
    /// Create a client against the default endpoint
    pub fn new(token: &str) -> Result<Self> {
        Self::with_url(DEFAULT_API_URL, token)
    }

    /// Create a client against an explicit endpoint (tests use this)
    pub fn with_url(api_url: &str, token: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent("pr-pilot")
            .build()
            .map_err(|e| Error::Sheets(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Append rows after the last row of `range`; returns how many rows
    /// the API reports appended
    pub async fn append_rows(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: &[Row],
    ) -> Result<u32> {
        debug!(spreadsheet_id, range, count = rows.len(), "appending rows");

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct AppendResponse {
            updates: Updates,
        }

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Updates {
            updated_rows: u32,
        }

        let url = format!(
            "{}/v4/spreadsheets/{spreadsheet_id}/values/{range}:append",
            self.api_url
        );
        let response = self
            .client
            .post(&url)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&serde_json::json!({ "values": rows }))
            .send()
            .await
            .map_err(|e| Error::Sheets(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Sheets(format!("returned {status}: {detail}")));
        }

        let parsed: AppendResponse = response
            .json()
            .await
            .map_err(|e| Error::Sheets(format!("failed to parse response: {e}")))?;
        Ok(parsed.updates.updated_rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn appends_rows() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v4/spreadsheets/sheet1/values/Merged!A:D:append")
            .match_query(mockito::Matcher::UrlEncoded(
                "valueInputOption".into(),
                "USER_ENTERED".into(),
            ))
            .match_header("authorization", "Bearer g-token")
            .with_status(200)
            .with_body(r#"{ "updates": { "updatedRows": 2 } }"#)
            .create_async()
            .await;

        let client = SheetsClient::with_url(&server.url(), "g-token").unwrap();
        let rows = vec![
            vec!["2026-08-20".to_string(), "widgets#42".to_string()],
            vec!["2026-08-21".to_string(), "gadgets#7".to_string()],
        ];
        let appended = client.append_rows("sheet1", "Merged!A:D", &rows).await.unwrap();
        mock.assert_async().await;
        assert_eq!(appended, 2);
    }

    #[tokio::test]
    async fn surfaces_api_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v4/spreadsheets/s/values/r:append")
            .match_query(mockito::Matcher::Any)
            .with_status(403)
            .with_body("forbidden")
            .create_async()
            .await;

        let client = SheetsClient::with_url(&server.url(), "g-token").unwrap();
        let err = client.append_rows("s", "r", &[]).await.unwrap_err();
        assert!(err.to_string().contains("403"));
    }
}

use std::sync::Arc;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::error::{AppError, AppResult};
use crate::google::auth::ServiceAccountAuth;

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets/";

/// Thin client over the Sheets v4 `values` API, bound to one spreadsheet.
pub struct SheetsClient {
    client: reqwest::Client,
    auth: Arc<ServiceAccountAuth>,
    spreadsheet_id: String,
    first_sheet: OnceCell<String>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetInfo {
    #[serde(default)]
    sheets: Vec<SheetInfo>,
}

#[derive(Debug, Deserialize)]
struct SheetInfo {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRangeResponse {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Serialize)]
struct ValueRangeBody<'a> {
    range: &'a str,
    #[serde(rename = "majorDimension")]
    major_dimension: &'static str,
    values: &'a [Vec<String>],
}

impl SheetsClient {
    pub fn new(
        client: reqwest::Client,
        auth: Arc<ServiceAccountAuth>,
        spreadsheet_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            auth,
            spreadsheet_id: spreadsheet_id.into(),
            first_sheet: OnceCell::new(),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> AppResult<Url> {
        spreadsheet_url(&self.spreadsheet_id, segments)
    }

    async fn read_body(response: reqwest::Response, action: &str) -> AppResult<String> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Sheets(format!("Failed to read {} response: {}", action, e)))?;

        if !status.is_success() {
            return Err(AppError::Sheets(format!(
                "Sheets API error while trying to {} ({}): {}",
                action, status, body
            )));
        }
        Ok(body)
    }

    /// Title of the first worksheet; resolved once and reused.
    pub async fn first_sheet_title(&self) -> AppResult<String> {
        self.first_sheet
            .get_or_try_init(|| async {
                let url = self.endpoint(&[])?;
                let token = self.auth.access_token().await?;
                let response = self
                    .client
                    .get(url)
                    .query(&[("fields", "sheets.properties.title")])
                    .bearer_auth(token)
                    .send()
                    .await
                    .map_err(|e| AppError::Sheets(format!("Failed to load spreadsheet: {}", e)))?;

                let body = Self::read_body(response, "load the spreadsheet").await?;
                let info: SpreadsheetInfo = serde_json::from_str(&body).map_err(|e| {
                    AppError::Sheets(format!("Failed to parse spreadsheet info: {}", e))
                })?;

                info.sheets
                    .into_iter()
                    .next()
                    .map(|s| s.properties.title)
                    .ok_or_else(|| AppError::Sheets("Spreadsheet has no sheets".to_string()))
            })
            .await
            .cloned()
    }

    /// Read a range; every cell is returned as its formatted string.
    pub async fn get_values(&self, range: &str) -> AppResult<Vec<Vec<String>>> {
        let url = self.endpoint(&["values", range])?;
        let token = self.auth.access_token().await?;
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AppError::Sheets(format!("Failed to read values: {}", e)))?;

        let body = Self::read_body(response, "read values").await?;
        let parsed: ValueRangeResponse = serde_json::from_str(&body)
            .map_err(|e| AppError::Sheets(format!("Failed to parse values response: {}", e)))?;

        Ok(parsed
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    /// Overwrite a range with raw (unparsed) values.
    pub async fn update_values(&self, range: &str, values: &[Vec<String>]) -> AppResult<()> {
        let url = self.endpoint(&["values", range])?;
        let token = self.auth.access_token().await?;
        let response = self
            .client
            .put(url)
            .query(&[("valueInputOption", "RAW")])
            .bearer_auth(token)
            .json(&ValueRangeBody {
                range,
                major_dimension: "ROWS",
                values,
            })
            .send()
            .await
            .map_err(|e| AppError::Sheets(format!("Failed to update values: {}", e)))?;

        Self::read_body(response, "update values").await.map(|_| ())
    }

    /// Append rows after the last row of the table found in `range`.
    pub async fn append_values(&self, range: &str, values: &[Vec<String>]) -> AppResult<()> {
        let url = self.endpoint(&["values", &format!("{}:append", range)])?;
        let token = self.auth.access_token().await?;
        let response = self
            .client
            .post(url)
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .bearer_auth(token)
            .json(&ValueRangeBody {
                range,
                major_dimension: "ROWS",
                values,
            })
            .send()
            .await
            .map_err(|e| AppError::Sheets(format!("Failed to append values: {}", e)))?;

        Self::read_body(response, "append values").await.map(|_| ())
    }
}

fn cell_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Quote a sheet title for use in A1 notation (`'My Sheet'!A1`).
pub fn quote_sheet_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// `{spreadsheet}/{segments..}` under the Sheets API base, each segment percent-encoded.
fn spreadsheet_url(spreadsheet_id: &str, segments: &[&str]) -> AppResult<Url> {
    let mut url = Url::parse(SHEETS_API_BASE)
        .map_err(|e| AppError::Sheets(format!("Invalid Sheets API base url: {}", e)))?;
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| AppError::Sheets("Sheets API URL cannot be a base".to_string()))?;
        path.pop_if_empty();
        path.push(spreadsheet_id);
        for segment in segments {
            path.push(segment);
        }
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spreadsheet_url_encodes_ranges() {
        let url = spreadsheet_url("sheet123", &["values", "'Sheet 1'!A2:ZZ"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/sheet123/values/'Sheet%201'!A2:ZZ"
        );
    }

    #[test]
    fn quotes_sheet_titles() {
        assert_eq!(quote_sheet_title("Sheet1"), "'Sheet1'");
        assert_eq!(quote_sheet_title("Bob's sheet"), "'Bob''s sheet'");
    }

    #[test]
    fn cells_are_stringified() {
        assert_eq!(cell_to_string(Value::String("abc".into())), "abc");
        assert_eq!(cell_to_string(Value::Null), "");
        assert_eq!(cell_to_string(serde_json::json!(42)), "42");
        assert_eq!(cell_to_string(serde_json::json!(true)), "true");
    }
}

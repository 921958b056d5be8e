//! [`SheetStore`] over the sheet backend's REST API.

use crate::config::Config;
use crate::sheet::SheetData;
use crate::store::{SheetStore, StoreError, StoreResult};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};

pub struct HttpStore {
    client: Client,
    config: Config,
}

#[derive(Deserialize)]
struct SheetList {
    #[serde(default)]
    sheets: Vec<String>,
}

#[derive(Deserialize)]
struct SheetBody {
    #[serde(default)]
    headers: Vec<Value>,
    #[serde(default)]
    rows: Vec<Vec<Value>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArchiveBody {
    #[serde(default)]
    moved_count: usize,
}

#[derive(Deserialize)]
struct SyncBody {
    #[serde(default)]
    added: usize,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Cells arrive as arbitrary JSON scalars.
fn cell_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn transport(e: reqwest::Error) -> StoreError {
    if e.is_decode() {
        StoreError::Decode(e.to_string())
    } else {
        StoreError::Transport(e.to_string())
    }
}

impl HttpStore {
    pub fn new(config: Config) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(transport)?;
        Ok(HttpStore { client, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn url(&self, segments: &[&str]) -> StoreResult<Url> {
        let mut url = Url::parse(&self.config.endpoint(""))
            .map_err(|e| StoreError::Transport(format!("bad base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::Transport(format!("bad base URL: {}", self.config.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send and map non-success statuses. A 404 on a sheet path means the
    /// sheet does not exist.
    fn send(&self, request: RequestBuilder, sheet: Option<&str>) -> StoreResult<Response> {
        let response = request.send().map_err(transport)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            if let Some(name) = sheet {
                return Err(StoreError::SheetNotFound(name.to_string()));
            }
        }
        let body = response.text().unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.error)
            .unwrap_or(body);
        log::warn!("Store rejected request ({}): {}", status, message);
        Err(StoreError::rejected(status.as_u16(), message))
    }
}

impl SheetStore for HttpStore {
    fn list_sheets(&self) -> StoreResult<Vec<String>> {
        let url = self.url(&["sheets"])?;
        let body: SheetList = self.send(self.client.get(url), None)?.json().map_err(transport)?;
        Ok(body.sheets)
    }

    fn fetch_sheet(&self, name: &str) -> StoreResult<SheetData> {
        let url = self.url(&["sheets", name])?;
        log::debug!("GET {}", url);
        let body: SheetBody = self
            .send(self.client.get(url), Some(name))?
            .json()
            .map_err(transport)?;
        Ok(SheetData::new(
            body.headers.into_iter().map(cell_text).collect(),
            body.rows
                .into_iter()
                .map(|row| row.into_iter().map(cell_text).collect())
                .collect(),
        ))
    }

    fn update_cell(&mut self, sheet: &str, row: usize, col: usize, value: &str) -> StoreResult<()> {
        let url = self.url(&["sheets", sheet, "cell"])?;
        let body = json!({ "row": row, "col": col, "value": value });
        self.send(self.client.put(url).json(&body), Some(sheet))?;
        Ok(())
    }

    fn append_row(&mut self, sheet: &str, values: &[String]) -> StoreResult<()> {
        let url = self.url(&["sheets", sheet, "row"])?;
        self.send(self.client.post(url).json(&json!({ "values": values })), None)?;
        Ok(())
    }

    fn insert_row_after(&mut self, sheet: &str, after_row: i64, values: &[String]) -> StoreResult<()> {
        let url = self.url(&["sheets", sheet, "row", "insert"])?;
        let body = json!({ "afterRow": after_row, "values": values });
        self.send(self.client.post(url).json(&body), Some(sheet))?;
        Ok(())
    }

    fn delete_row(&mut self, sheet: &str, row: usize) -> StoreResult<()> {
        let index = row.to_string();
        let url = self.url(&["sheets", sheet, "row", &index])?;
        self.send(self.client.delete(url), Some(sheet))?;
        Ok(())
    }

    fn archive_play(&mut self, play: &str) -> StoreResult<usize> {
        let url = self.url(&["archive-play"])?;
        let body: ArchiveBody = self
            .send(self.client.post(url).json(&json!({ "playName": play })), None)?
            .json()
            .map_err(transport)?;
        Ok(body.moved_count)
    }

    fn sync_extras(&mut self) -> StoreResult<usize> {
        let url = self.url(&["sync-figuran"])?;
        let body: SyncBody = self.send(self.client.post(url), None)?.json().map_err(transport)?;
        Ok(body.added)
    }

    fn clear_notifications(&mut self) -> StoreResult<()> {
        let url = self.url(&["notifications"])?;
        self.send(self.client.delete(url), None)?;
        Ok(())
    }

    fn delete_oldest_notifications(&mut self) -> StoreResult<()> {
        let url = self.url(&["notifications", "oldest"])?;
        self.send(self.client.delete(url), None)?;
        Ok(())
    }
}

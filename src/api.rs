use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core::queue::QueueSnapshot;
use crate::core::telemetry::TelemetrySnapshot;
use crate::core::tree::MediaEntry;

/// One finished encode as `/history` reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub filename: String,
    pub preset: String,
    #[serde(default)]
    pub input_size: u64,
    #[serde(default)]
    pub output_size: u64,
    #[serde(default)]
    pub reduction: String,
    #[serde(default)]
    pub average_fps: f64,
    #[serde(default)]
    pub start_time: String,
}

impl HistoryRecord {
    /// The server writes `start_time` as an ISO 8601 local timestamp;
    /// records that fail to parse sort before any dated one.
    pub fn started_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.start_time, "%Y-%m-%dT%H:%M:%S%.f").ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NetworkStats {
    #[serde(default)]
    pub sent: String,
    #[serde(default)]
    pub recv: String,
}

/// Host resource sample from `/system-stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SystemStats {
    #[serde(default)]
    pub cpu: f64,
    #[serde(default)]
    pub ram: f64,
    #[serde(default)]
    pub disk: f64,
    #[serde(default)]
    pub network: Option<NetworkStats>,
    #[serde(default)]
    pub process_cpu: f64,
    #[serde(default)]
    pub process_ram: String,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    Up,
    Down,
}

impl MoveDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// The server's `/queue/add` reply, reduced to the created job id; the
/// full job record arrives with the next queue poll.
#[derive(Debug, Clone, Deserialize)]
pub struct AddedJob {
    pub id: i64,
}

/// HTTP boundary to the dashboard server. Control requests are
/// fire-and-forget: their effect is only ever confirmed by the next poll.
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Non-2xx responses surface the server's `{error}` message verbatim
    /// when there is one.
    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, String> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        match resp.json::<ErrorBody>().await {
            Ok(body) => Err(body.error),
            Err(_) => Err(format!("API error: {status}")),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, String> {
        let resp = self
            .client
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .map_err(|e| format!("Request failed: {e}"))?;
        Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| format!("Parse error: {e}"))
    }

    async fn post_json(&self, path: &str, body: serde_json::Value) -> Result<reqwest::Response, String> {
        let resp = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("Request failed: {e}"))?;
        Self::check(resp).await
    }

    async fn post_empty(&self, path: &str) -> Result<(), String> {
        let resp = self
            .client
            .post(format!("{}{path}", self.base_url))
            .send()
            .await
            .map_err(|e| format!("Request failed: {e}"))?;
        Self::check(resp).await.map(|_| ())
    }

    // ── Listings ──

    pub async fn list_files(&self) -> Result<Vec<MediaEntry>, String> {
        self.get_json("/files").await
    }

    pub async fn list_presets(&self) -> Result<Vec<String>, String> {
        self.get_json("/presets").await
    }

    pub async fn list_history(&self) -> Result<Vec<HistoryRecord>, String> {
        self.get_json("/history").await
    }

    // ── Polled state ──

    pub async fn queue_snapshot(&self) -> Result<QueueSnapshot, String> {
        self.get_json("/queue").await
    }

    pub async fn telemetry(&self) -> Result<TelemetrySnapshot, String> {
        self.get_json("/encoding-details").await
    }

    pub async fn system_stats(&self) -> Result<SystemStats, String> {
        self.get_json("/system-stats").await
    }

    // ── Queue mutation ──

    pub async fn queue_add(
        &self,
        file: &str,
        path: Option<&str>,
        preset: &str,
        format: &str,
    ) -> Result<AddedJob, String> {
        let mut body = json!({ "file": file, "preset": preset, "format": format });
        if let Some(path) = path {
            body["path"] = json!(path);
        }
        self.post_json("/queue/add", body)
            .await?
            .json()
            .await
            .map_err(|e| format!("Parse error: {e}"))
    }

    pub async fn queue_move(&self, id: i64, direction: MoveDirection) -> Result<(), String> {
        self.post_json("/queue/move", json!({ "id": id, "direction": direction.as_str() }))
            .await
            .map(|_| ())
    }

    pub async fn queue_remove(&self, id: i64) -> Result<(), String> {
        self.post_json("/queue/remove", json!({ "id": id })).await.map(|_| ())
    }

    pub async fn queue_clear(&self) -> Result<(), String> {
        self.post_empty("/queue/clear").await
    }

    // ── Encoder control ──

    pub async fn start(&self) -> Result<(), String> {
        self.post_empty("/start").await
    }

    pub async fn pause(&self) -> Result<(), String> {
        self.post_empty("/pause").await
    }

    pub async fn resume(&self) -> Result<(), String> {
        self.post_empty("/resume").await
    }

    pub async fn cancel(&self) -> Result<(), String> {
        self.post_empty("/cancel").await
    }

    // ── Presets ──

    pub async fn upload_preset(&self, filename: &str, bytes: Vec<u8>) -> Result<String, String> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("application/json")
            .map_err(|e| format!("Bad preset payload: {e}"))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = self
            .client
            .post(format!("{}/upload-preset", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| format!("Request failed: {e}"))?;

        #[derive(Deserialize)]
        struct Saved {
            filename: String,
        }
        let saved: Saved = Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| format!("Parse error: {e}"))?;
        Ok(saved.filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let api = ApiClient::new("http://127.0.0.1:5000/");
        assert_eq!(api.base_url, "http://127.0.0.1:5000");
    }

    #[test]
    fn test_queue_snapshot_decodes_server_shape() {
        let raw = r#"{
            "queue": [{
                "id": 17, "filename": "a.mkv", "preset": "Fast 720p",
                "format": "mp4", "status": "queued", "progress": 0,
                "input_size": 812, "output_size": 0,
                "current_output_size": 0, "paused": false
            }],
            "current": null,
            "status": "Idle",
            "progress": 0,
            "paused": false,
            "stopped": false
        }"#;
        let snap: QueueSnapshot = serde_json::from_str(raw).unwrap();
        assert!(snap.current.is_none());
        assert_eq!(snap.queue.len(), 1);
        assert_eq!(snap.queue[0].input_size, 812);
    }

    #[test]
    fn test_add_reply_decodes_down_to_the_job_id() {
        let added: AddedJob =
            serde_json::from_str(r#"{"id": 9, "filename": "a.mkv", "input_size": 812}"#).unwrap();
        assert_eq!(added.id, 9);
    }

    #[test]
    fn test_history_start_time_parses_iso() {
        let record = HistoryRecord {
            filename: "a.mkv".to_string(),
            preset: "Fast 720p".to_string(),
            input_size: 0,
            output_size: 0,
            reduction: "-".to_string(),
            average_fps: 0.0,
            start_time: "2026-08-30T10:15:00.123456".to_string(),
        };
        assert!(record.started_at().is_some());

        let undated = HistoryRecord {
            start_time: String::new(),
            ..record.clone()
        };
        assert!(undated.started_at().is_none());
        // Undated records order before any dated one.
        assert!(undated.started_at() < record.started_at());
    }

    #[test]
    fn test_media_listing_decodes_server_shape() {
        let raw = r#"[{
            "name": "shows", "type": "directory", "path": "shows",
            "level": 0, "size": 0, "size_display": "-",
            "modified": 1700000000.5, "extension": "folder", "expanded": false,
            "children": [{
                "name": "a.mkv", "type": "file", "path": "shows/a.mkv",
                "level": 1, "children": [], "size": 700,
                "size_display": "700 MB", "modified": 1700000100.0,
                "extension": "mkv", "expanded": false
            }]
        }]"#;
        let tree: Vec<MediaEntry> = serde_json::from_str(raw).unwrap();
        assert_eq!(tree[0].children[0].path, "shows/a.mkv");
        assert_eq!(tree[0].extension, "folder");
    }
}

use log::{debug, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::api::{BackendError, BackendResult, ReviewBackend};
use crate::review::model::{HistoryPage, OverdueEntry, ResponseCode, ReviewSession};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Method {
    Get,
    Patch,
    Post,
}

#[derive(Serialize)]
struct CompleteBody {
    response: ResponseCode,
}

pub struct HttpBackend {
    base_url: String,
    token: Option<String>,
    #[cfg(feature = "network")]
    client: reqwest::blocking::Client,
}

impl HttpBackend {
    pub fn new(base_url: &str, token: Option<String>) -> BackendResult<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
            #[cfg(feature = "network")]
            client: reqwest::blocking::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .map_err(|e| BackendError::Network(e.to_string()))?,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    #[cfg(feature = "network")]
    fn execute(&self, method: Method, path: &str, body: Option<String>) -> BackendResult<String> {
        use reqwest::header::CONTENT_TYPE;

        let url = self.url(path);
        debug!("{method:?} {url}");
        let mut request = match method {
            Method::Get => self.client.get(&url),
            Method::Patch => self.client.patch(&url),
            Method::Post => self.client.post(&url),
        };
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = request
            .send()
            .map_err(|e| BackendError::Network(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .map_err(|e| BackendError::Network(e.to_string()))?;
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(BackendError::Unauthorized);
        }
        if !status.is_success() {
            warn!("{method:?} {url} -> {status}");
            return Err(BackendError::Http {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }

    #[cfg(not(feature = "network"))]
    fn execute(&self, method: Method, path: &str, _body: Option<String>) -> BackendResult<String> {
        warn!("{method:?} {} skipped: built without network", self.url(path));
        Err(BackendError::Unavailable)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> BackendResult<T> {
        let text = self.execute(Method::Get, path, None)?;
        parse(&text)
    }
}

fn parse<T: DeserializeOwned>(text: &str) -> BackendResult<T> {
    serde_json::from_str(text).map_err(|e| BackendError::Parse(e.to_string()))
}

fn history_path(page: u32, size: u32) -> String {
    format!("/api/reviews/history?page={page}&size={size}")
}

fn complete_path(review_id: i64, item_id: i64) -> String {
    format!("/api/reviews/{review_id}/items/{item_id}/complete")
}

fn postpone_path(item_id: i64) -> String {
    format!("/api/reviews/items/{item_id}/postpone")
}

impl ReviewBackend for HttpBackend {
    fn today_queue(&self) -> BackendResult<Vec<ReviewSession>> {
        self.get_json("/api/reviews/today")
    }

    fn overdue_queue(&self) -> BackendResult<Vec<OverdueEntry>> {
        self.get_json("/api/reviews/overdue")
    }

    fn history(&self, page: u32, size: u32) -> BackendResult<HistoryPage> {
        self.get_json(&history_path(page, size))
    }

    fn complete_item(&self, review_id: i64, item_id: i64, code: ResponseCode) -> BackendResult<()> {
        let body = serde_json::to_string(&CompleteBody { response: code })
            .map_err(|e| BackendError::Parse(e.to_string()))?;
        self.execute(Method::Patch, &complete_path(review_id, item_id), Some(body))
            .map(|_| ())
    }

    fn postpone_item(&self, item_id: i64) -> BackendResult<()> {
        self.execute(Method::Post, &postpone_path(item_id), None)
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let backend = HttpBackend::new("http://localhost:8080/", Some(String::new())).unwrap();
        assert_eq!(backend.url("/api/reviews/today"), "http://localhost:8080/api/reviews/today");
        assert!(backend.token.is_none());
    }

    #[test]
    fn test_endpoint_paths() {
        assert_eq!(history_path(2, 20), "/api/reviews/history?page=2&size=20");
        assert_eq!(complete_path(3, 14), "/api/reviews/3/items/14/complete");
        assert_eq!(postpone_path(9), "/api/reviews/items/9/postpone");
    }

    #[test]
    fn test_complete_body_uses_backend_code() {
        let body = serde_json::to_string(&CompleteBody {
            response: ResponseCode::from(None),
        })
        .unwrap();
        assert_eq!(body, r#"{"response":"NORMAL"}"#);
    }

    #[test]
    fn test_parse_error_is_typed() {
        let err = parse::<Vec<ReviewSession>>("<html>").unwrap_err();
        assert!(matches!(err, BackendError::Parse(_)));

        let sessions: Vec<ReviewSession> = parse(
            r#"[{ "id": 1, "plannedTime": "2026-10-19T09:00:00Z", "completedTime": null,
                  "items": [{ "id": 2, "reviewId": 1, "itemType": "NOTE", "itemId": 3 }] }]"#,
        )
        .unwrap();
        assert_eq!(sessions[0].items.len(), 1);
    }
}

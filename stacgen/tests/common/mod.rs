//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use stacgen::http::{AsyncHttpClient, HttpError, HttpResponse};

/// Scripted HTTP client.
///
/// GETs are answered from a URL table (404 for unknown URLs); POST and PUT
/// responses are consumed in order, falling back to 500 when exhausted.
#[derive(Clone, Default)]
pub struct StubClient {
    gets: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    posts: Arc<Mutex<VecDeque<u16>>>,
    puts: Arc<Mutex<VecDeque<u16>>>,
    log: Arc<Mutex<Vec<(String, String)>>>,
}

impl StubClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.gets.lock().unwrap().insert(url.to_string(), body.into());
        self
    }

    pub fn post_status(self, status: u16) -> Self {
        self.posts.lock().unwrap().push_back(status);
        self
    }

    pub fn put_status(self, status: u16) -> Self {
        self.puts.lock().unwrap().push_back(status);
        self
    }

    /// `(method, url)` of every request, in order.
    pub fn requests(&self) -> Vec<(String, String)> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, method: &str, url: &str) {
        self.log
            .lock()
            .unwrap()
            .push((method.to_string(), url.to_string()));
    }

    fn next(queue: &Mutex<VecDeque<u16>>) -> HttpResponse {
        let status = queue.lock().unwrap().pop_front().unwrap_or(500);
        HttpResponse::new(status, Vec::new())
    }
}

impl AsyncHttpClient for StubClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>, HttpError> {
        self.record("GET", url);
        self.gets
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| HttpError::Status {
                url: url.to_string(),
                status: 404,
            })
    }

    async fn post_json(&self, url: &str, _json_body: &str) -> Result<HttpResponse, HttpError> {
        self.record("POST", url);
        Ok(Self::next(&self.posts))
    }

    async fn put_json(&self, url: &str, _json_body: &str) -> Result<HttpResponse, HttpError> {
        self.record("PUT", url);
        Ok(Self::next(&self.puts))
    }
}

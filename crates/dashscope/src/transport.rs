//! The two effects the job client needs from the outside world: HTTP exchanges and waiting
//! between polls. Both sit behind traits so tests can script them.

use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;

use crate::error::Result;

/// Status and raw body of an HTTP exchange. Status handling is left to the caller.
#[derive(Clone, Debug)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub type Headers = Vec<(&'static str, String)>;

pub trait Transport {
    fn post_json(&self, url: &str, headers: &Headers, body: &Value) -> Result<RawResponse>;

    fn get(&self, url: &str, headers: &Headers) -> Result<RawResponse>;
}

pub trait Waiter {
    fn wait(&self, duration: Duration);
}

/// Blocks the calling thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadSleeper;

impl Waiter for ThreadSleeper {
    fn wait(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// `reqwest` blocking client. Cloning shares the connection pool.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(format!("dashscope-rs/{}", env!("CARGO_PKG_VERSION")));

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    fn execute(&self, request: reqwest::blocking::RequestBuilder) -> Result<RawResponse> {
        let response = request.send()?;
        let status = response.status().as_u16();
        let body = response.bytes()?.to_vec();
        Ok(RawResponse { status, body })
    }
}

impl Transport for HttpTransport {
    fn post_json(&self, url: &str, headers: &Headers, body: &Value) -> Result<RawResponse> {
        let mut request = self.client.post(url).json(body);
        for (name, value) in headers {
            request = request.header(*name, value);
        }
        self.execute(request)
    }

    fn get(&self, url: &str, headers: &Headers) -> Result<RawResponse> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, value);
        }
        self.execute(request)
    }
}

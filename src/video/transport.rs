use anyhow::Context;
use reqwest::{header::HeaderName, StatusCode};
use std::{error::Error, time::Duration};

pub struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Blocking GET transport used by the video fetcher.
///
/// Injected so tests can serve recorded pages instead of hitting the network.
pub trait HttpTransport: Send + Sync {
    fn get(&self, url: &str, headers: &[(HeaderName, &str)]) -> anyhow::Result<HttpResponse>;
}

pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(10))
            .build()
            .context("failed to build http client")?;

        Ok(Self { client })
    }
}

fn get_error(error: &reqwest::Error) -> String {
    match error.source() {
        Some(e) => match e.source() {
            Some(e) => e.to_string(),
            None => e.to_string(),
        },
        None => error.to_string(),
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, url: &str, headers: &[(HeaderName, &str)]) -> anyhow::Result<HttpResponse> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.clone(), *value);
        }

        log::debug!("{url}: requesting");

        let resp = request.send().map_err(|err| {
            if err.is_timeout() {
                anyhow::anyhow!("{url}: timed out")
            } else {
                anyhow::anyhow!("{url}: {}", get_error(&err))
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            log::debug!("{url}: {status}");
        }

        let body = resp
            .text()
            .with_context(|| format!("{url}: failed to read response body"))?;

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
pub use stub::StubTransport;

#[cfg(test)]
mod stub {
    use super::*;
    use std::{collections::HashMap, sync::Mutex};

    enum Stubbed {
        Page(StatusCode, String),
        Failure(String),
    }

    /// Serves canned bodies by exact url and records every request.
    #[derive(Default)]
    pub struct StubTransport {
        routes: HashMap<String, Stubbed>,
        requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
    }

    impl StubTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn page(mut self, url: &str, status: u16, body: &str) -> Self {
            let status = StatusCode::from_u16(status).expect("valid status code");
            self.routes
                .insert(url.to_string(), Stubbed::Page(status, body.to_string()));
            self
        }

        pub fn failure(mut self, url: &str, reason: &str) -> Self {
            self.routes
                .insert(url.to_string(), Stubbed::Failure(reason.to_string()));
            self
        }

        pub fn requests(&self) -> Vec<(String, Vec<(String, String)>)> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl HttpTransport for StubTransport {
        fn get(&self, url: &str, headers: &[(HeaderName, &str)]) -> anyhow::Result<HttpResponse> {
            self.requests.lock().unwrap().push((
                url.to_string(),
                headers
                    .iter()
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect(),
            ));

            match self.routes.get(url) {
                Some(Stubbed::Page(status, body)) => Ok(HttpResponse {
                    status: *status,
                    body: body.clone(),
                }),
                Some(Stubbed::Failure(reason)) => Err(anyhow::anyhow!("{url}: {reason}")),
                None => Err(anyhow::anyhow!("{url}: connection refused")),
            }
        }
    }
}

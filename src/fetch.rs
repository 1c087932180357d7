// 🌐 Registry Fetcher
// GET the registry and stream it into a local sink (the staging file).

use crate::error::{MacvenError, Result};
use std::io::Write;

/// RegistryFetcher - the download boundary, swapped for a fake in tests
pub trait RegistryFetcher {
    /// Stream the document at `url` into `sink`, returning bytes written.
    /// Transport failures and non-success statuses are Network errors.
    fn fetch(&self, url: &str, sink: &mut dyn Write) -> Result<u64>;
}

pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("macven/", env!("CARGO_PKG_VERSION")))
            // The full registry can outlast the default 30s request timeout
            .timeout(None::<std::time::Duration>)
            .build()
            .map_err(|e| MacvenError::Network {
                url: String::new(),
                reason: format!("could not build HTTP client: {}", e),
            })?;
        Ok(HttpFetcher { client })
    }
}

impl RegistryFetcher for HttpFetcher {
    fn fetch(&self, url: &str, sink: &mut dyn Write) -> Result<u64> {
        let network = |reason: String| MacvenError::Network {
            url: url.to_string(),
            reason,
        };

        tracing::info!(%url, "downloading registry");
        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(network(format!("HTTP {}", status)));
        }

        let written = response
            .copy_to(sink)
            .map_err(|e| network(format!("download interrupted: {}", e)))?;

        tracing::info!(bytes = written, "registry downloaded");
        Ok(written)
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;

    /// Serves a fixed body, or fails like an unreachable host
    pub struct FakeFetcher {
        pub body: Option<String>,
        pub calls: std::cell::Cell<usize>,
    }

    impl FakeFetcher {
        pub fn serving(body: &str) -> Self {
            FakeFetcher {
                body: Some(body.to_string()),
                calls: std::cell::Cell::new(0),
            }
        }

        pub fn unreachable() -> Self {
            FakeFetcher {
                body: None,
                calls: std::cell::Cell::new(0),
            }
        }
    }

    impl RegistryFetcher for FakeFetcher {
        fn fetch(&self, url: &str, sink: &mut dyn Write) -> Result<u64> {
            self.calls.set(self.calls.get() + 1);
            match &self.body {
                Some(body) => {
                    sink.write_all(body.as_bytes())
                        .map_err(|e| MacvenError::io("staging", e))?;
                    Ok(body.len() as u64)
                }
                None => Err(MacvenError::Network {
                    url: url.to_string(),
                    reason: "connection refused".to_string(),
                }),
            }
        }
    }
}

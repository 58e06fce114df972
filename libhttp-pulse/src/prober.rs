use crate::{
    domain::extract_domain,
    http::create_http_pool,
    types::{EndpointSpec, MonitorConfig, ProbeResult},
};
use futures::stream::{self, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Url};
use std::time::Instant;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct Prober {
    client: Client,
    config: MonitorConfig,
}

impl Prober {
    pub fn new() -> Self {
        Self::with_config(MonitorConfig::default())
    }

    pub fn with_config(config: MonitorConfig) -> Self {
        let client = create_http_pool(config.timeout);
        Self { client, config }
    }

    /// Probe a single endpoint. Transport failures of any kind come back as
    /// an unavailable `ProbeResult` carrying the failure text; this never
    /// returns an error and never panics.
    pub async fn probe_one(&self, spec: &EndpointSpec) -> ProbeResult {
        let name = spec.display_name().to_string();
        let domain = extract_domain(&spec.url);

        let request = match self.build_request(spec) {
            Ok(request) => request,
            Err(reason) => {
                warn!(endpoint = %name, error = %reason, "probe request rejected");
                return failed(name, domain, reason);
            }
        };

        let threshold_ms = self.config.timeout.as_secs_f64() * 1000.0;
        let start = Instant::now();
        let outcome = tokio::time::timeout(self.config.timeout, request.send()).await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(Ok(response)) => {
                let status = response.status().as_u16();
                let available = classify(status, elapsed_ms, threshold_ms);
                debug!(
                    endpoint = %name,
                    status,
                    elapsed_ms,
                    available,
                    "probe completed"
                );
                ProbeResult {
                    name,
                    domain,
                    status_code: Some(status),
                    elapsed_ms: Some(elapsed_ms),
                    available,
                    error: None,
                }
            }
            Ok(Err(e)) => {
                warn!(endpoint = %name, error = %e, "probe failed");
                failed(name, domain, format!("Request failed: {}", e))
            }
            Err(_) => {
                warn!(endpoint = %name, timeout_ms = threshold_ms, "probe timed out");
                failed(name, domain, format!("Timed out after {:.0}ms", threshold_ms))
            }
        }
    }

    /// Probe every endpoint with bounded concurrency. All probes finish
    /// before this returns, and results come back in input order.
    pub async fn probe_batch(&self, specs: &[EndpointSpec]) -> Vec<ProbeResult> {
        // `.boxed()` erases the stream's type; without it the borrowed
        // combinator chain trips rustc's higher-ranked `Send` inference and
        // the monitor loop cannot be `tokio::spawn`ed.
        stream::iter(specs)
            .map(|spec| self.probe_one(spec))
            .buffered(self.config.max_concurrent.max(1) as usize)
            .boxed()
            .collect()
            .await
    }

    fn build_request(&self, spec: &EndpointSpec) -> Result<RequestBuilder, String> {
        let url =
            Url::parse(&spec.url).map_err(|e| format!("Invalid URL {:?}: {}", spec.url, e))?;

        let method = Method::from_bytes(spec.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| format!("Invalid method {:?}", spec.method))?;

        // Headers are rebuilt per request; the configured map is never touched.
        let mut headers = HeaderMap::with_capacity(spec.headers.len() + 1);
        for (key, value) in &spec.headers {
            let key = HeaderName::from_bytes(key.as_bytes())
                .map_err(|_| format!("Invalid header name {:?}", key))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| format!("Invalid header value for {}", key))?;
            headers.insert(key, value);
        }

        let mut request = self.client.request(method, url).headers(headers);

        if let Some(body) = &spec.body {
            if !has_content_type(spec) {
                request = request.header(CONTENT_TYPE, "application/json");
            }
            request = request.body(body.clone());
        }

        Ok(request)
    }
}

impl Default for Prober {
    fn default() -> Self {
        Self::new()
    }
}

fn has_content_type(spec: &EndpointSpec) -> bool {
    spec.headers
        .keys()
        .any(|key| key.eq_ignore_ascii_case("content-type"))
}

/// The availability rule: 2xx status and not slower than the threshold.
///
/// The latency threshold equals the transport timeout, so a measured
/// response can only sit right at the boundary; the comparison is inclusive
/// there.
fn classify(status_code: u16, elapsed_ms: f64, threshold_ms: f64) -> bool {
    (200..300).contains(&status_code) && elapsed_ms <= threshold_ms
}

fn failed(name: String, domain: Option<String>, reason: String) -> ProbeResult {
    ProbeResult {
        name,
        domain,
        status_code: None,
        elapsed_ms: None,
        available: false,
        error: Some(reason),
    }
}

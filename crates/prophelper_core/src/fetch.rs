use std::thread::sleep;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::Url;
use reqwest::blocking::Client;
use tracing::{debug, warn};

use crate::config::HelperConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    pub user_agent: String,
    pub timeout_ms: u64,
    pub retries: usize,
    pub retry_delay_ms: u64,
}

impl FetchOptions {
    pub fn from_config(config: &HelperConfig) -> Self {
        Self {
            user_agent: config.user_agent(),
            timeout_ms: config.timeout_ms(),
            retries: config.retries(),
            retry_delay_ms: config.retry_delay_ms(),
        }
    }
}

/// URL of the raw wikitext behind a proposal page URL.
pub fn raw_url(page_url: &str) -> Result<Url> {
    let mut url = Url::parse(page_url.trim())
        .with_context(|| format!("invalid proposal URL: {page_url}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("invalid proposal URL: {page_url} (expected an http or https page URL)");
    }
    let already_raw = url
        .query_pairs()
        .any(|(key, value)| key == "action" && value == "raw");
    if !already_raw {
        url.query_pairs_mut().append_pair("action", "raw");
    }
    Ok(url)
}

/// Fetch the raw wikitext of a proposal page.
pub fn fetch_raw(page_url: &str, options: &FetchOptions) -> Result<String> {
    let url = raw_url(page_url)?;
    let client = Client::builder()
        .timeout(Duration::from_millis(options.timeout_ms))
        .build()
        .context("failed to build HTTP client")?;

    let mut last_error = None::<String>;
    for attempt in 0..=options.retries {
        if attempt > 0 {
            sleep(Duration::from_millis(
                options.retry_delay_ms.saturating_mul(attempt as u64),
            ));
        }
        debug!(url = %url, attempt, "fetching raw proposal");
        let response = client
            .get(url.clone())
            .header("User-Agent", options.user_agent.clone())
            .send();
        match response {
            Ok(response) => {
                let status = response.status();
                if !status.is_success() {
                    warn!(url = %url, status = status.as_u16(), attempt, "proposal fetch failed");
                    last_error = Some(format!("HTTP {} while fetching {url}", status.as_u16()));
                    continue;
                }
                return response
                    .text()
                    .with_context(|| format!("failed to read response body from {url}"));
            }
            Err(error) => {
                warn!(url = %url, %error, attempt, "proposal fetch failed");
                last_error = Some(error.to_string());
            }
        }
    }

    let message = last_error.unwrap_or_else(|| format!("failed to fetch {url}"));
    bail!("{message}")
}

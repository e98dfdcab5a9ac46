// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Endpoint paths and realtime URL derivation.

use courier_config::model::BackendConfig;
use courier_core::CourierError;
use reqwest::Url;

pub const ORDERS_PATH: &str = "/orders";
pub const LOG_BATCH_PATH: &str = "/logs/batch";
pub const LOG_ERROR_PATH: &str = "/logs/error";
pub const HEALTH_PATH: &str = "/health";
pub const REALTIME_PATH: &str = "/ws";

/// Resolve the realtime endpoint.
///
/// An explicit `realtime_url` wins. Otherwise the base URL's scheme is mapped
/// `http -> ws` / `https -> wss` and its path replaced with `/ws`.
pub fn realtime_url(config: &BackendConfig) -> Result<Url, CourierError> {
    if let Some(explicit) = &config.realtime_url {
        return Url::parse(explicit)
            .map_err(|e| CourierError::Config(format!("invalid realtime_url `{explicit}`: {e}")));
    }

    let mut url = Url::parse(&config.base_url).map_err(|e| {
        CourierError::Config(format!("invalid base_url `{}`: {e}", config.base_url))
    })?;
    let scheme = match url.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => {
            return Err(CourierError::Config(format!(
                "cannot derive a realtime URL from scheme `{other}`"
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|()| CourierError::Config(format!("cannot switch scheme to {scheme}")))?;
    url.set_path(REALTIME_PATH);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

use std::{sync::OnceLock, time::Duration};

use tracing::debug;

use crate::{Error, Result};

pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Another crate installed a provider first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Build a `reqwest::Client` for notification adapters.
///
/// `proxy` is passed to `reqwest::Proxy::all`, so `http://`, `https://` and
/// `socks5://` URLs are accepted. Without a proxy the system/env proxy
/// settings apply, as with reqwest's defaults.
pub fn build_client(timeout: Duration, proxy: Option<&str>) -> Result<reqwest::Client> {
    install_rustls_provider();

    let mut builder = reqwest::Client::builder()
        .user_agent(concat!("sms-forward/", env!("CARGO_PKG_VERSION")));

    if timeout > Duration::ZERO {
        builder = builder.timeout(timeout);
    }

    if let Some(url) = proxy {
        let proxy = reqwest::Proxy::all(url)
            .map_err(|e| Error::config(format!("invalid proxy URL '{url}': {e}")))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| Error::Other(format!("failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_client_rejects_bad_proxy() {
        assert!(build_client(Duration::from_secs(1), Some("not a url")).is_err());
    }

    #[test]
    fn test_build_client_with_proxy() {
        assert!(build_client(Duration::from_secs(1), Some("socks5://127.0.0.1:1080")).is_ok());
        assert!(build_client(Duration::ZERO, None).is_ok());
    }
}

use thiserror::Error;
use url::Url;

/// Errors from validating an API base URL.
#[derive(Error, Debug)]
pub enum BaseUrlError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// Plain http to a non-local host would send the API key in the clear.
    #[error("Insecure base URL {0}: HTTPS required (except localhost)")]
    Insecure(String),
}

/// Validates the base URL of a news API.
///
/// API keys travel as query parameters, so anything other than `https` is
/// rejected. Plain `http` is allowed only for `localhost` and loopback
/// addresses, which is what local mock servers use.
///
/// # Examples
///
/// ```
/// use newsdeck::util::validate_base_url;
///
/// assert!(validate_base_url("https://newsapi.org/v2").is_ok());
/// assert!(validate_base_url("http://127.0.0.1:8080").is_ok());
/// assert!(validate_base_url("http://newsapi.org/v2").is_err());
/// ```
pub fn validate_base_url(url_str: &str) -> Result<Url, BaseUrlError> {
    let url = Url::parse(url_str.trim())?;

    match url.scheme() {
        "https" => Ok(url),
        "http" if is_loopback_host(&url) => {
            tracing::warn!(base_url = %url, "Using non-HTTPS base URL (localhost only)");
            Ok(url)
        }
        "http" => Err(BaseUrlError::Insecure(url.to_string())),
        scheme => Err(BaseUrlError::UnsupportedScheme(scheme.to_owned())),
    }
}

fn is_loopback_host(url: &Url) -> bool {
    match url.host() {
        Some(url::Host::Domain(domain)) => domain == "localhost",
        Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
        Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

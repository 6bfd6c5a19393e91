use reqwest::StatusCode;
use thiserror::Error;

/// Why a widget could not be refreshed.
#[derive(Error, Debug)]
pub(crate) enum FetchError {
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned {status}: {body}")]
    Server {
        url: String,
        status: StatusCode,
        body: String,
    },
    #[error("unexpected response body from {url}: {source}")]
    Malformed {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

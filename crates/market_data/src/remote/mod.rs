use thiserror::Error;

pub mod kucoin_client;
pub mod level1_response;

pub use kucoin_client::KucoinClient;
pub use level1_response::Level1Response;

#[derive(Error, Debug)]
pub enum PriceError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {status} from quote API")]
    HttpStatus { status: u16 },
    #[error("Quote API rejected request (code {code}): {msg}")]
    Api { code: String, msg: String },
    #[error("Quote API response has no price for {0}")]
    MissingPrice(String),
    #[error("Quote API returned an unusable price '{0}'")]
    InvalidPrice(String),
    #[error("Malformed quote API response: {0}")]
    Json(#[from] serde_json::Error),
}

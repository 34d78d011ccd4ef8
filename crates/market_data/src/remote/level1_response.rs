use serde::Deserialize;

use super::PriceError;

pub const SUCCESS_CODE: &str = "200000";

#[derive(Deserialize, Debug)]
pub struct Level1Response {
    pub code: String,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Option<Level1Data>,
}

#[derive(Deserialize, Debug)]
pub struct Level1Data {
    #[serde(default)]
    pub price: Option<String>,
}

impl Level1Response {
    pub fn into_price(self, symbol: &str) -> Result<f64, PriceError> {
        if self.code != SUCCESS_CODE {
            return Err(PriceError::Api {
                code: self.code,
                msg: self.msg.unwrap_or_default(),
            });
        }

        let raw = self
            .data
            .and_then(|d| d.price)
            .ok_or_else(|| PriceError::MissingPrice(symbol.to_string()))?;

        match raw.trim().parse::<f64>() {
            Ok(p) if p.is_finite() && p > 0.0 => Ok(p),
            _ => Err(PriceError::InvalidPrice(raw)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<f64, PriceError> {
        serde_json::from_str::<Level1Response>(json)
            .map_err(PriceError::from)
            .and_then(|r| r.into_price("BTC-USDT"))
    }

    #[test]
    fn extracts_last_price() {
        let json = r#"{
            "code": "200000",
            "data": {
                "time": 1729000000000,
                "sequence": "1",
                "price": "67012.5",
                "size": "0.01",
                "bestBid": "67012.4",
                "bestBidSize": "1",
                "bestAsk": "67012.5",
                "bestAskSize": "2"
            }
        }"#;
        assert_eq!(parse(json).unwrap(), 67012.5);
    }

    #[test]
    fn unknown_symbol_has_null_data() {
        let json = r#"{"code":"200000","data":null}"#;
        assert!(matches!(parse(json), Err(PriceError::MissingPrice(s)) if s == "BTC-USDT"));
    }

    #[test]
    fn non_success_code_is_an_api_error() {
        let json = r#"{"code":"400100","msg":"Invalid symbol"}"#;
        assert!(matches!(parse(json), Err(PriceError::Api { code, .. }) if code == "400100"));
    }

    #[test]
    fn garbage_price_is_rejected() {
        for price in ["\"abc\"", "\"-1\"", "\"0\"", "\"NaN\""] {
            let json = format!(r#"{{"code":"200000","data":{{"price":{}}}}}"#, price);
            assert!(matches!(parse(&json), Err(PriceError::InvalidPrice(_))));
        }
    }
}

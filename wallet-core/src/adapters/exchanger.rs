//! Exchange-rate API client
//!
//! Handles communication with the external exchanger service that publishes
//! currency rates. All rates travel as strings on the wire and are parsed
//! into `Decimal` here; a malformed or non-positive rate never leaves this
//! module as anything other than an error.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use url::Url;

use crate::domain::result::{Error, Result};
use crate::domain::Currency;
use crate::ports::RateProvider;

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Exchanger API client
#[derive(Debug)]
pub struct ExchangerClient {
    client: Client,
    base_url: String,
}

/// Exchanger response for the full rate table
#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: HashMap<String, String>,
}

/// Exchanger response for a single currency pair
#[derive(Debug, Deserialize)]
struct PairRateResponse {
    rate: String,
}

impl ExchangerClient {
    /// Create a new client for the exchanger at `base_url`
    pub fn new(base_url: &str) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("invalid exchanger URL: {e}")))?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(Error::Config(format!(
                "exchanger URL must be http or https, got {}",
                parsed.scheme()
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::RateServiceUnavailable(format!("http client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_request_error)?;

        check_response_status(&response)?;

        response
            .json::<T>()
            .await
            .map_err(|e| Error::RateServiceUnavailable(format!("malformed rate response: {e}")))
    }

    fn parse_rate(raw: &str) -> Result<Decimal> {
        let rate: Decimal = raw
            .parse()
            .map_err(|_| Error::InvalidRate(format!("unparseable rate {raw:?}")))?;
        if rate <= Decimal::ZERO {
            return Err(Error::InvalidRate(format!("non-positive rate {rate}")));
        }
        Ok(rate)
    }
}

#[async_trait]
impl RateProvider for ExchangerClient {
    async fn fetch_rates(&self) -> Result<HashMap<Currency, Decimal>> {
        let url = format!("{}/rates", self.base_url);
        let data: RatesResponse = self.get_json(&url).await?;

        let mut rates = HashMap::new();
        for currency in Currency::ALL {
            let raw = data.rates.get(currency.as_str()).ok_or_else(|| {
                Error::RateServiceUnavailable(format!("rate for {currency} missing from response"))
            })?;
            rates.insert(currency, Self::parse_rate(raw)?);
        }
        Ok(rates)
    }

    async fn fetch_rate(&self, from: Currency, to: Currency) -> Result<Decimal> {
        let url = format!("{}/rates/{}/{}", self.base_url, from, to);
        let data: PairRateResponse = self.get_json(&url).await?;
        Self::parse_rate(&data.rate)
    }
}

/// Map request errors to rate-gateway failures
fn map_request_error(error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::RateServiceUnavailable(format!(
            "exchanger timed out after {REQUEST_TIMEOUT_SECS} seconds"
        ))
    } else if error.is_connect() {
        Error::RateServiceUnavailable("unable to connect to exchanger".to_string())
    } else {
        Error::RateServiceUnavailable(format!("exchanger request failed: {error}"))
    }
}

/// Check response status and return appropriate errors
fn check_response_status(response: &reqwest::Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    Err(Error::RateServiceUnavailable(format!(
        "exchanger returned HTTP {status}"
    )))
}

//! OKX REST client for account data and order execution.
//!
//! Public endpoints (ticker, instrument metadata) are sent unsigned. Private
//! endpoints (balance, positions, orders) carry the HMAC headers built in
//! [`super::auth`]. Every response is unwrapped from the `{code, msg, data}`
//! envelope; any code other than "0" is an error regardless of HTTP status.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::ExchangeError;
use crate::models::OrderSide;

use super::auth::{self, Credentials};
use super::exchange::Exchange;
use super::types::*;

/// OKX API base URL
pub const OKX_URL: &str = "https://www.okx.com";

const BALANCE_PATH: &str = "/api/v5/account/balance";
const TICKER_PATH: &str = "/api/v5/market/ticker";
const POSITIONS_PATH: &str = "/api/v5/account/positions";
const INSTRUMENTS_PATH: &str = "/api/v5/public/instruments";
const ORDER_PATH: &str = "/api/v5/trade/order";

/// Orders are always isolated-margin market orders on the long side.
const TRADE_MODE: &str = "isolated";
const ORDER_TYPE: &str = "market";
const POSITION_SIDE: &str = "long";

/// Authenticated OKX client.
pub struct OkxClient {
    http: Client,
    base_url: String,
    credentials: Credentials,
    simulated: bool,
}

impl OkxClient {
    /// Create with custom base URL (for testing).
    pub fn with_base_url(
        base_url: String,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, ExchangeError> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            simulated: false,
        })
    }

    /// Route requests to OKX demo trading.
    pub fn simulated(mut self, simulated: bool) -> Self {
        self.simulated = simulated;
        self
    }

    /// Fetch contract value and lot size for a derivative instrument.
    pub async fn get_contract_spec(&self, instrument: &str) -> Result<ContractSpec, ExchangeError> {
        let path = format!(
            "{}?instType={}&instId={}",
            INSTRUMENTS_PATH,
            instrument_type(instrument),
            instrument
        );
        let data: Vec<InstrumentData> = self.public_get(&path).await?.into_data()?;
        let item = data
            .first()
            .ok_or(ExchangeError::MissingField("ctVal"))?;
        ContractSpec::from_data(item)
    }

    async fn public_get<T: DeserializeOwned>(
        &self,
        request_path: &str,
    ) -> Result<OkxResponse<T>, ExchangeError> {
        let url = format!("{}{}", self.base_url, request_path);
        debug!(url = %url, "OKX public request");

        let request = self.with_mode(self.http.get(&url));
        self.execute(request).await
    }

    async fn private_request<T: DeserializeOwned>(
        &self,
        method: Method,
        request_path: &str,
        body: Option<String>,
    ) -> Result<OkxResponse<T>, ExchangeError> {
        let url = format!("{}{}", self.base_url, request_path);
        let body = body.unwrap_or_default();
        debug!(method = %method, url = %url, "OKX private request");

        // Signed right before sending; OKX rejects timestamps older than 30s.
        let headers = auth::auth_headers(
            &self.credentials,
            Utc::now(),
            method.as_str(),
            request_path,
            &body,
        )?;

        let mut request = self.http.request(method, &url).headers(headers);
        if !body.is_empty() {
            request = request
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(body);
        }

        self.execute(self.with_mode(request)).await
    }

    fn with_mode(&self, request: RequestBuilder) -> RequestBuilder {
        if self.simulated {
            request.header("x-simulated-trading", "1")
        } else {
            request
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<OkxResponse<T>, ExchangeError> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        let parsed = serde_json::from_str::<OkxResponse<T>>(&text);

        if !status.is_success() {
            // OKX reports auth and rate-limit failures with an envelope on 4xx.
            if let Ok(envelope) = &parsed {
                if envelope.code != "0" {
                    return Err(ExchangeError::Api {
                        code: envelope.code.clone(),
                        msg: envelope.msg.clone(),
                    });
                }
            }
            return Err(ExchangeError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        parsed.map_err(|_| ExchangeError::Parse {
            field: "response",
            value: text.chars().take(200).collect(),
        })
    }
}

#[async_trait]
impl Exchange for OkxClient {
    async fn get_equity(&self) -> Result<Decimal, ExchangeError> {
        let data: Vec<BalanceData> = self
            .private_request(Method::GET, BALANCE_PATH, None)
            .await?
            .into_data()?;

        let item = data.first().ok_or(ExchangeError::MissingField("totalEq"))?;
        parse_decimal("totalEq", &item.total_eq)
    }

    async fn get_price(&self, instrument: &str) -> Result<Decimal, ExchangeError> {
        let path = format!("{}?instId={}", TICKER_PATH, instrument);
        let data: Vec<TickerData> = self.public_get(&path).await?.into_data()?;

        let item = data.first().ok_or(ExchangeError::MissingField("last"))?;
        parse_decimal("last", &item.last)
    }

    async fn get_position(&self, instrument: &str) -> Result<Decimal, ExchangeError> {
        let path = format!("{}?instId={}", POSITIONS_PATH, instrument);
        let data: Vec<PositionData> = self
            .private_request(Method::GET, &path, None)
            .await?
            .into_data()?;

        let entry = data.iter().find(|p| {
            (p.inst_id.is_empty() || p.inst_id == instrument)
                && (p.pos_side == "long" || p.pos_side == "net")
        });

        let contracts = match entry {
            Some(p) if !p.pos.is_empty() => parse_decimal("pos", &p.pos)?,
            _ => return Ok(Decimal::ZERO),
        };

        if contracts.is_zero() {
            return Ok(Decimal::ZERO);
        }

        match self.get_contract_spec(instrument).await {
            Ok(spec) => Ok(spec.to_base(contracts)),
            Err(e) => {
                warn!(
                    instrument = %instrument,
                    contracts = %contracts,
                    error = %e,
                    "Instrument metadata unavailable, using raw contract count"
                );
                Ok(contracts)
            }
        }
    }

    async fn place_order(
        &self,
        instrument: &str,
        side: OrderSide,
        size: Decimal,
    ) -> Result<String, ExchangeError> {
        // sz is in contracts; without ctVal there is no safe conversion.
        let spec = self.get_contract_spec(instrument).await.map_err(|e| {
            warn!(
                instrument = %instrument,
                error = %e,
                "Instrument metadata unavailable, not placing order"
            );
            e
        })?;

        let sz = spec.to_contracts(size);
        if sz.is_zero() {
            return Err(ExchangeError::OrderTooSmall);
        }

        let order = OrderRequest {
            inst_id: instrument.to_string(),
            td_mode: TRADE_MODE.to_string(),
            side: side.as_str().to_string(),
            ord_type: ORDER_TYPE.to_string(),
            sz: sz.to_string(),
            pos_side: POSITION_SIDE.to_string(),
            cl_ord_id: uuid::Uuid::new_v4().simple().to_string(),
        };
        let body = serde_json::to_string(&order).map_err(|e| ExchangeError::Parse {
            field: "order",
            value: e.to_string(),
        })?;

        info!(
            instrument = %instrument,
            side = %side,
            size = %size,
            sz = %order.sz,
            cl_ord_id = %order.cl_ord_id,
            "Submitting market order"
        );

        let response: OkxResponse<OrderAck> = self
            .private_request(Method::POST, ORDER_PATH, Some(body))
            .await?;

        // A rejected order carries its reason in sCode/sMsg rather than msg.
        if let Some(ack) = response.data.first() {
            if !ack.s_code.is_empty() && ack.s_code != "0" {
                return Err(ExchangeError::Api {
                    code: ack.s_code.clone(),
                    msg: ack.s_msg.clone(),
                });
            }
        }

        let ack = response
            .into_data()?
            .into_iter()
            .next()
            .ok_or(ExchangeError::MissingField("ordId"))?;

        if ack.ord_id.is_empty() {
            return Err(ExchangeError::MissingField("ordId"));
        }

        Ok(ack.ord_id)
    }
}

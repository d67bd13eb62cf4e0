//! Wire types for the OKX v5 REST API.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ExchangeError;

/// Envelope wrapping every OKX response.
#[derive(Debug, Clone, Deserialize)]
pub struct OkxResponse<T> {
    pub code: String,
    #[serde(default)]
    pub msg: String,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

impl<T> OkxResponse<T> {
    /// Unwrap the payload, treating any code other than "0" as an API error.
    pub fn into_data(self) -> Result<Vec<T>, ExchangeError> {
        if self.code != "0" {
            return Err(ExchangeError::Api {
                code: self.code,
                msg: self.msg,
            });
        }
        Ok(self.data)
    }
}

/// Entry from /api/v5/account/balance.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceData {
    #[serde(default)]
    pub total_eq: String,
}

/// Entry from /api/v5/market/ticker.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerData {
    #[serde(default)]
    pub last: String,
}

/// Entry from /api/v5/account/positions.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionData {
    #[serde(default)]
    pub inst_id: String,
    /// Position size in contracts
    #[serde(default)]
    pub pos: String,
    /// "long", "short" or "net"
    #[serde(default)]
    pub pos_side: String,
}

/// Entry from /api/v5/public/instruments.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentData {
    /// Base-currency amount represented by one contract
    #[serde(default)]
    pub ct_val: String,
    /// Order size increment in contracts
    #[serde(default)]
    pub lot_sz: String,
}

/// Parsed instrument metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractSpec {
    pub contract_value: Decimal,
    pub lot_size: Decimal,
}

impl ContractSpec {
    pub fn from_data(data: &InstrumentData) -> Result<Self, ExchangeError> {
        let contract_value = parse_decimal("ctVal", &data.ct_val)?;
        if contract_value <= Decimal::ZERO {
            return Err(ExchangeError::Parse {
                field: "ctVal",
                value: data.ct_val.clone(),
            });
        }
        // lotSz is optional on some instrument types; fall back to no rounding.
        let lot_size = if data.lot_sz.is_empty() {
            Decimal::ZERO
        } else {
            parse_decimal("lotSz", &data.lot_sz)?
        };
        Ok(Self {
            contract_value,
            lot_size,
        })
    }

    pub fn to_base(&self, contracts: Decimal) -> Decimal {
        contracts * self.contract_value
    }

    /// Convert a base-currency size into contracts, rounded down to the lot size.
    pub fn to_contracts(&self, base_size: Decimal) -> Decimal {
        let contracts = base_size / self.contract_value;
        if self.lot_size > Decimal::ZERO {
            ((contracts / self.lot_size).floor() * self.lot_size).normalize()
        } else {
            contracts.normalize()
        }
    }
}

/// Body for POST /api/v5/trade/order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub inst_id: String,
    pub td_mode: String,
    pub side: String,
    pub ord_type: String,
    pub sz: String,
    pub pos_side: String,
    pub cl_ord_id: String,
}

/// Per-order acknowledgement from POST /api/v5/trade/order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAck {
    #[serde(default)]
    pub ord_id: String,
    #[serde(default)]
    pub s_code: String,
    #[serde(default)]
    pub s_msg: String,
}

/// OKX `instType` for an instrument id: perpetuals end in `-SWAP`, dated
/// futures carry an expiry suffix instead.
pub fn instrument_type(instrument: &str) -> &'static str {
    if instrument.ends_with("-SWAP") {
        "SWAP"
    } else {
        "FUTURES"
    }
}

/// Parse a decimal string field, treating an empty string as absent.
pub fn parse_decimal(field: &'static str, value: &str) -> Result<Decimal, ExchangeError> {
    if value.is_empty() {
        return Err(ExchangeError::MissingField(field));
    }
    Decimal::from_str(value).map_err(|_| ExchangeError::Parse {
        field,
        value: value.to_string(),
    })
}

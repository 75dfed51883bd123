//! Typed payloads for each snapshot slot
//!
//! Every numeric field is optional: upstream APIs drift, and presence is
//! checked per command at read time rather than at parse time.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// A named entry in the snapshot, one per data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Network,
    Price,
    Transactions,
    ReferenceAsset,
}

impl Slot {
    pub const ALL: [Slot; 4] = [
        Slot::Network,
        Slot::Price,
        Slot::Transactions,
        Slot::ReferenceAsset,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Price => "price",
            Self::Transactions => "transactions",
            Self::ReferenceAsset => "reference_asset",
        }
    }

    /// Parse a raw JSON body into this slot's payload.
    pub fn parse_payload(&self, value: Value) -> std::result::Result<Payload, String> {
        if !value.is_object() {
            return Err(format!("expected a JSON object, got {}", json_kind(&value)));
        }

        match self {
            Self::Network => serde_json::from_value::<NetworkInfo>(value)
                .map(Payload::Network)
                .map_err(|e| e.to_string()),
            Self::Price => {
                let info = serde_json::from_value::<PriceInfo>(value).map_err(|e| e.to_string())?;
                if info.success == Some(false) {
                    return Err("exchange reported success=false".to_string());
                }
                Ok(Payload::Price(info))
            }
            Self::Transactions => serde_json::from_value::<TransactionInfo>(value)
                .map(Payload::Transactions)
                .map_err(|e| e.to_string()),
            Self::ReferenceAsset => ReferenceAssetInfo::from_quote(&value).map(Payload::ReferenceAsset),
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Slot {
    type Err = &'static str;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "network" => Ok(Self::Network),
            "price" => Ok(Self::Price),
            "transactions" => Ok(Self::Transactions),
            "reference_asset" | "reference" => Ok(Self::ReferenceAsset),
            _ => Err("invalid slot; expected network|price|transactions|reference_asset"),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Node `/getinfo` response
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NetworkInfo {
    pub height: Option<u64>,
    pub difficulty: Option<Decimal>,
    pub hashrate: Option<Decimal>,
    pub tx_count: Option<u64>,
    pub tx_pool_size: Option<u64>,
    #[serde(alias = "incoming_connections_count")]
    pub incoming_connections: Option<u64>,
    #[serde(alias = "outgoing_connections_count")]
    pub outgoing_connections: Option<u64>,
}

/// Exchange 24h ticker
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PriceInfo {
    pub success: Option<bool>,
    /// Latest traded price, quoted in the reference asset
    pub price: Option<Decimal>,
    /// Price 24 hours ago
    #[serde(rename = "initialprice", alias = "initial_price", alias = "open")]
    pub initial_price: Option<Decimal>,
    /// 24h volume, quoted in the reference asset
    pub volume: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
}

/// Block explorer top block header
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TransactionInfo {
    /// Coins emitted so far, in atomic units
    #[serde(rename = "alreadyGeneratedCoins", alias = "already_generated_coins")]
    pub already_generated_coins: Option<Decimal>,
    #[serde(
        rename = "alreadyGeneratedTransactions",
        alias = "already_generated_transactions"
    )]
    pub already_generated_transactions: Option<u64>,
    /// Reward of the top block, in atomic units
    pub reward: Option<Decimal>,
    pub height: Option<u64>,
}

/// Fiat quote for the reference asset, e.g. `{"bitcoin":{"usd":67012.5}}`
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceAssetInfo {
    pub asset: String,
    pub fiat: String,
    pub fiat_price: Decimal,
}

impl ReferenceAssetInfo {
    fn from_quote(value: &Value) -> std::result::Result<Self, String> {
        let (asset, quotes) = value
            .as_object()
            .and_then(|m| m.iter().next())
            .ok_or_else(|| "empty quote object".to_string())?;

        let (fiat, raw_price) = quotes
            .as_object()
            .and_then(|m| m.iter().find(|(_, v)| v.is_number() || v.is_string()))
            .ok_or_else(|| format!("no fiat price for {asset}"))?;

        let fiat_price = serde_json::from_value::<Decimal>(raw_price.clone())
            .map_err(|e| format!("bad fiat price for {asset}: {e}"))?;

        Ok(Self {
            asset: asset.clone(),
            fiat: fiat.clone(),
            fiat_price,
        })
    }
}

/// One complete parsed payload, tagged by slot
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Network(NetworkInfo),
    Price(PriceInfo),
    Transactions(TransactionInfo),
    ReferenceAsset(ReferenceAssetInfo),
}

impl Payload {
    pub fn slot(&self) -> Slot {
        match self {
            Self::Network(_) => Slot::Network,
            Self::Price(_) => Slot::Price,
            Self::Transactions(_) => Slot::Transactions,
            Self::ReferenceAsset(_) => Slot::ReferenceAsset,
        }
    }
}

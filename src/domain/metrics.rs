//! Derived metrics, computed at read time from raw snapshot fields

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::snapshot::Field;

/// Prices are compared as integer counts of 10^-8 reference units
pub const PRICE_SCALE: i64 = 100_000_000;

/// Which upstream field hashrate is derived from.
///
/// Node APIs differ: some report only difficulty, others report a raw
/// hashrate. The two formulas are not interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashrateSource {
    /// hashrate = difficulty / block target / 1000
    Difficulty,
    /// hashrate = reported hashrate / 1000
    Reported,
}

impl Default for HashrateSource {
    fn default() -> Self {
        Self::Difficulty
    }
}

impl HashrateSource {
    /// The snapshot field both hashrate and difficulty are derived from
    pub fn field(&self) -> Field {
        match self {
            Self::Difficulty => Field::Difficulty,
            Self::Reported => Field::Hashrate,
        }
    }
}

/// Network hashrate in KH/s
pub fn hashrate_khs(source: HashrateSource, raw: Decimal, block_target_secs: u64) -> Decimal {
    let hashes_per_sec = match source {
        HashrateSource::Difficulty => raw
            .checked_div(Decimal::from(block_target_secs))
            .unwrap_or_default(),
        HashrateSource::Reported => raw,
    };
    hashes_per_sec / Decimal::ONE_THOUSAND
}

/// Network difficulty; `None` if the reported hashrate is out of range
pub fn difficulty(source: HashrateSource, raw: Decimal, block_target_secs: u64) -> Option<Decimal> {
    match source {
        HashrateSource::Difficulty => Some(raw),
        HashrateSource::Reported => raw.checked_mul(Decimal::from(block_target_secs)),
    }
}

/// Average transactions per block; `None` at height zero
pub fn avg_tx_per_block(tx_count: Decimal, height: Decimal) -> Option<Decimal> {
    tx_count.checked_div(height)
}

/// Share of the total supply already emitted, in percent
pub fn emission_percent(generated_atomic: Decimal, total_supply_atomic: Decimal) -> Option<Decimal> {
    generated_atomic
        .checked_div(total_supply_atomic)?
        .checked_mul(Decimal::ONE_HUNDRED)
}

/// Price as an integer count of 10^-8 units, rounded half away from zero
pub fn scale_price(price: Decimal) -> Option<i64> {
    price
        .checked_mul(Decimal::from(PRICE_SCALE))?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// 24h change in percent.
///
/// Both prices are scaled to integers before differencing so tiny quotes do
/// not lose precision. `None` when the old price scales to zero.
pub fn percent_change_24h(latest: Decimal, day_ago: Decimal) -> Option<Decimal> {
    let latest = scale_price(latest)?;
    let day_ago = scale_price(day_ago)?;
    if day_ago == 0 {
        return None;
    }
    let delta = Decimal::from(latest.checked_sub(day_ago)?);
    delta
        .checked_div(Decimal::from(day_ago))?
        .checked_mul(Decimal::ONE_HUNDRED)
}

/// Unit price converted to fiat through the reference asset
pub fn fiat_price(unit_price: Decimal, reference_fiat_price: Decimal) -> Option<Decimal> {
    unit_price.checked_mul(reference_fiat_price)
}

/// Market capitalisation in fiat
pub fn market_cap(
    circulating_coins: Decimal,
    unit_price: Decimal,
    reference_fiat_price: Decimal,
) -> Option<Decimal> {
    circulating_coins.checked_mul(fiat_price(unit_price, reference_fiat_price)?)
}

/// Convert atomic units to whole coins
pub fn atomic_to_coins(atomic: Decimal, decimals: u32) -> Decimal {
    let mut divisor = Decimal::ONE;
    for _ in 0..decimals {
        divisor *= Decimal::TEN;
    }
    atomic / divisor
}

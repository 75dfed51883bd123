//! Shared snapshot of the latest upstream data
//!
//! Each slot holds at most one complete payload behind an `Arc`. The
//! refresher is the only writer and swaps whole `Arc`s; readers clone the
//! current `Arc`s into a [`SnapshotView`] and never hold the lock while
//! formatting.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::payload::{NetworkInfo, Payload, PriceInfo, ReferenceAssetInfo, Slot, TransactionInfo};

/// A payload together with the time it was fetched
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPayload {
    pub payload: Payload,
    pub fetched_at: DateTime<Utc>,
}

/// Latest successfully parsed payload per slot
#[derive(Debug, Default)]
pub struct Snapshot {
    slots: RwLock<HashMap<Slot, Arc<StoredPayload>>>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the payload's slot wholesale.
    pub fn replace(&self, payload: Payload) {
        let stored = Arc::new(StoredPayload {
            fetched_at: Utc::now(),
            payload,
        });
        let slot = stored.payload.slot();
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.insert(slot, stored);
    }

    /// Get the current value of a slot
    pub fn get(&self, slot: Slot) -> Option<Arc<StoredPayload>> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.get(&slot).cloned()
    }

    pub fn is_set(&self, slot: Slot) -> bool {
        self.get(slot).is_some()
    }

    /// Take a consistent read-only view of every slot
    pub fn view(&self) -> SnapshotView {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        SnapshotView {
            slots: slots.clone(),
        }
    }
}

/// A field a command may read from the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Height,
    Difficulty,
    Hashrate,
    TxCount,
    TxPoolSize,
    GeneratedCoins,
    BlockReward,
    Price,
    Price24hAgo,
    Volume24h,
    ReferenceFiatPrice,
}

impl Field {
    pub const ALL: [Field; 11] = [
        Field::Height,
        Field::Difficulty,
        Field::Hashrate,
        Field::TxCount,
        Field::TxPoolSize,
        Field::GeneratedCoins,
        Field::BlockReward,
        Field::Price,
        Field::Price24hAgo,
        Field::Volume24h,
        Field::ReferenceFiatPrice,
    ];

    pub fn slot(&self) -> Slot {
        match self {
            Self::Height | Self::Difficulty | Self::Hashrate | Self::TxCount | Self::TxPoolSize => {
                Slot::Network
            }
            Self::GeneratedCoins | Self::BlockReward => Slot::Transactions,
            Self::Price | Self::Price24hAgo | Self::Volume24h => Slot::Price,
            Self::ReferenceFiatPrice => Slot::ReferenceAsset,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Height => "height",
            Self::Difficulty => "difficulty",
            Self::Hashrate => "hashrate",
            Self::TxCount => "tx_count",
            Self::TxPoolSize => "tx_pool_size",
            Self::GeneratedCoins => "already_generated_coins",
            Self::BlockReward => "reward",
            Self::Price => "price",
            Self::Price24hAgo => "initialprice",
            Self::Volume24h => "volume",
            Self::ReferenceFiatPrice => "fiat_price",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.slot(), self.as_str())
    }
}

/// Outcome of checking a command's required fields against a view
#[derive(Debug, Clone, PartialEq)]
pub enum Readiness {
    Ready(Resolved),
    NotReady { missing: Vec<Field> },
}

/// Values for exactly the fields that were required
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolved {
    values: HashMap<Field, Decimal>,
}

impl Resolved {
    /// Value of a required field.
    ///
    /// Reading a field that was not part of the requirement list is a bug in
    /// the command table; debug builds panic, release builds read zero.
    pub fn get(&self, field: Field) -> Decimal {
        match self.values.get(&field) {
            Some(value) => *value,
            None => {
                debug_assert!(false, "field {field} read without being required");
                Decimal::ZERO
            }
        }
    }

    /// Integer value of a required field, saturating on overflow
    pub fn get_u64(&self, field: Field) -> u64 {
        use rust_decimal::prelude::ToPrimitive;
        self.get(field).trunc().to_u64().unwrap_or(0)
    }
}

/// Immutable view of the snapshot at one instant
#[derive(Debug, Clone, Default)]
pub struct SnapshotView {
    slots: HashMap<Slot, Arc<StoredPayload>>,
}

impl SnapshotView {
    pub fn stored(&self, slot: Slot) -> Option<&StoredPayload> {
        self.slots.get(&slot).map(Arc::as_ref)
    }

    pub fn network(&self) -> Option<&NetworkInfo> {
        match &self.stored(Slot::Network)?.payload {
            Payload::Network(info) => Some(info),
            _ => None,
        }
    }

    pub fn price(&self) -> Option<&PriceInfo> {
        match &self.stored(Slot::Price)?.payload {
            Payload::Price(info) => Some(info),
            _ => None,
        }
    }

    pub fn transactions(&self) -> Option<&TransactionInfo> {
        match &self.stored(Slot::Transactions)?.payload {
            Payload::Transactions(info) => Some(info),
            _ => None,
        }
    }

    pub fn reference_asset(&self) -> Option<&ReferenceAssetInfo> {
        match &self.stored(Slot::ReferenceAsset)?.payload {
            Payload::ReferenceAsset(info) => Some(info),
            _ => None,
        }
    }

    /// Current value of a field, or `None` if its slot or the field is unset
    pub fn value(&self, field: Field) -> Option<Decimal> {
        match field {
            Field::Height => self.network()?.height.map(Decimal::from),
            Field::Difficulty => self.network()?.difficulty,
            Field::Hashrate => self.network()?.hashrate,
            Field::TxCount => self.network()?.tx_count.map(Decimal::from),
            Field::TxPoolSize => self.network()?.tx_pool_size.map(Decimal::from),
            Field::GeneratedCoins => self.transactions()?.already_generated_coins,
            Field::BlockReward => self.transactions()?.reward,
            Field::Price => self.price()?.price,
            Field::Price24hAgo => self.price()?.initial_price,
            Field::Volume24h => self.price()?.volume,
            Field::ReferenceFiatPrice => self.reference_asset().map(|r| r.fiat_price),
        }
    }

    /// Check that every required field is present.
    pub fn resolve(&self, required: &[Field]) -> Readiness {
        let mut values = HashMap::with_capacity(required.len());
        let mut missing = Vec::new();

        for &field in required {
            match self.value(field) {
                Some(v) => {
                    values.insert(field, v);
                }
                None => missing.push(field),
            }
        }

        if missing.is_empty() {
            Readiness::Ready(Resolved { values })
        } else {
            Readiness::NotReady { missing }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn network(height: Option<u64>, difficulty: Option<Decimal>) -> Payload {
        Payload::Network(NetworkInfo {
            height,
            difficulty,
            ..Default::default()
        })
    }

    #[test]
    fn test_empty_snapshot_is_not_ready() {
        let snapshot = Snapshot::new();
        let view = snapshot.view();

        assert!(!snapshot.is_set(Slot::Network));
        match view.resolve(&[Field::Height, Field::Price]) {
            Readiness::NotReady { missing } => {
                assert_eq!(missing, vec![Field::Height, Field::Price]);
            }
            Readiness::Ready(_) => panic!("empty snapshot must not be ready"),
        }
    }

    #[test]
    fn test_empty_requirements_always_ready() {
        let view = Snapshot::new().view();
        assert!(matches!(view.resolve(&[]), Readiness::Ready(_)));
    }

    #[test]
    fn test_replace_is_wholesale() {
        let snapshot = Snapshot::new();
        snapshot.replace(network(Some(100), Some(dec!(5000))));
        snapshot.replace(network(Some(101), None));

        let view = snapshot.view();
        assert_eq!(view.value(Field::Height), Some(dec!(101)));
        // the older difficulty does not survive the newer payload
        assert_eq!(view.value(Field::Difficulty), None);
    }

    #[test]
    fn test_view_is_isolated_from_later_writes() {
        let snapshot = Snapshot::new();
        snapshot.replace(network(Some(100), None));
        let before = snapshot.view();

        snapshot.replace(network(Some(200), None));

        assert_eq!(before.value(Field::Height), Some(dec!(100)));
        assert_eq!(snapshot.view().value(Field::Height), Some(dec!(200)));
    }

    #[test]
    fn test_resolve_returns_required_values() {
        let snapshot = Snapshot::new();
        snapshot.replace(network(Some(482_311), Some(dec!(1200000))));

        let Readiness::Ready(resolved) = snapshot.view().resolve(&[Field::Height, Field::Difficulty])
        else {
            panic!("expected ready");
        };
        assert_eq!(resolved.get_u64(Field::Height), 482_311);
        assert_eq!(resolved.get(Field::Difficulty), dec!(1200000));
    }

    #[test]
    fn test_field_display_names_slot() {
        assert_eq!(Field::GeneratedCoins.to_string(), "transactions.already_generated_coins");
        assert_eq!(Field::ReferenceFiatPrice.slot(), Slot::ReferenceAsset);
    }
}

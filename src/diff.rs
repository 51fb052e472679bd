/*
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines [Diff], the immutable description of every state mutation a transaction causes,
//! and its monoidal combine.
//!
//! A diff is either dropped (the transaction was rejected) or handed to the block applier.
//! Combining two diffs is how chained script actions, sync calls and whole blocks compose:
//! `combine(old, new)` applies `new` on top of `old` with per-field precedence rules. The empty
//! diff is the unit. The only combine-time error is [BalanceOverflow]; every map union is total.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::BalanceOverflow;
use crate::lang::Script;
use crate::transaction::Transaction;
use crate::types::{Address, Alias, AssetId, ByteStr, DataEntry, DataValue, Height, PublicKey, Recipient};

/// Incoming and outgoing leased amounts of one account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LeaseBalance {
    pub lease_in: i64,
    pub lease_out: i64,
}

impl LeaseBalance {
    pub fn new(lease_in: i64, lease_out: i64) -> Self {
        Self { lease_in, lease_out }
    }

    fn checked_combine(&self, other: &Self) -> Option<Self> {
        Some(Self {
            lease_in: self.lease_in.checked_add(other.lease_in)?,
            lease_out: self.lease_out.checked_add(other.lease_out)?,
        })
    }

    fn is_empty(&self) -> bool {
        self.lease_in == 0 && self.lease_out == 0
    }
}

/// Balance changes of one account: base asset, lease balances, issued assets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Portfolio {
    pub balance: i64,
    pub lease: LeaseBalance,
    pub assets: BTreeMap<AssetId, i64>,
}

impl Portfolio {
    pub fn base(balance: i64) -> Self {
        Self {
            balance,
            ..Default::default()
        }
    }

    pub fn asset(asset: AssetId, amount: i64) -> Self {
        match asset {
            AssetId::Base => Self::base(amount),
            issued => Self {
                assets: BTreeMap::from([(issued, amount)]),
                ..Default::default()
            },
        }
    }

    pub fn lease(lease_in: i64, lease_out: i64) -> Self {
        Self {
            lease: LeaseBalance::new(lease_in, lease_out),
            ..Default::default()
        }
    }

    /// Change of `asset` described by this portfolio.
    pub fn balance_of(&self, asset: &AssetId) -> i64 {
        match asset {
            AssetId::Base => self.balance,
            issued => self.assets.get(issued).copied().unwrap_or(0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.balance == 0 && self.lease.is_empty() && self.assets.values().all(|v| *v == 0)
    }

    fn checked_combine(&self, other: &Self) -> Option<Self> {
        let mut assets = self.assets.clone();
        for (asset, amount) in &other.assets {
            let entry = assets.entry(asset.clone()).or_insert(0);
            *entry = entry.checked_add(*amount)?;
        }
        Some(Self {
            balance: self.balance.checked_add(other.balance)?,
            lease: self.lease.checked_combine(&other.lease)?,
            assets,
        })
    }
}

/// Issue-time facts about an asset that never change afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetStaticInfo {
    pub origin_tx: ByteStr,
    pub issuer: PublicKey,
    pub decimals: u8,
    pub nft: bool,
}

/// Renameable part of an asset description.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetInfoUpdate {
    pub name: String,
    pub description: String,
    pub last_updated_height: Height,
}

/// Volume delta plus the resulting reissuability. Combines by summing volumes;
/// reissuability survives only if both sides keep it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AssetVolumeUpdate {
    pub reissuable: bool,
    pub volume: i128,
}

impl AssetVolumeUpdate {
    fn combine(&self, other: &Self) -> Self {
        Self {
            reissuable: self.reissuable && other.reissuable,
            volume: self.volume.saturating_add(other.volume),
        }
    }
}

/// Either-or-both update of an existing asset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssetUpdate {
    Info(AssetInfoUpdate),
    Volume(AssetVolumeUpdate),
    Both {
        info: AssetInfoUpdate,
        volume: AssetVolumeUpdate,
    },
}

impl AssetUpdate {
    pub fn info(&self) -> Option<&AssetInfoUpdate> {
        match self {
            AssetUpdate::Info(info) | AssetUpdate::Both { info, .. } => Some(info),
            AssetUpdate::Volume(_) => None,
        }
    }

    pub fn volume(&self) -> Option<&AssetVolumeUpdate> {
        match self {
            AssetUpdate::Volume(volume) | AssetUpdate::Both { volume, .. } => Some(volume),
            AssetUpdate::Info(_) => None,
        }
    }

    /// Newer info wins, volumes sum.
    fn combine(&self, newer: &Self) -> Self {
        let info = newer.info().or_else(|| self.info()).cloned();
        let volume = match (self.volume(), newer.volume()) {
            (Some(a), Some(b)) => Some(a.combine(b)),
            (Some(v), None) | (None, Some(v)) => Some(*v),
            (None, None) => None,
        };
        match (info, volume) {
            (Some(info), Some(volume)) => AssetUpdate::Both { info, volume },
            (Some(info), None) => AssetUpdate::Info(info),
            (None, Some(volume)) => AssetUpdate::Volume(volume),
            (None, None) => unreachable!("an AssetUpdate always carries info or volume"),
        }
    }
}

/// Full description of an issued asset as visible through a blockchain view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetDescription {
    pub origin_tx: ByteStr,
    pub issuer: PublicKey,
    pub name: String,
    pub description: String,
    pub decimals: u8,
    pub reissuable: bool,
    pub total_volume: u128,
    pub last_updated_height: Height,
    pub script: Option<AssetScriptInfo>,
    /// Units of the asset equivalent to one `FEE_UNIT` of base fee; 0 = not sponsored.
    pub sponsorship_rate: i64,
    pub nft: bool,
}

/// Lifecycle of a lease. `Active -> Cancelled` is the only transition; `Cancelled` is terminal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LeaseStatus {
    Active,
    Cancelled { at_height: Height, cancel_tx: ByteStr },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeaseDetails {
    pub sender: PublicKey,
    pub recipient: Recipient,
    pub amount: i64,
    pub status: LeaseStatus,
    pub source_tx: ByteStr,
    pub height: Height,
}

impl LeaseDetails {
    pub fn is_active(&self) -> bool {
        matches!(self.status, LeaseStatus::Active)
    }
}

/// Sponsorship change carried by a diff. `NoInfo` is the combine identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sponsorship {
    NoInfo,
    /// New rate; 0 cancels sponsorship.
    Value(i64),
}

impl Sponsorship {
    fn combine(&self, newer: &Self) -> Self {
        match newer {
            Sponsorship::NoInfo => *self,
            value => *value,
        }
    }
}

/// Account script together with the account's public key and per-estimator-version callable
/// complexities, so the protocol can upgrade the estimator without re-evaluating old scripts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountScriptInfo {
    pub public_key: PublicKey,
    pub script: Script,
    pub complexities_by_estimator: BTreeMap<u8, BTreeMap<String, u64>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetScriptInfo {
    pub script: Script,
    pub complexity: u64,
}

/// Accumulated fill of one order. Combines by addition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VolumeAndFee {
    pub volume: i64,
    pub fee: i64,
}

impl VolumeAndFee {
    fn combine(&self, other: &Self) -> Self {
        Self {
            volume: self.volume.saturating_add(other.volume),
            fee: self.fee.saturating_add(other.fee),
        }
    }
}

/// Observable outcome of one invoke-script transaction, stored in the diff for the API
/// and for affected-address binding.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InvokeScriptResult {
    pub data: Vec<DataEntry>,
    pub transfers: Vec<ResultTransfer>,
    pub issues: Vec<AssetId>,
    pub reissues: Vec<(AssetId, i64)>,
    pub burns: Vec<(AssetId, i64)>,
    pub sponsor_fees: Vec<(AssetId, i64)>,
    pub leases: Vec<ByteStr>,
    pub lease_cancels: Vec<ByteStr>,
    pub invokes: Vec<SyncCall>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultTransfer {
    pub recipient: Address,
    pub amount: i64,
    pub asset: AssetId,
}

/// One synchronous dApp call performed during an invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncCall {
    pub dapp: Address,
    pub function: String,
}

impl InvokeScriptResult {
    pub fn called_addresses(&self) -> impl Iterator<Item = Address> + '_ {
        self.invokes.iter().map(|call| call.dapp)
    }
}

/// Record of one transaction inside a diff.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionEntry {
    pub tx: Transaction,
    pub affected: BTreeSet<Address>,
    pub applied: bool,
    pub spent_complexity: u64,
}

/// Insertion-ordered `txid -> TransactionEntry` map. The miner and the API both need
/// the order transactions were folded in; a later write to an existing id updates the
/// value in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionEntries(Vec<(ByteStr, TransactionEntry)>);

impl TransactionEntries {
    pub fn insert(&mut self, id: ByteStr, entry: TransactionEntry) {
        match self.0.iter_mut().find(|(existing, _)| *existing == id) {
            Some((_, slot)) => *slot = entry,
            None => self.0.push((id, entry)),
        }
    }

    pub fn get(&self, id: &ByteStr) -> Option<&TransactionEntry> {
        self.0.iter().find(|(existing, _)| existing == id).map(|(_, e)| e)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(ByteStr, TransactionEntry)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The diff itself: a bag of keyed mutations plus script-run accounting.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Diff {
    pub transactions: TransactionEntries,
    pub portfolios: BTreeMap<Address, Portfolio>,
    pub issued_assets: BTreeMap<AssetId, (AssetStaticInfo, AssetInfoUpdate, AssetVolumeUpdate)>,
    pub updated_assets: BTreeMap<AssetId, AssetUpdate>,
    pub aliases: BTreeMap<Alias, Address>,
    pub order_fills: BTreeMap<ByteStr, VolumeAndFee>,
    pub lease_state: BTreeMap<ByteStr, LeaseDetails>,
    pub scripts: BTreeMap<Address, Option<AccountScriptInfo>>,
    pub asset_scripts: BTreeMap<AssetId, Option<AssetScriptInfo>>,
    pub account_data: BTreeMap<Address, BTreeMap<String, DataEntry>>,
    pub sponsorship: BTreeMap<AssetId, Sponsorship>,
    pub scripts_run: u32,
    pub scripts_complexity: u64,
    pub script_results: BTreeMap<ByteStr, InvokeScriptResult>,
}

impl Diff {
    /// Diff touching a single portfolio. Empty portfolios are elided up front.
    pub fn of_portfolio(address: Address, portfolio: Portfolio) -> Self {
        let mut portfolios = BTreeMap::new();
        if !portfolio.is_empty() {
            portfolios.insert(address, portfolio);
        }
        Self {
            portfolios,
            ..Default::default()
        }
    }

    pub fn of_portfolios(entries: impl IntoIterator<Item = (Address, Portfolio)>) -> Result<Self, BalanceOverflow> {
        let mut diff = Diff::default();
        for (address, portfolio) in entries {
            diff = diff.combine(Diff::of_portfolio(address, portfolio))?;
        }
        Ok(diff)
    }

    pub fn of_data(address: Address, entries: impl IntoIterator<Item = DataEntry>) -> Self {
        let mut keyed = BTreeMap::new();
        // last write wins within one diff
        for entry in entries {
            keyed.insert(entry.key.clone(), entry);
        }
        Self {
            account_data: BTreeMap::from([(address, keyed)]),
            ..Default::default()
        }
    }

    /// Applies `new` on top of `self`. The only failure is checked-addition overflow in
    /// a portfolio.
    pub fn combine(mut self, new: Diff) -> Result<Diff, BalanceOverflow> {
        for (id, entry) in new.transactions.0 {
            self.transactions.insert(id, entry);
        }

        for (address, portfolio) in new.portfolios {
            let merged = match self.portfolios.remove(&address) {
                Some(existing) => match existing.checked_combine(&portfolio) {
                    Some(merged) => merged,
                    None => {
                        return Err(BalanceOverflow {
                            address,
                            asset: overflowing_asset(&existing, &portfolio),
                        })
                    }
                },
                None => portfolio,
            };
            if !merged.is_empty() {
                self.portfolios.insert(address, merged);
            }
        }

        self.issued_assets.extend(new.issued_assets);

        for (asset, update) in new.updated_assets {
            let merged = match self.updated_assets.remove(&asset) {
                Some(existing) => existing.combine(&update),
                None => update,
            };
            self.updated_assets.insert(asset, merged);
        }

        self.aliases.extend(new.aliases);

        for (order_id, fill) in new.order_fills {
            let merged = match self.order_fills.get(&order_id) {
                Some(existing) => existing.combine(&fill),
                None => fill,
            };
            self.order_fills.insert(order_id, merged);
        }

        self.lease_state.extend(new.lease_state);
        self.scripts.extend(new.scripts);
        self.asset_scripts.extend(new.asset_scripts);

        for (address, entries) in new.account_data {
            self.account_data.entry(address).or_default().extend(entries);
        }

        for (asset, sponsorship) in new.sponsorship {
            let merged = match self.sponsorship.get(&asset) {
                Some(existing) => existing.combine(&sponsorship),
                None => sponsorship,
            };
            self.sponsorship.insert(asset, merged);
        }

        self.scripts_run = self.scripts_run.saturating_add(new.scripts_run);
        self.scripts_complexity = self.scripts_complexity.saturating_add(new.scripts_complexity);
        self.script_results.extend(new.script_results);

        Ok(self)
    }

    /// Records `tx` in this diff with the affected-address union computed from the diff's
    /// final shape: portfolio keys, data keys, sync-called dApps, and the dApp itself.
    /// Must run after the action fold, never before.
    pub fn bind_transaction(mut self, tx: &Transaction, applied: bool, spent_complexity: u64, dapp: Option<Address>) -> Self {
        let mut affected: BTreeSet<Address> = self.portfolios.keys().copied().collect();
        affected.extend(self.account_data.keys().copied());
        if let Some(result) = self.script_results.get(&tx.id) {
            affected.extend(result.called_addresses());
        }
        affected.extend(dapp);
        affected.insert(tx.sender_address());
        self.transactions.insert(
            tx.id.clone(),
            TransactionEntry {
                tx: tx.clone(),
                affected,
                applied,
                spent_complexity,
            },
        );
        self
    }

    /// Data value this diff assigns to `(address, key)`, if any. `Empty` entries read as
    /// deletions and are reported as `Some(Empty)` so overlays can mask committed values.
    pub fn data_entry(&self, address: &Address, key: &str) -> Option<&DataEntry> {
        self.account_data.get(address).and_then(|entries| entries.get(key))
    }

    /// True when nothing in the diff mutates state.
    pub fn is_empty(&self) -> bool {
        *self == Diff::default()
    }
}

// Overflow attribution for error messages: the first field whose checked addition fails.
fn overflowing_asset(existing: &Portfolio, incoming: &Portfolio) -> AssetId {
    if existing.balance.checked_add(incoming.balance).is_none() {
        return AssetId::Base;
    }
    for (asset, amount) in &incoming.assets {
        if let Some(old) = existing.assets.get(asset) {
            if old.checked_add(*amount).is_none() {
                return asset.clone();
            }
        }
    }
    AssetId::Base
}

/// Reads a data value through `Empty`-as-deletion semantics.
pub fn visible_data_value(entry: &DataEntry) -> Option<&DataValue> {
    match &entry.value {
        DataValue::Empty => None,
        value => Some(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(seed: u8) -> Address {
        Address::from_public_key(b'T', &[seed; 32])
    }

    #[test]
    fn combine_with_empty_is_identity() {
        let diff = Diff::of_portfolio(addr(1), Portfolio::base(42));
        assert_eq!(diff.clone().combine(Diff::default()).unwrap(), diff);
        assert_eq!(Diff::default().combine(diff.clone()).unwrap(), diff);
    }

    #[test]
    fn portfolio_merge_is_checked_addition() {
        let a = Diff::of_portfolio(addr(1), Portfolio::base(40));
        let b = Diff::of_portfolio(addr(1), Portfolio::base(2));
        let merged = a.combine(b).unwrap();
        assert_eq!(merged.portfolios[&addr(1)].balance, 42);

        let a = Diff::of_portfolio(addr(1), Portfolio::base(i64::MAX));
        let b = Diff::of_portfolio(addr(1), Portfolio::base(1));
        let overflow = a.combine(b).unwrap_err();
        assert_eq!(overflow.address, addr(1));
    }

    #[test]
    fn combine_is_associative_on_success() {
        let d1 = Diff::of_portfolio(addr(1), Portfolio::base(1));
        let d2 = Diff::of_portfolio(addr(1), Portfolio::asset(AssetId::issued([9u8; 32]), 5));
        let d3 = Diff::of_portfolio(addr(2), Portfolio::lease(3, 0));

        let left = d1.clone().combine(d2.clone()).unwrap().combine(d3.clone()).unwrap();
        let right = d1.combine(d2.combine(d3).unwrap()).unwrap();
        assert_eq!(left, right);
    }

    #[test]
    fn overflow_fails_regardless_of_grouping() {
        let d1 = Diff::of_portfolio(addr(1), Portfolio::base(i64::MAX));
        let d2 = Diff::of_portfolio(addr(1), Portfolio::base(i64::MAX));
        let d3 = Diff::of_portfolio(addr(1), Portfolio::base(1));

        let left = d1.clone().combine(d2.clone()).unwrap_err();
        let right_inner = d2.combine(d3).unwrap_err();
        assert_eq!(left.address, right_inner.address);
    }

    #[test]
    fn zero_sum_portfolios_are_elided() {
        let a = Diff::of_portfolio(addr(1), Portfolio::base(10));
        let b = Diff::of_portfolio(addr(1), Portfolio::base(-10));
        let merged = a.combine(b).unwrap();
        assert!(!merged.portfolios.contains_key(&addr(1)));
    }

    #[test]
    fn account_data_last_write_wins() {
        let first = Diff::of_data(
            addr(1),
            [DataEntry {
                key: "k".into(),
                value: DataValue::Int(1),
            }],
        );
        let second = Diff::of_data(
            addr(1),
            [DataEntry {
                key: "k".into(),
                value: DataValue::Int(2),
            }],
        );
        let merged = first.combine(second).unwrap();
        assert_eq!(
            merged.data_entry(&addr(1), "k").map(|e| &e.value),
            Some(&DataValue::Int(2))
        );
    }

    #[test]
    fn updated_assets_both_sums_volume_and_takes_newer_info() {
        let asset = AssetId::issued([3u8; 32]);
        let older = Diff {
            updated_assets: BTreeMap::from([(
                asset.clone(),
                AssetUpdate::Both {
                    info: AssetInfoUpdate {
                        name: "old".into(),
                        description: String::new(),
                        last_updated_height: 1,
                    },
                    volume: AssetVolumeUpdate {
                        reissuable: true,
                        volume: 100,
                    },
                },
            )]),
            ..Default::default()
        };
        let newer = Diff {
            updated_assets: BTreeMap::from([(
                asset.clone(),
                AssetUpdate::Both {
                    info: AssetInfoUpdate {
                        name: "new".into(),
                        description: String::new(),
                        last_updated_height: 2,
                    },
                    volume: AssetVolumeUpdate {
                        reissuable: false,
                        volume: -40,
                    },
                },
            )]),
            ..Default::default()
        };
        let merged = older.combine(newer).unwrap();
        let update = &merged.updated_assets[&asset];
        assert_eq!(update.info().unwrap().name, "new");
        assert_eq!(update.volume().unwrap().volume, 60);
        assert!(!update.volume().unwrap().reissuable);
    }

    #[test]
    fn sponsorship_no_info_is_identity() {
        let asset = AssetId::issued([4u8; 32]);
        let value = Diff {
            sponsorship: BTreeMap::from([(asset.clone(), Sponsorship::Value(7))]),
            ..Default::default()
        };
        let no_info = Diff {
            sponsorship: BTreeMap::from([(asset.clone(), Sponsorship::NoInfo)]),
            ..Default::default()
        };
        let merged = value.combine(no_info).unwrap();
        assert_eq!(merged.sponsorship[&asset], Sponsorship::Value(7));
    }

    #[test]
    fn transaction_order_is_preserved() {
        let mut entries = TransactionEntries::default();
        let tx = crate::transaction::Transaction::new(
            b'T',
            [1u8; 32],
            1,
            AssetId::Base,
            0,
            1,
            crate::transaction::TransactionData::Data(crate::transaction::DataTxData { entries: vec![] }),
            vec![],
        );
        for id in [3u8, 1, 2] {
            entries.insert(
                ByteStr::from(vec![id]),
                TransactionEntry {
                    tx: tx.clone(),
                    affected: BTreeSet::new(),
                    applied: true,
                    spent_complexity: 0,
                },
            );
        }
        let order: Vec<u8> = entries.iter().map(|(id, _)| id.as_bytes()[0]).collect();
        assert_eq!(order, vec![3, 1, 2]);
    }
}

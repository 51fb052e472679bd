/*
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Read-only view over chain state, and the composite view that overlays an in-flight [Diff]
//! on a committed snapshot.
//!
//! The engine never writes through this interface. Drivers read the committed snapshot they
//! were given; the invoke machinery wraps it in a [CompositeBlockchain] so chained actions and
//! nested sync calls observe their own earlier writes. Reads consult the overlay first and fall
//! back to the snapshot, the same first-writes-then-source order the read-write cache of a
//! state-transition runtime uses.

use std::collections::BTreeMap;

use crate::diff::{
    AccountScriptInfo, AssetDescription, AssetScriptInfo, Diff, LeaseBalance, LeaseDetails, Sponsorship,
};
use crate::types::{Address, Alias, AssetId, ByteStr, DataEntry, DataValue, Height};

/// Consistent snapshot of committed chain state for the duration of one diff computation.
pub trait Blockchain {
    fn height(&self) -> Height;

    /// Balance of `asset` held by `address`; 0 for unknown accounts.
    fn balance(&self, address: &Address, asset: &AssetId) -> i64;

    fn lease_balance(&self, address: &Address) -> LeaseBalance;

    fn resolve_alias(&self, alias: &Alias) -> Option<Address>;

    fn asset_description(&self, asset: &AssetId) -> Option<AssetDescription>;

    fn account_script(&self, address: &Address) -> Option<AccountScriptInfo>;

    fn asset_script(&self, asset: &AssetId) -> Option<AssetScriptInfo>;

    fn account_data(&self, address: &Address, key: &str) -> Option<DataEntry>;

    fn lease_details(&self, lease_id: &ByteStr) -> Option<LeaseDetails>;
}

/// Committed snapshot plus an owned in-flight overlay. Sync-call recursion passes an updated
/// overlay by value at each frame, which is what breaks the blockchain-script reference cycle.
#[derive(Clone)]
pub struct CompositeBlockchain<'a, B: Blockchain> {
    snapshot: &'a B,
    overlay: Diff,
}

impl<'a, B: Blockchain> CompositeBlockchain<'a, B> {
    pub fn new(snapshot: &'a B, overlay: Diff) -> Self {
        Self { snapshot, overlay }
    }

    pub fn overlay(&self) -> &Diff {
        &self.overlay
    }

    pub fn into_overlay(self) -> Diff {
        self.overlay
    }

    pub fn snapshot(&self) -> &'a B {
        self.snapshot
    }

    /// Replaces the overlay with `overlay` combined on top of it.
    pub fn absorb(&mut self, diff: Diff) -> Result<(), crate::error::BalanceOverflow> {
        let overlay = std::mem::take(&mut self.overlay);
        self.overlay = overlay.combine(diff)?;
        Ok(())
    }
}

impl<'a, B: Blockchain> Blockchain for CompositeBlockchain<'a, B> {
    fn height(&self) -> Height {
        self.snapshot.height()
    }

    fn balance(&self, address: &Address, asset: &AssetId) -> i64 {
        let committed = self.snapshot.balance(address, asset);
        let delta = self
            .overlay
            .portfolios
            .get(address)
            .map(|portfolio| portfolio.balance_of(asset))
            .unwrap_or(0);
        committed.saturating_add(delta)
    }

    fn lease_balance(&self, address: &Address) -> LeaseBalance {
        let committed = self.snapshot.lease_balance(address);
        let delta = self
            .overlay
            .portfolios
            .get(address)
            .map(|portfolio| portfolio.lease)
            .unwrap_or_default();
        LeaseBalance {
            lease_in: committed.lease_in.saturating_add(delta.lease_in),
            lease_out: committed.lease_out.saturating_add(delta.lease_out),
        }
    }

    fn resolve_alias(&self, alias: &Alias) -> Option<Address> {
        self.overlay
            .aliases
            .get(alias)
            .copied()
            .or_else(|| self.snapshot.resolve_alias(alias))
    }

    fn asset_description(&self, asset: &AssetId) -> Option<AssetDescription> {
        let base = match self.overlay.issued_assets.get(asset) {
            Some((static_info, info, volume)) => Some(AssetDescription {
                origin_tx: static_info.origin_tx.clone(),
                issuer: static_info.issuer,
                name: info.name.clone(),
                description: info.description.clone(),
                decimals: static_info.decimals,
                reissuable: volume.reissuable,
                total_volume: volume.volume.max(0) as u128,
                last_updated_height: info.last_updated_height,
                script: None,
                sponsorship_rate: 0,
                nft: static_info.nft,
            }),
            None => self.snapshot.asset_description(asset),
        };
        let mut description = base?;

        if let Some(update) = self.overlay.updated_assets.get(asset) {
            if let Some(info) = update.info() {
                description.name = info.name.clone();
                description.description = info.description.clone();
                description.last_updated_height = info.last_updated_height;
            }
            if let Some(volume) = update.volume() {
                description.reissuable = description.reissuable && volume.reissuable;
                description.total_volume =
                    (description.total_volume as i128).saturating_add(volume.volume).max(0) as u128;
            }
        }
        if let Some(Sponsorship::Value(rate)) = self.overlay.sponsorship.get(asset) {
            description.sponsorship_rate = *rate;
        }
        if let Some(script) = self.overlay.asset_scripts.get(asset) {
            description.script = script.clone();
        }
        Some(description)
    }

    fn account_script(&self, address: &Address) -> Option<AccountScriptInfo> {
        match self.overlay.scripts.get(address) {
            Some(script) => script.clone(),
            None => self.snapshot.account_script(address),
        }
    }

    fn asset_script(&self, asset: &AssetId) -> Option<AssetScriptInfo> {
        match self.overlay.asset_scripts.get(asset) {
            Some(script) => script.clone(),
            None => self.snapshot.asset_script(asset),
        }
    }

    fn account_data(&self, address: &Address, key: &str) -> Option<DataEntry> {
        match self.overlay.data_entry(address, key) {
            // an Empty write masks the committed value
            Some(entry) => match entry.value {
                DataValue::Empty => None,
                _ => Some(entry.clone()),
            },
            None => self.snapshot.account_data(address, key),
        }
    }

    fn lease_details(&self, lease_id: &ByteStr) -> Option<LeaseDetails> {
        self.overlay
            .lease_state
            .get(lease_id)
            .cloned()
            .or_else(|| self.snapshot.lease_details(lease_id))
    }
}

/// Straightforward map-backed [Blockchain]. The reference implementation used by this crate's
/// tests and by tooling that replays diffs outside a node.
#[derive(Clone, Debug, Default)]
pub struct InMemoryBlockchain {
    pub height: Height,
    pub balances: BTreeMap<Address, BTreeMap<AssetId, i64>>,
    pub lease_balances: BTreeMap<Address, LeaseBalance>,
    pub aliases: BTreeMap<Alias, Address>,
    pub assets: BTreeMap<AssetId, AssetDescription>,
    pub account_scripts: BTreeMap<Address, AccountScriptInfo>,
    pub account_data: BTreeMap<Address, BTreeMap<String, DataEntry>>,
    pub leases: BTreeMap<ByteStr, LeaseDetails>,
}

impl InMemoryBlockchain {
    pub fn at_height(height: Height) -> Self {
        Self {
            height,
            ..Default::default()
        }
    }

    pub fn set_balance(&mut self, address: Address, asset: AssetId, amount: i64) {
        self.balances.entry(address).or_default().insert(asset, amount);
    }

    /// Applies a successful diff, advancing this snapshot to the post-transaction state.
    pub fn apply(&mut self, diff: &Diff) {
        for (address, portfolio) in &diff.portfolios {
            let balances = self.balances.entry(*address).or_default();
            let base = balances.entry(AssetId::Base).or_insert(0);
            *base = base.saturating_add(portfolio.balance);
            for (asset, amount) in &portfolio.assets {
                let entry = balances.entry(asset.clone()).or_insert(0);
                *entry = entry.saturating_add(*amount);
            }
            let lease = self.lease_balances.entry(*address).or_default();
            lease.lease_in = lease.lease_in.saturating_add(portfolio.lease.lease_in);
            lease.lease_out = lease.lease_out.saturating_add(portfolio.lease.lease_out);
        }
        for (asset, (static_info, info, volume)) in &diff.issued_assets {
            self.assets.insert(
                asset.clone(),
                AssetDescription {
                    origin_tx: static_info.origin_tx.clone(),
                    issuer: static_info.issuer,
                    name: info.name.clone(),
                    description: info.description.clone(),
                    decimals: static_info.decimals,
                    reissuable: volume.reissuable,
                    total_volume: volume.volume.max(0) as u128,
                    last_updated_height: info.last_updated_height,
                    script: None,
                    sponsorship_rate: 0,
                    nft: static_info.nft,
                },
            );
        }
        for (asset, update) in &diff.updated_assets {
            if let Some(description) = self.assets.get_mut(asset) {
                if let Some(info) = update.info() {
                    description.name = info.name.clone();
                    description.description = info.description.clone();
                    description.last_updated_height = info.last_updated_height;
                }
                if let Some(volume) = update.volume() {
                    description.reissuable = description.reissuable && volume.reissuable;
                    description.total_volume =
                        (description.total_volume as i128).saturating_add(volume.volume).max(0) as u128;
                }
            }
        }
        for (alias, address) in &diff.aliases {
            self.aliases.insert(alias.clone(), *address);
        }
        for (lease_id, details) in &diff.lease_state {
            self.leases.insert(lease_id.clone(), details.clone());
        }
        for (address, script) in &diff.scripts {
            match script {
                Some(info) => {
                    self.account_scripts.insert(*address, info.clone());
                }
                None => {
                    self.account_scripts.remove(address);
                }
            }
        }
        for (asset, script) in &diff.asset_scripts {
            if let Some(description) = self.assets.get_mut(asset) {
                description.script = script.clone();
            }
        }
        for (address, entries) in &diff.account_data {
            let stored = self.account_data.entry(*address).or_default();
            for (key, entry) in entries {
                match entry.value {
                    DataValue::Empty => {
                        stored.remove(key);
                    }
                    _ => {
                        stored.insert(key.clone(), entry.clone());
                    }
                }
            }
        }
        for (asset, sponsorship) in &diff.sponsorship {
            if let Some(description) = self.assets.get_mut(asset) {
                if let Sponsorship::Value(rate) = sponsorship {
                    description.sponsorship_rate = *rate;
                }
            }
        }
    }

    /// All leases still active where `address` is sender or recipient. Test observability
    /// for lease lifecycle checks.
    pub fn active_leases(&self, address: &Address) -> Vec<ByteStr> {
        self.leases
            .iter()
            .filter(|(_, details)| details.is_active())
            .filter(|(_, details)| {
                let sender = Address::from_public_key(address.chain_id(), &details.sender);
                let to_recipient = match &details.recipient {
                    crate::types::Recipient::Address(recipient) => recipient == address,
                    crate::types::Recipient::Alias(alias) => self.resolve_alias(alias).as_ref() == Some(address),
                };
                sender == *address || to_recipient
            })
            .map(|(id, _)| id.clone())
            .collect()
    }
}

impl Blockchain for InMemoryBlockchain {
    fn height(&self) -> Height {
        self.height
    }

    fn balance(&self, address: &Address, asset: &AssetId) -> i64 {
        self.balances
            .get(address)
            .and_then(|assets| assets.get(asset))
            .copied()
            .unwrap_or(0)
    }

    fn lease_balance(&self, address: &Address) -> LeaseBalance {
        self.lease_balances.get(address).copied().unwrap_or_default()
    }

    fn resolve_alias(&self, alias: &Alias) -> Option<Address> {
        self.aliases.get(alias).copied()
    }

    fn asset_description(&self, asset: &AssetId) -> Option<AssetDescription> {
        self.assets.get(asset).cloned()
    }

    fn account_script(&self, address: &Address) -> Option<AccountScriptInfo> {
        self.account_scripts.get(address).cloned()
    }

    fn asset_script(&self, asset: &AssetId) -> Option<AssetScriptInfo> {
        self.assets.get(asset).and_then(|description| description.script.clone())
    }

    fn account_data(&self, address: &Address, key: &str) -> Option<DataEntry> {
        self.account_data
            .get(address)
            .and_then(|entries| entries.get(key))
            .cloned()
    }

    fn lease_details(&self, lease_id: &ByteStr) -> Option<LeaseDetails> {
        self.leases.get(lease_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::Portfolio;

    fn addr(seed: u8) -> Address {
        Address::from_public_key(b'T', &[seed; 32])
    }

    #[test]
    fn overlay_reads_shadow_the_snapshot() {
        let mut snapshot = InMemoryBlockchain::at_height(10);
        snapshot.set_balance(addr(1), AssetId::Base, 100);

        let overlay = Diff::of_portfolio(addr(1), Portfolio::base(-30));
        let view = CompositeBlockchain::new(&snapshot, overlay);
        assert_eq!(view.balance(&addr(1), &AssetId::Base), 70);
        assert_eq!(view.balance(&addr(2), &AssetId::Base), 0);
    }

    #[test]
    fn overlay_data_empty_masks_committed_value() {
        let mut snapshot = InMemoryBlockchain::at_height(1);
        snapshot.account_data.entry(addr(1)).or_default().insert(
            "k".into(),
            DataEntry {
                key: "k".into(),
                value: DataValue::Int(5),
            },
        );

        let overlay = Diff::of_data(
            addr(1),
            [DataEntry {
                key: "k".into(),
                value: DataValue::Empty,
            }],
        );
        let view = CompositeBlockchain::new(&snapshot, overlay);
        assert_eq!(view.account_data(&addr(1), "k"), None);
    }
}

//! # Entity Store Service
//!
//! Slot-based storage for the four entity kinds with O(1) lookup indices.
//!
//! ## Architecture
//!
//! Each kind lives in a `Vec<Slot<T>>`. Slot indices are stable for the
//! lifetime of the store; a deleted entity leaves an empty slot behind.
//! Every mutation validates first, then removes the slot's old index
//! entries, then inserts the new ones (INVARIANT-5), so a failed call leaves
//! every index untouched.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::{Address, EntityKind, Eoa, Hash, Proposal, Safe, Transaction};
use tracing::{debug, info};

use crate::domain::paths::is_entity_file;
use crate::domain::{
    render_diff, Entry, SaveSummary, Slot, StagedWrites, StoreError, EOAS_DIR, PROPOSALS_DIR,
    SAFES_DIR, TRANSACTIONS_DIR,
};
use crate::ports::EntityBackend;

/// Counts of entities read by `load()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub safes: usize,
    pub eoas: usize,
    pub transactions: usize,
    pub proposals: usize,
}

/// The Entity Store.
pub struct EntityStore {
    backend: Box<dyn EntityBackend>,

    safes: Vec<Slot<Safe>>,
    eoas: Vec<Slot<Eoa>>,
    transactions: Vec<Slot<Transaction>>,
    proposals: Vec<Slot<Proposal>>,

    safe_by_address: HashMap<Address, usize>,
    safe_by_name: HashMap<String, usize>,
    eoa_by_address: HashMap<Address, usize>,
    eoa_by_name: HashMap<String, usize>,
    transaction_by_hash: HashMap<Hash, usize>,
    transactions_by_safe: HashMap<Address, BTreeSet<usize>>,
    proposal_by_hash: HashMap<Hash, usize>,
    proposal_by_parent: HashMap<(Hash, usize), usize>,
    /// Live entity files of every kind.
    by_path: HashMap<PathBuf, (EntityKind, usize)>,
}

fn remove_if<K: std::hash::Hash + Eq>(map: &mut HashMap<K, usize>, key: &K, index: usize) {
    if map.get(key) == Some(&index) {
        map.remove(key);
    }
}

fn entry<T>(slots: &[Slot<T>], index: usize) -> Option<Entry<'_, T>> {
    slots.get(index).and_then(|slot| Entry::from_slot(index, slot))
}

fn live<T>(slots: &[Slot<T>]) -> impl Iterator<Item = Entry<'_, T>> {
    slots
        .iter()
        .enumerate()
        .filter_map(|(index, slot)| Entry::from_slot(index, slot))
}

fn bounds<T>(kind: EntityKind, slots: &[Slot<T>], index: usize) -> Result<(), StoreError> {
    if index < slots.len() {
        Ok(())
    } else {
        Err(StoreError::IndexOutOfBounds {
            kind,
            index,
            len: slots.len(),
        })
    }
}

fn encode<T: Serialize>(path: &Path, entity: &T) -> Result<String, StoreError> {
    let mut content = serde_json::to_string_pretty(entity).map_err(|e| StoreError::Encode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    content.push('\n');
    Ok(content)
}

fn decode<T: DeserializeOwned>(path: &Path, content: &str) -> Result<T, StoreError> {
    serde_json::from_str(content).map_err(|e| StoreError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

impl EntityStore {
    /// Create an empty store over `backend`. Call `load()` to populate it.
    pub fn new(backend: Box<dyn EntityBackend>) -> Self {
        Self {
            backend,
            safes: Vec::new(),
            eoas: Vec::new(),
            transactions: Vec::new(),
            proposals: Vec::new(),
            safe_by_address: HashMap::new(),
            safe_by_name: HashMap::new(),
            eoa_by_address: HashMap::new(),
            eoa_by_name: HashMap::new(),
            transaction_by_hash: HashMap::new(),
            transactions_by_safe: HashMap::new(),
            proposal_by_hash: HashMap::new(),
            proposal_by_parent: HashMap::new(),
            by_path: HashMap::new(),
        }
    }

    // =========================================================================
    // LOAD
    // =========================================================================

    /// Populate the indices from every persisted entity file.
    ///
    /// Kinds load in dependency order (Safes and EOAs before the records
    /// that reference them), files in sorted path order.
    pub fn load(&mut self) -> Result<LoadSummary, StoreError> {
        let mut summary = LoadSummary::default();

        for path in self.entity_files(SAFES_DIR)? {
            let safe = self.read_entity(&path)?;
            self.create_safe(path, safe)?;
            summary.safes += 1;
        }
        for path in self.entity_files(EOAS_DIR)? {
            let eoa = self.read_entity(&path)?;
            self.create_eoa(path, eoa)?;
            summary.eoas += 1;
        }
        for path in self.entity_files(TRANSACTIONS_DIR)? {
            let tx = self.read_entity(&path)?;
            self.create_transaction(path, tx)?;
            summary.transactions += 1;
        }
        for path in self.entity_files(PROPOSALS_DIR)? {
            let proposal = self.read_entity(&path)?;
            self.create_proposal(path, proposal)?;
            summary.proposals += 1;
        }

        info!(
            safes = summary.safes,
            eoas = summary.eoas,
            transactions = summary.transactions,
            proposals = summary.proposals,
            "Entity store loaded"
        );
        Ok(summary)
    }

    fn entity_files(&self, dir: &str) -> Result<Vec<PathBuf>, StoreError> {
        let mut files: Vec<PathBuf> = self
            .backend
            .list(Path::new(dir))?
            .into_iter()
            .filter(|p| is_entity_file(p))
            .collect();
        files.sort();
        Ok(files)
    }

    fn read_entity<T: DeserializeOwned>(&self, path: &Path) -> Result<T, StoreError> {
        let content = self.backend.read(path)?.ok_or_else(|| StoreError::Decode {
            path: path.to_path_buf(),
            message: "file vanished during load".to_string(),
        })?;
        decode(path, &content)
    }

    // =========================================================================
    // VALIDATION
    // =========================================================================

    fn check_path(
        &self,
        kind: EntityKind,
        path: &Path,
        this: Option<usize>,
    ) -> Result<(), StoreError> {
        match self.by_path.get(path) {
            Some(&(k, i)) if !(k == kind && Some(i) == this) => Err(StoreError::DuplicateEntity {
                kind,
                field: "path",
                value: path.display().to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// INVARIANT-1: Safe and EOA addresses and names share one namespace.
    fn check_account_keys(
        &self,
        kind: EntityKind,
        address: &Address,
        name: &str,
        this: Option<usize>,
    ) -> Result<(), StoreError> {
        let other = |hit: Option<&usize>, hit_kind: EntityKind| {
            hit.is_some_and(|&i| !(hit_kind == kind && Some(i) == this))
        };

        if other(self.safe_by_address.get(address), EntityKind::Safe)
            || other(self.eoa_by_address.get(address), EntityKind::Eoa)
        {
            return Err(StoreError::DuplicateEntity {
                kind,
                field: "address",
                value: format!("{address:#x}"),
            });
        }
        if other(self.safe_by_name.get(name), EntityKind::Safe)
            || other(self.eoa_by_name.get(name), EntityKind::Eoa)
        {
            return Err(StoreError::DuplicateEntity {
                kind,
                field: "name",
                value: name.to_string(),
            });
        }
        Ok(())
    }

    /// INVARIANT-3
    fn require_safe(&self, kind: EntityKind, path: &Path, safe: &Address) -> Result<(), StoreError> {
        if self.safe_by_address.contains_key(safe) {
            Ok(())
        } else {
            Err(StoreError::UnknownSafe {
                kind,
                path: path.to_path_buf(),
                safe: *safe,
            })
        }
    }

    fn check_transaction(
        &self,
        path: &Path,
        tx: &Transaction,
        this: Option<usize>,
    ) -> Result<(), StoreError> {
        self.require_safe(EntityKind::Transaction, path, &tx.safe)?;
        match self.transaction_by_hash.get(&tx.safe_tx_hash) {
            Some(&i) if Some(i) != this => Err(StoreError::DuplicateEntity {
                kind: EntityKind::Transaction,
                field: "safeTxHash",
                value: format!("{:#x}", tx.safe_tx_hash),
            }),
            _ => Ok(()),
        }
    }

    fn check_proposal(
        &self,
        path: &Path,
        proposal: &Proposal,
        this: Option<usize>,
    ) -> Result<(), StoreError> {
        self.require_safe(EntityKind::Proposal, path, &proposal.safe)?;

        if let Some(hash) = proposal.safe_tx_hash {
            if matches!(self.proposal_by_hash.get(&hash), Some(&i) if Some(i) != this) {
                return Err(StoreError::DuplicateEntity {
                    kind: EntityKind::Proposal,
                    field: "safeTxHash",
                    value: format!("{hash:#x}"),
                });
            }
        }

        // INVARIANT-4
        if let Some(parent) = proposal.parent() {
            let key = (parent.hash, parent.position);
            if matches!(self.proposal_by_parent.get(&key), Some(&i) if Some(i) != this) {
                return Err(StoreError::DuplicateEntity {
                    kind: EntityKind::Proposal,
                    field: "childOf",
                    value: format!("{:#x}.{}", parent.hash, parent.position),
                });
            }
        }
        Ok(())
    }

    // =========================================================================
    // INDEXING
    // =========================================================================

    fn index_safe(&mut self, index: usize) {
        let slot = &self.safes[index];
        if let Some(safe) = &slot.entity {
            self.safe_by_address.insert(safe.address(), index);
            self.safe_by_name.insert(safe.name().to_string(), index);
            self.by_path
                .insert(slot.path.clone(), (EntityKind::Safe, index));
        }
    }

    fn unindex_safe(&mut self, index: usize) {
        let slot = &self.safes[index];
        if let Some(safe) = &slot.entity {
            remove_if(&mut self.safe_by_address, &safe.address(), index);
            remove_if(&mut self.safe_by_name, &safe.name().to_string(), index);
        }
        if self.by_path.get(&slot.path) == Some(&(EntityKind::Safe, index)) {
            self.by_path.remove(&slot.path);
        }
    }

    fn index_eoa(&mut self, index: usize) {
        let slot = &self.eoas[index];
        if let Some(eoa) = &slot.entity {
            self.eoa_by_address.insert(eoa.address, index);
            self.eoa_by_name.insert(eoa.name.clone(), index);
            self.by_path
                .insert(slot.path.clone(), (EntityKind::Eoa, index));
        }
    }

    fn index_transaction(&mut self, index: usize) {
        let slot = &self.transactions[index];
        if let Some(tx) = &slot.entity {
            if slot.bound {
                self.transaction_by_hash.insert(tx.safe_tx_hash, index);
                self.transactions_by_safe
                    .entry(tx.safe)
                    .or_default()
                    .insert(index);
            }
            self.by_path
                .insert(slot.path.clone(), (EntityKind::Transaction, index));
        }
    }

    fn unbind_transaction(&mut self, index: usize) {
        let slot = &self.transactions[index];
        if let Some(tx) = &slot.entity {
            remove_if(&mut self.transaction_by_hash, &tx.safe_tx_hash, index);
            if let Some(set) = self.transactions_by_safe.get_mut(&tx.safe) {
                set.remove(&index);
                if set.is_empty() {
                    self.transactions_by_safe.remove(&tx.safe);
                }
            }
        }
    }

    fn unindex_transaction(&mut self, index: usize) {
        self.unbind_transaction(index);
        let path = &self.transactions[index].path;
        if self.by_path.get(path) == Some(&(EntityKind::Transaction, index)) {
            self.by_path.remove(path);
        }
    }

    fn index_proposal(&mut self, index: usize) {
        let slot = &self.proposals[index];
        if let Some(proposal) = &slot.entity {
            if let Some(hash) = proposal.safe_tx_hash {
                self.proposal_by_hash.insert(hash, index);
            }
            if let Some(parent) = proposal.parent() {
                self.proposal_by_parent
                    .insert((parent.hash, parent.position), index);
            }
            self.by_path
                .insert(slot.path.clone(), (EntityKind::Proposal, index));
        }
    }

    fn unindex_proposal(&mut self, index: usize) {
        let slot = &self.proposals[index];
        if let Some(proposal) = &slot.entity {
            if let Some(hash) = proposal.safe_tx_hash {
                remove_if(&mut self.proposal_by_hash, &hash, index);
            }
            if let Some(parent) = proposal.parent() {
                remove_if(
                    &mut self.proposal_by_parent,
                    &(parent.hash, parent.position),
                    index,
                );
            }
        }
        if self.by_path.get(&slot.path) == Some(&(EntityKind::Proposal, index)) {
            self.by_path.remove(&slot.path);
        }
    }

    // =========================================================================
    // CREATE
    // =========================================================================

    pub fn create_safe(&mut self, path: PathBuf, safe: Safe) -> Result<usize, StoreError> {
        self.check_path(EntityKind::Safe, &path, None)?;
        self.check_account_keys(EntityKind::Safe, &safe.address(), safe.name(), None)?;

        debug!(safe = %format!("{:#x}", safe.address()), name = safe.name(), "Created safe");
        let index = self.safes.len();
        self.safes.push(Slot::new(path, safe));
        self.index_safe(index);
        Ok(index)
    }

    pub fn create_eoa(&mut self, path: PathBuf, eoa: Eoa) -> Result<usize, StoreError> {
        self.check_path(EntityKind::Eoa, &path, None)?;
        self.check_account_keys(EntityKind::Eoa, &eoa.address, &eoa.name, None)?;

        let index = self.eoas.len();
        self.eoas.push(Slot::new(path, eoa));
        self.index_eoa(index);
        Ok(index)
    }

    pub fn create_transaction(
        &mut self,
        path: PathBuf,
        tx: Transaction,
    ) -> Result<usize, StoreError> {
        self.check_path(EntityKind::Transaction, &path, None)?;
        self.check_transaction(&path, &tx, None)?;

        debug!(
            safe = %format!("{:#x}", tx.safe),
            nonce = tx.nonce,
            hash = %format!("{:#x}", tx.safe_tx_hash),
            "Created transaction"
        );
        let index = self.transactions.len();
        self.transactions.push(Slot::new(path, tx));
        self.index_transaction(index);
        Ok(index)
    }

    pub fn create_proposal(
        &mut self,
        path: PathBuf,
        proposal: Proposal,
    ) -> Result<usize, StoreError> {
        self.check_path(EntityKind::Proposal, &path, None)?;
        self.check_proposal(&path, &proposal, None)?;

        debug!(path = %path.display(), "Created proposal");
        let index = self.proposals.len();
        self.proposals.push(Slot::new(path, proposal));
        self.index_proposal(index);
        Ok(index)
    }

    // =========================================================================
    // WRITE
    // =========================================================================

    /// Replace the Safe in slot `index`, or mark it for deletion with `None`.
    pub fn write_safe(&mut self, index: usize, safe: Option<Safe>) -> Result<(), StoreError> {
        bounds(EntityKind::Safe, &self.safes, index)?;
        if let Some(safe) = &safe {
            self.check_path(EntityKind::Safe, &self.safes[index].path, Some(index))?;
            self.check_account_keys(EntityKind::Safe, &safe.address(), safe.name(), Some(index))?;
        }

        self.unindex_safe(index);
        self.safes[index].entity = safe;
        self.index_safe(index);
        Ok(())
    }

    /// Replace the transaction in slot `index`, or mark it for deletion with
    /// `None`. A replaced transaction is bound to the indices again.
    pub fn write_transaction(
        &mut self,
        index: usize,
        tx: Option<Transaction>,
    ) -> Result<(), StoreError> {
        bounds(EntityKind::Transaction, &self.transactions, index)?;
        if let Some(tx) = &tx {
            let path = &self.transactions[index].path;
            self.check_path(EntityKind::Transaction, path, Some(index))?;
            self.check_transaction(path, tx, Some(index))?;
        }

        let rebind = tx.is_some();
        self.unindex_transaction(index);
        let slot = &mut self.transactions[index];
        slot.entity = tx;
        slot.bound = rebind;
        self.index_transaction(index);
        Ok(())
    }

    /// Replace the proposal in slot `index`, or mark it for deletion with `None`.
    pub fn write_proposal(
        &mut self,
        index: usize,
        proposal: Option<Proposal>,
    ) -> Result<(), StoreError> {
        bounds(EntityKind::Proposal, &self.proposals, index)?;
        if let Some(proposal) = &proposal {
            let path = &self.proposals[index].path;
            self.check_path(EntityKind::Proposal, path, Some(index))?;
            self.check_proposal(path, proposal, Some(index))?;
        }

        self.unindex_proposal(index);
        self.proposals[index].entity = proposal;
        self.index_proposal(index);
        Ok(())
    }

    /// Drop a transaction from the hash and per-Safe indices while keeping
    /// its record, so a relocated copy can be created under the same hash.
    pub fn unbind(&mut self, index: usize) -> Result<(), StoreError> {
        bounds(EntityKind::Transaction, &self.transactions, index)?;
        self.unbind_transaction(index);
        self.transactions[index].bound = false;
        Ok(())
    }

    // =========================================================================
    // LOOKUPS
    // =========================================================================

    pub fn safe(&self, index: usize) -> Option<Entry<'_, Safe>> {
        entry(&self.safes, index)
    }

    pub fn safe_by_address(&self, address: &Address) -> Option<Entry<'_, Safe>> {
        self.safe_by_address
            .get(address)
            .and_then(|&i| self.safe(i))
    }

    pub fn safe_by_name(&self, name: &str) -> Option<Entry<'_, Safe>> {
        self.safe_by_name.get(name).and_then(|&i| self.safe(i))
    }

    pub fn eoa_by_address(&self, address: &Address) -> Option<Entry<'_, Eoa>> {
        self.eoa_by_address
            .get(address)
            .and_then(|&i| entry(&self.eoas, i))
    }

    pub fn eoa_by_name(&self, name: &str) -> Option<Entry<'_, Eoa>> {
        self.eoa_by_name
            .get(name)
            .and_then(|&i| entry(&self.eoas, i))
    }

    pub fn transaction(&self, index: usize) -> Option<Entry<'_, Transaction>> {
        entry(&self.transactions, index)
    }

    pub fn transaction_by_hash(&self, hash: &Hash) -> Option<Entry<'_, Transaction>> {
        self.transaction_by_hash
            .get(hash)
            .and_then(|&i| self.transaction(i))
    }

    pub fn proposal(&self, index: usize) -> Option<Entry<'_, Proposal>> {
        entry(&self.proposals, index)
    }

    pub fn proposal_by_hash(&self, hash: &Hash) -> Option<Entry<'_, Proposal>> {
        self.proposal_by_hash
            .get(hash)
            .and_then(|&i| self.proposal(i))
    }

    pub fn proposal_by_path(&self, path: &Path) -> Option<Entry<'_, Proposal>> {
        match self.by_path.get(path) {
            Some(&(EntityKind::Proposal, i)) => self.proposal(i),
            _ => None,
        }
    }

    /// The approval generated for owner `position` of the parent transaction.
    pub fn child_proposal(&self, parent_hash: &Hash, position: usize) -> Option<Entry<'_, Proposal>> {
        self.proposal_by_parent
            .get(&(*parent_hash, position))
            .and_then(|&i| self.proposal(i))
    }

    pub fn safes(&self) -> impl Iterator<Item = Entry<'_, Safe>> {
        live(&self.safes)
    }

    pub fn eoas(&self) -> impl Iterator<Item = Entry<'_, Eoa>> {
        live(&self.eoas)
    }

    pub fn transactions(&self) -> impl Iterator<Item = Entry<'_, Transaction>> {
        live(&self.transactions)
    }

    pub fn proposals(&self) -> impl Iterator<Item = Entry<'_, Proposal>> {
        live(&self.proposals)
    }

    /// Bound transactions of `safe`, in slot order.
    pub fn transactions_of(&self, safe: &Address) -> impl Iterator<Item = Entry<'_, Transaction>> {
        self.transactions_by_safe
            .get(safe)
            .into_iter()
            .flatten()
            .filter_map(|&i| self.transaction(i))
    }

    /// Highest nonce among all of `safe`'s transactions, `None` if it has none.
    pub fn highest_nonce(&self, safe: &Address) -> Option<u64> {
        self.transactions_of(safe).map(|e| e.entity.nonce).max()
    }

    /// Highest nonce among `safe`'s executed transactions.
    pub fn highest_executed_nonce(&self, safe: &Address) -> Option<u64> {
        self.transactions_of(safe)
            .filter(|e| e.entity.is_executed())
            .map(|e| e.entity.nonce)
            .max()
    }

    // =========================================================================
    // COMMIT
    // =========================================================================

    fn stage_slots<T: Serialize>(
        &self,
        slots: &[Slot<T>],
        staged: &mut StagedWrites,
    ) -> Result<(), StoreError> {
        for slot in slots {
            let previous = self.backend.read(&slot.path)?;
            match &slot.entity {
                Some(entity) => {
                    let next = encode(&slot.path, entity)?;
                    if previous.as_deref() != Some(next.as_str()) {
                        staged.stage_write(slot.path.clone(), previous, next);
                    }
                }
                None => {
                    if let Some(previous) = previous {
                        staged.stage_delete(slot.path.clone(), previous);
                    }
                }
            }
        }
        Ok(())
    }

    /// Compute the commit without applying it (INVARIANT-6).
    pub fn stage(&self) -> Result<StagedWrites, StoreError> {
        let mut staged = StagedWrites::new();
        self.stage_slots(&self.safes, &mut staged)?;
        self.stage_slots(&self.eoas, &mut staged)?;
        self.stage_slots(&self.transactions, &mut staged)?;
        self.stage_slots(&self.proposals, &mut staged)?;
        Ok(staged)
    }

    /// Line diff of every pending change against storage.
    pub fn diff(&self) -> Result<String, StoreError> {
        Ok(render_diff(&self.stage()?))
    }

    /// Write changed entities and remove deleted ones.
    pub fn save(&mut self) -> Result<SaveSummary, StoreError> {
        let staged = self.stage()?;
        self.backend.apply(&staged)?;
        let summary = staged.summary();
        info!(
            created = summary.created,
            edited = summary.edited,
            deleted = summary.deleted,
            "Entity store committed"
        );
        Ok(summary)
    }
}

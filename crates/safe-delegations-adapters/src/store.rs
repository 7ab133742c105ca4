//! Delegation repository backed by memory, optionally mirrored to a JSON file.
//!
//! The file holds a bare array of records, the same shape older exports use,
//! so a store file can be imported elsewhere as-is.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use alloy::primitives::B256;

use safe_delegations_core::{
    delegation_hash, DelegationBundle, DelegationStatus, DelegationStorePort, MergeResult,
    PortError, StoredDelegation, TimestampMs, STORE_SCHEMA_VERSION,
};

use crate::crypto::bundle_mac;
use crate::DelegationConfig;

#[derive(Debug, Clone)]
pub struct StoreAdapter {
    records: Arc<Mutex<BTreeMap<B256, StoredDelegation>>>,
    path: Option<PathBuf>,
    mac_secret: String,
    max_objects: usize,
    max_bytes: usize,
}

impl Default for StoreAdapter {
    fn default() -> Self {
        Self::in_memory(&DelegationConfig::default())
    }
}

impl StoreAdapter {
    pub fn in_memory(config: &DelegationConfig) -> Self {
        Self {
            records: Arc::new(Mutex::new(BTreeMap::new())),
            path: None,
            mac_secret: config.mac_secret.clone(),
            max_objects: config.import_max_object_count,
            max_bytes: config.import_max_bundle_bytes,
        }
    }

    /// Opens `path`, loading existing records. A missing file is an empty store.
    pub fn open(path: impl AsRef<Path>, config: &DelegationConfig) -> Result<Self, PortError> {
        let path = path.as_ref().to_owned();
        let mut records = BTreeMap::new();
        if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .map_err(|e| PortError::Transport(format!("read {}: {e}", path.display())))?;
            if !raw.trim().is_empty() {
                let bundle = DelegationBundle::from_json(&raw).map_err(|e| {
                    PortError::Validation(format!("corrupt store {}: {e}", path.display()))
                })?;
                for record in bundle.delegations {
                    records.insert(record.delegation_hash, record);
                }
            }
        }
        tracing::debug!(path = %path.display(), count = records.len(), "opened delegation store");
        Ok(Self {
            records: Arc::new(Mutex::new(records)),
            path: Some(path),
            mac_secret: config.mac_secret.clone(),
            max_objects: config.import_max_object_count,
            max_bytes: config.import_max_bundle_bytes,
        })
    }

    pub fn from_config(config: &DelegationConfig) -> Result<Self, PortError> {
        match config.store_path.as_ref() {
            Some(path) => Self::open(path, config),
            None => Ok(Self::in_memory(config)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<B256, StoredDelegation>>, PortError> {
        self.records
            .lock()
            .map_err(|_| PortError::Transport("delegation store lock poisoned".to_owned()))
    }

    fn persist(&self, records: &BTreeMap<B256, StoredDelegation>) -> Result<(), PortError> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        let list: Vec<&StoredDelegation> = records.values().collect();
        let json = serde_json::to_vec_pretty(&list)
            .map_err(|e| PortError::Validation(format!("store serialization failed: {e}")))?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| PortError::Transport(format!("write {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, path)
            .map_err(|e| PortError::Transport(format!("rename to {}: {e}", path.display())))?;
        Ok(())
    }

    /// Writes `next` to disk and only then swaps it in, so a failed write
    /// leaves both the file and memory at the previous state.
    fn commit(
        &self,
        records: &mut BTreeMap<B256, StoredDelegation>,
        next: BTreeMap<B256, StoredDelegation>,
    ) -> Result<(), PortError> {
        self.persist(&next)?;
        *records = next;
        Ok(())
    }

    pub fn len(&self) -> Result<usize, PortError> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, PortError> {
        Ok(self.lock()?.is_empty())
    }

    /// Parses and imports raw export JSON, enforcing the configured size limit.
    pub fn import_json(&self, raw: &str) -> Result<MergeResult, PortError> {
        if raw.len() > self.max_bytes {
            return Err(PortError::Validation(format!(
                "bundle is {} bytes, limit is {}",
                raw.len(),
                self.max_bytes
            )));
        }
        let bundle = DelegationBundle::from_json(raw)
            .map_err(|e| PortError::Validation(format!("bundle parse failed: {e}")))?;
        self.import_bundle(&bundle)
    }
}

fn status_rank(status: DelegationStatus) -> u8 {
    match status {
        DelegationStatus::Pending => 0,
        DelegationStatus::Signed => 1,
        DelegationStatus::Revoked | DelegationStatus::Expired => 2,
    }
}

enum Merge {
    Add,
    Update,
    Skip,
    Conflict,
}

fn classify(current: Option<&StoredDelegation>, incoming: &StoredDelegation) -> Merge {
    if delegation_hash(&incoming.delegation) != incoming.delegation_hash {
        return Merge::Conflict;
    }
    if incoming.status == DelegationStatus::Signed && !incoming.delegation.is_signed() {
        return Merge::Conflict;
    }
    let Some(current) = current else {
        return Merge::Add;
    };
    if current == incoming {
        return Merge::Skip;
    }
    let (a, b) = (&current.delegation, &incoming.delegation);
    if a.is_signed() && b.is_signed() && a.signature != b.signature {
        return Merge::Conflict;
    }
    let newer_status = status_rank(incoming.status) > status_rank(current.status);
    let same_status_newer = incoming.status == current.status
        && incoming.updated_at_ms > current.updated_at_ms;
    if !(newer_status || same_status_newer) {
        return Merge::Skip;
    }
    // A newer record must not drop a signature we already hold.
    if a.is_signed() && !b.is_signed() {
        return Merge::Conflict;
    }
    Merge::Update
}

impl DelegationStorePort for StoreAdapter {
    fn save(&self, record: &StoredDelegation) -> Result<(), PortError> {
        let mut records = self.lock()?;
        let mut next = records.clone();
        next.insert(record.delegation_hash, record.clone());
        self.commit(&mut records, next)?;
        tracing::debug!(hash = %record.delegation_hash, status = ?record.status, "saved delegation");
        Ok(())
    }

    fn get(&self, delegation_hash: B256) -> Result<Option<StoredDelegation>, PortError> {
        Ok(self.lock()?.get(&delegation_hash).cloned())
    }

    fn list(&self) -> Result<Vec<StoredDelegation>, PortError> {
        let mut out: Vec<StoredDelegation> = self.lock()?.values().cloned().collect();
        out.sort_by_key(|r| (r.created_at_ms, r.delegation_hash));
        Ok(out)
    }

    fn remove(&self, delegation_hash: B256) -> Result<bool, PortError> {
        let mut records = self.lock()?;
        if !records.contains_key(&delegation_hash) {
            return Ok(false);
        }
        let mut next = records.clone();
        next.remove(&delegation_hash);
        self.commit(&mut records, next)?;
        Ok(true)
    }

    fn update_status(
        &self,
        delegation_hash: B256,
        status: DelegationStatus,
        updated_at_ms: u64,
    ) -> Result<StoredDelegation, PortError> {
        let mut records = self.lock()?;
        let mut updated = records
            .get(&delegation_hash)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("delegation not found: {delegation_hash}")))?;
        updated.status = status;
        updated.updated_at_ms = TimestampMs(updated_at_ms);
        let mut next = records.clone();
        next.insert(delegation_hash, updated.clone());
        self.commit(&mut records, next)?;
        Ok(updated)
    }

    fn export_bundle(
        &self,
        hashes: &[B256],
        exported_at_ms: u64,
    ) -> Result<DelegationBundle, PortError> {
        let records = self.lock()?;
        let mut delegations: Vec<StoredDelegation> = if hashes.is_empty() {
            records.values().cloned().collect()
        } else {
            hashes
                .iter()
                .map(|h| {
                    records
                        .get(h)
                        .cloned()
                        .ok_or_else(|| PortError::NotFound(format!("delegation not found: {h}")))
                })
                .collect::<Result<_, _>>()?
        };
        delegations.sort_by_key(|r| (r.created_at_ms, r.delegation_hash));
        let integrity_mac = Some(bundle_mac(&self.mac_secret, &delegations)?);
        Ok(DelegationBundle {
            schema_version: STORE_SCHEMA_VERSION,
            exported_at_ms: TimestampMs(exported_at_ms),
            delegations,
            integrity_mac,
        })
    }

    fn import_bundle(&self, bundle: &DelegationBundle) -> Result<MergeResult, PortError> {
        if bundle.schema_version != STORE_SCHEMA_VERSION {
            return Err(PortError::Validation(format!(
                "unsupported bundle schema version {}",
                bundle.schema_version
            )));
        }
        if bundle.delegations.len() > self.max_objects {
            return Err(PortError::Validation(format!(
                "bundle holds {} delegations, limit is {}",
                bundle.delegations.len(),
                self.max_objects
            )));
        }
        if let Some(expected) = bundle.integrity_mac {
            let actual = bundle_mac(&self.mac_secret, &bundle.delegations)?;
            if actual != expected {
                return Err(PortError::Validation("bundle integrity mac mismatch".to_owned()));
            }
        }

        let mut records = self.lock()?;
        let mut next = records.clone();
        let mut merge = MergeResult::empty();
        for incoming in &bundle.delegations {
            if incoming.schema_version != STORE_SCHEMA_VERSION {
                merge.conflicted += 1;
                continue;
            }
            match classify(next.get(&incoming.delegation_hash), incoming) {
                Merge::Add => {
                    next.insert(incoming.delegation_hash, incoming.clone());
                    merge.added += 1;
                }
                Merge::Update => {
                    next.insert(incoming.delegation_hash, incoming.clone());
                    merge.updated += 1;
                }
                Merge::Skip => merge.skipped += 1,
                Merge::Conflict => merge.conflicted += 1,
            }
        }
        if merge.added + merge.updated > 0 {
            self.commit(&mut records, next)?;
        }
        tracing::info!(
            added = merge.added,
            updated = merge.updated,
            skipped = merge.skipped,
            conflicted = merge.conflicted,
            "imported delegation bundle"
        );
        Ok(merge)
    }
}

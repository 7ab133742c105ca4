mod common;

use alloy::primitives::{Address, B256, U256};

use safe_delegations_adapters::{encode_share_payload, DelegationConfig, StoreAdapter};
use safe_delegations_core::{
    delegation_hash, Caveat, Delegation, DelegationBundle, DelegationCommand, DelegationStatus,
    DelegationStorePort, PortError, ScopeType, StoredDelegation, TimestampMs, ROOT_AUTHORITY,
};

use common::{config, grantee, new_orchestrator, new_orchestrator_with, safe_address, usdc_weekly};

fn record(salt: u64, status: DelegationStatus, updated_at_ms: u64) -> StoredDelegation {
    let mut delegation = Delegation {
        delegate: Address::repeat_byte(0x22),
        delegator: Address::repeat_byte(0x11),
        authority: ROOT_AUTHORITY,
        caveats: vec![Caveat::new(Address::repeat_byte(0xaa), vec![0u8; 32])],
        salt: U256::from(salt),
        signature: Default::default(),
    };
    if status != DelegationStatus::Pending {
        delegation = delegation.with_signature(vec![0x5a; 65]);
    }
    let hash = delegation_hash(&delegation);
    StoredDelegation {
        schema_version: 1,
        id: hash.to_string(),
        label: format!("grant {salt}"),
        scope_type: ScopeType::SpendingLimit,
        chain_id: 8453,
        status,
        delegation,
        delegation_hash: hash,
        parent_hash: None,
        amounts: vec![],
        created_at_ms: TimestampMs(1),
        updated_at_ms: TimestampMs(updated_at_ms),
    }
}

fn bundle(delegations: Vec<StoredDelegation>) -> DelegationBundle {
    DelegationBundle {
        schema_version: 1,
        exported_at_ms: TimestampMs(10),
        delegations,
        integrity_mac: None,
    }
}

#[test]
fn import_merges_by_delegation_hash() {
    let store = StoreAdapter::in_memory(&config());
    store
        .save(&record(1, DelegationStatus::Pending, 1))
        .expect("seed pending");
    store
        .save(&record(2, DelegationStatus::Signed, 5))
        .expect("seed signed");

    let merge = store
        .import_bundle(&bundle(vec![
            // signed beats pending
            record(1, DelegationStatus::Signed, 2),
            // identical
            record(2, DelegationStatus::Signed, 5),
            // new
            record(3, DelegationStatus::Pending, 1),
        ]))
        .expect("import");
    assert_eq!(merge.added, 1);
    assert_eq!(merge.updated, 1);
    assert_eq!(merge.skipped, 1);
    assert_eq!(merge.conflicted, 0);

    let upgraded = store
        .get(record(1, DelegationStatus::Pending, 1).delegation_hash)
        .expect("get")
        .expect("present");
    assert_eq!(upgraded.status, DelegationStatus::Signed);
    assert_eq!(store.len().expect("len"), 3);
}

#[test]
fn import_never_downgrades_status() {
    let store = StoreAdapter::in_memory(&config());
    let signed = record(1, DelegationStatus::Signed, 9);
    store.save(&signed).expect("seed");

    let mut stale = record(1, DelegationStatus::Signed, 9);
    stale.status = DelegationStatus::Pending;
    stale.updated_at_ms = TimestampMs(100);
    let merge = store.import_bundle(&bundle(vec![stale])).expect("import");
    assert_eq!(merge.skipped, 1);
    assert_eq!(
        store
            .get(signed.delegation_hash)
            .expect("get")
            .expect("present")
            .status,
        DelegationStatus::Signed
    );
}

#[test]
fn import_flags_conflicting_content() {
    let store = StoreAdapter::in_memory(&config());
    let original = record(1, DelegationStatus::Signed, 1);
    store.save(&original).expect("seed");

    let mut other_signature = original.clone();
    other_signature.delegation.signature = vec![0x6b; 65].into();
    other_signature.updated_at_ms = TimestampMs(50);

    let mut wrong_hash = record(2, DelegationStatus::Pending, 1);
    wrong_hash.delegation_hash = B256::repeat_byte(0x99);

    let merge = store
        .import_bundle(&bundle(vec![other_signature, wrong_hash]))
        .expect("import");
    assert_eq!(merge.conflicted, 2);
    assert_eq!(merge.added + merge.updated, 0);
    assert_eq!(
        store
            .get(original.delegation_hash)
            .expect("get")
            .expect("present"),
        original
    );
}

#[test]
fn import_never_drops_a_held_signature() {
    let store = StoreAdapter::in_memory(&config());
    let pending = record(1, DelegationStatus::Pending, 1);
    let signed = record(2, DelegationStatus::Signed, 1);
    store.save(&pending).expect("seed pending");
    store.save(&signed).expect("seed signed");

    // Revoking a never-signed delegation is legitimate.
    let mut revoked_pending = pending.clone();
    revoked_pending.status = DelegationStatus::Revoked;
    revoked_pending.updated_at_ms = TimestampMs(50);

    let mut signature_dropped = signed.clone();
    signature_dropped.delegation.signature = Default::default();
    signature_dropped.status = DelegationStatus::Revoked;
    signature_dropped.updated_at_ms = TimestampMs(50);

    let mut signed_without_signature = record(3, DelegationStatus::Pending, 1);
    signed_without_signature.status = DelegationStatus::Signed;

    let merge = store
        .import_bundle(&bundle(vec![
            revoked_pending,
            signature_dropped,
            signed_without_signature,
        ]))
        .expect("import");
    assert_eq!(merge.updated, 1);
    assert_eq!(merge.conflicted, 2);
    assert_eq!(merge.added, 0);

    assert_eq!(
        store
            .get(signed.delegation_hash)
            .expect("get")
            .expect("present"),
        signed
    );
    assert_eq!(
        store
            .get(pending.delegation_hash)
            .expect("get")
            .expect("present")
            .status,
        DelegationStatus::Revoked
    );
    assert_eq!(store.len().expect("len"), 2);
}

#[test]
fn import_rejects_unknown_schema_and_oversized_bundles() {
    let cfg = DelegationConfig {
        import_max_object_count: 1,
        import_max_bundle_bytes: 64,
        ..config()
    };
    let store = StoreAdapter::in_memory(&cfg);

    let mut future = bundle(vec![]);
    future.schema_version = 2;
    assert!(matches!(
        store.import_bundle(&future),
        Err(PortError::Validation(_))
    ));

    let too_many = bundle(vec![
        record(1, DelegationStatus::Pending, 1),
        record(2, DelegationStatus::Pending, 1),
    ]);
    let err = store.import_bundle(&too_many).expect_err("object limit");
    assert!(err.to_string().contains("limit"));

    let raw = serde_json::to_string(&bundle(vec![record(1, DelegationStatus::Pending, 1)]))
        .expect("serialize");
    let err = store.import_json(&raw).expect_err("byte limit");
    assert!(err.to_string().contains("bytes"));
}

#[test]
fn export_then_import_into_fresh_store_round_trips() {
    let source = new_orchestrator();
    let created = source
        .handle(DelegationCommand::Create {
            scope: usdc_weekly(None),
            delegator: safe_address(),
            delegate: grantee(),
            label: "weekly usdc".to_owned(),
        })
        .expect("create")
        .record
        .expect("record");

    let exported = source
        .handle(DelegationCommand::Export { hashes: vec![] })
        .expect("export")
        .bundle
        .expect("bundle");
    assert!(exported.integrity_mac.is_some());
    assert_eq!(exported.delegations, vec![created.clone()]);

    let target = new_orchestrator();
    let merge = target
        .handle(DelegationCommand::Import {
            bundle: exported.clone(),
        })
        .expect("import")
        .merge
        .expect("merge");
    assert_eq!(merge.added, 1);

    let merge = target
        .handle(DelegationCommand::Import { bundle: exported })
        .expect("import again")
        .merge
        .expect("merge");
    assert_eq!(merge.skipped, 1);
    assert_eq!(
        target
            .store
            .get(created.delegation_hash)
            .expect("get")
            .expect("present"),
        created
    );
}

#[test]
fn tampered_export_fails_integrity_check() {
    let source = new_orchestrator();
    source
        .handle(DelegationCommand::Create {
            scope: usdc_weekly(None),
            delegator: safe_address(),
            delegate: grantee(),
            label: "weekly usdc".to_owned(),
        })
        .expect("create");
    let mut exported = source
        .store
        .export_bundle(&[], 42)
        .expect("export");
    exported.delegations[0].label = "renamed in transit".to_owned();

    let err = StoreAdapter::in_memory(&config())
        .import_bundle(&exported)
        .expect_err("mac mismatch");
    assert!(err.to_string().contains("integrity"));
}

#[test]
fn export_of_unknown_hash_is_not_found() {
    let store = StoreAdapter::in_memory(&config());
    let err = store
        .export_bundle(&[B256::repeat_byte(0x42)], 1)
        .expect_err("missing");
    assert!(matches!(err, PortError::NotFound(_)));
}

#[test]
fn legacy_array_and_share_payload_import() {
    let store = StoreAdapter::in_memory(&config());
    let legacy = serde_json::to_string(&vec![record(1, DelegationStatus::Signed, 3)])
        .expect("legacy json");
    let merge = store.import_json(&legacy).expect("legacy import");
    assert_eq!(merge.added, 1);

    let shared = StoreAdapter::in_memory(&config());
    let payload = encode_share_payload(&bundle(vec![record(2, DelegationStatus::Pending, 1)]))
        .expect("encode payload");
    assert!(!payload.contains('='));
    let merge = shared.import_share_payload(&payload).expect("share import");
    assert_eq!(merge.added, 1);
}

#[test]
fn file_store_persists_across_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("delegations.json");
    let cfg = config();

    let hash = {
        let orch = new_orchestrator_with(StoreAdapter::open(&path, &cfg).expect("open"));
        let created = orch
            .handle(DelegationCommand::Create {
                scope: usdc_weekly(None),
                delegator: safe_address(),
                delegate: grantee(),
                label: "weekly usdc".to_owned(),
            })
            .expect("create")
            .record
            .expect("record");
        orch.handle(DelegationCommand::UpdateStatus {
            delegation_hash: created.delegation_hash,
            status: DelegationStatus::Revoked,
        })
        .expect("revoke pending");
        created.delegation_hash
    };

    let reopened = StoreAdapter::open(&path, &cfg).expect("reopen");
    let stored = reopened.get(hash).expect("get").expect("persisted");
    assert_eq!(stored.status, DelegationStatus::Revoked);
    assert!(!path.with_extension("json.tmp").exists());

    let raw = std::fs::read_to_string(&path).expect("read store file");
    let legacy: Vec<StoredDelegation> = serde_json::from_str(&raw).expect("bare array");
    assert_eq!(legacy.len(), 1);

    assert!(reopened.remove(hash).expect("remove"));
    assert!(StoreAdapter::open(&path, &cfg)
        .expect("reopen empty")
        .is_empty()
        .expect("is_empty"));
}

#[test]
fn failed_file_write_leaves_store_unchanged() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("delegations.json");
    let store = StoreAdapter::open(&path, &config()).expect("open");
    let kept = record(1, DelegationStatus::Pending, 1);
    store.save(&kept).expect("seed");
    let on_disk = std::fs::read_to_string(&path).expect("read store file");

    // A directory at the temp path makes every write fail.
    std::fs::create_dir(path.with_extension("json.tmp")).expect("block temp file");

    let err = store
        .save(&record(2, DelegationStatus::Pending, 1))
        .expect_err("save must fail");
    assert!(matches!(err, PortError::Transport(_)));
    assert!(store.remove(kept.delegation_hash).is_err());
    assert!(store
        .update_status(kept.delegation_hash, DelegationStatus::Revoked, 99)
        .is_err());
    assert!(store
        .import_bundle(&bundle(vec![record(3, DelegationStatus::Pending, 1)]))
        .is_err());

    assert_eq!(store.len().expect("len"), 1);
    assert_eq!(
        store
            .get(kept.delegation_hash)
            .expect("get")
            .expect("present"),
        kept
    );
    assert_eq!(
        std::fs::read_to_string(&path).expect("read store file"),
        on_disk
    );
}

#[test]
fn corrupt_store_file_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("delegations.json");
    std::fs::write(&path, "{ not json").expect("write garbage");
    let err = StoreAdapter::open(&path, &config()).expect_err("corrupt");
    assert!(err.to_string().contains("corrupt store"));
}

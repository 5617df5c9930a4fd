// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use origin_guard_core::application::backfill::{BackfillOutcome, OriginBackfill};
use origin_guard_core::domain::provenance::SkipReason;
use origin_guard_core::domain::repository::{RepositoryError, VolumeLister, VolumeStore};
use origin_guard_core::domain::volume::{Volume, DEFAULT_TARGET_DRIVER};
use origin_guard_core::infrastructure::InMemoryVolumeRepository;

fn backfill_over(repo: &Arc<InMemoryVolumeRepository>) -> OriginBackfill {
    OriginBackfill::new(DEFAULT_TARGET_DRIVER, repo.clone(), repo.clone())
}

fn exa(name: &str) -> Volume {
    Volume::new(name).with_csi(DEFAULT_TARGET_DRIVER, "cfgA:h:/vol1")
}

#[tokio::test]
async fn test_backfill_bound_volume() {
    let repo = Arc::new(InMemoryVolumeRepository::with_volumes([
        exa("pv-1").with_claim("tenant1", "data"),
    ]));

    let outcome = backfill_over(&repo).reconcile("pv-1").await.unwrap();

    assert_eq!(outcome, BackfillOutcome::Backfilled { namespace: "tenant1".to_string() });
    let stored = repo.get("pv-1").await.unwrap().unwrap();
    assert_eq!(stored.origin(), Some("tenant1"));
}

#[tokio::test]
async fn test_backfill_missing_volume() {
    let repo = Arc::new(InMemoryVolumeRepository::new());
    let outcome = backfill_over(&repo).reconcile("ghost").await.unwrap();
    assert_eq!(outcome, BackfillOutcome::NotFound);
}

#[tokio::test]
async fn test_backfill_leaves_existing_origin() {
    let repo = Arc::new(InMemoryVolumeRepository::with_volumes([
        exa("pv-1").with_origin("tenant1").with_claim("tenant2", "data"),
    ]));

    let outcome = backfill_over(&repo).reconcile("pv-1").await.unwrap();

    assert_eq!(outcome, BackfillOutcome::Unchanged { origin: "tenant1".to_string() });
    let stored = repo.get("pv-1").await.unwrap().unwrap();
    assert_eq!(stored.origin(), Some("tenant1"));
}

#[tokio::test]
async fn test_backfill_unbound_and_skipped() {
    let repo = Arc::new(InMemoryVolumeRepository::with_volumes([
        exa("pv-unbound"),
        exa("pv-empty-ns").with_claim("", "pending"),
        exa("pv-deleting")
            .with_claim("tenant1", "data")
            .marked_for_deletion(Utc::now()),
        Volume::new("pv-nfs")
            .with_csi("nfs.csi.k8s.io", "a:/b")
            .with_claim("tenant1", "data"),
    ]));
    let backfill = backfill_over(&repo);

    assert_eq!(backfill.reconcile("pv-unbound").await.unwrap(), BackfillOutcome::Unbound);
    assert_eq!(backfill.reconcile("pv-empty-ns").await.unwrap(), BackfillOutcome::Unbound);
    assert_eq!(
        backfill.reconcile("pv-deleting").await.unwrap(),
        BackfillOutcome::Skipped { reason: SkipReason::BeingDeleted }
    );
    assert_eq!(
        backfill.reconcile("pv-nfs").await.unwrap(),
        BackfillOutcome::Skipped { reason: SkipReason::ForeignDriver }
    );

    for name in ["pv-unbound", "pv-empty-ns", "pv-deleting", "pv-nfs"] {
        assert!(repo.get(name).await.unwrap().unwrap().origin().is_none(), "{name} was modified");
    }
}

#[tokio::test]
async fn test_reconcile_all_summary() {
    let repo = Arc::new(InMemoryVolumeRepository::with_volumes([
        exa("pv-bound-1").with_claim("tenant1", "a"),
        exa("pv-bound-2").with_claim("tenant2", "b"),
        exa("pv-annotated").with_origin("tenant3").with_claim("tenant3", "c"),
        exa("pv-unbound"),
        Volume::new("pv-nfs")
            .with_csi("nfs.csi.k8s.io", "a:/b")
            .with_claim("tenant1", "data"),
    ]));

    let mut summary = backfill_over(&repo).reconcile_all().await.unwrap();
    summary.backfilled.sort();

    assert_eq!(summary.backfilled, vec!["pv-bound-1", "pv-bound-2"]);
    assert_eq!(summary.unchanged, 1);
    assert_eq!(summary.unbound, vec!["pv-unbound"]);
    assert_eq!(summary.skipped, 0);
    assert!(summary.failed.is_empty());

    assert!(repo.get("pv-nfs").await.unwrap().unwrap().origin().is_none());
}

/// Store whose writes always conflict
struct ConflictingStore {
    inner: InMemoryVolumeRepository,
}

#[async_trait]
impl VolumeStore for ConflictingStore {
    async fn get(&self, name: &str) -> Result<Option<Volume>, RepositoryError> {
        self.inner.get(name).await
    }

    async fn update_annotations(&self, volume: &Volume) -> Result<(), RepositoryError> {
        Err(RepositoryError::Conflict(volume.name().to_string()))
    }
}

#[async_trait]
impl VolumeLister for ConflictingStore {
    async fn list_by_driver(&self, driver: &str) -> Result<Vec<Volume>, RepositoryError> {
        self.inner.list_by_driver(driver).await
    }
}

#[tokio::test]
async fn test_reconcile_all_continues_past_failures() {
    let store = Arc::new(ConflictingStore {
        inner: InMemoryVolumeRepository::with_volumes([
            exa("pv-bound").with_claim("tenant1", "a"),
            exa("pv-annotated").with_origin("tenant2"),
        ]),
    });
    let backfill = OriginBackfill::new(DEFAULT_TARGET_DRIVER, store.clone(), store.clone());

    let summary = backfill.reconcile_all().await.unwrap();

    assert!(summary.backfilled.is_empty());
    assert_eq!(summary.unchanged, 1);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, "pv-bound");

    let err = backfill.reconcile("pv-bound").await.unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));
}

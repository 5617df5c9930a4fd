// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Constants
// ============================================================================

/// Reserved annotation recording which tenant namespace owns a volume
pub const ORIGIN_ANNOTATION: &str = "origin";

/// CSI driver whose volumes are governed by default
pub const DEFAULT_TARGET_DRIVER: &str = "exa.csi.ddn.com";

// ============================================================================
// Value Objects
// ============================================================================

/// Subset of Kubernetes `ObjectMeta` the provenance engine reads or writes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,

    /// `None` when the object carries no annotation map at all. The
    /// admission layer needs this distinction to build a valid JSON patch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<HashMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

/// CSI volume source (`spec.csi`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsiVolumeSource {
    pub driver: String,

    /// Composite identifier, e.g. `exa1:10.0.0.1@tcp;10.0.0.2@tcp;/testfs:/mnt:/app-data`
    #[serde(default)]
    pub volume_handle: String,
}

/// Binding to a tenant-scoped claim (`spec.claimRef`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimReference {
    #[serde(default)]
    pub namespace: String,

    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csi: Option<CsiVolumeSource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_ref: Option<ClaimReference>,
}

// ============================================================================
// Entity: Volume
// ============================================================================

/// Snapshot of a `PersistentVolume`.
///
/// Decodes straight from the Kubernetes JSON representation; fields the
/// engine does not care about are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: VolumeSpec,
}

impl Volume {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta {
                name: name.into(),
                ..ObjectMeta::default()
            },
            spec: VolumeSpec::default(),
        }
    }

    /// Attach a CSI source
    pub fn with_csi(mut self, driver: impl Into<String>, volume_handle: impl Into<String>) -> Self {
        self.spec.csi = Some(CsiVolumeSource {
            driver: driver.into(),
            volume_handle: volume_handle.into(),
        });
        self
    }

    /// Bind to a claim
    pub fn with_claim(mut self, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        self.spec.claim_ref = Some(ClaimReference {
            namespace: namespace.into(),
            name: name.into(),
        });
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata
            .annotations
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_origin(self, namespace: impl Into<String>) -> Self {
        self.with_annotation(ORIGIN_ANNOTATION, namespace)
    }

    pub fn marked_for_deletion(mut self, at: DateTime<Utc>) -> Self {
        self.metadata.deletion_timestamp = Some(at);
        self
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata
            .annotations
            .as_ref()
            .and_then(|annotations| annotations.get(key))
            .map(String::as_str)
    }

    /// Current provenance, if assigned
    pub fn origin(&self) -> Option<&str> {
        self.annotation(ORIGIN_ANNOTATION)
    }

    pub fn is_being_deleted(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    pub fn driver(&self) -> Option<&str> {
        self.spec.csi.as_ref().map(|csi| csi.driver.as_str())
    }

    pub fn is_driven_by(&self, driver: &str) -> bool {
        self.driver() == Some(driver)
    }

    /// Composite identifier; `None` when absent or empty
    pub fn volume_handle(&self) -> Option<&str> {
        self.spec
            .csi
            .as_ref()
            .map(|csi| csi.volume_handle.as_str())
            .filter(|handle| !handle.is_empty())
    }

    pub fn claim_ref(&self) -> Option<&ClaimReference> {
        self.spec.claim_ref.as_ref()
    }

    /// Namespace of the bound claim. A claim reference with an empty
    /// namespace counts as no binding.
    pub fn bound_namespace(&self) -> Option<&str> {
        self.claim_ref()
            .map(|claim| claim.namespace.as_str())
            .filter(|namespace| !namespace.is_empty())
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Write the provenance annotation, creating the annotation map if needed.
    ///
    /// Callers are responsible for the set-once rule; see
    /// `ProvenanceDefaulter` and `ProvenanceValidator`.
    pub fn set_origin(&mut self, namespace: impl Into<String>) {
        self.metadata
            .annotations
            .get_or_insert_with(HashMap::new)
            .insert(ORIGIN_ANNOTATION.to_string(), namespace.into());
    }
}

/// `PersistentVolumeList` body returned by the API server
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VolumeList {
    #[serde(default)]
    pub items: Vec<Volume>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const PV_JSON: &str = r#"{
        "apiVersion": "v1",
        "kind": "PersistentVolume",
        "metadata": {
            "name": "pv-shared-data",
            "resourceVersion": "4711",
            "annotations": {
                "pv.kubernetes.io/provisioned-by": "exa.csi.ddn.com"
            },
            "finalizers": ["kubernetes.io/pv-protection"]
        },
        "spec": {
            "capacity": { "storage": "10Gi" },
            "accessModes": ["ReadWriteMany"],
            "csi": {
                "driver": "exa.csi.ddn.com",
                "volumeHandle": "exa1:192.168.2.103@tcp;192.168.2.102@tcp;/testfs:/mnt:/nginx-persistent"
            },
            "claimRef": {
                "kind": "PersistentVolumeClaim",
                "namespace": "tenant-a",
                "name": "shared-data"
            }
        }
    }"#;

    #[test]
    fn test_decode_kubernetes_object() {
        let volume: Volume = serde_json::from_str(PV_JSON).unwrap();

        assert_eq!(volume.name(), "pv-shared-data");
        assert_eq!(volume.driver(), Some("exa.csi.ddn.com"));
        assert_eq!(volume.bound_namespace(), Some("tenant-a"));
        assert_eq!(volume.metadata.resource_version.as_deref(), Some("4711"));
        assert!(volume.origin().is_none());
        assert!(!volume.is_being_deleted());
    }

    #[test]
    fn test_decode_minimal_object() {
        let volume: Volume = serde_json::from_str(r#"{"metadata":{"name":"pv-1"}}"#).unwrap();
        assert_eq!(volume.name(), "pv-1");
        assert!(volume.driver().is_none());
        assert!(volume.volume_handle().is_none());
        assert!(volume.metadata.annotations.is_none());
    }

    #[test]
    fn test_empty_claim_namespace_is_not_a_binding() {
        let volume = Volume::new("pv-1").with_claim("", "claim");
        assert!(volume.claim_ref().is_some());
        assert!(volume.bound_namespace().is_none());
    }

    #[test]
    fn test_empty_volume_handle_is_absent() {
        let volume = Volume::new("pv-1").with_csi(DEFAULT_TARGET_DRIVER, "");
        assert!(volume.volume_handle().is_none());
        assert!(volume.is_driven_by(DEFAULT_TARGET_DRIVER));
    }

    #[test]
    fn test_set_origin_creates_annotation_map() {
        let mut volume = Volume::new("pv-1");
        assert!(volume.metadata.annotations.is_none());

        volume.set_origin("tenant-b");
        assert_eq!(volume.origin(), Some("tenant-b"));
    }

    #[test]
    fn test_set_origin_keeps_other_annotations() {
        let mut volume = Volume::new("pv-1").with_annotation("team", "storage");
        volume.set_origin("tenant-b");

        assert_eq!(volume.annotation("team"), Some("storage"));
        assert_eq!(volume.origin(), Some("tenant-b"));
    }

    #[test]
    fn test_deletion_flag() {
        let volume = Volume::new("pv-1").marked_for_deletion(Utc::now());
        assert!(volume.is_being_deleted());
    }
}

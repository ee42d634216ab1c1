//! Pod and owner name normalization.
//!
//! Controllers append generated suffixes to the names of the pods they
//! create. Masking those suffixes turns a pod name into a template name that
//! is stable across replicas, nodes and rollouts.

use crate::types::OwnerKind;

pub const HOSTNAME_PLACEHOLDER: &str = "HOSTNAME";

const POD_HASH_MASK: &str = "XXXXX";
const TEMPLATE_HASH_MASK: &str = "XXXXXXXXXX";

/// Guard pods carry the node name but have no owner reference.
const GUARD_POD_PREFIXES: &[&str] = &[
    "etcd-guard",
    "kube-apiserver-guard",
    "kube-controller-manager-guard",
    "openshift-kube-scheduler-guard",
];

/// Replace the hyphen segment `from_end` positions from the end (1 = last).
///
/// Names with fewer segments than required are returned unchanged.
fn mask_segment(name: &str, from_end: usize, mask: &str) -> String {
    let mut segments: Vec<&str> = name.split('-').collect();
    if segments.len() < from_end {
        return name.to_string();
    }
    let idx = segments.len() - from_end;
    segments[idx] = mask;
    segments.join("-")
}

fn replace_hostname(name: &str, node_name: &str) -> String {
    if node_name.is_empty() {
        return name.to_string();
    }
    name.replace(node_name, HOSTNAME_PLACEHOLDER)
}

/// Compute the template name of a pod from its raw name, owner kind and node.
pub fn normalize_pod_name(name: &str, owner_kind: Option<&OwnerKind>, node_name: &str) -> String {
    match owner_kind {
        Some(OwnerKind::DaemonSet | OwnerKind::CatalogSource) => {
            mask_segment(name, 1, POD_HASH_MASK)
        }
        Some(OwnerKind::ReplicaSet | OwnerKind::Job) => {
            if name.split('-').count() < 2 {
                return name.to_string();
            }
            let masked = mask_segment(name, 2, TEMPLATE_HASH_MASK);
            mask_segment(&masked, 1, POD_HASH_MASK)
        }
        Some(OwnerKind::StatefulSet) => {
            let mut chars = name.chars();
            if chars.next_back().is_none() {
                return String::new();
            }
            format!("{}X", chars.as_str())
        }
        Some(OwnerKind::Node) => replace_hostname(name, node_name),
        Some(OwnerKind::ConfigMap) => {
            let replaced = replace_hostname(name, node_name);
            mask_segment(&replaced, 2, "X")
        }
        _ if GUARD_POD_PREFIXES.iter().any(|p| name.starts_with(p)) => {
            replace_hostname(name, node_name)
        }
        _ => name.to_string(),
    }
}

/// Compute the stable name of a pod's owner.
pub fn normalize_owner_name(owner_kind: &OwnerKind, owner_name: &str) -> String {
    match owner_kind {
        OwnerKind::ReplicaSet | OwnerKind::Job => mask_segment(owner_name, 1, TEMPLATE_HASH_MASK),
        OwnerKind::Node => HOSTNAME_PLACEHOLDER.to_string(),
        _ => owner_name.to_string(),
    }
}

//! Owner classification and the "number of pods" decision table.

use crate::kubernetes::Inventory;
use crate::types::{OwnerInfo, OwnerKind};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

const CONTROL_PLANE_NAMESPACES: &[&str] = &[
    "openshift-etcd",
    "openshift-kube-apiserver",
    "openshift-kube-controller-manager",
    "openshift-kube-scheduler",
];

const INFRA_NAMESPACES: &[&str] = &[
    "openshift-kni-infra",
    "openshift-nutanix-infra",
    "openshift-openstack-infra",
    "openshift-ovirt-infra",
    "openshift-vsphere-infra",
];

/// (selector key, selector value, label), checked in order.
const DAEMONSET_SELECTOR_RULES: &[(&str, &str, &str)] = &[
    ("node-role.kubernetes.io/master", "", "# of masters"),
    ("node-role.kubernetes.io/worker", "", "# of workers"),
    ("kubernetes.io/os", "linux", "# of linux nodes"),
    ("beta.kubernetes.io/os", "linux", "# of linux nodes"),
];

const UNKNOWN_SELECTOR_LABEL: &str = "unknown";

enum Label {
    Fixed(&'static str),
    ByPrefix {
        prefix: &'static str,
        matched: &'static str,
        otherwise: &'static str,
    },
}

impl Label {
    fn render(&self, pod_name: &str) -> &'static str {
        match self {
            Label::Fixed(label) => *label,
            Label::ByPrefix {
                prefix,
                matched,
                otherwise,
            } => {
                if pod_name.starts_with(*prefix) {
                    *matched
                } else {
                    *otherwise
                }
            }
        }
    }
}

struct NamespaceRule {
    owner: OwnerKind,
    namespaces: &'static [&'static str],
    label: Label,
}

static NAMESPACE_RULES: [NamespaceRule; 3] = [
    NamespaceRule {
        owner: OwnerKind::Node,
        namespaces: CONTROL_PLANE_NAMESPACES,
        label: Label::Fixed("Static Pod on masters"),
    },
    NamespaceRule {
        owner: OwnerKind::ConfigMap,
        namespaces: CONTROL_PLANE_NAMESPACES,
        label: Label::Fixed("Pod for maintaining Static Pod"),
    },
    NamespaceRule {
        owner: OwnerKind::Node,
        namespaces: INFRA_NAMESPACES,
        label: Label::ByPrefix {
            prefix: "haproxy",
            matched: "Static Pod on masters",
            otherwise: "Static Pod on masters and workers",
        },
    },
];

/// Resolves owner details against the loaded inventory.
pub struct Enricher<'a> {
    inventory: &'a Inventory,
    strict: bool,
}

impl<'a> Enricher<'a> {
    pub fn new(inventory: &'a Inventory, strict: bool) -> Self {
        Self { inventory, strict }
    }

    fn substitute(&self, problem: String, fallback: String) -> anyhow::Result<String> {
        if self.strict {
            anyhow::bail!(problem);
        }
        warn!("{}, using '{}'", problem, fallback);
        Ok(fallback)
    }

    /// Render the owner kind, adding the grand-owner kind for ReplicaSets and Jobs.
    pub fn classify_owner(&self, owner: &OwnerInfo, namespace: &str) -> anyhow::Result<String> {
        debug!(
            "Classifying owner {}/{} in namespace {}",
            owner.kind, owner.name, namespace
        );
        if !matches!(owner.kind, OwnerKind::ReplicaSet | OwnerKind::Job) {
            return Ok(owner.kind.to_string());
        }

        let Some(record) = self
            .inventory
            .find(owner.kind.as_str(), namespace, &owner.name)
        else {
            return self.substitute(
                format!("{} {}/{} not found", owner.kind, namespace, owner.name),
                owner.kind.to_string(),
            );
        };

        let grand_owner = record
            .pointer("/metadata/ownerReferences/0/kind")
            .and_then(Value::as_str);
        Ok(match grand_owner {
            Some(kind) => format!("{} ({})", owner.kind, kind),
            None => owner.kind.to_string(),
        })
    }

    /// Describe how many pods of this template exist in the cluster.
    pub fn pod_count_label(
        &self,
        node_selector: Option<&BTreeMap<String, String>>,
        owner: &OwnerInfo,
        pod_name: &str,
        namespace: &str,
    ) -> anyhow::Result<String> {
        if owner.kind == OwnerKind::DaemonSet {
            return Ok(daemonset_label(node_selector).to_string());
        }

        if let Some(rule) = NAMESPACE_RULES
            .iter()
            .find(|r| r.owner == owner.kind && r.namespaces.contains(&namespace))
        {
            return Ok(rule.label.render(pod_name).to_string());
        }

        if matches!(owner.kind, OwnerKind::CatalogSource | OwnerKind::Job) {
            return Ok(String::new());
        }

        let replicas = self
            .inventory
            .find(owner.kind.as_str(), namespace, &owner.name)
            .map(|record| record.pointer("/spec/replicas").and_then(Value::as_i64));
        match replicas {
            Some(Some(n)) => Ok(format!("replicas={}", n)),
            Some(None) => Ok("replicas=unknown".to_string()),
            None => self.substitute(
                format!(
                    "{} {}/{} not found for replica count",
                    owner.kind, namespace, owner.name
                ),
                "replicas=unknown".to_string(),
            ),
        }
    }
}

fn daemonset_label(node_selector: Option<&BTreeMap<String, String>>) -> &'static str {
    let Some(selector) = node_selector else {
        return UNKNOWN_SELECTOR_LABEL;
    };
    DAEMONSET_SELECTOR_RULES
        .iter()
        .find(|(key, value, _)| selector.get(*key).map(String::as_str) == Some(*value))
        .map(|(_, _, label)| *label)
        .unwrap_or(UNKNOWN_SELECTOR_LABEL)
}

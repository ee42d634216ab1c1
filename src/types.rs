use k8s_openapi::api::core::v1::{Pod, PodSpec, PodStatus};
use std::fmt;

/// Controller kinds with their own pod naming convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerKind {
    DaemonSet,
    ReplicaSet,
    StatefulSet,
    Job,
    Node,
    ConfigMap,
    CatalogSource,
    Other(String),
}

impl OwnerKind {
    pub fn as_str(&self) -> &str {
        match self {
            OwnerKind::DaemonSet => "DaemonSet",
            OwnerKind::ReplicaSet => "ReplicaSet",
            OwnerKind::StatefulSet => "StatefulSet",
            OwnerKind::Job => "Job",
            OwnerKind::Node => "Node",
            OwnerKind::ConfigMap => "ConfigMap",
            OwnerKind::CatalogSource => "CatalogSource",
            OwnerKind::Other(kind) => kind,
        }
    }
}

impl From<&str> for OwnerKind {
    fn from(kind: &str) -> Self {
        match kind {
            "DaemonSet" => OwnerKind::DaemonSet,
            "ReplicaSet" => OwnerKind::ReplicaSet,
            "StatefulSet" => OwnerKind::StatefulSet,
            "Job" => OwnerKind::Job,
            "Node" => OwnerKind::Node,
            "ConfigMap" => OwnerKind::ConfigMap,
            "CatalogSource" => OwnerKind::CatalogSource,
            other => OwnerKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerInfo {
    pub kind: OwnerKind,
    pub name: String,
}

/// (namespace, normalized pod name). One row group is emitted per key.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct DedupKey {
    pub namespace: String,
    pub pod_name: String,
}

/// A pod as read from an export or a live listing.
#[derive(Debug, Clone)]
pub struct PodRecord {
    pub namespace: String,
    pub name: String,
    pub node_name: String,
    pub owner: Option<OwnerInfo>,
    pub spec: PodSpec,
    pub status: PodStatus,
}

impl PodRecord {
    pub fn owner_kind(&self) -> Option<&OwnerKind> {
        self.owner.as_ref().map(|o| &o.kind)
    }

    pub fn phase(&self) -> &str {
        self.status.phase.as_deref().unwrap_or("Unknown")
    }
}

impl TryFrom<Pod> for PodRecord {
    type Error = anyhow::Error;

    fn try_from(pod: Pod) -> anyhow::Result<Self> {
        let namespace = pod.metadata.namespace.unwrap_or_default();
        let name = pod
            .metadata
            .name
            .ok_or_else(|| anyhow::anyhow!("Pod without a name in namespace {}", namespace))?;

        let refs = pod.metadata.owner_references.unwrap_or_default();
        if refs.len() > 1 {
            anyhow::bail!(
                "Pod {}/{} has {} ownerReferences; only one is supported",
                namespace,
                name,
                refs.len()
            );
        }
        let owner = refs.into_iter().next().map(|r| OwnerInfo {
            kind: OwnerKind::from(r.kind.as_str()),
            name: r.name,
        });

        let spec = pod.spec.unwrap_or_default();
        let node_name = spec.node_name.clone().unwrap_or_default();

        Ok(Self {
            namespace,
            name,
            node_name,
            owner,
            spec,
            status: pod.status.unwrap_or_default(),
        })
    }
}

use crate::types::PodRecord;
use anyhow::Context;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::api::{ApiResource, DynamicObject, ListParams};
use kube::core::GroupVersionKind;
use kube::{Api, Client, config};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::PathBuf;
use tracing::{debug, info, warn};

const MASTER_ROLE_LABEL: &str = "node-role.kubernetes.io/master";
const WORKER_ROLE_LABEL: &str = "node-role.kubernetes.io/worker";

/// The shape of `kubectl get -o json` output.
#[derive(Debug, Deserialize)]
struct ExportList {
    items: Vec<Value>,
}

/// Where the cluster records come from.
#[derive(Debug, Clone)]
pub enum Source {
    Online { context: Option<String> },
    Offline(Vec<PathBuf>),
}

/// Cluster records grouped by kind.
#[derive(Debug, Default)]
pub struct Inventory {
    items: BTreeMap<String, Vec<Value>>,
}

fn metadata_str<'a>(item: &'a Value, field: &str) -> &'a str {
    item.pointer(&format!("/metadata/{}", field))
        .and_then(Value::as_str)
        .unwrap_or_default()
}

impl Inventory {
    /// Group the items of one or more exported list documents by `kind`.
    pub fn from_documents(documents: Vec<Value>) -> anyhow::Result<Self> {
        let mut inventory = Self::default();
        for document in documents {
            let list: ExportList = serde_json::from_value(document)
                .context("Export document is not a list with an `items` array")?;
            for item in list.items {
                let kind = item
                    .get("kind")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        anyhow::anyhow!(
                            "Item {}/{} has no kind",
                            metadata_str(&item, "namespace"),
                            metadata_str(&item, "name")
                        )
                    })?
                    .to_string();
                inventory.insert(kind, item);
            }
        }
        inventory.sort_pods();
        Ok(inventory)
    }

    fn insert(&mut self, kind: String, item: Value) {
        self.items.entry(kind).or_default().push(item);
    }

    fn sort_pods(&mut self) {
        let pods = self.items.entry("Pod".to_string()).or_default();
        pods.sort_by(|a, b| {
            (metadata_str(a, "namespace"), metadata_str(a, "name"))
                .cmp(&(metadata_str(b, "namespace"), metadata_str(b, "name")))
        });
    }

    pub fn kinds(&self) -> impl Iterator<Item = (&str, usize)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v.len()))
    }

    pub fn items(&self, kind: &str) -> &[Value] {
        self.items.get(kind).map(Vec::as_slice).unwrap_or_default()
    }

    /// Find a namespaced record by kind, namespace and name.
    pub fn find(&self, kind: &str, namespace: &str, name: &str) -> Option<&Value> {
        self.items(kind).iter().find(|item| {
            metadata_str(item, "namespace") == namespace && metadata_str(item, "name") == name
        })
    }

    /// Pods in (namespace, name) order.
    pub fn pods(&self) -> anyhow::Result<Vec<PodRecord>> {
        self.items("Pod")
            .iter()
            .map(|item| {
                let pod: Pod = serde_json::from_value(item.clone()).with_context(|| {
                    format!(
                        "Failed to parse pod {}/{}",
                        metadata_str(item, "namespace"),
                        metadata_str(item, "name")
                    )
                })?;
                PodRecord::try_from(pod)
            })
            .collect()
    }

    pub fn node_roles(&self) -> NodeRoles {
        let mut roles = NodeRoles::default();
        for node in self.items("Node") {
            let hostname = metadata_str(node, "name").to_string();
            let labels = node.pointer("/metadata/labels");
            let has_label = |label: &str| labels.and_then(|l| l.get(label)).is_some();
            if has_label(MASTER_ROLE_LABEL) {
                roles.masters.push(hostname.clone());
            }
            if has_label(WORKER_ROLE_LABEL) {
                roles.workers.push(hostname);
            }
        }
        roles
    }
}

/// Master and worker host names derived from node role labels.
#[derive(Debug, Default, Clone)]
pub struct NodeRoles {
    pub masters: Vec<String>,
    pub workers: Vec<String>,
}

impl NodeRoles {
    pub fn role_of(&self, hostname: &str) -> String {
        let mut roles = Vec::new();
        if self.masters.iter().any(|h| h == hostname) {
            roles.push("master");
        }
        if self.workers.iter().any(|h| h == hostname) {
            roles.push("worker");
        }
        roles.join("/")
    }
}

pub async fn load_inventory(source: &Source) -> anyhow::Result<Inventory> {
    match source {
        Source::Offline(paths) => load_files(paths),
        Source::Online { context } => {
            let client = initialize_client(context.as_deref()).await?;
            load_live(&client).await
        }
    }
}

fn load_files(paths: &[PathBuf]) -> anyhow::Result<Inventory> {
    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        info!("Reading export {}", path.display());
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let document: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {} as JSON", path.display()))?;
        documents.push(document);
    }
    Inventory::from_documents(documents)
}

async fn initialize_client(context: Option<&str>) -> anyhow::Result<Client> {
    let config = match context {
        Some(ctx) => config::Config::from_kubeconfig(&config::KubeConfigOptions {
            context: Some(ctx.to_string()),
            ..Default::default()
        })
        .await
        .map_err(|e| anyhow::anyhow!("Context '{}' not found in kubeconfig: {}", ctx, e))?,
        None => config::Config::infer()
            .await
            .context("Failed to load kubeconfig")?,
    };
    let client = Client::try_from(config)?;

    // Fail early when the cluster is unreachable or the credentials are rejected.
    let version = client
        .apiserver_version()
        .await
        .context("Cannot reach the cluster API server")?;
    info!("Connected to API server {}.{}", version.major, version.minor);
    Ok(client)
}

async fn list_all<K>(client: &Client) -> anyhow::Result<Vec<Value>>
where
    K: kube::Resource<DynamicType = ()>
        + serde::de::DeserializeOwned
        + serde::Serialize
        + Clone
        + Debug,
{
    let kind = K::kind(&());
    let api: Api<K> = Api::all(client.clone());
    let list = api
        .list(&ListParams::default())
        .await
        .with_context(|| format!("Failed to list {}", kind))?;
    debug!("Listed {} {} objects", list.items.len(), kind);
    list.items
        .into_iter()
        .map(|obj| serde_json::to_value(obj).map_err(anyhow::Error::from))
        .collect()
}

async fn list_catalog_sources(client: &Client) -> anyhow::Result<Vec<Value>> {
    let gvk = GroupVersionKind::gvk("operators.coreos.com", "v1alpha1", "CatalogSource");
    let ar = ApiResource::from_gvk(&gvk);
    let api: Api<DynamicObject> = Api::all_with(client.clone(), &ar);
    match api.list(&ListParams::default()).await {
        Ok(list) => list
            .items
            .into_iter()
            .map(|obj| serde_json::to_value(obj).map_err(anyhow::Error::from))
            .collect(),
        Err(kube::Error::Api(err)) if err.code == 404 => {
            debug!("CatalogSource is not served by this cluster, skipping");
            Ok(Vec::new())
        }
        Err(e) => Err(e).context("Failed to list CatalogSource"),
    }
}

async fn load_live(client: &Client) -> anyhow::Result<Inventory> {
    info!("Querying pods, nodes and workload controllers from the cluster");
    let mut inventory = Inventory::default();
    let listings = [
        ("Pod", list_all::<Pod>(client).await?),
        ("Node", list_all::<Node>(client).await?),
        ("ReplicaSet", list_all::<ReplicaSet>(client).await?),
        ("StatefulSet", list_all::<StatefulSet>(client).await?),
        ("Deployment", list_all::<Deployment>(client).await?),
        ("DaemonSet", list_all::<DaemonSet>(client).await?),
        ("Job", list_all::<Job>(client).await?),
        ("CatalogSource", list_catalog_sources(client).await?),
    ];
    for (kind, items) in listings {
        if items.is_empty() {
            warn!("No {} objects found", kind);
        }
        for item in items {
            inventory.insert(kind.to_string(), item);
        }
    }
    inventory.sort_pods();
    Ok(inventory)
}

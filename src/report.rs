//! Builds the in-memory table: one row group per pod template.

use crate::annotations::AnnotationStore;
use crate::enrich::Enricher;
use crate::kubernetes::NodeRoles;
use crate::normalize::{normalize_owner_name, normalize_pod_name};
use crate::types::{DedupKey, PodRecord};
use crate::utils::{bool_text, link_display, max_line_width, opt_text, to_yaml};
use k8s_openapi::api::core::v1::Container;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Namespace,
    PodName,
    Description,
    Url,
    CustomResources,
    HowToInstall,
    NumOfPods,
    OwnerKind,
    OwnerName,
    Affinity,
    DnsPolicy,
    EnableServiceLinks,
    HostNetwork,
    HostPid,
    NodeName,
    Role,
    NodeSelector,
    PreemptionPolicy,
    Priority,
    PriorityClassName,
    RestartPolicy,
    SchedulerName,
    ServiceAccount,
    ServiceAccountName,
    PodSecurityContext,
    Tolerations,
    TerminationGracePeriodSeconds,
    QosClass,
    ContainerName,
    InitContainer,
    ContainerImage,
    ContainerImagePullPolicy,
    ContainerResources,
    ContainerSecurityContext,
}

impl Column {
    /// Columns in sheet order; `nodeName` and `role` only when requested.
    pub fn layout(node_columns: bool) -> Vec<Column> {
        use Column::*;
        let mut columns = vec![
            Namespace,
            PodName,
            Description,
            Url,
            CustomResources,
            HowToInstall,
            NumOfPods,
            OwnerKind,
            OwnerName,
            Affinity,
            DnsPolicy,
            EnableServiceLinks,
            HostNetwork,
            HostPid,
        ];
        if node_columns {
            columns.extend([NodeName, Role]);
        }
        columns.extend([
            NodeSelector,
            PreemptionPolicy,
            Priority,
            PriorityClassName,
            RestartPolicy,
            SchedulerName,
            ServiceAccount,
            ServiceAccountName,
            PodSecurityContext,
            Tolerations,
            TerminationGracePeriodSeconds,
            QosClass,
            ContainerName,
            InitContainer,
            ContainerImage,
            ContainerImagePullPolicy,
            ContainerResources,
            ContainerSecurityContext,
        ]);
        columns
    }

    pub fn header(self) -> &'static str {
        match self {
            Column::Namespace => "ns",
            Column::PodName => "pod_name",
            Column::Description => "description",
            Column::Url => "url",
            Column::CustomResources => "custom_resources",
            Column::HowToInstall => "how_to_install",
            Column::NumOfPods => "num_of_pods",
            Column::OwnerKind => "owner_kind",
            Column::OwnerName => "owner_name",
            Column::Affinity => "affinity",
            Column::DnsPolicy => "dnsPolicy",
            Column::EnableServiceLinks => "enableServiceLinks",
            Column::HostNetwork => "hostNetwork",
            Column::HostPid => "hostPID",
            Column::NodeName => "nodeName",
            Column::Role => "role",
            Column::NodeSelector => "nodeSelector",
            Column::PreemptionPolicy => "preemptionPolicy",
            Column::Priority => "priority",
            Column::PriorityClassName => "priorityClassName",
            Column::RestartPolicy => "restartPolicy",
            Column::SchedulerName => "schedulerName",
            Column::ServiceAccount => "serviceAccount",
            Column::ServiceAccountName => "serviceAccountName",
            Column::PodSecurityContext => "pod_securityContext",
            Column::Tolerations => "tolerations",
            Column::TerminationGracePeriodSeconds => "terminationGracePeriodSeconds",
            Column::QosClass => "qosClass",
            Column::ContainerName => "container_name",
            Column::InitContainer => "initContainer",
            Column::ContainerImage => "container_image",
            Column::ContainerImagePullPolicy => "container_imagePullPolicy",
            Column::ContainerResources => "container_resources",
            Column::ContainerSecurityContext => "container_securityContext",
        }
    }

    /// Pod-level cells are shared by, and merged across, a pod's container rows.
    pub fn is_pod_level(self) -> bool {
        !matches!(
            self,
            Column::ContainerName
                | Column::InitContainer
                | Column::ContainerImage
                | Column::ContainerImagePullPolicy
                | Column::ContainerResources
                | Column::ContainerSecurityContext
        )
    }

    pub fn wraps_text(self) -> bool {
        matches!(
            self,
            Column::Description | Column::Url | Column::HowToInstall
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    pub text: String,
    pub link: Option<String>,
    /// Set for integer fields so they land in the sheet as numbers.
    pub number: Option<f64>,
}

impl Cell {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn number(value: Option<i64>) -> Self {
        Self {
            text: opt_text(value),
            number: value.map(|n| n as f64),
            ..Default::default()
        }
    }
}

/// The rows of one pod template: shared pod cells plus one row per container.
#[derive(Debug, Clone, Default)]
pub struct RowGroup {
    pub pod: HashMap<Column, Cell>,
    pub containers: Vec<HashMap<Column, Cell>>,
}

impl RowGroup {
    pub fn row_count(&self) -> usize {
        self.containers.len().max(1)
    }

    /// The cell shown at `row` within the group; pod cells repeat on every row.
    pub fn cell(&self, row: usize, column: Column) -> Option<&Cell> {
        if column.is_pod_level() {
            self.pod.get(&column)
        } else {
            self.containers.get(row).and_then(|c| c.get(&column))
        }
    }
}

#[derive(Debug, Clone)]
pub struct Report {
    pub columns: Vec<Column>,
    pub groups: Vec<RowGroup>,
}

impl Report {
    pub fn data_rows(&self) -> usize {
        self.groups.iter().map(RowGroup::row_count).sum()
    }

    /// Column widths in characters.
    pub fn column_widths(&self) -> Vec<f64> {
        self.columns
            .iter()
            .map(|&column| {
                let header = column.header().chars().count();
                match column {
                    Column::Description => 60.0,
                    Column::Url
                    | Column::CustomResources
                    | Column::HowToInstall
                    | Column::Affinity => 30.0,
                    Column::ContainerImage => (header + 2) as f64 * 1.2,
                    _ => {
                        let longest = self
                            .groups
                            .iter()
                            .flat_map(|g| (0..g.row_count()).filter_map(move |r| g.cell(r, column)))
                            .map(|cell| max_line_width(&cell.text))
                            .fold(header, usize::max);
                        (longest + 2) as f64 * 1.2
                    }
                }
            })
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct ReportOptions {
    pub namespace_filter: Option<Regex>,
    pub node_roles: Option<NodeRoles>,
}

pub fn build_report(
    pods: &[PodRecord],
    annotations: &AnnotationStore,
    enricher: &Enricher,
    options: &ReportOptions,
) -> anyhow::Result<Report> {
    let mut seen = HashSet::new();
    let mut groups = Vec::new();

    for pod in pods {
        if let Some(filter) = &options.namespace_filter
            && !filter.is_match(&pod.namespace)
        {
            continue;
        }

        let key = DedupKey {
            namespace: pod.namespace.clone(),
            pod_name: normalize_pod_name(&pod.name, pod.owner_kind(), &pod.node_name),
        };
        if !seen.insert(key.clone()) {
            debug!("Skipping {}/{}: template {} already listed", pod.namespace, pod.name, key.pod_name);
            continue;
        }

        debug!(
            "Pod {}/{} as {} (phase {})",
            pod.namespace,
            pod.name,
            key.pod_name,
            pod.phase()
        );
        groups.push(build_row_group(pod, &key, annotations, enricher, options)?);
    }

    info!("Built {} row groups from {} pods", groups.len(), pods.len());
    Ok(Report {
        columns: Column::layout(options.node_roles.is_some()),
        groups,
    })
}

fn build_row_group(
    pod: &PodRecord,
    key: &DedupKey,
    annotations: &AnnotationStore,
    enricher: &Enricher,
    options: &ReportOptions,
) -> anyhow::Result<RowGroup> {
    let spec = &pod.spec;
    let entry = annotations.lookup(&key.namespace, &key.pod_name);
    let mut cells = HashMap::new();
    let mut put = |column: Column, text: String| {
        cells.insert(column, Cell::text(text));
    };

    put(Column::Namespace, pod.namespace.clone());
    put(Column::PodName, key.pod_name.clone());
    put(Column::Description, entry.desc.clone());
    put(Column::CustomResources, entry.custom_resources_text());
    put(Column::HowToInstall, entry.install.clone());

    if let Some(owner) = &pod.owner {
        put(
            Column::NumOfPods,
            enricher.pod_count_label(
                spec.node_selector.as_ref(),
                owner,
                &key.pod_name,
                &pod.namespace,
            )?,
        );
        put(Column::OwnerKind, enricher.classify_owner(owner, &pod.namespace)?);
        put(Column::OwnerName, normalize_owner_name(&owner.kind, &owner.name));
    }

    put(Column::Affinity, to_yaml(spec.affinity.as_ref())?);
    put(Column::DnsPolicy, opt_text(spec.dns_policy.as_ref()));
    put(Column::EnableServiceLinks, bool_text(spec.enable_service_links));
    put(Column::HostNetwork, bool_text(spec.host_network));
    put(Column::HostPid, bool_text(spec.host_pid));
    if let Some(roles) = &options.node_roles {
        put(Column::NodeName, pod.node_name.clone());
        put(Column::Role, roles.role_of(&pod.node_name));
    }
    put(Column::NodeSelector, to_yaml(spec.node_selector.as_ref())?);
    put(Column::PreemptionPolicy, opt_text(spec.preemption_policy.as_ref()));
    put(Column::PriorityClassName, opt_text(spec.priority_class_name.as_ref()));
    put(Column::RestartPolicy, opt_text(spec.restart_policy.as_ref()));
    put(Column::SchedulerName, opt_text(spec.scheduler_name.as_ref()));
    put(Column::ServiceAccount, opt_text(spec.service_account.as_ref()));
    put(Column::ServiceAccountName, opt_text(spec.service_account_name.as_ref()));
    put(Column::PodSecurityContext, to_yaml(spec.security_context.as_ref())?);
    put(Column::Tolerations, to_yaml(spec.tolerations.as_ref())?);
    put(Column::QosClass, opt_text(pod.status.qos_class.as_ref()));

    cells.insert(Column::Priority, Cell::number(spec.priority.map(i64::from)));
    cells.insert(
        Column::TerminationGracePeriodSeconds,
        Cell::number(spec.termination_grace_period_seconds),
    );
    cells.insert(Column::Url, url_cell(&entry.url));

    let init = spec.init_containers.iter().flatten().map(|c| (c, true));
    let regular = spec.containers.iter().map(|c| (c, false));
    let containers = init
        .chain(regular)
        .map(|(c, is_init)| container_cells(c, is_init))
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(RowGroup {
        pod: cells,
        containers,
    })
}

fn url_cell(link: &str) -> Cell {
    if link.is_empty() {
        return Cell::default();
    }
    match link_display(link) {
        Some(text) => Cell {
            text,
            link: Some(link.to_string()),
            number: None,
        },
        None => {
            debug!("Not a valid URL, writing as text: {}", link);
            Cell::text(link)
        }
    }
}

fn container_cells(container: &Container, is_init: bool) -> anyhow::Result<HashMap<Column, Cell>> {
    let init_text = if is_init { "true" } else { "" };
    Ok(HashMap::from([
        (Column::ContainerName, Cell::text(container.name.clone())),
        (Column::InitContainer, Cell::text(init_text)),
        (Column::ContainerImage, Cell::text(opt_text(container.image.as_ref()))),
        (
            Column::ContainerImagePullPolicy,
            Cell::text(opt_text(container.image_pull_policy.as_ref())),
        ),
        (
            Column::ContainerResources,
            Cell::text(to_yaml(container.resources.as_ref())?),
        ),
        (
            Column::ContainerSecurityContext,
            Cell::text(to_yaml(container.security_context.as_ref())?),
        ),
    ]))
}

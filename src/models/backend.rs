use serde::{Deserialize, Serialize};

// Shapes owned by the cluster-management backend rather than Kubernetes itself.

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Cluster {
    pub name: String,
    #[serde(default)]
    pub kubeconfig: String,
    #[serde(default)]
    pub context: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ClusterStatus {
    pub cluster: String,
    #[serde(default)]
    pub nodes: NodeCounts,
    #[serde(default)]
    pub pods: PodCounts,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeCounts {
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub ready: u32,
    #[serde(default)]
    pub not_ready: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct PodCounts {
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub running: u32,
    #[serde(default)]
    pub pending: u32,
    #[serde(default)]
    pub failed: u32,
}

/// Live usage for one node. The backend emits exported Go field names.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct NodeMetrics {
    #[serde(default, rename = "Name", alias = "name")]
    pub name: String,
    #[serde(default, rename = "CPU", alias = "cpu")]
    pub cpu: String,
    #[serde(default, rename = "Memory", alias = "memory")]
    pub memory: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStatus {
    #[serde(default)]
    pub cluster: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub data_points: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Alert {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub cluster: String,
    #[serde(default, rename = "type")]
    pub alert_type: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub resolved: bool,
}

/// One collected snapshot, as returned by `/clusters/{c}/metrics` and as the
/// entries of `/monitoring/{c}/history`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct MetricsSample {
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub nodes: SampleNodes,
    #[serde(default)]
    pub pods: SamplePods,
    #[serde(default)]
    pub resources: SampleResources,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct SampleNodes {
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub ready: u32,
    #[serde(default)]
    pub not_ready: u32,
    #[serde(default)]
    pub unreachable: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct SamplePods {
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub running: u32,
    #[serde(default)]
    pub pending: u32,
    #[serde(default)]
    pub failed: u32,
    #[serde(default)]
    pub succeeded: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SampleResources {
    #[serde(default, rename = "TotalCPU")]
    pub total_cpu: String,
    #[serde(default, rename = "TotalMemory")]
    pub total_memory: String,
    #[serde(default, rename = "UsedCPU")]
    pub used_cpu: String,
    #[serde(default, rename = "UsedMemory")]
    pub used_memory: String,
    #[serde(default, rename = "AvailableCPU")]
    pub available_cpu: String,
    #[serde(default, rename = "AvailableMemory")]
    pub available_memory: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PodLogs {
    #[serde(default)]
    pub logs: String,
}

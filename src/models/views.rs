//! Flattened, display-ready rows handed to the askama templates.

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ClusterCardView {
    pub name: String,
    pub context: String,
    pub has_status: bool,
    pub indicator: String,
    pub bar_class: String,
    pub nodes_ready: u32,
    pub nodes_total: u32,
    pub ready_percent: u32,
    pub pods_total: u32,
    pub pods_running: u32,
    pub pods_pending: u32,
    pub pods_failed: u32,
    pub updated: String,
}

#[derive(Debug, Clone, Default)]
pub struct PodRowView {
    pub name: String,
    pub namespace: String,
    pub phase: String,
    pub status_class: String,
    pub text_class: String,
    pub node: String,
    pub ip: String,
    pub started: String,
    pub age: String,
    pub ready: usize,
    pub containers: usize,
    pub restarts: i32,
    pub expanded: bool,
    pub logs_loading: bool,
    pub logs: Option<String>,
    pub logs_error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ContainerView {
    pub name: String,
    pub image: String,
    pub state: String,
    pub reason: String,
    pub ready: bool,
    pub restarts: i32,
}

#[derive(Debug, Clone, Default)]
pub struct LabelView {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Default)]
pub struct NodeCardView {
    pub name: String,
    pub readiness: String,
    pub status_class: String,
    pub text_class: String,
    pub cpu: String,
    pub memory: String,
    pub pods: String,
    pub cpu_usage: String,
    pub memory_usage: String,
    pub has_metrics: bool,
    pub architecture: String,
    pub os_image: String,
    pub kubelet_version: String,
    pub runtime: String,
    pub age: String,
    pub conditions: Vec<ConditionView>,
}

#[derive(Debug, Clone, Default)]
pub struct ConditionView {
    pub condition_type: String,
    pub status: String,
    pub text_class: String,
    pub reason: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct EventView {
    pub event_type: String,
    pub type_class: String,
    pub reason: String,
    pub message: String,
    pub object: String,
    pub namespace: String,
    pub count: i32,
    pub last_seen: String,
}

#[derive(Debug, Clone, Default)]
pub struct AlertView {
    pub level: String,
    pub level_class: String,
    pub alert_type: String,
    pub message: String,
    pub created: String,
    pub resolved: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ResourceView {
    pub label: String,
    pub total: String,
    pub used: String,
    pub available: String,
}

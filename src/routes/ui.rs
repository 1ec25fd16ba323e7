use askama::Template;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

use crate::AppState;
use crate::charts::{CHART_HEIGHT, CHART_WIDTH, ChartView, history_charts};
use crate::error::ApiError;
use crate::helpers::{
    age_since, alert_level_class, condition_readiness, display_memory, event_type_class,
    format_date, format_memory, format_optional_date, node_readiness, or_dash, percent,
    readiness_indicator, status_color, status_text_color,
};
use crate::models::backend::{Alert, Cluster, ClusterStatus, MetricsSample, NodeMetrics};
use crate::models::k8s::{self, Namespace};
use crate::models::views::*;
use crate::state::session::{Session, session_cookie, session_id_from_headers};
use crate::state::shell::Theme;
use crate::state::{Selection, dashboard, events, monitoring, nodes, pods};

// --- Shared page plumbing ---

#[derive(Debug, Clone)]
struct Breadcrumb {
    label: String,
    url: String,
}

fn crumb(label: &str, url: &str) -> Breadcrumb {
    Breadcrumb {
        label: label.to_string(),
        url: url.to_string(),
    }
}

/// Theme and mobile menu, as every page renders them.
#[derive(Debug, Clone)]
struct ShellView {
    dark: bool,
    toggle_label: &'static str,
    menu_open: bool,
}

/// The session behind a request, plus the cookie to set if it was just created.
struct Visitor {
    session: Arc<Session>,
    new_cookie: Option<String>,
}

impl Visitor {
    async fn from_headers(state: &AppState, headers: &HeaderMap) -> Self {
        let id = session_id_from_headers(headers);
        let (session, created) = state.sessions.get_or_create(id.as_deref()).await;
        let new_cookie = created.then(|| session_cookie(&session.id));
        Self {
            session,
            new_cookie,
        }
    }

    /// The menu stays open for one render after it is toggled; navigating closes it.
    fn shell(&self) -> ShellView {
        let shell = &self.session.shell;
        let theme = shell.theme();
        let view = ShellView {
            dark: theme == Theme::Dark,
            toggle_label: theme.toggle_label(),
            menu_open: shell.menu_open(),
        };
        shell.close_menu();
        view
    }

    fn respond(&self, resp: impl IntoResponse) -> Response {
        let mut resp = resp.into_response();
        if let Some(cookie) = &self.new_cookie {
            match HeaderValue::from_str(cookie) {
                Ok(v) => {
                    resp.headers_mut().append(header::SET_COOKIE, v);
                }
                Err(e) => tracing::error!("invalid session cookie: {}", e),
            }
        }
        resp
    }
}

fn render_template(tmpl: &impl Template) -> Response {
    match tmpl.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("template error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate {
    title: String,
    current_nav: String,
    breadcrumbs: Vec<Breadcrumb>,
    shell: ShellView,
    status: u16,
    message: String,
    detail: String,
    back_url: String,
}

/// Detail pages answer 404 when the backend does, 502 for anything else.
fn error_page(visitor: &Visitor, nav: &str, message: &str, err: &ApiError, back_url: &str) -> Response {
    let status = if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::BAD_GATEWAY
    };
    let tmpl = ErrorTemplate {
        title: "Error".to_string(),
        current_nav: nav.to_string(),
        breadcrumbs: vec![crumb("Dashboard", "/ui/")],
        shell: visitor.shell(),
        status: status.as_u16(),
        message: message.to_string(),
        detail: err.to_string(),
        back_url: back_url.to_string(),
    };
    visitor.respond((status, render_template(&tmpl)))
}

fn flag(v: &Option<String>) -> bool {
    matches!(v.as_deref(), Some("1" | "true"))
}

fn cluster_options(clusters: &[Cluster], selected: &str) -> Vec<SelectOption> {
    clusters
        .iter()
        .map(|c| SelectOption {
            value: c.name.clone(),
            label: c.name.clone(),
            selected: c.name == selected,
        })
        .collect()
}

/// Namespace choices behind a leading placeholder entry with an empty value.
fn namespace_options(namespaces: &[Namespace], selected: &str, placeholder: &str) -> Vec<SelectOption> {
    let mut options = vec![SelectOption {
        value: String::new(),
        label: placeholder.to_string(),
        selected: selected.is_empty(),
    }];
    options.extend(namespaces.iter().map(|n| SelectOption {
        value: n.metadata.name.clone(),
        label: n.metadata.name.clone(),
        selected: n.metadata.name == selected,
    }));
    options
}

/// Same-origin path to return to after a form post.
fn back_target(headers: &HeaderMap) -> String {
    headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(|r| reqwest::Url::parse(r).ok())
        .filter(|u| u.path().starts_with("/ui"))
        .map(|u| match u.query() {
            Some(q) => format!("{}?{}", u.path(), q),
            None => u.path().to_string(),
        })
        .unwrap_or_else(|| "/ui/".to_string())
}

// --- View Builders ---

fn build_cluster_card(cluster: &Cluster, status: Option<&ClusterStatus>) -> ClusterCardView {
    let mut card = ClusterCardView {
        name: cluster.name.clone(),
        context: cluster.context.clone(),
        ..Default::default()
    };
    if let Some(s) = status {
        let indicator = readiness_indicator(s.nodes.ready, s.nodes.total);
        card.has_status = true;
        card.indicator = indicator.symbol().to_string();
        card.bar_class = indicator.bar_class().to_string();
        card.nodes_ready = s.nodes.ready;
        card.nodes_total = s.nodes.total;
        card.ready_percent = percent(s.nodes.ready, s.nodes.total);
        card.pods_total = s.pods.total;
        card.pods_running = s.pods.running;
        card.pods_pending = s.pods.pending;
        card.pods_failed = s.pods.failed;
        card.updated = format_date(&s.timestamp);
    }
    card
}

fn build_pod_row(pod: &k8s::Pod, page: &pods::PodsPage, now: DateTime<Utc>) -> PodRowView {
    let name = &pod.metadata.name;
    let phase = if pod.status.phase.is_empty() {
        "Unknown"
    } else {
        pod.status.phase.as_str()
    };
    let logs = page.log_state(name);
    let statuses = &pod.status.container_statuses;
    PodRowView {
        name: name.clone(),
        namespace: pod.metadata.namespace.clone(),
        phase: phase.to_string(),
        status_class: status_color(phase).to_string(),
        text_class: status_text_color(phase).to_string(),
        node: or_dash(pod.spec.node_name.as_deref()),
        ip: or_dash(pod.status.pod_ip.as_deref()),
        started: format_optional_date(pod.status.start_time.as_deref()),
        age: age_since(pod.status.start_time.as_deref(), now),
        ready: statuses.iter().filter(|cs| cs.ready).count(),
        containers: pod.spec.containers.len().max(statuses.len()),
        restarts: statuses.iter().map(|cs| cs.restart_count).sum(),
        expanded: page.expanded.as_deref() == Some(name.as_str()),
        logs_loading: logs.is_loading(),
        logs: logs.text().map(str::to_string),
        logs_error: logs.failure().map(str::to_string),
    }
}

fn build_container_views(pod: &k8s::Pod) -> Vec<ContainerView> {
    let mut views: Vec<ContainerView> = pod
        .status
        .container_statuses
        .iter()
        .map(|cs| {
            let (state, reason) = if cs.state.running.is_some() {
                ("Running".to_string(), String::new())
            } else if let Some(ref w) = cs.state.waiting {
                ("Waiting".to_string(), w.reason.clone())
            } else if let Some(ref t) = cs.state.terminated {
                ("Terminated".to_string(), t.reason.clone())
            } else {
                ("Unknown".to_string(), String::new())
            };
            ContainerView {
                name: cs.name.clone(),
                image: cs.image.clone(),
                state,
                reason,
                ready: cs.ready,
                restarts: cs.restart_count,
            }
        })
        .collect();

    // Containers the kubelet has not reported on yet.
    for c in &pod.spec.containers {
        if !views.iter().any(|v| v.name == c.name) {
            views.push(ContainerView {
                name: c.name.clone(),
                image: c.image.clone(),
                state: "Unknown".to_string(),
                ..Default::default()
            });
        }
    }
    views
}

fn build_label_views(labels: &std::collections::BTreeMap<String, String>) -> Vec<LabelView> {
    labels
        .iter()
        .map(|(k, v)| LabelView {
            key: k.clone(),
            value: v.clone(),
        })
        .collect()
}

fn build_node_card(node: &k8s::Node, metrics: Option<&NodeMetrics>, now: DateTime<Utc>) -> NodeCardView {
    let readiness = node_readiness(node);
    let info = &node.status.node_info;
    NodeCardView {
        name: node.metadata.name.clone(),
        readiness: readiness.label().to_string(),
        status_class: status_color(readiness.as_str()).to_string(),
        text_class: status_text_color(readiness.as_str()).to_string(),
        cpu: or_dash(node.capacity("cpu")),
        memory: node.capacity("memory").map(display_memory).unwrap_or_else(|| "-".to_string()),
        pods: or_dash(node.capacity("pods")),
        cpu_usage: metrics.map(|m| m.cpu.clone()).unwrap_or_default(),
        memory_usage: metrics.map(|m| format_memory(&m.memory)).unwrap_or_default(),
        has_metrics: metrics.is_some(),
        architecture: or_dash(Some(info.architecture.as_str())),
        os_image: or_dash(Some(info.os_image.as_str())),
        kubelet_version: or_dash(Some(info.kubelet_version.as_str())),
        runtime: or_dash(Some(info.container_runtime_version.as_str())),
        age: age_since(node.metadata.creation_timestamp.as_deref(), now),
        conditions: node
            .status
            .conditions
            .iter()
            .map(|c| ConditionView {
                condition_type: c.condition_type.clone(),
                status: c.status.clone(),
                text_class: condition_class(&c.condition_type, &c.status).to_string(),
                reason: or_dash(c.reason.as_deref()),
                message: c.message.clone().unwrap_or_default(),
            })
            .collect(),
    }
}

/// `Ready=True` is healthy; for pressure conditions `False` is.
fn condition_class(condition_type: &str, status: &str) -> &'static str {
    if condition_type == "Ready" {
        return status_text_color(condition_readiness(status).as_str());
    }
    match status {
        "False" => "text-success-600",
        "True" => "text-danger-600",
        _ => "text-gray-600",
    }
}

fn build_event_view(e: &k8s::Event) -> EventView {
    EventView {
        event_type: e.event_type.clone(),
        type_class: event_type_class(&e.event_type).to_string(),
        reason: e.reason.clone(),
        message: e.message.clone(),
        object: format!("{}/{}", e.involved_object.kind, e.involved_object.name),
        namespace: or_dash(Some(e.metadata.namespace.as_str())),
        count: e.count,
        last_seen: format_optional_date(e.last_timestamp.as_deref()),
    }
}

fn build_alert_view(a: &Alert) -> AlertView {
    AlertView {
        level: a.level.clone(),
        level_class: alert_level_class(&a.level).to_string(),
        alert_type: a.alert_type.clone(),
        message: a.message.clone(),
        created: format_optional_date(a.created_at.as_deref()),
        resolved: a.resolved,
    }
}

fn build_resource_views(sample: &MetricsSample) -> Vec<ResourceView> {
    let r = &sample.resources;
    vec![
        ResourceView {
            label: "CPU".to_string(),
            total: or_dash(Some(r.total_cpu.as_str())),
            used: or_dash(Some(r.used_cpu.as_str())),
            available: or_dash(Some(r.available_cpu.as_str())),
        },
        ResourceView {
            label: "Memory".to_string(),
            total: display_or_dash(&r.total_memory),
            used: display_or_dash(&r.used_memory),
            available: display_or_dash(&r.available_memory),
        },
    ]
}

fn display_or_dash(q: &str) -> String {
    if q.is_empty() {
        "-".to_string()
    } else {
        display_memory(q)
    }
}

// --- Dashboard ---

#[derive(Deserialize, Default)]
pub struct RefreshQuery {
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub retry: Option<String>,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    title: String,
    current_nav: String,
    breadcrumbs: Vec<Breadcrumb>,
    shell: ShellView,
    loading: bool,
    error: Option<String>,
    clusters: Vec<ClusterCardView>,
}

pub async fn handle_dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<RefreshQuery>,
) -> Response {
    let visitor = Visitor::from_headers(&state, &headers).await;
    let page = &visitor.session.dashboard;

    let loaded = page.lock().await.loaded;
    if !loaded || flag(&query.refresh) || flag(&query.retry) {
        dashboard::load(&state.api, page).await;
    }

    let page = page.lock().await;
    let clusters = page
        .clusters
        .iter()
        .map(|c| build_cluster_card(c, page.statuses.get(&c.name)))
        .collect();

    let tmpl = DashboardTemplate {
        title: "Dashboard".to_string(),
        current_nav: "dashboard".to_string(),
        breadcrumbs: vec![crumb("Dashboard", "/ui/")],
        shell: visitor.shell(),
        loading: page.loading,
        error: page.error.clone(),
        clusters,
    };

    visitor.respond(render_template(&tmpl))
}

// --- Cluster Detail ---

#[derive(Template)]
#[template(path = "cluster_detail.html")]
struct ClusterDetailTemplate {
    title: String,
    current_nav: String,
    breadcrumbs: Vec<Breadcrumb>,
    shell: ShellView,
    cluster: ClusterCardView,
    kubeconfig: String,
    metrics: Option<MetricsSample>,
    resources: Vec<ResourceView>,
    sampled: String,
}

pub async fn handle_cluster_detail(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Response {
    let visitor = Visitor::from_headers(&state, &headers).await;

    let (cluster, status, metrics) = tokio::join!(
        state.api.get_cluster(&name),
        state.api.get_cluster_status(&name),
        state.api.get_cluster_metrics(&name)
    );
    let cluster = match cluster {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("error fetching cluster {}: {}", name, e);
            return error_page(&visitor, "dashboard", dashboard::ERR_CLUSTER_DATA, &e, "/ui/");
        }
    };
    let status = status
        .inspect_err(|e| tracing::warn!("error fetching status for {}: {}", name, e))
        .ok();
    let metrics = metrics
        .inspect_err(|e| tracing::warn!("error fetching metrics for {}: {}", name, e))
        .ok();

    let tmpl = ClusterDetailTemplate {
        title: format!("Cluster: {}", name),
        current_nav: "dashboard".to_string(),
        breadcrumbs: vec![crumb("Dashboard", "/ui/"), crumb(&name, "")],
        shell: visitor.shell(),
        cluster: build_cluster_card(&cluster, status.as_ref()),
        kubeconfig: or_dash(Some(cluster.kubeconfig.as_str())),
        resources: metrics.as_ref().map(build_resource_views).unwrap_or_default(),
        sampled: metrics
            .as_ref()
            .map(|m| format_optional_date(m.timestamp.as_deref()))
            .unwrap_or_else(|| "-".to_string()),
        metrics,
    };

    visitor.respond(render_template(&tmpl))
}

// --- Pods ---

#[derive(Deserialize, Default)]
pub struct PodsQuery {
    #[serde(default)]
    pub cluster: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub retry: Option<String>,
}

#[derive(Template)]
#[template(path = "pods.html")]
struct PodsTemplate {
    title: String,
    current_nav: String,
    breadcrumbs: Vec<Breadcrumb>,
    shell: ShellView,
    loading: bool,
    error: Option<String>,
    clusters: Vec<SelectOption>,
    namespaces: Vec<SelectOption>,
    cluster: String,
    namespace: String,
    search: String,
    total: usize,
    pods: Vec<PodRowView>,
}

pub async fn handle_pods(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PodsQuery>,
) -> Response {
    let visitor = Visitor::from_headers(&state, &headers).await;
    let page = &visitor.session.pods;
    let api = &state.api;

    let (loaded, current) = {
        let p = page.lock().await;
        (p.loaded, p.selection.clone())
    };
    if !loaded || flag(&query.retry) {
        pods::load(api, page, query.cluster, query.namespace).await;
    } else if let Some(cluster) = query.cluster.filter(|c| *c != current.cluster) {
        pods::select_cluster(api, page, cluster, query.namespace).await;
    } else if let Some(ns) = query.namespace.filter(|ns| *ns != current.namespace) {
        pods::select_namespace(api, page, ns).await;
    } else if flag(&query.refresh) {
        pods::refresh(api, page).await;
    }

    let mut page = page.lock().await;
    if let Some(q) = query.q {
        page.set_search(q);
    }

    let now = Utc::now();
    let rows = page
        .filtered_pods()
        .into_iter()
        .map(|p| build_pod_row(p, &page, now))
        .collect();

    let tmpl = PodsTemplate {
        title: "Pods".to_string(),
        current_nav: "pods".to_string(),
        breadcrumbs: vec![crumb("Dashboard", "/ui/"), crumb("Pods", "/ui/pods")],
        shell: visitor.shell(),
        loading: page.loading,
        error: page.error.clone(),
        clusters: cluster_options(&page.clusters, &page.selection.cluster),
        namespaces: namespace_options(&page.namespaces, &page.selection.namespace, "Select namespace"),
        cluster: page.selection.cluster.clone(),
        namespace: page.selection.namespace.clone(),
        search: page.search.clone(),
        total: page.pods.len(),
        pods: rows,
    };

    visitor.respond(render_template(&tmpl))
}

#[derive(Deserialize)]
pub struct PodQuery {
    pub pod: String,
}

fn pod_anchor(pod: &str) -> String {
    format!("/ui/pods#pod-{}", pod)
}

pub async fn handle_pod_expand(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PodQuery>,
) -> Response {
    let visitor = Visitor::from_headers(&state, &headers).await;
    pods::expand(
        &state.api,
        &visitor.session.pods,
        &query.pod,
        state.config.log_tail_lines,
    )
    .await;
    visitor.respond(Redirect::to(&pod_anchor(&query.pod)))
}

pub async fn handle_pod_collapse(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let visitor = Visitor::from_headers(&state, &headers).await;
    visitor.session.pods.lock().await.collapse();
    visitor.respond(Redirect::to("/ui/pods"))
}

#[derive(Template)]
#[template(path = "pod_delete.html")]
struct PodDeleteTemplate {
    title: String,
    current_nav: String,
    breadcrumbs: Vec<Breadcrumb>,
    shell: ShellView,
    pod: String,
    cluster: String,
    namespace: String,
}

/// Confirmation step; nothing is deleted until the form posts back with `confirm=true`.
pub async fn handle_pod_delete_confirm(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PodQuery>,
) -> Response {
    let visitor = Visitor::from_headers(&state, &headers).await;
    let selection = visitor.session.pods.lock().await.selection.clone();
    if !selection.is_complete() {
        return visitor.respond(Redirect::to("/ui/pods"));
    }

    let tmpl = PodDeleteTemplate {
        title: format!("Delete {}", query.pod),
        current_nav: "pods".to_string(),
        breadcrumbs: vec![
            crumb("Dashboard", "/ui/"),
            crumb("Pods", "/ui/pods"),
            crumb("Delete", ""),
        ],
        shell: visitor.shell(),
        pod: query.pod,
        cluster: selection.cluster,
        namespace: selection.namespace,
    };

    visitor.respond(render_template(&tmpl))
}

#[derive(Deserialize)]
pub struct DeleteForm {
    pub pod: String,
    #[serde(default)]
    pub cluster: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub confirm: Option<String>,
}

pub async fn handle_pod_delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<DeleteForm>,
) -> Response {
    let visitor = Visitor::from_headers(&state, &headers).await;
    if form.confirm.as_deref() == Some("true") {
        let confirmed = Selection {
            cluster: form.cluster,
            namespace: form.namespace,
        };
        pods::delete(&state.api, &visitor.session.pods, &form.pod, &confirmed).await;
    } else {
        tracing::debug!("delete of {} not confirmed", form.pod);
    }
    visitor.respond(Redirect::to("/ui/pods"))
}

// --- Pod Detail ---

#[derive(Deserialize, Default)]
pub struct ClusterQuery {
    #[serde(default)]
    pub cluster: Option<String>,
}

#[derive(Template)]
#[template(path = "pod_detail.html")]
struct PodDetailTemplate {
    title: String,
    current_nav: String,
    breadcrumbs: Vec<Breadcrumb>,
    shell: ShellView,
    cluster: String,
    pod: PodRowView,
    created: String,
    containers: Vec<ContainerView>,
    labels: Vec<LabelView>,
}

pub async fn handle_pod_detail(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((namespace, name)): Path<(String, String)>,
    Query(query): Query<ClusterQuery>,
) -> Response {
    let visitor = Visitor::from_headers(&state, &headers).await;
    let cluster = match query.cluster {
        Some(c) if !c.is_empty() => c,
        _ => visitor.session.pods.lock().await.selection.cluster.clone(),
    };

    let pod = match state.api.get_pod(&cluster, &namespace, &name).await {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!("error fetching pod {}/{} on {}: {}", namespace, name, cluster, e);
            return error_page(&visitor, "pods", pods::ERR_PODS, &e, "/ui/pods");
        }
    };

    let row = build_pod_row(&pod, &pods::PodsPage::default(), Utc::now());
    let tmpl = PodDetailTemplate {
        title: format!("Pod: {}", name),
        current_nav: "pods".to_string(),
        breadcrumbs: vec![
            crumb("Dashboard", "/ui/"),
            crumb("Pods", "/ui/pods"),
            crumb(&name, ""),
        ],
        shell: visitor.shell(),
        cluster,
        pod: row,
        created: format_optional_date(pod.metadata.creation_timestamp.as_deref()),
        containers: build_container_views(&pod),
        labels: build_label_views(&pod.metadata.labels),
    };

    visitor.respond(render_template(&tmpl))
}

// --- Nodes ---

#[derive(Deserialize, Default)]
pub struct ClusterPageQuery {
    #[serde(default)]
    pub cluster: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub retry: Option<String>,
}

#[derive(Template)]
#[template(path = "nodes.html")]
struct NodesTemplate {
    title: String,
    current_nav: String,
    breadcrumbs: Vec<Breadcrumb>,
    shell: ShellView,
    loading: bool,
    error: Option<String>,
    clusters: Vec<SelectOption>,
    cluster: String,
    metrics_available: bool,
    nodes: Vec<NodeCardView>,
}

pub async fn handle_nodes(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ClusterPageQuery>,
) -> Response {
    let visitor = Visitor::from_headers(&state, &headers).await;
    let page = &visitor.session.nodes;
    let api = &state.api;

    let (loaded, current) = {
        let p = page.lock().await;
        (p.loaded, p.selection.cluster.clone())
    };
    if !loaded || flag(&query.retry) {
        nodes::load(api, page, query.cluster).await;
    } else if let Some(cluster) = query.cluster.filter(|c| *c != current) {
        nodes::select_cluster(api, page, cluster).await;
    } else if flag(&query.refresh) {
        nodes::refresh(api, page).await;
    }

    let page = page.lock().await;
    let now = Utc::now();
    let cards = page
        .nodes
        .iter()
        .map(|n| build_node_card(n, page.metrics_for(&n.metadata.name), now))
        .collect();

    let tmpl = NodesTemplate {
        title: "Nodes".to_string(),
        current_nav: "nodes".to_string(),
        breadcrumbs: vec![crumb("Dashboard", "/ui/"), crumb("Nodes", "/ui/nodes")],
        shell: visitor.shell(),
        loading: page.loading,
        error: page.error.clone(),
        clusters: cluster_options(&page.clusters, &page.selection.cluster),
        cluster: page.selection.cluster.clone(),
        metrics_available: page.metrics_available,
        nodes: cards,
    };

    visitor.respond(render_template(&tmpl))
}

// --- Node Detail ---

#[derive(Template)]
#[template(path = "node_detail.html")]
struct NodeDetailTemplate {
    title: String,
    current_nav: String,
    breadcrumbs: Vec<Breadcrumb>,
    shell: ShellView,
    cluster: String,
    node: NodeCardView,
    allocatable: Vec<LabelView>,
    labels: Vec<LabelView>,
}

pub async fn handle_node_detail(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
    Query(query): Query<ClusterQuery>,
) -> Response {
    let visitor = Visitor::from_headers(&state, &headers).await;
    let cluster = match query.cluster {
        Some(c) if !c.is_empty() => c,
        _ => visitor.session.nodes.lock().await.selection.cluster.clone(),
    };

    let (node, metrics) = tokio::join!(
        state.api.get_node(&cluster, &name),
        state.api.get_node_metrics(&cluster)
    );
    let node = match node {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!("error fetching node {} on {}: {}", name, cluster, e);
            return error_page(&visitor, "nodes", nodes::ERR_NODES, &e, "/ui/nodes");
        }
    };
    let metrics = metrics
        .inspect_err(|e| tracing::warn!("node metrics unavailable for {}: {}", cluster, e))
        .unwrap_or_default();

    let tmpl = NodeDetailTemplate {
        title: format!("Node: {}", name),
        current_nav: "nodes".to_string(),
        breadcrumbs: vec![
            crumb("Dashboard", "/ui/"),
            crumb("Nodes", "/ui/nodes"),
            crumb(&name, ""),
        ],
        shell: visitor.shell(),
        cluster,
        node: build_node_card(&node, metrics.get(&name), Utc::now()),
        allocatable: build_label_views(&node.status.allocatable),
        labels: build_label_views(&node.metadata.labels),
    };

    visitor.respond(render_template(&tmpl))
}

// --- Events ---

#[derive(Deserialize, Default)]
pub struct EventsQuery {
    #[serde(default)]
    pub cluster: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub retry: Option<String>,
}

#[derive(Template)]
#[template(path = "events.html")]
struct EventsTemplate {
    title: String,
    current_nav: String,
    breadcrumbs: Vec<Breadcrumb>,
    shell: ShellView,
    loading: bool,
    error: Option<String>,
    clusters: Vec<SelectOption>,
    namespaces: Vec<SelectOption>,
    cluster: String,
    events: Vec<EventView>,
}

pub async fn handle_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<EventsQuery>,
) -> Response {
    let visitor = Visitor::from_headers(&state, &headers).await;
    let page = &visitor.session.events;
    let api = &state.api;

    let loaded = page.lock().await.loaded;
    if !loaded || flag(&query.retry) {
        events::load(api, page, query.cluster, query.namespace).await;
    } else if query.cluster.is_some() || query.namespace.is_some() {
        events::select(api, page, query.cluster, query.namespace).await;
    }
    if flag(&query.refresh) {
        events::refresh(api, page).await;
    }

    let page = page.lock().await;
    let tmpl = EventsTemplate {
        title: "Events".to_string(),
        current_nav: "events".to_string(),
        breadcrumbs: vec![crumb("Dashboard", "/ui/"), crumb("Events", "/ui/events")],
        shell: visitor.shell(),
        loading: page.loading,
        error: page.error.clone(),
        clusters: cluster_options(&page.clusters, &page.selection.cluster),
        namespaces: namespace_options(&page.namespaces, &page.selection.namespace, "All namespaces"),
        cluster: page.selection.cluster.clone(),
        events: page.events.iter().map(build_event_view).collect(),
    };

    visitor.respond(render_template(&tmpl))
}

// --- Monitoring ---

#[derive(Template)]
#[template(path = "monitoring.html")]
struct MonitoringTemplate {
    title: String,
    current_nav: String,
    breadcrumbs: Vec<Breadcrumb>,
    shell: ShellView,
    loading: bool,
    error: Option<String>,
    clusters: Vec<SelectOption>,
    cluster: String,
    has_data: bool,
    active: bool,
    data_points: u32,
    open_alerts: usize,
    alerts: Vec<AlertView>,
    charts: Vec<ChartView>,
    chart_width: u32,
    chart_height: u32,
    resources: Vec<ResourceView>,
}

pub async fn handle_monitoring(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ClusterPageQuery>,
) -> Response {
    let visitor = Visitor::from_headers(&state, &headers).await;
    let page = &visitor.session.monitoring;
    let api = &state.api;

    let (loaded, current) = {
        let p = page.lock().await;
        (p.loaded, p.selection.cluster.clone())
    };
    if !loaded || flag(&query.retry) {
        monitoring::load(api, page, query.cluster).await;
    } else if let Some(cluster) = query.cluster.filter(|c| *c != current) {
        monitoring::select_cluster(api, page, cluster).await;
    } else if flag(&query.refresh) {
        monitoring::refresh(api, page).await;
    }

    let page = page.lock().await;
    let data = page.data.as_ref();
    let tmpl = MonitoringTemplate {
        title: "Monitoring".to_string(),
        current_nav: "monitoring".to_string(),
        breadcrumbs: vec![
            crumb("Dashboard", "/ui/"),
            crumb("Monitoring", "/ui/monitoring"),
        ],
        shell: visitor.shell(),
        loading: page.loading,
        error: page.error.clone(),
        clusters: cluster_options(&page.clusters, &page.selection.cluster),
        cluster: page.selection.cluster.clone(),
        has_data: data.is_some(),
        active: data.is_some_and(|d| d.status.active),
        data_points: data.map(|d| d.status.data_points).unwrap_or_default(),
        open_alerts: data.map_or(0, |d| d.alerts.iter().filter(|a| !a.resolved).count()),
        alerts: data
            .map(|d| d.alerts.iter().map(build_alert_view).collect())
            .unwrap_or_default(),
        charts: data.map(|d| history_charts(&d.history)).unwrap_or_default(),
        chart_width: CHART_WIDTH,
        chart_height: CHART_HEIGHT,
        resources: data
            .and_then(|d| d.history.last())
            .map(build_resource_views)
            .unwrap_or_default(),
    };

    visitor.respond(render_template(&tmpl))
}

// --- Shell actions ---

pub async fn handle_toggle_theme(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let visitor = Visitor::from_headers(&state, &headers).await;
    let theme = visitor.session.shell.toggle_theme();
    tracing::debug!("session {} switched to {} theme", visitor.session.id, theme.as_str());
    visitor.respond(Redirect::to(&back_target(&headers)))
}

pub async fn handle_toggle_menu(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let visitor = Visitor::from_headers(&state, &headers).await;
    visitor.session.shell.toggle_menu();
    visitor.respond(Redirect::to(&back_target(&headers)))
}

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::logs::LogState;
use super::{FetchSeq, Selection, Ticket, choose_cluster, choose_namespace};
use crate::clients::ApiClient;
use crate::error::ApiError;
use crate::models::backend::Cluster;
use crate::models::k8s::{Namespace, Pod};

pub const ERR_CLUSTERS: &str = "Failed to fetch clusters";
pub const ERR_NAMESPACES: &str = "Failed to fetch namespaces";
pub const ERR_PODS: &str = "Failed to fetch pods";
pub const ERR_DELETE: &str = "Failed to delete pod";

/// Log fetches and deletes are tied to the selection they were issued under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodTicket {
    pub selection: Selection,
    pub pod: String,
}

#[derive(Debug, Default)]
pub struct PodsPage {
    pub clusters: Vec<Cluster>,
    pub namespaces: Vec<Namespace>,
    pub selection: Selection,
    pub pods: Vec<Pod>,
    pub loading: bool,
    pub loaded: bool,
    pub error: Option<String>,
    pub expanded: Option<String>,
    pub logs: HashMap<String, LogState>,
    pub search: String,
    seq: FetchSeq,
}

impl PodsPage {
    /// Starts the full cascade. `cluster`/`namespace` are kept if the backend lists them.
    pub fn begin_clusters(&mut self, cluster: Option<String>, namespace: Option<String>) -> Ticket {
        if let Some(c) = cluster {
            if c != self.selection.cluster {
                self.reset_cluster(c);
            }
        }
        if let Some(ns) = namespace {
            if ns != self.selection.namespace {
                self.selection.namespace = ns;
                self.clear_logs();
            }
        }
        self.error = None;
        self.seq.begin(&self.selection)
    }

    pub fn apply_clusters(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<Cluster>, ApiError>,
    ) -> Option<Ticket> {
        if !self.accept(&ticket) {
            return None;
        }
        self.loaded = true;
        match result {
            Ok(clusters) => {
                let chosen = choose_cluster(&clusters, &self.selection.cluster);
                self.clusters = clusters;
                if chosen != self.selection.cluster {
                    self.reset_cluster(chosen);
                }
                if self.selection.cluster.is_empty() {
                    return None;
                }
                Some(self.seq.begin(&self.selection))
            }
            Err(e) => {
                warn!("error fetching clusters: {}", e);
                self.error = Some(ERR_CLUSTERS.to_string());
                None
            }
        }
    }

    /// Returns a ticket for the namespace fetch, or `None` when nothing changes.
    pub fn select_cluster(&mut self, cluster: String, namespace: Option<String>) -> Option<Ticket> {
        if cluster == self.selection.cluster {
            return None;
        }
        self.reset_cluster(cluster);
        if let Some(ns) = namespace {
            self.selection.namespace = ns;
        }
        self.error = None;
        let ticket = self.seq.begin(&self.selection);
        if self.selection.cluster.is_empty() {
            return None;
        }
        Some(ticket)
    }

    pub fn apply_namespaces(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<Namespace>, ApiError>,
    ) -> Option<Ticket> {
        if !self.accept(&ticket) {
            return None;
        }
        match result {
            Ok(namespaces) => {
                let chosen = choose_namespace(&namespaces, &self.selection.namespace);
                self.namespaces = namespaces;
                if chosen != self.selection.namespace {
                    self.selection.namespace = chosen;
                    self.clear_logs();
                }
                if self.selection.namespace.is_empty() {
                    self.pods.clear();
                    return None;
                }
                Some(self.begin_pods())
            }
            Err(e) => {
                warn!(
                    "error fetching namespaces for {}: {}",
                    ticket.selection.cluster, e
                );
                self.error = Some(ERR_NAMESPACES.to_string());
                None
            }
        }
    }

    pub fn select_namespace(&mut self, namespace: String) -> Option<Ticket> {
        if namespace == self.selection.namespace {
            return None;
        }
        if !namespace.is_empty() && !self.namespaces.iter().any(|n| n.metadata.name == namespace) {
            debug!("ignoring unknown namespace {:?}", namespace);
            return None;
        }
        self.selection.namespace = namespace;
        self.clear_logs();
        self.error = None;
        if self.selection.namespace.is_empty() {
            // Invalidate any pod fetch still in flight for the previous namespace.
            self.seq.begin(&self.selection);
            self.pods.clear();
            self.loading = false;
            return None;
        }
        Some(self.begin_pods())
    }

    /// Ticket for re-fetching the pod list of the current selection.
    pub fn begin_refresh(&mut self) -> Option<Ticket> {
        if !self.selection.is_complete() {
            return None;
        }
        self.error = None;
        Some(self.begin_pods())
    }

    pub fn apply_pods(&mut self, ticket: Ticket, result: Result<Vec<Pod>, ApiError>) -> bool {
        if !self.accept(&ticket) {
            return false;
        }
        self.loading = false;
        match result {
            Ok(pods) => {
                self.pods = pods;
                true
            }
            Err(e) => {
                warn!(
                    "error fetching pods for {}/{}: {}",
                    ticket.selection.cluster, ticket.selection.namespace, e
                );
                self.error = Some(ERR_PODS.to_string());
                false
            }
        }
    }

    pub fn log_state(&self, pod: &str) -> LogState {
        self.logs.get(pod).cloned().unwrap_or_default()
    }

    /// Opens the log panel of `pod`. Returns a ticket only if its logs must be fetched.
    pub fn expand(&mut self, pod: &str) -> Option<PodTicket> {
        if !self.selection.is_complete() {
            return None;
        }
        self.expanded = Some(pod.to_string());
        let state = self.logs.entry(pod.to_string()).or_default();
        if !state.needs_fetch() {
            return None;
        }
        *state = LogState::Loading;
        Some(PodTicket {
            selection: self.selection.clone(),
            pod: pod.to_string(),
        })
    }

    pub fn collapse(&mut self) {
        self.expanded = None;
    }

    pub fn apply_logs(&mut self, ticket: PodTicket, result: Result<String, ApiError>) {
        if ticket.selection != self.selection {
            debug!("dropping logs for {} from previous selection", ticket.pod);
            return;
        }
        let state = match result {
            Ok(text) => LogState::Loaded(text),
            Err(e) => {
                warn!("error fetching logs for pod {}: {}", ticket.pod, e);
                LogState::Failed(e.to_string())
            }
        };
        self.logs.insert(ticket.pod, state);
    }

    /// `confirmed` is the selection the user saw on the confirmation page. The
    /// delete is refused if the page has since moved to another selection.
    pub fn begin_delete(&mut self, pod: &str, confirmed: &Selection) -> Option<PodTicket> {
        if !self.selection.is_complete() {
            return None;
        }
        if *confirmed != self.selection {
            warn!(
                "refusing to delete pod {}: confirmed for {}/{}, page is on {}/{}",
                pod,
                confirmed.cluster,
                confirmed.namespace,
                self.selection.cluster,
                self.selection.namespace
            );
            self.error = Some(ERR_DELETE.to_string());
            return None;
        }
        Some(PodTicket {
            selection: self.selection.clone(),
            pod: pod.to_string(),
        })
    }

    /// On success hands back a ticket for the full list re-fetch; rows are never removed locally.
    pub fn apply_delete(&mut self, ticket: PodTicket, result: Result<(), ApiError>) -> Option<Ticket> {
        if ticket.selection != self.selection {
            debug!("dropping delete result for {} from previous selection", ticket.pod);
            return None;
        }
        match result {
            Ok(()) => {
                info!(
                    "deleted pod {}/{} on {}",
                    ticket.selection.namespace, ticket.pod, ticket.selection.cluster
                );
                self.logs.remove(&ticket.pod);
                if self.expanded.as_deref() == Some(ticket.pod.as_str()) {
                    self.expanded = None;
                }
                self.begin_refresh()
            }
            Err(e) => {
                warn!("error deleting pod {}: {}", ticket.pod, e);
                self.error = Some(ERR_DELETE.to_string());
                None
            }
        }
    }

    pub fn set_search(&mut self, term: String) {
        self.search = term;
    }

    pub fn filtered_pods(&self) -> Vec<&Pod> {
        let needle = self.search.to_lowercase();
        self.pods
            .iter()
            .filter(|p| p.metadata.name.to_lowercase().contains(&needle))
            .collect()
    }

    fn begin_pods(&mut self) -> Ticket {
        self.loading = true;
        self.seq.begin(&self.selection)
    }

    fn reset_cluster(&mut self, cluster: String) {
        self.selection = Selection::cluster(cluster);
        self.namespaces.clear();
        self.pods.clear();
        self.clear_logs();
    }

    fn clear_logs(&mut self) {
        self.logs.clear();
        self.expanded = None;
    }

    fn accept(&self, ticket: &Ticket) -> bool {
        if self.seq.is_current(ticket) {
            return true;
        }
        debug!(
            "dropping stale response for {}/{}",
            ticket.selection.cluster, ticket.selection.namespace
        );
        false
    }
}

// --- Fetch drivers. The page lock is never held across a network call. ---

pub async fn load(
    api: &ApiClient,
    page: &Mutex<PodsPage>,
    cluster: Option<String>,
    namespace: Option<String>,
) {
    let ticket = page.lock().await.begin_clusters(cluster, namespace);
    let result = api.list_clusters().await;
    let next = page.lock().await.apply_clusters(ticket, result);
    if let Some(ticket) = next {
        fetch_namespaces(api, page, ticket).await;
    }
}

pub async fn select_cluster(
    api: &ApiClient,
    page: &Mutex<PodsPage>,
    cluster: String,
    namespace: Option<String>,
) {
    let next = page.lock().await.select_cluster(cluster, namespace);
    if let Some(ticket) = next {
        fetch_namespaces(api, page, ticket).await;
    }
}

pub async fn select_namespace(api: &ApiClient, page: &Mutex<PodsPage>, namespace: String) {
    let next = page.lock().await.select_namespace(namespace);
    if let Some(ticket) = next {
        fetch_pods(api, page, ticket).await;
    }
}

pub async fn refresh(api: &ApiClient, page: &Mutex<PodsPage>) {
    let next = page.lock().await.begin_refresh();
    if let Some(ticket) = next {
        fetch_pods(api, page, ticket).await;
    }
}

/// The log fetch runs in its own task so a `Loading` entry always settles, even
/// when the request that started it goes away.
pub async fn expand(api: &ApiClient, page: &Arc<Mutex<PodsPage>>, pod: &str, tail_lines: u32) {
    let Some(ticket) = page.lock().await.expand(pod) else {
        return;
    };
    let api = api.clone();
    let page = Arc::clone(page);
    let fetch = tokio::spawn(async move {
        let sel = &ticket.selection;
        let result = api
            .get_pod_logs(&sel.cluster, &sel.namespace, &ticket.pod, tail_lines)
            .await;
        page.lock().await.apply_logs(ticket, result);
    });
    if let Err(e) = fetch.await {
        warn!("log fetch task for {} failed: {}", pod, e);
    }
}

pub async fn delete(api: &ApiClient, page: &Mutex<PodsPage>, pod: &str, confirmed: &Selection) {
    let next = page.lock().await.begin_delete(pod, confirmed);
    let Some(ticket) = next else {
        return;
    };
    let sel = &ticket.selection;
    let result = api.delete_pod(&sel.cluster, &sel.namespace, &ticket.pod).await;
    let next = page.lock().await.apply_delete(ticket, result);
    if let Some(ticket) = next {
        fetch_pods(api, page, ticket).await;
    }
}

async fn fetch_namespaces(api: &ApiClient, page: &Mutex<PodsPage>, ticket: Ticket) {
    let result = api.list_namespaces(&ticket.selection.cluster).await;
    let next = page.lock().await.apply_namespaces(ticket, result);
    if let Some(ticket) = next {
        fetch_pods(api, page, ticket).await;
    }
}

async fn fetch_pods(api: &ApiClient, page: &Mutex<PodsPage>, ticket: Ticket) {
    let result = api
        .list_pods(&ticket.selection.cluster, &ticket.selection.namespace)
        .await;
    page.lock().await.apply_pods(ticket, result);
}

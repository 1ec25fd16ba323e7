use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{FetchSeq, Selection, Ticket, choose_cluster};
use crate::clients::ApiClient;
use crate::error::ApiError;
use crate::models::backend::{Cluster, NodeMetrics};
use crate::models::k8s::Node;

pub const ERR_CLUSTERS: &str = "Failed to fetch clusters";
pub const ERR_NODES: &str = "Failed to fetch nodes";

#[derive(Debug, Default)]
pub struct NodesPage {
    pub clusters: Vec<Cluster>,
    pub selection: Selection,
    pub nodes: Vec<Node>,
    pub metrics: HashMap<String, NodeMetrics>,
    /// False when the last metrics fetch failed; capacity is shown instead.
    pub metrics_available: bool,
    pub loading: bool,
    pub loaded: bool,
    pub error: Option<String>,
    seq: FetchSeq,
}

impl NodesPage {
    pub fn begin_clusters(&mut self, cluster: Option<String>) -> Ticket {
        if let Some(c) = cluster {
            if c != self.selection.cluster {
                self.reset_cluster(c);
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
                self.begin_refresh()
            }
            Err(e) => {
                warn!("error fetching clusters: {}", e);
                self.error = Some(ERR_CLUSTERS.to_string());
                None
            }
        }
    }

    pub fn select_cluster(&mut self, cluster: String) -> Option<Ticket> {
        if cluster == self.selection.cluster {
            return None;
        }
        self.reset_cluster(cluster);
        self.seq.begin(&self.selection);
        self.loading = false;
        self.begin_refresh()
    }

    pub fn begin_refresh(&mut self) -> Option<Ticket> {
        if self.selection.cluster.is_empty() {
            return None;
        }
        self.loading = true;
        self.error = None;
        Some(self.seq.begin(&self.selection))
    }

    pub fn apply_nodes(
        &mut self,
        ticket: Ticket,
        nodes: Result<Vec<Node>, ApiError>,
        metrics: Result<HashMap<String, NodeMetrics>, ApiError>,
    ) -> bool {
        if !self.accept(&ticket) {
            return false;
        }
        self.loading = false;

        match metrics {
            Ok(m) => {
                self.metrics = m;
                self.metrics_available = true;
            }
            Err(e) => {
                warn!(
                    "error fetching node metrics for {}: {}",
                    ticket.selection.cluster, e
                );
                self.metrics_available = false;
            }
        }

        match nodes {
            Ok(n) => {
                self.nodes = n;
                true
            }
            Err(e) => {
                warn!("error fetching nodes for {}: {}", ticket.selection.cluster, e);
                self.error = Some(ERR_NODES.to_string());
                false
            }
        }
    }

    pub fn metrics_for(&self, node: &str) -> Option<&NodeMetrics> {
        if !self.metrics_available {
            return None;
        }
        self.metrics.get(node)
    }

    fn reset_cluster(&mut self, cluster: String) {
        self.selection = Selection::cluster(cluster);
        self.nodes.clear();
        self.metrics.clear();
    }

    fn accept(&self, ticket: &Ticket) -> bool {
        if self.seq.is_current(ticket) {
            return true;
        }
        debug!("dropping stale node response for {}", ticket.selection.cluster);
        false
    }
}

pub async fn load(api: &ApiClient, page: &Mutex<NodesPage>, cluster: Option<String>) {
    let ticket = page.lock().await.begin_clusters(cluster);
    let result = api.list_clusters().await;
    let next = page.lock().await.apply_clusters(ticket, result);
    if let Some(ticket) = next {
        fetch_nodes(api, page, ticket).await;
    }
}

pub async fn select_cluster(api: &ApiClient, page: &Mutex<NodesPage>, cluster: String) {
    let next = page.lock().await.select_cluster(cluster);
    if let Some(ticket) = next {
        fetch_nodes(api, page, ticket).await;
    }
}

pub async fn refresh(api: &ApiClient, page: &Mutex<NodesPage>) {
    let next = page.lock().await.begin_refresh();
    if let Some(ticket) = next {
        fetch_nodes(api, page, ticket).await;
    }
}

async fn fetch_nodes(api: &ApiClient, page: &Mutex<NodesPage>, ticket: Ticket) {
    let cluster = ticket.selection.cluster.clone();
    let (nodes, metrics) = tokio::join!(api.list_nodes(&cluster), api.get_node_metrics(&cluster));
    page.lock().await.apply_nodes(ticket, nodes, metrics);
}

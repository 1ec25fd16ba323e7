use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{FetchSeq, Selection, Ticket, choose_cluster};
use crate::clients::ApiClient;
use crate::error::ApiError;
use crate::models::backend::{Alert, Cluster, MetricsSample, MonitorStatus};

pub const ERR_CLUSTERS: &str = "Failed to fetch clusters";
pub const ERR_MONITORING: &str = "Failed to fetch monitoring data";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitoringData {
    pub status: MonitorStatus,
    pub alerts: Vec<Alert>,
    pub history: Vec<MetricsSample>,
}

#[derive(Debug, Default)]
pub struct MonitoringPage {
    pub clusters: Vec<Cluster>,
    pub selection: Selection,
    pub data: Option<MonitoringData>,
    pub loading: bool,
    pub loaded: bool,
    pub error: Option<String>,
    seq: FetchSeq,
}

impl MonitoringPage {
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

    pub fn apply_data(&mut self, ticket: Ticket, result: Result<MonitoringData, ApiError>) -> bool {
        if !self.accept(&ticket) {
            return false;
        }
        self.loading = false;
        match result {
            Ok(data) => {
                self.data = Some(data);
                true
            }
            Err(e) => {
                warn!(
                    "error fetching monitoring data for {}: {}",
                    ticket.selection.cluster, e
                );
                self.error = Some(ERR_MONITORING.to_string());
                false
            }
        }
    }

    fn reset_cluster(&mut self, cluster: String) {
        self.selection = Selection::cluster(cluster);
        self.data = None;
    }

    fn accept(&self, ticket: &Ticket) -> bool {
        if self.seq.is_current(ticket) {
            return true;
        }
        debug!(
            "dropping stale monitoring response for {}",
            ticket.selection.cluster
        );
        false
    }
}

pub async fn fetch_data(api: &ApiClient, cluster: &str) -> Result<MonitoringData, ApiError> {
    let (status, alerts, history) = tokio::try_join!(
        api.get_monitor_status(cluster),
        api.get_alerts(cluster),
        api.get_history(cluster)
    )?;
    Ok(MonitoringData {
        status,
        alerts,
        history,
    })
}

pub async fn load(api: &ApiClient, page: &Mutex<MonitoringPage>, cluster: Option<String>) {
    let ticket = page.lock().await.begin_clusters(cluster);
    let result = api.list_clusters().await;
    let next = page.lock().await.apply_clusters(ticket, result);
    if let Some(ticket) = next {
        fetch(api, page, ticket).await;
    }
}

pub async fn select_cluster(api: &ApiClient, page: &Mutex<MonitoringPage>, cluster: String) {
    let next = page.lock().await.select_cluster(cluster);
    if let Some(ticket) = next {
        fetch(api, page, ticket).await;
    }
}

pub async fn refresh(api: &ApiClient, page: &Mutex<MonitoringPage>) {
    let next = page.lock().await.begin_refresh();
    if let Some(ticket) = next {
        fetch(api, page, ticket).await;
    }
}

async fn fetch(api: &ApiClient, page: &Mutex<MonitoringPage>, ticket: Ticket) {
    let result = fetch_data(api, &ticket.selection.cluster).await;
    page.lock().await.apply_data(ticket, result);
}

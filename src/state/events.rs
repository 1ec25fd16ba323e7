use chrono::DateTime;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{FetchSeq, Selection, Ticket, choose_cluster};
use crate::clients::ApiClient;
use crate::error::ApiError;
use crate::models::backend::Cluster;
use crate::models::k8s::{Event, Namespace};

pub const ERR_CLUSTERS: &str = "Failed to fetch clusters";
pub const ERR_NAMESPACES: &str = "Failed to fetch namespaces";
pub const ERR_EVENTS: &str = "Failed to fetch events";

/// Cluster events, optionally narrowed to one namespace (empty namespace = all).
#[derive(Debug, Default)]
pub struct EventsPage {
    pub clusters: Vec<Cluster>,
    pub namespaces: Vec<Namespace>,
    pub selection: Selection,
    pub events: Vec<Event>,
    pub loading: bool,
    pub loaded: bool,
    pub error: Option<String>,
    seq: FetchSeq,
}

impl EventsPage {
    pub fn begin_clusters(&mut self, cluster: Option<String>, namespace: Option<String>) -> Ticket {
        if let Some(c) = cluster {
            if c != self.selection.cluster {
                self.reset_cluster(c);
            }
        }
        if let Some(ns) = namespace {
            self.selection.namespace = ns;
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

    /// Applies a cluster and/or namespace change; returns a ticket only when something changed.
    pub fn select(&mut self, cluster: Option<String>, namespace: Option<String>) -> Option<Ticket> {
        let mut changed = false;
        if let Some(c) = cluster.filter(|c| *c != self.selection.cluster) {
            self.reset_cluster(c);
            changed = true;
        }
        if let Some(ns) = namespace.filter(|ns| *ns != self.selection.namespace) {
            self.selection.namespace = ns;
            changed = true;
        }
        if !changed {
            return None;
        }
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

    pub fn apply_events(
        &mut self,
        ticket: Ticket,
        namespaces: Result<Vec<Namespace>, ApiError>,
        events: Result<Vec<Event>, ApiError>,
    ) -> bool {
        if !self.accept(&ticket) {
            return false;
        }
        self.loading = false;

        match namespaces {
            Ok(ns) => self.namespaces = ns,
            Err(e) => {
                warn!(
                    "error fetching namespaces for {}: {}",
                    ticket.selection.cluster, e
                );
                self.error = Some(ERR_NAMESPACES.to_string());
            }
        }

        match events {
            Ok(mut events) => {
                sort_newest_first(&mut events);
                self.events = events;
                true
            }
            Err(e) => {
                warn!("error fetching events for {}: {}", ticket.selection.cluster, e);
                self.error = Some(ERR_EVENTS.to_string());
                false
            }
        }
    }

    fn reset_cluster(&mut self, cluster: String) {
        self.selection = Selection::cluster(cluster);
        self.namespaces.clear();
        self.events.clear();
    }

    fn accept(&self, ticket: &Ticket) -> bool {
        if self.seq.is_current(ticket) {
            return true;
        }
        debug!("dropping stale events for {}", ticket.selection.cluster);
        false
    }
}

/// Events without a timestamp sink to the bottom.
pub fn sort_newest_first(events: &mut [Event]) {
    events.sort_by_key(|e| {
        std::cmp::Reverse(
            e.last_timestamp
                .as_deref()
                .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                .map(|t| t.timestamp()),
        )
    });
}

pub async fn load(
    api: &ApiClient,
    page: &Mutex<EventsPage>,
    cluster: Option<String>,
    namespace: Option<String>,
) {
    let ticket = page.lock().await.begin_clusters(cluster, namespace);
    let result = api.list_clusters().await;
    let next = page.lock().await.apply_clusters(ticket, result);
    if let Some(ticket) = next {
        fetch(api, page, ticket).await;
    }
}

pub async fn select(
    api: &ApiClient,
    page: &Mutex<EventsPage>,
    cluster: Option<String>,
    namespace: Option<String>,
) {
    let next = page.lock().await.select(cluster, namespace);
    if let Some(ticket) = next {
        fetch(api, page, ticket).await;
    }
}

pub async fn refresh(api: &ApiClient, page: &Mutex<EventsPage>) {
    let next = page.lock().await.begin_refresh();
    if let Some(ticket) = next {
        fetch(api, page, ticket).await;
    }
}

async fn fetch(api: &ApiClient, page: &Mutex<EventsPage>, ticket: Ticket) {
    let sel = ticket.selection.clone();
    let namespace = (!sel.namespace.is_empty()).then_some(sel.namespace.as_str());
    let (namespaces, events) = tokio::join!(
        api.list_namespaces(&sel.cluster),
        api.list_events(&sel.cluster, namespace)
    );
    page.lock().await.apply_events(ticket, namespaces, events);
}

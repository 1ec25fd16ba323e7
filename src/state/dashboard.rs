use futures_util::future::try_join_all;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{FetchSeq, Selection, Ticket};
use crate::clients::ApiClient;
use crate::error::ApiError;
use crate::models::backend::{Cluster, ClusterStatus};

pub const ERR_CLUSTER_DATA: &str = "Failed to fetch cluster data";

#[derive(Debug, Default)]
pub struct DashboardPage {
    pub clusters: Vec<Cluster>,
    pub statuses: HashMap<String, ClusterStatus>,
    pub loading: bool,
    pub loaded: bool,
    pub error: Option<String>,
    seq: FetchSeq,
}

pub type Overview = (Vec<Cluster>, HashMap<String, ClusterStatus>);

impl DashboardPage {
    pub fn begin(&mut self) -> Ticket {
        self.loading = true;
        self.error = None;
        self.seq.begin(&Selection::default())
    }

    pub fn apply(&mut self, ticket: Ticket, result: Result<Overview, ApiError>) -> bool {
        if !self.seq.is_current(&ticket) {
            debug!("dropping stale dashboard response");
            return false;
        }
        self.loading = false;
        self.loaded = true;
        match result {
            Ok((clusters, statuses)) => {
                self.clusters = clusters;
                self.statuses = statuses;
                true
            }
            Err(e) => {
                warn!("error fetching cluster data: {}", e);
                self.error = Some(ERR_CLUSTER_DATA.to_string());
                false
            }
        }
    }
}

/// Lists clusters, then fetches every cluster's status concurrently. One failure fails the page.
pub async fn fetch_overview(api: &ApiClient) -> Result<Overview, ApiError> {
    let clusters = api.list_clusters().await?;
    let statuses = try_join_all(clusters.iter().map(|c| api.get_cluster_status(&c.name))).await?;
    let statuses = clusters
        .iter()
        .map(|c| c.name.clone())
        .zip(statuses)
        .collect();
    Ok((clusters, statuses))
}

pub async fn load(api: &ApiClient, page: &Mutex<DashboardPage>) {
    let ticket = page.lock().await.begin();
    let result = fetch_overview(api).await;
    page.lock().await.apply(ticket, result);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn status_json(name: &str, ready: u32, total: u32) -> serde_json::Value {
        serde_json::json!({
            "cluster": name,
            "nodes": {"total": total, "ready": ready, "notReady": total - ready},
            "pods": {"total": 4, "running": 3, "pending": 1, "failed": 0},
            "timestamp": "2024-05-01T10:00:00Z"
        })
    }

    #[tokio::test]
    async fn loads_statuses_for_every_cluster() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/clusters"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "prod"}, {"name": "dev"}
            ])))
            .mount(&server)
            .await;
        for (name, ready) in [("prod", 3), ("dev", 1)] {
            Mock::given(method("GET"))
                .and(path(format!("/api/clusters/{name}/status")))
                .respond_with(ResponseTemplate::new(200).set_body_json(status_json(name, ready, 3)))
                .mount(&server)
                .await;
        }

        let api = ApiClient::new(&format!("{}/api", server.uri()), Duration::from_secs(5)).unwrap();
        let page = Mutex::new(DashboardPage::default());
        load(&api, &page).await;

        let page = page.lock().await;
        assert!(page.error.is_none());
        assert_eq!(page.clusters.len(), 2);
        assert_eq!(page.statuses["dev"].nodes.ready, 1);
        assert!(!page.loading);
    }

    #[tokio::test]
    async fn one_failed_status_fails_the_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/clusters"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!([{"name": "prod"}])),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/clusters/prod/status"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let api = ApiClient::new(&format!("{}/api", server.uri()), Duration::from_secs(5)).unwrap();
        let page = Mutex::new(DashboardPage::default());
        load(&api, &page).await;

        let page = page.lock().await;
        assert_eq!(page.error.as_deref(), Some(ERR_CLUSTER_DATA));
        assert!(page.clusters.is_empty());
    }

    #[test]
    fn older_refresh_does_not_overwrite_newer() {
        let mut page = DashboardPage::default();
        let first = page.begin();
        let second = page.begin();
        assert!(page.apply(second, Ok((vec![], HashMap::new()))));
        assert!(!page.apply(first, Err(ApiError::InvalidBaseUrl("x".into()))));
        assert!(page.error.is_none());
    }
}

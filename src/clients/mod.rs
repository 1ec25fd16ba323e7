use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::error::ApiError;
use crate::models::backend::{
    Alert, Cluster, ClusterStatus, MetricsSample, MonitorStatus, NodeMetrics, PodLogs,
};
use crate::models::k8s::{Event, Namespace, Node, Pod};

/// Typed client for the cluster-management backend REST API.
#[derive(Clone)]
pub struct ApiClient {
    base: Url,
    http: Client,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base =
            Url::parse(base_url).map_err(|_| ApiError::InvalidBaseUrl(base_url.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(base_url.to_string()));
        }
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { base, http })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    // --- Clusters ---

    pub async fn list_clusters(&self) -> Result<Vec<Cluster>, ApiError> {
        self.get_list(&["clusters"]).await
    }

    pub async fn get_cluster(&self, name: &str) -> Result<Cluster, ApiError> {
        self.get_json(&["clusters", name]).await
    }

    pub async fn get_cluster_status(&self, name: &str) -> Result<ClusterStatus, ApiError> {
        self.get_json(&["clusters", name, "status"]).await
    }

    pub async fn get_cluster_metrics(&self, name: &str) -> Result<MetricsSample, ApiError> {
        self.get_json(&["clusters", name, "metrics"]).await
    }

    pub async fn list_namespaces(&self, cluster: &str) -> Result<Vec<Namespace>, ApiError> {
        self.get_list(&["clusters", cluster, "namespaces"]).await
    }

    // --- Pods ---

    pub async fn list_pods(&self, cluster: &str, namespace: &str) -> Result<Vec<Pod>, ApiError> {
        self.get_list(&["clusters", cluster, "namespaces", namespace, "pods"])
            .await
    }

    pub async fn get_pod(&self, cluster: &str, namespace: &str, name: &str) -> Result<Pod, ApiError> {
        self.get_json(&["clusters", cluster, "namespaces", namespace, "pods", name])
            .await
    }

    pub async fn get_pod_logs(
        &self,
        cluster: &str,
        namespace: &str,
        name: &str,
        tail_lines: u32,
    ) -> Result<String, ApiError> {
        let segments = ["clusters", cluster, "namespaces", namespace, "pods", name, "logs"];
        let mut url = self.url(&segments)?;
        url.query_pairs_mut()
            .append_pair("tailLines", &tail_lines.to_string());
        let body: PodLogs = self.fetch(url).await?;
        Ok(body.logs)
    }

    pub async fn delete_pod(&self, cluster: &str, namespace: &str, name: &str) -> Result<(), ApiError> {
        let url = self.url(&["clusters", cluster, "namespaces", namespace, "pods", name])?;
        let path = url.path().to_string();
        let resp = self.http.delete(url).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                method: "DELETE",
                path,
                status,
                body,
            });
        }
        Ok(())
    }

    // --- Nodes ---

    pub async fn list_nodes(&self, cluster: &str) -> Result<Vec<Node>, ApiError> {
        self.get_list(&["clusters", cluster, "nodes"]).await
    }

    pub async fn get_node(&self, cluster: &str, name: &str) -> Result<Node, ApiError> {
        self.get_json(&["clusters", cluster, "nodes", name]).await
    }

    pub async fn get_node_metrics(
        &self,
        cluster: &str,
    ) -> Result<HashMap<String, NodeMetrics>, ApiError> {
        let metrics: Option<HashMap<String, NodeMetrics>> =
            self.get_json(&["clusters", cluster, "nodes", "metrics"]).await?;
        Ok(metrics.unwrap_or_default())
    }

    // --- Events ---

    pub async fn list_events(
        &self,
        cluster: &str,
        namespace: Option<&str>,
    ) -> Result<Vec<Event>, ApiError> {
        match namespace {
            Some(ns) => {
                self.get_list(&["clusters", cluster, "namespaces", ns, "events"])
                    .await
            }
            None => self.get_list(&["clusters", cluster, "events"]).await,
        }
    }

    // --- Monitoring ---

    pub async fn get_monitor_status(&self, cluster: &str) -> Result<MonitorStatus, ApiError> {
        self.get_json(&["monitoring", cluster, "status"]).await
    }

    pub async fn get_alerts(&self, cluster: &str) -> Result<Vec<Alert>, ApiError> {
        self.get_list(&["monitoring", cluster, "alerts"]).await
    }

    pub async fn get_history(&self, cluster: &str) -> Result<Vec<MetricsSample>, ApiError> {
        self.get_list(&["monitoring", cluster, "history"]).await
    }

    // Go encodes an empty slice as `null`; treat that as an empty list.
    async fn get_list<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<Vec<T>, ApiError> {
        let items: Option<Vec<T>> = self.get_json(segments).await?;
        Ok(items.unwrap_or_default())
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let url = self.url(segments)?;
        self.fetch(url).await
    }

    async fn fetch<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let path = url.path().to_string();
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                method: "GET",
                path,
                status,
                body,
            });
        }

        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|source| ApiError::Decode { path, source })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidBaseUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(&format!("{}/api", server.uri()), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn rejects_unusable_base_url() {
        assert!(matches!(
            ApiClient::new("not a url", Duration::from_secs(1)),
            Err(ApiError::InvalidBaseUrl(_))
        ));
        assert!(matches!(
            ApiClient::new("mailto:ops@example.com", Duration::from_secs(1)),
            Err(ApiError::InvalidBaseUrl(_))
        ));
    }

    #[tokio::test]
    async fn lists_clusters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/clusters"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "prod", "kubeconfig": "/etc/kube/prod", "context": "prod-admin"},
                {"name": "staging", "kubeconfig": "", "context": ""}
            ])))
            .mount(&server)
            .await;

        let clusters = client_for(&server).await.list_clusters().await.unwrap();
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].context, "prod-admin");
    }

    #[tokio::test]
    async fn null_list_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/monitoring/prod/alerts"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;

        let alerts = client_for(&server).await.get_alerts("prod").await.unwrap();
        assert!(alerts.is_empty());
    }

    #[tokio::test]
    async fn pod_logs_send_tail_lines() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/clusters/prod/namespaces/default/pods/web-0/logs"))
            .and(query_param("tailLines", "100"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"logs": "line1\nline2\n"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let logs = client_for(&server)
            .await
            .get_pod_logs("prod", "default", "web-0", 100)
            .await
            .unwrap();
        assert_eq!(logs, "line1\nline2\n");
    }

    #[tokio::test]
    async fn delete_not_found_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/clusters/prod/namespaces/default/pods/gone"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(serde_json::json!({"error": "not found"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .delete_pod("prod", "default", "gone")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("DELETE"));
    }

    #[tokio::test]
    async fn path_segments_are_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/clusters/a%20b/nodes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let nodes = client_for(&server).await.list_nodes("a b").await.unwrap();
        assert!(nodes.is_empty());
    }

    #[tokio::test]
    async fn namespaced_and_cluster_events_use_distinct_paths() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/clusters/prod/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"metadata": {"name": "e1", "namespace": "kube-system"}, "type": "Normal", "reason": "Pulled", "message": "ok"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/clusters/prod/namespaces/default/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert_eq!(client.list_events("prod", None).await.unwrap().len(), 1);
        assert!(client.list_events("prod", Some("default")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/clusters/prod/status"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .get_cluster_status("prod")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }
}

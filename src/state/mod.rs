//! Per-session view state for each console page.
//!
//! Pages follow the same pattern: a selection change begins a fetch and hands
//! out a [`Ticket`], the network call runs without holding the page lock, and
//! the result is applied only if the ticket is still current. Late responses
//! for an older selection are dropped instead of overwriting newer data.

pub mod dashboard;
pub mod events;
pub mod logs;
pub mod monitoring;
pub mod nodes;
pub mod pods;
pub mod session;
pub mod shell;

use crate::models::backend::Cluster;
use crate::models::k8s::Namespace;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Selection {
    pub cluster: String,
    pub namespace: String,
}

impl Selection {
    pub fn cluster(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            namespace: String::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.cluster.is_empty() && !self.namespace.is_empty()
    }
}

/// Tag carried by an in-flight fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
    pub selection: Selection,
}

#[derive(Debug, Default)]
pub struct FetchSeq {
    generation: u64,
}

impl FetchSeq {
    /// Starts a new fetch; every ticket handed out earlier becomes stale.
    pub fn begin(&mut self, selection: &Selection) -> Ticket {
        self.generation += 1;
        Ticket {
            generation: self.generation,
            selection: selection.clone(),
        }
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        ticket.generation == self.generation
    }
}

/// Keeps `current` when the backend still lists it, otherwise falls back to the first cluster.
pub fn choose_cluster(clusters: &[Cluster], current: &str) -> String {
    if !current.is_empty() && clusters.iter().any(|c| c.name == current) {
        return current.to_string();
    }
    clusters.first().map(|c| c.name.clone()).unwrap_or_default()
}

/// Keeps `current` if listed, then prefers `default`, then the first namespace.
pub fn choose_namespace(namespaces: &[Namespace], current: &str) -> String {
    let listed = |name: &str| namespaces.iter().any(|n| n.metadata.name == name);
    if !current.is_empty() && listed(current) {
        return current.to_string();
    }
    if listed("default") {
        return "default".to_string();
    }
    namespaces
        .first()
        .map(|n| n.metadata.name.clone())
        .unwrap_or_default()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::models::backend::Cluster;
    use crate::models::k8s::{Namespace, ObjectMeta, Pod, PodStatus};

    pub fn cluster(name: &str) -> Cluster {
        Cluster {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn namespace(name: &str) -> Namespace {
        Namespace {
            metadata: ObjectMeta {
                name: name.to_string(),
                ..Default::default()
            },
        }
    }

    pub fn pod(name: &str, phase: &str) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: name.to_string(),
                namespace: "default".to_string(),
                ..Default::default()
            },
            status: PodStatus {
                phase: phase.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn newer_ticket_invalidates_older() {
        let mut seq = FetchSeq::default();
        let a = seq.begin(&Selection::cluster("a"));
        let b = seq.begin(&Selection::cluster("b"));
        assert!(!seq.is_current(&a));
        assert!(seq.is_current(&b));
    }

    #[test]
    fn choose_cluster_keeps_listed_selection() {
        let clusters = vec![cluster("prod"), cluster("staging")];
        assert_eq!(choose_cluster(&clusters, "staging"), "staging");
        assert_eq!(choose_cluster(&clusters, "gone"), "prod");
        assert_eq!(choose_cluster(&clusters, ""), "prod");
        assert_eq!(choose_cluster(&[], "prod"), "");
    }

    #[test]
    fn choose_namespace_prefers_default() {
        let namespaces = vec![namespace("kube-system"), namespace("default")];
        assert_eq!(choose_namespace(&namespaces, ""), "default");
        assert_eq!(choose_namespace(&namespaces, "kube-system"), "kube-system");
        assert_eq!(choose_namespace(&[namespace("apps")], "default"), "apps");
        assert_eq!(choose_namespace(&[], "default"), "");
    }
}

use chrono::{DateTime, Utc};

use crate::models::k8s::Node;

const KI: u64 = 1024;
const MI: u64 = KI * 1024;
const GI: u64 = MI * 1024;

/// Formats a byte count the way the pods and nodes pages display memory.
pub fn format_bytes(b: u64) -> String {
    if b >= GI {
        format!("{:.2} Gi", b as f64 / GI as f64)
    } else if b >= MI {
        format!("{:.2} Mi", b as f64 / MI as f64)
    } else if b >= KI {
        format!("{:.2} Ki", b as f64 / KI as f64)
    } else {
        format!("{} B", b)
    }
}

/// Formats a raw byte string; anything that is not a plain integer is returned as is.
pub fn format_memory(bytes: &str) -> String {
    match bytes.trim().parse::<u64>() {
        Ok(b) => format_bytes(b),
        Err(_) => bytes.to_string(),
    }
}

/// Parses a Kubernetes memory quantity ("16384Ki", "8Gi", "1073741824") into bytes.
pub fn quantity_bytes(q: &str) -> Option<u64> {
    let q = q.trim();
    let suffixes: [(&str, u64); 6] = [
        ("Ki", KI),
        ("Mi", MI),
        ("Gi", GI),
        ("Ti", GI * 1024),
        ("k", 1000),
        ("M", 1000 * 1000),
    ];
    for (suffix, mult) in suffixes {
        if let Some(n) = q.strip_suffix(suffix) {
            return n.parse::<u64>().ok().and_then(|v| v.checked_mul(mult));
        }
    }
    q.parse::<u64>().ok()
}

/// Memory quantity for display, normalised to binary units when it can be parsed.
pub fn display_memory(q: &str) -> String {
    match quantity_bytes(q) {
        Some(b) => format_bytes(b),
        None => q.to_string(),
    }
}

pub fn format_date(ts: &str) -> String {
    match DateTime::parse_from_rfc3339(ts) {
        Ok(dt) => dt.to_utc().format("%Y/%m/%d %H:%M").to_string(),
        Err(_) => ts.to_string(),
    }
}

pub fn format_optional_date(ts: Option<&str>) -> String {
    match ts {
        Some(t) if !t.is_empty() => format_date(t),
        _ => "-".to_string(),
    }
}

pub fn status_color(status: &str) -> &'static str {
    match status {
        "Running" | "Succeeded" | "Ready" => "bg-success-500",
        "Pending" => "bg-warning-500",
        "Failed" | "NotReady" => "bg-danger-500",
        _ => "bg-gray-500",
    }
}

pub fn status_text_color(status: &str) -> &'static str {
    match status {
        "Running" | "Succeeded" | "Ready" => "text-success-600",
        "Pending" => "text-warning-600",
        "Failed" | "NotReady" => "text-danger-600",
        _ => "text-gray-600",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeReadiness {
    Ready,
    NotReady,
    Unknown,
}

impl NodeReadiness {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeReadiness::Ready => "Ready",
            NodeReadiness::NotReady => "NotReady",
            NodeReadiness::Unknown => "Unknown",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            NodeReadiness::Ready => "Ready",
            NodeReadiness::NotReady => "Not Ready",
            NodeReadiness::Unknown => "Unknown",
        }
    }
}

pub fn node_readiness(node: &Node) -> NodeReadiness {
    match node
        .status
        .conditions
        .iter()
        .find(|c| c.condition_type == "Ready")
    {
        Some(c) => condition_readiness(&c.status),
        None => NodeReadiness::Unknown,
    }
}

pub fn condition_readiness(status: &str) -> NodeReadiness {
    if status == "True" {
        NodeReadiness::Ready
    } else {
        NodeReadiness::NotReady
    }
}

/// Aggregate node health of a cluster, shown on dashboard cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessIndicator {
    AllReady,
    Partial,
    NoneReady,
}

impl ReadinessIndicator {
    pub fn symbol(self) -> &'static str {
        match self {
            ReadinessIndicator::AllReady => "✅",
            ReadinessIndicator::Partial => "⚠️",
            ReadinessIndicator::NoneReady => "❌",
        }
    }

    pub fn bar_class(self) -> &'static str {
        match self {
            ReadinessIndicator::AllReady => "bg-success-500",
            ReadinessIndicator::Partial => "bg-warning-500",
            ReadinessIndicator::NoneReady => "bg-danger-500",
        }
    }
}

pub fn readiness_indicator(ready: u32, total: u32) -> ReadinessIndicator {
    if ready == total {
        ReadinessIndicator::AllReady
    } else if ready > 0 {
        ReadinessIndicator::Partial
    } else {
        ReadinessIndicator::NoneReady
    }
}

pub fn percent(part: u32, total: u32) -> u32 {
    if total == 0 {
        return 100;
    }
    ((part.min(total) as u64 * 100) / total as u64) as u32
}

pub fn alert_level_class(level: &str) -> &'static str {
    match level {
        "critical" => "text-danger-600",
        "warning" => "text-warning-600",
        _ => "text-info-600",
    }
}

pub fn event_type_class(event_type: &str) -> &'static str {
    match event_type {
        "Warning" => "text-warning-600",
        "Normal" => "text-success-600",
        _ => "text-gray-600",
    }
}

pub fn human_duration_secs(total_secs: i64) -> String {
    if total_secs < 60 {
        format!("{}s", total_secs.max(0))
    } else if total_secs < 3600 {
        format!("{}m{}s", total_secs / 60, total_secs % 60)
    } else if total_secs < 86400 {
        format!("{}h{}m", total_secs / 3600, (total_secs % 3600) / 60)
    } else {
        let days = total_secs / 86400;
        let hours = (total_secs % 86400) / 3600;
        format!("{}d{}h", days, hours)
    }
}

pub fn age_since(ts: Option<&str>, now: DateTime<Utc>) -> String {
    let ts = match ts {
        Some(s) if !s.is_empty() => s,
        _ => return "-".to_string(),
    };

    match DateTime::parse_from_rfc3339(ts) {
        Ok(dt) => human_duration_secs((now - dt.to_utc()).num_seconds()),
        Err(_) => "-".to_string(),
    }
}

pub fn or_dash(v: Option<&str>) -> String {
    match v {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => "-".to_string(),
    }
}

//! Server-side line charts for the monitoring page, drawn as inline SVG.

use crate::helpers::{format_date, percent};
use crate::models::backend::MetricsSample;

pub const CHART_WIDTH: u32 = 600;
pub const CHART_HEIGHT: u32 = 200;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartView {
    pub title: String,
    pub stroke: String,
    /// `points` attribute of the SVG polyline; empty when there is no data.
    pub points: String,
    pub latest: String,
    pub first_label: String,
    pub last_label: String,
}

impl ChartView {
    pub fn has_data(&self) -> bool {
        !self.points.is_empty()
    }
}

/// Maps percentages (0-100) onto the chart area, oldest sample on the left.
pub fn polyline(values: &[u32], width: u32, height: u32) -> String {
    match values.len() {
        0 => String::new(),
        1 => {
            let y = scale_y(values[0], height);
            format!("0,{y} {width},{y}")
        }
        n => values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let x = (i as u64 * width as u64) / (n as u64 - 1);
                format!("{},{}", x, scale_y(*v, height))
            })
            .collect::<Vec<_>>()
            .join(" "),
    }
}

fn scale_y(value: u32, height: u32) -> u32 {
    let v = value.min(100);
    height - (v * height) / 100
}

pub fn history_charts(history: &[MetricsSample]) -> Vec<ChartView> {
    let nodes: Vec<u32> = history
        .iter()
        .map(|s| percent(s.nodes.ready, s.nodes.total))
        .collect();
    let pods: Vec<u32> = history
        .iter()
        .map(|s| percent(s.pods.running, s.pods.total))
        .collect();

    let first_label = history
        .first()
        .and_then(|s| s.timestamp.as_deref())
        .map(format_date)
        .unwrap_or_default();
    let last_label = history
        .last()
        .and_then(|s| s.timestamp.as_deref())
        .map(format_date)
        .unwrap_or_default();

    vec![
        build("Ready Nodes", "#22c55e", &nodes, &first_label, &last_label),
        build("Running Pods", "#0ea5e9", &pods, &first_label, &last_label),
    ]
}

fn build(title: &str, stroke: &str, values: &[u32], first: &str, last: &str) -> ChartView {
    ChartView {
        title: title.to_string(),
        stroke: stroke.to_string(),
        points: polyline(values, CHART_WIDTH, CHART_HEIGHT),
        latest: values.last().map(|v| format!("{v}%")).unwrap_or_default(),
        first_label: first.to_string(),
        last_label: last.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::backend::{SampleNodes, SamplePods};

    fn sample(ts: &str, ready: u32, running: u32) -> MetricsSample {
        MetricsSample {
            cluster_name: "prod".to_string(),
            timestamp: Some(ts.to_string()),
            nodes: SampleNodes {
                total: 4,
                ready,
                ..Default::default()
            },
            pods: SamplePods {
                total: 10,
                running,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn polyline_spreads_points_across_width() {
        assert_eq!(polyline(&[0, 50, 100], 100, 200), "0,200 50,100 100,0");
    }

    #[test]
    fn polyline_single_point_is_flat_line() {
        assert_eq!(polyline(&[25], 100, 200), "0,150 100,150");
    }

    #[test]
    fn polyline_empty() {
        assert_eq!(polyline(&[], 100, 200), "");
    }

    #[test]
    fn history_charts_use_real_samples_only() {
        let charts = history_charts(&[
            sample("2024-05-01T10:00:00Z", 4, 5),
            sample("2024-05-01T10:00:30Z", 2, 10),
        ]);
        assert_eq!(charts.len(), 2);
        assert_eq!(charts[0].latest, "50%");
        assert_eq!(charts[1].latest, "100%");
        assert_eq!(charts[0].first_label, "2024/05/01 10:00");
        assert!(charts.iter().all(ChartView::has_data));

        let empty = history_charts(&[]);
        assert!(empty.iter().all(|c| !c.has_data()));
    }
}

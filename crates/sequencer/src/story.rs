//! The "3 AM incident" narrative and the blast-radius failure waves.

use serde::Serialize;
use shared::domain::ServiceStatus;

use crate::{
    cascade::{Cascade, CascadeConfig, CascadeWave},
    timeline::{Timeline, TimelineConfig},
    SequencerError,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoryBeat {
    /// Wall-clock label inside the story, e.g. "3:02 AM".
    pub clock: &'static str,
    pub narrator: &'static str,
    /// View the host should show while the beat is active.
    pub route: &'static str,
    /// Backend feature the beat shows off, if any.
    pub feature: Option<&'static str>,
}

const BEATS: [(&str, StoryBeat); 6] = [
    (
        "The Incident Begins",
        StoryBeat {
            clock: "3:00 AM",
            narrator: "It's 3 AM. order-service just started returning 500s. Customers can't \
                       check out and revenue is bleeding at $12,000 per minute. Nobody knows yet.",
            route: "/",
            feature: None,
        },
    ),
    (
        "OpsAgent Searches Past Incidents",
        StoryBeat {
            clock: "3:02 AM",
            narrator: "The agent runs one ES|QL query that forks into lexical and semantic \
                       search, fuses the results and reranks them.",
            route: "/incident",
            feature: Some("FORK/FUSE/RERANK"),
        },
    ),
    (
        "Root Cause: The Surprising Error",
        StoryBeat {
            clock: "3:03 AM",
            narrator: "Not the most common error but the most unusual one: \
                       connection_pool_exhausted, score 97.1.",
            route: "/incident",
            feature: Some("significant_terms"),
        },
    ),
    (
        "Alerts Search for the Incident",
        StoryBeat {
            clock: "3:04 AM",
            narrator: "The incident document is percolated against 18 stored rules. \
                       3 match instantly and their workflows fire.",
            route: "/alerts",
            feature: Some("Percolate Queries"),
        },
    ),
    (
        "Error Rate Accelerating",
        StoryBeat {
            clock: "3:04 AM",
            narrator: "Derivative and cumulative-sum aggregations show errors accelerating \
                       at +22%/min. Total failure in 8 minutes without intervention.",
            route: "/incident",
            feature: Some("Pipeline Aggregations"),
        },
    ),
    (
        "Self-Healing Activated",
        StoryBeat {
            clock: "3:05 AM",
            narrator: "The workflow engine scales the connection pool from 20 to 50 and \
                       restarts the pods. The on-call SRE wakes up to a fix already deployed.",
            route: "/agent-activity",
            feature: None,
        },
    ),
];

pub fn demo_timeline() -> Result<Timeline<StoryBeat>, SequencerError> {
    demo_timeline_with(TimelineConfig::default())
}

pub fn demo_timeline_with(config: TimelineConfig) -> Result<Timeline<StoryBeat>, SequencerError> {
    Timeline::new(config, BEATS)
}

/// `orders` fails first, its database and direct callers degrade next, the
/// gateway last. Everything else stays healthy.
pub fn blast_radius_waves() -> Vec<CascadeWave> {
    vec![
        CascadeWave::new(["orders"], ServiceStatus::Down),
        CascadeWave::new(["pg-main", "payment", "cart"], ServiceStatus::Degraded),
        CascadeWave::new(["api-gw"], ServiceStatus::Degraded),
    ]
}

pub fn demo_cascade() -> Result<Cascade, SequencerError> {
    Cascade::new(CascadeConfig::default(), blast_radius_waves())
}

#[cfg(test)]
mod tests {
    use shared::{domain::NodeId, fixtures};

    use super::*;

    #[test]
    fn demo_timeline_has_six_beats_over_three_minutes() {
        let timeline = demo_timeline().expect("timeline");
        assert_eq!(timeline.beat_count(), 6);
        assert_eq!(timeline.config().max_duration, 180);
        assert_eq!(timeline.beats()[0].title, "The Incident Begins");
        assert_eq!(timeline.beats()[5].payload.clock, "3:05 AM");
        assert_eq!(timeline.beats()[2].payload.feature, Some("significant_terms"));
    }

    #[test]
    fn waves_only_name_nodes_of_the_blast_radius_graph() {
        let graph = fixtures::blast_radius();
        let cascade = demo_cascade().expect("cascade");
        for wave in cascade.waves() {
            for node in &wave.nodes {
                assert!(graph.node(node).is_some(), "{node}");
            }
        }
        assert_eq!(
            cascade.status_of(&NodeId::new("orders")),
            ServiceStatus::Healthy
        );
    }
}

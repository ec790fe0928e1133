//! Agent leaderboard.

use sa_common::{AgentId, AgentStats, ArtifactRow};
use std::collections::HashMap;

#[derive(Default)]
struct Acc<'a> {
    name: Option<&'a str>,
    calls: u64,
    duration_sum: u64,
    rating_sum: f64,
    rated: u64,
}

/// Per-agent stats ordered by total calls descending, then agent id.
///
/// `avg_rating` averages rated calls only; `avg_resolution_seconds`
/// averages every call regardless of status.
pub fn agent_stats(rows: &[ArtifactRow]) -> Vec<AgentStats> {
    let mut groups: HashMap<&AgentId, Acc<'_>> = HashMap::new();
    for row in rows {
        let acc = groups.entry(&row.call.agent_id).or_default();
        acc.calls += 1;
        acc.duration_sum = acc.duration_sum.saturating_add(row.call.duration_seconds);
        if let Some(rating) = row.call.rating {
            acc.rating_sum += rating;
            acc.rated += 1;
        }
        if acc.name.is_none() {
            acc.name = row.agent_name.as_deref();
        }
    }

    let mut stats: Vec<AgentStats> = groups
        .into_iter()
        .map(|(agent_id, acc)| AgentStats {
            agent_id: agent_id.clone(),
            agent_name: acc.name.map(str::to_string),
            avg_rating: (acc.rated > 0).then(|| acc.rating_sum / acc.rated as f64),
            total_calls: acc.calls,
            avg_resolution_seconds: acc.duration_sum as f64 / acc.calls as f64,
        })
        .collect();
    stats.sort_by(|a, b| {
        b.total_calls
            .cmp(&a.total_calls)
            .then_with(|| a.agent_id.cmp(&b.agent_id))
    });
    stats
}

//! Silence filter: drop alerts the operator has already acknowledged.

use std::collections::HashSet;

use crate::model::{Alert, SilencedAlert};

/// Removes every alert matching any silenced alert.
///
/// A match requires agreement on at least one of the three vessel
/// identifier keys (any one may be the only key populated on either side)
/// and exact agreement on both facade and alert type. Matching is done in
/// two stages over indexed rows (collect the matched row ids, then filter),
/// so one alert matching several silenced rows is still removed exactly
/// once and survivors keep their order.
pub fn remove_silenced(alerts: Vec<Alert>, silenced: &[SilencedAlert]) -> Vec<Alert> {
    let matched: HashSet<usize> = alerts
        .iter()
        .enumerate()
        .filter(|(_, alert)| silenced.iter().any(|s| is_silenced_by(alert, s)))
        .map(|(id, _)| id)
        .collect();

    alerts
        .into_iter()
        .enumerate()
        .filter(|(id, _)| !matched.contains(id))
        .map(|(_, alert)| alert)
        .collect()
}

fn is_silenced_by(alert: &Alert, silenced: &SilencedAlert) -> bool {
    alert.shares_identifier(silenced)
        && alert.alert_type == silenced.alert_type
        && facade_matches(alert.facade.as_deref(), silenced.facade.as_deref())
}

/// Absent facades never match: a silenced alert suppresses one zone only.
fn facade_matches(a: Option<&str>, b: Option<&str>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a == b)
}

use std::collections::HashSet;

use costgraph_core::Pod;

/// Unique uids in first-seen order. A pod reached through several labels
/// shows up once per path; names are not unique, so only the uid counts.
pub fn dedupe_uids(pods: &[Pod]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(pods.len());
    pods.iter()
        .filter(|pod| seen.insert(pod.uid.as_str()))
        .map(|pod| pod.uid.clone())
        .collect()
}

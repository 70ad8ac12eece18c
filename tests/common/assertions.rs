// Custom assertions over request traces and node statistics

use orbital_cdn::node::{RequestStatus, RequestTrace, TraceAction};
use orbital_cdn::NodeStatistics;

const EPSILON: f64 = 1e-9;

/// Asserts two floats agree to within `1e-9`.
pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < EPSILON,
        "expected {} but got {}",
        expected,
        actual
    );
}

/// Asserts the statuses of a trace sequence, in order.
pub fn assert_statuses(traces: &[RequestTrace], expected: &[RequestStatus]) {
    let actual: Vec<_> = traces.iter().map(|t| t.status).collect();
    assert_eq!(actual, expected, "status sequence mismatch");
}

/// Asserts the structural invariants every trace must hold.
pub fn assert_well_formed(trace: &RequestTrace) {
    let actions = trace.actions();
    assert_eq!(
        actions.first(),
        Some(&TraceAction::UserRequest),
        "trace for {} must open with the user request",
        trace.content_id
    );

    for pair in trace.steps.windows(2) {
        assert!(
            pair[0].time <= pair[1].time,
            "step times must not decrease: {:?}",
            actions
        );
    }

    match trace.status {
        RequestStatus::Error => {
            assert_eq!(trace.delivery_time, 0.0);
            assert!(trace.error.is_some());
            assert!(!actions.contains(&TraceAction::CacheCheck));
        }
        _ => {
            assert_eq!(actions.last(), Some(&TraceAction::DeliveryComplete));
            assert!(trace.delivery_time > 0.0);
            assert!(trace.total_time >= trace.delivery_time);
        }
    }
}

/// Asserts the per-status counters of a node add up.
pub fn assert_counters_balanced(stats: &NodeStatistics) {
    assert_eq!(
        stats.hits + stats.neighbor_hits + stats.misses + stats.errors,
        stats.total_requests,
        "counters of {} do not add up",
        stats.node_id
    );
    assert!(stats.inter_node_hits <= stats.inter_node_requests);
    assert!(stats.cache.size <= stats.cache.capacity);
}

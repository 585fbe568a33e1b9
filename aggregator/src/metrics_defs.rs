use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "request.duration",
    metric_type: MetricType::Histogram,
    description: "Request duration in seconds. Tagged with endpoint, status.",
};

pub const REQUESTS_INFLIGHT: MetricDef = MetricDef {
    name: "requests.inflight",
    metric_type: MetricType::Gauge,
    description: "Number of requests currently being processed",
};

pub const UPSTREAM_DEGRADED: MetricDef = MetricDef {
    name: "upstream.degraded",
    metric_type: MetricType::Counter,
    description: "Non-fatal upstream calls that failed or timed out. Tagged with call.",
};

pub const FAULT_INJECTED: MetricDef = MetricDef {
    name: "fault.injected",
    metric_type: MetricType::Counter,
    description: "Faults injected on request. Tagged with kind (delay, status, failure).",
};

pub const ALL_METRICS: &[MetricDef] = &[
    REQUEST_DURATION,
    REQUESTS_INFLIGHT,
    UPSTREAM_DEGRADED,
    FAULT_INJECTED,
];

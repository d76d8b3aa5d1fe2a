use shared::metrics_defs::{MetricDef, MetricType};

pub const RENDER_DURATION: MetricDef = MetricDef {
    name: "inertia.render.duration",
    metric_type: MetricType::Histogram,
    description: "Page render duration in seconds. Tagged with response type.",
};

pub const RENDERS: MetricDef = MetricDef {
    name: "inertia.render.count",
    metric_type: MetricType::Counter,
    description: "Number of rendered pages. Tagged with response type.",
};

pub const PROP_RESOLVE_DURATION: MetricDef = MetricDef {
    name: "inertia.prop.resolve_duration",
    metric_type: MetricType::Histogram,
    description: "Time spent resolving the props of one page, in seconds",
};

pub const PROP_ERRORS: MetricDef = MetricDef {
    name: "inertia.prop.errors",
    metric_type: MetricType::Counter,
    description: "Number of renders aborted by a failing prop",
};

pub const SSR_FALLBACKS: MetricDef = MetricDef {
    name: "inertia.ssr.fallbacks",
    metric_type: MetricType::Counter,
    description: "Number of server-side renders that fell back to the client-side container",
};

pub const FORCED_RELOADS: MetricDef = MetricDef {
    name: "inertia.forced_reloads",
    metric_type: MetricType::Counter,
    description: "Number of protocol requests answered with a forced reload on version mismatch",
};

pub const REDIRECT_BACKS: MetricDef = MetricDef {
    name: "inertia.redirect_back",
    metric_type: MetricType::Counter,
    description: "Number of empty protocol responses rewritten to a redirect back",
};

pub const ALL_METRICS: &[MetricDef] = &[
    RENDER_DURATION,
    RENDERS,
    PROP_RESOLVE_DURATION,
    PROP_ERRORS,
    SSR_FALLBACKS,
    FORCED_RELOADS,
    REDIRECT_BACKS,
];

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub checkouts_total: IntCounterVec,
    pub discount_codes_total: IntCounterVec,
    pub assignments_total: IntCounterVec,
    pub deliveries_completed_total: IntCounter,
    pub scheduler_ticks_total: IntCounterVec,
    pub scheduler_tick_seconds: Histogram,
    pub stale_pending_orders: IntGauge,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let checkouts_total = IntCounterVec::new(
            Opts::new("checkouts_total", "Checkouts by outcome"),
            &["outcome"],
        )
        .expect("valid checkouts_total metric");

        let discount_codes_total = IntCounterVec::new(
            Opts::new("discount_codes_total", "Discount code submissions by outcome"),
            &["outcome"],
        )
        .expect("valid discount_codes_total metric");

        let assignments_total = IntCounterVec::new(
            Opts::new("assignments_total", "Courier assignments by source"),
            &["source"],
        )
        .expect("valid assignments_total metric");

        let deliveries_completed_total =
            IntCounter::new("deliveries_completed_total", "Deliveries marked delivered")
                .expect("valid deliveries_completed_total metric");

        let scheduler_ticks_total = IntCounterVec::new(
            Opts::new("scheduler_ticks_total", "Scheduler ticks by outcome"),
            &["outcome"],
        )
        .expect("valid scheduler_ticks_total metric");

        let scheduler_tick_seconds = Histogram::with_opts(HistogramOpts::new(
            "scheduler_tick_seconds",
            "Duration of one reconciliation tick in seconds",
        ))
        .expect("valid scheduler_tick_seconds metric");

        let stale_pending_orders = IntGauge::new(
            "stale_pending_orders",
            "Orders waiting for a courier longer than the escalation window",
        )
        .expect("valid stale_pending_orders metric");

        registry
            .register(Box::new(checkouts_total.clone()))
            .expect("register checkouts_total");
        registry
            .register(Box::new(discount_codes_total.clone()))
            .expect("register discount_codes_total");
        registry
            .register(Box::new(assignments_total.clone()))
            .expect("register assignments_total");
        registry
            .register(Box::new(deliveries_completed_total.clone()))
            .expect("register deliveries_completed_total");
        registry
            .register(Box::new(scheduler_ticks_total.clone()))
            .expect("register scheduler_ticks_total");
        registry
            .register(Box::new(scheduler_tick_seconds.clone()))
            .expect("register scheduler_tick_seconds");
        registry
            .register(Box::new(stale_pending_orders.clone()))
            .expect("register stale_pending_orders");

        Self {
            registry,
            checkouts_total,
            discount_codes_total,
            assignments_total,
            deliveries_completed_total,
            scheduler_ticks_total,
            scheduler_tick_seconds,
            stale_pending_orders,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

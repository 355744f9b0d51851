use tokio::sync::{broadcast, Mutex};

use crate::models::assignment::Assignment;
use crate::observability::metrics::Metrics;
use crate::store::Store;

pub struct AppState {
    pub store: Store,
    pub assignment_events_tx: broadcast::Sender<Assignment>,
    pub metrics: Metrics,
    /// Held for the duration of one scheduler tick.
    pub tick_guard: Mutex<()>,
}

impl AppState {
    pub fn new(event_buffer_size: usize) -> Self {
        let (assignment_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            store: Store::new(),
            assignment_events_tx,
            metrics: Metrics::new(),
            tick_guard: Mutex::new(()),
        }
    }

    pub fn publish_assignment(&self, assignment: &Assignment) {
        self.metrics
            .assignments_total
            .with_label_values(&[assignment.source.as_str()])
            .inc();
        // No subscribers is fine.
        let _ = self.assignment_events_tx.send(assignment.clone());
    }
}

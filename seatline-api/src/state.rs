use std::sync::Arc;
use seatline_reservation::ReservationEngine;

use crate::metrics::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ReservationEngine>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(engine: Arc<ReservationEngine>, metrics: Arc<Metrics>) -> Self {
        Self { engine, metrics }
    }
}

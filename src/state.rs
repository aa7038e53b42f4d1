//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::environment::EnvironmentConfig;
use crate::repositories::booking_repository::{BookingGateway, PgBookingRepository};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: EnvironmentConfig,
    pub booking_gateway: Arc<dyn BookingGateway>,
}

impl AppState {
    pub fn new(pool: PgPool, config: EnvironmentConfig) -> Self {
        let booking_gateway: Arc<dyn BookingGateway> =
            Arc::new(PgBookingRepository::new(pool.clone()));

        Self {
            pool,
            config,
            booking_gateway,
        }
    }
}

mod config;
mod controllers;
mod database;
mod dto;
mod middleware;
mod models;
mod repositories;
mod routes;
mod services;
mod state;
mod utils;

use anyhow::Result;
use axum::{middleware as axum_middleware, response::Json, routing::get, Router};
use dotenvy::dotenv;
use serde_json::json;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info};

use config::environment::EnvironmentConfig;
use database::connection::DatabaseConfig;
use middleware::cors::{cors_middleware, cors_middleware_with_origins};
use middleware::rate_limit::{rate_limit_middleware, RateLimitState};
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    let config = EnvironmentConfig::from_env();

    // Configurar logging
    let log_level = if config.is_development() {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(log_level).init();

    info!("🚗 Fleet Booking - Gestión de reservas de vehículos");
    info!("===================================================");

    // Inicializar base de datos
    let pool = match DatabaseConfig::default().create_pool().await {
        Ok(pool) => pool,
        Err(e) => {
            error!("❌ Error conectando a la base de datos: {}", e);
            return Err(anyhow::anyhow!("Error de base de datos: {}", e));
        }
    };

    let rate_limit = RateLimitState::new(&config);
    let app_state = AppState::new(pool, config.clone());

    // En producción el CORS se restringe a los orígenes configurados
    let cors = if config.is_production() {
        cors_middleware_with_origins(config.cors_origins.clone())
    } else {
        cors_middleware()
    };

    // Crear router de la API
    let app = Router::new()
        .route("/api/health", get(health_check))
        .nest(
            "/api/auth",
            routes::auth_routes::create_auth_router(app_state.clone(), rate_limit.clone()),
        )
        .nest(
            "/api/users",
            routes::user_routes::create_user_router(app_state.clone()),
        )
        .nest(
            "/api/vehicles",
            routes::vehicle_routes::create_vehicle_router(app_state.clone()),
        )
        .nest(
            "/api/bookings",
            routes::booking_routes::create_booking_router(app_state.clone()),
        )
        .layer(axum_middleware::from_fn_with_state(
            rate_limit,
            rate_limit_middleware,
        ))
        .layer(cors)
        .with_state(app_state);

    let addr: SocketAddr = config.server_url().parse()?;

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /api/health - Health check");
    info!("🔑 Endpoints - Auth:");
    info!("   POST /api/auth/login - Login");
    info!("   GET  /api/auth/me - Usuario actual");
    info!("👤 Endpoints - Users (admin):");
    info!("   GET  /api/users - Listar usuarios (paginado)");
    info!("   POST /api/users - Crear usuario");
    info!("   GET  /api/users/:id - Obtener usuario");
    info!("   DELETE /api/users/:id - Eliminar usuario");
    info!("🚗 Endpoints - Vehicles:");
    info!("   GET  /api/vehicles - Listar vehículos");
    info!("   GET  /api/vehicles/available - Vehículos libres en un rango");
    info!("   GET  /api/vehicles/:id - Obtener vehículo con sus reservas");
    info!("   POST /api/vehicles - Crear vehículo (admin)");
    info!("   PUT  /api/vehicles/:id - Actualizar vehículo (admin)");
    info!("   DELETE /api/vehicles/:id - Eliminar vehículo (admin)");
    info!("📅 Endpoints - Bookings:");
    info!("   GET  /api/bookings - Listar reservas (según rol)");
    info!("   POST /api/bookings - Crear reserva");
    info!("   GET  /api/bookings/:id - Obtener reserva");
    info!("   PATCH /api/bookings/:id/cancel - Anular reserva");
    info!("   GET  /api/bookings/vehicle/:vehicle_id - Reservas de un vehículo");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!("❌ Error del servidor: {}", e);
            anyhow::anyhow!(e)
        })?;

    info!("👋 Servidor terminado");
    Ok(())
}

/// Health check de la API
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "success",
        "message": "API en línea",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}

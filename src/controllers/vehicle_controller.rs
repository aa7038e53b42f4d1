use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::dto::vehicle_dto::{CreateVehicleRequest, UpdateVehicleRequest};
use crate::models::booking::Booking;
use crate::models::vehicle::Vehicle;
use crate::repositories::vehicle_repository::{PgVehicleRepository, VehicleGateway};
use crate::utils::errors::{AppError, AppResult};

pub struct VehicleController {
    gateway: Arc<dyn VehicleGateway>,
}

impl VehicleController {
    pub fn new(pool: PgPool) -> Self {
        Self {
            gateway: Arc::new(PgVehicleRepository::new(pool)),
        }
    }

    pub async fn create(&self, request: CreateVehicleRequest) -> AppResult<Vehicle> {
        request.validate()?;

        // La matrícula es única en toda la flota
        if self
            .gateway
            .license_plate_exists(&request.license_plate, None)
            .await?
        {
            return Err(AppError::Conflict(
                "Ya existe un vehículo con esa matrícula".to_string(),
            ));
        }

        let vehicle = self
            .gateway
            .create(request.brand, request.model, request.license_plate, request.image_url)
            .await?;

        tracing::info!(vehicle_id = %vehicle.id, "🚗 Vehículo creado");

        Ok(vehicle)
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<(Vehicle, Vec<Booking>)> {
        let vehicle = self
            .gateway
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Vehículo no encontrado".to_string()))?;

        let bookings = self.gateway.confirmed_bookings(id).await?;

        Ok((vehicle, bookings))
    }

    pub async fn list(&self) -> AppResult<Vec<Vehicle>> {
        self.gateway.find_all().await
    }

    pub async fn list_available(
        &self,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> AppResult<Vec<Vehicle>> {
        if start_date >= end_date {
            return Err(AppError::BadRequest(
                "La fecha de fin debe ser posterior a la fecha de inicio".to_string(),
            ));
        }

        self.gateway.find_available(start_date, end_date).await
    }

    pub async fn update(&self, id: Uuid, request: UpdateVehicleRequest) -> AppResult<Vehicle> {
        request.validate()?;

        let current = self
            .gateway
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Vehículo no encontrado".to_string()))?;

        if let Some(plate) = &request.license_plate {
            if self.gateway.license_plate_exists(plate, Some(id)).await? {
                return Err(AppError::Conflict(
                    "Ya existe un vehículo con esa matrícula".to_string(),
                ));
            }
        }

        self.gateway
            .update(
                &current,
                request.brand,
                request.model,
                request.license_plate,
                request.is_available,
                request.image_url,
            )
            .await
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.gateway
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Vehículo no encontrado".to_string()))?;

        // El borrado se bloquea mientras queden reservas CONFIRMED vigentes
        let pending = self.gateway.count_future_confirmed_bookings(id).await?;
        if pending > 0 {
            return Err(AppError::Conflict(
                "No se puede eliminar: el vehículo tiene reservas vigentes".to_string(),
            ));
        }

        self.gateway.delete(id).await?;

        tracing::info!(vehicle_id = %id, "🗑️ Vehículo eliminado");

        Ok(())
    }
}

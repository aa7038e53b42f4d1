//! Persistencia de vehículos

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::booking::Booking;
use crate::models::vehicle::Vehicle;
use crate::utils::errors::AppResult;

/// Gateway de persistencia de vehículos.
///
/// Las reglas de unicidad de matrícula y el bloqueo de borrado se
/// deciden en el controller contra este trait, así los tests las
/// ejercitan con un fake en memoria.
#[async_trait]
pub trait VehicleGateway: Send + Sync {
    async fn find_all(&self) -> AppResult<Vec<Vehicle>>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Vehicle>>;

    /// Vehículos con el interruptor administrativo activo y sin ninguna
    /// reserva CONFIRMED que se solape con el rango pedido.
    async fn find_available(
        &self,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> AppResult<Vec<Vehicle>>;

    /// La matrícula es única en toda la flota; en updates se excluye al
    /// propio vehículo.
    async fn license_plate_exists(
        &self,
        license_plate: &str,
        exclude_id: Option<Uuid>,
    ) -> AppResult<bool>;

    async fn create(
        &self,
        brand: String,
        model: String,
        license_plate: String,
        image_url: Option<String>,
    ) -> AppResult<Vehicle>;

    async fn update(
        &self,
        current: &Vehicle,
        brand: Option<String>,
        model: Option<String>,
        license_plate: Option<String>,
        is_available: Option<bool>,
        image_url: Option<String>,
    ) -> AppResult<Vehicle>;

    async fn delete(&self, id: Uuid) -> AppResult<()>;

    /// Reservas CONFIRMED aún vigentes para un vehículo; bloquean su borrado
    async fn count_future_confirmed_bookings(&self, vehicle_id: Uuid) -> AppResult<i64>;

    /// Reservas CONFIRMED ordenadas por inicio, para el detalle del vehículo
    async fn confirmed_bookings(&self, vehicle_id: Uuid) -> AppResult<Vec<Booking>>;
}

pub struct PgVehicleRepository {
    pool: PgPool,
}

impl PgVehicleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VehicleGateway for PgVehicleRepository {
    async fn find_all(&self) -> AppResult<Vec<Vehicle>> {
        let vehicles =
            sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;

        Ok(vehicles)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
        let vehicle = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(vehicle)
    }

    async fn find_available(
        &self,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> AppResult<Vec<Vehicle>> {
        let vehicles = sqlx::query_as::<_, Vehicle>(
            r#"
            SELECT v.* FROM vehicles v
            WHERE v.is_available = TRUE
              AND NOT EXISTS (
                  SELECT 1 FROM bookings b
                  WHERE b.vehicle_id = v.id
                    AND b.status = 'CONFIRMED'
                    AND b.start_date < $2
                    AND b.end_date > $1
              )
            ORDER BY v.created_at DESC
            "#,
        )
        .bind(start_date)
        .bind(end_date)
        .fetch_all(&self.pool)
        .await?;

        Ok(vehicles)
    }

    async fn license_plate_exists(
        &self,
        license_plate: &str,
        exclude_id: Option<Uuid>,
    ) -> AppResult<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM vehicles
                WHERE license_plate = $1
                  AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(license_plate)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn create(
        &self,
        brand: String,
        model: String,
        license_plate: String,
        image_url: Option<String>,
    ) -> AppResult<Vehicle> {
        let vehicle = sqlx::query_as::<_, Vehicle>(
            r#"
            INSERT INTO vehicles (id, brand, model, license_plate, is_available, image_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, TRUE, $5, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(brand)
        .bind(model)
        .bind(license_plate)
        .bind(image_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(vehicle)
    }

    async fn update(
        &self,
        current: &Vehicle,
        brand: Option<String>,
        model: Option<String>,
        license_plate: Option<String>,
        is_available: Option<bool>,
        image_url: Option<String>,
    ) -> AppResult<Vehicle> {
        let vehicle = sqlx::query_as::<_, Vehicle>(
            r#"
            UPDATE vehicles
            SET brand = $2, model = $3, license_plate = $4, is_available = $5, image_url = $6, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(current.id)
        .bind(brand.unwrap_or_else(|| current.brand.clone()))
        .bind(model.unwrap_or_else(|| current.model.clone()))
        .bind(license_plate.unwrap_or_else(|| current.license_plate.clone()))
        .bind(is_available.unwrap_or(current.is_available))
        .bind(image_url.or_else(|| current.image_url.clone()))
        .fetch_one(&self.pool)
        .await?;

        Ok(vehicle)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM vehicles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn count_future_confirmed_bookings(&self, vehicle_id: Uuid) -> AppResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM bookings
            WHERE vehicle_id = $1
              AND status = 'CONFIRMED'
              AND end_date >= NOW()
            "#,
        )
        .bind(vehicle_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn confirmed_bookings(&self, vehicle_id: Uuid) -> AppResult<Vec<Booking>> {
        let bookings = sqlx::query_as::<_, Booking>(
            r#"
            SELECT * FROM bookings
            WHERE vehicle_id = $1 AND status = 'CONFIRMED'
            ORDER BY start_date ASC
            "#,
        )
        .bind(vehicle_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(bookings)
    }
}

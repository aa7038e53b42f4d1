//! Persistencia de reservas
//!
//! Aquí vive la disciplina de bloqueo que hace atómico el chequeo de
//! solapamientos: la fila del vehículo se bloquea con FOR UPDATE dentro
//! de la misma transacción que consulta e inserta, de modo que dos
//! creaciones concurrentes sobre el mismo vehículo quedan serializadas.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::booking::{Booking, BookingStatus, BookingWithVehicle};
use crate::models::user::UserSummary;
use crate::models::vehicle::Vehicle;
use crate::utils::errors::{AppError, AppResult};

/// Datos de una reserva nueva, ya validados por el servicio
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub vehicle_id: Uuid,
    pub user_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub reason: String,
    pub destination: String,
}

/// Alcance de un listado de reservas según el rol del solicitante
#[derive(Debug, Clone, Copy)]
pub enum BookingScope {
    All,
    ForUser(Uuid),
}

/// Gateway de persistencia de reservas.
///
/// El servicio de ciclo de vida depende de este trait y no de Postgres,
/// lo que permite sustituirlo por un fake en memoria en los tests.
#[async_trait]
pub trait BookingGateway: Send + Sync {
    /// Crea una reserva CONFIRMED de forma atómica: bloquea la fila del
    /// vehículo, verifica disponibilidad y solapamientos, e inserta.
    /// Cualquier fallo revierte la transacción completa.
    async fn create_confirmed(&self, new_booking: NewBooking) -> AppResult<BookingWithVehicle>;

    /// Reserva con su vehículo y solicitante resueltos en una sola consulta
    async fn find_with_vehicle(&self, id: Uuid) -> AppResult<Option<BookingWithVehicle>>;

    /// Listado ordenado por fecha de inicio descendente
    async fn list(&self, scope: BookingScope) -> AppResult<Vec<BookingWithVehicle>>;

    /// Transición CONFIRMED -> CANCELLED. No requiere bloqueo de vehículo
    /// (cancelar nunca produce un solapamiento nuevo), pero sí es
    /// condicional sobre el estado: una reserva ya cancelada devuelve error
    /// aunque dos cancelaciones lleguen a la vez.
    async fn mark_cancelled(&self, id: Uuid) -> AppResult<BookingWithVehicle>;

    /// Predicado de solapamiento contra las reservas CONFIRMED del
    /// vehículo, excluyendo opcionalmente una reserva concreta.
    async fn has_overlap(
        &self,
        vehicle_id: Uuid,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        exclude_booking_id: Option<Uuid>,
    ) -> AppResult<bool>;

    /// Reservas CONFIRMED futuras de un vehículo, ascendentes por inicio
    async fn future_confirmed_for_vehicle(&self, vehicle_id: Uuid) -> AppResult<Vec<Booking>>;
}

/// Fila plana del join bookings + vehicles + users
#[derive(Debug, FromRow)]
struct BookingJoinRow {
    id: Uuid,
    vehicle_id: Uuid,
    user_id: Uuid,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    status: BookingStatus,
    reason: String,
    destination: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    v_brand: String,
    v_model: String,
    v_license_plate: String,
    v_is_available: bool,
    v_image_url: Option<String>,
    v_created_at: DateTime<Utc>,
    v_updated_at: DateTime<Utc>,
    u_first_name: String,
    u_last_name: String,
    u_email: String,
}

impl From<BookingJoinRow> for BookingWithVehicle {
    fn from(row: BookingJoinRow) -> Self {
        Self {
            booking: Booking {
                id: row.id,
                vehicle_id: row.vehicle_id,
                user_id: row.user_id,
                start_date: row.start_date,
                end_date: row.end_date,
                status: row.status,
                reason: row.reason,
                destination: row.destination,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            vehicle: Vehicle {
                id: row.vehicle_id,
                brand: row.v_brand,
                model: row.v_model,
                license_plate: row.v_license_plate,
                is_available: row.v_is_available,
                image_url: row.v_image_url,
                created_at: row.v_created_at,
                updated_at: row.v_updated_at,
            },
            user: UserSummary {
                id: row.user_id,
                first_name: row.u_first_name,
                last_name: row.u_last_name,
                email: row.u_email,
            },
        }
    }
}

const BOOKING_JOIN_SELECT: &str = r#"
    SELECT b.id, b.vehicle_id, b.user_id, b.start_date, b.end_date,
           b.status, b.reason, b.destination, b.created_at, b.updated_at,
           v.brand AS v_brand, v.model AS v_model,
           v.license_plate AS v_license_plate, v.is_available AS v_is_available,
           v.image_url AS v_image_url, v.created_at AS v_created_at,
           v.updated_at AS v_updated_at,
           u.first_name AS u_first_name, u.last_name AS u_last_name,
           u.email AS u_email
    FROM bookings b
    INNER JOIN vehicles v ON v.id = b.vehicle_id
    INNER JOIN users u ON u.id = b.user_id
"#;

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingGateway for PgBookingRepository {
    async fn create_confirmed(&self, new_booking: NewBooking) -> AppResult<BookingWithVehicle> {
        let mut tx = self.pool.begin().await?;

        // Bloqueo exclusivo de la fila del vehículo ANTES de consultar
        // solapamientos. La segunda transacción concurrente espera aquí y,
        // al continuar, ya ve la reserva insertada por la primera.
        let vehicle =
            sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = $1 FOR UPDATE")
                .bind(new_booking.vehicle_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Vehículo no encontrado".to_string()))?;

        if !vehicle.is_available {
            return Err(AppError::Conflict(
                "Este vehículo no está disponible para reservas".to_string(),
            ));
        }

        let (overlap,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM bookings
                WHERE vehicle_id = $1
                  AND status = 'CONFIRMED'
                  AND start_date < $3
                  AND end_date > $2
            )
            "#,
        )
        .bind(new_booking.vehicle_id)
        .bind(new_booking.start_date)
        .bind(new_booking.end_date)
        .fetch_one(&mut *tx)
        .await?;

        if overlap {
            return Err(AppError::Conflict(
                "El vehículo ya está reservado en ese período. Elija otras fechas.".to_string(),
            ));
        }

        let booking_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO bookings (id, vehicle_id, user_id, start_date, end_date, status, reason, destination, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, 'CONFIRMED', $6, $7, NOW(), NOW())
            "#,
        )
        .bind(booking_id)
        .bind(new_booking.vehicle_id)
        .bind(new_booking.user_id)
        .bind(new_booking.start_date)
        .bind(new_booking.end_date)
        .bind(&new_booking.reason)
        .bind(&new_booking.destination)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, BookingJoinRow>(
            &format!("{} WHERE b.id = $1", BOOKING_JOIN_SELECT),
        )
        .bind(booking_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(row.into())
    }

    async fn find_with_vehicle(&self, id: Uuid) -> AppResult<Option<BookingWithVehicle>> {
        let row = sqlx::query_as::<_, BookingJoinRow>(
            &format!("{} WHERE b.id = $1", BOOKING_JOIN_SELECT),
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list(&self, scope: BookingScope) -> AppResult<Vec<BookingWithVehicle>> {
        let rows = match scope {
            BookingScope::All => {
                sqlx::query_as::<_, BookingJoinRow>(
                    &format!("{} ORDER BY b.start_date DESC", BOOKING_JOIN_SELECT),
                )
                .fetch_all(&self.pool)
                .await?
            }
            BookingScope::ForUser(user_id) => {
                sqlx::query_as::<_, BookingJoinRow>(
                    &format!("{} WHERE b.user_id = $1 ORDER BY b.start_date DESC", BOOKING_JOIN_SELECT),
                )
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn mark_cancelled(&self, id: Uuid) -> AppResult<BookingWithVehicle> {
        // El UPDATE condicional hace atómica la transición: de dos
        // cancelaciones concurrentes solo la primera afecta una fila.
        let result = sqlx::query(
            "UPDATE bookings SET status = 'CANCELLED', updated_at = NOW() WHERE id = $1 AND status = 'CONFIRMED'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let (exists,): (bool,) =
                sqlx::query_as("SELECT EXISTS(SELECT 1 FROM bookings WHERE id = $1)")
                    .bind(id)
                    .fetch_one(&self.pool)
                    .await?;
            if !exists {
                return Err(AppError::NotFound("Reserva no encontrada".to_string()));
            }
            return Err(AppError::BadRequest(
                "Esta reserva ya está cancelada".to_string(),
            ));
        }

        let row = sqlx::query_as::<_, BookingJoinRow>(
            &format!("{} WHERE b.id = $1", BOOKING_JOIN_SELECT),
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn has_overlap(
        &self,
        vehicle_id: Uuid,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        exclude_booking_id: Option<Uuid>,
    ) -> AppResult<bool> {
        let (overlap,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM bookings
                WHERE vehicle_id = $1
                  AND status = 'CONFIRMED'
                  AND start_date < $3
                  AND end_date > $2
                  AND ($4::uuid IS NULL OR id <> $4)
            )
            "#,
        )
        .bind(vehicle_id)
        .bind(start_date)
        .bind(end_date)
        .bind(exclude_booking_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(overlap)
    }

    async fn future_confirmed_for_vehicle(&self, vehicle_id: Uuid) -> AppResult<Vec<Booking>> {
        let bookings = sqlx::query_as::<_, Booking>(
            r#"
            SELECT * FROM bookings
            WHERE vehicle_id = $1
              AND status = 'CONFIRMED'
              AND end_date >= NOW()
            ORDER BY start_date ASC
            "#,
        )
        .bind(vehicle_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(bookings)
    }
}

//! Modelo de Booking
//!
//! Este módulo contiene el struct Booking, su máquina de estados
//! (CONFIRMED -> CANCELLED) y el predicado de solapamiento de rangos
//! sobre el que descansa toda la prevención de dobles reservas.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

use crate::models::{user::UserSummary, vehicle::Vehicle};

/// Estado de la reserva - mapea al ENUM booking_status
///
/// CANCELLED es terminal: una reserva cancelada nunca vuelve a CONFIRMED
/// y queda excluida para siempre del cálculo de solapamientos.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "booking_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

/// Booking principal - mapea exactamente a la tabla bookings
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub user_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: BookingStatus,
    pub reason: String,
    pub destination: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Predicado de solapamiento con semántica de intervalo semiabierto
    /// `[start_date, end_date)`: una reserva que termina exactamente cuando
    /// otra empieza NO se solapa.
    ///
    /// La única comparación `existing.start < end && existing.end > start`
    /// cubre las cuatro formas de conflicto: que el rango candidato englobe
    /// al existente, que esté contenido en él, o que lo pise parcialmente
    /// por la izquierda o por la derecha.
    pub fn overlaps_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_date < end && self.end_date > start
    }

    /// Las reservas canceladas no bloquean ningún rango
    pub fn blocks_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.status == BookingStatus::Confirmed && self.overlaps_range(start, end)
    }
}

/// Reserva junto con su vehículo y el solicitante, resuelta en una sola
/// consulta (join explícito en lectura, sin N+1).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingWithVehicle {
    #[serde(flatten)]
    pub booking: Booking,
    pub vehicle: Vehicle,
    pub user: UserSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn day(d: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap() + Duration::days(d)
    }

    fn booking(start: i64, end: i64, status: BookingStatus) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            vehicle_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            start_date: day(start),
            end_date: day(end),
            status,
            reason: "mission de terrain".to_string(),
            destination: "Kpalimé".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_engulfing_range_overlaps() {
        let existing = booking(10, 15, BookingStatus::Confirmed);
        assert!(existing.overlaps_range(day(8), day(20)));
    }

    #[test]
    fn test_engulfed_range_overlaps() {
        let existing = booking(10, 15, BookingStatus::Confirmed);
        assert!(existing.overlaps_range(day(11), day(14)));
    }

    #[test]
    fn test_left_partial_overlap() {
        let existing = booking(10, 15, BookingStatus::Confirmed);
        assert!(existing.overlaps_range(day(8), day(12)));
    }

    #[test]
    fn test_right_partial_overlap() {
        let existing = booking(10, 15, BookingStatus::Confirmed);
        assert!(existing.overlaps_range(day(12), day(20)));
    }

    #[test]
    fn test_adjacent_ranges_do_not_overlap() {
        // La reserva termina en el instante exacto en que empieza la otra
        let existing = booking(10, 15, BookingStatus::Confirmed);
        assert!(!existing.overlaps_range(day(15), day(20)));
        assert!(!existing.overlaps_range(day(5), day(10)));
    }

    #[test]
    fn test_disjoint_ranges_do_not_overlap() {
        let existing = booking(10, 15, BookingStatus::Confirmed);
        assert!(!existing.overlaps_range(day(16), day(20)));
        assert!(!existing.overlaps_range(day(1), day(5)));
    }

    #[test]
    fn test_cancelled_booking_never_blocks() {
        let cancelled = booking(10, 15, BookingStatus::Cancelled);
        assert!(cancelled.overlaps_range(day(12), day(20)));
        assert!(!cancelled.blocks_range(day(12), day(20)));
    }
}

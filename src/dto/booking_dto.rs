use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

// Request para crear una reserva
//
// Las fechas llegan como timestamps ISO-8601; la coherencia temporal
// (inicio < fin, inicio no pasado) la valida el servicio de reservas,
// no el DTO, porque depende del reloj en el momento de la petición.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingRequest {
    pub vehicle_id: Uuid,

    pub start_date: DateTime<Utc>,

    pub end_date: DateTime<Utc>,

    #[validate(length(min = 5, max = 500))]
    pub reason: String,

    #[validate(length(min = 1, max = 200))]
    pub destination: String,
}

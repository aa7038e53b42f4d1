use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;

// Request para crear un vehículo
#[derive(Debug, Deserialize, Validate)]
pub struct CreateVehicleRequest {
    #[validate(length(min = 1, max = 100))]
    pub brand: String,

    #[validate(length(min = 1, max = 100))]
    pub model: String,

    #[validate(length(min = 1, max = 20))]
    pub license_plate: String,

    #[validate(url)]
    pub image_url: Option<String>,
}

// Request para actualizar un vehículo
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateVehicleRequest {
    #[validate(length(min = 1, max = 100))]
    pub brand: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub model: Option<String>,

    #[validate(length(min = 1, max = 20))]
    pub license_plate: Option<String>,

    pub is_available: Option<bool>,

    #[validate(url)]
    pub image_url: Option<String>,
}

// Query para consultar vehículos libres en un rango
#[derive(Debug, Deserialize)]
pub struct AvailableVehiclesQuery {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

//! Servicios de negocio
//!
//! El servicio de reservas es el núcleo del sistema; el de autenticación
//! emite y resuelve los tokens de sesión.

pub mod auth_service;
pub mod booking_service;

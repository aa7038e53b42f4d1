//! Servicio de ciclo de vida de reservas
//!
//! Orquesta la creación, cancelación y lectura con control de acceso de
//! las reservas. La validación temporal vive aquí; la atomicidad del
//! chequeo de solapamientos vive en el gateway de persistencia, que
//! bloquea la fila del vehículo dentro de la transacción de inserción.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::models::booking::{Booking, BookingStatus, BookingWithVehicle};
use crate::models::user::UserRole;
use crate::repositories::booking_repository::{BookingGateway, BookingScope, NewBooking};
use crate::utils::errors::{validation_error, AppError, AppResult};

pub struct BookingService {
    gateway: Arc<dyn BookingGateway>,
}

impl BookingService {
    pub fn new(gateway: Arc<dyn BookingGateway>) -> Self {
        Self { gateway }
    }

    /// Crea una reserva CONFIRMED para el solicitante.
    ///
    /// Las fechas se validan antes de tocar la base: fin posterior al
    /// inicio y arranque no pasado. El resto (vehículo existente y
    /// disponible, ausencia de solapamientos) lo decide el gateway dentro
    /// de su transacción bloqueada, y cualquier fallo revierte sin dejar
    /// estado parcial.
    pub async fn create(&self, new_booking: NewBooking) -> AppResult<BookingWithVehicle> {
        if new_booking.start_date >= new_booking.end_date {
            return Err(validation_error(
                "end_date",
                "La fecha de fin debe ser posterior a la fecha de inicio",
            ));
        }

        if new_booking.start_date < Utc::now() {
            return Err(validation_error(
                "start_date",
                "No se puede crear una reserva en el pasado",
            ));
        }

        let created = self.gateway.create_confirmed(new_booking).await?;

        tracing::info!(
            booking_id = %created.booking.id,
            vehicle_id = %created.booking.vehicle_id,
            "✅ Reserva creada"
        );

        Ok(created)
    }

    /// Cancela una reserva del solicitante (o de cualquiera, si es admin).
    ///
    /// CANCELLED es terminal y la cancelación solo procede mientras la
    /// reserva no haya comenzado. No hay bloqueo: cancelar nunca puede
    /// introducir un solapamiento.
    pub async fn cancel(
        &self,
        booking_id: Uuid,
        requester_id: Uuid,
        requester_role: UserRole,
    ) -> AppResult<BookingWithVehicle> {
        let existing = self
            .gateway
            .find_with_vehicle(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Reserva no encontrada".to_string()))?;

        ensure_can_access(&existing.booking, requester_id, requester_role)?;

        if existing.booking.status == BookingStatus::Cancelled {
            return Err(AppError::BadRequest(
                "Esta reserva ya está cancelada".to_string(),
            ));
        }

        if existing.booking.start_date <= Utc::now() {
            return Err(AppError::BadRequest(
                "No se puede cancelar una reserva pasada o en curso".to_string(),
            ));
        }

        let cancelled = self.gateway.mark_cancelled(booking_id).await?;

        tracing::info!(booking_id = %booking_id, "🚫 Reserva cancelada");

        Ok(cancelled)
    }

    pub async fn find_by_id(
        &self,
        booking_id: Uuid,
        requester_id: Uuid,
        requester_role: UserRole,
    ) -> AppResult<BookingWithVehicle> {
        let booking = self
            .gateway
            .find_with_vehicle(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Reserva no encontrada".to_string()))?;

        ensure_can_access(&booking.booking, requester_id, requester_role)?;

        Ok(booking)
    }

    /// Los admins ven todas las reservas; los empleados solo las suyas
    pub async fn find_all(
        &self,
        requester_id: Uuid,
        requester_role: UserRole,
    ) -> AppResult<Vec<BookingWithVehicle>> {
        let scope = match requester_role {
            UserRole::Admin => BookingScope::All,
            UserRole::Employee => BookingScope::ForUser(requester_id),
        };

        self.gateway.list(scope).await
    }

    /// Reservas CONFIRMED futuras de un vehículo, para el calendario
    pub async fn vehicle_bookings(&self, vehicle_id: Uuid) -> AppResult<Vec<Booking>> {
        self.gateway.future_confirmed_for_vehicle(vehicle_id).await
    }
}

/// Política de acceso: se evalúa siempre contra la reserva recién cargada,
/// nunca contra datos aportados por el cliente.
fn ensure_can_access(booking: &Booking, requester_id: Uuid, role: UserRole) -> AppResult<()> {
    if role == UserRole::Admin || booking.user_id == requester_id {
        return Ok(());
    }

    Err(AppError::Unauthorized(
        "No puede acceder a esta reserva".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration};
    use tokio::sync::Mutex;

    use crate::models::user::UserSummary;
    use crate::models::vehicle::Vehicle;

    /// Fake en memoria del gateway. El Mutex sobre el estado cumple el
    /// mismo papel que el FOR UPDATE de Postgres: serializa el chequeo de
    /// solapamientos con la inserción, así dos creaciones concurrentes
    /// nunca se entrelazan.
    struct InMemoryGateway {
        state: Mutex<GatewayState>,
    }

    struct GatewayState {
        vehicles: Vec<Vehicle>,
        bookings: Vec<Booking>,
    }

    impl InMemoryGateway {
        fn with_vehicles(vehicles: Vec<Vehicle>) -> Self {
            Self {
                state: Mutex::new(GatewayState {
                    vehicles,
                    bookings: Vec::new(),
                }),
            }
        }

        async fn booking_count(&self) -> usize {
            self.state.lock().await.bookings.len()
        }

        async fn status_of(&self, id: Uuid) -> Option<BookingStatus> {
            self.state
                .lock()
                .await
                .bookings
                .iter()
                .find(|b| b.id == id)
                .map(|b| b.status)
        }
    }

    fn join(booking: Booking, vehicle: Vehicle) -> BookingWithVehicle {
        BookingWithVehicle {
            user: UserSummary {
                id: booking.user_id,
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                email: "test@example.com".to_string(),
            },
            booking,
            vehicle,
        }
    }

    #[async_trait]
    impl BookingGateway for InMemoryGateway {
        async fn create_confirmed(&self, new_booking: NewBooking) -> AppResult<BookingWithVehicle> {
            // El guard se mantiene durante todo el chequeo + inserción
            let mut state = self.state.lock().await;

            let vehicle = state
                .vehicles
                .iter()
                .find(|v| v.id == new_booking.vehicle_id)
                .cloned()
                .ok_or_else(|| AppError::NotFound("Vehículo no encontrado".to_string()))?;

            if !vehicle.is_available {
                return Err(AppError::Conflict(
                    "Este vehículo no está disponible para reservas".to_string(),
                ));
            }

            let overlap = state.bookings.iter().any(|b| {
                b.vehicle_id == new_booking.vehicle_id
                    && b.blocks_range(new_booking.start_date, new_booking.end_date)
            });

            if overlap {
                return Err(AppError::Conflict(
                    "El vehículo ya está reservado en ese período. Elija otras fechas.".to_string(),
                ));
            }

            let booking = Booking {
                id: Uuid::new_v4(),
                vehicle_id: new_booking.vehicle_id,
                user_id: new_booking.user_id,
                start_date: new_booking.start_date,
                end_date: new_booking.end_date,
                status: BookingStatus::Confirmed,
                reason: new_booking.reason,
                destination: new_booking.destination,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            state.bookings.push(booking.clone());

            Ok(join(booking, vehicle))
        }

        async fn find_with_vehicle(&self, id: Uuid) -> AppResult<Option<BookingWithVehicle>> {
            let state = self.state.lock().await;
            let Some(booking) = state.bookings.iter().find(|b| b.id == id).cloned() else {
                return Ok(None);
            };
            let vehicle = state
                .vehicles
                .iter()
                .find(|v| v.id == booking.vehicle_id)
                .cloned()
                .ok_or_else(|| AppError::NotFound("Vehículo no encontrado".to_string()))?;
            Ok(Some(join(booking, vehicle)))
        }

        async fn list(&self, scope: BookingScope) -> AppResult<Vec<BookingWithVehicle>> {
            let state = self.state.lock().await;
            let mut bookings: Vec<Booking> = state
                .bookings
                .iter()
                .filter(|b| match scope {
                    BookingScope::All => true,
                    BookingScope::ForUser(user_id) => b.user_id == user_id,
                })
                .cloned()
                .collect();
            bookings.sort_by(|a, b| b.start_date.cmp(&a.start_date));

            let mut result = Vec::with_capacity(bookings.len());
            for booking in bookings {
                let vehicle = state
                    .vehicles
                    .iter()
                    .find(|v| v.id == booking.vehicle_id)
                    .cloned()
                    .ok_or_else(|| AppError::NotFound("Vehículo no encontrado".to_string()))?;
                result.push(join(booking, vehicle));
            }
            Ok(result)
        }

        async fn mark_cancelled(&self, id: Uuid) -> AppResult<BookingWithVehicle> {
            let mut state = self.state.lock().await;
            let booking = state
                .bookings
                .iter_mut()
                .find(|b| b.id == id)
                .ok_or_else(|| AppError::NotFound("Reserva no encontrada".to_string()))?;
            if booking.status == BookingStatus::Cancelled {
                return Err(AppError::BadRequest(
                    "Esta reserva ya está cancelada".to_string(),
                ));
            }
            booking.status = BookingStatus::Cancelled;
            booking.updated_at = Utc::now();
            let booking = booking.clone();
            let vehicle = state
                .vehicles
                .iter()
                .find(|v| v.id == booking.vehicle_id)
                .cloned()
                .ok_or_else(|| AppError::NotFound("Vehículo no encontrado".to_string()))?;
            Ok(join(booking, vehicle))
        }

        async fn has_overlap(
            &self,
            vehicle_id: Uuid,
            start_date: DateTime<Utc>,
            end_date: DateTime<Utc>,
            exclude_booking_id: Option<Uuid>,
        ) -> AppResult<bool> {
            let state = self.state.lock().await;
            Ok(state.bookings.iter().any(|b| {
                b.vehicle_id == vehicle_id
                    && Some(b.id) != exclude_booking_id
                    && b.blocks_range(start_date, end_date)
            }))
        }

        async fn future_confirmed_for_vehicle(&self, vehicle_id: Uuid) -> AppResult<Vec<Booking>> {
            let state = self.state.lock().await;
            let now = Utc::now();
            let mut bookings: Vec<Booking> = state
                .bookings
                .iter()
                .filter(|b| {
                    b.vehicle_id == vehicle_id
                        && b.status == BookingStatus::Confirmed
                        && b.end_date >= now
                })
                .cloned()
                .collect();
            bookings.sort_by(|a, b| a.start_date.cmp(&b.start_date));
            Ok(bookings)
        }
    }

    fn test_vehicle() -> Vehicle {
        Vehicle {
            id: Uuid::new_v4(),
            brand: "Toyota".to_string(),
            model: "Corolla 2023".to_string(),
            license_plate: "TG-1234-AB".to_string(),
            is_available: true,
            image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn setup(vehicles: Vec<Vehicle>) -> (BookingService, Arc<InMemoryGateway>) {
        let gateway = Arc::new(InMemoryGateway::with_vehicles(vehicles));
        (BookingService::new(gateway.clone()), gateway)
    }

    /// Días relativos a "ahora" para construir rangos futuros
    fn day(d: i64) -> DateTime<Utc> {
        Utc::now() + Duration::days(d)
    }

    fn request(vehicle_id: Uuid, user_id: Uuid, start: i64, end: i64) -> NewBooking {
        NewBooking {
            vehicle_id,
            user_id,
            start_date: day(start),
            end_date: day(end),
            reason: "mission de terrain".to_string(),
            destination: "Kpalimé".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_rejects_end_before_start() {
        let vehicle = test_vehicle();
        let (service, gateway) = setup(vec![vehicle.clone()]);

        let result = service
            .create(request(vehicle.id, Uuid::new_v4(), 10, 5))
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(gateway.booking_count().await, 0);
    }

    #[tokio::test]
    async fn test_create_rejects_start_in_the_past() {
        let vehicle = test_vehicle();
        let (service, gateway) = setup(vec![vehicle.clone()]);

        let result = service
            .create(request(vehicle.id, Uuid::new_v4(), -1, 5))
            .await;

        // La validación temporal corta antes de tocar el gateway
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(gateway.booking_count().await, 0);
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_vehicle() {
        let (service, _) = setup(vec![test_vehicle()]);

        let result = service
            .create(request(Uuid::new_v4(), Uuid::new_v4(), 1, 5))
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_unavailable_vehicle() {
        let mut vehicle = test_vehicle();
        vehicle.is_available = false;
        let (service, _) = setup(vec![vehicle.clone()]);

        let result = service
            .create(request(vehicle.id, Uuid::new_v4(), 1, 5))
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_overlapping_request_is_rejected() {
        // Reserva existente día 10-15, petición día 12-20
        let vehicle = test_vehicle();
        let (service, _) = setup(vec![vehicle.clone()]);
        let user = Uuid::new_v4();

        service.create(request(vehicle.id, user, 10, 15)).await.unwrap();
        let result = service.create(request(vehicle.id, user, 12, 20)).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_adjacent_request_succeeds() {
        // El rango 15-20 empieza justo cuando termina 10-15
        let vehicle = test_vehicle();
        let (service, gateway) = setup(vec![vehicle.clone()]);
        let user = Uuid::new_v4();

        service.create(request(vehicle.id, user, 10, 15)).await.unwrap();
        service.create(request(vehicle.id, user, 15, 20)).await.unwrap();

        assert_eq!(gateway.booking_count().await, 2);
    }

    #[tokio::test]
    async fn test_same_range_on_another_vehicle_succeeds() {
        let vehicle_a = test_vehicle();
        let vehicle_b = test_vehicle();
        let (service, _) = setup(vec![vehicle_a.clone(), vehicle_b.clone()]);
        let user = Uuid::new_v4();

        service.create(request(vehicle_a.id, user, 10, 15)).await.unwrap();
        service.create(request(vehicle_b.id, user, 10, 15)).await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_overlapping_creates_exactly_one_succeeds() {
        let vehicle = test_vehicle();
        let (service, gateway) = setup(vec![vehicle.clone()]);
        let service = Arc::new(service);

        let s1 = service.clone();
        let s2 = service.clone();
        let v = vehicle.id;
        let (r1, r2) = tokio::join!(
            tokio::spawn(async move { s1.create(request(v, Uuid::new_v4(), 10, 15)).await }),
            tokio::spawn(async move { s2.create(request(v, Uuid::new_v4(), 12, 18)).await }),
        );
        let r1 = r1.unwrap();
        let r2 = r2.unwrap();

        // Exactamente una gana; la otra recibe Conflict
        let successes = [&r1, &r2].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        let failure = if r1.is_err() { r1 } else { r2 };
        assert!(matches!(failure, Err(AppError::Conflict(_))));
        assert_eq!(gateway.booking_count().await, 1);
    }

    #[tokio::test]
    async fn test_employee_cannot_cancel_foreign_booking() {
        let vehicle = test_vehicle();
        let (service, gateway) = setup(vec![vehicle.clone()]);
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();

        let created = service.create(request(vehicle.id, owner, 5, 8)).await.unwrap();
        let result = service
            .cancel(created.booking.id, intruder, UserRole::Employee)
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized(_))));
        assert_eq!(
            gateway.status_of(created.booking.id).await,
            Some(BookingStatus::Confirmed)
        );
    }

    #[tokio::test]
    async fn test_admin_can_cancel_any_booking() {
        let vehicle = test_vehicle();
        let (service, _) = setup(vec![vehicle.clone()]);
        let owner = Uuid::new_v4();
        let admin = Uuid::new_v4();

        let created = service.create(request(vehicle.id, owner, 5, 8)).await.unwrap();
        let cancelled = service
            .cancel(created.booking.id, admin, UserRole::Admin)
            .await
            .unwrap();

        assert_eq!(cancelled.booking.status, BookingStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_cancelled_booking_frees_the_range() {
        // Cancelar libera el rango para una nueva reserva
        let vehicle = test_vehicle();
        let (service, gateway) = setup(vec![vehicle.clone()]);
        let user = Uuid::new_v4();

        let created = service.create(request(vehicle.id, user, 5, 8)).await.unwrap();
        service
            .cancel(created.booking.id, user, UserRole::Employee)
            .await
            .unwrap();

        assert!(!gateway
            .has_overlap(vehicle.id, day(5), day(8), None)
            .await
            .unwrap());
        service.create(request(vehicle.id, user, 5, 8)).await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_cancels_only_first_succeeds() {
        let vehicle = test_vehicle();
        let (service, gateway) = setup(vec![vehicle.clone()]);
        let user = Uuid::new_v4();

        let created = service.create(request(vehicle.id, user, 5, 8)).await.unwrap();
        let booking_id = created.booking.id;
        let service = Arc::new(service);

        let s1 = service.clone();
        let s2 = service.clone();
        let (r1, r2) = tokio::join!(
            tokio::spawn(async move { s1.cancel(booking_id, user, UserRole::Employee).await }),
            tokio::spawn(async move { s2.cancel(booking_id, user, UserRole::Employee).await }),
        );
        let r1 = r1.unwrap();
        let r2 = r2.unwrap();

        // La transición es condicional: la segunda cancelación pierde
        let successes = [&r1, &r2].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        let failure = if r1.is_err() { r1 } else { r2 };
        assert!(matches!(failure, Err(AppError::BadRequest(_))));
        assert_eq!(
            gateway.status_of(booking_id).await,
            Some(BookingStatus::Cancelled)
        );
    }

    #[tokio::test]
    async fn test_cancel_of_cancelled_booking_fails_every_time() {
        let vehicle = test_vehicle();
        let (service, _) = setup(vec![vehicle.clone()]);
        let user = Uuid::new_v4();

        let created = service.create(request(vehicle.id, user, 5, 8)).await.unwrap();
        service
            .cancel(created.booking.id, user, UserRole::Employee)
            .await
            .unwrap();

        for _ in 0..3 {
            let result = service
                .cancel(created.booking.id, user, UserRole::Employee)
                .await;
            match result {
                Err(AppError::BadRequest(msg)) => {
                    assert_eq!(msg, "Esta reserva ya está cancelada");
                }
                other => panic!("expected BadRequest, got {:?}", other.map(|b| b.booking.id)),
            }
        }
    }

    #[tokio::test]
    async fn test_cannot_cancel_started_booking() {
        let vehicle = test_vehicle();
        let (service, gateway) = setup(vec![vehicle.clone()]);
        let user = Uuid::new_v4();

        // Se inserta directamente para simular una reserva ya en curso
        {
            let mut state = gateway.state.lock().await;
            state.bookings.push(Booking {
                id: Uuid::new_v4(),
                vehicle_id: vehicle.id,
                user_id: user,
                start_date: day(-2),
                end_date: day(3),
                status: BookingStatus::Confirmed,
                reason: "mission en cours".to_string(),
                destination: "Sokodé".to_string(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            });
        }
        let booking_id = {
            let state = gateway.state.lock().await;
            state.bookings[0].id
        };

        let result = service.cancel(booking_id, user, UserRole::Employee).await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert_eq!(gateway.status_of(booking_id).await, Some(BookingStatus::Confirmed));
    }

    #[tokio::test]
    async fn test_cancel_missing_booking_is_not_found() {
        let (service, _) = setup(vec![test_vehicle()]);

        let result = service
            .cancel(Uuid::new_v4(), Uuid::new_v4(), UserRole::Admin)
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_employee_cannot_read_foreign_booking() {
        let vehicle = test_vehicle();
        let (service, _) = setup(vec![vehicle.clone()]);
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();

        let created = service.create(request(vehicle.id, owner, 5, 8)).await.unwrap();
        let result = service
            .find_by_id(created.booking.id, intruder, UserRole::Employee)
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_list_is_scoped_by_role() {
        let vehicle = test_vehicle();
        let (service, _) = setup(vec![vehicle.clone()]);
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        service.create(request(vehicle.id, alice, 1, 3)).await.unwrap();
        service.create(request(vehicle.id, bob, 3, 5)).await.unwrap();
        service.create(request(vehicle.id, bob, 5, 7)).await.unwrap();

        let all = service.find_all(Uuid::new_v4(), UserRole::Admin).await.unwrap();
        assert_eq!(all.len(), 3);

        let own = service.find_all(bob, UserRole::Employee).await.unwrap();
        assert_eq!(own.len(), 2);
        assert!(own.iter().all(|b| b.booking.user_id == bob));
    }

    #[tokio::test]
    async fn test_vehicle_bookings_excludes_cancelled() {
        let vehicle = test_vehicle();
        let (service, _) = setup(vec![vehicle.clone()]);
        let user = Uuid::new_v4();

        let kept = service.create(request(vehicle.id, user, 1, 3)).await.unwrap();
        let dropped = service.create(request(vehicle.id, user, 4, 6)).await.unwrap();
        service
            .cancel(dropped.booking.id, user, UserRole::Employee)
            .await
            .unwrap();

        let bookings = service.vehicle_bookings(vehicle.id).await.unwrap();
        assert_eq!(bookings.len(), 1);
        assert_eq!(bookings[0].id, kept.booking.id);
    }
}

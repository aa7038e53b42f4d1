//! Servicio de autenticación
//!
//! Login por email/password con bcrypt y emisión de JWT.

use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::auth_dto::{LoginRequest, LoginResponse};
use crate::dto::user_dto::UserResponse;
use crate::repositories::user_repository::UserRepository;
use crate::utils::errors::{AppError, AppResult};
use crate::utils::jwt::{generate_token, JwtConfig};

pub struct AuthService {
    repository: UserRepository,
    jwt_config: JwtConfig,
}

impl AuthService {
    pub fn new(pool: PgPool, jwt_config: JwtConfig) -> Self {
        Self {
            repository: UserRepository::new(pool),
            jwt_config,
        }
    }

    /// Autentica al usuario y emite su token de sesión.
    ///
    /// Email desconocido y password incorrecto producen el mismo mensaje:
    /// la respuesta no debe revelar cuál de los dos falló.
    pub async fn login(&self, request: LoginRequest) -> AppResult<LoginResponse> {
        let user = self
            .repository
            .find_by_email(&request.email)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Credenciales incorrectas".to_string()))?;

        let valid = bcrypt::verify(&request.password, &user.password_hash)
            .map_err(|e| AppError::Hash(format!("Error verificando password: {}", e)))?;

        if !valid {
            return Err(AppError::Unauthorized("Credenciales incorrectas".to_string()));
        }

        let token = generate_token(user.id, user.role, &self.jwt_config)?;

        tracing::info!(user_id = %user.id, "🔑 Login correcto");

        Ok(LoginResponse {
            token,
            user: user.into(),
        })
    }

    /// Resuelve el usuario autenticado a partir de su id verificado
    pub async fn me(&self, user_id: Uuid) -> AppResult<UserResponse> {
        let user = self
            .repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Usuario no encontrado".to_string()))?;

        Ok(user.into())
    }
}

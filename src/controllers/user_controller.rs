use bcrypt::{hash, DEFAULT_COST};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::dto::user_dto::{CreateUserRequest, UserResponse};
use crate::models::user::UserRole;
use crate::repositories::user_repository::UserRepository;
use crate::utils::errors::{AppError, AppResult};
use crate::utils::pagination::{PaginatedResponse, PaginationParams};

pub struct UserController {
    repository: UserRepository,
}

impl UserController {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: UserRepository::new(pool),
        }
    }

    pub async fn list(&self, params: PaginationParams) -> AppResult<PaginatedResponse<UserResponse>> {
        let page = params.page();
        let limit = params.limit();

        let (users, total) = self.repository.list(limit, params.offset()).await?;
        let users = users.into_iter().map(UserResponse::from).collect();

        Ok(PaginatedResponse::new(users, total, page, limit))
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<UserResponse> {
        let user = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Usuario no encontrado".to_string()))?;

        Ok(user.into())
    }

    pub async fn create(&self, request: CreateUserRequest) -> AppResult<UserResponse> {
        request.validate()?;

        if self.repository.find_by_email(&request.email).await?.is_some() {
            return Err(AppError::Conflict(
                "Ya existe un usuario con ese email".to_string(),
            ));
        }

        let password_hash = hash(&request.password, DEFAULT_COST)
            .map_err(|e| AppError::Hash(format!("Error hasheando password: {}", e)))?;

        let user = self
            .repository
            .create(
                request.email,
                password_hash,
                request.first_name,
                request.last_name,
                request.phone,
                request.role.unwrap_or(UserRole::Employee),
            )
            .await?;

        tracing::info!(user_id = %user.id, "👤 Usuario creado");

        Ok(user.into())
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.repository.delete(id).await?;

        tracing::info!(user_id = %id, "🗑️ Usuario eliminado");

        Ok(())
    }
}

use axum::{
    extract::State,
    http::{header, HeaderName, StatusCode},
    routing::{patch, post},
    Json, Router,
};
use tracing::{info, instrument};

use super::dto::{
    CreateUserRequest, IdResponse, PublicUser, StatusResponse, UpdateUserRequest,
    UpdatedUserResponse,
};
use crate::{
    auth::{
        extractors::AuthUser,
        guard::{authorize_delete_user, authorize_modify},
        password::hash_async,
        services::{validate_name, validate_password},
    },
    db::{NewUser, Role, UserChanges},
    error::AppError,
    extract::{JsonBody, PathParam},
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user", post(create_user))
        .route(
            "/user/:id",
            patch(update_user).get(get_user).delete(delete_user),
        )
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateUserRequest>,
) -> Result<(StatusCode, [(HeaderName, String); 1], Json<IdResponse>), AppError> {
    let name = validate_name(&payload.name)?;
    validate_password(&payload.password)?;

    let password_hash = hash_async(payload.password).await?;
    let user = state
        .store
        .insert_user(NewUser {
            name,
            password_hash,
            role: Role::User,
        })
        .await?;

    info!(user_id = user.id, name = %user.name, "user registered");
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/user/{}", user.id))],
        Json(IdResponse { id: user.id }),
    ))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<PublicUser>, AppError> {
    let user = state.store.user_by_id(id).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, actor, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    PathParam(id): PathParam<i64>,
    JsonBody(payload): JsonBody<UpdateUserRequest>,
) -> Result<Json<UpdatedUserResponse>, AppError> {
    let target = state.store.user_by_id(id).await?;
    authorize_modify(&actor, target.id)?;

    let name = payload.name.as_deref().map(validate_name).transpose()?;
    let password_hash = match payload.password {
        Some(password) => {
            validate_password(&password)?;
            Some(hash_async(password).await?)
        }
        None => None,
    };

    let user = state
        .store
        .update_user(
            target.id,
            UserChanges {
                name,
                password_hash,
            },
        )
        .await?;

    info!(user_id = user.id, "user updated");
    Ok(Json(UpdatedUserResponse {
        status: "success",
        user: user.into(),
    }))
}

#[instrument(skip(state, actor))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    PathParam(id): PathParam<i64>,
) -> Result<Json<StatusResponse>, AppError> {
    let target = state.store.user_by_id(id).await?;
    authorize_delete_user(&actor, &target)?;

    state.store.delete_user(target.id).await?;
    info!(user_id = target.id, "user deleted");
    Ok(Json(StatusResponse::success()))
}

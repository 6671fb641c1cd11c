use axum::{
    extract::State,
    http::{header, HeaderName, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use super::dto::{
    validate_description, validate_price, validate_title, CreateAdvertisementRequest,
    SearchQuery, UpdateAdvertisementRequest, UpdatedAdvertisementResponse,
};
use crate::{
    auth::{extractors::AuthUser, guard::authorize_modify},
    db::{Advertisement, NewAdvertisement},
    error::AppError,
    extract::{JsonBody, PathParam, QueryParams},
    state::AppState,
    users::dto::{IdResponse, StatusResponse},
};

pub fn advertisement_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/advertisement",
            post(create_advertisement).get(search_advertisements),
        )
        .route(
            "/advertisement/:id",
            get(get_advertisement)
                .patch(update_advertisement)
                .delete(delete_advertisement),
        )
}

#[instrument(skip(state, actor, payload))]
pub async fn create_advertisement(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    JsonBody(payload): JsonBody<CreateAdvertisementRequest>,
) -> Result<(StatusCode, [(HeaderName, String); 1], Json<IdResponse>), AppError> {
    let ad = state
        .store
        .insert_advertisement(NewAdvertisement {
            title: validate_title(&payload.title)?,
            description: validate_description(&payload.description)?,
            price: validate_price(payload.price)?,
            owner_id: actor.id,
        })
        .await?;

    info!(ad_id = ad.id, owner_id = ad.owner_id, "advertisement created");
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/advertisement/{}", ad.id))],
        Json(IdResponse { id: ad.id }),
    ))
}

#[instrument(skip(state))]
pub async fn get_advertisement(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<Advertisement>, AppError> {
    Ok(Json(state.store.advertisement_by_id(id).await?))
}

#[instrument(skip(state))]
pub async fn search_advertisements(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<SearchQuery>,
) -> Result<Json<Vec<Advertisement>>, AppError> {
    let filter = query.into_filter()?;
    Ok(Json(state.store.search_advertisements(&filter).await?))
}

#[instrument(skip(state, actor, payload))]
pub async fn update_advertisement(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    PathParam(id): PathParam<i64>,
    JsonBody(payload): JsonBody<UpdateAdvertisementRequest>,
) -> Result<Json<UpdatedAdvertisementResponse>, AppError> {
    let current = state.store.advertisement_by_id(id).await?;
    authorize_modify(&actor, current.owner_id)?;

    let changes = payload.into_changes()?;
    let advertisement = state.store.update_advertisement(current.id, changes).await?;

    info!(ad_id = advertisement.id, actor_id = actor.id, "advertisement updated");
    Ok(Json(UpdatedAdvertisementResponse {
        status: "success",
        advertisement,
    }))
}

#[instrument(skip(state, actor))]
pub async fn delete_advertisement(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    PathParam(id): PathParam<i64>,
) -> Result<Json<StatusResponse>, AppError> {
    let current = state.store.advertisement_by_id(id).await?;
    authorize_modify(&actor, current.owner_id)?;

    state.store.delete_advertisement(current.id).await?;
    info!(ad_id = current.id, actor_id = actor.id, "advertisement deleted");
    Ok(Json(StatusResponse::success()))
}

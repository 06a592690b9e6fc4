use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::{
    error::ApiError,
    models::{CreateContactRequest, UpdateContactRequest},
    store::CreateOutcome,
    AppState,
};

pub const REQUIRED_FIELDS_MESSAGE: &str =
    "Make sure to provide (name, email, phone) to register a new contact.";

// A non-integer id cannot name a contact.
fn contact_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    path.map(|Path(id)| id).map_err(|rejection| {
        tracing::debug!(%rejection, "unparseable contact id");
        ApiError::NotFound
    })
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

pub async fn create_contact(
    State(state): State<AppState>,
    payload: Result<Json<CreateContactRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;

    let Some(new_contact) = request.into_new_contact() else {
        return Ok(Json(json!({ "message": REQUIRED_FIELDS_MESSAGE })).into_response());
    };

    let outcome = state.store.create(&new_contact).await.map_err(|source| {
        ApiError::storage(format!("Error creating contact {}", new_contact.name), source)
    })?;

    let response = match outcome {
        CreateOutcome::Duplicate(existing) => Json(json!({
            "message": format!(
                "Contact {} is already registered in your contacts.",
                existing.name
            ),
            "contact": existing,
        }))
        .into_response(),
        CreateOutcome::Created(contact) => {
            tracing::info!(id = contact.id, "contact created");
            (
                StatusCode::CREATED,
                Json(json!({
                    "message": format!("Contact {} created successfully.", contact.name),
                    "contact": contact,
                })),
            )
                .into_response()
        }
    };

    Ok(response)
}

pub async fn get_contact(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Response, ApiError> {
    let id = contact_id(path)?;

    let contact = state
        .store
        .find(id)
        .await
        .map_err(|source| ApiError::storage(format!("Error fetching contact {id}"), source))?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(contact).into_response())
}

pub async fn list_contacts(State(state): State<AppState>) -> Result<Response, ApiError> {
    let contacts = state
        .store
        .list()
        .await
        .map_err(|source| ApiError::storage("Error listing contacts", source))?;

    Ok(Json(json!({ "contacts": contacts })).into_response())
}

pub async fn update_contact(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateContactRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let id = contact_id(path)?;

    // An unknown id is reported before the body is looked at.
    if payload.is_err() {
        state
            .store
            .find(id)
            .await
            .map_err(|source| ApiError::storage(format!("Error updating contact {id}"), source))?
            .ok_or(ApiError::NotFound)?;
    }
    let Json(changes) = payload?;

    let contact = state
        .store
        .update(id, changes)
        .await
        .map_err(|source| ApiError::storage(format!("Error updating contact {id}"), source))?
        .ok_or(ApiError::NotFound)?;

    tracing::info!(id, "contact updated");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("Contact {} updated successfully.", contact.name),
            "contact": contact,
        })),
    )
        .into_response())
}

pub async fn delete_contact(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Response, ApiError> {
    let id = contact_id(path)?;

    let contact = state
        .store
        .delete(id)
        .await
        .map_err(|source| ApiError::storage(format!("Error deleting contact {id}"), source))?
        .ok_or(ApiError::NotFound)?;

    tracing::info!(id, "contact deleted");
    Ok(Json(json!({
        "message": format!("Contact {} deleted successfully.", contact.name),
    }))
    .into_response())
}

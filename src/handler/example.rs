use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::app::state::AppState;
use crate::domain::Example;
use crate::error::ServiceError;
use crate::port::RepositoryError;

const MAX_DESCRIPTION_LEN: usize = 100;

/// Body for `POST /api/v1/example`. The body is parsed by hand rather
/// than through an extractor so malformed input surfaces as a taxonomy
/// error instead of a framework rejection.
#[derive(Debug, Deserialize)]
pub struct CreateExampleRequest {
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExampleResponse {
    pub id: u32,
    pub description: String,
}

impl From<Example> for ExampleResponse {
    fn from(example: Example) -> Self {
        Self {
            id: example.id,
            description: example.description,
        }
    }
}

/// GET /api/v1/example/{example_id}
pub async fn get_example(
    State(state): State<AppState>,
    Path(example_id): Path<String>,
) -> Result<Json<ExampleResponse>, ServiceError> {
    let id: u32 = example_id
        .parse()
        .map_err(|_| ServiceError::invalid_format("example_id"))?;
    if id == 0 {
        return Err(ServiceError::invalid_format("example_id"));
    }

    let example = match state.repository.find_by_id(id).await {
        Ok(Some(example)) => example,
        Ok(None) => return Err(ServiceError::not_found("example")),
        Err(e) => return Err(ServiceError::with_source(
            crate::error::code::NOT_FOUND,
            "example not found",
            e,
        )),
    };
    Ok(Json(example.into()))
}

/// POST /api/v1/example
pub async fn create_example(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<ExampleResponse>), ServiceError> {
    let request: CreateExampleRequest =
        serde_json::from_slice(&body).map_err(ServiceError::invalid_request)?;
    let description = request
        .description
        .filter(|description| !description.is_empty())
        .ok_or_else(|| ServiceError::missing_field("description"))?;
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ServiceError::invalid_format("description"));
    }

    let example = match state.repository.save(description).await {
        Ok(example) => example,
        Err(RepositoryError::Duplicate(reason)) => {
            return Err(ServiceError::duplicate_request(&reason));
        }
        Err(e) => {
            return Err(ServiceError::with_source(
                "EXAMPLE_CREATE_FAILED",
                "Failed to create example",
                e,
            ));
        }
    };
    Ok((StatusCode::CREATED, Json(example.into())))
}

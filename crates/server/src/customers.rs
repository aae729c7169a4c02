//! Customer REST endpoints.
//!
//! Each route maps one HTTP verb onto one gateway operation and wraps the
//! outcome in the `{ success, data?, error?, message? }` envelope the
//! browser client branches on.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use memberdesk_core::{ApplicationError, Customer, CustomerDraft, InterfaceError};
use memberdesk_db::CustomerGateway;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

pub const ALL_DELETED_MESSAGE: &str = "All customers deleted";
pub const DELETED_MESSAGE: &str = "Customer deleted successfully";

#[derive(Clone)]
pub struct CustomerState {
    gateway: CustomerGateway,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    fn data(data: T) -> Self {
        Self { success: true, data: Some(data), error: None, message: None }
    }
}

impl Envelope<()> {
    fn message(message: &str) -> Self {
        Self { success: true, data: None, error: None, message: Some(message.to_string()) }
    }

    fn failure(error: String) -> Self {
        Self { success: false, data: None, error: Some(error), message: None }
    }
}

#[derive(Debug)]
pub struct ApiError(InterfaceError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(Envelope::<()>::failure(self.0.message().to_string()))).into_response()
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        let interface = error.into_interface(Uuid::new_v4().to_string());
        if let InterfaceError::Internal { message, correlation_id } = &interface {
            error!(
                event_name = "customer.api.store_error",
                correlation_id = %correlation_id,
                error = %message,
                "customer store operation failed"
            );
        }
        Self(interface)
    }
}

/// Bodies are decoded as JSON whatever `Content-Type` the caller sent.
fn decode_draft(body: &Bytes) -> Result<CustomerDraft, ApiError> {
    serde_json::from_slice(body).map_err(|error| {
        let correlation_id = Uuid::new_v4().to_string();
        let message = format!("Failed to parse the request body as JSON: {error}");
        info!(
            event_name = "customer.api.rejected_body",
            correlation_id = %correlation_id,
            error = %message,
            "customer request body could not be decoded"
        );
        ApiError(InterfaceError::BadRequest { message, correlation_id })
    })
}

type ApiResult<T> = Result<T, ApiError>;

pub fn router(gateway: CustomerGateway) -> Router {
    Router::new()
        .route(
            "/customer",
            get(list_customers).post(create_customer).delete(delete_all_customers),
        )
        .route("/customer/{id}", get(get_customer).put(update_customer).delete(delete_customer))
        .with_state(CustomerState { gateway })
}

async fn list_customers(
    State(state): State<CustomerState>,
) -> ApiResult<Json<Envelope<Vec<Customer>>>> {
    let customers = state.gateway.list().await?;
    Ok(Json(Envelope::data(customers)))
}

async fn create_customer(
    State(state): State<CustomerState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Envelope<Customer>>)> {
    let draft = decode_draft(&body)?;
    let customer = state.gateway.create(draft).await?;
    Ok((StatusCode::CREATED, Json(Envelope::data(customer))))
}

async fn delete_all_customers(State(state): State<CustomerState>) -> ApiResult<Json<Envelope<()>>> {
    state.gateway.delete_all().await?;
    Ok(Json(Envelope::message(ALL_DELETED_MESSAGE)))
}

async fn get_customer(
    Path(id): Path<String>,
    State(state): State<CustomerState>,
) -> ApiResult<Json<Envelope<Customer>>> {
    let customer = state.gateway.get_by_id(&id).await?;
    Ok(Json(Envelope::data(customer)))
}

async fn update_customer(
    Path(id): Path<String>,
    State(state): State<CustomerState>,
    body: Bytes,
) -> ApiResult<Json<Envelope<Customer>>> {
    let draft = decode_draft(&body)?;
    let customer = state.gateway.update(&id, draft).await?;
    Ok(Json(Envelope::data(customer)))
}

async fn delete_customer(
    Path(id): Path<String>,
    State(state): State<CustomerState>,
) -> ApiResult<Json<Envelope<()>>> {
    state.gateway.delete_by_id(&id).await?;
    Ok(Json(Envelope::message(DELETED_MESSAGE)))
}

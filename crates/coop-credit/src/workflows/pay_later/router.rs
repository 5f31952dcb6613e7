use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{Local, Utc};
use serde_json::json;

use super::domain::{ApplicationId, ApplicationRequest, InstallmentId};
use super::repository::{CreditStore, PaymentGateway, StoreError};
use super::service::{PayLaterError, PayLaterService};
use crate::workflows::scoring::{MemberId, MemberLedger};

/// Router builder exposing the pay-later workflow over HTTP.
pub fn credit_router<L, S, G>(service: Arc<PayLaterService<L, S, G>>) -> Router
where
    L: MemberLedger + 'static,
    S: CreditStore + 'static,
    G: PaymentGateway + 'static,
{
    Router::new()
        .route(
            "/api/v1/credit/members/:member_id/eligibility",
            get(eligibility_handler::<L, S, G>),
        )
        .route(
            "/api/v1/credit/members/:member_id/applications",
            get(member_applications_handler::<L, S, G>),
        )
        .route(
            "/api/v1/credit/applications",
            post(create_application_handler::<L, S, G>),
        )
        .route(
            "/api/v1/credit/applications/:application_id",
            get(application_handler::<L, S, G>),
        )
        .route(
            "/api/v1/credit/applications/:application_id/approve",
            post(approve_handler::<L, S, G>),
        )
        .route(
            "/api/v1/credit/applications/:application_id/installments",
            get(installments_handler::<L, S, G>),
        )
        .route(
            "/api/v1/credit/installments/:installment_id/payments",
            post(payment_handler::<L, S, G>),
        )
        .route(
            "/api/v1/credit/installments/:installment_id/cancellation",
            post(cancel_handler::<L, S, G>),
        )
        .with_state(service)
}

impl PayLaterError {
    /// HTTP status for the error taxonomy: caller-input problems are 422,
    /// missing records 404, state conflicts 409, everything else 500.
    pub fn status_code(&self) -> StatusCode {
        match self {
            PayLaterError::NotEligible { .. }
            | PayLaterError::LimitExceeded { .. }
            | PayLaterError::InvalidTerms(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PayLaterError::InvalidState { .. } => StatusCode::CONFLICT,
            PayLaterError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
            PayLaterError::Store(StoreError::Conflict) => StatusCode::CONFLICT,
            PayLaterError::Scoring(_) | PayLaterError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

fn error_response(error: PayLaterError) -> Response {
    let status = error.status_code();
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn eligibility_handler<L, S, G>(
    State(service): State<Arc<PayLaterService<L, S, G>>>,
    Path(member_id): Path<String>,
) -> Response
where
    L: MemberLedger + 'static,
    S: CreditStore + 'static,
    G: PaymentGateway + 'static,
{
    let member = MemberId(member_id);
    match service.check_eligibility(&member, Utc::now()) {
        Ok(snapshot) => (StatusCode::OK, axum::Json(snapshot)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn member_applications_handler<L, S, G>(
    State(service): State<Arc<PayLaterService<L, S, G>>>,
    Path(member_id): Path<String>,
) -> Response
where
    L: MemberLedger + 'static,
    S: CreditStore + 'static,
    G: PaymentGateway + 'static,
{
    let member = MemberId(member_id);
    match service.applications_for(&member) {
        Ok(applications) => {
            let views: Vec<_> = applications
                .iter()
                .map(|application| application.status_view())
                .collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn create_application_handler<L, S, G>(
    State(service): State<Arc<PayLaterService<L, S, G>>>,
    axum::Json(request): axum::Json<ApplicationRequest>,
) -> Response
where
    L: MemberLedger + 'static,
    S: CreditStore + 'static,
    G: PaymentGateway + 'static,
{
    match service.create_application(request, Utc::now()) {
        Ok(application) => {
            (StatusCode::CREATED, axum::Json(application.status_view())).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn application_handler<L, S, G>(
    State(service): State<Arc<PayLaterService<L, S, G>>>,
    Path(application_id): Path<String>,
) -> Response
where
    L: MemberLedger + 'static,
    S: CreditStore + 'static,
    G: PaymentGateway + 'static,
{
    let id = ApplicationId(application_id);
    match service.application(&id) {
        Ok(application) => (StatusCode::OK, axum::Json(application.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn approve_handler<L, S, G>(
    State(service): State<Arc<PayLaterService<L, S, G>>>,
    Path(application_id): Path<String>,
) -> Response
where
    L: MemberLedger + 'static,
    S: CreditStore + 'static,
    G: PaymentGateway + 'static,
{
    let id = ApplicationId(application_id);
    match service.approve_application(&id, Local::now().date_naive()) {
        Ok(application) => (StatusCode::OK, axum::Json(application.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn installments_handler<L, S, G>(
    State(service): State<Arc<PayLaterService<L, S, G>>>,
    Path(application_id): Path<String>,
) -> Response
where
    L: MemberLedger + 'static,
    S: CreditStore + 'static,
    G: PaymentGateway + 'static,
{
    let id = ApplicationId(application_id);
    match service.installments_for(&id) {
        Ok(installments) => (StatusCode::OK, axum::Json(installments)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn payment_handler<L, S, G>(
    State(service): State<Arc<PayLaterService<L, S, G>>>,
    Path(installment_id): Path<String>,
) -> Response
where
    L: MemberLedger + 'static,
    S: CreditStore + 'static,
    G: PaymentGateway + 'static,
{
    let id = InstallmentId(installment_id);
    match service.process_scheduled_payment(&id, Utc::now()) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn cancel_handler<L, S, G>(
    State(service): State<Arc<PayLaterService<L, S, G>>>,
    Path(installment_id): Path<String>,
) -> Response
where
    L: MemberLedger + 'static,
    S: CreditStore + 'static,
    G: PaymentGateway + 'static,
{
    let id = InstallmentId(installment_id);
    match service.cancel_scheduled_payment(&id) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

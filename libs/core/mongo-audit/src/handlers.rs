//! HTTP handlers for the audit history endpoint

use axum::{Json, Router, extract::State, routing::get};
use axum_helpers::{
    AppError, ErrorResponse, QueryParams,
    errors::responses::{BadRequestQueryResponse, InternalServerErrorResponse},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use utoipa::{IntoParams, OpenApi, ToResponse, ToSchema};

use crate::page::{DEFAULT_PAGE_SIZE, PageMetadata, PageRequest};
use crate::query::{AuditQuery, AuditQueryService};
use crate::record::{AuditEntry, AuditType};
use crate::store::AuditStore;

/// OpenAPI documentation for the audit history API
#[derive(OpenApi)]
#[openapi(
    paths(get_audit_history),
    components(
        schemas(AuditHistoryPage, AuditEntry, AuditType, PageMetadata),
        responses(
            AuditTrailNotConfiguredResponse,
            BadRequestQueryResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = "Audit History", description = "Change history of audited collections")
    )
)]
pub struct ApiDoc;

#[derive(ToResponse)]
#[response(
    description = "Bad Request - Collection is not audited",
    content_type = "application/json",
    example = json!({
        "code": 1201,
        "error": "AUDIT_TRAIL_NOT_CONFIGURED",
        "message": "Audit collection not found for Source collection: orders"
    })
)]
pub struct AuditTrailNotConfiguredResponse(pub ErrorResponse);

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AuditHistoryParams {
    /// Source collection whose history is requested
    pub collection_name: String,
    #[serde(rename = "type")]
    pub audit_type: Option<AuditType>,
    pub actor: Option<String>,
    /// Inclusive lower bound (RFC 3339)
    pub from_date_time: Option<DateTime<Utc>>,
    /// Inclusive upper bound (RFC 3339)
    pub till_date_time: Option<DateTime<Utc>>,
    /// Zero-based page index
    #[serde(default)]
    pub page: u64,
    #[serde(default = "default_size")]
    #[param(default = 16)]
    pub size: u64,
}

fn default_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

impl AuditHistoryParams {
    fn into_query(self) -> Result<AuditQuery, AppError> {
        if let (Some(from), Some(till)) = (self.from_date_time, self.till_date_time) {
            if from > till {
                return Err(AppError::BadRequest(
                    "fromDateTime must not be after tillDateTime".to_string(),
                ));
            }
        }

        Ok(AuditQuery {
            collection_name: self.collection_name,
            audit_type: self.audit_type,
            actor: self.actor.filter(|actor| !actor.trim().is_empty()),
            from: self.from_date_time,
            till: self.till_date_time,
            page: PageRequest::new(self.page, self.size),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuditHistoryPage {
    pub content: Vec<AuditEntry>,
    pub page: PageMetadata,
}

/// Create the audit history router
pub fn router<S: AuditStore + 'static>(service: AuditQueryService<S>) -> Router {
    Router::new()
        .route("/", get(get_audit_history::<S>))
        .with_state(Arc::new(service))
}

/// Audit records of a source collection, ordered by revision
#[utoipa::path(
    get,
    path = "",
    tag = "Audit History",
    params(AuditHistoryParams),
    responses(
        (status = 200, description = "Page of audit records", body = AuditHistoryPage),
        (status = 400, response = AuditTrailNotConfiguredResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_audit_history<S: AuditStore>(
    State(service): State<Arc<AuditQueryService<S>>>,
    QueryParams(params): QueryParams<AuditHistoryParams>,
) -> Result<Json<AuditHistoryPage>, AppError> {
    let page = service.query(params.into_query()?).await?.map(AuditEntry::from);

    Ok(Json(AuditHistoryPage {
        content: page.content,
        page: page.page,
    }))
}

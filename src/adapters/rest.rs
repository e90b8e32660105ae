//! REST surface of the ledger, independent of any HTTP framework.
//!
//! Request types deserialize the JSON bodies and query strings the UI sends;
//! every handler returns an [`ApiResponse`] carrying the status code and JSON
//! body a server would write. Errors become `{message, category}` with the
//! error's own status code.

use crate::core::service::ComplianceService;
use crate::domain::model::RouteFilter;
use crate::domain::ports::{LedgerStore, TargetIntensity};
use crate::utils::error::{ErrorCategory, LedgerError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipYearQuery {
    pub ship_id: String,
    pub year: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankRecordsQuery {
    pub ship_id: String,
    #[serde(default)]
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankingRequest {
    pub ship_id: String,
    pub year: i32,
    pub amount: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolMemberRequest {
    pub ship_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePoolRequest {
    pub year: i32,
    pub members: Vec<PoolMemberRequest>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageBody {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub category: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableBalance {
    pub ship_id: String,
    pub year: i32,
    pub available: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `body.message`, when the body has one.
    pub fn message(&self) -> Option<&str> {
        self.body.get("message").and_then(Value::as_str)
    }
}

impl From<&LedgerError> for ApiResponse {
    fn from(err: &LedgerError) -> Self {
        let category = match err.category() {
            ErrorCategory::Client => {
                tracing::warn!(status = err.status_code(), "request rejected: {}", err);
                "client"
            }
            ErrorCategory::Server => {
                tracing::error!(status = err.status_code(), "request failed: {}", err);
                "server"
            }
        };
        let body = ErrorBody {
            message: err.user_friendly_message(),
            category,
        };
        ApiResponse {
            status: err.status_code(),
            body: serde_json::to_value(body).unwrap_or(Value::Null),
        }
    }
}

fn respond<T: Serialize>(status: u16, result: Result<T>) -> ApiResponse {
    match result.and_then(|value| serde_json::to_value(value).map_err(LedgerError::from)) {
        Ok(body) => ApiResponse { status, body },
        Err(err) => ApiResponse::from(&err),
    }
}

pub struct RestApi<S: LedgerStore, T: TargetIntensity> {
    service: Arc<ComplianceService<S, T>>,
}

impl<S: LedgerStore, T: TargetIntensity> Clone for RestApi<S, T> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
        }
    }
}

impl<S: LedgerStore, T: TargetIntensity> RestApi<S, T> {
    pub fn new(service: Arc<ComplianceService<S, T>>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<ComplianceService<S, T>> {
        &self.service
    }

    /// `GET /compliance/cb?shipId&year`
    pub async fn get_cb(&self, query: ShipYearQuery) -> ApiResponse {
        let result = self
            .service
            .compute_cb(&query.ship_id, query.year)
            .await
            .map(|data| DataEnvelope { data });
        respond(200, result)
    }

    /// `POST /compliance/banking/bank`
    pub async fn bank(&self, request: BankingRequest) -> ApiResponse {
        let result = self
            .service
            .bank(&request.ship_id, request.year, request.amount)
            .await
            .map(|c| MessageBody { message: c.message });
        respond(200, result)
    }

    /// `POST /compliance/banking/apply`
    pub async fn apply(&self, request: BankingRequest) -> ApiResponse {
        let result = self
            .service
            .apply(&request.ship_id, request.year, request.amount)
            .await
            .map(|c| MessageBody { message: c.message });
        respond(200, result)
    }

    /// `GET /compliance/banking/available?shipId&year`
    pub async fn available(&self, query: ShipYearQuery) -> ApiResponse {
        let result = self
            .service
            .available_to_apply(&query.ship_id, query.year)
            .await
            .map(|available| DataEnvelope {
                data: AvailableBalance {
                    ship_id: query.ship_id.clone(),
                    year: query.year,
                    available,
                },
            });
        respond(200, result)
    }

    /// `GET /banking/records?shipId&year`
    pub async fn bank_records(&self, query: BankRecordsQuery) -> ApiResponse {
        let result = self
            .service
            .bank_records(&query.ship_id, query.year)
            .await
            .map(|data| DataEnvelope { data });
        respond(200, result)
    }

    /// `POST /pools`
    pub async fn create_pool(&self, request: CreatePoolRequest) -> ApiResponse {
        let members: Vec<String> = request.members.into_iter().map(|m| m.ship_id).collect();
        respond(201, self.service.create_pool(request.year, &members).await)
    }

    /// `GET /pools?year`
    pub async fn list_pools(&self, year: Option<i32>) -> ApiResponse {
        respond(200, self.service.list_pools(year).await)
    }

    /// `GET /pools/:id`
    pub async fn get_pool(&self, pool_id: &str) -> ApiResponse {
        respond(200, self.service.get_pool(pool_id).await)
    }

    /// `GET /routes`
    pub async fn list_routes(&self, filter: RouteFilter) -> ApiResponse {
        respond(200, self.service.list_routes(&filter).await)
    }

    /// `POST /routes/:id/baseline`
    pub async fn set_baseline(&self, id: u64) -> ApiResponse {
        respond(200, self.service.set_baseline(id).await)
    }

    /// `GET /routes/comparison?year`
    pub async fn comparison(&self, year: Option<i32>) -> ApiResponse {
        let result = self
            .service
            .compare_to_baseline(year)
            .await
            .map(|data| DataEnvelope { data });
        respond(200, result)
    }
}

use std::time::{Duration as StdDuration, Instant};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult, BackendErrorCode};
use crate::models::proposal::{
    ApplyOutcomeDto, AvailabilityReport, OptimalScheduleDto, ProposedEntry,
};
use crate::models::records::{BookingStatus, RawBooking, RawSession, SessionStatus};

/// Boundary to the remote booking/session store and the assignment
/// service. The engine never talks HTTP directly; everything goes through
/// this trait so tests can substitute a mock server or an in-process fake.
#[async_trait]
pub trait ScheduleBackend: Send + Sync {
    async fn list_bookings(&self, status: BookingStatus) -> AppResult<Vec<RawBooking>>;

    async fn list_sessions(&self, status: SessionStatus) -> AppResult<Vec<RawSession>>;

    async fn get_optimal_schedule(&self, trainer_id: i64) -> AppResult<OptimalScheduleDto>;

    /// Apply one proposed entry. Rejection is a successful response with
    /// `status: rejected`, not an `Err`; transport-level failures are.
    async fn apply_proposed_entry(&self, request_id: i64) -> AppResult<ApplyOutcomeDto>;

    /// Server-side pre-check for a batch of entries. Read-only despite
    /// living next to the apply endpoint.
    async fn check_availability_batch(
        &self,
        entries: &[ProposedEntry],
    ) -> AppResult<AvailabilityReport>;
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    pub http_timeout: StdDuration,
}

impl BackendConfig {
    pub fn from_env() -> Self {
        let base_url = std::env::var("COACHCAL_API_BASE_URL")
            .ok()
            .unwrap_or_else(|| "https://api.coachcal.app".to_string());
        let api_token = std::env::var("COACHCAL_API_TOKEN")
            .ok()
            .and_then(|value| {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    Option::None
                } else {
                    Some(trimmed.to_string())
                }
            });
        let http_timeout = std::env::var("COACHCAL_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map(StdDuration::from_secs)
            .unwrap_or_else(|| StdDuration::from_secs(30));

        Self {
            base_url,
            api_token,
            http_timeout,
        }
    }
}

pub struct HttpScheduleBackend {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpScheduleBackend {
    pub fn try_new(config: &BackendConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Some(StdDuration::from_secs(90)))
            .build()
            .map_err(|err| AppError::other(format!("初始化日程服务 HTTP 客户端失败: {err}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> AppResult<T> {
        let correlation_id = Uuid::new_v4().to_string();
        let url = format!("{}{}", self.base_url, path);

        debug!(
            target: "app::backend",
            %path,
            correlation_id = %correlation_id,
            "fetching from schedule backend"
        );

        let start = Instant::now();
        let mut request = self.client.get(&url).query(query);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|err| error_from_reqwest(err, &correlation_id))?;

        Self::decode_response(response, start, path, &correlation_id).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> AppResult<T> {
        let correlation_id = Uuid::new_v4().to_string();
        let url = format!("{}{}", self.base_url, path);

        debug!(
            target: "app::backend",
            %path,
            correlation_id = %correlation_id,
            "posting to schedule backend"
        );

        let start = Instant::now();
        let mut request = self.client.post(&url).json(body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|err| error_from_reqwest(err, &correlation_id))?;

        Self::decode_response(response, start, path, &correlation_id).await
    }

    async fn decode_response<T: DeserializeOwned>(
        response: reqwest::Response,
        start: Instant,
        path: &str,
        correlation_id: &str,
    ) -> AppResult<T> {
        let status = response.status();
        let latency_ms = start.elapsed().as_millis();

        if !status.is_success() {
            warn!(
                target: "app::backend",
                %path,
                correlation_id = %correlation_id,
                status = status.as_u16(),
                latency_ms,
                "日程服务返回非成功状态"
            );
            return Err(map_http_error(status, correlation_id));
        }

        debug!(
            target: "app::backend",
            %path,
            correlation_id = %correlation_id,
            latency_ms,
            "schedule backend responded"
        );

        response.json::<T>().await.map_err(|err| {
            AppError::backend_with_details(
                BackendErrorCode::InvalidResponse,
                "解析日程服务响应失败",
                Some(correlation_id),
                Some(json!({ "reason": err.to_string() })),
            )
        })
    }
}

#[async_trait]
impl ScheduleBackend for HttpScheduleBackend {
    async fn list_bookings(&self, status: BookingStatus) -> AppResult<Vec<RawBooking>> {
        self.get_json("/bookings", &[("status", status.as_str())])
            .await
    }

    async fn list_sessions(&self, status: SessionStatus) -> AppResult<Vec<RawSession>> {
        self.get_json("/sessions", &[("status", status.as_str())])
            .await
    }

    async fn get_optimal_schedule(&self, trainer_id: i64) -> AppResult<OptimalScheduleDto> {
        self.get_json(&format!("/trainers/{trainer_id}/optimal-schedule"), &[])
            .await
    }

    async fn apply_proposed_entry(&self, request_id: i64) -> AppResult<ApplyOutcomeDto> {
        self.post_json("/schedule/apply", &json!({ "requestId": request_id }))
            .await
    }

    async fn check_availability_batch(
        &self,
        entries: &[ProposedEntry],
    ) -> AppResult<AvailabilityReport> {
        self.post_json(
            "/schedule/check-availability",
            &json!({ "proposedEntries": entries }),
        )
        .await
    }
}

fn map_http_error(status: StatusCode, correlation_id: &str) -> AppError {
    match status {
        StatusCode::UNAUTHORIZED => AppError::backend_with_details(
            BackendErrorCode::MissingApiToken,
            "日程服务令牌无效或未授权",
            Some(correlation_id),
            None,
        ),
        StatusCode::FORBIDDEN => AppError::backend_with_details(
            BackendErrorCode::Forbidden,
            "日程服务权限不足",
            Some(correlation_id),
            None,
        ),
        StatusCode::TOO_MANY_REQUESTS => AppError::backend_with_details(
            BackendErrorCode::RateLimited,
            "日程服务请求过于频繁，请稍后重试",
            Some(correlation_id),
            None,
        ),
        status if status.is_server_error() => AppError::backend_with_details(
            BackendErrorCode::ServiceUnavailable,
            format!("日程服务暂时不可用 (状态码 {})", status.as_u16()),
            Some(correlation_id),
            None,
        ),
        StatusCode::BAD_REQUEST => AppError::backend_with_details(
            BackendErrorCode::InvalidRequest,
            "日程服务请求格式无效",
            Some(correlation_id),
            None,
        ),
        StatusCode::NOT_FOUND => AppError::not_found(),
        StatusCode::CONFLICT => AppError::conflict("日程状态已变更，请刷新后重试"),
        status => AppError::backend_with_details(
            BackendErrorCode::Unknown,
            format!("日程服务返回错误状态码 {}", status.as_u16()),
            Some(correlation_id),
            None,
        ),
    }
}

fn error_from_reqwest(err: reqwest::Error, correlation_id: &str) -> AppError {
    if err.is_timeout() {
        AppError::backend_with_details(
            BackendErrorCode::HttpTimeout,
            "日程服务请求超时",
            Some(correlation_id),
            None,
        )
    } else if err.is_connect() {
        AppError::backend_with_details(
            BackendErrorCode::ServiceUnavailable,
            "日程服务网络连接失败",
            Some(correlation_id),
            None,
        )
    } else if let Some(status) = err.status() {
        map_http_error(status, correlation_id)
    } else {
        AppError::backend_with_details(
            BackendErrorCode::Unknown,
            format!("日程服务请求失败: {err}"),
            Some(correlation_id),
            None,
        )
    }
}

pub mod testing {
    use super::*;

    /// Expose status mapping for integration tests without widening the
    /// public API surface.
    pub fn map_http_error(status: StatusCode) -> AppError {
        super::map_http_error(status, "test-correlation-id")
    }
}

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::adjustments::AdjustmentError;
use super::domain::{ActivityType, ComponentScores, TriggerKind, UserId, VouchId};
use super::eligibility::EligibilityError;
use super::recovery::RecoveryError;
use super::service::ScoreService;
use super::store::{ScoreEventPublisher, ScoreStore, StoreError};
use super::vouching::VouchError;

/// Router builder exposing the scoring core over HTTP. Health, readiness,
/// and metrics are layered on by the API binary.
pub fn score_router<S, P>(service: Arc<ScoreService<S, P>>) -> Router
where
    S: ScoreStore + 'static,
    P: ScoreEventPublisher + 'static,
{
    Router::new()
        .route("/api/v1/score/enroll", post(enroll_handler::<S, P>))
        .route(
            "/api/v1/score/adjustments",
            post(adjustment_handler::<S, P>),
        )
        .route("/api/v1/score/leaderboard", get(leaderboard_handler::<S, P>))
        .route("/api/v1/score/tiers", get(tier_distribution_handler::<S, P>))
        .route("/api/v1/score/:user_id", get(score_handler::<S, P>))
        .route(
            "/api/v1/score/:user_id/history",
            get(history_handler::<S, P>),
        )
        .route("/api/v1/vouches", post(create_vouch_handler::<S, P>))
        .route(
            "/api/v1/vouches/:vouch_id/revoke",
            post(revoke_vouch_handler::<S, P>),
        )
        .route(
            "/api/v1/vouches/:vouch_id/default",
            post(default_vouch_handler::<S, P>),
        )
        .route(
            "/api/v1/vouches/:user_id/limits",
            get(vouch_limits_handler::<S, P>),
        )
        .route("/api/v1/vouches/value", get(vouch_value_handler::<S, P>))
        .route("/api/v1/activity", post(activity_handler::<S, P>))
        .route(
            "/api/v1/eligibility/:user_id",
            get(eligibility_handler::<S, P>),
        )
        .route(
            "/api/v1/recovery/:user_id/start",
            post(start_recovery_handler::<S, P>),
        )
        .route(
            "/api/v1/recovery/:user_id/end",
            post(end_recovery_handler::<S, P>),
        )
        .route(
            "/api/v1/ops/decay-at-risk",
            get(decay_at_risk_handler::<S, P>),
        )
        .route(
            "/api/v1/ops/tenure-eligible",
            get(tenure_eligible_handler::<S, P>),
        )
        .route(
            "/api/v1/ops/recovery-active",
            get(recovery_active_handler::<S, P>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub struct EnrollRequest {
    pub user_id: String,
    #[serde(default)]
    pub seed: ComponentScores,
}

#[derive(Debug, Deserialize)]
pub struct AdjustmentRequest {
    pub user_id: String,
    pub trigger: TriggerKind,
    /// Explicit delta; omitted for predefined triggers whose magnitude
    /// comes from the policy table.
    pub delta: Option<i16>,
    pub trigger_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VouchRequest {
    pub voucher_id: String,
    pub vouchee_id: String,
    #[serde(default)]
    pub reason: String,
    pub points: Option<u8>,
}

#[derive(Debug, Deserialize)]
pub struct ReasonBody {
    #[serde(default)]
    pub reason: String,
    pub trigger_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ActivityRequest {
    pub user_id: String,
    pub activity_type: ActivityType,
    pub event_id: String,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct VouchValueQuery {
    pub voucher: String,
    pub vouchee: String,
}

#[derive(Debug, Deserialize)]
pub struct EligibilityQuery {
    pub circle: String,
    pub amount: u32,
}

#[derive(Debug, Deserialize)]
pub struct RecoveryStartBody {
    #[serde(default)]
    pub trigger: String,
}

pub(crate) async fn enroll_handler<S, P>(
    State(service): State<Arc<ScoreService<S, P>>>,
    axum::Json(request): axum::Json<EnrollRequest>,
) -> Response
where
    S: ScoreStore + 'static,
    P: ScoreEventPublisher + 'static,
{
    match service
        .adjustments()
        .enroll(UserId(request.user_id), request.seed, Utc::now())
    {
        Ok(record) => (StatusCode::CREATED, axum::Json(record)).into_response(),
        Err(AdjustmentError::Store(StoreError::Conflict)) => error_response(
            StatusCode::CONFLICT,
            "score record already exists".to_string(),
        ),
        Err(err) => adjustment_error_response(err),
    }
}

pub(crate) async fn adjustment_handler<S, P>(
    State(service): State<Arc<ScoreService<S, P>>>,
    axum::Json(request): axum::Json<AdjustmentRequest>,
) -> Response
where
    S: ScoreStore + 'static,
    P: ScoreEventPublisher + 'static,
{
    let user = UserId(request.user_id);
    let trigger_id = request
        .trigger_id
        .unwrap_or_else(|| super::adjustments::AdjustmentProcessor::<S, P>::synthesize_trigger_id("adj"));
    let now = Utc::now();

    let outcome = match request.delta {
        Some(delta) => service
            .adjustments()
            .apply(&user, delta, request.trigger, &trigger_id, now),
        None => service
            .adjustments()
            .apply_predefined(&user, request.trigger, &trigger_id, now),
    };

    match outcome {
        Ok(result) => (StatusCode::OK, axum::Json(result)).into_response(),
        Err(err) => adjustment_error_response(err),
    }
}

pub(crate) async fn score_handler<S, P>(
    State(service): State<Arc<ScoreService<S, P>>>,
    Path(user_id): Path<String>,
) -> Response
where
    S: ScoreStore + 'static,
    P: ScoreEventPublisher + 'static,
{
    match service.get_score(&UserId(user_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(err) => adjustment_error_response(err),
    }
}

pub(crate) async fn history_handler<S, P>(
    State(service): State<Arc<ScoreService<S, P>>>,
    Path(user_id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Response
where
    S: ScoreStore + 'static,
    P: ScoreEventPublisher + 'static,
{
    match service.get_history(&UserId(user_id), query.limit.unwrap_or(50)) {
        Ok(history) => (StatusCode::OK, axum::Json(history)).into_response(),
        Err(err) => adjustment_error_response(err),
    }
}

pub(crate) async fn leaderboard_handler<S, P>(
    State(service): State<Arc<ScoreService<S, P>>>,
    Query(query): Query<LimitQuery>,
) -> Response
where
    S: ScoreStore + 'static,
    P: ScoreEventPublisher + 'static,
{
    match service.analytics().leaderboard(query.limit.unwrap_or(10)) {
        Ok(entries) => (StatusCode::OK, axum::Json(entries)).into_response(),
        Err(err) => store_error_response(err),
    }
}

pub(crate) async fn tier_distribution_handler<S, P>(
    State(service): State<Arc<ScoreService<S, P>>>,
) -> Response
where
    S: ScoreStore + 'static,
    P: ScoreEventPublisher + 'static,
{
    match service.analytics().tier_distribution() {
        Ok(distribution) => {
            let view: serde_json::Map<String, serde_json::Value> = distribution
                .into_iter()
                .map(|(tier, count)| (tier.label().to_string(), json!(count)))
                .collect();
            (StatusCode::OK, axum::Json(serde_json::Value::Object(view))).into_response()
        }
        Err(err) => store_error_response(err),
    }
}

pub(crate) async fn create_vouch_handler<S, P>(
    State(service): State<Arc<ScoreService<S, P>>>,
    axum::Json(request): axum::Json<VouchRequest>,
) -> Response
where
    S: ScoreStore + 'static,
    P: ScoreEventPublisher + 'static,
{
    match service.vouching().create_vouch(
        &UserId(request.voucher_id),
        &UserId(request.vouchee_id),
        &request.reason,
        request.points,
        Utc::now(),
    ) {
        Ok(vouch) => (StatusCode::CREATED, axum::Json(vouch)).into_response(),
        Err(err) => vouch_error_response(err),
    }
}

pub(crate) async fn revoke_vouch_handler<S, P>(
    State(service): State<Arc<ScoreService<S, P>>>,
    Path(vouch_id): Path<String>,
    axum::Json(body): axum::Json<ReasonBody>,
) -> Response
where
    S: ScoreStore + 'static,
    P: ScoreEventPublisher + 'static,
{
    match service
        .vouching()
        .revoke_vouch(&VouchId(vouch_id), &body.reason)
    {
        Ok(vouch) => (StatusCode::OK, axum::Json(vouch)).into_response(),
        Err(err) => vouch_error_response(err),
    }
}

pub(crate) async fn default_vouch_handler<S, P>(
    State(service): State<Arc<ScoreService<S, P>>>,
    Path(vouch_id): Path<String>,
    axum::Json(body): axum::Json<ReasonBody>,
) -> Response
where
    S: ScoreStore + 'static,
    P: ScoreEventPublisher + 'static,
{
    let trigger_id = body
        .trigger_id
        .unwrap_or_else(|| format!("default-{vouch_id}"));
    match service
        .vouching()
        .mark_defaulted(&VouchId(vouch_id), &trigger_id, Utc::now())
    {
        Ok(vouch) => (StatusCode::OK, axum::Json(vouch)).into_response(),
        Err(err) => vouch_error_response(err),
    }
}

pub(crate) async fn vouch_limits_handler<S, P>(
    State(service): State<Arc<ScoreService<S, P>>>,
    Path(user_id): Path<String>,
) -> Response
where
    S: ScoreStore + 'static,
    P: ScoreEventPublisher + 'static,
{
    let user = UserId(user_id);
    match service.vouching().capacity(&user) {
        Ok(capacity) => {
            let gates = &service.policy().eligibility.gates;
            let payload = json!({
                "user_id": user,
                "capacity": capacity,
                "contribution_gates": gates,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => vouch_error_response(err),
    }
}

pub(crate) async fn vouch_value_handler<S, P>(
    State(service): State<Arc<ScoreService<S, P>>>,
    Query(query): Query<VouchValueQuery>,
) -> Response
where
    S: ScoreStore + 'static,
    P: ScoreEventPublisher + 'static,
{
    match service
        .vouching()
        .vouch_value(&UserId(query.voucher), &UserId(query.vouchee))
    {
        Ok(points) => (StatusCode::OK, axum::Json(json!({ "points": points }))).into_response(),
        Err(err) => vouch_error_response(err),
    }
}

pub(crate) async fn activity_handler<S, P>(
    State(service): State<Arc<ScoreService<S, P>>>,
    axum::Json(request): axum::Json<ActivityRequest>,
) -> Response
where
    S: ScoreStore + 'static,
    P: ScoreEventPublisher + 'static,
{
    match service.decay().update_financial_activity(
        &UserId(request.user_id),
        request.activity_type,
        &request.event_id,
        Utc::now(),
    ) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(err) => adjustment_error_response(err),
    }
}

pub(crate) async fn eligibility_handler<S, P>(
    State(service): State<Arc<ScoreService<S, P>>>,
    Path(user_id): Path<String>,
    Query(query): Query<EligibilityQuery>,
) -> Response
where
    S: ScoreStore + 'static,
    P: ScoreEventPublisher + 'static,
{
    match service.eligibility().check_circle_eligibility(
        &UserId(user_id),
        &query.circle,
        query.amount,
    ) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(EligibilityError::UnknownUser(user)) => error_response(
            StatusCode::NOT_FOUND,
            format!("no score record for user {user}"),
        ),
        Err(EligibilityError::Store(err)) => store_error_response(err),
    }
}

pub(crate) async fn start_recovery_handler<S, P>(
    State(service): State<Arc<ScoreService<S, P>>>,
    Path(user_id): Path<String>,
    axum::Json(body): axum::Json<RecoveryStartBody>,
) -> Response
where
    S: ScoreStore + 'static,
    P: ScoreEventPublisher + 'static,
{
    match service
        .recovery()
        .start_recovery(&UserId(user_id), &body.trigger, Utc::now())
    {
        Ok(period) => (StatusCode::CREATED, axum::Json(period)).into_response(),
        Err(RecoveryError::Store(err)) => store_error_response(err),
        Err(err) => error_response(StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
    }
}

pub(crate) async fn end_recovery_handler<S, P>(
    State(service): State<Arc<ScoreService<S, P>>>,
    Path(user_id): Path<String>,
) -> Response
where
    S: ScoreStore + 'static,
    P: ScoreEventPublisher + 'static,
{
    match service.recovery().end_recovery(&UserId(user_id), Utc::now()) {
        Ok(()) => (StatusCode::OK, axum::Json(json!({ "status": "ended" }))).into_response(),
        Err(RecoveryError::NotActive(user)) => error_response(
            StatusCode::NOT_FOUND,
            format!("no active recovery period for user {user}"),
        ),
        Err(RecoveryError::Store(err)) => store_error_response(err),
    }
}

pub(crate) async fn decay_at_risk_handler<S, P>(
    State(service): State<Arc<ScoreService<S, P>>>,
) -> Response
where
    S: ScoreStore + 'static,
    P: ScoreEventPublisher + 'static,
{
    match service.analytics().decay_at_risk_users(Utc::now()) {
        Ok(entries) => (StatusCode::OK, axum::Json(entries)).into_response(),
        Err(err) => store_error_response(err),
    }
}

pub(crate) async fn tenure_eligible_handler<S, P>(
    State(service): State<Arc<ScoreService<S, P>>>,
) -> Response
where
    S: ScoreStore + 'static,
    P: ScoreEventPublisher + 'static,
{
    match service.analytics().tenure_eligible_users(Utc::now()) {
        Ok(users) => (StatusCode::OK, axum::Json(users)).into_response(),
        Err(err) => store_error_response(err),
    }
}

pub(crate) async fn recovery_active_handler<S, P>(
    State(service): State<Arc<ScoreService<S, P>>>,
) -> Response
where
    S: ScoreStore + 'static,
    P: ScoreEventPublisher + 'static,
{
    match service.analytics().recovery_period_users(Utc::now()) {
        Ok(periods) => (StatusCode::OK, axum::Json(periods)).into_response(),
        Err(err) => store_error_response(err),
    }
}

fn adjustment_error_response(error: AdjustmentError) -> Response {
    let status = match &error {
        AdjustmentError::UnknownUser(_) => StatusCode::NOT_FOUND,
        AdjustmentError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        AdjustmentError::Busy => StatusCode::SERVICE_UNAVAILABLE,
        AdjustmentError::Integrity(_) => StatusCode::INTERNAL_SERVER_ERROR,
        AdjustmentError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
        AdjustmentError::Store(StoreError::Conflict) => StatusCode::CONFLICT,
        AdjustmentError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, error.to_string())
}

fn vouch_error_response(error: VouchError) -> Response {
    match error {
        VouchError::CapacityExceeded {
            used,
            available,
            max,
        } => {
            let payload = json!({
                "error": "vouch capacity exceeded",
                "used": used,
                "available": available,
                "max": max,
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        VouchError::UnknownUser(_) | VouchError::NotFound(_) => {
            error_response(StatusCode::NOT_FOUND, error.to_string())
        }
        VouchError::InvalidState { .. } | VouchError::SelfVouch => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, error.to_string())
        }
        VouchError::Adjustment(err) => adjustment_error_response(err),
        VouchError::Store(err) => store_error_response(err),
    }
}

fn store_error_response(error: StoreError) -> Response {
    let status = match &error {
        StoreError::NotFound => StatusCode::NOT_FOUND,
        StoreError::Conflict | StoreError::VouchOverdrawn { .. } => StatusCode::CONFLICT,
        StoreError::VersionConflict => StatusCode::SERVICE_UNAVAILABLE,
        StoreError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, error.to_string())
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, axum::Json(json!({ "error": message }))).into_response()
}

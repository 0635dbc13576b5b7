use apex_core::predictions::{
    analyze_fraud, estimate_ibnr, predict_cost, predict_readmission, score_member_risk,
    CostPredictionRequest, CostPredictionResult, FraudAnalysisRequest, FraudAnalysisResult,
    IbnrEstimate, IbnrRequest, ReadmissionRequest, ReadmissionResult, RiskScoreRequest,
    RiskScoreResult,
};
use axum::{extract::Query, routing::post, Json, Router};
use chrono::Utc;
use tracing::info;

use crate::bootstrap::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/fraud/analyze", post(fraud_analyze))
        .route("/cost/predict", post(cost_predict))
        .route("/risk/score", post(risk_score))
        .route("/risk/readmission", post(readmission))
        .route("/actuarial/ibnr", post(ibnr))
}

pub async fn fraud_analyze(
    Json(request): Json<FraudAnalysisRequest>,
) -> Json<FraudAnalysisResult> {
    let result = analyze_fraud(&request);
    info!(
        event_name = "api.predictions.fraud_scored",
        correlation_id = request.claim_id.as_deref().unwrap_or("unknown"),
        fraud_score = result.fraud_score,
        flags = result.flags.len(),
        "fraud analysis completed"
    );
    Json(result)
}

pub async fn cost_predict(
    Json(request): Json<CostPredictionRequest>,
) -> Json<CostPredictionResult> {
    Json(predict_cost(&request))
}

pub async fn risk_score(Json(request): Json<RiskScoreRequest>) -> Json<RiskScoreResult> {
    Json(score_member_risk(&request))
}

pub async fn readmission(Json(request): Json<ReadmissionRequest>) -> Json<ReadmissionResult> {
    Json(predict_readmission(&request))
}

pub async fn ibnr(Query(request): Query<IbnrRequest>) -> Json<IbnrEstimate> {
    Json(estimate_ibnr(&request, Utc::now().date_naive()))
}

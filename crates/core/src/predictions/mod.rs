//! Claim and member scoring endpoints.
//!
//! None of these are trained models. Fraud and readmission use fixed threshold
//! heuristics; cost, risk and IBNR return fixed reference figures tagged with a
//! `model_version` so downstream consumers can tell them apart from real scores.

pub mod cost;
pub mod fraud;
pub mod risk;

pub use cost::{
    estimate_ibnr, predict_cost, CostPredictionRequest, CostPredictionResult, IbnrEstimate,
    IbnrRequest,
};
pub use fraud::{analyze_fraud, FraudAnalysisRequest, FraudAnalysisResult, FraudFlag, RiskLevel};
pub use risk::{
    predict_readmission, score_member_risk, ReadmissionRequest, ReadmissionResult,
    RiskScoreRequest, RiskScoreResult,
};

/// Rounds to a fixed number of decimal places for stable wire output.
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const COST_MODEL_VERSION: &str = "apex-cost-v1.0";
pub const IBNR_MODEL_VERSION: &str = "apex-ibnr-v1.0";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostPredictionRequest {
    pub member_id: String,
    pub diagnosis_codes: Vec<String>,
    pub procedure_code: String,
    pub provider_npi: String,
    pub place_of_service: String,
    pub organization_id: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostPredictionResult {
    pub predicted_allowed_amount: f64,
    pub confidence_interval: ConfidenceInterval,
    pub percentile_25: f64,
    pub percentile_50: f64,
    pub percentile_75: f64,
    pub comparable_claims_count: u32,
    pub factors: Vec<Value>,
    pub model_version: String,
}

pub fn predict_cost(_request: &CostPredictionRequest) -> CostPredictionResult {
    CostPredictionResult {
        predicted_allowed_amount: 1250.0,
        confidence_interval: ConfidenceInterval { lower: 950.0, upper: 1550.0 },
        percentile_25: 875.0,
        percentile_50: 1200.0,
        percentile_75: 1600.0,
        comparable_claims_count: 1243,
        factors: vec![
            json!({"factor": "geographic_area", "impact": "+12%"}),
            json!({"factor": "provider_specialty", "impact": "-3%"}),
            json!({"factor": "diagnosis_complexity", "impact": "+8%"}),
        ],
        model_version: COST_MODEL_VERSION.to_string(),
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IbnrRequest {
    #[serde(default)]
    pub organization_id: String,
    #[serde(default)]
    pub as_of_date: String,
    #[serde(default = "default_line_of_business")]
    pub line_of_business: String,
}

fn default_line_of_business() -> String {
    "all".to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IbnrEstimate {
    pub as_of_date: String,
    pub line_of_business: String,
    pub estimates: Value,
    pub development_factors: Vec<Value>,
    pub model_version: String,
}

/// Chain-ladder and Bornhuetter-Ferguson reference estimates. A blank
/// `as_of_date` resolves to `today`.
pub fn estimate_ibnr(request: &IbnrRequest, today: NaiveDate) -> IbnrEstimate {
    let as_of_date = if request.as_of_date.trim().is_empty() {
        today.format("%Y-%m-%d").to_string()
    } else {
        request.as_of_date.clone()
    };

    IbnrEstimate {
        as_of_date,
        line_of_business: request.line_of_business.clone(),
        estimates: json!({
            "chain_ladder": {
                "ibnr_estimate": 2_450_000.0,
                "confidence_interval": {"lower": 2_100_000.0, "upper": 2_800_000.0},
            },
            "bornhuetter_ferguson": {
                "ibnr_estimate": 2_380_000.0,
                "confidence_interval": {"lower": 2_050_000.0, "upper": 2_710_000.0},
            },
            "selected": {
                "ibnr_estimate": 2_415_000.0,
                "method": "weighted_average",
            },
        }),
        development_factors: [(1, 1.85), (2, 1.42), (3, 1.18), (6, 1.05), (12, 1.01)]
            .into_iter()
            .map(|(month, factor)| json!({"month": month, "factor": factor}))
            .collect(),
        model_version: IBNR_MODEL_VERSION.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{estimate_ibnr, IbnrRequest};

    #[test]
    fn blank_as_of_date_uses_today() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 31).expect("valid date");
        let estimate = estimate_ibnr(
            &IbnrRequest { line_of_business: "all".to_string(), ..IbnrRequest::default() },
            today,
        );

        assert_eq!(estimate.as_of_date, "2024-03-31");
        assert_eq!(estimate.development_factors.len(), 5);
        assert_eq!(estimate.estimates["selected"]["method"], "weighted_average");
    }

    #[test]
    fn explicit_as_of_date_is_kept() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 31).expect("valid date");
        let estimate = estimate_ibnr(
            &IbnrRequest {
                organization_id: "org-1".to_string(),
                as_of_date: "2023-12-31".to_string(),
                line_of_business: "medicare".to_string(),
            },
            today,
        );

        assert_eq!(estimate.as_of_date, "2023-12-31");
        assert_eq!(estimate.line_of_business, "medicare");
    }
}

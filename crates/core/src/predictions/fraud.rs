use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::round_to;

pub const FRAUD_MODEL_VERSION: &str = "apex-fwa-v1.0";

const HIGH_CHARGE_THRESHOLD: f64 = 50_000.0;
const HIGH_UNITS_THRESHOLD: u32 = 10;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FraudAnalysisRequest {
    pub claim_id: Option<String>,
    pub provider_npi: String,
    pub member_id: String,
    pub diagnosis_codes: Vec<String>,
    pub procedure_codes: Vec<String>,
    pub charged_amount: f64,
    pub service_date: String,
    pub place_of_service: String,
    #[serde(default = "default_billed_units")]
    pub billed_units: u32,
    pub organization_id: String,
}

fn default_billed_units() -> u32 {
    1
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FraudFlag {
    #[serde(rename = "type")]
    pub flag_type: String,
    pub description: String,
    pub severity: String,
    pub score_impact: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FraudAnalysisResult {
    pub claim_id: Option<String>,
    pub fraud_score: f64,
    pub risk_level: RiskLevel,
    pub flags: Vec<FraudFlag>,
    pub recommendation: String,
    pub similar_flagged_claims: u32,
    pub model_version: String,
    pub processing_time_ms: u64,
}

pub fn analyze_fraud(request: &FraudAnalysisRequest) -> FraudAnalysisResult {
    let started = Instant::now();
    let mut flags = Vec::new();

    if request.charged_amount > HIGH_CHARGE_THRESHOLD {
        flags.push(FraudFlag {
            flag_type: "high_charge".to_string(),
            description: format!(
                "Charge amount ${} exceeds $50,000 threshold",
                format_usd(request.charged_amount)
            ),
            severity: "medium".to_string(),
            score_impact: 0.15,
        });
    }

    if request.billed_units > HIGH_UNITS_THRESHOLD {
        flags.push(FraudFlag {
            flag_type: "high_units".to_string(),
            description: format!("Billed {} units - above typical range", request.billed_units),
            severity: "low".to_string(),
            score_impact: 0.1,
        });
    }

    let raw_score: f64 = flags.iter().map(|flag| flag.score_impact).sum();
    let fraud_score = round_to(raw_score.min(1.0), 4);
    let (risk_level, recommendation) = classify(fraud_score);

    FraudAnalysisResult {
        claim_id: request.claim_id.clone(),
        fraud_score,
        risk_level,
        flags,
        recommendation: recommendation.to_string(),
        similar_flagged_claims: 0,
        model_version: FRAUD_MODEL_VERSION.to_string(),
        processing_time_ms: started.elapsed().as_millis() as u64,
    }
}

/// `62000.5` -> `62,000.50`
fn format_usd(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{cents}")
}

fn classify(score: f64) -> (RiskLevel, &'static str) {
    if score >= 0.7 {
        (RiskLevel::Critical, "Flag for Special Investigation Unit (SIU) review immediately")
    } else if score >= 0.5 {
        (RiskLevel::High, "Route to claims supervisor for detailed review")
    } else if score >= 0.3 {
        (RiskLevel::Medium, "Flag for routine audit during next review cycle")
    } else {
        (
            RiskLevel::Low,
            "No significant fraud indicators detected. Proceed with standard processing.",
        )
    }
}

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::round_to;

pub const RISK_MODEL_VERSION: &str = "apex-risk-v1.0";
pub const READMISSION_MODEL_VERSION: &str = "apex-readmit-v1.0";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskScoreRequest {
    pub member_id: String,
    pub organization_id: String,
    pub demographics: Option<Value>,
    pub diagnosis_history: Option<Vec<String>>,
    pub medication_history: Option<Vec<String>>,
    pub utilization_history: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskScoreResult {
    pub member_id: String,
    pub overall_risk_score: f64,
    pub risk_level: String,
    pub hcc_codes: Vec<Value>,
    pub raf_score: f64,
    pub projected_annual_cost: f64,
    pub risk_factors: Vec<Value>,
    pub care_recommendations: Vec<String>,
    pub model_version: String,
}

/// Reference member risk profile. The inputs are accepted but not yet scored.
pub fn score_member_risk(request: &RiskScoreRequest) -> RiskScoreResult {
    RiskScoreResult {
        member_id: request.member_id.clone(),
        overall_risk_score: 4.2,
        risk_level: "moderate".to_string(),
        hcc_codes: vec![
            json!({"code": "HCC19", "description": "Diabetes without complication", "coefficient": 0.105}),
            json!({"code": "HCC85", "description": "Congestive heart failure", "coefficient": 0.331}),
        ],
        raf_score: 1.436,
        projected_annual_cost: 18_500.0,
        risk_factors: vec![
            json!({"factor": "Age 65+", "impact": "high"}),
            json!({"factor": "Multiple chronic conditions", "impact": "high"}),
            json!({"factor": "Recent ED visit", "impact": "medium"}),
        ],
        care_recommendations: vec![
            "Enroll in chronic disease management program".to_string(),
            "Schedule quarterly HbA1c monitoring".to_string(),
            "Ensure annual wellness visit compliance".to_string(),
            "Review medication adherence".to_string(),
        ],
        model_version: RISK_MODEL_VERSION.to_string(),
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReadmissionRequest {
    pub member_id: String,
    pub admission_diagnosis: String,
    pub length_of_stay: u32,
    pub discharge_disposition: String,
    #[serde(default)]
    pub comorbidities: Vec<String>,
    pub age: u32,
    pub organization_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContributingFactor {
    pub factor: String,
    pub value: u32,
    pub impact: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReadmissionResult {
    pub member_id: String,
    pub readmission_risk: f64,
    pub risk_level: String,
    pub contributing_factors: Vec<ContributingFactor>,
    pub interventions_recommended: Vec<String>,
    pub model_version: String,
}

pub fn predict_readmission(request: &ReadmissionRequest) -> ReadmissionResult {
    let long_stay = request.length_of_stay > 7;
    let elderly = request.age > 75;
    let comorbidity_count = request.comorbidities.len() as u32;
    let multimorbid = comorbidity_count > 3;

    let mut risk = 0.1;
    if long_stay {
        risk += 0.1;
    }
    if elderly {
        risk += 0.08;
    }
    if multimorbid {
        risk += 0.12;
    }
    let risk = round_to(f64::min(risk, 0.95), 3);

    let risk_level = if risk > 0.3 {
        "high"
    } else if risk > 0.15 {
        "medium"
    } else {
        "low"
    };

    let impact = |flagged: bool| (if flagged { "high" } else { "low" }).to_string();

    ReadmissionResult {
        member_id: request.member_id.clone(),
        readmission_risk: risk,
        risk_level: risk_level.to_string(),
        contributing_factors: vec![
            ContributingFactor {
                factor: "length_of_stay".to_string(),
                value: request.length_of_stay,
                impact: impact(long_stay),
            },
            ContributingFactor { factor: "age".to_string(), value: request.age, impact: impact(elderly) },
            ContributingFactor {
                factor: "comorbidity_count".to_string(),
                value: comorbidity_count,
                impact: impact(multimorbid),
            },
        ],
        interventions_recommended: vec![
            "Schedule follow-up appointment within 7 days".to_string(),
            "Medication reconciliation at discharge".to_string(),
            "Home health nursing referral".to_string(),
            "Care manager outreach within 48 hours".to_string(),
        ],
        model_version: READMISSION_MODEL_VERSION.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{predict_readmission, score_member_risk, ReadmissionRequest, RiskScoreRequest};

    fn admission(length_of_stay: u32, age: u32, comorbidities: usize) -> ReadmissionRequest {
        ReadmissionRequest {
            member_id: "MBR-7".to_string(),
            admission_diagnosis: "I50.9".to_string(),
            length_of_stay,
            discharge_disposition: "home".to_string(),
            comorbidities: (0..comorbidities).map(|index| format!("DX-{index}")).collect(),
            age,
            organization_id: "org-1".to_string(),
        }
    }

    #[test]
    fn baseline_admission_is_low_risk() {
        let result = predict_readmission(&admission(3, 50, 1));

        assert_eq!(result.readmission_risk, 0.1);
        assert_eq!(result.risk_level, "low");
        assert!(result.contributing_factors.iter().all(|factor| factor.impact == "low"));
    }

    #[test]
    fn long_stay_pushes_into_medium_band() {
        let result = predict_readmission(&admission(8, 50, 0));

        assert_eq!(result.readmission_risk, 0.2);
        assert_eq!(result.risk_level, "medium");
    }

    #[test]
    fn all_factors_accumulate_into_high_band() {
        let result = predict_readmission(&admission(10, 80, 4));

        assert_eq!(result.readmission_risk, 0.4);
        assert_eq!(result.risk_level, "high");
        assert_eq!(result.contributing_factors[2].value, 4);
        assert_eq!(result.model_version, "apex-readmit-v1.0");
    }

    #[test]
    fn risk_score_echoes_member() {
        let result = score_member_risk(&RiskScoreRequest {
            member_id: "MBR-9".to_string(),
            organization_id: "org-1".to_string(),
            demographics: None,
            diagnosis_history: None,
            medication_history: None,
            utilization_history: None,
        });

        assert_eq!(result.member_id, "MBR-9");
        assert_eq!(result.hcc_codes.len(), 2);
        assert_eq!(result.raf_score, 1.436);
    }
}

//! Backend stand-ins the agents can call.
//!
//! Every tool here answers with a canned payload shaped like the corresponding
//! backend service. Arguments are read field by field: a missing, null or
//! non-scalar field falls back to its default without affecting the others.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::llm::ToolSpec;

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// JSON schema of the argument object, as advertised to the model.
    fn parameters(&self) -> Value;
    async fn execute(&self, input: Value) -> Result<Value>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Reads `key` from the argument object. Numbers and booleans keep their text
/// form so `94107` and `"94107"` read the same.
fn string_arg_or(input: &Value, key: &str, default: &str) -> String {
    match input.get(key) {
        Some(Value::String(value)) => value.clone(),
        Some(Value::Number(value)) => value.to_string(),
        Some(Value::Bool(value)) => value.to_string(),
        _ => default.to_string(),
    }
}

fn string_arg(input: &Value, key: &str) -> String {
    string_arg_or(input, key, "")
}

fn string_schema(required: &[&str], properties: &[(&str, &str)]) -> Value {
    let properties = properties
        .iter()
        .map(|(name, description)| {
            (name.to_string(), json!({ "type": "string", "description": description }))
        })
        .collect::<serde_json::Map<_, _>>();
    json!({ "type": "object", "properties": properties, "required": required })
}

#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<&'static str, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// All eight healthcare tools.
    pub fn standard() -> Self {
        let mut registry = Self::default();
        registry.register(CheckMemberEligibility);
        registry.register(LookupClaimStatus);
        registry.register(SearchProviders);
        registry.register(CheckPriorAuthStatus);
        registry.register(SuggestIcd10Codes);
        registry.register(SuggestCptCodes);
        registry.register(AnalyzeClaimForFraud);
        registry.register(EstimateMemberCost);
        registry
    }

    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name(), Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

pub struct CheckMemberEligibility;

#[async_trait]
impl Tool for CheckMemberEligibility {
    fn name(&self) -> &'static str {
        "check_member_eligibility"
    }

    fn description(&self) -> &'static str {
        "Check if a member is eligible for coverage on a given date. Returns eligibility status, plan info, and benefit details."
    }

    fn parameters(&self) -> Value {
        string_schema(
            &["member_id"],
            &[
                ("member_id", "Member identifier"),
                ("service_date", "Date of service (YYYY-MM-DD), optional"),
            ],
        )
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        Ok(json!({
            "eligible": true,
            "member_id": string_arg(&input, "member_id"),
            "service_date": string_arg(&input, "service_date"),
            "plan": "Blue PPO Gold",
            "status": "active",
            "effective_date": "2024-01-01",
            "deductible_remaining": 850.00,
            "oop_remaining": 4200.00,
            "note": "Integration point: eligibility verification service",
        }))
    }
}

pub struct LookupClaimStatus;

#[async_trait]
impl Tool for LookupClaimStatus {
    fn name(&self) -> &'static str {
        "lookup_claim_status"
    }

    fn description(&self) -> &'static str {
        "Look up the current status of a claim by claim number. Returns claim status, dates, amounts, and processing notes."
    }

    fn parameters(&self) -> Value {
        string_schema(&["claim_number"], &[("claim_number", "Claim number, e.g. CLM-2024-000001")])
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        Ok(json!({
            "claim_number": string_arg(&input, "claim_number"),
            "status": "in_review",
            "received_date": "2024-01-15",
            "total_charged": 1250.00,
            "note": "Integration point: claims service",
        }))
    }
}

pub struct SearchProviders;

#[async_trait]
impl Tool for SearchProviders {
    fn name(&self) -> &'static str {
        "search_providers"
    }

    fn description(&self) -> &'static str {
        "Search for healthcare providers by specialty and location. Returns matching providers with availability and ratings."
    }

    fn parameters(&self) -> Value {
        string_schema(
            &["specialty"],
            &[
                ("specialty", "Provider specialty"),
                ("zip_code", "ZIP code to search near, optional"),
                ("network", "Network filter, defaults to in_network"),
            ],
        )
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        Ok(json!([{
            "name": "Dr. Sarah Johnson",
            "specialty": string_arg(&input, "specialty"),
            "zip_code": string_arg(&input, "zip_code"),
            "network": string_arg_or(&input, "network", "in_network"),
            "accepting_new_patients": true,
            "rating": 4.8,
            "note": "Integration point: provider directory",
        }]))
    }
}

pub struct CheckPriorAuthStatus;

#[async_trait]
impl Tool for CheckPriorAuthStatus {
    fn name(&self) -> &'static str {
        "check_prior_auth_status"
    }

    fn description(&self) -> &'static str {
        "Check the status of a prior authorization request."
    }

    fn parameters(&self) -> Value {
        string_schema(&["auth_number"], &[("auth_number", "Prior authorization number")])
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        Ok(json!({
            "auth_number": string_arg(&input, "auth_number"),
            "status": "approved",
            "approved_units": 10,
            "expiration_date": "2024-06-30",
            "note": "Integration point: prior authorization service",
        }))
    }
}

pub struct SuggestIcd10Codes;

#[async_trait]
impl Tool for SuggestIcd10Codes {
    fn name(&self) -> &'static str {
        "suggest_icd10_codes"
    }

    fn description(&self) -> &'static str {
        "Suggest ICD-10 diagnosis codes based on a clinical description."
    }

    fn parameters(&self) -> Value {
        string_schema(
            &["clinical_description"],
            &[("clinical_description", "Symptoms or conditions to code")],
        )
    }

    async fn execute(&self, _input: Value) -> Result<Value> {
        Ok(json!([
            {"code": "M54.5", "description": "Low back pain", "confidence": 0.95},
            {"code": "M54.2", "description": "Cervicalgia", "confidence": 0.72},
            {"code": "G89.29", "description": "Other chronic pain", "confidence": 0.65},
        ]))
    }
}

pub struct SuggestCptCodes;

#[async_trait]
impl Tool for SuggestCptCodes {
    fn name(&self) -> &'static str {
        "suggest_cpt_codes"
    }

    fn description(&self) -> &'static str {
        "Suggest CPT procedure codes based on a procedure description."
    }

    fn parameters(&self) -> Value {
        string_schema(
            &["procedure_description"],
            &[("procedure_description", "Procedure performed")],
        )
    }

    async fn execute(&self, _input: Value) -> Result<Value> {
        Ok(json!([
            {"code": "99213", "description": "Office visit, established patient, low complexity", "confidence": 0.90},
            {"code": "99214", "description": "Office visit, established patient, moderate complexity", "confidence": 0.75},
        ]))
    }
}

pub struct AnalyzeClaimForFraud;

#[async_trait]
impl Tool for AnalyzeClaimForFraud {
    fn name(&self) -> &'static str {
        "analyze_claim_for_fraud"
    }

    fn description(&self) -> &'static str {
        "Analyze a claim for potential fraud indicators such as upcoding or unbundling."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "claim_data": { "type": "object", "description": "Claim fields to analyze" },
            },
            "required": ["claim_data"],
        })
    }

    async fn execute(&self, _input: Value) -> Result<Value> {
        Ok(json!({
            "fraud_risk": "low",
            "score": 0.12,
            "flags": [],
            "recommendation": "No fraud indicators detected",
            "note": "Integration point: fraud scoring model",
        }))
    }
}

pub struct EstimateMemberCost;

#[async_trait]
impl Tool for EstimateMemberCost {
    fn name(&self) -> &'static str {
        "estimate_member_cost"
    }

    fn description(&self) -> &'static str {
        "Estimate out-of-pocket cost for a member for a given procedure."
    }

    fn parameters(&self) -> Value {
        string_schema(
            &["procedure_code", "member_id"],
            &[("procedure_code", "CPT/HCPCS code"), ("member_id", "Member identifier")],
        )
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        Ok(json!({
            "procedure_code": string_arg(&input, "procedure_code"),
            "member_id": string_arg(&input, "member_id"),
            "estimated_total": 1500.00,
            "estimated_member_cost": 375.00,
            "breakdown": {
                "deductible_applies": 250.00,
                "copay": 25.00,
                "coinsurance": 100.00,
            },
            "note": "Integration point: cost estimator service",
        }))
    }
}

//! Healthcare document catalog and extraction results.
//!
//! Extraction is simulated: every analysis reports one field per schema entry.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::errors::DomainError;

pub const DEFAULT_DOCUMENT_TYPE: &str = "cms_1500";
const FIELD_CONFIDENCE: f64 = 0.85;
const PHI_FIELDS: [&str; 5] = ["patient_name", "patient_dob", "insured_id", "member_id", "ssn"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DocumentSchema {
    #[serde(skip)]
    pub document_type: &'static str,
    pub name: &'static str,
    pub fields: &'static [&'static str],
}

pub const DOCUMENT_SCHEMAS: [DocumentSchema; 7] = [
    DocumentSchema {
        document_type: "cms_1500",
        name: "CMS-1500 Professional Claim",
        fields: &[
            "patient_name",
            "patient_dob",
            "insured_id",
            "group_number",
            "diagnosis_codes",
            "procedure_codes",
            "charges",
            "provider_npi",
            "place_of_service",
            "date_of_service",
        ],
    },
    DocumentSchema {
        document_type: "ub_04",
        name: "UB-04 Institutional Claim",
        fields: &[
            "patient_name",
            "patient_dob",
            "admission_date",
            "discharge_date",
            "revenue_codes",
            "diagnosis_codes",
            "procedure_codes",
            "charges",
            "provider_npi",
            "facility_name",
        ],
    },
    DocumentSchema {
        document_type: "eob",
        name: "Explanation of Benefits",
        fields: &[
            "patient_name",
            "claim_number",
            "service_date",
            "provider_name",
            "charged_amount",
            "allowed_amount",
            "paid_amount",
            "patient_responsibility",
            "adjustment_codes",
            "check_number",
        ],
    },
    DocumentSchema {
        document_type: "medical_record",
        name: "Medical Record / Clinical Note",
        fields: &[
            "patient_name",
            "date_of_service",
            "provider_name",
            "chief_complaint",
            "assessment",
            "plan",
            "diagnosis_codes",
            "medications",
            "vital_signs",
        ],
    },
    DocumentSchema {
        document_type: "lab_result",
        name: "Laboratory Results",
        fields: &[
            "patient_name",
            "order_date",
            "result_date",
            "ordering_provider",
            "test_name",
            "result_value",
            "reference_range",
            "abnormal_flag",
        ],
    },
    DocumentSchema {
        document_type: "prior_auth_form",
        name: "Prior Authorization Request Form",
        fields: &[
            "patient_name",
            "member_id",
            "diagnosis_codes",
            "procedure_codes",
            "requesting_provider",
            "clinical_notes",
            "urgency",
        ],
    },
    DocumentSchema {
        document_type: "id_card",
        name: "Insurance ID Card",
        fields: &[
            "member_name",
            "member_id",
            "group_number",
            "plan_name",
            "payer_name",
            "copay_amounts",
            "effective_date",
        ],
    },
];

pub fn schema_for(document_type: &str) -> Option<&'static DocumentSchema> {
    DOCUMENT_SCHEMAS.iter().find(|schema| schema.document_type == document_type)
}

/// Unknown or missing hints resolve to the CMS-1500 schema.
pub fn resolve_schema(hint: Option<&str>) -> &'static DocumentSchema {
    hint.and_then(schema_for).unwrap_or(&DOCUMENT_SCHEMAS[0])
}

pub fn schemas_document() -> Value {
    let schemas = DOCUMENT_SCHEMAS
        .iter()
        .map(|schema| (schema.document_type.to_string(), json!(schema)))
        .collect::<serde_json::Map<_, _>>();
    json!({ "schemas": schemas })
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DocumentClassification {
    pub category: String,
    pub confidence: f64,
    pub subcategory: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExtractedField {
    pub field_name: String,
    pub value: String,
    pub confidence: f64,
    pub bounding_box: Option<Value>,
    pub page_number: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DocumentAnalysisResult {
    pub document_id: String,
    pub classification: DocumentClassification,
    pub extracted_fields: Vec<ExtractedField>,
    pub ocr_text: String,
    pub page_count: u32,
    pub processing_time_ms: u64,
    pub contains_phi: bool,
    pub phi_fields: Vec<String>,
    pub suggested_actions: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct UploadedDocument<'a> {
    pub filename: &'a str,
    pub size_bytes: usize,
    pub document_type_hint: Option<&'a str>,
}

fn suggested_actions(document_type: &str) -> Vec<String> {
    let actions: &[&str] = match document_type {
        "cms_1500" => &[
            "Create professional claim from extracted data",
            "Verify member eligibility",
            "Check prior authorization requirements",
        ],
        "eob" => &[
            "Reconcile with existing claim",
            "Update payment records",
            "Generate member statement",
        ],
        "prior_auth_form" => &[
            "Create prior authorization request",
            "Check clinical criteria",
            "Route to medical director review",
        ],
        _ => &[],
    };
    actions.iter().map(|action| action.to_string()).collect()
}

pub fn analyze_document(
    upload: &UploadedDocument<'_>,
    now: DateTime<Utc>,
) -> Result<DocumentAnalysisResult, DomainError> {
    if upload.filename.trim().is_empty() {
        return Err(DomainError::MissingInput("file".to_string()));
    }

    let schema = resolve_schema(upload.document_type_hint);
    let extracted_fields = schema
        .fields
        .iter()
        .map(|field| ExtractedField {
            field_name: field.to_string(),
            value: format!("[Extracted from {}]", upload.filename),
            confidence: FIELD_CONFIDENCE,
            bounding_box: None,
            page_number: 1,
        })
        .collect();
    let phi_fields = schema
        .fields
        .iter()
        .filter(|field| PHI_FIELDS.contains(field))
        .map(|field| field.to_string())
        .collect::<Vec<_>>();

    Ok(DocumentAnalysisResult {
        document_id: format!("doc-{}", now.format("%Y%m%d%H%M%S")),
        classification: DocumentClassification {
            category: schema.document_type.to_string(),
            confidence: 0.92,
            subcategory: Some(schema.name.to_string()),
        },
        extracted_fields,
        ocr_text: format!(
            "[OCR text extracted from {} - {} bytes]",
            upload.filename, upload.size_bytes
        ),
        page_count: 1,
        processing_time_ms: 0,
        contains_phi: !phi_fields.is_empty(),
        phi_fields,
        suggested_actions: suggested_actions(schema.document_type),
    })
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Cms1500Extraction {
    pub patient_name: Option<String>,
    pub patient_dob: Option<String>,
    pub patient_gender: Option<String>,
    pub patient_address: Option<String>,
    pub insured_name: Option<String>,
    pub insured_id: Option<String>,
    pub group_number: Option<String>,
    pub payer_name: Option<String>,
    pub payer_id: Option<String>,
    pub referring_provider: Option<String>,
    pub referring_npi: Option<String>,
    pub billing_provider: Option<String>,
    pub billing_npi: Option<String>,
    pub billing_tax_id: Option<String>,
    pub facility_name: Option<String>,
    pub diagnosis_codes: Vec<String>,
    pub service_lines: Vec<Value>,
    pub total_charge: Option<f64>,
    pub patient_signature: bool,
    pub provider_signature: bool,
    pub date_of_service: Option<String>,
    pub place_of_service: Option<String>,
}

pub fn extract_cms1500() -> Cms1500Extraction {
    let extracted = Some("[Extracted from form]".to_string());
    Cms1500Extraction {
        patient_name: extracted.clone(),
        patient_dob: extracted.clone(),
        insured_id: extracted,
        diagnosis_codes: vec!["M54.5".to_string(), "G89.29".to_string()],
        service_lines: vec![json!({
            "procedure_code": "99213",
            "modifier": "",
            "diagnosis_pointer": "1",
            "charges": 150.00,
            "units": 1,
            "date_of_service": "2024-01-15",
        })],
        total_charge: Some(150.00),
        ..Cms1500Extraction::default()
    }
}

pub fn classify_document() -> Value {
    json!({
        "classification": DEFAULT_DOCUMENT_TYPE,
        "confidence": 0.94,
        "alternatives": [
            {"category": "medical_record", "confidence": 0.04},
            {"category": "other", "confidence": 0.02},
        ],
    })
}

pub fn suggest_codes(clinical_text: &str) -> Result<Value, DomainError> {
    if clinical_text.trim().is_empty() {
        return Err(DomainError::MissingInput("clinical_text".to_string()));
    }

    Ok(json!({
        "icd10_suggestions": [
            {"code": "M54.5", "description": "Low back pain", "confidence": 0.95},
            {"code": "M54.2", "description": "Cervicalgia", "confidence": 0.72},
        ],
        "cpt_suggestions": [
            {"code": "99213", "description": "Office visit, established, low", "confidence": 0.88},
            {"code": "97110", "description": "Therapeutic exercises", "confidence": 0.65},
        ],
        "clinical_notes": "Based on documented symptoms and examination findings.",
    }))
}

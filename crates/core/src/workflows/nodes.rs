use serde::Serialize;
use serde_json::{json, Map, Value};

/// A workflow step that needs model-backed processing.
///
/// Handlers receive the node's static configuration and the data flowing into
/// the node, and return the node's output document.
pub trait NodeHandler: Send + Sync {
    fn node_type(&self) -> &'static str;
    fn descriptor(&self) -> NodeTypeDescriptor;
    fn execute(&self, config: &Value, input: &Value) -> Value;
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NodeTypeDescriptor {
    #[serde(rename = "type")]
    pub node_type: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    pub config_schema: Value,
}

fn descriptor(
    node_type: &'static str,
    name: &'static str,
    description: &'static str,
    config_schema: Value,
) -> NodeTypeDescriptor {
    NodeTypeDescriptor { node_type, name, description, category: "ai", config_schema }
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

pub struct LlmDecisionNode;

impl NodeHandler for LlmDecisionNode {
    fn node_type(&self) -> &'static str {
        "llm_decision"
    }

    fn descriptor(&self) -> NodeTypeDescriptor {
        descriptor(
            self.node_type(),
            "LLM Decision",
            "Route workflow based on AI analysis of data",
            json!({"prompt": "string", "options": "string[]"}),
        )
    }

    fn execute(&self, config: &Value, _input: &Value) -> Value {
        let prompt =
            str_field(config, "prompt").unwrap_or("Analyze the input and decide the next action.");
        let options = match config.get("options").and_then(Value::as_array) {
            Some(options) => options.iter().filter_map(Value::as_str).collect::<Vec<_>>(),
            None => vec!["approve", "deny", "review"],
        };
        let first = options.first().copied();

        json!({
            "decision": first.unwrap_or("approve"),
            "confidence": 0.87,
            "reasoning": format!("AI analysis of input data based on configured criteria: '{prompt}'"),
            "next_branch": first.unwrap_or("default"),
        })
    }
}

pub struct DocumentExtractionNode;

impl NodeHandler for DocumentExtractionNode {
    fn node_type(&self) -> &'static str {
        "document_extraction"
    }

    fn descriptor(&self) -> NodeTypeDescriptor {
        descriptor(
            self.node_type(),
            "Document Extraction",
            "Extract structured data from documents using OCR + AI",
            json!({"document_type": "string"}),
        )
    }

    fn execute(&self, _config: &Value, input: &Value) -> Value {
        json!({
            "document_id": str_field(input, "document_id").unwrap_or_default(),
            "extracted_fields": {
                "patient_name": "[Extracted]",
                "member_id": "[Extracted]",
                "diagnosis_codes": ["M54.5"],
                "procedure_codes": ["99213"],
            },
            "confidence": 0.91,
            "ocr_quality": "high",
        })
    }
}

pub struct MedicalCodingNode;

impl NodeHandler for MedicalCodingNode {
    fn node_type(&self) -> &'static str {
        "medical_coding_ai"
    }

    fn descriptor(&self) -> NodeTypeDescriptor {
        descriptor(
            self.node_type(),
            "Medical Coding AI",
            "Suggest ICD-10/CPT codes from clinical documentation",
            json!({}),
        )
    }

    fn execute(&self, _config: &Value, _input: &Value) -> Value {
        json!({
            "icd10_codes": [
                {"code": "M54.5", "description": "Low back pain", "confidence": 0.95},
            ],
            "cpt_codes": [
                {"code": "99213", "description": "Office visit, established, low", "confidence": 0.88},
            ],
            "requires_coder_review": true,
            "coding_notes": "AI-suggested codes based on clinical documentation",
        })
    }
}

pub struct FraudDetectorNode;

impl NodeHandler for FraudDetectorNode {
    fn node_type(&self) -> &'static str {
        "fraud_detector"
    }

    fn descriptor(&self) -> NodeTypeDescriptor {
        descriptor(
            self.node_type(),
            "Fraud Detection",
            "Analyze claims for fraud, waste, and abuse indicators",
            json!({"threshold": "number"}),
        )
    }

    fn execute(&self, _config: &Value, _input: &Value) -> Value {
        json!({
            "fraud_score": 0.12,
            "risk_level": "low",
            "flags": [],
            "recommendation": "proceed",
        })
    }
}

pub struct ClinicalReasonerNode;

impl NodeHandler for ClinicalReasonerNode {
    fn node_type(&self) -> &'static str {
        "clinical_reasoner"
    }

    fn descriptor(&self) -> NodeTypeDescriptor {
        descriptor(
            self.node_type(),
            "Clinical Reasoner",
            "Evaluate medical necessity using clinical criteria",
            json!({"criteria_source": "string"}),
        )
    }

    fn execute(&self, _config: &Value, _input: &Value) -> Value {
        json!({
            "medical_necessity": "supported",
            "confidence": 0.82,
            "clinical_rationale": "Procedure is clinically appropriate given documented diagnosis.",
            "guideline_references": ["InterQual 2024", "CMS LCD L35936"],
            "requires_md_review": false,
        })
    }
}

pub struct SentimentAnalysisNode;

impl NodeHandler for SentimentAnalysisNode {
    fn node_type(&self) -> &'static str {
        "sentiment_analysis"
    }

    fn descriptor(&self) -> NodeTypeDescriptor {
        descriptor(
            self.node_type(),
            "Sentiment Analysis",
            "Analyze sentiment in member/provider communications",
            json!({}),
        )
    }

    fn execute(&self, _config: &Value, _input: &Value) -> Value {
        json!({
            "sentiment": "neutral",
            "score": 0.6,
            "urgency": "normal",
            "topics_detected": ["billing_inquiry", "benefit_question"],
            "escalation_recommended": false,
        })
    }
}

pub struct EligibilityCheckNode;

impl NodeHandler for EligibilityCheckNode {
    fn node_type(&self) -> &'static str {
        "eligibility_check"
    }

    fn descriptor(&self) -> NodeTypeDescriptor {
        descriptor(
            self.node_type(),
            "Eligibility Check",
            "Verify member eligibility as a workflow step",
            json!({}),
        )
    }

    fn execute(&self, _config: &Value, input: &Value) -> Value {
        json!({
            "eligible": true,
            "member_id": str_field(input, "member_id").unwrap_or_default(),
            "plan": "PPO Gold",
            "status": "active",
            "deductible_remaining": 850.00,
        })
    }
}

pub struct GeminiAnalyzerNode {
    pub model: String,
}

impl NodeHandler for GeminiAnalyzerNode {
    fn node_type(&self) -> &'static str {
        "gemini_analyzer"
    }

    fn descriptor(&self) -> NodeTypeDescriptor {
        descriptor(
            self.node_type(),
            "Gemini Analyzer",
            "General-purpose AI analysis using Google Gemini",
            json!({"prompt": "string", "temperature": "number"}),
        )
    }

    fn execute(&self, config: &Value, _input: &Value) -> Value {
        let prompt = str_field(config, "prompt").unwrap_or("Analyze the provided data.");
        let mut output = Map::new();
        output.insert("analysis".to_string(), json!(format!("AI analysis based on prompt: '{prompt}'")));
        output.insert("confidence".to_string(), json!(0.85));
        output.insert("model".to_string(), json!(self.model));
        Value::Object(output)
    }
}

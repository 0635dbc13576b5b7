use apex_core::domain::agent::AgentId;
use serde::Serialize;
use tracing::warn;

const CLAIMS_PROMPT: &str = "You are the Apex Health Claims Intelligence Agent.
You help with claims processing, adjudication questions, claim status inquiries,
and coding assistance. You have access to claims data, eligibility verification,
and medical coding tools.

IMPORTANT RULES:
- Never disclose PHI to unauthorized users
- Always verify the user has permission to access requested information
- Flag suspicious patterns for human review
- Cite specific claim numbers and codes in your responses
- If confidence is below 80%, recommend human review
";

const MEMBER_SERVICE_PROMPT: &str = "You are the Apex Health Member Service Agent.
You help members with eligibility questions, claim status, finding providers,
understanding benefits, and estimating costs.

IMPORTANT RULES:
- Use plain, non-technical language
- Always verify member identity before sharing PHI
- Be empathetic and helpful
- Proactively suggest relevant services (preventive care, wellness programs)
- If a request requires human intervention, escalate gracefully
";

const PRIOR_AUTH_PROMPT: &str = "You are the Apex Health Prior Authorization Agent.
You help with prior authorization submissions, status checks, clinical criteria
evaluation, and appeal guidance.

IMPORTANT RULES:
- Apply evidence-based clinical criteria
- Track SLA deadlines (72hrs urgent, 7 days standard)
- Flag cases requiring medical director review
- Document clinical rationale for all decisions
- Ensure CMS-0057-F compliance
";

const CODING_PROMPT: &str = "You are the Apex Health Medical Coding Agent.
You assist with ICD-10 diagnosis coding, CPT/HCPCS procedure coding,
code validation, and coding education.

IMPORTANT RULES:
- Follow official ICD-10-CM and CPT guidelines
- Consider specificity (code to the highest level)
- Flag potential unbundling or upcoding
- Explain code selections with clinical justification
- Reference current coding manuals and guidelines
";

const COMPLIANCE_PROMPT: &str = "You are the Apex Health Compliance Agent.
You help with HIPAA compliance, CMS regulatory requirements, audit preparation,
and policy interpretation.

IMPORTANT RULES:
- Reference specific regulations (45 CFR, CMS rules)
- Provide actionable compliance recommendations
- Flag potential violations immediately
- Track regulatory deadlines and changes
- Document all compliance advice given
";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AgentProfile {
    #[serde(rename = "type")]
    pub agent_id: AgentId,
    pub name: &'static str,
    pub description: &'static str,
    #[serde(skip)]
    pub system_prompt: &'static str,
    #[serde(rename = "tools")]
    pub tool_names: Vec<&'static str>,
    #[serde(skip)]
    pub model_id: String,
}

impl AgentProfile {
    pub fn allows_tool(&self, name: &str) -> bool {
        self.tool_names.iter().any(|tool| *tool == name)
    }
}

/// The five agent profiles. Built once at startup and never mutated.
#[derive(Clone, Debug)]
pub struct AgentCatalog {
    profiles: [AgentProfile; 5],
}

fn slot(agent_id: AgentId) -> usize {
    match agent_id {
        AgentId::Claims => 0,
        AgentId::MemberService => 1,
        AgentId::PriorAuth => 2,
        AgentId::Coding => 3,
        AgentId::Compliance => 4,
    }
}

impl AgentCatalog {
    pub fn standard(model_id: impl Into<String>) -> Self {
        let model_id = model_id.into();
        let profile = |agent_id: AgentId,
                       name: &'static str,
                       description: &'static str,
                       system_prompt: &'static str,
                       tool_names: &[&'static str]| AgentProfile {
            agent_id,
            name,
            description,
            system_prompt,
            tool_names: tool_names.to_vec(),
            model_id: model_id.clone(),
        };

        let profiles = [
            profile(
                AgentId::Claims,
                "Claims Intelligence Agent",
                "Claims processing, adjudication, status inquiries, and payment questions",
                CLAIMS_PROMPT,
                &[
                    "check_member_eligibility",
                    "lookup_claim_status",
                    "suggest_icd10_codes",
                    "suggest_cpt_codes",
                    "analyze_claim_for_fraud",
                ],
            ),
            profile(
                AgentId::MemberService,
                "Member Service Agent",
                "Eligibility checks, benefit questions, provider search, cost estimates",
                MEMBER_SERVICE_PROMPT,
                &[
                    "check_member_eligibility",
                    "lookup_claim_status",
                    "search_providers",
                    "check_prior_auth_status",
                    "estimate_member_cost",
                ],
            ),
            profile(
                AgentId::PriorAuth,
                "Prior Authorization Agent",
                "PA submissions, status checks, clinical criteria, appeals",
                PRIOR_AUTH_PROMPT,
                &[
                    "check_member_eligibility",
                    "check_prior_auth_status",
                    "suggest_icd10_codes",
                    "suggest_cpt_codes",
                ],
            ),
            profile(
                AgentId::Coding,
                "Medical Coding Agent",
                "ICD-10 and CPT/HCPCS code lookup, validation, and suggestions",
                CODING_PROMPT,
                &["suggest_icd10_codes", "suggest_cpt_codes", "lookup_claim_status"],
            ),
            profile(
                AgentId::Compliance,
                "Compliance Agent",
                "HIPAA compliance, CMS regulations, audit support, policy guidance",
                COMPLIANCE_PROMPT,
                &[],
            ),
        ];

        Self { profiles }
    }

    pub fn get(&self, agent_id: AgentId) -> &AgentProfile {
        &self.profiles[slot(agent_id)]
    }

    /// Resolves a caller-supplied label. Unknown labels get the claims profile.
    pub fn lookup(&self, label: &str) -> &AgentProfile {
        match label.parse::<AgentId>() {
            Ok(agent_id) => self.get(agent_id),
            Err(_) => {
                warn!(
                    event_name = "agent.catalog.unknown_agent",
                    agent_type = label,
                    fallback = AgentId::Claims.as_str(),
                    "unknown agent type, using claims profile"
                );
                self.get(AgentId::Claims)
            }
        }
    }

    /// Profiles in routing priority order.
    pub fn profiles(&self) -> impl Iterator<Item = &AgentProfile> {
        self.profiles.iter()
    }
}

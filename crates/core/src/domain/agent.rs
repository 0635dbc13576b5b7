use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// The five specialised agents a chat turn can be routed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentId {
    Claims,
    MemberService,
    PriorAuth,
    Coding,
    Compliance,
}

impl AgentId {
    /// Catalog and listing order. Keyword routing has its own priority order.
    pub const ALL: [AgentId; 5] =
        [Self::Claims, Self::MemberService, Self::PriorAuth, Self::Coding, Self::Compliance];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Claims => "claims",
            Self::MemberService => "member_service",
            Self::PriorAuth => "prior_auth",
            Self::Coding => "coding",
            Self::Compliance => "compliance",
        }
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::MemberService
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentId {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|agent| agent.as_str() == normalized)
            .ok_or(DomainError::UnknownAgent(value.to_string()))
    }
}

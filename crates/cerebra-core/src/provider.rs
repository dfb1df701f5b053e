//! Upstream provider identity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the three upstream LLM providers the gateway proxies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// `api.openai.com`
    OpenAI,
    /// `api.anthropic.com`
    Anthropic,
    /// `generativelanguage.googleapis.com` (Gemini)
    Gemini,
}

impl ProviderKind {
    /// All known providers, in a stable order.
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [Self::OpenAI, Self::Anthropic, Self::Gemini]
    }

    /// The URL path segment used to select this provider, e.g. `/v1/openai/...`.
    #[must_use]
    pub const fn path_segment(self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

impl FromStr for ProviderKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "gemini" => Ok(Self::Gemini),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_path_segment() {
        for provider in ProviderKind::all() {
            assert_eq!(
                provider.path_segment().parse::<ProviderKind>().unwrap(),
                provider
            );
        }
    }

    #[test]
    fn rejects_unknown_provider() {
        assert!("azure".parse::<ProviderKind>().is_err());
    }
}

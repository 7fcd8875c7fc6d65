use std::collections::BTreeSet;

use serde::Serialize;

use crate::descriptor::validate_agent_name;
use crate::error::Result;
use crate::error::SwitchboardError;

/// Keywords (lowercase substrings) that send a request to `target_agent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingRule {
    keywords: Vec<String>,
    target_agent: String,
}

impl RoutingRule {
    /// Build a rule from raw keywords. The target must satisfy the same name
    /// policy as registration, so every valid rule can reach a registrable
    /// agent.
    pub fn new<I, S>(keywords: I, target_agent: impl Into<String>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let target_agent = target_agent.into();
        if let Err(err) = validate_agent_name(&target_agent) {
            return Err(SwitchboardError::invalid_rule(target_agent, err.to_string()));
        }

        let mut seen = BTreeSet::new();
        let mut normalized = Vec::new();
        for raw in keywords {
            let keyword = normalize(&raw.into());
            if keyword.is_empty() {
                return Err(SwitchboardError::invalid_rule(
                    target_agent,
                    "keywords cannot be empty",
                ));
            }
            if !seen.insert(keyword.clone()) {
                return Err(SwitchboardError::invalid_rule(
                    target_agent,
                    format!("duplicate keyword `{keyword}`"),
                ));
            }
            normalized.push(keyword);
        }

        if normalized.is_empty() {
            return Err(SwitchboardError::invalid_rule(
                target_agent,
                "a rule needs at least one keyword",
            ));
        }

        Ok(Self {
            keywords: normalized,
            target_agent,
        })
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn target_agent(&self) -> &str {
        &self.target_agent
    }

    /// `normalized` must already be trimmed and lowercased.
    fn matches(&self, normalized: &str) -> bool {
        self.keywords
            .iter()
            .any(|keyword| normalized.contains(keyword.as_str()))
    }
}

/// Ordered keyword router; the first matching rule wins.
#[derive(Debug, Clone, Default)]
pub struct Router {
    rules: Vec<RoutingRule>,
}

impl Router {
    pub fn new(rules: Vec<RoutingRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[RoutingRule] {
        &self.rules
    }

    /// Select a target agent for free text. Blank input never matches.
    pub fn route(&self, input: &str) -> Option<&str> {
        let normalized = normalize(input);
        if normalized.is_empty() {
            return None;
        }
        self.rules
            .iter()
            .find(|rule| rule.matches(&normalized))
            .map(RoutingRule::target_agent)
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

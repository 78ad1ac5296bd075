//! Mapping of scheduler credentials to an organization (VO) and role.
//!
//! Rules are evaluated in order and the first match wins. When nothing
//! matches, the group name is taken as the VO name with the `NULL` role.

use serde::{Deserialize, Serialize};

/// Role stored when a job carries no organization sub-role.
pub const NULL_ROLE: &str = "NULL";

fn null_role() -> String {
    NULL_ROLE.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRule {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    pub vo: String,
    #[serde(default = "null_role")]
    pub role: String,
}

impl IdentityRule {
    pub fn for_user(user: &str, vo: &str, role: &str) -> Self {
        Self {
            users: vec![user.to_string()],
            groups: Vec::new(),
            vo: vo.to_string(),
            role: role.to_string(),
        }
    }

    pub fn for_group(group: &str, vo: &str, role: &str) -> Self {
        Self {
            users: Vec::new(),
            groups: vec![group.to_string()],
            vo: vo.to_string(),
            role: role.to_string(),
        }
    }

    /// True when `user` is one of the rule's users or `group` one of its groups.
    pub fn matches(&self, user: &str, group: &str) -> bool {
        self.users.iter().any(|candidate| candidate == user)
            || self.groups.iter().any(|candidate| candidate == group)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub vo: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityRuleError {
    #[error("identity rule {index} has no users or groups to match")]
    EmptyMatcher { index: usize },
    #[error("identity rule {index} has an empty vo")]
    EmptyVo { index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityResolver {
    rules: Vec<IdentityRule>,
}

impl IdentityResolver {
    pub fn new(rules: Vec<IdentityRule>) -> Result<Self, IdentityRuleError> {
        for (index, rule) in rules.iter().enumerate() {
            if rule.users.is_empty() && rule.groups.is_empty() {
                return Err(IdentityRuleError::EmptyMatcher { index });
            }
            if rule.vo.is_empty() {
                return Err(IdentityRuleError::EmptyVo { index });
            }
        }
        Ok(Self { rules })
    }

    /// The WLCG site table: ATLAS, CMS and LHCb production/pilot accounts.
    pub fn builtin() -> Self {
        let rules = vec![
            IdentityRule::for_user("atlasprd", "atlas", "production"),
            IdentityRule::for_user("atlasplt", "atlas", "pilot"),
            IdentityRule {
                users: vec!["nordugrid".to_string()],
                groups: vec!["nordugrid".to_string(), "atlas".to_string()],
                vo: "atlas".to_string(),
                role: null_role(),
            },
            IdentityRule::for_group("prdcms", "cms", "production"),
            IdentityRule::for_group("pricms", "cms", "priorityuser"),
            IdentityRule::for_group("cms", "cms", NULL_ROLE),
            IdentityRule::for_user("lhcbprd", "lhcb", "production"),
            IdentityRule::for_group("lhcb", "lhcb", NULL_ROLE),
        ];
        Self { rules }
    }

    pub fn rules(&self) -> &[IdentityRule] {
        &self.rules
    }

    pub fn resolve(&self, user: &str, group: &str) -> Identity {
        match self.rules.iter().find(|rule| rule.matches(user, group)) {
            Some(rule) => Identity {
                vo: rule.vo.clone(),
                role: rule.role.clone(),
            },
            None => Identity {
                vo: group.to_string(),
                role: null_role(),
            },
        }
    }
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::builtin()
    }
}

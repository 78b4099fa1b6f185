use crate::{
    auth::Role,
    error::ConfigError,
    routing::{PrefixList, RouteMatcher},
};

/// AccessRule
///
/// One row of the access table: a path prefix and the roles allowed under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRule {
    pub prefix: String,
    pub roles: Vec<Role>,
}

impl AccessRule {
    pub fn new(prefix: impl Into<String>, roles: &[Role]) -> Self {
        Self {
            prefix: prefix.into(),
            roles: roles.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// AccessPolicy
///
/// Role gate evaluated after authentication. Rules are tried in declaration order and the first
/// prefix that matches decides; a path matching no rule is open to every authenticated role.
///
/// A narrower prefix must be registered before any broader prefix it nests under, otherwise the
/// broader rule shadows it. [`AccessPolicy::shadowed_rules`] reports such rows.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    matcher: PrefixList,
    rules: Vec<AccessRule>,
}

impl AccessPolicy {
    pub fn new(rules: Vec<AccessRule>) -> Result<Self, ConfigError> {
        for (index, rule) in rules.iter().enumerate() {
            if rule.prefix.is_empty() {
                return Err(ConfigError::MalformedRule {
                    index,
                    reason: "empty prefix".to_string(),
                });
            }
            if rule.roles.is_empty() {
                return Err(ConfigError::MalformedRule {
                    index,
                    reason: format!("no roles allowed under {}", rule.prefix),
                });
            }
        }

        let matcher = PrefixList::new(rules.iter().map(|r| r.prefix.clone()));
        Ok(Self { matcher, rules })
    }

    pub fn with_default_rules() -> Self {
        Self {
            matcher: PrefixList::new(
                DEFAULT_RULES.iter().map(|(prefix, _)| prefix.to_string()),
            ),
            rules: DEFAULT_RULES
                .iter()
                .map(|(prefix, roles)| AccessRule::new(*prefix, roles))
                .collect(),
        }
    }

    pub fn rules(&self) -> &[AccessRule] {
        &self.rules
    }

    /// The rule that governs `path`, if any.
    pub fn matching_rule(&self, path: &str) -> Option<&AccessRule> {
        self.matcher
            .first_match(path)
            .and_then(|index| self.rules.get(index))
    }

    pub fn authorize(&self, path: &str, role: Role) -> Decision {
        match self.matching_rule(path) {
            Some(rule) if rule.roles.contains(&role) => Decision::Allow,
            Some(_) => Decision::Deny,
            None => Decision::Allow,
        }
    }

    /// Indices of rules that can never match because an earlier prefix already covers them.
    pub fn shadowed_rules(&self) -> Vec<usize> {
        self.rules
            .iter()
            .enumerate()
            .filter(|(index, rule)| {
                self.rules[..*index]
                    .iter()
                    .any(|earlier| rule.prefix.starts_with(&earlier.prefix))
            })
            .map(|(index, _)| index)
            .collect()
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

const DEFAULT_RULES: &[(&str, &[Role])] = &[
    ("/api/private/admin", &[Role::Admin]),
    ("/api/private/support", &[Role::Support, Role::Admin]),
    (
        "/api/private",
        &[Role::Admin, Role::Support, Role::Client],
    ),
];

use crate::actions::{CATEGORY_COMPILER, DEFAULT_PROFILE, DiscoveredAction};
use crate::codemodel::BuiltinKind;
use crate::error::{Result, ToolError};
use serde::{Deserialize, Serialize};

/// Diagnostic IDs whose compiler fixes are applied without review.
pub const ALLOWLISTED_DIAGNOSTICS: &[&str] = &["CS0168", "CS0219", "CS8019"];

/// The only profile cleanup accepts.
pub const CLEANUP_PROFILE: &str = "balanced";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyOutcome {
    Allow,
    ReviewRequired,
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub decision: PolicyOutcome,
    pub reason_code: String,
    pub message: String,
    pub profile: String,
}

impl PolicyDecision {
    fn new(decision: PolicyOutcome, reason_code: &str, message: String, profile: &str) -> Self {
        Self {
            decision,
            reason_code: reason_code.to_string(),
            message,
            profile: profile.to_string(),
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.decision == PolicyOutcome::Allow
    }
}

/// Decision for one action under `profile`. Pure; never cached.
pub fn evaluate(action: &DiscoveredAction, profile: &str) -> PolicyDecision {
    if profile != DEFAULT_PROFILE {
        return PolicyDecision::new(
            PolicyOutcome::Block,
            "unknown_profile",
            format!("unknown policy profile '{profile}'"),
            profile,
        );
    }
    if action.provider_key == BuiltinKind::UseInferredType.as_str() {
        return PolicyDecision::new(
            PolicyOutcome::ReviewRequired,
            "review_required",
            "rewriting an explicit type to 'var' needs review".to_string(),
            profile,
        );
    }
    if let Some(id) = action.diagnostic_id.as_deref() {
        if ALLOWLISTED_DIAGNOSTICS.contains(&id) && action.category == CATEGORY_COMPILER {
            return PolicyDecision::new(
                PolicyOutcome::Allow,
                "allowlisted",
                format!("fix for {id} is allowlisted"),
                profile,
            );
        }
    }
    PolicyDecision::new(
        PolicyOutcome::Block,
        "not_allowlisted",
        format!(
            "{} action '{}' is not allowlisted under profile '{profile}'",
            action.category, action.provider_key
        ),
        profile,
    )
}

/// Cleanup has one fixed policy; anything else is bad input.
pub fn validate_cleanup_profile(profile: &str) -> Result<()> {
    if profile == CLEANUP_PROFILE {
        Ok(())
    } else {
        Err(ToolError::invalid_input(format!(
            "unsupported cleanup policy profile '{profile}', expected '{CLEANUP_PROFILE}'"
        )))
    }
}

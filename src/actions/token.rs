//! Opaque action and fix tokens.
//!
//! Action token, 13 `|`-separated fields:
//!
//! ```text
//! v1|version|profile|origin|category|provider_key|start|length|path|diagnostic|refactoring|line|column
//! ```
//!
//! Free-text fields are standard base64 of their UTF-8 bytes, so `|` inside a
//! path or title cannot break the split. An empty optional field decodes to
//! `None`. Fix tokens use the narrower 7-field form
//! `v1|version|operation|diagnostic|start|length|path` with only the path
//! encoded.

use crate::actions::{ActionOrigin, DiscoveredAction};
use crate::codemodel::BuiltinKind;
use crate::error::{Result, ToolError};
use crate::workspace::{TextSpan, WorkspaceVersion};
use base64::{Engine as _, engine::general_purpose::STANDARD};

const MARKER: &str = "v1";
const SEPARATOR: char = '|';
const ACTION_FIELDS: usize = 13;
const FIX_FIELDS: usize = 7;

fn b64(value: &str) -> String {
    STANDARD.encode(value.as_bytes())
}

fn unb64(value: &str) -> Option<String> {
    let bytes = STANDARD.decode(value).ok()?;
    String::from_utf8(bytes).ok()
}

fn unb64_opt(value: &str) -> Option<Option<String>> {
    let decoded = unb64(value)?;
    Some(if decoded.is_empty() { None } else { Some(decoded) })
}

/// Which rule produced an action, precise enough to ask the same rule for
/// its candidates again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderKey {
    /// `cf|provider|diagnostic|equivalence_key|title`
    CodeFix {
        provider: String,
        diagnostic_id: String,
        equivalence_key: String,
        title: String,
    },
    /// `rf|provider|equivalence_key|title`
    Refactoring {
        provider: String,
        equivalence_key: String,
        title: String,
    },
    Builtin(BuiltinKind),
}

impl ProviderKey {
    pub fn encode(&self) -> String {
        match self {
            ProviderKey::CodeFix {
                provider,
                diagnostic_id,
                equivalence_key,
                title,
            } => format!(
                "cf|{}|{}|{}|{}",
                b64(provider),
                b64(diagnostic_id),
                b64(equivalence_key),
                b64(title)
            ),
            ProviderKey::Refactoring {
                provider,
                equivalence_key,
                title,
            } => format!(
                "rf|{}|{}|{}",
                b64(provider),
                b64(equivalence_key),
                b64(title)
            ),
            ProviderKey::Builtin(kind) => kind.as_str().to_string(),
        }
    }

    pub fn decode(raw: &str) -> Option<Self> {
        let parts: Vec<&str> = raw.split(SEPARATOR).collect();
        match parts.as_slice() {
            ["cf", provider, diagnostic, key, title] => Some(ProviderKey::CodeFix {
                provider: unb64(provider)?,
                diagnostic_id: unb64(diagnostic)?,
                equivalence_key: unb64(key)?,
                title: unb64(title)?,
            }),
            ["rf", provider, key, title] => Some(ProviderKey::Refactoring {
                provider: unb64(provider)?,
                equivalence_key: unb64(key)?,
                title: unb64(title)?,
            }),
            [single] => BuiltinKind::parse(single).map(ProviderKey::Builtin),
            _ => None,
        }
    }
}

/// Decoded action token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionToken {
    pub version: WorkspaceVersion,
    pub profile: String,
    pub action: DiscoveredAction,
}

impl ActionToken {
    pub fn encode(action: &DiscoveredAction, version: WorkspaceVersion, profile: &str) -> String {
        let fields = [
            MARKER.to_string(),
            version.get().to_string(),
            b64(profile),
            b64(action.origin.as_str()),
            b64(&action.category),
            b64(&action.provider_key),
            action.span.start.to_string(),
            action.span.length.to_string(),
            b64(&action.file_path),
            b64(action.diagnostic_id.as_deref().unwrap_or("")),
            b64(action.refactoring_id.as_deref().unwrap_or("")),
            action.line.to_string(),
            action.column.to_string(),
        ];
        fields.join("|")
    }

    /// Any malformed token is reported exactly like an unknown one.
    pub fn decode(raw: &str) -> Result<Self> {
        Self::parse(raw.trim()).ok_or_else(|| ToolError::ActionNotFound(raw.to_string()))
    }

    fn parse(raw: &str) -> Option<Self> {
        let fields: Vec<&str> = raw.split(SEPARATOR).collect();
        if fields.len() != ACTION_FIELDS || fields[0] != MARKER {
            return None;
        }
        let origin = ActionOrigin::parse(&unb64(fields[3])?)?;
        let action = DiscoveredAction {
            title: String::new(),
            category: unb64(fields[4])?,
            origin,
            provider_key: unb64(fields[5])?,
            span: TextSpan::new(fields[6].parse().ok()?, fields[7].parse().ok()?),
            file_path: unb64(fields[8])?,
            diagnostic_id: unb64_opt(fields[9])?,
            refactoring_id: unb64_opt(fields[10])?,
            line: fields[11].parse().ok()?,
            column: fields[12].parse().ok()?,
        };
        Some(Self {
            version: WorkspaceVersion::new(fields[1].parse().ok()?),
            profile: unb64(fields[2])?,
            action,
        })
    }

    pub fn provider_key(&self) -> Option<ProviderKey> {
        ProviderKey::decode(&self.action.provider_key)
    }
}

/// Decoded fix token for the builtin unused-local removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixToken {
    pub version: WorkspaceVersion,
    pub operation: String,
    pub diagnostic_id: String,
    pub span: TextSpan,
    pub file_path: String,
}

impl FixToken {
    pub fn encode(&self) -> String {
        format!(
            "{MARKER}|{}|{}|{}|{}|{}|{}",
            self.version,
            self.operation,
            self.diagnostic_id,
            self.span.start,
            self.span.length,
            b64(&self.file_path)
        )
    }

    pub fn decode(raw: &str) -> Result<Self> {
        Self::parse(raw.trim()).ok_or_else(|| ToolError::FixNotFound(raw.to_string()))
    }

    fn parse(raw: &str) -> Option<Self> {
        let fields: Vec<&str> = raw.split(SEPARATOR).collect();
        if fields.len() != FIX_FIELDS || fields[0] != MARKER {
            return None;
        }
        if fields[2].is_empty() || fields[3].is_empty() {
            return None;
        }
        Some(Self {
            version: WorkspaceVersion::new(fields[1].parse().ok()?),
            operation: fields[2].to_string(),
            diagnostic_id: fields[3].to_string(),
            span: TextSpan::new(fields[4].parse().ok()?, fields[5].parse().ok()?),
            file_path: unb64(fields[6])?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DiscoveredAction {
        DiscoveredAction {
            title: String::new(),
            category: "compiler".to_string(),
            origin: ActionOrigin::CompilerFix,
            provider_key: ProviderKey::CodeFix {
                provider: "RemoveUnusedVariableCodeFixProvider".to_string(),
                diagnostic_id: "CS0219".to_string(),
                equivalence_key: "RemoveUnusedVariable".to_string(),
                title: "Remove | unused".to_string(),
            }
            .encode(),
            file_path: "src/a|b.cs".to_string(),
            span: TextSpan::new(40, 6),
            diagnostic_id: Some("CS0219".to_string()),
            refactoring_id: None,
            line: 3,
            column: 13,
        }
    }

    #[test]
    fn action_token_survives_delimiters() {
        let action = sample();
        let raw = ActionToken::encode(&action, WorkspaceVersion::new(7), "default");
        assert_eq!(raw.split('|').count(), 13);
        let token = ActionToken::decode(&raw).unwrap();
        assert_eq!(token.version, WorkspaceVersion::new(7));
        assert_eq!(token.profile, "default");
        assert_eq!(token.action, action);
        match token.provider_key().unwrap() {
            ProviderKey::CodeFix { title, .. } => assert_eq!(title, "Remove | unused"),
            other => panic!("unexpected key {other:?}"),
        }
    }

    #[test]
    fn malformed_action_tokens_are_not_found() {
        let raw = ActionToken::encode(&sample(), WorkspaceVersion::new(1), "default");
        let wrong_marker = raw.replacen("v1", "v2", 1);
        let truncated = raw.rsplit_once('|').unwrap().0.to_string();
        let bad_number = raw.replacen("|40|", "|x|", 1);
        for bad in [wrong_marker, truncated, bad_number, "garbage".to_string(), String::new()] {
            let err = ActionToken::decode(&bad).unwrap_err();
            assert_eq!(err.code(), "action_not_found", "{bad}");
        }
    }

    #[test]
    fn bad_base64_field_is_not_found() {
        let raw = ActionToken::encode(&sample(), WorkspaceVersion::new(1), "default");
        let mut fields: Vec<&str> = raw.split('|').collect();
        fields[8] = "***";
        let err = ActionToken::decode(&fields.join("|")).unwrap_err();
        assert_eq!(err.code(), "action_not_found");
    }

    #[test]
    fn builtin_provider_keys_are_plain_names() {
        let key = ProviderKey::Builtin(BuiltinKind::UseInferredType);
        assert_eq!(key.encode(), "use-inferred-type");
        assert_eq!(ProviderKey::decode("use-inferred-type"), Some(key));
        assert_eq!(ProviderKey::decode("rf|!!|x|y"), None);
    }

    #[test]
    fn fix_token_has_seven_fields() {
        let token = FixToken {
            version: WorkspaceVersion::new(4),
            operation: "remove-unused-local".to_string(),
            diagnostic_id: "CS0168".to_string(),
            span: TextSpan::new(10, 3),
            file_path: "a b|c.cs".to_string(),
        };
        let raw = token.encode();
        assert_eq!(raw.split('|').count(), 7);
        assert!(raw.starts_with("v1|4|remove-unused-local|CS0168|10|3|"));
        assert_eq!(FixToken::decode(&raw).unwrap(), token);
        assert_eq!(FixToken::decode("v1|4|x").unwrap_err().code(), "fix_not_found");
    }
}

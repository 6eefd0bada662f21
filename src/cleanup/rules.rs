use crate::cancel::CancellationToken;
use crate::codemodel::{CodeAction, CodeModel};
use crate::error::Result;
use crate::workspace::edit::edits_disjoint;
use crate::workspace::{Snapshot, TextEdit};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CleanupRule {
    RemoveUnusedImports,
    OrganizeImports,
    FixModifierOrder,
    AddMissingReadonly,
    Format,
}

/// Fixed execution order.
pub const RULES: [CleanupRule; 5] = [
    CleanupRule::RemoveUnusedImports,
    CleanupRule::OrganizeImports,
    CleanupRule::FixModifierOrder,
    CleanupRule::AddMissingReadonly,
    CleanupRule::Format,
];

impl CleanupRule {
    pub fn as_str(self) -> &'static str {
        match self {
            CleanupRule::RemoveUnusedImports => "remove-unused-imports",
            CleanupRule::OrganizeImports => "organize-imports",
            CleanupRule::FixModifierOrder => "fix-modifier-order",
            CleanupRule::AddMissingReadonly => "add-missing-readonly",
            CleanupRule::Format => "format",
        }
    }

    /// Diagnostics a diagnostic-driven rule acts on; `None` for the purely
    /// syntactic rules.
    pub fn diagnostic_ids(self) -> Option<&'static [&'static str]> {
        match self {
            CleanupRule::RemoveUnusedImports => Some(&["CS8019", "IDE0005"]),
            CleanupRule::FixModifierOrder => Some(&["IDE0036"]),
            CleanupRule::AddMissingReadonly => Some(&["IDE0044"]),
            CleanupRule::OrganizeImports | CleanupRule::Format => None,
        }
    }
}

/// What one rule did to one document.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleRun {
    pub passes: usize,
    pub changed: bool,
}

pub fn run_rule(
    rule: CleanupRule,
    model: &dyn CodeModel,
    snapshot: Snapshot,
    path: &str,
    max_passes: usize,
    cancel: &CancellationToken,
) -> Result<(Snapshot, RuleRun)> {
    cancel.check()?;
    let Some(ids) = rule.diagnostic_ids() else {
        let next = match rule {
            CleanupRule::OrganizeImports => model.organize_imports(&snapshot, path)?,
            _ => model.format_document(&snapshot, path)?,
        };
        let changed = next.text(path) != snapshot.text(path);
        return Ok((next, RuleRun { passes: 1, changed }));
    };

    let mut current = snapshot;
    let mut run = RuleRun::default();
    for pass in 1..=max_passes {
        cancel.check()?;
        let chosen = choose_fixes(model, &current, path, ids)?;
        if chosen.is_empty() {
            break;
        }
        let mut next = current.clone();
        for (doc_path, edits) in &chosen {
            next = next.with_edits(doc_path, edits)?;
        }
        if chosen.keys().all(|doc_path| next.text(doc_path) == current.text(doc_path)) {
            break;
        }
        log::debug!(
            "{} pass {pass} on {path}: edited {} document(s)",
            rule.as_str(),
            chosen.len()
        );
        current = next;
        run.passes = pass;
        run.changed = true;
    }
    Ok((current, run))
}

/// One fix per matching diagnostic, lexicographically first by provider,
/// title and equivalence key, skipping fixes that overlap an earlier choice.
fn choose_fixes(
    model: &dyn CodeModel,
    snapshot: &Snapshot,
    path: &str,
    ids: &[&str],
) -> Result<BTreeMap<String, Vec<TextEdit>>> {
    let registry = model.providers()?;
    let mut chosen: BTreeMap<String, Vec<TextEdit>> = BTreeMap::new();
    for diagnostic in model.diagnostics(snapshot, path)? {
        if !ids.contains(&diagnostic.id.as_str()) {
            continue;
        }
        let mut candidates: Vec<(&str, CodeAction)> = Vec::new();
        for provider in registry.fix_providers_for(&diagnostic.id) {
            match provider.provide_fixes(snapshot, &diagnostic) {
                Ok(fixes) => candidates.extend(fixes.into_iter().map(|fix| (provider.type_name(), fix))),
                Err(err) => log::warn!(
                    "cleanup skipped {} for {} in {path}: {err}",
                    provider.type_name(),
                    diagnostic.id
                ),
            }
        }
        let Some((_, fix)) = candidates.into_iter().min_by(|a, b| {
            (a.0, &a.1.title, &a.1.equivalence_key).cmp(&(b.0, &b.1.title, &b.1.equivalence_key))
        }) else {
            continue;
        };
        let fits = fix.edits.iter().all(|doc| {
            chosen
                .get(&doc.path)
                .map(|taken| edits_disjoint(taken, &doc.edits))
                .unwrap_or(true)
        });
        if !fits {
            continue;
        }
        for doc in fix.edits {
            chosen.entry(doc.path).or_default().extend(doc.edits);
        }
    }
    Ok(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csharp::CSharpCodeModel;

    fn run(rule: CleanupRule, source: &str, max_passes: usize) -> (String, RuleRun) {
        let snapshot = Snapshot::builder()
            .document("App", "a.cs", source, None)
            .build();
        let model = CSharpCodeModel::new();
        let (next, run) = run_rule(
            rule,
            &model,
            snapshot,
            "a.cs",
            max_passes,
            &CancellationToken::new(),
        )
        .unwrap();
        (next.text("a.cs").unwrap().to_string(), run)
    }

    #[test]
    fn fixes_every_misordered_modifier_in_one_pass() {
        let source = "class A\n{\n    static public int X;\n    readonly private int _y = 1;\n    int Get() => _y;\n}\n";
        let (text, run) = run(CleanupRule::FixModifierOrder, source, 3);
        assert!(text.contains("public static int X;"));
        assert!(text.contains("private readonly int _y = 1;"));
        assert_eq!(run.passes, 1);
        assert!(run.changed);
    }

    #[test]
    fn clean_document_takes_no_pass() {
        let source = "class A\n{\n    public static int X;\n}\n";
        let (text, run) = run(CleanupRule::FixModifierOrder, source, 3);
        assert_eq!(text, source);
        assert!(!run.changed);
        assert_eq!(run.passes, 0);
    }

    #[test]
    fn cancelled_rule_unwinds() {
        let snapshot = Snapshot::builder()
            .document("App", "a.cs", "class A {}", None)
            .build();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = run_rule(
            CleanupRule::Format,
            &CSharpCodeModel::new(),
            snapshot,
            "a.cs",
            3,
            &cancel,
        )
        .err()
        .unwrap();
        assert!(err.is_cancelled());
    }
}

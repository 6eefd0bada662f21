use crate::model::SymbolKind;
use blake3::Hasher;

/// Compute a symbol ID from the symbol's definition only.
///
/// The ID is derived from:
/// - `qualname`: the fully-qualified definition name with generic arity
///   normalized (``Ns.Repository`1.Find``), never a constructed form
/// - `signature`: normalized parameter types, e.g. `(int,string)`
/// - `kind`: the symbol kind, so a class and a namespace of the same name differ
///
/// Positions are not part of the hash: moving code, reformatting, or
/// splitting a type into partial declarations keeps the ID.
///
/// Format: `sym_` followed by the first 16 hex characters (64 bits) of the
/// blake3 digest.
pub fn symbol_id(qualname: &str, signature: Option<&str>, kind: SymbolKind) -> String {
    let mut hasher = Hasher::new();
    hasher.update(qualname.as_bytes());
    hasher.update(b"\x00");
    if let Some(sig) = signature {
        hasher.update(sig.as_bytes());
    }
    hasher.update(b"\x00");
    hasher.update(kind.as_str().as_bytes());
    let hash = hasher.finalize();
    format!("sym_{}", &hash.to_hex()[..16])
}

/// Cheap shape check so malformed IDs can be rejected as input errors before
/// any lookup.
pub fn is_well_formed(id: &str) -> bool {
    id.strip_prefix("sym_")
        .map(|hex| hex.len() == 16 && hex.chars().all(|ch| ch.is_ascii_hexdigit()))
        .unwrap_or(false)
}

/// `Repository` with two type parameters becomes ``Repository`2``.
pub fn generic_definition_name(name: &str, arity: usize) -> String {
    if arity == 0 {
        name.to_string()
    } else {
        format!("{name}`{arity}")
    }
}

/// Strip type arguments and qualification from a type reference:
/// `global::Ns.List<int>` -> `List`, `IRepo<T>` -> `IRepo`.
pub fn simple_type_name(raw: &str) -> &str {
    let raw = raw.trim();
    let raw = raw.split('<').next().unwrap_or(raw);
    let raw = raw.trim_end_matches(['?', '[', ']']);
    let raw = raw.rsplit("::").next().unwrap_or(raw);
    raw.rsplit('.').next().unwrap_or(raw).trim()
}

/// Number of top-level type arguments in a type reference (`Dictionary<K, List<V>>` is 2).
pub fn type_argument_count(raw: &str) -> usize {
    let Some(open) = raw.find('<') else {
        return 0;
    };
    let mut depth = 0usize;
    let mut count = 1;
    for ch in raw[open..].chars() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 1 => count += 1,
            _ => {}
        }
    }
    count
}

/// Whitespace-free form of a parameter type list, used as the signature
/// component of method IDs.
pub fn normalize_signature<'a>(parameter_types: impl IntoIterator<Item = &'a str>) -> String {
    let types: Vec<String> = parameter_types
        .into_iter()
        .map(|ty| ty.split_whitespace().collect::<Vec<_>>().join(" "))
        .map(|ty| ty.replace(", ", ","))
        .collect();
    format!("({})", types.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_stable_and_well_formed() {
        let a = symbol_id("App.Service.Run", Some("(int)"), SymbolKind::Method);
        let b = symbol_id("App.Service.Run", Some("(int)"), SymbolKind::Method);
        assert_eq!(a, b);
        assert!(a.starts_with("sym_"));
        assert_eq!(a.len(), 20);
        assert!(is_well_formed(&a));
        assert!(!is_well_formed("sym_xyz"));
        assert!(!is_well_formed("App.Service.Run"));
    }

    #[test]
    fn id_changes_with_signature_qualname_and_kind() {
        let base = symbol_id("App.Service.Run", Some("(int)"), SymbolKind::Method);
        assert_ne!(
            base,
            symbol_id("App.Service.Run", Some("(string)"), SymbolKind::Method)
        );
        assert_ne!(
            base,
            symbol_id("App.Service.Stop", Some("(int)"), SymbolKind::Method)
        );
        assert_ne!(
            symbol_id("App.Service", None, SymbolKind::Class),
            symbol_id("App.Service", None, SymbolKind::Interface)
        );
    }

    #[test]
    fn type_name_helpers() {
        assert_eq!(simple_type_name("global::App.List<int>"), "List");
        assert_eq!(simple_type_name("IRepo<T>"), "IRepo");
        assert_eq!(simple_type_name("int[]"), "int");
        assert_eq!(type_argument_count("Dictionary<K, List<V>>"), 2);
        assert_eq!(type_argument_count("Service"), 0);
        assert_eq!(generic_definition_name("Repo", 1), "Repo`1");
        assert_eq!(
            normalize_signature(["int", "Dictionary<string,  int>"]),
            "(int,Dictionary<string,int>)"
        );
    }
}

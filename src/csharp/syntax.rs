use crate::error::{Result, ToolError};
use crate::workspace::TextSpan;
use tree_sitter::{Node, Parser, Tree};

pub fn parse(source: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    let language = tree_sitter_c_sharp::LANGUAGE;
    parser
        .set_language(&language.into())
        .map_err(|err| ToolError::internal(format!("load C# grammar: {err}")))?;
    parser
        .parse(source, None)
        .ok_or_else(|| ToolError::internal("C# parser returned no tree"))
}

pub fn node_text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

pub fn span_of(node: Node<'_>) -> TextSpan {
    TextSpan::from_bounds(node.start_byte(), node.end_byte())
}

pub fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

pub fn children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

/// Pre-order walk. Returning `false` from `visit` skips the node's subtree.
pub fn walk<'t>(node: Node<'t>, visit: &mut dyn FnMut(Node<'t>) -> bool) {
    if !visit(node) {
        return;
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        walk(child, visit);
    }
}

/// Every named descendant (including `node`) whose kind is in `kinds`.
pub fn descendants_of_kind<'t>(node: Node<'t>, kinds: &[&str]) -> Vec<Node<'t>> {
    let mut out = Vec::new();
    walk(node, &mut |current| {
        if kinds.contains(&current.kind()) {
            out.push(current);
        }
        true
    });
    out
}

pub fn ancestor<'t>(node: Node<'t>, kinds: &[&str]) -> Option<Node<'t>> {
    let mut current = node.parent();
    while let Some(parent) = current {
        if kinds.contains(&parent.kind()) {
            return Some(parent);
        }
        current = parent.parent();
    }
    None
}

/// Smallest named node of one of `kinds` covering `span`.
pub fn covering_node<'t>(root: Node<'t>, span: TextSpan, kinds: &[&str]) -> Option<Node<'t>> {
    let mut best: Option<Node<'t>> = None;
    walk(root, &mut |node| {
        let covers = node.start_byte() <= span.start && span.end() <= node.end_byte();
        if !covers {
            return false;
        }
        if kinds.contains(&node.kind()) {
            best = Some(node);
        }
        true
    });
    best
}

pub fn modifier_nodes(node: Node<'_>) -> Vec<Node<'_>> {
    named_children(node)
        .into_iter()
        .filter(|child| child.kind() == "modifier")
        .collect()
}

pub fn modifier_texts(node: Node<'_>, source: &str) -> Vec<String> {
    modifier_nodes(node)
        .into_iter()
        .map(|modifier| node_text(modifier, source).trim().to_string())
        .collect()
}

pub fn has_modifier(node: Node<'_>, source: &str, modifier: &str) -> bool {
    modifier_nodes(node)
        .into_iter()
        .any(|child| node_text(child, source).trim() == modifier)
}

pub fn has_anonymous_child(node: Node<'_>, kind: &str) -> bool {
    children(node)
        .into_iter()
        .any(|child| !child.is_named() && child.kind() == kind)
}

pub fn name_node(node: Node<'_>) -> Option<Node<'_>> {
    node.child_by_field_name("name")
}

/// Expression after `=` in a variable declarator.
pub fn declarator_initializer(node: Node<'_>) -> Option<Node<'_>> {
    let mut seen_equals = false;
    for child in children(node) {
        if !child.is_named() && child.kind() == "=" {
            seen_equals = true;
            continue;
        }
        if seen_equals && child.is_named() {
            if child.kind() == "equals_value_clause" {
                return named_children(child).into_iter().next();
            }
            return Some(child);
        }
        if child.kind() == "equals_value_clause" {
            return named_children(child).into_iter().next();
        }
    }
    None
}

pub fn declarators(variable_declaration: Node<'_>) -> Vec<Node<'_>> {
    named_children(variable_declaration)
        .into_iter()
        .filter(|child| child.kind() == "variable_declarator")
        .collect()
}

pub fn variable_declaration(node: Node<'_>) -> Option<Node<'_>> {
    named_children(node)
        .into_iter()
        .find(|child| child.kind() == "variable_declaration")
}

/// Arguments of an invocation or object creation.
pub fn argument_count(node: Node<'_>) -> usize {
    node.child_by_field_name("arguments")
        .map(|args| {
            named_children(args)
                .into_iter()
                .filter(|child| child.kind() == "argument")
                .count()
        })
        .unwrap_or(0)
}

/// Identifier of a simple or generic name (`Foo`, `Foo<T>`).
pub fn simple_name_identifier(node: Node<'_>) -> Option<Node<'_>> {
    match node.kind() {
        "identifier" => Some(node),
        "generic_name" => named_children(node)
            .into_iter()
            .find(|child| child.kind() == "identifier"),
        "qualified_name" => node
            .child_by_field_name("name")
            .or_else(|| named_children(node).into_iter().last())
            .and_then(simple_name_identifier),
        "alias_qualified_name" => node
            .child_by_field_name("name")
            .or_else(|| named_children(node).into_iter().last())
            .and_then(simple_name_identifier),
        _ => None,
    }
}

pub fn is_nested_function_node(kind: &str) -> bool {
    matches!(
        kind,
        "local_function_statement"
            | "anonymous_method_expression"
            | "lambda_expression"
            | "parenthesized_lambda_expression"
            | "simple_lambda_expression"
    )
}

pub fn is_type_declaration(kind: &str) -> bool {
    matches!(
        kind,
        "class_declaration"
            | "struct_declaration"
            | "interface_declaration"
            | "record_declaration"
            | "record_struct_declaration"
            | "enum_declaration"
    )
}

pub fn is_member_declaration(kind: &str) -> bool {
    matches!(
        kind,
        "method_declaration"
            | "constructor_declaration"
            | "destructor_declaration"
            | "property_declaration"
            | "field_declaration"
            | "event_field_declaration"
            | "event_declaration"
            | "indexer_declaration"
            | "operator_declaration"
            | "conversion_operator_declaration"
            | "delegate_declaration"
    )
}

pub fn is_string_literal(kind: &str) -> bool {
    matches!(
        kind,
        "string_literal"
            | "verbatim_string_literal"
            | "raw_string_literal"
            | "interpolated_string_expression"
            | "character_literal"
    )
}

pub fn is_constant_literal(kind: &str) -> bool {
    matches!(
        kind,
        "integer_literal"
            | "real_literal"
            | "string_literal"
            | "verbatim_string_literal"
            | "raw_string_literal"
            | "character_literal"
            | "boolean_literal"
            | "null_literal"
    )
}

/// Source-level type of a literal initializer, when it is unambiguous.
pub fn literal_type(node: Node<'_>, source: &str) -> Option<&'static str> {
    let text = node_text(node, source).trim();
    match node.kind() {
        "string_literal" | "verbatim_string_literal" | "raw_string_literal" => Some("string"),
        "character_literal" => Some("char"),
        "boolean_literal" => Some("bool"),
        "integer_literal" => {
            let lower = text.to_ascii_lowercase();
            if lower.ends_with("ul") || lower.ends_with("lu") {
                Some("ulong")
            } else if lower.ends_with('l') {
                Some("long")
            } else if lower.ends_with('u') {
                Some("uint")
            } else {
                Some("int")
            }
        }
        "real_literal" => {
            let lower = text.to_ascii_lowercase();
            if lower.ends_with('f') {
                Some("float")
            } else if lower.ends_with('m') {
                Some("decimal")
            } else {
                Some("double")
            }
        }
        _ => None,
    }
}

/// Byte ranges of string literals that span more than one line. Their
/// contents are data, not layout.
pub fn multiline_literal_ranges(root: Node<'_>, source: &str) -> Vec<TextSpan> {
    let mut out = Vec::new();
    walk(root, &mut |node| {
        if is_string_literal(node.kind()) {
            if node_text(node, source).contains('\n') {
                out.push(span_of(node));
            }
            return false;
        }
        true
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_declarator_initializer() {
        let source = "class A { void M() { var x = 42; int y; } }";
        let tree = parse(source).unwrap();
        let declarators = descendants_of_kind(tree.root_node(), &["variable_declarator"]);
        assert_eq!(declarators.len(), 2);
        let init = declarator_initializer(declarators[0]).unwrap();
        assert_eq!(node_text(init, source), "42");
        assert_eq!(literal_type(init, source), Some("int"));
        assert!(declarator_initializer(declarators[1]).is_none());
    }

    #[test]
    fn collects_modifiers_in_source_order() {
        let source = "class A { static public int X; }";
        let tree = parse(source).unwrap();
        let field = descendants_of_kind(tree.root_node(), &["field_declaration"])[0];
        assert_eq!(modifier_texts(field, source), vec!["static", "public"]);
        assert!(has_modifier(field, source, "public"));
    }

    #[test]
    fn multiline_literals_are_found() {
        let source = "class A { string s = @\"a\n  b\"; string t = \"x\"; }";
        let tree = parse(source).unwrap();
        let ranges = multiline_literal_ranges(tree.root_node(), source);
        assert_eq!(ranges.len(), 1);
        assert!(source[ranges[0].start..ranges[0].end()].starts_with("@\""));
    }
}

use crate::csharp::syntax::{self, node_text, span_of};
use crate::model::{SourceLocation, SymbolKind};
use crate::symbols::SymbolDeclaration;
use crate::symbols::identity::{generic_definition_name, normalize_signature};
use tree_sitter::Node;

#[derive(Clone, Default)]
struct Context {
    namespace_stack: Vec<String>,
    type_stack: Vec<String>,
}

struct Output<'a> {
    path: &'a str,
    source: &'a str,
    declarations: Vec<SymbolDeclaration>,
}

/// Declarations of one parsed document, in source order.
pub fn collect(root: Node<'_>, path: &str, source: &str) -> Vec<SymbolDeclaration> {
    let mut output = Output {
        path,
        source,
        declarations: Vec::new(),
    };
    walk_compilation_unit(root, &Context::default(), &mut output);
    output.declarations
}

fn walk_compilation_unit(node: Node<'_>, ctx: &Context, output: &mut Output<'_>) {
    let mut next_ctx = ctx.clone();
    for child in syntax::named_children(node) {
        if child.kind() == "file_scoped_namespace_declaration" {
            // Members follow the declaration as siblings in some grammar
            // versions and nest under it in others.
            if let Some(name) = namespace_name(child, output.source) {
                let parts = namespace_parts(&name);
                push_namespace(child, &parts, ctx, output);
                next_ctx.namespace_stack = parts;
            }
            walk_declaration_list(child, &next_ctx, output);
            continue;
        }
        walk_node(child, &next_ctx, output);
    }
}

fn walk_node(node: Node<'_>, ctx: &Context, output: &mut Output<'_>) {
    if syntax::is_nested_function_node(node.kind()) {
        return;
    }
    match node.kind() {
        "namespace_declaration" => {
            handle_namespace(node, ctx, output);
            return;
        }
        "class_declaration" => {
            handle_type(node, ctx, output, SymbolKind::Class);
            return;
        }
        "struct_declaration" => {
            handle_type(node, ctx, output, SymbolKind::Struct);
            return;
        }
        "interface_declaration" => {
            handle_type(node, ctx, output, SymbolKind::Interface);
            return;
        }
        "record_declaration" | "record_struct_declaration" => {
            handle_type(node, ctx, output, SymbolKind::Record);
            return;
        }
        "enum_declaration" => {
            handle_type(node, ctx, output, SymbolKind::Enum);
            return;
        }
        "method_declaration" => {
            handle_method(node, ctx, output);
            return;
        }
        "constructor_declaration" => {
            handle_constructor(node, ctx, output);
            return;
        }
        "property_declaration" => {
            handle_property(node, ctx, output);
            return;
        }
        "field_declaration" => {
            handle_field(node, ctx, output);
            return;
        }
        "global_statement" | "block" => return,
        _ => {}
    }
    for child in syntax::named_children(node) {
        walk_node(child, ctx, output);
    }
}

fn walk_declaration_list(node: Node<'_>, ctx: &Context, output: &mut Output<'_>) {
    for child in syntax::named_children(node) {
        walk_node(child, ctx, output);
    }
}

fn handle_namespace(node: Node<'_>, ctx: &Context, output: &mut Output<'_>) {
    let Some(name) = namespace_name(node, output.source) else {
        return;
    };
    let parts = namespace_parts(&name);
    if parts.is_empty() {
        return;
    }
    let mut full_parts = ctx.namespace_stack.clone();
    full_parts.extend(parts);
    push_namespace(node, &full_parts, ctx, output);
    let mut next_ctx = ctx.clone();
    next_ctx.namespace_stack = full_parts;
    if let Some(body) = node.child_by_field_name("body") {
        walk_declaration_list(body, &next_ctx, output);
    }
}

fn push_namespace(node: Node<'_>, parts: &[String], ctx: &Context, output: &mut Output<'_>) {
    let Some(name) = parts.last().cloned() else {
        return;
    };
    let Some(name_node) = syntax::name_node(node) else {
        return;
    };
    let container = if ctx.namespace_stack.is_empty() {
        None
    } else {
        Some(ctx.namespace_stack.join("."))
    };
    push(
        output,
        name_node,
        SymbolDeclaration {
            kind: SymbolKind::Namespace,
            name,
            qualname: parts.join("."),
            signature: None,
            container,
            parameter_count: None,
            bases: Vec::new(),
            modifiers: Vec::new(),
            location: placeholder_location(),
            extent: span_of(node),
        },
    );
}

fn handle_type(node: Node<'_>, ctx: &Context, output: &mut Output<'_>, kind: SymbolKind) {
    let Some(name_node) = syntax::name_node(node) else {
        return;
    };
    let name = node_text(name_node, output.source).trim().to_string();
    if name.is_empty() {
        return;
    }
    let definition_name = generic_definition_name(&name, type_parameter_count(node));
    let qualname = build_qualname(ctx, &definition_name);
    let bases = if kind == SymbolKind::Enum {
        Vec::new()
    } else {
        base_list_types(node, output.source)
    };
    push(
        output,
        name_node,
        SymbolDeclaration {
            kind,
            name,
            qualname,
            signature: None,
            container: container_qualname(ctx),
            parameter_count: None,
            bases,
            modifiers: syntax::modifier_texts(node, output.source),
            location: placeholder_location(),
            extent: span_of(node),
        },
    );

    let mut next_ctx = ctx.clone();
    next_ctx.type_stack.push(definition_name);
    if let Some(body) = node.child_by_field_name("body") {
        walk_declaration_list(body, &next_ctx, output);
    } else if let Some(body) = syntax::named_children(node)
        .into_iter()
        .find(|child| child.kind() == "declaration_list")
    {
        walk_declaration_list(body, &next_ctx, output);
    }
}

fn handle_method(node: Node<'_>, ctx: &Context, output: &mut Output<'_>) {
    let Some(name_node) = syntax::name_node(node) else {
        return;
    };
    let name = node_text(name_node, output.source).trim().to_string();
    if name.is_empty() {
        return;
    }
    let definition_name = generic_definition_name(&name, type_parameter_count(node));
    let (signature, count) = parameter_signature(node, output.source);
    push(
        output,
        name_node,
        SymbolDeclaration {
            kind: SymbolKind::Method,
            name,
            qualname: build_qualname(ctx, &definition_name),
            signature: Some(signature),
            container: container_qualname(ctx),
            parameter_count: Some(count),
            bases: Vec::new(),
            modifiers: syntax::modifier_texts(node, output.source),
            location: placeholder_location(),
            extent: span_of(node),
        },
    );
}

fn handle_constructor(node: Node<'_>, ctx: &Context, output: &mut Output<'_>) {
    let Some(name_node) = syntax::name_node(node) else {
        return;
    };
    let Some(type_name) = ctx.type_stack.last().cloned() else {
        return;
    };
    let (signature, count) = parameter_signature(node, output.source);
    push(
        output,
        name_node,
        SymbolDeclaration {
            kind: SymbolKind::Constructor,
            name: type_name,
            qualname: build_qualname(ctx, ".ctor"),
            signature: Some(signature),
            container: container_qualname(ctx),
            parameter_count: Some(count),
            bases: Vec::new(),
            modifiers: syntax::modifier_texts(node, output.source),
            location: placeholder_location(),
            extent: span_of(node),
        },
    );
}

fn handle_property(node: Node<'_>, ctx: &Context, output: &mut Output<'_>) {
    let Some(name_node) = syntax::name_node(node) else {
        return;
    };
    let name = node_text(name_node, output.source).trim().to_string();
    if name.is_empty() {
        return;
    }
    push(
        output,
        name_node,
        SymbolDeclaration {
            kind: SymbolKind::Property,
            name: name.clone(),
            qualname: build_qualname(ctx, &name),
            signature: None,
            container: container_qualname(ctx),
            parameter_count: None,
            bases: Vec::new(),
            modifiers: syntax::modifier_texts(node, output.source),
            location: placeholder_location(),
            extent: span_of(node),
        },
    );
}

fn handle_field(node: Node<'_>, ctx: &Context, output: &mut Output<'_>) {
    let Some(declaration) = syntax::variable_declaration(node) else {
        return;
    };
    let modifiers = syntax::modifier_texts(node, output.source);
    for declarator in syntax::declarators(declaration) {
        let Some(name_node) = syntax::name_node(declarator).or_else(|| {
            syntax::named_children(declarator)
                .into_iter()
                .find(|child| child.kind() == "identifier")
        }) else {
            continue;
        };
        let name = node_text(name_node, output.source).trim().to_string();
        if name.is_empty() {
            continue;
        }
        push(
            output,
            name_node,
            SymbolDeclaration {
                kind: SymbolKind::Field,
                name: name.clone(),
                qualname: build_qualname(ctx, &name),
                signature: None,
                container: container_qualname(ctx),
                parameter_count: None,
                bases: Vec::new(),
                modifiers: modifiers.clone(),
                location: placeholder_location(),
                extent: span_of(node),
            },
        );
    }
}

fn push(output: &mut Output<'_>, name_node: Node<'_>, mut decl: SymbolDeclaration) {
    decl.location = SourceLocation::new(output.path, output.source, span_of(name_node));
    output.declarations.push(decl);
}

fn placeholder_location() -> SourceLocation {
    SourceLocation {
        path: String::new(),
        line: 0,
        column: 0,
        span: Default::default(),
    }
}

/// `(int,string)` plus the parameter count. Only types take part, so
/// renaming a parameter keeps the method's ID.
fn parameter_signature(node: Node<'_>, source: &str) -> (String, usize) {
    let Some(params) = node.child_by_field_name("parameters") else {
        return (normalize_signature(std::iter::empty()), 0);
    };
    let types: Vec<String> = syntax::named_children(params)
        .into_iter()
        .filter(|child| child.kind() == "parameter")
        .map(|param| parameter_type(param, source))
        .collect();
    let count = types.len();
    (normalize_signature(types.iter().map(String::as_str)), count)
}

fn parameter_type(param: Node<'_>, source: &str) -> String {
    let ty = param
        .child_by_field_name("type")
        .map(|ty| node_text(ty, source).trim().to_string())
        .unwrap_or_default();
    let prefix: Vec<String> = syntax::children(param)
        .into_iter()
        .filter(|child| matches!(child.kind(), "ref" | "out" | "in" | "params" | "this"))
        .map(|child| node_text(child, source).to_string())
        .chain(
            syntax::named_children(param)
                .into_iter()
                .filter(|child| child.kind() == "parameter_modifier" || child.kind() == "modifier")
                .map(|child| node_text(child, source).trim().to_string()),
        )
        .filter(|value| value != "this")
        .collect();
    if prefix.is_empty() {
        ty
    } else {
        format!("{} {ty}", prefix.join(" "))
    }
}

fn type_parameter_count(node: Node<'_>) -> usize {
    node.child_by_field_name("type_parameters")
        .or_else(|| {
            syntax::named_children(node)
                .into_iter()
                .find(|child| child.kind() == "type_parameter_list")
        })
        .map(|list| {
            syntax::named_children(list)
                .into_iter()
                .filter(|child| child.kind() == "type_parameter")
                .count()
        })
        .unwrap_or(0)
}

fn base_list_types(node: Node<'_>, source: &str) -> Vec<String> {
    let mut out = Vec::new();
    for child in syntax::named_children(node) {
        if child.kind() != "base_list" {
            continue;
        }
        for base in syntax::named_children(child) {
            let name = match base.kind() {
                "argument_list" => continue,
                "primary_constructor_base_type" => base
                    .child_by_field_name("type")
                    .map(|ty| node_text(ty, source))
                    .unwrap_or_else(|| node_text(base, source)),
                _ => node_text(base, source),
            };
            let name = name.trim();
            if !name.is_empty() {
                out.push(name.to_string());
            }
        }
    }
    out
}

fn namespace_name(node: Node<'_>, source: &str) -> Option<String> {
    syntax::name_node(node)
        .map(|n| node_text(n, source).trim().to_string())
        .filter(|value| !value.is_empty())
}

fn namespace_parts(name: &str) -> Vec<String> {
    let normalized = name.replace("::", ".");
    normalized
        .split('.')
        .filter(|part| !part.trim().is_empty())
        .map(|part| part.trim().to_string())
        .collect()
}

fn build_qualname(ctx: &Context, name: &str) -> String {
    match container_qualname(ctx) {
        Some(container) => format!("{container}.{name}"),
        None => name.to_string(),
    }
}

fn container_qualname(ctx: &Context) -> Option<String> {
    let parts: Vec<&str> = ctx
        .namespace_stack
        .iter()
        .chain(ctx.type_stack.iter())
        .map(String::as_str)
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("."))
    }
}

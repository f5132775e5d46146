use crate::error::ParseUnavailable;
use crate::grammar::GrammarRegistry;
use crate::language::Language;
use crate::types::{BoundarySet, Symbol, SymbolKind};
use std::sync::Arc;
use tree_sitter::{Node, Tree};

/// Upper bound on nodes visited while looking for a descendant name
const NAME_SEARCH_LIMIT: usize = 256;

/// Longest name kept for prose symbols (markdown headings)
const MAX_NAME_CHARS: usize = 120;

/// A parsed document, borrowing the source it was parsed from
pub struct SyntaxTree<'src> {
    tree: Tree,
    source: &'src str,
    language: Language,
}

impl<'src> SyntaxTree<'src> {
    pub fn root_node(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub const fn language(&self) -> Language {
        self.language
    }

    pub const fn source(&self) -> &'src str {
        self.source
    }

    /// Whether the parser had to recover from syntax errors
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }
}

/// Symbols and boundaries derived from one parse
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub symbols: Vec<Symbol>,
    pub boundaries: BoundarySet,
    pub has_errors: bool,
}

/// Parses source text and extracts points of interest
#[derive(Debug, Clone)]
pub struct SyntaxAnalyzer {
    grammars: Arc<GrammarRegistry>,
}

/// Enclosing symbol while walking the tree
#[derive(Clone)]
struct Scope {
    kind: SymbolKind,
    name: Option<String>,
}

struct Frame<'tree> {
    node: Node<'tree>,
    depth: usize,
    scope: Option<Scope>,
}

impl SyntaxAnalyzer {
    pub const fn new(grammars: Arc<GrammarRegistry>) -> Self {
        Self { grammars }
    }

    pub fn grammars(&self) -> &GrammarRegistry {
        &self.grammars
    }

    /// Parse source text for the language behind `extension`
    pub fn parse<'src>(
        &self,
        source: &'src str,
        extension: &str,
    ) -> Result<SyntaxTree<'src>, ParseUnavailable> {
        let language = Language::from_extension(extension).ok_or_else(|| {
            ParseUnavailable::new(extension, "no grammar is known for this extension")
        })?;
        self.parse_language(source, language)
    }

    /// Parse source text with an explicit language
    pub fn parse_language<'src>(
        &self,
        source: &'src str,
        language: Language,
    ) -> Result<SyntaxTree<'src>, ParseUnavailable> {
        let mut parser = self
            .grammars
            .get_parser(language)
            .ok_or_else(|| ParseUnavailable::new(language.as_str(), "grammar not loaded"))?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| ParseUnavailable::new(language.as_str(), "parser returned no tree"))?;

        Ok(SyntaxTree {
            tree,
            source,
            language,
        })
    }

    /// Parse and derive symbols plus boundaries in one call
    pub fn analyze(&self, source: &str, extension: &str) -> Result<Analysis, ParseUnavailable> {
        let tree = self.parse(source, extension)?;
        Ok(self.analyze_tree(&tree))
    }

    pub fn analyze_tree(&self, tree: &SyntaxTree<'_>) -> Analysis {
        let symbols = self.extract_symbols(tree);
        let boundaries = boundaries_from_symbols(&symbols);
        let has_errors = tree.has_errors();
        if has_errors {
            log::debug!(
                "{} source parsed with syntax errors; using partial tree",
                tree.language()
            );
        }
        Analysis {
            symbols,
            boundaries,
            has_errors,
        }
    }

    /// Flat symbol table ordered by start line
    pub fn extract_symbols(&self, tree: &SyntaxTree<'_>) -> Vec<Symbol> {
        let language = tree.language();
        let source = tree.source();
        let mut symbols = Vec::new();

        let mut stack = vec![Frame {
            node: tree.root_node(),
            depth: 0,
            scope: None,
        }];

        while let Some(Frame { node, depth, scope }) = stack.pop() {
            let kind = node.kind();

            if language.is_comment(kind) || is_docstring(language, node) {
                symbols.push(make_symbol(node, SymbolKind::Comment, None, depth, &scope));
                continue;
            }
            if language.is_attribute(kind) {
                symbols.push(make_symbol(node, SymbolKind::Attribute, None, depth, &scope));
                continue;
            }

            let mut child_depth = depth;
            let mut child_scope = scope.clone();

            if let Some(mut symbol_kind) = language.symbol_kind(kind) {
                if symbol_kind == SymbolKind::Function
                    && scope.as_ref().is_some_and(|s| s.kind.is_class_like())
                {
                    symbol_kind = SymbolKind::Method;
                }

                let name = resolve_name(language, symbol_kind, node, source);
                symbols.push(make_symbol(node, symbol_kind, name.clone(), depth, &scope));

                // Decorators wrap a definition without adding a nesting level.
                if symbol_kind != SymbolKind::Decorated {
                    child_depth = depth + 1;
                    child_scope = Some(Scope {
                        kind: symbol_kind,
                        name,
                    });
                }
            }

            let mut cursor = node.walk();
            let children: Vec<Node> = node.children(&mut cursor).collect();
            for child in children.into_iter().rev() {
                stack.push(Frame {
                    node: child,
                    depth: child_depth,
                    scope: child_scope.clone(),
                });
            }
        }

        symbols.sort_by(|a, b| {
            a.byte_start
                .cmp(&b.byte_start)
                .then_with(|| b.byte_end.cmp(&a.byte_end))
                .then_with(|| a.depth.cmp(&b.depth))
        });
        symbols
    }

    /// Sorted start lines of symbols, comments and docstrings
    pub fn boundary_lines(&self, tree: &SyntaxTree<'_>) -> BoundarySet {
        boundaries_from_symbols(&self.extract_symbols(tree))
    }
}

fn boundaries_from_symbols(symbols: &[Symbol]) -> BoundarySet {
    BoundarySet::from_lines(
        symbols
            .iter()
            .filter(|s| s.kind != SymbolKind::Attribute)
            .map(|s| s.line_start),
    )
}

fn make_symbol(
    node: Node,
    kind: SymbolKind,
    name: Option<String>,
    depth: usize,
    scope: &Option<Scope>,
) -> Symbol {
    let start = node.start_position();
    let end = node.end_position();
    // Nodes that swallow their trailing newline end at column 0 of the next row.
    let end_row = if end.column == 0 && end.row > start.row {
        end.row - 1
    } else {
        end.row
    };

    Symbol {
        name,
        kind,
        line_start: start.row + 1,
        line_end: end_row + 1,
        byte_start: node.start_byte(),
        byte_end: node.end_byte(),
        depth,
        parent: scope.as_ref().and_then(|s| s.name.clone()),
    }
}

/// Python string statements (module, class and function docstrings)
fn is_docstring(language: Language, node: Node) -> bool {
    language == Language::Python
        && node.kind() == "expression_statement"
        && node.named_child_count() == 1
        && node.named_child(0).is_some_and(|child| child.kind() == "string")
}

/// Name of a symbol: `name` field, the wrapped definition's name, first
/// identifier child, first identifier descendant, else `None`.
fn resolve_name(language: Language, kind: SymbolKind, node: Node, source: &str) -> Option<String> {
    if kind == SymbolKind::Section {
        let heading = node.named_child(0)?;
        if !heading.kind().ends_with("_heading") {
            return None;
        }
        return first_descendant_name(language, heading, source).map(|text| clean_heading(&text));
    }

    if language == Language::Rust && kind == SymbolKind::Impl {
        if let Some(target) = node.child_by_field_name("type") {
            return first_descendant_name(language, target, source)
                .or_else(|| node_text(target, source));
        }
    }

    if let Some(name) = node.child_by_field_name("name") {
        return node_text(name, source);
    }

    let wrapped = node
        .child_by_field_name("definition")
        .or_else(|| node.child_by_field_name("declaration"));
    if let Some(definition) = wrapped {
        return resolve_name(language, kind, definition, source);
    }

    let names = language.name_kinds();
    let mut cursor = node.walk();
    let direct = node
        .children(&mut cursor)
        .find(|child| names.contains(&child.kind()));
    if let Some(child) = direct {
        return node_text(child, source);
    }

    first_descendant_name(language, node, source)
}

fn first_descendant_name(language: Language, node: Node, source: &str) -> Option<String> {
    let names = language.name_kinds();
    let mut stack = vec![node];
    let mut visited = 0;

    while let Some(current) = stack.pop() {
        visited += 1;
        if visited > NAME_SEARCH_LIMIT {
            break;
        }
        if current.id() != node.id() && names.contains(&current.kind()) {
            return node_text(current, source);
        }
        let mut cursor = current.walk();
        let children: Vec<Node> = current.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    None
}

fn node_text(node: Node, source: &str) -> Option<String> {
    let text = source.get(node.start_byte()..node.end_byte())?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn clean_heading(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default();
    line.trim().trim_end_matches('#').trim().chars().take(MAX_NAME_CHARS).collect()
}

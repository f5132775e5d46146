use crate::error::ChunkerError;
use crate::types::SymbolKind;
use std::path::Path;

/// Language with a grammar the engine knows how to bind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Tsx,
    Rust,
    Go,
    Java,
    CSharp,
    Markdown,
}

/// Static extension table; every extension maps to exactly one language.
const EXTENSIONS: &[(&str, Language)] = &[
    ("py", Language::Python),
    ("pyw", Language::Python),
    ("js", Language::JavaScript),
    ("jsx", Language::JavaScript),
    ("mjs", Language::JavaScript),
    ("cjs", Language::JavaScript),
    ("ts", Language::TypeScript),
    ("tsx", Language::Tsx),
    ("rs", Language::Rust),
    ("go", Language::Go),
    ("java", Language::Java),
    ("cs", Language::CSharp),
    ("md", Language::Markdown),
    ("markdown", Language::Markdown),
];

impl Language {
    pub const ALL: [Self; 9] = [
        Self::Python,
        Self::JavaScript,
        Self::TypeScript,
        Self::Tsx,
        Self::Rust,
        Self::Go,
        Self::Java,
        Self::CSharp,
        Self::Markdown,
    ];

    /// Detect language from file extension (with or without the dot)
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_lowercase();
        EXTENSIONS
            .iter()
            .find(|(known, _)| *known == ext)
            .map(|(_, language)| *language)
    }

    /// Detect language from file path
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Resolve a language by its registry name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|language| language.as_str() == name)
    }

    /// Get language name as string
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Tsx => "tsx",
            Self::Rust => "rust",
            Self::Go => "go",
            Self::Java => "java",
            Self::CSharp => "c_sharp",
            Self::Markdown => "markdown",
        }
    }

    /// Extensions that resolve to this language
    pub fn extensions(self) -> Vec<&'static str> {
        EXTENSIONS
            .iter()
            .filter(|(_, language)| *language == self)
            .map(|(ext, _)| *ext)
            .collect()
    }

    /// Every known extension
    pub fn all_extensions() -> impl Iterator<Item = &'static str> {
        EXTENSIONS.iter().map(|(ext, _)| *ext)
    }

    /// Get Tree-sitter language instance
    pub fn tree_sitter_language(self) -> tree_sitter::Language {
        match self {
            Self::Python => tree_sitter_python::LANGUAGE.into(),
            Self::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Self::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Self::Rust => tree_sitter_rust::LANGUAGE.into(),
            Self::Go => tree_sitter_go::LANGUAGE.into(),
            Self::Java => tree_sitter_java::LANGUAGE.into(),
            Self::CSharp => tree_sitter_c_sharp::LANGUAGE.into(),
            Self::Markdown => tree_sitter_md::LANGUAGE.into(),
        }
    }

    pub const fn is_markup(self) -> bool {
        matches!(self, Self::Markdown)
    }

    /// Node kinds of interest and the symbol kind each one yields
    pub const fn node_kinds(self) -> &'static [(&'static str, SymbolKind)] {
        match self {
            Self::Python => PYTHON_NODES,
            Self::JavaScript => JAVASCRIPT_NODES,
            Self::TypeScript | Self::Tsx => TYPESCRIPT_NODES,
            Self::Rust => RUST_NODES,
            Self::Go => GO_NODES,
            Self::Java => JAVA_NODES,
            Self::CSharp => CSHARP_NODES,
            Self::Markdown => MARKDOWN_NODES,
        }
    }

    /// Symbol kind for a node kind, if the node is a point of interest
    pub fn symbol_kind(self, node_kind: &str) -> Option<SymbolKind> {
        self.node_kinds()
            .iter()
            .find(|(kind, _)| *kind == node_kind)
            .map(|(_, symbol)| *symbol)
    }

    /// Node kinds holding comments
    pub const fn comment_kinds(self) -> &'static [&'static str] {
        match self {
            Self::Rust | Self::Java => &["line_comment", "block_comment"],
            Self::Markdown => &[],
            _ => &["comment"],
        }
    }

    pub fn is_comment(self, node_kind: &str) -> bool {
        self.comment_kinds().contains(&node_kind)
    }

    /// Node kinds that annotate the item following them as siblings
    pub const fn attribute_kinds(self) -> &'static [&'static str] {
        match self {
            Self::Rust => &["attribute_item"],
            Self::JavaScript | Self::TypeScript | Self::Tsx => &["decorator"],
            _ => &[],
        }
    }

    pub fn is_attribute(self, node_kind: &str) -> bool {
        self.attribute_kinds().contains(&node_kind)
    }

    /// Node kinds accepted as a symbol's name
    pub const fn name_kinds(self) -> &'static [&'static str] {
        match self {
            Self::Markdown => &["inline"],
            _ => &[
                "identifier",
                "type_identifier",
                "name",
                "field_identifier",
                "property_identifier",
                "constant",
                "dotted_name",
                "scoped_identifier",
            ],
        }
    }
}

impl std::str::FromStr for Language {
    type Err = ChunkerError;

    /// Accepts a registry name (`python`, `c_sharp`, ...) or an extension
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::from_name(&needle)
            .or_else(|| Self::from_extension(&needle))
            .ok_or_else(|| ChunkerError::unsupported_language(s))
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const PYTHON_NODES: &[(&str, SymbolKind)] = &[
    ("import_statement", SymbolKind::Import),
    ("import_from_statement", SymbolKind::Import),
    ("future_import_statement", SymbolKind::Import),
    ("class_definition", SymbolKind::Class),
    ("function_definition", SymbolKind::Function),
    ("decorated_definition", SymbolKind::Decorated),
];

const JAVASCRIPT_NODES: &[(&str, SymbolKind)] = &[
    ("import_statement", SymbolKind::Import),
    ("export_statement", SymbolKind::Decorated),
    ("class_declaration", SymbolKind::Class),
    ("function_declaration", SymbolKind::Function),
    ("generator_function_declaration", SymbolKind::Function),
    ("method_definition", SymbolKind::Method),
];

const TYPESCRIPT_NODES: &[(&str, SymbolKind)] = &[
    ("import_statement", SymbolKind::Import),
    ("export_statement", SymbolKind::Decorated),
    ("class_declaration", SymbolKind::Class),
    ("abstract_class_declaration", SymbolKind::Class),
    ("function_declaration", SymbolKind::Function),
    ("generator_function_declaration", SymbolKind::Function),
    ("method_definition", SymbolKind::Method),
    ("interface_declaration", SymbolKind::Interface),
    ("enum_declaration", SymbolKind::Enum),
    ("type_alias_declaration", SymbolKind::TypeAlias),
    ("internal_module", SymbolKind::Module),
];

const RUST_NODES: &[(&str, SymbolKind)] = &[
    ("use_declaration", SymbolKind::Import),
    ("extern_crate_declaration", SymbolKind::Import),
    ("struct_item", SymbolKind::Struct),
    ("enum_item", SymbolKind::Enum),
    ("union_item", SymbolKind::Struct),
    ("trait_item", SymbolKind::Interface),
    ("impl_item", SymbolKind::Impl),
    ("mod_item", SymbolKind::Module),
    ("function_item", SymbolKind::Function),
    ("type_item", SymbolKind::TypeAlias),
    ("const_item", SymbolKind::Constant),
    ("static_item", SymbolKind::Constant),
    ("macro_definition", SymbolKind::Macro),
];

const GO_NODES: &[(&str, SymbolKind)] = &[
    ("import_declaration", SymbolKind::Import),
    ("function_declaration", SymbolKind::Function),
    ("method_declaration", SymbolKind::Method),
    ("type_declaration", SymbolKind::Struct),
    ("const_declaration", SymbolKind::Constant),
    ("var_declaration", SymbolKind::Constant),
];

const JAVA_NODES: &[(&str, SymbolKind)] = &[
    ("import_declaration", SymbolKind::Import),
    ("class_declaration", SymbolKind::Class),
    ("record_declaration", SymbolKind::Class),
    ("interface_declaration", SymbolKind::Interface),
    ("annotation_type_declaration", SymbolKind::Interface),
    ("enum_declaration", SymbolKind::Enum),
    ("method_declaration", SymbolKind::Method),
    ("constructor_declaration", SymbolKind::Method),
];

const CSHARP_NODES: &[(&str, SymbolKind)] = &[
    ("using_directive", SymbolKind::Import),
    ("namespace_declaration", SymbolKind::Module),
    ("file_scoped_namespace_declaration", SymbolKind::Module),
    ("class_declaration", SymbolKind::Class),
    ("record_declaration", SymbolKind::Class),
    ("struct_declaration", SymbolKind::Struct),
    ("interface_declaration", SymbolKind::Interface),
    ("enum_declaration", SymbolKind::Enum),
    ("method_declaration", SymbolKind::Method),
    ("constructor_declaration", SymbolKind::Method),
];

const MARKDOWN_NODES: &[(&str, SymbolKind)] = &[
    ("section", SymbolKind::Section),
    ("fenced_code_block", SymbolKind::CodeBlock),
];

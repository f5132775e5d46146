use semantic_chunker::{GrammarRegistry, Language, Symbol, SymbolKind, SyntaxAnalyzer};
use std::sync::Arc;

fn symbols(code: &str, extension: &str) -> Vec<Symbol> {
    let grammars = Arc::new(GrammarRegistry::with_languages([
        Language::Rust,
        Language::Python,
    ]));
    let analyzer = SyntaxAnalyzer::new(grammars);
    analyzer
        .analyze(code, extension)
        .expect("grammar loaded")
        .symbols
}

fn named<'a>(symbols: &'a [Symbol], name: &str) -> &'a Symbol {
    symbols
        .iter()
        .find(|s| s.name.as_deref() == Some(name))
        .unwrap_or_else(|| panic!("symbol {name} missing from {symbols:#?}"))
}

#[test]
fn extracts_methods_inside_module_impl() {
    let code = r"
mod api {
    pub struct Car;

    impl Car {
        pub fn drive(&self) {}
        fn stop(&self) {}
    }
}
";

    let symbols = symbols(code, "rs");
    let methods: Vec<_> = symbols
        .iter()
        .filter(|s| s.kind == SymbolKind::Method)
        .filter_map(|s| s.name.as_deref())
        .collect();
    assert_eq!(methods, vec!["drive", "stop"]);

    let module = named(&symbols, "api");
    assert_eq!(module.kind, SymbolKind::Module);
    assert_eq!(module.depth, 0);
    assert_eq!((module.line_start, module.line_end), (2, 9));

    let drive = named(&symbols, "drive");
    assert_eq!(drive.depth, 2);
    assert_eq!(drive.parent.as_deref(), Some("Car"));
    assert_eq!(drive.line_start, 6);
}

#[test]
fn impl_blocks_are_named_after_their_type() {
    let code = r"
struct Engine;

impl Default for Engine {
    fn default() -> Self {
        Engine
    }
}
";

    let symbols = symbols(code, "rs");
    let impls: Vec<_> = symbols
        .iter()
        .filter(|s| s.kind == SymbolKind::Impl)
        .collect();
    assert_eq!(impls.len(), 1);
    assert_eq!(impls[0].name.as_deref(), Some("Engine"));
    assert_eq!(named(&symbols, "default").kind, SymbolKind::Method);
}

#[test]
fn nested_python_functions_keep_their_parent() {
    let code = r#"
class Outer:
    """Outer docs."""

    def method(self):
        def helper():
            return 1
        return helper()
"#;

    let symbols = symbols(code, "py");
    let method = named(&symbols, "method");
    assert_eq!(method.kind, SymbolKind::Method);
    assert_eq!(method.parent.as_deref(), Some("Outer"));

    let helper = named(&symbols, "helper");
    assert_eq!(helper.kind, SymbolKind::Function);
    assert_eq!(helper.depth, 2);
    assert_eq!(helper.parent.as_deref(), Some("method"));

    let docstrings = symbols
        .iter()
        .filter(|s| s.kind == SymbolKind::Comment)
        .count();
    assert_eq!(docstrings, 1);
}

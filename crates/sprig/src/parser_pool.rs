//
// parser_pool.rs
//
// Thread-local tree-sitter Java parser pool
//

use std::cell::RefCell;
use std::time::Duration;

use tree_sitter::{Parser, Tree};

thread_local! {
    static PARSER: RefCell<Option<Parser>> = RefCell::new(new_java_parser());
}

fn new_java_parser() -> Option<Parser> {
    let mut parser = Parser::new();
    match parser.set_language(&tree_sitter_java::LANGUAGE.into()) {
        Ok(()) => Some(parser),
        Err(err) => {
            log::error!("Failed to load the Java grammar: {}", err);
            None
        }
    }
}

/// Execute a function with this thread's parser instance.
/// Returns `None` if the grammar could not be loaded on this thread.
pub fn with_parser<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&mut Parser) -> R,
{
    PARSER.with(|cell| cell.borrow_mut().as_mut().map(f))
}

/// Parse `text` with error recovery, giving up after `timeout`.
///
/// A zero timeout disables the limit. Returns `None` when the parse was
/// abandoned; the parser is reset so the next call starts fresh.
pub fn parse_with_timeout(text: &str, timeout: Duration) -> Option<Tree> {
    with_parser(|parser| {
        parser.set_timeout_micros(timeout.as_micros().min(u64::MAX as u128) as u64);
        let tree = parser.parse(text, None);
        if tree.is_none() {
            parser.reset();
        }
        tree
    })
    .flatten()
}

/// Named children of `node` without extras (comments), so positional
/// access into the list is reliable.
pub(crate) fn non_extra_named_children<'a>(
    node: tree_sitter::Node<'a>,
    cursor: &mut tree_sitter::TreeCursor<'a>,
) -> Vec<tree_sitter::Node<'a>> {
    node.named_children(cursor)
        .filter(|c| !c.is_extra())
        .collect()
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn java_snippet() -> impl Strategy<Value = String> {
        prop_oneof![
            "[A-Z][a-z]{0,6}".prop_map(|name| format!("class {} {{}}", name)),
            "[A-Z][a-z]{0,6}".prop_map(|name| format!("@Component class {} {{}}", name)),
            "[a-z]{1,6}".prop_map(|name| format!("package {};\nclass A {{}}", name)),
            Just("class A { @Bean B b() { return null; } }".to_string()),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_parser_reused_across_inputs(
            snippets in prop::collection::vec(java_snippet(), 1..8)
        ) {
            for snippet in &snippets {
                let tree = parse_with_timeout(snippet, Duration::from_secs(5));
                prop_assert!(tree.is_some(), "failed to parse: {}", snippet);
            }
        }
    }
}

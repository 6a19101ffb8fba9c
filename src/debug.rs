use std::fmt::Write;

use crate::tree::{NodeId, SyntaxTree};

/// Renders the tree one node per line, indented by depth.
///
/// Each line shows the node kind, the grammar's kind name and the byte range;
/// tokens also show their text.
#[must_use]
pub fn dump_tree(tree: &SyntaxTree) -> String {
    let mut out = String::new();
    dump_node(tree, tree.root(), 0, &mut out);
    out
}

fn dump_node(tree: &SyntaxTree, node: NodeId, depth: usize, out: &mut String) {
    let start = tree.offset(node);
    let end = start + tree.len(node);
    let _ = write!(
        out,
        "{}{}({})@{}..{}",
        "  ".repeat(depth),
        tree.kind(node).name(),
        tree.grammar_kind(node),
        start,
        end
    );
    match tree.token_text(node) {
        Some(text) => {
            let _ = writeln!(out, " {text:?}");
        }
        None => {
            out.push('\n');
            for &child in tree.children(node) {
                dump_node(tree, child, depth + 1, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::SupportedLanguage;
    use crate::parser::GrammarAdapter;

    #[test]
    fn dump_shows_nesting_and_token_text() {
        let tree = GrammarAdapter::init()
            .unwrap()
            .parse(SupportedLanguage::Java, "class A {}\n")
            .unwrap();
        let dump = dump_tree(&tree);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines[0], "PROGRAM(program)@0..11");
        assert!(lines.contains(&"      LBRACE({)@8..9 \"{\""));
        assert_eq!(lines.last(), Some(&"  WHITE_SPACE(WHITE_SPACE)@10..11 \"\\n\""));
    }
}

//! Built-in formatting rules.

mod line_breaker;
mod whitespace;

pub use line_breaker::LineBreaker;
pub use whitespace::WhitespaceRule;

use crate::formatter::FormatOptions;
use crate::rule::Rule;

/// The rule set used by the command line, in execution order.
#[must_use]
pub fn default_rules(options: &FormatOptions) -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(LineBreaker::new(options)),
        Box::new(WhitespaceRule::new()),
    ]
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::context::PassContext;
    use crate::diagnostics::{CollectingReporter, Correction};
    use crate::formatter::run_rule;
    use crate::language::SupportedLanguage;
    use crate::parser::GrammarAdapter;
    use crate::rule::Rule;
    use crate::tree::SyntaxTree;

    pub struct PassOutcome {
        pub text: String,
        pub corrections: Vec<Correction>,
        pub rescan: bool,
        pub full_reparse: bool,
    }

    pub fn parse(source: &str) -> SyntaxTree {
        GrammarAdapter::init()
            .unwrap()
            .parse(SupportedLanguage::Java, source)
            .unwrap()
    }

    /// Runs one traversal of `rule` over a fresh parse of `source`.
    pub fn run_pass(source: &str, rule: &mut dyn Rule, scan: usize) -> PassOutcome {
        let mut reporter = CollectingReporter::new();
        let (text, rescan, full_reparse) = {
            let mut ctx = PassContext::new(
                "Test.java",
                parse(source),
                SupportedLanguage::Java,
                1,
                scan,
                &mut reporter,
            );
            run_rule(&mut ctx, rule).unwrap();
            let flags = (ctx.rescan_requested(), ctx.full_reparse_requested());
            let tree = ctx.into_tree();
            (tree.text(tree.root()), flags.0, flags.1)
        };
        PassOutcome {
            text,
            corrections: reporter.into_corrections(),
            rescan,
            full_reparse,
        }
    }

    pub fn run_once(source: &str, mut rule: impl Rule) -> (String, Vec<Correction>) {
        let outcome = run_pass(source, &mut rule, 1);
        (outcome.text, outcome.corrections)
    }
}

//! Scopes every ruleset under a root selector: `a, .b` becomes
//! `.app a, .app .b`.

use crate::ast::*;
use crate::visitor::{self, TreeVisitor};

pub struct RootSelectorPrefix<'a> {
    root: &'a str,
    ruleset_depth: usize,
    prefixed: usize,
}

impl<'a> RootSelectorPrefix<'a> {
    pub fn new(root: &'a str) -> Self {
        Self {
            root,
            ruleset_depth: 0,
            prefixed: 0,
        }
    }

    pub fn run(&mut self, sheet: &mut Stylesheet) {
        visitor::walk(sheet, self);
    }

    pub fn prefixed_rulesets(&self) -> usize {
        self.prefixed
    }

    /// True for `.app`, `.app:hover` or `.app > a`, false for `.app-header`.
    fn is_scoped(&self, selector: &str) -> bool {
        match selector.strip_prefix(self.root) {
            Some(rest) => !rest.starts_with(|c: char| c.is_alphanumeric() || c == '-' || c == '_'),
            None => false,
        }
    }
}

impl TreeVisitor for RootSelectorPrefix<'_> {
    fn enter_ruleset(&mut self, ruleset: &mut Ruleset) -> bool {
        self.ruleset_depth += 1;
        if self.ruleset_depth > 1 || self.root.is_empty() {
            return true;
        }
        if ruleset.selectors.iter().any(|s| self.is_scoped(s)) {
            return true;
        }

        for selector in &mut ruleset.selectors {
            *selector = format!("{} {}", self.root, selector);
        }
        self.prefixed += 1;
        true
    }

    fn leave_ruleset(&mut self, _ruleset: &Ruleset) {
        self.ruleset_depth -= 1;
    }

    // Keyframe selectors (`from`, `50%`) are not element selectors.
    fn enter_at_rule(&mut self, rule: &mut AtRule) -> bool {
        !rule.name.ends_with("keyframes")
    }

    fn enter_mixin_definition(&mut self, _mixin: &MixinDefinition) -> bool {
        false
    }

    fn leave_tree(&mut self, _sheet: &Stylesheet) {
        log::debug!("Scoped {} rulesets under '{}'", self.prefixed, self.root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_stylesheet;

    fn selectors(sheet: &Stylesheet) -> Vec<Vec<String>> {
        let mut all = Vec::new();
        collect(&sheet.items, &mut all);
        all
    }

    fn collect(items: &[Node], all: &mut Vec<Vec<String>>) {
        for node in items {
            match node {
                Node::Ruleset(ruleset) => {
                    all.push(ruleset.selectors.clone());
                    collect(&ruleset.block.items, all);
                }
                Node::AtRule(rule) => {
                    if let Some(block) = &rule.block {
                        collect(&block.items, all);
                    }
                }
                _ => {}
            }
        }
    }

    #[test]
    fn test_prefixes_each_selector() {
        let mut sheet = parse_stylesheet("a, .b:hover { color: red; } @media print { p { order: 1; } }", "test.css").unwrap();
        let mut pass = RootSelectorPrefix::new(".app");
        pass.run(&mut sheet);

        assert_eq!(
            selectors(&sheet),
            vec![
                vec![".app a".to_string(), ".app .b:hover".to_string()],
                vec![".app p".to_string()],
            ]
        );
        assert_eq!(pass.prefixed_rulesets(), 2);
    }

    #[test]
    fn test_already_scoped_rulesets_are_untouched() {
        let mut sheet = parse_stylesheet(".app .a { order: 1; } .app-header { order: 2; }", "test.css").unwrap();
        RootSelectorPrefix::new(".app").run(&mut sheet);

        assert_eq!(
            selectors(&sheet),
            vec![vec![".app .a".to_string()], vec![".app .app-header".to_string()]]
        );
    }

    #[test]
    fn test_keyframes_are_skipped() {
        let mut sheet = parse_stylesheet("@keyframes spin { from { order: 0; } to { order: 1; } }", "test.css").unwrap();
        RootSelectorPrefix::new("#root").run(&mut sheet);
        assert_eq!(selectors(&sheet), vec![vec!["from".to_string()], vec!["to".to_string()]]);
    }
}

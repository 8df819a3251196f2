//! Automatic vendor prefix expansion
//!
//! Visits every declaration outside of `@defmixin` blocks, finds the first
//! rule of the table that produces at least one extra declaration, and
//! replaces the declaration with itself followed by the synthesized
//! variants. Each synthesized declaration carries a [`Provenance`] so the
//! pruning pass can tell it apart from authored ones later.

use crate::ast::*;
use crate::manifest::SupportManifest;
use crate::prefix_map::PrefixMap;
use crate::rules::{ExpansionRule, RuleKind};
use crate::visitor::{self, BlockCursor, TreeVisitor, VisitAction};
use serde::Serialize;

/// What made a rule fire, used to decide which fact to record.
#[derive(Debug, Clone, PartialEq, Eq)]
enum MatchKind {
    Name,
    Value,
    ValueFunction(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExpansionStats {
    pub declarations_visited: usize,
    pub declarations_expanded: usize,
    pub declarations_synthesized: usize,
    pub skipped_in_mixins: usize,
}

pub struct ExpansionPass<'a> {
    rules: &'a [ExpansionRule],
    prefix_map: &'a mut PrefixMap,
    manifest: Option<&'a SupportManifest>,
    in_mixin_definition: bool,
    /// Property -> shortest value seen for name-only expansions, flushed
    /// when the traversal ends.
    deferred_name_facts: Vec<(String, String)>,
    stats: ExpansionStats,
}

impl<'a> ExpansionPass<'a> {
    pub fn new(rules: &'a [ExpansionRule], prefix_map: &'a mut PrefixMap) -> Self {
        Self {
            rules,
            prefix_map,
            manifest: None,
            in_mixin_definition: false,
            deferred_name_facts: Vec::new(),
            stats: ExpansionStats::default(),
        }
    }

    /// Function rewrites whose function name is a manifest key are not
    /// recorded as facts.
    pub fn with_manifest(mut self, manifest: &'a SupportManifest) -> Self {
        self.manifest = Some(manifest);
        self
    }

    pub fn run(&mut self, sheet: &mut Stylesheet) {
        visitor::walk(sheet, self);
    }

    pub fn stats(&self) -> &ExpansionStats {
        &self.stats
    }

    fn expand(
        &mut self,
        rule: &ExpansionRule,
        declaration: &Declaration,
        cursor: &BlockCursor<'_>,
    ) -> Option<(Vec<Declaration>, MatchKind)> {
        let (expansions, kind) = match (rule.kind(), rule.match_property_value()) {
            (RuleKind::NameOnly, _) => (self.expand_by_name(rule, declaration, cursor), MatchKind::Name),
            (RuleKind::Value, Some(value)) => (
                self.expand_by_value(rule, value, declaration, cursor),
                MatchKind::Value,
            ),
            (RuleKind::Function, Some(function)) if rule.is_value_only() => {
                if !has_matching_function(declaration, function) {
                    return None;
                }
                (
                    expand_value_functions(rule, function, declaration),
                    MatchKind::ValueFunction(function.to_string()),
                )
            }
            (RuleKind::Function, Some(function)) => {
                (expand_leading_function(rule, function, declaration), MatchKind::Value)
            }
            (_, None) => return None,
        };

        if expansions.is_empty() {
            None
        } else {
            Some((expansions, kind))
        }
    }

    /// `flex-grow: 1` -> `-webkit-flex-grow: 1`, unless the block already
    /// declares the alternate name.
    fn expand_by_name(
        &mut self,
        rule: &ExpansionRule,
        declaration: &Declaration,
        cursor: &BlockCursor<'_>,
    ) -> Vec<Declaration> {
        let mut expansions = Vec::new();

        for name in rule.expansion_names() {
            if cursor.has_sibling_named(name) {
                self.prefix_map
                    .add_alternative_property_name(&declaration.property, name);
                continue;
            }

            let mut expansion = declaration.clone();
            expansion.property = name.clone();
            expansion.append_comment(Comment::alternate_marker());
            expansion.provenance = Provenance::ExpandedFromProperty {
                property: declaration.property.clone(),
            };
            expansions.push(expansion);
        }

        expansions
    }

    /// `display: flex` -> `display: -webkit-box`. The value must be the
    /// single literal of the declaration, optionally followed by
    /// `!important`, which the expansions keep.
    fn expand_by_value(
        &mut self,
        rule: &ExpansionRule,
        matched: &str,
        declaration: &Declaration,
        cursor: &BlockCursor<'_>,
    ) -> Vec<Declaration> {
        match declaration.value.without_priority() {
            [ValueNode::Literal(text)] if text == matched => {}
            _ => return Vec::new(),
        }

        let priority = declaration.value.priority().cloned();
        let provenance = Provenance::ExpandedFromValue {
            value: matched.to_string(),
            property: rule.match_property_name().map(str::to_string),
        };
        let with_priority = |text: &str| {
            let mut value = PropertyValue::literal(text);
            if let Some(priority) = &priority {
                value.push(priority.clone());
            }
            value
        };

        let mut expansions = Vec::new();

        for alternate in rule.expansion_values() {
            let mut expansion = Declaration::new(
                declaration.property.clone(),
                with_priority(alternate),
                declaration.location,
            );
            expansion.append_comment(Comment::alternate_marker());
            expansion.provenance = provenance.clone();
            expansions.push(expansion);
        }

        for name in rule.expansion_names() {
            let value = with_priority(matched);
            if let Some(existing) = cursor.sibling_with_value(name, &value.to_string()) {
                self.prefix_map.add_property(name, &existing, Some(matched));
                continue;
            }

            let mut expansion = Declaration::new(name.clone(), value, declaration.location);
            expansion.append_comment(Comment::alternate_marker());
            expansion.provenance = provenance.clone();
            expansions.push(expansion);
        }

        expansions
    }

    fn record_fact(&mut self, kind: &MatchKind, declaration: &Declaration) {
        let name = declaration.property.as_str();
        let value = declaration.value.text_without_priority();

        match kind {
            MatchKind::ValueFunction(function) => {
                let listed = self
                    .manifest
                    .map_or(false, |manifest| manifest.contains_property(function));
                if !listed {
                    self.prefix_map.add_value_function(function, name, &value);
                }
            }
            MatchKind::Name => {
                match self.deferred_name_facts.iter_mut().find(|(n, _)| *n == name) {
                    Some((_, current)) => {
                        if value.len() < current.len() {
                            *current = value;
                        }
                    }
                    None => self.deferred_name_facts.push((name.to_string(), value)),
                }
            }
            MatchKind::Value => self.prefix_map.add_property(name, &value, Some(&value)),
        }
    }
}

impl TreeVisitor for ExpansionPass<'_> {
    fn enter_mixin_definition(&mut self, _mixin: &MixinDefinition) -> bool {
        self.in_mixin_definition = true;
        true
    }

    fn leave_mixin_definition(&mut self, _mixin: &MixinDefinition) {
        self.in_mixin_definition = false;
    }

    fn leave_tree(&mut self, _sheet: &Stylesheet) {
        for (name, value) in self.deferred_name_facts.drain(..) {
            self.prefix_map.add_property(&name, &value, None);
        }
        log::debug!(
            "Prefix expansion: {} declarations visited, {} expanded into {} new declarations",
            self.stats.declarations_visited,
            self.stats.declarations_expanded,
            self.stats.declarations_synthesized
        );
    }

    fn enter_declaration(&mut self, declaration: &Declaration, cursor: &BlockCursor<'_>) -> VisitAction {
        // Mixin bodies are expanded where the mixin is used, not here.
        if self.in_mixin_definition {
            self.stats.skipped_in_mixins += 1;
            return VisitAction::Continue;
        }
        self.stats.declarations_visited += 1;

        let rules = self.rules;
        for rule in rules {
            if !rule.applies_to(&declaration.property) {
                continue;
            }
            let Some((expansions, kind)) = self.expand(rule, declaration, cursor) else {
                continue;
            };

            debug_assert!(expansions.iter().all(Declaration::is_auto_expanded));
            log::trace!(
                "Expanded '{}: {}' at line {} into {} declarations",
                declaration.property,
                declaration.value,
                declaration.location.line,
                expansions.len()
            );

            self.stats.declarations_expanded += 1;
            self.stats.declarations_synthesized += expansions.len();
            self.record_fact(&kind, declaration);

            let mut nodes = Vec::with_capacity(expansions.len() + 1);
            nodes.push(Node::Declaration(declaration.clone()));
            nodes.extend(expansions.into_iter().map(Node::Declaration));
            return VisitAction::replace(nodes);
        }

        VisitAction::Continue
    }
}

fn has_matching_function(declaration: &Declaration, function: &str) -> bool {
    declaration
        .value
        .nodes
        .iter()
        .any(|node| node.function_name() == Some(function))
}

/// `margin: calc(X) calc(Y)` -> `margin: -webkit-calc(X) -webkit-calc(Y)`,
/// one declaration per replacement name.
fn expand_value_functions(rule: &ExpansionRule, function: &str, declaration: &Declaration) -> Vec<Declaration> {
    let provenance = Provenance::ExpandedFromValue {
        value: function.to_string(),
        property: rule.match_property_name().map(str::to_string),
    };

    rule.expansion_values()
        .iter()
        .map(|replacement| {
            let nodes = declaration
                .value
                .nodes
                .iter()
                .map(|node| match node {
                    ValueNode::Function { name, arguments } if name == function => {
                        ValueNode::function(replacement.as_str(), arguments.as_str())
                    }
                    other => other.clone(),
                })
                .collect();

            let mut expansion = Declaration::new(
                declaration.property.clone(),
                PropertyValue::new(nodes),
                declaration.location,
            )
            .with_comments(declaration.comments.clone());
            expansion.append_comment(Comment::alternate_marker());
            expansion.provenance = provenance.clone();
            expansion
        })
        .collect()
}

/// Rules bound to a property whose value starts with the function, e.g.
/// `background-image: linear-gradient(ARGS)`. Each expansion name (or the
/// declaration's own name) is paired with each replacement function name
/// (or the matched one); arguments are carried across.
fn expand_leading_function(rule: &ExpansionRule, function: &str, declaration: &Declaration) -> Vec<Declaration> {
    let Some(leading) = declaration.value.first() else {
        return Vec::new();
    };
    if leading.function_name() != Some(function) {
        return Vec::new();
    }

    let names: Vec<&str> = if rule.expansion_names().is_empty() {
        vec![declaration.property.as_str()]
    } else {
        rule.expansion_names().iter().map(String::as_str).collect()
    };
    let functions: Vec<&str> = if rule.expansion_values().is_empty() {
        vec![function]
    } else {
        rule.expansion_values().iter().map(String::as_str).collect()
    };
    let provenance = Provenance::ExpandedFromValue {
        value: function.to_string(),
        property: rule.match_property_name().map(str::to_string),
    };

    let mut expansions = Vec::new();
    for name in &names {
        for replacement in &functions {
            if *name == declaration.property && *replacement == function {
                continue;
            }
            let Some(renamed) = leading.renamed(replacement) else {
                continue;
            };
            let mut nodes = vec![renamed];
            nodes.extend(declaration.value.nodes[1..].iter().cloned());

            let mut expansion = Declaration::new(*name, PropertyValue::new(nodes), declaration.location);
            expansion.append_comment(Comment::alternate_marker());
            expansion.provenance = provenance.clone();
            expansions.push(expansion);
        }
    }
    expansions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_stylesheet;
    use crate::printer::print_stylesheet;
    use crate::rules::default_rules;

    fn expand_with(rules: &[ExpansionRule], source: &str) -> (Stylesheet, PrefixMap) {
        let mut sheet = parse_stylesheet(source, "test.css").unwrap();
        let mut prefix_map = PrefixMap::new();
        ExpansionPass::new(rules, &mut prefix_map).run(&mut sheet);
        (sheet, prefix_map)
    }

    fn expand(source: &str) -> (Stylesheet, PrefixMap) {
        expand_with(default_rules(), source)
    }

    fn declarations(sheet: &Stylesheet) -> Vec<Declaration> {
        match &sheet.items[0] {
            Node::Ruleset(ruleset) => ruleset.block.declarations().cloned().collect(),
            other => panic!("Expected ruleset, got {:?}", other),
        }
    }

    fn pairs(sheet: &Stylesheet) -> Vec<String> {
        declarations(sheet)
            .iter()
            .map(|d| format!("{}: {}", d.property, d.value))
            .collect()
    }

    #[test]
    fn test_display_flex_expansion() {
        let (sheet, prefix_map) = expand("a { display: flex; }");
        assert_eq!(
            pairs(&sheet),
            vec![
                "display: flex",
                "display: -webkit-box",
                "display: -moz-box",
                "display: -webkit-flex",
                "display: -ms-flexbox",
            ]
        );

        let decls = declarations(&sheet);
        assert_eq!(decls[0].provenance, Provenance::Original);
        for synthesized in &decls[1..] {
            assert_eq!(synthesized.provenance.expanded_from_value(), Some("flex"));
            assert_eq!(synthesized.provenance.expanded_from_property(), None);
            assert_eq!(synthesized.comments, vec![Comment::alternate_marker()]);
        }
        assert_eq!(prefix_map.values("display", Some("flex")), Some(&["flex".to_string()][..]));
    }

    #[test]
    fn test_unmatched_declarations_are_untouched() {
        let source = "a { color: red; margin: 0 auto; display: block; }";
        let (sheet, prefix_map) = expand(source);
        assert_eq!(sheet, parse_stylesheet(source, "test.css").unwrap());
        assert!(prefix_map.is_empty());
    }

    #[test]
    fn test_name_only_expansion_copies_value_and_comments() {
        let (sheet, _) = expand("a { /* spin */ transform: rotate(45deg) !important; }");
        let decls = declarations(&sheet);
        assert_eq!(
            pairs(&sheet),
            vec![
                "transform: rotate(45deg) !important",
                "-webkit-transform: rotate(45deg) !important",
                "-ms-transform: rotate(45deg) !important",
                "-o-transform: rotate(45deg) !important",
            ]
        );
        assert_eq!(
            decls[1].comments,
            vec![Comment::new("/* spin */"), Comment::alternate_marker()]
        );
        assert_eq!(decls[1].provenance.expanded_from_property(), Some("transform"));
        assert_eq!(decls[1].location, decls[0].location);
    }

    #[test]
    fn test_name_only_skips_existing_alternates() {
        let (sheet, prefix_map) = expand("a { -ms-hyphens: auto; hyphens: auto; }");
        assert_eq!(
            pairs(&sheet),
            vec![
                "-ms-hyphens: auto",
                "hyphens: auto",
                "-webkit-hyphens: auto",
                "-moz-hyphens: auto",
            ]
        );
        assert_eq!(
            prefix_map.alternative_names("hyphens"),
            Some(&["-ms-hyphens".to_string()][..])
        );
    }

    #[test]
    fn test_value_priority_is_preserved() {
        let (sheet, _) = expand("a { position: sticky !important; }");
        assert_eq!(
            pairs(&sheet),
            vec!["position: sticky !important", "position: -webkit-sticky !important"]
        );
    }

    #[test]
    fn test_value_must_be_single_literal() {
        let (sheet, _) = expand("a { display: flex flex; cursor: pointer; }");
        assert_eq!(pairs(&sheet), vec!["display: flex flex", "cursor: pointer"]);
    }

    #[test]
    fn test_gradient_function_rewrite() {
        let (sheet, prefix_map) = expand("a { background-image: linear-gradient(red, blue); }");
        assert_eq!(
            pairs(&sheet),
            vec![
                "background-image: linear-gradient(red, blue)",
                "background-image: -webkit-linear-gradient(red, blue)",
                "background-image: -moz-linear-gradient(red, blue)",
                "background-image: -ms-linear-gradient(red, blue)",
                "background-image: -o-linear-gradient(red, blue)",
            ]
        );
        for synthesized in &declarations(&sheet)[1..] {
            assert_eq!(
                synthesized.provenance,
                Provenance::ExpandedFromValue {
                    value: "linear-gradient".to_string(),
                    property: None,
                }
            );
        }
        assert_eq!(
            prefix_map.value_function("linear-gradient"),
            Some(("background-image", "linear-gradient(red, blue)"))
        );
    }

    #[test]
    fn test_every_matching_function_is_rewritten() {
        let (sheet, _) = expand("a { margin: calc(1px + 2px) 0 calc(3px * 2); }");
        assert_eq!(
            pairs(&sheet),
            vec![
                "margin: calc(1px + 2px) 0 calc(3px * 2)",
                "margin: -webkit-calc(1px + 2px) 0 -webkit-calc(3px * 2)",
                "margin: -moz-calc(1px + 2px) 0 -moz-calc(3px * 2)",
            ]
        );
    }

    #[test]
    fn test_listed_function_fact_is_not_recorded() {
        let mut sheet = parse_stylesheet("a { width: calc(100% - 1px); }", "test.css").unwrap();
        let mut prefix_map = PrefixMap::new();
        let manifest = SupportManifest::new().allow_any("calc");
        ExpansionPass::new(default_rules(), &mut prefix_map)
            .with_manifest(&manifest)
            .run(&mut sheet);

        assert_eq!(declarations(&sheet).len(), 3);
        assert_eq!(prefix_map.value_function("calc"), None);
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let rules = vec![
            ExpansionRule::builder()
                .match_property_name("user-select")
                .expand_property_name("-first-user-select")
                .build(),
            ExpansionRule::builder()
                .match_property_name("user-select")
                .expand_property_name("-second-user-select")
                .build(),
        ];
        let (sheet, _) = expand_with(&rules, "a { user-select: none; }");
        assert_eq!(pairs(&sheet), vec!["user-select: none", "-first-user-select: none"]);
    }

    #[test]
    fn test_rule_yielding_nothing_falls_through() {
        let rules = vec![
            ExpansionRule::builder()
                .match_property_name("user-select")
                .expand_property_name("-webkit-user-select")
                .build(),
            ExpansionRule::builder()
                .match_property_name("user-select")
                .expand_property_name("-moz-user-select")
                .build(),
        ];
        let (sheet, prefix_map) =
            expand_with(&rules, "a { -webkit-user-select: none; user-select: none; }");
        assert_eq!(
            pairs(&sheet),
            vec!["-webkit-user-select: none", "user-select: none", "-moz-user-select: none"]
        );
        assert_eq!(
            prefix_map.alternative_names("user-select"),
            Some(&["-webkit-user-select".to_string()][..])
        );
    }

    #[test]
    fn test_mixin_definitions_are_not_expanded() {
        let source = "@defmixin box(DIR) { display: flex; flex-direction: DIR; } a { order: 1; }";
        let (sheet, _) = expand(source);
        match &sheet.items[0] {
            Node::MixinDefinition(mixin) => assert_eq!(mixin.block.items.len(), 2),
            other => panic!("Expected mixin definition, got {:?}", other),
        }
        match &sheet.items[1] {
            Node::Ruleset(ruleset) => assert_eq!(ruleset.block.items.len(), 5),
            other => panic!("Expected ruleset, got {:?}", other),
        }
    }

    #[test]
    fn test_name_only_facts_are_deferred_shortest_first() {
        let (_, prefix_map) = expand("a { flex: 1 1 auto; } b { flex: 1; } c { flex: 2 0; }");
        assert_eq!(prefix_map.values("flex", None), Some(&["1".to_string()][..]));
        assert_eq!(prefix_map.flatten().get("flex").unwrap(), &["1".to_string()]);
    }

    #[test]
    fn test_value_rule_name_expansions() {
        let rules = vec![ExpansionRule::builder()
            .match_property_name("display")
            .match_property_value("box")
            .expand_property_value("-webkit-box")
            .expand_property_name("-legacy-display")
            .expand_property_name("-old-display")
            .build()];

        let (sheet, prefix_map) = expand_with(&rules, "a { display: box; -old-display: box; }");
        assert_eq!(
            pairs(&sheet),
            vec![
                "display: box",
                "display: -webkit-box",
                "-legacy-display: box",
                "-old-display: box",
            ]
        );
        assert_eq!(prefix_map.values("-old-display", Some("box")), Some(&["box".to_string()][..]));
    }

    #[test]
    fn test_leading_function_rule() {
        let rules = vec![ExpansionRule::builder()
            .match_property_name("background")
            .match_property_value("image-set")
            .is_function(true)
            .expand_property_value("-webkit-image-set")
            .build()];

        let (sheet, _) = expand_with(&rules, "a { background: image-set(\"a.png\" 1x) no-repeat; }");
        assert_eq!(
            pairs(&sheet),
            vec![
                "background: image-set(\"a.png\" 1x) no-repeat",
                "background: -webkit-image-set(\"a.png\" 1x) no-repeat",
            ]
        );
        assert_eq!(
            declarations(&sheet)[1].provenance,
            Provenance::ExpandedFromValue {
                value: "image-set".to_string(),
                property: Some("background".to_string()),
            }
        );
    }

    #[test]
    fn test_leading_function_must_come_first() {
        let rules = vec![ExpansionRule::builder()
            .match_property_name("background")
            .match_property_value("image-set")
            .is_function(true)
            .expand_property_value("-webkit-image-set")
            .build()];

        let (sheet, _) = expand_with(&rules, "a { background: red image-set(\"a.png\" 1x); }");
        assert_eq!(declarations(&sheet).len(), 1);
    }

    #[test]
    fn test_synthesized_declarations_have_single_provenance() {
        let source = "a { display: flex; flex: 1; width: calc(1px + 1px); cursor: grab; }";
        let (sheet, _) = expand(source);
        for declaration in declarations(&sheet) {
            match &declaration.provenance {
                Provenance::Original => assert!(!declaration.is_auto_expanded()),
                Provenance::ExpandedFromProperty { .. } => {
                    assert!(declaration.is_auto_expanded());
                    assert!(declaration.provenance.expanded_from_value().is_none());
                }
                Provenance::ExpandedFromValue { .. } => {
                    assert!(declaration.is_auto_expanded());
                    assert!(declaration.provenance.expanded_from_property().is_none());
                }
            }
        }
    }

    #[test]
    fn test_expanded_output_prints() {
        let (sheet, _) = expand("a { cursor: grab; }");
        let css = print_stylesheet(&sheet, false);
        assert_eq!(css, "a{cursor:grab;cursor:-moz-grab;cursor:-webkit-grab}");
    }
}

//! Catalog of vendor prefix expansion rules
//!
//! Three kinds of rules are supported:
//!
//! 1. Name only: `flex-grow: VALUE` gains `-webkit-flex-grow: VALUE`.
//! 2. Name and literal value: `display: flex` gains `display: -webkit-box`.
//! 3. Function value: `linear-gradient(ARGS)` anywhere in a value gains
//!    `-webkit-linear-gradient(ARGS)`.
//!
//! Rules are consulted in table order and the first rule that expands a
//! declaration wins, so the order of [`default_rules`] is significant.

use serde::Serialize;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpansionRule {
    match_property_name: Option<String>,
    match_property_value: Option<String>,
    is_function: bool,
    expansion_names: Vec<String>,
    expansion_values: Vec<String>,
}

/// How a rule matches, derived from which fields it sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    NameOnly,
    Value,
    Function,
}

impl ExpansionRule {
    pub fn builder() -> ExpansionRuleBuilder {
        ExpansionRuleBuilder::default()
    }

    pub fn match_property_name(&self) -> Option<&str> {
        self.match_property_name.as_deref()
    }

    pub fn match_property_value(&self) -> Option<&str> {
        self.match_property_value.as_deref()
    }

    pub fn is_function(&self) -> bool {
        self.is_function
    }

    pub fn expansion_names(&self) -> &[String] {
        &self.expansion_names
    }

    pub fn expansion_values(&self) -> &[String] {
        &self.expansion_values
    }

    pub fn kind(&self) -> RuleKind {
        match (&self.match_property_value, self.is_function) {
            (None, _) => RuleKind::NameOnly,
            (Some(_), false) => RuleKind::Value,
            (Some(_), true) => RuleKind::Function,
        }
    }

    /// A value rule without a required property name applies to any property.
    pub fn is_value_only(&self) -> bool {
        self.match_property_name.is_none() && self.match_property_value.is_some()
    }

    /// A rule that names a property only applies to declarations of it.
    pub fn applies_to(&self, property: &str) -> bool {
        self.match_property_name
            .as_deref()
            .map_or(true, |name| name == property)
    }
}

#[derive(Debug, Default)]
pub struct ExpansionRuleBuilder {
    match_property_name: Option<String>,
    match_property_value: Option<String>,
    is_function: bool,
    expansion_names: Vec<String>,
    expansion_values: Vec<String>,
}

impl ExpansionRuleBuilder {
    pub fn match_property_name(mut self, name: impl Into<String>) -> Self {
        self.match_property_name = Some(name.into());
        self
    }

    pub fn match_property_value(mut self, value: impl Into<String>) -> Self {
        self.match_property_value = Some(value.into());
        self
    }

    pub fn is_function(mut self, is_function: bool) -> Self {
        self.is_function = is_function;
        self
    }

    pub fn expand_property_name(mut self, name: impl Into<String>) -> Self {
        self.expansion_names.push(name.into());
        self
    }

    pub fn expand_property_value(mut self, value: impl Into<String>) -> Self {
        self.expansion_values.push(value.into());
        self
    }

    pub fn build(self) -> ExpansionRule {
        ExpansionRule {
            match_property_name: self.match_property_name,
            match_property_value: self.match_property_value,
            is_function: self.is_function,
            expansion_names: self.expansion_names,
            expansion_values: self.expansion_values,
        }
    }
}

/// The default rule table, built on first use.
pub fn default_rules() -> &'static [ExpansionRule] {
    static RULES: OnceLock<Vec<ExpansionRule>> = OnceLock::new();
    RULES.get_or_init(build_default_rules)
}

fn name_rule(name: &str, expansions: &[&str]) -> ExpansionRule {
    expansions
        .iter()
        .fold(ExpansionRule::builder().match_property_name(name), |b, e| {
            b.expand_property_name(*e)
        })
        .build()
}

fn value_rule(name: &str, value: &str, expansions: &[&str]) -> ExpansionRule {
    expansions
        .iter()
        .fold(
            ExpansionRule::builder()
                .match_property_name(name)
                .match_property_value(value),
            |b, e| b.expand_property_value(*e),
        )
        .build()
}

fn function_rule(function: &str, expansions: &[&str]) -> ExpansionRule {
    expansions
        .iter()
        .fold(
            ExpansionRule::builder()
                .match_property_value(function)
                .is_function(true),
            |b, e| b.expand_property_value(*e),
        )
        .build()
}

fn build_default_rules() -> Vec<ExpansionRule> {
    vec![
        // Flexbox
        value_rule("display", "flex", &["-webkit-box", "-moz-box", "-webkit-flex", "-ms-flexbox"]),
        value_rule(
            "display",
            "inline-flex",
            &["-webkit-inline-box", "-webkit-inline-flex", "-ms-inline-flexbox"],
        ),
        name_rule("flex-flow", &["-ms-flex-flow", "-webkit-flex-flow"]),
        name_rule("flex-direction", &["-ms-flex-direction", "-webkit-flex-direction"]),
        name_rule("flex-wrap", &["-moz-flex-wrap", "-ms-flex-wrap", "-webkit-flex-wrap"]),
        name_rule("flex", &["-webkit-box-flex", "-moz-box-flex", "-ms-flex", "-webkit-flex"]),
        // Chrome 21, Safari 7, IE 10 and older
        name_rule(
            "order",
            &["-webkit-box-ordinal-group", "-moz-box-ordinal-group", "-ms-flex-order", "-webkit-order"],
        ),
        // Safari 7, Chrome 21 and older
        name_rule("flex-basis", &["-webkit-flex-basis", "-ms-flex-preferred-size"]),
        name_rule(
            "flex-grow",
            &["-webkit-box-flex", "box-flex", "-ms-flex-positive", "-webkit-flex-grow"],
        ),
        name_rule("flex-shrink", &["-ms-flex-negative", "-webkit-flex-shrink"]),
        name_rule("align-content", &["-webkit-align-content"]),
        name_rule("align-items", &["-webkit-align-items"]),
        name_rule("align-self", &["-webkit-align-self", "-ms-grid-row-align"]),
        name_rule("justify-content", &["-webkit-justify-content"]),
        name_rule(
            "text-size-adjust",
            &["-webkit-text-size-adjust", "-moz-text-size-adjust", "-ms-text-size-adjust"],
        ),
        // Animation
        name_rule("animation", &["-webkit-animation", "-o-animation"]),
        name_rule("animation-delay", &["-webkit-animation-delay", "-o-animation-delay"]),
        name_rule("animation-direction", &["-webkit-animation-direction", "-o-animation-direction"]),
        name_rule("animation-duration", &["-webkit-animation-duration", "-o-animation-duration"]),
        name_rule("animation-fill-mode", &["-webkit-animation-fill-mode"]),
        name_rule(
            "animation-iteration-count",
            &["-webkit-animation-iteration-count", "-o-animation-iteration-count"],
        ),
        name_rule("animation-name", &["-webkit-animation-name", "-o-animation-name"]),
        name_rule(
            "animation-timing-function",
            &["-webkit-animation-timing-function", "-o-animation-timing-function"],
        ),
        // High resolution displays
        name_rule("background-size", &["-webkit-background-size", "-o-background-size"]),
        name_rule("backface-visibility", &["-webkit-backface-visibility", "-o-backface-visibility"]),
        name_rule("border-radius", &["-webkit-border-radius", "-moz-border-radius"]),
        name_rule("box-shadow", &["-webkit-box-shadow", "-moz-box-shadow"]),
        name_rule("box-sizing", &["-webkit-box-sizing"]),
        function_rule(
            "linear-gradient",
            &["-webkit-linear-gradient", "-moz-linear-gradient", "-ms-linear-gradient", "-o-linear-gradient"],
        ),
        function_rule("repeating-linear-gradient", &["-webkit-repeating-linear-gradient"]),
        value_rule("cursor", "grab", &["-moz-grab", "-webkit-grab"]),
        value_rule("cursor", "grabbing", &["-moz-grabbing", "-webkit-grabbing"]),
        // Firefox 15, Chrome 25, Safari 6, iOS Safari 6.1 and older
        function_rule("calc", &["-webkit-calc", "-moz-calc"]),
        name_rule("column-count", &["-webkit-column-count", "-moz-column-count"]),
        name_rule("column-gap", &["-webkit-column-gap", "-moz-column-gap"]),
        name_rule("perspective", &["-webkit-perspective"]),
        name_rule("hyphens", &["-webkit-hyphens", "-moz-hyphens", "-ms-hyphens"]),
        value_rule("min-width", "min-content", &["-webkit-min-content", "-moz-min-content"]),
        name_rule("perspective-origin", &["-webkit-perspective-origin"]),
        function_rule(
            "radial-gradient",
            &["-webkit-radial-gradient", "-moz-radial-gradient", "-o-radial-gradient"],
        ),
        value_rule("position", "sticky", &["-webkit-sticky"]),
        // Transforms and transitions
        name_rule("transform", &["-webkit-transform", "-ms-transform", "-o-transform"]),
        name_rule(
            "transform-origin",
            &["-webkit-transform-origin", "-ms-transform-origin", "-o-transform-origin"],
        ),
        name_rule("transform-style", &["-webkit-transform-style"]),
        name_rule("transition", &["-webkit-transition", "-o-transition"]),
        name_rule("transition-delay", &["-webkit-transition-delay", "-o-transition-delay"]),
        name_rule("transition-duration", &["-webkit-transition-duration", "-o-transition-duration"]),
        name_rule("transition-property", &["-webkit-transition-property", "-o-transition-property"]),
        name_rule(
            "transition-timing-function",
            &["-webkit-transition-timing-function", "-o-transition-timing-function"],
        ),
        name_rule("user-select", &["-webkit-user-select", "-moz-user-select", "-ms-user-select"]),
        // Grid for IE
        value_rule("display", "grid", &["-ms-grid"]),
        name_rule("grid-template-columns", &["-ms-grid-columns"]),
        name_rule("grid-template-rows", &["-ms-grid-rows"]),
        name_rule("grid-row-start", &["-ms-grid-row"]),
        name_rule("grid-column-start", &["-ms-grid-column"]),
        name_rule("justify-self", &["-grid-column-align"]),
        name_rule("clip-path", &["-webkit-clip-path"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_kinds() {
        let name = name_rule("transform", &["-webkit-transform"]);
        assert_eq!(name.kind(), RuleKind::NameOnly);
        assert!(!name.is_value_only());

        let value = value_rule("display", "flex", &["-ms-flexbox"]);
        assert_eq!(value.kind(), RuleKind::Value);
        assert!(!value.is_value_only());

        let function = function_rule("calc", &["-webkit-calc"]);
        assert_eq!(function.kind(), RuleKind::Function);
        assert!(function.is_value_only());
    }

    #[test]
    fn test_applies_to() {
        let rule = name_rule("order", &["-webkit-order"]);
        assert!(rule.applies_to("order"));
        assert!(!rule.applies_to("flex"));

        let any = function_rule("calc", &["-webkit-calc"]);
        assert!(any.applies_to("width"));
        assert!(any.applies_to("margin"));
    }

    #[test]
    fn test_default_table_order() {
        let rules = default_rules();
        assert!(rules.len() >= 40);

        let first = &rules[0];
        assert_eq!(first.match_property_name(), Some("display"));
        assert_eq!(first.match_property_value(), Some("flex"));
        assert_eq!(
            first.expansion_values(),
            &["-webkit-box", "-moz-box", "-webkit-flex", "-ms-flexbox"]
        );

        let flex_index = rules
            .iter()
            .position(|r| r.match_property_value() == Some("flex"))
            .unwrap();
        let grid_index = rules
            .iter()
            .position(|r| r.match_property_value() == Some("grid"))
            .unwrap();
        assert!(flex_index < grid_index);
    }

    #[test]
    fn test_default_table_is_shared() {
        assert!(std::ptr::eq(default_rules(), default_rules()));
    }

    #[test]
    fn test_builder_preserves_expansion_order() {
        let rule = ExpansionRule::builder()
            .match_property_name("hyphens")
            .expand_property_name("-webkit-hyphens")
            .expand_property_name("-moz-hyphens")
            .expand_property_name("-ms-hyphens")
            .build();
        assert_eq!(rule.expansion_names(), &["-webkit-hyphens", "-moz-hyphens", "-ms-hyphens"]);
        assert!(rule.expansion_values().is_empty());
    }
}

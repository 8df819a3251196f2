//! Depth-first traversal over a stylesheet with deferred structural edits
//!
//! Visitors never mutate the block they are iterating. A declaration hook
//! returns a [`VisitAction`] and the walker applies it once the hook has
//! returned, so replacing or deleting the current node cannot invalidate
//! the iteration.

use crate::ast::*;

/// Structural edit requested for the declaration currently being visited.
#[derive(Debug, Clone, PartialEq)]
pub enum VisitAction {
    Continue,
    Remove,
    /// Replace the current node with `nodes`. With `revisit` unset the
    /// replacement nodes are skipped by the current pass.
    Replace { nodes: Vec<Node>, revisit: bool },
}

impl VisitAction {
    pub fn replace(nodes: Vec<Node>) -> Self {
        VisitAction::Replace {
            nodes,
            revisit: false,
        }
    }
}

/// Read-only view of the block around the current declaration.
#[derive(Debug, Clone, Copy)]
pub struct BlockCursor<'a> {
    items: &'a [Node],
    index: usize,
}

impl<'a> BlockCursor<'a> {
    pub fn new(items: &'a [Node], index: usize) -> Self {
        Self { items, index }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Declarations of the block other than the current one, with their
    /// positions.
    pub fn siblings(&self) -> impl Iterator<Item = (usize, &'a Declaration)> + 'a {
        let current = self.index;
        self.items
            .iter()
            .enumerate()
            .filter(move |(i, _)| *i != current)
            .filter_map(|(i, node)| node.as_declaration().map(|d| (i, d)))
    }

    pub fn has_sibling_named(&self, property: &str) -> bool {
        self.siblings().any(|(_, d)| d.property == property)
    }

    /// Normalized value text of the first sibling named `property` whose
    /// value equals `value`.
    pub fn sibling_with_value(&self, property: &str, value: &str) -> Option<String> {
        self.siblings()
            .filter(|(_, d)| d.property == property)
            .map(|(_, d)| d.value_text())
            .find(|text| text == value)
    }
}

/// Hooks invoked by [`walk`]. Every hook has a no-op default.
///
/// `enter_*` hooks for containers return whether to descend into the
/// container's block.
#[allow(unused_variables)]
pub trait TreeVisitor {
    fn enter_tree(&mut self, sheet: &Stylesheet) {}

    fn leave_tree(&mut self, sheet: &Stylesheet) {}

    fn enter_ruleset(&mut self, ruleset: &mut Ruleset) -> bool {
        true
    }

    fn leave_ruleset(&mut self, ruleset: &Ruleset) {}

    fn enter_at_rule(&mut self, rule: &mut AtRule) -> bool {
        true
    }

    fn leave_at_rule(&mut self, rule: &AtRule) {}

    fn enter_mixin_definition(&mut self, mixin: &MixinDefinition) -> bool {
        true
    }

    fn leave_mixin_definition(&mut self, mixin: &MixinDefinition) {}

    fn enter_declaration(&mut self, declaration: &Declaration, cursor: &BlockCursor<'_>) -> VisitAction {
        VisitAction::Continue
    }

    fn leave_declaration(&mut self, declaration: &Declaration) {}
}

/// Visits the whole stylesheet depth-first.
pub fn walk<V: TreeVisitor + ?Sized>(sheet: &mut Stylesheet, visitor: &mut V) {
    visitor.enter_tree(sheet);
    walk_items(&mut sheet.items, visitor);
    visitor.leave_tree(sheet);
}

fn walk_items<V: TreeVisitor + ?Sized>(items: &mut Vec<Node>, visitor: &mut V) {
    let mut index = 0;

    while index < items.len() {
        if !items[index].is_declaration() {
            walk_container(&mut items[index], visitor);
            index += 1;
            continue;
        }

        let action = match &items[index] {
            Node::Declaration(declaration) => {
                let cursor = BlockCursor::new(items, index);
                let action = visitor.enter_declaration(declaration, &cursor);
                visitor.leave_declaration(declaration);
                action
            }
            _ => VisitAction::Continue,
        };

        match action {
            VisitAction::Continue => index += 1,
            VisitAction::Remove => {
                items.remove(index);
            }
            VisitAction::Replace { nodes, revisit } => {
                let count = nodes.len();
                items.splice(index..index + 1, nodes);
                if !revisit {
                    index += count;
                }
            }
        }
    }
}

fn walk_container<V: TreeVisitor + ?Sized>(node: &mut Node, visitor: &mut V) {
    match node {
        Node::Ruleset(ruleset) => {
            if visitor.enter_ruleset(ruleset) {
                walk_items(&mut ruleset.block.items, visitor);
            }
            visitor.leave_ruleset(ruleset);
        }
        Node::AtRule(rule) => {
            if visitor.enter_at_rule(rule) {
                if let Some(block) = rule.block.as_mut() {
                    walk_items(&mut block.items, visitor);
                }
            }
            visitor.leave_at_rule(rule);
        }
        Node::MixinDefinition(mixin) => {
            if visitor.enter_mixin_definition(mixin) {
                walk_items(&mut mixin.block.items, visitor);
            }
            visitor.leave_mixin_definition(mixin);
        }
        Node::Declaration(_) | Node::Comment(_) => {}
    }
}

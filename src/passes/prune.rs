//! Second pass over an expanded stylesheet, driven by a support manifest
//!
//! In [`PruneMode::RemoveAutoExpanded`] the canonical stylesheet is kept and
//! only the prefixed declarations the manifest proves necessary survive. In
//! [`PruneMode::RemoveOriginal`] the authored declarations are dropped and
//! what remains is the prefix-only stylesheet, minus the prefixes already
//! confirmed by the manifest.

use crate::ast::*;
use crate::manifest::SupportManifest;
use crate::prefix_map::PrefixMap;
use crate::visitor::{self, BlockCursor, TreeVisitor, VisitAction};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PruneMode {
    /// Keep authored declarations, drop unneeded prefixes
    #[value(name = "canonical")]
    #[serde(rename = "canonical")]
    RemoveAutoExpanded,
    /// Keep only prefixes, for capability-gated delivery
    #[value(name = "prefix-only")]
    #[serde(rename = "prefix-only")]
    RemoveOriginal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneStats {
    pub declarations_removed: usize,
    pub declarations_preserved: usize,
    pub markers_stripped: usize,
}

pub struct PruningPass<'a> {
    manifest: &'a SupportManifest,
    mode: PruneMode,
    prefix_map: &'a mut PrefixMap,
    stats: PruneStats,
}

impl<'a> PruningPass<'a> {
    pub fn new(manifest: &'a SupportManifest, mode: PruneMode, prefix_map: &'a mut PrefixMap) -> Self {
        Self {
            manifest,
            mode,
            prefix_map,
            stats: PruneStats::default(),
        }
    }

    pub fn run(&mut self, sheet: &mut Stylesheet) {
        visitor::walk(sheet, self);
    }

    pub fn stats(&self) -> &PruneStats {
        &self.stats
    }

    /// Whether the manifest confirms the declaration's origin, or failing
    /// that the declaration's own property and value. Confirmed facts are
    /// fed back into the prefix map.
    fn should_preserve(&mut self, declaration: &Declaration) -> bool {
        let (origin_property, origin_value) = match &declaration.provenance {
            Provenance::ExpandedFromProperty { property } => (property.as_str(), None),
            Provenance::ExpandedFromValue {
                value,
                property: Some(property),
            } => (property.as_str(), Some(value.as_str())),
            Provenance::ExpandedFromValue { property: None, .. } | Provenance::Original => {
                return false
            }
        };

        match self.manifest.values(origin_property) {
            Some([]) => {
                self.prefix_map.add_global_prop(origin_property);
                return true;
            }
            Some(values) => {
                if let Some(origin_value) = origin_value {
                    if values.iter().any(|v| v == origin_value) {
                        self.prefix_map
                            .add_global_prop_value(origin_property, origin_value);
                        return true;
                    }
                }
            }
            None => {}
        }

        let value = declaration.value.text_without_priority();
        if !self.manifest.supports(&declaration.property, Some(&value)) {
            return false;
        }

        match origin_value {
            None => self
                .prefix_map
                .add_alternative_property_name(origin_property, &declaration.property),
            Some(origin_value) => self
                .prefix_map
                .add_property(&declaration.property, &value, Some(origin_value)),
        }
        true
    }

    /// Function rewrites are kept or dropped by the presence of the function
    /// name as a manifest key; everything else goes through `should_preserve`.
    fn is_confirmed(&mut self, declaration: &Declaration) -> bool {
        match &declaration.provenance {
            Provenance::ExpandedFromValue {
                value,
                property: None,
            } => self.manifest.contains_property(value),
            _ => self.should_preserve(declaration),
        }
    }

    fn remove(&mut self, declaration: &Declaration) -> VisitAction {
        log::trace!(
            "Pruned '{}: {}' at line {}",
            declaration.property,
            declaration.value,
            declaration.location.line
        );
        self.stats.declarations_removed += 1;
        VisitAction::Remove
    }
}

impl TreeVisitor for PruningPass<'_> {
    fn enter_mixin_definition(&mut self, _mixin: &MixinDefinition) -> bool {
        false
    }

    fn leave_tree(&mut self, _sheet: &Stylesheet) {
        log::debug!(
            "Pruning ({:?}): {} declarations removed, {} preserved",
            self.mode,
            self.stats.declarations_removed,
            self.stats.declarations_preserved
        );
    }

    fn enter_declaration(&mut self, declaration: &Declaration, _cursor: &BlockCursor<'_>) -> VisitAction {
        match self.mode {
            PruneMode::RemoveAutoExpanded => {
                if !declaration.is_auto_expanded() {
                    return VisitAction::Continue;
                }
                if self.is_confirmed(declaration) {
                    self.stats.declarations_preserved += 1;
                    VisitAction::Continue
                } else {
                    self.remove(declaration)
                }
            }
            PruneMode::RemoveOriginal => {
                if !declaration.is_auto_expanded() {
                    return self.remove(declaration);
                }
                if self.is_confirmed(declaration) {
                    return self.remove(declaration);
                }
                self.stats.declarations_preserved += 1;

                let marker = Comment::alternate_marker();
                if !declaration.comments.contains(&marker) {
                    return VisitAction::Continue;
                }
                let mut stripped = declaration.clone();
                stripped.comments.retain(|comment| *comment != marker);
                self.stats.markers_stripped += 1;
                VisitAction::replace(vec![Node::Declaration(stripped)])
            }
        }
    }
}

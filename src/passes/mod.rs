//! Passes run over a parsed stylesheet

pub mod auto_expand;
pub mod prune;
pub mod root_selector;

pub use auto_expand::{ExpansionPass, ExpansionStats};
pub use prune::{PruneMode, PruneStats, PruningPass};
pub use root_selector::RootSelectorPrefix;

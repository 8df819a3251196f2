//! csspx - CSS dialect compiler with automatic vendor prefixing
//!
//! Expands standard declarations into their historical vendor-prefixed
//! variants, then optionally prunes the result against a runtime support
//! manifest and emits a capability map for runtime feature detection.
//!
//! # Basic Usage
//!
//! ```rust
//! use csspx::{compile_source, Result};
//!
//! fn main() -> Result<()> {
//!     let css = compile_source(".a { display: flex; }", "app.css")?;
//!     assert!(css.contains("display: -ms-flexbox;"));
//!     Ok(())
//! }
//! ```
//!
//! # Compilation Pipeline
//!
//! 1. **Parse**: Lexer & Parser build the stylesheet tree
//! 2. **Scope**: Optional root selector prefixing
//! 3. **Expand**: Synthesize prefixed declarations from the rule table
//! 4. **Prune**: Drop declarations the support manifest makes redundant
//! 5. **Print**: Serialize the tree, flatten the capability map

pub mod ast;
pub mod cli;
pub mod error;
pub mod lexer;
pub mod manifest;
pub mod parser;
pub mod passes;
pub mod prefix_map;
pub mod printer;
pub mod rules;
pub mod visitor;

use serde::Serialize;
use std::fs;
use std::path::Path;
use std::time::Instant;

// Re-export commonly used types and functions
pub use ast::{Declaration, Node, PropertyValue, Provenance, Stylesheet, ValueNode};
pub use cli::EnhancedCli;
pub use error::{CompilerError, Result};
pub use lexer::{Lexer, Token, TokenType};
pub use manifest::SupportManifest;
pub use parser::{parse_stylesheet, Parser};
pub use passes::{ExpansionPass, PruneMode, PruningPass, RootSelectorPrefix};
pub use prefix_map::{CapabilityMap, PrefixMap};
pub use printer::print_stylesheet;
pub use rules::{default_rules, ExpansionRule};

/// Compiler version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Compilation options and settings
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// Run the expansion pass
    pub expand_prefixes: bool,

    /// Run the pruning pass in this mode
    pub prune_mode: Option<PruneMode>,

    /// Runtime support manifest consulted by both passes
    pub manifest: SupportManifest,

    /// Produce the flattened capability map
    pub emit_capability_map: bool,

    /// Where `compile_file_with_options` writes the capability map,
    /// `<output>.prefixes.json` when unset
    pub capability_map_path: Option<String>,

    /// Scope every ruleset under this selector
    pub root_selector: Option<String>,

    /// Indented output instead of compact
    pub pretty_print: bool,

    /// Enable debug mode with extra logging
    pub debug_mode: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            expand_prefixes: true,
            prune_mode: None,
            manifest: SupportManifest::default(),
            emit_capability_map: false,
            capability_map_path: None,
            root_selector: None,
            pretty_print: true,
            debug_mode: false,
        }
    }
}

/// Compilation statistics and metrics
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompilationStats {
    /// Original source size in bytes
    pub source_size: u64,

    /// Printed CSS size in bytes
    pub output_size: u64,

    /// Declarations in the parsed source
    pub declarations_before: usize,

    /// Declarations in the printed output
    pub declarations_after: usize,

    /// Source declarations a rule expanded
    pub declarations_expanded: usize,

    /// Declarations synthesized by the expansion pass
    pub declarations_synthesized: usize,

    /// Declarations deleted by the pruning pass
    pub declarations_removed: usize,

    /// Rulesets scoped under the root selector
    pub rulesets_scoped: usize,

    /// Entries in the emitted capability map
    pub capability_map_entries: usize,

    /// Compilation time in milliseconds
    pub compile_time_ms: u64,
}

impl CompilationStats {
    pub fn print_summary(&self) {
        println!("Compilation Statistics:");
        println!("  Declarations: {} -> {}", self.declarations_before, self.declarations_after);
        println!(
            "  Expanded: {} ({} synthesized)",
            self.declarations_expanded, self.declarations_synthesized
        );
        println!("  Pruned: {}", self.declarations_removed);
        if self.rulesets_scoped > 0 {
            println!("  Scoped rulesets: {}", self.rulesets_scoped);
        }
        println!("  Capability map entries: {}", self.capability_map_entries);
        println!("  Size: {} -> {} bytes", self.source_size, self.output_size);
        println!("  Compile time: {}ms", self.compile_time_ms);
    }
}

/// Result of compiling one stylesheet
#[derive(Debug, Clone)]
pub struct CompilationOutput {
    pub css: String,
    pub capability_map: Option<CapabilityMap>,
    pub stats: CompilationStats,
}

/// Main compiler entry point with default options
pub fn compile_file(input_path: &str, output_path: &str) -> Result<CompilationStats> {
    compile_file_with_options(input_path, output_path, CompilerOptions::default())
}

/// Compile with custom options, writing the CSS and, when enabled, the
/// capability map as pretty JSON.
pub fn compile_file_with_options(
    input_path: &str,
    output_path: &str,
    options: CompilerOptions,
) -> Result<CompilationStats> {
    let start_time = Instant::now();

    if options.debug_mode {
        log::info!("{} v{}", NAME, VERSION);
        log::info!("Compiling '{}' to '{}'...", input_path, output_path);
        log::debug!("Compiler options: {:?}", options);
    }

    let source = fs::read_to_string(input_path).map_err(|e| CompilerError::FileNotFound {
        path: format!("{}: {}", input_path, e),
    })?;

    let output = compile_source_with_options(&source, input_path, &options)?;
    let mut stats = output.stats;

    fs::write(output_path, &output.css)?;

    if let Some(capability_map) = &output.capability_map {
        let map_path = options
            .capability_map_path
            .clone()
            .unwrap_or_else(|| capability_map_path_for(output_path));
        let json = serde_json::to_string_pretty(capability_map).map_err(|e| CompilerError::InvalidFormat {
            message: format!("JSON serialization error: {}", e),
        })?;
        fs::write(&map_path, json)?;
        log::info!("Wrote capability map to {} ({} entries)", map_path, capability_map.len());
    }

    stats.compile_time_ms = start_time.elapsed().as_millis() as u64;

    if options.debug_mode {
        log::info!("Compilation successful!");
        log::info!("Output size: {} bytes", stats.output_size);
        log::info!("Compile time: {}ms", stats.compile_time_ms);
        log::debug!("Full stats: {:?}", stats);
    }

    Ok(stats)
}

/// `out/app.css` -> `out/app.css.prefixes.json`
pub fn capability_map_path_for(output_path: &str) -> String {
    let path = Path::new(output_path);
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}.prefixes.json", file_name))
        .to_string_lossy()
        .into_owned()
}

/// Compile source text with default options
pub fn compile_source(source: &str, filename: &str) -> Result<String> {
    let output = compile_source_with_options(source, filename, &CompilerOptions::default())?;
    Ok(output.css)
}

/// Compile source text with custom options
pub fn compile_source_with_options(
    source: &str,
    filename: &str,
    options: &CompilerOptions,
) -> Result<CompilationOutput> {
    let start_time = Instant::now();
    let mut stats = CompilationStats {
        source_size: source.len() as u64,
        ..Default::default()
    };

    if options.debug_mode {
        log::debug!("Starting compilation pipeline for {}", filename);
    }

    let mut sheet = parse_stylesheet(source, filename)?;
    stats.declarations_before = count_declarations(&sheet.items);

    if let Some(root) = options.root_selector.as_deref() {
        let mut pass = RootSelectorPrefix::new(root);
        pass.run(&mut sheet);
        stats.rulesets_scoped = pass.prefixed_rulesets();
    }

    let mut prefix_map = PrefixMap::new();

    if options.expand_prefixes {
        let mut pass = ExpansionPass::new(default_rules(), &mut prefix_map).with_manifest(&options.manifest);
        pass.run(&mut sheet);
        stats.declarations_expanded = pass.stats().declarations_expanded;
        stats.declarations_synthesized = pass.stats().declarations_synthesized;
    }

    if let Some(mode) = options.prune_mode {
        let mut pass = PruningPass::new(&options.manifest, mode, &mut prefix_map);
        pass.run(&mut sheet);
        stats.declarations_removed = pass.stats().declarations_removed;
    }

    stats.declarations_after = count_declarations(&sheet.items);

    let css = print_stylesheet(&sheet, options.pretty_print);
    stats.output_size = css.len() as u64;

    let capability_map = if options.emit_capability_map {
        let map = prefix_map.flatten();
        stats.capability_map_entries = map.len();
        Some(map)
    } else {
        None
    };

    stats.compile_time_ms = start_time.elapsed().as_millis() as u64;

    if options.debug_mode {
        log::debug!(
            "{}: {} declarations in, {} out",
            filename,
            stats.declarations_before,
            stats.declarations_after
        );
    }

    Ok(CompilationOutput {
        css,
        capability_map,
        stats,
    })
}

fn count_declarations(items: &[Node]) -> usize {
    items
        .iter()
        .map(|node| match node {
            Node::Declaration(_) => 1,
            Node::Ruleset(ruleset) => count_declarations(&ruleset.block.items),
            Node::MixinDefinition(mixin) => count_declarations(&mixin.block.items),
            Node::AtRule(rule) => rule
                .block
                .as_ref()
                .map_or(0, |block| count_declarations(&block.items)),
            Node::Comment(_) => 0,
        })
        .sum()
}

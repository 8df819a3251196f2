// FILE: src/cli/mod.rs

mod config;
mod handlers;

use crate::error::Result;
use crate::manifest::SupportManifest;
use crate::passes::PruneMode;
use crate::CompilerOptions;
use clap::{Arg, ArgAction, Command, ValueEnum};
use std::time::Instant;

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub struct EnhancedCli {
    config: config::ConfigFile,
    start_time: Instant,
}

impl Default for EnhancedCli {
    fn default() -> Self {
        Self::new()
    }
}

impl EnhancedCli {
    pub fn new() -> Self {
        Self {
            config: config::ConfigFile::default(),
            start_time: Instant::now(),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        self.start_time = Instant::now();
        let matches = self.build_cli().get_matches();

        self.setup_logging(matches.get_count("verbose"))?;

        if let Some(config_path) = matches.get_one::<String>("config") {
            self.config = config::load(config_path)?;
        }

        let result = match matches.subcommand() {
            Some(("compile", sub_matches)) => handlers::handle_compile_command(self, sub_matches),
            Some(("check", sub_matches)) => handlers::handle_check_command(sub_matches),
            Some(("rules", sub_matches)) => handlers::handle_rules_command(sub_matches),
            _ => {
                println!("No subcommand specified. Use --help for usage information.");
                Ok(())
            }
        };
        log::debug!("Finished in {}ms", self.start_time.elapsed().as_millis());
        result
    }

    fn build_cli(&self) -> Command {
        Command::new(crate::NAME)
            .version(crate::VERSION)
            .about(crate::DESCRIPTION)
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path (.json or .toml)")
                    .global(true)
                    .action(ArgAction::Set),
            )
            .arg(
                Arg::new("verbose")
                    .short('v')
                    .long("verbose")
                    .help("Increase verbosity (can be used multiple times)")
                    .global(true)
                    .action(ArgAction::Count),
            )
            .subcommand(
                Command::new("compile")
                    .about("Compile a stylesheet, expanding vendor prefixes")
                    .arg(Arg::new("input").help("Input stylesheet").required(true).index(1))
                    .arg(Arg::new("output").short('o').long("output").value_name("FILE").help("Output CSS file"))
                    .arg(Arg::new("manifest").short('m').long("manifest").value_name("FILE").help("Runtime support manifest (JSON)"))
                    .arg(Arg::new("prefix-mode").long("prefix-mode").value_parser(clap::value_parser!(PruneMode)).help("Prune against the manifest: keep the canonical build or only the prefixes"))
                    .arg(Arg::new("emit-map").long("emit-map").value_name("FILE").num_args(0..=1).default_missing_value("").help("Write the capability map (defaults to <output>.prefixes.json)"))
                    .arg(Arg::new("root-selector").long("root-selector").value_name("SELECTOR").help("Scope every ruleset under this selector"))
                    .arg(Arg::new("no-expand").long("no-expand").help("Skip vendor prefix expansion").action(ArgAction::SetTrue))
                    .arg(Arg::new("compact").long("compact").help("Print compact CSS").action(ArgAction::SetTrue))
                    .arg(Arg::new("debug").short('d').long("debug").help("Enable debug mode with extra logging").action(ArgAction::SetTrue))
                    .arg(Arg::new("stats").long("stats").help("Show detailed compilation statistics").action(ArgAction::SetTrue))
                    .arg(Arg::new("watch").short('w').long("watch").help("Watch for file changes and recompile").action(ArgAction::SetTrue)),
            )
            .subcommand(
                Command::new("check")
                    .about("Check stylesheets for syntax errors")
                    .arg(Arg::new("input").help("Input stylesheet or directory").required(true).index(1))
                    .arg(Arg::new("recursive").short('r').long("recursive").help("Check all stylesheets in directory recursively").action(ArgAction::SetTrue)),
            )
            .subcommand(
                Command::new("rules")
                    .about("Print the vendor prefix rule table")
                    .arg(Arg::new("format").short('f').long("format").value_parser(clap::value_parser!(OutputFormat)).default_value("text").help("Output format")),
            )
    }

    fn setup_logging(&self, verbose_count: u8) -> Result<()> {
        let log_level = match verbose_count {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };
        env_logger::Builder::from_default_env()
            .filter_level(log_level)
            .format_timestamp_secs()
            .init();
        Ok(())
    }

    /// Command-line flags win over the config file.
    pub fn build_compiler_options(&self, matches: &clap::ArgMatches) -> Result<CompilerOptions> {
        let mut options = CompilerOptions::default();

        options.debug_mode = matches.get_flag("debug");
        options.expand_prefixes =
            !matches.get_flag("no-expand") && self.config.expand_prefixes.unwrap_or(true);
        options.pretty_print =
            !matches.get_flag("compact") && self.config.pretty_print.unwrap_or(true);
        options.prune_mode = matches
            .get_one::<PruneMode>("prefix-mode")
            .copied()
            .or(self.config.prefix_mode);
        options.root_selector = matches
            .get_one::<String>("root-selector")
            .cloned()
            .or_else(|| self.config.root_selector.clone());

        match matches.get_one::<String>("emit-map") {
            Some(path) => {
                options.emit_capability_map = true;
                if !path.is_empty() {
                    options.capability_map_path = Some(path.clone());
                }
            }
            None => {
                options.emit_capability_map = self.config.emit_capability_map.unwrap_or(false);
            }
        }
        if options.capability_map_path.is_none() {
            options.capability_map_path = self.config.capability_map_path.clone();
        }

        let manifest_path = matches
            .get_one::<String>("manifest")
            .or(self.config.manifest.as_ref());
        if let Some(path) = manifest_path {
            options.manifest = SupportManifest::load(path)?;
        } else if options.prune_mode.is_some() {
            log::warn!("Pruning without a manifest removes every synthesized declaration");
        }

        Ok(options)
    }

    fn output_directory(&self) -> Option<&str> {
        self.config.output_directory.as_deref()
    }
}

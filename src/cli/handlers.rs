// FILE: src/cli/handlers.rs
use crate::{
    cli::OutputFormat, // Import from the `cli` module
    compile_file_with_options, default_rules, parse_stylesheet, CompilerError, CompilerOptions,
    Result,
};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::fs;
use std::path::Path;
use std::sync::mpsc::channel;
use std::time::Instant;

const STYLESHEET_EXTENSIONS: &[&str] = &["css", "gss"];

// --- COMPILE ---
pub fn handle_compile_command(cli: &super::EnhancedCli, matches: &clap::ArgMatches) -> Result<()> {
    let input_path = matches
        .get_one::<String>("input")
        .ok_or_else(|| CompilerError::config("Missing input file"))?;
    let output_path = match matches.get_one::<String>("output") {
        Some(path) => path.clone(),
        None => default_output_path(input_path, cli.output_directory()),
    };

    let options = cli.build_compiler_options(matches)?;

    if matches.get_flag("watch") {
        watch_and_compile(input_path, &output_path, options)
    } else {
        compile_single_file(input_path, &output_path, options, matches.get_flag("stats"))
    }
}

/// `src/app.css` -> `src/app.out.css`, or into `output_directory` when the
/// config sets one.
fn default_output_path(input_path: &str, output_directory: Option<&str>) -> String {
    let input = Path::new(input_path);
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string());
    let file_name = format!("{}.out.css", stem);

    match output_directory {
        Some(dir) => Path::new(dir).join(file_name),
        None => input.with_file_name(file_name),
    }
    .to_string_lossy()
    .into_owned()
}

fn compile_single_file(
    input_path: &str,
    output_path: &str,
    options: CompilerOptions,
    show_stats: bool,
) -> Result<()> {
    println!("🔨 Compiling {} -> {}", input_path, output_path);

    let compile_start = Instant::now();
    let stats = compile_file_with_options(input_path, output_path, options)?;
    let compile_time = compile_start.elapsed();

    println!("✅ Compilation successful!");
    println!("   Output: {} bytes", stats.output_size);
    println!("   Time: {:.2}ms", compile_time.as_millis());
    if stats.declarations_synthesized > 0 || stats.declarations_removed > 0 {
        println!(
            "   Prefixes: +{} / -{}",
            stats.declarations_synthesized, stats.declarations_removed
        );
    }

    if show_stats {
        println!();
        stats.print_summary();
    }

    Ok(())
}

/// Editors that save through a temporary file replace the watched inode, so
/// the directory is watched and events are matched on the file name.
fn watch_and_compile(input_path: &str, output_path: &str, options: CompilerOptions) -> Result<()> {
    let input = Path::new(input_path);
    let watch_dir = match input.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    println!("👀 Watching {} for changes...", input_path);

    let (tx, rx) = channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let _ = tx.send(event);
            }
            Err(e) => eprintln!("Watch error: {}", e),
        },
        notify::Config::default(),
    )
    .map_err(|e| watch_error("Failed to create file watcher", e))?;
    watcher
        .watch(watch_dir, RecursiveMode::NonRecursive)
        .map_err(|e| watch_error("Failed to watch directory", e))?;

    match compile_file_with_options(input_path, output_path, options.clone()) {
        Ok(_) => println!("✅ Initial compilation successful"),
        Err(e) => eprintln!("❌ Initial compilation failed: {}", e),
    }

    for event in rx {
        if !is_relevant_event(&event, input) {
            continue;
        }
        log::debug!("Watch event {:?} on {:?}", event.kind, event.paths);
        println!("🔄 {} changed, recompiling...", input_path);
        match compile_file_with_options(input_path, output_path, options.clone()) {
            Ok(stats) => println!(
                "✅ Recompiled successfully ({} bytes, {}ms)",
                stats.output_size, stats.compile_time_ms
            ),
            Err(e) => eprintln!("❌ Compilation failed: {}", e),
        }
    }

    Ok(())
}

/// A create or modify event that touches the input file.
fn is_relevant_event(event: &Event, input: &Path) -> bool {
    if !event.kind.is_modify() && !event.kind.is_create() {
        return false;
    }
    let Some(file_name) = input.file_name() else {
        return false;
    };
    event.paths.iter().any(|path| path.file_name() == Some(file_name))
}

fn watch_error(context: &str, error: notify::Error) -> CompilerError {
    CompilerError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        format!("{}: {}", context, error),
    ))
}

// --- CHECK ---
pub fn handle_check_command(matches: &clap::ArgMatches) -> Result<()> {
    let input_path = matches
        .get_one::<String>("input")
        .ok_or_else(|| CompilerError::config("Missing input path"))?;
    let recursive = matches.get_flag("recursive");

    if recursive && Path::new(input_path).is_dir() {
        check_directory_recursive(input_path)
    } else {
        check_single_file(input_path)
    }
}

fn check_single_file(input_path: &str) -> Result<()> {
    println!("🔍 Checking {}", input_path);
    let source = fs::read_to_string(input_path).map_err(|e| CompilerError::FileNotFound {
        path: format!("{}: {}", input_path, e),
    })?;

    match parse_stylesheet(&source, input_path) {
        Ok(_) => {
            println!("✅ {} - No issues found", input_path);
            Ok(())
        }
        Err(e) => {
            println!("❌ {} - {}", input_path, e);
            Err(e)
        }
    }
}

fn is_stylesheet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| STYLESHEET_EXTENSIONS.contains(&ext))
}

fn check_directory_recursive(dir_path: &str) -> Result<()> {
    let mut total_files = 0;
    let mut error_files = 0;

    for entry in walkdir::WalkDir::new(dir_path) {
        let entry = entry.map_err(|e| {
            CompilerError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Directory traversal error: {}", e),
            ))
        })?;
        if entry.file_type().is_file() && is_stylesheet(entry.path()) {
            total_files += 1;
            if check_single_file(&entry.path().to_string_lossy()).is_err() {
                error_files += 1;
            }
        }
    }

    println!("\n📊 Check Summary:");
    println!("   Total files: {}", total_files);
    println!("   Files with errors: {}", error_files);
    if total_files > 0 {
        println!(
            "   Success rate: {:.1}%",
            (total_files - error_files) as f64 / total_files as f64 * 100.0
        );
    }

    if error_files > 0 {
        Err(CompilerError::InvalidFormat {
            message: format!("{} files have errors", error_files),
        })
    } else {
        Ok(())
    }
}

// --- RULES ---
pub fn handle_rules_command(matches: &clap::ArgMatches) -> Result<()> {
    let rules = default_rules();

    match matches.get_one::<OutputFormat>("format") {
        Some(OutputFormat::Json) => {
            let json = serde_json::to_string_pretty(rules).map_err(|e| CompilerError::InvalidFormat {
                message: format!("JSON serialization error: {}", e),
            })?;
            println!("{}", json);
        }
        _ => {
            println!("📋 {} expansion rules (first match wins):", rules.len());
            for (index, rule) in rules.iter().enumerate() {
                let property = rule.match_property_name().unwrap_or("*");
                let matched = match rule.match_property_value() {
                    Some(value) if rule.is_function() => format!("{}: {}()", property, value),
                    Some(value) => format!("{}: {}", property, value),
                    None => property.to_string(),
                };
                let mut targets: Vec<&str> = rule.expansion_names().iter().map(String::as_str).collect();
                targets.extend(rule.expansion_values().iter().map(String::as_str));
                println!("   {:>2}. {} -> {}", index + 1, matched, targets.join(", "));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_output_path() {
        assert_eq!(default_output_path("src/app.css", None), "src/app.out.css");
        assert_eq!(default_output_path("src/app.css", Some("dist")), "dist/app.out.css");
    }

    #[test]
    fn test_check_directory_counts_errors() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("good.css"), ".a { order: 1; }").unwrap();
        fs::create_dir(temp_dir.path().join("nested")).unwrap();
        fs::write(temp_dir.path().join("nested/bad.gss"), ".a { order 1; }").unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "not a stylesheet {").unwrap();

        let err = check_directory_recursive(temp_dir.path().to_str().unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid format: 1 files have errors");

        fs::remove_file(temp_dir.path().join("nested/bad.gss")).unwrap();
        assert!(check_directory_recursive(temp_dir.path().to_str().unwrap()).is_ok());
    }

    #[test]
    fn test_watch_events_match_input_file() {
        use notify::event::{CreateKind, ModifyKind, RemoveKind};
        use notify::EventKind;
        use std::path::PathBuf;

        let input = Path::new("styles/app.css");
        let modified = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/work/styles/app.css"));
        assert!(is_relevant_event(&modified, input));

        let replaced = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/work/styles/app.css"));
        assert!(is_relevant_event(&replaced, input));

        let sibling = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/work/styles/app.out.css"));
        assert!(!is_relevant_event(&sibling, input));

        let removed = Event::new(EventKind::Remove(RemoveKind::File))
            .add_path(PathBuf::from("/work/styles/app.css"));
        assert!(!is_relevant_event(&removed, input));
    }
}

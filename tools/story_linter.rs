/// Story Linter: checks story files for broken scene links and duplicates.
///
/// Usage: story_linter <story.ron | story_dir>

use std::path::Path;
use std::process;
use ultimo_engine::core::story::Story;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: story_linter <story.ron | story_dir>");
        process::exit(0);
    }

    let path = Path::new(&args[1]);
    let mut files = Vec::new();
    if path.is_file() {
        files.push(path.to_path_buf());
    } else if path.is_dir() {
        collect_stories(path, &mut files);
    } else {
        eprintln!("ERROR: Path '{}' does not exist", args[1]);
        process::exit(1);
    }
    files.sort();

    let mut errors = 0;
    let mut warnings = 0;
    println!("\n=== Story Lint Report ===\n");

    for file in &files {
        let story = match Story::load_from_ron(file) {
            Ok(story) => story,
            Err(e) => {
                println!("ERROR: {}: {}", file.display(), e);
                errors += 1;
                continue;
            }
        };
        println!(
            "  Loaded: {} ({} scenes, {} global commands)",
            file.display(),
            story.scenes().len(),
            story.globals().len()
        );

        for issue in story.lint() {
            println!("ERROR: {}: {}", file.display(), issue);
            errors += 1;
        }
        for scene in story.scenes() {
            if scene.lines.is_empty() && scene.then.is_none() {
                println!(
                    "WARNING: {}: scene '{}' shows nothing and goes nowhere on its own",
                    file.display(),
                    scene.name
                );
                warnings += 1;
            }
            if scene.commands.is_empty() && scene.then.is_none() && scene.countdown.is_none() {
                println!(
                    "WARNING: {}: scene '{}' has no way forward except global commands",
                    file.display(),
                    scene.name
                );
                warnings += 1;
            }
        }
    }

    if errors == 0 && warnings == 0 {
        println!("All checks passed!");
    }
    println!("\nSummary: {} errors, {} warnings", errors, warnings);

    if errors == 0 {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn collect_stories(dir: &Path, files: &mut Vec<std::path::PathBuf>) {
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                collect_stories(&path, files);
            } else if path.extension().and_then(|s| s.to_str()) == Some("ron") {
                files.push(path);
            }
        }
    }
}

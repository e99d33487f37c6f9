use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use script_mt::driver::{DEFAULT_CACHE_FILE, DEFAULT_MESSAGE_LINES};
use script_mt::name_tag::{recode, recoded_name};
use script_mt::{
    CancelToken, CharCountMeasure, Diagnostics, DisplayParagraph, GlyphWidthTable,
    MachineTranslator, MockMode, MockTranslator, NameTag, RunConfig, TextMeasure,
    TranslationCache, edited_share, reflow_paragraph, translate_game,
};
use std::collections::BTreeMap;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

fn cache_arg() -> Arg {
    Arg::new("cache")
        .long("cache")
        .short('c')
        .help("Translation cache file")
        .default_value(DEFAULT_CACHE_FILE)
        .value_parser(value_parser!(PathBuf))
}

fn font_arg() -> Arg {
    Arg::new("font")
        .long("font")
        .short('f')
        .help("Game font (TTF/OTF); without it widths are counted in characters")
        .value_parser(value_parser!(PathBuf))
}

fn line_limit_arg() -> Arg {
    Arg::new("line-limit")
        .long("line-limit")
        .short('l')
        .help("Width of a message box line, in tenths of the font size")
        .required(true)
        .value_parser(value_parser!(f64))
}

fn cli() -> Command {
    Command::new("script-mt")
        .version("0.1.0")
        .about("Machine translation of game scripts that keeps control codes and fits message boxes")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("run")
                .about("Translate every data file of a game")
                .arg(
                    Arg::new("game-dir")
                        .long("game-dir")
                        .short('g')
                        .help("Game directory (the one containing www/data)")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(line_limit_arg())
                .arg(font_arg())
                .arg(cache_arg())
                .arg(
                    Arg::new("workers")
                        .long("workers")
                        .short('w')
                        .help("Concurrent translations")
                        .default_value("10")
                        .value_parser(value_parser!(usize)),
                )
                .arg(
                    Arg::new("skip-backup")
                        .long("skip-backup")
                        .help("Translate www/data in place instead of reading from www/data-backup")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("glossary")
                        .long("glossary")
                        .help("JSON file of fixed replacements applied to every translation")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("mock")
                        .long("mock")
                        .short('m')
                        .help("Built-in translator: noop, suffix, reorder or drop-markers")
                        .default_value("noop"),
                )
                .arg(
                    Arg::new("source-locale")
                        .long("source")
                        .short('s')
                        .help("Source language code")
                        .default_value("en"),
                )
                .arg(
                    Arg::new("target-locale")
                        .long("target")
                        .short('t')
                        .help("Target language code")
                        .default_value("ru"),
                ),
        )
        .subcommand(
            Command::new("reflow")
                .about("Break a text into message box lines")
                .arg(
                    Arg::new("text")
                        .help("Text to reflow; \\n in the text is a line break")
                        .required(true)
                        .index(1),
                )
                .arg(line_limit_arg())
                .arg(font_arg())
                .arg(
                    Arg::new("max-lines")
                        .long("max-lines")
                        .help("Lines of the box")
                        .default_value("4")
                        .value_parser(value_parser!(usize)),
                ),
        )
        .subcommand(
            Command::new("cache")
                .about("Print the cached translations")
                .arg(cache_arg()),
        )
        .subcommand(
            Command::new("names")
                .about("Print speaker names and their translations")
                .arg(cache_arg()),
        )
        .subcommand(
            Command::new("check")
                .about("Check cached translations for lost control codes and untranslated text")
                .arg(cache_arg()),
        )
        .subcommand(
            Command::new("progress")
                .about("Share of machine translations edited by hand")
                .arg(
                    Arg::new("original")
                        .long("original")
                        .help("Cache as produced by the machine translator")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("edited")
                        .long("edited")
                        .help("The same cache after human editing")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
}

fn path_arg<'a>(matches: &'a ArgMatches, id: &str) -> Result<&'a Path, Box<dyn Error>> {
    matches
        .get_one::<PathBuf>(id)
        .map(PathBuf::as_path)
        .ok_or_else(|| format!("missing --{}", id).into())
}

fn load_measure(font: Option<&PathBuf>) -> Result<Box<dyn TextMeasure>, Box<dyn Error>> {
    match font {
        Some(path) => Ok(Box::new(GlyphWidthTable::from_font_file(path)?)),
        None => Ok(Box::new(CharCountMeasure)),
    }
}

/// Print a string the way it appears inside a JSON string literal
fn escaped(text: &str) -> String {
    let quoted = serde_json::to_string(text).unwrap_or_else(|_| text.to_string());
    quoted
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(&quoted)
        .to_string()
}

async fn run_command(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let defaults = RunConfig::default();
    let config = RunConfig {
        game_dir: path_arg(matches, "game-dir")?.to_path_buf(),
        line_limit: matches
            .get_one::<f64>("line-limit")
            .copied()
            .ok_or("missing --line-limit")?,
        workers: matches
            .get_one::<usize>("workers")
            .copied()
            .unwrap_or(defaults.workers),
        source_locale: matches
            .get_one::<String>("source-locale")
            .cloned()
            .unwrap_or(defaults.source_locale.clone()),
        target_locale: matches
            .get_one::<String>("target-locale")
            .cloned()
            .unwrap_or(defaults.target_locale.clone()),
        cache_path: path_arg(matches, "cache")?.to_path_buf(),
        font_path: matches.get_one::<PathBuf>("font").cloned(),
        glossary_path: matches.get_one::<PathBuf>("glossary").cloned(),
        skip_backup: matches.get_flag("skip-backup"),
        ..defaults
    };

    let mode: MockMode = matches
        .get_one::<String>("mock")
        .map(String::as_str)
        .unwrap_or("noop")
        .parse()?;
    let translator: Arc<dyn MachineTranslator> = Arc::new(MockTranslator::new(mode));

    let cancel = CancelToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, letting running translations finish");
            on_signal.cancel();
        }
    });

    let summary = translate_game(config, translator, cancel).await?;
    print!("{}", summary.report.render());
    println!(
        "{} documents, {} fields{}",
        summary.documents,
        summary.fields,
        if summary.cancelled { " (cancelled)" } else { "" }
    );
    Ok(())
}

fn reflow_command(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let text = matches
        .get_one::<String>("text")
        .ok_or("missing text")?
        .replace("\\n", "\n");
    let line_limit = matches
        .get_one::<f64>("line-limit")
        .copied()
        .ok_or("missing --line-limit")?;
    let max_lines = matches
        .get_one::<usize>("max-lines")
        .copied()
        .unwrap_or(DEFAULT_MESSAGE_LINES);
    let measure = load_measure(matches.get_one::<PathBuf>("font"))?;

    let outcome = reflow_paragraph(
        measure.as_ref(),
        &DisplayParagraph::new(text, line_limit, max_lines),
    );
    for line in &outcome.lines {
        println!("{:>6.1} | {}", measure.visible_width(line), line);
    }
    if outcome.overflow {
        eprintln!(
            "{} lines do not fit a box of {}",
            outcome.lines.len(),
            max_lines
        );
    }
    Ok(())
}

fn cache_command(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let cache = TranslationCache::load(path_arg(matches, "cache")?)?;
    for (source, translated) in cache.snapshot() {
        println!("{}", escaped(&source));
        println!("{}", escaped(&translated));
        println!();
    }
    Ok(())
}

fn names_command(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let cache = TranslationCache::load(path_arg(matches, "cache")?)?;
    let mut names = BTreeMap::new();
    for (source, translated) in cache.snapshot() {
        if NameTag::find(&source).is_none() {
            continue;
        }
        let recoded = recode(&source);
        let (Some(name), Some(translated_name)) =
            (recoded_name(&recoded), recoded_name(&translated))
        else {
            continue;
        };
        names.insert(name.to_string(), translated_name.to_string());
    }
    for (name, translated_name) in names {
        println!("{} > {}", name, translated_name);
    }
    Ok(())
}

fn check_command(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let cache = TranslationCache::load(path_arg(matches, "cache")?)?;
    let diagnostics = Diagnostics::new();
    for (source, translated) in cache.snapshot() {
        diagnostics.check(&source, &translated);
    }
    let report = diagnostics.report();
    if report.is_empty() {
        println!("{} translations, no problems found", cache.len());
    } else {
        print!("{}", report.render());
    }
    Ok(())
}

fn progress_command(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let original = TranslationCache::load(path_arg(matches, "original")?)?;
    let edited = TranslationCache::load(path_arg(matches, "edited")?)?;
    match edited_share(&original.snapshot(), &edited.snapshot()) {
        Some(share) => println!("{:.2}% of machine translated lines edited", share * 100.0),
        None => println!("no lines in common"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();
    match matches.subcommand() {
        Some(("run", sub)) => run_command(sub).await,
        Some(("reflow", sub)) => reflow_command(sub),
        Some(("cache", sub)) => cache_command(sub),
        Some(("names", sub)) => names_command(sub),
        Some(("check", sub)) => check_command(sub),
        Some(("progress", sub)) => progress_command(sub),
        _ => Err("unknown command".into()),
    }
}

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use arboard::Clipboard;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};
use is_terminal::IsTerminal;

mod cleaning;
mod config;
mod diff;
mod document;
mod encoding;
mod files;
mod gateway;
mod logging;
mod merge;
mod session;

use cleaning::CleaningOptions;
use files::Target;
use session::{Session, SessionEvent};

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq, Default)]
enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    fn should_color(self) -> bool {
        match self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => io::stdout().is_terminal(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Detect(cmd) => handle_detect(cmd)?,
        Command::Clean(cmd) => handle_clean(cmd)?,
        Command::Replace(cmd) => handle_replace(cmd)?,
        Command::Convert(cmd) => handle_convert(cmd)?,
        Command::Merge(cmd) => handle_merge(cmd)?,
        Command::Log(cmd) => handle_log(cmd)?,
    }

    Ok(())
}

fn handle_detect(cmd: DetectCommand) -> Result<()> {
    let targets = resolve_targets(&cmd.targets)?;
    for target in &targets {
        let raw = fs::read(&target.path)
            .with_context(|| format!("reading {}", target.path.display()))?;
        let detected = encoding::detect(&raw);
        let note = if target.is_probably_binary {
            " [suspected binary]"
        } else {
            ""
        };
        println!(
            "{}: {} ({}){}",
            target.path.display(),
            detected.name,
            detected.source,
            note
        );
    }
    Ok(())
}

fn handle_clean(cmd: CleanCommand) -> Result<()> {
    let options = resolve_cleaning_options(&cmd)?;
    let colorize = cmd.diff.color.should_color();
    let targets = resolve_targets(&cmd.targets)?;
    let mut stats = CommandStats::default();

    for target in &targets {
        if skip_binary(target, &mut stats) {
            continue;
        }
        let mut session = Session::new();
        if report_errors(&session.load_file(&target.path)) {
            stats.failed += 1;
            continue;
        }
        let original = current_content(&session);
        report_errors(&session.apply_cleaning(&options, None));
        let cleaned = current_content(&session);

        if cleaned == original {
            println!("no changes for {}", target.path.display());
            stats.no_op += 1;
            continue;
        }

        println!("--- preview: {} ---", target.path.display());
        diff::print_diff(&original, &cleaned, cmd.diff.context, colorize);

        if !cmd.apply {
            println!("dry-run: rerun with --apply to write this change.");
            stats.dry_run += 1;
            continue;
        }
        if report_errors(&session.save_file(&target.path, &cleaned)) {
            stats.failed += 1;
            continue;
        }
        logging::record_change("clean", &target.path, &diff::change_summary(&original, &cleaned))?;
        println!("applied {}", target.path.display());
        stats.applied += 1;
    }

    stats.print("clean");
    stats.into_result()
}

fn handle_replace(cmd: ReplaceCommand) -> Result<()> {
    if cmd.find.is_empty() {
        bail!("--find must not be empty");
    }
    let (replacement, replacement_source) = resolve_replacement_text(&cmd)?;
    let colorize = cmd.diff.color.should_color();
    let targets = resolve_targets(&cmd.targets)?;
    println!(
        "replace '{}' ({} chars from {replacement_source}) across {} file(s)",
        cmd.find,
        replacement.chars().count(),
        targets.len()
    );
    let mut stats = CommandStats::default();

    for target in &targets {
        if skip_binary(target, &mut stats) {
            continue;
        }
        let mut session = Session::new();
        if report_errors(&session.load_file(&target.path)) {
            stats.failed += 1;
            continue;
        }
        let original = current_content(&session);
        let events = session.replace_all(&cmd.find, &replacement, None);
        report_errors(&events);
        let replaced = current_content(&session);

        if replaced == original {
            println!("no matches in {}", target.path.display());
            stats.no_op += 1;
            continue;
        }

        if let Some(message) = first_status(&events) {
            println!("{}: {message}", target.path.display());
        }
        println!("--- preview: {} ---", target.path.display());
        diff::print_diff(&original, &replaced, cmd.diff.context, colorize);

        if !cmd.apply {
            println!("dry-run: rerun with --apply to write this change.");
            stats.dry_run += 1;
            continue;
        }
        if report_errors(&session.save_file(&target.path, &replaced)) {
            stats.failed += 1;
            continue;
        }
        logging::record_change(
            "replace",
            &target.path,
            &diff::change_summary(&original, &replaced),
        )?;
        println!("applied {}", target.path.display());
        stats.applied += 1;
    }

    stats.print("replace");
    stats.into_result()
}

fn handle_convert(cmd: ConvertCommand) -> Result<()> {
    let targets = resolve_targets(&cmd.targets)?;
    let mut stats = CommandStats::default();

    for target in &targets {
        if skip_binary(target, &mut stats) {
            continue;
        }
        let mut session = Session::new();
        if report_errors(&session.load_file(&target.path)) {
            stats.failed += 1;
            continue;
        }
        let Some(doc) = session.document() else {
            stats.failed += 1;
            continue;
        };
        let from = doc.encoding.clone();
        let content = doc.content.clone();

        if doc.is_effectively_utf8() {
            println!("{}: already UTF-8 ({from})", target.path.display());
            stats.no_op += 1;
            continue;
        }
        if !cmd.apply {
            println!(
                "{}: {from} -> utf-8 (dry-run: rerun with --apply to rewrite)",
                target.path.display()
            );
            stats.dry_run += 1;
            continue;
        }

        let events = session.convert_to_utf8(&content);
        if report_errors(&events) {
            stats.failed += 1;
            continue;
        }
        if let Some(message) = first_status(&events) {
            println!("{message}");
        }
        logging::record_change("convert", &target.path, &format!("{from} -> utf-8"))?;
        stats.applied += 1;
    }

    stats.print("convert");
    stats.into_result()
}

fn handle_merge(cmd: MergeCommand) -> Result<()> {
    let preferences = config::load()?;
    let targets = resolve_targets(&cmd.targets)?;
    let paths: Vec<PathBuf> = targets.iter().map(|target| target.path.clone()).collect();

    let mut session = Session::new();
    for event in session.add_files_to_merge(&paths) {
        if let SessionEvent::MergeQueueChanged(names) = event {
            println!("merge queue: {}", names.join(", "));
        }
    }

    let separator = cmd
        .separator
        .or(preferences.merge_separator)
        .unwrap_or_else(|| merge::DEFAULT_SEPARATOR.to_string());
    session.set_merge_separator(&separator);

    let events = session.execute_merge();
    if report_errors(&events) {
        bail!("merge aborted");
    }
    if let Some(message) = first_status(&events) {
        println!("{message}");
    }
    let merged = current_content(&session);

    match &cmd.out {
        Some(out) => {
            if report_errors(&session.save_file(out, &merged)) {
                bail!("merge result could not be written");
            }
            logging::record_change("merge", out, &format!("{} source file(s)", paths.len()))?;
            println!("wrote {}", out.display());
        }
        None => {
            io::stdout().write_all(merged.as_bytes())?;
        }
    }

    Ok(())
}

fn handle_log(cmd: LogCommand) -> Result<()> {
    let entries = logging::read_tail(cmd.tail)?;
    if entries.is_empty() {
        println!("change log is empty");
        return Ok(());
    }
    for entry in &entries {
        println!(
            "{}  {:<8}  {}  {}",
            entry.timestamp,
            entry.command,
            entry.path.display(),
            entry.detail
        );
    }
    Ok(())
}

fn resolve_targets(args: &TargetArgs) -> Result<Vec<Target>> {
    files::resolve_targets(&args.targets, &args.globs, args.include_hidden, &args.exclude)
}

fn resolve_cleaning_options(cmd: &CleanCommand) -> Result<CleaningOptions> {
    let options = if cmd.trim || cmd.collapse_spaces || cmd.remove_tabs {
        CleaningOptions {
            trim_whitespace: cmd.trim,
            clean_whitespace: cmd.collapse_spaces,
            remove_tabs: cmd.remove_tabs,
        }
    } else {
        config::load()?.cleaning.to_options()
    };
    if !options.any_enabled() {
        bail!(
            "no cleaning passes selected; pass --trim, --collapse-spaces, or --remove-tabs \
             (or set defaults in .texttools/config.yaml)"
        );
    }
    Ok(options)
}

fn resolve_replacement_text(cmd: &ReplaceCommand) -> Result<(String, &'static str)> {
    if cmd.with_stdin {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("reading replacement text from stdin")?;
        return Ok((buffer, "stdin"));
    }
    if cmd.with_clipboard {
        let mut clipboard = Clipboard::new().context("opening system clipboard")?;
        let text = clipboard.get_text().context("reading system clipboard")?;
        return Ok((text, "clipboard"));
    }
    cmd.replacement
        .clone()
        .map(|text| (text, "inline"))
        .ok_or_else(|| anyhow!("missing replacement; use --with, --with-stdin, or --with-clipboard"))
}

fn skip_binary(target: &Target, stats: &mut CommandStats) -> bool {
    if target.is_probably_binary {
        println!("skipping {} (suspected binary file)", target.path.display());
        stats.skipped += 1;
        return true;
    }
    false
}

fn current_content(session: &Session) -> String {
    session
        .document()
        .map(|doc| doc.content.clone())
        .unwrap_or_default()
}

/// Print error events to stderr; true when there was at least one.
fn report_errors(events: &[SessionEvent]) -> bool {
    let mut failed = false;
    for event in events {
        if let SessionEvent::Error(message) = event {
            eprintln!("error: {message}");
            failed = true;
        }
    }
    failed
}

fn first_status(events: &[SessionEvent]) -> Option<&str> {
    events.iter().find_map(|event| match event {
        SessionEvent::Status(message) => Some(message.as_str()),
        _ => None,
    })
}

#[derive(Debug, Default)]
struct CommandStats {
    applied: usize,
    dry_run: usize,
    no_op: usize,
    skipped: usize,
    failed: usize,
}

impl CommandStats {
    fn print(&self, label: &str) {
        println!(
            "{label}: {} applied, {} dry-run, {} no-op, {} skipped, {} failed",
            self.applied, self.dry_run, self.no_op, self.skipped, self.failed
        );
    }

    fn into_result(self) -> Result<()> {
        if self.failed > 0 {
            bail!("{} file(s) failed", self.failed);
        }
        Ok(())
    }
}

#[derive(Debug, Parser)]
#[command(name = "texttools", version, about = "Encoding-aware text cleanup and merge utility")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Report the decided encoding for each file.
    Detect(DetectCommand),
    /// Run whitespace cleanup passes over files.
    Clean(CleanCommand),
    /// Replace every literal occurrence of a term.
    Replace(ReplaceCommand),
    /// Rewrite non-UTF-8 files as UTF-8.
    Convert(ConvertCommand),
    /// Concatenate files in order with a separator.
    Merge(MergeCommand),
    /// Show recent applied changes.
    Log(LogCommand),
}

#[derive(Debug, Clone, Args)]
struct TargetArgs {
    /// Files or directories to process.
    #[arg(value_name = "PATH", value_hint = ValueHint::AnyPath)]
    targets: Vec<PathBuf>,
    #[arg(long = "glob", value_name = "GLOB")]
    globs: Vec<String>,
    #[arg(long = "exclude", value_name = "GLOB")]
    exclude: Vec<String>,
    #[arg(long = "include-hidden", action = ArgAction::SetTrue)]
    include_hidden: bool,
}

#[derive(Debug, Clone, Copy, Args)]
struct DiffArgs {
    /// Unchanged lines shown around each change in previews.
    #[arg(long, default_value_t = 3)]
    context: usize,
    #[arg(long = "color", value_enum, default_value = "auto")]
    color: ColorChoice,
}

#[derive(Debug, Args)]
struct DetectCommand {
    #[command(flatten)]
    targets: TargetArgs,
}

#[derive(Debug, Args)]
struct CleanCommand {
    #[command(flatten)]
    targets: TargetArgs,
    #[command(flatten)]
    diff: DiffArgs,
    /// Drop boundary blank lines and trailing spaces.
    #[arg(long, action = ArgAction::SetTrue)]
    trim: bool,
    /// Collapse runs of spaces within lines.
    #[arg(long = "collapse-spaces", action = ArgAction::SetTrue)]
    collapse_spaces: bool,
    /// Strip leading tabs and spaces from each line.
    #[arg(long = "remove-tabs", action = ArgAction::SetTrue)]
    remove_tabs: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    apply: bool,
}

#[derive(Debug, Args)]
struct ReplaceCommand {
    #[command(flatten)]
    targets: TargetArgs,
    #[command(flatten)]
    diff: DiffArgs,
    /// Literal text to search for.
    #[arg(long, value_name = "TEXT")]
    find: String,
    #[arg(
        long = "with",
        value_name = "TEXT",
        conflicts_with_all = ["with_stdin", "with_clipboard"],
        required_unless_present_any = ["with_stdin", "with_clipboard"]
    )]
    replacement: Option<String>,
    #[arg(long = "with-stdin", action = ArgAction::SetTrue, conflicts_with = "with_clipboard")]
    with_stdin: bool,
    #[arg(long = "with-clipboard", action = ArgAction::SetTrue, conflicts_with = "with_stdin")]
    with_clipboard: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    apply: bool,
}

#[derive(Debug, Args)]
struct ConvertCommand {
    #[command(flatten)]
    targets: TargetArgs,
    #[arg(long, action = ArgAction::SetTrue)]
    apply: bool,
}

#[derive(Debug, Args)]
struct MergeCommand {
    #[command(flatten)]
    targets: TargetArgs,
    /// Separator placed between file contents; defaults to a newline.
    #[arg(long, value_name = "TEXT", allow_hyphen_values = true)]
    separator: Option<String>,
    /// Write the merged document here instead of stdout.
    #[arg(long = "out", value_name = "FILE", value_hint = ValueHint::FilePath)]
    out: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct LogCommand {
    #[arg(long = "tail", default_value_t = 20)]
    tail: usize,
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    #[test]
    fn replace_requires_a_replacement_source() {
        let result = Cli::try_parse_from(["texttools", "replace", "--find", "x", "a.txt"]);
        assert!(result.is_err());
    }

    #[test]
    fn replace_accepts_inline_replacement() {
        let cli = Cli::try_parse_from([
            "texttools", "replace", "--find", "x", "--with", "y", "a.txt",
        ])
        .expect("parse");
        match cli.command {
            Command::Replace(cmd) => {
                assert_eq!(cmd.find, "x");
                assert_eq!(cmd.replacement.as_deref(), Some("y"));
                assert!(!cmd.apply);
            }
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn stdin_and_clipboard_sources_conflict() {
        let result = Cli::try_parse_from([
            "texttools",
            "replace",
            "--find",
            "x",
            "--with-stdin",
            "--with-clipboard",
            "a.txt",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn merge_takes_separator_and_out() {
        let cli = Cli::try_parse_from([
            "texttools", "merge", "a.txt", "b.txt", "--separator", "---", "--out", "all.txt",
        ])
        .expect("parse");
        match cli.command {
            Command::Merge(cmd) => {
                assert_eq!(cmd.targets.targets.len(), 2);
                assert_eq!(cmd.separator.as_deref(), Some("---"));
                assert_eq!(cmd.out, Some(PathBuf::from("all.txt")));
            }
            _ => panic!("wrong command"),
        }
    }
}

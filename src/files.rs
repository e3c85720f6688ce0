use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use glob::glob;
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::{DirEntry, WalkDir};

const BINARY_SNIFF_BYTES: usize = 4096;

/// A file selected for processing. Order follows the command line:
/// explicit paths first, then glob matches, duplicates dropped on first
/// occurrence (the merge command depends on this ordering).
#[derive(Debug, Clone)]
pub struct Target {
    pub path: PathBuf,
    pub is_probably_binary: bool,
}

/// Expand explicit paths and glob patterns into a worklist. Paths and
/// glob matches the user named are taken as-is; the hidden-entry filter
/// only prunes dot-entries found while walking a directory, and
/// `--exclude` globs apply everywhere.
pub fn resolve_targets(
    explicit: &[PathBuf],
    globs: &[String],
    include_hidden: bool,
    exclude_patterns: &[String],
) -> Result<Vec<Target>> {
    let exclude = build_exclude_globs(exclude_patterns)?;
    let mut seen = HashSet::new();
    let mut targets = Vec::new();

    for path in explicit {
        collect_path(path, include_hidden, exclude.as_ref(), &mut seen, &mut targets)
            .with_context(|| format!("processing target {}", path.display()))?;
    }

    for pattern in globs {
        let matches =
            glob(pattern).map_err(|err| anyhow!("invalid glob pattern '{pattern}': {err}"))?;
        for entry in matches {
            let path =
                entry.map_err(|err| anyhow!("error expanding glob '{pattern}': {err}"))?;
            collect_path(&path, include_hidden, exclude.as_ref(), &mut seen, &mut targets)
                .with_context(|| format!("processing match {}", path.display()))?;
        }
    }

    if targets.is_empty() {
        bail!("no files matched; provide paths or --glob patterns");
    }

    Ok(targets)
}

fn collect_path(
    path: &Path,
    include_hidden: bool,
    exclude: Option<&GlobSet>,
    seen: &mut HashSet<PathBuf>,
    acc: &mut Vec<Target>,
) -> Result<()> {
    let metadata = fs::metadata(path)
        .with_context(|| format!("unable to read metadata for {}", path.display()))?;

    if metadata.is_dir() {
        return walk_directory(path, include_hidden, exclude, seen, acc);
    }

    if metadata.is_file() && !is_excluded(path, exclude) {
        push_target(path.to_path_buf(), seen, acc)?;
    }

    Ok(())
}

fn walk_directory(
    dir: &Path,
    include_hidden: bool,
    exclude: Option<&GlobSet>,
    seen: &mut HashSet<PathBuf>,
    acc: &mut Vec<Target>,
) -> Result<()> {
    // Depth 0 is the walk root itself, which the user named explicitly;
    // the hidden filter only applies to entries discovered below it.
    let walker = WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| {
            entry.depth() == 0 || include_hidden || !is_hidden(entry)
        });

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        if is_excluded(&path, exclude) {
            continue;
        }
        push_target(path, seen, acc)?;
    }

    Ok(())
}

fn push_target(path: PathBuf, seen: &mut HashSet<PathBuf>, acc: &mut Vec<Target>) -> Result<()> {
    if !seen.insert(path.clone()) {
        return Ok(());
    }
    let is_probably_binary = sniff_binary(&path)?;
    acc.push(Target {
        path,
        is_probably_binary,
    });
    Ok(())
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn is_excluded(path: &Path, exclude: Option<&GlobSet>) -> bool {
    let Some(set) = exclude else {
        return false;
    };
    let candidate = path.to_string_lossy().replace('\\', "/");
    set.is_match(candidate.as_str())
}

/// A NUL byte in the first few KiB is a strong binary signal; text files
/// in any supported encoding other than UTF-16 never contain one, and
/// UTF-16 files are recognized by their BOM before this matters.
fn sniff_binary(path: &Path) -> Result<bool> {
    let mut file = fs::File::open(path)
        .with_context(|| format!("opening '{}' for binary sniffing", path.display()))?;
    let mut buf = [0u8; BINARY_SNIFF_BYTES];
    let read = file.read(&mut buf)?;
    if buf[..read].starts_with(&[0xFF, 0xFE]) || buf[..read].starts_with(&[0xFE, 0xFF]) {
        return Ok(false);
    }
    Ok(buf[..read].contains(&0))
}

fn build_exclude_globs(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob =
            Glob::new(pattern).map_err(|err| anyhow!("invalid exclude glob '{pattern}': {err}"))?;
        builder.add(glob);
    }

    builder
        .build()
        .map(Some)
        .map_err(|err| anyhow!("unable to build exclude globs: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn explicit_order_is_preserved_and_deduped() {
        let temp = tempdir().expect("temp dir");
        let b = temp.path().join("b.txt");
        let a = temp.path().join("a.txt");
        fs::write(&b, "b").expect("write");
        fs::write(&a, "a").expect("write");

        let targets =
            resolve_targets(&[b.clone(), a.clone(), b.clone()], &[], false, &[]).expect("resolve");
        let paths: Vec<_> = targets.iter().map(|t| t.path.clone()).collect();
        assert_eq!(paths, vec![b, a]);
    }

    #[test]
    fn directories_are_walked() {
        let temp = tempdir().expect("temp dir");
        let sub = temp.path().join("sub");
        fs::create_dir(&sub).expect("mkdir");
        fs::write(sub.join("inner.txt"), "x").expect("write");
        fs::write(temp.path().join("top.txt"), "y").expect("write");

        let targets =
            resolve_targets(&[temp.path().to_path_buf()], &[], false, &[]).expect("resolve");
        assert_eq!(targets.len(), 2);
    }

    #[test]
    fn walking_skips_hidden_entries_unless_asked() {
        let temp = tempdir().expect("temp dir");
        let hidden = temp.path().join(".cache");
        fs::create_dir(&hidden).expect("mkdir");
        fs::write(hidden.join("secret.txt"), "s").expect("write");
        fs::write(temp.path().join(".dotfile"), "d").expect("write");
        fs::write(temp.path().join("visible.txt"), "v").expect("write");

        let targets =
            resolve_targets(&[temp.path().to_path_buf()], &[], false, &[]).expect("resolve");
        assert_eq!(targets.len(), 1);
        assert!(targets[0].path.ends_with("visible.txt"));

        let all = resolve_targets(&[temp.path().to_path_buf()], &[], true, &[]).expect("resolve");
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn explicitly_named_hidden_files_are_accepted() {
        let temp = tempdir().expect("temp dir");
        let dotfile = temp.path().join(".env");
        fs::write(&dotfile, "KEY=1").expect("write");

        let targets = resolve_targets(&[dotfile.clone()], &[], false, &[]).expect("resolve");
        assert_eq!(targets[0].path, dotfile);
    }

    #[test]
    fn excludes_filter_matches_out() {
        let temp = tempdir().expect("temp dir");
        fs::write(temp.path().join("keep.txt"), "k").expect("write");
        fs::write(temp.path().join("drop.log"), "d").expect("write");

        let targets = resolve_targets(
            &[temp.path().to_path_buf()],
            &[],
            false,
            &["*.log".to_string()],
        )
        .expect("resolve");
        assert_eq!(targets.len(), 1);
        assert!(targets[0].path.ends_with("keep.txt"));
    }

    #[test]
    fn nul_bytes_mark_a_file_binary_but_utf16_boms_do_not() {
        let temp = tempdir().expect("temp dir");
        let binary = temp.path().join("blob.bin");
        fs::write(&binary, [b'a', 0x00, b'b']).expect("write");
        assert!(sniff_binary(&binary).expect("sniff"));

        let wide = temp.path().join("wide.txt");
        fs::write(&wide, [0xFF, 0xFE, b'h', 0x00]).expect("write");
        assert!(!sniff_binary(&wide).expect("sniff"));

        let plain = temp.path().join("plain.txt");
        fs::write(&plain, "text").expect("write");
        assert!(!sniff_binary(&plain).expect("sniff"));
    }

    #[test]
    fn empty_selection_is_an_error() {
        assert!(resolve_targets(&[], &[], false, &[]).is_err());
    }
}

use similar::{ChangeTag, TextDiff};

const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const RESET: &str = "\x1b[0m";

/// Print a grouped line diff between the on-disk text and the transformed
/// text, with `context` unchanged lines around each change.
pub fn print_diff(old: &str, new: &str, context: usize, colorize: bool) {
    let diff = TextDiff::configure()
        .algorithm(similar::Algorithm::Myers)
        .diff_lines(old, new);

    for (idx, group) in diff.grouped_ops(context).iter().enumerate() {
        if idx > 0 {
            println!("...");
        }
        for op in group {
            for change in diff.iter_changes(op) {
                let (sign, color) = match change.tag() {
                    ChangeTag::Delete => ("- ", RED),
                    ChangeTag::Insert => ("+ ", GREEN),
                    ChangeTag::Equal => ("  ", ""),
                };
                if colorize && !color.is_empty() {
                    print!("{color}{sign}{}{RESET}", change.value().trim_end_matches('\n'));
                    println!();
                } else {
                    print!("{sign}{change}");
                    if !change.value().ends_with('\n') {
                        println!();
                    }
                }
            }
        }
    }
}

/// Short "+N -M lines" description of a change, used for log entries.
pub fn change_summary(old: &str, new: &str) -> String {
    let diff = TextDiff::from_lines(old, new);
    let mut inserted = 0usize;
    let mut deleted = 0usize;
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => inserted += 1,
            ChangeTag::Delete => deleted += 1,
            ChangeTag::Equal => {}
        }
    }
    format!("+{inserted} -{deleted} lines")
}

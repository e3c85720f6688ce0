/// Which cleanup passes to run. Built fresh for every request from the
/// caller's current toggles; never accumulated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleaningOptions {
    pub trim_whitespace: bool,
    pub clean_whitespace: bool,
    pub remove_tabs: bool,
}

impl CleaningOptions {
    pub fn any_enabled(&self) -> bool {
        self.trim_whitespace || self.clean_whitespace || self.remove_tabs
    }
}

/// Drop leading and trailing blank lines, then strip trailing whitespace
/// from every remaining line. Leading whitespace is left alone. An input
/// that is empty or all-whitespace collapses to the empty string.
pub fn trim_whitespace(text: &str) -> String {
    let mut lines: Vec<&str> = text.lines().collect();

    while lines.first().is_some_and(|line| line.trim().is_empty()) {
        lines.remove(0);
    }
    while lines.last().is_some_and(|line| line.trim().is_empty()) {
        lines.pop();
    }

    lines
        .iter()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collapse every run of two or more space characters within a line to a
/// single space. Tabs and line breaks are untouched.
pub fn clean_whitespace(text: &str) -> String {
    text.lines()
        .map(collapse_space_runs)
        .collect::<Vec<_>>()
        .join("\n")
}

fn collapse_space_runs(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_run = false;
    for ch in line.chars() {
        if ch == ' ' {
            if !in_run {
                out.push(' ');
            }
            in_run = true;
        } else {
            in_run = false;
            out.push(ch);
        }
    }
    out
}

/// Strip any mixture of tabs and spaces from the start of each line.
/// Interior whitespace is untouched.
pub fn remove_tabs(text: &str) -> String {
    text.lines()
        .map(|line| line.trim_start_matches([' ', '\t']))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Run the enabled passes in a fixed order: trim, then collapse, then
/// de-indent. Trimming goes first so boundary noise is gone before run
/// collapsing sees the content; de-indenting goes last because the earlier
/// passes can change what counts as leading whitespace.
pub fn apply_options(text: &str, options: &CleaningOptions) -> String {
    let mut result = text.to_string();
    if options.trim_whitespace {
        result = trim_whitespace(&result);
    }
    if options.clean_whitespace {
        result = clean_whitespace(&result);
    }
    if options.remove_tabs {
        result = remove_tabs(&result);
    }
    result
}

/// Concatenate document contents with the separator between pairs only.
pub fn merge_documents(contents: &[String], separator: &str) -> String {
    contents.join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trim_strips_leading_blank_lines() {
        assert_eq!(trim_whitespace("\n\nhello"), "hello");
    }

    #[test]
    fn trim_strips_trailing_blank_lines() {
        assert_eq!(trim_whitespace("hello\n\n"), "hello");
    }

    #[test]
    fn trim_strips_trailing_spaces_per_line() {
        assert_eq!(trim_whitespace("hello   \nworld   \n\n"), "hello\nworld");
    }

    #[test]
    fn trim_keeps_internal_blank_lines() {
        assert_eq!(trim_whitespace("para1\n\npara2"), "para1\n\npara2");
    }

    #[test]
    fn trim_keeps_leading_indentation() {
        assert_eq!(trim_whitespace("  indented  "), "  indented");
    }

    #[test]
    fn trim_of_whitespace_only_input_is_empty() {
        assert_eq!(trim_whitespace(""), "");
        assert_eq!(trim_whitespace("   \n  \n"), "");
    }

    #[test]
    fn trim_is_idempotent() {
        for text in ["", "  a  \n\n b \n", "\n\nx\n\n", "plain"] {
            let once = trim_whitespace(text);
            assert_eq!(trim_whitespace(&once), once);
        }
    }

    #[test]
    fn clean_collapses_space_runs() {
        assert_eq!(clean_whitespace("a  b   c"), "a b c");
        assert_eq!(clean_whitespace("hello    world"), "hello world");
    }

    #[test]
    fn clean_leaves_single_spaces_and_line_breaks() {
        assert_eq!(clean_whitespace("hello world"), "hello world");
        assert_eq!(clean_whitespace("line1\nline2"), "line1\nline2");
    }

    #[test]
    fn clean_does_not_touch_tabs() {
        assert_eq!(clean_whitespace("a\t\tb"), "a\t\tb");
    }

    #[test]
    fn clean_never_leaves_adjacent_spaces() {
        for text in ["a  b", "  lots    of     gaps  ", "x \n  y  z"] {
            let cleaned = clean_whitespace(text);
            for line in cleaned.lines() {
                assert!(!line.contains("  "), "double space survived in {line:?}");
            }
        }
    }

    #[test]
    fn remove_tabs_strips_leading_mixture() {
        assert_eq!(remove_tabs("\tindented\n\t\tdouble"), "indented\ndouble");
        assert_eq!(remove_tabs("\t  hello"), "hello");
        assert_eq!(remove_tabs("   hello"), "hello");
    }

    #[test]
    fn remove_tabs_keeps_interior_whitespace() {
        assert_eq!(remove_tabs("hello\tworld"), "hello\tworld");
    }

    #[test]
    fn remove_tabs_leaves_no_leading_blanks() {
        for text in ["\t a", "  \t b\n\t\tc", "plain\n   deep"] {
            let result = remove_tabs(text);
            for line in result.lines() {
                assert!(!line.starts_with([' ', '\t']), "leading blank in {line:?}");
            }
        }
    }

    #[test]
    fn apply_with_nothing_enabled_is_identity() {
        let text = "  hello  \n  world  ";
        assert_eq!(apply_options(text, &CleaningOptions::default()), text);
    }

    #[test]
    fn apply_runs_passes_in_order() {
        let options = CleaningOptions {
            trim_whitespace: true,
            clean_whitespace: true,
            remove_tabs: true,
        };
        assert_eq!(apply_options("\n\t  hello    world  \n\n", &options), "hello world");
    }

    #[test]
    fn apply_single_passes() {
        let trim_only = CleaningOptions {
            trim_whitespace: true,
            ..Default::default()
        };
        assert_eq!(apply_options("\nhello\n", &trim_only), "hello");

        let clean_only = CleaningOptions {
            clean_whitespace: true,
            ..Default::default()
        };
        assert_eq!(apply_options("a  b", &clean_only), "a b");

        let tabs_only = CleaningOptions {
            remove_tabs: true,
            ..Default::default()
        };
        assert_eq!(apply_options("\thello", &tabs_only), "hello");
    }

    #[test]
    fn merge_places_separator_between_pairs_only() {
        let contents = vec!["aaa".to_string(), "bbb".to_string()];
        assert_eq!(merge_documents(&contents, "\n"), "aaa\nbbb");
        assert_eq!(merge_documents(&contents[..1], "\n"), "aaa");
        assert_eq!(merge_documents(&[], "\n"), "");
    }

    #[test]
    fn merge_accepts_empty_separator() {
        let contents = vec!["a".to_string(), "b".to_string()];
        assert_eq!(merge_documents(&contents, ""), "ab");
    }
}

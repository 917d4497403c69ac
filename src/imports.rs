//! Parses the leaderboard text exported from the predecessor bot so its
//! players can carry their lengths over.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

/// One parsed leaderboard line: the display name as printed (possibly
/// truncated by the exporter) and the length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedLine {
    pub name: String,
    pub length: i64,
}

// Matches both export flavors: "1. Name — 25 см." and "1|Name — 25 см.",
// where long names end in a "..." ellipsis.
static TOP_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{1,3}((\. )|\|)(?P<name>.+?)(\.{3})? — (?P<length>\d+) см\.")
        .expect("valid leaderboard pattern")
});

/// Extracts all player lines from an exported top. Header lines are skipped;
/// any later line that fails to parse makes the whole import fail, so the
/// caller can show exactly what was rejected.
pub fn parse_exported_top(text: &str) -> Result<Vec<ImportedLine>> {
    let mut lines = Vec::new();
    let mut invalid = Vec::new();

    let body = text
        .lines()
        .map(str::trim)
        .skip_while(|line| !TOP_LINE.is_match(line));
    for line in body {
        if line.is_empty() {
            continue;
        }
        match TOP_LINE.captures(line) {
            Some(caps) => {
                let length = match caps["length"].parse() {
                    Ok(length) => length,
                    Err(_) => {
                        invalid.push(line.to_owned());
                        continue;
                    }
                };
                lines.push(ImportedLine {
                    name: caps["name"].to_owned(),
                    length,
                });
            }
            None => invalid.push(line.to_owned()),
        }
    }

    if invalid.is_empty() {
        Ok(lines)
    } else {
        Err(Error::ImportInvalidLines(invalid))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const EXPORT: &str = "\
Топ 3 игроков:

1. Alice — 25 см.
2|Bob... — 10 см.
3. Charlie_X — 7 см.";

    #[test]
    fn parses_both_line_flavors_and_skips_the_header() {
        let lines = parse_exported_top(EXPORT).unwrap();
        assert_eq!(
            lines,
            vec![
                ImportedLine {
                    name: "Alice".to_owned(),
                    length: 25
                },
                ImportedLine {
                    name: "Bob".to_owned(),
                    length: 10
                },
                ImportedLine {
                    name: "Charlie_X".to_owned(),
                    length: 7
                },
            ]
        );
    }

    #[test]
    fn a_broken_line_fails_the_whole_import() {
        let text = "1. Alice — 25 см.\nnot a line at all\n2. Bob — 10 см.";
        match parse_exported_top(text) {
            Err(Error::ImportInvalidLines(invalid)) => {
                assert_eq!(invalid, vec!["not a line at all".to_owned()]);
            }
            other => panic!("expected invalid-lines error, got {other:?}"),
        }
    }

    #[test]
    fn an_export_with_no_player_lines_is_empty() {
        assert!(parse_exported_top("nothing here").unwrap().is_empty());
    }
}

//! Documentation-block parsers
//!
//! Extracts `Requires:` / `Ensures:` clause sources from free-form documentation
//! text. Parsing is driven purely by indentation; the rest of the block (Args,
//! Returns, prose) is ignored.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Contract section inside a documentation block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    /// Preconditions: `Requires:`
    Requires,
    /// Postconditions: `Ensures:`
    Ensures,
}

impl Section {
    pub fn title(self) -> &'static str {
        match self {
            Section::Requires => "Requires",
            Section::Ensures => "Ensures",
        }
    }
}

/// Raw clause sources read from one documentation block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocClauses {
    pub requires: Vec<String>,
    pub ensures: Vec<String>,
}

impl DocClauses {
    pub fn is_empty(&self) -> bool {
        self.requires.is_empty() && self.ensures.is_empty()
    }
}

/// A documentation dialect.
pub trait ClauseReader: Send + Sync {
    /// Style this reader implements.
    fn style(&self) -> Style;

    /// Clause sources of one section, in order. Empty if the section is
    /// absent or has no body.
    fn read_section(&self, doc: &str, section: Section) -> Vec<String>;

    fn read(&self, doc: &str) -> DocClauses {
        DocClauses {
            requires: self.read_section(doc, Section::Requires),
            ensures: self.read_section(doc, Section::Ensures),
        }
    }
}

/// Supported documentation dialects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    /// Indentation-delimited `Requires:` / `Ensures:` sections.
    #[default]
    Google,
}

impl Style {
    pub fn reader(self) -> &'static dyn ClauseReader {
        match self {
            Style::Google => &GoogleStyle,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Style::Google => "google",
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Style {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Style::Google),
            other => Err(ConfigError::UnknownStyle(other.to_string())),
        }
    }
}

/// Google-style sections:
///
/// ```text
///     Requires:
///         a >= 0
///         b < 10
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct GoogleStyle;

impl ClauseReader for GoogleStyle {
    fn style(&self) -> Style {
        Style::Google
    }

    fn read_section(&self, doc: &str, section: Section) -> Vec<String> {
        // Header: optional indentation, title, colon, nothing else
        let pattern = format!(r"^([ \t]*){}:[ \t]*$", regex::escape(section.title()));
        let header_re = match Regex::new(&pattern) {
            Ok(re) => re,
            Err(_) => return Vec::new(),
        };

        let lines: Vec<&str> = doc.lines().collect();
        let Some((header_idx, header_indent)) = lines.iter().enumerate().find_map(|(i, line)| {
            header_re
                .captures(line)
                .and_then(|caps| caps.get(1))
                .map(|m| (i, m.as_str()))
        }) else {
            return Vec::new();
        };

        let mut body = lines[header_idx + 1..]
            .iter()
            .skip_while(|line| line.trim().is_empty());

        let Some(first) = body.next() else {
            return Vec::new();
        };
        let Some(rest) = first.strip_prefix(header_indent) else {
            return Vec::new();
        };
        let deeper = rest.len() - rest.trim_start_matches([' ', '\t']).len();
        if deeper == 0 {
            return Vec::new();
        }
        let body_indent = &first[..header_indent.len() + deeper];

        let mut clauses = vec![first[body_indent.len()..].trim_end().to_string()];
        clauses.extend(
            body.take_while(|line| line.starts_with(body_indent) && !line.trim().is_empty())
                .map(|line| line.trim().to_string()),
        );
        clauses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "
        Args:
            a:
            b:

        Returns:
            y: The sum of the inputs

        Requires:
            (0..1).contains(&a)
            (6..7).contains(&b)

        Ensures:
            (6..8).contains(&ret)
            ret > a
            ret >= b
        ";

    #[test]
    fn test_reads_both_sections() {
        let clauses = GoogleStyle.read(DOC);
        assert_eq!(
            clauses.requires,
            vec!["(0..1).contains(&a)", "(6..7).contains(&b)"]
        );
        assert_eq!(
            clauses.ensures,
            vec!["(6..8).contains(&ret)", "ret > a", "ret >= b"]
        );
    }

    #[test]
    fn test_section_order_is_irrelevant() {
        let doc = "\n    Ensures:\n        ret > 0\n    Requires:\n        a > 0\n";
        let clauses = GoogleStyle.read(doc);
        assert_eq!(clauses.requires, vec!["a > 0"]);
        assert_eq!(clauses.ensures, vec!["ret > 0"]);
    }

    #[test]
    fn test_unindented_header() {
        let doc = "\nRequires:\n    self > 0\n";
        assert_eq!(GoogleStyle.read_section(doc, Section::Requires), vec!["self > 0"]);
    }

    #[test]
    fn test_tabs_and_trailing_spaces() {
        let doc = "\tRequires:  \n\t\ta > 1  \n\t\tb > 2\n";
        assert_eq!(
            GoogleStyle.read_section(doc, Section::Requires),
            vec!["a > 1", "b > 2"]
        );
    }

    #[test]
    fn test_header_without_body() {
        let doc = "    Requires:\n    Ensures:\n        ret > 0\n";
        assert!(GoogleStyle.read_section(doc, Section::Requires).is_empty());
        assert_eq!(GoogleStyle.read_section(doc, Section::Ensures), vec!["ret > 0"]);
    }

    #[test]
    fn test_header_at_end_of_doc() {
        assert!(GoogleStyle.read_section("Summary.\n    Requires:", Section::Requires).is_empty());
    }

    #[test]
    fn test_missing_sections() {
        let clauses = GoogleStyle.read("Just prose.\n\n    Args:\n        a: thing\n");
        assert!(clauses.is_empty());
    }

    #[test]
    fn test_blank_line_ends_section() {
        let doc = "    Requires:\n        a > 0\n\n        b > 0\n";
        assert_eq!(GoogleStyle.read_section(doc, Section::Requires), vec!["a > 0"]);
    }

    #[test]
    fn test_blank_lines_before_body_are_skipped() {
        let doc = "    Requires:\n\n\n        a > 0\n        b > 0";
        assert_eq!(
            GoogleStyle.read_section(doc, Section::Requires),
            vec!["a > 0", "b > 0"]
        );
    }

    #[test]
    fn test_deeper_lines_are_separate_clauses() {
        let doc = "  Requires:\n    a > 0\n      b > 0\n  Ensures:\n    ret\n";
        assert_eq!(
            GoogleStyle.read_section(doc, Section::Requires),
            vec!["a > 0", "b > 0"]
        );
    }

    #[test]
    fn test_style_names() {
        assert_eq!("google".parse::<Style>().unwrap(), Style::Google);
        assert_eq!("Google".parse::<Style>().unwrap(), Style::Google);
        assert!(matches!(
            "numpy".parse::<Style>(),
            Err(ConfigError::UnknownStyle(name)) if name == "numpy"
        ));
        assert_eq!(Style::default().reader().style(), Style::Google);
    }
}

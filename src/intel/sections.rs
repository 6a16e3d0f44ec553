//! Splits a flat report into sections keyed by exact header lines.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub header: String,
    pub lines: Vec<String>,
}

/// Parsed sections in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Sections {
    entries: Vec<Section>,
}

impl Sections {
    pub fn get(&self, header: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|s| s.header == header)
            .map(|s| s.lines.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Section> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // A repeated header replaces the earlier body but keeps its position.
    fn close(&mut self, header: &str, lines: Vec<String>) {
        match self.entries.iter_mut().find(|s| s.header == header) {
            Some(existing) => existing.lines = lines,
            None => self.entries.push(Section {
                header: header.to_string(),
                lines,
            }),
        }
    }
}

enum ParseState<'h> {
    Outside,
    InSection { header: &'h str, lines: Vec<String> },
}

pub fn parse<'h, H: AsRef<str>>(text: &str, headers: &'h [H]) -> Sections {
    let mut out = Sections::default();
    let mut state = ParseState::Outside;

    for raw in text.lines() {
        let line = raw.trim();
        let matched = headers.iter().map(|h| h.as_ref()).find(|h| *h == line);

        state = match (state, matched) {
            (ParseState::Outside, None) => ParseState::Outside,
            (ParseState::Outside, Some(header)) => ParseState::InSection {
                header,
                lines: Vec::new(),
            },
            (ParseState::InSection { header, lines }, Some(next)) => {
                out.close(header, lines);
                ParseState::InSection {
                    header: next,
                    lines: Vec::new(),
                }
            }
            (ParseState::InSection { header, mut lines }, None) => {
                lines.push(line.to_string());
                ParseState::InSection { header, lines }
            }
        };
    }

    if let ParseState::InSection { header, lines } = state {
        out.close(header, lines);
    }
    out
}

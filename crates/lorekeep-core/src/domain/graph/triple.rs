//! Triple values and parsing of raw extraction output

use serde::{Deserialize, Serialize};

/// Separator the extraction service uses when it packs several
/// statements into one line
const STATEMENT_SEPARATOR: &str = " AND ";

/// Field delimiter between subject, predicate, and object
const FIELD_DELIMITER: char = '|';

/// A (subject, predicate, object) factual statement extracted from text.
///
/// Predicates are conventionally short uppercase verb phrases
/// (e.g. `OWNS`, `BLOCKED_BY`), but this is not enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl Triple {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }
}

impl std::fmt::Display for Triple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -[{}]-> {}", self.subject, self.predicate, self.object)
    }
}

/// Parse the extraction service's raw output into triples.
///
/// One triple per line as `Subject|Predicate|Object`; a line containing
/// `" AND "` is split into multiple statements first. Lines that do not
/// have exactly three non-empty fields are dropped silently. The whole
/// response `NONE` (case-insensitive) yields no triples. Absence of
/// triples is a normal outcome, never an error.
pub fn parse_triples(response: &str) -> Vec<Triple> {
    let trimmed = response.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("NONE") {
        return Vec::new();
    }

    let mut statements: Vec<&str> = Vec::new();
    for line in response.lines() {
        if line.contains(STATEMENT_SEPARATOR) {
            statements.extend(
                line.split(STATEMENT_SEPARATOR)
                    .map(str::trim)
                    .filter(|part| !part.is_empty()),
            );
        } else {
            statements.push(line.trim());
        }
    }

    let mut triples = Vec::new();
    for statement in statements {
        if !statement.contains(FIELD_DELIMITER) {
            continue;
        }
        let parts: Vec<&str> = statement.split(FIELD_DELIMITER).map(str::trim).collect();
        if parts.len() != 3 {
            continue;
        }
        if parts.iter().any(|part| part.is_empty()) {
            continue;
        }
        triples.push(Triple::new(parts[0], parts[1], parts[2]));
    }
    triples
}

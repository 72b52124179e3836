//! Prompt templates for triple extraction and disambiguation

/// System prompt for triple extraction
pub const TRIPLE_EXTRACTION_SYSTEM_PROMPT: &str = "You are a precise information extraction system. \
You output only what is asked for, with no commentary.";

/// Build the user prompt asking for subject|predicate|object triples
pub fn triple_extraction_prompt(text: &str, max_triples: usize) -> String {
    format!(
        r#"Given a piece of text, extract concise triples that describe facts or relationships.

Rules:
- Output only triples, nothing else.
- Each triple must be on its own line as Subject|Predicate|Object.
- Use short predicate verbs in uppercase (e.g., HAS_SENTIMENT, NEEDS, BLOCKED_BY, OWNS).
- If there is nothing to extract, return NONE.
- Keep subjects and objects concise but meaningful; avoid pronouns.
- Extract at most {max_triples} triples.

TEXT:
{text}
"#
    )
}

/// System prompt for entity disambiguation
pub const DISAMBIGUATION_SYSTEM_PROMPT: &str = "You are an entity resolution system. \
You decide whether a new mention refers to an already-known entity.";

/// Build the user prompt asking whether `label` matches one of `candidates`
pub fn disambiguation_prompt(label: &str, candidates: &[String]) -> String {
    format!(
        r#"A new entity mention was found: "{label}"

Known entities that might be the same:
{candidates}

If the new mention refers to one of the known entities, answer with that
entity's name exactly as written above, and nothing else.
If it is a different entity, answer NONE.
"#,
        candidates = candidates.join("\n"),
    )
}

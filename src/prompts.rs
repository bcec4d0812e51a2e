//! Fixed instruction prompts for the model-backed pipeline stages.
//!
//! Templates use `{name}` placeholders filled by [`render`]. Each stage pairs its system prompt
//! with a short user message so that providers without system-role support still see the task.

/// Placeholder carrying a section's raw excerpt.
pub const SECTION_CONTENT: &str = "section_content";
/// Placeholder carrying the full extracted document text.
pub const SDS_INFO: &str = "sds_info";

/// System prompt for splitting a document into sections. The document is the user message.
pub const SPLIT_SECTIONS_SYSTEM_PROMPT: &str = "\
You are an expert in chemical safety documentation. You will receive the full text of a \
Safety Data Sheet (SDS), usually converted from PDF to markdown.

Split the document into its logical sections in document order. A standard SDS has sixteen \
numbered sections (Identification, Hazard(s) identification, Composition/information on \
ingredients, First-aid measures, ...), but follow the structure of the document you are given \
rather than the standard when they differ.

For every section return:
- `title`: the section heading as written in the document;
- `shortSummary`: one or two sentences describing what the section contains;
- `rawExcerpt`: the verbatim text of the section, without rewording or omissions.

Respond only with JSON matching the requested schema.";

/// System prompt for structuring one section; `{section_content}` receives the excerpt.
pub const STRUCTURE_SECTION_SYSTEM_PROMPT: &str = "\
You convert one section of a Safety Data Sheet into a JSON object capturing its key facts.

Rules:
- Use concise snake_case keys (for example `chemical_name`, `cas_number`, `signal_word`).
- Keep values faithful to the source; do not invent data that is not present.
- Use nested objects or arrays when the section lists several items.
- Output a single JSON object and nothing else.

Section content:
{section_content}";

/// User message accompanying [`STRUCTURE_SECTION_SYSTEM_PROMPT`].
pub const STRUCTURE_SECTION_USER_MESSAGE: &str =
    "Please structure the given section content into a valid JSON representation";

/// System prompt for the document summary; `{sds_info}` receives the full text.
pub const SUMMARY_SYSTEM_PROMPT: &str = "\
You are a chemical safety specialist. Summarize the Safety Data Sheet below for a reader who \
needs the essentials quickly: what the substance is and what it is used for, its main hazards \
and signal word, required protective measures, first-aid highlights, and storage or disposal \
constraints. Write in markdown, stay factual, and do not add information that is not in the \
document.

Safety Data Sheet:
{sds_info}";

/// User message accompanying [`SUMMARY_SYSTEM_PROMPT`].
pub const SUMMARY_USER_MESSAGE: &str =
    "Please provide a summary of the chemical substance described in the given Safety Data Sheet";

/// System prompt for question answering; `{sds_info}` receives the full text. The question is
/// the user message.
pub const QUESTION_SYSTEM_PROMPT: &str = "\
You answer questions about a chemical using only the Safety Data Sheet below. Quote exact \
values (concentrations, temperatures, exposure limits) when they are available. If the sheet \
does not contain the answer, say so plainly instead of guessing.

Safety Data Sheet:
{sds_info}";

/// Placeholder carrying the answer under evaluation.
pub const ANSWER: &str = "answer";
/// Placeholder carrying the acceptance criteria an answer is judged against.
pub const ACCEPTANCE_CRITERIA: &str = "acceptance_criteria";

/// Prompt for grading an answer against acceptance criteria. Sent as the only (user) message.
pub const JUDGE_PROMPT: &str = "\
You are grading an answer given by an assistant about a Safety Data Sheet.

Decide whether the answer satisfies the acceptance criteria. Judge the substance, not the \
wording: extra detail is fine as long as nothing contradicts the criteria, while missing or \
wrong key facts make the answer incorrect. Give a short reason and set `correctness` to true \
only when the criteria are met.

Acceptance criteria:
{acceptance_criteria}

Answer:
{answer}";

/// Substitute `{key}` placeholders in `template`.
///
/// Substitution is a single pass over the template, so placeholder-looking text inside the
/// substituted values is left untouched.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        output.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];
        let replacement = after_open.find('}').and_then(|close| {
            let key = &after_open[..close];
            values
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value, close))
        });
        match replacement {
            Some((value, close)) => {
                output.push_str(value);
                rest = &after_open[close + 1..];
            }
            None => {
                output.push('{');
                rest = after_open;
            }
        }
    }

    output.push_str(rest);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_substitutes_known_placeholders() {
        let rendered = render("Section:\n{section_content}\nEnd", &[(SECTION_CONTENT, "pH 7")]);
        assert_eq!(rendered, "Section:\npH 7\nEnd");
    }

    #[test]
    fn render_leaves_unknown_braces_and_value_braces_alone() {
        let rendered = render(
            "{\"a\": 1} {sds_info} {missing}",
            &[(SDS_INFO, "value with {section_content}")],
        );
        assert_eq!(
            rendered,
            "{\"a\": 1} value with {section_content} {missing}"
        );
    }

    #[test]
    fn templates_carry_their_placeholders() {
        assert!(STRUCTURE_SECTION_SYSTEM_PROMPT.contains("{section_content}"));
        assert!(SUMMARY_SYSTEM_PROMPT.contains("{sds_info}"));
        assert!(QUESTION_SYSTEM_PROMPT.contains("{sds_info}"));
        assert!(JUDGE_PROMPT.contains("{answer}"));
        assert!(JUDGE_PROMPT.contains("{acceptance_criteria}"));
    }
}

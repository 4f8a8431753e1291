//! Markdown section helpers
//!
//! Small text transforms used by the `append`, `decide` and `why` commands.
//! Sections are level-two headings (`## Name`).

use chrono::NaiveDate;

/// Default section for `append`
pub const DEFAULT_APPEND_SECTION: &str = "Current Work";

/// Section that holds recorded decisions
pub const DECISIONS_SECTION: &str = "Decisions Made";

/// Inserts `- {line}` directly under `## {section}`
///
/// Only the first matching heading receives the line. When the section does
/// not exist it is appended at the end of the document.
pub fn append_to_section(content: &str, section: &str, line: &str) -> String {
    insert_under_heading(content, section, &format!("- {}", line))
}

/// Adds a decision block under `## Decisions Made`
pub fn record_decision(content: &str, decision: &str, rationale: &str, date: NaiveDate) -> String {
    let block = format!(
        "\n**Decision**: {}\n**Rationale**: {}\n**Date**: {}\n",
        decision,
        rationale,
        date.format("%Y-%m-%d")
    );
    insert_under_heading(content, DECISIONS_SECTION, &block)
}

/// Returns the non-empty lines of the first `## Decisions` section
pub fn extract_decisions(content: &str, max_lines: usize) -> Vec<String> {
    content
        .lines()
        .skip_while(|line| !line.contains("## Decisions"))
        .skip(1)
        .take_while(|line| !line.starts_with("## "))
        .filter(|line| !line.trim().is_empty())
        .take(max_lines)
        .map(str::to_string)
        .collect()
}

fn insert_under_heading(content: &str, section: &str, insert: &str) -> String {
    let heading = format!("## {}", section);
    let mut lines: Vec<&str> = Vec::new();
    let mut inserted = false;

    for line in content.lines() {
        lines.push(line);
        if !inserted && line.trim() == heading {
            lines.push(insert);
            inserted = true;
        }
    }

    if !inserted {
        lines.push("");
        lines.push(&heading);
        lines.push(insert);
    }

    let mut out = lines.join("\n");
    if content.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Markdown skeleton for a new document
pub fn template(name: &str) -> String {
    format!(
        "# {name}

## Current State
[How this works right now]

## Architecture
[Key components, patterns, dependencies]

## Key Files
[Important files and their roles]

## Testing
[How to verify this works]

## Tools & Commands
[Relevant commands, scripts, deployment info]

## Recent Changes
[What changed recently and when]

## Decisions Made
[Key decisions with rationale and dates]

## Notes
[Additional context, gotchas, future considerations]
"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_under_existing_section() {
        let content = "# Doc\n\n## Current Work\n- old item\n\n## Notes\nnone";
        let updated = append_to_section(content, "Current Work", "new item");

        assert_eq!(
            updated,
            "# Doc\n\n## Current Work\n- new item\n- old item\n\n## Notes\nnone"
        );
    }

    #[test]
    fn append_creates_missing_section() {
        let updated = append_to_section("# Doc", "Notes", "remember this");
        assert_eq!(updated, "# Doc\n\n## Notes\n- remember this");
    }

    #[test]
    fn append_keeps_trailing_newline() {
        let updated = append_to_section("# Doc\n\n## Notes\nnone\n", "Notes", "more");
        assert_eq!(updated, "# Doc\n\n## Notes\n- more\nnone\n");

        let updated = append_to_section("# Doc\n", "Current Work", "item");
        assert_eq!(updated, "# Doc\n\n## Current Work\n- item\n");
    }

    #[test]
    fn record_decision_keeps_trailing_newline() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let updated = record_decision("# Doc\n", "Use JWT", "Stateless", date);
        assert!(updated.ends_with("**Date**: 2024-03-01\n\n"));
    }

    #[test]
    fn record_decision_creates_section() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let updated = record_decision("# Doc", "Use JWT", "Stateless", date);

        assert!(updated.contains("## Decisions Made"));
        assert!(updated.contains("**Decision**: Use JWT"));
        assert!(updated.contains("**Rationale**: Stateless"));
        assert!(updated.contains("**Date**: 2024-03-01"));
    }

    #[test]
    fn extract_decisions_stops_at_next_heading() {
        let content = "# Doc\n## Decisions Made\n\n**Decision**: A\n**Rationale**: B\n## Notes\nignored";
        let lines = extract_decisions(content, 5);
        assert_eq!(lines, vec!["**Decision**: A", "**Rationale**: B"]);
    }

    #[test]
    fn extract_decisions_respects_limit_and_absence() {
        let content = "## Decisions\na\nb\nc";
        assert_eq!(extract_decisions(content, 2), vec!["a", "b"]);
        assert!(extract_decisions("# nothing here", 5).is_empty());
    }

    #[test]
    fn template_has_title_and_decisions() {
        let body = template("auth.jwt");
        assert!(body.starts_with("# auth.jwt\n"));
        assert!(body.contains("## Decisions Made"));
    }
}

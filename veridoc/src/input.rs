#![forbid(unsafe_code)]

//! Constraint extraction from free-form documentation description files.
//!
//! A description file mixes prose with notation lines introduced by a
//! `Logical format:` marker, sometimes wrapped in a Markdown code fence.
//! Only implications in the notation are kept; bare facts carry no
//! checkable documentation claim.

const TRIM_SET: &[char] = &['*', '`', '.', ' '];

pub fn extract_constraints(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text.lines().collect();
    let at = |i: usize| lines.get(i).copied().unwrap_or("");

    let mut out = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let marked = line.contains("Logical format") || line.contains("Logical Format");
        if !marked || !line.contains(':') {
            continue;
        }

        let next = at(i + 1);
        let candidate = if next.contains("```") {
            if next.trim() == "```" {
                // Opening fence on its own line; the notation follows it.
                let inner = at(i + 2);
                if inner.trim().is_empty() {
                    continue;
                }
                inner
            } else {
                next
            }
        } else {
            *line
        };

        let constraint = candidate
            .rsplit(':')
            .next()
            .unwrap_or("")
            .trim_matches(TRIM_SET);
        if constraint.contains("->") {
            out.push(constraint.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_marker_line() {
        let text = "Some prose.\nLogical format: (a = 'None') -> (b = 'None')\nMore prose.";
        assert_eq!(
            extract_constraints(text),
            vec!["(a = 'None') -> (b = 'None')"]
        );
    }

    #[test]
    fn fenced_block_after_marker() {
        let text = "Logical format:\n```\n(a = 'None') -> (b = 'None')\n```";
        assert_eq!(
            extract_constraints(text),
            vec!["(a = 'None') -> (b = 'None')"]
        );
    }

    #[test]
    fn inline_fence_on_the_next_line() {
        let text = "Logical Format:\n```(a = 'None') -> (b = 'None')```";
        assert_eq!(
            extract_constraints(text),
            vec!["(a = 'None') -> (b = 'None')"]
        );
    }

    #[test]
    fn markdown_dressing_is_stripped() {
        let text = "Logical format: **`(a = 'None') -> (b = 'None')`**.";
        assert_eq!(
            extract_constraints(text),
            vec!["(a = 'None') -> (b = 'None')"]
        );
    }

    #[test]
    fn lines_without_an_implication_are_dropped() {
        let text = "Logical format: (a = 'None')\nLogical format: (a = 'None') -> (b = 1)";
        assert_eq!(extract_constraints(text), vec!["(a = 'None') -> (b = 1)"]);
    }

    #[test]
    fn marker_at_end_of_file_is_safe() {
        let text = "prose\nLogical format:";
        assert!(extract_constraints(text).is_empty());
    }

    #[test]
    fn empty_fenced_block_is_skipped() {
        let text = "Logical format:\n```\n\n```";
        assert!(extract_constraints(text).is_empty());
    }
}

//! Markdown code-fence removal for model output.

const PYTHON_FENCE: &str = "```python";
const FENCE: &str = "```";

/// Remove Markdown code-fence markers and the blank lines they leave behind.
///
/// Language-tagged `` ```python `` openers are removed first so no stray
/// `python` token is left behind, then every remaining `` ``` `` marker.
/// Fences are removed wherever they occur, not only at line starts.
///
/// Blank lines before the first code line and trailing whitespace are dropped,
/// so the written script starts at its first statement. Indentation of the
/// first code line is kept.
pub fn strip_code_fences(text: &str) -> String {
    let stripped = text.replace(PYTHON_FENCE, "").replace(FENCE, "");
    let body = stripped.trim_end();
    let start = match body.find(|c: char| !c.is_whitespace()) {
        Some(first) => body[..first].rfind('\n').map_or(0, |newline| newline + 1),
        None => body.len(),
    };
    body[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_python_fenced_block() {
        let raw = "```python\nprint('hi')\n```";
        assert_eq!(strip_code_fences(raw), "print('hi')");
    }

    #[test]
    fn strips_untagged_fences() {
        let raw = "```\nimport os\nos.makedirs('p', exist_ok=True)\n```\n";
        assert_eq!(
            strip_code_fences(raw),
            "import os\nos.makedirs('p', exist_ok=True)"
        );
    }

    #[test]
    fn drops_surrounding_blank_lines() {
        assert_eq!(strip_code_fences("\n\n  \nx = 1\n\n"), "x = 1");
    }

    #[test]
    fn keeps_first_line_indentation() {
        let raw = "```python\n    x = 1\n    y = 2\n```";
        assert_eq!(strip_code_fences(raw), "    x = 1\n    y = 2");
        assert_eq!(strip_code_fences("  x = 1\n"), "  x = 1");
    }

    #[test]
    fn whitespace_only_yields_empty() {
        assert_eq!(strip_code_fences("```python\n \n```"), "");
    }

    #[test]
    fn other_language_tags_keep_their_label() {
        // Only the python tag is recognised; other tags lose just the backticks.
        assert_eq!(strip_code_fences("```sql\nSELECT 1\n```"), "sql\nSELECT 1");
    }
}

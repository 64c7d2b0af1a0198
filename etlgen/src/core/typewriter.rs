//! Line splitting for the typewriter-style code display.

/// Split code into the lines shown one at a time by the animated display.
///
/// Leading and trailing whitespace is trimmed first so the animation neither
/// starts nor ends with blank frames.
pub fn code_lines(code: &str) -> Vec<&str> {
    code.trim().split('\n').collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_trimmed_code_into_lines() {
        assert_eq!(code_lines("\na = 1\n\nb = 2\n"), vec!["a = 1", "", "b = 2"]);
    }

    #[test]
    fn empty_code_yields_single_blank_line() {
        assert_eq!(code_lines("   "), vec![""]);
    }
}

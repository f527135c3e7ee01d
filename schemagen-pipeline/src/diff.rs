//! Unified structural diff for conflicting duplicate symbols.

use similar::TextDiff;

use crate::error::DuplicateSymbolError;

impl DuplicateSymbolError {
    /// Unified diff between the two conflicting definitions, rendered as
    /// pretty JSON. Object keys are sorted, so only real differences show.
    pub fn structural_diff(&self) -> String {
        let old = with_trailing_newline(self.first.to_pretty_string());
        let new = with_trailing_newline(self.second.to_pretty_string());
        let old_header = format!("a/{}#/definitions/{}", self.first_path.display(), self.symbol);
        let new_header = format!("b/{}#/definitions/{}", self.second_path.display(), self.symbol);
        TextDiff::from_lines(&old, &new)
            .unified_diff()
            .header(&old_header, &new_header)
            .context_radius(3)
            .to_string()
    }
}

fn with_trailing_newline(mut s: String) -> String {
    if !s.ends_with('\n') {
        s.push('\n');
    }
    s
}

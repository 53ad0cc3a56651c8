//! Output formatting for CLI.

mod json;
mod text;

pub use json::{CreditsOutput, JsonFormatter, ProcessOutput, StageOutput};
pub use text::TextFormatter;

/// Shows the first and last four characters of a key.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

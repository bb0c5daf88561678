//! Console output icons.

use console::{style, StyledObject};

/// Green ✓.
pub fn success() -> StyledObject<&'static str> {
    style("✓").green()
}

/// Cyan →.
pub fn info() -> StyledObject<&'static str> {
    style("→").cyan()
}

/// Yellow !.
pub fn warn() -> StyledObject<&'static str> {
    style("!").yellow()
}

/// Red ✗.
pub fn error() -> StyledObject<&'static str> {
    style("✗").red()
}

/// Dim arrow for secondary info.
pub fn dim_arrow() -> StyledObject<&'static str> {
    style("→").dim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icons_render() {
        for icon in [success(), info(), warn(), error(), dim_arrow()] {
            assert!(!icon.to_string().is_empty());
        }
    }
}

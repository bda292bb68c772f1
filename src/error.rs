#[cfg(feature = "napi")]
use napi_derive::napi;
use serde::{Deserialize, Serialize};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_EMPTY_TEMPLATE: &str = "E-EMPTY";
pub const ERR_OPTION_FLAG: &str = "E-OPTION";
pub const ERR_TAG_NAME: &str = "E-TAG";
pub const ERR_CLASS_NAME: &str = "E-CLASS";
pub const ERR_BINDING_NAME: &str = "E-NAME";
pub const ERR_INVALID_STRING: &str = "E-STRING";
pub const ERR_EXPECTED_EQ: &str = "E-EQ";
pub const ERR_EXPECTED_EXPR: &str = "E-EXPR";
pub const ERR_TEMPLATE_SIZE: &str = "E-SIZE";
pub const ERR_INTERNAL: &str = "E-INTERNAL";

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER ERROR
// ═══════════════════════════════════════════════════════════════════════════════

/// Compiler error raised while parsing a template.
///
/// `statics_offset` is the index of the static fragment that was active when
/// the error was raised, `text_offset` is the offset inside it in UTF-16 code
/// units. `E-INTERNAL` errors carry no position and report `(0, 0)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct CompilerError {
    pub code: String,
    pub message: String,
    pub statics_offset: u32,
    pub text_offset: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl CompilerError {
    pub fn new(code: &str, message: &str, statics_offset: usize, text_offset: usize) -> Self {
        CompilerError {
            code: code.to_string(),
            message: message.to_string(),
            statics_offset: statics_offset as u32,
            text_offset: text_offset as u32,
        }
    }

    /// Builds an error from a byte position in `text`. The reported offset
    /// is counted in UTF-16 code units, the way JavaScript indexes strings.
    pub fn at(
        code: &str,
        message: &str,
        statics_offset: usize,
        text: &str,
        byte_offset: usize,
    ) -> Self {
        let prefix = text.get(..byte_offset).unwrap_or(text);
        Self::new(code, message, statics_offset, prefix.encode_utf16().count())
    }

    /// Line and column (both 1-based) of the error inside its fragment.
    ///
    /// Columns count chars. An offset that splits a surrogate pair stops
    /// before that char.
    pub fn location<S: AsRef<str>>(&self, statics: &[S]) -> SourceLocation {
        let text = self.fragment(statics);
        let end = self.text_offset as usize;
        let mut units = 0;
        let mut line = 1;
        let mut column = 1;
        for c in text.chars() {
            units += c.len_utf16();
            if units > end {
                break;
            }
            if c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        SourceLocation { line, column }
    }

    /// Renders the message followed by the offending fragment and a caret
    /// under the error position.
    pub fn code_frame<S: AsRef<str>>(&self, statics: &[S]) -> String {
        let text = self.fragment(statics);
        let loc = self.location(statics);
        format!(
            "{}\n\n{}\n{}^\n",
            self.message,
            text,
            " ".repeat(loc.column as usize - 1)
        )
    }

    fn fragment<'a, S: AsRef<str>>(&self, statics: &'a [S]) -> &'a str {
        statics
            .get(self.statics_offset as usize)
            .map(|s| s.as_ref())
            .unwrap_or("")
    }
}

impl fmt::Display for CompilerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} (fragment {}, offset {})",
            self.code, self.message, self.statics_offset, self.text_offset
        )
    }
}

impl std::error::Error for CompilerError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_counts_lines_in_fragment() {
        let statics = ["div\n  :a=", "\n  span"];
        let err = CompilerError::new(ERR_EXPECTED_EXPR, "expected an expression", 0, 8);
        assert_eq!(err.location(&statics), SourceLocation { line: 2, column: 5 });

        let err = CompilerError::new(ERR_TAG_NAME, "expected a valid tag name", 1, 3);
        assert_eq!(err.location(&statics), SourceLocation { line: 2, column: 3 });
    }

    #[test]
    fn test_code_frame_points_at_offset() {
        let statics = ["div :a='x"];
        let err = CompilerError::new(ERR_EXPECTED_EXPR, "expected a string or an expression", 0, 7);
        let frame = err.code_frame(&statics);
        assert_eq!(
            frame,
            "expected a string or an expression\n\ndiv :a='x\n       ^\n"
        );
    }

    #[test]
    fn test_offsets_count_utf16_units() {
        let text = "p 'é😀' 1x";
        let err = CompilerError::at(ERR_TAG_NAME, "expected a valid tag name", 0, text, 11);
        assert_eq!(err.text_offset, 8);
    }

    #[test]
    fn test_location_with_non_ascii_text() {
        let statics = ["'é' x"];
        let err = CompilerError::new(ERR_TAG_NAME, "expected a valid tag name", 0, 2);
        assert_eq!(err.location(&statics), SourceLocation { line: 1, column: 3 });

        // Offset inside a surrogate pair, or past the end of the fragment.
        let statics = ["😀x"];
        let err = CompilerError::new(ERR_TAG_NAME, "expected a valid tag name", 0, 1);
        assert_eq!(err.location(&statics), SourceLocation { line: 1, column: 1 });
        let err = CompilerError::new(ERR_TAG_NAME, "expected a valid tag name", 0, 40);
        assert_eq!(err.location(&statics), SourceLocation { line: 1, column: 3 });
        assert!(err.code_frame(&statics).ends_with("😀x\n  ^\n"));
    }

    #[test]
    fn test_display_includes_code_and_position() {
        let err = CompilerError::new(ERR_EMPTY_TEMPLATE, "empty template", 0, 0);
        assert_eq!(err.to_string(), "[E-EMPTY] empty template (fragment 0, offset 0)");
    }
}

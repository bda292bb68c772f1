//! Scanner over template fragments.
//!
//! A template is `fragment₀ expr₀ fragment₁ … fragmentₙ`. The scanner owns the
//! parse cursor (fragment index, byte offset, indentation) and only ever moves
//! forward.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{CompilerError, ERR_INVALID_STRING};

lazy_static! {
    /// Tag, attribute, class, style and event names.
    static ref IDENTIFIER: Regex = Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_\-]*").unwrap();

    /// DOM property names.
    static ref JS_PROPERTY: Regex = Regex::new(r"^[a-zA-Z_$][a-zA-Z0-9_]*").unwrap();
}

pub struct Scanner<'a> {
    statics: &'a [&'a str],
    text: &'a str,
    /// Byte offset in `text`.
    i: usize,
    /// Index of the active fragment (equals the next expression index).
    e: usize,
    pub indent: usize,
}

impl<'a> Scanner<'a> {
    /// `statics` must contain at least one fragment.
    pub fn new(statics: &'a [&'a str]) -> Self {
        Scanner {
            statics,
            text: statics.first().copied().unwrap_or(""),
            i: 0,
            e: 0,
            indent: 0,
        }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn skip(&mut self, n: usize) {
        self.i += n;
    }

    pub fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.i).copied()
    }

    /// All literal content of the active fragment has been consumed.
    pub fn at_fragment_end(&self) -> bool {
        self.i >= self.text.len()
    }

    /// There is still an expression slot after the active fragment.
    pub fn has_expr(&self) -> bool {
        self.e + 1 < self.statics.len()
    }

    /// Builds an error located at the current cursor position.
    pub fn error(&self, code: &str, message: &str) -> CompilerError {
        CompilerError::at(code, message, self.e, self.text, self.i)
    }

    /// Consumes the expression slot that follows the active fragment.
    ///
    /// Only possible when the fragment is exhausted; the cursor then moves to
    /// the start of the next fragment.
    pub fn take_expr(&mut self) -> Option<usize> {
        if self.at_fragment_end() && self.has_expr() {
            let e = self.e;
            self.e += 1;
            self.i = 0;
            self.text = self.statics[self.e];
            Some(e)
        } else {
            None
        }
    }

    fn regexp(&mut self, re: &Regex) -> Option<&'a str> {
        let text = self.text;
        let m = re.find(&text[self.i..])?;
        let start = self.i;
        self.i += m.end();
        Some(&text[start..self.i])
    }

    pub fn identifier(&mut self) -> Option<&'a str> {
        self.regexp(&IDENTIFIER)
    }

    pub fn property_name(&mut self) -> Option<&'a str> {
        self.regexp(&JS_PROPERTY)
    }

    /// Skips whitespace and updates the indentation level. A line break
    /// resets the level, every space or tab increments it.
    pub fn whitespace(&mut self) -> bool {
        let bytes = self.text.as_bytes();
        let mut i = self.i;
        let mut indent = self.indent;
        while i < bytes.len() {
            match bytes[i] {
                b' ' | b'\t' => indent += 1,
                b'\n' | b'\r' => indent = 0,
                _ => break,
            }
            i += 1;
        }

        if i != self.i {
            self.indent = indent;
            self.i = i;
            true
        } else {
            false
        }
    }

    /// Optional `=` token.
    pub fn eq(&mut self) -> bool {
        if self.peek() == Some(b'=') {
            self.i += 1;
            true
        } else {
            false
        }
    }

    /// Reads a string literal and returns its escaped contents.
    ///
    /// Two forms are supported: `'basic string'` and `##'stri'n'g'##`, where
    /// the closing quote has to be followed by the same number of `#`. An
    /// empty result means that there is no well-formed literal here.
    pub fn string(&mut self, is_attribute: bool) -> Result<String, CompilerError> {
        let text = self.text;
        let bytes = text.as_bytes();
        let length = bytes.len();
        let mut i = self.i;
        let mut hash_delim = 0;
        let mut s = String::new();

        if i >= length {
            return Ok(s);
        }

        let mut c;
        loop {
            c = bytes[i];
            i += 1;
            if c == b'#' && i < length {
                hash_delim += 1;
            } else {
                break;
            }
        }
        if c != b'\'' {
            return Ok(String::new());
        }

        let mut start = i;
        'outer: while i < length {
            c = bytes[i];
            i += 1;
            if c == b'\'' {
                let end = i - 1;
                let j = i + hash_delim;
                if j > length {
                    return Err(self.error(ERR_INVALID_STRING, "invalid string"));
                }
                while i < j {
                    if bytes[i] != b'#' {
                        continue 'outer;
                    }
                    i += 1;
                }
                self.i = i;
                s.push_str(&text[start..end]);
                return Ok(s);
            }

            let entity = match c {
                b'&' => "&amp;",
                b'"' if is_attribute => "&quot;",
                b'<' if !is_attribute => "&lt;",
                _ => continue,
            };
            s.push_str(&text[start..i - 1]);
            s.push_str(entity);
            start = i;
        }

        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_is_longest_match() {
        let statics = ["my-tag_1.cls"];
        let mut s = Scanner::new(&statics);
        assert_eq!(s.identifier(), Some("my-tag_1"));
        assert_eq!(s.i, 8);
        assert_eq!(s.identifier(), None);
        assert_eq!(s.i, 8);
    }

    #[test]
    fn test_property_name_rejects_dash() {
        let statics = ["$value-x"];
        let mut s = Scanner::new(&statics);
        assert_eq!(s.property_name(), Some("$value"));
        assert_eq!(s.peek(), Some(b'-'));
    }

    #[test]
    fn test_whitespace_measures_indent() {
        let statics = ["  \n\t  x"];
        let mut s = Scanner::new(&statics);
        assert!(s.whitespace());
        assert_eq!(s.indent, 3);
        assert_eq!(s.peek(), Some(b'x'));
        assert!(!s.whitespace());
        assert_eq!(s.indent, 3);
    }

    #[test]
    fn test_string_escapes_by_context() {
        let statics = [r#"'a & b < "c"'"#];
        let mut s = Scanner::new(&statics);
        assert_eq!(s.string(false).unwrap(), r#"a &amp; b &lt; "c""#);

        let mut s = Scanner::new(&statics);
        assert_eq!(s.string(true).unwrap(), "a &amp; b < &quot;c&quot;");
        assert!(s.at_fragment_end());
    }

    #[test]
    fn test_hash_delimited_string() {
        let statics = ["##'it's'#' fine'## rest"];
        let mut s = Scanner::new(&statics);
        assert_eq!(s.string(false).unwrap(), "it's'#' fine");
        assert_eq!(s.peek(), Some(b' '));
    }

    #[test]
    fn test_unterminated_string_is_empty() {
        let statics = ["'abc"];
        let mut s = Scanner::new(&statics);
        assert_eq!(s.string(false).unwrap(), "");
        assert_eq!(s.i, 0);
    }

    #[test]
    fn test_short_hash_delimiter_is_an_error() {
        let statics = ["x ##'abc'"];
        let mut s = Scanner::new(&statics);
        s.skip(2);
        let err = s.string(false).unwrap_err();
        assert_eq!(err.message, "invalid string");
        assert_eq!(err.statics_offset, 0);
        assert_eq!(err.text_offset, 2);
    }

    #[test]
    fn test_error_offset_skips_multibyte_text() {
        let statics = ["p 'é' x"];
        let mut s = Scanner::new(&statics);
        s.skip(2);
        assert_eq!(s.string(false).unwrap(), "é");
        assert_eq!(s.i, 6);
        assert_eq!(s.error(ERR_INVALID_STRING, "invalid string").text_offset, 5);
    }

    #[test]
    fn test_take_expr_only_at_fragment_end() {
        let statics = ["div", " span"];
        let mut s = Scanner::new(&statics);
        assert_eq!(s.take_expr(), None);
        assert_eq!(s.identifier(), Some("div"));
        assert_eq!(s.take_expr(), Some(0));
        assert_eq!(s.e, 1);
        assert_eq!(s.text(), " span");
        s.skip(5);
        assert_eq!(s.take_expr(), None);
    }
}

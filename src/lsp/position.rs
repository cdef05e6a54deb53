//! Conversions between linear text offsets and LSP positions.
//!
//! Offsets count Unicode scalar values (`char`s) of the document text. LSP
//! positions are zero-based `(line, character)` pairs whose `character` is
//! measured in UTF-16 code units, so anything outside the Basic Multilingual
//! Plane occupies two columns. Only `\n` terminates a line; a preceding `\r`
//! is an ordinary column.

use tower_lsp::lsp_types::Position;

use super::errors::{CoreError, CoreResult};

/// Converts a char offset into an LSP position.
///
/// Fails with [`CoreError::InvalidOffset`] when `offset` is past the end of
/// `text`. `offset == len` is valid and addresses the end of the text.
pub fn offset_to_position(text: &str, offset: usize) -> CoreResult<Position> {
    let mut line = 0u32;
    let mut column = 0u32;
    let mut seen = 0usize;

    for c in text.chars() {
        if seen == offset {
            return Ok(Position::new(line, column));
        }
        if c == '\n' {
            line += 1;
            column = 0;
        } else {
            column += c.len_utf16() as u32;
        }
        seen += 1;
    }

    if seen == offset {
        Ok(Position::new(line, column))
    } else {
        Err(CoreError::InvalidOffset { offset, len: seen })
    }
}

/// Converts an LSP position into a char offset.
///
/// A line past the last line fails with [`CoreError::LineOutOfRange`]. A
/// column past the end of its line clamps to the end of that line, and a
/// column landing inside a surrogate pair resolves to the start of that
/// character.
pub fn position_to_offset(text: &str, position: Position) -> CoreResult<usize> {
    let target_line = position.line as usize;
    let mut chars = text.chars().enumerate().peekable();

    let mut line = 0usize;
    let mut line_start = 0usize;
    while line < target_line {
        match chars.next() {
            Some((idx, '\n')) => {
                line += 1;
                line_start = idx + 1;
            }
            Some(_) => {}
            None => {
                return Err(CoreError::LineOutOfRange {
                    line: position.line,
                    line_count: line + 1,
                });
            }
        }
    }

    let mut units = 0u32;
    let mut offset = line_start;
    while let Some(&(idx, c)) = chars.peek() {
        if c == '\n' {
            break;
        }
        let width = c.len_utf16() as u32;
        if units + width > position.character {
            return Ok(idx);
        }
        units += width;
        offset = idx + 1;
        chars.next();
    }

    Ok(offset)
}

/// Maps a char offset to the byte index of that char, for slicing.
///
/// Returns `None` when the offset is past the end of the text.
pub fn char_to_byte(text: &str, offset: usize) -> Option<usize> {
    if offset == 0 {
        return Some(0);
    }
    match text.char_indices().nth(offset) {
        Some((byte, _)) => Some(byte),
        None if text.chars().count() == offset => Some(text.len()),
        None => None,
    }
}

/// Number of lines in `text`, counting the (possibly empty) final line.
pub fn line_count(text: &str) -> usize {
    text.matches('\n').count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{QuickCheck, TestResult};

    #[test]
    fn test_offset_to_position_ascii() {
        let text = "void main() {\n  gl_FragColor = vec4(1.0);\n}";
        assert_eq!(offset_to_position(text, 0).unwrap(), Position::new(0, 0));
        assert_eq!(offset_to_position(text, 5).unwrap(), Position::new(0, 5));
        assert_eq!(offset_to_position(text, 13).unwrap(), Position::new(0, 13));
        assert_eq!(offset_to_position(text, 14).unwrap(), Position::new(1, 0));
        assert_eq!(offset_to_position(text, 16).unwrap(), Position::new(1, 2));
        let end = text.chars().count();
        assert_eq!(offset_to_position(text, end).unwrap(), Position::new(2, 1));
    }

    #[test]
    fn test_offset_past_end_is_invalid() {
        let err = offset_to_position("abc", 4).unwrap_err();
        assert_eq!(err, CoreError::InvalidOffset { offset: 4, len: 3 });
        assert!(offset_to_position("", 0).is_ok());
        assert!(offset_to_position("", 1).is_err());
    }

    #[test]
    fn test_astral_characters_take_two_columns() {
        // U+1F600 is outside the BMP; é is a single UTF-16 unit.
        let text = "a😀é😀b";
        assert_eq!(offset_to_position(text, 1).unwrap(), Position::new(0, 1));
        assert_eq!(offset_to_position(text, 2).unwrap(), Position::new(0, 3));
        assert_eq!(offset_to_position(text, 3).unwrap(), Position::new(0, 4));
        assert_eq!(offset_to_position(text, 4).unwrap(), Position::new(0, 6));
        assert_eq!(offset_to_position(text, 5).unwrap(), Position::new(0, 7));

        assert_eq!(position_to_offset(text, Position::new(0, 6)).unwrap(), 4);
        assert_eq!(position_to_offset(text, Position::new(0, 7)).unwrap(), 5);
    }

    #[test]
    fn test_column_inside_surrogate_pair_snaps_to_char_start() {
        let text = "x😀y";
        assert_eq!(position_to_offset(text, Position::new(0, 2)).unwrap(), 1);
    }

    #[test]
    fn test_column_past_line_end_clamps() {
        let text = "ab\ncdef\n";
        assert_eq!(position_to_offset(text, Position::new(0, 99)).unwrap(), 2);
        assert_eq!(position_to_offset(text, Position::new(1, 99)).unwrap(), 7);
        assert_eq!(position_to_offset(text, Position::new(2, 5)).unwrap(), 8);
    }

    #[test]
    fn test_line_out_of_range() {
        let text = "ab\ncd";
        let err = position_to_offset(text, Position::new(2, 0)).unwrap_err();
        assert_eq!(err, CoreError::LineOutOfRange { line: 2, line_count: 2 });
    }

    #[test]
    fn test_crlf_carriage_return_is_a_column() {
        let text = "a\r\nb";
        assert_eq!(offset_to_position(text, 2).unwrap(), Position::new(0, 2));
        assert_eq!(offset_to_position(text, 3).unwrap(), Position::new(1, 0));
        assert_eq!(position_to_offset(text, Position::new(0, 2)).unwrap(), 2);
    }

    #[test]
    fn test_char_to_byte() {
        let text = "é😀z";
        assert_eq!(char_to_byte(text, 0), Some(0));
        assert_eq!(char_to_byte(text, 1), Some(2));
        assert_eq!(char_to_byte(text, 2), Some(6));
        assert_eq!(char_to_byte(text, 3), Some(7));
        assert_eq!(char_to_byte(text, 4), None);
        assert_eq!(line_count(text), 1);
        assert_eq!(line_count("a\nb\n"), 3);
    }

    #[test]
    fn test_round_trip_property() {
        fn prop(text: String, seed: usize) -> TestResult {
            let len = text.chars().count();
            let offset = if len == 0 { 0 } else { seed % (len + 1) };
            let position = match offset_to_position(&text, offset) {
                Ok(position) => position,
                Err(_) => return TestResult::failed(),
            };
            match position_to_offset(&text, position) {
                Ok(back) => TestResult::from_bool(back == offset),
                Err(_) => TestResult::failed(),
            }
        }

        QuickCheck::new()
            .tests(500)
            .quickcheck(prop as fn(String, usize) -> TestResult);
    }
}

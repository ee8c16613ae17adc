//
// utf16.rs
//
// Byte offset (tree-sitter) to UTF-16 column (LSP) conversion
//

/// Convert a byte offset within a line to a UTF-16 column.
///
/// Offsets that fall inside a multi-byte character are clamped to the start
/// of that character; offsets past the end of the line map to its full width.
pub fn byte_offset_to_utf16_column(line: &str, byte_offset: usize) -> u32 {
    let mut utf16_count = 0u32;
    for (byte_idx, ch) in line.char_indices() {
        if byte_idx + ch.len_utf8() > byte_offset {
            return utf16_count;
        }
        utf16_count += ch.len_utf16() as u32;
    }
    utf16_count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_columns() {
        let line = "@GetMapping(\"/x\")";
        assert_eq!(byte_offset_to_utf16_column(line, 4), 4);
    }

    #[test]
    fn test_multibyte_characters() {
        // 'é' is 2 bytes / 1 UTF-16 unit, '😀' is 4 bytes / 2 UTF-16 units
        let line = "é😀@A";
        assert_eq!(byte_offset_to_utf16_column(line, 2), 1);
        assert_eq!(byte_offset_to_utf16_column(line, 6), 3);
    }

    #[test]
    fn test_offset_inside_character_clamps() {
        let line = "😀x";
        assert_eq!(byte_offset_to_utf16_column(line, 2), 0);
    }

    #[test]
    fn test_offset_past_end() {
        assert_eq!(byte_offset_to_utf16_column("abc", 10), 3);
    }
}

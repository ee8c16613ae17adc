//
// document.rs
//
// Source text of a scanned file, addressable by byte offset and LSP position
//

use ropey::Rope;
use tower_lsp::lsp_types::{Position, Range, Url};

use crate::utf16::byte_offset_to_utf16_column;

/// A source document read from disk for the duration of one scan.
///
/// Providers receive this alongside each annotation site so they can turn
/// byte spans into LSP ranges or read surrounding text.
#[derive(Debug, Clone)]
pub struct TextDocument {
    uri: Url,
    language_id: &'static str,
    contents: Rope,
}

impl TextDocument {
    pub fn new(uri: Url, language_id: &'static str, text: &str) -> Self {
        Self {
            uri,
            language_id,
            contents: Rope::from_str(text),
        }
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn language_id(&self) -> &'static str {
        self.language_id
    }

    pub fn len_bytes(&self) -> usize {
        self.contents.len_bytes()
    }

    pub fn text(&self) -> String {
        self.contents.to_string()
    }

    /// Text between two byte offsets, clamped to the document.
    pub fn slice(&self, start_byte: usize, end_byte: usize) -> String {
        let len = self.contents.len_bytes();
        let start = start_byte.min(len);
        let end = end_byte.clamp(start, len);
        let start_char = self.contents.byte_to_char(start);
        let end_char = self.contents.byte_to_char(end);
        self.contents.slice(start_char..end_char).to_string()
    }

    /// LSP position (line, UTF-16 column) of a byte offset.
    pub fn position_at(&self, byte_offset: usize) -> Position {
        let byte_offset = byte_offset.min(self.contents.len_bytes());
        let line = self.contents.byte_to_line(byte_offset);
        let line_start = self.contents.line_to_byte(line);
        let line_text = self.contents.line(line).to_string();
        let character = byte_offset_to_utf16_column(&line_text, byte_offset - line_start);
        Position::new(line as u32, character)
    }

    /// LSP range covering `length` bytes starting at `start_byte`.
    pub fn to_range(&self, start_byte: usize, length: usize) -> Range {
        Range {
            start: self.position_at(start_byte),
            end: self.position_at(start_byte.saturating_add(length)),
        }
    }
}

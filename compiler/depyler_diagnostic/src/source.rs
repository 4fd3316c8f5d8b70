use depyler_ir::{LineCol, LineIndex, Span};

/// A source file as the emitters see it: path, text and line table.
#[derive(Clone, Debug)]
pub struct SourceFile {
    pub path: String,
    pub text: String,
    index: LineIndex,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let index = LineIndex::new(&text);
        SourceFile {
            path: path.into(),
            text,
            index,
        }
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.index
    }

    pub fn line_col(&self, offset: u32) -> LineCol {
        self.index.line_col(&self.text, offset)
    }

    pub fn line_text(&self, line: u32) -> &str {
        self.index.line_text(&self.text, line)
    }

    /// 1-based Python line of a span's start.
    pub fn line_of(&self, span: Span) -> u32 {
        self.index.span_line(span)
    }
}

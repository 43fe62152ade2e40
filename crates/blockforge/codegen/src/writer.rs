//! Indentation-aware text buffer used by the emitters.

const INDENT: &str = "    ";

#[derive(Debug, Default)]
pub(crate) struct SourceBuf {
    buf: String,
    depth: usize,
}

impl SourceBuf {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write one line at the current depth. Empty input writes a bare newline.
    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.depth {
                self.buf.push_str(INDENT);
            }
            self.buf.push_str(text);
        }
        self.buf.push('\n');
    }

    pub fn blank(&mut self) {
        self.buf.push('\n');
    }

    /// Write a line and indent what follows.
    pub fn open(&mut self, text: impl AsRef<str>) {
        self.line(text);
        self.depth += 1;
    }

    /// Dedent and write a closing line.
    pub fn close(&mut self, text: impl AsRef<str>) {
        self.depth = self.depth.saturating_sub(1);
        self.line(text);
    }

    pub fn finish(self) -> String {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nesting() {
        let mut b = SourceBuf::new();
        b.open("a {");
        b.line("b;");
        b.blank();
        b.close("}");
        assert_eq!(b.finish(), "a {\n    b;\n\n}\n");
    }

    #[test]
    fn close_never_underflows() {
        let mut b = SourceBuf::new();
        b.close("}");
        assert_eq!(b.finish(), "}\n");
    }
}

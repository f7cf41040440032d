//! Line writer with indentation management.

const INDENT: &str = "    ";

/// Output buffer for the interface transcript.
#[derive(Debug, Default)]
pub struct Writer {
    output: String,
    indent_level: usize,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an indented line with trailing newline.
    pub fn line(&mut self, line: &str) {
        for _ in 0..self.indent_level {
            self.output.push_str(INDENT);
        }
        self.output.push_str(line);
        self.output.push('\n');
    }

    pub fn lines<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            self.line(line.as_ref());
        }
    }

    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    pub fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    /// Write `f`'s lines one level deeper.
    pub fn indented(&mut self, f: impl FnOnce(&mut Self)) {
        self.indent();
        f(self);
        self.dedent();
    }

    pub fn finish(self) -> String {
        self.output
    }
}

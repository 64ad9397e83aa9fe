use crate::scanner::KEYWORDS;

/// Line-buffering state for the interactive prompt: input is collected
/// until braces balance, and bare expressions are wrapped in a print
/// statement so the REPL echoes their value.
pub struct ReplState {
    buffer: String,
    brace_depth: usize,
}

impl Default for ReplState {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplState {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            brace_depth: 0,
        }
    }

    pub fn prompt(&self) -> String {
        if self.brace_depth == 0 {
            "> ".to_string()
        } else {
            format!("..{} ", self.brace_depth)
        }
    }

    /// Returns true if ready to execute (braces balanced)
    pub fn process_line(&mut self, line: &str) -> bool {
        for ch in line.chars() {
            match ch {
                '{' => self.brace_depth += 1,
                '}' => self.brace_depth = self.brace_depth.saturating_sub(1),
                _ => {}
            }
        }

        self.buffer.push_str(line);
        self.buffer.push('\n');

        self.brace_depth == 0
    }

    pub fn take_buffer(&mut self) -> String {
        self.brace_depth = 0;
        std::mem::take(&mut self.buffer)
    }

    pub fn cancel(&mut self) {
        self.buffer.clear();
        self.brace_depth = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Check if input should be auto-printed (expression without semicolon)
    pub fn should_auto_print(input: &str) -> bool {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return false;
        }
        if trimmed.starts_with("//") {
            return false;
        }
        if trimmed.starts_with("/*") && trimmed.ends_with("*/") {
            return false;
        }

        // Strip trailing line comment for further checks
        let code = if let Some(idx) = trimmed.find("//") {
            trimmed[..idx].trim()
        } else {
            trimmed
        };

        // Strip trailing block comment
        let code = if let Some(start) = code.rfind("/*") {
            if code.ends_with("*/") {
                code[..start].trim()
            } else {
                code
            }
        } else {
            code
        };

        if code.is_empty() {
            return false;
        }

        // Blocks and finished statements are not auto-printed
        if code.ends_with('}') || code.ends_with(';') {
            return false;
        }

        // A leading keyword means an incomplete statement; let the parser
        // produce its own error instead of wrapping
        for (keyword, _) in KEYWORDS {
            if let Some(after_keyword) = code.strip_prefix(keyword)
                && (after_keyword.is_empty() || after_keyword.starts_with(' '))
            {
                return false;
            }
        }

        true
    }

    /// Wrap input in a print statement for auto-printing
    pub fn wrap_for_print(input: &str) -> String {
        format!("print {};", input.trim())
    }
}

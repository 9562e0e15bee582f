use ropey::Rope;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub top_line: usize,
    pub left_col: usize,
    pub width: u16,
    pub height: u16,
}

/// Editable text of the current note.
///
/// Edit methods return whether the text changed, so callers know when to
/// re-render the preview and reschedule autosave.
#[derive(Debug, Clone)]
pub struct EditorBuffer {
    rope: Rope,
    note_id: Option<String>,
    pub cursor: Cursor,
    pub viewport: Viewport,
    preferred_col: usize,
}

impl Default for EditorBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorBuffer {
    pub fn new() -> Self {
        Self {
            rope: Rope::new(),
            note_id: None,
            cursor: Cursor::default(),
            viewport: Viewport {
                top_line: 0,
                left_col: 0,
                width: 80,
                height: 20,
            },
            preferred_col: 0,
        }
    }

    /// Replaces the text with a note's content and resets the view.
    pub fn load(&mut self, note_id: &str, text: &str) {
        self.rope = Rope::from_str(text);
        self.note_id = Some(note_id.to_string());
        self.cursor = Cursor::default();
        self.viewport.top_line = 0;
        self.viewport.left_col = 0;
        self.preferred_col = 0;
    }

    pub fn note_id(&self) -> Option<&str> {
        self.note_id.as_deref()
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    pub fn line_count(&self) -> usize {
        self.rope.len_lines().max(1)
    }

    pub fn line_len(&self, line: usize) -> usize {
        if line >= self.rope.len_lines() {
            return 0;
        }
        let slice = self.rope.line(line);
        let len = slice.len_chars();
        if len > 0 && slice.char(len - 1) == '\n' {
            len - 1
        } else {
            len
        }
    }

    pub fn line_text(&self, line: usize) -> String {
        if line >= self.rope.len_lines() {
            return String::new();
        }
        self.rope
            .line(line)
            .chars()
            .filter(|&c| c != '\n' && c != '\r')
            .collect()
    }

    fn char_index(&self) -> usize {
        let line = self.cursor.line.min(self.line_count() - 1);
        self.rope.line_to_char(line) + self.cursor.col.min(self.line_len(line))
    }

    pub fn set_viewport_size(&mut self, width: u16, height: u16) {
        self.viewport.width = width.max(1);
        self.viewport.height = height.max(1);
        self.scroll_to_cursor();
    }

    pub fn scroll_to_cursor(&mut self) {
        self.cursor.line = self.cursor.line.min(self.line_count() - 1);
        self.cursor.col = self.cursor.col.min(self.line_len(self.cursor.line));

        let rows = self.viewport.height.saturating_sub(1) as usize;
        let cols = self.viewport.width.saturating_sub(1) as usize;
        let vp = &mut self.viewport;
        vp.top_line = vp
            .top_line
            .min(self.cursor.line)
            .max(self.cursor.line.saturating_sub(rows));
        vp.left_col = vp
            .left_col
            .min(self.cursor.col)
            .max(self.cursor.col.saturating_sub(cols));
    }

    fn set_col(&mut self, col: usize) {
        self.cursor.col = col;
        self.preferred_col = col;
        self.scroll_to_cursor();
    }

    fn set_line(&mut self, line: usize) {
        self.cursor.line = line.min(self.line_count() - 1);
        self.cursor.col = self.preferred_col.min(self.line_len(self.cursor.line));
        self.scroll_to_cursor();
    }

    pub fn move_left(&mut self) {
        if self.cursor.col > 0 {
            self.set_col(self.cursor.col - 1);
        } else if self.cursor.line > 0 {
            self.cursor.line -= 1;
            self.set_col(self.line_len(self.cursor.line));
        }
    }

    pub fn move_right(&mut self) {
        if self.cursor.col < self.line_len(self.cursor.line) {
            self.set_col(self.cursor.col + 1);
        } else if self.cursor.line + 1 < self.line_count() {
            self.cursor.line += 1;
            self.set_col(0);
        }
    }

    pub fn move_up(&mut self) {
        self.set_line(self.cursor.line.saturating_sub(1));
    }

    pub fn move_down(&mut self) {
        self.set_line(self.cursor.line + 1);
    }

    pub fn move_home(&mut self) {
        self.set_col(0);
    }

    pub fn move_end(&mut self) {
        self.set_col(self.line_len(self.cursor.line));
    }

    pub fn page_up(&mut self) {
        let amount = self.viewport.height.saturating_sub(1) as usize;
        self.set_line(self.cursor.line.saturating_sub(amount));
    }

    pub fn page_down(&mut self) {
        let amount = self.viewport.height.saturating_sub(1) as usize;
        self.set_line(self.cursor.line + amount);
    }

    pub fn insert_char(&mut self, c: char) -> bool {
        let idx = self.char_index();
        self.rope.insert_char(idx, c);
        if c == '\n' {
            self.cursor.line += 1;
            self.set_col(0);
        } else {
            self.set_col(self.cursor.col + 1);
        }
        true
    }

    pub fn backspace(&mut self) -> bool {
        let idx = self.char_index();
        if idx == 0 {
            return false;
        }
        if self.cursor.col > 0 {
            self.rope.remove(idx - 1..idx);
            self.set_col(self.cursor.col - 1);
        } else {
            let prev_len = self.line_len(self.cursor.line - 1);
            self.rope.remove(idx - 1..idx);
            self.cursor.line -= 1;
            self.set_col(prev_len);
        }
        true
    }

    pub fn delete(&mut self) -> bool {
        let idx = self.char_index();
        if idx >= self.rope.len_chars() {
            return false;
        }
        self.rope.remove(idx..idx + 1);
        self.scroll_to_cursor();
        true
    }
}

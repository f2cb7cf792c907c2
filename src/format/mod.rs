//! Miniscript template formatting
//!
//! Converts between the compact single-line form a template is stored and
//! submitted in and the indented form shown in the template editor.
//! Formatting is purely lexical: malformed input is laid out best-effort and
//! never rejected, and only whitespace is ever inserted, so compacting a
//! display form always gives back the compact input.

use serde::{Deserialize, Deserializer, Serialize};

use crate::utils::strip_whitespace;


/// Layout settings for the display form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatOptions {
    // Spaces per nesting level, at most `MAX_INDENT_WIDTH`
    #[serde(default = "default_indent_width", deserialize_with = "deserialize_indent_width")]
    pub indent_width: usize,
    // Calls that fit within this many columns stay on one line
    #[serde(default = "default_max_line_width")]
    pub max_line_width: usize,
    // Minimum length of a pasted single-line template before the editor formats it
    #[serde(default = "default_auto_format_min_len")]
    pub auto_format_min_len: usize,
}

/// Widest accepted indentation step
pub const MAX_INDENT_WIDTH: usize = 8;

fn default_indent_width() -> usize {
    2
}

fn deserialize_indent_width<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    Ok(usize::deserialize(deserializer)?.min(MAX_INDENT_WIDTH))
}

fn default_max_line_width() -> usize {
    40
}

fn default_auto_format_min_len() -> usize {
    20
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            indent_width: default_indent_width(),
            max_line_width: default_max_line_width(),
            auto_format_min_len: default_auto_format_min_len(),
        }
    }
}

/// Collapse a template to its compact form by dropping all whitespace
pub fn to_compact_form(display: &str) -> String {
    strip_whitespace(display)
}

/// Lay a template out for editing using the default options
pub fn to_display_form(compact: &str) -> String {
    to_display_form_with(compact, &FormatOptions::default())
}

/// Lay a template out for editing
///
/// Calls whose inline rendering does not fit in `max_line_width` get one
/// argument per line, indented one level below the line that opened them.
/// Indentation stops growing at `max_line_width` columns. Braces of taproot
/// trees are treated like parentheses.
pub fn to_display_form_with(input: &str, options: &FormatOptions) -> String {
    let compact = to_compact_form(input);
    if compact.is_empty() {
        return compact;
    }

    let pieces = parse_pieces(&compact);
    let mut layout = Layout {
        options,
        groups: &pieces.groups,
        out: String::with_capacity(compact.len() * 2),
        column: 0,
        tasks: Vec::new(),
    };
    layout.render(&pieces.top);
    layout.out
}

// ============================================================================
// Lexical structure
// ============================================================================

// Groups live in a flat arena so nesting depth never turns into call depth
#[derive(Debug)]
enum Piece {
    Text(String),
    Group(usize),
}

#[derive(Debug)]
struct Group {
    open: char,
    args: Vec<Vec<Piece>>,
    // None when the input ends before the group is closed
    close: Option<char>,
    // Columns taken by the inline rendering
    width: usize,
}

impl Group {
    // A call with a single plain argument, e.g. `pk(A)` or `older(12900)`
    fn is_atom(&self) -> bool {
        match self.args.as_slice() {
            [arg] => arg.iter().all(|piece| matches!(piece, Piece::Text(_))),
            _ => false,
        }
    }
}

struct Pieces {
    groups: Vec<Group>,
    // Top-level comma separated arguments
    top: Vec<Vec<Piece>>,
}

struct Frame {
    open: char,
    args: Vec<Vec<Piece>>,
}

impl Frame {
    fn new(open: char) -> Self {
        Self {
            open,
            args: vec![Vec::new()],
        }
    }

    fn push_char(&mut self, ch: char) {
        if let Some(arg) = self.args.last_mut() {
            match arg.last_mut() {
                Some(Piece::Text(text)) => text.push(ch),
                _ => arg.push(Piece::Text(ch.to_string())),
            }
        }
    }

    fn push_group(&mut self, index: usize) {
        if let Some(arg) = self.args.last_mut() {
            arg.push(Piece::Group(index));
        }
    }

    fn next_arg(&mut self) {
        self.args.push(Vec::new());
    }
}

fn current<'a>(top: &'a mut Frame, open: &'a mut [Frame]) -> &'a mut Frame {
    match open.last_mut() {
        Some(frame) => frame,
        None => top,
    }
}

/// Close a frame into the arena; its children are already there
fn close_frame(groups: &mut Vec<Group>, frame: Frame, close: Option<char>) -> usize {
    let separators = frame.args.len().saturating_sub(1).saturating_mul(2);
    let mut width = 1usize.saturating_add(separators);
    for piece in frame.args.iter().flatten() {
        let piece_width = match piece {
            Piece::Text(text) => text.chars().count(),
            Piece::Group(index) => groups[*index].width,
        };
        width = width.saturating_add(piece_width);
    }
    if close.is_some() {
        width = width.saturating_add(1);
    }

    groups.push(Group {
        open: frame.open,
        args: frame.args,
        close,
        width,
    });
    groups.len() - 1
}

/// Split compact text into top-level arguments of text runs and bracket groups
fn parse_pieces(compact: &str) -> Pieces {
    let mut groups = Vec::new();
    let mut top = Frame::new(' ');
    let mut open: Vec<Frame> = Vec::new();

    for ch in compact.chars() {
        match ch {
            '(' | '{' => open.push(Frame::new(ch)),
            ')' | '}' => match open.pop() {
                Some(frame) => {
                    let index = close_frame(&mut groups, frame, Some(ch));
                    current(&mut top, &mut open).push_group(index);
                }
                // Stray closer, kept verbatim
                None => top.push_char(ch),
            },
            ',' => current(&mut top, &mut open).next_arg(),
            _ => current(&mut top, &mut open).push_char(ch),
        }
    }

    while let Some(frame) = open.pop() {
        let index = close_frame(&mut groups, frame, None);
        current(&mut top, &mut open).push_group(index);
    }

    Pieces { groups, top: top.args }
}

// ============================================================================
// Rendering
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Task<'a> {
    Text(&'a str),
    Char(char),
    Newline(usize),
    // Group laid out at a nesting level, split across lines when too wide
    Group(usize, usize),
    // Group written on the current line
    Inline(usize),
}

struct Layout<'a> {
    options: &'a FormatOptions,
    groups: &'a [Group],
    out: String,
    column: usize,
    // Pending output, last entry first
    tasks: Vec<Task<'a>>,
}

impl<'a> Layout<'a> {
    fn render(&mut self, top: &'a [Vec<Piece>]) {
        let mut tasks = Vec::new();
        for (i, arg) in top.iter().enumerate() {
            if i > 0 {
                tasks.push(Task::Char(','));
                tasks.push(Task::Newline(0));
            }
            sequence_tasks(arg, 0, &mut tasks);
        }
        self.schedule(tasks);

        while let Some(task) = self.tasks.pop() {
            match task {
                Task::Text(text) => {
                    self.out.push_str(text);
                    self.column = self.column.saturating_add(text.chars().count());
                }
                Task::Char(ch) => {
                    self.out.push(ch);
                    self.column = self.column.saturating_add(1);
                }
                Task::Newline(level) => self.newline(level),
                Task::Group(index, level) => self.group(index, level),
                Task::Inline(index) => self.inline(index),
            }
        }
    }

    fn schedule(&mut self, tasks: Vec<Task<'a>>) {
        self.tasks.extend(tasks.into_iter().rev());
    }

    fn newline(&mut self, level: usize) {
        let step = self.options.indent_width.min(MAX_INDENT_WIDTH);
        let indent = level.saturating_mul(step).min(self.options.max_line_width);
        self.out.push('\n');
        self.out.extend(std::iter::repeat(' ').take(indent));
        self.column = indent;
    }

    fn group(&mut self, index: usize, level: usize) {
        let groups = self.groups;
        let group = &groups[index];
        if group.is_atom() || self.column.saturating_add(group.width) <= self.options.max_line_width {
            self.tasks.push(Task::Inline(index));
            return;
        }

        let mut tasks = vec![Task::Char(group.open)];
        for (i, arg) in group.args.iter().enumerate() {
            if i > 0 {
                tasks.push(Task::Char(','));
            }
            tasks.push(Task::Newline(level + 1));
            sequence_tasks(arg, level + 1, &mut tasks);
        }
        if let Some(close) = group.close {
            tasks.push(Task::Newline(level));
            tasks.push(Task::Char(close));
        }
        self.schedule(tasks);
    }

    fn inline(&mut self, index: usize) {
        let groups = self.groups;
        let group = &groups[index];
        let mut tasks = vec![Task::Char(group.open)];
        for (i, arg) in group.args.iter().enumerate() {
            if i > 0 {
                tasks.push(Task::Text(", "));
            }
            for piece in arg {
                tasks.push(match piece {
                    Piece::Text(text) => Task::Text(text),
                    Piece::Group(child) => Task::Inline(*child),
                });
            }
        }
        if let Some(close) = group.close {
            tasks.push(Task::Char(close));
        }
        self.schedule(tasks);
    }
}

fn sequence_tasks<'a>(seq: &'a [Piece], level: usize, tasks: &mut Vec<Task<'a>>) {
    for piece in seq {
        tasks.push(match piece {
            Piece::Text(text) => Task::Text(text),
            Piece::Group(index) => Task::Group(*index, level),
        });
    }
}

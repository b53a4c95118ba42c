//! Text emission and splicing.
//!
//! New blocks are rendered with [`BlockWriter`], whose first line carries no
//! indentation so the caller can place it after existing indentation or after a
//! field prefix. Existing text is only ever changed through [`Edit`]s applied by
//! [`apply_edits`].

use super::scanner::{Block, Outline, indent_at, line_start, strip_comment};
use crate::Span;

/// Replace `span` with `replacement`. An empty span is an insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Edit {
    pub span: Span,
    pub replacement: String,
}

impl Edit {
    pub fn replace(span: Span, replacement: impl Into<String>) -> Self {
        Edit { span, replacement: replacement.into() }
    }

    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Edit { span: Span::new(at, at), replacement: text.into() }
    }

    pub fn delete(span: Span) -> Self {
        Edit { span, replacement: String::new() }
    }
}

/// Splice non-overlapping edits into `text`. Insertions at the same offset keep
/// their relative order.
pub(crate) fn apply_edits(text: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|e| (e.span.start, e.span.end));
    let mut out = String::with_capacity(text.len() + edits.iter().map(|e| e.replacement.len()).sum::<usize>());
    let mut cursor = 0usize;
    for edit in edits {
        debug_assert!(edit.span.start >= cursor, "overlapping edits at {}", edit.span.start);
        let start = edit.span.start.max(cursor);
        out.push_str(&text[cursor..start]);
        out.push_str(&edit.replacement);
        cursor = edit.span.end.max(cursor);
    }
    out.push_str(&text[cursor..]);
    out
}

/// Line-oriented emitter for nested blocks.
pub(crate) struct BlockWriter<'a> {
    out: String,
    indent: &'a str,
    unit: &'a str,
    depth: usize,
}

impl<'a> BlockWriter<'a> {
    /// `indent` is the indentation of the first line, which itself is written
    /// without it.
    pub fn new(indent: &'a str, unit: &'a str) -> Self {
        BlockWriter { out: String::new(), indent, unit, depth: 0 }
    }

    pub fn line(&mut self, line: impl AsRef<str>) {
        if !self.out.is_empty() {
            self.out.push('\n');
            self.out.push_str(self.indent);
            for _ in 0..self.depth {
                self.out.push_str(self.unit);
            }
        }
        self.out.push_str(line.as_ref());
    }

    /// Write `<head> {` and indent what follows.
    pub fn open(&mut self, head: impl AsRef<str>) {
        self.line(format!("{} {{", head.as_ref()));
        self.depth += 1;
    }

    pub fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.line("}");
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// Shift a block of text so its least-indented line starts at `indent`.
///
/// Blank lines become empty, and leading/trailing blank lines are dropped.
pub fn reindent(text: &str, indent: &str) -> String {
    let lines: Vec<&str> = text.trim_start_matches(['\n', '\r']).trim_end().lines().collect();
    let leading = |line: &str| line.len() - line.trim_start_matches([' ', '\t']).len();
    let common = lines.iter().filter(|l| !l.trim().is_empty()).map(|l| leading(*l)).min().unwrap_or(0);

    lines
        .iter()
        .map(|line| if line.trim().is_empty() { String::new() } else { format!("{indent}{}", &line[common..]) })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Indentation for a new line inside `idx`: that of its first child or direct
/// line, or the header's plus one unit when the body is empty or inline.
pub(crate) fn inner_indent(text: &str, outline: &Outline, idx: usize, unit: &str) -> String {
    let block = outline.block(idx);
    let open_line = line_start(text, block.open);

    let first_child = outline.children(idx).first().map(|&c| outline.block(c).span.start);
    let first_line = outline.direct_lines(text, idx).first().map(|l| l.start);
    let first = match (first_child, first_line) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };

    match first {
        Some(at) if line_start(text, at) > open_line => indent_at(text, at).to_string(),
        _ => format!("{}{unit}", indent_at(text, block.span.start)),
    }
}

/// Edit appending `content` (complete lines, each already indented, no trailing
/// newline) as the last thing inside `block`.
pub(crate) fn append_to_block(text: &str, block: &Block, content: &str) -> Edit {
    let close_indent = indent_at(text, block.span.start);
    if block.is_empty_body(text) {
        return Edit::replace(block.body(), format!("\n{content}\n{close_indent}"));
    }

    let close_line = line_start(text, block.close);
    if text[close_line..block.close].trim().is_empty() {
        Edit::insert(close_line, format!("{content}\n"))
    } else {
        Edit::insert(block.close, format!("\n{content}\n{close_indent}"))
    }
}

/// Edit adding a new top-level entry: inside the root `entries` map when there
/// is one, else at the end of the text. `render` receives the indentation and
/// returns the entry with an unindented first line.
pub(crate) fn append_top_level(
    text: &str,
    outline: &Outline,
    unit: &str,
    render: impl FnOnce(&str) -> String,
) -> Edit {
    match outline.entries_map() {
        Some(map) => {
            let indent = inner_indent(text, outline, map, unit);
            let rendered = render(&indent);
            append_to_block(text, outline.block(map), &format!("{indent}{rendered}"))
        }
        None => {
            let rendered = render("");
            let sep = if text.is_empty() || text.ends_with('\n') { "" } else { "\n" };
            Edit::insert(text.len(), format!("{sep}{rendered}\n"))
        }
    }
}

/// Edit inserting whole lines at `at`, adding the newlines needed to keep them
/// on lines of their own.
pub(crate) fn insert_lines(text: &str, at: usize, content: &str) -> Edit {
    let lead = if at == 0 || text[..at].ends_with('\n') { "" } else { "\n" };
    let trail = if at == text.len() && !lead.is_empty() { "" } else { "\n" };
    Edit::insert(at, format!("{lead}{content}{trail}"))
}

/// Span covering a block together with its own line(s) when nothing else
/// shares them, so removing it leaves no blank line behind. A comment trailing
/// the block goes with it.
pub(crate) fn removal_span(text: &str, span: Span) -> Span {
    let start_line = line_start(text, span.start);
    let start = if text[start_line..span.start].trim().is_empty() { start_line } else { span.start };

    let line_end = super::scanner::line_end(text, span.end);
    let end = if strip_comment(&text[span.end..line_end]).trim().is_empty() {
        if line_end < text.len() { line_end + 1 } else { line_end }
    } else {
        span.end
    };
    Span::new(start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_apply_in_offset_order() {
        let text = "0123456789";
        let out = apply_edits(
            text,
            vec![Edit::insert(10, "!"), Edit::replace(Span::new(2, 4), "ab"), Edit::delete(Span::new(6, 8))],
        );
        assert_eq!(out, "01ab4589!");
    }

    #[test]
    fn writer_nests_with_unit() {
        let mut w = BlockWriter::new("  ", "    ");
        w.open("a: list[u8] =");
        w.line("1");
        w.close();
        assert_eq!(w.finish(), "a: list[u8] = {\n      1\n  }");
    }

    #[test]
    fn reindent_shifts_to_target() {
        let text = "\n        X {\n            y: u8 = 1\n\n        }\n";
        assert_eq!(reindent(text, "    "), "    X {\n        y: u8 = 1\n\n    }");
    }

    #[test]
    fn append_into_empty_inline_and_multiline_blocks() {
        let text = "  m: map[hash,link] = {}";
        let outline = Outline::scan(text);
        let out = apply_edits(text, vec![append_to_block(text, outline.block(0), "    \"a\" = \"b\"")]);
        assert_eq!(out, "  m: map[hash,link] = {\n    \"a\" = \"b\"\n  }");

        let text = "m = {\n  \"x\" = \"y\"\n}\n";
        let outline = Outline::scan(text);
        let indent = inner_indent(text, &outline, 0, "    ");
        assert_eq!(indent, "  ");
        let out = apply_edits(text, vec![append_to_block(text, outline.block(0), "  \"a\" = \"b\"")]);
        assert_eq!(out, "m = {\n  \"x\" = \"y\"\n  \"a\" = \"b\"\n}\n");

        let text = "m = { 1 }";
        let outline = Outline::scan(text);
        let out = apply_edits(text, vec![append_to_block(text, outline.block(0), "    2")]);
        assert_eq!(out, "m = { 1 \n    2\n}");
    }

    #[test]
    fn top_level_goes_into_entries_or_eof() {
        let text = "entries: map[hash,embed] = {\n}\n";
        let outline = Outline::scan(text);
        let edit = append_top_level(text, &outline, "    ", |_| "\"a\" = B {}".to_string());
        assert_eq!(apply_edits(text, vec![edit]), "entries: map[hash,embed] = {\n    \"a\" = B {}\n}\n");

        let text = "x: u8 = 1";
        let outline = Outline::scan(text);
        let edit = append_top_level(text, &outline, "    ", |_| "\"a\" = B {}".to_string());
        assert_eq!(apply_edits(text, vec![edit]), "x: u8 = 1\n\"a\" = B {}\n");
    }

    #[test]
    fn inserted_lines_stay_on_their_own() {
        let text = "a\nb";
        assert_eq!(apply_edits(text, vec![insert_lines(text, 2, "x")]), "a\nx\nb");
        assert_eq!(apply_edits(text, vec![insert_lines(text, 3, "x")]), "a\nb\nx");
        assert_eq!(apply_edits(text, vec![insert_lines(text, 1, "x")]), "a\nx\n\nb");
    }

    #[test]
    fn removal_span_takes_whole_lines() {
        let text = "a {\n    b {\n    }\n}";
        let outline = Outline::scan(text);
        let span = removal_span(text, outline.block(1).span);
        assert_eq!(apply_edits(text, vec![Edit::delete(span)]), "a {\n}");

        let text = "a {\n    b {\n    } # old\n    c: u8 = 1\n}";
        let outline = Outline::scan(text);
        let span = removal_span(text, outline.block(1).span);
        assert_eq!(apply_edits(text, vec![Edit::delete(span)]), "a {\n    c: u8 = 1\n}");
    }
}

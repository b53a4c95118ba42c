//! Brace scanning and the block outline.
//!
//! The scanner is a small `logos` tokenizer that only cares about `{`, `}`,
//! `,`, string literals and `#` comments. Strings and comments are lexed as
//! whole tokens so braces and commas inside them are never counted; everything
//! else is skipped. Brace matching is therefore character-accurate, including several
//! braces on one line.
//!
//! On top of the token stream, [`Outline::scan`] builds a flat tree of blocks in
//! a single pass. Each block records its head, which is whatever precedes the
//! `{` on its line:
//!
//! ```text
//! "Hero_Q" = VfxSystemDefinitionData {     -> Keyed { key, type_name }
//! transform: mtx44 = {                     -> Field { name, field_type }
//! OwnerCondition: pointer = HasBuff... {   -> Field { name, field_type, type_name }
//! VfxEmitterDefinitionData {               -> Item { type_name }
//! {                                        -> Bare
//! ```
//!
//! Regexes are only applied to these short head prefixes and to lines that the
//! outline has already proven to sit directly inside a block body.

use crate::{NameRef, Span};
use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r##"[^{},"#]+"##)]
enum ScanToken {
    #[token("{")]
    Open,
    #[token("}")]
    Close,
    #[token(",")]
    Comma,
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    Str,
    #[regex(r"#[^\n]*")]
    Comment,
}

/// Offsets of every brace outside strings and comments.
fn brace_tokens(text: &str) -> impl Iterator<Item = (ScanToken, usize)> + '_ {
    let mut lexer = ScanToken::lexer(text);
    std::iter::from_fn(move || {
        loop {
            match lexer.next()? {
                Ok(token @ (ScanToken::Open | ScanToken::Close)) => return Some((token, lexer.span().start)),
                Ok(_) => continue,
                Err(()) => {
                    log::trace!("unterminated string literal at byte {}", lexer.span().start);
                    continue;
                }
            }
        }
    })
}

/// `line` without a trailing `#` comment. A `#` inside a string literal does
/// not start one.
pub(crate) fn strip_comment(line: &str) -> &str {
    let mut lexer = ScanToken::lexer(line);
    while let Some(token) = lexer.next() {
        if token == Ok(ScanToken::Comment) {
            return &line[..lexer.span().start];
        }
    }
    line
}

/// Comma-separated values of one line, commas inside strings excluded.
fn split_values(line: &str) -> Vec<&str> {
    let mut values = Vec::new();
    let mut start = 0usize;
    let mut lexer = ScanToken::lexer(line);
    while let Some(token) = lexer.next() {
        if token == Ok(ScanToken::Comma) {
            values.push(&line[start..lexer.span().start]);
            start = lexer.span().end;
        }
    }
    values.push(&line[start..]);
    values.into_iter().map(str::trim).filter(|v| !v.is_empty()).collect()
}

/// Offset of the `}` matching the first `{` at or after `from`.
///
/// Returns `None` when there is no opening brace, or when depth never returns
/// to zero before the end of the text.
pub fn find_matching_brace(text: &str, from: usize) -> Option<usize> {
    let tail = text.get(from..)?;
    let mut depth = 0usize;
    for (token, offset) in brace_tokens(tail) {
        match token {
            ScanToken::Open => depth += 1,
            ScanToken::Close if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return Some(from + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// True when every `{` has a matching `}` and no `}` closes nothing.
pub fn is_balanced(text: &str) -> bool {
    let mut depth = 0usize;
    for (token, _) in brace_tokens(text) {
        match token {
            ScanToken::Open => depth += 1,
            ScanToken::Close => match depth.checked_sub(1) {
                Some(next) => depth = next,
                None => return false,
            },
            _ => {}
        }
    }
    depth == 0
}

/// Header offsets of all `<key> = <type_name> {` blocks, optionally filtered by key.
pub fn find_headers(text: &str, type_name: &str, key: Option<&NameRef>) -> Vec<usize> {
    let outline = Outline::scan(text);
    outline
        .blocks()
        .iter()
        .filter(|b| match &b.head {
            BlockHead::Keyed { key: k, type_name: Some(t), .. } => {
                t == type_name && key.is_none_or(|wanted| wanted.matches(k))
            }
            _ => false,
        })
        .map(|b| b.span.start)
        .collect()
}

/// First header offset of a `<key> = <type_name> {` block.
pub fn find_header(text: &str, type_name: &str, key: Option<&NameRef>) -> Option<usize> {
    find_headers(text, type_name, key).into_iter().next()
}

// --- Line helpers -------------------------------------------------------------

/// Offset of the first byte of the line containing `idx`.
pub fn line_start(text: &str, idx: usize) -> usize {
    text[..idx.min(text.len())].rfind('\n').map_or(0, |i| i + 1)
}

/// Offset of the `\n` ending the line containing `idx` (or the text length).
pub fn line_end(text: &str, idx: usize) -> usize {
    let idx = idx.min(text.len());
    text[idx..].find('\n').map_or(text.len(), |i| idx + i)
}

/// Like [`line_end`] but past the newline, if there is one.
pub fn line_end_inclusive(text: &str, idx: usize) -> usize {
    let end = line_end(text, idx);
    if end < text.len() { end + 1 } else { end }
}

/// Leading whitespace of the line containing `idx`.
pub fn indent_at(text: &str, idx: usize) -> &str {
    let start = line_start(text, idx);
    let line = &text[start..line_end(text, idx)];
    &line[..line.len() - line.trim_start().len()]
}

// --- Outline ------------------------------------------------------------------

/// What precedes a block's `{` on its line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockHead {
    /// `<key> = [TypeName] {`: top-level entries and map entries.
    Keyed { key: NameRef, key_span: Span, type_name: Option<String> },
    /// `<name>: <type> = [TypeName] {`: a field holding a block value.
    Field { name: String, field_type: String, type_name: Option<String> },
    /// `TypeName {`: an item of a list.
    Item { type_name: String },
    Bare,
}

impl BlockHead {
    fn classify(prefix: &str, head_start: usize) -> BlockHead {
        if prefix.is_empty() {
            return BlockHead::Bare;
        }

        if let Some(caps) = regex!(r#"^("(?:[^"\\]|\\.)*"|0[xX][0-9A-Fa-f]{1,8})\s*=\s*([A-Za-z_][A-Za-z0-9_]*)?$"#)
            .captures(prefix)
        {
            let raw = &caps[1];
            if let Some(key) = NameRef::parse(raw) {
                let start = caps.get(1).map_or(0, |m| m.start());
                return BlockHead::Keyed {
                    key,
                    key_span: Span::new(head_start + start, head_start + start + raw.len()),
                    type_name: caps.get(2).map(|m| m.as_str().to_string()),
                };
            }
        }

        if let Some(caps) =
            regex!(r"^([A-Za-z_][A-Za-z0-9_]*|0[xX][0-9A-Fa-f]{1,8})\s*:\s*([^=]+?)\s*=\s*([A-Za-z_][A-Za-z0-9_]*)?$")
                .captures(prefix)
        {
            return BlockHead::Field {
                name: caps[1].to_string(),
                field_type: caps[2].to_string(),
                type_name: caps.get(3).map(|m| m.as_str().to_string()),
            };
        }

        if regex!(r"^[A-Za-z_][A-Za-z0-9_]*$").is_match(prefix) {
            return BlockHead::Item { type_name: prefix.to_string() };
        }

        BlockHead::Bare
    }
}

/// One `{ ... }` region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub head: BlockHead,
    /// From the first character of the head (or the `{` for bare blocks) to just
    /// past the closing `}`.
    pub span: Span,
    /// Offset of the opening `{`.
    pub open: usize,
    /// Offset of the closing `}` (the text length for an unclosed block).
    pub close: usize,
    /// Number of enclosing blocks.
    pub depth: usize,
    pub parent: Option<usize>,
}

impl Block {
    /// Text strictly between the braces.
    pub fn body(&self) -> Span {
        Span::new(self.open + 1, self.close.max(self.open + 1))
    }

    pub fn type_name(&self) -> Option<&str> {
        match &self.head {
            BlockHead::Keyed { type_name, .. } | BlockHead::Field { type_name, .. } => type_name.as_deref(),
            BlockHead::Item { type_name } => Some(type_name),
            BlockHead::Bare => None,
        }
    }

    pub fn key(&self) -> Option<&NameRef> {
        match &self.head {
            BlockHead::Keyed { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Byte range of the key token in a keyed head.
    pub fn key_span(&self) -> Option<Span> {
        match &self.head {
            BlockHead::Keyed { key_span, .. } => Some(*key_span),
            _ => None,
        }
    }

    pub fn field_name(&self) -> Option<&str> {
        match &self.head {
            BlockHead::Field { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_keyed(&self, type_name: &str) -> bool {
        matches!(&self.head, BlockHead::Keyed { type_name: Some(t), .. } if t == type_name)
    }

    pub fn is_item(&self, type_name: &str) -> bool {
        matches!(&self.head, BlockHead::Item { type_name: t } if t == type_name)
    }

    /// True when the body holds nothing but whitespace.
    pub fn is_empty_body(&self, text: &str) -> bool {
        self.body().slice(text).trim().is_empty()
    }
}

/// A `name: type = value` line directly inside a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarField {
    pub name: String,
    pub field_type: String,
    pub value: String,
    pub value_span: Span,
    pub line: Span,
}

impl ScalarField {
    /// Value of a `string` field, unquoted.
    pub fn string(&self) -> Option<String> {
        match NameRef::parse(&self.value)? {
            NameRef::Text(text) => Some(text),
            NameRef::Hash(_) => None,
        }
    }

    /// Value of a `hash` or `link` field.
    pub fn name(&self) -> Option<NameRef> {
        NameRef::parse(&self.value)
    }
}

/// A `key = value` line directly inside a map block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
    pub key: NameRef,
    pub value: String,
    pub line: Span,
}

/// Every block of a text, in order of their opening braces.
#[derive(Debug, Clone, Default)]
pub struct Outline {
    blocks: Vec<Block>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
    balanced: bool,
}

impl Outline {
    pub fn scan(text: &str) -> Outline {
        let mut outline = Outline { balanced: true, ..Outline::default() };
        let mut stack: Vec<usize> = Vec::new();
        let mut last_end = 0usize;

        for (token, offset) in brace_tokens(text) {
            match token {
                ScanToken::Open => {
                    let prefix_start = line_start(text, offset).max(last_end);
                    let raw = &text[prefix_start..offset];
                    let prefix = raw.trim();
                    let head_start = prefix_start + (raw.len() - raw.trim_start().len());
                    let start = if prefix.is_empty() { offset } else { head_start };

                    let idx = outline.blocks.len();
                    let parent = stack.last().copied();
                    outline.blocks.push(Block {
                        head: BlockHead::classify(prefix, head_start),
                        span: Span::new(start, offset + 1),
                        open: offset,
                        close: offset,
                        depth: stack.len(),
                        parent,
                    });
                    outline.children.push(Vec::new());
                    match parent {
                        Some(p) => outline.children[p].push(idx),
                        None => outline.roots.push(idx),
                    }
                    stack.push(idx);
                    last_end = offset + 1;
                }
                ScanToken::Close => {
                    last_end = offset + 1;
                    match stack.pop() {
                        Some(idx) => {
                            outline.blocks[idx].close = offset;
                            outline.blocks[idx].span.end = offset + 1;
                        }
                        None => {
                            log::debug!("stray '}}' at byte {offset}");
                            outline.balanced = false;
                        }
                    }
                }
                _ => {}
            }
        }

        if !stack.is_empty() {
            log::debug!("{} unclosed block(s) at end of text", stack.len());
            outline.balanced = false;
            for idx in stack {
                outline.blocks[idx].close = text.len();
                outline.blocks[idx].span.end = text.len();
            }
        }

        outline
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, idx: usize) -> &Block {
        &self.blocks[idx]
    }

    pub fn is_balanced(&self) -> bool {
        self.balanced
    }

    pub fn children(&self, idx: usize) -> &[usize] {
        &self.children[idx]
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// Indices of `<key> = <type_name> {` blocks at any depth.
    pub fn keyed<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = usize> + 'a {
        (0..self.blocks.len()).filter(move |&i| self.blocks[i].is_keyed(type_name))
    }

    /// Indices of field blocks called `name` at any depth.
    pub fn fields_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = usize> + 'a {
        (0..self.blocks.len()).filter(move |&i| self.blocks[i].field_name() == Some(name))
    }

    /// Direct child field block called `name`.
    pub fn child_field(&self, idx: usize, name: &str) -> Option<usize> {
        self.children[idx].iter().copied().find(|&c| self.blocks[c].field_name() == Some(name))
    }

    /// Direct `TypeName { ... }` item children.
    pub fn child_items(&self, idx: usize, type_name: &str) -> Vec<usize> {
        self.children[idx].iter().copied().filter(|&c| self.blocks[c].is_item(type_name)).collect()
    }

    /// Keyed children, whatever their type.
    pub fn child_keyed(&self, idx: usize) -> Vec<usize> {
        self.children[idx].iter().copied().filter(|&c| self.blocks[c].key().is_some()).collect()
    }

    /// The block itself followed by every block nested in it.
    pub fn subtree(&self, idx: usize) -> std::ops::Range<usize> {
        let span = self.blocks[idx].span;
        let end = (idx + 1..self.blocks.len()).find(|&i| !span.contains(self.blocks[i].span)).unwrap_or(self.blocks.len());
        idx..end
    }

    /// Top-level entries: keyed blocks at the root, or directly inside a root
    /// `entries` map.
    pub fn entries(&self) -> Vec<usize> {
        let mut out = Vec::new();
        for &root in &self.roots {
            let block = &self.blocks[root];
            if block.key().is_some() {
                out.push(root);
            } else if block.field_name() == Some("entries") {
                out.extend(self.child_keyed(root));
            }
        }
        out
    }

    /// The root `entries` map, if the document has one.
    pub fn entries_map(&self) -> Option<usize> {
        self.roots.iter().copied().find(|&r| self.blocks[r].field_name() == Some("entries"))
    }

    /// Parts of the block body that are not inside a child block.
    pub fn direct_segments(&self, idx: usize) -> Vec<Span> {
        let body = self.blocks[idx].body();
        let mut cursor = body.start;
        let mut out = Vec::new();
        for &child in &self.children[idx] {
            let span = self.blocks[child].span;
            if span.start > cursor {
                out.push(Span::new(cursor, span.start));
            }
            cursor = cursor.max(span.end);
        }
        if body.end > cursor {
            out.push(Span::new(cursor, body.end));
        }
        out
    }

    /// Lines directly inside the block, trimmed and without comments. Lines
    /// holding only a comment are skipped.
    pub fn direct_lines(&self, text: &str, idx: usize) -> Vec<Span> {
        let mut out = Vec::new();
        for segment in self.direct_segments(idx) {
            let mut offset = segment.start;
            for piece in segment.slice(text).split('\n') {
                let code = strip_comment(piece);
                let trimmed = code.trim();
                if !trimmed.is_empty() {
                    let lead = code.len() - code.trim_start().len();
                    out.push(Span::new(offset + lead, offset + lead + trimmed.len()));
                }
                offset += piece.len() + 1;
            }
        }
        out
    }

    pub fn scalar_fields(&self, text: &str, idx: usize) -> Vec<ScalarField> {
        self.direct_lines(text, idx).into_iter().filter_map(|line| parse_scalar_field(text, line)).collect()
    }

    pub fn scalar_field(&self, text: &str, idx: usize, name: &str) -> Option<ScalarField> {
        self.scalar_fields(text, idx).into_iter().find(|f| f.name == name)
    }

    pub fn map_entries(&self, text: &str, idx: usize) -> Vec<MapEntry> {
        self.direct_lines(text, idx)
            .into_iter()
            .filter_map(|line| {
                let caps = regex!(r#"^("(?:[^"\\]|\\.)*"|0[xX][0-9A-Fa-f]{1,8})\s*=\s*(.+)$"#)
                    .captures(line.slice(text))?;
                let key = NameRef::parse(&caps[1])?;
                Some(MapEntry { key, value: caps[2].trim().to_string(), line })
            })
            .collect()
    }

    /// Comma or newline separated values directly inside a list block.
    pub fn list_values(&self, text: &str, idx: usize) -> Vec<String> {
        self.direct_lines(text, idx)
            .into_iter()
            .filter(|line| parse_scalar_field(text, *line).is_none())
            .flat_map(|line| split_values(line.slice(text)).into_iter().map(String::from).collect::<Vec<_>>())
            .collect()
    }
}

fn parse_scalar_field(text: &str, line: Span) -> Option<ScalarField> {
    let raw = line.slice(text);
    let caps = regex!(r"^([A-Za-z_][A-Za-z0-9_]*|0[xX][0-9A-Fa-f]{1,8})\s*:\s*([^=]+?)\s*=\s*(.+)$").captures(raw)?;
    let value = caps.get(3)?;
    Some(ScalarField {
        name: caps[1].to_string(),
        field_type: caps[2].to_string(),
        value: value.as_str().trim().to_string(),
        value_span: Span::new(line.start + value.start(), line.start + value.start() + value.as_str().trim_end().len()),
        line,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"#PROP_text
entries: map[hash,embed] = {
    "Hero_Q" = VfxSystemDefinitionData {
        complexEmitterDefinitionData: list[pointer] = {
            VfxEmitterDefinitionData {
                emitterName: string = "a"
                texture: string = "odd{name}.dds"
            }
        }
        particleName: string = "Hero_Q"
    }
    0x0000abcd = ResourceResolver {
        resourceMap: map[hash,link] = {
            "Hero_Q" = "Hero_Q"
        }
    }
}
"#;

    #[test]
    fn matching_brace_ignores_strings_and_comments() {
        let text = "a = B { c: string = \"}\" # }\n d: list[u8] = { 1 } }";
        let open = text.find('{').unwrap();
        assert_eq!(find_matching_brace(text, open), Some(text.len() - 1));
        assert_eq!(find_matching_brace(text, 0), Some(text.len() - 1));
    }

    #[test]
    fn matching_brace_reports_not_found() {
        assert_eq!(find_matching_brace("a = B { c = {", 0), None);
        assert_eq!(find_matching_brace("no braces", 0), None);
        assert_eq!(find_matching_brace("{}", 10), None);
    }

    #[test]
    fn multiple_braces_on_one_line() {
        let text = "x: list[u8] = { } y: list[u8] = { { } }";
        let second = text.find('y').unwrap();
        assert_eq!(find_matching_brace(text, second), Some(text.len() - 1));
        let outline = Outline::scan(text);
        assert_eq!(outline.blocks().len(), 3);
        assert_eq!(outline.block(1).field_name(), Some("y"));
        assert_eq!(outline.block(2).head, BlockHead::Bare);
    }

    #[test]
    fn balance_checks() {
        assert!(is_balanced(SAMPLE));
        assert!(is_balanced("s: string = \"{{{\""));
        assert!(!is_balanced("a { b"));
        assert!(!is_balanced("} {"));
    }

    #[test]
    fn outline_classifies_heads() {
        let outline = Outline::scan(SAMPLE);
        assert!(outline.is_balanced());
        let entries = outline.entries();
        assert_eq!(entries.len(), 2);

        let system = outline.block(entries[0]);
        assert!(system.is_keyed("VfxSystemDefinitionData"));
        assert_eq!(system.key(), Some(&NameRef::text("Hero_Q")));
        assert_eq!(system.depth, 1);
        assert_eq!(&SAMPLE[system.span.start..system.span.start + 8], "\"Hero_Q\"");

        let resolver = outline.block(entries[1]);
        assert_eq!(resolver.key(), Some(&NameRef::Hash(0xabcd)));
        assert_eq!(resolver.type_name(), Some("ResourceResolver"));

        let list = outline.child_field(entries[0], "complexEmitterDefinitionData").unwrap();
        let items = outline.child_items(list, "VfxEmitterDefinitionData");
        assert_eq!(items.len(), 1);
        let name = outline.scalar_field(SAMPLE, items[0], "emitterName").unwrap();
        assert_eq!(name.value, "\"a\"");
        assert_eq!(name.value_span.slice(SAMPLE), "\"a\"");
    }

    #[test]
    fn key_span_points_at_key_token() {
        let outline = Outline::scan(SAMPLE);
        let BlockHead::Keyed { key_span, .. } = &outline.block(outline.entries()[1]).head else {
            panic!("expected keyed head");
        };
        assert_eq!(key_span.slice(SAMPLE), "0x0000abcd");
    }

    #[test]
    fn map_entries_and_list_values() {
        let outline = Outline::scan(SAMPLE);
        let map = outline.fields_named("resourceMap").next().unwrap();
        let entries = outline.map_entries(SAMPLE, map);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, NameRef::text("Hero_Q"));
        assert_eq!(entries[0].value, "\"Hero_Q\"");

        let text = "m: mtx44 = {\n  1, 0\n  # note\n  0, 1\n}";
        let outline = Outline::scan(text);
        assert_eq!(outline.list_values(text, 0), vec!["1", "0", "0", "1"]);
    }

    #[test]
    fn list_values_keep_commas_inside_strings() {
        let text = "names: list[hash] = {\n  \"Cape,Left\", \"a \\\"b\\\", c\"\n  0x0000000a # 1, 2\n}";
        let outline = Outline::scan(text);
        assert_eq!(outline.list_values(text, 0), vec!["\"Cape,Left\"", "\"a \\\"b\\\", c\"", "0x0000000a"]);
    }

    #[test]
    fn trailing_comments_are_not_part_of_values() {
        let text = "E {\n    emitterName: string = \"a\" # main\n    tag: string = \"#1\"\n}";
        let outline = Outline::scan(text);
        let name = outline.scalar_field(text, 0, "emitterName").unwrap();
        assert_eq!(name.value, "\"a\"");
        assert_eq!(name.value_span.slice(text), "\"a\"");
        assert_eq!(outline.scalar_field(text, 0, "tag").and_then(|f| f.string()).as_deref(), Some("#1"));
        assert_eq!(strip_comment("x = 1 # }"), "x = 1 ");
        assert_eq!(strip_comment("s = \"a#b\""), "s = \"a#b\"");
    }

    #[test]
    fn find_headers_filters_by_type_and_key() {
        assert_eq!(find_headers(SAMPLE, "VfxSystemDefinitionData", None).len(), 1);
        let key = NameRef::text("Hero_Q");
        let at = find_header(SAMPLE, "VfxSystemDefinitionData", Some(&key)).unwrap();
        assert!(SAMPLE[at..].starts_with("\"Hero_Q\" = VfxSystemDefinitionData {"));
        assert_eq!(find_header(SAMPLE, "VfxSystemDefinitionData", Some(&NameRef::text("Nope"))), None);
    }

    #[test]
    fn subtree_stops_at_next_sibling() {
        let outline = Outline::scan(SAMPLE);
        let entries = outline.entries();
        let system = outline.subtree(entries[0]);
        assert_eq!(system, entries[0]..entries[0] + 3);
        assert_eq!(system.end, entries[1]);
    }

    #[test]
    fn scalar_values_unquote() {
        let outline = Outline::scan(SAMPLE);
        let field = outline.scalar_field(SAMPLE, outline.entries()[0], "particleName").unwrap();
        assert_eq!(field.string().as_deref(), Some("Hero_Q"));
        assert_eq!(field.name(), Some(NameRef::text("Hero_Q")));
    }

    #[test]
    fn line_helpers() {
        let text = "a\n    b {\n}";
        let b = text.find('b').unwrap();
        assert_eq!(line_start(text, b), 2);
        assert_eq!(line_end(text, b), 9);
        assert_eq!(line_end_inclusive(text, b), 10);
        assert_eq!(indent_at(text, b), "    ");
        assert_eq!(line_end_inclusive(text, text.len() - 1), text.len());
    }

    #[test]
    fn unclosed_blocks_extend_to_end() {
        let text = "a = B {\n  c: list[u8] = {";
        let outline = Outline::scan(text);
        assert!(!outline.is_balanced());
        assert_eq!(outline.block(0).close, text.len());
    }
}

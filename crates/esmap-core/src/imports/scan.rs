//! Import site scanner.
//!
//! Finds every place a module specifier appears in JavaScript source without
//! full parsing:
//! - `import x from '…'`, `import { a } from '…'`, `import * as ns from '…'`
//! - side-effect `import '…'`
//! - `export { a } from '…'`, `export * from '…'`
//! - dynamic `import('…')`
//!
//! Comments, string literals and template literals are skipped, so code
//! mentioning `import(` inside a string is left alone. Expressions inside
//! template substitutions are scanned.

use serde::Serialize;
use std::ops::Range;

/// Where a specifier was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteKind {
    /// `import … from '…'` or `import '…'`.
    Import,
    /// `export … from '…'`.
    ExportFrom,
    /// `import('…')` with a plain string literal argument.
    DynamicImport,
    /// `import(expr)` whose argument is not a plain string literal.
    NonLiteralDynamic,
}

/// An import site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSite {
    pub kind: SiteKind,
    /// Specifier value with escapes resolved; `None` for non-literal dynamic imports.
    pub specifier: Option<String>,
    /// Byte range of the literal's contents, quotes excluded.
    pub span: Range<usize>,
    /// Quote character used by the literal.
    pub quote: u8,
    /// Line number (1-indexed).
    pub line: u32,
}

/// Scan source code for import sites, in source order.
#[must_use]
pub fn scan_import_sites(source: &str) -> Vec<ImportSite> {
    Scanner::new(source).run()
}

struct Scanner<'a> {
    src: &'a str,
    b: &'a [u8],
    i: usize,
    line: u32,
    /// Open `{` count per enclosing template substitution.
    template_braces: Vec<u32>,
    sites: Vec<ImportSite>,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            b: src.as_bytes(),
            i: 0,
            line: 1,
            template_braces: Vec::new(),
            sites: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<ImportSite> {
        while self.i < self.b.len() {
            match self.b[self.i] {
                b'\n' => {
                    self.line += 1;
                    self.i += 1;
                }
                b'/' if self.peek(1) == Some(b'/') => self.skip_line_comment(),
                b'/' if self.peek(1) == Some(b'*') => self.skip_block_comment(),
                b'\'' | b'"' => {
                    if let Some((_, next)) = self.read_string(self.i) {
                        self.advance_to(next);
                    } else {
                        self.i += 1;
                    }
                }
                b'`' => {
                    self.i += 1;
                    self.scan_template();
                }
                b'{' => {
                    if let Some(open) = self.template_braces.last_mut() {
                        *open += 1;
                    }
                    self.i += 1;
                }
                b'}' => {
                    self.i += 1;
                    if self.template_braces.last() == Some(&0) {
                        self.template_braces.pop();
                        self.scan_template();
                    } else if let Some(open) = self.template_braces.last_mut() {
                        *open -= 1;
                    }
                }
                b'i' if self.at_keyword("import") => self.scan_import(),
                b'e' if self.at_keyword("export") => self.scan_export(),
                c if is_ident_byte(c) => self.skip_identifier(),
                _ => self.i += 1,
            }
        }
        self.sites
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.b.get(self.i + offset).copied()
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        keyword_at(self.b, self.i, keyword)
    }

    /// Move to `next`, counting newlines on the way (escaped line breaks in strings).
    fn advance_to(&mut self, next: usize) {
        let newlines = self.b[self.i..next].iter().filter(|&&c| c == b'\n').count();
        self.line = self
            .line
            .saturating_add(u32::try_from(newlines).unwrap_or(u32::MAX));
        self.i = next;
    }

    fn skip_identifier(&mut self) {
        while self.i < self.b.len() && is_ident_byte(self.b[self.i]) {
            self.i += 1;
        }
    }

    fn skip_line_comment(&mut self) {
        while self.i < self.b.len() && self.b[self.i] != b'\n' {
            self.i += 1;
        }
    }

    fn skip_block_comment(&mut self) {
        self.i += 2;
        while self.i < self.b.len() {
            if self.b[self.i] == b'*' && self.peek(1) == Some(b'/') {
                self.i += 2;
                return;
            }
            if self.b[self.i] == b'\n' {
                self.line += 1;
            }
            self.i += 1;
        }
    }

    /// Skip whitespace and comments.
    fn skip_trivia(&mut self) {
        while self.i < self.b.len() {
            match self.b[self.i] {
                b'\n' => {
                    self.line += 1;
                    self.i += 1;
                }
                c if c.is_ascii_whitespace() => self.i += 1,
                b'/' if self.peek(1) == Some(b'/') => self.skip_line_comment(),
                b'/' if self.peek(1) == Some(b'*') => self.skip_block_comment(),
                _ => return,
            }
        }
    }

    /// Scan template literal text up to the closing backtick or the next `${`.
    fn scan_template(&mut self) {
        while self.i < self.b.len() {
            match self.b[self.i] {
                b'\\' => {
                    if self.peek(1) == Some(b'\n') {
                        self.line += 1;
                    }
                    self.i += 2;
                }
                b'\n' => {
                    self.line += 1;
                    self.i += 1;
                }
                b'`' => {
                    self.i += 1;
                    return;
                }
                b'$' if self.peek(1) == Some(b'{') => {
                    self.i += 2;
                    self.template_braces.push(0);
                    return;
                }
                _ => self.i += 1,
            }
        }
    }

    /// Read a single- or double-quoted string starting at `start`.
    ///
    /// Returns the content range and the index after the closing quote.
    /// Unterminated strings (newline or EOF) yield `None`.
    fn read_string(&self, start: usize) -> Option<(Range<usize>, usize)> {
        let quote = self.b[start];
        let mut j = start + 1;
        while j < self.b.len() {
            match self.b[j] {
                // `\r\n` line continuation counts as one escaped break
                b'\\' if self.b.get(j + 1..j + 3) == Some(b"\r\n".as_slice()) => j += 3,
                b'\\' => j += 2,
                b'\n' => return None,
                c if c == quote => return Some((start + 1..j, j + 1)),
                _ => j += 1,
            }
        }
        None
    }

    /// Record a literal at the current position, if there is one.
    fn take_literal(&mut self, kind: SiteKind) -> bool {
        let Some(&quote) = self.b.get(self.i) else {
            return false;
        };
        if quote != b'\'' && quote != b'"' {
            return false;
        }
        let Some((span, next)) = self.read_string(self.i) else {
            return false;
        };
        self.sites.push(ImportSite {
            kind,
            specifier: Some(unescape(&self.src[span.clone()])),
            span,
            quote,
            line: self.line,
        });
        self.advance_to(next);
        true
    }

    fn scan_import(&mut self) {
        // `obj.import` is a property, not a keyword
        let after_dot = self.i > 0 && self.b[self.i - 1] == b'.';
        self.i += "import".len();
        if after_dot {
            return;
        }
        self.skip_trivia();

        match self.peek(0) {
            Some(b'(') => self.scan_dynamic_import(),
            // import.meta
            Some(b'.') => {}
            Some(b'\'' | b'"') => {
                self.take_literal(SiteKind::Import);
            }
            _ => self.scan_from_clause(SiteKind::Import),
        }
    }

    fn scan_export(&mut self) {
        self.i += "export".len();
        self.skip_trivia();
        match self.peek(0) {
            Some(b'*' | b'{') => self.scan_from_clause(SiteKind::ExportFrom),
            // `export type { A } from '…'`
            _ if self.at_keyword("type") => self.scan_from_clause(SiteKind::ExportFrom),
            _ => {}
        }
    }

    fn scan_dynamic_import(&mut self) {
        self.i += 1;
        self.skip_trivia();
        let arg_start = self.i;
        let arg_line = self.line;

        if let Some((span, next)) = matches!(self.peek(0), Some(b'\'' | b'"'))
            .then(|| self.read_string(self.i))
            .flatten()
        {
            // The literal must be the whole first argument: `import('a' + b)` is not.
            let saved = (self.i, self.line);
            self.advance_to(next);
            self.skip_trivia();
            if matches!(self.peek(0), Some(b')' | b',')) {
                self.sites.push(ImportSite {
                    kind: SiteKind::DynamicImport,
                    specifier: Some(unescape(&self.src[span.clone()])),
                    span,
                    quote: self.b[arg_start],
                    line: arg_line,
                });
                return;
            }
            (self.i, self.line) = saved;
        }

        self.sites.push(ImportSite {
            kind: SiteKind::NonLiteralDynamic,
            specifier: None,
            span: arg_start..arg_start,
            quote: 0,
            line: arg_line,
        });
    }

    /// Walk an import/export clause (`a, { b as c }`, `* as ns`) up to `from '…'`.
    fn scan_from_clause(&mut self, kind: SiteKind) {
        // After `{ … }` only `from` may follow.
        let mut closed = false;
        loop {
            self.skip_trivia();
            let Some(c) = self.peek(0) else {
                return;
            };

            if self.at_keyword("from") {
                let saved = (self.i, self.line);
                self.i += "from".len();
                self.skip_trivia();
                if self.take_literal(kind) {
                    return;
                }
                // `import from from '…'`: the first `from` was a binding name
                (self.i, self.line) = saved;
                self.skip_identifier();
                continue;
            }

            if closed || self.at_keyword("import") || self.at_keyword("export") {
                return;
            }

            match c {
                b'{' => {
                    if !self.skip_braced_names() {
                        return;
                    }
                    closed = true;
                }
                b'*' | b',' => self.i += 1,
                c if is_ident_byte(c) => self.skip_identifier(),
                _ => return,
            }
        }
    }

    /// Skip `{ … }` of named bindings, which may contain string names.
    fn skip_braced_names(&mut self) -> bool {
        self.i += 1;
        while self.i < self.b.len() {
            match self.b[self.i] {
                b'}' => {
                    self.i += 1;
                    return true;
                }
                b'\'' | b'"' => match self.read_string(self.i) {
                    Some((_, next)) => self.advance_to(next),
                    None => return false,
                },
                b'\n' => {
                    self.line += 1;
                    self.i += 1;
                }
                b'/' if matches!(self.peek(1), Some(b'/' | b'*')) => self.skip_trivia(),
                b';' | b'(' | b')' | b'=' => return false,
                _ => self.i += 1,
            }
        }
        false
    }
}

fn is_ident_byte(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'$' || c >= 0x80
}

/// Check if `b[pos..]` starts with `keyword` on identifier boundaries.
fn keyword_at(b: &[u8], pos: usize, keyword: &str) -> bool {
    let kw = keyword.as_bytes();
    let end = pos + kw.len();
    if end > b.len() || &b[pos..end] != kw {
        return false;
    }
    if pos > 0 && is_ident_byte(b[pos - 1]) {
        return false;
    }
    !(end < b.len() && is_ident_byte(b[end]))
}

/// Decode the escapes of a string literal's contents into its value.
///
/// Escapes that are syntax errors in JavaScript (`\x4`, `\u{110000}`) are
/// kept verbatim.
fn unescape(raw: &str) -> String {
    if !raw.contains('\\') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    // High surrogate from a `\uD8xx` escape waiting for its low half.
    let mut pending: Option<u32> = None;

    while let Some(c) = chars.next() {
        if c != '\\' {
            flush_surrogate(&mut out, &mut pending);
            out.push(c);
            continue;
        }
        let Some(e) = chars.next() else {
            flush_surrogate(&mut out, &mut pending);
            out.push('\\');
            break;
        };

        let unit = match e {
            'x' => read_hex(&mut chars, 2),
            'u' if chars.peek() == Some(&'{') => {
                chars.next();
                read_braced_hex(&mut chars)
            }
            'u' => read_hex(&mut chars, 4),
            _ => {
                flush_surrogate(&mut out, &mut pending);
                match e {
                    'n' => out.push('\n'),
                    'r' => out.push('\r'),
                    't' => out.push('\t'),
                    'b' => out.push('\u{8}'),
                    'f' => out.push('\u{c}'),
                    'v' => out.push('\u{b}'),
                    '0'..='7' => out.push(read_legacy_octal(e, &mut chars)),
                    // line continuation
                    '\r' => {
                        if chars.peek() == Some(&'\n') {
                            chars.next();
                        }
                    }
                    '\n' | '\u{2028}' | '\u{2029}' => {}
                    other => out.push(other),
                }
                continue;
            }
        };

        match unit {
            Ok(code) => push_code_unit(&mut out, &mut pending, code),
            Err(text) => {
                flush_surrogate(&mut out, &mut pending);
                out.push('\\');
                out.push(e);
                out.push_str(&text);
            }
        }
    }
    flush_surrogate(&mut out, &mut pending);
    out
}

type Chars<'a> = std::iter::Peekable<std::str::Chars<'a>>;

/// Exactly `len` hex digits. On failure returns the consumed text.
fn read_hex(chars: &mut Chars<'_>, len: usize) -> Result<u32, String> {
    let mut text = String::new();
    for _ in 0..len {
        match chars.peek() {
            Some(c) if c.is_ascii_hexdigit() => {
                text.push(*c);
                chars.next();
            }
            _ => return Err(text),
        }
    }
    u32::from_str_radix(&text, 16).map_err(|_| text)
}

/// Hex digits up to `}` for `\u{…}`, at most U+10FFFF.
fn read_braced_hex(chars: &mut Chars<'_>) -> Result<u32, String> {
    let mut text = String::from("{");
    while let Some(&c) = chars.peek() {
        chars.next();
        text.push(c);
        if c == '}' {
            let code = u32::from_str_radix(&text[1..text.len() - 1], 16)
                .ok()
                .filter(|&code| code <= 0x10_FFFF);
            return code.ok_or(text);
        }
        if !c.is_ascii_hexdigit() {
            return Err(text);
        }
    }
    Err(text)
}

/// `\0`..`\377`: up to three octal digits, value at most 0o377.
fn read_legacy_octal(first: char, chars: &mut Chars<'_>) -> char {
    let mut value = first.to_digit(8).unwrap_or(0);
    let max_digits = if first <= '3' { 3 } else { 2 };
    for _ in 1..max_digits {
        match chars.peek().and_then(|c| c.to_digit(8)) {
            Some(d) => {
                value = value * 8 + d;
                chars.next();
            }
            None => break,
        }
    }
    char::from_u32(value).unwrap_or('\u{fffd}')
}

fn push_code_unit(out: &mut String, pending: &mut Option<u32>, code: u32) {
    match (pending.take(), code) {
        (Some(high), 0xDC00..=0xDFFF) => {
            let combined = 0x1_0000 + ((high - 0xD800) << 10) + (code - 0xDC00);
            out.push(char::from_u32(combined).unwrap_or('\u{fffd}'));
        }
        (previous, _) => {
            if previous.is_some() {
                out.push('\u{fffd}');
            }
            if (0xD800..=0xDBFF).contains(&code) {
                *pending = Some(code);
            } else {
                out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
        }
    }
}

fn flush_surrogate(out: &mut String, pending: &mut Option<u32>) {
    if pending.take().is_some() {
        out.push('\u{fffd}');
    }
}

/// Escape a specifier for a literal quoted with `quote`.
///
/// Characters that cannot appear raw in a string literal are written as
/// escapes, so the literal's value is exactly `value`.
#[must_use]
pub fn escape_specifier(value: &str, quote: u8) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if c.is_ascii() && c as u8 == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

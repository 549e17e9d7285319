//! TypeScript → JavaScript type stripping
//!
//! **What it is:**
//! A fixed, ordered list of regex rewrites. It is NOT a parser; it removes the
//! common shapes of type syntax found in short exercise solutions so that the
//! result can be handed to a plain JavaScript engine.
//!
//! **Guarantees:**
//! - String, template and comment contents are masked before any rewrite runs
//!   and restored afterwards, so `"name: string"` or `"such as Bob"` survive
//! - Line structure is preserved (removed declarations leave blank lines), so
//!   error positions reported for the output still point at the input
//!
//! **Known misfires (kept for parity, see tests):**
//! - Ternaries whose branch is a primitive keyword: `c ? a : null`
//! - Object literals whose values are capitalized identifiers: `{ a: Foo, b }`
//! - Interfaces / object types with nested braces, nested generics
//! - `case f(x): {` reads as a return type annotation
//!
//! When the rewrite produces invalid JavaScript the engine reports it as a
//! transform mismatch rather than a plain syntax error.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;

const PRIMITIVES: &str =
    "string|number|boolean|any|void|null|undefined|never|unknown|object|bigint|symbol";

/// How a pass rewrites its matches
enum Replacement {
    /// Regex replacement template (`${1}` style)
    Template(&'static str),
    /// Drop the match but keep its newlines
    BlankLines,
}

struct Rewrite {
    name: &'static str,
    pattern: Regex,
    replacement: Replacement,
}

impl Rewrite {
    fn new(name: &'static str, pattern: &str, replacement: Replacement) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).unwrap_or_else(|e| panic!("invalid pattern for {name}: {e}")),
            replacement,
        }
    }

    fn apply<'a>(&self, source: &'a str) -> Cow<'a, str> {
        match self.replacement {
            Replacement::Template(template) => self.pattern.replace_all(source, template),
            Replacement::BlankLines => self.pattern.replace_all(source, |caps: &Captures| {
                "\n".repeat(caps[0].matches('\n').count())
            }),
        }
    }
}

static PASSES: Lazy<Vec<Rewrite>> = Lazy::new(|| {
    let primitive = format!(r"(?:{PRIMITIVES})\b(?:\[\])*");
    vec![
        Rewrite::new(
            "imports",
            r#"(?m)^[ \t]*import\s(?:[^\n]*?\bfrom\s*)?['"][^'"\n]*['"][ \t]*;?[ \t]*$"#,
            Replacement::BlankLines,
        ),
        Rewrite::new(
            "export_keywords",
            r"(?m)^([ \t]*)export[ \t]+(?:default[ \t]+)?",
            Replacement::Template("${1}"),
        ),
        Rewrite::new(
            "interfaces",
            r"(?m)^[ \t]*(?:declare[ \t]+)?interface[ \t]+[\w$]+[^{\n]*\{[^{}]*\}[ \t]*;?",
            Replacement::BlankLines,
        ),
        Rewrite::new(
            "type_aliases",
            r"(?m)^[ \t]*(?:declare[ \t]+)?type[ \t]+[\w$]+(?:<[^>\n]*>)?[ \t]*=\s*(?:\{[^{}]*\}|[^;\n]*)[ \t]*;?",
            Replacement::BlankLines,
        ),
        Rewrite::new(
            "implements_clauses",
            r"([ \t]+)implements[ \t]+[\w$.,<> \t]+?[ \t]*(\{)",
            Replacement::Template("${1}${2}"),
        ),
        Rewrite::new(
            "primitive_annotations",
            &format!(r"\??:[ \t]*{primitive}(?:[ \t]*\|[ \t]*{primitive})*"),
            Replacement::Template(""),
        ),
        Rewrite::new(
            "call_generics",
            r"\b([A-Za-z_$][\w$]*)<[\w$ ,.|\[\]]+(?:<[\w$ ,.|\[\]]+>)?[\w$ ,.|\[\]]*>[ \t]*\(",
            Replacement::Template("${1}("),
        ),
        Rewrite::new(
            "capitalized_annotations",
            r"([\w$\]}])[ \t]*\??:[ \t]*[A-Z][\w$]*(?:<[^<>()\n]*>)?(?:\[\])*([ \t]*[,)=])",
            Replacement::Template("${1}${2}"),
        ),
        Rewrite::new(
            "return_types",
            r#"\)[ \t]*:[ \t]*[\w$<>\[\]|&.,'" \t]+?([ \t]*)(\{|=>)"#,
            Replacement::Template(")${1}${2}"),
        ),
        Rewrite::new(
            "as_assertions",
            r"[ \t]+as[ \t]+(?:const\b|[A-Za-z_$][\w$.]*(?:<[^<>\n]*>)?(?:\[\])*)",
            Replacement::Template(""),
        ),
        Rewrite::new(
            "non_null_assertions",
            r"([\w$)\]])!([.\[)])",
            Replacement::Template("${1}${2}"),
        ),
    ]
});

/// Names of the rewrite passes, in the order they run
pub fn transform_passes() -> Vec<&'static str> {
    PASSES.iter().map(|pass| pass.name).collect()
}

/// Strip TypeScript type syntax, returning JavaScript text
pub fn strip_type_annotations(source: &str) -> String {
    let (masked, literals) = mask_literals(source);

    let mut current = masked;
    for pass in PASSES.iter() {
        let next = match pass.apply(&current) {
            Cow::Borrowed(_) => continue,
            Cow::Owned(next) => next,
        };
        tracing::debug!(pass = pass.name, "type-stripping pass rewrote source");
        current = next;
    }

    unmask_literals(&current, &literals)
}

// Placeholder markers live in the private use area so no pattern above
// (\w, quotes, punctuation) can ever match inside them.
const MASK_OPEN: char = '\u{E000}';
const MASK_CLOSE: char = '\u{E001}';
const MASK_DIGIT_BASE: u32 = 0xE010;

fn placeholder(index: usize) -> String {
    let mut out = String::new();
    out.push(MASK_OPEN);
    for digit in format!("{index:x}").chars() {
        let value = digit.to_digit(16).unwrap_or(0);
        out.push(char::from_u32(MASK_DIGIT_BASE + value).unwrap_or(MASK_OPEN));
    }
    out.push(MASK_CLOSE);
    out
}

/// Replace the contents of string literals, template literals and comments
/// with opaque placeholders. Delimiters stay in place.
fn mask_literals(source: &str) -> (String, Vec<String>) {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut literals = Vec::new();
    let mut i = 0;

    let mut stash = |content: String, out: &mut String| {
        if !content.is_empty() {
            out.push_str(&placeholder(literals.len()));
            literals.push(content);
        }
    };

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            '\'' | '"' | '`' => {
                out.push(c);
                i += 1;
                let mut content = String::new();
                while i < chars.len() {
                    let ch = chars[i];
                    if ch == '\\' {
                        content.push(ch);
                        if let Some(&escaped) = chars.get(i + 1) {
                            content.push(escaped);
                        }
                        i += 2;
                        continue;
                    }
                    if ch == c || (ch == '\n' && c != '`') {
                        break;
                    }
                    content.push(ch);
                    i += 1;
                }
                stash(content, &mut out);
                if i < chars.len() && chars[i] == c {
                    out.push(c);
                    i += 1;
                }
            }
            '/' if next == Some('/') => {
                out.push_str("//");
                i += 2;
                let mut content = String::new();
                while i < chars.len() && chars[i] != '\n' {
                    content.push(chars[i]);
                    i += 1;
                }
                stash(content, &mut out);
            }
            '/' if next == Some('*') => {
                out.push_str("/*");
                i += 2;
                let mut content = String::new();
                let mut closed = false;
                while i < chars.len() {
                    if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                        closed = true;
                        break;
                    }
                    content.push(chars[i]);
                    i += 1;
                }
                stash(content, &mut out);
                if closed {
                    out.push_str("*/");
                    i += 2;
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    (out, literals)
}

fn unmask_literals(masked: &str, literals: &[String]) -> String {
    if literals.is_empty() {
        return masked.to_string();
    }

    let mut out = String::with_capacity(masked.len());
    let mut chars = masked.chars();
    while let Some(c) = chars.next() {
        if c != MASK_OPEN {
            out.push(c);
            continue;
        }
        let mut index = 0usize;
        for d in chars.by_ref() {
            if d == MASK_CLOSE {
                break;
            }
            index = index * 16 + (d as u32).saturating_sub(MASK_DIGIT_BASE) as usize;
        }
        if let Some(literal) = literals.get(index) {
            out.push_str(literal);
        }
    }
    out
}

//! Annotation decomposition
//!
//! Splits the raw text of a type annotation into the pieces that can be
//! resolved to a declaration: the outer type of a generic, its top-level
//! arguments, the members of a `|` union, or a plain dotted name.

use once_cell::sync::Lazy;
use regex::Regex;

static GENERIC_CAPTURE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z0-9_.]+)\[(.+)\]$").expect("valid generic pattern"));

static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*$").expect("valid name pattern")
});

/// Wildcard argument (`Callable[..., T]`, `tuple[int, ...]`).
const ELLIPSIS: &str = "...";

/// A decomposed annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation<'a> {
    /// `Outer[Args]`, with list arguments flattened and `...` dropped.
    Generic { outer: &'a str, args: Vec<&'a str> },
    /// `A | B | None`
    Union(Vec<&'a str>),
    /// A bare identifier or dotted path.
    Name(&'a str),
    /// Anything else: string literals, calls, forward references to nothing.
    Unparseable,
}

pub fn decompose(annotation: &str) -> Annotation<'_> {
    let annotation = annotation.trim();

    let members = split_top_level(annotation, '|');
    if members.len() > 1 {
        return Annotation::Union(members);
    }

    if let Some(captures) = GENERIC_CAPTURE_PATTERN.captures(annotation) {
        let (Some(outer), Some(inner)) = (captures.get(1), captures.get(2)) else {
            return Annotation::Unparseable;
        };

        let mut args = Vec::new();
        for value in split_top_level(inner.as_str(), ',') {
            if let Some(list) = value.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
                // Callable's parameter list
                let list = list.trim();
                if list != ELLIPSIS && !list.is_empty() {
                    args.extend(
                        split_top_level(list, ',')
                            .into_iter()
                            .filter(|v| *v != ELLIPSIS && !v.is_empty()),
                    );
                }
            } else if value != ELLIPSIS && !value.is_empty() {
                args.push(value);
            }
        }

        return Annotation::Generic {
            outer: outer.as_str(),
            args,
        };
    }

    if is_dotted_name(annotation) {
        Annotation::Name(annotation)
    } else {
        Annotation::Unparseable
    }
}

pub fn is_dotted_name(value: &str) -> bool {
    NAME_PATTERN.is_match(value)
}

/// Splits on `separator` wherever it is not nested inside brackets.
pub fn split_top_level(value: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth: i32 = 0;
    let mut last = 0;

    for (index, c) in value.char_indices() {
        match c {
            '[' | '(' | '{' => depth += 1,
            ']' | ')' | '}' => depth -= 1,
            c if c == separator && depth == 0 => {
                parts.push(value[last..index].trim());
                last = index + c.len_utf8();
            }
            _ => {}
        }
    }

    parts.push(value[last..].trim());
    parts
}

/// Normalizes the source text of an annotation.
///
/// Line breaks and indentation inside brackets are collapsed, and a fully
/// quoted forward reference (`"Foo"`, `'pkg.Foo'`) is unquoted.
pub fn normalize_annotation(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut normalized = collapsed
        .replace("[ ", "[")
        .replace(" ]", "]")
        .replace(" ,", ",");

    // Trailing commas inside brackets (`Callable[[int,], str]`)
    normalized = normalized.replace(",]", "]");

    for quote in ['"', '\''] {
        if normalized.len() >= 2 && normalized.starts_with(quote) && normalized.ends_with(quote) {
            let inner = &normalized[1..normalized.len() - 1];
            if !inner.contains(quote) {
                return normalize_annotation(inner);
            }
        }
    }

    normalized
}

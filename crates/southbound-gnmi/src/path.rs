//! Schema-less gNMI path parsing.
//!
//! Paths arrive as `/`-separated strings or as pre-split segment lists.
//! Each segment is an element name followed by zero or more list-key
//! predicates, e.g. `interface[name=eth0]` or `list5[key1=abc][key2=8]`.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::proto::{Path, PathElem};

/// Reasons a path segment was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("empty element name in segment '{segment}'")]
    EmptyName { segment: String },

    #[error("unterminated key predicate in segment '{segment}'")]
    Unterminated { segment: String },

    #[error("key predicate without '=' in segment '{segment}'")]
    MissingEquals { segment: String },

    #[error("empty key name in segment '{segment}'")]
    EmptyKey { segment: String },

    #[error("duplicate key '{key}' in segment '{segment}'")]
    DuplicateKey { segment: String, key: String },

    #[error("unexpected '{found}' after key predicate in segment '{segment}'")]
    TrailingText { segment: String, found: char },

    #[error("stray '{found}' in segment '{segment}'")]
    StrayBracket { segment: String, found: char },
}

/// Split a textual path on `/` separators that sit outside key predicates.
///
/// Empty segments (leading, trailing or doubled slashes) are dropped, so
/// `"/a/b"`, `"a/b"` and `"a//b/"` all split to `["a", "b"]`. A backslash
/// escapes the following character inside a predicate and is kept verbatim
/// for [`parse_elements`] to interpret.
pub fn split_path(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_predicate = false;
    let mut chars = path.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' if in_predicate => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '[' => {
                in_predicate = true;
                current.push(c);
            }
            ']' => {
                in_predicate = false;
                current.push(c);
            }
            '/' if !in_predicate => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Parse pre-split segments into a structured [`Path`].
///
/// An empty segment list yields an empty path (the data-tree root).
pub fn parse_elements<S: AsRef<str>>(segments: &[S]) -> Result<Path, PathError> {
    let elem = segments
        .iter()
        .map(|s| parse_segment(s.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Path {
        elem,
        ..Path::default()
    })
}

/// Convenience for `parse_elements(&split_path(path))`.
pub fn parse_path(path: &str) -> Result<Path, PathError> {
    parse_elements(&split_path(path))
}

fn parse_segment(segment: &str) -> Result<PathElem, PathError> {
    let (name, mut rest) = match segment.find('[') {
        Some(idx) => (&segment[..idx], &segment[idx..]),
        None => (segment, ""),
    };
    if name.is_empty() {
        return Err(PathError::EmptyName {
            segment: segment.into(),
        });
    }
    if name.contains(']') {
        return Err(PathError::StrayBracket {
            segment: segment.into(),
            found: ']',
        });
    }

    let mut key = BTreeMap::new();
    while let Some(c) = rest.chars().next() {
        if c != '[' {
            return Err(PathError::TrailingText {
                segment: segment.into(),
                found: c,
            });
        }
        let (k, v, remaining) = parse_predicate(segment, &rest[1..])?;
        if key.insert(k.clone(), v).is_some() {
            return Err(PathError::DuplicateKey {
                segment: segment.into(),
                key: k,
            });
        }
        rest = remaining;
    }

    Ok(PathElem {
        name: name.into(),
        key,
    })
}

/// Parse `key=value]` (the opening bracket already consumed), returning the
/// key, the unescaped value and whatever follows the closing bracket.
fn parse_predicate<'a>(
    segment: &str,
    body: &'a str,
) -> Result<(String, String, &'a str), PathError> {
    let Some(eq) = body.find('=') else {
        return Err(if body.contains(']') {
            PathError::MissingEquals {
                segment: segment.into(),
            }
        } else {
            PathError::Unterminated {
                segment: segment.into(),
            }
        });
    };
    let key = &body[..eq];
    if key.contains(']') {
        return Err(PathError::MissingEquals {
            segment: segment.into(),
        });
    }
    if key.is_empty() {
        return Err(PathError::EmptyKey {
            segment: segment.into(),
        });
    }
    if key.contains('[') {
        return Err(PathError::StrayBracket {
            segment: segment.into(),
            found: '[',
        });
    }

    let mut value = String::new();
    let mut chars = body[eq + 1..].char_indices();
    while let Some((idx, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, escaped)) => value.push(escaped),
                None => break,
            },
            ']' => {
                let after = &body[eq + 1 + idx + 1..];
                return Ok((key.to_string(), value, after));
            }
            _ => value.push(c),
        }
    }
    Err(PathError::Unterminated {
        segment: segment.into(),
    })
}

// ── Rendering ───────────────────────────────────────────────────────

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.origin.is_empty() {
            write!(f, "{}:", self.origin)?;
        }
        if self.elem.is_empty() {
            return f.write_str("/");
        }
        for elem in &self.elem {
            write!(f, "/{elem}")?;
        }
        Ok(())
    }
}

impl fmt::Display for PathElem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (k, v) in &self.key {
            write!(f, "[{k}=")?;
            for c in v.chars() {
                if matches!(c, ']' | '\\') {
                    f.write_str("\\")?;
                }
                write!(f, "{c}")?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn split_ignores_slashes_inside_predicates() {
        assert_eq!(
            split_path("/interfaces/interface[name=Ethernet1/1]/state"),
            vec!["interfaces", "interface[name=Ethernet1/1]", "state"]
        );
        assert_eq!(split_path("a//b/"), vec!["a", "b"]);
        assert!(split_path("").is_empty());
        assert!(split_path("/").is_empty());
    }

    #[test]
    fn plain_segments_become_elements() {
        let path = parse_elements(&["a", "b", "c"]).unwrap();
        let names: Vec<_> = path.elem.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(path.elem.iter().all(|e| e.key.is_empty()));
        assert_eq!(path.to_string(), "/a/b/c");
    }

    #[test]
    fn multiple_key_predicates_on_one_segment() {
        let path = parse_path("/cont1a/list5[key1=abc][key2=8]/leaf5a").unwrap();
        let list = &path.elem[1];
        assert_eq!(list.name, "list5");
        assert_eq!(list.key.get("key1").map(String::as_str), Some("abc"));
        assert_eq!(list.key.get("key2").map(String::as_str), Some("8"));
    }

    #[test]
    fn escaped_bracket_stays_in_value() {
        let path = parse_path(r"/a[name=x\]y]").unwrap();
        assert_eq!(path.elem[0].key["name"], "x]y");
        assert_eq!(path.to_string(), r"/a[name=x\]y]");
    }

    #[test]
    fn empty_segment_list_is_root() {
        let path = parse_elements::<&str>(&[]).unwrap();
        assert!(path.elem.is_empty());
        assert_eq!(path.to_string(), "/");
    }

    #[test]
    fn malformed_predicates_are_rejected() {
        assert!(matches!(
            parse_path("/a[name=x"),
            Err(PathError::Unterminated { .. })
        ));
        assert!(matches!(
            parse_path("/a[name]"),
            Err(PathError::MissingEquals { .. })
        ));
        assert!(matches!(
            parse_path("/a[=x]"),
            Err(PathError::EmptyKey { .. })
        ));
        assert!(matches!(
            parse_path("/a[k=1][k=2]"),
            Err(PathError::DuplicateKey { .. })
        ));
        assert!(matches!(
            parse_path("/a[k=1]b"),
            Err(PathError::TrailingText { found: 'b', .. })
        ));
        assert!(matches!(
            parse_elements(&["[k=1]"]),
            Err(PathError::EmptyName { .. })
        ));
    }

    #[test]
    fn stray_brackets_are_rejected() {
        assert!(matches!(
            parse_path("/a]/b"),
            Err(PathError::StrayBracket { found: ']', .. })
        ));
        assert!(matches!(
            parse_path("/a[[k=1]"),
            Err(PathError::StrayBracket { found: '[', .. })
        ));
        // Inside a value, brackets only need escaping when they would close it.
        let path = parse_path(r"/a[k=[x\]]").unwrap();
        assert_eq!(path.elem[0].key["k"], "[x]");
    }
}

//! Path string tokenizer
//!
//! Grammar: `/seg[/seg...]` where `seg` is `[module:]name` followed by
//! zero or more `[key=value]` predicates. Inside a predicate value, `\`
//! escapes the next character, so `\]` and `\\` are literal. Slashes inside
//! predicates are part of the value (`[name=Ethernet1/1]`).

use crate::errors::{XlateError, XlateResult};

/// One parsed path segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub module: Option<String>,
    pub name: String,
    pub predicates: Vec<(String, String)>,
}

/// Split a path into segments
pub fn parse_path(path: &str) -> XlateResult<Vec<PathSegment>> {
    let malformed = |why: &str| XlateError::invalid_args(format!("Malformed path: {}", why)).with_path(path);

    let mut chars = path.chars().peekable();
    if chars.next() != Some('/') {
        return Err(malformed("must start with '/'"));
    }

    let mut segments = Vec::new();
    loop {
        let mut ident = String::new();
        while let Some(&c) = chars.peek() {
            if c == '/' || c == '[' {
                break;
            }
            ident.push(c);
            chars.next();
        }
        if ident.is_empty() {
            if segments.is_empty() && chars.peek().is_none() {
                return Err(malformed("empty path"));
            }
            return Err(malformed("empty segment"));
        }

        let (module, name) = match ident.split_once(':') {
            Some((m, n)) if !m.is_empty() && !n.is_empty() => (Some(m.to_string()), n.to_string()),
            Some(_) => return Err(malformed("bad module prefix")),
            None => (None, ident),
        };

        let mut predicates = Vec::new();
        while chars.peek() == Some(&'[') {
            chars.next();
            let mut key = String::new();
            loop {
                match chars.next() {
                    Some('=') => break,
                    Some(']') | None => return Err(malformed("predicate without '='")),
                    Some(c) => key.push(c),
                }
            }
            let key = key.trim().to_string();
            if key.is_empty() {
                return Err(malformed("predicate without key name"));
            }

            let mut value = String::new();
            loop {
                match chars.next() {
                    Some('\\') => match chars.next() {
                        Some(c) => value.push(c),
                        None => return Err(malformed("dangling escape")),
                    },
                    Some(']') => break,
                    Some(c) => value.push(c),
                    None => return Err(malformed("unterminated predicate")),
                }
            }
            predicates.push((key, value));
        }

        segments.push(PathSegment {
            module,
            name,
            predicates,
        });

        match chars.next() {
            None => break,
            Some('/') => {
                if chars.peek().is_none() {
                    return Err(malformed("trailing '/'"));
                }
            }
            Some(_) => return Err(malformed("unexpected character after predicate")),
        }
    }

    Ok(segments)
}

/// Escape a key value for use inside a predicate
pub fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == ']' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::XlateErrorCode;

    #[test]
    fn test_plain_path() {
        let segs = parse_path("/openconfig-interfaces:interfaces/interface").unwrap();
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].module.as_deref(), Some("openconfig-interfaces"));
        assert_eq!(segs[0].name, "interfaces");
        assert_eq!(segs[1].module, None);
    }

    #[test]
    fn test_predicates_with_slashes() {
        let segs = parse_path("/interfaces/interface[name=Ethernet1/1]/config/mtu").unwrap();
        assert_eq!(segs.len(), 4);
        assert_eq!(segs[1].predicates, vec![("name".to_string(), "Ethernet1/1".to_string())]);
    }

    #[test]
    fn test_multiple_predicates_and_escapes() {
        let segs = parse_path(r"/a/b[k1=x\]y][k2=p\\q]").unwrap();
        assert_eq!(
            segs[1].predicates,
            vec![
                ("k1".to_string(), "x]y".to_string()),
                ("k2".to_string(), r"p\q".to_string())
            ]
        );
    }

    #[test]
    fn test_escape_value_inverts() {
        let raw = r"we]ird\name";
        let path = format!("/a/b[k={}]", escape_value(raw));
        let segs = parse_path(&path).unwrap();
        assert_eq!(segs[1].predicates[0].1, raw);
    }

    #[test]
    fn test_malformed_paths() {
        for bad in ["", "a/b", "/", "/a//b", "/a/", "/a[k]", "/a[k=v", "/a[k=v]x", "/:a"] {
            let err = parse_path(bad).unwrap_err();
            assert_eq!(err.code(), XlateErrorCode::InvalidArgs, "path {:?}", bad);
        }
    }
}

//! Pure string transforms for source paths and roots.
//!
//! Everything here is side-effect-free: no filesystem probing, no percent
//! decoding, no network awareness. The consumer calls these at construction
//! (source-list normalization) and in every source-keyed query.

/// A minimal view of a URL-shaped string, enough for the source-content
/// compatibility fallbacks.
#[derive(Debug, Eq, PartialEq)]
pub(crate) struct Url<'a> {
    pub scheme: &'a str,
    pub path: &'a str,
}

fn is_scheme(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.' | '_'))
}

pub(crate) fn url_parse(s: &str) -> Option<Url<'_>> {
    let scheme_end = s.find("://")?;
    let scheme = &s[..scheme_end];
    if !is_scheme(scheme) {
        return None;
    }
    let rest = &s[scheme_end + 3..];
    let path = rest.find('/').map(|idx| &rest[idx..]).unwrap_or("/");
    Some(Url { scheme, path })
}

pub(crate) fn is_absolute(path: &str) -> bool {
    path.starts_with('/') || url_parse(path).is_some()
}

// `scheme://authority` prefix of a URL-shaped path, untouched by
// normalization.
fn split_prefix(path: &str) -> (&str, &str) {
    let Some(idx) = path.find("://") else {
        return ("", path);
    };
    if !is_scheme(&path[..idx]) {
        return ("", path);
    }
    let after = idx + 3;
    match path[after..].find('/') {
        Some(slash) => path.split_at(after + slash),
        None => (path, ""),
    }
}

/// Collapses repeated separators and resolves `.` and `..` segments.
pub(crate) fn normalize(path: &str) -> String {
    let (prefix, rest) = split_prefix(path);
    let absolute = rest.starts_with('/');

    let mut parts: Vec<&str> = Vec::new();
    for part in rest.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if matches!(parts.last(), Some(&last) if last != "..") {
                    parts.pop();
                } else if !absolute {
                    // relative paths keep leading `..`s; absolute ones
                    // cannot climb above the root
                    parts.push("..");
                }
            }
            _ => parts.push(part),
        }
    }

    let mut out = String::with_capacity(path.len());
    out.push_str(prefix);
    if absolute {
        out.push('/');
    }
    out.push_str(&parts.join("/"));
    if out.is_empty() {
        out.push('.');
    }
    out
}

/// Joins `path` onto `root` unless `path` already stands on its own.
pub(crate) fn join(root: &str, path: &str) -> String {
    if root.is_empty() || is_absolute(path) {
        return normalize(path);
    }
    if path.is_empty() {
        return normalize(root);
    }
    normalize(&format!("{}/{}", root.trim_end_matches('/'), path))
}

/// Makes `path` relative to `root`, climbing the root one `/` boundary at a
/// time; returns `path` unchanged when the two never meet.
pub(crate) fn relative(root: &str, path: &str) -> String {
    let mut root = if root.is_empty() { "." } else { root };
    root = root.trim_end_matches('/');

    let mut level = 0;
    loop {
        if let Some(rest) = path.strip_prefix(root).and_then(|r| r.strip_prefix('/')) {
            let mut out = String::with_capacity(level * 3 + rest.len());
            for _ in 0..level {
                out.push_str("../");
            }
            out.push_str(rest);
            return out;
        }

        let Some(idx) = root.rfind('/') else {
            return path.to_owned();
        };
        root = &root[..idx];
        if is_exhausted_root(root) {
            return path.to_owned();
        }
        level += 1;
    }
}

// nothing left to anchor on: "", "/", "scheme://", ...
fn is_exhausted_root(root: &str) -> bool {
    let rest = match root.find(':') {
        Some(idx) if root[idx + 1..].starts_with('/') && !root[..idx].contains('/') => {
            &root[idx + 1..]
        }
        _ => root,
    };
    rest.chars().all(|c| c == '/')
}

#[cfg(test)]
mod tests {
    use super::{is_absolute, join, normalize, relative, url_parse, Url};

    #[test]
    fn test_is_absolute() {
        assert!(is_absolute("/a/b.js"));
        assert!(is_absolute("http://example.com/a.js"));
        assert!(is_absolute("file:///a.js"));
        assert!(!is_absolute("a/b.js"));
        assert!(!is_absolute("./a.js"));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("./foo.js"), "foo.js");
        assert_eq!(normalize("a//b///c.js"), "a/b/c.js");
        assert_eq!(normalize("/a/./b/../c.js"), "/a/c.js");
        assert_eq!(normalize("../a.js"), "../a.js");
        assert_eq!(normalize("/../a.js"), "/a.js");
        assert_eq!(normalize("http://example.com//a//b.js"), "http://example.com/a/b.js");
        assert_eq!(normalize(""), ".");
    }

    #[test]
    fn test_join() {
        assert_eq!(join("/the/root", "a.js"), "/the/root/a.js");
        assert_eq!(join("/the/root/", "a.js"), "/the/root/a.js");
        assert_eq!(join("/the/root", "/other/a.js"), "/other/a.js");
        assert_eq!(join("", "a.js"), "a.js");
        assert_eq!(join("http://example.com", "a.js"), "http://example.com/a.js");
    }

    #[test]
    fn test_relative() {
        assert_eq!(relative("/the/root", "/the/root/one.js"), "one.js");
        assert_eq!(relative("/the/root", "/the/root/sub/one.js"), "sub/one.js");
        assert_eq!(relative("/the/root/sub", "/the/root/one.js"), "../one.js");
        assert_eq!(relative("/the/root", "/outside/one.js"), "/outside/one.js");
        assert_eq!(
            relative("http://example.com/app", "http://example.com/app/a.js"),
            "a.js"
        );
        assert_eq!(relative("", "one.js"), "one.js");
    }

    #[test]
    fn test_url_parse() {
        assert_eq!(
            url_parse("http://example.com/a/b"),
            Some(Url {
                scheme: "http",
                path: "/a/b"
            })
        );
        assert_eq!(
            url_parse("file:///home/a.js"),
            Some(Url {
                scheme: "file",
                path: "/home/a.js"
            })
        );
        assert_eq!(
            url_parse("http://example.com"),
            Some(Url {
                scheme: "http",
                path: "/"
            })
        );
        assert_eq!(url_parse("/no/scheme"), None);
    }
}

//! Tree path helpers shared by the environment, the storage providers and the search services.
//!
//! Tree paths are plain strings: `/`-separated, no leading or trailing slash, and `""` for
//! the root of whatever tree they are expressed against.

use std::borrow::Cow;
use std::cmp::Ordering;

use percent_encoding::percent_decode_str;

/// Percent-decode a client supplied location. Invalid UTF-8 leaves the input untouched.
pub fn decode_location(raw: &str) -> Cow<'_, str> {
    percent_decode_str(raw).decode_utf8().unwrap_or(Cow::Borrowed(raw))
}

/// Split a path into normalised segments.
///
/// Empty and `.` segments are dropped and `..` consumes the previous segment. Returns `None`
/// when the path climbs above its own root or contains a NUL byte.
pub fn segments(path: &str) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other if other.contains('\0') => return None,
            other => parts.push(other),
        }
    }
    Some(parts)
}

/// Normalise a path, see [`segments`].
pub fn normalize(path: &str) -> Option<String> {
    segments(path).map(|parts| parts.join("/"))
}

pub fn join(base: &str, relative: &str) -> String {
    match (base.is_empty(), relative.is_empty()) {
        (true, _) => relative.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{base}/{relative}"),
    }
}

pub fn parent(path: &str) -> &str {
    path.rsplit_once('/').map(|(head, _)| head).unwrap_or("")
}

pub fn file_name(path: &str) -> &str {
    path.rsplit_once('/').map(|(_, tail)| tail).unwrap_or(path)
}

/// True when `path` is `ancestor` itself or lies below it.
pub fn is_within(path: &str, ancestor: &str) -> bool {
    relative_to(path, ancestor).is_some()
}

/// `path` expressed relative to `ancestor`, or `None` when it is not a descendant.
pub fn relative_to<'a>(path: &'a str, ancestor: &str) -> Option<&'a str> {
    if ancestor.is_empty() {
        return Some(path);
    }
    let rest = path.strip_prefix(ancestor)?;
    if rest.is_empty() {
        Some(rest)
    } else {
        rest.strip_prefix('/')
    }
}

/// Shorten a media path so at most one folder level of context separates it from `folder`.
///
/// With `folder = "root/folder"`:
/// - `root/folder/file.ext` and `root/folder/sub1/file.ext` are kept as they are,
/// - `root/folder/sub1/sub2/file.ext` (or deeper) becomes `root/folder/file.ext`.
///
/// Paths outside `folder` are returned unchanged.
pub fn reduce_path(path: &str, folder: &str) -> String {
    let Some(relative) = relative_to(path, folder) else {
        return path.to_string();
    };
    let depth = relative.split('/').count();
    if depth > 2 { join(folder, file_name(relative)) } else { path.to_string() }
}

/// Order names the way people read them: `IMG_2` before `IMG_10`, `Beach` next to `beach`.
///
/// Names are compared run by run. Digit runs compare by numeric value (leading zeros break
/// ties), other runs compare case-insensitively, and a digit run sorts before text. Names
/// that still tie fall back to byte order so the result is total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = Runs(a);
    let mut right = Runs(b);
    loop {
        let ordering = match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => compare_runs(l, r),
        };
        if ordering.is_ne() {
            return ordering;
        }
    }
}

/// Maximal runs of ASCII digits and of everything else.
struct Runs<'a>(&'a str);

impl<'a> Iterator for Runs<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let digits = self.0.chars().next()?.is_ascii_digit();
        let end = self.0.find(|c: char| c.is_ascii_digit() != digits).unwrap_or(self.0.len());
        let (run, rest) = self.0.split_at(end);
        self.0 = rest;
        Some(run)
    }
}

fn is_number(run: &str) -> bool {
    run.starts_with(|c: char| c.is_ascii_digit())
}

fn compare_runs(l: &str, r: &str) -> Ordering {
    match (is_number(l), is_number(r)) {
        (true, true) => {
            let (l_value, r_value) = (l.trim_start_matches('0'), r.trim_start_matches('0'));
            l_value
                .len()
                .cmp(&r_value.len())
                .then_with(|| l_value.cmp(r_value))
                .then_with(|| l.len().cmp(&r.len()))
        }
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => {
            l.chars().flat_map(char::to_lowercase).cmp(r.chars().flat_map(char::to_lowercase))
        }
    }
}

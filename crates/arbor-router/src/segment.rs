//! Pattern segment parsing
//!
//! A pattern such as `/v1/shop/cms_:id(.+)_:page(.+).html` is split on `/` and
//! each piece is classified:
//!
//! | segment            | kind      | names               | regex              |
//! |--------------------|-----------|---------------------|--------------------|
//! | `admin`            | literal   |                     |                    |
//! | `:id`              | param     | `:id`               |                    |
//! | `?:id`             | param, optional | `:id`         |                    |
//! | `*`                | splat     | `:splat`            |                    |
//! | `*.*`              | path-ext  | `:path`, `:ext`     |                    |
//! | `:id:int`          | regex     | `:id`               | `([0-9]+)`         |
//! | `:name:string`     | regex     | `:name`             | `([\w]+)`          |
//! | `:id([0-9]+)_:name`| regex     | `:id`, `:name`      | `([0-9]+)_(.+)`    |
//!
//! Regex segments are matched against exactly one request segment.

use crate::error::{Error, Result};
use regex::Regex;
use smallvec::SmallVec;

pub(crate) const SPLAT: &str = ":splat";
pub(crate) const PATH: &str = ":path";
pub(crate) const EXT: &str = ":ext";

const INT_CLASS: &str = "[0-9]+";
const STRING_CLASS: &str = r"[\w]+";
const DEFAULT_CLASS: &str = ".+";

/// What a segment matches
#[derive(Debug, Clone)]
pub enum SegmentKind {
    /// Exact text
    Literal(String),
    /// `:name`, one whole segment
    Param(String),
    /// `*`, one or more whole segments bound to `:splat`
    Splat,
    /// `*.*`, one or more whole segments split into `:path` and `:ext`
    PathExt,
    /// Typed or regex-constrained parameters
    Regex(SegmentRegex),
}

/// Compiled regex of a pattern segment
#[derive(Debug, Clone)]
pub struct SegmentRegex {
    source: String,
    key: String,
    regex: Regex,
    names: SmallVec<[String; 2]>,
    groups: SmallVec<[String; 2]>,
}

impl SegmentRegex {
    /// The synthesized regex, without anchors
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parameter names in left-to-right order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Identity used to share tree nodes between equal segments
    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    /// Captured values for one request segment, in name order
    pub(crate) fn captures<'s>(&self, segment: &'s str) -> Option<SmallVec<[&'s str; 2]>> {
        let caps = self.regex.captures(segment)?;
        Some(
            self.groups
                .iter()
                .map(|g| caps.name(g).map_or("", |m| m.as_str()))
                .collect(),
        )
    }
}

/// One parsed pattern segment
#[derive(Debug, Clone)]
pub struct Segment {
    kind: SegmentKind,
    optional: bool,
    raw: String,
}

impl Segment {
    pub fn kind(&self) -> &SegmentKind {
        &self.kind
    }

    /// Marked with a leading `?`
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Original segment text
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Anything but a literal
    pub fn is_pattern(&self) -> bool {
        !matches!(self.kind, SegmentKind::Literal(_))
    }

    /// Untyped `:name` with the default character class
    pub fn is_plain_param(&self) -> bool {
        matches!(self.kind, SegmentKind::Param(_))
    }

    /// Names bound by this segment, in capture order
    pub fn names(&self) -> SmallVec<[&str; 2]> {
        match &self.kind {
            SegmentKind::Literal(_) => SmallVec::new(),
            SegmentKind::Param(name) => smallvec::smallvec![name.as_str()],
            SegmentKind::Splat => smallvec::smallvec![SPLAT],
            SegmentKind::PathExt => smallvec::smallvec![PATH, EXT],
            SegmentKind::Regex(re) => re.names().collect(),
        }
    }

    /// Synthesized regex, empty for segments matched without one
    pub fn regex_source(&self) -> &str {
        match &self.kind {
            SegmentKind::Regex(re) => re.source(),
            _ => "",
        }
    }

    pub(crate) fn lowercase_literal(&mut self) {
        if let SegmentKind::Literal(text) = &mut self.kind {
            *text = text.to_lowercase();
        }
    }
}

/// Split a pattern or path into its non-empty segments
///
/// ```
/// use arbor_router::segment::split_path;
///
/// assert!(split_path("/").is_empty());
/// assert_eq!(split_path("/admin/"), vec!["admin"]);
/// assert_eq!(split_path("/admin/:id:int"), vec!["admin", ":id:int"]);
/// ```
pub fn split_path(pattern: &str) -> Vec<&str> {
    pattern
        .trim_matches(|c| c == '/' || c == ' ')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse every segment of a pattern
///
/// Fails on the first malformed segment, or when a name is bound twice.
pub fn parse_pattern(pattern: &str) -> Result<Vec<Segment>> {
    let segments = split_path(pattern)
        .into_iter()
        .map(parse_segment)
        .collect::<Result<Vec<_>>>()?;

    check_unique_names(pattern, &segments)?;
    Ok(segments)
}

fn check_unique_names(pattern: &str, segments: &[Segment]) -> Result<()> {
    let mut seen: SmallVec<[&str; 8]> = SmallVec::new();
    for name in segments.iter().flat_map(|s| s.names()) {
        if seen.contains(&name) {
            return Err(Error::DuplicateParam {
                pattern: pattern.to_string(),
                name: name.to_string(),
            });
        }
        seen.push(name);
    }
    Ok(())
}

/// Parse a single segment
///
/// ```
/// use arbor_router::segment::parse_segment;
///
/// let seg = parse_segment(":id([0-9]+)_:name").unwrap();
/// assert!(seg.is_pattern());
/// assert_eq!(seg.names().as_slice(), &[":id", ":name"]);
/// assert_eq!(seg.regex_source(), "([0-9]+)_(.+)");
/// ```
pub fn parse_segment(raw: &str) -> Result<Segment> {
    let (optional, body) = match raw.strip_prefix('?') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };

    let kind = if body.starts_with('*') {
        if optional {
            return Err(Error::invalid(raw, "wildcards cannot be optional"));
        }
        match body {
            "*" => SegmentKind::Splat,
            "*.*" => SegmentKind::PathExt,
            _ => return Err(Error::invalid(raw, "wildcard must be `*` or `*.*`")),
        }
    } else if optional && !body.starts_with(':') {
        return Err(Error::invalid(raw, "`?` must be followed by a parameter"));
    } else if !body.contains(':') {
        SegmentKind::Literal(body.to_string())
    } else {
        parse_params(raw, body)?
    };

    Ok(Segment {
        kind,
        optional,
        raw: raw.to_string(),
    })
}

fn parse_params(raw: &str, body: &str) -> Result<SegmentKind> {
    if let Some(name) = body.strip_prefix(':') {
        if !name.is_empty() && name.chars().all(is_name_char) {
            return Ok(SegmentKind::Param(format!(":{name}")));
        }
    }

    let chars: Vec<char> = body.chars().collect();
    let mut source = String::with_capacity(body.len() + 8);
    let mut compiled = String::with_capacity(body.len() + 16);
    let mut names: SmallVec<[String; 2]> = SmallVec::new();
    let mut groups: SmallVec<[String; 2]> = SmallVec::new();

    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => {
                let next = chars
                    .get(i + 1)
                    .ok_or_else(|| Error::invalid(raw, "dangling escape"))?;
                for out in [&mut source, &mut compiled] {
                    out.push('\\');
                    out.push(*next);
                }
                i += 2;
            }
            ':' => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && is_name_char(chars[end]) {
                    end += 1;
                }
                if end == start {
                    return Err(Error::invalid(raw, "empty parameter name"));
                }
                let name: String = chars[start..end].iter().collect();
                i = end;

                let class = match chars.get(i) {
                    Some(':') => {
                        let (class, len) = type_shorthand(&chars[i + 1..]).ok_or_else(|| {
                            Error::invalid(raw, "unknown parameter type, expected `int` or `string`")
                        })?;
                        i += 1 + len;
                        class.to_string()
                    }
                    Some('(') => {
                        let len = group_len(&chars[i..])
                            .ok_or_else(|| Error::invalid(raw, "unbalanced `(`"))?;
                        let inner: String = chars[i + 1..i + len - 1].iter().collect();
                        let nested = Regex::new(&inner).map_err(|source| Error::InvalidRegex {
                            segment: raw.to_string(),
                            source,
                        })?;
                        if nested.captures_len() > 1 {
                            return Err(Error::invalid(
                                raw,
                                "parameter regex must not contain capture groups, use `(?:...)`",
                            ));
                        }
                        i += len;
                        inner
                    }
                    _ => DEFAULT_CLASS.to_string(),
                };

                let group = format!("__p{}", groups.len());
                source.push('(');
                source.push_str(&class);
                source.push(')');
                compiled.push_str(&format!("(?P<{group}>{class})"));
                names.push(format!(":{name}"));
                groups.push(group);
            }
            '(' => {
                let len =
                    group_len(&chars[i..]).ok_or_else(|| Error::invalid(raw, "unbalanced `(`"))?;
                let group: String = chars[i..i + len].iter().collect();
                source.push_str(&group);
                compiled.push_str(&group);
                i += len;
            }
            ')' => return Err(Error::invalid(raw, "unbalanced `)`")),
            c => {
                source.push(c);
                compiled.push(c);
                i += 1;
            }
        }
    }

    let regex = Regex::new(&format!("^{compiled}$")).map_err(|source| Error::InvalidRegex {
        segment: raw.to_string(),
        source,
    })?;

    Ok(SegmentKind::Regex(SegmentRegex {
        source,
        key: compiled,
        regex,
        names,
        groups,
    }))
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// `int` / `string` after `:name:`, returning the class and chars consumed
fn type_shorthand(rest: &[char]) -> Option<(&'static str, usize)> {
    for (word, class) in [("int", INT_CLASS), ("string", STRING_CLASS)] {
        let len = word.chars().count();
        let matches_word = rest.len() >= len && rest[..len].iter().copied().eq(word.chars());
        let at_boundary = rest.get(len).map_or(true, |c| !is_name_char(*c));
        if matches_word && at_boundary {
            return Some((class, len));
        }
    }
    None
}

/// Length of the balanced group starting at `chars[0] == '('`
fn group_len(chars: &[char]) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_class = false;
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '[' if !in_class => in_class = true,
            ']' if in_class => in_class = false,
            '(' if !in_class => depth += 1,
            ')' if !in_class => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn describe(raw: &str) -> (bool, Vec<String>, String) {
        let seg = parse_segment(raw).unwrap();
        let names: Vec<String> = seg.names().iter().map(|s| s.to_string()).collect();
        (seg.is_pattern(), names, seg.regex_source().to_string())
    }

    #[test]
    fn test_split_path() {
        assert!(split_path("").is_empty());
        assert!(split_path("/").is_empty());
        assert_eq!(split_path("/admin"), vec!["admin"]);
        assert_eq!(split_path("/admin/"), vec!["admin"]);
        assert_eq!(split_path("/admin/users"), vec!["admin", "users"]);
        assert_eq!(split_path("//admin//users/"), vec!["admin", "users"]);
    }

    #[test]
    fn test_segment_table() {
        let table: &[(&str, bool, &[&str], &str)] = &[
            ("admin", false, &[], ""),
            ("*", true, &[":splat"], ""),
            ("*.*", true, &[":path", ":ext"], ""),
            (":id", true, &[":id"], ""),
            ("?:id", true, &[":id"], ""),
            (":id:int", true, &[":id"], "([0-9]+)"),
            (":name:string", true, &[":name"], r"([\w]+)"),
            (":id([0-9]+)", true, &[":id"], "([0-9]+)"),
            (":id([0-9]+)_:name", true, &[":id", ":name"], "([0-9]+)_(.+)"),
            (":id(.+)_cms.html", true, &[":id"], "(.+)_cms.html"),
            (r":id(.+)_cms\.html", true, &[":id"], r"(.+)_cms\.html"),
            ("cms_:id(.+)_:page(.+).html", true, &[":id", ":page"], "cms_(.+)_(.+).html"),
            (":app(a|b|c)", true, &[":app"], "(a|b|c)"),
            (r":app\((a|b|c)\)", true, &[":app"], r"(.+)\((a|b|c)\)"),
        ];

        for (raw, is_pattern, names, regex) in table {
            let (p, n, r) = describe(raw);
            assert_eq!(p, *is_pattern, "{raw}");
            assert_eq!(n, names.iter().map(|s| s.to_string()).collect::<Vec<_>>(), "{raw}");
            assert_eq!(r, *regex, "{raw}");
        }
    }

    #[test]
    fn test_optional_flag() {
        assert!(parse_segment("?:id").unwrap().is_optional());
        assert!(parse_segment("?:auth:int").unwrap().is_optional());
        assert!(!parse_segment(":id").unwrap().is_optional());
    }

    #[test]
    fn test_regex_captures_in_name_order() {
        let seg = parse_segment("cms_:id(.+)_:page(.+).html").unwrap();
        let SegmentKind::Regex(re) = seg.kind() else {
            panic!("expected regex segment");
        };
        let caps = re.captures("cms_123_1.html").unwrap();
        assert_eq!(caps.as_slice(), &["123", "1"]);
        assert!(re.captures("cms_123.htm").is_none());
    }

    #[test]
    fn test_escaped_parens_are_literal() {
        let seg = parse_segment(r":id\((a|b|c)\)").unwrap();
        let SegmentKind::Regex(re) = seg.kind() else {
            panic!("expected regex segment");
        };
        assert_eq!(re.captures("123(b)").unwrap().as_slice(), &["123"]);
        assert!(re.captures("123(d)").is_none());
    }

    #[test]
    fn test_malformed_segments() {
        assert!(matches!(parse_segment(":id([0-9]+"), Err(Error::InvalidPattern { .. })));
        assert!(matches!(parse_segment(":id)"), Err(Error::InvalidPattern { .. })));
        assert!(matches!(parse_segment(":"), Err(Error::InvalidPattern { .. })));
        assert!(matches!(parse_segment(":id:float"), Err(Error::InvalidPattern { .. })));
        assert!(matches!(parse_segment("?id"), Err(Error::InvalidPattern { .. })));
        assert!(matches!(parse_segment("?*"), Err(Error::InvalidPattern { .. })));
        assert!(matches!(parse_segment("*foo"), Err(Error::InvalidPattern { .. })));
        assert!(matches!(parse_segment(":id([0-9]{2,1})"), Err(Error::InvalidRegex { .. })));
        assert!(matches!(parse_segment(":id((a|b))"), Err(Error::InvalidPattern { .. })));
        assert!(parse_segment(":id((?:a|b)[0-9])").is_ok());
    }

    #[test]
    fn test_duplicate_names() {
        assert!(matches!(
            parse_pattern("/a/:id/b/:id"),
            Err(Error::DuplicateParam { .. })
        ));
        assert!(matches!(
            parse_pattern("/*/x/*"),
            Err(Error::DuplicateParam { .. })
        ));
        assert!(parse_pattern("/a/:id/b/:name").is_ok());
    }
}

//! Route template compilation.
//!
//! A template is a path with literal segments and parameter placeholders:
//! ```ignore
//!  Syntax           Type
//!  {name}           required parameter, one or more non-`/` characters
//!  {?name}          optional parameter
//!  {name:regex}     required parameter restricted to `regex`
//!  {?name:regex}    optional parameter restricted to `regex`
//! ```
//!
//! Required parameters must be present for the template to match:
//! ```ignore
//!  Template: /order/{id:\d+}
//!
//!   /order/42          match: id="42"
//!   /order/abc         no match
//!   /order             no match
//! ```
//!
//! An optional parameter owns the `/` in front of it, so leaving it out
//! leaves the separator out too. When it is absent it has no entry in the
//! [`Params`] at all:
//! ```ignore
//!  Template: /post/{slug}/{?page}
//!
//!   /post/hello        match: slug="hello"
//!   /post/hello/2      match: slug="hello", page="2"
//!   /post/hello/2/x    no match
//! ```
//!
//! Constraints are regular expression fragments. They are anchored by the
//! surrounding template, and may contain balanced braces such as `\d{4}`.

use crate::error::Error;
use crate::path;

use regex::Regex;

const DEFAULT_CONSTRAINT: &str = "[^/]+";

/// A single parameter placeholder of a compiled template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub optional: bool,
    /// The user-supplied constraint, `None` for the default.
    pub constraint: Option<String>,
}

/// A template compiled into an anchored regular expression.
#[derive(Debug, Clone)]
pub struct Pattern {
    template: String,
    regex: Regex,
    params: Vec<Param>,
}

enum Segment<'t> {
    Literal(&'t str),
    Param(Param),
}

impl Pattern {
    /// Compiles `template`, cleaning it first.
    ///
    /// ```rust
    /// use scoperoute::Pattern;
    ///
    /// let pattern = Pattern::compile("/users/{id:\\d+}/{?tab}").unwrap();
    ///
    /// let params = pattern.matches("/users/7").unwrap();
    /// assert_eq!(params.get("id"), Some("7"));
    /// assert_eq!(params.get("tab"), None);
    ///
    /// assert!(pattern.matches("/users/seven").is_none());
    /// ```
    pub fn compile(template: &str) -> Result<Self, Error> {
        let template = path::clean_template(template);
        let segments = parse(&template)?;

        let mut source = String::from("^");
        let mut params: Vec<Param> = Vec::new();

        for (i, segment) in segments.iter().enumerate() {
            match segment {
                Segment::Literal(text) => {
                    let text: &str = text;
                    // a following optional parameter takes over the separator
                    let hand_over = text.ends_with('/')
                        && matches!(segments.get(i + 1), Some(Segment::Param(p)) if p.optional);
                    let text = if hand_over { &text[..text.len() - 1] } else { text };
                    source.push_str(&regex::escape(text));
                }
                Segment::Param(param) => {
                    if params.iter().any(|p| p.name == param.name) {
                        return Err(Error::DuplicateParam {
                            name: param.name.clone(),
                            path: template.clone(),
                        });
                    }

                    let constraint = match &param.constraint {
                        Some(constraint) => {
                            check_constraint(&template, &param.name, constraint)?;
                            constraint.as_str()
                        }
                        None => DEFAULT_CONSTRAINT,
                    };

                    let group = format!("(?P<{}>{})", param.name, constraint);
                    let after_separator = i > 0
                        && matches!(&segments[i - 1], Segment::Literal(t) if t.ends_with('/'));

                    if !param.optional {
                        source.push_str(&group);
                    } else if after_separator {
                        source.push_str(&format!("(?:/{})?", group));
                    } else {
                        source.push_str(&format!("(?:{})?", group));
                    }

                    params.push(param.clone());
                }
            }
        }

        source.push('$');

        let regex = Regex::new(&source).map_err(|source| Error::InvalidConstraint {
            name: params.last().map(|p| p.name.clone()).unwrap_or_default(),
            path: template.clone(),
            source,
        })?;

        Ok(Self {
            template,
            regex,
            params,
        })
    }

    /// The cleaned template this pattern was compiled from.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// The parameters of the template, in the order they appear.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Tests a clean request path against the pattern.
    ///
    /// Returns the captured parameters on success. Optional parameters that
    /// did not participate in the match are left out.
    pub fn matches(&self, path: &str) -> Option<Params> {
        let captures = self.regex.captures(path).or_else(|| {
            // the root is the clean form of the empty path, which is what a
            // template like `/{?page}` reduces to when the parameter is absent
            if path == "/" {
                self.regex.captures("")
            } else {
                None
            }
        })?;

        let entries = self
            .params
            .iter()
            .filter_map(|param| {
                captures
                    .name(&param.name)
                    .map(|m| (param.name.clone(), m.as_str().to_owned()))
            })
            .collect();

        Some(Params { entries })
    }
}

/// Validates a constraint on its own so a bad fragment is reported against
/// the parameter that carries it.
fn check_constraint(template: &str, name: &str, constraint: &str) -> Result<(), Error> {
    Regex::new(&format!("^(?:{})$", constraint))
        .map(drop)
        .map_err(|source| Error::InvalidConstraint {
            name: name.to_owned(),
            path: template.to_owned(),
            source,
        })
}

fn parse(template: &str) -> Result<Vec<Segment<'_>>, Error> {
    let malformed = |offset| Error::MalformedPattern {
        path: template.to_owned(),
        offset,
    };

    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut rest = template.char_indices();

    while let Some((start, c)) = rest.next() {
        if c != '{' {
            continue;
        }

        if literal_start < start {
            segments.push(Segment::Literal(&template[literal_start..start]));
        }

        // find the matching brace; constraints may nest `{m,n}` quantifiers
        let mut depth = 1;
        let mut end = None;
        for (i, c) in rest.by_ref() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }

        let end = end.ok_or_else(|| malformed(start))?;
        let param = parse_placeholder(&template[start + 1..end]).ok_or_else(|| malformed(start))?;
        segments.push(Segment::Param(param));
        literal_start = end + 1;
    }

    if literal_start < template.len() {
        segments.push(Segment::Literal(&template[literal_start..]));
    }

    Ok(segments)
}

fn parse_placeholder(body: &str) -> Option<Param> {
    let (optional, body) = match body.strip_prefix('?') {
        Some(body) => (true, body),
        None => (false, body),
    };

    let (name, constraint) = match body.split_once(':') {
        Some((name, constraint)) if !constraint.is_empty() => (name, Some(constraint.to_owned())),
        Some(_) => return None,
        None => (body, None),
    };

    let mut chars = name.chars();
    let valid = chars
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !valid {
        return None;
    }

    Some(Param {
        name: name.to_owned(),
        optional,
        constraint,
    })
}

/// The parameters captured by a successful match, in template order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: Vec<(String, String)>,
}

impl Params {
    /// Returns the value captured for `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for Params {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

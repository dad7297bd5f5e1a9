//! Request path normalization.
//!
//! Turns a concrete path back into its template by substituting resolved
//! path-parameter values with `{name}` placeholders, so that a metric's help
//! text does not depend on parameter values.

/// Ordered multimap of path parameter name -> observed values.
///
/// Insertion order is preserved; it decides which parameter wins when two of
/// them share a value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    entries: Vec<(String, Vec<String>)>,
}

impl PathParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value for `name`, creating the entry on first use.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((name, vec![value])),
        }
    }

    /// Declare a parameter without values, fixing its position in the order.
    pub fn declare(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.entries.iter().any(|(n, _)| *n == name) {
            self.entries.push((name, Vec::new()));
        }
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|(_, v)| v.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PathParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut out = PathParams::new();
        for (k, v) in iter {
            out.push(k, v);
        }
        out
    }
}

#[derive(Debug, Clone, Copy)]
enum Piece<'a> {
    Literal(&'a str),
    Placeholder(&'a str),
}

/// Normalize `raw_path` against the observed parameter values.
///
/// One leading `/` is stripped. Every occurrence of a parameter value is
/// replaced by `{name}`, parameters taken in `params` order. Text that is
/// already a `{...}` placeholder is never rewritten, so normalizing twice
/// yields the same result.
pub fn normalize(raw_path: &str, params: &PathParams) -> String {
    let path = raw_path.strip_prefix('/').unwrap_or(raw_path);

    let mut pieces = split_placeholders(path);
    for (name, values) in params.iter() {
        for value in values.iter().filter(|v| !v.is_empty()) {
            pieces = substitute(pieces, name, value);
        }
    }

    let mut out = String::with_capacity(path.len());
    for p in &pieces {
        match p {
            Piece::Literal(s) => out.push_str(s),
            Piece::Placeholder(name) => {
                out.push('{');
                out.push_str(name);
                out.push('}');
            }
        }
    }
    out
}

/// Split into literal runs and existing `{...}` placeholders. An unbalanced
/// `{` is kept as literal text.
fn split_placeholders(path: &str) -> Vec<Piece<'_>> {
    let mut pieces = Vec::new();
    let mut rest = path;

    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}') else { break };
        let close = open + close;
        if open > 0 {
            pieces.push(Piece::Literal(&rest[..open]));
        }
        pieces.push(Piece::Placeholder(&rest[open + 1..close]));
        rest = &rest[close + 1..];
    }
    if !rest.is_empty() {
        pieces.push(Piece::Literal(rest));
    }
    pieces
}

fn substitute<'a>(pieces: Vec<Piece<'a>>, name: &'a str, value: &str) -> Vec<Piece<'a>> {
    let mut out = Vec::with_capacity(pieces.len());
    for piece in pieces {
        let Piece::Literal(mut lit) = piece else {
            out.push(piece);
            continue;
        };

        while let Some(at) = lit.find(value) {
            if at > 0 {
                out.push(Piece::Literal(&lit[..at]));
            }
            out.push(Piece::Placeholder(name));
            lit = &lit[at + value.len()..];
        }
        if !lit.is_empty() {
            out.push(Piece::Literal(lit));
        }
    }
    out
}

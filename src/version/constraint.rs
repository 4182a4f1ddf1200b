//! Version constraint parsing and matching
//!
//! Supports the requirement syntax of `composer.json`:
//! - `1.2.3` - exact match
//! - `^1.2.3` - next significant release: >=1.2.3 <2.0.0 (0.x locks the leftmost non-zero segment)
//! - `~1.2` / `~1.2.3` - last given segment may grow: >=1.2 <2.0 / >=1.2.3 <1.3.0
//! - `>=1.0`, `>1.0`, `<=1.0`, `<1.0`, `!=1.0`, `<>1.0`, `==1.0`
//! - `1.2.*`, `1.x`, `*` - wildcards
//! - `1.0 - 2.0` - hyphen range
//! - `>=1.0,<2.0` or `>=1.0 <2.0` - conjunction
//! - `^1.0 || ^2.0` - alternatives
//! - `dev-main` - a named branch
//!
//! `@stability` suffixes (`^2.0@beta`) only influence visibility and are
//! ignored for matching; see [`extract_stability_flag`].

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Serialize, Serializer};

use crate::version::error::ParseConstraintError;
use crate::version::ordering::Version;
use crate::version::stability::Stability;

static WILDCARD_ANY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v?[xX*](\.[xX*])*$").expect("wildcard pattern is valid"));

static WILDCARD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^v?(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:\.[xX*])+$").expect("wildcard pattern is valid")
});

static PARTIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^v?(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:\.(\d+))?").expect("partial pattern is valid")
});

static OPERATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(<>|!=|>=?|<=?|==?)?\s*(.+)$").expect("operator pattern is valid")
});

static EXPLICIT_FLAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[^@]*?@(stable|rc|beta|alpha|dev)$").expect("flag pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    /// `*`: every version, branches included
    Any,
    Compare(Operator, Version),
    /// All must match
    And(Vec<Node>),
    /// Any must match
    Or(Vec<Node>),
}

impl Node {
    fn matches(&self, version: &Version) -> bool {
        match self {
            Node::Any => true,
            Node::Compare(op, bound) => {
                // Branches carry no ordering against release ranges
                if version.is_branch() || bound.is_branch() {
                    return match op {
                        Operator::Eq => version == bound,
                        Operator::Ne => version != bound,
                        _ => false,
                    };
                }
                match op {
                    Operator::Eq => version == bound,
                    Operator::Ne => version != bound,
                    Operator::Lt => version < bound,
                    Operator::Le => version <= bound,
                    Operator::Gt => version > bound,
                    Operator::Ge => version >= bound,
                }
            }
            Node::And(nodes) => nodes.iter().all(|n| n.matches(version)),
            Node::Or(nodes) => nodes.iter().any(|n| n.matches(version)),
        }
    }

    fn from_parts(mut nodes: Vec<Node>, combine: fn(Vec<Node>) -> Node) -> Node {
        if nodes.len() == 1 {
            nodes.remove(0)
        } else {
            combine(nodes)
        }
    }
}

/// A parsed requirement constraint that remembers its original text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConstraint {
    pretty: String,
    node: Node,
}

impl VersionConstraint {
    pub fn parse(input: &str) -> Result<Self, ParseConstraintError> {
        let pretty = input.trim();
        if pretty.is_empty() {
            return Err(ParseConstraintError::Empty);
        }

        let alternatives = pretty
            .split('|')
            .map(str::trim)
            .filter(|alt| !alt.is_empty())
            .map(parse_conjunction)
            .collect::<Result<Vec<_>, _>>()?;

        if alternatives.is_empty() {
            return Err(ParseConstraintError::Malformed(pretty.to_string()));
        }

        Ok(Self {
            pretty: pretty.to_string(),
            node: Node::from_parts(alternatives, Node::Or),
        })
    }

    /// The constraint as written by the user
    pub fn pretty(&self) -> &str {
        &self.pretty
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.node.matches(version)
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty)
    }
}

impl Serialize for VersionConstraint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.pretty)
    }
}

/// Parse one `||` alternative: a hyphen range or a comma/space separated conjunction
fn parse_conjunction(group: &str) -> Result<Node, ParseConstraintError> {
    if let Some((from, to)) = group.split_once(" - ") {
        return parse_hyphen(from.trim(), to.trim());
    }

    let tokens: Vec<&str> = group
        .split([',', ' ', '\t'])
        .filter(|token| !token.is_empty())
        .collect();

    let mut parts: Vec<String> = Vec::new();
    let mut iter = tokens.into_iter().peekable();
    while let Some(token) = iter.next() {
        if token == "as" {
            // "1.0 as 2.0": the alias target carries no constraint
            iter.next();
            continue;
        }
        let is_bare_operator = matches!(token, "<>" | "!=" | ">" | ">=" | "<" | "<=" | "=" | "==" | "^" | "~");
        if is_bare_operator {
            let operand = iter
                .next()
                .ok_or_else(|| ParseConstraintError::Malformed(group.to_string()))?;
            parts.push(format!("{}{}", token, operand));
        } else {
            parts.push(token.to_string());
        }
    }

    let nodes = parts
        .iter()
        .map(|part| parse_single(part))
        .collect::<Result<Vec<_>, _>>()?;

    if nodes.is_empty() {
        return Err(ParseConstraintError::Malformed(group.to_string()));
    }

    Ok(Node::from_parts(nodes, Node::And))
}

fn parse_single(part: &str) -> Result<Node, ParseConstraintError> {
    let part = match part.split_once('@') {
        Some((constraint, _flag)) => constraint.trim(),
        None => part.trim(),
    };

    // "@dev" on its own only relaxes stability
    if part.is_empty() || WILDCARD_ANY_RE.is_match(part) {
        return Ok(Node::Any);
    }

    if part.starts_with("dev-") {
        return Ok(Node::Compare(Operator::Eq, parse_version(part, part)?));
    }

    if let Some(rest) = part.strip_prefix("~>").or_else(|| part.strip_prefix('~')) {
        let (version, count) = parse_partial(rest.trim(), part)?;
        let high_position = count.saturating_sub(1).max(1);
        return Ok(range(version.as_dev_bound(), bump(&version, high_position, part)?));
    }

    if let Some(rest) = part.strip_prefix('^') {
        let (version, count) = parse_partial(rest.trim(), part)?;
        let segments = version.segments().unwrap_or_default();
        let position = if segments[0] != 0 || count == 1 {
            1
        } else if segments[1] != 0 || count == 2 {
            2
        } else {
            3
        };
        return Ok(range(version.as_dev_bound(), bump(&version, position, part)?));
    }

    if let Some(captures) = WILDCARD_RE.captures(part) {
        let mut segments = [0u64; 4];
        let mut position = 0;
        for index in 0..3 {
            if let Some(segment) = captures.get(index + 1) {
                segments[index] = segment
                    .as_str()
                    .parse()
                    .map_err(|_| ParseConstraintError::Malformed(part.to_string()))?;
                position = index + 1;
            }
        }
        let low = Version::dev(segments);
        let high = bump(&low, position, part)?;
        return Ok(range(low, high));
    }

    let captures = OPERATOR_RE
        .captures(part)
        .ok_or_else(|| ParseConstraintError::Malformed(part.to_string()))?;
    let operator = match captures.get(1).map(|m| m.as_str()) {
        Some("<>") | Some("!=") => Operator::Ne,
        Some(">=") => Operator::Ge,
        Some(">") => Operator::Gt,
        Some("<=") => Operator::Le,
        Some("<") => Operator::Lt,
        _ => Operator::Eq,
    };
    let version = parse_version(captures[2].trim(), part)?;

    // ">=1.0" admits 1.0 pre-releases and "<2.0" excludes 2.0 pre-releases
    let version = match operator {
        Operator::Ge | Operator::Lt => version.as_dev_bound(),
        _ => version,
    };

    Ok(Node::Compare(operator, version))
}

fn parse_hyphen(from: &str, to: &str) -> Result<Node, ParseConstraintError> {
    let constraint = format!("{} - {}", from, to);
    let (low, _) = parse_partial(from, &constraint)?;
    let (high, count) = parse_partial(to, &constraint)?;

    let upper = if count < 3 {
        Node::Compare(Operator::Lt, bump(&high, count, &constraint)?)
    } else {
        Node::Compare(Operator::Le, high)
    };

    Ok(Node::And(vec![
        Node::Compare(Operator::Ge, low.as_dev_bound()),
        upper,
    ]))
}

fn parse_version(input: &str, constraint: &str) -> Result<Version, ParseConstraintError> {
    Version::parse(input).map_err(|source| ParseConstraintError::InvalidVersion {
        constraint: constraint.to_string(),
        source,
    })
}

/// Parse a possibly partial release version and report how many numeric segments were given
fn parse_partial(input: &str, constraint: &str) -> Result<(Version, usize), ParseConstraintError> {
    let version = parse_version(input, constraint)?;
    if version.is_branch() {
        return Err(ParseConstraintError::Malformed(constraint.to_string()));
    }

    let count = PARTIAL_RE
        .captures(input)
        .map(|captures| (1..=4).filter(|i| captures.get(*i).is_some()).count())
        .unwrap_or(0);

    if count == 0 {
        return Err(ParseConstraintError::Malformed(constraint.to_string()));
    }

    Ok((version, count))
}

/// `-dev` snapshot of the release following `version` at the 1-based segment `position`
///
/// Fails when the bumped segment is already at its maximum.
fn bump(version: &Version, position: usize, constraint: &str) -> Result<Version, ParseConstraintError> {
    let mut segments = version.segments().unwrap_or_default();
    let index = position.clamp(1, 4) - 1;
    segments[index] = segments[index]
        .checked_add(1)
        .ok_or_else(|| ParseConstraintError::Malformed(constraint.to_string()))?;
    for segment in segments.iter_mut().skip(index + 1) {
        *segment = 0;
    }
    Ok(Version::dev(segments))
}

fn range(low: Version, high: Version) -> Node {
    Node::And(vec![
        Node::Compare(Operator::Ge, low),
        Node::Compare(Operator::Lt, high),
    ])
}

/// Stability a requirement asks for beyond the project's minimum stability
///
/// Explicit `@beta` style flags always win; otherwise an unstable version
/// written directly into the constraint (`dev-main`, `2.0.0-RC1`) is
/// honoured when it is less stable than `minimum`. Returns the least stable
/// level found.
pub fn extract_stability_flag(constraint: &str, minimum: Stability) -> Option<Stability> {
    let alternatives: Vec<&str> = constraint
        .split('|')
        .map(str::trim)
        .filter(|alt| !alt.is_empty())
        .collect();

    let explicit = alternatives
        .iter()
        .filter_map(|alt| EXPLICIT_FLAG_RE.captures(alt))
        .filter_map(|captures| captures[1].parse::<Stability>().ok())
        .min();
    if explicit.is_some() {
        return explicit;
    }

    alternatives
        .iter()
        .map(|alt| alt.split_once(" as ").map_or(*alt, |(actual, _)| actual.trim()))
        .filter(|alt| !alt.contains([',', ' ', '@']))
        .filter_map(|alt| {
            let version = alt.trim_start_matches(['^', '~', '<', '>', '=', '!']);
            Version::parse(version).ok()
        })
        .map(|version| version.stability())
        .filter(|stability| *stability < minimum)
        .min()
}

//! Release version ordering
//!
//! Versions are compared segment by segment as numbers, so `1.10` sorts after `1.9`.
//! Pre-, post- and dev-release markers follow the usual packaging conventions:
//! `1.0.dev1 < 1.0a1 < 1.0rc1 < 1.0 < 1.0.post1`. Trailing zero segments are not
//! significant (`1.0 == 1.0.0`).
//!
//! Strings that do not look like a version at all are kept verbatim; they order
//! before every well-formed version and lexically among themselves.

use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;

static VERSION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        ^\s*v?
        (?:(?P<epoch>[0-9]+)!)?
        (?P<release>[0-9]+(?:\.[0-9]+)*)
        (?:[-_.]?(?P<pre_l>alpha|a|beta|b|preview|pre|c|rc)[-_.]?(?P<pre_n>[0-9]+)?)?
        (?:-(?P<post_implicit>[0-9]+)|[-_.]?(?P<post_l>post|rev|r)[-_.]?(?P<post_n>[0-9]+)?)?
        (?:[-_.]?(?P<dev_l>dev)[-_.]?(?P<dev_n>[0-9]+)?)?
        (?:\+(?P<local>[a-z0-9]+(?:[-_.][a-z0-9]+)*))?
        \s*$",
    )
    .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum PreKind {
    Alpha,
    Beta,
    Candidate,
}

/// Position of a release relative to its pre-releases
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Stage {
    /// `1.0.dev1` with no pre marker sorts before `1.0a1`
    DevOnly,
    Pre(PreKind, u64),
    Final,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Key {
    epoch: u64,
    release: Vec<u64>,
    stage: Stage,
    post: Option<u64>,
    // (0, n) for a dev release, (1, 0) otherwise
    dev: (u8, u64),
    local: Option<String>,
}

/// A comparable version, parsed from the free-form string carried in metadata
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    key: Option<Key>,
}

impl Version {
    pub fn parse(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            key: parse_key(raw),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the string followed a recognizable version scheme
    pub fn is_well_formed(&self) -> bool {
        self.key.is_some()
    }

    /// Whether this is a pre- or dev-release
    pub fn is_prerelease(&self) -> bool {
        self.key
            .as_ref()
            .map(|k| k.stage != Stage::Final || k.dev.0 == 0)
            .unwrap_or(false)
    }
}

fn parse_number(caps: &regex::Captures<'_>, group: &str) -> Option<u64> {
    caps.name(group).and_then(|m| m.as_str().parse().ok())
}

fn parse_key(raw: &str) -> Option<Key> {
    let caps = VERSION_PATTERN.captures(raw)?;

    let mut release = caps
        .name("release")?
        .as_str()
        .split('.')
        .map(|segment| segment.parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;
    while release.last() == Some(&0) {
        release.pop();
    }

    let pre = caps.name("pre_l").map(|label| {
        let kind = match label.as_str().to_lowercase().as_str() {
            "a" | "alpha" => PreKind::Alpha,
            "b" | "beta" => PreKind::Beta,
            _ => PreKind::Candidate,
        };
        (kind, parse_number(&caps, "pre_n").unwrap_or(0))
    });

    let post = if caps.name("post_implicit").is_some() {
        parse_number(&caps, "post_implicit")
    } else if caps.name("post_l").is_some() {
        Some(parse_number(&caps, "post_n").unwrap_or(0))
    } else {
        None
    };

    let has_dev = caps.name("dev_l").is_some();
    let dev = if has_dev {
        (0, parse_number(&caps, "dev_n").unwrap_or(0))
    } else {
        (1, 0)
    };

    let stage = match pre {
        Some((kind, n)) => Stage::Pre(kind, n),
        None if post.is_none() && has_dev => Stage::DevOnly,
        None => Stage::Final,
    };

    Some(Key {
        epoch: parse_number(&caps, "epoch").unwrap_or(0),
        release,
        stage,
        post,
        dev,
        local: caps.name("local").map(|m| m.as_str().to_lowercase()),
    })
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.key, &other.key) {
            (Some(a), Some(b)) => a.cmp(b),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => self.raw.cmp(&other.raw),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

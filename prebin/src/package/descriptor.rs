//! Request descriptors and their identity-string encoding.
//!
//! A descriptor names a package the way a user (or an installed file's
//! ownership tag) refers to it:
//!
//! ```text
//! name[#package_id][@version]
//! ```
//!
//! Inside each component `%`, `#` and `@` are percent-escaped so the
//! encoding always decodes back to the same descriptor.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const PACKAGE_ID_SEPARATOR: char = '#';
const VERSION_SEPARATOR: char = '@';

/// Error decoding a descriptor string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// The name component is empty.
    #[error("package name is empty in '{0}'")]
    EmptyName(String),

    /// A separator appears more than once.
    #[error("unexpected '{separator}' in '{input}'")]
    UnexpectedSeparator { separator: char, input: String },
}

/// Identity of a desired (or installed) package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RequestDescriptor {
    /// Binary name as listed in the catalogs.
    pub name: String,
    /// Disambiguates multiple builds of the same name.
    pub package_id: Option<String>,
    /// Requested or installed version.
    pub version: Option<String>,
}

impl RequestDescriptor {
    /// Create a descriptor with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package_id: None,
            version: None,
        }
    }

    /// Set the package id. Empty strings clear it.
    pub fn with_package_id(mut self, package_id: impl Into<String>) -> Self {
        self.package_id = non_empty(package_id.into());
        self
    }

    /// Set the version. Empty strings clear it.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = non_empty(version.into());
        self
    }

    /// Package id, or `""` when unset.
    pub fn package_id(&self) -> &str {
        self.package_id.as_deref().unwrap_or("")
    }

    /// Whether both descriptors denote the same package.
    ///
    /// Names must match; package ids are compared only when both sides
    /// carry one. Versions are never compared.
    pub fn same_package(&self, other: &RequestDescriptor) -> bool {
        if self.name != other.name {
            return false;
        }
        match (&self.package_id, &other.package_id) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }
}

impl fmt::Display for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&escape(&self.name))?;
        if let Some(id) = &self.package_id {
            write!(f, "{}{}", PACKAGE_ID_SEPARATOR, escape(id))?;
        }
        if let Some(version) = &self.version {
            write!(f, "{}{}", VERSION_SEPARATOR, escape(version))?;
        }
        Ok(())
    }
}

impl FromStr for RequestDescriptor {
    type Err = DescriptorError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();

        let (rest, version) = split_once_unique(trimmed, VERSION_SEPARATOR, input)?;
        let (name, package_id) = split_once_unique(rest, PACKAGE_ID_SEPARATOR, input)?;

        let name = unescape(name);
        if name.is_empty() {
            return Err(DescriptorError::EmptyName(input.to_string()));
        }

        Ok(Self {
            name,
            package_id: package_id.map(unescape).and_then(non_empty),
            version: version.map(unescape).and_then(non_empty),
        })
    }
}

fn split_once_unique<'a>(
    value: &'a str,
    separator: char,
    input: &str,
) -> Result<(&'a str, Option<&'a str>), DescriptorError> {
    match value.split_once(separator) {
        None => Ok((value, None)),
        Some((_, tail)) if tail.contains(separator) => Err(DescriptorError::UnexpectedSeparator {
            separator,
            input: input.to_string(),
        }),
        Some((head, tail)) => Ok((head, Some(tail))),
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn escape(component: &str) -> String {
    let mut out = String::with_capacity(component.len());
    for c in component.chars() {
        match c {
            '%' => out.push_str("%25"),
            '#' => out.push_str("%23"),
            '@' => out.push_str("%40"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape(component: &str) -> String {
    let mut out = String::with_capacity(component.len());
    let mut rest = component;
    while let Some(idx) = rest.find('%') {
        out.push_str(&rest[..idx]);
        let tail = &rest[idx..];
        let decoded = match tail.get(..3) {
            Some("%25") => Some('%'),
            Some("%23") => Some('#'),
            Some("%40") => Some('@'),
            _ => None,
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &tail[3..];
            }
            None => {
                out.push('%');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

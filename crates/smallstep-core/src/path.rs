//! Attribute paths addressing values inside a resource state

use std::fmt;

use crate::error::{CoreError, Result};

/// A single step in an attribute path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathStep {
    /// Named attribute of an object
    Attribute(String),
    /// Element of a list or set
    Index(usize),
}

/// Path to a nested attribute, rendered as `claims.min_tls_cert_duration`
/// or `managed_endpoints[0].id`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct AttrPath {
    steps: Vec<PathStep>,
}

impl AttrPath {
    /// Path to a top-level attribute
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            steps: vec![PathStep::Attribute(name.into())],
        }
    }

    /// Extend with a nested attribute
    pub fn attr(mut self, name: impl Into<String>) -> Self {
        self.steps.push(PathStep::Attribute(name.into()));
        self
    }

    /// Extend with a list or set element
    pub fn index(mut self, index: usize) -> Self {
        self.steps.push(PathStep::Index(index));
        self
    }

    /// Borrowing variant of [`AttrPath::attr`]
    pub fn child(&self, name: impl Into<String>) -> Self {
        self.clone().attr(name)
    }

    /// Borrowing variant of [`AttrPath::index`]
    pub fn element(&self, index: usize) -> Self {
        self.clone().index(index)
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Parse the dotted form produced by `Display`
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: &str| CoreError::InvalidPath {
            path: input.to_string(),
            reason: reason.to_string(),
        };

        if input.is_empty() {
            return Err(invalid("path is empty"));
        }

        let mut steps = Vec::new();
        for segment in input.split('.') {
            let (name, mut rest) = match segment.find('[') {
                Some(pos) => (&segment[..pos], &segment[pos..]),
                None => (segment, ""),
            };
            if name.is_empty() {
                return Err(invalid("empty attribute name"));
            }
            steps.push(PathStep::Attribute(name.to_string()));

            while !rest.is_empty() {
                let close = rest.find(']').ok_or_else(|| invalid("unclosed index"))?;
                let index = rest[1..close]
                    .parse::<usize>()
                    .map_err(|_| invalid("index is not a number"))?;
                steps.push(PathStep::Index(index));
                rest = &rest[close + 1..];
                if !rest.is_empty() && !rest.starts_with('[') {
                    return Err(invalid("unexpected characters after index"));
                }
            }
        }

        Ok(Self { steps })
    }
}

impl fmt::Display for AttrPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                PathStep::Attribute(name) if i == 0 => write!(f, "{}", name)?,
                PathStep::Attribute(name) => write!(f, ".{}", name)?,
                PathStep::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_nested_path() {
        let path = AttrPath::root("managed_endpoints")
            .index(2)
            .attr("x509_certificate_data")
            .attr("sans");
        assert_eq!(path.to_string(), "managed_endpoints[2].x509_certificate_data.sans");
    }

    #[test]
    fn test_parse_round_trips_display() {
        let path = AttrPath::parse("options.x509.template_data").unwrap();
        assert_eq!(path, AttrPath::root("options").attr("x509").attr("template_data"));

        let indexed = AttrPath::parse("hooks.sign.before[1]").unwrap();
        assert_eq!(indexed.to_string(), "hooks.sign.before[1]");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(AttrPath::parse("").is_err());
        assert!(AttrPath::parse("a..b").is_err());
        assert!(AttrPath::parse("a[x]").is_err());
        assert!(AttrPath::parse("a[1").is_err());
    }
}

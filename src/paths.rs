//! Facilities for working with paths within schemas or validated instances.
use std::{fmt, fmt::Write};

#[derive(Clone, Debug, Eq, PartialEq, Default)]
/// JSON Pointer as a wrapper around individual path components.
pub struct JSONPointer(Vec<PathChunk>);

impl JSONPointer {
    /// JSON pointer as a vector of strings. Each component is casted to `String`. Consumes `JSONPointer`.
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        self.0
            .into_iter()
            .map(|item| match item {
                PathChunk::Name(value) => value,
                PathChunk::Index(idx) => idx.to_string(),
            })
            .collect()
    }

    /// Assemble a new pointer from this one followed by `chunks`.
    #[must_use]
    pub(crate) fn extend_with(&self, chunks: &[PathChunk]) -> Self {
        let mut result = self.0.clone();
        result.extend_from_slice(chunks);
        JSONPointer(result)
    }

    pub(crate) fn as_slice(&self) -> &[PathChunk] {
        &self.0
    }
}

impl fmt::Display for JSONPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.0.is_empty() {
            let mut buffer = itoa::Buffer::new();
            for chunk in &self.0 {
                f.write_char('/')?;
                match chunk {
                    PathChunk::Name(value) => {
                        // Escaping per RFC 6901
                        for ch in value.chars() {
                            match ch {
                                '~' => f.write_str("~0")?,
                                '/' => f.write_str("~1")?,
                                _ => f.write_char(ch)?,
                            }
                        }
                    }
                    PathChunk::Index(idx) => f.write_str(buffer.format(*idx))?,
                }
            }
        }
        Ok(())
    }
}

impl serde::Serialize for JSONPointer {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PathChunk {
    Name(String),
    Index(usize),
}

/// A zero-allocation trail of path segments, kept as a linked list on the stack
/// while the validation tree is traversed. Converted to an owned [`JSONPointer`]
/// only when an error or annotation is actually produced.
#[derive(Clone, Debug)]
pub(crate) struct InstancePath<'a> {
    pub(crate) chunk: Option<PathChunk>,
    pub(crate) parent: Option<&'a InstancePath<'a>>,
}

impl<'a> InstancePath<'a> {
    pub(crate) const fn new() -> Self {
        InstancePath {
            chunk: None,
            parent: None,
        }
    }

    #[inline]
    pub(crate) fn push(&'a self, chunk: impl Into<PathChunk>) -> Self {
        InstancePath {
            chunk: Some(chunk.into()),
            parent: Some(self),
        }
    }

    pub(crate) fn to_vec(&'a self) -> Vec<PathChunk> {
        // The path capacity should be the average depth so we avoid extra allocations
        let mut result = Vec::with_capacity(6);
        let mut current = self;
        if let Some(chunk) = &current.chunk {
            result.push(chunk.clone());
        }
        while let Some(next) = current.parent {
            current = next;
            if let Some(chunk) = &current.chunk {
                result.push(chunk.clone());
            }
        }
        result.reverse();
        result
    }
}

impl From<String> for PathChunk {
    #[inline]
    fn from(value: String) -> Self {
        PathChunk::Name(value)
    }
}

impl From<&str> for PathChunk {
    #[inline]
    fn from(value: &str) -> Self {
        PathChunk::Name(value.to_string())
    }
}

impl From<usize> for PathChunk {
    #[inline]
    fn from(value: usize) -> Self {
        PathChunk::Index(value)
    }
}

impl<'a> From<&'a InstancePath<'a>> for JSONPointer {
    #[inline]
    fn from(path: &'a InstancePath<'a>) -> Self {
        JSONPointer(path.to_vec())
    }
}

impl From<&[&str]> for JSONPointer {
    #[inline]
    fn from(path: &[&str]) -> Self {
        JSONPointer(
            path.iter()
                .map(|item| PathChunk::Name((*item).to_string()))
                .collect(),
        )
    }
}

impl From<&[PathChunk]> for JSONPointer {
    #[inline]
    fn from(path: &[PathChunk]) -> Self {
        JSONPointer(path.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let path = InstancePath::new();
        let first = path.push("foo");
        let second = first.push(0);
        assert_eq!(JSONPointer::from(&second).to_string(), "/foo/0");
    }

    #[test]
    fn empty_is_empty_string() {
        assert_eq!(JSONPointer::default().to_string(), "");
    }

    #[test]
    fn escapes_special_characters() {
        let path = InstancePath::new();
        let first = path.push("a/b~c");
        assert_eq!(JSONPointer::from(&first).to_string(), "/a~1b~0c");
    }

    #[test]
    fn extend_with() {
        let base: JSONPointer = (&["properties", "foo"][..]).into();
        let extended = base.extend_with(&[PathChunk::Name("type".to_string())]);
        assert_eq!(extended.to_string(), "/properties/foo/type");
    }
}

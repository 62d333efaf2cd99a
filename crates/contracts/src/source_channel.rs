//! SourceChannel - identity of one independent byte stream
//!
//! Uses Arc<str> internally, so the per-fragment clones made by the parser
//! only bump a reference count.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Opaque identity of a byte stream feeding the frame parser.
///
/// Partial-frame reconstruction state is keyed by this value and is never
/// shared between two different channels.
///
/// # Examples
/// ```
/// use contracts::SourceChannel;
///
/// let data: SourceChannel = "pmu-17/data".into();
/// let command = SourceChannel::new("pmu-17/command");
/// assert_ne!(data, command);
/// assert_eq!(data.as_str(), "pmu-17/data");
/// ```
#[derive(Clone, Default)]
pub struct SourceChannel(Arc<str>);

impl SourceChannel {
    /// Create a channel identity from a string slice.
    #[inline]
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    /// Get the underlying string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SourceChannel {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SourceChannel {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SourceChannel {
    #[inline]
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for SourceChannel {
    #[inline]
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for SourceChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for SourceChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceChannel({:?})", self.0)
    }
}

impl PartialEq for SourceChannel {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for SourceChannel {}

impl PartialEq<str> for SourceChannel {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for SourceChannel {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

// Must hash like `str` so `HashMap<SourceChannel, _>` can be queried with `&str`
impl Hash for SourceChannel {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl Serialize for SourceChannel {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SourceChannel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_channels_with_same_text_are_equal() {
        let a: SourceChannel = "udp:4713".into();
        let b = SourceChannel::from(String::from("udp:4713"));
        assert_eq!(a, b);
        assert_eq!(a, "udp:4713");
    }

    #[test]
    fn test_lookup_state_by_str() {
        let mut state: HashMap<SourceChannel, usize> = HashMap::new();
        state.insert("tcp:4712".into(), 14);
        assert_eq!(state.get("tcp:4712"), Some(&14));
        assert_eq!(state.get("tcp:4713"), None);
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let channel: SourceChannel = "serial:/dev/ttyS0".into();
        let json = serde_json::to_string(&channel).unwrap();
        assert_eq!(json, "\"serial:/dev/ttyS0\"");
        let parsed: SourceChannel = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, channel);
    }
}

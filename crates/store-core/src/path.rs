//! Store paths and the fixed database layout

use std::fmt;

/// A slash-separated location in the shared store
///
/// Segments may contain spaces (the deployed layout does); empty segments
/// are rejected. Paths are cheap to clone and compare.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorePath(Vec<String>);

impl StorePath {
    /// Parse a `/`-separated path string
    pub fn parse(raw: &str) -> crate::StoreResult<Self> {
        let segments: Vec<String> = raw
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();
        if segments.is_empty() {
            return Err(crate::StoreError::invalid_path(format!(
                "'{raw}' has no segments"
            )));
        }
        Ok(Self(segments))
    }

    /// Build a path from segments
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Append one segment
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// Drop the last segment, if any remain above the root
    pub fn parent(&self) -> Option<Self> {
        if self.0.len() <= 1 {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    /// The final segment
    pub fn key(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or("")
    }

    /// The path segments
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Whether `self` is `other` or an ancestor of `other`
    pub fn contains(&self, other: &StorePath) -> bool {
        other.0.len() >= self.0.len() && other.0[..self.0.len()] == self.0[..]
    }

    /// Whether a write at `written` can change the subtree at `self`
    ///
    /// True when either path is a prefix of the other: writing a descendant
    /// changes this subtree, and writing an ancestor replaces it outright.
    pub fn overlaps(&self, written: &StorePath) -> bool {
        self.contains(written) || written.contains(self)
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

/// Incident report collection path
pub fn crime_reports() -> StorePath {
    StorePath::from_segments(["civilian", "civilian crime reports"])
}

/// Account record path for one reporter
pub fn civilian_account(uid: &str) -> StorePath {
    StorePath::from_segments(["civilian", "civilian account", uid])
}

/// SOS alert collection path
pub fn sos_alerts() -> StorePath {
    StorePath::from_segments(["sos_alerts"])
}

/// Call record path for one call
pub fn voip_call(call_id: &str) -> StorePath {
    StorePath::from_segments(["voip_calls", call_id])
}

/// Offer mailbox for one call
pub fn signaling_offer(call_id: &str) -> StorePath {
    StorePath::from_segments(["signaling", call_id, "offer"])
}

/// Answer mailbox for one call
pub fn signaling_answer(call_id: &str) -> StorePath {
    StorePath::from_segments(["signaling", call_id, "answer"])
}

/// Candidate mailbox for one call and one role (`caller` / `callee`)
pub fn signaling_candidates(call_id: &str, role: &str) -> StorePath {
    StorePath::from_segments(["signaling", call_id, "iceCandidates", role])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_round() {
        let path = StorePath::parse("civilian/civilian crime reports").unwrap();
        assert_eq!(path.segments().len(), 2);
        assert_eq!(path.to_string(), "civilian/civilian crime reports");
    }

    #[test]
    fn parse_rejects_empty() {
        assert!(StorePath::parse("").is_err());
        assert!(StorePath::parse("///").is_err());
    }

    #[test]
    fn child_parent_key() {
        let calls = StorePath::parse("voip_calls").unwrap();
        let one = calls.child("c1");
        assert_eq!(one.to_string(), "voip_calls/c1");
        assert_eq!(one.key(), "c1");
        assert_eq!(one.parent().unwrap(), calls);
        assert!(calls.parent().is_none());
    }

    #[test]
    fn overlap_is_prefix_in_either_direction() {
        let watch = StorePath::parse("voip_calls/c1").unwrap();
        assert!(watch.overlaps(&StorePath::parse("voip_calls/c1/status").unwrap()));
        assert!(watch.overlaps(&StorePath::parse("voip_calls").unwrap()));
        assert!(!watch.overlaps(&StorePath::parse("voip_calls/c2").unwrap()));
        assert!(!watch.overlaps(&StorePath::parse("sos_alerts").unwrap()));
    }

    #[test]
    fn signaling_paths_match_wire_layout() {
        assert_eq!(signaling_offer("c1").to_string(), "signaling/c1/offer");
        assert_eq!(signaling_answer("c1").to_string(), "signaling/c1/answer");
        assert_eq!(
            signaling_candidates("c1", "caller").to_string(),
            "signaling/c1/iceCandidates/caller"
        );
        assert_eq!(
            signaling_candidates("c1", "callee").to_string(),
            "signaling/c1/iceCandidates/callee"
        );
    }
}

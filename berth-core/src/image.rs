//! Image summaries and image references.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::CoreError;

/// Tag the engine reports for images that carry no repository tag.
const UNTAGGED_PLACEHOLDER: &str = "<none>:<none>";

/// Tag pulled when a reference names neither a tag nor a digest.
pub const DEFAULT_TAG: &str = "latest";

/// An image as surfaced by `GET /images`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct ImageSummary {
    /// Content-addressed image id, e.g. `sha256:…`.
    pub id: String,
    /// Repository tags, without the engine's untagged placeholder.
    pub tags: Vec<String>,
    /// Image labels. Empty when the image declares none.
    pub labels: BTreeMap<String, String>,
    /// Creation time, serialized as RFC 3339.
    pub created: DateTime<Utc>,
    /// Size in bytes.
    pub size: i64,
}

impl ImageSummary {
    /// Build a summary, dropping `<none>:<none>` entries from `tags`.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        tags: impl IntoIterator<Item = String>,
        labels: BTreeMap<String, String>,
        created: DateTime<Utc>,
        size: i64,
    ) -> Self {
        Self {
            id: id.into(),
            tags: tags
                .into_iter()
                .filter(|t| t != UNTAGGED_PLACEHOLDER)
                .collect(),
            labels,
            created,
            size,
        }
    }

    /// First repository tag, if the image has one.
    #[must_use]
    pub fn primary_tag(&self) -> Option<&str> {
        self.tags.first().map(String::as_str)
    }
}

/// A parsed `repository[:tag][@digest]` image reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageReference {
    repository: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl ImageReference {
    /// Parse an image reference.
    ///
    /// A digest is split off at the last `@`. Otherwise a tag is split off
    /// at the last `:` unless what follows contains a `/`, in which case the
    /// colon belongs to a registry port (`localhost:5000/app`).
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidImageReference`] if the reference is
    /// empty, has an empty repository, or has an empty tag or digest.
    pub fn parse(reference: &str) -> Result<Self, CoreError> {
        let invalid = |reason: &str| CoreError::InvalidImageReference {
            reference: reference.to_owned(),
            reason: reason.to_owned(),
        };

        if reference.is_empty() {
            return Err(invalid("reference is empty"));
        }

        let (repository, tag, digest) = if let Some((repo, digest)) = reference.rsplit_once('@') {
            if digest.is_empty() {
                return Err(invalid("digest is empty"));
            }
            (repo, None, Some(digest))
        } else {
            match reference.rsplit_once(':') {
                Some((repo, tag)) if !tag.contains('/') => {
                    if tag.is_empty() {
                        return Err(invalid("tag is empty"));
                    }
                    (repo, Some(tag), None)
                }
                _ => (reference, None, None),
            }
        };

        if repository.is_empty() {
            return Err(invalid("repository is empty"));
        }

        Ok(Self {
            repository: repository.to_owned(),
            tag: tag.map(str::to_owned),
            digest: digest.map(str::to_owned),
        })
    }

    /// Repository part, including any registry host.
    #[must_use]
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Explicit tag, if any.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Explicit digest, if any.
    #[must_use]
    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// The tag-or-digest to request from the engine when pulling.
    ///
    /// Falls back to [`DEFAULT_TAG`] so a bare repository never pulls every
    /// tag.
    #[must_use]
    pub fn pull_tag(&self) -> &str {
        self.digest
            .as_deref()
            .or(self.tag.as_deref())
            .unwrap_or(DEFAULT_TAG)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repository)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{tag}")?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{digest}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for ImageReference {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epoch() -> DateTime<Utc> {
        match DateTime::from_timestamp(0, 0) {
            Some(t) => t,
            None => panic!("epoch must be representable"),
        }
    }

    fn parse(s: &str) -> ImageReference {
        match ImageReference::parse(s) {
            Ok(r) => r,
            Err(e) => panic!("failed to parse {s}: {e}"),
        }
    }

    #[test]
    fn image_reference_bare_repository_pulls_latest() {
        let r = parse("alpine");
        assert_eq!(r.repository(), "alpine");
        assert_eq!(r.tag(), None);
        assert_eq!(r.pull_tag(), "latest");
    }

    #[test]
    fn image_reference_explicit_tag_is_split() {
        let r = parse("alpine:3.19");
        assert_eq!(r.repository(), "alpine");
        assert_eq!(r.pull_tag(), "3.19");
    }

    #[test]
    fn image_reference_registry_port_is_not_a_tag() {
        let r = parse("localhost:5000/team/app");
        assert_eq!(r.repository(), "localhost:5000/team/app");
        assert_eq!(r.tag(), None);

        let tagged = parse("localhost:5000/team/app:v2");
        assert_eq!(tagged.repository(), "localhost:5000/team/app");
        assert_eq!(tagged.tag(), Some("v2"));
    }

    #[test]
    fn image_reference_digest_wins_over_tag() {
        let r = parse("busybox@sha256:abc123");
        assert_eq!(r.repository(), "busybox");
        assert_eq!(r.digest(), Some("sha256:abc123"));
        assert_eq!(r.pull_tag(), "sha256:abc123");
    }

    #[test]
    fn image_reference_rejects_empty_parts() {
        for bad in ["", ":latest", "alpine:", "@sha256:abc", "alpine@"] {
            assert!(
                ImageReference::parse(bad).is_err(),
                "'{bad}' must be rejected"
            );
        }
    }

    #[test]
    fn image_reference_display_restores_input() {
        for s in ["alpine", "alpine:3.19", "ghcr.io/org/app:v1", "busybox@sha256:abc"] {
            assert_eq!(parse(s).to_string(), s);
        }
    }

    #[test]
    fn image_summary_drops_untagged_placeholder() {
        let img = ImageSummary::new(
            "sha256:1",
            vec!["<none>:<none>".to_owned(), "alpine:latest".to_owned()],
            BTreeMap::new(),
            epoch(),
            42,
        );
        assert_eq!(img.tags, vec!["alpine:latest".to_owned()]);
        assert_eq!(img.primary_tag(), Some("alpine:latest"));
    }

    #[test]
    fn image_summary_serializes_created_as_rfc3339() {
        let img = ImageSummary::new(
            "sha256:1",
            Vec::new(),
            BTreeMap::new(),
            epoch(),
            0,
        );
        let json = match serde_json::to_value(&img) {
            Ok(v) => v,
            Err(e) => panic!("serialization failed: {e}"),
        };
        assert_eq!(json["created"], "1970-01-01T00:00:00Z");
        assert_eq!(json["labels"], serde_json::json!({}));
        assert_eq!(json["tags"], serde_json::json!([]));
    }

    proptest::proptest! {
        #[test]
        fn proptest_parse_never_panics(s in "\\PC{0,64}") {
            let _ = ImageReference::parse(&s);
        }

        #[test]
        fn proptest_simple_repo_tag_splits_at_last_colon(
            repo in "[a-z][a-z0-9]{0,15}(/[a-z0-9]{1,8}){0,2}",
            tag in "[A-Za-z0-9_.-]{1,16}",
        ) {
            let r = ImageReference::parse(&format!("{repo}:{tag}"))
                .map_err(|e| proptest::test_runner::TestCaseError::fail(e.to_string()))?;
            proptest::prop_assert_eq!(r.repository(), repo.as_str());
            proptest::prop_assert_eq!(r.tag(), Some(tag.as_str()));
        }
    }
}

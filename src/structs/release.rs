use semver::Version;

use super::Result;

/// Release metadata of a topology document
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Release {
    /// Release version, optionally v-prefixed semver
    #[serde(default)]
    pub version: String,
    /// RFC 3339 timestamp of the release
    #[serde(default)]
    pub released_at: String,
    /// Sha of the template set that produced the document
    #[serde(default)]
    pub template_sha: String,
    /// Where the changelog lives
    #[serde(default)]
    pub changelog_url: String,
    #[serde(default)]
    pub description: String,
}

impl Release {
    pub fn verify(&self) -> Result<()> {
        if self.version != "" {
            let vstr = self.version.trim_start_matches('v');
            Version::parse(vstr)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Release;

    #[test]
    fn release_version_verifies() {
        let mut rel = Release::default();
        assert!(rel.verify().is_ok()); // empty version allowed

        rel.version = "v1.4.0".into();
        assert!(rel.verify().is_ok());
        rel.version = "1.0.0-migrated".into();
        assert!(rel.verify().is_ok());
        rel.version = "latest".into();
        assert!(rel.verify().is_err());
    }
}

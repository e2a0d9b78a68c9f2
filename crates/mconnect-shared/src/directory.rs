//! Site directory.
//!
//! Maps the human-facing site label of a page ("Bulim", "Mandai", ...) to
//! the ordered list of communities that must all hold a copy of every
//! authorized-driver record. The first community of a site is its home
//! community.

use crate::error::SharedError;
use crate::types::CommunityId;

#[derive(Debug, Clone, PartialEq, Eq)]
struct SiteEntry {
    label: String,
    communities: Vec<CommunityId>,
}

/// Static site label -> communities configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteDirectory {
    sites: Vec<SiteEntry>,
}

impl Default for SiteDirectory {
    fn default() -> Self {
        Self::from_pairs([
            ("Bulim", &["61476", "41982"][..]),
            ("Mandai", &["50442", "57042"][..]),
            ("Sentosa", &["73932"][..]),
        ])
    }
}

impl SiteDirectory {
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a [&'a str])>,
    {
        let sites = pairs
            .into_iter()
            .map(|(label, ids)| SiteEntry {
                label: label.to_string(),
                communities: ids.iter().map(|id| CommunityId::from(*id)).collect(),
            })
            .collect();
        Self { sites }
    }

    /// Parse `Label=id,id;Label=id`.
    pub fn parse(text: &str) -> Result<Self, SharedError> {
        let mut sites = Vec::new();

        for part in text.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (label, ids) = part
                .split_once('=')
                .ok_or_else(|| SharedError::InvalidDirectory(format!("missing '=' in {part:?}")))?;

            let label = label.trim();
            if label.is_empty() {
                return Err(SharedError::InvalidDirectory(format!(
                    "empty site label in {part:?}"
                )));
            }

            let communities: Vec<CommunityId> = ids
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(CommunityId::from)
                .collect();
            if communities.is_empty() {
                return Err(SharedError::InvalidDirectory(format!(
                    "site {label:?} has no communities"
                )));
            }

            sites.push(SiteEntry {
                label: label.to_string(),
                communities,
            });
        }

        if sites.is_empty() {
            return Err(SharedError::InvalidDirectory("no sites configured".into()));
        }
        Ok(Self { sites })
    }

    /// Ordered communities of a site. Empty when the label is not configured.
    pub fn resolve_partitions(&self, site_label: &str) -> Vec<CommunityId> {
        let label = site_label.trim();
        self.sites
            .iter()
            .find(|site| site.label == label)
            .map(|site| site.communities.clone())
            .unwrap_or_default()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.sites.iter().map(|site| site.label.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sites_resolve_in_order() {
        let dir = SiteDirectory::default();
        assert_eq!(
            dir.resolve_partitions("Bulim"),
            vec![CommunityId::from("61476"), CommunityId::from("41982")]
        );
        assert_eq!(dir.resolve_partitions("Sentosa").len(), 1);
        for label in dir.labels() {
            assert!(!dir.resolve_partitions(label).is_empty());
        }
    }

    #[test]
    fn test_unknown_site_is_empty() {
        let dir = SiteDirectory::default();
        assert!(dir.resolve_partitions("Jurong").is_empty());
        assert!(dir.resolve_partitions("").is_empty());
        assert!(dir.resolve_partitions("bulim").is_empty());
    }

    #[test]
    fn test_parse_override() {
        let dir = SiteDirectory::parse("Alpha=1, 2 ; Beta=3").unwrap();
        assert_eq!(
            dir.resolve_partitions("Alpha"),
            vec![CommunityId::from("1"), CommunityId::from("2")]
        );
        assert_eq!(dir.resolve_partitions("Beta"), vec![CommunityId::from("3")]);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(SiteDirectory::parse("").is_err());
        assert!(SiteDirectory::parse("Alpha").is_err());
        assert!(SiteDirectory::parse("Alpha=").is_err());
        assert!(SiteDirectory::parse("=1,2").is_err());
    }
}

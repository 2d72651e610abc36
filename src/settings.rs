//! Functions for loading storage settings.

use crate::errors::*;

/// The largest number of sparse pages a set may address.
pub const MAX_SPARSE_PAGES: usize = 1024;

/// Sizing parameters of a `SparseSet`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SparseSetSettings {
    /// Number of dense slots allocated up front.
    pub initial_capacity: usize,
    /// Number of keys covered by a single sparse page.
    pub indices_per_page: usize,
    /// Upper bound of sparse pages, `max_pages * indices_per_page` keys are addressable.
    pub max_pages: usize,
}

impl Default for SparseSetSettings {
    fn default() -> Self {
        SparseSetSettings {
            initial_capacity: 16,
            indices_per_page: 1024,
            max_pages: MAX_SPARSE_PAGES,
        }
    }
}

impl SparseSetSettings {
    /// Checks that the page layout is usable.
    pub fn validate(&self) -> Result<()> {
        if self.indices_per_page == 0 {
            return Err(Error::Malformed("indices_per_page must be positive".into()));
        }

        if self.max_pages == 0 || self.max_pages > MAX_SPARSE_PAGES {
            return Err(Error::Malformed(format!(
                "max_pages must be within 1..={}, got {}",
                MAX_SPARSE_PAGES, self.max_pages
            )));
        }

        Ok(())
    }

    /// Returns the number of keys these settings can address.
    #[inline]
    pub fn key_limit(&self) -> u64 {
        self.indices_per_page as u64 * self.max_pages as u64
    }
}

/// A structure containing the storage configuration shared by scenes and asset
/// libraries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Layout of the per-scene entity set.
    pub entities: SparseSetSettings,
    /// Layout of every per-type component set.
    pub components: SparseSetSettings,
    /// Layout of the payload set of each asset registry.
    pub assets: SparseSetSettings,
}

impl Settings {
    /// Parses settings from a JSON document. Missing fields keep their defaults.
    pub fn from_json<T: AsRef<str>>(json: T) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json.as_ref())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validates every nested layout.
    pub fn validate(&self) -> Result<()> {
        self.entities.validate()?;
        self.components.validate()?;
        self.assets.validate()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert_eq!(settings.entities.indices_per_page, 1024);
        assert_eq!(settings.entities.key_limit(), 1024 * 1024);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn partial_json() {
        let settings =
            Settings::from_json(r#"{ "components": { "indices_per_page": 64 } }"#).unwrap();

        assert_eq!(settings.components.indices_per_page, 64);
        assert_eq!(settings.components.initial_capacity, 16);
        assert_eq!(settings.entities, SparseSetSettings::default());
    }

    #[test]
    fn malformed() {
        assert!(Settings::from_json("{ not json").is_err());
        assert!(Settings::from_json(r#"{ "assets": { "max_pages": 4096 } }"#).is_err());
        assert!(Settings::from_json(r#"{ "assets": { "indices_per_page": 0 } }"#).is_err());
    }
}

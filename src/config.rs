//! Runtime configuration: backend location and the well-known sheet names.

use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Names of the sheets the toolkit treats specially.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetNames {
    /// Primary roster
    pub roster: String,
    /// Archived plays
    pub archive: String,
    /// Extras registry
    pub extras: String,
    /// People without a current assignment
    pub holding: String,
    /// Notification log
    pub notifications: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        SheetNames {
            roster: "BÜTÜN OYUNLAR".to_string(),
            archive: "ARŞİV OYUNLAR".to_string(),
            extras: "FİGÜRAN LİSTESİ".to_string(),
            holding: "GÖREVLİ OLMAYAN".to_string(),
            notifications: "BİLDİRİMLER".to_string(),
        }
    }
}

impl SheetNames {
    /// Sheets listed for editing even before they exist upstream.
    pub fn pinned(&self) -> Vec<String> {
        vec![self.holding.clone(), self.archive.clone()]
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the sheet API, without the `/api` suffix
    pub base_url: String,
    pub timeout_secs: u64,
    pub sheets: SheetNames,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            sheets: SheetNames::default(),
        }
    }
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Full URL for an API path such as `sheets` or `archive-play`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sheet_names() {
        let names = SheetNames::default();
        assert_eq!(names.roster, "BÜTÜN OYUNLAR");
        assert_eq!(names.pinned(), vec!["GÖREVLİ OLMAYAN", "ARŞİV OYUNLAR"]);
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let config = Config {
            base_url: "http://example.test/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.endpoint("sheets"), "http://example.test/api/sheets");
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }
}

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use rand::Rng;
use rand::seq::SliceRandom;
use spdm_types::ShopItemConfig;
use tracing::{debug, warn};

use crate::config::ConfigError;

/// Redeemable keys per shop item, read from plain text files (one key per line).
///
/// Keys are handed out at random and not removed, matching how the key files
/// are shared between all buyers.
#[derive(Debug, Clone, Default)]
pub struct KeyPool {
    keys: HashMap<String, Vec<String>>,
}

impl KeyPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every item's key file from `dir`. A missing file leaves the item
    /// without keys; any other read error fails the load.
    pub fn load_dir(dir: &Path, items: &[ShopItemConfig]) -> Result<Self, ConfigError> {
        let mut pool = Self::new();
        for item in items {
            let path = dir.join(&item.key_file);
            match fs::read_to_string(&path) {
                Ok(contents) => {
                    pool.insert(&item.id, parse_keys(&contents));
                    debug!(item = %item.id, keys = pool.available(&item.id), "loaded key file");
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    warn!(item = %item.id, path = %path.display(), "key file missing");
                }
                Err(e) => return Err(ConfigError::Io { path, source: e }),
            }
        }
        Ok(pool)
    }

    pub fn insert(&mut self, item_id: &str, keys: Vec<String>) {
        self.keys.insert(item_id.to_string(), keys);
    }

    pub fn available(&self, item_id: &str) -> usize {
        self.keys.get(item_id).map_or(0, Vec::len)
    }

    pub fn pick<R: Rng + ?Sized>(&self, item_id: &str, rng: &mut R) -> Option<&str> {
        self.keys
            .get(item_id)?
            .choose(rng)
            .map(String::as_str)
    }
}

/// Non-empty trimmed lines
pub fn parse_keys(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use spdm_types::ShopConfig;

    #[test]
    fn test_parse_skips_blank_lines() {
        let keys = parse_keys("AAAA-1111\n\n  BBBB-2222  \r\n\n");
        assert_eq!(keys, vec!["AAAA-1111", "BBBB-2222"]);
    }

    #[test]
    fn test_load_dir_with_missing_files() {
        let dir = std::env::temp_dir().join(format!("spdm-keys-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("1day.txt"), "DAY-1\nDAY-2\n").unwrap();

        let items = ShopConfig::default().items;
        let pool = KeyPool::load_dir(&dir, &items).unwrap();
        assert_eq!(pool.available("key_1day"), 2);
        assert_eq!(pool.available("key_1year"), 0);

        let mut rng = StdRng::seed_from_u64(3);
        let key = pool.pick("key_1day", &mut rng).unwrap();
        assert!(key.starts_with("DAY-"));
        assert!(pool.pick("key_7days", &mut rng).is_none());

        fs::remove_dir_all(&dir).unwrap();
    }
}

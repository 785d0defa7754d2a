use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

/// Username to mail address table, loaded from `user,address` lines.
#[derive(Debug, Clone, Default)]
pub struct AddressBook {
    entries: HashMap<String, String>,
}

impl AddressBook {
    /// Loads the table from disk. An unreadable file yields an empty book so
    /// every user falls back to local delivery.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let book = Self::parse(&contents);
                debug!(path = %path.display(), entries = book.len(), "loaded address book");
                book
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "address book unavailable, using local delivery for all users"
                );
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Self {
        let mut entries = HashMap::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((user, address)) = line.split_once(',') else {
                continue;
            };
            let (user, address) = (user.trim(), address.trim());
            if user.is_empty() || address.is_empty() {
                continue;
            }
            // First match wins.
            entries
                .entry(user.to_string())
                .or_insert_with(|| address.to_string());
        }
        Self { entries }
    }

    pub fn lookup(&self, user: &str) -> Option<&str> {
        self.entries.get(user).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

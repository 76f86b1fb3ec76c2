//! Smart-match memory
//!
//! Remembers raw name fragments a user has confirmed to mean a canonical
//! series or movie name, so later files with the same fragment resolve
//! without asking again.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Database;
use super::results::OrganizerType;
use crate::services::text_utils::normalize_for_comparison;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartMatchEntry {
    pub id: Uuid,
    pub canonical_name: String,
    pub organizer_type: OrganizerType,
    pub match_strings: Vec<String>,
    pub target_folder: Option<PathBuf>,
    pub is_user_defined: bool,
}

/// Repository for smart-match entries
pub struct SmartMatchRepository<'a> {
    db: &'a Database,
}

impl<'a> SmartMatchRepository<'a> {
    pub(super) fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn get(&self, id: Uuid) -> Option<SmartMatchEntry> {
        self.db.read(|state| state.smart_matches.get(&id).cloned())
    }

    /// All entries, optionally limited to one organizer type, sorted by name
    pub fn list(&self, organizer_type: Option<OrganizerType>) -> Vec<SmartMatchEntry> {
        let mut entries: Vec<SmartMatchEntry> = self.db.read(|state| {
            state
                .smart_matches
                .values()
                .filter(|e| organizer_type.is_none_or(|t| e.organizer_type == t))
                .cloned()
                .collect()
        });
        entries.sort_by(|a, b| a.canonical_name.cmp(&b.canonical_name));
        entries
    }

    /// Find the entry for a canonical name (normalized comparison)
    pub fn find_by_name(
        &self,
        canonical_name: &str,
        organizer_type: OrganizerType,
    ) -> Option<SmartMatchEntry> {
        let wanted = normalize_for_comparison(canonical_name);
        self.list(Some(organizer_type))
            .into_iter()
            .find(|e| normalize_for_comparison(&e.canonical_name) == wanted)
    }

    pub async fn save(&self, entry: &SmartMatchEntry) -> Result<()> {
        self.db
            .mutate(|state| {
                state.smart_matches.insert(entry.id, entry.clone());
            })
            .await
    }

    /// Create the entry for `canonical_name`, or add `match_string` to it.
    ///
    /// Match strings are kept unique by their normalized form.
    pub async fn remember(
        &self,
        canonical_name: &str,
        organizer_type: OrganizerType,
        match_string: &str,
        target_folder: Option<PathBuf>,
    ) -> Result<SmartMatchEntry> {
        let mut entry = self
            .find_by_name(canonical_name, organizer_type)
            .unwrap_or_else(|| SmartMatchEntry {
                id: Uuid::new_v4(),
                canonical_name: canonical_name.to_string(),
                organizer_type,
                match_strings: Vec::new(),
                target_folder: None,
                is_user_defined: true,
            });

        let normalized = normalize_for_comparison(match_string);
        if !normalized.is_empty()
            && !entry
                .match_strings
                .iter()
                .any(|s| normalize_for_comparison(s) == normalized)
        {
            entry.match_strings.push(match_string.to_string());
        }
        if target_folder.is_some() {
            entry.target_folder = target_folder;
        }

        self.save(&entry).await?;
        Ok(entry)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut removed = false;
        self.db
            .mutate(|state| removed = state.smart_matches.remove(&id).is_some())
            .await?;
        Ok(removed)
    }

    /// Remove one match string; the entry goes away with its last string
    pub async fn delete_match_string(&self, id: Uuid, match_string: &str) -> Result<()> {
        self.db
            .mutate(|state| {
                let now_empty = match state.smart_matches.get_mut(&id) {
                    Some(entry) => {
                        entry.match_strings.retain(|s| s != match_string);
                        entry.match_strings.is_empty()
                    }
                    None => false,
                };
                if now_empty {
                    state.smart_matches.remove(&id);
                }
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_remember_extends_existing_entry() {
        let db = Database::in_memory();
        let repo = db.smart_matches();

        let first = repo
            .remember("Doctor Who", OrganizerType::Episode, "Dr Who", None)
            .await
            .unwrap();
        let second = repo
            .remember("doctor who", OrganizerType::Episode, "DoctorWho 2005", None)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.match_strings, vec!["Dr Who", "DoctorWho 2005"]);

        // Same fragment written differently is not duplicated
        let third = repo
            .remember("Doctor Who", OrganizerType::Episode, "dr.who", None)
            .await
            .unwrap();
        assert_eq!(third.match_strings.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_last_match_string_removes_entry() {
        let db = Database::in_memory();
        let repo = db.smart_matches();
        let entry = repo
            .remember("Alien", OrganizerType::Movie, "Alien Directors", None)
            .await
            .unwrap();

        repo.delete_match_string(entry.id, "Alien Directors")
            .await
            .unwrap();
        assert!(repo.get(entry.id).is_none());
    }

    #[tokio::test]
    async fn test_list_filters_by_type() {
        let db = Database::in_memory();
        let repo = db.smart_matches();
        repo.remember("Alien", OrganizerType::Movie, "alien", None)
            .await
            .unwrap();
        repo.remember("Lost", OrganizerType::Episode, "lost", None)
            .await
            .unwrap();

        assert_eq!(repo.list(Some(OrganizerType::Movie)).len(), 1);
        assert_eq!(repo.list(None).len(), 2);
    }
}

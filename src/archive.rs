use chrono::Local;
use uuid::Uuid;

use crate::models::StoredSong;

/// How a stored-song filter query is matched against record user ids.
/// The caller picks the rule at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserIdMatch {
    /// Case-insensitive equality on the whole user id.
    ExactIgnoreCase,
    /// Case-sensitive substring containment.
    #[default]
    Substring,
}

impl UserIdMatch {
    pub fn matches(&self, user_id: &str, query: &str) -> bool {
        match self {
            UserIdMatch::ExactIgnoreCase => user_id.to_lowercase() == query.to_lowercase(),
            UserIdMatch::Substring => user_id.contains(query),
        }
    }
}

/// Admin archive of stored-song records. Append-only; repeated
/// (user, name) pairs are distinct storage events.
#[derive(Debug, Default)]
pub struct SongArchive {
    records: Vec<StoredSong>,
    match_rule: UserIdMatch,
}

impl SongArchive {
    pub fn new(match_rule: UserIdMatch) -> Self {
        Self {
            records: Vec::new(),
            match_rule,
        }
    }

    /// Records a storage event stamped with the current local time.
    /// Blank user id or name is rejected without touching the archive.
    pub fn store(&mut self, user_id: &str, name: &str) -> bool {
        let user_id = user_id.trim();
        let name = name.trim();
        if user_id.is_empty() || name.is_empty() {
            return false;
        }

        self.records.push(StoredSong {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            artist: None,
            duration_secs: None,
            stored_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        });

        true
    }

    /// Replaces the archive contents, e.g. with records fetched remotely.
    pub fn set_records(&mut self, records: Vec<StoredSong>) {
        self.records = records;
    }

    /// Read-only view of the records whose user id matches `query`.
    /// The empty query means "no filter" and returns everything in
    /// insertion order.
    pub fn filter(&self, query: &str) -> Vec<&StoredSong> {
        if query.is_empty() {
            return self.records.iter().collect();
        }

        self.records
            .iter()
            .filter(|r| self.match_rule.matches(&r.user_id, query))
            .collect()
    }

    pub fn records(&self) -> &[StoredSong] {
        &self.records
    }

    pub fn match_rule(&self) -> UserIdMatch {
        self.match_rule
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_appends_with_timestamp() {
        let mut archive = SongArchive::new(UserIdMatch::Substring);

        assert!(archive.store("u1", "Imagine"));
        assert_eq!(archive.records().len(), 1);

        let record = &archive.records()[0];
        assert_eq!(record.user_id, "u1");
        assert_eq!(record.name, "Imagine");
        assert!(!record.stored_at.is_empty());
    }

    #[test]
    fn test_store_rejects_blank_input() {
        let mut archive = SongArchive::new(UserIdMatch::Substring);

        assert!(!archive.store("", "Imagine"));
        assert!(!archive.store("u1", "   "));
        assert!(!archive.store("  ", ""));
        assert!(archive.records().is_empty());
    }

    #[test]
    fn test_store_allows_repeated_pairs() {
        let mut archive = SongArchive::new(UserIdMatch::Substring);

        assert!(archive.store("u1", "Imagine"));
        assert!(archive.store("u1", "Imagine"));
        assert_eq!(archive.records().len(), 2);
    }

    #[test]
    fn test_empty_query_returns_all_in_order() {
        let mut archive = SongArchive::new(UserIdMatch::Substring);
        archive.store("u1", "A");
        archive.store("u2", "B");
        archive.store("u1", "C");

        let all = archive.filter("");
        let names: Vec<&str> = all.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_filter_by_user_id() {
        let mut archive = SongArchive::new(UserIdMatch::Substring);
        archive.store("u1", "A");
        archive.store("u2", "B");

        let matched = archive.filter("u1");
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "A");
    }

    #[test]
    fn test_substring_rule_is_case_sensitive_containment() {
        let rule = UserIdMatch::Substring;

        assert!(rule.matches("user-123", "123"));
        assert!(rule.matches("user-123", "user"));
        assert!(!rule.matches("user-123", "USER"));
    }

    #[test]
    fn test_exact_rule_ignores_case() {
        let rule = UserIdMatch::ExactIgnoreCase;

        assert!(rule.matches("User-123", "user-123"));
        assert!(!rule.matches("user-123", "user"));
    }

    #[test]
    fn test_filter_is_idempotent() {
        let mut archive = SongArchive::new(UserIdMatch::Substring);
        archive.store("u1", "A");
        archive.store("u12", "B");
        archive.store("u2", "C");

        let once: Vec<StoredSong> = archive.filter("u1").into_iter().cloned().collect();

        let mut refiltered = SongArchive::new(UserIdMatch::Substring);
        refiltered.set_records(once.clone());
        let twice: Vec<StoredSong> = refiltered.filter("u1").into_iter().cloned().collect();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_filter_does_not_mutate_records() {
        let mut archive = SongArchive::new(UserIdMatch::ExactIgnoreCase);
        archive.store("u1", "A");
        archive.store("u2", "B");

        archive.filter("u1");
        assert_eq!(archive.records().len(), 2);
    }
}

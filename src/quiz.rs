//! Daily quiz: one shared question per calendar day, one answer per user.
//!
//! The question rotates by days-since-epoch, so both clients agree on the
//! question without coordination. Answers are keyed by user and a
//! locale-stable date string, which makes every day's answers distinct keys
//! that never collide with older ones.

use chrono::{Local, Utc};

use crate::keys;
use crate::store::LocalStore;
use crate::sync::CloudSync;

pub struct DailyQuiz {
    questions: Vec<String>,
}

impl DailyQuiz {
    pub fn new(questions: Vec<String>) -> Self {
        Self { questions }
    }

    /// Days since the Unix epoch, the rotation index both clients derive
    /// independently.
    pub fn day_index_now() -> i64 {
        Utc::now().timestamp_millis() / 86_400_000
    }

    /// Date component of today's answer keys, e.g. `Fri Oct 27 2023`.
    pub fn date_string_today() -> String {
        Local::now().format("%a %b %d %Y").to_string()
    }

    pub fn question_for(&self, day_index: i64) -> Option<&str> {
        if self.questions.is_empty() {
            return None;
        }
        let index = day_index.rem_euclid(self.questions.len() as i64) as usize;
        Some(&self.questions[index])
    }

    pub fn todays_question(&self) -> Option<&str> {
        self.question_for(Self::day_index_now())
    }

    pub fn answer_key(user: &str, date_string: &str) -> String {
        keys::quiz_answer_key(user, date_string)
    }

    pub fn todays_answer_key(user: &str) -> String {
        Self::answer_key(user, &Self::date_string_today())
    }

    pub fn load_answer(store: &LocalStore, user: &str) -> String {
        store.read(&Self::todays_answer_key(user)).unwrap_or_default()
    }

    /// Save as the user types: local write plus immediate push (answers are
    /// short; no debounce needed).
    pub fn save_answer(store: &mut LocalStore, sync: &mut CloudSync, user: &str, answer: &str) {
        let key = Self::todays_answer_key(user);
        sync.push(store, &key, answer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeRemote;
    use std::time::Duration;

    fn quiz() -> DailyQuiz {
        DailyQuiz::new(vec![
            "Frage eins".to_string(),
            "Frage zwei".to_string(),
            "Frage drei".to_string(),
        ])
    }

    #[test]
    fn test_rotation_wraps_by_day() {
        let quiz = quiz();
        assert_eq!(quiz.question_for(0), Some("Frage eins"));
        assert_eq!(quiz.question_for(1), Some("Frage zwei"));
        assert_eq!(quiz.question_for(3), Some("Frage eins"));
        assert_eq!(quiz.question_for(20_000), quiz.question_for(20_003));
    }

    #[test]
    fn test_empty_question_list() {
        let quiz = DailyQuiz::new(Vec::new());
        assert_eq!(quiz.question_for(5), None);
        assert_eq!(quiz.todays_question(), None);
    }

    #[test]
    fn test_same_day_same_question() {
        let quiz = quiz();
        assert_eq!(quiz.todays_question(), quiz.question_for(DailyQuiz::day_index_now()));
    }

    #[test]
    fn test_answer_round_trip() {
        let remote = FakeRemote::default();
        let mut sync = CloudSync::new(Box::new(remote.clone()), Duration::from_secs(15));
        let mut store = LocalStore::in_memory();

        DailyQuiz::save_answer(&mut store, &mut sync, "jovelyn", "Am Meer");
        assert_eq!(DailyQuiz::load_answer(&store, "jovelyn"), "Am Meer");

        // Pushed under today's dated key
        let (key, value) = remote.puts().pop().unwrap();
        assert!(key.starts_with("quiz_answer_jovelyn_"));
        assert_eq!(value, "Am Meer");
    }
}

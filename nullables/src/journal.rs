//! A shared, ordered log of lifecycle calls across nullable collaborators.

use std::sync::Arc;

use parking_lot::Mutex;

type Condition = Box<dyn Fn() -> bool + Send>;

#[derive(Default)]
struct Entries {
    recorded: Vec<String>,
    watches: Vec<(String, Condition)>,
}

/// Cloning shares the log. Watches cover state the nullables do not own:
/// a watched label is recorded just before the first entry made after its
/// condition turns true.
#[derive(Clone, Default)]
pub struct CallJournal {
    entries: Arc<Mutex<Entries>>,
}

impl CallJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: &str) {
        let mut entries = self.entries.lock();
        let Entries { recorded, watches } = &mut *entries;
        watches.retain(|(label, condition)| {
            if condition() {
                recorded.push(label.clone());
                false
            } else {
                true
            }
        });
        recorded.push(entry.to_string());
    }

    pub fn watch(&self, label: &str, condition: impl Fn() -> bool + Send + 'static) {
        self.entries
            .lock()
            .watches
            .push((label.to_string(), Box::new(condition)));
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().recorded.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn clones_share_one_log() {
        let journal = CallJournal::new();
        let other = journal.clone();
        journal.record("a");
        other.record("b");
        assert_eq!(journal.entries(), vec!["a", "b"]);
    }

    #[test]
    fn watch_lands_before_the_next_entry_once() {
        let journal = CallJournal::new();
        let flag = Arc::new(AtomicBool::new(false));
        let seen = flag.clone();
        journal.watch("flag raised", move || seen.load(Ordering::Acquire));

        journal.record("first");
        flag.store(true, Ordering::Release);
        journal.record("second");
        journal.record("third");
        assert_eq!(journal.entries(), vec!["first", "flag raised", "second", "third"]);
    }
}

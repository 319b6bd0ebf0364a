/// Back/forward history of search terms. The current entry is the
/// location the controller searches for once it is ready.
#[derive(Debug, Default)]
pub struct Navigator {
    history: Vec<String>,
    cursor: Option<usize>,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&str> {
        self.cursor.map(|i| self.history[i].as_str())
    }

    /// Push a new location, dropping any forward history. Returns false if
    /// `term` already is the current location.
    pub fn navigate(&mut self, term: &str) -> bool {
        if self.current() == Some(term) {
            return false;
        }
        if let Some(i) = self.cursor {
            self.history.truncate(i + 1);
        }
        self.history.push(term.to_string());
        self.cursor = Some(self.history.len() - 1);
        true
    }

    pub fn back(&mut self) -> Option<&str> {
        match self.cursor {
            Some(i) if i > 0 => {
                self.cursor = Some(i - 1);
                self.current()
            }
            _ => None,
        }
    }

    pub fn forward(&mut self) -> Option<&str> {
        match self.cursor {
            Some(i) if i + 1 < self.history.len() => {
                self.cursor = Some(i + 1);
                self.current()
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_back_and_forward() {
        let mut nav = Navigator::new();
        assert_eq!(nav.current(), None);
        assert_eq!(nav.back(), None);

        assert!(nav.navigate("Hund"));
        assert!(nav.navigate("Katze"));
        assert!(!nav.navigate("Katze"));
        assert!(nav.navigate("Maus"));

        assert_eq!(nav.back(), Some("Katze"));
        assert_eq!(nav.back(), Some("Hund"));
        assert_eq!(nav.back(), None);
        assert_eq!(nav.forward(), Some("Katze"));
        assert_eq!(nav.current(), Some("Katze"));
    }

    #[test]
    fn test_navigate_drops_forward_history() {
        let mut nav = Navigator::new();
        nav.navigate("Hund");
        nav.navigate("Katze");
        nav.back();
        nav.navigate("Vogel");

        assert_eq!(nav.forward(), None);
        assert_eq!(nav.back(), Some("Hund"));
        assert_eq!(nav.forward(), Some("Vogel"));
    }
}

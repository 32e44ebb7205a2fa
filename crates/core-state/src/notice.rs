use std::time::{Duration, Instant};

/// How long a notice stays on the status line.
pub const NOTICE_TTL: Duration = Duration::from_secs(4);

/// Short-lived status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub expires_at: Instant,
}

#[derive(Debug, Default)]
pub struct NoticeBoard {
    current: Option<Notice>,
}

impl NoticeBoard {
    pub fn set<S: Into<String>>(&mut self, text: S, ttl: Duration) {
        self.current = Some(Notice {
            text: text.into(),
            expires_at: Instant::now() + ttl,
        });
    }

    pub fn text(&self) -> Option<&str> {
        self.current.as_ref().map(|n| n.text.as_str())
    }

    /// Returns true if the notice expired and was cleared.
    pub fn tick(&mut self) -> bool {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> bool {
        if let Some(n) = &self.current
            && now >= n.expires_at
        {
            self.current = None;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notice_expires_after_ttl() {
        let mut board = NoticeBoard::default();
        board.set("saved", Duration::from_millis(50));
        assert_eq!(board.text(), Some("saved"));
        assert!(!board.tick_at(Instant::now()));
        assert!(board.tick_at(Instant::now() + Duration::from_secs(1)));
        assert_eq!(board.text(), None);
        assert!(!board.tick());
    }
}

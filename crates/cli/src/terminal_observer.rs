use std::io::Write;

use face_overlay_core::session::session_observer::{LogSessionObserver, SessionObserver};

/// Prints status lines and count changes for the user, and keeps the
/// session timing summary in the log.
pub struct TerminalObserver<W: Write + Send> {
    out: W,
    last_count: Option<usize>,
    stats: LogSessionObserver,
}

impl<W: Write + Send> TerminalObserver<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last_count: None,
            stats: LogSessionObserver::new(),
        }
    }

    fn print(&mut self, line: &str) {
        if writeln!(self.out, "{line}").and_then(|_| self.out.flush()).is_err() {
            log::debug!("Dropped terminal output: {line}");
        }
    }
}

impl<W: Write + Send> SessionObserver for TerminalObserver<W> {
    fn status(&mut self, message: &str) {
        log::debug!("status: {message}");
        self.print(message);
    }

    /// Only changes are printed; the loop reports every pass.
    fn count(&mut self, faces: usize) {
        self.stats.count(faces);
        if self.last_count != Some(faces) {
            self.last_count = Some(faces);
            self.print(&format!("Faces detected: {faces}"));
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.stats.timing(stage, duration_ms);
    }

    fn pass_completed(&mut self) {
        self.stats.pass_completed();
    }

    fn session_started(&mut self) {
        self.stats.session_started();
        self.last_count = None;
    }

    fn summary(&self) {
        self.stats.summary();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(observer: &TerminalObserver<Vec<u8>>) -> Vec<String> {
        String::from_utf8(observer.out.clone())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_status_is_printed() {
        let mut observer = TerminalObserver::new(Vec::new());

        observer.status("Loading face detection model...");

        assert_eq!(output(&observer), vec!["Loading face detection model..."]);
    }

    #[test]
    fn test_only_count_changes_are_printed() {
        let mut observer = TerminalObserver::new(Vec::new());

        for faces in [0, 2, 2, 2, 1, 1, 0] {
            observer.count(faces);
        }

        assert_eq!(
            output(&observer),
            vec![
                "Faces detected: 0",
                "Faces detected: 2",
                "Faces detected: 1",
                "Faces detected: 0",
            ]
        );
    }

    #[test]
    fn test_new_session_prints_count_again() {
        let mut observer = TerminalObserver::new(Vec::new());
        observer.count(0);

        observer.session_started();
        observer.count(0);

        assert_eq!(output(&observer).len(), 2);
    }
}

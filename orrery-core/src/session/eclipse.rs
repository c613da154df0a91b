//! Eclipse search as a cancellable session.

use orrery_types::{Eclipse, EclipseKind, EngineError, SearchRange};

use super::{CancellationToken, Interrupt, SessionWork};

/// Engine-side search backend. Created on the engine thread, then owned
/// by the session, so it must not refer back to engine state.
pub trait EclipseFinder: Send {
    /// Eclipses starting in `[from_jd, to_jd)`.
    fn scan(&mut self, from_jd: f64, to_jd: f64, kinds: EclipseKind) -> Result<Vec<Eclipse>, EngineError>;

    fn release(&mut self) {}
}

/// Scans a range window by window, checking for abort between windows.
pub struct EclipseSearch {
    finder: Box<dyn EclipseFinder>,
    step_days: f64,
}

impl EclipseSearch {
    pub fn new(finder: Box<dyn EclipseFinder>, step_days: f64) -> Self {
        let step_days = if step_days.is_finite() && step_days > 0.0 {
            step_days
        } else {
            1.0
        };
        Self { finder, step_days }
    }
}

impl SessionWork for EclipseSearch {
    type Input = SearchRange;
    type Item = Eclipse;
    type Error = EngineError;

    fn compute(
        &mut self,
        range: SearchRange,
        token: &CancellationToken,
    ) -> Result<Vec<Eclipse>, Interrupt<EngineError>> {
        let mut found = Vec::new();
        if range.is_empty() {
            return Ok(found);
        }

        let mut from = range.start_jd;
        let mut windows = 0u64;
        while from < range.end_jd {
            token.checkpoint()?;
            let to = (from + self.step_days).min(range.end_jd);
            let batch = self
                .finder
                .scan(from, to, range.kinds)
                .map_err(Interrupt::Failed)?;
            found.extend(batch);
            from = to;
            windows += 1;
        }

        found.sort_by(|a, b| a.start_jd.total_cmp(&b.start_jd));
        log::debug!(target: "session", "scanned {} windows, {} eclipses", windows, found.len());
        Ok(found)
    }

    fn release(&mut self) {
        self.finder.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::session::{CancellableSession, SessionOutcome};

    /// One solar eclipse every 10 days starting at JD 5, reported in
    /// reverse order within each window.
    struct Periodic {
        windows: Arc<AtomicUsize>,
        released: Arc<AtomicBool>,
        fail_after: Option<usize>,
    }

    impl EclipseFinder for Periodic {
        fn scan(&mut self, from_jd: f64, to_jd: f64, kinds: EclipseKind) -> Result<Vec<Eclipse>, EngineError> {
            let n = self.windows.fetch_add(1, Ordering::SeqCst);
            if Some(n) == self.fail_after {
                return Err(EngineError::Search("ephemeris gap".into()));
            }
            let mut out = Vec::new();
            if !kinds.contains(EclipseKind::SOLAR) {
                return Ok(out);
            }
            let mut jd = 5.0;
            while jd < to_jd {
                if jd >= from_jd {
                    out.push(Eclipse {
                        kind: EclipseKind::SOLAR,
                        occulter: "Moon".into(),
                        receiver: "Earth".into(),
                        start_jd: jd,
                        end_jd: jd + 0.1,
                    });
                }
                jd += 10.0;
            }
            out.reverse();
            Ok(out)
        }

        fn release(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    fn periodic(fail_after: Option<usize>) -> (Box<Periodic>, Arc<AtomicUsize>, Arc<AtomicBool>) {
        let windows = Arc::new(AtomicUsize::new(0));
        let released = Arc::new(AtomicBool::new(false));
        let finder = Box::new(Periodic {
            windows: Arc::clone(&windows),
            released: Arc::clone(&released),
            fail_after,
        });
        (finder, windows, released)
    }

    #[test]
    fn test_search_is_windowed_and_sorted() {
        let (finder, windows, released) = periodic(None);
        let search = EclipseSearch::new(finder, 30.0);
        let session = CancellableSession::run(search, SearchRange::new(0.0, 100.0, EclipseKind::ALL)).unwrap();

        let outcome = session.finish().unwrap();
        let SessionOutcome::Completed(found) = outcome else {
            panic!("expected the search to complete");
        };
        let starts: Vec<f64> = found.iter().map(|e| e.start_jd).collect();
        assert_eq!(starts, vec![5.0, 15.0, 25.0, 35.0, 45.0, 55.0, 65.0, 75.0, 85.0, 95.0]);
        assert_eq!(windows.load(Ordering::SeqCst), 4);
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn test_kind_filter_and_empty_range() {
        let (finder, windows, _) = periodic(None);
        let session =
            CancellableSession::run(EclipseSearch::new(finder, 1.0), SearchRange::new(0.0, 20.0, EclipseKind::LUNAR))
                .unwrap();
        assert_eq!(session.finish(), Some(SessionOutcome::Completed(vec![])));
        assert_eq!(windows.load(Ordering::SeqCst), 20);

        let (finder, windows, _) = periodic(None);
        let session =
            CancellableSession::run(EclipseSearch::new(finder, 1.0), SearchRange::new(20.0, 0.0, EclipseKind::ALL))
                .unwrap();
        assert_eq!(session.finish(), Some(SessionOutcome::Completed(vec![])));
        assert_eq!(windows.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_finder_error_fails_search() {
        let (finder, _, released) = periodic(Some(2));
        let session =
            CancellableSession::run(EclipseSearch::new(finder, 1.0), SearchRange::new(0.0, 10.0, EclipseKind::ALL))
                .unwrap();
        assert_eq!(
            session.finish(),
            Some(SessionOutcome::Failed(EngineError::Search("ephemeris gap".into())))
        );
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn test_invalid_step_falls_back_to_one_day() {
        let (finder, windows, _) = periodic(None);
        let search = EclipseSearch::new(finder, f64::NAN);
        let session = CancellableSession::run(search, SearchRange::new(0.0, 3.0, EclipseKind::ALL)).unwrap();
        assert!(matches!(session.finish(), Some(SessionOutcome::Completed(_))));
        assert_eq!(windows.load(Ordering::SeqCst), 3);
    }
}

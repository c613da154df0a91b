//! A headless stand-in for the rendering engine.
//!
//! Keeps just enough state to exercise the core: the launch configuration,
//! the applied settings and a frame counter. Eclipse search uses mean lunar
//! phases and eclipse seasons, which is approximate but deterministic.

use std::collections::BTreeMap;
use std::time::Duration;

use orrery_core::engine::Engine;
use orrery_core::pipeline::LaunchConfig;
use orrery_core::session::EclipseFinder;
use orrery_types::{Eclipse, EclipseKind, EngineError, SettingValue};

const SYNODIC_MONTH: f64 = 29.530_588_853;
/// New moon of 2000-01-06 18:14 UT.
const NEW_MOON_EPOCH_JD: f64 = 2_451_550.26;
const ECLIPSE_SEASON: f64 = 173.31;
const SEASON_EPOCH_JD: f64 = 2_451_568.0;
const SOLAR_LIMIT_DAYS: f64 = 17.0;
const LUNAR_LIMIT_DAYS: f64 = 11.0;

#[derive(Default)]
pub struct HeadlessEngine {
    launch: Option<LaunchConfig>,
    settings: BTreeMap<String, SettingValue>,
    frames: u64,
}

impl HeadlessEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn launch(&self) -> Option<&LaunchConfig> {
        self.launch.as_ref()
    }

    pub fn setting(&self, field: &str) -> Option<SettingValue> {
        self.settings.get(field).copied()
    }

    pub fn settings_len(&self) -> usize {
        self.settings.len()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Engine for HeadlessEngine {
    fn load(&mut self, launch: &LaunchConfig) -> Result<(), EngineError> {
        if !launch.config_file.is_file() {
            return Err(EngineError::Load(format!(
                "configuration file {} not found",
                launch.config_file.display()
            )));
        }
        log::info!(
            target: "engine",
            "loaded {} ({} fps, language {}, {} locales)",
            launch.config_file.display(),
            launch.frame_rate,
            launch.language,
            launch.locales.len()
        );
        self.launch = Some(launch.clone());
        Ok(())
    }

    fn tick(&mut self, _elapsed: Duration) {
        self.frames += 1;
    }

    fn apply_setting(&mut self, field: &str, value: SettingValue) {
        self.settings.insert(field.to_string(), value);
    }

    fn eclipse_finder(&mut self, object: &str) -> Result<Box<dyn EclipseFinder>, EngineError> {
        if self.launch.is_none() {
            return Err(EngineError::Search("engine is not loaded".into()));
        }
        if !object.eq_ignore_ascii_case("earth") {
            return Err(EngineError::UnknownObject(object.to_string()));
        }
        Ok(Box::new(SeasonFinder::default()))
    }
}

/// Eclipses seen from Earth: solar at new moons and lunar at full moons
/// falling close enough to an eclipse season.
#[derive(Default)]
pub struct SeasonFinder {
    windows: u64,
}

impl SeasonFinder {
    fn season_offset(jd: f64) -> f64 {
        let m = (jd - SEASON_EPOCH_JD).rem_euclid(ECLIPSE_SEASON);
        m.min(ECLIPSE_SEASON - m)
    }
}

impl EclipseFinder for SeasonFinder {
    fn scan(&mut self, from_jd: f64, to_jd: f64, kinds: EclipseKind) -> Result<Vec<Eclipse>, EngineError> {
        if !from_jd.is_finite() || !to_jd.is_finite() {
            return Err(EngineError::Search(format!("invalid range {}..{}", from_jd, to_jd)));
        }
        self.windows += 1;

        let mut found = Vec::new();
        let first = ((from_jd - NEW_MOON_EPOCH_JD) / SYNODIC_MONTH).floor() - 1.0;
        let mut lunation = first;
        loop {
            let new_moon = NEW_MOON_EPOCH_JD + lunation * SYNODIC_MONTH;
            if new_moon >= to_jd {
                break;
            }
            let full_moon = new_moon + SYNODIC_MONTH / 2.0;
            let phases = [
                (new_moon, EclipseKind::SOLAR, SOLAR_LIMIT_DAYS, "Moon", "Earth", 0.15),
                (full_moon, EclipseKind::LUNAR, LUNAR_LIMIT_DAYS, "Earth", "Moon", 0.2),
            ];
            for (jd, kind, limit, occulter, receiver, duration) in phases {
                if jd < from_jd || jd >= to_jd || !kinds.contains(kind) {
                    continue;
                }
                if Self::season_offset(jd) <= limit {
                    found.push(Eclipse {
                        kind,
                        occulter: occulter.to_string(),
                        receiver: receiver.to_string(),
                        start_jd: jd,
                        end_jd: jd + duration,
                    });
                }
            }
            lunation += 1.0;
        }
        Ok(found)
    }

    fn release(&mut self) {
        log::debug!(target: "engine", "eclipse finder released after {} windows", self.windows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_eclipses_of_year_2000() {
        let mut finder = SeasonFinder::default();
        // 2000-01-01 .. 2001-01-01
        let found = finder.scan(2_451_544.5, 2_451_910.5, EclipseKind::ALL).unwrap();

        let solar = found.iter().filter(|e| e.kind == EclipseKind::SOLAR).count();
        let lunar = found.iter().filter(|e| e.kind == EclipseKind::LUNAR).count();
        assert!(solar >= 2, "expected solar eclipses, got {}", solar);
        assert!(lunar >= 2, "expected lunar eclipses, got {}", lunar);
        for eclipse in &found {
            assert!(eclipse.start_jd >= 2_451_544.5 && eclipse.start_jd < 2_451_910.5);
        }
    }

    #[test]
    fn test_windows_do_not_double_count() {
        let range = (2_451_544.5, 2_451_910.5);
        let whole = SeasonFinder::default().scan(range.0, range.1, EclipseKind::ALL).unwrap();

        let mut finder = SeasonFinder::default();
        let mut pieces = Vec::new();
        let mut from = range.0;
        while from < range.1 {
            let to = (from + 7.0).min(range.1);
            pieces.extend(finder.scan(from, to, EclipseKind::ALL).unwrap());
            from = to;
        }
        assert_eq!(pieces.len(), whole.len());
    }

    #[test]
    fn test_finder_requires_loaded_engine_and_known_object() {
        let mut engine = HeadlessEngine::new();
        assert!(matches!(engine.eclipse_finder("Earth"), Err(EngineError::Search(_))));

        let dir = tempfile::tempdir().unwrap();
        let cfg = dir.path().join("engine.cfg");
        std::fs::write(&cfg, "").unwrap();
        let launch = LaunchConfig {
            data_dir: dir.path().to_path_buf(),
            config_file: cfg,
            font_dir: dir.path().join("fonts"),
            addon_paths: vec![],
            script_paths: vec![],
            frame_rate: 60,
            language: "en".into(),
            multisample: false,
            high_dpi: true,
            locales: vec![],
        };
        engine.load(&launch).unwrap();
        assert!(engine.eclipse_finder("earth").is_ok());
        assert!(matches!(engine.eclipse_finder("Pluto"), Err(EngineError::UnknownObject(_))));
    }

    #[test]
    fn test_load_rejects_missing_config_file() {
        let mut engine = HeadlessEngine::new();
        let launch = LaunchConfig {
            data_dir: "/nonexistent".into(),
            config_file: "/nonexistent/engine.cfg".into(),
            font_dir: "/nonexistent/fonts".into(),
            addon_paths: vec![],
            script_paths: vec![],
            frame_rate: 60,
            language: "en".into(),
            multisample: false,
            high_dpi: true,
            locales: vec![],
        };
        assert!(matches!(engine.load(&launch), Err(EngineError::Load(_))));
        assert!(engine.launch().is_none());
    }
}

use serde::{Deserialize, Serialize};

/// A persisted setting as applied to an engine field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Double(f64),
}

/// The engine fields that are restored at startup, grouped by value type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsCatalog {
    pub bools: Vec<String>,
    pub ints: Vec<String>,
    pub doubles: Vec<String>,
}

impl Default for SettingsCatalog {
    fn default() -> Self {
        fn owned(keys: &[&str]) -> Vec<String> {
            keys.iter().map(|k| k.to_string()).collect()
        }
        Self {
            bools: owned(&[
                "showStars",
                "showPlanets",
                "showGalaxies",
                "showOrbits",
                "showAtmospheres",
                "showCloudMaps",
                "showEclipseShadows",
                "showConstellations",
            ]),
            ints: owned(&["timeZone", "dateFormat", "starStyle", "resolution"]),
            doubles: owned(&["ambientLightLevel", "faintestVisible", "galaxyBrightness"]),
        }
    }
}

mod animation;

pub use animation::*;

use serde::{Deserialize, Serialize};

use crate::utils::TsuyaError;

/// Setting this environment variable forces [`PbrLayoutFile::debug`] on.
pub const DEBUG_ENV: &str = "TSUYA_PBR_DEBUG";

fn default_dump_dir() -> String {
    "debug/pbr".to_string()
}

fn default_animate() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PbrLayoutFile {
    /// Dump composed companion atlases after every reload.
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_dump_dir")]
    pub dump_dir: String,
    /// Upload companion animation frames. Tickers advance either way.
    #[serde(default = "default_animate")]
    pub animate: bool,
}

impl Default for PbrLayoutFile {
    fn default() -> Self {
        Self {
            debug: false,
            dump_dir: default_dump_dir(),
            animate: default_animate(),
        }
    }
}

impl PbrLayoutFile {
    /// Reads the layout file when one is given, defaults otherwise.
    pub fn load(layout_file: Option<&str>) -> Result<Self, TsuyaError> {
        let mut layout: PbrLayoutFile = match layout_file {
            Some(f) => serde_json::from_str(&std::fs::read_to_string(f)?)?,
            None => Default::default(),
        };

        if std::env::var_os(DEBUG_ENV).is_some() {
            layout.debug = true;
        }

        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_layout_uses_defaults() {
        let layout: PbrLayoutFile = serde_json::from_str(r#"{ "debug": true }"#).unwrap();
        assert!(layout.debug);
        assert_eq!(layout.dump_dir, "debug/pbr");
        assert!(layout.animate);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "dump_dir": "out/companions", "animate": false }}"#).unwrap();

        let layout = PbrLayoutFile::load(file.path().to_str()).expect("load layout");
        assert_eq!(layout.dump_dir, "out/companions");
        assert!(!layout.animate);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(PbrLayoutFile::load(Some("does/not/exist.json")).is_err());
    }
}

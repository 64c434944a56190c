//! Build profile
//!
//! Two axes decided once, at lowering time: which contract enablement
//! levels are compiled in, and whether abort diagnostics carry full text
//! or only their machine tag.

use serde::{Deserialize, Serialize};

/// Contract enablement level.
///
/// A contract declared at level L is compiled in when L is at least the
/// build's level: `release`-level contracts are always on, `spec`-level
/// contracts only in spec builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildLevel {
    Spec,
    Debug,
    Test,
    Release,
}

impl BuildLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildLevel::Spec => "spec",
            BuildLevel::Debug => "debug",
            BuildLevel::Test => "test",
            BuildLevel::Release => "release",
        }
    }
}

impl std::str::FromStr for BuildLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spec" => Ok(BuildLevel::Spec),
            "debug" => Ok(BuildLevel::Debug),
            "test" => Ok(BuildLevel::Test),
            "release" => Ok(BuildLevel::Release),
            other => Err(format!("unknown build level: {other}")),
        }
    }
}

/// Whether a contract at `decl_level` is compiled under `build_level`
pub fn is_build_level_enabled(decl_level: BuildLevel, build_level: BuildLevel) -> bool {
    decl_level >= build_level
}

/// Diagnostic verbosity of emitted aborts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmitMode {
    /// Composed message: text, optional tag, file and line
    Debug,
    /// Machine tag only (or nothing when none was supplied)
    Release,
}

impl std::str::FromStr for EmitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debug" => Ok(EmitMode::Debug),
            "release" => Ok(EmitMode::Release),
            other => Err(format!("unknown emit mode: {other}")),
        }
    }
}

/// The profile a whole emission runs under
#[derive(Debug, Clone, Copy)]
pub struct EmitProfile {
    pub mode: EmitMode,
    pub level: BuildLevel,
}

impl Default for EmitProfile {
    fn default() -> Self {
        EmitProfile {
            mode: EmitMode::Debug,
            level: BuildLevel::Debug,
        }
    }
}

/// `[emit]` table of an `arbor.toml` options file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmitOptions {
    pub mode: Option<EmitMode>,
    pub level: Option<BuildLevel>,
    pub out_dir: Option<String>,
}

/// Root of an `arbor.toml` options file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OptionsFile {
    #[serde(default)]
    pub emit: EmitOptions,
}

impl OptionsFile {
    pub fn parse(text: &str) -> Result<OptionsFile, toml::de::Error> {
        toml::from_str(text)
    }

    /// Profile with file options applied over the defaults
    pub fn profile(&self) -> EmitProfile {
        let mut p = EmitProfile::default();
        if let Some(mode) = self.emit.mode {
            p.mode = mode;
        }
        if let Some(level) = self.emit.level {
            p.level = level;
        }
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_contracts_always_enabled() {
        for build in [
            BuildLevel::Spec,
            BuildLevel::Debug,
            BuildLevel::Test,
            BuildLevel::Release,
        ] {
            assert!(is_build_level_enabled(BuildLevel::Release, build));
        }
    }

    #[test]
    fn test_debug_contracts_off_in_test_builds() {
        assert!(!is_build_level_enabled(BuildLevel::Debug, BuildLevel::Test));
        assert!(is_build_level_enabled(BuildLevel::Debug, BuildLevel::Debug));
        assert!(is_build_level_enabled(BuildLevel::Debug, BuildLevel::Spec));
    }

    #[test]
    fn test_spec_build_enables_everything() {
        for level in [
            BuildLevel::Spec,
            BuildLevel::Debug,
            BuildLevel::Test,
            BuildLevel::Release,
        ] {
            assert!(is_build_level_enabled(level, BuildLevel::Spec));
        }
    }

    #[test]
    fn test_options_file_parse() {
        let opts = OptionsFile::parse("[emit]\nmode = \"release\"\nlevel = \"test\"\n").unwrap();
        let p = opts.profile();
        assert_eq!(p.mode, EmitMode::Release);
        assert_eq!(p.level, BuildLevel::Test);
    }

    #[test]
    fn test_options_file_defaults() {
        let opts = OptionsFile::parse("").unwrap();
        let p = opts.profile();
        assert_eq!(p.mode, EmitMode::Debug);
        assert_eq!(p.level, BuildLevel::Debug);
    }

    #[test]
    fn test_level_from_str() {
        assert_eq!("test".parse::<BuildLevel>().unwrap(), BuildLevel::Test);
        assert!("bogus".parse::<BuildLevel>().is_err());
    }
}

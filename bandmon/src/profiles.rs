//! Connection profiles: load/save a JSON mapping of profile name ->
//! { url, interval, interfaces }.
//! Stored under the XDG config dir: $XDG_CONFIG_HOME/bandmon/profiles.json
//! (fallback ~/.config/bandmon/profiles.json)

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProfileEntry {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProfilesFile {
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileEntry>,
    #[serde(default)]
    pub version: u32,
}

pub fn config_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(xdg).join("bandmon")
    } else {
        dirs_next::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bandmon")
    }
}

pub fn profiles_path() -> PathBuf {
    config_dir().join("profiles.json")
}

pub fn load_profiles() -> ProfilesFile {
    let path = profiles_path();
    match fs::read_to_string(&path) {
        Ok(s) => serde_json::from_str(&s).unwrap_or_default(),
        Err(_) => ProfilesFile::default(),
    }
}

pub fn save_profiles(p: &ProfilesFile) -> std::io::Result<()> {
    let path = profiles_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_vec_pretty(p).map_err(std::io::Error::other)?;
    fs::write(path, data)
}

pub enum ResolveProfile {
    /// Use the runtime inputs as-is (the caller decides about persisting).
    Direct(ProfileEntry),
    /// Loaded from an existing profile entry.
    Loaded(ProfileEntry),
    /// Should prompt the user to select among profile names.
    PromptSelect(Vec<String>),
    /// Should prompt the user to create a new profile with this name.
    PromptCreate(String),
    /// Nothing to resolve (no url, no profiles).
    None,
}

pub struct ProfileRequest {
    pub profile_name: Option<String>,
    pub url: Option<String>,
    pub interval_ms: Option<u64>,
    pub interfaces: Vec<String>,
}

impl ProfileRequest {
    pub fn resolve(self, pf: &ProfilesFile) -> ResolveProfile {
        // Only a profile name given -> try to load it.
        if self.url.is_none() {
            if let Some(name) = self.profile_name {
                return match pf.profiles.get(&name) {
                    Some(entry) => ResolveProfile::Loaded(entry.clone()),
                    None => ResolveProfile::PromptCreate(name),
                };
            }
        }
        // A url was given -> use it (with whatever overrides came along).
        if let Some(url) = self.url {
            return ResolveProfile::Direct(ProfileEntry {
                url,
                interval_ms: self.interval_ms,
                interfaces: self.interfaces,
            });
        }
        // Nothing given -> offer a pick if any profiles exist.
        if pf.profiles.is_empty() {
            ResolveProfile::None
        } else {
            ResolveProfile::PromptSelect(pf.profiles.keys().cloned().collect())
        }
    }
}

// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    errors::{ConfigParseError, ConfigParseErrorKind, ProfileNotFound},
    manifest::FilterOptions,
    runner::RunSettings,
    slot::CommandTemplate,
    version::major_version,
};
use camino::{Utf8Path, Utf8PathBuf};
use config::{
    Config, ConfigBuilder, ConfigError, File, FileFormat, FileSourceFile, builder::DefaultState,
};
use serde::Deserialize;
use std::{
    collections::{BTreeSet, HashMap},
    time::Duration,
};
use tracing::warn;

/// Overall configuration for the conformance runner.
///
/// This is the root data structure for configuration. Use [`Self::profile`] to select the settings
/// for a run.
#[derive(Clone, Debug)]
pub struct ConformanceConfig {
    workspace_root: Utf8PathBuf,
    unknown_keys: BTreeSet<String>,
    inner: ConformanceConfigImpl,
}

impl ConformanceConfig {
    /// The default location of the config within the working directory.
    pub const CONFIG_PATH: &'static str = ".config/conformance.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Repository-specific configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../../default-config.toml");

    /// The name of the default profile.
    pub const DEFAULT_PROFILE: &'static str = "default";

    /// Reads the conformance config from the given file, or if not specified from
    /// `.config/conformance.toml` within `workspace_root`.
    ///
    /// Keys the runner doesn't recognize are logged as warnings and can be inspected through
    /// [`Self::unknown_keys`].
    pub fn from_sources(
        workspace_root: impl Into<Utf8PathBuf>,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        let workspace_root = workspace_root.into();
        let (config_file, source) = match config_file {
            Some(file) => (
                file.to_owned(),
                File::new(file.as_str(), FileFormat::Toml),
            ),
            None => {
                let file = workspace_root.join(Self::CONFIG_PATH);
                let source = File::new(file.as_str(), FileFormat::Toml).required(false);
                (file, source)
            }
        };

        Self::read_from_sources(workspace_root, &config_file, source)
    }

    /// Returns the default conformance config.
    pub fn default_config(workspace_root: impl Into<Utf8PathBuf>) -> Self {
        let (config, unknown_keys) = Self::build_and_deserialize_config(&Self::make_default_config())
            .expect("default config is always valid");
        Self {
            workspace_root: workspace_root.into(),
            unknown_keys,
            inner: config.into_config_impl(),
        }
    }

    /// Returns the root the config was loaded for.
    pub fn workspace_root(&self) -> &Utf8Path {
        &self.workspace_root
    }

    /// Returns the keys in the config that weren't recognized.
    pub fn unknown_keys(&self) -> &BTreeSet<String> {
        &self.unknown_keys
    }

    /// Returns the manifest resolution starts from, relative to [`Self::base_dir`].
    pub fn root_manifest(&self) -> &str {
        &self.inner.root_manifest
    }

    /// Returns the directory manifests and pages are served from.
    pub fn base_dir(&self) -> Utf8PathBuf {
        self.workspace_root.join(&self.inner.base_dir)
    }

    /// Returns the profile with the given name.
    pub fn profile(&self, name: impl AsRef<str>) -> Result<ConformanceProfile<'_>, ProfileNotFound> {
        let name = name.as_ref();
        let custom_profile = self.inner.other_profiles.get(name);
        if custom_profile.is_none() && name != Self::DEFAULT_PROFILE {
            return Err(ProfileNotFound::new(name, self.all_profiles()));
        }

        Ok(ConformanceProfile {
            name: name.to_owned(),
            default_profile: &self.inner.default_profile,
            custom_profile,
        })
    }

    /// Returns the names of all known profiles, including the default one.
    pub fn all_profiles(&self) -> impl Iterator<Item = &str> + '_ {
        std::iter::once(Self::DEFAULT_PROFILE)
            .chain(self.inner.other_profiles.keys().map(|name| name.as_str()))
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    fn read_from_sources(
        workspace_root: Utf8PathBuf,
        config_file: &Utf8Path,
        source: File<FileSourceFile, FileFormat>,
    ) -> Result<Self, ConfigParseError> {
        let builder = Self::make_default_config().add_source(source);
        let (config, unknown_keys) = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(config_file, kind))?;

        for key in &unknown_keys {
            warn!(config_file = %config_file, "ignoring unknown configuration key `{key}`");
        }

        Ok(Self {
            workspace_root,
            unknown_keys,
            inner: config.into_config_impl(),
        })
    }

    /// This returns a tuple of (config, ignored paths).
    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(ConformanceConfigDeserialize, BTreeSet<String>), ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config: ConformanceConfigDeserialize = serde_path_to_error::deserialize(ignored_de)
            .map_err(|error| {
                // The key is already part of the path, so drop it from the config error.
                let path = error.path().clone();
                let error = match error.into_inner() {
                    ConfigError::At { error, .. } => *error,
                    other => other,
                };
                ConfigParseErrorKind::DeserializeError(Box::new(serde_path_to_error::Error::new(
                    path, error,
                )))
            })?;

        Ok((config, ignored))
    }
}

/// The settings of a single profile.
///
/// Returned by [`ConformanceConfig::profile`].
#[derive(Clone, Debug)]
pub struct ConformanceProfile<'cfg> {
    name: String,
    default_profile: &'cfg DefaultProfileImpl,
    custom_profile: Option<&'cfg CustomProfileImpl>,
}

macro_rules! profile_field {
    ($prof:ident.$field:ident) => {
        $prof
            .custom_profile
            .and_then(|p| p.$field)
            .unwrap_or($prof.default_profile.$field)
    };
}
macro_rules! profile_field_from_ref {
    ($prof:ident.$field:ident.$ref_func:ident()) => {
        $prof
            .custom_profile
            .and_then(|p| p.$field.$ref_func())
            .unwrap_or(&$prof.default_profile.$field)
    };
}
macro_rules! profile_field_optional {
    ($prof:ident.$field:ident.$ref_func:ident()) => {
        $prof
            .custom_profile
            .and_then(|p| p.$field.$ref_func())
            .or($prof.default_profile.$field.$ref_func())
    };
}

impl<'cfg> ConformanceProfile<'cfg> {
    /// Returns the name of the profile.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the version being tested.
    pub fn version(&self) -> &'cfg str {
        profile_field_from_ref!(self.version.as_deref())
    }

    /// Returns the minimum version tests are selected by, if set.
    pub fn min_version(&self) -> Option<&'cfg str> {
        profile_field_optional!(self.min_version.as_deref())
    }

    /// Returns the maximum version tests are selected by, if set.
    pub fn max_version(&self) -> Option<&'cfg str> {
        profile_field_optional!(self.max_version.as_deref())
    }

    /// Returns true if slow tests are skipped.
    pub fn fast(&self) -> bool {
        profile_field!(self.fast)
    }

    /// Returns the success value reported for skipped pages.
    pub fn allow_skip(&self) -> bool {
        profile_field!(self.allow_skip)
    }

    /// Returns how long a page may go without progress before it times out.
    pub fn timeout_delay(&self) -> Duration {
        profile_field!(self.timeout_delay)
    }

    /// Returns the number of pages that run concurrently.
    pub fn slots(&self) -> usize {
        profile_field!(self.slots)
    }

    /// Returns the folders tests are selected from. Empty means every folder.
    pub fn selected_folders(&self) -> &'cfg [String] {
        profile_field_from_ref!(self.selected_folders.as_deref())
    }

    /// Returns the value passed to pages as `dumpShaders`, if any.
    pub fn dump_shaders(&self) -> Option<bool> {
        self.custom_profile
            .and_then(|p| p.dump_shaders)
            .or(self.default_profile.dump_shaders)
    }

    /// Returns the value passed to pages as `quiet`, if any.
    pub fn quiet(&self) -> Option<bool> {
        self.custom_profile
            .and_then(|p| p.quiet)
            .or(self.default_profile.quiet)
    }

    /// Returns the prefix stripped from URLs reported by pages, if any.
    pub fn url_prefix(&self) -> Option<&'cfg str> {
        profile_field_optional!(self.url_prefix.as_deref())
    }

    /// Returns the extension that marks nested manifests.
    pub fn manifest_extension(&self) -> &'cfg str {
        profile_field_from_ref!(self.manifest_extension.as_deref())
    }

    /// Returns the command pages are run with, if configured.
    pub fn command(&self) -> Option<&'cfg CommandTemplate> {
        profile_field_optional!(self.command.as_ref())
    }

    /// Returns the options tests are selected with.
    pub fn filter_options(&self) -> FilterOptions {
        FilterOptions {
            version: self.version().to_owned(),
            min_version: self.min_version().map(|v| v.to_owned()),
            max_version: self.max_version().map(|v| v.to_owned()),
            fast: self.fast(),
        }
    }

    /// Returns the settings pages are run with.
    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            timeout_delay: self.timeout_delay(),
            allow_skip: self.allow_skip(),
            major_version: major_version(Some(self.version())),
            dump_shaders: self.dump_shaders(),
            quiet: self.quiet(),
            url_prefix: self.url_prefix().map(|prefix| prefix.to_owned()),
        }
    }
}

#[derive(Clone, Debug)]
struct ConformanceConfigImpl {
    root_manifest: String,
    base_dir: Utf8PathBuf,
    default_profile: DefaultProfileImpl,
    other_profiles: HashMap<String, CustomProfileImpl>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ConformanceConfigDeserialize {
    root_manifest: String,
    base_dir: Utf8PathBuf,
    #[serde(rename = "profile")]
    profiles: HashMap<String, CustomProfileImpl>,
}

impl ConformanceConfigDeserialize {
    fn into_config_impl(mut self) -> ConformanceConfigImpl {
        let default_profile = self
            .profiles
            .remove(ConformanceConfig::DEFAULT_PROFILE)
            .expect("default profile should exist");
        ConformanceConfigImpl {
            root_manifest: self.root_manifest,
            base_dir: self.base_dir,
            default_profile: DefaultProfileImpl::new(default_profile),
            other_profiles: self.profiles,
        }
    }
}

#[derive(Clone, Debug)]
struct DefaultProfileImpl {
    version: String,
    min_version: Option<String>,
    max_version: Option<String>,
    fast: bool,
    allow_skip: bool,
    timeout_delay: Duration,
    slots: usize,
    selected_folders: Vec<String>,
    dump_shaders: Option<bool>,
    quiet: Option<bool>,
    url_prefix: Option<String>,
    manifest_extension: String,
    command: Option<CommandTemplate>,
}

impl DefaultProfileImpl {
    fn new(p: CustomProfileImpl) -> Self {
        Self {
            version: p.version.expect("version present in default profile"),
            min_version: p.min_version,
            max_version: p.max_version,
            fast: p.fast.expect("fast present in default profile"),
            allow_skip: p.allow_skip.expect("allow-skip present in default profile"),
            timeout_delay: p
                .timeout_delay
                .expect("timeout-delay present in default profile"),
            slots: p.slots.expect("slots present in default profile"),
            selected_folders: p
                .selected_folders
                .expect("selected-folders present in default profile"),
            dump_shaders: p.dump_shaders,
            quiet: p.quiet,
            url_prefix: p.url_prefix,
            manifest_extension: p
                .manifest_extension
                .expect("manifest-extension present in default profile"),
            command: p.command,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CustomProfileImpl {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    min_version: Option<String>,
    #[serde(default)]
    max_version: Option<String>,
    #[serde(default)]
    fast: Option<bool>,
    #[serde(default)]
    allow_skip: Option<bool>,
    #[serde(default, with = "humantime_serde::option")]
    timeout_delay: Option<Duration>,
    #[serde(default)]
    slots: Option<usize>,
    #[serde(default)]
    selected_folders: Option<Vec<String>>,
    #[serde(default)]
    dump_shaders: Option<bool>,
    #[serde(default)]
    quiet: Option<bool>,
    #[serde(default)]
    url_prefix: Option<String>,
    #[serde(default)]
    manifest_extension: Option<String>,
    #[serde(default)]
    command: Option<CommandTemplate>,
}

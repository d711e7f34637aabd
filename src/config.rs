//! Site configuration. Settings come from an optional `postwalk.yaml`
//! project file, found by searching the working directory and its parents,
//! and fall back to defaults for anything it leaves out:
//!
//! ```yaml
//! source_directory: posts
//! output_directory: output
//! index_title: My Notes
//! host: 127.0.0.1
//! port: 8000
//! open_browser: true
//! ```
//!
//! Relative directories resolve against the directory holding the project
//! file.

use crate::serve::ServerConfig;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const PROJECT_FILE: &str = "postwalk.yaml";
pub const DEFAULT_SOURCE_DIRECTORY: &str = "posts";
pub const DEFAULT_OUTPUT_DIRECTORY: &str = "output";
pub const DEFAULT_INDEX_TITLE: &str = "Index";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;

#[derive(Deserialize, Default, Debug)]
struct Project {
    #[serde(default)]
    source_directory: Option<PathBuf>,

    #[serde(default)]
    output_directory: Option<PathBuf>,

    #[serde(default)]
    index_title: Option<String>,

    #[serde(default)]
    host: Option<String>,

    #[serde(default)]
    port: Option<u16>,

    #[serde(default)]
    open_browser: Option<bool>,
}

/// Everything a run needs to know.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// The root of the source tree.
    pub source_directory: PathBuf,

    /// The output root. It is deleted and regenerated on every run.
    pub output_directory: PathBuf,

    /// The `<title>` of the index page.
    pub index_title: String,

    /// The address the dev server binds to.
    pub host: String,

    /// The port the dev server listens on.
    pub port: u16,

    /// Whether the dev server opens a browser tab on start.
    pub open_browser: bool,
}

impl Config {
    /// The default configuration with directories resolved against `root`.
    pub fn with_root(root: &Path) -> Config {
        Config {
            source_directory: root.join(DEFAULT_SOURCE_DIRECTORY),
            output_directory: root.join(DEFAULT_OUTPUT_DIRECTORY),
            index_title: DEFAULT_INDEX_TITLE.to_owned(),
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            open_browser: true,
        }
    }

    /// Searches `dir` and then each of its ancestors for `postwalk.yaml` and
    /// loads the first one found. Without a project file the defaults are
    /// used, relative to `dir`.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        for ancestor in dir.ancestors() {
            let path = ancestor.join(PROJECT_FILE);
            if path.is_file() {
                log::debug!("using project file `{}`", path.display());
                return Config::from_project_file(&path);
            }
        }
        Ok(Config::with_root(dir))
    }

    /// Loads a project file. Directories in it are relative to the file's
    /// parent directory.
    pub fn from_project_file(path: &Path) -> Result<Config> {
        let project_root = path.parent().ok_or_else(|| {
            anyhow!(
                "Can't get parent directory for provided project file path '{}'",
                path.display()
            )
        })?;

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Opening project file `{}`", path.display()))?;
        let project: Project = match contents.trim().is_empty() {
            true => Project::default(),
            false => serde_yaml::from_str(&contents)
                .with_context(|| format!("Loading configuration `{}`", path.display()))?,
        };

        let defaults = Config::with_root(project_root);
        Ok(Config {
            source_directory: project
                .source_directory
                .map(|d| project_root.join(d))
                .unwrap_or(defaults.source_directory),
            output_directory: project
                .output_directory
                .map(|d| project_root.join(d))
                .unwrap_or(defaults.output_directory),
            index_title: project.index_title.unwrap_or(defaults.index_title),
            host: project.host.unwrap_or(defaults.host),
            port: project.port.unwrap_or(defaults.port),
            open_browser: project.open_browser.unwrap_or(defaults.open_browser),
        })
    }

    /// The dev server settings, serving the output root.
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            root: self.output_directory.clone(),
            host: self.host.clone(),
            port: self.port,
            open_browser: self.open_browser,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults_without_project_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_directory(dir.path()).unwrap();
        assert_eq!(dir.path().join("posts"), config.source_directory);
        assert_eq!(dir.path().join("output"), config.output_directory);
        assert_eq!("Index", config.index_title);
        assert_eq!(8000, config.port);
        assert!(config.open_browser);
    }

    #[test]
    fn test_project_file_in_parent() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(
            dir.path().join(PROJECT_FILE),
            "source_directory: content\nindex_title: Notes\nport: 9000\nopen_browser: false\n",
        )
        .unwrap();

        let config = Config::from_directory(&nested).unwrap();
        assert_eq!(dir.path().join("content"), config.source_directory);
        assert_eq!(dir.path().join("output"), config.output_directory);
        assert_eq!("Notes", config.index_title);
        assert_eq!(9000, config.port);
        assert!(!config.open_browser);

        let server = config.server_config();
        assert_eq!(config.output_directory, server.root);
        assert_eq!(9000, server.port);
    }

    #[test]
    fn test_malformed_project_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(PROJECT_FILE), "port: [not a port\n").unwrap();
        assert!(Config::from_directory(dir.path()).is_err());
    }

    #[test]
    fn test_empty_project_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(PROJECT_FILE), "").unwrap();
        let config = Config::from_directory(dir.path()).unwrap();
        assert_eq!(Config::with_root(dir.path()), config);
    }
}

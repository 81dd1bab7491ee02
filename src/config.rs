//! TOML configuration and credential construction.
//!
//! Every field has a default, so running without a config file is the
//! common case. A file only needs the keys it overrides:
//!
//! ```toml
//! [github]
//! max_retries = 3
//!
//! [walk]
//! max_depth = 8
//! skip_failed_files = true
//!
//! [output]
//! dir = "./out"
//! write_urls = true
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "cforge.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub walk: WalkConfig,
    #[serde(default)]
    pub local: LocalConfig,
    #[serde(default)]
    pub papers: PapersConfig,
    #[serde(default)]
    pub transcript: TranscriptConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GitHubConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Environment variable holding the personal access token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub max_retries: u32,
    /// Unset means requests wait indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            token_env: default_token_env(),
            user_agent: default_user_agent(),
            max_retries: 0,
            timeout_secs: None,
        }
    }
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}
fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}
fn default_user_agent() -> String {
    concat!("corpus-forge/", env!("CARGO_PKG_VERSION")).to_string()
}

impl GitHubConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Remote walk guards. Both limits are off unless set, so a repository is
/// walked in full by default.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct WalkConfig {
    #[serde(default)]
    pub max_depth: Option<usize>,
    #[serde(default)]
    pub max_files: Option<usize>,
    /// Log and skip a file whose download or notebook conversion fails
    /// instead of aborting the whole document.
    #[serde(default)]
    pub skip_failed_files: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LocalConfig {
    #[serde(default = "default_exclude_globs")]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            exclude_globs: default_exclude_globs(),
            follow_symlinks: false,
        }
    }
}

fn default_exclude_globs() -> Vec<String> {
    vec![
        "**/.git/**".to_string(),
        "**/node_modules/**".to_string(),
        "**/target/**".to_string(),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct PapersConfig {
    #[serde(default = "default_scihub_base")]
    pub scihub_base: String,
    #[serde(default = "default_paper_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_browser_agent")]
    pub user_agent: String,
}

impl Default for PapersConfig {
    fn default() -> Self {
        Self {
            scihub_base: default_scihub_base(),
            timeout_secs: default_paper_timeout(),
            user_agent: default_browser_agent(),
        }
    }
}

fn default_scihub_base() -> String {
    "https://sci-hub.se".to_string()
}
fn default_paper_timeout() -> u64 {
    60
}
fn default_browser_agent() -> String {
    "Mozilla/5.0 (Windows NT 6.3) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/98.0.4758.102 Safari/537.36".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct TranscriptConfig {
    #[serde(default = "default_timedtext_base")]
    pub timedtext_base: String,
    #[serde(default = "default_lang")]
    pub lang: String,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            timedtext_base: default_timedtext_base(),
            lang: default_lang(),
        }
    }
}

fn default_timedtext_base() -> String {
    "https://www.youtube.com/api/timedtext".to_string()
}
fn default_lang() -> String {
    "en".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_raw_file")]
    pub raw_file: String,
    #[serde(default = "default_compressed_file")]
    pub compressed_file: String,
    #[serde(default = "default_urls_file")]
    pub urls_file: String,
    #[serde(default)]
    pub write_urls: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            raw_file: default_raw_file(),
            compressed_file: default_compressed_file(),
            urls_file: default_urls_file(),
            write_urls: false,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_raw_file() -> String {
    "uncompressed_output.txt".to_string()
}
fn default_compressed_file() -> String {
    "compressed_output.txt".to_string()
}
fn default_urls_file() -> String {
    "processed_urls.txt".to_string()
}

impl OutputConfig {
    pub fn raw_path(&self) -> PathBuf {
        self.dir.join(&self.raw_file)
    }
    pub fn compressed_path(&self) -> PathBuf {
        self.dir.join(&self.compressed_file)
    }
    pub fn urls_path(&self) -> PathBuf {
        self.dir.join(&self.urls_file)
    }
}

/// Parse and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Resolve the effective configuration: an explicit path must exist,
/// otherwise `./cforge.toml` is used when present, else defaults.
pub fn resolve_config(explicit: Option<&Path>) -> Result<Config> {
    match explicit {
        Some(path) => load_config(path),
        None => {
            let fallback = Path::new(DEFAULT_CONFIG_FILE);
            if fallback.exists() {
                load_config(fallback)
            } else {
                Ok(Config::default())
            }
        }
    }
}

fn validate(config: &Config) -> Result<()> {
    if !(config.github.api_base.starts_with("http://")
        || config.github.api_base.starts_with("https://"))
    {
        bail!(
            "github.api_base must be an http(s) URL, got '{}'",
            config.github.api_base
        );
    }

    if config.github.timeout_secs == Some(0) {
        bail!("github.timeout_secs must be > 0 when set");
    }

    if config.walk.max_files == Some(0) {
        bail!("walk.max_files must be > 0 when set");
    }

    if config.papers.timeout_secs == 0 {
        bail!("papers.timeout_secs must be > 0");
    }

    let out = &config.output;
    for (key, value) in [
        ("output.raw_file", &out.raw_file),
        ("output.compressed_file", &out.compressed_file),
        ("output.urls_file", &out.urls_file),
    ] {
        if value.trim().is_empty() {
            bail!("{} must not be empty", key);
        }
    }
    if out.raw_file == out.compressed_file {
        bail!("output.raw_file and output.compressed_file must differ");
    }

    Ok(())
}

/// Secrets read once at startup and passed down explicitly.
#[derive(Clone, Default)]
pub struct Credentials {
    github_token: Option<String>,
}

impl Credentials {
    pub fn new(github_token: Option<String>) -> Self {
        Self {
            github_token: github_token.filter(|t| !t.trim().is_empty()),
        }
    }

    /// Read the token from the variable named by `github.token_env`.
    pub fn from_env(github: &GitHubConfig) -> Self {
        Self::new(std::env::var(&github.token_env).ok())
    }

    pub fn github_token(&self) -> Option<&str> {
        self.github_token.as_deref()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("github_token", &self.github_token.as_ref().map(|_| "***"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn empty_file_yields_defaults() {
        let file = write_config("");
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.github.api_base, "https://api.github.com");
        assert_eq!(cfg.github.max_retries, 0);
        assert_eq!(cfg.github.timeout(), None);
        assert_eq!(cfg.walk.max_depth, None);
        assert_eq!(cfg.walk.max_files, None);
        assert_eq!(cfg.papers.timeout_secs, 60);
        assert_eq!(cfg.output.raw_file, "uncompressed_output.txt");
        assert_eq!(cfg.output.compressed_file, "compressed_output.txt");
    }

    #[test]
    fn partial_override() {
        let file = write_config(
            r#"
[walk]
max_files = 3
skip_failed_files = true

[output]
dir = "/tmp/out"
write_urls = true
"#,
        );
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.walk.max_files, Some(3));
        assert!(cfg.walk.skip_failed_files);
        assert_eq!(cfg.walk.max_depth, None);
        assert_eq!(cfg.output.raw_path(), PathBuf::from("/tmp/out/uncompressed_output.txt"));
        assert!(cfg.output.write_urls);
    }

    #[test]
    fn rejects_invalid_values() {
        let file = write_config("[walk]\nmax_files = 0\n");
        assert!(load_config(file.path()).is_err());

        let file = write_config("[github]\napi_base = \"ftp://example\"\n");
        assert!(load_config(file.path()).is_err());

        let file = write_config("[output]\nraw_file = \"same.txt\"\ncompressed_file = \"same.txt\"\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let err = resolve_config(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn blank_token_is_treated_as_absent() {
        assert!(Credentials::new(Some("  ".into())).github_token().is_none());
        let creds = Credentials::new(Some("ghp_abc".into()));
        assert_eq!(creds.github_token(), Some("ghp_abc"));
        assert!(!format!("{:?}", creds).contains("ghp_abc"));
    }
}

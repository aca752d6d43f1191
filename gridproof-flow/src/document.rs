use std::fmt;
use std::path::Path;

use gridproof_common::{GridproofError, Result};
use url::Url;

/// Schemes accepted verbatim; anything else is treated as a filesystem path.
const URL_SCHEMES: &[&str] = &["http", "https", "file", "about", "data"];

/// The application entry document a flow navigates to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef(Url);

impl DocumentRef {
    /// Accept either a URL or a path; relative paths resolve against the
    /// current working directory.
    pub fn parse(input: &str) -> Result<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| GridproofError::Config(format!("cannot read working directory: {e}")))?;
        Self::parse_relative_to(input, &cwd)
    }

    /// Like [`parse`](Self::parse) with an explicit base for relative paths.
    ///
    /// ```
    /// use gridproof_flow::DocumentRef;
    ///
    /// let doc = DocumentRef::parse_relative_to("http://localhost:8000/index.html", "/".as_ref()).unwrap();
    /// assert_eq!(doc.url().as_str(), "http://localhost:8000/index.html");
    /// ```
    pub fn parse_relative_to(input: &str, base: &Path) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(GridproofError::Config("target document is empty".into()));
        }
        if let Ok(url) = Url::parse(input) {
            if URL_SCHEMES.contains(&url.scheme()) {
                return Ok(Self(url));
            }
        }
        Self::from_path(&base.join(input))
    }

    /// Build a `file://` reference; the file must exist.
    pub fn from_path(path: &Path) -> Result<Self> {
        let absolute = path.canonicalize().map_err(|e| {
            GridproofError::Navigation(format!("document {} is not readable: {e}", path.display()))
        })?;
        let url = Url::from_file_path(&absolute).map_err(|_| {
            GridproofError::Navigation(format!("{} is not a valid file URL", absolute.display()))
        })?;
        Ok(Self(url))
    }

    pub fn url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

use crate::patterns::{io_error, validate_pattern_name, PatternError};
use crate::shared::fs_atomic::atomic_write_file;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const SYSTEM_FILE: &str = "system.md";
pub const USER_FILE: &str = "user.md";
pub const PURPOSE_FIELD: &str = "purpose";
const PURPOSE_SECTION: &str = "IDENTITY and PURPOSE";
const PURPOSE_PREFIX: &str = "You are an AI assistant designed to";
pub const MINIMAL_TEMPLATE: &str = "# IDENTITY and PURPOSE\n\n# STEPS\n\n# OUTPUT INSTRUCTIONS\n";
const REQUIRED_SECTIONS: [&str; 3] = ["# IDENTITY", "# STEPS", "# OUTPUT"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternValidation {
    pub valid: bool,
    pub message: String,
}

impl PatternValidation {
    pub fn is_clean(&self) -> bool {
        self.valid && self.message == "Pattern is valid."
    }
}

/// One `#`-headed block of a `system.md` prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSection {
    pub title: String,
    pub body: String,
}

/// Per-pattern result of a bulk edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkEditOutcome {
    pub pattern: String,
    pub ok: bool,
    pub message: String,
}

impl BulkEditOutcome {
    fn new(pattern: &str, ok: bool, message: impl Into<String>) -> Self {
        Self {
            pattern: pattern.to_string(),
            ok,
            message: message.into(),
        }
    }
}

/// Splits on every `#`; blank blocks are dropped, the first line of a block
/// is its title and the rest its body.
pub fn split_sections(content: &str) -> Vec<PatternSection> {
    content
        .split('#')
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(|block| {
            let (title, body) = block.split_once('\n').unwrap_or((block, ""));
            PatternSection {
                title: title.trim().to_string(),
                body: body.trim().to_string(),
            }
        })
        .collect()
}

pub fn join_sections(sections: &[PatternSection]) -> String {
    sections
        .iter()
        .map(|section| format!("# {}\n\n{}", section.title, section.body))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Rewrites the assistant purpose line inside the `IDENTITY and PURPOSE`
/// block, leaving every other byte as it was.
fn rewrite_purpose(content: &str, value: &str) -> String {
    content
        .split('#')
        .map(|block| {
            if !block.trim().starts_with(PURPOSE_SECTION) {
                return block.to_string();
            }
            block
                .split('\n')
                .map(|line| {
                    if line.contains(PURPOSE_PREFIX) {
                        format!("{PURPOSE_PREFIX} {value}.")
                    } else {
                        line.to_string()
                    }
                })
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect::<Vec<_>>()
        .join("#")
}

/// Directory-per-pattern store; each pattern keeps its prompt in `system.md`.
#[derive(Debug, Clone)]
pub struct PatternLibrary {
    root: PathBuf,
}

impl PatternLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pattern_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Names of every pattern directory, sorted.
    pub fn list(&self) -> Result<Vec<String>, PatternError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(PatternError::DirectoryMissing {
                    path: self.root.display().to_string(),
                })
            }
            Err(err) => return Err(io_error(&self.root, err)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| io_error(&self.root, err))?;
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn system_prompt(&self, name: &str) -> Result<Option<String>, PatternError> {
        validate_pattern_name(name)?;
        let path = self.pattern_dir(name).join(SYSTEM_FILE);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error(&path, err)),
        }
    }

    /// Missing `system.md` is invalid; missing sections only warn.
    pub fn validate(&self, name: &str) -> PatternValidation {
        let content = match self.system_prompt(name) {
            Ok(Some(content)) => content,
            Ok(None) => {
                return PatternValidation {
                    valid: false,
                    message: "Missing required file: system.md.".to_string(),
                }
            }
            Err(err) => {
                return PatternValidation {
                    valid: false,
                    message: format!("Error validating pattern: {err}"),
                }
            }
        };

        let lowered = content.to_lowercase();
        let missing: Vec<&str> = REQUIRED_SECTIONS
            .iter()
            .copied()
            .filter(|section| !lowered.contains(&section.to_lowercase()))
            .collect();
        if missing.is_empty() {
            PatternValidation {
                valid: true,
                message: "Pattern is valid.".to_string(),
            }
        } else {
            PatternValidation {
                valid: true,
                message: format!("Warning: Missing sections: {}", missing.join(", ")),
            }
        }
    }

    /// Creates the pattern directory and fills `system.md` with whatever
    /// `build` returns. Any failure removes the directory again.
    pub fn create_with<F>(&self, name: &str, build: F) -> Result<PatternValidation, PatternError>
    where
        F: FnOnce() -> Result<String, PatternError>,
    {
        validate_pattern_name(name)?;
        let dir = self.pattern_dir(name);
        if dir.exists() {
            return Err(PatternError::AlreadyExists(name.to_string()));
        }
        fs::create_dir_all(&dir).map_err(|err| io_error(&dir, err))?;

        let result = build().and_then(|content| {
            let path = dir.join(SYSTEM_FILE);
            fs::write(&path, content).map_err(|err| io_error(&path, err))
        });
        if let Err(err) = result {
            let _ = fs::remove_dir_all(&dir);
            return Err(err);
        }
        Ok(self.validate(name))
    }

    pub fn create_from_template(&self, name: &str) -> Result<PatternValidation, PatternError> {
        self.create_with(name, || Ok(MINIMAL_TEMPLATE.to_string()))
    }

    pub fn delete(&self, name: &str) -> Result<(), PatternError> {
        validate_pattern_name(name)?;
        let dir = self.pattern_dir(name);
        if !dir.exists() {
            return Err(PatternError::NotFound(name.to_string()));
        }
        fs::remove_dir_all(&dir).map_err(|err| io_error(&dir, err))
    }

    /// Replaces an existing `system.md` and re-validates the pattern.
    pub fn save_system_prompt(
        &self,
        name: &str,
        content: &str,
    ) -> Result<PatternValidation, PatternError> {
        validate_pattern_name(name)?;
        let path = self.pattern_dir(name).join(SYSTEM_FILE);
        if !path.is_file() {
            return Err(PatternError::MissingSystemFile(name.to_string()));
        }
        atomic_write_file(&path, content.as_bytes()).map_err(|err| io_error(&path, err))?;
        Ok(self.validate(name))
    }

    pub fn sections(&self, name: &str) -> Result<Vec<PatternSection>, PatternError> {
        self.system_prompt(name)?
            .map(|content| split_sections(&content))
            .ok_or_else(|| PatternError::MissingSystemFile(name.to_string()))
    }

    pub fn save_sections(
        &self,
        name: &str,
        sections: &[PatternSection],
    ) -> Result<PatternValidation, PatternError> {
        self.save_system_prompt(name, &join_sections(sections))
    }

    pub fn user_prompt(&self, name: &str) -> Result<Option<String>, PatternError> {
        validate_pattern_name(name)?;
        let path = self.pattern_dir(name).join(USER_FILE);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error(&path, err)),
        }
    }

    /// Writes `user.md`, creating it when the pattern has none yet.
    pub fn save_user_prompt(&self, name: &str, content: &str) -> Result<(), PatternError> {
        validate_pattern_name(name)?;
        let dir = self.pattern_dir(name);
        if !dir.is_dir() {
            return Err(PatternError::NotFound(name.to_string()));
        }
        let path = dir.join(USER_FILE);
        atomic_write_file(&path, content.as_bytes()).map_err(|err| io_error(&path, err))
    }

    /// Applies one field edit to many patterns. Failures are reported per
    /// pattern and never stop the batch.
    pub fn bulk_edit(&self, names: &[String], field: &str, value: &str) -> Vec<BulkEditOutcome> {
        names
            .iter()
            .map(|name| match self.edit_field(name, field, value) {
                Ok(outcome) => outcome,
                Err(err) => BulkEditOutcome::new(name, false, err.to_string()),
            })
            .collect()
    }

    pub fn bulk_update_purpose(&self, names: &[String], value: &str) -> Vec<BulkEditOutcome> {
        self.bulk_edit(names, PURPOSE_FIELD, value)
    }

    fn edit_field(
        &self,
        name: &str,
        field: &str,
        value: &str,
    ) -> Result<BulkEditOutcome, PatternError> {
        let Some(content) = self.system_prompt(name)? else {
            return Ok(BulkEditOutcome::new(name, false, "system.md not found"));
        };
        if field != PURPOSE_FIELD {
            return Ok(BulkEditOutcome::new(
                name,
                false,
                format!("Field {field} is not supported."),
            ));
        }
        let path = self.pattern_dir(name).join(SYSTEM_FILE);
        atomic_write_file(&path, rewrite_purpose(&content, value).as_bytes())
            .map_err(|err| io_error(&path, err))?;
        Ok(BulkEditOutcome::new(name, true, "Updated successfully"))
    }
}

use crate::error::{CompressionError, Result};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which kind of input the user picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    File,
    Folder,
}

/// Validate the selected input path and report whether it is a file or folder.
pub fn validate_input_path(path: Option<&Path>) -> Result<InputMode> {
    let path = match path {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => return Err(CompressionError::NoPathSelected),
    };

    if !path.exists() {
        return Err(CompressionError::FileNotFound(path.to_path_buf()));
    }

    if path.is_dir() {
        Ok(InputMode::Folder)
    } else {
        Ok(InputMode::File)
    }
}

/// Validate output directory path and create it if it doesn't exist
pub fn validate_output_dir(path: &Path) -> Result<PathBuf> {
    fs::create_dir_all(path)
        .map_err(|_| CompressionError::DirectoryCreationFailed(path.to_path_buf()))?;
    path.canonicalize()
        .map_err(|_| CompressionError::DirectoryCreationFailed(path.to_path_buf()))
}

/// A desired output size, parsed from text such as `50KB`, `1.5 MB` or `20000B`.
///
/// A bare number is read as kilobytes. Units are 1024-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSize {
    bytes: u64,
}

impl TargetSize {
    pub fn from_bytes(bytes: u64) -> Result<Self> {
        if bytes == 0 {
            return Err(CompressionError::InvalidTargetSize(
                "target size must be greater than 0".to_string(),
            ));
        }
        Ok(Self { bytes })
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

impl FromStr for TargetSize {
    type Err = CompressionError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| c.is_ascii_alphabetic())
            .unwrap_or(trimmed.len());
        let (number, unit) = trimmed.split_at(split);

        let multiplier = match unit.trim().to_uppercase().as_str() {
            "" | "K" | "KB" => 1024.0,
            "M" | "MB" => 1024.0 * 1024.0,
            "B" => 1.0,
            other => {
                return Err(CompressionError::InvalidTargetSize(format!(
                    "unknown unit '{}', use B, KB or MB",
                    other
                )))
            }
        };

        let value: f64 = number.trim().parse().map_err(|_| {
            CompressionError::InvalidTargetSize(format!("'{}' is not a number", s.trim()))
        })?;
        if !value.is_finite() || value <= 0.0 {
            return Err(CompressionError::InvalidTargetSize(
                "target size must be greater than 0".to_string(),
            ));
        }

        Self::from_bytes((value * multiplier) as u64)
    }
}

impl fmt::Display for TargetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", crate::utils::format_file_size(self.bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    #[test]
    fn test_validate_input_path_not_selected() {
        assert!(matches!(validate_input_path(None), Err(CompressionError::NoPathSelected)));
        assert!(matches!(
            validate_input_path(Some(Path::new(""))),
            Err(CompressionError::NoPathSelected)
        ));
    }

    #[test]
    fn test_validate_input_path_not_found() {
        let result = validate_input_path(Some(Path::new("nonexistent.jpg")));
        assert!(matches!(result, Err(CompressionError::FileNotFound(_))));
    }

    #[test]
    fn test_validate_input_path_modes() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.jpg");
        File::create(&file).unwrap();

        assert_eq!(validate_input_path(Some(&file)).unwrap(), InputMode::File);
        assert_eq!(validate_input_path(Some(temp_dir.path())).unwrap(), InputMode::Folder);
    }

    #[test]
    fn test_validate_output_dir_creates() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("nested").join("out");
        let resolved = validate_output_dir(&out).unwrap();
        assert!(resolved.is_dir());
    }

    #[test]
    fn test_target_size_units() {
        assert_eq!("50".parse::<TargetSize>().unwrap().bytes(), 51200);
        assert_eq!("50KB".parse::<TargetSize>().unwrap().bytes(), 51200);
        assert_eq!("50 kb".parse::<TargetSize>().unwrap().bytes(), 51200);
        assert_eq!("1.5MB".parse::<TargetSize>().unwrap().bytes(), 1_572_864);
        assert_eq!("2000B".parse::<TargetSize>().unwrap().bytes(), 2000);
    }

    #[test]
    fn test_target_size_rejects_bad_input() {
        assert!("abc".parse::<TargetSize>().is_err());
        assert!("0".parse::<TargetSize>().is_err());
        assert!("-5KB".parse::<TargetSize>().is_err());
        assert!("10GB".parse::<TargetSize>().is_err());
        assert!("".parse::<TargetSize>().is_err());
        assert!("0.0001B".parse::<TargetSize>().is_err());
    }
}

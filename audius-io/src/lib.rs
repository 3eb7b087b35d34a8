//! Thin wrappers around read/write operations. Every error carries the path it failed on, since
//! the standard messages do not say which of the config or keystore files was at fault.
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum IoError {
    #[error("File read error at path {path}")]
    FileReadError {
        #[source]
        source: std::io::Error,
        path: String,
    },

    #[error("File write error at path {path}")]
    FileWriteError {
        #[source]
        source: std::io::Error,
        path: String,
    },

    #[error("JSON parse error at path {path}")]
    SerdeJsonError {
        #[source]
        source: serde_json::Error,
        path: String,
    },

    #[error("TOML deserialize error at path {path}")]
    TomlDeError {
        #[source]
        source: toml::de::Error,
        path: String,
    },

    #[error("TOML serialize error at path {path}")]
    TomlSerError {
        #[source]
        source: toml::ser::Error,
        path: String,
    },

    #[error("Directory creation error at path {path}")]
    DirCreationError {
        #[source]
        source: std::io::Error,
        path: String,
    },
}

impl IoError {
    /// True when the underlying failure is a missing file, as opposed to a malformed one.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            IoError::FileReadError { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

fn read_string(path: &Path) -> Result<String, IoError> {
    fs::read_to_string(path)
        .map_err(|source| IoError::FileReadError { source, path: display(path) })
}

fn write_string(path: &Path, contents: String) -> Result<(), IoError> {
    fs::write(path, contents)
        .map_err(|source| IoError::FileWriteError { source, path: display(path) })
}

pub fn read_json<T: for<'a> Deserialize<'a>>(path: &Path) -> Result<T, IoError> {
    serde_json::from_str(&read_string(path)?)
        .map_err(|source| IoError::SerdeJsonError { source, path: display(path) })
}

/// Writes `data` as pretty-printed JSON.
pub fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<(), IoError> {
    let contents = serde_json::to_string_pretty(data)
        .map_err(|source| IoError::SerdeJsonError { source, path: display(path) })?;
    write_string(path, contents)
}

pub fn read_toml<T: for<'a> Deserialize<'a>>(path: &Path) -> Result<T, IoError> {
    toml::from_str(&read_string(path)?)
        .map_err(|source| IoError::TomlDeError { source, path: display(path) })
}

/// Writes `data` as TOML, creating the parent directory when it does not exist yet.
pub fn write_toml<T: Serialize>(path: &Path, data: &T) -> Result<(), IoError> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    let contents = toml::to_string(data)
        .map_err(|source| IoError::TomlSerError { source, path: display(path) })?;
    write_string(path, contents)
}

pub fn create_dir_all(path: &Path) -> Result<(), IoError> {
    fs::create_dir_all(path)
        .map_err(|source| IoError::DirCreationError { source, path: display(path) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{fs::File, io::Write};
    use tempfile::tempdir;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Endpoint {
        sp_id: u64,
        endpoint: String,
        valid: bool,
    }

    #[test]
    fn test_read_write_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("endpoints.json");

        let mut file = File::create(&path).unwrap();
        file.write_all(br#"[{"sp_id":1,"endpoint":"https://dn1.example.com","valid":true}]"#)
            .unwrap();

        let res: Vec<Endpoint> = read_json(&path).unwrap();
        assert_eq!(res.len(), 1);
        assert_eq!(res[0].endpoint, "https://dn1.example.com");

        let updated =
            vec![Endpoint { sp_id: 2, endpoint: "https://cn2.example.com".into(), valid: false }];
        write_json(&path, &updated).unwrap();

        let res: Vec<Endpoint> = read_json(&path).unwrap();
        assert_eq!(res, updated);
    }

    #[test]
    fn test_write_toml_creates_parent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let data = Endpoint { sp_id: 7, endpoint: "https://dn7.example.com".into(), valid: true };

        write_toml(&path, &data).unwrap();

        let res: Endpoint = read_toml(&path).unwrap();
        assert_eq!(res, data);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let err = read_toml::<Endpoint>(&dir.path().join("absent.toml")).unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn test_malformed_toml_is_not_not_found() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "sp_id = [").unwrap();
        let err = read_toml::<Endpoint>(&path).unwrap_err();
        assert!(!err.is_not_found());
        assert!(matches!(err, IoError::TomlDeError { .. }));
    }
}

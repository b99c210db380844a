//! Small shared helpers.

use std::path::Path;

use crate::error::{Error, Result};

/// Maximum accepted length for a secret read from disk.
const MAX_SECRET_LEN: usize = 255;

/// Read a secret (API token, SMTP password, ntfy token) from a file.
///
/// The contents are trimmed; an empty or oversized secret is a configuration
/// error and refuses startup rather than silently authenticating with a
/// broken credential.
pub fn read_secret_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let data = std::fs::read_to_string(path)?;
    let secret = data.trim();

    if secret.is_empty() {
        return Err(Error::SecretFileEmpty(path.display().to_string()));
    }

    if secret.len() > MAX_SECRET_LEN {
        return Err(Error::SecretFileTooLong {
            path: path.display().to_string(),
            max: MAX_SECRET_LEN,
        });
    }

    Ok(secret.to_string())
}

/// Render a duration as a compact human-readable string, e.g. `2h03m15s`.
pub fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    let (hours, mins, rest) = (secs / 3600, (secs % 3600) / 60, secs % 60);

    if hours > 0 {
        format!("{hours}h{mins:02}m{rest:02}s")
    } else if mins > 0 {
        format!("{mins}m{rest:02}s")
    } else {
        format!("{rest}s")
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use super::*;

    #[test]
    fn secret_file_is_trimmed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  s3cret-token  ").unwrap();

        let secret = read_secret_file(file.path()).unwrap();
        assert_eq!(secret, "s3cret-token");
    }

    #[test]
    fn empty_secret_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "   ").unwrap();

        let err = read_secret_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::SecretFileEmpty(_)));
    }

    #[test]
    fn oversized_secret_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", "x".repeat(300)).unwrap();

        let err = read_secret_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::SecretFileTooLong { .. }));
    }

    #[test]
    fn missing_secret_file_is_an_io_error() {
        let err = read_secret_file("/nonexistent/secret").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn durations_format_compactly() {
        assert_eq!(format_duration(Duration::from_secs(42)), "42s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m30s");
        assert_eq!(format_duration(Duration::from_secs(7395)), "2h03m15s");
    }
}

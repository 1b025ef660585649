use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Environment variable overriding the storage root
pub const STORAGE_ROOT_ENV: &str = "CHATVAULT_HOME";

/// Get the storage root for conversation-sets
///
/// Resolution order: `$CHATVAULT_HOME`, the platform data directory
/// (`~/.local/share/chatvault` on Linux), then `$HOME/.chatvault`.
pub fn get_storage_root() -> Result<PathBuf> {
    if let Some(root) = env::var_os(STORAGE_ROOT_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(root));
    }

    if let Some(data_dir) = dirs::data_dir() {
        return Ok(data_dir.join("chatvault"));
    }

    let home = env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".chatvault"))
}

#[cfg(test)]
mod tests {
    use std::env;

    use super::*;

    #[test]
    fn test_get_storage_root_from_override() {
        let original = env::var_os(STORAGE_ROOT_ENV);

        // SAFETY: this is the only test touching CHATVAULT_HOME and it restores the value
        unsafe {
            env::set_var(STORAGE_ROOT_ENV, "/srv/vault");
        }

        let result = get_storage_root();
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), PathBuf::from("/srv/vault"));

        unsafe {
            match original {
                Some(value) => env::set_var(STORAGE_ROOT_ENV, value),
                None => env::remove_var(STORAGE_ROOT_ENV),
            }
        }
    }
}

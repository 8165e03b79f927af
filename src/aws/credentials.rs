use std::io::{self, Write};
use std::path::{Path, PathBuf};

use ini::{EscapePolicy, Ini, ParseOption, WriteOption};
use tempfile::NamedTempFile;
use tokio::{fs, task};
use tracing::{debug, info};

use super::Credentials;
use crate::constants::{self, AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY, AWS_SESSION_TOKEN};
use crate::error::{Error, Result};

/// The shared AWS credentials file (`~/.aws/credentials`).
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location, honouring `AWS_SHARED_CREDENTIALS_FILE`.
    pub fn from_default_path() -> Result<Self> {
        constants::get_aws_credentials_path()
            .map(Self::new)
            .ok_or(Error::HomeDirNotFound)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Set the three credential keys of `profile`, leaving every other section and key as is.
    /// Values round-trip verbatim; comment lines do not survive the rewrite.
    pub async fn upsert(&self, profile: &str, creds: &Credentials) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let mut ini = self.read().await?;

        ini.with_section(Some(profile))
            .set(AWS_ACCESS_KEY_ID, &creds.access_key_id)
            .set(AWS_SECRET_ACCESS_KEY, &creds.secret_access_key)
            .set(AWS_SESSION_TOKEN, &creds.session_token);

        self.write(&ini).await?;

        info!("Credentials saved to profile: {}", profile);
        Ok(())
    }

    async fn read(&self) -> Result<Ini> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Creating new credentials file: {}", self.path.display());
                return Ok(Ini::new());
            }
            Err(e) => return Err(e.into()),
        };

        let contents = contents.strip_prefix('\u{feff}').unwrap_or(&contents);
        Ini::load_from_str_opt(contents, raw_parse_option()).map_err(|source| Error::Ini {
            path: self.path.clone(),
            source,
        })
    }

    /// Serialize the whole document to a sibling temp file, then rename it into place.
    ///
    /// The temp file is created `0600` and removed again if anything fails before the rename.
    async fn write(&self, ini: &Ini) -> Result<()> {
        let mut buf = Vec::new();
        ini.write_to_opt(&mut buf, raw_write_option())?;

        let path = self.path.clone();
        task::spawn_blocking(move || persist(&path, &buf))
            .await
            .map_err(io::Error::other)??;
        Ok(())
    }
}

fn persist(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// Comment lines are not kept: rust-ini has no comment model, so a rewrite drops them.
// Values are written back exactly as read: no quote or escape processing either way.
fn raw_parse_option() -> ParseOption {
    ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..ParseOption::default()
    }
}

fn raw_write_option() -> WriteOption {
    WriteOption {
        escape_policy: EscapePolicy::Nothing,
        kv_separator: " = ",
        ..WriteOption::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_smithy_types::DateTime;

    fn creds(suffix: &str) -> Credentials {
        Credentials {
            access_key_id: format!("ASIA{suffix}"),
            secret_access_key: format!("secret/{suffix}+="),
            session_token: format!("token//{suffix}=="),
            expiration: DateTime::from_secs(1_700_000_000),
        }
    }

    #[tokio::test]
    async fn test_upsert_preserves_other_profiles_and_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials");
        std::fs::write(
            &path,
            "[a]\naws_access_key_id = AKIAOLD\naws_secret_access_key = old/secret=\n\n\
             [b]\nregion = eu-west-1\naws_access_key_id = stale\n",
        )
        .unwrap();

        let store = ProfileStore::new(&path);
        store.upsert("b", &creds("NEW")).await.unwrap();

        let ini = Ini::load_from_file(&path).unwrap();
        let a = ini.section(Some("a")).unwrap();
        assert_eq!(a.get("aws_access_key_id"), Some("AKIAOLD"));
        assert_eq!(a.get("aws_secret_access_key"), Some("old/secret="));
        assert_eq!(a.len(), 2);

        let b = ini.section(Some("b")).unwrap();
        assert_eq!(b.get("region"), Some("eu-west-1"));
        assert_eq!(b.get("aws_access_key_id"), Some("ASIANEW"));
        assert_eq!(b.get("aws_secret_access_key"), Some("secret/NEW+="));
        assert_eq!(b.get("aws_session_token"), Some("token//NEW=="));
        assert_eq!(b.len(), 4);
    }

    #[tokio::test]
    async fn test_upsert_creates_missing_file_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".aws").join("credentials");

        let store = ProfileStore::new(&path);
        store
            .upsert("123456789012/Admin/alice", &creds("X"))
            .await
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[123456789012/Admin/alice]"));
        assert!(contents.contains("aws_session_token = token//X=="));

        let entries = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn test_upsert_keeps_values_verbatim_and_drops_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials");
        std::fs::write(
            &path,
            "# work account\n[a]\nnote = ab;cd#ef\ncredential_process = \"/bin/tool\" --x\n",
        )
        .unwrap();

        ProfileStore::new(&path)
            .upsert("b", &creds("C"))
            .await
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("note = ab;cd#ef"));
        assert!(contents.contains("credential_process = \"/bin/tool\" --x"));
        assert!(!contents.contains("# work account"));
    }

    #[tokio::test]
    async fn test_failed_rename_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // a non-empty directory in place of the file makes the final rename fail
        let path = dir.path().join("credentials");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "").unwrap();

        let mut ini = Ini::new();
        ini.with_section(Some("default"))
            .set(AWS_SESSION_TOKEN, "token//LEAK==");
        let result = ProfileStore::new(&path).write(&ini).await;

        assert!(matches!(result, Err(Error::Io(_))));
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("credentials")]);
    }

    #[tokio::test]
    async fn test_upsert_strips_byte_order_mark() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials");
        std::fs::write(&path, "\u{feff}[default]\naws_access_key_id = AKIA\n").unwrap();

        ProfileStore::new(&path)
            .upsert("work", &creds("W"))
            .await
            .unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(!bytes.starts_with(&[0xEF, 0xBB, 0xBF]));

        let ini = Ini::load_from_file(&path).unwrap();
        assert_eq!(
            ini.section(Some("default")).unwrap().get("aws_access_key_id"),
            Some("AKIA")
        );
        assert!(ini.section(Some("work")).is_some());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_upsert_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials");

        ProfileStore::new(&path)
            .upsert("default", &creds("P"))
            .await
            .unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use crate::env::load_env_files;

    fn assert_send_sync<T: Send + Sync>(_: &T) {}

    #[test]
    fn test_missing_files_are_reported_not_fatal() {
        let dir = TempDir::new().unwrap();
        let present = dir.path().join("common.env");
        let absent = dir.path().join("dev.env");
        fs::write(&present, "TAX_RECORDS_ENV_LOAD_MARKER=loaded\n").unwrap();

        let result = load_env_files(&[&present, &absent]);
        assert_send_sync(&result);

        let files = result.unwrap();
        assert_eq!(files.loaded, vec![present.display().to_string()]);
        assert_eq!(files.missing, vec![absent.display().to_string()]);
        assert_eq!(
            dotenvy::var("TAX_RECORDS_ENV_LOAD_MARKER").unwrap(),
            "loaded"
        );
    }

    #[test]
    fn test_later_files_override_earlier_ones() {
        let dir = TempDir::new().unwrap();
        let common = dir.path().join("common.env");
        let secrets = dir.path().join(".secrets.env");
        fs::write(&common, "TAX_RECORDS_ENV_OVERRIDE_MARKER=common\n").unwrap();
        fs::write(&secrets, "TAX_RECORDS_ENV_OVERRIDE_MARKER=secret\n").unwrap();

        let files = load_env_files(&[&common, &secrets]).unwrap();

        assert_eq!(files.loaded.len(), 2);
        assert!(files.missing.is_empty());
        assert_eq!(
            dotenvy::var("TAX_RECORDS_ENV_OVERRIDE_MARKER").unwrap(),
            "secret"
        );
    }
}

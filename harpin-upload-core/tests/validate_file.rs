use harpin_upload_core::config::{Settings, DEFAULT_MAX_FILE_SIZE_BYTES};
use harpin_upload_core::error::{UploadError, EXIT_USER_ERROR};
use harpin_upload_core::validate::validate_file;
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

#[tokio::test]
async fn test_accepts_readable_csv_and_reports_size() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"id,email\n1,a@example.test\n").unwrap();

    let validated = validate_file(file.path(), &Settings::default())
        .await
        .expect("file is valid");

    assert_eq!(validated.size, 25);
    assert_eq!(validated.path, file.path());
}

#[tokio::test]
async fn test_missing_file_is_a_user_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nope.csv");

    let err = validate_file(&path, &Settings::default()).await.unwrap_err();

    assert!(matches!(&err, UploadError::FileNotFound(p) if p == &path));
    assert_eq!(err.exit_code(), EXIT_USER_ERROR);
}

#[tokio::test]
async fn test_directory_is_not_a_file() {
    let dir = tempdir().unwrap();

    let err = validate_file(dir.path(), &Settings::default())
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::NotAFile(_)));
    assert_eq!(err.exit_code(), EXIT_USER_ERROR);
}

#[tokio::test]
async fn test_file_over_five_gib_is_rejected() {
    let file = NamedTempFile::new().unwrap();
    // Sparse: no blocks are written.
    file.as_file()
        .set_len(DEFAULT_MAX_FILE_SIZE_BYTES + 1)
        .unwrap();

    let err = validate_file(file.path(), &Settings::default())
        .await
        .unwrap_err();

    match &err {
        UploadError::FileTooLarge { size, limit } => {
            assert_eq!(size, "5.00 GB");
            assert_eq!(limit, "5.00 GB");
        }
        other => panic!("expected FileTooLarge, got {other:?}"),
    }
    assert_eq!(err.exit_code(), EXIT_USER_ERROR);
}

#[tokio::test]
async fn test_file_exactly_at_ceiling_is_accepted() {
    let file = NamedTempFile::new().unwrap();
    let settings = Settings {
        max_file_size: 4096,
        ..Settings::default()
    };
    file.as_file().set_len(4096).unwrap();

    let validated = validate_file(file.path(), &settings).await.unwrap();
    assert_eq!(validated.size, 4096);

    file.as_file().set_len(4097).unwrap();
    assert!(validate_file(file.path(), &settings).await.is_err());
}

#[cfg(unix)]
#[tokio::test]
async fn test_unreadable_file_is_rejected() {
    use std::os::unix::fs::PermissionsExt;

    let file = NamedTempFile::new().unwrap();
    std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o000)).unwrap();

    // Root ignores permission bits; nothing to assert there.
    if std::fs::File::open(file.path()).is_ok() {
        return;
    }

    let err = validate_file(file.path(), &Settings::default())
        .await
        .unwrap_err();
    assert!(matches!(err, UploadError::FileNotReadable(_)));
}

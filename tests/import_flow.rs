use std::io::Write;

use tempfile::NamedTempFile;
use user_upload::storage::{UserGateway, UserStore};
use user_upload::test_support::{TestDatabase, TestDatabaseError};
use user_upload::{Config, ImportOptions, Mode, Record, UploadError};

async fn provision() -> Option<TestDatabase> {
    match TestDatabase::new().await {
        Ok(db) => Some(db),
        Err(TestDatabaseError::Container(err)) => {
            eprintln!("skipping import test: container runtime unavailable: {err}");
            None
        }
        Err(err) => panic!("failed to provision test database: {err:?}"),
    }
}

fn csv_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write csv");
    file
}

fn import_config(test_db: &TestDatabase, file: &NamedTempFile, dry_run: bool) -> Config {
    Config {
        database: test_db.config().clone(),
        mode: Mode::Import(ImportOptions {
            file: file.path().to_path_buf(),
            dry_run,
            simple_names: false,
        }),
    }
}

async fn stored_rows(test_db: &TestDatabase) -> Vec<(String, String, String)> {
    let mut conn = test_db.connect().await.expect("connect");
    UserGateway::new(&mut conn)
        .list_users()
        .await
        .expect("list users")
}

async fn bootstrap(test_db: &TestDatabase) {
    let config = Config {
        database: test_db.config().clone(),
        mode: Mode::CreateTable,
    };
    user_upload::run(&config, "".as_bytes(), Vec::new())
        .await
        .expect("table created");
}

#[tokio::test]
async fn import_skips_duplicates_and_invalid_emails() {
    let Some(test_db) = provision().await else {
        return;
    };
    bootstrap(&test_db).await;

    let file = csv_file(
        "Name,Surname,Email\njane,doe,JANE@EXAMPLE.COM\njane,doe,JANE@EXAMPLE.COM\nbob,smith,not-an-email\n",
    );
    let mut output = Vec::new();
    user_upload::run(&import_config(&test_db, &file, false), "".as_bytes(), &mut output)
        .await
        .expect("import succeeds");

    assert_eq!(
        stored_rows(&test_db).await,
        vec![(
            "Jane".to_string(),
            "Doe".to_string(),
            "jane@example.com".to_string()
        )]
    );
    let output = String::from_utf8(output).expect("utf8");
    assert!(output.contains("1 inserted"));
    assert!(output.contains("1 duplicate(s)"));
    assert!(output.contains("1 invalid"));

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn dry_run_keeps_table_empty() {
    let Some(test_db) = provision().await else {
        return;
    };
    bootstrap(&test_db).await;

    let file = csv_file("a,b,a@example.com\nc,d,c@example.com\n");
    user_upload::run(&import_config(&test_db, &file, true), "".as_bytes(), Vec::new())
        .await
        .expect("dry run succeeds");

    assert!(stored_rows(&test_db).await.is_empty());

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn import_without_table_is_rejected() {
    let Some(test_db) = provision().await else {
        return;
    };

    let file = csv_file("a,b,a@example.com\n");
    for dry_run in [false, true] {
        let err = user_upload::run(&import_config(&test_db, &file, dry_run), "".as_bytes(), Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::MissingTable));
    }

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn declined_overwrite_keeps_existing_data() {
    let Some(test_db) = provision().await else {
        return;
    };
    bootstrap(&test_db).await;

    {
        let mut conn = test_db.connect().await.expect("connect");
        let ann = Record::build("ann", "lee", "ann@example.com", false).expect("valid");
        UserGateway::new(&mut conn)
            .insert_user(&ann, false)
            .await
            .expect("insert");
    }

    let config = Config {
        database: test_db.config().clone(),
        mode: Mode::CreateTable,
    };
    let mut output = Vec::new();
    user_upload::run(&config, "no\n".as_bytes(), &mut output)
        .await
        .expect("declining is not an error");

    let output = String::from_utf8(output).expect("utf8");
    assert!(output.contains("No changes have been made, Exiting"));
    assert_eq!(stored_rows(&test_db).await.len(), 1);

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn missing_file_fails_before_connecting() {
    let config = Config {
        database: user_upload::DatabaseConfig {
            username: "root".to_string(),
            password: String::new(),
            host: "127.0.0.1".to_string(),
            port: 1,
            database: "catalystUsers".to_string(),
        },
        mode: Mode::Import(ImportOptions {
            file: "/nonexistent/users.csv".into(),
            dry_run: false,
            simple_names: false,
        }),
    };

    let err = user_upload::run(&config, "".as_bytes(), Vec::new())
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::UnreadableFile { .. }));
}

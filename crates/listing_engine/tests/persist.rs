mod support;

use std::fs;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use listing_core::{ListingRecord, MetadataField};
use listing_engine::{
    ensure_output_dir, AtomicFileWriter, PersistError, PersistOutcome, PersistenceEngine,
};
use pretty_assertions::assert_eq;
use support::{snapshot, StaticImages};
use tempfile::TempDir;

fn listing(title: &str, price: &str, pictures: &[&str]) -> ListingRecord {
    ListingRecord::new(
        [
            (MetadataField::Title, title),
            (MetadataField::CategoryName, "Clothing, Shoes & Accessories"),
            (MetadataField::StartPrice, price),
            (MetadataField::Quantity, "1"),
        ],
        pictures.iter().map(|url| url.to_string()).collect(),
    )
}

fn engine(root: &TempDir, images: Arc<StaticImages>) -> PersistenceEngine {
    PersistenceEngine::new(root.path().to_path_buf(), images)
}

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("out");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing_file() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().join("listing"));

    let first = writer.write("metadata.txt", "Title: A\n").unwrap();
    let second = writer.write("metadata.txt", "Title: B\n").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "Title: B\n");
    assert_eq!(fs::read_dir(writer.dir()).unwrap().count(), 1);
}

#[test]
fn writer_fails_when_directory_is_a_file() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    assert!(matches!(
        writer.write("metadata.txt", "data"),
        Err(PersistError::OutputDir(_))
    ));
}

#[tokio::test]
async fn new_listing_writes_metadata_and_png_images() {
    let root = TempDir::new().unwrap();
    let images = Arc::new(StaticImages::new());
    let mut engine = engine(&root, images.clone());

    let outcome = engine
        .persist(&listing(
            "Test Item",
            "10.00",
            &["https://i.example/a.webp", "https://i.example/b.jpg"],
        ))
        .await
        .unwrap();

    let dir = root.path().join("Clothing").join("test_item");
    assert_eq!(
        outcome,
        PersistOutcome::Persisted {
            directory: dir.clone(),
            images_saved: 2,
            images_reused: 0,
            images_failed: 0,
        }
    );
    assert_eq!(
        fs::read_to_string(dir.join("metadata.txt")).unwrap(),
        "Title: Test Item\n\
         CategoryName: Clothing, Shoes & Accessories\n\
         StartPrice: 10.00\n\
         Quantity: 1\n"
    );
    for name in ["test_item0.png", "test_item1.png"] {
        let bytes = fs::read(dir.join(name)).unwrap();
        let format = image::guess_format(&bytes).unwrap();
        assert_eq!(format, image::ImageFormat::Png);
    }
    assert_eq!(images.calls(), 2);
}

#[tokio::test]
async fn content_equal_listing_is_skipped_and_disk_is_unchanged() {
    let root = TempDir::new().unwrap();
    let images = Arc::new(StaticImages::new());
    let mut engine = engine(&root, images.clone());
    let record = listing("Test Item", "10.00", &["https://i.example/a.jpg"]);

    engine.persist(&record).await.unwrap();
    let before = snapshot(root.path());

    // Same metadata, re-hosted picture: still the same listing.
    let rehosted = ListingRecord::new(
        record.metadata().clone(),
        vec!["https://cdn.example/a.jpg".to_string()],
    );
    let outcome = engine.persist(&rehosted).await.unwrap();

    assert_eq!(
        outcome,
        PersistOutcome::Skipped {
            directory: root.path().join("Clothing").join("test_item")
        }
    );
    assert_eq!(snapshot(root.path()), before);
    assert_eq!(images.calls(), 1);
    assert!(engine.collisions().is_empty());
}

#[tokio::test]
async fn same_title_different_content_gets_its_own_directory() {
    let root = TempDir::new().unwrap();
    let mut engine = engine(&root, Arc::new(StaticImages::new()));
    let cheap = listing("Test Item", "10.00", &[]);
    let dear = listing("Test Item", "12.00", &[]);

    engine.persist(&cheap).await.unwrap();
    let outcome = engine.persist(&dear).await.unwrap();

    let category = root.path().join("Clothing");
    assert!(matches!(
        outcome,
        PersistOutcome::Persisted { ref directory, .. } if *directory == category.join("test_item_1")
    ));
    let stored_cheap =
        fs::read_to_string(category.join("test_item").join("metadata.txt")).unwrap();
    let stored_dear =
        fs::read_to_string(category.join("test_item_1").join("metadata.txt")).unwrap();
    assert_eq!(ListingRecord::from_metadata_text(&stored_cheap), cheap);
    assert_eq!(ListingRecord::from_metadata_text(&stored_dear), dear);
    assert_eq!(engine.collisions(), vec![("test_item".to_string(), 2)]);
}

#[tokio::test]
async fn rerun_is_byte_identical_and_reuses_images() {
    let root = TempDir::new().unwrap();
    let record = listing("Test Item", "10.00", &["https://i.example/a.jpg"]);

    let first_images = Arc::new(StaticImages::new());
    engine(&root, first_images.clone())
        .persist(&record)
        .await
        .unwrap();
    let before = snapshot(root.path());

    let second_images = Arc::new(StaticImages::new());
    let outcome = engine(&root, second_images.clone())
        .persist(&record)
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        PersistOutcome::Persisted {
            images_saved: 0,
            images_reused: 1,
            ..
        }
    ));
    assert_eq!(snapshot(root.path()), before);
    assert_eq!(second_images.calls(), 0);
}

#[tokio::test]
async fn broken_image_does_not_block_metadata_or_other_images() {
    let root = TempDir::new().unwrap();
    let images = Arc::new(StaticImages::with_broken("https://i.example/gone.jpg"));
    let mut engine = engine(&root, images);

    let outcome = engine
        .persist(&listing(
            "Lamp",
            "5.00",
            &["https://i.example/gone.jpg", "https://i.example/ok.jpg"],
        ))
        .await
        .unwrap();

    let dir = root.path().join("Clothing").join("lamp");
    assert!(matches!(
        outcome,
        PersistOutcome::Persisted {
            images_saved: 1,
            images_failed: 1,
            ..
        }
    ));
    assert!(dir.join("metadata.txt").is_file());
    assert!(!dir.join("lamp0.png").exists());
    assert!(dir.join("lamp1.png").is_file());
}

#[tokio::test]
async fn listing_without_title_or_category_is_rejected() {
    let root = TempDir::new().unwrap();
    let mut engine = engine(&root, Arc::new(StaticImages::new()));

    let untitled = ListingRecord::new([(MetadataField::CategoryName, "Books")], Vec::new());
    let symbols_only = ListingRecord::new(
        [
            (MetadataField::Title, "!!!"),
            (MetadataField::CategoryName, "Books"),
        ],
        Vec::new(),
    );
    let uncategorized = ListingRecord::new([(MetadataField::Title, "Lamp")], Vec::new());

    for (record, field) in [
        (untitled, MetadataField::Title),
        (symbols_only, MetadataField::Title),
        (uncategorized, MetadataField::CategoryName),
    ] {
        match engine.persist(&record).await {
            Err(PersistError::MissingRequiredField(missing)) => assert_eq!(missing, field),
            other => panic!("expected missing {field}, got {other:?}"),
        }
    }
    assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    assert!(engine.index().is_empty());
}

#[tokio::test]
async fn unwritable_category_is_a_failed_outcome() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("Clothing"), "occupied").unwrap();
    let mut engine = engine(&root, Arc::new(StaticImages::new()));

    let outcome = engine
        .persist(&listing("Test Item", "10.00", &[]))
        .await
        .unwrap();

    assert!(matches!(outcome, PersistOutcome::Failed(_)));
    assert!(engine.index().is_empty());
}

fn file_names(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn changed_listing_on_rerun_drops_old_pictures() {
    let root = TempDir::new().unwrap();
    let old = listing(
        "Lamp",
        "5.00",
        &["https://i.example/1.jpg", "https://i.example/2.jpg", "https://i.example/3.jpg"],
    );
    engine(&root, Arc::new(StaticImages::new()))
        .persist(&old)
        .await
        .unwrap();

    let new = listing("Lamp", "9.00", &["https://i.example/9.jpg"]);
    let outcome = engine(&root, Arc::new(StaticImages::new()))
        .persist(&new)
        .await
        .unwrap();

    let dir = root.path().join("Clothing").join("lamp");
    assert!(matches!(
        outcome,
        PersistOutcome::Persisted {
            images_saved: 1,
            images_reused: 0,
            ..
        }
    ));
    assert_eq!(file_names(&dir), vec!["lamp0.png", "metadata.txt"]);
    assert_eq!(
        ListingRecord::from_metadata_text(&fs::read_to_string(dir.join("metadata.txt")).unwrap()),
        new
    );
}

#[tokio::test]
async fn changed_listing_whose_pictures_fail_keeps_none_of_the_old_ones() {
    let root = TempDir::new().unwrap();
    engine(&root, Arc::new(StaticImages::new()))
        .persist(&listing("Lamp", "5.00", &["https://i.example/1.jpg"]))
        .await
        .unwrap();

    let images = Arc::new(StaticImages::with_broken("https://i.example/gone.jpg"));
    engine(&root, images)
        .persist(&listing("Lamp", "9.00", &["https://i.example/gone.jpg"]))
        .await
        .unwrap();

    let dir = root.path().join("Clothing").join("lamp");
    assert_eq!(file_names(&dir), vec!["metadata.txt"]);
}

#[tokio::test]
async fn unchanged_listing_with_fewer_pictures_drops_the_extra_ones() {
    let root = TempDir::new().unwrap();
    engine(&root, Arc::new(StaticImages::new()))
        .persist(&listing(
            "Lamp",
            "5.00",
            &["https://i.example/1.jpg", "https://i.example/2.jpg"],
        ))
        .await
        .unwrap();

    let images = Arc::new(StaticImages::new());
    let outcome = engine(&root, images.clone())
        .persist(&listing("Lamp", "5.00", &["https://i.example/1.jpg"]))
        .await
        .unwrap();

    let dir = root.path().join("Clothing").join("lamp");
    assert!(matches!(
        outcome,
        PersistOutcome::Persisted {
            images_saved: 0,
            images_reused: 1,
            ..
        }
    ));
    assert_eq!(images.calls(), 0);
    assert_eq!(file_names(&dir), vec!["lamp0.png", "metadata.txt"]);
}

#[tokio::test]
async fn unchanged_metadata_is_not_rewritten() {
    let root = TempDir::new().unwrap();
    let record = listing("Lamp", "5.00", &[]);
    engine(&root, Arc::new(StaticImages::new()))
        .persist(&record)
        .await
        .unwrap();

    let metadata_path = root.path().join("Clothing/lamp/metadata.txt");
    let long_ago = SystemTime::UNIX_EPOCH + Duration::from_secs(86_400);
    fs::File::options()
        .write(true)
        .open(&metadata_path)
        .unwrap()
        .set_modified(long_ago)
        .unwrap();

    engine(&root, Arc::new(StaticImages::new()))
        .persist(&record)
        .await
        .unwrap();

    assert_eq!(
        fs::metadata(&metadata_path).unwrap().modified().unwrap(),
        long_ago
    );
}

#[test]
fn atomic_write_over_existing_file_keeps_single_entry() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());
    fs::write(temp.path().join("lamp0.png"), b"old").unwrap();

    writer.write_bytes("lamp0.png", b"new").unwrap();

    assert_eq!(fs::read(temp.path().join("lamp0.png")).unwrap(), b"new");
    assert_eq!(file_names(temp.path()), vec!["lamp0.png"]);
}

//! Unit-level coverage of the pure helpers: image type negotiation, filename
//! derivation, listing order, pagination arithmetic, and JSON shapes.

use petition_api::handlers::{SortMode, is_valid_email, paginate, sort_petitions};
use petition_api::models::{PetitionOverview, UserProfile};
use petition_api::photos::{FsPhotoStore, ImageType, PhotoStore, derive_filename};

#[test]
fn image_type_from_content_type() {
    assert_eq!(ImageType::from_content_type("image/png"), Some(ImageType::Png));
    assert_eq!(ImageType::from_content_type("image/jpeg"), Some(ImageType::Jpeg));
    assert_eq!(ImageType::from_content_type("image/gif"), Some(ImageType::Gif));

    // Case and surrounding whitespace are forgiven.
    assert_eq!(ImageType::from_content_type("IMAGE/PNG"), Some(ImageType::Png));
    assert_eq!(ImageType::from_content_type(" image/gif "), Some(ImageType::Gif));

    // Everything else is refused.
    assert_eq!(ImageType::from_content_type("image/webp"), None);
    assert_eq!(ImageType::from_content_type("text/plain"), None);
    assert_eq!(ImageType::from_content_type(""), None);
}

#[test]
fn image_type_from_filename() {
    assert_eq!(ImageType::from_filename("user_1.png"), Some(ImageType::Png));
    assert_eq!(ImageType::from_filename("user_1.jpeg"), Some(ImageType::Jpeg));
    // Legacy short extension maps to the same type.
    assert_eq!(ImageType::from_filename("user_1.jpg"), Some(ImageType::Jpeg));
    assert_eq!(ImageType::from_filename("petition_2.gif"), Some(ImageType::Gif));
    assert_eq!(ImageType::from_filename("user_1.bmp"), None);
    assert_eq!(ImageType::from_filename("no_extension"), None);
}

#[test]
fn filenames_are_derived_from_entity_and_id() {
    assert_eq!(derive_filename("user", 7, ImageType::Png), "user_7.png");
    assert_eq!(derive_filename("petition", 12, ImageType::Jpeg), "petition_12.jpeg");
    assert_eq!(derive_filename("petition", 3, ImageType::Gif), "petition_3.gif");
}

#[test]
fn email_shape_check() {
    assert!(is_valid_email("alice@example.com"));
    assert!(is_valid_email("a@b"));

    assert!(!is_valid_email("plainaddress"));
    assert!(!is_valid_email("@example.com"));
    assert!(!is_valid_email("alice@"));
    assert!(!is_valid_email("alice @example.com"));
    assert!(!is_valid_email(""));
}

#[test]
fn sort_mode_parse_is_case_insensitive() {
    assert_eq!(SortMode::parse("ALPHABETICAL_ASC"), Some(SortMode::AlphabeticalAsc));
    assert_eq!(SortMode::parse("alphabetical_desc"), Some(SortMode::AlphabeticalDesc));
    assert_eq!(SortMode::parse("Signatures_Asc"), Some(SortMode::SignaturesAsc));
    assert_eq!(SortMode::parse("SIGNATURES_DESC"), Some(SortMode::SignaturesDesc));
    assert_eq!(SortMode::parse("NEWEST"), None);
    assert_eq!(SortMode::parse(""), None);
}

fn overview(petition_id: i64, title: &str, signature_count: i64) -> PetitionOverview {
    PetitionOverview {
        petition_id,
        title: title.to_string(),
        signature_count,
        ..Default::default()
    }
}

#[test]
fn sorting_is_a_total_order_with_id_tiebreak() {
    // Two petitions share a title and two share a count, so every mode has a tie.
    let fixture = vec![
        overview(3, "Ban Plastic", 5),
        overview(1, "Cut Emissions", 5),
        overview(2, "Ban Plastic", 0),
    ];

    let mut rows = fixture.clone();
    sort_petitions(&mut rows, SortMode::AlphabeticalAsc);
    assert_eq!(rows.iter().map(|p| p.petition_id).collect::<Vec<_>>(), vec![2, 3, 1]);

    let mut rows = fixture.clone();
    sort_petitions(&mut rows, SortMode::AlphabeticalDesc);
    assert_eq!(rows.iter().map(|p| p.petition_id).collect::<Vec<_>>(), vec![1, 2, 3]);

    let mut rows = fixture.clone();
    sort_petitions(&mut rows, SortMode::SignaturesAsc);
    assert_eq!(rows.iter().map(|p| p.petition_id).collect::<Vec<_>>(), vec![2, 1, 3]);

    let mut rows = fixture.clone();
    sort_petitions(&mut rows, SortMode::SignaturesDesc);
    assert_eq!(rows.iter().map(|p| p.petition_id).collect::<Vec<_>>(), vec![1, 3, 2]);

    // The tie-break makes repeated sorts deterministic.
    let mut again = fixture.clone();
    sort_petitions(&mut again, SortMode::SignaturesDesc);
    assert_eq!(
        again.iter().map(|p| p.petition_id).collect::<Vec<_>>(),
        rows.iter().map(|p| p.petition_id).collect::<Vec<_>>()
    );
}

#[test]
fn pagination_window_arithmetic() {
    let rows: Vec<i64> = (1..=5).collect();

    // startIndex=N, count=M over K items yields max(0, min(M, K - N)).
    assert_eq!(paginate(rows.clone(), None, None), vec![1, 2, 3, 4, 5]);
    assert_eq!(paginate(rows.clone(), Some(2), None), vec![3, 4, 5]);
    assert_eq!(paginate(rows.clone(), None, Some(2)), vec![1, 2]);
    assert_eq!(paginate(rows.clone(), Some(1), Some(2)), vec![2, 3]);
    assert_eq!(paginate(rows.clone(), Some(4), Some(10)), vec![5]);
    assert_eq!(paginate(rows.clone(), Some(5), None), Vec::<i64>::new());
    assert_eq!(paginate(rows.clone(), Some(99), Some(1)), Vec::<i64>::new());
    assert_eq!(paginate(rows, None, Some(0)), Vec::<i64>::new());
}

#[test]
fn user_profile_omits_email_unless_present() {
    let anonymous_view = UserProfile {
        name: "Alice".to_string(),
        city: Some("Christchurch".to_string()),
        country: None,
        email: None,
    };
    let json = serde_json::to_value(&anonymous_view).unwrap();
    assert!(json.get("email").is_none());
    assert_eq!(json["name"], "Alice");
    // Absent optional location fields serialize as null rather than vanishing.
    assert!(json["country"].is_null());

    let self_view = UserProfile {
        email: Some("alice@example.com".to_string()),
        ..anonymous_view
    };
    let json = serde_json::to_value(&self_view).unwrap();
    assert_eq!(json["email"], "alice@example.com");
}

#[test]
fn listing_rows_serialize_in_camel_case() {
    let row = overview(1, "Ban Plastic", 4);
    let json = serde_json::to_value(&row).unwrap();
    assert_eq!(json["petitionId"], 1);
    assert_eq!(json["signatureCount"], 4);
    assert!(json.get("petition_id").is_none());
}

#[tokio::test]
async fn fs_photo_store_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsPhotoStore::new(dir.path());
    store.ensure_dir_exists().await.unwrap();

    // Missing file reads as None and removes as a no-op.
    assert_eq!(store.read("user_1.png").await.unwrap(), None);
    store.remove("user_1.png").await.unwrap();

    store.write("user_1.png", b"pixels").await.unwrap();
    assert_eq!(store.read("user_1.png").await.unwrap().as_deref(), Some(&b"pixels"[..]));

    store.remove("user_1.png").await.unwrap();
    assert_eq!(store.read("user_1.png").await.unwrap(), None);
}

#[tokio::test]
async fn fs_photo_store_confines_paths_to_its_directory() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsPhotoStore::new(dir.path());
    store.ensure_dir_exists().await.unwrap();

    // A hostile stored filename is flattened to its last real segment.
    store.write("../../escape.png", b"pixels").await.unwrap();
    assert_eq!(
        store.read("escape.png").await.unwrap().as_deref(),
        Some(&b"pixels"[..])
    );
    assert!(!dir.path().join("../../escape.png").exists());
}

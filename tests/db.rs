mod common;

use kkn_site::helper::form_helpers::{validate_comment, validate_post, PostFields};
use kkn_site::models::db_operations::media_db_operations;
use kkn_site::models::db_operations::posts_db_operations::{self, PostFilter};
use kkn_site::models::db_operations::{comments_db_operations, programs_db_operations, stats_db_operations};
use kkn_site::models::{CommentStatus, NewMedia, PostStatus, ProgramInput, ProgramStatus, Role};

#[test]
fn test_creates_schema_and_default_settings() {
    let test_db = common::TestDb::new();
    let conn = test_db.pool().get().unwrap();
    let settings = kkn_site::helper::admin_helpers::get_settings(&conn);
    assert_eq!(settings.max_file_upload_size_mb, "5");
    assert!(settings.allowed_mime_types.contains("image/png"));
}

#[test]
fn test_published_posts_are_filtered_by_title_and_category() {
    let test_db = common::TestDb::new();
    let pool = test_db.pool();
    let author = common::create_profile(&pool, "Admin", "admin@kkn.id", Role::Admin);
    let kegiatan = common::create_category(&pool, "Kegiatan");
    let berita = common::create_category(&pool, "Berita");

    common::create_post(&pool, &author, "Kerja Bakti Desa", PostStatus::Published, Some(&kegiatan));
    common::create_post(&pool, &author, "Rapat Desa", PostStatus::Published, Some(&berita));
    common::create_post(&pool, &author, "Draf Desa", PostStatus::Draft, Some(&kegiatan));

    let conn = pool.get().unwrap();
    let filter = PostFilter {
        status: Some(PostStatus::Published),
        title_query: Some("desa".to_string()),
        ..PostFilter::default()
    };
    let titles: Vec<String> = posts_db_operations::read_posts(&conn, &filter)
        .unwrap()
        .into_iter()
        .map(|p| p.title)
        .collect();
    assert_eq!(titles, vec!["Rapat Desa".to_string(), "Kerja Bakti Desa".to_string()]);

    let filter = PostFilter {
        status: Some(PostStatus::Published),
        category_id: Some(kegiatan),
        ..PostFilter::default()
    };
    let posts = posts_db_operations::read_posts(&conn, &filter).unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].category_name.as_deref(), Some("Kegiatan"));
}

#[test]
fn test_title_search_treats_wildcards_literally() {
    let test_db = common::TestDb::new();
    let pool = test_db.pool();
    let author = common::create_profile(&pool, "Admin", "admin@kkn.id", Role::Admin);

    common::create_post(&pool, &author, "Diskon 100%", PostStatus::Published, None);
    common::create_post(&pool, &author, "Diskon 1000", PostStatus::Published, None);
    common::create_post(&pool, &author, "kode_desa", PostStatus::Published, None);
    common::create_post(&pool, &author, "kode desa", PostStatus::Published, None);

    let conn = pool.get().unwrap();
    let search = |query: &str| -> Vec<String> {
        let filter = PostFilter {
            title_query: Some(query.to_string()),
            ..PostFilter::default()
        };
        posts_db_operations::read_posts(&conn, &filter)
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect()
    };

    assert_eq!(search("100%"), vec!["Diskon 100%".to_string()]);
    assert_eq!(search("_"), vec!["kode_desa".to_string()]);
    assert!(search("\\").is_empty());
}

#[test]
fn test_ampersand_title_round_trips_unchanged() {
    let test_db = common::TestDb::new();
    let pool = test_db.pool();
    let author = common::create_profile(&pool, "Admin", "admin@kkn.id", Role::Admin);
    let category = common::create_category(&pool, "Kegiatan");

    let fields = PostFields {
        title: "Rust & Actix".to_string(),
        content: "Isi".to_string(),
        category_id: Some(category),
        ..PostFields::default()
    };
    let input = validate_post(&fields, None).unwrap();
    let conn = pool.get().unwrap();
    let id = posts_db_operations::create_post(&conn, &input, &author).unwrap();

    let post = posts_db_operations::read_post(&conn, &id).unwrap().unwrap();
    assert_eq!(post.title, "Rust & Actix");
    assert_eq!(post.slug, "rust-actix");
    let found = posts_db_operations::read_published_post_by_slug(&conn, "rust-actix").unwrap();
    assert!(found.is_some());
}

#[test]
fn test_gallery_filters_by_category_newest_first() {
    let test_db = common::TestDb::new();
    let pool = test_db.pool();
    let uploader = common::create_profile(&pool, "Admin", "admin@kkn.id", Role::Admin);
    let kegiatan = common::create_category(&pool, "Kegiatan");
    let conn = pool.get().unwrap();

    let insert = |name: &str, category: Option<&str>| {
        media_db_operations::create_media(
            &conn,
            &NewMedia {
                filename: name.to_string(),
                storage_key: format!("media/{}", name),
                url: format!("/media/media/{}", name),
                alt_text: None,
                category_id: category.map(str::to_string),
                uploaded_by: uploader.clone(),
            },
        )
        .unwrap()
    };
    insert("a.png", Some(&kegiatan));
    insert("b.png", None);
    insert("c.png", Some(&kegiatan));

    let filtered: Vec<String> = media_db_operations::read_media_list(&conn, Some(&kegiatan), None)
        .unwrap()
        .into_iter()
        .map(|m| m.filename)
        .collect();
    assert_eq!(filtered, vec!["c.png".to_string(), "a.png".to_string()]);

    // A blank category means "all".
    assert_eq!(media_db_operations::read_media_list(&conn, Some(""), None).unwrap().len(), 3);
    assert_eq!(media_db_operations::read_media_list(&conn, None, Some(2)).unwrap().len(), 2);
}

#[test]
fn test_approving_comment_only_changes_status() {
    let test_db = common::TestDb::new();
    let pool = test_db.pool();
    let author_id = common::create_profile(&pool, "Sari", "sari@kkn.id", Role::Member);
    let post_id = common::create_post(&pool, &author_id, "Posyandu", PostStatus::Published, None);
    let conn = pool.get().unwrap();

    let author = kkn_site::models::db_operations::profiles_db_operations::read_profile(&conn, &author_id)
        .unwrap()
        .unwrap();
    let comment = validate_comment(Some(&author), &post_id, "Mantap!").unwrap();
    let id = comments_db_operations::create_comment(&conn, &comment).unwrap();

    let before = comments_db_operations::read_comment(&conn, &id).unwrap().unwrap();
    assert_eq!(before.status, CommentStatus::Pending);
    assert!(comments_db_operations::read_approved_comments(&conn, &post_id).unwrap().is_empty());

    assert_eq!(comments_db_operations::approve_comment(&conn, &id).unwrap(), 1);
    let after = comments_db_operations::read_comment(&conn, &id).unwrap().unwrap();
    assert_eq!(after.status, CommentStatus::Approved);
    assert_eq!(after.content, before.content);
    assert_eq!(after.author_name, before.author_name);
    assert_eq!(after.created_at, before.created_at);
    assert_eq!(comments_db_operations::read_approved_comments(&conn, &post_id).unwrap().len(), 1);
}

#[test]
fn test_deleting_post_removes_its_comments() {
    let test_db = common::TestDb::new();
    let pool = test_db.pool();
    let author_id = common::create_profile(&pool, "Sari", "sari@kkn.id", Role::Member);
    let post_id = common::create_post(&pool, &author_id, "Posyandu", PostStatus::Published, None);
    let conn = pool.get().unwrap();
    let author = kkn_site::models::db_operations::profiles_db_operations::read_profile(&conn, &author_id)
        .unwrap()
        .unwrap();
    let comment = validate_comment(Some(&author), &post_id, "Hadir").unwrap();
    comments_db_operations::create_comment(&conn, &comment).unwrap();

    assert_eq!(posts_db_operations::delete_post(&conn, &post_id).unwrap(), 1);
    assert!(comments_db_operations::read_all_comments(&conn).unwrap().is_empty());
}

#[test]
fn test_stats_are_derived_from_data() {
    let test_db = common::TestDb::new();
    let pool = test_db.pool();
    let admin = common::create_profile(&pool, "Admin", "admin@kkn.id", Role::Admin);
    common::create_profile(&pool, "Budi", "budi@kkn.id", Role::Member);
    common::create_profile(&pool, "Sari", "sari@kkn.id", Role::Member);
    common::create_post(&pool, &admin, "Terbit", PostStatus::Published, None);
    common::create_post(&pool, &admin, "Draf", PostStatus::Draft, None);

    let conn = pool.get().unwrap();
    let program = ProgramInput {
        title: "Bank Sampah".to_string(),
        description: None,
        start_date: common::date(2025, 7, 22),
        end_date: None,
        status: ProgramStatus::Ongoing,
    };
    programs_db_operations::create_program(&conn, &program, &admin).unwrap();

    let stats =
        stats_db_operations::read_site_stats(&conn, common::date(2025, 7, 21), common::date(2025, 8, 20)).unwrap();
    assert_eq!(stats.total_members, 2);
    assert_eq!(stats.total_posts, 1);
    assert_eq!(stats.total_programs, 1);
    assert_eq!(stats.total_media, 0);
    assert_eq!(stats.total_days, 30);

    let counts = stats_db_operations::read_dashboard_counts(&conn).unwrap();
    assert_eq!(counts.posts, 2);
    assert_eq!(counts.profiles, 3);
}

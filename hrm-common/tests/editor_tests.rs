//! Setting management against an in-memory database.

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use hrm_common::db;
use hrm_common::params::{FieldMap, ParamName};
use hrm_common::setting::TEMPLATE_OWNER;
use hrm_common::{Setting, SettingEditor, SettingKind};

async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("connect to in-memory database");
    db::init_tables(&pool).await.expect("create tables");
    pool
}

fn editor(pool: &SqlitePool, owner: &str) -> SettingEditor {
    SettingEditor::new(pool.clone(), owner, SettingKind::Image)
}

/// Create, persist and select a setting, the way the wizard's final
/// save would.
async fn create_saved(editor: &mut SettingEditor, pool: &SqlitePool, name: &str) -> Setting {
    let mut setting = editor.create_new_setting(name).await.unwrap().unwrap();
    assert!(setting.save(pool).await);
    assert!(editor.select(name).await.unwrap());
    setting
}

#[tokio::test]
async fn new_settings_are_not_listed_until_saved() {
    let pool = test_pool().await;
    let mut editor = editor(&pool, "alice");

    let mut setting = editor.create_new_setting("draft").await.unwrap().unwrap();
    assert_eq!(setting.name(), "draft");
    assert!(editor.settings().await.unwrap().is_empty());
    assert_eq!(editor.selected(), None);

    assert!(setting.save(&pool).await);
    let names: Vec<String> = editor
        .settings()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, ["draft"]);
}

#[tokio::test]
async fn created_settings_are_listed_in_name_order() {
    let pool = test_pool().await;
    let mut editor = editor(&pool, "alice");

    create_saved(&mut editor, &pool, "zebra").await;
    create_saved(&mut editor, &pool, "apple").await;
    create_saved(&mut editor, &pool, "mango").await;

    let names: Vec<String> = editor
        .settings()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, ["apple", "mango", "zebra"]);
    assert_eq!(editor.selected(), Some("mango"));
}

#[tokio::test]
async fn duplicate_names_are_rejected_with_a_message() {
    let pool = test_pool().await;
    let mut editor = editor(&pool, "alice");

    create_saved(&mut editor, &pool, "confocal").await;
    let second = editor.create_new_setting("confocal").await.unwrap();
    assert!(second.is_none());
    assert!(editor.message().contains("already exists"));
    assert_eq!(editor.settings().await.unwrap().len(), 1);
}

#[tokio::test]
async fn invalid_names_are_rejected() {
    let pool = test_pool().await;
    let mut editor = editor(&pool, "alice");

    assert!(editor.create_new_setting("   ").await.unwrap().is_none());
    assert!(editor.message().contains("cannot be empty"));

    assert!(editor
        .create_new_setting("bad/name")
        .await
        .unwrap()
        .is_none());
    assert!(editor.message().contains("only letters"));
}

#[tokio::test]
async fn marking_a_default_clears_the_previous_one() {
    let pool = test_pool().await;
    let mut editor = editor(&pool, "alice");

    create_saved(&mut editor, &pool, "first").await;
    create_saved(&mut editor, &pool, "second").await;

    editor.select("first").await.unwrap();
    assert!(editor.make_selected_setting_default().await.unwrap());
    editor.select("second").await.unwrap();
    assert!(editor.make_selected_setting_default().await.unwrap());

    let rows = editor.settings().await.unwrap();
    let defaults: Vec<&str> = rows
        .iter()
        .filter(|r| r.standard)
        .map(|r| r.name.as_str())
        .collect();
    assert_eq!(defaults, ["second"]);
}

#[tokio::test]
async fn deleting_without_a_selection_is_a_refused_no_op() {
    let pool = test_pool().await;
    let mut editor = editor(&pool, "alice");
    create_saved(&mut editor, &pool, "keep me").await;
    editor.restore_selection(None);

    assert!(!editor.delete_selected_setting().await.unwrap());
    assert!(editor.message().contains("select a setting"));
    assert_eq!(editor.settings().await.unwrap().len(), 1);
}

#[tokio::test]
async fn deleting_the_selected_setting_clears_the_selection() {
    let pool = test_pool().await;
    let mut editor = editor(&pool, "alice");
    create_saved(&mut editor, &pool, "short lived").await;

    assert!(editor.delete_selected_setting().await.unwrap());
    assert_eq!(editor.selected(), None);
    assert!(editor.settings().await.unwrap().is_empty());
}

#[tokio::test]
async fn copying_preserves_parameter_values() {
    let pool = test_pool().await;
    let mut editor = editor(&pool, "alice");

    let mut setting = editor.create_new_setting("original").await.unwrap().unwrap();
    let posted = FieldMap::from_pairs([
        ("ImageFileFormat", "lsm"),
        ("NumberOfChannels", "2"),
        ("PointSpreadFunction", "theoretical"),
    ]);
    assert!(setting.check_posted_image_parameters(&posted));
    assert!(setting.save(&pool).await);
    assert!(editor.select("original").await.unwrap());

    assert!(editor.copy_selected_setting("duplicate").await.unwrap());
    let copy = editor.setting("duplicate").await.unwrap().unwrap();
    assert_eq!(
        copy.parameter(ParamName::ImageFileFormat).unwrap().as_str(),
        Some("lsm")
    );
    assert_eq!(copy.number_of_channels(), 2);
    assert_eq!(editor.selected(), Some("duplicate"));
}

#[tokio::test]
async fn template_copies_get_a_numeric_suffix_when_the_name_is_taken() {
    let pool = test_pool().await;

    let mut template = Setting::new(SettingKind::Image);
    template.set_name("widefield standard");
    template.set_owner(TEMPLATE_OWNER);
    assert!(template.save(&pool).await);

    let mut editor = editor(&pool, "alice");
    create_saved(&mut editor, &pool, "widefield standard").await;

    assert!(editor.copy_public_setting("widefield standard").await.unwrap());
    assert_eq!(editor.selected(), Some("widefield standard_1"));

    assert!(editor.copy_public_setting("widefield standard").await.unwrap());
    assert_eq!(editor.selected(), Some("widefield standard_2"));
}

#[tokio::test]
async fn copying_an_unknown_template_is_refused() {
    let pool = test_pool().await;
    let mut editor = editor(&pool, "alice");
    assert!(!editor.copy_public_setting("no such template").await.unwrap());
    assert!(editor.message().contains("does not exist"));
}

#[tokio::test]
async fn stale_selections_are_dropped_on_load() {
    let pool = test_pool().await;
    let mut alice = editor(&pool, "alice");
    create_saved(&mut alice, &pool, "shared").await;

    // Another session deletes the setting behind this editor's back.
    let mut other = editor(&pool, "alice");
    other.restore_selection(Some("shared".to_string()));
    assert!(other.delete_selected_setting().await.unwrap());

    assert!(alice.load_selected().await.unwrap().is_none());
    assert_eq!(alice.selected(), None);
}

#[tokio::test]
async fn settings_are_isolated_per_owner_and_kind() {
    let pool = test_pool().await;
    let mut alice = editor(&pool, "alice");
    create_saved(&mut alice, &pool, "mine").await;

    let bob = editor(&pool, "bob");
    assert!(bob.settings().await.unwrap().is_empty());

    let restoration = SettingEditor::new(pool.clone(), "alice", SettingKind::Restoration);
    assert!(restoration.settings().await.unwrap().is_empty());
}

#[tokio::test]
async fn init_creates_the_database_file_and_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("hrm.db");
    let pool = db::init_database(&path).await.unwrap();
    assert!(path.exists());

    let mut editor = SettingEditor::new(pool.clone(), "alice", SettingKind::Image);
    create_saved(&mut editor, &pool, "first").await;
    assert_eq!(editor.settings().await.unwrap().len(), 1);
}

#[tokio::test]
async fn stored_confidence_rows_override_the_built_in_policy() {
    use hrm_common::ConfidenceLevel;

    let pool = test_pool().await;
    sqlx::query(
        "INSERT OR REPLACE INTO confidence_levels (file_format, parameter, level) \
         VALUES ('tiff', 'NumericalAperture', 'asked')",
    )
    .execute(&pool)
    .await
    .unwrap();

    let policy = db::confidence::load_policy(&pool).await.unwrap();
    assert_eq!(
        policy.level("tiff", ParamName::NumericalAperture),
        ConfidenceLevel::Asked
    );
    // Untouched rows keep their built-in levels.
    assert_eq!(
        policy.level("lsm", ParamName::NumericalAperture),
        ConfidenceLevel::Reported
    );
}

#[tokio::test]
async fn saved_settings_round_trip_through_the_database() {
    let pool = test_pool().await;
    let mut setting = Setting::new(SettingKind::Restoration);
    setting.set_name("deconvolution");
    setting.set_owner("alice");
    setting.set_number_of_channels(2);
    let posted = FieldMap::from_pairs([
        ("DeconvolutionAlgorithm0", "cmle"),
        ("DeconvolutionAlgorithm1", "qmle"),
        ("SignalNoiseRatio0", "20"),
        ("NumberOfIterations", "60"),
    ]);
    assert!(
        setting.check_posted_restoration_parameters(&posted),
        "message: {}",
        setting.message()
    );
    assert!(setting.save(&pool).await);

    let loaded = db::settings::load_setting(&pool, "alice", SettingKind::Restoration, "deconvolution")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.number_of_channels(), 2);
    assert_eq!(
        loaded
            .parameter(ParamName::DeconvolutionAlgorithm)
            .unwrap()
            .channel_str(1),
        Some("qmle")
    );
    assert_eq!(
        loaded
            .parameter(ParamName::NumberOfIterations)
            .unwrap()
            .as_str(),
        Some("60")
    );
}

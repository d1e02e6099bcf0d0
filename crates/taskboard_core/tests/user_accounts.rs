use taskboard_core::db::open_db_in_memory;
use taskboard_core::repo::user_repo::{SqliteUserRepository, UserRepository};
use taskboard_core::service::user_service::{ProfileUpdate, UserService};
use taskboard_core::{EntityKind, NewUser, RepoError};

#[test]
fn register_and_get_roundtrip_normalizes_input() {
    let conn = open_db_in_memory().unwrap();
    let service = UserService::new(SqliteUserRepository::try_new(&conn).unwrap());

    let mut input = NewUser::new("  alice ", " Alice@Example.COM ", "hash");
    input.first_name = Some("  ".to_string());
    let created = service.register(input).unwrap();

    let loaded = service.get_user(created.id).unwrap();
    assert_eq!(loaded.username, "alice");
    assert_eq!(loaded.email, "alice@example.com");
    assert_eq!(loaded.first_name, None);
    assert!(loaded.notifications_enabled);
}

#[test]
fn duplicate_email_is_unique_violation_and_leaves_store_unchanged() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();

    repo.create_user(&NewUser::new("alice", "alice@example.com", "hash"))
        .unwrap();
    let before = user_count(&conn);

    let err = repo
        .create_user(&NewUser::new("alicia", "ALICE@example.com", "hash"))
        .unwrap_err();
    match err {
        RepoError::UniqueViolation { entity, field } => {
            assert_eq!(entity, EntityKind::User);
            assert_eq!(field, "email");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(user_count(&conn), before);
    assert!(repo.find_by_username("alicia").unwrap().is_none());
}

#[test]
fn email_case_folding_covers_non_ascii_letters() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();

    let elise = repo
        .create_user(&NewUser::new("elise", "ÉLISE@x.com", "hash"))
        .unwrap();
    assert_eq!(elise.email, "élise@x.com");

    let err = repo
        .create_user(&NewUser::new("other", "élise@x.com", "hash"))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::UniqueViolation { ref field, .. } if field == "email"
    ));

    let found = repo.find_by_email("Élise@X.COM").unwrap().unwrap();
    assert_eq!(found.id, elise.id);

    let mut renamed = found;
    renamed.email = "ÖRJAN@x.com".to_string();
    repo.update_user(&renamed).unwrap();
    let reloaded = repo.get_user(elise.id).unwrap().unwrap();
    assert_eq!(reloaded.email, "örjan@x.com");
    assert_eq!(
        repo.find_by_email("örjan@X.com").unwrap().map(|user| user.id),
        Some(elise.id)
    );
}

#[test]
fn duplicate_username_is_unique_violation() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();

    repo.create_user(&NewUser::new("bob", "bob@example.com", "hash"))
        .unwrap();
    let err = repo
        .create_user(&NewUser::new("bob", "robert@example.com", "hash"))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::UniqueViolation { ref field, .. } if field == "username"
    ));
}

#[test]
fn overlong_username_is_validation_error() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();

    let err = repo
        .create_user(&NewUser::new("u".repeat(65), "long@example.com", "hash"))
        .unwrap_err();
    match err {
        RepoError::Validation(err) => assert_eq!(err.field, "username"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn login_lookup_accepts_username_or_email_case_insensitively() {
    let conn = open_db_in_memory().unwrap();
    let service = UserService::new(SqliteUserRepository::try_new(&conn).unwrap());
    let created = service
        .register(NewUser::new("carol", "carol@example.com", "hash"))
        .unwrap();

    let by_name = service.find_for_login("carol").unwrap().unwrap();
    let by_email = service.find_for_login("CAROL@Example.com").unwrap().unwrap();
    assert_eq!(by_name.id, created.id);
    assert_eq!(by_email.id, created.id);
    assert!(service.find_for_login("nobody").unwrap().is_none());
}

#[test]
fn profile_update_replaces_optional_fields() {
    let conn = open_db_in_memory().unwrap();
    let service = UserService::new(SqliteUserRepository::try_new(&conn).unwrap());
    let user = service
        .register(NewUser::new("dave", "dave@example.com", "hash"))
        .unwrap();

    let updated = service
        .update_profile(
            user.id,
            ProfileUpdate {
                first_name: Some(" Dave ".to_string()),
                last_name: Some("Jones".to_string()),
                middle_name: None,
                chat_handle: Some("@davej".to_string()),
            },
        )
        .unwrap();
    assert_eq!(updated.first_name.as_deref(), Some("Dave"));

    let loaded = service.get_user(user.id).unwrap();
    assert_eq!(loaded, updated);
}

#[test]
fn link_chat_resolves_username_and_unlink_clears_it() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();
    let service = UserService::new(SqliteUserRepository::try_new(&conn).unwrap());
    let user = service
        .register(NewUser::new("erin", "erin@example.com", "hash"))
        .unwrap();

    let linked = service.link_chat("@erin", "  777  ").unwrap();
    assert_eq!(linked.chat_id.as_deref(), Some("777"));
    assert_eq!(repo.find_by_chat_id("777").unwrap().unwrap().id, user.id);

    service.unlink_chat(user.id).unwrap();
    assert!(repo.find_by_chat_id("777").unwrap().is_none());
}

#[test]
fn link_chat_with_unknown_username_is_validation_error() {
    let conn = open_db_in_memory().unwrap();
    let service = UserService::new(SqliteUserRepository::try_new(&conn).unwrap());

    let err = service.link_chat("ghost", "1").unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
}

#[test]
fn reminder_recipients_require_opt_in_and_linked_chat() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();

    let mut linked = NewUser::new("frank", "frank@example.com", "hash");
    linked.chat_id = Some("10".to_string());
    let linked = repo.create_user(&linked).unwrap();

    let mut muted = NewUser::new("gina", "gina@example.com", "hash");
    muted.chat_id = Some("11".to_string());
    let muted = repo.create_user(&muted).unwrap();
    repo.set_notifications_enabled(muted.id, false).unwrap();

    repo.create_user(&NewUser::new("hank", "hank@example.com", "hash"))
        .unwrap();

    let recipients: Vec<_> = repo
        .list_reminder_recipients()
        .unwrap()
        .into_iter()
        .map(|user| user.id)
        .collect();
    assert_eq!(recipients, vec![linked.id]);
}

#[test]
fn missing_user_operations_return_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = UserService::new(SqliteUserRepository::try_new(&conn).unwrap());

    for err in [
        service.get_user(99).unwrap_err(),
        service.set_notifications_enabled(99, false).unwrap_err(),
        service.unlink_chat(99).unwrap_err(),
        service.delete_account(99).unwrap_err(),
    ] {
        assert!(matches!(
            err,
            RepoError::NotFound {
                entity: EntityKind::User,
                id: 99
            }
        ));
    }
}

#[test]
fn repository_rejects_unmigrated_connection() {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    let result = SqliteUserRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::UninitializedConnection {
            actual_version: 0,
            ..
        })
    ));
}

fn user_count(conn: &rusqlite::Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))
        .unwrap()
}

use chrono::NaiveDate;
use rusqlite::Connection;
use taskboard_core::db::open_db_in_memory;
use taskboard_core::repo::document_repo::{DocumentRepository, SqliteDocumentRepository};
use taskboard_core::repo::project_repo::{ProjectRepository, SqliteProjectRepository};
use taskboard_core::repo::tag_repo::{SqliteTagRepository, TagRepository};
use taskboard_core::repo::task_repo::{SqliteTaskRepository, TaskListQuery, TaskRepository};
use taskboard_core::repo::user_repo::{SqliteUserRepository, UserRepository};
use taskboard_core::service::task_service::{TaskForm, TaskService};
use taskboard_core::{
    EntityKind, NewDocument, NewProject, NewUser, RepoError, TaskPriority, TaskStatus,
};

struct Board {
    conn: Connection,
    project_id: i64,
    other_project_id: i64,
}

fn setup() -> Board {
    let conn = open_db_in_memory().unwrap();
    let user = SqliteUserRepository::try_new(&conn)
        .unwrap()
        .create_user(&NewUser::new("olga", "olga@example.com", "hash"))
        .unwrap();
    let projects = SqliteProjectRepository::try_new(&conn).unwrap();
    let project_id = projects
        .create_project(&NewProject::new(user.id, "main"))
        .unwrap()
        .id;
    let other_project_id = projects
        .create_project(&NewProject::new(user.id, "side"))
        .unwrap()
        .id;
    drop(projects);
    Board {
        conn,
        project_id,
        other_project_id,
    }
}

fn task_service(conn: &Connection) -> TaskService<SqliteTaskRepository<'_>> {
    TaskService::new(SqliteTaskRepository::try_new(conn).unwrap())
}

#[test]
fn create_task_from_form_applies_defaults_and_parses_values() {
    let board = setup();
    let service = task_service(&board.conn);

    let plain = service
        .create_task(board.project_id, &TaskForm::titled("  sweep  "))
        .unwrap();
    assert_eq!(plain.title, "sweep");
    assert_eq!(plain.priority, TaskPriority::Medium);
    assert_eq!(plain.status, TaskStatus::Backlog);

    let form = TaskForm {
        title: "ship".to_string(),
        description: Some("release 1.0".to_string()),
        priority: Some("High".to_string()),
        status: Some("in-progress".to_string()),
        deadline: NaiveDate::from_ymd_opt(2024, 7, 1),
    };
    let shipped = service.create_task(board.project_id, &form).unwrap();
    let loaded = service.get_task(shipped.id).unwrap();
    assert_eq!(loaded, shipped);
    assert_eq!(loaded.status, TaskStatus::InProgress);
}

#[test]
fn unknown_status_in_form_is_validation_error() {
    let board = setup();
    let service = task_service(&board.conn);

    let mut form = TaskForm::titled("ship");
    form.status = Some("archived".to_string());
    let err = service.create_task(board.project_id, &form).unwrap_err();
    match err {
        RepoError::Validation(err) => assert_eq!(err.field, "status"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn list_filters_by_status_and_orders_newest_first() {
    let board = setup();
    let service = task_service(&board.conn);

    let first = service
        .create_task(board.project_id, &TaskForm::titled("first"))
        .unwrap();
    let second = service
        .create_task(board.project_id, &TaskForm::titled("second"))
        .unwrap();
    service.set_status(first.id, TaskStatus::Done).unwrap();

    let all = service
        .list_tasks(&TaskListQuery::for_project(board.project_id))
        .unwrap();
    let ids: Vec<_> = all.iter().map(|task| task.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);

    let mut query = TaskListQuery::for_project(board.project_id);
    query.status = Some(TaskStatus::Done);
    let done = service.list_tasks(&query).unwrap();
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].id, first.id);
}

#[test]
fn overdue_tasks_skip_done_and_undated_tasks() {
    let board = setup();
    let service = task_service(&board.conn);
    let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();

    let mut late = TaskForm::titled("late");
    late.deadline = NaiveDate::from_ymd_opt(2024, 5, 1);
    let late = service.create_task(board.project_id, &late).unwrap();

    let mut finished = TaskForm::titled("finished");
    finished.deadline = NaiveDate::from_ymd_opt(2024, 4, 1);
    finished.status = Some("done".to_string());
    service.create_task(board.project_id, &finished).unwrap();

    service
        .create_task(board.project_id, &TaskForm::titled("someday"))
        .unwrap();

    let overdue = service.overdue_tasks(board.project_id, today).unwrap();
    assert_eq!(overdue, vec![late]);
}

#[test]
fn linking_document_twice_keeps_one_row_and_unlink_removes_it() {
    let board = setup();
    let service = task_service(&board.conn);
    let task = service
        .create_task(board.project_id, &TaskForm::titled("draft"))
        .unwrap();
    let document = SqliteDocumentRepository::try_new(&board.conn)
        .unwrap()
        .create_document(&NewDocument::new(board.project_id, "outline"))
        .unwrap();

    assert!(service.link_document(task.id, document.id).unwrap());
    assert!(!service.link_document(task.id, document.id).unwrap());
    assert_eq!(link_count(&board.conn, "task_documents"), 1);
    assert_eq!(service.task_documents(task.id).unwrap(), vec![document.clone()]);
    assert_eq!(
        service.tasks_with_document(document.id).unwrap(),
        vec![task.clone()]
    );

    assert!(service.unlink_document(task.id, document.id).unwrap());
    assert!(!service.unlink_document(task.id, document.id).unwrap());
    assert_eq!(link_count(&board.conn, "task_documents"), 0);
}

#[test]
fn linking_tag_twice_keeps_one_row_and_unlink_removes_it() {
    let board = setup();
    let service = task_service(&board.conn);
    let task = service
        .create_task(board.project_id, &TaskForm::titled("draft"))
        .unwrap();
    let tag = SqliteTagRepository::try_new(&board.conn)
        .unwrap()
        .create_tag(board.project_id, "urgent")
        .unwrap();

    assert!(service.link_tag(task.id, tag.id).unwrap());
    assert!(!service.link_tag(task.id, tag.id).unwrap());
    assert_eq!(link_count(&board.conn, "task_tags"), 1);
    assert_eq!(service.task_tags(task.id).unwrap(), vec![tag.clone()]);

    assert!(service.unlink_tag(task.id, tag.id).unwrap());
    assert!(!service.unlink_tag(task.id, tag.id).unwrap());
    assert_eq!(link_count(&board.conn, "task_tags"), 0);
}

#[test]
fn linking_across_projects_is_rejected() {
    let board = setup();
    let service = task_service(&board.conn);
    let task = service
        .create_task(board.project_id, &TaskForm::titled("draft"))
        .unwrap();
    let foreign_tag = SqliteTagRepository::try_new(&board.conn)
        .unwrap()
        .create_tag(board.other_project_id, "elsewhere")
        .unwrap();

    let err = service.link_tag(task.id, foreign_tag.id).unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert_eq!(link_count(&board.conn, "task_tags"), 0);
}

#[test]
fn linking_missing_endpoint_is_not_found() {
    let board = setup();
    let service = task_service(&board.conn);
    let task = service
        .create_task(board.project_id, &TaskForm::titled("draft"))
        .unwrap();

    let err = service.link_document(task.id, 999).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: EntityKind::Document,
            id: 999
        }
    ));
}

#[test]
fn set_tags_replaces_whole_set_atomically() {
    let board = setup();
    let service = task_service(&board.conn);
    let tags = SqliteTagRepository::try_new(&board.conn).unwrap();
    let task = service
        .create_task(board.project_id, &TaskForm::titled("draft"))
        .unwrap();
    let alpha = tags.create_tag(board.project_id, "alpha").unwrap();
    let beta = tags.create_tag(board.project_id, "Beta").unwrap();
    let gamma = tags.create_tag(board.project_id, "gamma").unwrap();
    let foreign = tags.create_tag(board.other_project_id, "foreign").unwrap();

    let attached = service
        .set_tags(task.id, &[gamma.id, alpha.id, gamma.id])
        .unwrap();
    assert_eq!(attached, vec![alpha.clone(), gamma.clone()]);

    let attached = service.set_tags(task.id, &[beta.id]).unwrap();
    assert_eq!(attached, vec![beta.clone()]);

    let err = service.set_tags(task.id, &[alpha.id, foreign.id]).unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert_eq!(service.task_tags(task.id).unwrap(), vec![beta.clone()]);
    assert_eq!(service.tasks_with_tag(beta.id).unwrap(), vec![task]);
}

fn link_count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn tags_and_documents_can_be_renamed_and_edited() {
    let board = setup();
    let tags = SqliteTagRepository::try_new(&board.conn).unwrap();
    let documents = SqliteDocumentRepository::try_new(&board.conn).unwrap();

    let tag = tags.create_tag(board.project_id, "  later ").unwrap();
    assert_eq!(tag.name, "later");
    tags.rename_tag(tag.id, "soon").unwrap();
    assert_eq!(tags.get_tag(tag.id).unwrap().unwrap().name, "soon");
    assert!(matches!(
        tags.rename_tag(tag.id, " "),
        Err(RepoError::Validation(_))
    ));
    assert!(matches!(
        tags.rename_tag(404, "ghost"),
        Err(RepoError::NotFound {
            entity: EntityKind::Tag,
            id: 404
        })
    ));

    let mut document = documents
        .create_document(&NewDocument::new(board.project_id, "release notes"))
        .unwrap();
    document.content = Some("first section".to_string());
    documents.update_document(&document).unwrap();
    assert_eq!(documents.get_document(document.id).unwrap(), Some(document));
}

use std::path::PathBuf;

use canvasync_core::mock::MockClient;
use canvasync_core::{CookieJar, Session};
use canvasync_walk::{Container, ContainerKind, FileEntry, Platform, TreeWalker, WalkError, classify};

const BASE: &str = "https://canvas.test";

fn walker(client: &MockClient) -> TreeWalker<MockClient> {
    let session = Session::new(client.clone(), CookieJar::default());
    TreeWalker::new(session, Platform::parse(BASE).unwrap())
}

fn folder(id: u32, files: u64, folders: u64) -> String {
    format!(
        r#"while(1);{{"id":{id},"files_url":"{BASE}/api/v1/folders/{id}/files","folders_url":"{BASE}/api/v1/folders/{id}/folders","files_count":{files},"folders_count":{folders}}}"#
    )
}

fn child(id: u32, name: &str) -> String {
    format!(r#"{{"id":{id},"name":"{name}","folders_url":"{BASE}/api/v1/folders/{id}/folders"}}"#)
}

fn file(name: &str, id: u32) -> String {
    format!(r#"{{"display_name":"{name}","url":"{BASE}/files/{id}/download"}}"#)
}

fn engsci() -> Container {
    classify("course_1234", "ENGSCI").unwrap()
}

fn paths(entries: &[FileEntry]) -> Vec<PathBuf> {
    let mut paths: Vec<_> = entries.iter().map(|e| e.path.clone()).collect();
    paths.sort();
    paths
}

#[tokio::test]
async fn course_with_nested_folder() {
    let client = MockClient::new();
    client
        .route(format!("{BASE}/api/v1/courses/1234/folders/root"), 200, folder(1, 1, 1))
        .route(format!("{BASE}/api/v1/folders/1/files"), 200, format!("while(1);[{}]", file("report.pdf", 11)))
        .route(format!("{BASE}/api/v1/folders/1/folders"), 200, format!("while(1);[{}]", child(2, "Lab 1")))
        .route(format!("{BASE}/api/v1/folders/2"), 200, folder(2, 1, 0))
        .route(format!("{BASE}/api/v1/folders/2/files"), 200, format!("while(1);[{}]", file("data!.csv", 12)));

    let entries = walker(&client).walk(&engsci()).await;

    assert_eq!(
        paths(&entries),
        vec![PathBuf::from("ENGSCI/Lab 1/data_.csv"), PathBuf::from("ENGSCI/report.pdf")]
    );
    let report = entries.iter().find(|e| e.path.ends_with("report.pdf")).unwrap();
    assert_eq!(report.url.as_deref(), Some("https://canvas.test/files/11/download"));
}

#[tokio::test]
async fn large_file_listing_is_fetched_in_one_page() {
    let client = MockClient::new();
    let listing: Vec<String> = (0..250).map(|i| file(&format!("slide{i}.png"), i)).collect();
    client
        .route(format!("{BASE}/api/v1/courses/1234/folders/root"), 200, folder(1, 250, 0))
        .route(
            format!("{BASE}/api/v1/folders/1/files?per_page=250"),
            200,
            format!("[{}]", listing.join(",")),
        );

    let entries = walker(&client).walk(&engsci()).await;

    assert_eq!(entries.len(), 250);
    let files_requests: Vec<_> = client
        .requests()
        .into_iter()
        .filter(|r| r.url.contains("/folders/1/files"))
        .collect();
    assert_eq!(files_requests.len(), 1);
    assert!(files_requests[0].url.ends_with("per_page=250"));
}

#[tokio::test]
async fn unlistable_subtree_does_not_stop_siblings() {
    let client = MockClient::new();
    client
        .route(format!("{BASE}/api/v1/courses/1234/folders/root"), 200, folder(1, 0, 2))
        .route(
            format!("{BASE}/api/v1/folders/1/folders"),
            200,
            format!("[{},{}]", child(2, "Locked"), child(3, "Open")),
        )
        .route(format!("{BASE}/api/v1/folders/2"), 401, r#"{"status":"unauthorized"}"#)
        .route(format!("{BASE}/api/v1/folders/3"), 200, folder(3, 1, 0))
        .route(format!("{BASE}/api/v1/folders/3/files"), 200, format!("[{}]", file("notes.txt", 31)));

    let entries = walker(&client).walk(&engsci()).await;

    assert_eq!(paths(&entries), vec![PathBuf::from("ENGSCI/Open/notes.txt")]);
}

#[tokio::test]
async fn colliding_names_are_numbered_and_locked_files_kept() {
    let client = MockClient::new();
    client
        .route(format!("{BASE}/api/v1/courses/1234/folders/root"), 200, folder(1, 3, 0))
        .route(
            format!("{BASE}/api/v1/folders/1/files"),
            200,
            r#"[{"display_name":"a!.txt","url":"https://canvas.test/files/1/download"},
                {"display_name":"a?.txt","url":"https://canvas.test/files/2/download"},
                {"display_name":"locked.pdf","url":""}]"#,
        );

    let entries = walker(&client).walk(&engsci()).await;

    assert_eq!(
        paths(&entries),
        vec![
            PathBuf::from("ENGSCI/a_ (2).txt"),
            PathBuf::from("ENGSCI/a_.txt"),
            PathBuf::from("ENGSCI/locked.pdf"),
        ]
    );
    let locked = entries.iter().find(|e| e.path.ends_with("locked.pdf")).unwrap();
    assert_eq!(locked.url, None);
}

#[tokio::test]
async fn lists_known_containers_only() {
    let client = MockClient::new();
    client.route(
        format!("{BASE}/files"),
        200,
        r#"<html><script>
ENV = {"FILES_CONTEXTS":[{"asset_string":"user_77","name":"My Files"},{"asset_string":"course_1234","name":"ENGSCI"},{"asset_string":"account_5","name":"Site Admin"}],"current_user_id":"77"};
</script></html>"#,
    );

    let containers = walker(&client).list_containers().await.unwrap();

    assert_eq!(
        containers,
        vec![
            Container { kind: ContainerKind::User, id: 77, name: "My Files".into() },
            Container { kind: ContainerKind::Course, id: 1234, name: "ENGSCI".into() },
        ]
    );
}

#[tokio::test]
async fn files_page_without_env_is_an_error() {
    let client = MockClient::new();
    client.route(format!("{BASE}/files"), 200, "<html>maintenance</html>");

    let err = walker(&client).list_containers().await.unwrap_err();

    assert!(matches!(err, WalkError::ConfigMissing { .. }));
}

#[tokio::test]
async fn walk_all_merges_every_container() {
    let client = MockClient::new();
    client
        .route(format!("{BASE}/api/v1/courses/1234/folders/root"), 200, folder(1, 1, 0))
        .route(format!("{BASE}/api/v1/folders/1/files"), 200, format!("[{}]", file("report.pdf", 11)))
        .route(format!("{BASE}/api/v1/groups/9/folders/root"), 200, folder(5, 1, 0))
        .route(format!("{BASE}/api/v1/folders/5/files"), 200, format!("[{}]", file("plan.docx", 51)))
        .route(format!("{BASE}/api/v1/users/77/folders/root"), 500, "");

    let containers = vec![
        engsci(),
        classify("group_9", "Team 9").unwrap(),
        classify("user_77", "My Files").unwrap(),
    ];
    let entries = walker(&client).walk_all(containers).await;

    assert_eq!(
        paths(&entries),
        vec![PathBuf::from("ENGSCI/report.pdf"), PathBuf::from("Team 9/plan.docx")]
    );
}

#[tokio::test]
async fn same_named_containers_do_not_share_paths() {
    let client = MockClient::new();
    client
        .route(format!("{BASE}/api/v1/courses/1234/folders/root"), 200, folder(1, 1, 0))
        .route(format!("{BASE}/api/v1/folders/1/files"), 200, format!("[{}]", file("report.pdf", 11)))
        .route(format!("{BASE}/api/v1/groups/9/folders/root"), 200, folder(5, 1, 0))
        .route(format!("{BASE}/api/v1/folders/5/files"), 200, format!("[{}]", file("report.pdf", 51)));

    let containers = vec![engsci(), classify("group_9", "ENGSCI").unwrap()];
    let entries = walker(&client).walk_all(containers).await;

    assert_eq!(
        entries,
        vec![
            FileEntry {
                url: Some(format!("{BASE}/files/11/download")),
                path: PathBuf::from("ENGSCI/report.pdf"),
            },
            FileEntry {
                url: Some(format!("{BASE}/files/51/download")),
                path: PathBuf::from("ENGSCI/report (2).pdf"),
            },
        ]
    );
}

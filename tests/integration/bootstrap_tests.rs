use crate::common::mock_store_client::{InMemoryStoreClient, HOME_ID};
use crate::common::setup::{path, TestEnv};
use discord_fs::bootstrap::build_index;
use discord_fs::error::RemoteError;
use discord_fs::path::Scope;
use discord_fs::store::EntryKind;
use std::sync::Arc;

#[tokio::test]
async fn test_bootstrap_mirrors_remote_tree() {
    let client = InMemoryStoreClient::new();
    let home = client.home();
    let docs = client.seed_container("docs");
    let art = client.seed_container("art");
    client.seed_object(&home, "readme.md", b"# hi");
    client.seed_object(&docs, "a.txt", b"aaa");
    client.seed_object(&docs, "b.txt", b"bb");

    let (root, index) = build_index(&client, HOME_ID).await.unwrap();

    assert_eq!(root.home.id, HOME_ID);
    assert_eq!(index.list_containers(), vec!["art", "docs"]);
    assert_eq!(index.list_objects(&Scope::Home).unwrap(), vec!["readme.md"]);
    assert_eq!(
        index.list_objects(&Scope::Container("docs".into())).unwrap(),
        vec!["a.txt", "b.txt"]
    );
    assert!(index
        .list_objects(&Scope::Container("art".into()))
        .unwrap()
        .is_empty());
    assert_eq!(index.lookup_container("art").unwrap().id, art.id);
    assert_eq!(
        index
            .lookup_object(&Scope::Container("docs".into()), "a.txt")
            .unwrap()
            .size(),
        3
    );
}

#[tokio::test]
async fn test_bootstrap_newest_copy_wins() {
    let client = InMemoryStoreClient::new();
    let docs = client.seed_container("docs");
    client.seed_object(&docs, "f", b"old");
    let newer = client.seed_object(&docs, "f", b"newer");

    let (_, index) = build_index(&client, HOME_ID).await.unwrap();

    let live = index
        .lookup_object(&Scope::Container("docs".into()), "f")
        .unwrap();
    assert_eq!(live.id(), newer.id);
    assert_eq!(live.size(), 5);
    // stale copies are reported, not deleted
    assert_eq!(client.objects_named(&docs.id, "f").len(), 2);
    assert_eq!(client.call_count("delete_object"), 0);
}

#[tokio::test]
async fn test_bootstrap_skips_directory_shadowed_by_home_file() {
    let client = InMemoryStoreClient::new();
    let home = client.home();
    client.seed_object(&home, "clash", b"file wins");
    let clash = client.seed_container("clash");
    client.seed_object(&clash, "inner", b"");

    let (_, index) = build_index(&client, HOME_ID).await.unwrap();

    assert!(index.list_containers().is_empty());
    assert_eq!(index.list_objects(&Scope::Home).unwrap(), vec!["clash"]);
    assert_eq!(index.object_count(), 1);
}

#[tokio::test]
async fn test_bootstrap_fails_for_unknown_root() {
    let client = InMemoryStoreClient::new();
    let err = build_index(&client, "not-a-channel").await.unwrap_err();
    assert!(matches!(err, RemoteError::Rejected { status: 404, .. }));
}

#[tokio::test]
async fn test_bootstrap_propagates_listing_failure() {
    let client = InMemoryStoreClient::new();
    client.fail("list_containers", RemoteError::Unavailable("offline".into()));
    let result = build_index(&client, HOME_ID).await;
    assert_eq!(
        result.err(),
        Some(RemoteError::Unavailable("offline".into()))
    );
}

#[test]
fn test_seeded_store_is_browsable() {
    let client = Arc::new(InMemoryStoreClient::new());
    let docs = client.seed_container("docs");
    client.seed_object(&docs, "a.txt", b"seeded content");
    let env = TestEnv::builder().client(client).build();

    let listing = env.store.list_directory(&path("/docs")).unwrap();
    assert_eq!(listing.len(), 3);
    assert_eq!(listing[2].name, "a.txt");
    assert_eq!(listing[2].kind, EntryKind::File);
    assert_eq!(
        env.store.read_object(&path("/docs/a.txt"), 0, 64).unwrap(),
        b"seeded content"
    );
}

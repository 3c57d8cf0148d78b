use crate::common::mock_store_client::{InMemoryStoreClient, HOME_ID};
use crate::common::setup::{path, TestEnv};
use discord_fs::error::{FsError, RemoteError};
use discord_fs::index::ObjectEntry;
use discord_fs::path::Scope;
use discord_fs::store::{DirEntry, EntryKind};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn names(entries: &[DirEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.name.as_str()).collect()
}

fn unavailable() -> RemoteError {
    RemoteError::Unavailable("connection reset".into())
}

fn docs_env() -> TestEnv {
    let env = TestEnv::new();
    env.store.create_container(&path("/docs")).unwrap();
    env
}

#[test]
fn test_write_then_read_round_trip() {
    let env = docs_env();
    let file = path("/docs/notes.txt");
    env.store.create_object(&file).unwrap();

    let written = env.store.write_object(&file, b"hello discord", 0).unwrap();
    assert_eq!(written, 13);
    assert_eq!(env.store.read_object(&file, 0, 13).unwrap(), b"hello discord");

    let attrs = env.store.get_attributes(&file).unwrap();
    assert_eq!(attrs.kind, EntryKind::File);
    assert_eq!(attrs.size, 13);
}

#[test]
fn test_mkdir_and_rmdir_listing() {
    let env = TestEnv::new();
    let root = path("/");

    env.store.create_container(&path("/x")).unwrap();
    let listing = env.store.list_directory(&root).unwrap();
    assert_eq!(names(&listing), vec![".", "..", "x"]);
    assert_eq!(listing[2].kind, EntryKind::Directory);

    env.store.remove_container(&path("/x")).unwrap();
    assert_eq!(names(&env.store.list_directory(&root).unwrap()), vec![".", ".."]);
    assert!(env.client.container_named("x").is_none());
}

#[test]
fn test_mkdir_existing_name_fails_without_remote_call() {
    let env = docs_env();
    assert_eq!(
        env.store.create_container(&path("/docs")),
        Err(FsError::AlreadyExists)
    );

    env.store.create_object(&path("/readme")).unwrap();
    assert_eq!(
        env.store.create_container(&path("/readme")),
        Err(FsError::AlreadyExists)
    );
    assert_eq!(env.client.call_count("create_container"), 1);
}

#[test]
fn test_mkdir_nested_is_not_supported() {
    let env = docs_env();
    assert_eq!(
        env.store.create_container(&path("/docs/inner")),
        Err(FsError::NotSupported)
    );
}

#[test]
fn test_rmdir_missing_fails() {
    let env = TestEnv::new();
    assert_eq!(
        env.store.remove_container(&path("/ghost")),
        Err(FsError::NotFound)
    );
    assert_eq!(env.client.call_count("delete_container"), 0);
}

#[test]
fn test_rmdir_drops_contained_files() {
    let env = docs_env();
    env.store.create_object(&path("/docs/a")).unwrap();

    env.store.remove_container(&path("/docs")).unwrap();
    assert_eq!(
        env.store.get_attributes(&path("/docs/a")),
        Err(FsError::NotFound)
    );
    assert_eq!(env.store.index().object_count(), 0);
}

#[test]
fn test_create_uniqueness() {
    let env = docs_env();
    let file = path("/docs/a");
    env.store.create_object(&file).unwrap();
    assert_eq!(env.store.create_object(&file), Err(FsError::AlreadyExists));
    assert_eq!(env.client.call_count("send_object"), 1);
}

#[test]
fn test_create_in_missing_container() {
    let env = TestEnv::new();
    assert_eq!(
        env.store.create_object(&path("/nope/a")),
        Err(FsError::NotFound)
    );
    assert_eq!(env.client.call_count("send_object"), 0);
}

#[test]
fn test_create_top_level_file_lives_in_home() {
    let env = docs_env();
    env.store.create_object(&path("/readme")).unwrap();

    let listing = env.store.list_directory(&path("/")).unwrap();
    assert_eq!(names(&listing), vec![".", "..", "docs", "readme"]);
    assert_eq!(listing[3].kind, EntryKind::File);
    assert_eq!(env.client.objects_named(HOME_ID, "readme").len(), 1);
    assert_eq!(
        env.store.create_object(&path("/docs")),
        Err(FsError::AlreadyExists)
    );
}

#[test]
fn test_write_at_offset_overwrites() {
    let env = docs_env();
    let file = path("/docs/f");
    env.store.create_object(&file).unwrap();

    env.store.write_object(&file, b"AB", 0).unwrap();
    env.store.write_object(&file, b"Z", 1).unwrap();
    assert_eq!(env.store.read_object(&file, 0, 2).unwrap(), b"AZ");
}

#[test]
fn test_write_past_end_zero_fills() {
    let env = docs_env();
    let file = path("/docs/f");
    env.store.create_object(&file).unwrap();

    env.store.write_object(&file, b"X", 3).unwrap();
    assert_eq!(env.store.read_object(&file, 0, 4).unwrap(), b"\0\0\0X");
    assert_eq!(env.store.get_attributes(&file).unwrap().size, 4);
}

#[test]
fn test_read_is_clipped_to_length() {
    let env = docs_env();
    let file = path("/docs/f");
    env.store.create_object(&file).unwrap();
    env.store.write_object(&file, b"abcdef", 0).unwrap();

    assert_eq!(env.store.read_object(&file, 4, 100).unwrap(), b"ef");
    assert!(env.store.read_object(&file, 6, 10).unwrap().is_empty());
    assert!(env.store.read_object(&file, 1000, 10).unwrap().is_empty());
}

#[test]
fn test_write_replaces_remote_identity() {
    let env = docs_env();
    let file = path("/docs/f");
    env.store.create_object(&file).unwrap();
    let container = env.client.container_named("docs").unwrap();
    let (scope, name) = (Scope::Container("docs".into()), "f");
    let first = env.store.index().lookup_object(&scope, name).unwrap();

    env.store.write_object(&file, b"data", 0).unwrap();

    let live = env.store.index().lookup_object(&scope, name).unwrap();
    assert_ne!(live.id(), first.id());
    assert_eq!(live.created, first.created);
    let remote = env.client.objects_named(&container.id, "f");
    assert_eq!(remote.len(), 1);
    assert_eq!(remote[0].id, live.id());
    assert!(env.client.content_of(first.id()).is_none());
}

#[test]
fn test_failed_cleanup_still_reports_success() {
    let env = docs_env();
    let file = path("/docs/f");
    env.store.create_object(&file).unwrap();
    let container = env.client.container_named("docs").unwrap();

    env.client.fail("delete_object", unavailable());
    assert_eq!(env.store.write_object(&file, b"new", 0), Ok(3));

    // the old object is orphaned remotely but the index follows the new one
    let remote = env.client.objects_named(&container.id, "f");
    assert_eq!(remote.len(), 2);
    let live = env
        .store
        .index()
        .lookup_object(&Scope::Container("docs".into()), "f")
        .unwrap();
    assert_eq!(live.id(), remote[1].id);
    assert_eq!(env.store.read_object(&file, 0, 3).unwrap(), b"new");
}

#[test]
fn test_remote_create_failure_leaves_index_unchanged() {
    let env = TestEnv::new();
    env.client.fail("create_container", unavailable());

    let result = env.store.create_container(&path("/x"));
    assert!(matches!(result, Err(FsError::RemoteUnavailable(_))));
    assert_eq!(names(&env.store.list_directory(&path("/")).unwrap()), vec![".", ".."]);

    env.client.clear_failure("create_container");
    env.store.create_container(&path("/x")).unwrap();
}

#[test]
fn test_send_failure_during_write_keeps_old_content() {
    let env = docs_env();
    let file = path("/docs/f");
    env.store.create_object(&file).unwrap();
    env.store.write_object(&file, b"keep", 0).unwrap();

    env.client.fail(
        "send_object",
        RemoteError::Rejected {
            status: 403,
            code: 50013,
            message: "Missing Permissions".into(),
        },
    );
    assert_eq!(
        env.store.write_object(&file, b"lost", 0),
        Err(FsError::RemoteRejected {
            status: 403,
            code: 50013
        })
    );
    assert_eq!(env.store.read_object(&file, 0, 4).unwrap(), b"keep");
}

#[test]
fn test_timeout_leaves_index_untouched() {
    let env = TestEnv::builder()
        .request_timeout(Duration::from_millis(100))
        .build();
    env.store.create_container(&path("/docs")).unwrap();
    let file = path("/docs/f");
    env.store.create_object(&file).unwrap();
    let scope = Scope::Container("docs".into());
    let before = env.store.index().lookup_object(&scope, "f").unwrap();

    env.client.delay("send_object", Duration::from_millis(500));
    assert_eq!(env.store.write_object(&file, b"late", 0), Err(FsError::Timeout));

    let after = env.store.index().lookup_object(&scope, "f").unwrap();
    assert_eq!(after.id(), before.id());
    assert_eq!(after.size(), 0);
}

#[test]
fn test_unlink_semantics() {
    let env = docs_env();
    let file = path("/docs/f");
    assert_eq!(env.store.delete_object(&file), Err(FsError::NotFound));

    env.store.create_object(&file).unwrap();
    env.store.write_object(&file, b"bye", 0).unwrap();
    env.store.delete_object(&file).unwrap();

    assert_eq!(env.store.read_object(&file, 0, 3), Err(FsError::NotFound));
    let container = env.client.container_named("docs").unwrap();
    assert!(env.client.objects_named(&container.id, "f").is_empty());
}

#[test]
fn test_unlink_of_remotely_deleted_file_succeeds() {
    let client = Arc::new(InMemoryStoreClient::new());
    let home = client.home();
    client.seed_object(&home, "gone", b"x");
    let env = TestEnv::builder().client(client).build();

    env.client.fail(
        "delete_object",
        RemoteError::Rejected {
            status: 404,
            code: 10008,
            message: "Unknown Message".into(),
        },
    );
    env.store.delete_object(&path("/gone")).unwrap();
    assert_eq!(env.store.get_attributes(&path("/gone")), Err(FsError::NotFound));
}

#[test]
fn test_truncate_shrinks_and_extends() {
    let env = docs_env();
    let file = path("/docs/f");
    env.store.create_object(&file).unwrap();
    env.store.write_object(&file, b"abcdef", 0).unwrap();

    env.store.truncate_object(&file, 3).unwrap();
    assert_eq!(env.store.read_object(&file, 0, 10).unwrap(), b"abc");

    env.store.truncate_object(&file, 5).unwrap();
    assert_eq!(env.store.read_object(&file, 0, 10).unwrap(), b"abc\0\0");

    env.store.truncate_object(&file, 0).unwrap();
    assert!(env.store.read_object(&file, 0, 10).unwrap().is_empty());
}

#[test]
fn test_truncate_to_same_length_is_noop() {
    let env = docs_env();
    let file = path("/docs/f");
    env.store.create_object(&file).unwrap();
    env.store.write_object(&file, b"abc", 0).unwrap();
    let sends = env.client.call_count("send_object");
    let fetches = env.client.call_count("fetch_object_content");

    env.store.truncate_object(&file, 3).unwrap();
    assert_eq!(env.client.call_count("send_object"), sends);
    assert_eq!(env.client.call_count("fetch_object_content"), fetches);
}

#[test]
fn test_oversized_write_fails_before_network() {
    let env = TestEnv::builder().max_object_size(8).build();
    let file = path("/big");
    env.store.create_object(&file).unwrap();

    assert_eq!(
        env.store.write_object(&file, b"0123456789", 0),
        Err(FsError::TooLarge { size: 10, limit: 8 })
    );
    assert_eq!(
        env.store.truncate_object(&file, 9),
        Err(FsError::TooLarge { size: 9, limit: 8 })
    );
    assert_eq!(env.client.call_count("fetch_object_content"), 0);
    assert_eq!(env.client.call_count("send_object"), 1);
}

#[test]
fn test_read_uses_cached_content() {
    let client = Arc::new(InMemoryStoreClient::new());
    let home = client.home();
    client.seed_object(&home, "seeded", b"from remote");
    let env = TestEnv::builder().client(client).build();
    let file = path("/seeded");

    assert_eq!(env.store.read_object(&file, 0, 4).unwrap(), b"from");
    assert_eq!(env.store.read_object(&file, 5, 6).unwrap(), b"remote");
    assert_eq!(env.client.call_count("fetch_object_content"), 1);

    // a write seeds the cache for the new identity
    env.store.write_object(&file, b"FROM", 0).unwrap();
    assert_eq!(env.client.call_count("fetch_object_content"), 2);
    assert_eq!(env.store.read_object(&file, 0, 11).unwrap(), b"FROM remote");
    assert_eq!(env.client.call_count("fetch_object_content"), 2);
}

#[test]
fn test_read_without_cache_fetches_every_time() {
    let env = TestEnv::builder().cache_content(false).build();
    let file = path("/f");
    env.store.create_object(&file).unwrap();
    env.store.write_object(&file, b"abc", 0).unwrap();
    let fetches = env.client.call_count("fetch_object_content");

    env.store.read_object(&file, 0, 3).unwrap();
    env.store.read_object(&file, 0, 3).unwrap();
    assert_eq!(env.client.call_count("fetch_object_content"), fetches + 2);
}

#[test]
fn test_write_always_refetches() {
    let env = docs_env();
    let file = path("/docs/f");
    env.store.create_object(&file).unwrap();

    env.store.write_object(&file, b"a", 0).unwrap();
    env.store.write_object(&file, b"b", 1).unwrap();
    assert_eq!(env.client.call_count("fetch_object_content"), 2);
}

#[test]
fn test_empty_write_is_noop() {
    let env = docs_env();
    let file = path("/docs/f");
    env.store.create_object(&file).unwrap();
    assert_eq!(env.store.write_object(&file, b"", 10), Ok(0));
    assert_eq!(env.store.get_attributes(&file).unwrap().size, 0);
    assert_eq!(env.client.call_count("send_object"), 1);
}

#[test]
fn test_get_attributes_by_path_shape() {
    let env = docs_env();
    env.store.create_object(&path("/docs/a")).unwrap();

    assert_eq!(
        env.store.get_attributes(&path("/")).unwrap().kind,
        EntryKind::Directory
    );
    assert_eq!(
        env.store.get_attributes(&path("/docs")).unwrap().kind,
        EntryKind::Directory
    );
    assert_eq!(
        env.store.get_attributes(&path("/docs/a")).unwrap().kind,
        EntryKind::File
    );
    assert_eq!(
        env.store.get_attributes(&path("/missing")),
        Err(FsError::NotFound)
    );
    assert_eq!(
        env.store.get_attributes(&path("/docs/missing")),
        Err(FsError::NotFound)
    );
}

#[test]
fn test_list_directory_of_file_or_missing() {
    let env = docs_env();
    env.store.create_object(&path("/docs/a")).unwrap();

    assert_eq!(
        names(&env.store.list_directory(&path("/docs")).unwrap()),
        vec![".", "..", "a"]
    );
    assert_eq!(
        env.store.list_directory(&path("/docs/a")),
        Err(FsError::NotFound)
    );
    assert_eq!(
        env.store.list_directory(&path("/missing")),
        Err(FsError::NotFound)
    );
}

#[test]
fn test_file_operations_on_directory_report_is_directory() {
    let env = docs_env();
    assert_eq!(
        env.store.read_object(&path("/docs"), 0, 10),
        Err(FsError::IsDirectory)
    );
    assert_eq!(
        env.store.write_object(&path("/"), b"x", 0),
        Err(FsError::IsDirectory)
    );
    assert_eq!(
        env.store.truncate_object(&path("/docs"), 0),
        Err(FsError::IsDirectory)
    );
    assert_eq!(
        env.store.delete_object(&path("/docs")),
        Err(FsError::IsDirectory)
    );
    assert_eq!(FsError::IsDirectory.errno(), libc::EISDIR);
    assert_eq!(env.client.call_count("fetch_object_content"), 0);
}

#[test]
fn test_remote_rejection_maps_through() {
    let client = Arc::new(InMemoryStoreClient::new());
    let home = client.home();
    client.seed_object(&home, "secret", b"x");
    let env = TestEnv::builder().client(client).build();

    env.client.fail(
        "fetch_object_content",
        RemoteError::Rejected {
            status: 403,
            code: 50001,
            message: "Missing Access".into(),
        },
    );
    let err = env.store.read_object(&path("/secret"), 0, 1).unwrap_err();
    assert_eq!(err.errno(), libc::EACCES);
}

#[test]
fn test_cached_content_stays_within_budget() {
    let client = Arc::new(InMemoryStoreClient::new());
    let home = client.home();
    for n in 0..5 {
        client.seed_object(&home, &format!("f{}", n), &[b'a' + n as u8; 100]);
    }
    let env = TestEnv::builder().client(client).cache_budget(250).build();

    for n in 0..5 {
        let content = env.store.read_object(&path(&format!("/f{}", n)), 0, 100).unwrap();
        assert_eq!(content, vec![b'a' + n as u8; 100]);
        assert!(env.store.index().cached_bytes() <= 250);
    }
    assert_eq!(env.client.call_count("fetch_object_content"), 5);

    // the two most recent reads are still cached, the first one was evicted
    env.store.read_object(&path("/f4"), 0, 1).unwrap();
    env.store.read_object(&path("/f3"), 0, 1).unwrap();
    assert_eq!(env.client.call_count("fetch_object_content"), 5);
    env.store.read_object(&path("/f0"), 0, 1).unwrap();
    assert_eq!(env.client.call_count("fetch_object_content"), 6);
    assert!(env.store.index().cached_bytes() <= 250);
}

#[test]
fn test_delete_releases_cached_content() {
    let env = TestEnv::new();
    let file = path("/f");
    env.store.create_object(&file).unwrap();
    env.store.write_object(&file, b"cached bytes", 0).unwrap();
    assert_eq!(env.store.index().cached_bytes(), 12);

    env.store.delete_object(&file).unwrap();
    assert_eq!(env.store.index().cached_bytes(), 0);
}

#[test]
fn test_write_losing_replacement_race_reports_conflict() {
    let env = docs_env();
    let file = path("/docs/f");
    let scope = Scope::Container("docs".into());
    env.store.create_object(&file).unwrap();
    let original = env.store.index().lookup_object(&scope, "f").unwrap();
    let container = env.client.container_named("docs").unwrap();
    let rival = env.client.seed_object(&container, "f", b"rival");
    env.client.delay("send_object", Duration::from_millis(300));

    let writer = {
        let store = env.store.clone();
        let file = file.clone();
        thread::spawn(move || store.write_object(&file, b"mine", 0))
    };
    // the write is parked in its send; swap the live object underneath it
    thread::sleep(Duration::from_millis(100));
    env.store
        .index()
        .replace_object(
            &scope,
            "f",
            original.id(),
            ObjectEntry::superseding(rival.clone(), &original),
        )
        .unwrap();

    assert_eq!(writer.join().unwrap(), Err(FsError::Conflict));
    let live = env.store.index().lookup_object(&scope, "f").unwrap();
    assert_eq!(live.id(), rival.id);

    // the copy sent by the losing write was retired
    let remote = env.client.objects_named(&container.id, "f");
    assert_eq!(remote.len(), 2);
    assert!(remote.iter().all(|o| env.client.content_of(&o.id).as_deref() != Some(&b"mine"[..])));
    assert_eq!(env.client.call_count("delete_object"), 1);
}

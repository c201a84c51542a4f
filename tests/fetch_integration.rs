//! Integration tests for per-video comment collection against a mock niconico.

mod support;

use nicocc_core::config::{Config, Encoding};
use nicocc_core::error::{FetchError, ProtocolError};
use nicocc_core::fetch::{CollectOutcome, CollectionPeriod, CommentFetcher, collect_video};
use nicocc_core::nico::{Endpoints, VideoRef};
use nicocc_core::output::read_comment_rows;
use nicocc_core::workspace::Workspace;
use support::socket_guard::start_mock_server_or_skip;
use support::{Chat, ThreadServer};
use tempfile::TempDir;
use wiremock::matchers::{any, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// 2018-01-01 00:00:00 in Japan time.
const START: i64 = 1_514_732_400;
/// 2018-01-31 23:59:59 in Japan time.
const END: i64 = 1_517_410_799;
const HOUR: i64 = 3600;

fn workspace(dir: &TempDir) -> (Workspace, CollectionPeriod) {
    let toml = support::config_toml("2018-01-01 00:00:00", "2018-01-31 23:59:59", "");
    let config = Config::from_toml(&toml).unwrap();
    let period = CollectionPeriod {
        start: config.counter.start_timestamp(),
        end: config.counter.end_timestamp(),
    };
    assert_eq!((period.start, period.end), (START, END));
    (Workspace::open(dir.path(), &config.counter).unwrap(), period)
}

async fn mount_normal_video(server: &MockServer, video_id: &str, thread_id: &str) {
    support::mount_login(server).await;
    support::mount_watch_page(server, video_id, thread_id, "Fetched title").await;
    support::mount_waybackkey(server, thread_id).await;
}

async fn collect(
    server: &MockServer,
    workspace: &Workspace,
    period: CollectionPeriod,
    video: &VideoRef,
    retry: u32,
) -> Result<CollectOutcome, FetchError> {
    let endpoints = Endpoints::with_base(&server.uri());
    let mut client = support::client(retry);
    let mut session = support::session(server, &client);
    let mut fetcher = CommentFetcher::new(&mut client, &mut session, &endpoints, period);
    collect_video(&mut fetcher, workspace, Encoding::Utf8, video).await
}

fn sequence_numbers(rows: &[Vec<String>]) -> Vec<i64> {
    rows.iter().map(|row| row[3].parse().unwrap()).collect()
}

async fn api_json_calls(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|request| request.url.path() == "/api.json/")
        .count()
}

#[tokio::test]
async fn test_pagination_collects_every_comment_once_oldest_first() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_normal_video(&server, "sm9", "1173108780").await;
    let mut chats: Vec<Chat> = (1..=8)
        .map(|no| Chat::new(no, START + no * HOUR, &format!("u{}", no % 3)))
        .collect();
    chats.push(Chat::new(9, END + 10, "late"));
    support::mount_thread(&server, ThreadServer::new(chats, 3)).await;

    let dir = TempDir::new().unwrap();
    let (workspace, period) = workspace(&dir);
    let outcome = collect(&server, &workspace, period, &VideoRef::new("sm9", None), 2)
        .await
        .unwrap();

    assert_eq!(outcome, CollectOutcome::Collected { comments: 8 });
    let rows = read_comment_rows(&workspace.comment_csv("sm9"), Encoding::Utf8).unwrap();
    assert_eq!(sequence_numbers(&rows), (1..=8).collect::<Vec<_>>());
    assert!(rows.iter().all(|row| row[0] == "sm9"));
    assert!(rows.iter().all(|row| row[1] == "Fetched title"));
    assert!(rows.iter().all(|row| row[2] == "NORMAL"));
    assert_eq!(rows[0][12], "2018-01-01 01:00:00");
    assert!(!workspace.comment_temp_csv("sm9").exists());
}

#[tokio::test]
async fn test_known_title_wins_over_fetched_title() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_normal_video(&server, "sm9", "1").await;
    support::mount_thread(
        &server,
        ThreadServer::new(vec![Chat::new(1, START + HOUR, "a")], 10),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let (workspace, period) = workspace(&dir);
    let video = VideoRef::new("sm9", Some("Listed title".to_string()));
    collect(&server, &workspace, period, &video, 0).await.unwrap();

    let rows = read_comment_rows(&workspace.comment_csv("sm9"), Encoding::Utf8).unwrap();
    assert_eq!(rows[0][1], "Listed title");
}

#[tokio::test]
async fn test_comments_before_start_end_pagination() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_normal_video(&server, "sm9", "1").await;
    let chats = (1..=8)
        .map(|no| {
            let date = if no <= 3 { START - 10 * HOUR + no } else { START + no * HOUR };
            Chat::new(no, date, "u")
        })
        .collect();
    support::mount_thread(&server, ThreadServer::new(chats, 3)).await;

    let dir = TempDir::new().unwrap();
    let (workspace, period) = workspace(&dir);
    let outcome = collect(&server, &workspace, period, &VideoRef::new("sm9", None), 0)
        .await
        .unwrap();

    assert_eq!(outcome, CollectOutcome::Collected { comments: 5 });
    let rows = read_comment_rows(&workspace.comment_csv("sm9"), Encoding::Utf8).unwrap();
    assert_eq!(sequence_numbers(&rows), vec![4, 5, 6, 7, 8]);
}

#[tokio::test]
async fn test_window_entirely_outside_period_terminates_with_empty_file() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_normal_video(&server, "sm9", "1").await;
    let chats = (1..=5).map(|no| Chat::new(no, START - 100 + no, "u")).collect();
    support::mount_thread(&server, ThreadServer::new(chats, 3)).await;

    let dir = TempDir::new().unwrap();
    let (workspace, period) = workspace(&dir);
    let outcome = collect(&server, &workspace, period, &VideoRef::new("sm9", None), 0)
        .await
        .unwrap();

    assert_eq!(outcome, CollectOutcome::Collected { comments: 0 });
    assert_eq!(api_json_calls(&server).await, 1);
    let rows = read_comment_rows(&workspace.comment_csv("sm9"), Encoding::Utf8).unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_window_repeating_collected_comments_is_no_progress() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_normal_video(&server, "sm9", "1").await;
    // #2..#5 share one second, so the second window starts at #3 again and
    // #2 can only be reached by skipping comments.
    let mut chats = vec![Chat::new(1, START + 1, "u")];
    chats.extend((2..=5).map(|no| Chat::new(no, START + 100, "u")));
    support::mount_thread(&server, ThreadServer::new(chats, 3)).await;

    let dir = TempDir::new().unwrap();
    let (workspace, period) = workspace(&dir);
    let error = collect(&server, &workspace, period, &VideoRef::new("sm9", None), 0)
        .await
        .unwrap_err();

    assert!(
        matches!(
            error,
            FetchError::Protocol(ProtocolError::NoProgress { ref thread_id, windows: 3 })
                if thread_id == "1"
        ),
        "{error:?}"
    );
    assert_eq!(api_json_calls(&server).await, 4);
    assert!(!workspace.comment_csv("sm9").exists());
    assert!(!workspace.comment_temp_csv("sm9").exists());
}

#[tokio::test]
async fn test_existing_comment_file_makes_no_requests() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (workspace, period) = workspace(&dir);
    std::fs::write(workspace.comment_csv("sm9"), "動画ID\n").unwrap();

    let outcome = collect(&server, &workspace, period, &VideoRef::new("sm9", None), 2)
        .await
        .unwrap();

    assert_eq!(outcome, CollectOutcome::Skipped);
}

#[tokio::test]
async fn test_deleted_video_uses_getflv_fallback() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    support::mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/watch/sm404"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/getflv/sm404"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("thread_id=777&l=60&user_id=4242&ms=x"),
        )
        .expect(1)
        .mount(&server)
        .await;
    support::mount_waybackkey(&server, "777").await;
    support::mount_thread(
        &server,
        ThreadServer::new(vec![Chat::new(1, START + HOUR, "a")], 10),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let (workspace, period) = workspace(&dir);
    collect(&server, &workspace, period, &VideoRef::new("sm404", None), 2)
        .await
        .unwrap();

    let rows = read_comment_rows(&workspace.comment_csv("sm404"), Encoding::Utf8).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][1], "");
    assert_eq!(rows[0][2], "DELETED");
}

#[tokio::test]
async fn test_private_video_uses_getflv_fallback() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    support::mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/watch/sm403"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/getflv/sm403"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("thread_id=888&l=90&user_id=4242&ms=x"),
        )
        .expect(1)
        .mount(&server)
        .await;
    support::mount_waybackkey(&server, "888").await;
    support::mount_thread(
        &server,
        ThreadServer::new(
            vec![Chat::new(1, START + HOUR, "a"), Chat::new(2, START + 2 * HOUR, "b")],
            10,
        ),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let (workspace, period) = workspace(&dir);
    let outcome = collect(&server, &workspace, period, &VideoRef::new("sm403", None), 2)
        .await
        .unwrap();

    assert_eq!(outcome, CollectOutcome::Collected { comments: 2 });
    let rows = read_comment_rows(&workspace.comment_csv("sm403"), Encoding::Utf8).unwrap();
    assert!(rows.iter().all(|row| row[2] == "PRIVATE"), "{rows:?}");
    assert_eq!(sequence_numbers(&rows), vec![1, 2]);
}

#[tokio::test]
async fn test_page_without_watch_data_is_flash_only() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    support::mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/watch/sm5"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><embed src=\"player.swf\"></body></html>"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/getflv/sm5"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("thread_id=555&l=30&user_id=4242&ms=x"),
        )
        .expect(1)
        .mount(&server)
        .await;
    support::mount_waybackkey(&server, "555").await;
    support::mount_thread(
        &server,
        ThreadServer::new(vec![Chat::new(1, START + HOUR, "a")], 10),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let (workspace, period) = workspace(&dir);
    let video = VideoRef::new("sm5", Some("Old flash video".to_string()));
    collect(&server, &workspace, period, &video, 2).await.unwrap();

    let rows = read_comment_rows(&workspace.comment_csv("sm5"), Encoding::Utf8).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][1], "Old flash video");
    assert_eq!(rows[0][2], "FLASH_ONLY");
}

#[tokio::test]
async fn test_nonzero_resultcode_aborts_without_final_file() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_normal_video(&server, "sm9", "1").await;
    let mut thread = ThreadServer::new(vec![Chat::new(1, START + HOUR, "a")], 10);
    thread.resultcode = 9;
    support::mount_thread(&server, thread).await;

    let dir = TempDir::new().unwrap();
    let (workspace, period) = workspace(&dir);
    let error = collect(&server, &workspace, period, &VideoRef::new("sm9", None), 2)
        .await
        .unwrap_err();

    assert!(
        matches!(
            error,
            FetchError::Protocol(ProtocolError::ResultCode { code: 9, .. })
        ),
        "{error:?}"
    );
    assert!(!workspace.comment_csv("sm9").exists());
    assert!(!workspace.comment_temp_csv("sm9").exists());
}

#[tokio::test]
async fn test_missing_waybackkey_is_exhausted() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    support::mount_login(&server).await;
    support::mount_watch_page(&server, "sm9", "1", "t").await;
    Mock::given(method("GET"))
        .and(path("/api/getwaybackkey"))
        .respond_with(ResponseTemplate::new(200).set_body_string("waybackkey="))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (workspace, period) = workspace(&dir);
    let error = collect(&server, &workspace, period, &VideoRef::new("sm9", None), 1)
        .await
        .unwrap_err();

    assert!(matches!(error, FetchError::Exhausted { .. }), "{error:?}");
    assert!(!workspace.comment_csv("sm9").exists());
}

#[tokio::test]
async fn test_unusable_watch_page_triggers_relogin() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("POST"))
        .and(path("/secure/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "user_session=a; Path=/")
                .append_header("set-cookie", "user_session_secure=b; Path=/"),
        )
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/watch/sm9"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<div id="js-initial-watch-data" data-api-data="not json"></div>"#,
        ))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    support::mount_watch_page(&server, "sm9", "1", "t").await;
    support::mount_waybackkey(&server, "1").await;
    support::mount_thread(
        &server,
        ThreadServer::new(vec![Chat::new(1, START + HOUR, "a")], 10),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let (workspace, period) = workspace(&dir);
    let outcome = collect(&server, &workspace, period, &VideoRef::new("sm9", None), 2)
        .await
        .unwrap();

    assert_eq!(outcome, CollectOutcome::Collected { comments: 1 });
}

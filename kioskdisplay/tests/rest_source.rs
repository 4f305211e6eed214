//! Integration tests for the REST playlist source

use kioskdisplay::{
    DisplayEngine, DisplayError, EmptyReason, EngineOptions, MediaKind, MemoryScreen,
    PlaylistSource, RestPlaylistSource, Surface,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn active_files_json() -> serde_json::Value {
    json!([
        {
            "id": 12,
            "filename": "3f2a_welcome.mp4",
            "original_name": "Welcome.mp4",
            "file_type": "video",
            "display_time": 30,
            "is_active": true,
            "upload_order": 1,
            "uploader_name": "Front desk",
            "uploaded_at": "2024-03-01T09:00:00"
        },
        {
            "id": 13,
            "filename": "menu of the day.pdf",
            "original_name": "Menu.pdf",
            "file_type": "pdf",
            "display_time": 12.5,
            "is_active": true,
            "upload_order": 2
        },
        {
            "id": 14,
            "filename": "sales.xlsx",
            "original_name": "Sales Q1.xlsx",
            "file_type": "document",
            "display_time": 0,
            "is_active": true,
            "upload_order": 3
        }
    ])
}

async fn mount_active(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/files/active"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetch_active_maps_server_records() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_active(&server, active_files_json()).await;

    let source = RestPlaylistSource::new(server.uri())?;
    let snapshot = source.fetch_active().await?;

    assert_eq!(snapshot.len(), 3);
    let names: Vec<_> = snapshot.iter().map(|i| i.display_name()).collect();
    assert_eq!(names, ["Welcome.mp4", "Menu.pdf", "Sales Q1.xlsx"]);

    let video = snapshot.get(0).unwrap();
    assert_eq!(video.id().0, "12");
    assert_eq!(video.media_kind(), &MediaKind::Video);
    assert_eq!(video.display_time(), Duration::from_secs(30));
    assert_eq!(
        video.source_ref(),
        format!("{}/api/serve/3f2a_welcome.mp4", server.uri())
    );

    let pdf = snapshot.get(1).unwrap();
    assert_eq!(pdf.display_time(), Duration::from_millis(12_500));
    assert_eq!(
        pdf.source_ref(),
        format!("{}/api/serve/menu%20of%20the%20day.pdf", server.uri())
    );

    // zero display time is repaired with the default
    let sheet = snapshot.get(2).unwrap();
    assert_eq!(sheet.media_kind(), &MediaKind::Document);
    assert_eq!(sheet.display_time(), Duration::from_secs(10));

    Ok(())
}

#[tokio::test]
async fn test_display_id_header_is_sent() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/files/active"))
        .and(header("X-Display-Id", "lobby-screen"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let source = RestPlaylistSource::builder()
        .base_url(format!("{}/", server.uri()))
        .display_id("lobby-screen")
        .build()?;
    let snapshot = source.fetch_active().await?;
    assert!(snapshot.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_server_error_is_reported() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/files/active"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database locked"))
        .mount(&server)
        .await;

    let source = RestPlaylistSource::new(server.uri())?;
    match source.fetch_active().await {
        Err(DisplayError::Api { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "database locked");
        }
        other => panic!("expected an API error, got {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn test_malformed_body_is_a_json_error() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/files/active"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let source = RestPlaylistSource::new(server.uri())?;
    assert!(matches!(
        source.fetch_active().await,
        Err(DisplayError::Json(_))
    ));

    Ok(())
}

#[tokio::test]
async fn test_engine_shows_first_item_after_reload() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_active(&server, active_files_json()).await;
    let source = RestPlaylistSource::new(server.uri())?;

    let mut engine = DisplayEngine::new(MemoryScreen::new(), EngineOptions::default());
    engine.reload_from(&source).await?;

    let status = engine.status();
    assert_eq!(status.display_name.as_deref(), Some("Welcome.mp4"));
    assert_eq!(status.remaining_seconds, 30);
    assert_eq!(status.position, Some((1, 3)));
    assert!(matches!(engine.screen().current(), Some(Surface::Video(_))));

    Ok(())
}

#[tokio::test]
async fn test_engine_degrades_when_server_fails() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/files/active"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let source = RestPlaylistSource::new(server.uri())?;

    let mut engine = DisplayEngine::new(MemoryScreen::new(), EngineOptions::default());
    assert!(engine.reload_from(&source).await.is_err());

    let status = engine.status();
    assert!(status.is_empty);
    assert_eq!(status.empty_reason, Some(EmptyReason::SourceUnavailable));
    assert!(!engine.has_pending_timers());
    assert!(matches!(
        engine.screen().current(),
        Some(Surface::Placeholder {
            reason: EmptyReason::SourceUnavailable,
            ..
        })
    ));

    Ok(())
}

#[tokio::test]
async fn test_refresh_reloads_only_on_change() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_active(&server, active_files_json()).await;
    let source = RestPlaylistSource::new(server.uri())?;

    let mut engine = DisplayEngine::new(MemoryScreen::new(), EngineOptions::default());
    engine.reload_from(&source).await?;
    engine.next();
    assert_eq!(engine.state().current_index(), Some(1));

    // same playlist: rotation keeps its position
    assert!(!engine.refresh_from(&source).await?);
    assert_eq!(engine.state().current_index(), Some(1));

    server.reset().await;
    mount_active(
        &server,
        json!([{
            "id": 20,
            "filename": "notice.pdf",
            "original_name": "Notice.pdf",
            "file_type": "pdf",
            "display_time": 8
        }]),
    )
    .await;

    assert!(engine.refresh_from(&source).await?);
    let status = engine.status();
    assert_eq!(status.display_name.as_deref(), Some("Notice.pdf"));
    assert_eq!(status.position, Some((1, 1)));

    Ok(())
}

#[tokio::test]
async fn test_refresh_error_keeps_rotation() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_active(&server, active_files_json()).await;
    let source = RestPlaylistSource::new(server.uri())?;

    let mut engine = DisplayEngine::new(MemoryScreen::new(), EngineOptions::default());
    engine.reload_from(&source).await?;

    server.reset().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert!(engine.refresh_from(&source).await.is_err());
    assert_eq!(
        engine.status().display_name.as_deref(),
        Some("Welcome.mp4")
    );
    assert!(engine.has_pending_timers());

    Ok(())
}

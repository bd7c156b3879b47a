//! End-to-end extraction against a local HTTP server and the V8 sandbox

use mockito::{Matcher, Mock, Server, ServerGuard};
use ryx::{Extractor, ExtractorConfig, FailurePolicy, RyxError};

const VIDEO_ID: &str = "dQw4w9WgXcQ";
const PLAYER_PATH: &str = "/s/player/test/base.js";

/// Reverses the signature and drops its first two characters
const PLAYER: &str = r#"var _yt_player={};(function(g){var window=this;var Xy={rv:function(a){a.reverse()},sp:function(a,b){a.splice(0,b)}};Ab=function(a){a=a.split("");Xy.rv(a);Xy.sp(a,2);return a.join("")};g.f=function(c){c&&(c=Ab(decodeURIComponent(c)));return c};})(_yt_player);"#;

const PLAYER_RESPONSE: &str = r#"{"playabilityStatus":{"status":"OK"},"streamingData":{"formats":[{"itag":18,"url":"https://rr1.example/videoplayback?id=18","mimeType":"video/mp4; codecs=\"avc1.42001E, mp4a.40.2\"","quality":"medium","qualityLabel":"360p","width":640,"height":360,"bitrate":503000,"contentLength":"1234567","audioSampleRate":"44100"}],"adaptiveFormats":[{"itag":251,"signatureCipher":"s=0123456789&sp=sig&url=https%3A%2F%2Frr1.example%2Fvideoplayback%3Fid%3D251","mimeType":"audio/webm; codecs=\"opus\"","averageBitrate":129000,"audioSampleRate":"48000"},{"itag":250,"signatureCipher":"s=abcdefghij&sp=sig&url=https%3A%2F%2Frr1.example%2Fvideoplayback%3Fid%3D250","mimeType":"audio/webm; codecs=\"opus\""},{"itag":299,"url":"https://rr1.example/videoplayback?id=299","mimeType":"video/mp4","targetDurationSec":5},{"itag":137,"url":"https://rr1.example/videoplayback?id=137","mimeType":"video/mp4","drmFamilies":["WIDEVINE"]}]}}"#;

fn watch_page(with_player: bool) -> String {
    let config = if with_player {
        r#"<script>ytcfg.set({"PLAYER_JS_URL":"\/s\/player\/test\/base.js"});</script>"#
    } else {
        ""
    };
    format!(
        "<html><head>{config}</head><body><script>var ytInitialPlayerResponse = {PLAYER_RESPONSE};var meta = document.createElement('meta');</script></body></html>"
    )
}

async fn mock_watch(server: &mut ServerGuard, page: String, hits: usize) -> Mock {
    server
        .mock("GET", "/watch")
        .match_query(Matcher::UrlEncoded("v".into(), VIDEO_ID.into()))
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body(page)
        .expect(hits)
        .create_async()
        .await
}

async fn mock_player(server: &mut ServerGuard, body: &str, hits: usize) -> Mock {
    server
        .mock("GET", PLAYER_PATH)
        .with_status(200)
        .with_header("content-type", "text/javascript")
        .with_body(body)
        .expect(hits)
        .create_async()
        .await
}

fn extractor(server: &ServerGuard, policy: FailurePolicy) -> Extractor {
    let config = ExtractorConfig::default()
        .with_origin(format!("{}/", server.url()))
        .with_failure_policy(policy);
    Extractor::with_config(config).unwrap()
}

#[tokio::test]
async fn test_extract_deciphers_and_filters() {
    let mut server = Server::new_async().await;
    let watch = mock_watch(&mut server, watch_page(true), 1).await;
    let player = mock_player(&mut server, PLAYER, 1).await;

    let extraction = extractor(&server, FailurePolicy::FailFast)
        .extract(&format!("https://www.youtube.com/watch?v={VIDEO_ID}"))
        .await
        .unwrap();

    assert_eq!(extraction.video_id, VIDEO_ID);
    assert!(extraction.failures.is_empty());

    let itags: Vec<_> = extraction.formats.iter().map(|f| f.itag).collect();
    assert_eq!(itags, vec![Some(18), Some(251), Some(250)]);

    let progressive = &extraction.formats[0];
    assert_eq!(
        progressive.url.as_str(),
        "https://rr1.example/videoplayback?id=18"
    );
    assert_eq!(progressive.file_extension.as_deref(), Some("mp4"));
    assert_eq!(progressive.quality_label.as_deref(), Some("360p"));
    assert_eq!(progressive.bitrate, Some(503.0));
    assert_eq!(progressive.filesize, Some(1234567));

    let audio = &extraction.formats[1];
    assert_eq!(
        audio.url.as_str(),
        "https://rr1.example/videoplayback?id=251&sig=76543210"
    );
    assert_eq!(audio.file_extension.as_deref(), Some("webm"));
    assert_eq!(audio.bitrate, Some(129.0));
    assert_eq!(audio.sample_rate, Some(48000));
    assert!(audio.is_audio_only());

    assert_eq!(
        extraction.formats[2].url.as_str(),
        "https://rr1.example/videoplayback?id=250&sig=hgfedcba"
    );

    watch.assert_async().await;
    player.assert_async().await;
}

#[tokio::test]
async fn test_compiled_transform_shared_across_extractions() {
    let mut server = Server::new_async().await;
    let watch = mock_watch(&mut server, watch_page(true), 2).await;
    let player = mock_player(&mut server, PLAYER, 1).await;

    let extractor = extractor(&server, FailurePolicy::FailFast);
    let first = extractor.formats(VIDEO_ID).await.unwrap();
    let second = extractor.formats(VIDEO_ID).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(extractor.cipher().cache().len().await, 1);

    watch.assert_async().await;
    player.assert_async().await;
}

#[tokio::test]
async fn test_unlocatable_transform() {
    let mut server = Server::new_async().await;
    let watch = mock_watch(&mut server, watch_page(true), 2).await;
    let player = mock_player(
        &mut server,
        "var _yt_player={};(function(g){g.x=1;})(_yt_player);",
        2,
    )
    .await;

    let result = extractor(&server, FailurePolicy::FailFast)
        .extract(VIDEO_ID)
        .await;
    assert!(matches!(result, Err(RyxError::TransformLocationFailed(_))));

    let extraction = extractor(&server, FailurePolicy::Collect)
        .extract(VIDEO_ID)
        .await
        .unwrap();
    assert_eq!(extraction.formats.len(), 1);
    assert_eq!(extraction.formats[0].itag, Some(18));
    let failed: Vec<_> = extraction.failures.iter().map(|f| f.itag).collect();
    assert_eq!(failed, vec![Some(251), Some(250)]);

    // One failed build per extraction
    watch.assert_async().await;
    player.assert_async().await;
}

#[tokio::test]
async fn test_page_without_player_keeps_direct_formats() {
    let mut server = Server::new_async().await;
    let _watch = mock_watch(&mut server, watch_page(false), 1).await;
    let player = mock_player(&mut server, PLAYER, 0).await;

    let formats = extractor(&server, FailurePolicy::FailFast)
        .formats(VIDEO_ID)
        .await
        .unwrap();
    assert_eq!(formats.len(), 1);
    assert_eq!(formats[0].itag, Some(18));

    player.assert_async().await;
}

#[tokio::test]
async fn test_missing_page_is_fetch_error() {
    let mut server = Server::new_async().await;
    let _watch = server
        .mock("GET", "/watch")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let result = extractor(&server, FailurePolicy::Collect)
        .extract(VIDEO_ID)
        .await;
    match result {
        Err(e) => assert!(e.is_fetch_error()),
        Ok(_) => panic!("expected a fetch error"),
    }
}

//! Transcript Source: supplies timestamped segments for a content id.
//!
//! `AppState` holds an `Arc<dyn TranscriptSource>`, so handlers never know which backend
//! they are talking to. Failures are returned as `SourceError` and are never retried
//! here; the HTTP layer turns them into a placeholder quote.
//!
//! `YoutubeTranscriptSource` talks to YouTube directly:
//! 1. GET the watch page and read `INNERTUBE_API_KEY`
//! 2. POST the innertube `player` endpoint for the caption track list
//! 3. Pick a track by language preference (manual before auto-generated)
//! 4. GET the track's timed-text XML and parse `<text start dur>` elements

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

use crate::insights::extractor::Segment;

pub const DEFAULT_BASE_URL: &str = "https://www.youtube.com";
const INNERTUBE_CLIENT_NAME: &str = "ANDROID";
const INNERTUBE_CLIENT_VERSION: &str = "20.10.38";

static API_KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#).unwrap());

static TEXT_ELEMENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<text\s+start="([^"]*)"(?:\s+dur="([^"]*)")?[^>/]*(?:/>|>(.*?)</text>)"#)
        .unwrap()
});

static INLINE_TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Content {0} was not found")]
    NotFound(String),

    #[error("No transcript available in {requested:?}; available languages: {available:?}")]
    LanguageUnavailable {
        requested: Vec<String>,
        available: Vec<String>,
    },

    #[error("Transcript unavailable: {0}")]
    Unavailable(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response from transcript source: {0}")]
    Malformed(String),
}

/// Anything that can turn a content id into ordered transcript segments.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    async fn fetch(
        &self,
        content_id: &str,
        languages: &[String],
    ) -> Result<Vec<Segment>, SourceError>;
}

// ────────────────────────────────────────────────────────────────────────────
// YouTube backend
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct YoutubeTranscriptSource {
    client: Client,
    /// Scheme and host for the watch page and innertube API, without a trailing slash.
    base_url: String,
}

impl YoutubeTranscriptSource {
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_api_key(&self, video_id: &str) -> Result<String, SourceError> {
        let response = self
            .client
            .get(format!("{}/watch", self.base_url))
            .query(&[("v", video_id)])
            .header("Accept-Language", "en-US")
            .send()
            .await?;
        let html = check_status(response, video_id)?.text().await?;
        extract_api_key(&html)
    }

    async fn fetch_caption_tracks(
        &self,
        video_id: &str,
        api_key: &str,
    ) -> Result<Vec<CaptionTrack>, SourceError> {
        let body = json!({
            "context": {
                "client": {
                    "clientName": INNERTUBE_CLIENT_NAME,
                    "clientVersion": INNERTUBE_CLIENT_VERSION,
                }
            },
            "videoId": video_id,
        });

        let response = self
            .client
            .post(format!("{}/youtubei/v1/player", self.base_url))
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?;
        let player: PlayerResponse = check_status(response, video_id)?.json().await?;
        caption_tracks(player, video_id)
    }
}

#[async_trait]
impl TranscriptSource for YoutubeTranscriptSource {
    async fn fetch(
        &self,
        content_id: &str,
        languages: &[String],
    ) -> Result<Vec<Segment>, SourceError> {
        let api_key = self.fetch_api_key(content_id).await?;
        let tracks = self.fetch_caption_tracks(content_id, &api_key).await?;
        let track = select_track(&tracks, languages)?;
        debug!(
            "Selected caption track {} (generated: {}) for {content_id}",
            track.language_code,
            track.is_generated()
        );

        let url = track.base_url.replace("&fmt=srv3", "");
        let response = self.client.get(&url).send().await?;
        let xml = check_status(response, content_id)?.text().await?;
        let segments = parse_transcript_xml(&xml);

        info!(
            "Fetched {} transcript segments for {content_id}",
            segments.len()
        );
        Ok(segments)
    }
}

fn check_status(
    response: reqwest::Response,
    video_id: &str,
) -> Result<reqwest::Response, SourceError> {
    match response.status() {
        s if s.is_success() => Ok(response),
        StatusCode::NOT_FOUND => Err(SourceError::NotFound(video_id.to_string())),
        StatusCode::TOO_MANY_REQUESTS => Err(SourceError::Unavailable(
            "YouTube is rate limiting requests".to_string(),
        )),
        s => Err(SourceError::Unavailable(format!("YouTube returned HTTP {s}"))),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Innertube response models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    playability_status: Option<PlayabilityStatus>,
    captions: Option<Captions>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: String,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Captions {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    tracklist: Option<Tracklist>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Tracklist {
    #[serde(default)]
    caption_tracks: Vec<CaptionTrack>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    language_code: String,
    kind: Option<String>,
}

impl CaptionTrack {
    fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pure helpers
// ────────────────────────────────────────────────────────────────────────────

fn extract_api_key(html: &str) -> Result<String, SourceError> {
    if let Some(caps) = API_KEY_PATTERN.captures(html) {
        return Ok(caps[1].to_string());
    }
    if html.contains("class=\"g-recaptcha\"") {
        return Err(SourceError::Unavailable(
            "YouTube is asking for a captcha; too many requests".to_string(),
        ));
    }
    Err(SourceError::Malformed(
        "watch page did not contain an innertube API key".to_string(),
    ))
}

fn caption_tracks(
    player: PlayerResponse,
    video_id: &str,
) -> Result<Vec<CaptionTrack>, SourceError> {
    if let Some(status) = &player.playability_status {
        if status.status != "OK" {
            let reason = status.reason.clone().unwrap_or_default();
            return Err(if status.status == "ERROR" {
                SourceError::NotFound(video_id.to_string())
            } else {
                SourceError::Unavailable(format!("{}: {}", status.status, reason))
            });
        }
    }

    let tracks = player
        .captions
        .and_then(|c| c.tracklist)
        .map(|t| t.caption_tracks)
        .unwrap_or_default();

    if tracks.is_empty() {
        return Err(SourceError::Unavailable(format!(
            "transcripts are disabled for {video_id}"
        )));
    }
    Ok(tracks)
}

/// Picks the first track matching the language preference.
/// Manually created tracks win over auto-generated ones in the same language.
fn select_track<'a>(
    tracks: &'a [CaptionTrack],
    languages: &[String],
) -> Result<&'a CaptionTrack, SourceError> {
    for language in languages {
        let mut matching = tracks.iter().filter(|t| &t.language_code == language);
        let manual = matching.clone().find(|t| !t.is_generated());
        if let Some(track) = manual.or_else(|| matching.next()) {
            return Ok(track);
        }
    }
    Err(SourceError::LanguageUnavailable {
        requested: languages.to_vec(),
        available: tracks.iter().map(|t| t.language_code.clone()).collect(),
    })
}

/// Parses YouTube timed-text XML into segments, in document order.
/// Empty or self-closing elements and unparsable `start` attributes are skipped.
fn parse_transcript_xml(xml: &str) -> Vec<Segment> {
    TEXT_ELEMENT_PATTERN
        .captures_iter(xml)
        .filter_map(|caps| {
            let start_time = caps[1].parse::<f64>().ok()?;
            let raw = caps.get(3).map(|m| m.as_str()).filter(|t| !t.is_empty())?;
            // Timed text is often double-escaped (`&amp;#39;`).
            let text = unescape_html(&unescape_html(raw));
            let text = INLINE_TAG_PATTERN.replace_all(&text, "").into_owned();
            Some(Segment::new(text, start_time.max(0.0)))
        })
        .collect()
}

fn unescape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest.find(';').and_then(|semi| {
            let entity = &rest[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, semi))
        });

        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn track(lang: &str, kind: Option<&str>) -> CaptionTrack {
        CaptionTrack {
            base_url: format!("https://www.youtube.com/api/timedtext?lang={lang}"),
            language_code: lang.to_string(),
            kind: kind.map(str::to_string),
        }
    }

    fn langs(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_extract_api_key() {
        let html = r#"<script>ytcfg.set({"INNERTUBE_API_KEY": "AIzaSyA-test_key1"});</script>"#;
        assert_eq!(extract_api_key(html).unwrap(), "AIzaSyA-test_key1");
    }

    #[test]
    fn test_extract_api_key_captcha() {
        let err = extract_api_key(r#"<div class="g-recaptcha"></div>"#).unwrap_err();
        assert!(matches!(err, SourceError::Unavailable(_)));
    }

    #[test]
    fn test_extract_api_key_missing() {
        let err = extract_api_key("<html></html>").unwrap_err();
        assert!(matches!(err, SourceError::Malformed(_)));
    }

    #[test]
    fn test_select_track_prefers_manual() {
        let tracks = vec![track("en", Some("asr")), track("en", None)];
        let selected = select_track(&tracks, &langs(&["en"])).unwrap();
        assert!(!selected.is_generated());
    }

    #[test]
    fn test_select_track_falls_back_to_generated() {
        let tracks = vec![track("sw", None), track("en", Some("asr"))];
        let selected = select_track(&tracks, &langs(&["en"])).unwrap();
        assert_eq!(selected.language_code, "en");
        assert!(selected.is_generated());
    }

    #[test]
    fn test_select_track_respects_preference_order() {
        let tracks = vec![track("en", None), track("sw", None)];
        let selected = select_track(&tracks, &langs(&["sw", "en"])).unwrap();
        assert_eq!(selected.language_code, "sw");
    }

    #[test]
    fn test_select_track_language_unavailable() {
        let tracks = vec![track("fr", None)];
        match select_track(&tracks, &langs(&["en"])) {
            Err(SourceError::LanguageUnavailable {
                requested,
                available,
            }) => {
                assert_eq!(requested, vec!["en"]);
                assert_eq!(available, vec!["fr"]);
            }
            other => panic!("expected LanguageUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn test_caption_tracks_from_player_json() {
        let player: PlayerResponse = serde_json::from_value(json!({
            "playabilityStatus": { "status": "OK" },
            "captions": {
                "playerCaptionsTracklistRenderer": {
                    "captionTracks": [
                        { "baseUrl": "https://x/timedtext", "languageCode": "en", "kind": "asr" }
                    ]
                }
            }
        }))
        .unwrap();
        let tracks = caption_tracks(player, "vid").unwrap();
        assert_eq!(tracks.len(), 1);
        assert!(tracks[0].is_generated());
    }

    #[test]
    fn test_caption_tracks_error_status_is_not_found() {
        let player: PlayerResponse = serde_json::from_value(json!({
            "playabilityStatus": { "status": "ERROR", "reason": "This video is unavailable" }
        }))
        .unwrap();
        assert!(matches!(
            caption_tracks(player, "vid"),
            Err(SourceError::NotFound(_))
        ));
    }

    #[test]
    fn test_caption_tracks_disabled() {
        let player: PlayerResponse = serde_json::from_value(json!({
            "playabilityStatus": { "status": "OK" }
        }))
        .unwrap();
        assert!(matches!(
            caption_tracks(player, "vid"),
            Err(SourceError::Unavailable(_))
        ));
    }

    #[test]
    fn test_parse_transcript_xml() {
        let xml = r#"<?xml version="1.0" encoding="utf-8" ?><transcript>
<text start="0.08" dur="2.5">Hey there, parents</text>
<text start="12.7" dur="3.1">It&amp;#39;s <i>important</i> to listen</text>
<text start="bogus" dur="1">skipped</text>
<text start="20.0" dur="1.0"></text>
</transcript>"#;

        let segments = parse_transcript_xml(xml);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0], Segment::new("Hey there, parents", 0.08));
        assert_eq!(segments[1].text, "It's important to listen");
        assert_eq!(segments[1].start_time, 12.7);
    }

    #[test]
    fn test_self_closing_element_keeps_next_timestamp() {
        let xml = r#"<transcript><text start="1.0" dur="2.0"/><text start="30.5" dur="2.0">This is an important lesson for parents</text></transcript>"#;

        let segments = parse_transcript_xml(xml);
        assert_eq!(
            segments,
            vec![Segment::new("This is an important lesson for parents", 30.5)]
        );
    }

    #[test]
    fn test_unescape_html() {
        assert_eq!(
            unescape_html("a &lt;b&gt; &quot;c&quot; &#39;d&#x27;"),
            "a <b> \"c\" 'd'"
        );
        assert_eq!(unescape_html("fish & chips &unknown;"), "fish & chips &unknown;");
    }

    // ── HTTP chain against a mock YouTube ────────────────────────────────────

    const VIDEO_ID: &str = "dQw4w9WgXcQ";

    fn source_for(server: &MockServer) -> YoutubeTranscriptSource {
        YoutubeTranscriptSource::with_base_url(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    async fn mount_watch_page(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/watch"))
            .and(query_param("v", VIDEO_ID))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<script>ytcfg.set({"INNERTUBE_API_KEY":"test-key"});</script>"#,
            ))
            .mount(server)
            .await;
    }

    async fn mount_player(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path("/youtubei/v1/player"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    async fn watch_page_error(status: u16) -> SourceError {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/watch"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
        source_for(&server)
            .fetch(VIDEO_ID, &langs(&["en"]))
            .await
            .unwrap_err()
    }

    #[tokio::test]
    async fn test_fetch_follows_watch_player_timedtext_chain() {
        let server = MockServer::start().await;
        mount_watch_page(&server).await;
        mount_player(
            &server,
            json!({
                "playabilityStatus": { "status": "OK" },
                "captions": {
                    "playerCaptionsTracklistRenderer": {
                        "captionTracks": [{
                            "baseUrl": format!("{}/api/timedtext?v={VIDEO_ID}&lang=en&fmt=srv3", server.uri()),
                            "languageCode": "en"
                        }]
                    }
                }
            }),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/api/timedtext"))
            .and(query_param("lang", "en"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<transcript><text start="4.2" dur="3.0">Remember to listen first</text></transcript>"#,
            ))
            .mount(&server)
            .await;

        let segments = source_for(&server)
            .fetch(VIDEO_ID, &langs(&["en"]))
            .await
            .unwrap();
        assert_eq!(segments, vec![Segment::new("Remember to listen first", 4.2)]);
    }

    #[tokio::test]
    async fn test_fetch_reports_missing_language() {
        let server = MockServer::start().await;
        mount_watch_page(&server).await;
        mount_player(
            &server,
            json!({
                "playabilityStatus": { "status": "OK" },
                "captions": {
                    "playerCaptionsTracklistRenderer": {
                        "captionTracks": [{ "baseUrl": "http://unused", "languageCode": "fr" }]
                    }
                }
            }),
        )
        .await;

        let err = source_for(&server)
            .fetch(VIDEO_ID, &langs(&["en"]))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::LanguageUnavailable { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_fetch_player_error_status_is_not_found() {
        let server = MockServer::start().await;
        mount_watch_page(&server).await;
        mount_player(
            &server,
            json!({ "playabilityStatus": { "status": "ERROR", "reason": "Video unavailable" } }),
        )
        .await;

        let err = source_for(&server)
            .fetch(VIDEO_ID, &langs(&["en"]))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::NotFound(ref id) if id == VIDEO_ID), "got {err:?}");
    }

    #[tokio::test]
    async fn test_http_404_maps_to_not_found() {
        let err = watch_page_error(404).await;
        assert!(matches!(err, SourceError::NotFound(ref id) if id == VIDEO_ID), "got {err:?}");
    }

    #[tokio::test]
    async fn test_http_429_maps_to_unavailable() {
        match watch_page_error(429).await {
            SourceError::Unavailable(msg) => assert!(msg.contains("rate limiting"), "{msg}"),
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_500_maps_to_unavailable() {
        match watch_page_error(500).await {
            SourceError::Unavailable(msg) => assert!(msg.contains("500"), "{msg}"),
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }
}

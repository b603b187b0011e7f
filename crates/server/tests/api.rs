use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use sha2::{Digest, Sha256};
use tower::ServiceExt;

use nepali_tts_config::Settings;
use nepali_tts_core::{
    Error, Result, TextToSpeech, TranslateOptions, TranslationResult, Translator, Waveform,
    ENGLISH, NEPALI,
};
use nepali_tts_pipeline::AudioCache;
use nepali_tts_server::{create_router, AppState};

const ORIGIN: &str = "http://localhost:5173";

struct CountingTts {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl TextToSpeech for CountingTts {
    async fn synthesize(&self, text: &str) -> Result<Waveform> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::synthesis("model crashed"));
        }
        // Length-dependent output so different texts give different files
        let n = text.chars().count();
        Ok(Waveform::new(
            (0..n * 10).map(|i| ((i as f32) * 0.1).sin() * 0.5).collect(),
            22050,
        ))
    }

    fn sample_rate(&self) -> u32 {
        22050
    }

    fn model_name(&self) -> &str {
        "counting"
    }
}

struct MockTranslator {
    seen: Mutex<Vec<String>>,
    output: std::result::Result<String, String>,
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(
        &self,
        text: &str,
        _options: &TranslateOptions,
    ) -> Result<TranslationResult> {
        self.seen.lock().unwrap().push(text.to_string());
        match &self.output {
            Ok(out) => Ok(TranslationResult {
                text: out.clone(),
                model_id: "mock".to_string(),
                src_lang: ENGLISH.to_string(),
                tgt_lang: NEPALI.to_string(),
            }),
            Err(msg) => Err(Error::translation(msg.clone())),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

struct Harness {
    app: Router,
    dir: tempfile::TempDir,
    tts: Arc<CountingTts>,
    translator: Arc<MockTranslator>,
}

fn harness_with(
    settings: Settings,
    fail_tts: bool,
    translation: std::result::Result<&str, &str>,
) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let tts = Arc::new(CountingTts {
        calls: AtomicUsize::new(0),
        fail: fail_tts,
    });
    let translator = Arc::new(MockTranslator {
        seen: Mutex::new(Vec::new()),
        output: translation.map(str::to_string).map_err(str::to_string),
    });
    let cache = Arc::new(AudioCache::open(dir.path(), 16, 0.98).unwrap());

    let state = AppState::new(settings, tts.clone(), translator.clone(), cache);
    Harness {
        app: create_router(state),
        dir,
        tts,
        translator,
    }
}

fn harness() -> Harness {
    harness_with(Settings::default(), false, Ok("नमस्ते संसार"))
}

fn post(uri: &str, origin: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-Forwarded-For", "203.0.113.9");
    if let Some(origin) = origin {
        builder = builder.header(header::ORIGIN, origin);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn json_text(text: &str) -> String {
    serde_json::json!({ "text": text }).to_string()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn expected_key(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect::<String>()[..16].to_string()
}

#[tokio::test]
async fn health_reports_sample_rate() {
    let h = harness();
    let res = h
        .app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json, serde_json::json!({ "ok": true, "sample_rate": 22050 }));
}

#[tokio::test]
async fn tts_writes_wav_named_by_cache_key() {
    let h = harness();
    let res = h
        .app
        .clone()
        .oneshot(post("/api/tts", Some(ORIGIN), &json_text("नमस्ते")))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "audio/wav");
    assert_eq!(res.headers()["x-cache"], "MISS");
    assert_eq!(res.headers()["x-cache-key"], expected_key("नमस्ते").as_str());

    let bytes = body_bytes(res).await;
    assert_eq!(&bytes[..4], b"RIFF");

    let path = h.dir.path().join(format!("{}.wav", expected_key("नमस्ते")));
    assert!(path.is_file());

    let reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.spec().sample_rate, 22050);
    assert_eq!(reader.spec().bits_per_sample, 16);
}

#[tokio::test]
async fn repeated_text_is_served_from_cache() {
    let h = harness();

    let first = h
        .app
        .clone()
        .oneshot(post("/api/tts", Some(ORIGIN), &json_text("नमस्ते")))
        .await
        .unwrap();
    assert_eq!(first.headers()["x-cache"], "MISS");
    let first = body_bytes(first).await;

    // Surrounding whitespace is trimmed before keying
    let second = h
        .app
        .clone()
        .oneshot(post("/api/tts", Some(ORIGIN), &json_text("  नमस्ते \n")))
        .await
        .unwrap();
    assert_eq!(second.headers()["x-cache"], "HIT");
    let second = body_bytes(second).await;

    assert_eq!(first, second);
    assert_eq!(h.tts.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn english_is_translated_then_spoken() {
    let h = harness();
    let res = h
        .app
        .clone()
        .oneshot(post("/api/tts-english", Some(ORIGIN), &json_text(" hello ")))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "audio/wav");
    assert_eq!(h.translator.seen.lock().unwrap().as_slice(), ["hello"]);

    let key = expected_key("नमस्ते संसार");
    assert_eq!(res.headers()["x-cache-key"], key.as_str());
    assert!(h.dir.path().join(format!("{}.wav", key)).is_file());
    assert_eq!(h.tts.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn translated_text_shares_cache_with_direct_requests() {
    let h = harness();

    let direct = h
        .app
        .clone()
        .oneshot(post("/api/tts", Some(ORIGIN), &json_text("नमस्ते संसार")))
        .await
        .unwrap();
    assert_eq!(direct.status(), StatusCode::OK);

    let english = h
        .app
        .clone()
        .oneshot(post("/api/tts-english", Some(ORIGIN), &json_text("hello")))
        .await
        .unwrap();
    assert_eq!(english.headers()["x-cache"], "HIT");
    assert_eq!(h.tts.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn wrong_origin_is_forbidden() {
    let h = harness();
    let res = h
        .app
        .clone()
        .oneshot(post(
            "/api/tts",
            Some("https://evil.example"),
            &json_text("नमस्ते"),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(res).await,
        serde_json::json!({ "error": "origin_not_allowed" })
    );
    assert_eq!(h.tts.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_origin_is_forbidden_on_both_endpoints() {
    let h = harness();
    for uri in ["/api/tts", "/api/tts-english"] {
        let res = h
            .app
            .clone()
            .oneshot(post(uri, None, &json_text("hello")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN, "{}", uri);
    }
    assert!(h.translator.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn twenty_first_request_is_rate_limited() {
    let h = harness();

    for i in 0..20 {
        let res = h
            .app
            .clone()
            .oneshot(post("/api/tts", Some(ORIGIN), &json_text("नमस्ते")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK, "request {}", i + 1);
    }

    let res = h
        .app
        .clone()
        .oneshot(post("/api/tts", Some(ORIGIN), &json_text("नमस्ते")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

    let retry_after: u64 = res.headers()[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after >= 1 && retry_after <= 60);

    let json = body_json(res).await;
    assert_eq!(json["error"], "rate_limited");
    assert_eq!(json["retry_after"], retry_after);
}

#[tokio::test]
async fn rate_limit_is_per_client() {
    let mut settings = Settings::default();
    settings.server.rate_limit.max_requests = 1;
    let h = harness_with(settings, false, Ok("नमस्ते"));

    let request = |client: &str| {
        Request::builder()
            .method("POST")
            .uri("/api/tts")
            .header(header::ORIGIN, ORIGIN)
            .header("X-Forwarded-For", client)
            .body(Body::from(json_text("नमस्ते")))
            .unwrap()
    };

    let res = h.app.clone().oneshot(request("10.0.0.1")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let res = h.app.clone().oneshot(request("10.0.0.1")).await.unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    let res = h.app.clone().oneshot(request("10.0.0.2, 10.0.0.1")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn max_length_boundary() {
    let h = harness();

    let at_limit = "क".repeat(300);
    let res = h
        .app
        .clone()
        .oneshot(post("/api/tts", Some(ORIGIN), &json_text(&at_limit)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let over_limit = "क".repeat(301);
    let res = h
        .app
        .clone()
        .oneshot(post("/api/tts", Some(ORIGIN), &json_text(&over_limit)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(res).await,
        serde_json::json!({ "error": "text_too_long", "max_chars": 300 })
    );
}

#[tokio::test]
async fn blank_text_is_missing_on_both_endpoints() {
    let h = harness();
    for uri in ["/api/tts", "/api/tts-english"] {
        let res = h
            .app
            .clone()
            .oneshot(post(uri, Some(ORIGIN), &json_text("  \n\t ")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body_json(res).await["error"], "missing_text");
    }
    assert!(h.translator.seen.lock().unwrap().is_empty());
    assert_eq!(h.tts.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn malformed_bodies_are_missing_text() {
    let h = harness();
    for body in ["not json", "", "[1, 2]", r#"{"text": null}"#, r#"{"txt": "नमस्ते"}"#] {
        let res = h
            .app
            .clone()
            .oneshot(post("/api/tts", Some(ORIGIN), body))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "body {:?}", body);
        assert_eq!(body_json(res).await["error"], "missing_text");
    }
}

#[tokio::test]
async fn empty_translation_fails() {
    let h = harness_with(Settings::default(), false, Ok("   "));
    let res = h
        .app
        .clone()
        .oneshot(post("/api/tts-english", Some(ORIGIN), &json_text("hello")))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(res).await,
        serde_json::json!({ "error": "translation_failed" })
    );
    assert_eq!(h.tts.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn translator_error_fails() {
    let h = harness_with(Settings::default(), false, Err("model not loaded"));
    let res = h
        .app
        .clone()
        .oneshot(post("/api/tts-english", Some(ORIGIN), &json_text("hello")))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(res).await["error"], "translation_failed");
}

#[tokio::test]
async fn translated_text_has_its_own_length_check() {
    let long = "न".repeat(301);
    let h = harness_with(Settings::default(), false, Ok(long.as_str()));
    let res = h
        .app
        .clone()
        .oneshot(post("/api/tts-english", Some(ORIGIN), &json_text("hello")))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(res).await["error"], "text_too_long");
    assert_eq!(h.tts.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn synthesis_failure_is_reported() {
    let h = harness_with(Settings::default(), true, Ok("नमस्ते"));
    let res = h
        .app
        .clone()
        .oneshot(post("/api/tts", Some(ORIGIN), &json_text("नमस्ते")))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(res).await,
        serde_json::json!({ "error": "synthesis_failed" })
    );

    // Nothing half-written is left in the cache
    let entries = std::fs::read_dir(h.dir.path()).unwrap().count();
    assert_eq!(entries, 0);
}

#[tokio::test]
async fn metrics_disabled_without_recorder() {
    let h = harness();
    let res = h
        .app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

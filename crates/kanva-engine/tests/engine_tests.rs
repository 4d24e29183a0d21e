// SPDX-FileCopyrightText: 2026 Kanva Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests of the orchestration paths with a fake chat channel
//! and a scripted generator, backed by an in-memory database.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use kanva_config::KanvaConfig;
use kanva_core::KanvaError;
use kanva_core::traits::{ChannelPort, ImageGenerator};
use kanva_core::types::{
    BackendConfig, BackendVariant, DownloadedImage, ImageResult, InboundEvent, Quality,
};
use kanva_engine::payload::FailedGenerationPayload;
use kanva_engine::replay::{self, ReplayOutcome};
use kanva_engine::{Engine, EngineDeps, MediaGroupCache, ProviderFactory, generation};
use kanva_storage::Database;
use kanva_storage::queries::failed;
use kanva_storage::queries::services::{self, NewBackendService};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    SendText { chat_id: i64, text: String, reply_to: Option<i32> },
    EditText { message_id: i32, text: String },
    DeleteMessage { message_id: i32 },
    SendPhoto { filename: String },
    SendDocument { filename: String },
    Download { file_ref: String },
}

/// Records every outbound operation and serves canned downloads.
#[derive(Default)]
struct FakeChannel {
    calls: Mutex<Vec<Call>>,
    next_id: AtomicI32,
    fail_downloads: bool,
}

impl FakeChannel {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn push(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ChannelPort for FakeChannel {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i32>,
    ) -> Result<i32, KanvaError> {
        self.push(Call::SendText {
            chat_id,
            text: text.to_string(),
            reply_to,
        });
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst) + 100)
    }

    async fn edit_text(
        &self,
        _chat_id: i64,
        message_id: i32,
        text: &str,
    ) -> Result<(), KanvaError> {
        self.push(Call::EditText {
            message_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn delete_message(&self, _chat_id: i64, message_id: i32) -> Result<(), KanvaError> {
        self.push(Call::DeleteMessage { message_id });
        Ok(())
    }

    async fn send_photo(
        &self,
        _chat_id: i64,
        _data: Vec<u8>,
        filename: &str,
        _reply_to: Option<i32>,
    ) -> Result<i32, KanvaError> {
        self.push(Call::SendPhoto {
            filename: filename.to_string(),
        });
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst) + 100)
    }

    async fn send_document(
        &self,
        _chat_id: i64,
        _data: Vec<u8>,
        filename: &str,
        _caption: Option<&str>,
        _reply_to: Option<i32>,
    ) -> Result<i32, KanvaError> {
        self.push(Call::SendDocument {
            filename: filename.to_string(),
        });
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst) + 100)
    }

    async fn download_image(&self, file_ref: &str) -> Result<DownloadedImage, KanvaError> {
        self.push(Call::Download {
            file_ref: file_ref.to_string(),
        });
        if self.fail_downloads {
            return Err(KanvaError::Channel {
                message: "file gone".to_string(),
                source: None,
            });
        }
        Ok(DownloadedImage {
            data: vec![0xFF, 0xD8, 0xFF],
            mime_type: "image/jpeg".to_string(),
        })
    }
}

/// Pops one scripted result per generate call; an empty script succeeds.
struct ScriptedGenerator {
    script: Mutex<VecDeque<Result<Vec<u8>, KanvaError>>>,
    calls: AtomicI32,
}

#[async_trait]
impl ImageGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        _prompt: &str,
        _images: &[DownloadedImage],
        _quality: Quality,
        _aspect_ratio: Option<&str>,
    ) -> Result<ImageResult, KanvaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(data)) => Ok(ImageResult { image_data: data }),
            Some(Err(err)) => Err(err),
            None => Ok(ImageResult {
                image_data: vec![9, 9, 9],
            }),
        }
    }
}

struct FakeFactory {
    generator: Arc<ScriptedGenerator>,
    seen_backends: Mutex<Vec<BackendConfig>>,
}

impl FakeFactory {
    fn always_ok() -> Self {
        Self::scripted(Vec::new())
    }

    fn scripted(script: Vec<Result<Vec<u8>, KanvaError>>) -> Self {
        Self {
            generator: Arc::new(ScriptedGenerator {
                script: Mutex::new(script.into_iter().collect()),
                calls: AtomicI32::new(0),
            }),
            seen_backends: Mutex::new(Vec::new()),
        }
    }

    fn always_failing() -> Self {
        // More entries than the attempt cap; every call fails.
        Self::scripted(
            (0..10)
                .map(|i| {
                    Err(KanvaError::Provider {
                        message: format!("API error: boom {i}"),
                        source: None,
                    })
                })
                .collect(),
        )
    }
}

#[async_trait]
impl ProviderFactory for FakeFactory {
    fn create(&self, backend: &BackendConfig) -> Result<Box<dyn ImageGenerator>, KanvaError> {
        self.seen_backends.lock().unwrap().push(backend.clone());
        let generator = self.generator.clone();
        Ok(Box::new(SharedGenerator(generator)))
    }
}

struct SharedGenerator(Arc<ScriptedGenerator>);

#[async_trait]
impl ImageGenerator for SharedGenerator {
    async fn generate(
        &self,
        prompt: &str,
        images: &[DownloadedImage],
        quality: Quality,
        aspect_ratio: Option<&str>,
    ) -> Result<ImageResult, KanvaError> {
        self.0.generate(prompt, images, quality, aspect_ratio).await
    }
}

async fn deps_with(factory: FakeFactory, env_key: Option<&str>) -> (EngineDeps, Arc<FakeChannel>) {
    let channel = Arc::new(FakeChannel::default());
    let db = Arc::new(Database::open_in_memory().await.expect("open"));
    let mut config = KanvaConfig::default();
    config.gemini.api_key = env_key.map(str::to_string);
    let deps = EngineDeps {
        channel: channel.clone(),
        db,
        factory: Arc::new(factory),
        media_groups: Arc::new(MediaGroupCache::new()),
        config: Arc::new(config),
    };
    (deps, channel)
}

fn text_event(text: &str) -> InboundEvent {
    InboundEvent {
        user_id: 7,
        chat_id: 42,
        message_id: 1,
        text: Some(text.to_string()),
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn text_prompt_generates_and_delivers() {
    let (deps, channel) = deps_with(FakeFactory::always_ok(), Some("env-key")).await;

    generation::handle_generation(&deps, &text_event("a red fox @4K"))
        .await
        .expect("handle");

    let calls = channel.calls();
    assert!(matches!(
        &calls[0],
        Call::SendText { text, reply_to: Some(1), .. } if text.contains("env-default")
    ));
    assert!(calls.iter().any(|c| matches!(c, Call::DeleteMessage { .. })));
    assert!(calls.contains(&Call::SendPhoto {
        filename: "preview.png".to_string()
    }));
    assert!(calls.contains(&Call::SendDocument {
        filename: "generated_4K.png".to_string()
    }));
    assert_eq!(failed::count(&deps.db).await.expect("count"), 0);
}

#[tokio::test(start_paused = true)]
async fn exhausted_generation_is_queued_with_last_error() {
    let (deps, channel) = deps_with(FakeFactory::always_failing(), Some("env-key")).await;

    generation::handle_generation(&deps, &text_event("a red fox @16:9"))
        .await
        .expect("handle");

    let entry = failed::pick_random(&deps.db)
        .await
        .expect("pick")
        .expect("queued");
    assert_eq!(entry.user_id, 7);
    assert_eq!(entry.chat_id, 42);
    assert_eq!(entry.reply_to_message_id, 1);
    // Six attempts ran; the stored error is the last one, verbatim.
    assert_eq!(entry.last_error, "provider error: API error: boom 5");

    let payload = FailedGenerationPayload::from_json(&entry.payload).expect("payload");
    assert_eq!(payload.prompt, "a red fox");
    assert_eq!(payload.aspect_ratio.as_deref(), Some("16:9"));
    assert_eq!(payload.quality, Quality::Medium);

    let calls = channel.calls();
    assert!(calls.iter().any(
        |c| matches!(c, Call::EditText { text, .. } if text.contains("queued for automatic retry"))
    ));
    assert!(!calls.iter().any(|c| matches!(c, Call::SendPhoto { .. })));
}

#[tokio::test(start_paused = true)]
async fn config_errors_are_reported_not_queued() {
    let factory = FakeFactory::scripted(vec![Err(KanvaError::InvalidBackendConfig(
        "service api key is empty".to_string(),
    ))]);
    let (deps, channel) = deps_with(factory, Some("env-key")).await;

    generation::handle_generation(&deps, &text_event("a red fox"))
        .await
        .expect("handle");

    assert_eq!(failed::count(&deps.db).await.expect("count"), 0);
    let calls = channel.calls();
    assert!(calls.iter().any(
        |c| matches!(c, Call::EditText { text, .. } if text.contains("invalid backend configuration"))
    ));
}

#[tokio::test(start_paused = true)]
async fn missing_service_gets_setup_hint() {
    let (deps, channel) = deps_with(FakeFactory::always_ok(), None).await;

    generation::handle_generation(&deps, &text_event("a red fox"))
        .await
        .expect("handle");

    let calls = channel.calls();
    assert_eq!(calls.len(), 1);
    assert!(matches!(
        &calls[0],
        Call::SendText { text, .. } if text.contains("/service add")
    ));
}

#[tokio::test(start_paused = true)]
async fn bad_ratio_token_gets_usage_reply() {
    let (deps, channel) = deps_with(FakeFactory::always_ok(), Some("env-key")).await;

    generation::handle_generation(&deps, &text_event("banner @7:5"))
        .await
        .expect("handle");

    let calls = channel.calls();
    assert_eq!(calls.len(), 1);
    assert!(matches!(
        &calls[0],
        Call::SendText { text, .. } if text.contains("@7:5") && text.contains("16:9")
    ));
}

#[tokio::test(start_paused = true)]
async fn stored_service_backend_reaches_the_factory() {
    let factory = Arc::new(FakeFactory::always_ok());
    let channel = Arc::new(FakeChannel::default());
    let db = Arc::new(Database::open_in_memory().await.expect("open"));
    let mut config = KanvaConfig::default();
    config.gemini.api_key = Some("env-key".to_string());
    let deps = EngineDeps {
        channel: channel.clone(),
        db,
        factory: factory.clone(),
        media_groups: Arc::new(MediaGroupCache::new()),
        config: Arc::new(config),
    };
    services::add_service(
        &deps.db,
        NewBackendService {
            owner_user_id: 7,
            name: "proxy".to_string(),
            variant: BackendVariant::Custom,
            api_key: "stored-key".to_string(),
            base_url: "https://gw.example.com".to_string(),
            project_id: String::new(),
            location: String::new(),
            model: String::new(),
        },
    )
    .await
    .expect("add");

    generation::handle_generation(&deps, &text_event("a red fox"))
        .await
        .expect("handle");

    let seen = factory.seen_backends.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].api_key, "stored-key");
    assert_eq!(seen[0].variant, BackendVariant::Custom);
    assert_eq!(seen[0].base_url, "https://gw.example.com");
}

#[tokio::test(start_paused = true)]
async fn download_failure_is_terminal_for_the_live_request() {
    let channel = Arc::new(FakeChannel {
        fail_downloads: true,
        ..Default::default()
    });
    let db = Arc::new(Database::open_in_memory().await.expect("open"));
    let mut config = KanvaConfig::default();
    config.gemini.api_key = Some("env-key".to_string());
    let deps = EngineDeps {
        channel: channel.clone(),
        db,
        factory: Arc::new(FakeFactory::always_ok()),
        media_groups: Arc::new(MediaGroupCache::new()),
        config: Arc::new(config),
    };

    let mut event = text_event("redraw this");
    event.photo_ref = Some("file-1".to_string());

    generation::handle_generation(&deps, &event)
        .await
        .expect("handle");

    assert_eq!(failed::count(&deps.db).await.expect("count"), 0);
    let calls = channel.calls();
    assert!(calls.iter().any(
        |c| matches!(c, Call::EditText { text, .. } if text.contains("failed to download input image 1"))
    ));
}

#[tokio::test(start_paused = true)]
async fn media_group_batch_is_collected_in_order() {
    let (deps, channel) = deps_with(FakeFactory::always_ok(), Some("env-key")).await;

    // Two caption-less album photos arrive first.
    for (file, n) in [("file-a", 1), ("file-b", 2)] {
        let mut ev = text_event("");
        ev.text = None;
        ev.message_id = n;
        ev.photo_ref = Some(file.to_string());
        ev.media_group_id = Some("album-1".to_string());
        Engine::handle_event(deps.clone(), ev).await;
    }

    // The captioned sibling triggers generation over the whole batch.
    let mut ev = text_event("merge these");
    ev.message_id = 3;
    ev.photo_ref = Some("file-c".to_string());
    ev.media_group_id = Some("album-1".to_string());
    Engine::handle_event(deps.clone(), ev).await;

    let calls = channel.calls();
    let downloaded: Vec<String> = calls
        .iter()
        .filter_map(|c| match c {
            Call::Download { file_ref } => Some(file_ref.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(downloaded, vec!["file-a", "file-b", "file-c"]);
}

#[tokio::test(start_paused = true)]
async fn single_image_override_skips_the_batch() {
    let (deps, channel) = deps_with(FakeFactory::always_ok(), Some("env-key")).await;

    let mut ev = text_event("");
    ev.text = None;
    ev.photo_ref = Some("file-a".to_string());
    ev.media_group_id = Some("album-2".to_string());
    Engine::handle_event(deps.clone(), ev).await;

    let mut ev = text_event("just this one @s");
    ev.message_id = 2;
    ev.photo_ref = Some("file-b".to_string());
    ev.media_group_id = Some("album-2".to_string());
    Engine::handle_event(deps.clone(), ev).await;

    let downloaded: Vec<String> = channel
        .calls()
        .iter()
        .filter_map(|c| match c {
            Call::Download { file_ref } => Some(file_ref.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(downloaded, vec!["file-b"]);
}

// Replay tests run on real time: the pass is wrapped in a wall-clock
// timeout, and a paused clock auto-advances past it while the database
// works on its background thread.
#[tokio::test]
async fn replay_delivers_and_deletes_on_success() {
    let (deps, channel) = deps_with(FakeFactory::always_ok(), Some("env-key")).await;

    let payload = FailedGenerationPayload {
        prompt: "a fox".to_string(),
        quality: Quality::High,
        aspect_ratio: Some("16:9".to_string()),
        image_file_ids: vec!["file-a".to_string()],
        service: BackendConfig {
            variant: BackendVariant::Standard,
            api_key: "frozen-key".to_string(),
            ..Default::default()
        },
    };
    let id = failed::enqueue(&deps.db, 7, 42, 1, &payload.to_json().expect("json"), "boom")
        .await
        .expect("enqueue");

    let outcome = replay::replay_once(&deps).await.expect("replay");
    assert_eq!(outcome, ReplayOutcome::Delivered(id));
    assert_eq!(failed::count(&deps.db).await.expect("count"), 0);

    let calls = channel.calls();
    assert!(calls.contains(&Call::SendPhoto {
        filename: "retry_preview.png".to_string()
    }));
    assert!(calls.contains(&Call::SendDocument {
        filename: "retry_generated_4K.png".to_string()
    }));
}

#[tokio::test]
async fn replay_drops_corrupt_payloads() {
    let (deps, _channel) = deps_with(FakeFactory::always_ok(), Some("env-key")).await;
    let id = failed::enqueue(&deps.db, 7, 42, 1, "{not json", "boom")
        .await
        .expect("enqueue");

    let outcome = replay::replay_once(&deps).await.expect("replay");
    assert_eq!(outcome, ReplayOutcome::Dropped(id));
    assert_eq!(failed::count(&deps.db).await.expect("count"), 0);
}

#[tokio::test]
async fn replay_failure_bumps_the_retry_counter() {
    let (deps, _channel) = deps_with(FakeFactory::always_failing(), Some("env-key")).await;

    let payload = FailedGenerationPayload {
        prompt: "a fox".to_string(),
        quality: Quality::Medium,
        aspect_ratio: None,
        image_file_ids: Vec::new(),
        service: BackendConfig {
            api_key: "frozen-key".to_string(),
            ..Default::default()
        },
    };
    let id = failed::enqueue(&deps.db, 7, 42, 1, &payload.to_json().expect("json"), "boom")
        .await
        .expect("enqueue");

    let outcome = replay::replay_once(&deps).await.expect("replay");
    assert_eq!(outcome, ReplayOutcome::Requeued(id));

    let entry = failed::pick_random(&deps.db)
        .await
        .expect("pick")
        .expect("still queued");
    assert_eq!(entry.retry_count, 1);
    // Replay made exactly one call, so the stored error is the first
    // scripted failure.
    assert!(entry.last_error.contains("boom 0"));
}

#[tokio::test]
async fn replay_makes_one_generation_call_per_pass() {
    let factory = Arc::new(FakeFactory::always_failing());
    let channel = Arc::new(FakeChannel::default());
    let db = Arc::new(Database::open_in_memory().await.expect("open"));
    let deps = EngineDeps {
        channel,
        db,
        factory: factory.clone(),
        media_groups: Arc::new(MediaGroupCache::new()),
        config: Arc::new(KanvaConfig::default()),
    };

    let payload = FailedGenerationPayload {
        prompt: "a fox".to_string(),
        quality: Quality::Medium,
        aspect_ratio: None,
        image_file_ids: Vec::new(),
        service: BackendConfig {
            api_key: "frozen-key".to_string(),
            ..Default::default()
        },
    };
    let id = failed::enqueue(&deps.db, 7, 42, 1, &payload.to_json().expect("json"), "boom")
        .await
        .expect("enqueue");

    let outcome = replay::replay_once(&deps).await.expect("replay");
    assert_eq!(outcome, ReplayOutcome::Requeued(id));
    // The scheduler period is the retry loop; a pass never retries inline.
    assert_eq!(factory.generator.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn replay_with_empty_key_resolves_the_current_service() {
    let (deps, _channel) = deps_with(FakeFactory::always_ok(), None).await;
    services::add_service(
        &deps.db,
        NewBackendService {
            owner_user_id: 7,
            name: "late".to_string(),
            variant: BackendVariant::Standard,
            api_key: "fresh-key".to_string(),
            base_url: String::new(),
            project_id: String::new(),
            location: String::new(),
            model: String::new(),
        },
    )
    .await
    .expect("add");

    let payload = FailedGenerationPayload {
        prompt: "a fox".to_string(),
        quality: Quality::Medium,
        aspect_ratio: None,
        image_file_ids: Vec::new(),
        service: BackendConfig::default(), // empty key
    };
    let id = failed::enqueue(&deps.db, 7, 42, 1, &payload.to_json().expect("json"), "boom")
        .await
        .expect("enqueue");

    let outcome = replay::replay_once(&deps).await.expect("replay");
    assert_eq!(outcome, ReplayOutcome::Delivered(id));
}

#[tokio::test]
async fn empty_queue_replay_is_a_noop() {
    let (deps, channel) = deps_with(FakeFactory::always_ok(), Some("env-key")).await;
    let outcome = replay::replay_once(&deps).await.expect("replay");
    assert_eq!(outcome, ReplayOutcome::Empty);
    assert!(channel.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn group_message_without_trigger_prefix_is_ignored() {
    let (deps, channel) = deps_with(FakeFactory::always_ok(), Some("env-key")).await;

    let mut ev = text_event("a fox");
    ev.is_group = true;
    Engine::handle_event(deps.clone(), ev).await;
    assert!(channel.calls().is_empty());

    let mut ev = text_event(". a fox");
    ev.is_group = true;
    Engine::handle_event(deps.clone(), ev).await;
    assert!(
        channel
            .calls()
            .iter()
            .any(|c| matches!(c, Call::SendPhoto { .. }))
    );
}

#[tokio::test]
async fn service_commands_round_trip_through_the_engine() {
    let (deps, channel) = deps_with(FakeFactory::always_ok(), None).await;

    Engine::handle_event(
        deps.clone(),
        text_event("/service add main standard sk-1234567890"),
    )
    .await;
    Engine::handle_event(deps.clone(), text_event("/service list")).await;

    let calls = channel.calls();
    assert!(calls.iter().any(
        |c| matches!(c, Call::SendText { text, .. } if text.contains("Added service main"))
    ));
    assert!(calls.iter().any(
        |c| matches!(c, Call::SendText { text, .. } if text.contains("sk-1...7890"))
    ));
}

//! Full runs of the conversation engine against scripted collaborators.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use colloquy_agent::{GenerationConfig, LlmBackend, ResponseGenerator};
use colloquy_archive::{ArchiveClient, ArchiveOutcome};
use colloquy_core::{ColloquyError, ColloquyResult, Message, Role};
use colloquy_orchestrator::{
    Clock, ConversationConfig, ConversationEngine, EngineState, FollowUpPolicy, RolloverConfig,
    RolloverPolicy, SpeakerConfig, SpeakerId, TimeBasis, Topology,
};
use colloquy_session::{FileTranscriptStore, TranscriptConfig, TranscriptLine, TranscriptStore};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// --- Scripted collaborators ---

type Calls = Arc<Mutex<Vec<Vec<Message>>>>;

struct ScriptedBackend {
    replies: Mutex<VecDeque<String>>,
    calls: Calls,
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn chat(&self, _model_id: &str, messages: &[Message]) -> ColloquyResult<String> {
        self.calls.lock().unwrap().push(messages.to_vec());
        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "unscripted".into()))
    }
}

/// Every call fails, as an unreachable backend would.
struct DownBackend {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl LlmBackend for DownBackend {
    async fn chat(&self, _model_id: &str, _messages: &[Message]) -> ColloquyResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ColloquyError::Http("connection refused".into()))
    }
}

fn generation(max_retries: u32, min_acceptable_length: usize) -> GenerationConfig {
    GenerationConfig {
        timeout_ms: 5_000,
        max_retries,
        backoff_ms: 0,
        min_acceptable_length,
        window: 10,
        filler_text: "filler".into(),
        fallback_text: "fallback".into(),
    }
}

fn scripted(replies: &[&str], config: GenerationConfig) -> (ResponseGenerator, Calls) {
    let calls: Calls = Arc::default();
    let backend = ScriptedBackend {
        replies: Mutex::new(replies.iter().map(|r| (*r).to_string()).collect()),
        calls: calls.clone(),
    };
    (ResponseGenerator::new(Box::new(backend), config), calls)
}

fn generator(replies: &[&str]) -> (ResponseGenerator, Calls) {
    scripted(replies, generation(1, 1))
}

/// Hands out the scripted instants in order, repeating the last one.
struct SequenceClock {
    times: Mutex<VecDeque<NaiveDateTime>>,
}

impl SequenceClock {
    fn new(times: &[NaiveDateTime]) -> Arc<Self> {
        Arc::new(Self {
            times: Mutex::new(times.iter().copied().collect()),
        })
    }
}

impl Clock for SequenceClock {
    fn now(&self) -> NaiveDateTime {
        let mut times = self.times.lock().unwrap();
        if times.len() > 1 {
            times.pop_front().unwrap()
        } else {
            *times.front().unwrap()
        }
    }
}

#[derive(Default)]
struct RecordingArchive {
    uploads: Mutex<Vec<(PathBuf, String)>>,
    fail: bool,
}

#[async_trait]
impl ArchiveClient for RecordingArchive {
    async fn upload(&self, file_path: &Path, commit_message: &str) -> ColloquyResult<ArchiveOutcome> {
        self.uploads
            .lock()
            .unwrap()
            .push((file_path.to_path_buf(), commit_message.to_string()));
        if self.fail {
            return Err(ColloquyError::Archive("GitHub API error 503".into()));
        }
        Ok(ArchiveOutcome::Created)
    }
}

/// Accepts `budget` appends, then fails every write.
struct FailingStore {
    budget: AtomicUsize,
}

#[async_trait]
impl TranscriptStore for FailingStore {
    async fn append(&self, _date: NaiveDate, _line: &TranscriptLine) -> ColloquyResult<()> {
        let left = self.budget.load(Ordering::SeqCst);
        if left == 0 {
            return Err(ColloquyError::Session("disk full".into()));
        }
        self.budget.store(left - 1, Ordering::SeqCst);
        Ok(())
    }

    async fn read(&self, _date: NaiveDate) -> ColloquyResult<Vec<String>> {
        Ok(Vec::new())
    }

    fn path_for(&self, date: NaiveDate) -> PathBuf {
        PathBuf::from(format!("/dev/null/{date}.txt"))
    }
}

// --- Fixtures ---

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
}

fn at(d: u32, hour: u32, minute: u32) -> NaiveDateTime {
    day(d).and_hms_opt(hour, minute, 0).unwrap()
}

fn conversation(topology: Topology, max_turns: u64) -> ConversationConfig {
    ConversationConfig {
        topology,
        speaker_a: SpeakerConfig {
            label: "SpeakerA".into(),
            model_id: "llama2".into(),
        },
        speaker_b: SpeakerConfig {
            label: "SpeakerB".into(),
            model_id: "llama2".into(),
        },
        max_turns: Some(max_turns),
        turn_delay_ms: 0,
        initial_prompt: "Hello, I am an AI.".into(),
        follow_up: FollowUpPolicy::None,
        moderator_label: "Moderator".into(),
    }
}

fn rollover(policy: RolloverPolicy) -> RolloverConfig {
    RolloverConfig {
        upload_hour: 0,
        settle_delay_ms: 0,
        policy,
        continuation_prompt: "Let's continue our discussion.".into(),
        time_basis: TimeBasis::Local,
    }
}

async fn file_store(tmp: &tempfile::TempDir) -> Arc<FileTranscriptStore> {
    Arc::new(
        FileTranscriptStore::new(TranscriptConfig {
            dir: tmp.path().to_path_buf(),
            prefix: "ai_conversation_".into(),
        })
        .await
        .unwrap(),
    )
}

fn contents(messages: &[Message]) -> Vec<(Role, &str)> {
    messages.iter().map(|m| (m.role(), m.content())).collect()
}

// --- Tests ---

#[tokio::test]
async fn dual_run_writes_expected_transcript() {
    let tmp = tempfile::tempdir().unwrap();
    let store = file_store(&tmp).await;
    let (generator, calls) = generator(&["R1", "R2"]);

    let mut engine = ConversationEngine::new(
        conversation(Topology::Dual, 2),
        &rollover(RolloverPolicy::ResetAndReseed),
        generator,
        store.clone(),
        Arc::new(RecordingArchive::default()),
        SequenceClock::new(&[at(1, 10, 0)]),
    );
    let summary = engine.run().await.unwrap();

    assert_eq!(summary.turns, 2);
    assert_eq!(summary.rollovers, 0);
    assert_eq!(engine.state(), EngineState::Concluded);

    let written = std::fs::read_to_string(store.path_for(day(1))).unwrap();
    assert_eq!(
        written,
        "[SpeakerA]: Hello, I am an AI.\n[SpeakerB]: R1\n[SpeakerA]: R2\n"
    );

    // History A carries the seed; History B starts at B's first reply.
    assert_eq!(engine.history(SpeakerId::A).len(), 3);
    assert_eq!(engine.history(SpeakerId::B).len(), 2);
    assert_eq!(
        contents(engine.history(SpeakerId::A).messages()),
        vec![
            (Role::User, "Hello, I am an AI."),
            (Role::Assistant, "R1"),
            (Role::User, "R2"),
        ]
    );
    assert_eq!(
        contents(engine.history(SpeakerId::B).messages()),
        vec![(Role::User, "R1"), (Role::Assistant, "R2")]
    );

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(contents(&calls[0]), vec![(Role::User, "Hello, I am an AI.")]);
    assert_eq!(contents(&calls[1]), vec![(Role::User, "R1")]);
}

#[tokio::test]
async fn shared_run_alternates_roles_in_one_history() {
    let tmp = tempfile::tempdir().unwrap();
    let (generator, calls) = generator(&["R1", "R2"]);

    let mut engine = ConversationEngine::new(
        conversation(Topology::Shared, 2),
        &rollover(RolloverPolicy::ResetAndReseed),
        generator,
        file_store(&tmp).await,
        Arc::new(RecordingArchive::default()),
        SequenceClock::new(&[at(1, 10, 0)]),
    );
    engine.run().await.unwrap();

    assert_eq!(
        contents(engine.history(SpeakerId::A).messages()),
        vec![
            (Role::User, "Hello, I am an AI."),
            (Role::Assistant, "R1"),
            (Role::User, "R2"),
        ]
    );
    assert_eq!(engine.history(SpeakerId::A), engine.history(SpeakerId::B));

    let calls = calls.lock().unwrap();
    assert_eq!(
        contents(&calls[1]),
        vec![(Role::User, "Hello, I am an AI."), (Role::Assistant, "R1")]
    );
}

#[tokio::test]
async fn write_failure_stops_the_run() {
    let (generator, calls) = generator(&["R1", "R2", "R3"]);
    let store = Arc::new(FailingStore {
        budget: AtomicUsize::new(1),
    });

    let mut engine = ConversationEngine::new(
        conversation(Topology::Dual, 3),
        &rollover(RolloverPolicy::ResetAndReseed),
        generator,
        store,
        Arc::new(RecordingArchive::default()),
        SequenceClock::new(&[at(1, 10, 0)]),
    );
    let err = engine.run().await.unwrap_err();

    assert!(matches!(err, ColloquyError::Session(_)));
    assert_eq!(calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn rollover_archives_closed_day_and_reseeds() {
    let tmp = tempfile::tempdir().unwrap();
    let store = file_store(&tmp).await;
    let archive = Arc::new(RecordingArchive::default());
    let (generator, calls) = generator(&["R1", "R2", "R3"]);

    let mut engine = ConversationEngine::new(
        conversation(Topology::Dual, 3),
        &rollover(RolloverPolicy::ResetAndReseed),
        generator,
        store.clone(),
        archive.clone(),
        SequenceClock::new(&[at(1, 23, 50), at(1, 23, 55), at(2, 0, 5), at(2, 0, 10)]),
    );
    let summary = engine.run().await.unwrap();

    assert_eq!(summary.turns, 3);
    assert_eq!(summary.rollovers, 1);
    assert_eq!(engine.transcript_day(), day(2));

    let uploads = archive.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].0, store.path_for(day(1)));
    assert_eq!(uploads[0].1, "Daily AI conversation transcript for 2024-05-01");

    assert_eq!(
        store.read(day(1)).await.unwrap(),
        vec!["[SpeakerA]: Hello, I am an AI.", "[SpeakerB]: R1", "[SpeakerA]: R2"]
    );
    assert_eq!(
        store.read(day(2)).await.unwrap(),
        vec!["[SpeakerA]: Let's continue our discussion.", "[SpeakerB]: R3"]
    );

    let calls = calls.lock().unwrap();
    assert_eq!(
        contents(&calls[2]),
        vec![(Role::User, "Let's continue our discussion.")]
    );
}

#[tokio::test]
async fn continue_same_history_only_switches_file() {
    let tmp = tempfile::tempdir().unwrap();
    let store = file_store(&tmp).await;
    let (generator, calls) = generator(&["R1", "R2", "R3"]);

    let mut engine = ConversationEngine::new(
        conversation(Topology::Dual, 3),
        &rollover(RolloverPolicy::ContinueSameHistory),
        generator,
        store.clone(),
        Arc::new(RecordingArchive::default()),
        SequenceClock::new(&[at(1, 23, 50), at(1, 23, 55), at(2, 0, 5), at(2, 0, 10)]),
    );
    engine.run().await.unwrap();

    assert_eq!(store.read(day(1)).await.unwrap().len(), 3);
    assert_eq!(store.read(day(2)).await.unwrap(), vec!["[SpeakerB]: R3"]);

    let calls = calls.lock().unwrap();
    assert_eq!(
        contents(&calls[2]),
        vec![
            (Role::User, "Hello, I am an AI."),
            (Role::Assistant, "R1"),
            (Role::User, "R2"),
        ]
    );
}

#[tokio::test]
async fn rollover_waits_for_upload_hour() {
    let tmp = tempfile::tempdir().unwrap();
    let store = file_store(&tmp).await;
    let archive = Arc::new(RecordingArchive::default());
    let (generator, _calls) = generator(&["R1", "R2"]);

    let mut config = rollover(RolloverPolicy::ResetAndReseed);
    config.upload_hour = 2;
    let mut engine = ConversationEngine::new(
        conversation(Topology::Dual, 2),
        &config,
        generator,
        store.clone(),
        archive.clone(),
        SequenceClock::new(&[at(1, 23, 50), at(2, 0, 30), at(2, 1, 30)]),
    );
    let summary = engine.run().await.unwrap();

    assert_eq!(summary.rollovers, 0);
    assert!(archive.uploads.lock().unwrap().is_empty());
    assert_eq!(store.read(day(1)).await.unwrap().len(), 3);
}

#[tokio::test]
async fn archive_failure_is_not_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let store = file_store(&tmp).await;
    let archive = Arc::new(RecordingArchive {
        fail: true,
        ..Default::default()
    });
    let (generator, _calls) = generator(&["R1", "R2"]);

    let mut engine = ConversationEngine::new(
        conversation(Topology::Shared, 2),
        &rollover(RolloverPolicy::ResetAndReseed),
        generator,
        store.clone(),
        archive.clone(),
        SequenceClock::new(&[at(1, 23, 50), at(2, 0, 5), at(2, 0, 10)]),
    );
    let summary = engine.run().await.unwrap();

    assert_eq!(summary.turns, 2);
    assert_eq!(summary.rollovers, 1);
    assert_eq!(archive.uploads.lock().unwrap().len(), 1);
    assert_eq!(
        store.read(day(2)).await.unwrap(),
        vec!["[SpeakerA]: Let's continue our discussion.", "[SpeakerB]: R2"]
    );
}

#[tokio::test]
async fn follow_up_reaches_next_speaker_and_transcript() {
    let tmp = tempfile::tempdir().unwrap();
    let store = file_store(&tmp).await;
    let (generator, calls) = generator(&["R1", "R2", "R3"]);

    let mut config = conversation(Topology::Dual, 3);
    config.follow_up = FollowUpPolicy::Fixed {
        text: "Can you elaborate on that?".into(),
        every: 2,
    };
    let mut engine = ConversationEngine::new(
        config,
        &rollover(RolloverPolicy::ResetAndReseed),
        generator,
        store.clone(),
        Arc::new(RecordingArchive::default()),
        SequenceClock::new(&[at(1, 10, 0)]),
    );
    engine.run().await.unwrap();

    assert_eq!(
        store.read(day(1)).await.unwrap(),
        vec![
            "[SpeakerA]: Hello, I am an AI.",
            "[SpeakerB]: R1",
            "[SpeakerA]: R2",
            "[Moderator]: Can you elaborate on that?",
            "[SpeakerB]: R3",
        ]
    );

    let calls = calls.lock().unwrap();
    assert_eq!(
        contents(&calls[2]),
        vec![
            (Role::User, "Hello, I am an AI."),
            (Role::Assistant, "R1"),
            (Role::User, "R2"),
            (Role::User, "Can you elaborate on that?"),
        ]
    );
}

#[tokio::test]
async fn fallback_replies_are_ordinary_turns() {
    let tmp = tempfile::tempdir().unwrap();
    let store = file_store(&tmp).await;
    let calls = Arc::new(AtomicUsize::new(0));
    let generator = ResponseGenerator::new(
        Box::new(DownBackend {
            calls: calls.clone(),
        }),
        generation(2, 10),
    );

    let mut engine = ConversationEngine::new(
        conversation(Topology::Dual, 2),
        &rollover(RolloverPolicy::ResetAndReseed),
        generator,
        store.clone(),
        Arc::new(RecordingArchive::default()),
        SequenceClock::new(&[at(1, 10, 0)]),
    );
    let summary = engine.run().await.unwrap();

    assert_eq!(summary.turns, 2);
    assert_eq!(engine.state(), EngineState::Concluded);
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(
        store.read(day(1)).await.unwrap(),
        vec![
            "[SpeakerA]: Hello, I am an AI.",
            "[SpeakerB]: fallback",
            "[SpeakerA]: fallback",
        ]
    );
}

#[tokio::test]
async fn short_replies_become_filler_turns() {
    let tmp = tempfile::tempdir().unwrap();
    let store = file_store(&tmp).await;
    let (generator, calls) = scripted(&["ok", "A reply that is long enough."], generation(3, 10));

    let mut engine = ConversationEngine::new(
        conversation(Topology::Shared, 2),
        &rollover(RolloverPolicy::ResetAndReseed),
        generator,
        store.clone(),
        Arc::new(RecordingArchive::default()),
        SequenceClock::new(&[at(1, 10, 0)]),
    );
    let summary = engine.run().await.unwrap();

    assert_eq!(summary.turns, 2);
    assert_eq!(
        store.read(day(1)).await.unwrap(),
        vec![
            "[SpeakerA]: Hello, I am an AI.",
            "[SpeakerB]: filler",
            "[SpeakerA]: A reply that is long enough.",
        ]
    );
    // The filler stands in for the short reply in history too.
    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        contents(&calls[1]),
        vec![(Role::User, "Hello, I am an AI."), (Role::Assistant, "filler")]
    );
}

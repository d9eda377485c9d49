// Integration tests for the capture session lifecycle
//
// These tests verify that start/stop pairs produce exactly one blob with
// chunk order preserved, that handle misuse is rejected, and that frames
// arriving after stop are dropped.

use std::io::Cursor;
use std::path::Path;

use tabscribe::{
    AudioFrame, CaptureBackend, CaptureConfig, CaptureError, CaptureSession, CaptureSource,
    SessionState,
};
use tempfile::TempDir;
use tokio::sync::mpsc;

/// Write a WAV fixture with a recognizable ramp so sample order is checkable.
fn write_ramp_fixture(path: &Path, samples: &[i16], sample_rate: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &sample in samples {
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();
}

fn decode_blob(data: &[u8]) -> (hound::WavSpec, Vec<i16>) {
    let reader = hound::WavReader::new(Cursor::new(data)).unwrap();
    let spec = reader.spec();
    let samples = reader
        .into_samples::<i16>()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    (spec, samples)
}

async fn drain(session: &CaptureSession) {
    while !session.is_drained() {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_file_capture_produces_one_ordered_blob() {
    let temp_dir = TempDir::new().unwrap();
    let fixture = temp_dir.path().join("fixture.wav");

    let samples: Vec<i16> = (0..4800).map(|i| (i % 1000) as i16).collect();
    write_ramp_fixture(&fixture, &samples, 16000);

    let mut session = CaptureSession::new(CaptureConfig::default());
    let handle = session.start(CaptureSource::File(fixture)).await.unwrap();

    assert!(session.state().is_recording());

    drain(&session).await;
    let blob = session.stop(handle).await.unwrap();

    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(blob.mime_type, "audio/wav");

    let (spec, decoded) = decode_blob(&blob.data);
    assert_eq!(spec.sample_rate, 16000);
    assert_eq!(spec.channels, 1);
    // Chunk order is preserved: the decoded stream is the original ramp.
    assert_eq!(decoded, samples);
}

#[tokio::test]
async fn test_second_start_stop_pair_produces_fresh_blob() {
    let temp_dir = TempDir::new().unwrap();
    let fixture = temp_dir.path().join("fixture.wav");

    write_ramp_fixture(&fixture, &[1, 2, 3, 4], 16000);

    let mut session = CaptureSession::new(CaptureConfig::default());

    let first = session
        .start(CaptureSource::File(fixture.clone()))
        .await
        .unwrap();
    drain(&session).await;
    let first_blob = session.stop(first).await.unwrap();

    let second = session.start(CaptureSource::File(fixture)).await.unwrap();
    drain(&session).await;
    let second_blob = session.stop(second).await.unwrap();

    // One blob per start/stop pair, not an accumulation across pairs.
    let (_, first_samples) = decode_blob(&first_blob.data);
    let (_, second_samples) = decode_blob(&second_blob.data);
    assert_eq!(first_samples, vec![1, 2, 3, 4]);
    assert_eq!(second_samples, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_stop_without_start_is_invalid_state() {
    let temp_dir = TempDir::new().unwrap();
    let fixture = temp_dir.path().join("fixture.wav");
    write_ramp_fixture(&fixture, &[1, 2, 3], 16000);

    let mut session = CaptureSession::new(CaptureConfig::default());
    let handle = session.start(CaptureSource::File(fixture)).await.unwrap();
    drain(&session).await;
    let blob = session.stop(handle).await.unwrap();

    // Second stop with the now-stale handle is caller misuse and must not
    // disturb the already-finalized blob.
    let err = session.stop(handle).await.unwrap_err();
    assert!(matches!(err, CaptureError::InvalidState(_)));

    let (_, samples) = decode_blob(&blob.data);
    assert_eq!(samples, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_start_while_recording_is_invalid_state() {
    let temp_dir = TempDir::new().unwrap();
    let fixture = temp_dir.path().join("fixture.wav");
    write_ramp_fixture(&fixture, &[0; 1600], 16000);

    let mut session = CaptureSession::new(CaptureConfig::default());
    let handle = session
        .start(CaptureSource::File(fixture.clone()))
        .await
        .unwrap();

    let err = session.start(CaptureSource::File(fixture)).await.unwrap_err();
    assert!(matches!(err, CaptureError::InvalidState(_)));

    drain(&session).await;
    session.stop(handle).await.unwrap();
}

#[tokio::test]
async fn test_system_audio_source_is_unsupported() {
    let mut session = CaptureSession::new(CaptureConfig::default());
    let err = session.start(CaptureSource::SystemAudio).await.unwrap_err();
    assert!(matches!(err, CaptureError::Unsupported(_)));
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_missing_file_is_device_unavailable() {
    let mut session = CaptureSession::new(CaptureConfig::default());
    let err = session
        .start(CaptureSource::File("does-not-exist.wav".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, CaptureError::DeviceUnavailable(_)));
}

#[tokio::test]
async fn test_concurrent_sessions_have_independent_buffers() {
    let temp_dir = TempDir::new().unwrap();
    let fixture_a = temp_dir.path().join("a.wav");
    let fixture_b = temp_dir.path().join("b.wav");

    write_ramp_fixture(&fixture_a, &[10, 20, 30], 16000);
    write_ramp_fixture(&fixture_b, &[-5, -6], 16000);

    let mut session_a = CaptureSession::new(CaptureConfig::default());
    let mut session_b = CaptureSession::new(CaptureConfig::default());

    let handle_a = session_a.start(CaptureSource::File(fixture_a)).await.unwrap();
    let handle_b = session_b.start(CaptureSource::File(fixture_b)).await.unwrap();

    drain(&session_a).await;
    drain(&session_b).await;

    let blob_a = session_a.stop(handle_a).await.unwrap();
    let blob_b = session_b.stop(handle_b).await.unwrap();

    let (_, samples_a) = decode_blob(&blob_a.data);
    let (_, samples_b) = decode_blob(&blob_b.data);
    assert_eq!(samples_a, vec![10, 20, 30]);
    assert_eq!(samples_b, vec![-5, -6]);
}

#[tokio::test]
async fn test_stereo_fixture_is_mixed_to_mono_target() {
    let temp_dir = TempDir::new().unwrap();
    let fixture = temp_dir.path().join("stereo.wav");

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&fixture, spec).unwrap();
    // Two stereo frames: (100, 200) and (-50, 25)
    for sample in [100i16, 200, -50, 25] {
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();

    let mut session = CaptureSession::new(CaptureConfig::default());
    let handle = session.start(CaptureSource::File(fixture)).await.unwrap();
    drain(&session).await;
    let blob = session.stop(handle).await.unwrap();

    let (spec, samples) = decode_blob(&blob.data);
    assert_eq!(spec.channels, 1);
    // Channels are summed without division.
    assert_eq!(samples, vec![300, -25]);
}

/// Backend whose stop() leaves the frame channel open, so the test can try
/// to deliver frames after the session stopped.
struct LingeringBackend {
    frames: Vec<AudioFrame>,
    sender_slot: std::sync::Arc<std::sync::Mutex<Option<mpsc::Sender<AudioFrame>>>>,
    capturing: bool,
}

#[async_trait::async_trait]
impl CaptureBackend for LingeringBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        let (tx, rx) = mpsc::channel(64);
        for frame in self.frames.drain(..) {
            tx.send(frame).await.unwrap();
        }
        *self.sender_slot.lock().unwrap() = Some(tx);
        self.capturing = true;
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        // Deliberately keeps the sender alive.
        self.capturing = false;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "lingering"
    }
}

fn frame(samples: Vec<i16>) -> AudioFrame {
    AudioFrame {
        samples,
        sample_rate: 16000,
        channels: 1,
        timestamp_ms: 0,
    }
}

#[tokio::test]
async fn test_frames_after_stop_are_dropped() {
    let sender_slot = std::sync::Arc::new(std::sync::Mutex::new(None));
    let backend = LingeringBackend {
        frames: vec![frame(vec![7, 8]), frame(vec![9])],
        sender_slot: std::sync::Arc::clone(&sender_slot),
        capturing: false,
    };

    let mut session = CaptureSession::new(CaptureConfig::default());
    let handle = session.start_with_backend(Box::new(backend)).await.unwrap();

    // Wait for the pre-sent frames to be collected.
    while session.chunk_count().await < 2 {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    let blob = session.stop(handle).await.unwrap();

    // The backend's sender outlived stop(); a late frame must go nowhere.
    let late_tx = sender_slot.lock().unwrap().clone().unwrap();
    let late_result = late_tx.send(frame(vec![99])).await;
    assert!(late_result.is_err(), "collector must be gone after stop");

    let (_, samples) = decode_blob(&blob.data);
    assert_eq!(samples, vec![7, 8, 9]);

    // And the finalized blob stays final: a second stop is rejected.
    let err = session.stop(handle).await.unwrap_err();
    assert!(matches!(err, CaptureError::InvalidState(_)));
}

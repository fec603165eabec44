use object_counter::integration::replay::{ReplayDetector, ReplaySource};
use object_counter::{
    CounterConfig, CounterError, ExportError, NullObserver, ProcessingSession, RunState,
    export_csv,
};

const STREET: &str = r#"[{"label":"car","bbox":[0,0,10,10],"confidence":0.9}]
[{"label":"car","bbox":[1,1,11,11],"confidence":0.9},{"label":"person","bbox":[40,10,48,30],"confidence":0.8}]
[{"label":"car","bbox":[50,50,60,60],"confidence":0.9},{"label":"person","bbox":[40,10,48,30],"confidence":0.8}]
"#;

#[test]
fn test_replay_file_to_csv() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("street.jsonl");
    let output = dir.path().join("summary.csv");
    std::fs::write(&input, STREET).unwrap();

    let source = ReplaySource::from_path(&input).unwrap().with_frame_rate(30.0);
    let mut session = ProcessingSession::new(CounterConfig::default()).unwrap();
    let summary = session.run(source, ReplayDetector, NullObserver).unwrap();

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.frames_processed, 3);
    assert_eq!(summary.total_frames, Some(3));
    assert_eq!(summary.counts.to_string(), "car: 2\nperson: 1");

    export_csv(&summary.counts, &output).unwrap();
    let csv = std::fs::read_to_string(&output).unwrap();
    assert_eq!(csv, "Class,Count\r\ncar,2\r\nperson,1\r\n");
}

#[test]
fn test_corrupt_replay_line_cancels_run() {
    let first = STREET.lines().next().unwrap();
    let text = format!("{first}\n{{not json}}\n[]\n");
    let mut session = ProcessingSession::new(CounterConfig::default()).unwrap();

    let summary = session
        .run(ReplaySource::from_text(&text), ReplayDetector, NullObserver)
        .unwrap();

    assert_eq!(summary.state, RunState::Cancelled);
    assert_eq!(summary.frames_processed, 1);
    assert_eq!(summary.counts.get("car"), 1);
    match summary.failure {
        Some(CounterError::SourceFault(message)) => assert!(message.starts_with("line 2:")),
        other => panic!("expected a source fault, got {other:?}"),
    }
}

#[test]
fn test_config_file_drives_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("counter.toml");
    // 0.7 is above the IoU of the one-pixel step (81/119), so it counts twice.
    std::fs::write(&path, "iou_threshold = 0.7\nmin_confidence = 0.85\n").unwrap();

    let cfg = CounterConfig::load(&path).unwrap();
    let mut session = ProcessingSession::new(cfg).unwrap();
    let summary = session
        .run(ReplaySource::from_text(STREET), ReplayDetector, NullObserver)
        .unwrap();

    assert_eq!(summary.counts.get("car"), 3);
    assert_eq!(summary.counts.get("person"), 0);
}

#[test]
fn test_nothing_to_export() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("summary.csv");

    let mut session = ProcessingSession::new(CounterConfig::default()).unwrap();
    let summary = session
        .run(ReplaySource::from_text("[]\n[]\n"), ReplayDetector, NullObserver)
        .unwrap();

    assert!(summary.is_completed());
    assert!(matches!(
        export_csv(&summary.counts, &output),
        Err(ExportError::Empty)
    ));
    assert!(!output.exists());
}

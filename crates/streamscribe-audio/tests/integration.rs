use std::time::Duration;
use streamscribe_audio::{frame_queue, AudioDeviceDirectory, ScriptedDirectory};
use streamscribe_core::{AudioFormat, AudioFrame};

fn frame(value: i16, len: usize) -> AudioFrame {
    AudioFrame {
        samples: vec![value; len],
        sample_rate: 16_000,
    }
}

#[tokio::test]
async fn test_scripted_capture_feeds_queue_until_closed() {
    let directory = ScriptedDirectory::new(vec![frame(10, 1024), frame(20, 1024)])
        .with_interval(Duration::from_millis(1));
    let (tx, mut rx) = frame_queue();
    let mut handle = directory
        .open("default", AudioFormat::default(), tx)
        .unwrap();

    let first = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out")
        .expect("queue closed");
    assert_eq!(first.samples.len(), 1024);
    assert_eq!(first.samples[0], 10);

    let second = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out")
        .expect("queue closed");
    assert_eq!(second.samples[0], 20);

    handle.close();
}

#[tokio::test]
async fn test_closing_capture_eventually_closes_queue() {
    let directory =
        ScriptedDirectory::new(vec![frame(1, 16)]).with_interval(Duration::from_millis(1));
    let (tx, mut rx) = frame_queue();
    let mut handle = directory
        .open("default", AudioFormat::default(), tx)
        .unwrap();

    handle.close();

    // Once the capture thread exits the last sender is dropped, so the
    // queue drains whatever was produced and then reports closed.
    let drained = tokio::time::timeout(Duration::from_secs(2), async {
        while rx.recv().await.is_some() {}
    })
    .await;
    assert!(drained.is_ok(), "queue did not close after capture close");
}

#[test]
fn test_dropping_handle_stops_capture_thread() {
    let directory =
        ScriptedDirectory::new(vec![frame(1, 16); 100]).with_interval(Duration::from_millis(1));
    let (tx, rx) = frame_queue();
    let handle = directory
        .open("scripted", AudioFormat::default(), tx)
        .unwrap();
    drop(rx);
    drop(handle); // must not hang joining the thread
}

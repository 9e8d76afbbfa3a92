//! Live reconfiguration, burst coalescing and timeout reporting

mod common;

use chrono::Local;
use common::{eventually, next_event, next_message, FakeOpener};
use nmeaprint_communication::SerialReader;
use nmeaprint_core::{BaudRate, ReaderConfig, ReaderEvent};
use proptest::prelude::*;
use std::time::Duration;

#[tokio::test]
async fn test_fragments_within_quiescence_are_coalesced() {
    let opener = FakeOpener::new();
    let (reader, mut events) = SerialReader::new(opener.clone());

    reader.start_reading("/dev/ttyGPS", BaudRate::Baud4800, Some(Duration::from_secs(2)));
    assert!(eventually(Duration::from_secs(1), || opener.open_count() == 1));

    opener.line.feed(b"$GPGGA,");
    opener.line.feed_after(Duration::from_millis(5), b",,,,*47\r\n");
    opener.line.feed_after(Duration::from_millis(60), b"$GPRMC,,V,,,,,,,,,,N*53\r\n");

    let first = next_message(&mut events, Duration::from_secs(2)).await;
    assert_eq!(first.as_deref(), Some("$GPGGA,,,,,*47\r\n"));

    let second = next_message(&mut events, Duration::from_secs(2)).await;
    assert_eq!(second.as_deref(), Some("$GPRMC,,V,,,,,,,,,,N*53\r\n"));
}

#[tokio::test]
async fn test_invalid_bytes_are_replaced() {
    let opener = FakeOpener::new();
    let (reader, mut events) = SerialReader::new(opener.clone());

    reader.start_reading("/dev/ttyGPS", BaudRate::Baud4800, Some(Duration::from_secs(2)));
    assert!(eventually(Duration::from_secs(1), || opener.open_count() == 1));
    opener.line.feed(b"$GP\xfeGSV*00\r\n");

    let text = next_message(&mut events, Duration::from_secs(2)).await;
    assert_eq!(text.as_deref(), Some("$GP\u{fffd}GSV*00\r\n"));
}

#[tokio::test]
async fn test_silence_yields_one_timeout_per_wait() {
    let opener = FakeOpener::new();
    let (reader, mut events) = SerialReader::new(opener.clone());

    let before = Local::now();
    reader.start_reading("/dev/ttyGPS", BaudRate::Baud9600, Some(Duration::from_millis(300)));

    match next_event(&mut events, Duration::from_secs(2)).await {
        Some(ReaderEvent::TimeoutOccurred { at }) => {
            assert!(at.signed_duration_since(before) >= chrono::Duration::milliseconds(300));
        }
        other => panic!("expected a timeout, got {other:?}"),
    }
    // The next timeout is a full cycle away
    assert!(events.try_recv().is_err());
    reader.stop_reading();
}

#[test]
fn test_latest_request_supersedes_pending_one() {
    let opener = FakeOpener::new();
    let (reader, _events) = SerialReader::new(opener.clone());

    reader.start_reading("A", BaudRate::Baud4800, Some(Duration::from_millis(200)));
    assert!(eventually(Duration::from_secs(1), || opener.open_count() == 1));

    reader.start_reading("B", BaudRate::Baud4800, Some(Duration::from_millis(200)));
    reader.start_reading("C", BaudRate::Baud9600, Some(Duration::from_millis(200)));
    assert!(eventually(Duration::from_secs(2), || opener.open_count() == 2));
    std::thread::sleep(Duration::from_millis(400));

    let opens = opener.opens();
    assert_eq!(opens.len(), 2);
    assert_eq!(opens[1].port_name, "C");
    assert_eq!(opens[1].baud_rate, BaudRate::Baud9600);
    assert_eq!(opener.closes(), vec!["A".to_string()]);
}

#[test]
fn test_requests_made_during_open_apply_only_the_latest() {
    let opener = FakeOpener::with_gate("SLOW");
    let (reader, mut events) = SerialReader::new(opener.clone());

    reader.start_reading("SLOW", BaudRate::Baud4800, Some(Duration::from_secs(2)));
    assert!(eventually(Duration::from_secs(1), || opener.open_count() == 1));

    // Both land while the loop is still inside the first open
    reader.start_reading("A", BaudRate::Baud4800, Some(Duration::from_secs(2)));
    reader.start_reading("B", BaudRate::Baud9600, Some(Duration::from_secs(2)));
    opener.release();

    // The slow device is dropped right away, without waiting on it
    assert!(eventually(Duration::from_millis(500), || opener.open_count() == 2));
    assert_eq!(opener.closes(), vec!["SLOW".to_string()]);

    let ports: Vec<String> = opener.opens().into_iter().map(|c| c.port_name).collect();
    assert_eq!(ports, vec!["SLOW".to_string(), "B".to_string()]);
    assert_eq!(opener.opens()[1].baud_rate, BaudRate::Baud9600);
    assert!(events.try_recv().is_err());
    reader.stop_reading();
}

#[test]
fn test_timeout_change_does_not_reopen() {
    let opener = FakeOpener::new();
    let (reader, _events) = SerialReader::new(opener.clone());

    reader.start_reading("/dev/ttyUSB0", BaudRate::Baud4800, Some(Duration::from_millis(100)));
    assert!(eventually(Duration::from_secs(1), || opener.open_count() == 1));

    reader.start_reading("/dev/ttyUSB0", BaudRate::Baud4800, Some(Duration::from_millis(150)));
    std::thread::sleep(Duration::from_millis(400));

    assert_eq!(opener.open_count(), 1);
    assert!(opener.closes().is_empty());
    assert_eq!(reader.current_config().wait_timeout, Duration::from_millis(150));
}

#[test]
fn test_baud_change_alone_reopens() {
    let opener = FakeOpener::new();
    let (reader, _events) = SerialReader::new(opener.clone());

    reader.start_reading("/dev/ttyUSB0", BaudRate::Baud4800, Some(Duration::from_millis(100)));
    assert!(eventually(Duration::from_secs(1), || opener.open_count() == 1));

    reader.start_reading("/dev/ttyUSB0", BaudRate::Baud38400, Some(Duration::from_millis(100)));
    assert!(eventually(Duration::from_secs(1), || opener.open_count() == 2));

    assert_eq!(opener.opens()[1].baud_rate, BaudRate::Baud38400);
    assert_eq!(opener.closes(), vec!["/dev/ttyUSB0".to_string()]);
}

#[tokio::test]
async fn test_messages_follow_the_new_device() {
    let opener = FakeOpener::new();
    let (reader, mut events) = SerialReader::new(opener.clone());

    reader.start_reading("/dev/ttyUSB0", BaudRate::Baud4800, Some(Duration::from_millis(100)));
    assert!(eventually(Duration::from_secs(1), || opener.open_count() == 1));
    reader.start_reading("/dev/ttyUSB1", BaudRate::Baud4800, Some(Duration::from_millis(100)));
    assert!(eventually(Duration::from_secs(1), || opener.open_count() == 2));

    opener.line.feed(b"$GNGLL,*7A\r\n");
    let text = next_message(&mut events, Duration::from_secs(2)).await;
    assert_eq!(text.as_deref(), Some("$GNGLL,*7A\r\n"));
}

const PORTS: [&str; 3] = ["/dev/ttyUSB0", "/dev/ttyUSB1", "COM3"];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn prop_last_write_wins_without_tearing(
        writes in prop::collection::vec((0usize..3, 0usize..8), 1..6)
    ) {
        let opener = FakeOpener::new();
        let (reader, _events) = SerialReader::new(opener.clone());
        let timeout = Some(Duration::from_millis(50));

        let initial = ReaderConfig {
            port_name: "INITIAL".to_string(),
            baud_rate: BaudRate::Baud4800,
            wait_timeout: Duration::from_millis(50),
        };
        reader.start_reading(&initial.port_name, initial.baud_rate, timeout);
        prop_assert!(eventually(Duration::from_secs(1), || opener.open_count() == 1));

        let mut written = vec![(initial.port_name.clone(), initial.baud_rate)];
        for (port, baud) in &writes {
            let pair = (PORTS[*port].to_string(), BaudRate::ALL[*baud]);
            reader.start_reading(&pair.0, pair.1, timeout);
            written.push(pair);
        }

        let last = written.last().cloned().unwrap();
        let reached_last = eventually(Duration::from_secs(2), || {
            opener
                .opens()
                .last()
                .is_some_and(|c| c.port_name == last.0 && c.baud_rate == last.1)
        });
        prop_assert!(reached_last);

        for open in opener.opens() {
            prop_assert!(written.contains(&(open.port_name.clone(), open.baud_rate)));
        }
    }
}

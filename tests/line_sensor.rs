use std::time::Duration;
use tokio::io::{ AsyncReadExt, AsyncWriteExt };
use tokio_test::io::Builder;
use arcs_limits::{
    sensor::{ LineSensor, ReplyKind },
    Sample, Sensor, SensorError,
};

const TIMEOUT: Duration = Duration::from_secs(1);

#[tokio::test]
async fn reads_scientific_reply()
{
    let mock = Builder::new()
        .write(b"MEAS:VOLT:DC?\n")
        .read(b"+5.00120E+00\r\n")
        .build();
    let mut dmm = LineSensor::with(mock, "MEAS:VOLT:DC?", ReplyKind::Number);

    assert_eq!(dmm.read(TIMEOUT).await.unwrap(), Sample::Number(5.0012));
}

#[tokio::test]
async fn query_uses_configured_line_ending()
{
    let mock = Builder::new()
        .write(b"LOCK:STEP?\r\n")
        .read(b"17\r\n")
        .build();
    let mut fixture = LineSensor::with(mock, "LOCK:STEP?", ReplyKind::Integer).line_ending("\r\n");

    assert_eq!(fixture.read(TIMEOUT).await.unwrap(), Sample::Integer(17));
}

#[tokio::test]
async fn reply_split_across_reads()
{
    let mock = Builder::new()
        .write(b"SERIAL?\n")
        .read(b"A1234")
        .read(b"AB5678\n")
        .build();
    let mut scanner = LineSensor::with(mock, "SERIAL?", ReplyKind::Text);

    assert_eq!(scanner.read(TIMEOUT).await.unwrap(), Sample::from("A1234AB5678"));
}

#[tokio::test]
async fn unread_lines_discarded_before_query()
{
    let mock = Builder::new()
        .write(b"MEAS?\n")
        .read(b"1.0\n2.0\n")
        .write(b"MEAS?\n")
        .read(b"3.0\n")
        .build();
    let mut dmm = LineSensor::with(mock, "MEAS?", ReplyKind::Number);

    assert_eq!(dmm.read(TIMEOUT).await.unwrap(), Sample::Number(1.0));
    assert_eq!(dmm.read(TIMEOUT).await.unwrap(), Sample::Number(3.0));
}

#[tokio::test]
async fn nak_is_rejected()
{
    let mock = Builder::new()
        .write(b"MEAS?\n")
        .read(&[0x15, b'\n'])
        .write(b"MEAS?\n")
        .read(b"1.5\n")
        .build();
    let mut dmm = LineSensor::with(mock, "MEAS?", ReplyKind::Number);

    assert!(matches!(dmm.read(TIMEOUT).await, Err(SensorError::Rejected)));
    // the refusal is consumed, the next query is unaffected
    assert_eq!(dmm.read(TIMEOUT).await.unwrap(), Sample::Number(1.5));
}

#[tokio::test]
async fn empty_reply_is_rejected()
{
    let mock = Builder::new()
        .write(b"MEAS?\n")
        .read(b"\n")
        .build();
    let mut dmm = LineSensor::with(mock, "MEAS?", ReplyKind::Number);

    assert!(matches!(dmm.read(TIMEOUT).await, Err(SensorError::Rejected)));
}

#[tokio::test]
async fn extended_ascii_units_decoded()
{
    let mock = Builder::new()
        .write(b"RES?\n")
        .read(b"0.150 \xEA\n")
        .build();
    let mut bond = LineSensor::with(mock, "RES?", ReplyKind::Text);

    assert_eq!(bond.read(TIMEOUT).await.unwrap(), Sample::from("0.150 Ω"));
}

#[tokio::test]
async fn garbled_reply_is_format_error()
{
    let mock = Builder::new()
        .write(b"MEAS?\n")
        .read(b"OVLD\n")
        .build();
    let mut dmm = LineSensor::with(mock, "MEAS?", ReplyKind::Number);

    match dmm.read(TIMEOUT).await {
        Err(SensorError::Format { raw, .. }) => assert_eq!(raw, "OVLD\n"),
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn closed_stream_is_io_error()
{
    let mock = Builder::new()
        .write(b"MEAS?\n")
        .build();
    let mut dmm = LineSensor::with(mock, "MEAS?", ReplyKind::Number);

    assert!(matches!(dmm.read(TIMEOUT).await, Err(SensorError::Io(_))));
}

#[tokio::test(start_paused = true)]
async fn late_reply_not_taken_for_next_query()
{
    let (station_end, mut instrument_end) = tokio::io::duplex(64);
    let mut dmm = LineSensor::with(station_end, "MEAS?", ReplyKind::Number);

    match dmm.read(Duration::from_millis(500)).await {
        Err(SensorError::Timeout(timeout)) => assert_eq!(timeout, Duration::from_millis(500)),
        other => panic!("unexpected result {:?}", other),
    }

    // the answer to the first query turns up after the deadline
    instrument_end.write_all(b"4.9\n").await.unwrap();

    let instrument = async {
        let mut queries = [0u8; 12];
        instrument_end.read_exact(&mut queries).await.unwrap();
        assert_eq!(&queries, b"MEAS?\nMEAS?\n");
        instrument_end.write_all(b"5.1\n").await.unwrap();
    };
    let (reading, ()) = tokio::join!(dmm.read(TIMEOUT), instrument);

    assert_eq!(reading.unwrap(), Sample::Number(5.1));
}

#[tokio::test(start_paused = true)]
async fn partial_line_dropped_after_timeout()
{
    let (station_end, mut instrument_end) = tokio::io::duplex(64);
    let mut dmm = LineSensor::with(station_end, "MEAS?", ReplyKind::Number);

    let instrument = async {
        let mut query = [0u8; 6];
        instrument_end.read_exact(&mut query).await.unwrap();
        instrument_end.write_all(b"4.9").await.unwrap();
    };
    let (reading, ()) = tokio::join!(dmm.read(Duration::from_millis(500)), instrument);
    assert!(matches!(reading, Err(SensorError::Timeout(_))));

    let instrument = async {
        let mut query = [0u8; 6];
        instrument_end.read_exact(&mut query).await.unwrap();
        instrument_end.write_all(b"5.1\n").await.unwrap();
    };
    let (reading, ()) = tokio::join!(dmm.read(TIMEOUT), instrument);

    assert_eq!(reading.unwrap(), Sample::Number(5.1));
}

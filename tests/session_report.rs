use chrono::{TimeZone, Utc};
use wifi_bench::session::RunLogger;
use wifi_bench::throughput::{iperf, Direction};

fn fixture_iperf3_reverse() -> String {
    r#"
    {
      "start": {
        "connected": [{ "socket": 5, "local_host": "10.0.2.15", "remote_host": "192.168.1.20" }],
        "test_start": { "protocol": "TCP", "num_streams": 1, "duration": 10, "reverse": 1 }
      },
      "intervals": [],
      "end": {
        "sum_sent": { "start": 0, "end": 10.04, "seconds": 10.04, "bytes": 118620160, "bits_per_second": 94500000, "retransmits": 12 },
        "sum_received": { "start": 0, "end": 10.04, "seconds": 10.04, "bytes": 116391936, "bits_per_second": 92741000 }
      }
    }
    "#
    .to_string()
}

#[test]
fn test_fixture_parses_per_direction() {
    let json = fixture_iperf3_reverse();

    let download = iperf::parse_report(json.as_bytes(), Direction::Download).unwrap();
    assert_eq!(download.mbps(), 92.741);

    let upload = iperf::parse_report(json.as_bytes(), Direction::Upload).unwrap();
    assert_eq!(upload.mbps(), 94.5);
}

#[test]
fn test_report_command_on_finished_session() {
    let dir = tempfile::tempdir().unwrap();
    let started = Utc.with_ymd_and_hms(2017, 6, 1, 9, 0, 0).unwrap();
    let logger = RunLogger::ensure_session(&dir.path().join("logs"), started).unwrap();

    let json = fixture_iperf3_reverse();
    for secs in [10, 20] {
        let ts = Utc.with_ymd_and_hms(2017, 6, 1, 9, 0, secs).unwrap();
        logger.write_raw_report(Direction::Download, ts, &json).unwrap();
        logger.write_raw_report(Direction::Upload, ts, &json).unwrap();
    }

    assert_cmd::Command::cargo_bin("wifi-bench")
        .unwrap()
        .env_remove("WIFI_BENCH_CONFIG")
        .current_dir(dir.path())
        .arg("report")
        .arg(logger.root())
        .assert()
        .success()
        .stdout(predicates::str::contains("Session 2017-06-01-09-00-00"))
        .stdout(predicates::str::contains("download 2/2 passed, mean 92.74 Mbps"))
        .stdout(predicates::str::contains("upload   2/2 passed, mean 94.50 Mbps"));
}

// End-to-end bridge cycles over a scripted transport.
//
// The script holds the exact line sequence the dongle would produce
// (device messages interleaved with OK replies to our TX frames); every
// line we write is captured for assertion.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use turris_gadgets_bridge::{
    AlarmBridge, BridgeConfig, LineTransport, Result, SirenMode,
};

struct ScriptedTransport {
    reads: VecDeque<String>,
    writes: Arc<Mutex<Vec<String>>>,
}

impl ScriptedTransport {
    fn new(script: &[&str]) -> (Self, Arc<Mutex<Vec<String>>>) {
        let writes = Arc::new(Mutex::new(Vec::new()));
        let transport = Self {
            reads: script.iter().map(|s| s.to_string()).collect(),
            writes: writes.clone(),
        };
        (transport, writes)
    }
}

#[async_trait]
impl LineTransport for ScriptedTransport {
    async fn read_line(&mut self, _timeout: Duration) -> Result<Option<String>> {
        // Script exhausted = read timeout
        Ok(self.reads.pop_front())
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        self.writes.lock().unwrap().push(line.to_string());
        Ok(())
    }
}

fn test_config() -> BridgeConfig {
    BridgeConfig::builder()
        .scan_slots_on_start(false)
        .loop_delay_ms(0)
        .build()
}

fn bridge_with_script(script: &[&str]) -> (AlarmBridge<ScriptedTransport>, Arc<Mutex<Vec<String>>>) {
    let (transport, writes) = ScriptedTransport::new(script);
    let bridge = AlarmBridge::new(test_config(), transport).unwrap();
    (bridge, writes)
}

#[tokio::test]
async fn arm_then_motion_raises_alarm() {
    let (mut bridge, writes) = bridge_with_script(&[
        "[00000001] remote1L ARM:1",
        "OK",
        "[00000008] pir1 ACT:1",
        "OK",
    ]);

    bridge.run_cycle().await.unwrap();
    assert!(bridge.state().armed);
    assert!(!bridge.state().alarm);

    bridge.run_cycle().await.unwrap();
    assert!(bridge.state().alarm);
    assert!(bridge.state().pgx);

    let writes = writes.lock().unwrap();
    assert_eq!(
        *writes,
        vec![
            "TX ENROLL:0 PGX:0 PGY:0 ALARM:0 BEEP:NONE",
            "TX ENROLL:0 PGX:1 PGY:0 ALARM:1 BEEP:NONE",
        ]
    );
}

#[tokio::test]
async fn disarm_always_clears_alarm_and_pgx() {
    let (mut bridge, writes) = bridge_with_script(&[
        "[00000001] remote1L ARM:1",
        "OK",
        "[00000006] door1 ACT:1 SENSOR",
        "OK",
        "[00000003] remote2L ARM:0",
        "OK",
    ]);

    for _ in 0..3 {
        bridge.run_cycle().await.unwrap();
    }

    assert!(!bridge.state().armed);
    assert!(!bridge.state().alarm);
    assert!(!bridge.state().pgx);

    let writes = writes.lock().unwrap();
    assert_eq!(
        writes.last().map(String::as_str),
        Some("TX ENROLL:0 PGX:0 PGY:0 ALARM:0 BEEP:NONE")
    );
}

#[tokio::test]
async fn control_lines_do_not_reach_the_state_machine() {
    let (mut bridge, writes) = bridge_with_script(&["TURRIS DONGLE V1.4"]);
    bridge.run_cycle().await.unwrap();
    assert!(writes.lock().unwrap().is_empty());
    assert!(!bridge.state().armed);
}

#[tokio::test]
async fn malformed_line_is_dropped_and_loop_continues() {
    let (mut bridge, writes) = bridge_with_script(&["not a protocol line"]);
    bridge.run_cycle().await.unwrap();
    assert!(writes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unregistered_device_is_ignored_for_state_but_still_retransmits() {
    let (mut bridge, writes) = bridge_with_script(&["[00000099] ghost ACT:1", "OK"]);
    bridge.run_cycle().await.unwrap();
    assert!(!bridge.state().alarm);
    assert_eq!(writes.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn read_timeout_still_performs_battery_sweep() {
    let (mut bridge, writes) = bridge_with_script(&["[00000008] pir1 SENSOR LB:1", "OK"]);
    bridge.run_cycle().await.unwrap();
    assert!(bridge
        .registry()
        .lookup("00000008")
        .unwrap()
        .low_battery);

    // Script exhausted: a timeout cycle runs the sweep and sends nothing.
    bridge.run_cycle().await.unwrap();
    assert_eq!(writes.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn rejected_command_keeps_applied_state() {
    let (mut bridge, _writes) = bridge_with_script(&["[00000001] remote1L ARM:1", "ERROR"]);
    bridge.run_cycle().await.unwrap();
    // The inbound mutation survives the failed send; the next cycle
    // would re-send it.
    assert!(bridge.state().armed);
}

#[tokio::test]
async fn siren_mode_from_config_is_carried_in_every_frame() {
    let config = BridgeConfig::builder()
        .scan_slots_on_start(false)
        .siren_mode(SirenMode::Fast)
        .build();
    let (transport, writes) = ScriptedTransport::new(&["[00000008] pir1 ACT:0", "OK"]);
    let mut bridge = AlarmBridge::new(config, transport).unwrap();

    bridge.run_cycle().await.unwrap();
    assert_eq!(
        writes.lock().unwrap().first().map(String::as_str),
        Some("TX ENROLL:0 PGX:0 PGY:0 ALARM:0 BEEP:FAST")
    );
}

#[tokio::test]
async fn event_log_records_the_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("gadgets.log");

    let config = BridgeConfig::builder()
        .scan_slots_on_start(false)
        .log_file(&log_path)
        .build();
    let (transport, _writes) = ScriptedTransport::new(&[
        "[00000008] pir1 ACT:1 LB:1",
        "OK",
    ]);
    let mut bridge = AlarmBridge::new(config, transport).unwrap();

    bridge.run_cycle().await.unwrap();
    bridge.run_cycle().await.unwrap(); // timeout cycle, sweep only

    let text = std::fs::read_to_string(&log_path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "ZONE: pir1 STATE: true",
            "CMD: TX ENROLL:0 PGX:0 PGY:0 ALARM:0 BEEP:NONE",
            "CMD_OK",
            "LOW_BATTERY: 00000008",
            "LOW_BATTERY: 00000008",
        ]
    );
}

#[tokio::test]
async fn thermostat_reading_lands_in_csv() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("thermometer.csv");

    let config = BridgeConfig::builder()
        .scan_slots_on_start(false)
        .temperature_csv(&csv_path)
        .build();
    let (transport, _writes) = ScriptedTransport::new(&[
        "[00000013] thermostat INT:22.5 SET:21.0",
        "OK",
    ]);
    let mut bridge = AlarmBridge::new(config, transport).unwrap();
    bridge.run_cycle().await.unwrap();

    assert_eq!(bridge.state().temperature.as_deref(), Some("22.5"));
    let text = std::fs::read_to_string(&csv_path).unwrap();
    let rows: Vec<&str> = text.lines().collect();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].ends_with(",22.5"));
}

#[tokio::test]
async fn startup_scans_identity_and_all_slots() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("gadgets.log");

    let mut script: Vec<String> = vec!["TURRIS DONGLE V1.4".to_string()];
    for i in 0..32u8 {
        if i == 0 {
            script.push("SLOT:00 [00000001]".to_string());
        } else {
            script.push(format!("SLOT:{:02} [--------]", i));
        }
    }
    let script_refs: Vec<&str> = script.iter().map(String::as_str).collect();

    let config = BridgeConfig::builder().log_file(&log_path).build();
    let (transport, writes) = ScriptedTransport::new(&script_refs);
    let mut bridge = AlarmBridge::new(config, transport).unwrap();
    bridge.startup().await.unwrap();

    let writes = writes.lock().unwrap();
    assert_eq!(writes.len(), 33);
    assert_eq!(writes[0], "WHO AM I?");
    assert_eq!(writes[1], "GET SLOT:00");
    assert_eq!(writes[32], "GET SLOT:31");

    let text = std::fs::read_to_string(&log_path).unwrap();
    assert!(text.starts_with("TURRIS DONGLE V1.4\n"));
    assert!(text.contains("SLOT: 00 - 00000001\n"));
    assert!(text.contains("SLOT: 31 - --------\n"));
}

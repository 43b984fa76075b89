//! Runtime tests: real tick threads, concurrent boundary writes.

use selene_common::config::{ConfigLoader, SimConfig};
use selene_common::device::driver::SimDevice;
use selene_common::device::types::FieldValue;
use selene_sim::console::Console;
use selene_sim::SimCore;
use std::io::Write;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

const SELENE_FAST: &str = r#"
[shared]
service_name = "runtime-test"

[device]
kind = "selene"
prefix = "TEST:"
tick_rate_hz = 200.0

[[device.units]]
index = 1
selectors = 2

[device.units.motor]
velocity = 10.0
user_limits = [-5.0, 5.0]

[[device.units]]
index = 2
selectors = 2

[device.units.motor]
velocity = 10.0
user_limits = [-5.0, 5.0]
"#;

fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

fn read_f64(device: &Arc<dyn SimDevice>, name: &str) -> f64 {
    device.read(name).unwrap().as_f64().unwrap()
}

#[test]
fn test_threaded_move_completes() {
    let config = SimConfig::from_toml(SELENE_FAST).unwrap();
    let mut core = SimCore::new(config).unwrap();
    let device = core.init().unwrap();
    core.start().unwrap();

    device.write("P1:Select", FieldValue::Bool(true)).unwrap();
    device.write("TEST:MCU1", FieldValue::Double(2.0)).unwrap();
    device.write("MCU2", FieldValue::Double(-1.0)).unwrap();

    let done = wait_for(Duration::from_secs(10), || {
        device.read("MCU1.DMOV").unwrap() == FieldValue::Int(1)
    });
    assert!(done, "MCU1 should finish its move");
    assert_eq!(read_f64(&device, "MCU1.RBV"), 2.0);

    // MCU2 has no enabled selector and must not have moved.
    assert_eq!(read_f64(&device, "MCU2.RBV"), 0.0);
    assert_eq!(device.read("MCU2.DMOV").unwrap(), FieldValue::Int(0));

    let stats = core.shutdown();
    assert_eq!(stats.len(), 2);
    assert!(stats.iter().all(|(_, s)| s.tick_count > 0));
}

#[test]
fn test_concurrent_enable_requests_admit_one() {
    let config = SimConfig::from_toml(SELENE_FAST).unwrap();
    let mut core = SimCore::new(config).unwrap();
    let device = core.init().unwrap();
    core.start().unwrap();

    for _ in 0..20 {
        let writers: Vec<_> = ["P1:Select", "P2:Select"]
            .into_iter()
            .map(|name| {
                let device = Arc::clone(&device);
                thread::spawn(move || device.write(name, FieldValue::Bool(true)).is_ok())
            })
            .collect();
        let admitted = writers
            .into_iter()
            .map(|w| w.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(admitted, 1);

        let enabled = ["P1:Selected", "P2:Selected"]
            .iter()
            .filter(|name| device.read(name).unwrap() == FieldValue::Bool(true))
            .count();
        assert_eq!(enabled, 1);

        device.write("P1:Select", FieldValue::Bool(false)).unwrap();
        device.write("P2:Select", FieldValue::Bool(false)).unwrap();
    }

    core.shutdown();
}

#[test]
fn test_console_drives_running_core() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{SELENE_FAST}").unwrap();
    let config = SimCore::load_config(file.path()).unwrap();

    let mut core = SimCore::new(config).unwrap();
    let device = core.init().unwrap();
    core.start().unwrap();

    let console = Console::new(Arc::clone(&device), core.running_flag());
    let input = "put P2:Select 1\nput MCU1 -0.5\n";
    let mut output = Vec::new();
    console.run(input.as_bytes(), &mut output).unwrap();
    let text = String::from_utf8(output).unwrap();
    assert!(text.contains("P2:Select = true"), "{text}");

    assert!(wait_for(Duration::from_secs(10), || read_f64(&device, "MCU1.RBV") == -0.5));

    console.handle_line("quit");
    assert!(!core.running_flag().load(Ordering::SeqCst));
    core.shutdown();
}

//! End-to-end scenarios: scripts running through a bridge wired to a mock
//! block controller, plus the concurrency contract (calls on one bridge are
//! strictly serialized; different bridges do not block each other).

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use blockscript::{BlockBridge, BlockController, ScriptError, Type, Value};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

/// Mock block controller: a small argument store plus a shared log of
/// register writes.
struct MockController {
    args: HashMap<String, Value>,
    writes: Arc<Mutex<Vec<(String, u32)>>>,
}

impl MockController {
    fn new() -> Self {
        MockController {
            args: HashMap::new(),
            writes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn with_arg(mut self, name: &str, value: Value) -> Self {
        self.args.insert(name.into(), value);
        self
    }

    fn with_write_log(mut self, log: Arc<Mutex<Vec<(String, u32)>>>) -> Self {
        self.writes = log;
        self
    }
}

impl BlockController for MockController {
    fn sr_write(&mut self, register_name: &str, value: u32) -> anyhow::Result<()> {
        self.writes.lock().push((register_name.to_owned(), value));
        Ok(())
    }
    fn arg_type(&self, name: &str) -> anyhow::Result<Type> {
        self.args
            .get(name)
            .map(Value::type_of)
            .ok_or_else(|| anyhow::anyhow!("no argument {name}"))
    }
    fn arg_value(&self, name: &str, _port: u32) -> anyhow::Result<Value> {
        self.args
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no argument {name}"))
    }
    fn set_arg(&mut self, name: &str, value: Value, _port: u32) -> anyhow::Result<()> {
        self.args.insert(name.to_owned(), value);
        Ok(())
    }
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[test]
fn add_chain_is_truthy() {
    init_tracing();
    let bridge = BlockBridge::new(MockController::new());
    // Evaluates to int 10, which is coerced to true.
    bridge
        .run_and_check("ADD(1, ADD(2, ADD(3, 4)))", "")
        .unwrap();
}

#[test]
fn samples_per_packet_gate() {
    init_tracing();
    let bridge = BlockBridge::new(MockController::new().with_arg("spp", Value::Int(64)));
    bridge
        .run_and_check(
            "GE($spp, 16) AND LE($spp, 4096) AND IS_PWR_OF_2($spp)",
            "spp must be a power of two in [16, 4096]",
        )
        .unwrap();

    let bridge = BlockBridge::new(MockController::new().with_arg("spp", Value::Int(100)));
    let err = bridge
        .run_and_check(
            "GE($spp, 16) AND LE($spp, 4096) AND IS_PWR_OF_2($spp)",
            "spp must be a power of two in [16, 4096]",
        )
        .unwrap_err();
    assert!(matches!(err, ScriptError::Runtime(_)));
    assert!(err.to_string().contains("power of two"));
}

#[test]
fn falsy_result_carries_the_caller_message() {
    let bridge = BlockBridge::new(MockController::new());
    let err = bridge.run_and_check("FALSE()", "boom").unwrap_err();
    assert!(matches!(err, ScriptError::Runtime(_)));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn conditional_register_write() {
    let writes = Arc::new(Mutex::new(Vec::new()));
    let controller = MockController::new()
        .with_arg("enable", Value::Bool(true))
        .with_write_log(writes.clone());
    let bridge = BlockBridge::new(controller);

    bridge
        .run_and_check("IF($enable, SR_WRITE('DSP_CTRL', 0x2))", "")
        .unwrap();
    assert_eq!(writes.lock().as_slice(), &[("DSP_CTRL".to_owned(), 2)]);

    // With the condition false the write must not happen; IF then
    // reports false, so give the script an OR fallback.
    let writes = Arc::new(Mutex::new(Vec::new()));
    let controller = MockController::new()
        .with_arg("enable", Value::Bool(false))
        .with_write_log(writes.clone());
    let bridge = BlockBridge::new(controller);
    bridge
        .run_and_check("IF($enable, SR_WRITE('DSP_CTRL', 0x2)) OR TRUE()", "")
        .unwrap();
    assert!(writes.lock().is_empty());
}

#[test]
fn scope_does_not_survive_a_call() {
    let bridge = BlockBridge::new(MockController::new());
    bridge
        .run_and_check("SET_VAR('threshold', 128), GE(GET_INT('threshold'), 100)", "")
        .unwrap();
    let err = bridge.run_and_check("GET_INT('threshold')", "").unwrap_err();
    assert!(matches!(err, ScriptError::Syntax(_)));
}

#[test]
fn syntax_errors_propagate_with_context() {
    let bridge = BlockBridge::new(MockController::new());
    for bad in ["ADD(1,", "ADD(1,,2)", "ADD(1 2)", "ADD(1,2))", "GLORP(1,2)"] {
        let err = bridge.run_and_check(bad, "unused").unwrap_err();
        assert!(matches!(err, ScriptError::Syntax(_)), "{bad}: {err}");
    }
}

// ── Concurrency ───────────────────────────────────────────────────────────────

#[test]
fn calls_on_one_bridge_are_serialized() {
    // Each script sleeps between two register writes.  If two calls could
    // interleave, the write log would alternate between the scripts; under
    // strict serialization every call's writes stay adjacent.
    let writes = Arc::new(Mutex::new(Vec::new()));
    let controller = MockController::new().with_write_log(writes.clone());
    let bridge = BlockBridge::new(controller);

    thread::scope(|scope| {
        for reg in ["A", "B"] {
            let bridge = &bridge;
            scope.spawn(move || {
                let script = format!(
                    "SR_WRITE('{reg}_first', 1), SLEEP(0.05), SR_WRITE('{reg}_second', 2)"
                );
                bridge.run_and_check(&script, "").unwrap();
            });
        }
    });

    let log = writes.lock();
    assert_eq!(log.len(), 4);
    // Whichever call ran first, its two writes are uninterrupted.
    assert_eq!(log[0].0.chars().next(), log[1].0.chars().next(), "{log:?}");
    assert_eq!(log[2].0.chars().next(), log[3].0.chars().next(), "{log:?}");
}

#[test]
fn different_bridges_run_concurrently() {
    let first = BlockBridge::new(MockController::new());
    let second = BlockBridge::new(MockController::new());

    let started = Instant::now();
    thread::scope(|scope| {
        scope.spawn(|| first.run_and_check("SLEEP(0.25)", "").unwrap());
        scope.spawn(|| second.run_and_check("SLEEP(0.25)", "").unwrap());
    });
    // Serialized execution would need at least 0.5 s.
    assert!(
        started.elapsed() < Duration::from_millis(450),
        "bridges blocked each other: {:?}",
        started.elapsed()
    );
}

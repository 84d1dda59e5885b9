//! Shared test setup, mirroring the teacher's `tests/integration/test_helpers.rs`.

/// Installs a `tracing-subscriber` fmt layer writing to the test harness's
/// captured output, the same way the teacher's `TestContext::with_config`
/// does. Safe to call from every test; `try_init` just no-ops after the
/// first successful call in this test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().with_env_filter("warn").try_init();
}

//! Layering guardrails to keep test bodies independent of the harness.
//!
//! `testrun_core` holds what test bodies need (the failure type and assertions). It must never depend on
//! the `testrun` crate, or every test body would pull in the scheduler and the CLI.

#[test]
fn core_does_not_depend_on_harness() {
    let manifest = include_str!("../crates/testrun_core/Cargo.toml");
    let mut in_dependencies = false;

    for raw_line in manifest.lines() {
        let line = raw_line.trim();
        // Track when we enter/exit a dependency table.
        if line.starts_with('[') {
            in_dependencies = line.ends_with("dependencies]");
            continue;
        }

        if !in_dependencies || line.is_empty() || line.starts_with('#') {
            continue;
        }

        let name = line.split(['=', '.']).next().unwrap_or("").trim();
        if name == "testrun" {
            panic!("`testrun_core` must not depend on `testrun`");
        }
    }
}

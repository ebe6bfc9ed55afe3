//! Behavioural tests for the daemon entry point.

use std::cell::RefCell;
use std::ffi::OsString;
use std::io::Cursor;
use std::process::ExitCode;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::Value;

struct DaemonWorld {
    args: Vec<OsString>,
    exit: Option<ExitCode>,
    stdout: String,
}

impl DaemonWorld {
    fn new() -> Self {
        Self {
            args: vec![OsString::from("rivetd")],
            exit: None,
            stdout: String::new(),
        }
    }

    fn send(&mut self, input: &str) {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let exit = rivetd::run(
            self.args.clone(),
            Cursor::new(input.as_bytes().to_vec()),
            &mut stdout,
            &mut stderr,
        );
        self.exit = Some(exit);
        self.stdout = String::from_utf8(stdout).expect("utf-8 stdout");
    }

    fn reply(&self) -> Value {
        serde_json::from_str(self.stdout.trim_end()).expect("single JSON reply")
    }
}

fn canned_input(name: &str) -> &'static str {
    match name {
        "describe" => "{\"jsonrpc\":\"2.0\",\"method\":\"describe\",\"id\":1}\n",
        "echo" => "{\"jsonrpc\":\"2.0\",\"method\":\"echo\",\"params\":[\"hi\"],\"id\":2}\n",
        "shutdown then echo" => concat!(
            "{\"jsonrpc\":\"2.0\",\"method\":\"shutdown\",\"id\":3}\n",
            "{\"jsonrpc\":\"2.0\",\"method\":\"echo\",\"params\":[\"late\"],\"id\":4}\n",
        ),
        "overflowing add" => {
            "{\"jsonrpc\":\"2.0\",\"method\":\"add\",\"params\":[9223372036854775807,1],\"id\":5}\n"
        }
        other => panic!("no canned input named '{other}'"),
    }
}

#[fixture]
fn world() -> RefCell<DaemonWorld> {
    RefCell::new(DaemonWorld::new())
}

#[given("the daemon is started with no flags")]
fn given_no_flags(world: &RefCell<DaemonWorld>) {
    world.borrow_mut().args.truncate(1);
}

#[given("the daemon is started with the \"{flag}\" flag")]
fn given_flag(world: &RefCell<DaemonWorld>, flag: String) {
    world.borrow_mut().args.push(OsString::from(flag));
}

#[when("the client sends the \"{name}\" request")]
fn when_client_sends(world: &RefCell<DaemonWorld>, name: String) {
    world.borrow_mut().send(canned_input(&name));
}

#[then("the reply lists {count} methods")]
fn then_methods(world: &RefCell<DaemonWorld>, count: usize) {
    let reply = world.borrow().reply();
    let methods = reply["result"]["methods"]
        .as_array()
        .expect("methods array");
    assert_eq!(methods.len(), count);
}

#[then("the reply is an error with code {code} and message \"{message}\"")]
fn then_error(world: &RefCell<DaemonWorld>, code: i64, message: String) {
    let reply = world.borrow().reply();
    assert_eq!(reply["error"]["code"], Value::from(code));
    assert_eq!(reply["error"]["message"], Value::String(message));
}

#[then("nothing is written to stdout")]
fn then_no_stdout(world: &RefCell<DaemonWorld>) {
    assert!(world.borrow().stdout.is_empty());
}

#[then("the daemon exits with status {status}")]
fn then_exit(world: &RefCell<DaemonWorld>, status: u8) {
    assert_eq!(world.borrow().exit, Some(ExitCode::from(status)));
}

#[scenario(path = "tests/features/daemon.feature", name = "Describe lists the served methods")]
fn describe(#[from(world)] world: RefCell<DaemonWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/daemon.feature",
    name = "Shutdown ends the session without a reply"
)]
fn shutdown(#[from(world)] world: RefCell<DaemonWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/daemon.feature",
    name = "Overflowing sums are reported as server errors"
)]
fn overflow(#[from(world)] world: RefCell<DaemonWorld>) {
    drop(world);
}

#[scenario(path = "tests/features/daemon.feature", name = "Unknown flags are rejected")]
fn unknown_flag(#[from(world)] world: RefCell<DaemonWorld>) {
    drop(world);
}

//! Behavioural tests for the framing loops.

use std::cell::RefCell;
use std::io::Cursor;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::Value;

use rivet_config::{Config, FramingMode};
use rivet_dispatch::{DispatchResult, NopLogger, Pipeline, PipelineOptions, Registry};
use rivet_framing::{StreamEnd, serve};

const ECHO_A: &str = r#"{"jsonrpc":"2.0","method":"echo","params":["a"],"id":1}"#;
const ECHO_B: &str = r#"{"jsonrpc":"2.0","method":"echo","params":["b"],"id":2}"#;
const ECHO_OK: &str = r#"{"jsonrpc":"2.0","method":"echo","params":["ok"],"id":3}"#;
const STOP: &str = r#"{"jsonrpc":"2.0","method":"stop","id":9}"#;

#[derive(Default)]
struct FramingWorld {
    config: Config,
    input: Vec<u8>,
    replies: Vec<Value>,
    end: Option<StreamEnd>,
}

impl FramingWorld {
    fn delimited(&mut self, lines: &[&str]) {
        self.config.framing = FramingMode::Delimited;
        self.input = lines.iter().map(|line| format!("{line}\n")).collect::<String>().into_bytes();
    }

    fn serve(&mut self) {
        let mut builder = Registry::builder();
        builder
            .register("echo", |text: String| text)
            .expect("register echo")
            .register("stop", || DispatchResult::EndStream)
            .expect("register stop");
        let mut pipeline = Pipeline::with_logger(
            builder.build().into_shared(),
            NopLogger,
            PipelineOptions::from(&self.config),
        );
        let mut output = Vec::new();
        let end = serve(
            &self.config,
            Cursor::new(self.input.clone()),
            &mut output,
            &mut pipeline,
        )
        .expect("in-memory stream");
        self.end = Some(end);
        self.replies = split_replies(self.config.framing, &output);
    }
}

fn split_replies(framing: FramingMode, output: &[u8]) -> Vec<Value> {
    let text = std::str::from_utf8(output).expect("utf-8 output");
    let bodies: Vec<&str> = match framing {
        FramingMode::Delimited => text.lines().collect(),
        FramingMode::ContentLength => text
            .split("Content-Length: ")
            .filter(|chunk| !chunk.is_empty())
            .map(|chunk| chunk.split_once("\r\n\r\n").expect("header terminator").1)
            .collect(),
    };
    bodies
        .into_iter()
        .map(|body| serde_json::from_str(body).expect("reply is JSON"))
        .collect()
}

fn reply(world: &RefCell<FramingWorld>, position: usize) -> Value {
    world
        .borrow()
        .replies
        .get(position.saturating_sub(1))
        .cloned()
        .expect("reply at position")
}

#[fixture]
fn world() -> RefCell<FramingWorld> {
    RefCell::new(FramingWorld::default())
}

#[given("a delimited stream with a malformed line between two echoes")]
fn given_malformed_line(world: &RefCell<FramingWorld>) {
    world.borrow_mut().delimited(&[ECHO_A, "{oops", ECHO_B]);
}

#[given("a delimited stream that stops before its last echo")]
fn given_stop(world: &RefCell<FramingWorld>) {
    world.borrow_mut().delimited(&[ECHO_A, STOP, ECHO_B]);
}

#[given("a content-length stream with noise before an echo")]
fn given_noise(world: &RefCell<FramingWorld>) {
    let mut state = world.borrow_mut();
    state.config.framing = FramingMode::ContentLength;
    state.input = format!(
        "garbage\r\nContent-Length: {}\r\n\r\n{ECHO_OK}",
        ECHO_OK.len()
    )
    .into_bytes();
}

#[when("the stream is served")]
fn when_served(world: &RefCell<FramingWorld>) {
    world.borrow_mut().serve();
}

#[then("{count} replies are written")]
fn then_reply_count(world: &RefCell<FramingWorld>, count: usize) {
    assert_eq!(world.borrow().replies.len(), count);
}

#[then("reply {position} is a parse error")]
fn then_parse_error(world: &RefCell<FramingWorld>, position: usize) {
    let value = reply(world, position);
    assert_eq!(value["error"]["code"], -32700);
    assert_eq!(value["id"], Value::Null);
}

#[then("reply {position} echoes \"{text}\"")]
fn then_echoes(world: &RefCell<FramingWorld>, position: usize, text: String) {
    assert_eq!(reply(world, position)["result"], Value::String(text));
}

#[then("the stream closed")]
fn then_closed(world: &RefCell<FramingWorld>) {
    assert_eq!(world.borrow().end, Some(StreamEnd::Closed));
}

#[then("the stream was stopped")]
fn then_stopped(world: &RefCell<FramingWorld>) {
    assert_eq!(world.borrow().end, Some(StreamEnd::Stopped));
}

#[scenario(
    path = "tests/features/framing.feature",
    name = "A malformed line does not stop a delimited stream"
)]
fn malformed_line(#[from(world)] world: RefCell<FramingWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/framing.feature",
    name = "Noise before a Content-Length frame is skipped"
)]
fn noise_before_frame(#[from(world)] world: RefCell<FramingWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/framing.feature",
    name = "A stop request ends the stream early"
)]
fn stop_request(#[from(world)] world: RefCell<FramingWorld>) {
    drop(world);
}

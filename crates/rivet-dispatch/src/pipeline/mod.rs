//! Request dispatch pipeline.
//!
//! A [`Pipeline`] owns the per-session state around a shared [`Registry`]:
//! one scratch scope per registered handler, the session [`Logger`], and the
//! output buffer replies are composed into. It is `!Sync`; run
//! one pipeline per worker and share the registry between them.
//!
//! Each well-formed request moves through
//! `pre-request hook → lookup → handler or fallback → on-error hook →
//! end-request hook`. The end-request hook runs from a drop guard, so it fires
//! exactly once on every exit path, after which the handler's scratch scope is
//! reset. Requests that failed parsing skip the hooks entirely and are
//! answered with their attached error.

use std::cell::RefCell;
use std::io::{self, Write};
use std::sync::Arc;

use rivet_protocol::{
    Id, Message, MessageWriter, Params, ParsedMessage, ParsedRequest, Request, Response,
    parse_message, parse_request,
};
use serde_json::{Map, Value};

use crate::error::HandlerError;
use crate::logger::{Logger, TracingLogger};
use crate::registry::{HandlerEntry, Hook, Registry};
use crate::result::{DispatchResult, RunStatus};
use crate::scratch::{PipelineOptions, Scratch};

const PIPELINE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::pipeline");

/// Outcome of [`Pipeline::run_message`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageRun {
    /// Summary of the replies written for the request members.
    pub status: RunStatus,
    /// Response members, in input order, for the caller to correlate.
    pub responses: Vec<Response>,
}

/// Single-threaded dispatch session over a shared registry.
pub struct Pipeline<L: Logger = TracingLogger> {
    dispatcher: Dispatcher<L>,
    output: Vec<u8>,
}

impl Pipeline {
    /// Creates a pipeline that logs through `tracing` with default options.
    #[must_use]
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_logger(registry, TracingLogger, PipelineOptions::default())
    }
}

impl<L: Logger> Pipeline<L> {
    /// Creates a pipeline with an explicit logger and options.
    ///
    /// The logger's `start` is called immediately; `stop` is called when the
    /// pipeline is dropped.
    #[must_use]
    pub fn with_logger(registry: Arc<Registry>, logger: L, options: PipelineOptions) -> Self {
        let scratch = (0..registry.len())
            .map(|_| RefCell::new(Scratch::new(options.scratch_retain_bytes)))
            .collect();
        logger.start(&format!("serving {} methods", registry.len()));
        Self {
            dispatcher: Dispatcher {
                registry,
                scratch,
                logger,
            },
            output: Vec::new(),
        }
    }

    /// The registry requests are dispatched against.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.dispatcher.registry
    }

    /// Reply bytes composed by the most recent run.
    #[must_use]
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Dispatches one parsed request without composing a reply.
    #[must_use]
    pub fn dispatch(&self, request: &Request) -> DispatchResult {
        self.dispatcher.dispatch(request)
    }

    /// Parses, dispatches, and composes the reply for one frame of request
    /// text.
    ///
    /// The output buffer is cleared first. After the call it holds the reply
    /// text, if any, without framing.
    ///
    /// # Errors
    ///
    /// Returns an error only if writing into the output buffer fails.
    pub fn run_request(&mut self, text: &str) -> io::Result<RunStatus> {
        let Self { dispatcher, output } = self;
        output.clear();
        let mut writer = MessageWriter::new(output);
        match parse_request(text) {
            ParsedRequest::Single(request) => dispatcher.run_single(&mut writer, &request),
            ParsedRequest::Batch(requests) => dispatcher.run_batch(&mut writer, &requests),
            ParsedRequest::Invalid(error) => {
                dispatcher.log_invalid(&error.message);
                writer.write_error(&error.id, error.code.code(), &error.message, None)?;
                Ok(RunStatus::replied())
            }
        }
    }

    /// Like [`Pipeline::run_request`], for channels that multiplex requests
    /// and responses.
    ///
    /// Request members are dispatched and answered as usual. Response members
    /// are returned to the caller in input order and never answered; a batch
    /// made only of responses writes nothing.
    ///
    /// # Errors
    ///
    /// Returns an error only if writing into the output buffer fails.
    pub fn run_message(&mut self, text: &str) -> io::Result<MessageRun> {
        let Self { dispatcher, output } = self;
        output.clear();
        let mut writer = MessageWriter::new(output);
        match parse_message(text) {
            ParsedMessage::Single(Message::Request(request)) => Ok(MessageRun {
                status: dispatcher.run_single(&mut writer, &request)?,
                responses: Vec::new(),
            }),
            ParsedMessage::Single(Message::Response(response)) => Ok(MessageRun {
                status: RunStatus::default(),
                responses: vec![response],
            }),
            ParsedMessage::Batch(messages) => {
                let mut requests = Vec::new();
                let mut responses = Vec::new();
                for message in messages {
                    match message {
                        Message::Request(request) => requests.push(request),
                        Message::Response(response) => responses.push(response),
                    }
                }
                let status = if requests.is_empty() && !responses.is_empty() {
                    RunStatus::default()
                } else {
                    dispatcher.run_batch(&mut writer, &requests)?
                };
                Ok(MessageRun { status, responses })
            }
            ParsedMessage::Invalid(error) => {
                dispatcher.log_invalid(&error.message);
                writer.write_error(&error.id, error.code.code(), &error.message, None)?;
                Ok(MessageRun {
                    status: RunStatus::replied(),
                    responses: Vec::new(),
                })
            }
        }
    }
}

impl<L: Logger> Drop for Pipeline<L> {
    fn drop(&mut self) {
        self.dispatcher.logger.stop("pipeline closed");
    }
}

struct Dispatcher<L> {
    registry: Arc<Registry>,
    scratch: Vec<RefCell<Scratch>>,
    logger: L,
}

impl<L: Logger> Dispatcher<L> {
    fn dispatch(&self, request: &Request) -> DispatchResult {
        if let Some(error) = &request.error {
            return DispatchResult::Err {
                code: error.code.code(),
                message: error.message.clone(),
                data: None,
            };
        }

        self.logger.log("pipeline", "request", &request.method);
        self.notify_hook(Hook::PreRequest, || Params::Absent);

        let mut scope = RequestScope {
            dispatcher: self,
            slot: None,
        };
        let outcome = match self.registry.lookup(&request.method) {
            Some((position, entry)) => {
                scope.slot = Some(position);
                self.invoke(position, entry, &request.params)
            }
            None => self.fallback(request, &mut scope),
        };
        let result = outcome.unwrap_or_else(|error| self.report_error(&request.method, &error));
        drop(scope);

        tracing::debug!(
            target: PIPELINE_TARGET,
            event = "dispatched",
            method = %request.method,
            outcome = result.label(),
            "request dispatched"
        );
        self.logger.log("pipeline", "response", result.label());
        result
    }

    fn run_single<W: Write>(
        &self,
        writer: &mut MessageWriter<W>,
        request: &Request,
    ) -> io::Result<RunStatus> {
        let result = self.dispatch(request);
        let replied = needs_reply(request, &result);
        if replied {
            write_reply(writer, &request.id, &result)?;
        }
        Ok(RunStatus {
            replied,
            end_stream: result.is_end_stream(),
        })
    }

    fn run_batch<W: Write>(
        &self,
        writer: &mut MessageWriter<W>,
        requests: &[Request],
    ) -> io::Result<RunStatus> {
        let mut batch = writer.begin_batch()?;
        let mut end_stream = false;
        for request in requests {
            let result = self.dispatch(request);
            end_stream |= result.is_end_stream();
            if needs_reply(request, &result) {
                write_reply(batch.member()?, &request.id, &result)?;
            }
        }
        tracing::debug!(
            target: PIPELINE_TARGET,
            event = "batch_dispatched",
            members = requests.len(),
            replies = batch.len(),
            "batch dispatched"
        );
        batch.finish()?;
        Ok(RunStatus {
            replied: true,
            end_stream,
        })
    }

    fn invoke(
        &self,
        position: usize,
        entry: &HandlerEntry,
        params: &Params,
    ) -> Result<DispatchResult, HandlerError> {
        let Some(cell) = self.scratch.get(position) else {
            return Err(HandlerError::internal("scratch scope missing"));
        };
        let Ok(mut scratch) = cell.try_borrow_mut() else {
            return Err(HandlerError::internal("scratch scope already in use"));
        };
        entry.invoke(&mut scratch, params)
    }

    fn reset(&self, position: usize) {
        if let Some(Ok(mut scratch)) = self.scratch.get(position).map(RefCell::try_borrow_mut) {
            scratch.reset();
        }
    }

    fn fallback(
        &self,
        request: &Request,
        scope: &mut RequestScope<'_, L>,
    ) -> Result<DispatchResult, HandlerError> {
        let Some((position, entry)) = self.registry.hook(Hook::Fallback) else {
            return Err(HandlerError::MethodNotFound);
        };
        scope.slot = Some(position);
        let params = hook_params(entry, || fallback_params(request));
        self.invoke(position, entry, &params)
    }

    fn report_error(&self, method: &str, error: &HandlerError) -> DispatchResult {
        let result = error.to_dispatch_result();
        tracing::warn!(
            target: PIPELINE_TARGET,
            event = "handler_failed",
            method,
            code = error.code(),
            error = %error,
            "handler failed"
        );
        self.logger.log("handler", method, &error.to_string());
        if let DispatchResult::Err { code, message, .. } = &result {
            self.notify_hook(Hook::OnError, || on_error_params(method, *code, message));
        }
        result
    }

    /// Runs a hook whose outcome only matters when it fails.
    fn notify_hook(&self, hook: Hook, params: impl FnOnce() -> Params) {
        let Some((position, entry)) = self.registry.hook(hook) else {
            return;
        };
        let outcome = self.invoke(position, entry, &hook_params(entry, params));
        self.reset(position);
        if let Err(error) = outcome {
            tracing::error!(
                target: PIPELINE_TARGET,
                event = "hook_failed",
                hook = hook.name(),
                error = %error,
                "pipeline hook failed"
            );
            self.logger.log("hook", hook.name(), &error.to_string());
        }
    }

    fn log_invalid(&self, message: &str) {
        tracing::debug!(
            target: PIPELINE_TARGET,
            event = "invalid_input",
            failure = message,
            "request text rejected"
        );
        self.logger.log("pipeline", "invalid", message);
    }
}

/// Runs the end-request hook and resets the handler scope when dropped.
struct RequestScope<'a, L: Logger> {
    dispatcher: &'a Dispatcher<L>,
    slot: Option<usize>,
}

impl<L: Logger> Drop for RequestScope<'_, L> {
    fn drop(&mut self) {
        self.dispatcher.notify_hook(Hook::EndRequest, || Params::Absent);
        if let Some(position) = self.slot {
            self.dispatcher.reset(position);
        }
    }
}

/// Zero-argument hooks are always called without params.
fn hook_params(entry: &HandlerEntry, params: impl FnOnce() -> Params) -> Params {
    if entry.shape().is_none() {
        Params::Absent
    } else {
        params()
    }
}

fn fallback_params(request: &Request) -> Params {
    let mut map = Map::new();
    map.insert("method".to_owned(), Value::String(request.method.clone()));
    map.insert("params".to_owned(), request.params.to_value());
    Params::Object(map)
}

fn on_error_params(method: &str, code: i32, message: &str) -> Params {
    let mut map = Map::new();
    map.insert("method".to_owned(), Value::String(method.to_owned()));
    map.insert("code".to_owned(), Value::from(code));
    map.insert("message".to_owned(), Value::String(message.to_owned()));
    Params::Object(map)
}

/// Malformed requests are always answered; other notifications never are.
const fn needs_reply(request: &Request, result: &DispatchResult) -> bool {
    if result.is_end_stream() {
        return false;
    }
    request.has_error() || !request.is_notification()
}

fn write_reply<W: Write>(
    writer: &mut MessageWriter<W>,
    id: &Id,
    result: &DispatchResult,
) -> io::Result<()> {
    match result {
        DispatchResult::Result(raw) => writer.write_result(id, raw),
        DispatchResult::Err {
            code,
            message,
            data,
        } => writer.write_error(id, *code, message, data.as_ref()),
        DispatchResult::None | DispatchResult::EndStream => {
            writer.write_response(&Response::success(id.clone(), Value::Null))
        }
    }
}

//! JSON-RPC 2.0 handler registry, parameter marshaling, and dispatch
//! pipeline.
//!
//! Native functions are registered on a [`RegistryBuilder`], which erases
//! each one behind a uniform [`Handler`] adapter after classifying its
//! argument list into a [`ParamShape`]. The frozen [`Registry`] is shared
//! between any number of [`Pipeline`]s, each of which parses request text,
//! runs the hook chain around the matching handler, and composes the reply.
//!
//! ```
//! use rivet_dispatch::{Pipeline, Registry};
//!
//! let mut builder = Registry::builder();
//! builder
//!     .register("echo", |text: String| text)
//!     .expect("echo registers");
//! let mut pipeline = Pipeline::new(builder.build().into_shared());
//!
//! pipeline
//!     .run_request(r#"{"jsonrpc":"2.0","method":"echo","params":["hi"],"id":1}"#)
//!     .expect("in-memory output");
//! assert_eq!(pipeline.output(), br#"{"jsonrpc":"2.0","result":"hi","id":1}"#);
//! ```

mod error;
mod handler;
mod logger;
mod params;
mod pipeline;
mod registry;
mod reply;
mod result;
mod scratch;

pub use error::{HandlerError, ParamError, RegistrationError};
pub use handler::{
    BoxedHandler, Handler, IntoBoundHandler, IntoBoundScopedHandler, IntoHandler,
    IntoScopedHandler,
};
pub use logger::{Logger, NopLogger, TracingLogger};
pub use params::{Arguments, Json, Param, ParamShape, Primitive, Stringified};
pub use pipeline::{MessageRun, Pipeline};
pub use registry::{Hook, RESERVED_PREFIX, Registry, RegistryBuilder};
pub use reply::IntoReply;
pub use result::{DispatchResult, RunStatus};
pub use scratch::{PipelineOptions, Scratch};

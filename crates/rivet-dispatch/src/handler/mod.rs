//! Type-erased call adapters for native handler functions.
//!
//! Registration goes through one of four constructor traits, chosen by the
//! registry method used:
//!
//! | registry method | handler signature |
//! |---|---|
//! | `register` | `Fn(args..) -> R` |
//! | `register_scoped` | `Fn(&mut Scratch, args..) -> R` |
//! | `register_bound` | `Fn(&S, args..) -> R` |
//! | `register_bound_scoped` | `Fn(&S, &mut Scratch, args..) -> R` |
//!
//! `args..` is any argument list implementing
//! [`Arguments`](crate::params::Arguments) (up to six values) and `R` is any
//! [`IntoReply`]. Each impl erases the function behind [`Handler`], recording
//! its [`ParamShape`] at registration.

use std::sync::Arc;

use rivet_protocol::Params;

use crate::error::HandlerError;
use crate::params::{Arguments, ParamShape};
use crate::reply::IntoReply;
use crate::result::DispatchResult;
use crate::scratch::Scratch;

/// Uniform call adapter stored in the registry.
pub trait Handler: Send + Sync {
    /// Parameter shape the handler was classified with.
    fn shape(&self) -> ParamShape;

    /// Marshals `params`, calls the handler, and converts its reply.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError`] when marshaling fails or the handler fails.
    fn invoke(&self, scratch: &mut Scratch, params: &Params)
    -> Result<DispatchResult, HandlerError>;
}

/// Boxed handler held by a registry entry.
pub type BoxedHandler = Box<dyn Handler>;

struct FnAdapter<F> {
    shape: ParamShape,
    call: F,
}

impl<F> Handler for FnAdapter<F>
where
    F: Fn(&mut Scratch, &Params) -> Result<DispatchResult, HandlerError> + Send + Sync,
{
    fn shape(&self) -> ParamShape {
        self.shape
    }

    fn invoke(
        &self,
        scratch: &mut Scratch,
        params: &Params,
    ) -> Result<DispatchResult, HandlerError> {
        (self.call)(scratch, params)
    }
}

fn adapter<F>(shape: ParamShape, call: F) -> BoxedHandler
where
    F: Fn(&mut Scratch, &Params) -> Result<DispatchResult, HandlerError> + Send + Sync + 'static,
{
    Box::new(FnAdapter { shape, call })
}

/// A function registrable with `RegistryBuilder::register`.
pub trait IntoHandler<Args>: Send + Sync + 'static {
    /// Erases the function behind a [`Handler`].
    fn into_handler(self) -> BoxedHandler;
}

/// A function registrable with `RegistryBuilder::register_scoped`.
pub trait IntoScopedHandler<Args>: Send + Sync + 'static {
    /// Erases the function behind a [`Handler`].
    fn into_handler(self) -> BoxedHandler;
}

/// A function registrable with `RegistryBuilder::register_bound`.
pub trait IntoBoundHandler<S, Args>: Send + Sync + 'static {
    /// Erases the function and its receiver behind a [`Handler`].
    fn into_handler(self, receiver: Arc<S>) -> BoxedHandler;
}

/// A function registrable with `RegistryBuilder::register_bound_scoped`.
pub trait IntoBoundScopedHandler<S, Args>: Send + Sync + 'static {
    /// Erases the function and its receiver behind a [`Handler`].
    fn into_handler(self, receiver: Arc<S>) -> BoxedHandler;
}

macro_rules! into_handler {
    ($($ty:ident $arg:ident),*) => {
        impl<F, R, $($ty,)*> IntoHandler<($($ty,)*)> for F
        where
            F: Fn($($ty),*) -> R + Send + Sync + 'static,
            R: IntoReply,
            ($($ty,)*): Arguments,
        {
            fn into_handler(self) -> BoxedHandler {
                adapter(<($($ty,)*)>::SHAPE, move |_, params| {
                    let ($($arg,)*) = <($($ty,)*)>::extract(params)?;
                    (self)($($arg),*).into_reply()
                })
            }
        }

        impl<F, R, $($ty,)*> IntoScopedHandler<($($ty,)*)> for F
        where
            F: Fn(&mut Scratch, $($ty),*) -> R + Send + Sync + 'static,
            R: IntoReply,
            ($($ty,)*): Arguments,
        {
            fn into_handler(self) -> BoxedHandler {
                adapter(<($($ty,)*)>::SHAPE, move |scratch, params| {
                    let ($($arg,)*) = <($($ty,)*)>::extract(params)?;
                    (self)(scratch, $($arg),*).into_reply()
                })
            }
        }

        impl<F, S, R, $($ty,)*> IntoBoundHandler<S, ($($ty,)*)> for F
        where
            F: Fn(&S, $($ty),*) -> R + Send + Sync + 'static,
            S: Send + Sync + 'static,
            R: IntoReply,
            ($($ty,)*): Arguments,
        {
            fn into_handler(self, receiver: Arc<S>) -> BoxedHandler {
                adapter(<($($ty,)*)>::SHAPE, move |_, params| {
                    let ($($arg,)*) = <($($ty,)*)>::extract(params)?;
                    (self)(&*receiver, $($arg),*).into_reply()
                })
            }
        }

        impl<F, S, R, $($ty,)*> IntoBoundScopedHandler<S, ($($ty,)*)> for F
        where
            F: Fn(&S, &mut Scratch, $($ty),*) -> R + Send + Sync + 'static,
            S: Send + Sync + 'static,
            R: IntoReply,
            ($($ty,)*): Arguments,
        {
            fn into_handler(self, receiver: Arc<S>) -> BoxedHandler {
                adapter(<($($ty,)*)>::SHAPE, move |scratch, params| {
                    let ($($arg,)*) = <($($ty,)*)>::extract(params)?;
                    (self)(&*receiver, scratch, $($arg),*).into_reply()
                })
            }
        }
    };
}

into_handler!();
into_handler!(A1 a1);
into_handler!(A1 a1, A2 a2);
into_handler!(A1 a1, A2 a2, A3 a3);
into_handler!(A1 a1, A2 a2, A3 a3, A4 a4);
into_handler!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5);
into_handler!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6);

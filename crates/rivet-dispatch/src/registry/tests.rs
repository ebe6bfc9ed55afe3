//! Tests for registration rules and registry lookups.

use std::sync::Arc;

use rivet_protocol::Params;
use rstest::{fixture, rstest};
use serde_json::json;

use super::*;

fn echo(text: String) -> String {
    text
}

#[fixture]
fn builder() -> RegistryBuilder {
    let mut builder = Registry::builder();
    builder
        .register("echo", echo)
        .expect("register echo")
        .register("ping", || "pong")
        .expect("register ping");
    builder
}

#[rstest]
fn methods_keep_registration_order(builder: RegistryBuilder) {
    let registry = builder.build();
    assert_eq!(registry.methods(), vec!["echo", "ping"]);
    assert_eq!(registry.len(), 2);
    assert!(!registry.is_empty());
}

#[rstest]
fn shapes_are_reported(builder: RegistryBuilder) {
    let registry = builder.build();
    assert_eq!(registry.shape("echo"), Some(ParamShape::Flat(1)));
    assert_eq!(registry.shape("ping"), Some(ParamShape::None));
    assert_eq!(registry.shape("missing"), None);
}

#[rstest]
fn duplicates_are_rejected(mut builder: RegistryBuilder) {
    let error = builder.register("echo", echo).expect_err("duplicate");
    assert_eq!(
        error,
        RegistrationError::DuplicateMethod {
            name: "echo".to_owned()
        }
    );
}

#[test]
fn empty_names_are_rejected() {
    let mut builder = Registry::builder();
    let error = builder.register("", || ()).expect_err("empty name");
    assert_eq!(error, RegistrationError::EmptyMethodName);
}

#[rstest]
#[case("rpc.custom")]
#[case("rpc.")]
#[case("rpc.pre-request2")]
fn reserved_prefix_is_rejected(#[case] name: &str) {
    let mut builder = Registry::builder();
    let error = builder.register(name, || ()).expect_err("reserved name");
    assert_eq!(
        error,
        RegistrationError::InvalidMethodName {
            name: name.to_owned()
        }
    );
}

#[rstest]
#[case(Hook::PreRequest)]
#[case(Hook::Fallback)]
#[case(Hook::OnError)]
#[case(Hook::EndRequest)]
fn hook_names_are_accepted(#[case] hook: Hook) {
    let mut builder = Registry::builder();
    builder.register(hook.name(), || ()).expect("hook registers");
    let registry = builder.build();
    assert!(registry.has_hook(hook));
    assert!(registry.hook(hook).is_some());
    assert!(registry.contains(hook.name()));
}

#[test]
fn hook_names_round_trip() {
    for hook in Hook::ALL {
        assert_eq!(Hook::from_name(hook.name()), Some(hook));
    }
    assert_eq!(Hook::from_name("rpc.other"), None);
}

#[test]
fn reserved_names_never_resolve_as_methods() {
    let mut builder = Registry::builder();
    builder
        .register(Hook::Fallback.name(), |_: serde_json::Value| "fallback")
        .expect("fallback registers");
    let registry = builder.build();
    assert!(registry.lookup(Hook::Fallback.name()).is_none());
    assert!(matches!(
        registry.invoke(Hook::Fallback.name(), &Params::Absent),
        Err(HandlerError::MethodNotFound)
    ));
}

#[rstest]
fn invoke_calls_the_handler(builder: RegistryBuilder) {
    let registry = builder.build();
    let outcome = registry
        .invoke("echo", &Params::Array(vec![json!("hi")]))
        .expect("echo succeeds");
    assert_eq!(outcome.result_text(), Some(r#""hi""#));
}

#[test]
fn bound_handlers_share_their_receiver() {
    struct Prefix(String);

    let receiver = Arc::new(Prefix("> ".to_owned()));
    let mut builder = Registry::builder();
    builder
        .register_bound("quote", Arc::clone(&receiver), |prefix: &Prefix, text: String| {
            format!("{}{text}", prefix.0)
        })
        .expect("bound handler registers");
    let registry = builder.build();
    let outcome = registry
        .invoke("quote", &Params::Array(vec![json!("x")]))
        .expect("quote succeeds");
    assert_eq!(outcome.result_text(), Some(r#""> x""#));
    assert_eq!(Arc::strong_count(&receiver), 2);
}

#[test]
fn registries_are_shareable_across_threads() {
    fn assert_shareable<T: Send + Sync>() {}
    assert_shareable::<Registry>();
}

//! Integration tests for construction, wrapping, resolution and rendering.
//!
//! These live outside the crate so that the call sites under test belong to
//! a different source file than the constructors.

use caused_by::{
    bug, bugf, caused, causedf, client_bug, client_bugf, coded, external, externalf,
    for_log_error, get_caused_by, get_code, get_error_code, get_panic_caused_by, input, inputf,
    new_bug, new_caused, new_client_bug, new_coded, new_external, new_input, new_runtime, runtime,
    runtimef, wrap, wrap_panic, wrapf, CausedBy, Code, Error, OptionExt, ResultExt,
    GENERAL_BY_BUG, INNER_SEPARATOR, NOT_ERROR,
};
use std::any::Any;
use std::io;

fn plain(msg: &'static str) -> io::Error {
    io::Error::other(msg)
}

// ============================================================================
// Absent errors
// ============================================================================

#[test]
fn absent_errors_stay_absent() {
    let none: Option<io::Error> = None;
    assert!(none.bug().is_none());

    let none: Option<io::Error> = None;
    assert!(none.runtime().is_none());

    let none: Option<io::Error> = None;
    assert!(none.external().is_none());

    let none: Option<io::Error> = None;
    assert!(none.input().is_none());

    let none: Option<io::Error> = None;
    assert!(none.client_bug().is_none());

    let none: Option<Error> = None;
    assert!(none.wrap_err(CausedBy::ByBug, "never").is_none());
}

#[test]
fn ok_results_pass_through() {
    let ok: Result<&str, io::Error> = Ok("value");
    assert_eq!(ok.bug().ok(), Some("value"));

    let ok: Result<u8, io::Error> = Ok(1);
    assert_eq!(ok.caused(CausedBy::ByExternal).ok(), Some(1));

    let ok: Result<u8, Error> = Ok(2);
    assert_eq!(ok.coded(Code::new(CausedBy::ByInput, 4)).ok(), Some(2));
}

#[test]
fn resolvers_on_absent_values() {
    assert_eq!(get_caused_by(None), CausedBy::NoError);
    assert_eq!(get_panic_caused_by(None), CausedBy::NoError);
    assert_eq!(get_code(None), NOT_ERROR);
    assert_eq!(get_error_code(None), NOT_ERROR);
}

// ============================================================================
// Category fidelity
// ============================================================================

#[test]
fn text_constructors_keep_category_and_text() {
    let cases: Vec<(Error, CausedBy)> = vec![
        (caused_by::new("msg"), CausedBy::ByBug),
        (bug("msg"), CausedBy::ByBug),
        (runtime("msg"), CausedBy::ByRuntime),
        (external("msg"), CausedBy::ByExternal),
        (input("msg"), CausedBy::ByInput),
        (client_bug("msg"), CausedBy::ByClientBug),
        (caused(CausedBy::ByRuntime, "msg"), CausedBy::ByRuntime),
    ];
    for (err, expected) in cases {
        assert_eq!(get_caused_by(Some(&err)), expected);
        assert_eq!(err.to_string(), "msg");
    }
}

#[test]
fn formatted_constructors() {
    assert_eq!(inputf!("foo {}", 3).to_string(), "foo 3");

    let cases: Vec<(Error, CausedBy)> = vec![
        (bugf!("n={}", 1), CausedBy::ByBug),
        (runtimef!("n={}", 1), CausedBy::ByRuntime),
        (externalf!("n={}", 1), CausedBy::ByExternal),
        (inputf!("n={}", 1), CausedBy::ByInput),
        (client_bugf!("n={}", 1), CausedBy::ByClientBug),
        (causedf!(CausedBy::ByExternal, "n={}", 1), CausedBy::ByExternal),
    ];
    for (err, expected) in cases {
        assert_eq!(err.caused_by(), expected);
        assert_eq!(err.to_string(), "n=1");
    }
}

#[test]
fn wrap_constructors_keep_category_and_message() {
    let cases: Vec<(Error, CausedBy)> = vec![
        (new_bug(plain("msg")), CausedBy::ByBug),
        (new_runtime(plain("msg")), CausedBy::ByRuntime),
        (new_external(plain("msg")), CausedBy::ByExternal),
        (new_input(plain("msg")), CausedBy::ByInput),
        (new_client_bug(plain("msg")), CausedBy::ByClientBug),
        (new_caused(CausedBy::ByInput, plain("msg")), CausedBy::ByInput),
    ];
    for (err, expected) in cases {
        assert_eq!(get_caused_by(Some(&err)), expected);
        assert_eq!(err.to_string(), "msg");
        assert_eq!(err.inner().map(|e| e.to_string()).as_deref(), Some("msg"));
    }
}

#[test]
fn adapters_keep_category() {
    let failing = || -> Result<(), io::Error> { Err(plain("msg")) };
    assert_eq!(failing().bug().unwrap_err().caused_by(), CausedBy::ByBug);
    assert_eq!(failing().runtime().unwrap_err().caused_by(), CausedBy::ByRuntime);
    assert_eq!(failing().external().unwrap_err().caused_by(), CausedBy::ByExternal);
    assert_eq!(failing().input().unwrap_err().caused_by(), CausedBy::ByInput);
    assert_eq!(failing().client_bug().unwrap_err().caused_by(), CausedBy::ByClientBug);

    let wrapped = failing().wrap_err(CausedBy::ByRuntime, "while saving").unwrap_err();
    assert_eq!(wrapped.to_string(), "while saving");
    assert_eq!(wrapped.caused_by(), CausedBy::ByRuntime);
}

#[test]
fn wrap_overrides_message() {
    let inner = plain("foo");
    let err = wrap(CausedBy::ByBug, inner, "bar");
    assert_eq!(err.to_string(), "bar");
    assert_eq!(err.inner().map(|e| e.to_string()).as_deref(), Some("foo"));

    let err = wrapf!(CausedBy::ByBug, plain("foo"), "foo {}", "bar");
    assert_eq!(err.to_string(), "foo bar");
}

#[test]
fn wrap_any_value() {
    let err = wrap(CausedBy::ByBug, "foo", "bar");
    assert_eq!(err.to_string(), "bar");
    assert_eq!(err.inner().map(|e| e.to_string()).as_deref(), Some("foo"));

    let payload: Box<dyn Any + Send> = Box::new(17u16);
    let err = wrap_panic(CausedBy::ByRuntime, payload, "worker died");
    assert_eq!(err.caused_by(), CausedBy::ByRuntime);
    assert_eq!(err.inner().map(|e| e.to_string()).as_deref(), Some("17"));

    let payload: Box<dyn Any + Send> = Box::new(std::time::Duration::from_secs(1));
    let err = wrap_panic(CausedBy::ByRuntime, payload, "worker died");
    assert_eq!(err.inner().map(|e| e.to_string()).as_deref(), Some("Box<dyn Any>"));
}

// ============================================================================
// Rewrap consistency (always-nest)
// ============================================================================

#[test]
fn same_cause_rewrap_nests_and_keeps_code() {
    let code = Code::new(CausedBy::ByExternal, 0x42);
    let first = coded(code, "gateway timeout");
    let first_line = first.location().line();

    let second = new_external(first);
    assert_eq!(second.code(), code);
    assert_eq!(second.to_string(), "gateway timeout");
    assert_ne!(second.location().line(), first_line);

    let inner = second.inner().expect("always-nest keeps the previous error");
    assert_eq!(get_error_code(Some(inner)), code);
}

#[test]
fn same_cause_rewrap_for_every_constructor() {
    let rewraps: Vec<(CausedBy, fn(Error) -> Error)> = vec![
        (CausedBy::ByBug, new_bug::<Error>),
        (CausedBy::ByRuntime, new_runtime::<Error>),
        (CausedBy::ByExternal, new_external::<Error>),
        (CausedBy::ByInput, new_input::<Error>),
        (CausedBy::ByClientBug, new_client_bug::<Error>),
    ];
    for (cause, rewrap) in rewraps {
        let code = Code::new(cause, 7);
        let err = rewrap(coded(code, "x"));
        assert_eq!(err.code(), code, "{cause}");
        assert!(err.inner().is_some(), "{cause}");

        let err = new_caused(cause, coded(code, "x"));
        assert_eq!(err.code(), code);

        let err = wrap(cause, coded(code, "x"), "y");
        assert_eq!(err.code(), code);
    }
}

#[test]
fn different_cause_rewrap_takes_new_category() {
    for from in CausedBy::ERRORS {
        for to in CausedBy::ERRORS {
            if from == to {
                continue;
            }
            let err = new_caused(to, coded(Code::new(from, 9), "text survives"));
            assert_eq!(err.caused_by(), to);
            assert_eq!(err.code(), Code::general(to));
            assert_eq!(err.to_string(), "text survives");
            assert!(err.inner().is_some());
        }
    }
}

#[test]
fn no_error_never_reaches_a_constructed_error() {
    assert!(Code::from_raw(0x0600_0001).is_err());
    assert!(Code::from_raw(0x0600_0000).is_err());

    let coded_result = std::panic::catch_unwind(|| {
        let _ = coded(NOT_ERROR, "real failure");
    });
    assert!(coded_result.is_err());

    let wrapped_result = std::panic::catch_unwind(|| {
        let _ = new_coded(NOT_ERROR, plain("real failure"));
    });
    assert!(wrapped_result.is_err());
}

#[test]
fn new_coded_always_overrides() {
    let code = Code::new(CausedBy::ByClientBug, 3);
    let err = new_coded(code, input("bad"));
    assert_eq!(err.code(), code);
}

// ============================================================================
// Unclassified default
// ============================================================================

#[test]
fn unclassified_values_are_bugs() {
    assert_eq!(get_caused_by(Some(&plain("x"))), CausedBy::ByBug);
    assert_eq!(get_panic_caused_by(Some(&42u8)), CausedBy::ByBug);
    assert_eq!(get_code(Some(&"text")), GENERAL_BY_BUG);
    assert_eq!(get_error_code(Some(&plain("x"))), GENERAL_BY_BUG);
}

#[test]
fn caught_panic_payloads_resolve() {
    let payload = std::panic::catch_unwind(|| {
        std::panic::panic_any(input("typed"));
    })
    .expect_err("closure panics");
    assert_eq!(get_panic_caused_by(Some(&*payload)), CausedBy::ByInput);

    let payload = std::panic::catch_unwind(|| {
        panic!("text");
    })
    .expect_err("closure panics");
    assert_eq!(get_panic_caused_by(Some(&*payload)), CausedBy::ByBug);
}

// ============================================================================
// Stack capture
// ============================================================================

#[test]
fn stack_starts_at_the_call_site() {
    let line = line!() + 1;
    let err = bug("here");
    assert_eq!(err.location().line(), line);
    assert!(err.location().file().ends_with("errors.rs"));

    let frames = err.stack_frames();
    assert!(frames.iter().all(|f| !f.function.starts_with("caused_by::")));

    let stack = err.stack();
    let first_line = stack.lines().next().unwrap_or_default();
    assert!(first_line.contains("errors.rs"), "first line: {first_line}");

    let rendered = err.error_stack();
    assert!(rendered.starts_with("here\n"));
    assert!(rendered.contains("errors.rs"));
    assert!(!rendered.contains("convenience.rs"));
    assert!(!rendered.contains(concat!(env!("CARGO_MANIFEST_DIR"), "/src/stack.rs")));
}

#[test]
fn adapter_stack_starts_at_the_call_site() {
    let result: Result<(), io::Error> = Err(plain("io"));
    let line = line!() + 1;
    let err = result.runtime().unwrap_err();
    assert_eq!(err.location().line(), line);

    let frames = err.stack_frames();
    assert!(frames.iter().all(|f| !f.function.contains("caused_by::convenience")));
    assert!(!err.stack().contains("convenience.rs"));
}

#[test]
fn stack_depth_is_bounded() {
    fn nest(depth: usize) -> Error {
        if depth == 0 {
            return bug("deep");
        }
        let err = nest(depth - 1);
        std::hint::black_box(err)
    }

    let err = nest(120);
    assert!(err.stack_frames().len() <= caused_by::stack::MAX_STACK_DEPTH);
}

// ============================================================================
// Log rendering
// ============================================================================

#[test]
fn for_log_walks_the_chain() {
    let a = bug("foo");
    let b = wrap(CausedBy::ByBug, a, "bar");
    let c = wrap(CausedBy::ByBug, b, "blah");

    let rendered = for_log_error(&c);
    let blah = rendered.find("blah").expect("outer message");
    let bar = rendered.find("bar").expect("middle message");
    let foo = rendered.find("foo").expect("inner message");
    assert!(blah < bar && bar < foo);

    assert_eq!(rendered.matches(INNER_SEPARATOR).count(), 2);
    let first_sep = rendered.find(INNER_SEPARATOR).expect("separator");
    assert!(blah < first_sep && first_sep < bar);

    assert!(rendered.matches("errors.rs").count() >= 3);
}

#[test]
fn error_stack_covers_one_level_only() {
    let c = wrap(CausedBy::ByRuntime, bug("foo"), "bar");
    let own = c.error_stack();
    assert!(own.starts_with("bar\n"));
    assert!(!own.contains(INNER_SEPARATOR));
}

#[test]
fn for_log_plain_and_classified() {
    assert!(for_log_error(&bug("foo")).starts_with("foo\n"));
    assert_eq!(for_log_error(&plain("foo")), "foo");
    assert!(caused_by::for_log_panic(&1i32).starts_with("1\n"));
    assert!(caused_by::for_log_panic(&()).starts_with("Box<dyn Any>\n"));
    assert!(caused_by::for_log_panic(&"text").starts_with("text\n"));
}

#[test]
fn std_source_chain_matches_inner() {
    let err = new_runtime(wrap(CausedBy::ByExternal, plain("root"), "middle"));
    let mut messages = Vec::new();
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(&err);
    while let Some(e) = current {
        messages.push(e.to_string());
        current = e.source();
    }
    assert_eq!(messages, vec!["middle", "middle", "root"]);
}

use caused_by::{
    bug, external, guard, handle, report, set_handler, CausedBy, Context, Recorder, Recovered,
};
use std::sync::Arc;

fn import_row(row: &str) -> caused_by::Result<u32> {
    match row {
        "" => Err(bug("empty row reached the importer")),
        "remote" => Err(external("catalog service unavailable")),
        "crash" => panic!("row parser invariant broken"),
        other => Ok(other.len() as u32),
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    // Keep the last reports around and forward internal ones.
    let recorder = Recorder::new(32, 4096);
    let record = recorder.handler();
    set_handler(Some(Arc::new(move |ctx: &Context, value: &Recovered| {
        if value.caused_by().is_internal() {
            eprintln!("[page on-call] {} ({})", value, value.code());
        }
        record(ctx, value);
    })));

    let ctx = Context::background().with_value("job", "catalog-import");
    for row in ["abc", "", "remote", "crash"] {
        let ctx = ctx.with_value("row", row.to_string());
        match guard(Some(&ctx), || import_row(row)) {
            Some(n) => println!("imported {row:?}: {n}"),
            None => println!("row {row:?} reported"),
        }
    }

    report(None, Err::<(), _>(std::io::Error::other("flush on shutdown failed")));
    handle(None, &Recovered::panic(Box::new(42u8)));

    println!("\nRecorded reports, newest first:");
    for r in recorder.all() {
        println!(
            "  {} {} panic={} {:?}",
            r.caused_by, r.code, r.panic, &*r.message
        );
    }

    let bugs = recorder.filtered(|r| r.caused_by == CausedBy::ByBug).len();
    println!("\n{bugs} of {} reports need a developer", recorder.len());
}

use caused_by::{
    define_codes, for_log_error, get_caused_by, input, wrap, CausedBy, Result, ResultExt,
};
use std::fs;

define_codes! {
    CausedBy::ByInput => {
        /// Port number could not be parsed.
        BAD_PORT = 0x01,
    }
}

fn parse_port(raw: &str) -> Result<u16> {
    raw.trim()
        .parse()
        .map_err(|_| caused_by::coded(BAD_PORT, format!("not a port: {raw:?}")))
}

fn load_configuration(path: &str) -> Result<u16> {
    // A missing file is an operations problem, not a bug.
    let text = fs::read_to_string(path).runtime()?;
    parse_port(&text)
}

fn main() {
    tracing_subscriber::fmt::init();

    println!("--- Basic Usage Example ---\n");

    let err = parse_port("http").unwrap_err();
    println!("1. Bad input");
    println!("   message:   {}", err);
    println!("   caused by: {}", err.caused_by());
    println!("   code:      {}", err.code());

    let err = load_configuration("/definitely/missing.toml").unwrap_err();
    println!("\n2. Missing file");
    println!("   caused by: {}", get_caused_by(Some(&err)));

    let err = wrap(CausedBy::ByExternal, input("quota header missing"), "billing call failed");
    println!("\n3. Full log rendering of a wrapped error:\n");
    println!("{}", for_log_error(&err));
}

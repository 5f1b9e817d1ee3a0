use anyhow::Result;
use argh::FromArgs;
use minish::{Interpreter, Options, sig};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(FromArgs)]
/// A small interactive Unix shell with pipes, redirection and job control.
struct Args {
    /// after a variable builtin runs, also dispatch the line to ordinary
    /// execution (historical double-dispatch behavior)
    #[argh(switch)]
    var_exec_fallthrough: bool,
}

fn main() -> Result<()> {
    let args: Args = argh::from_env();

    // Diagnostics only; respects RUST_LOG.
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    sig::install_sigchld_handler()?;

    let mut interpreter = Interpreter::new(Options {
        var_exec_fallthrough: args.var_exec_fallthrough,
    });
    interpreter.repl()
}

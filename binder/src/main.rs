use std::path::PathBuf;
use std::time::Instant;

use tracing_subscriber::EnvFilter;

mod doc;
mod site;

xflags::xflags! {
    /// Builds sites and documents from a content directory.
    cmd binder {
        /// Log at debug level, overriding RUST_LOG.
        optional -v, --verbose

        /// Parses every file in <input> and writes the results to <output>.
        cmd site {
            required input: PathBuf
            required output: PathBuf
        }

        /// Assembles the root document of <dir> and its includes.
        cmd doc {
            required dir: PathBuf
            /// The document to start from, relative to <dir>.
            optional -r, --root root: String
            /// `html` (the default), `markdown`, or any converter format.
            optional -f, --format format: String
            /// Where to write the document instead of stdout.
            optional -o, --output output: PathBuf
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = match verbose {
        true => EnvFilter::new("debug"),
        false => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn main() {
    let flags = Binder::from_env_or_exit();
    init_logging(flags.verbose);

    let start = Instant::now();
    let result = match flags.subcommand {
        BinderCmd::Site(site) => site::run(&site.input, &site.output, flags.verbose),
        BinderCmd::Doc(doc) => doc::run(&doc.dir, doc.root.as_deref(), doc.format.as_deref(), doc.output.as_deref()),
    };

    match result {
        Ok(()) => tracing::info!("done in {}ms", start.elapsed().as_millis()),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}

use std::path::Path;

use quire::config::Config;
use quire::document::{DocumentBuilder, Target};
use quire::error::Result;
use quire::store::read_dir;
use quire::value::Sink;

pub fn run(dir: &Path, root: Option<&str>, format: Option<&str>, output: Option<&Path>) -> Result<()> {
    let config = Config::discover(dir)?;
    let tree = read_dir(dir)?;
    let target = Target::from_format(format.unwrap_or("html"));

    let document = DocumentBuilder::new(config).build_document(&tree, root.unwrap_or(""), &target)?;
    match output {
        Some(path) => path.write_bytes(document.as_bytes()),
        None => {
            print!("{document}");
            Ok(())
        }
    }
}

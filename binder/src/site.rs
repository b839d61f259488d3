use std::path::{Path, PathBuf};
use std::sync::Arc;

use quire::config::Config;
use quire::content::{Html, Image, Pipeline};
use quire::error;
use quire::error::{Chainable, Result};
use quire::rayon::prelude::*;
use quire::store::{read_dir, Binary, Item, Meta, Name};
use quire::value::Sink;

/// Reads `input`, parses every item and writes each result below `output`.
pub fn run(input: &Path, output: &Path, verbose: bool) -> Result<()> {
    let config = Config::discover(input)?;
    let tree = read_dir(input)?;
    let typed = Pipeline::with_defaults(config).run(&tree)?;

    let items = typed.iter().collect::<Vec<_>>();
    let written = items.par_iter()
        .map(|(name, item)| write(output, name, item))
        .collect::<Result<Vec<bool>>>()?;

    let skipped = written.iter().filter(|&&written| !written).count();
    tracing::info!(items = written.len() - skipped, skipped, "wrote site to {}", output.display());
    if verbose {
        typed.visualize();
    }

    Ok(())
}

/// Where the artifact for `name` goes: its tokens as path components, with
/// `extension` added if the final token doesn't already end in it.
fn artifact_path(output: &Path, name: &Name, extension: &str) -> PathBuf {
    let mut path = item_path(output, name);
    if path.extension().map_or(true, |ext| ext != extension) {
        let mut file_name = path.file_name().unwrap_or_default().to_os_string();
        file_name.push(".");
        file_name.push(extension);
        path.set_file_name(file_name);
    }

    path
}

fn item_path(output: &Path, name: &Name) -> PathBuf {
    let mut path = output.to_path_buf();
    for token in name.tokens() {
        match token.index() {
            Some(i) => path.push(format!("{}-{i}", token.body())),
            None => path.push(token.body()),
        }
    }

    path
}

/// Writes one item. Returns `false` if the item's type has no artifact.
fn write(output: &Path, name: &Name, item: &Arc<Item>) -> Result<bool> {
    let data = item.data().chain_with(|| error!("failed to compute item", "name" => name))?;

    if let Some(html) = data.downcast_ref::<Html>() {
        artifact_path(output, name, "html").write_bytes(html.0.as_bytes())?;
    } else if let Some(meta) = data.downcast_ref::<Meta>() {
        artifact_path(output, name, "json").write(meta.clone())?;
    } else if let Some(image) = data.downcast_ref::<Image>() {
        let ext = image.format.extensions_str().first().copied().unwrap_or("img");
        artifact_path(output, name, ext).write_bytes(&image.bytes)?;
    } else if let Some(bytes) = data.downcast_ref::<Binary>() {
        item_path(output, name).write_bytes(bytes)?;
    } else {
        tracing::warn!(%name, ty = data.tag().name(), "no artifact for item type");
        return Ok(false);
    }

    Ok(true)
}

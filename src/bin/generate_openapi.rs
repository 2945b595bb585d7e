//! Dumps the IAQ backend's OpenAPI document for client generation.
//!
//! `generate_openapi` prints to stdout; `generate_openapi --output api.json`
//! writes the file instead.

use std::{fs, io::Write, path::PathBuf};

use anyhow::{bail, Context, Result};
use iaq_service::api::handlers::ApiDoc;
use utoipa::OpenApi;

fn output_path() -> Result<Option<PathBuf>> {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        None => Ok(None),
        Some("--output") => args
            .next()
            .map(|p| Some(PathBuf::from(p)))
            .context("--output needs a path"),
        Some(other) => bail!("unexpected argument `{other}`"),
    }
}

fn main() -> Result<()> {
    let document = ApiDoc::openapi()
        .to_pretty_json()
        .context("serialising the IAQ API document")?;

    match output_path()? {
        Some(path) => {
            fs::write(&path, &document)
                .with_context(|| format!("writing {}", path.display()))?;
            eprintln!("IAQ API document written to {}", path.display());
        }
        None => std::io::stdout()
            .lock()
            .write_all(document.as_bytes())
            .context("writing the IAQ API document to stdout")?,
    }
    Ok(())
}

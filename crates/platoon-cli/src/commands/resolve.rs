//! Handler for `platoon resolve`.

use std::path::{Path, PathBuf};

use miette::Result;

use platoon_ops::ops_resolve::{self, OutputFormat, ResolveOptions};
use platoon_util::errors::PlatoonError;

pub async fn exec(
    request: &Path,
    catalogs: Vec<PathBuf>,
    format: &str,
    depth: Option<u32>,
    why: Option<String>,
    inverted: Option<String>,
    conflicts: bool,
) -> Result<()> {
    if !request.is_file() {
        return Err(PlatoonError::Request {
            message: format!("No request file at {}", request.display()),
        }
        .into());
    }

    let opts = ResolveOptions {
        catalogs,
        format: format.parse::<OutputFormat>()?,
        depth: depth.map(|d| d as usize),
        why,
        inverted,
        conflicts,
    };

    ops_resolve::resolve(request, &opts).await
}

//! Command dispatch and handler modules.

mod resolve;

use miette::Result;

use crate::cli::{Cli, Command};

/// Route a parsed CLI invocation to the appropriate command handler.
pub async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Resolve {
            request,
            catalogs,
            format,
            depth,
            why,
            inverted,
            conflicts,
        } => {
            resolve::exec(
                &request,
                catalogs,
                &format,
                depth,
                why,
                inverted,
                conflicts,
            )
            .await
        }
    }
}

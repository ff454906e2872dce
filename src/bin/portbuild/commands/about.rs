//! `portbuild about` command

use anyhow::Result;

use portbuild::ops::{self, AboutEntry};
use portbuild::GlobalContext;

use crate::cli::AboutArgs;

pub fn execute(args: AboutArgs, gctx: &GlobalContext) -> Result<()> {
    let source = gctx.source()?;

    for entry in ops::about(source.as_ref(), &args.ports)? {
        match entry {
            AboutEntry::Found(meta) => println!("{}", ops::format_about(&meta)),
            AboutEntry::Missing(message) => println!("{}", message),
        }
    }
    Ok(())
}

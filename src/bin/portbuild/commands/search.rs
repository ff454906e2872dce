//! `portbuild search` command

use anyhow::Result;

use portbuild::ops;
use portbuild::GlobalContext;

use crate::cli::SearchArgs;

pub fn execute(args: SearchArgs, gctx: &GlobalContext) -> Result<()> {
    let source = gctx.source()?;
    let found = ops::search_ports(source.as_ref(), &args.pattern)?;

    if found.is_empty() {
        gctx.shell()
            .note(format!("no ports matching '{}'", args.pattern));
    }
    for port in found {
        println!("{}", port);
    }
    Ok(())
}

//! `portbuild list` command

use anyhow::Result;

use portbuild::ops;
use portbuild::GlobalContext;

pub fn execute(gctx: &GlobalContext) -> Result<()> {
    let source = gctx.source()?;
    for port in ops::list_ports(source.as_ref())? {
        println!("{}", port);
    }
    Ok(())
}

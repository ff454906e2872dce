//! `portbuild get` command

use anyhow::Result;

use portbuild::ops;
use portbuild::GlobalContext;

pub fn execute(gctx: &GlobalContext) -> Result<()> {
    ops::get_tree(&gctx.local_tree(), gctx.shell())
}

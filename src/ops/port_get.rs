//! Implementation of `portbuild get`.

use anyhow::Result;

use crate::sources::{LocalTree, PortSource};
use crate::util::shell::{Shell, Status};

/// Clone the ports tree, or bring an existing checkout up to date.
pub fn get_tree(tree: &LocalTree, shell: &Shell) -> Result<()> {
    let root = tree.root().display();
    if tree.root().join(".git").exists() {
        shell.status(Status::Fetching, format!("updates for the ports tree at {}", root));
    } else {
        shell.status(Status::Fetching, format!("the ports tree into {}", root));
    }

    tree.update()?;
    shell.status(Status::Updated, format!("ports tree at {}", root));
    Ok(())
}

//! `portbuild build` command

use anyhow::Result;

use portbuild::core::PortSpec;
use portbuild::ops::{self, BuildOptions, BuildOutcome};
use portbuild::recipe::{StageContext, TerminalPrompter};
use portbuild::GlobalContext;

use crate::cli::BuildArgs;

pub fn execute(args: BuildArgs, gctx: &GlobalContext) -> Result<()> {
    let spec: PortSpec = args.port.parse()?;

    let source = gctx.source()?;
    let downloader = gctx.downloader()?;
    let installer = gctx.installer();
    let prompter = TerminalPrompter;

    let mut options = gctx.recipe_options();
    options.force = args.force;
    options.assume_yes = args.yes;
    options.destdir = args.destdir;

    let ctx = StageContext {
        shell: gctx.shell(),
        downloader: &downloader,
        prompter: &prompter,
        installer: &installer,
        options: &options,
    };

    let opts = BuildOptions {
        skip_patch: args.no_patch,
        skip_build: args.no_build,
        test: args.test,
        install: args.install,
        clean: args.clean,
    };

    match ops::build(source.as_ref(), &spec, &ctx, &opts)? {
        BuildOutcome::Built(recipe) => {
            tracing::debug!(
                "completed stages: {:?}",
                recipe.flags().completed()
            );
        }
        BuildOutcome::Options(choices) => {
            println!("available options:");
            for choice in choices {
                println!(" * {}", choice);
            }
        }
    }
    Ok(())
}

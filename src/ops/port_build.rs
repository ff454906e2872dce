//! Implementation of `portbuild build`.

use anyhow::Result;

use crate::core::PortSpec;
use crate::ops::port_options::list_options;
use crate::recipe::{Recipe, StageContext};
use crate::sources::PortSource;
use crate::util::shell::Status;

/// Which optional stages to run.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Stop after unpacking (and patching).
    pub skip_patch: bool,

    /// Do not run the build script.
    pub skip_build: bool,

    /// Run the test script after building.
    pub test: bool,

    /// Run the install script after building.
    pub install: bool,

    /// Remove the build directory before starting.
    pub clean: bool,
}

/// Result of a build request.
#[derive(Debug)]
pub enum BuildOutcome {
    /// The pipeline ran for this recipe.
    Built(Recipe),
    /// The argument was incomplete; these are the ways to complete it.
    Options(Vec<String>),
}

/// Resolve `spec` and run the pipeline, or list options when `spec` does
/// not name a full `port-version-revision`.
pub fn build(
    source: &dyn PortSource,
    spec: &PortSpec,
    ctx: &StageContext<'_>,
    opts: &BuildOptions,
) -> Result<BuildOutcome> {
    let Some(id) = spec.recipe_id() else {
        return Ok(BuildOutcome::Options(list_options(source, spec)?));
    };

    tracing::debug!("resolving {} from {}", id, source.name());
    let mut recipe = source.recipe(&id)?;
    run_pipeline(&mut recipe, ctx, opts)?;
    Ok(BuildOutcome::Built(recipe))
}

/// Drive a resolved recipe through its stages in order.
pub fn run_pipeline(recipe: &mut Recipe, ctx: &StageContext<'_>, opts: &BuildOptions) -> Result<()> {
    if opts.clean {
        recipe.clean_build_directory(ctx.shell)?;
    }

    recipe.message(ctx)?;
    recipe.download(ctx)?;
    recipe.checksum(ctx)?;
    recipe.unpack(ctx)?;

    if !opts.skip_patch {
        recipe.patch(ctx)?;
    }
    if !opts.skip_build {
        recipe.build(ctx)?;
    }
    if opts.test {
        recipe.test(ctx)?;
    }
    if opts.install {
        recipe.install(ctx)?;
    }

    ctx.shell.status(
        Status::Finished,
        format!("{} in {}", recipe.id(), recipe.build_dir().display()),
    );
    Ok(())
}

//! Android (switchroot LineageOS) builds.
//!
//! These never touch the rootfs pipeline: the whole ROM build runs inside a
//! prebuilt container with the host output directory mounted.

use anyhow::Context;
use std::fs;

use crate::error::{BuildError, Result};
use crate::host::{ContainerRun, Host};
use crate::resolve::ContainerBuild;

/// Mount point of the host output directory inside the build container.
pub const CONTAINER_OUTPUT_DIR: &str = "/root/android";

/// Describe the container invocation for `build`.
pub fn container_run(build: &ContainerBuild) -> ContainerRun {
    ContainerRun {
        image: build.image.clone(),
        argv: Vec::new(),
        env: build.env(),
        volumes: vec![(build.host_dir.clone(), CONTAINER_OUTPUT_DIR.to_string())],
        use_cache: build.use_cache,
    }
}

/// Prepare the host directory and run the container build to completion.
pub fn run_container_build(host: &dyn Host, build: &ContainerBuild) -> Result<()> {
    fs::create_dir_all(&build.host_dir)
        .with_context(|| format!("Failed to create {}", build.host_dir.display()))
        .map_err(BuildError::staging)?;

    tracing::info!(
        rom = %build.rom_name,
        image = %build.image,
        output = %build.host_dir.display(),
        "starting Android container build"
    );
    host.run_container(&container_run(build))
        .map_err(|e| BuildError::Container(format!("{:#}", e)))
}

//! Real host implementation: HTTP via reqwest, everything else via host tools.

use anyhow::{bail, Context, Result};
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

use super::{ContainerRun, Host};
use crate::fetch::file_name_from_url;
use crate::process::{self, Cmd};

/// Headroom added on top of the measured tree size when sizing an image.
const IMAGE_SLACK_BYTES: u64 = 512 * 1024 * 1024;

const BINFMT_MISC: &str = "/proc/sys/fs/binfmt_misc";

/// Host backed by the running system.
pub struct SystemHost {
    client: reqwest::blocking::Client,
}

impl SystemHost {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("jet-factory/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(30))
            .timeout(None)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }

    fn container_runtime() -> Result<&'static str> {
        ["docker", "podman"]
            .into_iter()
            .find(|rt| process::exists(rt))
            .context("Neither docker nor podman found in PATH")
    }
}

impl Host for SystemHost {
    fn fetch_body(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("HTTP request failed: {}", url))?;
        let status = response.status();
        if !status.is_success() {
            bail!("HTTP {} for {}", status.as_u16(), url);
        }
        response
            .text()
            .with_context(|| format!("Failed to read body of {}", url))
    }

    fn download_to_file(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
        let name = file_name_from_url(url)
            .with_context(|| format!("URL has no file name: {}", url))?;
        fs::create_dir_all(dest_dir)
            .with_context(|| format!("Failed to create {}", dest_dir.display()))?;

        let dest = dest_dir.join(&name);
        let partial = dest_dir.join(format!("{}.part", name));

        let mut response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("HTTP request failed: {}", url))?;
        let status = response.status();
        if !status.is_success() {
            bail!(
                "HTTP {} for {}: {}",
                status.as_u16(),
                url,
                status.canonical_reason().unwrap_or("Unknown error")
            );
        }

        let file = fs::File::create(&partial)
            .with_context(|| format!("Failed to create {}", partial.display()))?;
        let mut writer = BufWriter::new(file);
        let bytes = response
            .copy_to(&mut writer)
            .with_context(|| format!("Failed to stream {}", url))?;
        drop(writer);

        fs::rename(&partial, &dest)
            .with_context(|| format!("Failed to move download into {}", dest.display()))?;
        tracing::info!(url, bytes, dest = %dest.display(), "downloaded");
        Ok(dest)
    }

    fn extract_archive(&self, archive: &Path, dest_dir: &Path) -> Result<()> {
        let name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        fs::create_dir_all(dest_dir)?;

        let tar_suffixes = [".tar", ".tar.gz", ".tgz", ".tar.xz", ".tar.zst", ".tar.bz2"];
        if tar_suffixes.iter().any(|s| name.ends_with(s)) {
            Cmd::new("tar")
                .args(["--numeric-owner", "-xpf"])
                .arg_path(archive)
                .arg("-C")
                .arg_path(dest_dir)
                .error_msg(format!("tar failed to extract {}", name))
                .run()?;
        } else if name.ends_with(".zip") {
            Cmd::new("unzip")
                .args(["-o", "-q"])
                .arg_path(archive)
                .arg("-d")
                .arg_path(dest_dir)
                .error_msg(format!("unzip failed to extract {}", name))
                .run()?;
        } else if name.ends_with(".7z") {
            Cmd::new("7z")
                .args(["x", "-y"])
                .arg_path(archive)
                .arg(format!("-o{}", dest_dir.display()))
                .error_msg("7z extraction failed. Install: p7zip")
                .run()?;
        } else if let Some(stem) = name.strip_suffix(".xz") {
            // unxz writes next to the input; keep the compressed file for reuse
            Cmd::new("unxz")
                .args(["-k", "-f"])
                .arg_path(archive)
                .error_msg(format!("unxz failed on {}", name))
                .run()?;
            let produced = archive.with_file_name(stem);
            let target = dest_dir.join(stem);
            if produced != target {
                fs::rename(&produced, &target)
                    .with_context(|| format!("Failed to move {}", produced.display()))?;
            }
        } else {
            bail!("Don't know how to extract {}", archive.display());
        }
        Ok(())
    }

    fn archive_directories(&self, paths: &[PathBuf], output: &Path) -> Result<()> {
        if output.exists() {
            fs::remove_file(output)?;
        }
        let mut cmd = Cmd::new("7z").args(["a", "-y"]).arg_path(output);
        for path in paths {
            cmd = cmd.arg_path(path);
        }
        cmd.error_msg("7z archive creation failed. Install: p7zip")
            .run()?;
        Ok(())
    }

    fn convert_compressed_image_to_raw(&self, image: &Path, dest_dir: &Path) -> Result<PathBuf> {
        let loop_dev = LoopDevice::attach(image)?;
        let source = loop_dev.root_partition()?;

        let mountpoint = dest_dir.with_extension("mnt");
        let mount = Mount::new(&source, &mountpoint)?;

        Cmd::new("cp")
            .arg("-a")
            .arg(format!("{}/.", mount.target.display()))
            .arg_path(dest_dir)
            .error_msg("Failed to copy image contents")
            .run()?;

        drop(mount);
        drop(loop_dev);
        Ok(dest_dir.to_path_buf())
    }

    fn run_in_chroot(&self, root: &Path, argv: &[String]) -> Result<()> {
        Cmd::new("arch-chroot")
            .arg_path(root)
            .args(argv)
            .error_msg(format!("chroot command `{}` failed", argv.join(" ")))
            .run_interactive()?;
        Ok(())
    }

    fn run_container(&self, run: &ContainerRun) -> Result<()> {
        let runtime = Self::container_runtime()?;
        let mut cmd = Cmd::new(runtime).args(["run", "--rm", "--privileged"]);
        if !run.use_cache {
            cmd = cmd.arg("--pull=always");
        }
        for env in &run.env {
            cmd = cmd.arg("-e").arg(env);
        }
        for (host_dir, target) in &run.volumes {
            cmd = cmd
                .arg("-v")
                .arg(format!("{}:{}", host_dir.display(), target));
        }
        cmd.arg(&run.image)
            .args(&run.argv)
            .error_msg(format!("{} run of {} failed", runtime, run.image))
            .run_interactive()?;
        Ok(())
    }

    fn enable_foreign_arch_support(&self) -> Result<()> {
        if !Path::new(BINFMT_MISC).join("register").exists() {
            Cmd::new("mount")
                .args(["-t", "binfmt_misc", "binfmt_misc", BINFMT_MISC])
                .error_msg("Failed to mount binfmt_misc")
                .run()?;
        }
        if process::exists("update-binfmts") {
            Cmd::new("update-binfmts")
                .arg("--enable")
                .error_msg("update-binfmts --enable failed")
                .run()?;
        } else {
            tracing::warn!("update-binfmts not found, relying on already registered handlers");
        }
        Ok(())
    }

    fn enter_chroot_prep(&self, root: &Path) -> Result<()> {
        for dir in ["dev", "proc", "sys", "run", "tmp", "etc"] {
            fs::create_dir_all(root.join(dir))?;
        }
        let resolv = root.join("etc/resolv.conf");
        if resolv.symlink_metadata().is_ok() {
            fs::remove_file(&resolv)
                .with_context(|| format!("Failed to remove {}", resolv.display()))?;
        }
        fs::copy("/etc/resolv.conf", &resolv).context("Failed to copy host resolv.conf")?;
        Ok(())
    }

    fn create_disk_image(
        &self,
        src_dir: &Path,
        dest_dir: &Path,
        name: &str,
        fs_type: &str,
    ) -> Result<PathBuf> {
        let file_name = format!("{}.img", name);
        let target = dest_dir.join(&file_name);
        // Built outside src_dir so mkfs does not pack the image into itself
        let partial = src_dir.with_file_name(format!("{}.partial", file_name));

        let size = tree_size(src_dir, &target);
        let size = size + size / 4 + IMAGE_SLACK_BYTES;
        {
            let file = fs::File::create(&partial)
                .with_context(|| format!("Failed to create {}", partial.display()))?;
            file.set_len(size)?;
        }

        Cmd::new(format!("mkfs.{}", fs_type))
            .args(["-q", "-L", name, "-d"])
            .arg_path(src_dir)
            .arg_path(&partial)
            .error_msg(format!("mkfs.{} -d failed", fs_type))
            .run()?;

        fs::rename(&partial, &target)
            .with_context(|| format!("Failed to move image to {}", target.display()))?;
        Ok(target)
    }

    fn materialize_image_to_disk(&self, image: &Path, dest_dir: &Path) -> Result<PathBuf> {
        // e2fsck exits 1 when it corrected something, which is fine here
        let check = Cmd::new("e2fsck").arg("-fy").arg_path(image).allow_fail().run()?;
        if check.code() > 1 {
            bail!(
                "e2fsck found unrecoverable errors in {} (exit code {})",
                image.display(),
                check.code()
            );
        }
        Cmd::new("resize2fs")
            .arg("-M")
            .arg_path(image)
            .error_msg("resize2fs -M failed")
            .run()?;

        let file_name = image.file_name().context("image path has no file name")?;
        let target = dest_dir.join(file_name);
        if target != image {
            fs::rename(image, &target)
                .with_context(|| format!("Failed to move image to {}", target.display()))?;
        }
        Ok(target)
    }
}

/// Total size of regular files under `dir`, ignoring `exclude`.
fn tree_size(dir: &Path, exclude: &Path) -> u64 {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.path() != exclude)
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// Read-only loop device, detached on drop.
struct LoopDevice {
    device: String,
}

impl LoopDevice {
    fn attach(image: &Path) -> Result<Self> {
        let result = Cmd::new("losetup")
            .args(["--find", "--show", "--partscan", "--read-only"])
            .arg_path(image)
            .error_msg("losetup failed")
            .run()?;
        Ok(Self {
            device: result.stdout_trimmed().to_string(),
        })
    }

    /// Last partition of the device (the root filesystem on the images we
    /// consume), or the device itself when it is unpartitioned.
    fn root_partition(&self) -> Result<String> {
        let base = Path::new(&self.device)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .context("bad loop device path")?;
        let prefix = format!("{}p", base);

        let mut partitions: Vec<(u32, String)> = fs::read_dir("/dev")?
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                let index = name.strip_prefix(&prefix)?.parse().ok()?;
                Some((index, format!("/dev/{}", name)))
            })
            .collect();
        partitions.sort();

        Ok(partitions
            .pop()
            .map(|(_, dev)| dev)
            .unwrap_or_else(|| self.device.clone()))
    }
}

impl Drop for LoopDevice {
    fn drop(&mut self) {
        if let Err(e) = Cmd::new("losetup").arg("-d").arg(&self.device).run() {
            tracing::warn!(device = %self.device, "failed to detach loop device: {:#}", e);
        }
    }
}

/// Read-only mount, unmounted (and its mountpoint removed) on drop.
struct Mount {
    target: PathBuf,
}

impl Mount {
    fn new(source: &str, target: &Path) -> Result<Self> {
        fs::create_dir_all(target)?;
        Cmd::new("mount")
            .args(["-o", "ro", source])
            .arg_path(target)
            .error_msg(format!("Failed to mount {}", source))
            .run()?;
        Ok(Self {
            target: target.to_path_buf(),
        })
    }
}

impl Drop for Mount {
    fn drop(&mut self) {
        match Cmd::new("umount").arg_path(&self.target).run() {
            Ok(_) => {
                let _ = fs::remove_dir(&self.target);
            }
            Err(e) => {
                tracing::warn!(mountpoint = %self.target.display(), "failed to unmount: {:#}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_size_excludes_target() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a"), vec![0u8; 100]).unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/b"), vec![0u8; 50]).unwrap();
        fs::write(dir.path().join("arch.img"), vec![0u8; 1000]).unwrap();

        assert_eq!(tree_size(dir.path(), &dir.path().join("arch.img")), 150);
    }

    #[test]
    fn test_extract_unknown_format() {
        let host = SystemHost::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("image.qcow2");
        fs::write(&archive, b"").unwrap();
        assert!(host.extract_archive(&archive, dir.path()).is_err());
    }
}

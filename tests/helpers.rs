//! Shared test utilities for jet-factory tests.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Result};
use tempfile::TempDir;

use jet_factory::artifact::hekate;
use jet_factory::catalog::Catalog;
use jet_factory::config::Config;
use jet_factory::host::{ContainerRun, Host, Prompter};

/// Catalog used by the end-to-end tests.
pub const CATALOG_JSON: &str = r#"[
  {
    "name": "arch",
    "pre": ["sed -i s/#Color/Color/ /etc/pacman.conf"],
    "post": ["systemctl enable lightdm"],
    "packages": ["base-devel", "xfce4"],
    "keyring": "archlinuxarm",
    "buildarch": { "aarch64": ["http://os.archlinuxarm.org/os/ArchLinuxARM-aarch64-latest.tar.gz"] },
    "variants": [
      { "name": "arch-kde", "pre": ["pacman -Rns --noconfirm xfce4"], "post": ["systemctl enable sddm"], "packages": ["plasma"] }
    ]
  },
  {
    "name": "fedora",
    "packages": ["xorg-x11-server-Xorg"],
    "buildarch": { "aarch64": [
      "https://dl.fedoraproject.org/pub/fedora/linux/releases/{VERSION}/Server/aarch64/images/"
    ] },
    "variants": [
      { "name": "fedora-gnome", "packages": ["gnome-shell"] },
      { "name": "fedora-kde", "packages": ["plasma-desktop"] }
    ]
  },
  {
    "name": "leap",
    "packages": ["patterns-xfce-xfce"],
    "buildarch": { "aarch64": ["http://download.opensuse.org/leap/openSUSE-Leap-15.2-ARM-JeOS.aarch64.raw.xz"] }
  }
]"#;

/// pacman.conf as shipped by Arch Linux ARM rootfs tarballs (trimmed).
pub const STOCK_PACMAN_CONF: &str = "[options]\nHoldPkg = pacman glibc\nArchitecture = auto\nCheckSpace\nSigLevel = Required DatabaseOptional\n";

/// Temporary work directory with a catalog and a matching config.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    pub workdir: PathBuf,
    pub catalog: Catalog,
    pub config: Config,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_catalog(CATALOG_JSON)
    }

    /// Test environment around a custom catalog.
    pub fn with_catalog(catalog_json: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let workdir = temp_dir.path().join("linux");
        let catalog_path = temp_dir.path().join("base.json");
        fs::write(&catalog_path, catalog_json).expect("Failed to write catalog");

        let mut vars = HashMap::new();
        vars.insert("JET_FACTORY_WORKDIR".to_string(), path_str(&workdir));
        vars.insert("JET_FACTORY_CATALOG".to_string(), path_str(&catalog_path));
        vars.insert(
            "JET_FACTORY_ANDROID_DIR".to_string(),
            path_str(&temp_dir.path().join("android/lineage")),
        );
        vars.insert("JET_FACTORY_DOWNLOAD_DELAY_SECS".to_string(), "0".to_string());
        let config = Config::from_vars(vars);
        let catalog = Catalog::load(&catalog_path).expect("Failed to load catalog");

        Self {
            _temp_dir: temp_dir,
            workdir,
            catalog,
            config,
        }
    }
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// One recorded host interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FetchBody(String),
    Download(String),
    Extract(PathBuf, PathBuf),
    Archive(Vec<PathBuf>, PathBuf),
    ConvertRaw(PathBuf, PathBuf),
    Chroot(Vec<String>),
    Container(ContainerRun),
    Binfmt,
    ChrootPrep(PathBuf),
    CreateImage(String, String),
    Materialize(PathBuf),
}

/// Recording host that simulates every external effect on the filesystem.
#[derive(Default)]
pub struct MockHost {
    pub calls: RefCell<Vec<Call>>,
    /// Listing bodies served by `fetch_body`, keyed by URL.
    pub bodies: HashMap<String, String>,
    /// Number of download attempts that fail before one succeeds.
    pub download_failures: Cell<u32>,
    /// Chroot commands (joined with spaces) that exit unsuccessfully.
    pub failing_chroot: Vec<String>,
    /// Files (relative) created in the tree during chroot prep.
    pub tree_seed: Vec<String>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host whose staged tree ships pacman and a pacman.conf.
    pub fn with_pacman() -> Self {
        Self {
            tree_seed: vec!["usr/bin/pacman".into(), "etc/pacman.conf".into()],
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Chroot command lines, joined with spaces.
    pub fn chroot_lines(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Chroot(argv) => Some(argv.join(" ")),
                _ => None,
            })
            .collect()
    }

    pub fn downloads(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Download(url) => Some(url),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

fn touch(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

impl Host for MockHost {
    fn fetch_body(&self, url: &str) -> Result<String> {
        self.record(Call::FetchBody(url.to_string()));
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("404 Not Found: {}", url))
    }

    fn download_to_file(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
        self.record(Call::Download(url.to_string()));
        let remaining = self.download_failures.get();
        if remaining > 0 {
            self.download_failures.set(remaining - 1);
            bail!("connection reset by peer");
        }
        let name = url.rsplit('/').next().unwrap_or("download");
        let dest = dest_dir.join(name);
        touch(&dest, url.as_bytes())?;
        Ok(dest)
    }

    fn extract_archive(&self, archive: &Path, dest_dir: &Path) -> Result<()> {
        self.record(Call::Extract(archive.to_path_buf(), dest_dir.to_path_buf()));
        let name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if name == hekate::HEKATE_ZIP {
            touch(&dest_dir.join(hekate::HEKATE_BIN), b"hekate payload")?;
        } else if let Some(raw) = name.strip_suffix(".raw.xz") {
            touch(&dest_dir.join(format!("{}.raw", raw)), b"raw disk")?;
        } else {
            touch(&dest_dir.join("etc/os-release"), b"NAME=mock\n")?;
        }
        Ok(())
    }

    fn archive_directories(&self, paths: &[PathBuf], output: &Path) -> Result<()> {
        self.record(Call::Archive(paths.to_vec(), output.to_path_buf()));
        for path in paths {
            if !path.exists() {
                bail!("{} does not exist", path.display());
            }
        }
        touch(output, b"7z")
    }

    fn convert_compressed_image_to_raw(&self, image: &Path, dest_dir: &Path) -> Result<PathBuf> {
        self.record(Call::ConvertRaw(image.to_path_buf(), dest_dir.to_path_buf()));
        if !image.exists() {
            bail!("{} does not exist", image.display());
        }
        touch(&dest_dir.join("etc/os-release"), b"NAME=raw\n")?;
        Ok(dest_dir.to_path_buf())
    }

    fn run_in_chroot(&self, _root: &Path, argv: &[String]) -> Result<()> {
        self.record(Call::Chroot(argv.to_vec()));
        let line = argv.join(" ");
        if self.failing_chroot.contains(&line) {
            bail!("`{}` exited with status 1", line);
        }
        Ok(())
    }

    fn run_container(&self, run: &ContainerRun) -> Result<()> {
        self.record(Call::Container(run.clone()));
        Ok(())
    }

    fn enable_foreign_arch_support(&self) -> Result<()> {
        self.record(Call::Binfmt);
        Ok(())
    }

    fn enter_chroot_prep(&self, root: &Path) -> Result<()> {
        self.record(Call::ChrootPrep(root.to_path_buf()));
        for rel in &self.tree_seed {
            let content: &[u8] = if rel == "etc/pacman.conf" {
                STOCK_PACMAN_CONF.as_bytes()
            } else {
                b""
            };
            touch(&root.join(rel), content)?;
        }
        Ok(())
    }

    fn create_disk_image(
        &self,
        _src_dir: &Path,
        dest_dir: &Path,
        name: &str,
        fs_type: &str,
    ) -> Result<PathBuf> {
        self.record(Call::CreateImage(name.to_string(), fs_type.to_string()));
        let image = dest_dir.join(format!("{}.img", name));
        touch(&image, &[0x5a; 4096])?;
        Ok(image)
    }

    fn materialize_image_to_disk(&self, image: &Path, _dest_dir: &Path) -> Result<PathBuf> {
        self.record(Call::Materialize(image.to_path_buf()));
        Ok(image.to_path_buf())
    }
}

/// Prompter answering from a script and recording what it was offered.
#[derive(Default)]
pub struct MockPrompter {
    pub answers: RefCell<VecDeque<String>>,
    pub offered: RefCell<Vec<Vec<String>>>,
}

impl MockPrompter {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: RefCell::new(answers.iter().map(|s| s.to_string()).collect()),
            offered: RefCell::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> usize {
        self.offered.borrow().len()
    }
}

impl Prompter for MockPrompter {
    fn select(&self, _prompt: &str, options: &[String]) -> Result<String> {
        self.offered.borrow_mut().push(options.to_vec());
        self.answers
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted answer"))
    }
}

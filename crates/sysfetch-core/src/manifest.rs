//! Release artifact manifest.
//!
//! A fixed template list is expanded for one (release, arch) pair. The first
//! entry is the detached signature; everything after it is what the signature
//! must cover.

use std::fmt;
use std::num::NonZeroU32;

/// Detached signature listing SHA-256 checksums of the other artifacts.
pub const SIGNATURE_FILE: &str = "SHA256.sig";

const RELEASE_PLACEHOLDER: &str = "XX";
const ARCH_PLACEHOLDER: &str = "ARCH";

/// Artifacts of a snapshot, in fetch order. Index 0 must stay the signature.
pub const TEMPLATES: &[&str] = &[
    SIGNATURE_FILE,
    "INSTALL.ARCH",
    "baseXX.tgz",
    "bsd",
    "bsd.mp",
    "bsd.rd",
    "compXX.tgz",
    "gameXX.tgz",
    "manXX.tgz",
    "xbaseXX.tgz",
    "xfontXX.tgz",
    "xservXX.tgz",
    "xshareXX.tgz",
];

/// Release identifier, e.g. `66` for 6.6. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Release(NonZeroU32);

impl Release {
    /// Returns `None` for zero.
    pub fn new(n: u32) -> Option<Self> {
        NonZeroU32::new(n).map(Release)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Concrete filenames for one release/arch pair. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    files: Vec<String>,
}

impl Manifest {
    /// All filenames, signature first.
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Name of the detached signature (always the first entry).
    pub fn signature_file(&self) -> &str {
        &self.files[0]
    }

    /// Files the signature is expected to attest: every entry but the first.
    pub fn verify_set(&self) -> &[String] {
        &self.files[1..]
    }
}

/// Expand a single template: first release placeholder, then first arch placeholder.
fn expand(template: &str, release: &str, arch: &str) -> String {
    template
        .replacen(RELEASE_PLACEHOLDER, release, 1)
        .replacen(ARCH_PLACEHOLDER, arch, 1)
}

/// Build the manifest for `release` and `arch`, preserving template order.
pub fn build_manifest(release: Release, arch: &str) -> Manifest {
    let release = release.to_string();
    let files = TEMPLATES
        .iter()
        .map(|t| expand(t, &release, arch))
        .collect();
    Manifest { files }
}

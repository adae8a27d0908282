//! Build identities and artifact naming.
//!
//! A quote body is compiled at most once per [`Fingerprint`]: a SHA-256
//! digest over everything the compiled artifact depends on. On disk the
//! artifact lives next to its module under a canonical name
//! ([`ArtifactName`]) that [`cleanup`](crate::cleanup()) can parse back.

use std::fmt;

use quasi_rewrite::QuoteKind;
use sha2::{Digest, Sha256};

use crate::abi::ABI_VERSION;

/// Number of leading digest bytes kept in a body hash.
const BODY_HASH_BYTES: usize = 16;

/// Identity of one compiled quote.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Digest of the quote kind, owning module, exact body text, interface
    /// tag and compile configuration.
    pub fn compute(
        kind: QuoteKind,
        module: &str,
        body: &str,
        interface_tag: &str,
        compile_args: &[String],
    ) -> Self {
        let mut hasher = Sha256::new();
        // Length prefixes keep field boundaries unambiguous.
        let mut field = |bytes: &[u8]| {
            hasher.update((bytes.len() as u64).to_le_bytes());
            hasher.update(bytes);
        };
        field(artifact_kind(kind).as_bytes());
        field(module.as_bytes());
        field(body.as_bytes());
        field(interface_tag.as_bytes());
        for arg in compile_args {
            field(arg.as_bytes());
        }
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex(&self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// First 128 bits of the SHA-256 of `body`, as lowercase hex.
pub fn body_hash(body: &str) -> String {
    let digest = Sha256::digest(body.as_bytes());
    hex(&digest[..BODY_HASH_BYTES])
}

/// Tag naming the interface an artifact was built against:
/// `quasi<major><minor>-abi<N>-<arch>-<os>`, plus `-f<hash8>` when extra
/// compile arguments are configured. Never contains `_`.
pub fn interface_tag(compile_args: &[String]) -> String {
    let mut tag = format!(
        "quasi{}{}-abi{ABI_VERSION}-{}-{}",
        env!("CARGO_PKG_VERSION_MAJOR"),
        env!("CARGO_PKG_VERSION_MINOR"),
        std::env::consts::ARCH.replace('_', "-"),
        std::env::consts::OS.replace('_', "-"),
    );
    if !compile_args.is_empty() {
        let digest = Sha256::digest(compile_args.join("\0").as_bytes());
        tag.push_str("-f");
        tag.push_str(&hex(&digest[..4]));
    }
    tag
}

/// Platform extension of loadable artifacts.
pub fn artifact_extension() -> &'static str {
    if cfg!(target_os = "windows") {
        "dll"
    } else if cfg!(target_os = "macos") {
        "dylib"
    } else {
        "so"
    }
}

fn artifact_kind(kind: QuoteKind) -> &'static str {
    match kind {
        QuoteKind::Block => "stmt",
        QuoteKind::Expr => "expr",
    }
}

fn hex(bytes: &[u8]) -> String {
    use fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Canonical artifact name:
/// `_qq_<stmt|expr>_<module>_<bodyhash>_<interfacetag>.<ext>`.
///
/// The module may itself contain `_`; the body hash and tag never do, so
/// names are parsed from the right.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactName {
    pub kind: QuoteKind,
    pub module: String,
    pub body_hash: String,
    pub interface_tag: String,
}

const PREFIX: &str = "_qq_";

impl ArtifactName {
    pub fn new(kind: QuoteKind, module: &str, body: &str, interface_tag: &str) -> Self {
        Self {
            kind,
            module: module.to_owned(),
            body_hash: body_hash(body),
            interface_tag: interface_tag.to_owned(),
        }
    }

    /// File name without extension.
    pub fn stem(&self) -> String {
        format!(
            "{PREFIX}{}_{}_{}_{}",
            artifact_kind(self.kind),
            self.module,
            self.body_hash,
            self.interface_tag
        )
    }

    /// File name of the loadable artifact.
    pub fn artifact_file(&self) -> String {
        format!("{}.{}", self.stem(), artifact_extension())
    }

    /// File name of the kept generated source.
    pub fn source_file(&self) -> String {
        format!("{}.c", self.stem())
    }

    /// Parse an artifact or generated-source file name.
    pub fn parse(file_name: &str) -> Option<Self> {
        let (stem, ext) = file_name.rsplit_once('.')?;
        if !matches!(ext, "so" | "dylib" | "dll" | "c") {
            return None;
        }
        let rest = stem.strip_prefix(PREFIX)?;
        let (kind, rest) = if let Some(rest) = rest.strip_prefix("stmt_") {
            (QuoteKind::Block, rest)
        } else {
            (QuoteKind::Expr, rest.strip_prefix("expr_")?)
        };
        let (rest, interface_tag) = rest.rsplit_once('_')?;
        let (module, body_hash) = rest.rsplit_once('_')?;
        let well_formed = !module.is_empty()
            && !interface_tag.is_empty()
            && body_hash.len() == BODY_HASH_BYTES * 2
            && body_hash.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        well_formed.then(|| Self {
            kind,
            module: module.to_owned(),
            body_hash: body_hash.to_owned(),
            interface_tag: interface_tag.to_owned(),
        })
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test assertions use unwrap/expect for clarity"
)]

//! Mount table line parser for Linux systems.
//!
//! Parses lines in `/proc/[pid]/mounts` format, which mirrors `fstab(5)`. See
//! [`proc_pid_mounts(5)`](https://man7.org/linux/man-pages/man5/proc_pid_mounts.5.html)
//! for details on the structure.

use std::borrow::Cow;

/// Represents a parsed mount table line.
#[derive(Debug, PartialEq, Eq)]
pub struct MountEntry<'a> {
    /// Source of the mount (e.g., device or `cgroup`).
    pub source: &'a str,
    /// Mount point with octal escapes decoded.
    pub mount_point: Cow<'a, str>,
    /// Filesystem type (e.g., `ext4`, `cgroup`, `cgroup2`).
    pub fs_type: &'a str,
    /// Comma-separated mount options.
    pub options: &'a str,
}

impl MountEntry<'_> {
    /// Iterates over the individual mount options.
    pub fn options(&self) -> impl Iterator<Item = &str> {
        self.options.split(',').filter(|opt| !opt.is_empty())
    }
}

/// Named fields in a mount table line.
#[derive(Debug)]
pub enum MountField {
    Source,
    MountPoint,
    FsType,
    Options,
}

impl std::fmt::Display for MountField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MountField::Source => "source",
            MountField::MountPoint => "mount_point",
            MountField::FsType => "fs_type",
            MountField::Options => "options",
        };
        write!(f, "{name}")
    }
}

/// Errors that may occur when parsing a mount table line.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("missing `{field}` in line: `{line}`")]
    MissingField { field: MountField, line: String },
}

/// Parses a single line of mount table data.
///
/// Only the first four whitespace-separated fields are interpreted; the trailing
/// `dump` and `pass` columns are ignored. The mount point is the only field the kernel
/// escapes, so it is the only one decoded.
///
/// # Errors
///
/// Returns [`ParseError::MissingField`] naming the first absent field.
pub fn parse_mount_line(line: &str) -> Result<MountEntry<'_>, ParseError> {
    let mut fields = line.split_whitespace();
    let mut next = |field: MountField| {
        fields.next().ok_or_else(|| ParseError::MissingField {
            field,
            line: line.to_owned(),
        })
    };

    let source = next(MountField::Source)?;
    let mount_point = unescape_octal(next(MountField::MountPoint)?);
    let fs_type = next(MountField::FsType)?;
    let options = next(MountField::Options)?;

    Ok(MountEntry {
        source,
        mount_point,
        fs_type,
        options,
    })
}

/// Decodes the `\ooo` escapes the kernel uses for space, tab, newline and backslash.
fn unescape_octal(raw: &str) -> Cow<'_, str> {
    if !raw.contains('\\') {
        return Cow::Borrowed(raw);
    }

    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() && is_octal_triplet(&bytes[i + 1..i + 4]) {
            let value =
                (bytes[i + 1] - b'0') * 64 + (bytes[i + 2] - b'0') * 8 + (bytes[i + 3] - b'0');
            out.push(value);
            i += 4;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    Cow::Owned(String::from_utf8_lossy(&out).into_owned())
}

#[inline]
fn is_octal_triplet(src: &[u8]) -> bool {
    src.len() == 3 && src[0] <= b'3' && src.iter().all(|b| (b'0'..=b'7').contains(b))
}
